#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs Endless Road generation headlessly.

mod simulation;

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use endless_road_catalog::Catalog;
use endless_road_core::{Event, GenerationConfig};
use endless_road_world::query;
use tracing_subscriber::EnvFilter;

use crate::simulation::Simulation;

/// Drives an observer along an endless road and reports what was generated.
#[derive(Debug, Parser)]
#[command(name = "endless-road", version, about)]
struct CliArgs {
    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 600)]
    ticks: u64,
    /// Distance the observer travels along the track each tick.
    #[arg(long, default_value_t = 0.25)]
    speed: f64,
    /// Overrides the placement seed from the configuration.
    #[arg(long)]
    seed: Option<u64>,
    /// TOML file holding the generation configuration.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// TOML prototype catalog; the bundled catalog is used when omitted.
    #[arg(long, value_name = "PATH")]
    catalog: Option<PathBuf>,
}

/// Entry point for the Endless Road command-line interface.
fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let mut config = load_config(args.config.as_ref())?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    let catalog = match args.catalog.as_ref() {
        Some(path) => Catalog::from_path(path)
            .with_context(|| format!("failed to load catalog {}", path.display()))?,
        None => Catalog::builtin().context("failed to load the bundled catalog")?,
    };

    let mut simulation = Simulation::new(
        config,
        catalog.prototypes().clone(),
        catalog.geometry(),
        args.speed,
    )?;

    report(&catalog, &simulation.prime());
    for _ in 0..args.ticks {
        report(&catalog, &simulation.step());
    }

    let summary = query::summary(simulation.world());
    println!(
        "active segments: {}, segment extent: {:.2}, obstacles: {}, waypoints: {}",
        summary.active_segments,
        summary.segment_extent,
        summary.active_obstacles,
        summary.active_waypoints
    );
    if let Some(observer) = query::observer(simulation.world()) {
        println!("observer x: {:.2}", observer.x);
    }
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<GenerationConfig> {
    let Some(path) = path else {
        return Ok(GenerationConfig::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration at {}", path.display()))?;
    let config: GenerationConfig = toml::from_str(&contents)
        .with_context(|| format!("failed to parse configuration at {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid configuration at {}", path.display()))?;
    Ok(config)
}

fn report(catalog: &Catalog, events: &[Event]) {
    for event in events {
        match event {
            Event::ObstacleSpawned {
                segment,
                prototype,
                lane,
                position,
                ..
            } => tracing::debug!(
                segment = segment.get(),
                prototype = catalog.name(*prototype).unwrap_or("unnamed"),
                ?lane,
                x = position.x,
                "obstacle spawned"
            ),
            Event::AdvanceSkipped { reason } => {
                tracing::warn!(?reason, "window advance produced no segment");
            }
            other => {
                if let Some(record) = other.lifecycle_record() {
                    tracing::trace!(
                        entity = ?record.entity,
                        phase = ?record.phase,
                        x = record.position.x,
                        "lifecycle"
                    );
                }
            }
        }
    }
}
