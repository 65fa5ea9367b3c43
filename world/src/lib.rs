#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Endless Road.

mod geometry;
mod window;

use endless_road_core::{
    Command, ConfigError, Event, GenerationConfig, GeometryProvider, LaneTable, PrototypeSet,
};
use endless_road_system_placement::PlacementSolver;
use glam::DVec3;

use crate::{
    geometry::GeometryCache,
    window::{AdvanceContext, SegmentWindow},
};

/// Represents the authoritative Endless Road world state.
#[derive(Debug)]
pub struct World {
    config: GenerationConfig,
    lanes: LaneTable,
    geometry: GeometryCache,
    window: SegmentWindow,
    solver: PlacementSolver,
    observer: Option<DVec3>,
}

impl World {
    /// Creates an empty world that instantiates the provided prototypes.
    ///
    /// Prototype geometry is measured once here and cached for the lifetime
    /// of the world. The placement generator is seeded from `config.seed`.
    pub fn new(
        config: GenerationConfig,
        prototypes: PrototypeSet,
        geometry: &dyn GeometryProvider,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            lanes: LaneTable::from_lane_width(config.lane_width),
            geometry: GeometryCache::resolve(&prototypes, geometry),
            window: SegmentWindow::new(),
            solver: PlacementSolver::from_seed(config.seed),
            observer: None,
            config,
        })
    }

    fn advance(&mut self, out_events: &mut Vec<Event>) -> bool {
        let context = AdvanceContext {
            observer: self.observer,
            config: &self.config,
            lanes: &self.lanes,
            geometry: &self.geometry,
            solver: &mut self.solver,
        };
        self.window.advance(context, out_events).is_some()
    }

    fn reconfigure(&mut self, config: GenerationConfig, out_events: &mut Vec<Event>) {
        if let Err(reason) = config.validate() {
            tracing::warn!(%reason, "configuration rejected");
            out_events.push(Event::ConfigurationRejected { reason });
            return;
        }

        self.lanes = LaneTable::from_lane_width(config.lane_width);
        self.config = config;
        out_events.push(Event::ConfigurationChanged);
        self.window.trim(self.config.max_active_segments, out_events);
    }

    fn adjust(
        &mut self,
        out_events: &mut Vec<Event>,
        change: impl FnOnce(&mut GenerationConfig),
    ) {
        let mut config = self.config.clone();
        change(&mut config);
        self.reconfigure(config, out_events);
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::MoveObserver { position } => {
            world.observer = Some(position);
            out_events.push(Event::ObserverMoved { position });
        }
        Command::AdvanceWindow => {
            let _ = world.advance(out_events);
        }
        Command::PrimeWindow => {
            while world.window.len() < world.config.max_active_segments {
                if !world.advance(out_events) {
                    break;
                }
            }
        }
        Command::Configure { config } => world.reconfigure(config, out_events),
        Command::SetDifficulty {
            max_obstacles,
            safe_distance,
        } => world.adjust(out_events, |config| {
            config.set_difficulty(max_obstacles, safe_distance);
        }),
        Command::SetWaypointInterval { interval } => world.adjust(out_events, |config| {
            config.set_waypoint_interval(interval);
        }),
        Command::SetWaypointOffset { offset } => world.adjust(out_events, |config| {
            config.set_waypoint_offset(offset);
        }),
        Command::SetWaypointClearance { distance } => world.adjust(out_events, |config| {
            config.set_waypoint_clearance(distance);
        }),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use endless_road_core::{
        GenerationConfig, LaneTable, SegmentSnapshot, WindowView, TRIGGER_DISTANCE_FACTOR,
    };
    use glam::DVec3;

    use super::World;

    /// Configuration currently governing placements.
    #[must_use]
    pub fn config(world: &World) -> &GenerationConfig {
        &world.config
    }

    /// Lane offsets derived from the current configuration.
    #[must_use]
    pub fn lanes(world: &World) -> LaneTable {
        world.lanes
    }

    /// Most recent observer position, if one was reported.
    #[must_use]
    pub fn observer(world: &World) -> Option<DVec3> {
        world.observer
    }

    /// Active segments ordered from oldest to newest.
    pub fn segments(world: &World) -> impl Iterator<Item = &SegmentSnapshot> {
        world.window.segments()
    }

    /// Far edge of the newest segment, or `None` while the window is empty.
    #[must_use]
    pub fn leading_edge(world: &World) -> Option<f64> {
        world.window.leading_edge()
    }

    /// Distance ahead of the observer at which the next segment is requested.
    #[must_use]
    pub fn trigger_distance(world: &World) -> f64 {
        world.geometry.nominal_extent(world.config.fallback_scale) * TRIGGER_DISTANCE_FACTOR
    }

    /// Captures the window state consumed by the generation driver.
    #[must_use]
    pub fn window_view(world: &World) -> WindowView {
        WindowView {
            leading_edge: leading_edge(world),
            trigger_distance: trigger_distance(world),
            active_segments: world.window.len(),
            capacity: world.config.max_active_segments,
        }
    }

    /// Aggregated counters describing the active window.
    #[must_use]
    pub fn summary(world: &World) -> WindowSummary {
        let mut summary = WindowSummary {
            active_segments: world.window.len(),
            segment_extent: world.geometry.nominal_extent(world.config.fallback_scale),
            active_obstacles: 0,
            active_waypoints: 0,
        };
        for segment in world.window.segments() {
            summary.active_obstacles += segment.obstacles.len();
            summary.active_waypoints += usize::from(segment.waypoint.is_some());
        }
        summary
    }

    /// Debug counters reported by [`summary`].
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct WindowSummary {
        /// Number of segments in the window.
        pub active_segments: usize,
        /// Nominal extent of a segment.
        pub segment_extent: f64,
        /// Obstacles owned by active segments.
        pub active_obstacles: usize,
        /// Waypoints owned by active segments.
        pub active_waypoints: usize,
    }
}
