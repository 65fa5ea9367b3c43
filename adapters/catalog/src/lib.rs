#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! TOML prototype catalog describing the content Endless Road instantiates.
//!
//! A catalog names the segment, obstacle and waypoint prototypes and records
//! the bounds measured for each of them. Prototypes without bounds are still
//! valid; the world falls back to nominal geometry for them.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::{Path, PathBuf},
};

use endless_road_core::{Footprint, PrototypeId, PrototypeSet, StaticGeometry};
use glam::DVec3;
use serde::Deserialize;
use thiserror::Error;

const SUPPORTED_CATALOG_VERSION: u32 = 1;
const DEFAULT_CATALOG: &str = include_str!("../assets/default.toml");

/// Failures raised while loading a prototype catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("failed to read prototype catalog at {}", path.display())]
    Io {
        /// Location that was read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The catalog is not valid TOML or does not match the expected layout.
    #[error("failed to parse prototype catalog")]
    Parse(#[from] toml::de::Error),
    /// The catalog declares a version this build cannot read.
    #[error("unsupported prototype catalog version {found}; expected {expected}")]
    UnsupportedVersion {
        /// Version declared by the catalog.
        found: u32,
        /// Version this build reads.
        expected: u32,
    },
    /// A role refers to a prototype the catalog does not define.
    #[error("{role} refers to unknown prototype `{name}`")]
    UnknownPrototype {
        /// Role that holds the reference.
        role: &'static str,
        /// Referenced prototype name.
        name: String,
    },
    /// The obstacle list names the same prototype twice.
    #[error("obstacle prototype `{name}` is listed more than once")]
    DuplicateObstacle {
        /// Repeated prototype name.
        name: String,
    },
    /// A prototype declares only one corner of its bounds.
    #[error("prototype `{name}` must declare both `min` and `max` bounds or neither")]
    IncompleteBounds {
        /// Offending prototype name.
        name: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    version: u32,
    segment: Option<String>,
    #[serde(default)]
    obstacles: Vec<String>,
    waypoint: Option<String>,
    #[serde(default)]
    prototypes: BTreeMap<String, PrototypeEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PrototypeEntry {
    min: Option<[f64; 3]>,
    max: Option<[f64; 3]>,
}

/// Prototype roles and geometry loaded from a catalog.
#[derive(Clone, Debug, PartialEq)]
pub struct Catalog {
    prototypes: PrototypeSet,
    geometry: StaticGeometry,
    names: BTreeMap<PrototypeId, String>,
}

impl Catalog {
    /// Catalog bundled with the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml_str(DEFAULT_CATALOG)
    }

    /// Loads the catalog stored at the provided path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_toml_str(&contents)?;
        tracing::debug!(
            path = %path.display(),
            prototypes = catalog.names.len(),
            "prototype catalog loaded"
        );
        Ok(catalog)
    }

    /// Parses a catalog from TOML text.
    ///
    /// Prototype identifiers are assigned from one in name order, so the same
    /// catalog always yields the same identifiers.
    pub fn from_toml_str(contents: &str) -> Result<Self, CatalogError> {
        let manifest: Manifest = toml::from_str(contents)?;
        if manifest.version != SUPPORTED_CATALOG_VERSION {
            return Err(CatalogError::UnsupportedVersion {
                found: manifest.version,
                expected: SUPPORTED_CATALOG_VERSION,
            });
        }

        let mut ids = BTreeMap::new();
        let mut names = BTreeMap::new();
        let mut geometry = StaticGeometry::new();
        for (index, (name, entry)) in manifest.prototypes.into_iter().enumerate() {
            let id = PrototypeId::new(index as u32 + 1);
            match (entry.min, entry.max) {
                (Some(min), Some(max)) => geometry.insert(
                    id,
                    Footprint::from_bounds(DVec3::from_array(min), DVec3::from_array(max)),
                ),
                (None, None) => {}
                _ => return Err(CatalogError::IncompleteBounds { name }),
            }
            let _ = ids.insert(name.clone(), id);
            let _ = names.insert(id, name);
        }

        let mut prototypes = PrototypeSet::new();
        if let Some(name) = manifest.segment {
            prototypes = prototypes.with_segment(resolve(&ids, "segment", name)?);
        }
        if let Some(name) = manifest.waypoint {
            prototypes = prototypes.with_waypoint(resolve(&ids, "waypoint", name)?);
        }

        let mut listed = BTreeSet::new();
        let mut obstacles = Vec::with_capacity(manifest.obstacles.len());
        for name in manifest.obstacles {
            if !listed.insert(name.clone()) {
                return Err(CatalogError::DuplicateObstacle { name });
            }
            obstacles.push(resolve(&ids, "obstacles", name)?);
        }
        prototypes = prototypes.with_obstacles(obstacles);

        Ok(Self {
            prototypes,
            geometry,
            names,
        })
    }

    /// Prototypes assigned to each generation role.
    #[must_use]
    pub fn prototypes(&self) -> &PrototypeSet {
        &self.prototypes
    }

    /// Bounds recorded for the catalog's prototypes.
    #[must_use]
    pub fn geometry(&self) -> &StaticGeometry {
        &self.geometry
    }

    /// Name the catalog gives to a prototype.
    #[must_use]
    pub fn name(&self, id: PrototypeId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }
}

fn resolve(
    ids: &BTreeMap<String, PrototypeId>,
    role: &'static str,
    name: String,
) -> Result<PrototypeId, CatalogError> {
    ids.get(&name)
        .copied()
        .ok_or(CatalogError::UnknownPrototype { role, name })
}
