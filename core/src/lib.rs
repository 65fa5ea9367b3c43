#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Endless Road generation engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing observer movement, window advancement and tuning changes, the
//! world executes those commands via its `apply` entry point, and then
//! broadcasts [`Event`] values describing every entity it created or
//! destroyed. Systems consume event streams, query immutable snapshots, and
//! respond exclusively with new command batches.

use std::collections::BTreeMap;

use glam::DVec3;
use serde::{Deserialize, Serialize};

mod config;

pub use config::{ConfigError, GenerationConfig, MAX_ACTIVE_SEGMENTS, MAX_DIFFICULTY_OBSTACLES};

/// Number of lateral lanes available on every segment.
pub const LANE_COUNT: usize = 3;

/// Fraction of the lane width separating the outer lanes from the centre lane.
pub const LANE_SPREAD: f64 = 0.6;

/// Segment extent assumed when the geometry provider cannot measure a prototype.
pub const FALLBACK_SEGMENT_EXTENT: f64 = 10.0;

/// Multiple of the nominal segment extent at which the next segment is requested.
pub const TRIGGER_DISTANCE_FACTOR: f64 = 1.5;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Records the observer position sampled for the current tick.
    MoveObserver {
        /// Observer position in world units.
        position: DVec3,
    },
    /// Appends one segment to the window, evicting the oldest when over capacity.
    AdvanceWindow,
    /// Advances the window until it holds its configured number of segments.
    PrimeWindow,
    /// Replaces the whole tuning surface after validating it.
    Configure {
        /// Configuration that should govern future placements.
        config: GenerationConfig,
    },
    /// Adjusts obstacle density and the observer clearance kept by obstacles.
    SetDifficulty {
        /// Requested upper bound on obstacles per segment.
        max_obstacles: u32,
        /// Requested minimum distance between the observer and new obstacles.
        safe_distance: f64,
    },
    /// Changes how many segments separate waypoint attempts.
    SetWaypointInterval {
        /// Requested interval measured in segments.
        interval: u64,
    },
    /// Changes how far waypoints sit from the segment centre line.
    SetWaypointOffset {
        /// Requested lateral offset in world units.
        offset: f64,
    },
    /// Changes the clearance obstacles keep around waypoints.
    SetWaypointClearance {
        /// Requested clearance radius in world units.
        distance: f64,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms the observer position recorded for the current tick.
    ObserverMoved {
        /// Observer position in world units.
        position: DVec3,
    },
    /// Announces that a new segment joined the window.
    SegmentSpawned {
        /// Sequence number of the new segment.
        segment: SegmentId,
        /// Prototype the segment was instantiated from.
        prototype: PrototypeId,
        /// Centre of the segment.
        origin: DVec3,
        /// Longitudinal length of the segment.
        extent: f64,
        /// Height of the drivable surface.
        surface_y: f64,
    },
    /// Announces that the oldest segment left the window.
    SegmentEvicted {
        /// Sequence number of the evicted segment.
        segment: SegmentId,
        /// Centre the segment occupied.
        origin: DVec3,
    },
    /// Announces that an obstacle was placed on a segment.
    ObstacleSpawned {
        /// Identifier assigned to the obstacle.
        obstacle: ObstacleId,
        /// Segment that owns the obstacle.
        segment: SegmentId,
        /// Prototype the obstacle was instantiated from.
        prototype: PrototypeId,
        /// Lane the obstacle occupies.
        lane: Lane,
        /// Ground-corrected position of the obstacle origin.
        position: DVec3,
        /// Rotation around the vertical axis in degrees.
        yaw_degrees: f64,
    },
    /// Announces that an obstacle was destroyed together with its segment.
    ObstacleDespawned {
        /// Identifier of the destroyed obstacle.
        obstacle: ObstacleId,
        /// Segment that owned the obstacle.
        segment: SegmentId,
        /// Position the obstacle occupied.
        position: DVec3,
    },
    /// Announces that a waypoint was placed beside a segment.
    WaypointSpawned {
        /// Identifier assigned to the waypoint.
        waypoint: WaypointId,
        /// Segment that owns the waypoint.
        segment: SegmentId,
        /// Side of the road the waypoint stands on.
        side: Side,
        /// Ground-corrected position of the waypoint origin.
        position: DVec3,
        /// Rotation around the vertical axis in degrees.
        yaw_degrees: f64,
    },
    /// Announces that a waypoint was destroyed together with its segment.
    WaypointDespawned {
        /// Identifier of the destroyed waypoint.
        waypoint: WaypointId,
        /// Segment that owned the waypoint.
        segment: SegmentId,
        /// Position the waypoint occupied.
        position: DVec3,
    },
    /// Reports that an advance request produced no segment.
    AdvanceSkipped {
        /// Why no segment was produced.
        reason: SkipReason,
    },
    /// Confirms that the tuning surface changed.
    ConfigurationChanged,
    /// Reports that a replacement configuration was refused.
    ConfigurationRejected {
        /// Validation failure that caused the rejection.
        reason: ConfigError,
    },
}

impl Event {
    /// Converts entity creation and destruction events into a lifecycle record.
    ///
    /// Events that do not describe an entity yield `None`.
    #[must_use]
    pub fn lifecycle_record(&self) -> Option<LifecycleRecord> {
        let (entity, position, phase) = match *self {
            Event::SegmentSpawned {
                segment, origin, ..
            } => (EntityId::Segment(segment), origin, LifecyclePhase::Created),
            Event::SegmentEvicted { segment, origin } => {
                (EntityId::Segment(segment), origin, LifecyclePhase::Destroyed)
            }
            Event::ObstacleSpawned {
                obstacle, position, ..
            } => (
                EntityId::Obstacle(obstacle),
                position,
                LifecyclePhase::Created,
            ),
            Event::ObstacleDespawned {
                obstacle, position, ..
            } => (
                EntityId::Obstacle(obstacle),
                position,
                LifecyclePhase::Destroyed,
            ),
            Event::WaypointSpawned {
                waypoint, position, ..
            } => (
                EntityId::Waypoint(waypoint),
                position,
                LifecyclePhase::Created,
            ),
            Event::WaypointDespawned {
                waypoint, position, ..
            } => (
                EntityId::Waypoint(waypoint),
                position,
                LifecyclePhase::Destroyed,
            ),
            _ => return None,
        };

        Some(LifecycleRecord {
            entity,
            position,
            phase,
        })
    }
}

/// Reasons an advance request may finish without appending a segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkipReason {
    /// No segment prototype is configured.
    MissingSegmentPrototype,
}

/// Identity of any entity the world spawns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityId {
    /// A track segment.
    Segment(SegmentId),
    /// An obstacle owned by a segment.
    Obstacle(ObstacleId),
    /// A waypoint owned by a segment.
    Waypoint(WaypointId),
}

/// Whether a lifecycle record describes a creation or a destruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecyclePhase {
    /// The entity entered the world.
    Created,
    /// The entity left the world.
    Destroyed,
}

/// Flat notification consumed by collision and presentation collaborators.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LifecycleRecord {
    /// Entity the record refers to.
    pub entity: EntityId,
    /// Position of the entity when the event occurred.
    pub position: DVec3,
    /// Creation or destruction.
    pub phase: LifecyclePhase,
}

/// Sequence number of a segment. The first segment ever created is number one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentId(u64);

impl SegmentId {
    /// Creates a new segment identifier with the provided sequence number.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the sequence number.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Unique identifier assigned to an obstacle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObstacleId(u64);

impl ObstacleId {
    /// Creates a new obstacle identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Unique identifier assigned to a waypoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WaypointId(u64);

impl WaypointId {
    /// Creates a new waypoint identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Identifier of a content prototype known to the geometry provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrototypeId(u32);

impl PrototypeId {
    /// Creates a new prototype identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Road side a waypoint stands on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Negative lateral offset.
    Left,
    /// Positive lateral offset.
    Right,
}

impl Side {
    /// Returns the other side of the road.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Sign applied to the lateral waypoint offset.
    #[must_use]
    pub const fn lateral_sign(self) -> f64 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }

    /// Human readable label used in logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// One of the three lateral placement slots across a segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Lane {
    /// Lane with a negative lateral offset.
    Left,
    /// Lane aligned with the segment centre line.
    Center,
    /// Lane with a positive lateral offset.
    Right,
}

impl Lane {
    /// Every lane ordered from left to right.
    pub const ALL: [Lane; LANE_COUNT] = [Lane::Left, Lane::Center, Lane::Right];

    /// Zero-based index of the lane from left to right.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Center => 1,
            Self::Right => 2,
        }
    }

    /// Looks up the lane stored at the provided index.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Fixed lateral offsets of the three lanes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaneTable {
    offsets: [f64; LANE_COUNT],
}

impl LaneTable {
    /// Derives lane offsets from the configured lane width.
    #[must_use]
    pub fn from_lane_width(lane_width: f64) -> Self {
        let spread = lane_width * LANE_SPREAD;
        Self {
            offsets: [-spread, 0.0, spread],
        }
    }

    /// Lateral offset of the lane relative to the segment centre line.
    #[must_use]
    pub const fn offset(&self, lane: Lane) -> f64 {
        self.offsets[lane.index()]
    }

    /// All offsets ordered from left to right.
    #[must_use]
    pub const fn offsets(&self) -> [f64; LANE_COUNT] {
        self.offsets
    }
}

/// Axis-aligned bounds of a prototype measured relative to its origin.
///
/// X runs along the track, Y is up and Z is lateral.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    min: DVec3,
    max: DVec3,
}

impl Footprint {
    /// Creates a footprint from its minimum and maximum corners.
    #[must_use]
    pub const fn from_bounds(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Flat footprint centred on the origin with the provided longitudinal extent.
    #[must_use]
    pub fn nominal(extent: f64) -> Self {
        let half = extent * 0.5;
        Self {
            min: DVec3::new(-half, 0.0, 0.0),
            max: DVec3::new(half, 0.0, 0.0),
        }
    }

    /// Minimum corner relative to the origin.
    #[must_use]
    pub const fn min(&self) -> DVec3 {
        self.min
    }

    /// Maximum corner relative to the origin.
    #[must_use]
    pub const fn max(&self) -> DVec3 {
        self.max
    }

    /// Length along the track.
    #[must_use]
    pub fn extent(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Height of the top surface above the origin.
    #[must_use]
    pub const fn top_offset(&self) -> f64 {
        self.max.y
    }

    /// Height of the lowest point relative to the origin, usually negative.
    #[must_use]
    pub const fn bottom_offset(&self) -> f64 {
        self.min.y
    }

    /// Longitudinal coordinate of the far edge of an instance placed at `origin`.
    #[must_use]
    pub fn trailing_edge(&self, origin: DVec3) -> f64 {
        origin.x + self.max.x
    }

    /// Measures an instance placed at `origin`.
    ///
    /// Returns the longitudinal extent, the absolute height of the top
    /// surface and the bottom offset relative to the origin.
    #[must_use]
    pub fn extent_and_surface(&self, origin: DVec3) -> (f64, f64, f64) {
        (
            self.extent(),
            origin.y + self.top_offset(),
            self.bottom_offset(),
        )
    }

    /// Reports whether the bounds cannot be used for placement.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        !self.min.is_finite()
            || !self.max.is_finite()
            || self.extent() <= 0.0
            || self.max.y < self.min.y
            || self.max.z < self.min.z
    }
}

/// Source of static geometry metadata for content prototypes.
pub trait GeometryProvider {
    /// Returns the bounds of the prototype, or `None` when they are unknown.
    fn footprint(&self, prototype: PrototypeId) -> Option<Footprint>;
}

/// In-memory geometry provider backed by a prototype table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StaticGeometry {
    footprints: BTreeMap<PrototypeId, Footprint>,
}

impl StaticGeometry {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a footprint, returning the provider for chaining.
    #[must_use]
    pub fn with(mut self, prototype: PrototypeId, footprint: Footprint) -> Self {
        self.insert(prototype, footprint);
        self
    }

    /// Registers or replaces the footprint of a prototype.
    pub fn insert(&mut self, prototype: PrototypeId, footprint: Footprint) {
        let _ = self.footprints.insert(prototype, footprint);
    }

    /// Number of prototypes with known geometry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.footprints.len()
    }

    /// Reports whether no prototype has known geometry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.footprints.is_empty()
    }
}

impl GeometryProvider for StaticGeometry {
    fn footprint(&self, prototype: PrototypeId) -> Option<Footprint> {
        self.footprints.get(&prototype).copied()
    }
}

/// Prototypes the world instantiates for each generation category.
///
/// Absent prototypes silently disable their category.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrototypeSet {
    segment: Option<PrototypeId>,
    obstacles: Vec<PrototypeId>,
    waypoint: Option<PrototypeId>,
}

impl PrototypeSet {
    /// Creates an empty prototype set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the provided prototype for track segments.
    #[must_use]
    pub fn with_segment(mut self, prototype: PrototypeId) -> Self {
        self.segment = Some(prototype);
        self
    }

    /// Uses the provided prototypes for obstacles.
    #[must_use]
    pub fn with_obstacles(mut self, prototypes: Vec<PrototypeId>) -> Self {
        self.obstacles = prototypes;
        self
    }

    /// Uses the provided prototype for waypoints.
    #[must_use]
    pub fn with_waypoint(mut self, prototype: PrototypeId) -> Self {
        self.waypoint = Some(prototype);
        self
    }

    /// Prototype used for track segments, if any.
    #[must_use]
    pub const fn segment(&self) -> Option<PrototypeId> {
        self.segment
    }

    /// Prototypes obstacles are drawn from.
    #[must_use]
    pub fn obstacles(&self) -> &[PrototypeId] {
        &self.obstacles
    }

    /// Prototype used for waypoints, if any.
    #[must_use]
    pub const fn waypoint(&self) -> Option<PrototypeId> {
        self.waypoint
    }
}

/// Read-only snapshot of the window state consulted by the generation driver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowView {
    /// Far edge of the newest segment, or `None` while the window is empty.
    pub leading_edge: Option<f64>,
    /// Distance ahead of the observer at which the next segment is requested.
    pub trigger_distance: f64,
    /// Number of segments currently in the window.
    pub active_segments: usize,
    /// Number of segments the window retains.
    pub capacity: usize,
}

/// Immutable representation of an active segment used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentSnapshot {
    /// Sequence number of the segment.
    pub id: SegmentId,
    /// Prototype the segment was instantiated from.
    pub prototype: PrototypeId,
    /// Centre of the segment.
    pub origin: DVec3,
    /// Longitudinal length of the segment.
    pub extent: f64,
    /// Height of the drivable surface.
    pub surface_y: f64,
    /// Longitudinal coordinate of the far edge of the segment.
    pub trailing_edge: f64,
    /// Waypoint owned by the segment, if one was placed.
    pub waypoint: Option<WaypointSnapshot>,
    /// Obstacles owned by the segment in placement order.
    pub obstacles: Vec<ObstacleSnapshot>,
}

/// Immutable representation of a placed obstacle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObstacleSnapshot {
    /// Identifier assigned to the obstacle.
    pub id: ObstacleId,
    /// Segment that owns the obstacle.
    pub segment: SegmentId,
    /// Prototype the obstacle was instantiated from.
    pub prototype: PrototypeId,
    /// Lane the obstacle occupies.
    pub lane: Lane,
    /// Ground-corrected position of the obstacle origin.
    pub position: DVec3,
    /// Rotation around the vertical axis in degrees.
    pub yaw_degrees: f64,
}

/// Immutable representation of a placed waypoint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaypointSnapshot {
    /// Identifier assigned to the waypoint.
    pub id: WaypointId,
    /// Segment that owns the waypoint.
    pub segment: SegmentId,
    /// Side of the road the waypoint stands on.
    pub side: Side,
    /// Ground-corrected position of the waypoint origin.
    pub position: DVec3,
    /// Rotation around the vertical axis in degrees.
    pub yaw_degrees: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{de::DeserializeOwned, Serialize};

    #[test]
    fn lane_table_spreads_outer_lanes_symmetrically() {
        let lanes = LaneTable::from_lane_width(3.0);
        assert!((lanes.offset(Lane::Left) + 1.8).abs() < 1e-12);
        assert_eq!(lanes.offset(Lane::Center), 0.0);
        assert!((lanes.offset(Lane::Right) - 1.8).abs() < 1e-12);
    }

    #[test]
    fn lane_indices_round_trip() {
        for lane in Lane::ALL {
            assert_eq!(Lane::from_index(lane.index()), Some(lane));
        }
        assert_eq!(Lane::from_index(LANE_COUNT), None);
    }

    #[test]
    fn side_alternates() {
        assert_eq!(Side::Left.opposite(), Side::Right);
        assert_eq!(Side::Right.opposite().opposite(), Side::Right);
        assert_eq!(Side::Left.lateral_sign(), -1.0);
    }

    #[test]
    fn footprint_measures_instance_surface() {
        let footprint =
            Footprint::from_bounds(DVec3::new(-5.0, -0.5, -4.0), DVec3::new(5.0, 0.25, 4.0));
        let origin = DVec3::new(20.0, 2.0, 0.0);
        let (extent, surface, bottom) = footprint.extent_and_surface(origin);
        assert_eq!(extent, 10.0);
        assert_eq!(surface, 2.25);
        assert_eq!(bottom, -0.5);
        assert_eq!(footprint.trailing_edge(origin), 25.0);
    }

    #[test]
    fn degenerate_footprints_are_detected() {
        assert!(Footprint::nominal(0.0).is_degenerate());
        assert!(Footprint::nominal(f64::NAN).is_degenerate());
        assert!(!Footprint::nominal(10.0).is_degenerate());
    }

    #[test]
    fn static_geometry_reports_registered_prototypes_only() {
        let geometry = StaticGeometry::new().with(PrototypeId::new(1), Footprint::nominal(4.0));
        assert_eq!(geometry.len(), 1);
        assert_eq!(
            geometry.footprint(PrototypeId::new(1)),
            Some(Footprint::nominal(4.0))
        );
        assert_eq!(geometry.footprint(PrototypeId::new(2)), None);
    }

    #[test]
    fn lifecycle_records_cover_entity_events_only() {
        let spawned = Event::WaypointSpawned {
            waypoint: WaypointId::new(3),
            segment: SegmentId::new(5),
            side: Side::Left,
            position: DVec3::new(1.0, 0.0, -2.5),
            yaw_degrees: 0.0,
        };
        let record = spawned.lifecycle_record().expect("waypoint record");
        assert_eq!(record.entity, EntityId::Waypoint(WaypointId::new(3)));
        assert_eq!(record.phase, LifecyclePhase::Created);

        let evicted = Event::SegmentEvicted {
            segment: SegmentId::new(5),
            origin: DVec3::ZERO,
        };
        assert_eq!(
            evicted.lifecycle_record().map(|record| record.phase),
            Some(LifecyclePhase::Destroyed)
        );

        assert!(Event::ConfigurationChanged.lifecycle_record().is_none());
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn lifecycle_record_round_trips_through_bincode() {
        assert_round_trip(&LifecycleRecord {
            entity: EntityId::Obstacle(ObstacleId::new(9)),
            position: DVec3::new(4.0, 0.5, 1.8),
            phase: LifecyclePhase::Destroyed,
        });
    }

    #[test]
    fn footprint_round_trips_through_bincode() {
        assert_round_trip(&Footprint::from_bounds(
            DVec3::new(-1.0, -0.5, -1.0),
            DVec3::new(1.0, 0.5, 1.0),
        ));
    }
}
