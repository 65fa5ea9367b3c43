#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Rejection-sampling placement of obstacles and waypoints on track segments.
//!
//! The solver never mutates world state. It receives a description of the
//! segment being generated together with every exclusion currently in force
//! and answers with positions that satisfy all of them, or with nothing when
//! the attempt budget runs out.

use endless_road_core::{
    GenerationConfig, Lane, LaneTable, PrototypeId, SegmentId, Side, LANE_COUNT,
};
use glam::DVec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Candidate positions drawn per obstacle slot before the slot is skipped.
pub const OBSTACLE_ATTEMPTS: u32 = 30;

/// Fraction of the segment extent, on either side of its centre, obstacles may use.
pub const LONGITUDINAL_SPREAD: f64 = 0.4;

/// Largest yaw jitter applied to obstacles, in degrees either way.
pub const OBSTACLE_YAW_JITTER_DEGREES: f64 = 5.0;

/// Yaw applied to waypoints standing on the right side of the road.
pub const RIGHT_WAYPOINT_YAW_DEGREES: f64 = 180.0;

/// Geometry of the segment currently being populated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentFrame {
    /// Sequence number of the segment.
    pub id: SegmentId,
    /// Centre of the segment.
    pub origin: DVec3,
    /// Longitudinal length of the segment.
    pub extent: f64,
    /// Height of the drivable surface.
    pub surface_y: f64,
}

/// Prototype metadata needed to rest an entity on the segment surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PrototypeProfile {
    /// Prototype identifier.
    pub id: PrototypeId,
    /// Height of the prototype's lowest point relative to its origin.
    pub bottom_offset: f64,
}

impl PrototypeProfile {
    /// Height at which the prototype origin must sit so its lowest point touches `surface_y`.
    #[must_use]
    pub fn grounded_y(&self, surface_y: f64) -> f64 {
        surface_y - self.bottom_offset
    }
}

/// Lane-aligned obstacle position accepted by the solver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObstacleCandidate {
    /// Lane the candidate occupies.
    pub lane: Lane,
    /// Candidate position at the segment origin height.
    pub position: DVec3,
}

/// Waypoint position accepted by the solver, before ground correction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaypointCandidate {
    /// Side of the road the waypoint stands on.
    pub side: Side,
    /// Candidate position at the segment origin height.
    pub position: DVec3,
}

/// Constraints a candidate obstacle must respect.
#[derive(Clone, Copy, Debug, Default)]
pub struct Exclusions<'a> {
    observer: Option<DVec3>,
    waypoints: &'a [DVec3],
    obstacles: &'a [ObstacleCandidate],
}

impl<'a> Exclusions<'a> {
    /// Creates an exclusion set around the provided observer position.
    #[must_use]
    pub fn around(observer: Option<DVec3>) -> Self {
        Self {
            observer,
            waypoints: &[],
            obstacles: &[],
        }
    }

    /// Adds the waypoints obstacles must keep clear of.
    #[must_use]
    pub fn with_waypoints(mut self, waypoints: &'a [DVec3]) -> Self {
        self.waypoints = waypoints;
        self
    }

    /// Adds the obstacles already placed on the same segment.
    #[must_use]
    pub fn with_obstacles(mut self, obstacles: &'a [ObstacleCandidate]) -> Self {
        self.obstacles = obstacles;
        self
    }

    /// Observer position, if an observer is attached.
    #[must_use]
    pub const fn observer(&self) -> Option<DVec3> {
        self.observer
    }

    fn near_observer(&self, position: DVec3, radius: f64) -> bool {
        self.observer
            .map_or(false, |observer| position.distance(observer) < radius)
    }
}

/// Reasons an obstacle candidate fails the acceptance predicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// Closer to the observer than `obstacle_safe_distance`.
    NearObserver,
    /// Inside the clearance radius of a waypoint.
    NearWaypoint,
    /// Shares a lane with an obstacle less than `min_obstacle_spacing` away.
    SameLaneSpacing,
    /// Sits on another lane less than half of `min_obstacle_spacing` away.
    CrossLaneSpacing,
}

/// Acceptance predicate applied to every obstacle candidate.
pub fn check_obstacle(
    candidate: &ObstacleCandidate,
    exclusions: &Exclusions<'_>,
    config: &GenerationConfig,
) -> Result<(), Rejection> {
    if exclusions.near_observer(candidate.position, config.obstacle_safe_distance) {
        return Err(Rejection::NearObserver);
    }

    if exclusions
        .waypoints
        .iter()
        .any(|waypoint| candidate.position.distance(*waypoint) < config.waypoint_clearance)
    {
        return Err(Rejection::NearWaypoint);
    }

    for placed in exclusions.obstacles {
        let separation = (placed.position.x - candidate.position.x).abs();
        if placed.lane == candidate.lane {
            if separation < config.min_obstacle_spacing {
                return Err(Rejection::SameLaneSpacing);
            }
        } else if separation < config.min_obstacle_spacing * 0.5 {
            return Err(Rejection::CrossLaneSpacing);
        }
    }

    Ok(())
}

/// Obstacle ready to be instantiated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObstaclePlacement {
    /// Prototype chosen for the obstacle.
    pub prototype: PrototypeId,
    /// Lane the obstacle occupies.
    pub lane: Lane,
    /// Ground-corrected position.
    pub position: DVec3,
    /// Rotation around the vertical axis in degrees.
    pub yaw_degrees: f64,
}

/// Waypoint ready to be instantiated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaypointPlacement {
    /// Prototype used for the waypoint.
    pub prototype: PrototypeId,
    /// Side of the road the waypoint stands on.
    pub side: Side,
    /// Ground-corrected position.
    pub position: DVec3,
    /// Rotation around the vertical axis in degrees.
    pub yaw_degrees: f64,
}

/// Everything the solver decided for one segment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SegmentPlan {
    /// Waypoint placed on the segment, if any.
    pub waypoint: Option<WaypointPlacement>,
    /// Obstacles in placement order.
    pub obstacles: Vec<ObstaclePlacement>,
    /// Number of obstacle slots drawn before sampling.
    pub requested_obstacles: u32,
}

/// Inputs describing the segment a plan is requested for.
#[derive(Clone, Copy, Debug)]
pub struct SegmentRequest<'a> {
    /// Segment being populated.
    pub frame: SegmentFrame,
    /// Lane offsets in force.
    pub lanes: &'a LaneTable,
    /// Tuning in force.
    pub config: &'a GenerationConfig,
    /// Observer position, if an observer is attached.
    pub observer: Option<DVec3>,
    /// Positions of waypoints already active in the window.
    pub active_waypoints: &'a [DVec3],
    /// Side of the most recently placed waypoint.
    pub last_side: Side,
    /// Prototypes obstacles are drawn from.
    pub obstacle_prototypes: &'a [PrototypeProfile],
    /// Prototype used for waypoints, if configured.
    pub waypoint_prototype: Option<PrototypeProfile>,
}

/// Seeded rejection sampler shared by every segment the world generates.
#[derive(Debug)]
pub struct PlacementSolver {
    rng: ChaCha8Rng,
    last_attempts: u32,
}

impl PlacementSolver {
    /// Creates a solver whose draws are fully determined by `seed`.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            last_attempts: 0,
        }
    }

    /// Number of candidates drawn by the most recent [`Self::place_obstacle`] call.
    #[must_use]
    pub const fn last_attempts(&self) -> u32 {
        self.last_attempts
    }

    /// Draws how many obstacle slots a segment receives, uniformly in `[1, max]`.
    pub fn obstacle_count(&mut self, config: &GenerationConfig) -> u32 {
        match config.max_obstacles_per_segment {
            0 => 0,
            max => self.rng.gen_range(1..=max),
        }
    }

    /// Searches for an obstacle position satisfying every exclusion.
    ///
    /// Candidates sit at the segment origin height. Returns `None` once
    /// [`OBSTACLE_ATTEMPTS`] candidates were rejected.
    pub fn place_obstacle(
        &mut self,
        frame: &SegmentFrame,
        lanes: &LaneTable,
        config: &GenerationConfig,
        exclusions: &Exclusions<'_>,
    ) -> Option<ObstacleCandidate> {
        self.sample_obstacle(frame, frame.origin.y, lanes, config, exclusions)
    }

    fn sample_obstacle(
        &mut self,
        frame: &SegmentFrame,
        height: f64,
        lanes: &LaneTable,
        config: &GenerationConfig,
        exclusions: &Exclusions<'_>,
    ) -> Option<ObstacleCandidate> {
        let spread = longitudinal_spread(frame.extent);
        self.last_attempts = 0;

        for _ in 0..OBSTACLE_ATTEMPTS {
            self.last_attempts += 1;
            let lane = Lane::ALL[self.rng.gen_range(0..LANE_COUNT)];
            let offset = self.rng.gen_range(-spread..=spread);
            let candidate = ObstacleCandidate {
                lane,
                position: DVec3::new(
                    frame.origin.x + offset,
                    height,
                    frame.origin.z + lanes.offset(lane),
                ),
            };

            if check_obstacle(&candidate, exclusions, config).is_ok() {
                return Some(candidate);
            }
        }

        tracing::trace!(
            segment = frame.id.get(),
            attempts = OBSTACLE_ATTEMPTS,
            "obstacle slot exhausted its attempts"
        );
        None
    }

    /// Decides whether the segment receives a waypoint and where.
    ///
    /// Only segments whose sequence number is a multiple of the configured
    /// interval qualify. A segment too close to the observer is refused
    /// outright and the alternation state is left untouched.
    #[must_use]
    pub fn place_waypoint(
        &self,
        frame: &SegmentFrame,
        last_side: Side,
        config: &GenerationConfig,
        exclusions: &Exclusions<'_>,
    ) -> Option<WaypointCandidate> {
        let interval = config.waypoint_interval.max(1);
        if frame.id.get() % interval != 0 {
            return None;
        }

        if exclusions.near_observer(frame.origin, config.waypoint_safe_distance) {
            return None;
        }

        let side = last_side.opposite();
        let lateral = side.lateral_sign() * config.waypoint_lateral_offset;
        Some(WaypointCandidate {
            side,
            position: DVec3::new(frame.origin.x, frame.origin.y, frame.origin.z + lateral),
        })
    }

    /// Produces the waypoint and obstacles for one segment.
    ///
    /// The waypoint is decided first so obstacles can keep clear of it.
    pub fn plan_segment(&mut self, request: &SegmentRequest<'_>) -> SegmentPlan {
        let frame = request.frame;
        let mut plan = SegmentPlan::default();
        let mut waypoints = request.active_waypoints.to_vec();

        if let Some(profile) = request.waypoint_prototype {
            let exclusions = Exclusions::around(request.observer);
            if let Some(candidate) =
                self.place_waypoint(&frame, request.last_side, request.config, &exclusions)
            {
                let position = DVec3::new(
                    candidate.position.x,
                    profile.grounded_y(frame.surface_y),
                    candidate.position.z,
                );
                waypoints.push(position);
                plan.waypoint = Some(WaypointPlacement {
                    prototype: profile.id,
                    side: candidate.side,
                    position,
                    yaw_degrees: waypoint_yaw(candidate.side),
                });
            }
        }

        if request.obstacle_prototypes.is_empty() {
            return plan;
        }

        let segment_exclusions = Exclusions::around(request.observer);
        if segment_exclusions.near_observer(frame.origin, request.config.obstacle_safe_distance) {
            return plan;
        }

        plan.requested_obstacles = self.obstacle_count(request.config);
        let mut placed: Vec<ObstacleCandidate> =
            Vec::with_capacity(plan.requested_obstacles as usize);

        for _ in 0..plan.requested_obstacles {
            // Candidates are checked at the grounded height of the drawn prototype.
            let profile =
                request.obstacle_prototypes[self.rng.gen_range(0..request.obstacle_prototypes.len())];
            let exclusions = Exclusions::around(request.observer)
                .with_waypoints(&waypoints)
                .with_obstacles(&placed);
            let Some(candidate) = self.sample_obstacle(
                &frame,
                profile.grounded_y(frame.surface_y),
                request.lanes,
                request.config,
                &exclusions,
            ) else {
                continue;
            };

            placed.push(candidate);
            let yaw_degrees = self
                .rng
                .gen_range(-OBSTACLE_YAW_JITTER_DEGREES..=OBSTACLE_YAW_JITTER_DEGREES);
            plan.obstacles.push(ObstaclePlacement {
                prototype: profile.id,
                lane: candidate.lane,
                position: candidate.position,
                yaw_degrees,
            });
        }

        plan
    }
}

fn longitudinal_spread(extent: f64) -> f64 {
    let spread = (extent * LONGITUDINAL_SPREAD).abs();
    if spread.is_finite() {
        spread
    } else {
        0.0
    }
}

fn waypoint_yaw(side: Side) -> f64 {
    match side {
        Side::Left => 0.0,
        Side::Right => RIGHT_WAYPOINT_YAW_DEGREES,
    }
}
