//! Tuning surface consumed by the world and the placement solver.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest obstacle count accepted through [`GenerationConfig::set_difficulty`],
/// one per lane.
pub const MAX_DIFFICULTY_OBSTACLES: u32 = 3;

/// Largest window capacity [`GenerationConfig::validate`] accepts.
pub const MAX_ACTIVE_SEGMENTS: usize = 1024;

/// Aggregated tuning knobs controlling segment, obstacle and waypoint generation.
///
/// Runtime changes only influence future placements; entities already spawned
/// keep the positions they were created with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Number of segments the window keeps alive before evicting the oldest.
    pub max_active_segments: usize,
    /// Upper bound of the uniform obstacle count drawn for every segment.
    pub max_obstacles_per_segment: u32,
    /// Minimum distance between the observer and any newly placed obstacle.
    pub obstacle_safe_distance: f64,
    /// Longitudinal separation required between obstacles sharing a lane.
    ///
    /// Obstacles on different lanes need half of this separation.
    pub min_obstacle_spacing: f64,
    /// Waypoints are attempted on every segment whose sequence number is a multiple of this.
    pub waypoint_interval: u64,
    /// Lateral distance between the segment centre line and a waypoint.
    pub waypoint_lateral_offset: f64,
    /// Minimum distance between the observer and a segment receiving a waypoint.
    pub waypoint_safe_distance: f64,
    /// Radius around every active waypoint that obstacles must keep clear.
    pub waypoint_clearance: f64,
    /// Width used to derive the three lane offsets.
    pub lane_width: f64,
    /// Origin of the very first segment.
    pub origin: DVec3,
    /// Scale applied to the nominal extent when segment geometry is unavailable.
    pub fallback_scale: f64,
    /// Seed for the placement random number generator.
    pub seed: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_active_segments: 3,
            max_obstacles_per_segment: 8,
            obstacle_safe_distance: 6.0,
            min_obstacle_spacing: 6.0,
            waypoint_interval: 5,
            waypoint_lateral_offset: 2.5,
            waypoint_safe_distance: 10.0,
            waypoint_clearance: 5.0,
            lane_width: 3.0,
            origin: DVec3::ZERO,
            fallback_scale: 1.0,
            seed: 0x7f4a_7c15_9e37_79b9,
        }
    }
}

impl GenerationConfig {
    /// Verifies that every knob holds a value the generator can honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_active_segments == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.max_active_segments > MAX_ACTIVE_SEGMENTS {
            return Err(ConfigError::CapacityTooLarge {
                value: self.max_active_segments,
            });
        }
        if self.waypoint_interval == 0 {
            return Err(ConfigError::ZeroWaypointInterval);
        }

        let distances = [
            ("obstacle_safe_distance", self.obstacle_safe_distance),
            ("min_obstacle_spacing", self.min_obstacle_spacing),
            ("waypoint_lateral_offset", self.waypoint_lateral_offset),
            ("waypoint_safe_distance", self.waypoint_safe_distance),
            ("waypoint_clearance", self.waypoint_clearance),
            ("lane_width", self.lane_width),
        ];
        for (field, value) in distances {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidDistance { field, value });
            }
        }

        if !self.fallback_scale.is_finite() || self.fallback_scale <= 0.0 {
            return Err(ConfigError::InvalidFallbackScale {
                value: self.fallback_scale,
            });
        }
        if !self.origin.is_finite() {
            return Err(ConfigError::NonFiniteOrigin);
        }

        Ok(())
    }

    /// Adjusts obstacle density and observer clearance, clamping both into range.
    pub fn set_difficulty(&mut self, max_obstacles: u32, safe_distance: f64) {
        self.max_obstacles_per_segment = max_obstacles.min(MAX_DIFFICULTY_OBSTACLES);
        self.obstacle_safe_distance = clamp_distance(safe_distance);
    }

    /// Changes the waypoint cadence. Intervals below one segment are raised to one.
    pub fn set_waypoint_interval(&mut self, interval: u64) {
        self.waypoint_interval = interval.max(1);
    }

    /// Changes the lateral waypoint offset. Negative values collapse to zero.
    pub fn set_waypoint_offset(&mut self, offset: f64) {
        self.waypoint_lateral_offset = clamp_distance(offset);
    }

    /// Changes the clearance kept around waypoints. Negative values collapse to zero.
    pub fn set_waypoint_clearance(&mut self, distance: f64) {
        self.waypoint_clearance = clamp_distance(distance);
    }
}

fn clamp_distance(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

/// Reasons a [`GenerationConfig`] may be rejected.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// The window must retain at least one segment.
    #[error("max_active_segments must be at least 1")]
    ZeroCapacity,
    /// The window capacity exceeds [`MAX_ACTIVE_SEGMENTS`].
    #[error("max_active_segments must not exceed {MAX_ACTIVE_SEGMENTS}, got {value}")]
    CapacityTooLarge {
        /// Rejected capacity.
        value: usize,
    },
    /// Waypoints are placed on multiples of the interval, so zero is meaningless.
    #[error("waypoint_interval must be at least 1")]
    ZeroWaypointInterval,
    /// A distance knob was negative or not finite.
    #[error("{field} must be a finite, non-negative distance (got {value})")]
    InvalidDistance {
        /// Name of the offending field.
        field: &'static str,
        /// Value that failed validation.
        value: f64,
    },
    /// The fallback scale must be a finite positive factor.
    #[error("fallback_scale must be finite and positive (got {value})")]
    InvalidFallbackScale {
        /// Value that failed validation.
        value: f64,
    },
    /// The window origin contained NaN or infinite components.
    #[error("origin must have finite components")]
    NonFiniteOrigin,
}
