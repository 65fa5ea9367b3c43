//! Bounded FIFO of active segments and the entities they own.

use std::collections::VecDeque;

use endless_road_core::{
    Event, GenerationConfig, LaneTable, ObstacleId, ObstacleSnapshot, SegmentId,
    SegmentSnapshot, Side, SkipReason, WaypointId, WaypointSnapshot,
};
use endless_road_system_placement::{PlacementSolver, SegmentFrame, SegmentRequest};
use glam::DVec3;

use crate::geometry::GeometryCache;

/// Active segments ordered from oldest to newest.
#[derive(Debug)]
pub(crate) struct SegmentWindow {
    records: VecDeque<SegmentSnapshot>,
    next_sequence: u64,
    next_obstacle: u64,
    next_waypoint: u64,
    last_side: Side,
}

/// Collaborators consulted while a segment is appended.
pub(crate) struct AdvanceContext<'a> {
    pub(crate) observer: Option<DVec3>,
    pub(crate) config: &'a GenerationConfig,
    pub(crate) lanes: &'a LaneTable,
    pub(crate) geometry: &'a GeometryCache,
    pub(crate) solver: &'a mut PlacementSolver,
}

impl SegmentWindow {
    pub(crate) fn new() -> Self {
        Self {
            records: VecDeque::new(),
            next_sequence: 1,
            next_obstacle: 0,
            next_waypoint: 0,
            // the first waypoint ever placed lands on the left
            last_side: Side::Right,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn segments(&self) -> impl Iterator<Item = &SegmentSnapshot> {
        self.records.iter()
    }

    /// Far edge of the newest segment.
    pub(crate) fn leading_edge(&self) -> Option<f64> {
        self.records.back().map(|record| record.trailing_edge)
    }

    /// Appends one populated segment, then evicts the oldest segments while
    /// the window exceeds its capacity.
    ///
    /// Returns the new segment's sequence number, or `None` when no segment
    /// prototype is configured.
    pub(crate) fn advance(
        &mut self,
        context: AdvanceContext<'_>,
        out_events: &mut Vec<Event>,
    ) -> Option<SegmentId> {
        let config = context.config;
        let Some((prototype, footprint)) = context.geometry.segment(config.fallback_scale) else {
            tracing::debug!("no segment prototype configured, skipping advance");
            out_events.push(Event::AdvanceSkipped {
                reason: SkipReason::MissingSegmentPrototype,
            });
            return None;
        };

        let origin = match self.records.back() {
            Some(previous) => DVec3::new(
                previous.trailing_edge + footprint.extent() * 0.5,
                previous.origin.y,
                previous.origin.z,
            ),
            None => config.origin,
        };
        let (extent, surface_y, _) = footprint.extent_and_surface(origin);
        let id = SegmentId::new(self.next_sequence);
        self.next_sequence += 1;

        out_events.push(Event::SegmentSpawned {
            segment: id,
            prototype,
            origin,
            extent,
            surface_y,
        });
        tracing::debug!(segment = id.get(), x = origin.x, extent, "segment spawned");

        let active_waypoints: Vec<DVec3> = self
            .records
            .iter()
            .filter_map(|record| record.waypoint.map(|waypoint| waypoint.position))
            .collect();
        let plan = context.solver.plan_segment(&SegmentRequest {
            frame: SegmentFrame {
                id,
                origin,
                extent,
                surface_y,
            },
            lanes: context.lanes,
            config,
            observer: context.observer,
            active_waypoints: &active_waypoints,
            last_side: self.last_side,
            obstacle_prototypes: context.geometry.obstacles(),
            waypoint_prototype: context.geometry.waypoint(),
        });

        let waypoint = plan.waypoint.map(|placement| {
            let waypoint = WaypointSnapshot {
                id: WaypointId::new(self.next_waypoint),
                segment: id,
                side: placement.side,
                position: placement.position,
                yaw_degrees: placement.yaw_degrees,
            };
            self.next_waypoint += 1;
            self.last_side = placement.side;
            out_events.push(Event::WaypointSpawned {
                waypoint: waypoint.id,
                segment: id,
                side: waypoint.side,
                position: waypoint.position,
                yaw_degrees: waypoint.yaw_degrees,
            });
            tracing::info!(
                segment = id.get(),
                side = waypoint.side.label(),
                "waypoint placed"
            );
            waypoint
        });

        let mut obstacles = Vec::with_capacity(plan.obstacles.len());
        for placement in plan.obstacles {
            let obstacle = ObstacleSnapshot {
                id: ObstacleId::new(self.next_obstacle),
                segment: id,
                prototype: placement.prototype,
                lane: placement.lane,
                position: placement.position,
                yaw_degrees: placement.yaw_degrees,
            };
            self.next_obstacle += 1;
            out_events.push(Event::ObstacleSpawned {
                obstacle: obstacle.id,
                segment: id,
                prototype: obstacle.prototype,
                lane: obstacle.lane,
                position: obstacle.position,
                yaw_degrees: obstacle.yaw_degrees,
            });
            obstacles.push(obstacle);
        }
        if obstacles.len() as u32 != plan.requested_obstacles {
            tracing::debug!(
                segment = id.get(),
                requested = plan.requested_obstacles,
                placed = obstacles.len(),
                "some obstacle slots were skipped"
            );
        }

        self.records.push_back(SegmentSnapshot {
            id,
            prototype,
            origin,
            extent,
            surface_y,
            trailing_edge: footprint.trailing_edge(origin),
            waypoint,
            obstacles,
        });

        self.trim(config.max_active_segments, out_events);
        Some(id)
    }

    /// Evicts the oldest segments until at most `capacity` remain.
    pub(crate) fn trim(&mut self, capacity: usize, out_events: &mut Vec<Event>) {
        while self.records.len() > capacity {
            self.evict_oldest(out_events);
        }
    }

    fn evict_oldest(&mut self, out_events: &mut Vec<Event>) {
        let Some(record) = self.records.pop_front() else {
            return;
        };

        for obstacle in &record.obstacles {
            out_events.push(Event::ObstacleDespawned {
                obstacle: obstacle.id,
                segment: record.id,
                position: obstacle.position,
            });
        }
        if let Some(waypoint) = record.waypoint {
            out_events.push(Event::WaypointDespawned {
                waypoint: waypoint.id,
                segment: record.id,
                position: waypoint.position,
            });
            tracing::debug!(segment = record.id.get(), "waypoint removed with its segment");
        }
        out_events.push(Event::SegmentEvicted {
            segment: record.id,
            origin: record.origin,
        });
        tracing::debug!(
            segment = record.id.get(),
            obstacles = record.obstacles.len(),
            "segment evicted"
        );
    }
}
