use std::collections::BTreeSet;

use endless_road_core::{
    Command, ConfigError, EntityId, Event, Footprint, GenerationConfig, LifecyclePhase,
    PrototypeId, PrototypeSet, SegmentId, Side, SkipReason, StaticGeometry,
};
use endless_road_world::{apply, query, World};
use glam::DVec3;

const ROAD: PrototypeId = PrototypeId::new(1);
const CONE: PrototypeId = PrototypeId::new(2);
const BARRIER: PrototypeId = PrototypeId::new(3);
const BUS_STOP: PrototypeId = PrototypeId::new(4);

fn geometry() -> StaticGeometry {
    StaticGeometry::new()
        .with(
            ROAD,
            Footprint::from_bounds(DVec3::new(-5.0, -0.5, -4.0), DVec3::new(5.0, 0.5, 4.0)),
        )
        .with(
            CONE,
            Footprint::from_bounds(DVec3::new(-0.3, -0.25, -0.3), DVec3::new(0.3, 0.5, 0.3)),
        )
        .with(
            BARRIER,
            Footprint::from_bounds(DVec3::new(-1.0, 0.0, -0.2), DVec3::new(1.0, 1.0, 0.2)),
        )
        .with(
            BUS_STOP,
            Footprint::from_bounds(DVec3::new(-2.0, -0.25, -0.5), DVec3::new(2.0, 3.0, 0.5)),
        )
}

fn full_prototypes() -> PrototypeSet {
    PrototypeSet::new()
        .with_segment(ROAD)
        .with_obstacles(vec![CONE, BARRIER])
        .with_waypoint(BUS_STOP)
}

fn world_with(config: GenerationConfig) -> World {
    World::new(config, full_prototypes(), &geometry()).expect("valid configuration")
}

fn advance_times(world: &mut World, count: usize) -> Vec<Event> {
    let mut events = Vec::new();
    for _ in 0..count {
        apply(world, Command::AdvanceWindow, &mut events);
    }
    events
}

fn segment_ids(world: &World) -> Vec<u64> {
    query::segments(world).map(|segment| segment.id.get()).collect()
}

#[test]
fn window_never_exceeds_capacity() {
    let mut world = world_with(GenerationConfig::default());
    for advanced in 1..=20usize {
        let _ = advance_times(&mut world, 1);
        assert_eq!(query::segments(&world).count(), advanced.min(3));
    }
}

#[test]
fn segments_are_contiguous() {
    let mut world = world_with(GenerationConfig {
        max_active_segments: 8,
        origin: DVec3::new(2.0, 1.0, -3.0),
        ..GenerationConfig::default()
    });
    let _ = advance_times(&mut world, 8);

    let segments: Vec<_> = query::segments(&world).cloned().collect();
    assert_eq!(segments[0].origin, DVec3::new(2.0, 1.0, -3.0));
    for pair in segments.windows(2) {
        let (previous, next) = (&pair[0], &pair[1]);
        let near_edge = next.origin.x - next.extent * 0.5;
        assert!((near_edge - previous.trailing_edge).abs() < 1e-9);
        assert_eq!(next.origin.y, previous.origin.y);
        assert_eq!(next.origin.z, previous.origin.z);
        assert_eq!(next.surface_y, 1.5);
    }
    assert_eq!(query::leading_edge(&world), Some(segments[7].trailing_edge));
}

#[test]
fn eviction_removes_the_oldest_segment_first() {
    let mut world = world_with(GenerationConfig::default());
    let events = advance_times(&mut world, 7);

    let evicted: Vec<u64> = events
        .iter()
        .filter_map(|event| match event {
            Event::SegmentEvicted { segment, .. } => Some(segment.get()),
            _ => None,
        })
        .collect();
    assert_eq!(evicted, vec![1, 2, 3, 4]);
    assert_eq!(segment_ids(&world), vec![5, 6, 7]);
}

#[test]
fn twelve_advances_alternate_two_waypoints() {
    let mut world = world_with(GenerationConfig {
        max_active_segments: 3,
        waypoint_interval: 5,
        ..GenerationConfig::default()
    });
    let events = advance_times(&mut world, 12);

    let placed: Vec<(u64, Side)> = events
        .iter()
        .filter_map(|event| match event {
            Event::WaypointSpawned { segment, side, .. } => Some((segment.get(), *side)),
            _ => None,
        })
        .collect();
    assert_eq!(placed, vec![(5, Side::Left), (10, Side::Right)]);
    assert_eq!(segment_ids(&world), vec![10, 11, 12]);
    assert_eq!(query::summary(&world).active_waypoints, 1);
}

#[test]
fn every_destroyed_entity_was_created_first() {
    let mut world = world_with(GenerationConfig {
        waypoint_interval: 2,
        ..GenerationConfig::default()
    });
    let events = advance_times(&mut world, 15);

    let mut alive: BTreeSet<EntityId> = BTreeSet::new();
    let mut destroyed = 0;
    for record in events.iter().filter_map(Event::lifecycle_record) {
        match record.phase {
            LifecyclePhase::Created => assert!(alive.insert(record.entity)),
            LifecyclePhase::Destroyed => {
                assert!(alive.remove(&record.entity), "{record:?} was never created");
                destroyed += 1;
            }
        }
    }
    assert!(destroyed > 0);

    let summary = query::summary(&world);
    let segments = alive
        .iter()
        .filter(|entity| matches!(entity, EntityId::Segment(_)))
        .count();
    let obstacles = alive
        .iter()
        .filter(|entity| matches!(entity, EntityId::Obstacle(_)))
        .count();
    assert_eq!(segments, summary.active_segments);
    assert_eq!(obstacles, summary.active_obstacles);
}

#[test]
fn owned_entities_leave_before_their_segment() {
    let mut world = world_with(GenerationConfig {
        max_active_segments: 1,
        waypoint_interval: 1,
        ..GenerationConfig::default()
    });
    let _ = advance_times(&mut world, 1);
    let owned = query::segments(&world)
        .next()
        .map(|segment| segment.obstacles.len())
        .expect("segment present");

    let events = advance_times(&mut world, 1);
    let eviction = events
        .iter()
        .position(|event| matches!(event, Event::SegmentEvicted { segment, .. } if segment.get() == 1))
        .expect("first segment evicted");
    let released: Vec<&Event> = events[..eviction]
        .iter()
        .filter(|event| {
            matches!(
                event,
                Event::ObstacleDespawned { segment, .. } | Event::WaypointDespawned { segment, .. }
                    if segment.get() == 1
            )
        })
        .collect();

    assert_eq!(released.len(), owned + 1);
    assert!(matches!(
        released.last(),
        Some(Event::WaypointDespawned { .. })
    ));
}

#[test]
fn missing_segment_prototype_skips_the_advance() {
    let mut world = World::new(
        GenerationConfig::default(),
        PrototypeSet::new().with_obstacles(vec![CONE]),
        &geometry(),
    )
    .expect("valid configuration");
    let mut events = Vec::new();

    apply(&mut world, Command::AdvanceWindow, &mut events);
    apply(&mut world, Command::PrimeWindow, &mut events);

    assert_eq!(
        events,
        vec![
            Event::AdvanceSkipped {
                reason: SkipReason::MissingSegmentPrototype
            },
            Event::AdvanceSkipped {
                reason: SkipReason::MissingSegmentPrototype
            },
        ]
    );
    assert_eq!(query::leading_edge(&world), None);
}

#[test]
fn unmeasured_segment_falls_back_to_scaled_extent() {
    let config = GenerationConfig {
        fallback_scale: 2.0,
        origin: DVec3::new(0.0, 4.0, 0.0),
        ..GenerationConfig::default()
    };
    let mut world = World::new(
        config,
        PrototypeSet::new().with_segment(ROAD),
        &StaticGeometry::new(),
    )
    .expect("valid configuration");
    let _ = advance_times(&mut world, 2);

    let segments: Vec<_> = query::segments(&world).cloned().collect();
    assert_eq!(segments[0].extent, 20.0);
    assert_eq!(segments[0].surface_y, 4.0);
    assert_eq!(segments[1].origin.x, 20.0);
    assert_eq!(query::trigger_distance(&world), 30.0);
}

#[test]
fn refused_waypoint_keeps_the_alternation() {
    let config = GenerationConfig {
        max_active_segments: 10,
        waypoint_interval: 1,
        ..GenerationConfig::default()
    };
    let mut world = World::new(
        config,
        PrototypeSet::new().with_segment(ROAD).with_waypoint(BUS_STOP),
        &geometry(),
    )
    .expect("valid configuration");
    let mut events = Vec::new();
    apply(
        &mut world,
        Command::MoveObserver {
            position: DVec3::new(10.0, 0.0, 0.0),
        },
        &mut events,
    );
    events.extend(advance_times(&mut world, 3));

    let placed: Vec<(u64, Side)> = events
        .iter()
        .filter_map(|event| match event {
            Event::WaypointSpawned { segment, side, .. } => Some((segment.get(), *side)),
            _ => None,
        })
        .collect();
    assert_eq!(placed, vec![(1, Side::Left), (3, Side::Right)]);
}

#[test]
fn waypoint_sits_on_the_surface_facing_the_road() {
    let mut world = world_with(GenerationConfig {
        waypoint_interval: 1,
        ..GenerationConfig::default()
    });
    let _ = advance_times(&mut world, 2);

    let waypoints: Vec<_> = query::segments(&world)
        .filter_map(|segment| segment.waypoint)
        .collect();
    assert_eq!(waypoints[0].position, DVec3::new(0.0, 0.75, -2.5));
    assert_eq!(waypoints[0].yaw_degrees, 0.0);
    assert_eq!(waypoints[1].position, DVec3::new(10.0, 0.75, 2.5));
    assert_eq!(waypoints[1].yaw_degrees, 180.0);
}

#[test]
fn obstacles_rest_on_the_segment_surface() {
    let mut world = world_with(GenerationConfig {
        max_active_segments: 6,
        ..GenerationConfig::default()
    });
    let _ = advance_times(&mut world, 6);

    let mut seen = 0;
    for segment in query::segments(&world) {
        for obstacle in &segment.obstacles {
            let expected = match obstacle.prototype {
                CONE => 0.75,
                BARRIER => 0.5,
                other => panic!("unexpected obstacle prototype {other:?}"),
            };
            assert!((obstacle.position.y - expected).abs() < 1e-12);
            assert_eq!(obstacle.segment, segment.id);
            seen += 1;
        }
    }
    assert!(seen > 0);
}

#[test]
fn obstacles_keep_clear_of_earlier_waypoints_still_in_the_window() {
    let config = GenerationConfig {
        waypoint_clearance: 9.0,
        ..GenerationConfig::default()
    };

    let mut placed = 0;
    for seed in 0..64 {
        let mut world = world_with(GenerationConfig {
            seed,
            ..config.clone()
        });
        let _ = advance_times(&mut world, 6);
        assert_eq!(segment_ids(&world), vec![4, 5, 6]);

        let segments: Vec<_> = query::segments(&world).cloned().collect();
        let waypoint = segments[1].waypoint.expect("segment 5 holds a waypoint");
        assert_eq!(waypoint.position, DVec3::new(40.0, 0.75, -2.5));
        assert!(segments[2].waypoint.is_none());

        for obstacle in &segments[2].obstacles {
            assert!(
                obstacle.position.distance(waypoint.position) >= config.waypoint_clearance,
                "seed {seed} placed {obstacle:?} inside the clearance of segment 5's waypoint"
            );
        }
        placed += segments[2].obstacles.len();
    }
    assert!(placed > 0);
}

#[test]
fn difficulty_is_clamped_and_confirmed() {
    let mut world = world_with(GenerationConfig::default());
    let mut events = Vec::new();

    apply(
        &mut world,
        Command::SetDifficulty {
            max_obstacles: 12,
            safe_distance: -3.0,
        },
        &mut events,
    );

    assert_eq!(events, vec![Event::ConfigurationChanged]);
    assert_eq!(query::config(&world).max_obstacles_per_segment, 3);
    assert_eq!(query::config(&world).obstacle_safe_distance, 0.0);
}

#[test]
fn waypoint_setters_clamp_their_inputs() {
    let mut world = world_with(GenerationConfig::default());
    let mut events = Vec::new();

    apply(&mut world, Command::SetWaypointInterval { interval: 0 }, &mut events);
    apply(&mut world, Command::SetWaypointOffset { offset: -1.0 }, &mut events);
    apply(
        &mut world,
        Command::SetWaypointClearance { distance: 7.5 },
        &mut events,
    );

    let config = query::config(&world);
    assert_eq!(config.waypoint_interval, 1);
    assert_eq!(config.waypoint_lateral_offset, 0.0);
    assert_eq!(config.waypoint_clearance, 7.5);
    assert_eq!(events.len(), 3);
}

#[test]
fn invalid_configuration_is_rejected_without_side_effects() {
    let mut world = world_with(GenerationConfig::default());
    let mut events = Vec::new();
    let config = GenerationConfig {
        lane_width: f64::NAN,
        ..GenerationConfig::default()
    };

    apply(&mut world, Command::Configure { config }, &mut events);

    assert!(matches!(
        events.as_slice(),
        [Event::ConfigurationRejected {
            reason: ConfigError::InvalidDistance {
                field: "lane_width",
                ..
            }
        }]
    ));
    assert_eq!(query::config(&world), &GenerationConfig::default());
}

#[test]
fn oversized_capacity_is_rejected_and_priming_stays_bounded() {
    let mut world = world_with(GenerationConfig::default());
    let mut events = Vec::new();
    let config = GenerationConfig {
        max_active_segments: usize::MAX,
        ..GenerationConfig::default()
    };

    apply(&mut world, Command::Configure { config }, &mut events);
    assert_eq!(
        events,
        vec![Event::ConfigurationRejected {
            reason: ConfigError::CapacityTooLarge { value: usize::MAX }
        }]
    );

    events.clear();
    apply(&mut world, Command::PrimeWindow, &mut events);
    assert_eq!(segment_ids(&world), vec![1, 2, 3]);

    let oversized = World::new(
        GenerationConfig {
            max_active_segments: usize::MAX,
            ..GenerationConfig::default()
        },
        full_prototypes(),
        &geometry(),
    );
    assert!(matches!(
        oversized,
        Err(ConfigError::CapacityTooLarge { .. })
    ));
}

#[test]
fn lowering_capacity_evicts_down_to_the_new_bound() {
    let mut world = world_with(GenerationConfig {
        max_active_segments: 5,
        ..GenerationConfig::default()
    });
    let mut events = Vec::new();
    apply(&mut world, Command::PrimeWindow, &mut events);
    assert_eq!(segment_ids(&world), vec![1, 2, 3, 4, 5]);

    events.clear();
    let config = GenerationConfig {
        max_active_segments: 2,
        ..query::config(&world).clone()
    };
    apply(&mut world, Command::Configure { config }, &mut events);

    let evicted: Vec<SegmentId> = events
        .iter()
        .filter_map(|event| match event {
            Event::SegmentEvicted { segment, .. } => Some(*segment),
            _ => None,
        })
        .collect();
    assert_eq!(
        evicted,
        vec![SegmentId::new(1), SegmentId::new(2), SegmentId::new(3)]
    );
    assert_eq!(events[0], Event::ConfigurationChanged);
    assert_eq!(segment_ids(&world), vec![4, 5]);
}

#[test]
fn identical_seeds_replay_identical_events() {
    let run = || {
        let mut world = world_with(GenerationConfig {
            seed: 0xabcd,
            waypoint_interval: 3,
            ..GenerationConfig::default()
        });
        let mut events = Vec::new();
        apply(&mut world, Command::PrimeWindow, &mut events);
        for step in 0..20 {
            apply(
                &mut world,
                Command::MoveObserver {
                    position: DVec3::new(step as f64 * 2.5, 0.0, 0.0),
                },
                &mut events,
            );
            apply(&mut world, Command::AdvanceWindow, &mut events);
        }
        events
    };

    assert_eq!(run(), run());
}
