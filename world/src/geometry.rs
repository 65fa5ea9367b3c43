//! Prototype geometry resolved once when the world is created.

use endless_road_core::{
    Footprint, GeometryProvider, PrototypeId, PrototypeSet, FALLBACK_SEGMENT_EXTENT,
};
use endless_road_system_placement::PrototypeProfile;

/// Segment prototype together with the bounds measured for it.
#[derive(Clone, Copy, Debug)]
struct SegmentPrototype {
    id: PrototypeId,
    measured: Option<Footprint>,
}

/// Cached geometry metadata for every prototype the world instantiates.
#[derive(Clone, Debug)]
pub(crate) struct GeometryCache {
    segment: Option<SegmentPrototype>,
    obstacles: Vec<PrototypeProfile>,
    waypoint: Option<PrototypeProfile>,
}

impl GeometryCache {
    /// Queries the provider once per prototype and keeps the answers.
    pub(crate) fn resolve(prototypes: &PrototypeSet, provider: &dyn GeometryProvider) -> Self {
        let segment = prototypes.segment().map(|id| SegmentPrototype {
            id,
            measured: measure(provider, id),
        });
        let obstacles = prototypes
            .obstacles()
            .iter()
            .map(|&id| profile(provider, id))
            .collect();
        let waypoint = prototypes.waypoint().map(|id| profile(provider, id));

        Self {
            segment,
            obstacles,
            waypoint,
        }
    }

    /// Segment prototype and the footprint used to place its instances.
    ///
    /// Unmeasured prototypes fall back to a flat footprint of the nominal
    /// extent scaled by `fallback_scale`, which rests the surface on the
    /// instance origin.
    pub(crate) fn segment(&self, fallback_scale: f64) -> Option<(PrototypeId, Footprint)> {
        self.segment.map(|segment| {
            let footprint = segment
                .measured
                .unwrap_or_else(|| Footprint::nominal(FALLBACK_SEGMENT_EXTENT * fallback_scale));
            (segment.id, footprint)
        })
    }

    /// Nominal segment extent used for the generation trigger.
    pub(crate) fn nominal_extent(&self, fallback_scale: f64) -> f64 {
        self.segment(fallback_scale)
            .map_or(FALLBACK_SEGMENT_EXTENT * fallback_scale, |(_, footprint)| {
                footprint.extent()
            })
    }

    pub(crate) fn obstacles(&self) -> &[PrototypeProfile] {
        &self.obstacles
    }

    pub(crate) fn waypoint(&self) -> Option<PrototypeProfile> {
        self.waypoint
    }
}

fn measure(provider: &dyn GeometryProvider, id: PrototypeId) -> Option<Footprint> {
    match provider.footprint(id) {
        Some(footprint) if !footprint.is_degenerate() => Some(footprint),
        Some(footprint) => {
            tracing::warn!(
                prototype = id.get(),
                ?footprint,
                "degenerate prototype bounds, using nominal geometry"
            );
            None
        }
        None => {
            tracing::warn!(
                prototype = id.get(),
                "prototype geometry unavailable, using nominal geometry"
            );
            None
        }
    }
}

fn profile(provider: &dyn GeometryProvider, id: PrototypeId) -> PrototypeProfile {
    let bottom_offset = measure(provider, id).map_or(0.0, |footprint| footprint.bottom_offset());
    PrototypeProfile { id, bottom_offset }
}
