//! Static track collider builder.

use podracer_core::prelude::*;
use tracing::{debug, warn};

use crate::backend::CollisionWorld;

/// Collider ids of a built track, by surface role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackColliders {
    pub ground: Vec<ColliderId>,
    pub hazard: Vec<ColliderId>,
    pub lap_boundary: Vec<ColliderId>,
    /// Meshes that were rejected and left out of the world.
    pub skipped: usize,
}

impl TrackColliders {
    pub fn len(&self) -> usize {
        self.ground.len() + self.hazard.len() + self.lap_boundary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn surface_of(&self, collider: ColliderId) -> Option<SurfaceKind> {
        if self.ground.contains(&collider) {
            Some(SurfaceKind::Ground)
        } else if self.hazard.contains(&collider) {
            Some(SurfaceKind::Hazard)
        } else if self.lap_boundary.contains(&collider) {
            Some(SurfaceKind::LapBoundary)
        } else {
            None
        }
    }
}

/// Register every track mesh as an immovable collider tagged by its role.
///
/// Invalid meshes are logged and omitted; the rest of the track is still built.
pub fn build_track_colliders<W: CollisionWorld + ?Sized>(
    world: &mut W,
    track: &TrackGeometry,
) -> TrackColliders {
    let mut built = TrackColliders::default();

    for (surface, mesh) in track.iter() {
        if let Err(err) = mesh.validate() {
            warn!(mesh = %mesh.name, ?surface, "skipping track mesh: {err}");
            built.skipped += 1;
            continue;
        }
        let Some(id) = world.add_static_collider(mesh, surface.group(), surface) else {
            built.skipped += 1;
            continue;
        };
        debug!(
            mesh = %mesh.name,
            ?surface,
            triangles = mesh.triangle_count(),
            "registered track collider {id}"
        );
        match surface {
            SurfaceKind::Ground => built.ground.push(id),
            SurfaceKind::Hazard => built.hazard.push(id),
            SurfaceKind::LapBoundary => built.lap_boundary.push(id),
        }
    }

    if built.lap_boundary.is_empty() {
        warn!("track has no lap boundary; laps will never be counted");
    }
    debug!(
        colliders = built.len(),
        skipped = built.skipped,
        world = world.name(),
        "track colliders built"
    );
    built
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
