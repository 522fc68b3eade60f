//! Vehicle-side geometry the simulation ingests: cable meshes and the engine
//! connector point sets.
//!
//! Everything is expressed in pod space: the reactor block frame at spawn,
//! +Z forward, +Y up. The chariot trails behind at its configured offset.

use podracer_core::config::PodConfig;
use podracer_core::prelude::*;
use serde::{Deserialize, Serialize};

/// Cable and connector geometry of one pod.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodGeometry {
    pub cable_left: CableMesh,
    pub cable_right: CableMesh,
    /// Left engine connector vertices, reactor-local.
    pub connector_left: Vec<Point3>,
    /// Right engine connector vertices, reactor-local.
    pub connector_right: Vec<Point3>,
}

impl PodGeometry {
    /// Stand-in geometry sized from the chassis configuration: two cables from
    /// the chariot nose to the rear of each engine, and a small connector box
    /// on the inner face of each engine.
    pub fn procedural(config: &PodConfig) -> Self {
        let chariot = &config.chassis.chariot;
        let reactor = &config.chassis.reactor;
        let nose_z = chariot.offset[2] + chariot.half_extents[2];
        let tail_z = reactor.offset[2] - reactor.half_extents[2];
        let y = chariot.offset[1] + chariot.half_extents[1];
        let outer = reactor.half_extents[0] * 0.8;
        let inner = chariot.half_extents[0] * 0.5;

        let cable = |name: &str, side: f32| {
            cable_ribbon(
                name,
                Point3::new(side * inner, y, nose_z),
                Point3::new(side * outer, y, tail_z),
                0.15,
                12,
            )
        };

        let front_z = reactor.offset[2] + reactor.half_extents[2];
        let connector = |side: f32| {
            let mut points = Vec::with_capacity(8);
            for dx in [0.9, 1.0] {
                for dy in [0.25, 0.45] {
                    for dz in [-0.2, 0.0] {
                        points.push(Point3::new(side * dx, dy, front_z + dz));
                    }
                }
            }
            points
        };

        Self {
            cable_left: cable("cable_left", -1.0),
            cable_right: cable("cable_right", 1.0),
            connector_left: connector(-1.0),
            connector_right: connector(1.0),
        }
    }
}

/// Flat ribbon of `rows` quads from `from` to `to`, `width` wide along X,
/// authored with per-triangle vertices the way exported meshes come in.
pub fn cable_ribbon(name: &str, from: Point3, to: Point3, width: f32, rows: u32) -> CableMesh {
    let rows = rows.max(1);
    let half = Vec3::new(width * 0.5, 0.0, 0.0);
    let corner = |col: u32, row: u32| {
        let t = row as f32 / rows as f32;
        let center = from + (to - from) * t;
        let position = if col == 0 { center - half } else { center + half };
        let mut vertex = RenderVertex::new(position, [col as f32, t]);
        // Chariot end weighted to bone 0, reactor end to bone 1.
        vertex.bone_ids = [0.0, 1.0];
        vertex.bone_weights = [1.0 - t, t];
        vertex
    };

    let mut vertices = Vec::with_capacity(rows as usize * 6);
    for row in 0..rows {
        vertices.extend([corner(0, row), corner(1, row), corner(0, row + 1)]);
        vertices.extend([corner(1, row), corner(1, row + 1), corner(0, row + 1)]);
    }
    #[allow(clippy::cast_possible_truncation)]
    let indices = (0..vertices.len() as u32).collect();
    CableMesh {
        name: name.to_owned(),
        vertices,
        indices,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
