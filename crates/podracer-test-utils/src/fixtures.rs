//! Track and cable geometry fixtures.

use podracer_core::prelude::*;

/// Horizontal square of half-size `half` centred on `center`, facing +Y.
pub fn flat_plate(name: &str, center: Point3, half: f32) -> TriangleMesh {
    let (x, y, z) = (center.x, center.y, center.z);
    TriangleMesh::new(
        name,
        vec![
            Point3::new(x - half, y, z - half),
            Point3::new(x + half, y, z - half),
            Point3::new(x + half, y, z + half),
            Point3::new(x - half, y, z + half),
        ],
        vec![[0, 2, 1], [0, 3, 2]],
    )
}

/// Vertical gate spanning the X axis at depth `z`.
pub fn lap_gate(z: f32, half_width: f32) -> TriangleMesh {
    TriangleMesh::new(
        "lap_gate",
        vec![
            Point3::new(-half_width, -1.0, z),
            Point3::new(half_width, -1.0, z),
            Point3::new(half_width, 6.0, z),
            Point3::new(-half_width, 6.0, z),
        ],
        vec![[0, 1, 2], [0, 2, 3]],
    )
}

/// Ground plane, one hazard patch ahead of the start and a gate further on.
pub fn test_track() -> TrackGeometry {
    TrackGeometry {
        ground: vec![flat_plate("ground", Point3::origin(), 400.0)],
        hazard: vec![flat_plate("hazard", Point3::new(0.0, 0.01, 60.0), 5.0)],
        lap_boundary: vec![lap_gate(40.0, 20.0)],
    }
}

/// Cable strip along +Z from `start`, `rows` quads long, authored the way
/// exported meshes are: every triangle carries its own three vertices.
pub fn cable_strip(name: &str, start: Point3, length: f32, rows: u32) -> CableMesh {
    let rows = rows.max(1);
    let step = length / rows as f32;
    let corner = |col: u32, row: u32| {
        let position = start + Vec3::new(col as f32 * 0.2, 0.0, row as f32 * step);
        let mut vertex = RenderVertex::new(position, [col as f32, row as f32 / rows as f32]);
        vertex.bone_ids = [0.0, 1.0];
        vertex.bone_weights = [1.0 - row as f32 / rows as f32, row as f32 / rows as f32];
        vertex
    };

    let mut vertices = Vec::new();
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_are_valid() {
        let track = test_track();
        assert_eq!(track.mesh_count(), 3);
        assert!(track.iter().all(|(_, mesh)| mesh.validate().is_ok()));
    }

    #[test]
    fn cable_strip_duplicates_corners() {
        let cable = cable_strip("cable", Point3::origin(), 2.0, 4);
        assert!(cable.validate().is_ok());
        assert_eq!(cable.triangle_count(), 8);
        assert_eq!(cable.vertices.len(), 24);
        // 5 rows of 2 unique positions
        let mut unique: Vec<[u32; 3]> = cable
            .vertices
            .iter()
            .map(|v| {
                let p = v.position;
                [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()]
            })
            .collect();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), 10);
    }
}
