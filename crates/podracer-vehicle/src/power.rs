//! Power-coupling arc drawn between the two engine connectors.
//!
//! Every regeneration draws a few jagged strips from the left connector to
//! the right one. Each strip is a chain of quads, two triangles each, whose
//! interior nodes are spread along X at sorted random offsets and jittered in
//! Y and Z.

use podracer_core::config::PowerConfig;
use podracer_core::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// One vertex of the arc triangle list, reactor-local.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoltVertex {
    pub position: Point3,
    pub tex_coords: [f32; 2],
}

impl BoltVertex {
    const fn new(position: Point3, tex_coords: [f32; 2]) -> Self {
        Self {
            position,
            tex_coords,
        }
    }
}

/// Arc end point on a connector: its inner X extent, centred in Y and Z.
fn connector_center(points: &[Point3], inner_x: impl Fn(f32, f32) -> f32) -> Option<Point3> {
    let first = points.first()?;
    let (min, max) = points.iter().fold((*first, *first), |(lo, hi), p| {
        (lo.inf(p), hi.sup(p))
    });
    Some(Point3::new(
        inner_x(min.x, max.x),
        (min.y + max.y) * 0.5,
        (min.z + max.z) * 0.5,
    ))
}

// ---------------------------------------------------------------------------
// PowerArc
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PowerArc {
    start: Point3,
    end: Point3,
    config: PowerConfig,
    rng: ChaCha8Rng,
    vertices: Vec<BoltVertex>,
}

impl PowerArc {
    /// Arc between the centres of two connector point sets.
    pub fn new(left: &[Point3], right: &[Point3], config: &PowerConfig) -> Result<Self, GeometryError> {
        let start = connector_center(left, |lo, _| lo)
            .ok_or_else(|| GeometryError::EmptyMesh("connector_left".into()))?;
        let end = connector_center(right, |_, hi| hi)
            .ok_or_else(|| GeometryError::EmptyMesh("connector_right".into()))?;
        let rng = config
            .seed
            .map_or_else(ChaCha8Rng::from_entropy, ChaCha8Rng::seed_from_u64);
        Ok(Self {
            start,
            end,
            config: config.clone(),
            rng,
            vertices: Vec::new(),
        })
    }

    /// Draw a fresh set of bolts.
    pub fn regenerate(&mut self) -> &[BoltVertex] {
        self.vertices.clear();
        for bolt in 0..self.config.bolts {
            // Every third bolt is the wide one.
            let jitter = if bolt % 3 == 2 {
                self.config.wide_jitter
            } else {
                self.config.narrow_jitter
            };
            self.push_bolt(jitter);
        }
        &self.vertices
    }

    /// Drop the current bolts (power coupling off).
    pub fn clear(&mut self) {
        self.vertices.clear();
    }

    fn push_bolt(&mut self, jitter: f32) {
        let interior = self.config.segments.saturating_sub(2);
        let mut offsets: Vec<f32> = (0..interior)
            .map(|_| self.rng.gen_range(0.01..0.99))
            .collect();
        offsets.sort_by(f32::total_cmp);

        let span = self.end.x - self.start.x;
        let lift = Vec3::new(0.0, self.config.thickness, 0.0);
        let mut nodes = Vec::with_capacity(interior + 2);
        nodes.push(self.start);
        for t in offsets {
            let dy = self.rng.gen_range(-jitter..jitter);
            let dz = self.rng.gen_range(-jitter..jitter);
            nodes.push(self.start + Vec3::new(t * span, dy, dz));
        }
        nodes.push(self.end);

        for pair in nodes.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let (a_top, b_top) = (a + lift, b + lift);
            self.vertices.extend([
                BoltVertex::new(a, [0.0, 0.0]),
                BoltVertex::new(b, [0.0, 0.0]),
                BoltVertex::new(a_top, [0.0, 1.0]),
                BoltVertex::new(a_top, [0.0, 1.0]),
                BoltVertex::new(b, [0.0, 0.0]),
                BoltVertex::new(b_top, [0.0, 1.0]),
            ]);
        }
    }

    pub fn vertices(&self) -> &[BoltVertex] {
        &self.vertices
    }

    pub const fn start(&self) -> Point3 {
        self.start
    }

    pub const fn end(&self) -> Point3 {
        self.end
    }

    /// Vertex count of one full regeneration.
    pub const fn vertices_per_frame(&self) -> usize {
        self.config.bolts * self.config.segments.saturating_sub(1) * 6
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn connector(x0: f32, x1: f32) -> Vec<Point3> {
        vec![
            Point3::new(x0, 0.2, 1.0),
            Point3::new(x1, 0.6, 1.4),
            Point3::new((x0 + x1) * 0.5, 0.4, 1.2),
        ]
    }

    fn seeded(seed: u64) -> PowerConfig {
        PowerConfig {
            seed: Some(seed),
            ..PowerConfig::default()
        }
    }

    #[test]
    fn ends_are_inner_connector_centres() {
        let arc = PowerArc::new(&connector(-1.2, -1.0), &connector(1.0, 1.2), &seeded(1)).unwrap();
        assert!((arc.start() - Point3::new(-1.2, 0.4, 1.2)).norm() < 1e-6);
        assert!((arc.end() - Point3::new(1.2, 0.4, 1.2)).norm() < 1e-6);
    }

    #[test]
    fn empty_connector_rejected() {
        assert!(PowerArc::new(&[], &connector(1.0, 1.2), &seeded(1)).is_err());
    }

    #[test]
    fn bolt_layout() {
        let config = seeded(7);
        let mut arc = PowerArc::new(&connector(-1.2, -1.0), &connector(1.0, 1.2), &config).unwrap();
        let vertices = arc.regenerate().to_vec();
        assert_eq!(vertices.len(), 3 * 11 * 6);
        assert_eq!(vertices.len(), arc.vertices_per_frame());

        // Each bolt starts at the left end and finishes at the right end.
        for bolt in vertices.chunks(11 * 6) {
            assert_eq!(bolt[0].position, arc.start());
            assert_eq!(bolt[bolt.len() - 5].position, arc.end());
            // Interior nodes move left to right.
            let xs: Vec<f32> = bolt.chunks(6).map(|quad| quad[1].position.x).collect();
            assert!(xs.windows(2).all(|w| w[0] <= w[1]));
        }
        assert!(vertices.iter().all(|v| v.tex_coords[0] == 0.0));
        assert!(
            vertices
                .iter()
                .all(|v| v.tex_coords[1] == 0.0 || v.tex_coords[1] == 1.0)
        );
    }

    #[test]
    fn jitter_stays_in_band() {
        let config = seeded(3);
        let mut arc = PowerArc::new(&connector(-1.2, -1.0), &connector(1.0, 1.2), &config).unwrap();
        let base_y = arc.start().y;
        let limit = config.wide_jitter + config.thickness + 1e-5;
        assert!(
            arc.regenerate()
                .iter()
                .all(|v| (v.position.y - base_y).abs() <= limit)
        );
    }

    #[test]
    fn same_seed_same_arc() {
        let mut a = PowerArc::new(&connector(-1.2, -1.0), &connector(1.0, 1.2), &seeded(9)).unwrap();
        let mut b = PowerArc::new(&connector(-1.2, -1.0), &connector(1.0, 1.2), &seeded(9)).unwrap();
        assert_eq!(a.regenerate(), b.regenerate());
        a.clear();
        assert!(a.vertices().is_empty());
    }
}
