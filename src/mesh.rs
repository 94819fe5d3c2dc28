// mesh.rs - Triangle geometry for every shape the engine draws
//
// Meshes are plain triangle lists in the shape's local space. Static shapes
// (strokes, droplets, the vortex quad) are built once when they spawn;
// drips, threads and the particle field rebuild theirs every frame.

use std::f32::consts::{PI, TAU};

use crate::rng::Rng;

/// Number of samples along a drip's length.
pub const PROFILE_SAMPLES: usize = 17;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
    pub alpha: f32,
}

impl Vertex {
    /// Floats per vertex in the interleaved GPU buffer.
    pub const FLOATS: usize = 5;

    pub fn new(x: f32, y: f32, u: f32, v: f32) -> Self {
        Self { pos: [x, y], uv: [u, v], alpha: 1.0 }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Mesh {
    vertices: Vec<Vertex>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn push_tri(&mut self, a: Vertex, b: Vertex, c: Vertex) {
        self.vertices.extend_from_slice(&[a, b, c]);
    }

    /// Quad from four corners in winding order.
    pub fn push_quad(&mut self, a: Vertex, b: Vertex, c: Vertex, d: Vertex) {
        self.push_tri(a, b, c);
        self.push_tri(a, c, d);
    }

    /// Interleaved `[x, y, u, v, alpha]` floats.
    pub fn write_floats(&self, out: &mut Vec<f32>) {
        out.clear();
        out.reserve(self.vertices.len() * Vertex::FLOATS);
        for v in &self.vertices {
            out.extend_from_slice(&[v.pos[0], v.pos[1], v.uv[0], v.uv[1], v.alpha]);
        }
    }

    /// Axis-aligned bounds `(min, max)`, `None` when empty.
    pub fn bounds(&self) -> Option<([f32; 2], [f32; 2])> {
        let first = self.vertices.first()?.pos;
        Some(self.vertices.iter().fold((first, first), |(lo, hi), v| {
            (
                [lo[0].min(v.pos[0]), lo[1].min(v.pos[1])],
                [hi[0].max(v.pos[0]), hi[1].max(v.pos[1])],
            )
        }))
    }
}

/// One line of the particle field, already in world units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub a: [f32; 2],
    pub b: [f32; 2],
    pub alpha: f32,
}

/// Recipe for a shape's mesh.
#[derive(Clone, Copy, Debug)]
pub enum MeshSpec<'a> {
    /// Jittered grid centered on the origin.
    Plane { width: f32, height: f32, cols: u32, rows: u32, jitter: f32, seed: u32 },
    /// Hangs down from the origin; `profile` scales the half-width along the length.
    Taper { width: f32, length: f32, profile: [f32; PROFILE_SAMPLES] },
    /// Hangs down from the origin, pinched in the middle.
    Neck { width: f32, length: f32, pinch: f32 },
    Circle { radius: f32, segments: u32 },
    Sprites { points: &'a [[f32; 2]], size: f32 },
    Segments { lines: &'a [Segment], width: f32 },
    /// Covers clip space; the transform is ignored.
    FullScreen,
}

impl MeshSpec<'_> {
    /// Whether the mesh has to be rebuilt every frame.
    pub fn is_dynamic(&self) -> bool {
        matches!(
            self,
            MeshSpec::Taper { .. } | MeshSpec::Neck { .. } | MeshSpec::Sprites { .. } | MeshSpec::Segments { .. }
        )
    }

    pub fn build(&self, out: &mut Mesh) {
        out.clear();
        match *self {
            MeshSpec::Plane { width, height, cols, rows, jitter, seed } => {
                plane(out, width, height, cols, rows, jitter, seed)
            }
            MeshSpec::Taper { width, length, profile } => taper(out, width, length, &profile),
            MeshSpec::Neck { width, length, pinch } => neck(out, width, length, pinch),
            MeshSpec::Circle { radius, segments } => circle(out, radius, segments),
            MeshSpec::Sprites { points, size } => sprites(out, points, size),
            MeshSpec::Segments { lines, width } => segments(out, lines, width),
            MeshSpec::FullScreen => {
                out.push_quad(
                    Vertex::new(-1.0, -1.0, 0.0, 0.0),
                    Vertex::new(1.0, -1.0, 1.0, 0.0),
                    Vertex::new(1.0, 1.0, 1.0, 1.0),
                    Vertex::new(-1.0, 1.0, 0.0, 1.0),
                );
            }
        }
    }
}

fn plane(out: &mut Mesh, width: f32, height: f32, cols: u32, rows: u32, jitter: f32, seed: u32) {
    let (cols, rows) = (cols.max(1) as usize, rows.max(1) as usize);
    let mut rng = Rng::seeded(seed as u64);

    // Shared grid points so neighbouring cells stay stitched after jitter.
    let mut grid = Vec::with_capacity((cols + 1) * (rows + 1));
    for j in 0..=rows {
        for i in 0..=cols {
            let u = i as f32 / cols as f32;
            let v = j as f32 / rows as f32;
            let x = (u - 0.5) * width + rng.spread(jitter);
            let y = (v - 0.5) * height + rng.spread(jitter);
            grid.push(Vertex::new(x, y, u, v));
        }
    }

    let at = |i: usize, j: usize| grid[j * (cols + 1) + i];
    for j in 0..rows {
        for i in 0..cols {
            out.push_quad(at(i, j), at(i + 1, j), at(i + 1, j + 1), at(i, j + 1));
        }
    }
}

fn taper(out: &mut Mesh, width: f32, length: f32, profile: &[f32; PROFILE_SAMPLES]) {
    let half = width * 0.5;
    let row = |k: usize| {
        let t = k as f32 / (PROFILE_SAMPLES - 1) as f32;
        let w = half * profile[k].max(0.0);
        (
            Vertex::new(-w, -t * length, 0.0, 1.0 - t),
            Vertex::new(w, -t * length, 1.0, 1.0 - t),
        )
    };
    for k in 0..PROFILE_SAMPLES - 1 {
        let (tl, tr) = row(k);
        let (bl, br) = row(k + 1);
        out.push_quad(tl, tr, br, bl);
    }
}

fn neck(out: &mut Mesh, width: f32, length: f32, pinch: f32) {
    const STEPS: usize = 8;
    let half = width * 0.5;
    let row = |k: usize| {
        let t = k as f32 / STEPS as f32;
        let w = half * (1.0 - pinch.clamp(0.0, 0.95) * (PI * t).sin());
        (
            Vertex::new(-w, -t * length, 0.0, 1.0 - t),
            Vertex::new(w, -t * length, 1.0, 1.0 - t),
        )
    };
    for k in 0..STEPS {
        let (tl, tr) = row(k);
        let (bl, br) = row(k + 1);
        out.push_quad(tl, tr, br, bl);
    }
}

fn circle(out: &mut Mesh, radius: f32, segments: u32) {
    let segments = segments.max(3);
    let center = Vertex::new(0.0, 0.0, 0.5, 0.5);
    let rim = |k: u32| {
        let a = k as f32 / segments as f32 * TAU;
        let (s, c) = a.sin_cos();
        Vertex::new(c * radius, s * radius, 0.5 + 0.5 * c, 0.5 + 0.5 * s)
    };
    for k in 0..segments {
        out.push_tri(center, rim(k), rim(k + 1));
    }
}

fn sprites(out: &mut Mesh, points: &[[f32; 2]], size: f32) {
    let h = size * 0.5;
    for &[x, y] in points {
        out.push_quad(
            Vertex::new(x - h, y - h, 0.0, 0.0),
            Vertex::new(x + h, y - h, 1.0, 0.0),
            Vertex::new(x + h, y + h, 1.0, 1.0),
            Vertex::new(x - h, y + h, 0.0, 1.0),
        );
    }
}

fn segments(out: &mut Mesh, lines: &[Segment], width: f32) {
    let h = width * 0.5;
    for line in lines {
        let (dx, dy) = (line.b[0] - line.a[0], line.b[1] - line.a[1]);
        let len = (dx * dx + dy * dy).sqrt();
        if len <= f32::EPSILON { continue; }
        // Perpendicular offset
        let (nx, ny) = (-dy / len * h, dx / len * h);
        let v = |x: f32, y: f32, u: f32| Vertex { pos: [x, y], uv: [u, 0.5], alpha: line.alpha };
        out.push_quad(
            v(line.a[0] + nx, line.a[1] + ny, 0.0),
            v(line.b[0] + nx, line.b[1] + ny, 1.0),
            v(line.b[0] - nx, line.b[1] - ny, 1.0),
            v(line.a[0] - nx, line.a[1] - ny, 0.0),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_without_jitter_fills_its_rectangle() {
        let mut mesh = Mesh::new();
        MeshSpec::Plane { width: 2.0, height: 4.0, cols: 3, rows: 5, jitter: 0.0, seed: 1 }.build(&mut mesh);
        assert_eq!(mesh.len(), 3 * 5 * 6);
        let (lo, hi) = mesh.bounds().unwrap();
        assert_eq!(lo, [-1.0, -2.0]);
        assert_eq!(hi, [1.0, 2.0]);
    }

    #[test]
    fn plane_jitter_is_reproducible_per_seed() {
        let spec = MeshSpec::Plane { width: 1.0, height: 1.0, cols: 4, rows: 4, jitter: 0.015, seed: 99 };
        let (mut a, mut b) = (Mesh::new(), Mesh::new());
        spec.build(&mut a);
        spec.build(&mut b);
        assert_eq!(a.vertices(), b.vertices());
    }

    #[test]
    fn taper_hangs_below_the_anchor() {
        let mut mesh = Mesh::new();
        let mut profile = [1.0; PROFILE_SAMPLES];
        profile[PROFILE_SAMPLES - 1] = 0.0;
        MeshSpec::Taper { width: 0.2, length: 1.5, profile }.build(&mut mesh);
        let (lo, hi) = mesh.bounds().unwrap();
        assert!((lo[1] + 1.5).abs() < 1e-6);
        assert_eq!(hi[1], 0.0);
        assert!((hi[0] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn neck_is_thinnest_in_the_middle() {
        let mut mesh = Mesh::new();
        MeshSpec::Neck { width: 0.1, length: 1.0, pinch: 0.8 }.build(&mut mesh);
        let mid = mesh
            .vertices()
            .iter()
            .filter(|v| (v.pos[1] + 0.5).abs() < 1e-6)
            .map(|v| v.pos[0].abs())
            .fold(0.0f32, f32::max);
        assert!(mid < 0.05 * 0.3);
    }

    #[test]
    fn circle_stays_within_radius() {
        let mut mesh = Mesh::new();
        MeshSpec::Circle { radius: 0.07, segments: 12 }.build(&mut mesh);
        assert_eq!(mesh.len(), 36);
        for v in mesh.vertices() {
            assert!((v.pos[0].hypot(v.pos[1])) <= 0.07 + 1e-6);
        }
    }

    #[test]
    fn degenerate_segments_are_skipped() {
        let mut mesh = Mesh::new();
        let lines = [
            Segment { a: [0.0, 0.0], b: [0.0, 0.0], alpha: 1.0 },
            Segment { a: [0.0, 0.0], b: [1.0, 0.0], alpha: 0.5 },
        ];
        MeshSpec::Segments { lines: &lines, width: 0.01 }.build(&mut mesh);
        assert_eq!(mesh.len(), 6);
        assert!(mesh.vertices().iter().all(|v| v.alpha == 0.5));
    }

    #[test]
    fn interleaves_five_floats_per_vertex() {
        let mut mesh = Mesh::new();
        MeshSpec::FullScreen.build(&mut mesh);
        let mut floats = Vec::new();
        mesh.write_floats(&mut floats);
        assert_eq!(floats.len(), 6 * Vertex::FLOATS);
        assert!(!MeshSpec::FullScreen.is_dynamic());
    }
}
