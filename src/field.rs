// field.rs - Drifting particle field that reaches for the pointer
//
// Particles live in a 5-unit cube seen through a perspective camera. Each
// one meanders along its own sine path and is pulled home when it strays.
// Particles the pointer hovers over get a line to it and drift toward it.

use crate::animation::{Animation, EntityId, FrameEvents, IdAllocator, Material, ShapeRef, Transform};
use crate::color::Color;
use crate::config::Settings;
use crate::mesh::{MeshSpec, Segment};
use crate::rng::Rng;
use crate::viewport::{Viewport, VIEW_HALF_HEIGHT};

pub const PARTICLES: usize = 500;

const CUBE: f32 = 5.0;
const CAMERA_Z: f32 = 2.0;
/// tan(75deg / 2)
const TAN_HALF_FOV: f32 = 0.767_327;

/// Units per second along the meander.
const DRIFT: f32 = 0.09;
/// Meander clock runs this much slower than wall time.
const MEANDER_RATE: f32 = 0.05;
/// Squared distance from home that triggers a reset.
const MAX_WANDER_SQ: f32 = 15.0;
/// Squared NDC distance within which the pointer catches a particle.
const REACH_SQ: f32 = 0.02;
/// Fraction of the gap closed per second at full strength.
const ATTRACTION: f32 = 1.2;

const SPRITE_SIZE: f32 = 0.07;
const LINE_WIDTH: f32 = 0.008;
const GLOW: Color = Color { r: 0.31, g: 0.675, b: 0.996 };
const LINE: Color = Color { r: 0.0, g: 1.0, b: 1.0 };

pub struct ParticleField {
    background: Color,
    viewport: Viewport,
    clock: f32,
    pointer: Option<(f32, f32)>,

    pos: Vec<[f32; 3]>,
    home: Vec<[f32; 3]>,

    // Rebuilt every step
    sprites: Vec<[f32; 2]>,
    lines: Vec<Segment>,

    sprites_id: EntityId,
    lines_id: EntityId,
}

impl ParticleField {
    pub fn new(settings: &Settings, viewport: Viewport) -> Self {
        let mut rng = Rng::from_seed(settings.seed);
        let pos: Vec<[f32; 3]> = (0..PARTICLES)
            .map(|_| [rng.spread(CUBE / 2.0), rng.spread(CUBE / 2.0), rng.spread(CUBE / 2.0)])
            .collect();

        let mut ids = IdAllocator::default();
        let mut field = Self {
            background: settings.background,
            viewport,
            clock: 0.0,
            pointer: None,
            home: pos.clone(),
            pos,
            sprites: Vec::with_capacity(PARTICLES),
            lines: Vec::new(),
            sprites_id: ids.next(),
            lines_id: ids.next(),
        };
        field.rebuild();
        field
    }

    pub fn positions(&self) -> &[[f32; 3]] { &self.pos }
    pub fn lines(&self) -> &[Segment] { &self.lines }

    /// Camera-space depth scale, `None` behind the camera.
    fn depth(p: [f32; 3]) -> Option<f32> {
        let dist = CAMERA_Z - p[2];
        (dist > 0.05).then_some(dist * TAN_HALF_FOV)
    }

    /// World point to normalized device coordinates.
    pub fn project(&self, p: [f32; 3]) -> Option<(f32, f32)> {
        let d = Self::depth(p)?;
        Some((p[0] / (d * self.viewport.aspect()), p[1] / d))
    }

    /// NDC to the 2D drawing plane.
    fn to_plane(&self, (x, y): (f32, f32)) -> [f32; 2] {
        [x * self.viewport.half_width(), y * VIEW_HALF_HEIGHT]
    }

    fn meander(&mut self, dt: f32) {
        self.clock += dt;
        let t = self.clock * MEANDER_RATE;
        let step = DRIFT * dt;
        for (i, (p, home)) in self.pos.iter_mut().zip(&self.home).enumerate() {
            let a = t + i as f32 * 0.1;
            p[0] += a.sin() * step;
            p[1] += a.cos() * step * 0.0015;
            p[2] += a.sin() * step;

            let (dx, dy, dz) = (p[0] - home[0], p[1] - home[1], p[2] - home[2]);
            if dx * dx + dy * dy + dz * dz > MAX_WANDER_SQ {
                *p = *home;
            }
        }
    }

    fn attract(&mut self, dt: f32) {
        self.lines.clear();
        let Some((mx, my)) = self.pointer else { return };
        let aspect = self.viewport.aspect();

        for i in 0..self.pos.len() {
            let p = self.pos[i];
            let (Some(d), Some((px, py))) = (Self::depth(p), self.project(p)) else { continue };
            let dist_sq = (px - mx).powi(2) + (py - my).powi(2);
            if dist_sq >= REACH_SQ { continue; }

            let closeness = 1.0 - dist_sq / REACH_SQ;
            let line = Segment {
                a: self.to_plane((px, py)),
                b: self.to_plane((mx, my)),
                alpha: 0.8 * closeness,
            };
            self.lines.push(line);

            // Pointer unprojected at the particle's depth
            let target = [mx * d * aspect, my * d, p[2]];
            let pull = (ATTRACTION * closeness * dt).min(1.0);
            for axis in 0..3 {
                self.pos[i][axis] += (target[axis] - p[axis]) * pull;
            }
        }
    }

    fn rebuild(&mut self) {
        self.sprites.clear();
        for i in 0..self.pos.len() {
            if let Some(ndc) = self.project(self.pos[i]) {
                let pt = self.to_plane(ndc);
                self.sprites.push(pt);
            }
        }
    }
}

impl Animation for ParticleField {
    fn name(&self) -> &'static str {
        "particles"
    }

    fn background(&self) -> Color {
        self.background
    }

    fn step(&mut self, dt: f32, _events: &mut FrameEvents) {
        let dt = if dt.is_finite() { dt.clamp(0.0, crate::sim::MAX_STEP) } else { 0.0 };
        self.meander(dt);
        self.attract(dt);
        self.rebuild();
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.rebuild();
    }

    fn pointer_moved(&mut self, x: f32, y: f32) {
        if x.is_finite() && y.is_finite() {
            self.pointer = Some((x, y));
        }
    }

    fn visit_shapes(&self, visit: &mut dyn FnMut(ShapeRef<'_>)) {
        let size = SPRITE_SIZE / (CAMERA_Z * TAN_HALF_FOV) * VIEW_HALF_HEIGHT;
        visit(ShapeRef {
            id: self.sprites_id,
            material: Material::Glow { color: GLOW },
            transform: Transform::IDENTITY,
            phase: self.clock,
            mesh: MeshSpec::Sprites { points: &self.sprites, size },
        });
        visit(ShapeRef {
            id: self.lines_id,
            material: Material::Line { color: LINE },
            transform: Transform::at(0.0, 0.0, 0.01),
            phase: self.clock,
            mesh: MeshSpec::Segments { lines: &self.lines, width: LINE_WIDTH },
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> ParticleField {
        ParticleField::new(&Settings { seed: Some(3), ..Settings::default() }, Viewport::new(800, 600))
    }

    #[test]
    fn starts_inside_the_cube() {
        let f = field();
        assert_eq!(f.positions().len(), PARTICLES);
        for p in f.positions() {
            assert!(p.iter().all(|c| c.abs() <= CUBE / 2.0));
        }
    }

    #[test]
    fn strays_are_sent_home() {
        let mut f = field();
        f.pos[0] = [f.home[0][0] + 4.0, f.home[0][1], f.home[0][2]];
        f.step(0.016, &mut FrameEvents::default());
        assert_eq!(f.pos[0], f.home[0]);
    }

    #[test]
    fn no_lines_until_pointer_moves() {
        let mut f = field();
        f.step(0.016, &mut FrameEvents::default());
        assert!(f.lines().is_empty());
    }

    #[test]
    fn pointer_pulls_nearby_particles() {
        let mut f = field();
        f.pos[0] = [0.05, 0.05, 0.0];
        f.home[0] = f.pos[0];
        f.pointer_moved(0.0, 0.0);

        let before = f.project(f.pos[0]).unwrap();
        f.step(0.016, &mut FrameEvents::default());
        let after = f.project(f.pos[0]).unwrap();

        assert!(!f.lines().is_empty());
        assert!(after.0.hypot(after.1) < before.0.hypot(before.1));
    }

    #[test]
    fn projection_centers_the_origin() {
        let f = field();
        assert_eq!(f.project([0.0, 0.0, 0.0]), Some((0.0, 0.0)));
        assert_eq!(f.project([0.0, 0.0, 2.5]), None);
    }

    #[test]
    fn exposes_two_fixed_shapes() {
        let f = field();
        let mut seen = Vec::new();
        f.visit_shapes(&mut |s| seen.push((s.id, s.mesh.is_dynamic())));
        assert_eq!(seen, vec![(EntityId(0), true), (EntityId(1), true)]);
    }
}
