// stroke.rs - Static brush strokes the drips hang from
//
// Five vertical bars and one slightly tilted horizontal bar. Only the shader
// phase changes after creation.

use crate::animation::{EntityId, IdAllocator};
use crate::rng::Rng;

pub const VERTICAL_STROKES: usize = 5;
const SPACING: f32 = 0.8;

const HEIGHT_MIN: f32 = 2.0;
const HEIGHT_MAX: f32 = 2.4;
const WIDTH_MIN: f32 = 0.25;
const WIDTH_MAX: f32 = 0.35;
const Y_JITTER: f32 = 0.1;
const PHASE_MAX: f32 = 100.0;

const HORIZONTAL_HEIGHT: f32 = 0.3;
const HORIZONTAL_Y: f32 = 0.2;
const HORIZONTAL_TILT: f32 = std::f32::consts::PI * -0.02;

#[derive(Clone, Debug, PartialEq)]
pub struct Stroke {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rotation: f32,
    /// Shader time, starts at a random offset.
    pub phase: f32,
    /// Seed for the vertex jitter.
    pub seed: u32,
    pub horizontal: bool,
}

impl Stroke {
    /// Lay out the standard set of strokes.
    pub fn layout(rng: &mut Rng, ids: &mut IdAllocator) -> Vec<Stroke> {
        let mut strokes = Vec::with_capacity(VERTICAL_STROKES + 1);

        for i in 0..VERTICAL_STROKES {
            let x = (i as f32 - (VERTICAL_STROKES - 1) as f32 / 2.0) * SPACING;
            let height = rng.range(HEIGHT_MIN, HEIGHT_MAX);
            let width = rng.range(WIDTH_MIN, WIDTH_MAX);
            strokes.push(Stroke {
                id: ids.next(),
                x,
                y: rng.spread(Y_JITTER),
                width,
                height,
                rotation: 0.0,
                phase: rng.range(0.0, PHASE_MAX),
                seed: (rng.next_f32() * u32::MAX as f32) as u32,
                horizontal: false,
            });
        }

        strokes.push(Stroke {
            id: ids.next(),
            x: 0.0,
            y: HORIZONTAL_Y,
            width: SPACING * (VERTICAL_STROKES as f32 + 0.5),
            height: HORIZONTAL_HEIGHT,
            rotation: HORIZONTAL_TILT,
            phase: rng.range(0.0, PHASE_MAX),
            seed: (rng.next_f32() * u32::MAX as f32) as u32,
            horizontal: true,
        });

        strokes
    }

    /// Narrow dimension; drip widths are derived from it.
    pub fn thickness(&self) -> f32 {
        self.width.min(self.height)
    }

    /// Local point to world space.
    pub fn to_world(&self, lx: f32, ly: f32) -> (f32, f32) {
        let (s, c) = self.rotation.sin_cos();
        (self.x + lx * c - ly * s, self.y + lx * s + ly * c)
    }

    /// Point on the bottom edge, `u` in [-0.5, 0.5] across the width.
    pub fn bottom_point(&self, u: f32) -> (f32, f32) {
        self.to_world(u * self.width, -self.height / 2.0)
    }

    pub fn grid(&self) -> (u32, u32) {
        if self.horizontal { (24, 6) } else { (12, 24) }
    }

    pub fn jitter(&self) -> f32 {
        if self.horizontal { 0.025 } else { 0.015 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_documented_ranges() {
        let mut rng = Rng::seeded(3);
        let mut ids = IdAllocator::default();
        let strokes = Stroke::layout(&mut rng, &mut ids);

        assert_eq!(strokes.len(), VERTICAL_STROKES + 1);
        let vertical: Vec<_> = strokes.iter().filter(|s| !s.horizontal).collect();
        assert_eq!(vertical.len(), VERTICAL_STROKES);
        for s in &vertical {
            assert!((HEIGHT_MIN..=HEIGHT_MAX).contains(&s.height));
            assert!((WIDTH_MIN..=WIDTH_MAX).contains(&s.width));
            assert!(s.y.abs() <= Y_JITTER);
        }
        // Centered on x = 0
        let sum: f32 = vertical.iter().map(|s| s.x).sum();
        assert!(sum.abs() < 1e-5);
    }

    #[test]
    fn bottom_point_of_untilted_stroke() {
        let stroke = Stroke {
            id: EntityId(0),
            x: 1.0,
            y: 0.0,
            width: 0.3,
            height: 2.0,
            rotation: 0.0,
            phase: 0.0,
            seed: 0,
            horizontal: false,
        };
        let (x, y) = stroke.bottom_point(0.5);
        assert!((x - 1.15).abs() < 1e-6);
        assert!((y + 1.0).abs() < 1e-6);
    }
}
