// drip.rs - Ink stretching down from a stroke
//
// A drip grows faster the longer it gets, swells at the tip as its next
// detachment approaches, then sheds a droplet and springs back.

use std::f32::consts::TAU;

use super::stroke::Stroke;
use crate::animation::{EntityId, IdAllocator};
use crate::mesh::PROFILE_SAMPLES;
use crate::rng::Rng;

const DRIPS_MIN: u32 = 2;
const DRIPS_MAX: u32 = 3;

const MAX_LENGTH_MIN: f32 = 0.8;
const MAX_LENGTH_MAX: f32 = 2.0;
const GROWTH_MIN: f32 = 0.15;
const GROWTH_MAX: f32 = 0.25;
/// Extra speed at full length (gravity pulling on the hanging mass).
const GRAVITY_GAIN: f32 = 2.0;

const FIRST_DETACH_MIN: f32 = 2.0;
const FIRST_DETACH_MAX: f32 = 5.0;
const NEXT_DETACH_MIN: f32 = 1.5;
const NEXT_DETACH_MAX: f32 = 4.0;
/// Fraction of max length required before a detachment.
const DETACH_LENGTH: f32 = 0.7;

/// Length kept after shedding: 50% for runny ink, 80% for viscous ink.
const RETAIN_MIN: f32 = 0.5;
const RETAIN_SPAN: f32 = 0.3;

#[derive(Clone, Debug, PartialEq)]
pub struct Drip {
    pub id: EntityId,
    /// Top of the drip, on the stroke's bottom edge.
    pub anchor: (f32, f32),
    pub width: f32,
    pub length: f32,
    pub growth_rate: f32,
    pub max_length: f32,
    /// 0 = runny, 1 = thick.
    pub viscosity: f32,
    /// Wobble frequency in Hz.
    pub frequency: f32,
    /// Scales the tip bulge.
    pub tension: f32,
    pub since_detach: f32,
    pub next_detach: f32,
    pub phase: f32,
}

impl Drip {
    /// 2-3 drips spread along the stroke's bottom edge.
    pub fn attach(stroke: &Stroke, rng: &mut Rng, ids: &mut IdAllocator) -> Vec<Drip> {
        let count = rng.between(DRIPS_MIN, DRIPS_MAX);
        (0..count)
            .map(|k| {
                // Evenly spaced slots with a little slop
                let slot = (k as f32 + 0.5) / count as f32 - 0.5;
                let u = slot * 0.7 + rng.spread(0.08);
                Drip {
                    id: ids.next(),
                    anchor: stroke.bottom_point(u),
                    width: stroke.thickness() * rng.range(0.3, 0.6),
                    length: 0.0,
                    growth_rate: rng.range(GROWTH_MIN, GROWTH_MAX),
                    max_length: rng.range(MAX_LENGTH_MIN, MAX_LENGTH_MAX),
                    viscosity: rng.next_f32(),
                    frequency: rng.range(1.5, 3.5),
                    tension: rng.range(0.5, 1.0),
                    since_detach: 0.0,
                    next_detach: rng.range(FIRST_DETACH_MIN, FIRST_DETACH_MAX),
                    phase: stroke.phase + rng.range(0.0, 10.0),
                }
            })
            .collect()
    }

    /// Lengthen under gravity. Length never exceeds `max_length`.
    pub fn grow(&mut self, dt: f32) {
        let norm = self.length / self.max_length;
        let speed = self.growth_rate * (1.0 + GRAVITY_GAIN * norm);
        self.length = (self.length + speed * dt).min(self.max_length);
        self.since_detach += dt;
    }

    /// 0 right after a detachment, 1 when the next one is due.
    pub fn readiness(&self) -> f32 {
        (self.since_detach / self.next_detach).clamp(0.0, 1.0)
    }

    pub fn should_detach(&self) -> bool {
        self.since_detach > self.next_detach && self.length > DETACH_LENGTH * self.max_length
    }

    /// Reset the timer and spring back. Returns the length shed.
    pub fn detach(&mut self, rng: &mut Rng) -> f32 {
        let before = self.length;
        self.length *= RETAIN_MIN + RETAIN_SPAN * self.viscosity.clamp(0.0, 1.0);
        self.since_detach = 0.0;
        self.next_detach = rng.range(NEXT_DETACH_MIN, NEXT_DETACH_MAX);
        before - self.length
    }

    pub fn tip(&self) -> (f32, f32) {
        (self.anchor.0, self.anchor.1 - self.length)
    }

    /// Radius of the droplet shed from this drip.
    pub fn droplet_size(&self) -> f32 {
        self.width * (0.35 + 0.25 * self.viscosity)
    }

    /// Half-width multiplier at evenly spaced points from anchor (0) to tip (1).
    pub fn profile(&self, clock: f32) -> [f32; PROFILE_SAMPLES] {
        let swell = (0.5 + 0.9 * self.readiness()) * self.tension;
        let mut out = [0.0; PROFILE_SAMPLES];
        for (k, w) in out.iter_mut().enumerate() {
            let t = k as f32 / (PROFILE_SAMPLES - 1) as f32;
            let taper = (1.0 - t).powf(0.7);
            let d = (t - 0.88) / 0.1;
            let bulb = (-d * d).exp() * swell;
            let wobble = 1.0 + 0.06 * (clock * self.frequency * TAU + t * 4.0).sin();
            *w = (taper * 0.85 + bulb) * wobble;
        }
        out
    }
}
