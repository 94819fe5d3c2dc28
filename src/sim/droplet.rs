// droplet.rs - Falling ink droplets
//
// Structure-of-Arrays layout for cache-friendly iteration, compacted in place
// when droplets leave.

use super::MAX_DROPLETS;
use crate::animation::{EntityId, FrameEvents, IdAllocator};

/// Below this a droplet is gone.
pub const FLOOR_Y: f32 = -7.5;
/// Two droplets touch when closer than this times their summed radii.
pub const MERGE_FACTOR: f32 = 0.8;

const DRIFT_DAMPING: f32 = 1.5;
const WOBBLE_DAMPING: f32 = 2.0;
const WOBBLE_FREQ: f32 = 9.0;
const STRETCH_PER_SPEED: f32 = 0.12;
const MAX_STRETCH: f32 = 0.8;

/// Starting state for a droplet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NewDroplet {
    pub x: f32,
    pub y: f32,
    pub speed: f32,
    pub accel: f32,
    pub vx: f32,
    pub amp: f32,
    pub wobble_phase: f32,
    pub size: f32,
    pub time: f32,
}

pub struct Droplets {
    pub id: [EntityId; MAX_DROPLETS],

    // Position
    pub x: [f32; MAX_DROPLETS],
    pub y: [f32; MAX_DROPLETS],

    // Motion: downward speed, its growth, sideways drift
    pub speed: [f32; MAX_DROPLETS],
    pub accel: [f32; MAX_DROPLETS],
    pub vx: [f32; MAX_DROPLETS],

    // Lateral wobble
    pub amp: [f32; MAX_DROPLETS],
    pub wobble_phase: [f32; MAX_DROPLETS],

    pub size: [f32; MAX_DROPLETS],
    pub age: [f32; MAX_DROPLETS],
    /// Shader time
    pub time: [f32; MAX_DROPLETS],

    // Count
    pub n: usize,
}

impl Droplets {
    pub fn new() -> Self {
        Self {
            id: [EntityId(0); MAX_DROPLETS],
            x: [0.0; MAX_DROPLETS],
            y: [0.0; MAX_DROPLETS],
            speed: [0.0; MAX_DROPLETS],
            accel: [0.0; MAX_DROPLETS],
            vx: [0.0; MAX_DROPLETS],
            amp: [0.0; MAX_DROPLETS],
            wobble_phase: [0.0; MAX_DROPLETS],
            size: [0.0; MAX_DROPLETS],
            age: [0.0; MAX_DROPLETS],
            time: [0.0; MAX_DROPLETS],
            n: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn is_full(&self) -> bool {
        self.n >= MAX_DROPLETS
    }

    pub fn ids(&self) -> &[EntityId] {
        &self.id[..self.n]
    }

    pub fn index_of(&self, id: EntityId) -> Option<usize> {
        self.ids().iter().position(|&d| d == id)
    }

    /// Add a droplet. `None` when at capacity.
    pub fn spawn(&mut self, d: NewDroplet, ids: &mut IdAllocator, events: &mut FrameEvents) -> Option<EntityId> {
        if self.is_full() { return None; }

        let i = self.n;
        let id = ids.next();
        self.id[i] = id;
        self.x[i] = d.x;
        self.y[i] = d.y;
        self.speed[i] = d.speed;
        self.accel[i] = d.accel;
        self.vx[i] = d.vx;
        self.amp[i] = d.amp;
        self.wobble_phase[i] = d.wobble_phase;
        self.size[i] = d.size;
        self.age[i] = 0.0;
        self.time[i] = d.time;
        self.n += 1;

        events.spawn(id);
        Some(id)
    }

    /// Fall, merge touching pairs, drop what left the screen.
    pub fn update(&mut self, dt: f32, ids: &mut IdAllocator, events: &mut FrameEvents) {
        self.integrate(dt);
        let merged = self.merge_touching(events);
        for d in merged {
            self.spawn(d, ids, events);
        }
        self.retain(|drops, i| drops.y[i] >= FLOOR_Y, events);
    }

    fn integrate(&mut self, dt: f32) {
        let drift = (-DRIFT_DAMPING * dt).exp();
        let settle = (-WOBBLE_DAMPING * dt).exp();
        for i in 0..self.n {
            self.speed[i] += self.accel[i] * dt;
            self.y[i] -= self.speed[i] * dt;
            self.vx[i] *= drift;
            self.x[i] += self.vx[i] * dt;
            self.amp[i] *= settle;
            self.age[i] += dt;
        }
    }

    /// Pairwise proximity scan. Both halves of a merge are released right away
    /// and skipped for the rest of the scan; replacements are returned so they
    /// join after it.
    fn merge_touching(&mut self, events: &mut FrameEvents) -> Vec<NewDroplet> {
        let mut consumed = [false; MAX_DROPLETS];
        let mut merged = Vec::new();

        for a in 0..self.n {
            if consumed[a] { continue; }
            for b in (a + 1)..self.n {
                if consumed[b] { continue; }

                let dx = self.x[a] - self.x[b];
                let dy = self.y[a] - self.y[b];
                let reach = MERGE_FACTOR * (self.size[a] + self.size[b]);
                if dx * dx + dy * dy >= reach * reach { continue; }

                consumed[a] = true;
                consumed[b] = true;
                merged.push(self.combine(a, b));
                tracing::trace!(a = self.id[a].0, b = self.id[b].0, "droplets merged");
                break;
            }
        }

        if !merged.is_empty() {
            self.retain(|_, i| !consumed[i], events);
        }
        merged
    }

    fn combine(&self, a: usize, b: usize) -> NewDroplet {
        NewDroplet {
            x: (self.x[a] + self.x[b]) * 0.5,
            y: (self.y[a] + self.y[b]) * 0.5,
            speed: (self.speed[a] + self.speed[b]) * 0.5,
            accel: (self.accel[a] + self.accel[b]) * 0.5,
            vx: (self.vx[a] + self.vx[b]) * 0.5,
            amp: self.amp[a].max(self.amp[b]),
            wobble_phase: self.wobble_phase[a],
            size: self.size[a].hypot(self.size[b]),
            time: self.time[a],
        }
    }

    /// Keep droplets where `keep` holds, release the rest.
    fn retain(&mut self, keep: impl Fn(&Self, usize) -> bool, events: &mut FrameEvents) {
        let mut write = 0;
        for read in 0..self.n {
            if !keep(&*self, read) {
                events.release(self.id[read]);
                continue;
            }
            if write != read {
                self.id[write] = self.id[read];
                self.x[write] = self.x[read];
                self.y[write] = self.y[read];
                self.speed[write] = self.speed[read];
                self.accel[write] = self.accel[read];
                self.vx[write] = self.vx[read];
                self.amp[write] = self.amp[read];
                self.wobble_phase[write] = self.wobble_phase[read];
                self.size[write] = self.size[read];
                self.age[write] = self.age[read];
                self.time[write] = self.time[read];
            }
            write += 1;
        }
        self.n = write;
    }

    /// Rendered x, including the lateral wobble.
    pub fn draw_x(&self, i: usize) -> f32 {
        self.x[i] + self.amp[i] * (self.wobble_phase[i] + self.age[i] * WOBBLE_FREQ).sin()
    }

    /// `(scale_x, scale_y)`: long along the fall, thin across, constant area.
    pub fn stretch(&self, i: usize) -> (f32, f32) {
        let s = 1.0 + (self.speed[i] * STRETCH_PER_SPEED).min(MAX_STRETCH);
        (1.0 / s, s)
    }
}

impl Default for Droplets {
    fn default() -> Self {
        Self::new()
    }
}
