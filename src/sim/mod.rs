// sim/ - Dripping ink simulation
//
// Strokes hold still, drips grow under them and shed droplets, droplets fall
// and merge, threads briefly link a drip to what it just lost. Everything is
// advanced by `InkWorld::step`; drawing is someone else's job.

mod drip;
mod droplet;
mod stroke;
mod thread;

pub use drip::Drip;
pub use droplet::{Droplets, NewDroplet, FLOOR_Y, MERGE_FACTOR};
pub use stroke::Stroke;
pub use thread::Thread;

use std::f32::consts::TAU;

use crate::animation::{Animation, EntityId, FrameEvents, IdAllocator, Material, ShapeRef, Transform};
use crate::color::Color;
use crate::config::Settings;
use crate::mesh::MeshSpec;
use crate::rng::Rng;
use crate::viewport::Viewport;

// Capacity limits
pub const MAX_DROPLETS: usize = 200;

/// Longest step taken in one go; a tab coming back from the background must
/// not teleport everything.
pub const MAX_STEP: f32 = 0.1;

const GRAVITY_MIN: f32 = 2.2;
const GRAVITY_MAX: f32 = 3.2;
const DROPLET_SEGMENTS: u32 = 12;
const THREAD_WIDTH: f32 = 0.35;

// Draw order
const Z_STROKE: f32 = 0.0;
const Z_DRIP: f32 = 0.01;
const Z_THREAD: f32 = 0.015;
const Z_DROPLET: f32 = 0.02;

/// Dripping ink world
pub struct InkWorld {
    clock: f32,
    background: Color,
    ink: Color,
    viewport: Viewport,

    // Entities
    strokes: Vec<Stroke>,
    drips: Vec<Drip>,
    droplets: Droplets,
    threads: Vec<Thread>,

    ids: IdAllocator,
    rng: Rng,
}

impl InkWorld {
    pub fn new(settings: &Settings, viewport: Viewport) -> Self {
        let mut world = Self::without_strokes(settings, viewport);

        world.strokes = Stroke::layout(&mut world.rng, &mut world.ids);
        for stroke in &world.strokes {
            world.drips.extend(Drip::attach(stroke, &mut world.rng, &mut world.ids));
        }

        tracing::debug!(
            strokes = world.strokes.len(),
            drips = world.drips.len(),
            seeded = settings.seed.is_some(),
            "ink world created"
        );
        world
    }

    /// A world with nothing in it; droplets can be placed by hand.
    pub fn without_strokes(settings: &Settings, viewport: Viewport) -> Self {
        Self {
            clock: 0.0,
            background: settings.background,
            ink: settings.ink,
            viewport,
            strokes: Vec::new(),
            drips: Vec::new(),
            droplets: Droplets::new(),
            threads: Vec::new(),
            ids: IdAllocator::default(),
            rng: Rng::from_seed(settings.seed),
        }
    }

    pub fn clock(&self) -> f32 { self.clock }
    pub fn viewport(&self) -> Viewport { self.viewport }
    pub fn strokes(&self) -> &[Stroke] { &self.strokes }
    pub fn drips(&self) -> &[Drip] { &self.drips }
    pub fn droplets(&self) -> &Droplets { &self.droplets }
    pub fn threads(&self) -> &[Thread] { &self.threads }

    /// Ids of every live entity.
    pub fn live_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.strokes.iter().map(|s| s.id).collect();
        ids.extend(self.drips.iter().map(|d| d.id));
        ids.extend(self.threads.iter().map(|t| t.id));
        ids.extend_from_slice(self.droplets.ids());
        ids
    }

    /// Drop a motionless droplet into the world (it still falls).
    pub fn place_droplet(&mut self, x: f32, y: f32, size: f32, events: &mut FrameEvents) -> Option<EntityId> {
        let d = NewDroplet {
            x,
            y,
            speed: 0.0,
            accel: (GRAVITY_MIN + GRAVITY_MAX) * 0.5,
            vx: 0.0,
            amp: 0.0,
            wobble_phase: 0.0,
            size,
            time: 0.0,
        };
        self.droplets.spawn(d, &mut self.ids, events)
    }

    /// One simulation frame.
    pub fn step(&mut self, dt: f32, events: &mut FrameEvents) {
        let dt = if dt.is_finite() { dt.clamp(0.0, MAX_STEP) } else { 0.0 };
        self.clock += dt;

        self.advance_phases(dt);
        self.update_drips(dt, events);
        thread::age_threads(&mut self.threads, dt, events);
        self.update_threads();
        self.droplets.update(dt, &mut self.ids, events);
    }

    fn advance_phases(&mut self, dt: f32) {
        for s in &mut self.strokes { s.phase += dt; }
        for d in &mut self.drips { d.phase += dt; }
        for t in &mut self.threads { t.phase += dt; }
        for t in &mut self.droplets.time[..self.droplets.n] { *t += dt; }
    }

    fn update_drips(&mut self, dt: f32, events: &mut FrameEvents) {
        for k in 0..self.drips.len() {
            self.drips[k].grow(dt);
            if !self.drips[k].should_detach() { continue; }

            let (x, y) = self.drips[k].tip();
            let drip = &self.drips[k];
            let shed = NewDroplet {
                x: x + self.rng.spread(drip.width * 0.1),
                y,
                speed: self.rng.range(0.1, 0.3),
                accel: self.rng.range(GRAVITY_MIN, GRAVITY_MAX),
                vx: self.rng.spread(0.08),
                amp: self.rng.range(0.01, 0.03),
                wobble_phase: self.rng.range(0.0, TAU),
                size: drip.droplet_size(),
                time: drip.phase,
            };
            let strand_width = drip.width * THREAD_WIDTH;
            let phase = drip.phase;

            match self.droplets.spawn(shed, &mut self.ids, events) {
                Some(droplet) => {
                    let id = self.ids.next();
                    events.spawn(id);
                    self.threads.push(Thread {
                        id,
                        drip: k,
                        droplet: Some(droplet),
                        start: (x, y),
                        end: (shed.x, shed.y),
                        base_width: strand_width,
                        age: 0.0,
                        lifespan: self.rng.range(thread::LIFESPAN_MIN, thread::LIFESPAN_MAX),
                        phase,
                    });
                }
                None => tracing::trace!(drip = k, "droplet cap reached"),
            }

            self.drips[k].detach(&mut self.rng);
        }
    }

    /// Keep strand ends attached to their drip tip and droplet.
    fn update_threads(&mut self) {
        for t in &mut self.threads {
            if let Some(drip) = self.drips.get(t.drip) {
                t.start = drip.tip();
            }
            match t.droplet.and_then(|id| self.droplets.index_of(id)) {
                Some(i) => t.end = (self.droplets.x[i], self.droplets.y[i]),
                None => t.droplet = None,
            }
        }
    }
}

impl Animation for InkWorld {
    fn name(&self) -> &'static str {
        "ink"
    }

    fn background(&self) -> Color {
        self.background
    }

    fn step(&mut self, dt: f32, events: &mut FrameEvents) {
        InkWorld::step(self, dt, events);
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn visit_shapes(&self, visit: &mut dyn FnMut(ShapeRef<'_>)) {
        let material = Material::Ink { color: self.ink };

        for s in &self.strokes {
            let (cols, rows) = s.grid();
            visit(ShapeRef {
                id: s.id,
                material,
                transform: Transform {
                    rotation: s.rotation,
                    ..Transform::at(s.x, s.y, if s.horizontal { Z_THREAD } else { Z_STROKE })
                },
                phase: s.phase,
                mesh: MeshSpec::Plane { width: s.width, height: s.height, cols, rows, jitter: s.jitter(), seed: s.seed },
            });
        }

        for d in &self.drips {
            visit(ShapeRef {
                id: d.id,
                material,
                transform: Transform::at(d.anchor.0, d.anchor.1, Z_DRIP),
                phase: d.phase,
                mesh: MeshSpec::Taper { width: d.width, length: d.length, profile: d.profile(self.clock) },
            });
        }

        for t in &self.threads {
            visit(ShapeRef {
                id: t.id,
                material,
                transform: Transform { rotation: t.angle(), ..Transform::at(t.start.0, t.start.1, Z_THREAD) },
                phase: t.phase,
                mesh: MeshSpec::Neck { width: t.width(), length: t.length(), pinch: t.pinch() },
            });
        }

        let drops = &self.droplets;
        for i in 0..drops.n {
            let (scale_x, scale_y) = drops.stretch(i);
            visit(ShapeRef {
                id: drops.id[i],
                material,
                transform: Transform { scale_x, scale_y, ..Transform::at(drops.draw_x(i), drops.y[i], Z_DROPLET) },
                phase: drops.time[i],
                mesh: MeshSpec::Circle { radius: drops.size[i], segments: DROPLET_SEGMENTS },
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(seed: u64) -> Settings {
        Settings { seed: Some(seed), ..Settings::default() }
    }

    fn run(world: &mut InkWorld, frames: usize, dt: f32) -> FrameEvents {
        let mut all = FrameEvents::default();
        let mut events = FrameEvents::default();
        for _ in 0..frames {
            events.clear();
            world.step(dt, &mut events);
            all.spawned.extend_from_slice(&events.spawned);
            all.released.extend_from_slice(&events.released);
        }
        all
    }

    #[test]
    fn builds_six_strokes_with_two_or_three_drips_each() {
        let world = InkWorld::new(&settings(1), Viewport::new(800, 600));
        assert_eq!(world.strokes().len(), 6);
        assert!((12..=18).contains(&world.drips().len()));
        assert_eq!(world.droplets().len(), 0);
    }

    #[test]
    fn same_seed_same_world() {
        let mut a = InkWorld::new(&settings(42), Viewport::new(800, 600));
        let mut b = InkWorld::new(&settings(42), Viewport::new(800, 600));
        run(&mut a, 300, 0.016);
        run(&mut b, 300, 0.016);
        assert_eq!(a.drips(), b.drips());
        assert_eq!(a.droplets().ids(), b.droplets().ids());
    }

    #[test]
    fn drips_stay_within_max_length() {
        let mut world = InkWorld::new(&settings(5), Viewport::new(800, 600));
        let mut events = FrameEvents::default();
        for _ in 0..2000 {
            world.step(0.016, &mut events);
            for d in world.drips() {
                assert!(d.length >= 0.0 && d.length <= d.max_length);
            }
        }
    }

    #[test]
    fn detachment_sheds_length_and_spawns_droplet_with_thread() {
        let mut world = InkWorld::new(&settings(8), Viewport::new(800, 600));
        let mut events = FrameEvents::default();
        let mut seen = false;
        for _ in 0..2000 {
            let before: Vec<f32> = world.drips().iter().map(|d| d.length).collect();
            let timers: Vec<f32> = world.drips().iter().map(|d| d.since_detach).collect();
            events.clear();
            world.step(0.016, &mut events);
            for (k, d) in world.drips().iter().enumerate() {
                if d.since_detach < timers[k] {
                    assert!(d.length < before[k]);
                    seen = true;
                }
            }
            if seen {
                assert!(!world.threads().is_empty());
                break;
            }
        }
        assert!(seen, "no drip detached in 32 simulated seconds");
    }

    #[test]
    fn droplet_count_changes_only_by_spawn_merge_or_floor() {
        let mut world = InkWorld::new(&settings(13), Viewport::new(800, 600));
        let mut events = FrameEvents::default();
        for _ in 0..3000 {
            let before = world.droplets().len();
            events.clear();
            world.step(0.016, &mut events);
            let droplet_spawns = events
                .spawned
                .iter()
                .filter(|id| world.droplets().index_of(**id).is_some())
                .count();
            let after = world.droplets().len();
            assert!(after <= before + droplet_spawns);
            assert!(after <= MAX_DROPLETS);
        }
    }

    #[test]
    fn threads_snap_after_their_lifespan() {
        let mut world = InkWorld::new(&settings(21), Viewport::new(800, 600));
        run(&mut world, 3000, 0.016);
        for t in world.threads() {
            assert!(t.age < t.lifespan);
            assert!(t.lifespan <= thread::LIFESPAN_MAX);
        }
    }

    #[test]
    fn huge_or_broken_deltas_are_tamed() {
        let mut world = InkWorld::new(&settings(2), Viewport::new(800, 600));
        let mut events = FrameEvents::default();
        world.step(10.0, &mut events);
        assert!((world.clock() - MAX_STEP).abs() < 1e-6);
        world.step(f32::NAN, &mut events);
        world.step(-1.0, &mut events);
        assert!((world.clock() - MAX_STEP).abs() < 1e-6);
    }

    #[test]
    fn every_live_entity_is_visited_once() {
        let mut world = InkWorld::new(&settings(4), Viewport::new(800, 600));
        run(&mut world, 600, 0.016);
        let mut visited = Vec::new();
        world.visit_shapes(&mut |shape| visited.push(shape.id));
        let mut live = world.live_ids();
        visited.sort();
        live.sort();
        assert_eq!(visited, live);
    }

    #[test]
    fn spawned_and_released_ids_track_live_set() {
        let mut world = InkWorld::new(&settings(6), Viewport::new(800, 600));
        let mut live: std::collections::BTreeSet<EntityId> = world.live_ids().into_iter().collect();
        let mut events = FrameEvents::default();
        for _ in 0..1500 {
            events.clear();
            world.step(0.016, &mut events);
            for id in &events.released {
                assert!(live.remove(id), "released unknown {id:?}");
            }
            for id in &events.spawned {
                assert!(live.insert(*id), "spawned twice {id:?}");
            }
        }
        let actual: std::collections::BTreeSet<EntityId> = world.live_ids().into_iter().collect();
        assert_eq!(live, actual);
    }
}
