// thread.rs - Ink strand between a drip and the droplet it just shed
//
// Short lived: it thins, stretches and pinches in the middle, then snaps.

use crate::animation::{EntityId, FrameEvents};

pub const LIFESPAN_MIN: f32 = 0.25;
pub const LIFESPAN_MAX: f32 = 0.45;
const MIN_LENGTH: f32 = 0.01;
const STRETCH: f32 = 0.15;

#[derive(Clone, Debug, PartialEq)]
pub struct Thread {
    pub id: EntityId,
    /// Index of the drip the strand hangs from.
    pub drip: usize,
    /// Droplet at the loose end. May merge or leave before the strand snaps.
    pub droplet: Option<EntityId>,
    pub start: (f32, f32),
    pub end: (f32, f32),
    pub base_width: f32,
    pub age: f32,
    pub lifespan: f32,
    pub phase: f32,
}

impl Thread {
    pub fn ratio(&self) -> f32 {
        (self.age / self.lifespan).clamp(0.0, 1.0)
    }

    pub fn is_spent(&self) -> bool {
        self.age >= self.lifespan
    }

    pub fn width(&self) -> f32 {
        self.base_width * (1.0 - self.ratio()).powf(1.5)
    }

    /// How much the middle narrows: grows as the strand ages.
    pub fn pinch(&self) -> f32 {
        0.3 + 0.6 * self.ratio()
    }

    pub fn length(&self) -> f32 {
        let (dx, dy) = (self.end.0 - self.start.0, self.end.1 - self.start.1);
        (dx * dx + dy * dy).sqrt().max(MIN_LENGTH) * (1.0 + STRETCH * self.ratio())
    }

    /// Rotation that points the downward-hanging mesh at `end`.
    pub fn angle(&self) -> f32 {
        let (dx, dy) = (self.end.0 - self.start.0, self.end.1 - self.start.1);
        dx.atan2(-dy)
    }
}

/// Age every strand and release the spent ones.
pub fn age_threads(threads: &mut Vec<Thread>, dt: f32, events: &mut FrameEvents) {
    threads.retain_mut(|t| {
        t.age += dt;
        if t.is_spent() {
            events.release(t.id);
            false
        } else {
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread(age: f32) -> Thread {
        Thread {
            id: EntityId(5),
            drip: 0,
            droplet: None,
            start: (0.0, 0.0),
            end: (0.0, -0.2),
            base_width: 0.04,
            age,
            lifespan: 0.3,
            phase: 0.0,
        }
    }

    #[test]
    fn thins_and_stretches_with_age() {
        let young = thread(0.0);
        let old = thread(0.25);
        assert!(old.width() < young.width());
        assert!(old.length() > young.length());
        assert!(old.pinch() > young.pinch());
    }

    #[test]
    fn straight_down_needs_no_rotation() {
        assert!(thread(0.0).angle().abs() < 1e-6);
        let mut sideways = thread(0.0);
        sideways.end = (0.2, 0.0);
        assert!((sideways.angle() - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn released_once_spent() {
        let mut threads = vec![thread(0.0), thread(0.29)];
        let mut events = FrameEvents::default();
        age_threads(&mut threads, 0.02, &mut events);
        assert_eq!(threads.len(), 1);
        assert_eq!(events.released, vec![EntityId(5)]);
    }
}
