// vortex.rs - Full-screen vortex backdrop
//
// All the work happens in the fragment shader; this side only keeps time.

use crate::animation::{Animation, EntityId, FrameEvents, Material, ShapeRef, Transform};
use crate::color::Color;
use crate::mesh::MeshSpec;
use crate::viewport::Viewport;

pub struct Vortex {
    id: EntityId,
    time: f32,
    viewport: Viewport,
}

impl Vortex {
    pub fn new(viewport: Viewport) -> Self {
        Self { id: EntityId(0), time: 0.0, viewport }
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Resolution uniform; never zero.
    pub fn resolution(&self) -> [f32; 2] {
        [self.viewport.width() as f32, self.viewport.height() as f32]
    }
}

impl Animation for Vortex {
    fn name(&self) -> &'static str {
        "vortex"
    }

    fn background(&self) -> Color {
        Color::BLACK
    }

    fn step(&mut self, dt: f32, _events: &mut FrameEvents) {
        if dt.is_finite() && dt > 0.0 {
            self.time += dt;
        }
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn visit_shapes(&self, visit: &mut dyn FnMut(ShapeRef<'_>)) {
        visit(ShapeRef {
            id: self.id,
            material: Material::Vortex,
            transform: Transform::IDENTITY,
            phase: self.time,
            mesh: MeshSpec::FullScreen,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_time_and_ignores_bad_deltas() {
        let mut v = Vortex::new(Viewport::new(640, 480));
        let mut events = FrameEvents::default();
        v.step(0.5, &mut events);
        v.step(f32::NAN, &mut events);
        v.step(-1.0, &mut events);
        assert_eq!(v.time(), 0.5);
        assert!(events.spawned.is_empty());
    }

    #[test]
    fn resolution_survives_zero_resize() {
        let mut v = Vortex::new(Viewport::new(640, 480));
        v.set_viewport(Viewport::new(0, 0));
        let [w, h] = v.resolution();
        assert!(w >= 1.0 && h >= 1.0);
        assert!((w / h).is_finite());
    }
}
