// animation.rs - What the presenter needs from a background effect
//
// An animation owns its simulation state and describes its drawable shapes;
// it never touches the graphics API. Entities come and go through
// `FrameEvents` so the presenter can allocate and free GPU resources.

use crate::color::Color;
use crate::mesh::MeshSpec;
use crate::viewport::Viewport;

/// Identity of one drawable entity. Never reused within a world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

/// Hands out fresh ids.
#[derive(Clone, Debug, Default)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn next(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Material {
    /// Glossy flowing ink.
    Ink { color: Color },
    /// Full-screen vortex rings.
    Vortex,
    /// Additive radial glow.
    Glow { color: Color },
    /// Translucent flat color; per-vertex alpha.
    Line { color: Color },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub x: f32,
    pub y: f32,
    /// Draw order, larger is in front.
    pub z: f32,
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
}

impl Transform {
    pub const IDENTITY: Transform = Transform { x: 0.0, y: 0.0, z: 0.0, rotation: 0.0, scale_x: 1.0, scale_y: 1.0 };

    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z, ..Self::IDENTITY }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// One live shape as the presenter sees it.
#[derive(Clone, Copy, Debug)]
pub struct ShapeRef<'a> {
    pub id: EntityId,
    pub material: Material,
    pub transform: Transform,
    /// Shader time for this shape.
    pub phase: f32,
    pub mesh: MeshSpec<'a>,
}

/// Entity churn produced by one step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameEvents {
    pub spawned: Vec<EntityId>,
    pub released: Vec<EntityId>,
}

impl FrameEvents {
    pub fn clear(&mut self) {
        self.spawned.clear();
        self.released.clear();
    }

    pub fn spawn(&mut self, id: EntityId) {
        self.spawned.push(id);
    }

    /// An entity spawned and released inside the same step never reaches
    /// the presenter.
    pub fn release(&mut self, id: EntityId) {
        if let Some(pos) = self.spawned.iter().position(|&s| s == id) {
            self.spawned.swap_remove(pos);
        } else {
            self.released.push(id);
        }
    }
}

pub trait Animation {
    fn name(&self) -> &'static str;

    fn background(&self) -> Color;

    /// Advance the simulation by `dt` seconds.
    fn step(&mut self, dt: f32, events: &mut FrameEvents);

    /// Container size changed. Must not reset the simulation.
    fn set_viewport(&mut self, viewport: Viewport);

    /// Pointer position in normalized device coordinates.
    fn pointer_moved(&mut self, _x: f32, _y: f32) {}

    /// Visit every live shape, back to front.
    fn visit_shapes(&self, visit: &mut dyn FnMut(ShapeRef<'_>));
}

/// Lets the host pick the effect at runtime.
impl<T: Animation + ?Sized> Animation for Box<T> {
    fn name(&self) -> &'static str { (**self).name() }
    fn background(&self) -> Color { (**self).background() }
    fn step(&mut self, dt: f32, events: &mut FrameEvents) { (**self).step(dt, events) }
    fn set_viewport(&mut self, viewport: Viewport) { (**self).set_viewport(viewport) }
    fn pointer_moved(&mut self, x: f32, y: f32) { (**self).pointer_moved(x, y) }
    fn visit_shapes(&self, visit: &mut dyn FnMut(ShapeRef<'_>)) { (**self).visit_shapes(visit) }
}
