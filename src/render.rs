// render.rs - Push simulation state to a drawing backend
//
// `Scene` pairs one animation with one backend. It maps entity ids to GPU
// handles, creates handles for newcomers, frees them for leavers, rebuilds
// per-frame meshes and issues the draws. Lifecycle: Running -> Disposed.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::animation::{Animation, EntityId, FrameEvents, Material, Transform};
use crate::color::Color;
use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::viewport::Viewport;

/// A drawable surface and the resources living on it.
pub trait Backend {
    /// One allocated shape. Consumed by `release`, so it can only be freed once.
    type Handle;

    fn create(&mut self, material: Material, mesh: &Mesh) -> Result<Self::Handle>;

    fn update_mesh(&mut self, handle: &Self::Handle, mesh: &Mesh) -> Result<()>;

    fn begin_frame(&mut self, background: Color);

    fn draw(&mut self, handle: &Self::Handle, transform: &Transform, phase: f32);

    fn end_frame(&mut self);

    fn release(&mut self, handle: Self::Handle);

    fn resize(&mut self, viewport: Viewport);

    /// Take the surface out of the host container. Fine if it is already gone.
    fn detach_surface(&mut self);

    fn release_context(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneState {
    Running,
    Disposed,
}

pub struct Scene<B: Backend, A: Animation> {
    backend: B,
    animation: A,
    viewport: Viewport,
    handles: HashMap<EntityId, B::Handle>,
    events: FrameEvents,
    scratch: Mesh,
    state: SceneState,
    frames: u64,
}

impl<B: Backend, A: Animation> Scene<B, A> {
    /// Allocate every shape the animation starts with and draw nothing yet.
    pub fn new(mut backend: B, mut animation: A, viewport: Viewport) -> Result<Self> {
        backend.resize(viewport);
        animation.set_viewport(viewport);

        let mut scene = Self {
            backend,
            animation,
            viewport,
            handles: HashMap::new(),
            events: FrameEvents::default(),
            scratch: Mesh::new(),
            state: SceneState::Running,
            frames: 0,
        };
        if let Err(err) = scene.sync_shapes(false) {
            // Leave the host container as we found it
            scene.dispose();
            return Err(err);
        }

        tracing::info!(
            animation = scene.animation.name(),
            shapes = scene.handles.len(),
            width = viewport.width(),
            height = viewport.height(),
            "scene mounted"
        );
        Ok(scene)
    }

    pub fn state(&self) -> SceneState { self.state }
    pub fn is_disposed(&self) -> bool { self.state == SceneState::Disposed }
    pub fn viewport(&self) -> Viewport { self.viewport }
    pub fn frames(&self) -> u64 { self.frames }
    pub fn live_handles(&self) -> usize { self.handles.len() }
    pub fn animation(&self) -> &A { &self.animation }
    pub fn animation_mut(&mut self) -> &mut A { &mut self.animation }
    pub fn backend(&self) -> &B { &self.backend }

    /// Step the animation by `dt` seconds and draw the result.
    /// A frame after `dispose` does nothing.
    pub fn frame(&mut self, dt: f32) -> Result<()> {
        if self.is_disposed() { return Ok(()); }

        self.events.clear();
        self.animation.step(dt, &mut self.events);

        for id in self.events.released.drain(..) {
            if let Some(handle) = self.handles.remove(&id) {
                self.backend.release(handle);
            }
        }

        self.sync_shapes(true)?;
        self.frames += 1;

        if !self.events.spawned.is_empty() {
            tracing::trace!(frame = self.frames, spawned = self.events.spawned.len(), "entities spawned");
        }
        Ok(())
    }

    /// Create handles for unseen shapes, refresh dynamic meshes and
    /// optionally draw.
    fn sync_shapes(&mut self, draw: bool) -> Result<()> {
        let Self { backend, animation, handles, scratch, .. } = self;
        let mut failure: Option<Error> = None;

        if draw {
            backend.begin_frame(animation.background());
        }

        animation.visit_shapes(&mut |shape| {
            if failure.is_some() { return; }

            let handle = match handles.entry(shape.id) {
                Entry::Occupied(slot) => {
                    if shape.mesh.is_dynamic() {
                        shape.mesh.build(scratch);
                        if let Err(err) = backend.update_mesh(slot.get(), scratch) {
                            failure = Some(err);
                            return;
                        }
                    }
                    slot.into_mut()
                }
                Entry::Vacant(slot) => {
                    shape.mesh.build(scratch);
                    match backend.create(shape.material, scratch) {
                        Ok(handle) => slot.insert(handle),
                        Err(err) => {
                            failure = Some(err);
                            return;
                        }
                    }
                }
            };

            if draw {
                backend.draw(handle, &shape.transform, shape.phase);
            }
        });

        if draw {
            backend.end_frame();
        }
        failure.map_or(Ok(()), Err)
    }

    /// Follow the container size. The simulation carries on untouched.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.is_disposed() { return; }

        let viewport = Viewport::new(width, height);
        if viewport == self.viewport { return; }

        self.viewport = viewport;
        self.animation.set_viewport(viewport);
        self.backend.resize(viewport);
        tracing::debug!(width = viewport.width(), height = viewport.height(), "scene resized");
    }

    /// Hand the current size to the backend again so it can pick up a new
    /// device pixel ratio. The CSS size and the simulation are unchanged.
    pub fn refresh_surface(&mut self) {
        if self.is_disposed() { return; }
        self.backend.resize(self.viewport);
        tracing::debug!("surface refreshed");
    }

    /// Pointer position in CSS pixels relative to the surface.
    pub fn pointer(&mut self, x: f64, y: f64) {
        if self.is_disposed() { return; }

        let nx = (x / self.viewport.width() as f64) * 2.0 - 1.0;
        let ny = -((y / self.viewport.height() as f64) * 2.0 - 1.0);
        self.animation.pointer_moved(nx as f32, ny as f32);
    }

    /// Detach the surface, free every shape, then the context.
    /// Returns `false` when already disposed.
    pub fn dispose(&mut self) -> bool {
        if self.is_disposed() { return false; }
        self.state = SceneState::Disposed;

        self.backend.detach_surface();
        let released = self.handles.len();
        for (_, handle) in self.handles.drain() {
            self.backend.release(handle);
        }
        self.backend.release_context();

        tracing::info!(animation = self.animation.name(), released, frames = self.frames, "scene disposed");
        true
    }
}
