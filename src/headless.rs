// headless.rs - Backend that draws nowhere
//
// Keeps the books a real GPU backend would: which shapes are alive, whether
// the surface is mounted, whether the context is still usable. Runs the
// engine natively for tests and offline checks.

use std::collections::BTreeMap;

use crate::animation::{Material, Transform};
use crate::color::Color;
use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::render::Backend;
use crate::viewport::Viewport;

/// Not `Clone`: a handle can be released exactly once.
#[derive(Debug, PartialEq, Eq)]
pub struct HeadlessHandle(u32);

/// Backend calls in the order they happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Call {
    Create,
    UpdateMesh,
    BeginFrame,
    Draw,
    EndFrame,
    Release,
    Resize,
    Detach,
    ReleaseContext,
}

#[derive(Debug)]
struct Shape {
    material: Material,
    vertices: usize,
}

#[derive(Debug)]
pub struct HeadlessBackend {
    shapes: BTreeMap<u32, Shape>,
    next: u32,
    calls: Vec<Call>,
    viewport: Viewport,
    background: Option<Color>,
    /// Mounted canvases in the pretend host container.
    container_children: usize,
    context_alive: bool,
    created: usize,
    double_releases: usize,
    frames: usize,
    draws_this_frame: usize,
    draws_last_frame: usize,
    fail_after: Option<usize>,
}

impl HeadlessBackend {
    /// A fresh backend with its surface already mounted.
    pub fn new() -> Self {
        Self {
            shapes: BTreeMap::new(),
            next: 0,
            calls: Vec::new(),
            viewport: Viewport::default(),
            background: None,
            container_children: 1,
            context_alive: true,
            created: 0,
            double_releases: 0,
            frames: 0,
            draws_this_frame: 0,
            draws_last_frame: 0,
            fail_after: None,
        }
    }

    /// Make every `create` past the first `n` fail.
    pub fn fail_creates_after(&mut self, n: usize) {
        self.fail_after = Some(n);
    }

    pub fn calls(&self) -> &[Call] { &self.calls }
    pub fn live(&self) -> usize { self.shapes.len() }
    pub fn created(&self) -> usize { self.created }
    pub fn double_releases(&self) -> usize { self.double_releases }
    pub fn frames(&self) -> usize { self.frames }
    pub fn draws_last_frame(&self) -> usize { self.draws_last_frame }
    pub fn viewport(&self) -> Viewport { self.viewport }
    pub fn background(&self) -> Option<Color> { self.background }
    pub fn container_children(&self) -> usize { self.container_children }
    pub fn context_alive(&self) -> bool { self.context_alive }

    /// Live shapes drawn with the given material kind.
    pub fn count_material(&self, matches: impl Fn(&Material) -> bool) -> usize {
        self.shapes.values().filter(|s| matches(&s.material)).count()
    }

    /// Vertices across all live shapes.
    pub fn vertices(&self) -> usize {
        self.shapes.values().map(|s| s.vertices).sum()
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for HeadlessBackend {
    type Handle = HeadlessHandle;

    fn create(&mut self, material: Material, mesh: &Mesh) -> Result<HeadlessHandle> {
        self.calls.push(Call::Create);
        if !self.context_alive {
            return Err(Error::Host("context already released".into()));
        }
        if self.fail_after.is_some_and(|n| self.created >= n) {
            return Err(Error::Host("out of buffers".into()));
        }

        let id = self.next;
        self.next += 1;
        self.created += 1;
        self.shapes.insert(id, Shape { material, vertices: mesh.len() });
        Ok(HeadlessHandle(id))
    }

    fn update_mesh(&mut self, handle: &HeadlessHandle, mesh: &Mesh) -> Result<()> {
        self.calls.push(Call::UpdateMesh);
        match self.shapes.get_mut(&handle.0) {
            Some(shape) => {
                shape.vertices = mesh.len();
                Ok(())
            }
            None => Err(Error::Host(format!("unknown shape {}", handle.0))),
        }
    }

    fn begin_frame(&mut self, background: Color) {
        self.calls.push(Call::BeginFrame);
        self.background = Some(background);
        self.draws_this_frame = 0;
    }

    fn draw(&mut self, _handle: &HeadlessHandle, _transform: &Transform, _phase: f32) {
        self.calls.push(Call::Draw);
        self.draws_this_frame += 1;
    }

    fn end_frame(&mut self) {
        self.calls.push(Call::EndFrame);
        self.frames += 1;
        self.draws_last_frame = self.draws_this_frame;
    }

    fn release(&mut self, handle: HeadlessHandle) {
        self.calls.push(Call::Release);
        if self.shapes.remove(&handle.0).is_none() {
            self.double_releases += 1;
        }
    }

    fn resize(&mut self, viewport: Viewport) {
        self.calls.push(Call::Resize);
        self.viewport = viewport;
    }

    fn detach_surface(&mut self) {
        self.calls.push(Call::Detach);
        self.container_children = self.container_children.saturating_sub(1);
    }

    fn release_context(&mut self) {
        self.calls.push(Call::ReleaseContext);
        self.context_alive = false;
    }
}
