// webgl.rs - WebGL2 backend
//
// One canvas, one context, four programs. Every handle owns its own VAO and
// vertex buffer; draws set per-shape uniforms and issue a single
// `drawArrays`. World space is mapped to clip space through `u_half_extent`.

use std::cell::Cell;

use wasm_bindgen::JsCast;
use web_sys::{
    HtmlCanvasElement, HtmlElement, WebGl2RenderingContext as GL, WebGlBuffer, WebGlProgram,
    WebGlShader, WebGlUniformLocation, WebGlVertexArrayObject, WebglLoseContext, Window,
};

use crate::animation::{Material, Transform};
use crate::color::Color;
use crate::error::{Error, Result};
use crate::mesh::{Mesh, Vertex};
use crate::render::Backend;
use crate::viewport::{Viewport, VIEW_HALF_HEIGHT};

const SHAPE_VERT: &str = include_str!("shaders/shape.vert");
const INK_FRAG: &str = include_str!("shaders/ink.frag");
const GLOW_FRAG: &str = include_str!("shaders/glow.frag");
const LINE_FRAG: &str = include_str!("shaders/line.frag");
const VORTEX_VERT: &str = include_str!("shaders/vortex.vert");
const VORTEX_FRAG: &str = include_str!("shaders/vortex.frag");

const STRIDE: i32 = (Vertex::FLOATS * 4) as i32;

// ============================================================================
// PROGRAMS
// ============================================================================

struct Program {
    program: WebGlProgram,
    half_extent: Option<WebGlUniformLocation>,
    offset: Option<WebGlUniformLocation>,
    scale: Option<WebGlUniformLocation>,
    rotation: Option<WebGlUniformLocation>,
    depth: Option<WebGlUniformLocation>,
    time: Option<WebGlUniformLocation>,
    color: Option<WebGlUniformLocation>,
    resolution: Option<WebGlUniformLocation>,
}

impl Program {
    fn link(gl: &GL, vert_src: &str, frag_src: &str) -> Result<Self> {
        let vert = compile(gl, GL::VERTEX_SHADER, vert_src)?;
        let frag = compile(gl, GL::FRAGMENT_SHADER, frag_src)?;
        let program = gl
            .create_program()
            .ok_or_else(|| Error::Host("could not create program".into()))?;
        gl.attach_shader(&program, &vert);
        gl.attach_shader(&program, &frag);
        gl.link_program(&program);
        // Linked programs keep their own copy
        gl.delete_shader(Some(&vert));
        gl.delete_shader(Some(&frag));

        let linked = gl
            .get_program_parameter(&program, GL::LINK_STATUS)
            .as_bool()
            .unwrap_or(false);
        if !linked {
            let log = gl.get_program_info_log(&program).unwrap_or_default();
            gl.delete_program(Some(&program));
            return Err(Error::Shader { stage: "link", log });
        }

        let loc = |name: &str| gl.get_uniform_location(&program, name);
        Ok(Self {
            half_extent: loc("u_half_extent"),
            offset: loc("u_offset"),
            scale: loc("u_scale"),
            rotation: loc("u_rotation"),
            depth: loc("u_depth"),
            time: loc("u_time"),
            color: loc("u_color"),
            resolution: loc("u_resolution"),
            program,
        })
    }
}

fn compile(gl: &GL, kind: u32, src: &str) -> Result<WebGlShader> {
    let stage = if kind == GL::VERTEX_SHADER { "vertex" } else { "fragment" };
    let shader = gl
        .create_shader(kind)
        .ok_or_else(|| Error::Host(format!("could not create {stage} shader")))?;
    gl.shader_source(&shader, src);
    gl.compile_shader(&shader);

    let ok = gl
        .get_shader_parameter(&shader, GL::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false);
    if ok {
        Ok(shader)
    } else {
        let log = gl.get_shader_info_log(&shader).unwrap_or_default();
        gl.delete_shader(Some(&shader));
        Err(Error::Shader { stage, log })
    }
}

struct Programs {
    ink: Program,
    vortex: Program,
    glow: Program,
    line: Program,
}

/// Link every `(vertex, fragment)` pair in order. On the first failure the
/// programs already linked are deleted again.
fn link_all(gl: &GL, sources: &[(&str, &str)]) -> Result<Vec<Program>> {
    let mut linked = Vec::with_capacity(sources.len());
    for &(vert, frag) in sources {
        match Program::link(gl, vert, frag) {
            Ok(p) => linked.push(p),
            Err(err) => {
                for p in &linked {
                    gl.delete_program(Some(&p.program));
                }
                tracing::debug!(deleted = linked.len(), "program link failed");
                return Err(err);
            }
        }
    }
    Ok(linked)
}

impl Programs {
    fn build(gl: &GL) -> Result<Self> {
        let sources = [(SHAPE_VERT, INK_FRAG), (VORTEX_VERT, VORTEX_FRAG), (SHAPE_VERT, GLOW_FRAG), (SHAPE_VERT, LINE_FRAG)];
        let mut linked = link_all(gl, &sources)?.into_iter();
        match (linked.next(), linked.next(), linked.next(), linked.next()) {
            (Some(ink), Some(vortex), Some(glow), Some(line)) => Ok(Self { ink, vortex, glow, line }),
            _ => Err(Error::Host("missing linked program".into())),
        }
    }

    fn for_material(&self, material: &Material) -> &Program {
        match material {
            Material::Ink { .. } => &self.ink,
            Material::Vortex => &self.vortex,
            Material::Glow { .. } => &self.glow,
            Material::Line { .. } => &self.line,
        }
    }

    fn delete(&self, gl: &GL) {
        for p in [&self.ink, &self.vortex, &self.glow, &self.line] {
            gl.delete_program(Some(&p.program));
        }
    }
}

// ============================================================================
// BACKEND
// ============================================================================

/// GPU side of one shape. Dropped by value in `release`.
pub struct GlHandle {
    vao: WebGlVertexArrayObject,
    buffer: WebGlBuffer,
    count: Cell<i32>,
    material: Material,
}

pub struct WebGlBackend {
    window: Window,
    canvas: HtmlCanvasElement,
    gl: GL,
    programs: Programs,
    viewport: Viewport,
    max_pixel_ratio: f64,
    floats: Vec<f32>,
    context_alive: bool,
}

impl WebGlBackend {
    /// Create a canvas inside `container` and set up the context.
    /// A browser without WebGL2 yields `Error::RenderingUnsupported`.
    /// A fixed `width`/`height` (CSS pixels) pins that side of the canvas;
    /// the other side fills the container. Nothing is appended on failure.
    pub fn mount(container: &HtmlElement, max_pixel_ratio: f64, width: Option<u32>, height: Option<u32>) -> Result<Self> {
        let window = web_sys::window().ok_or_else(|| Error::Host("no window".into()))?;
        let document = window.document().ok_or_else(|| Error::Host("no document".into()))?;

        let canvas: HtmlCanvasElement = document.create_element("canvas")?.dyn_into().map_err(|_| {
            Error::Host("created element is not a canvas".into())
        })?;
        let style = canvas.style();
        style.set_property("display", "block")?;
        style.set_property("width", &css_size(width))?;
        style.set_property("height", &css_size(height))?;

        let options = js_sys::Object::new();
        js_sys::Reflect::set(&options, &"antialias".into(), &true.into())?;
        js_sys::Reflect::set(&options, &"alpha".into(), &true.into())?;

        let gl: GL = canvas
            .get_context_with_context_options("webgl2", &options)
            .map_err(|e| Error::RenderingUnsupported(format!("{e:?}")))?
            .ok_or_else(|| Error::RenderingUnsupported("webgl2 context unavailable".into()))?
            .dyn_into()
            .map_err(|_| Error::RenderingUnsupported("context is not webgl2".into()))?;

        let programs = match Programs::build(&gl) {
            Ok(programs) => programs,
            Err(err) => {
                lose_context(&gl);
                return Err(err);
            }
        };

        gl.enable(GL::BLEND);
        gl.enable(GL::DEPTH_TEST);
        gl.depth_func(GL::LEQUAL);

        if let Err(err) = container.append_child(&canvas) {
            programs.delete(&gl);
            lose_context(&gl);
            return Err(err.into());
        }

        let max_pixel_ratio = if max_pixel_ratio.is_finite() && max_pixel_ratio > 0.0 { max_pixel_ratio } else { 1.0 };
        tracing::debug!(max_pixel_ratio, "webgl2 context ready");

        Ok(Self {
            window,
            canvas,
            gl,
            programs,
            viewport: Viewport::default(),
            max_pixel_ratio,
            floats: Vec::new(),
            context_alive: true,
        })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    fn pixel_ratio(&self) -> f64 {
        self.window.device_pixel_ratio().clamp(1.0, self.max_pixel_ratio.max(1.0))
    }

    fn upload(&mut self, handle: &GlHandle, mesh: &Mesh) {
        mesh.write_floats(&mut self.floats);
        let data = js_sys::Float32Array::from(&self.floats[..]);
        self.gl.bind_buffer(GL::ARRAY_BUFFER, Some(&handle.buffer));
        self.gl.buffer_data_with_array_buffer_view(GL::ARRAY_BUFFER, &data, GL::DYNAMIC_DRAW);
        handle.count.set(mesh.len() as i32);
    }
}

impl Backend for WebGlBackend {
    type Handle = GlHandle;

    fn create(&mut self, material: Material, mesh: &Mesh) -> Result<GlHandle> {
        if !self.context_alive {
            return Err(Error::Host("context already released".into()));
        }
        let gl = &self.gl;
        let vao = gl.create_vertex_array().ok_or_else(|| Error::Host("could not create vertex array".into()))?;
        let buffer = match gl.create_buffer() {
            Some(b) => b,
            None => {
                gl.delete_vertex_array(Some(&vao));
                return Err(Error::Host("could not create buffer".into()));
            }
        };

        gl.bind_vertex_array(Some(&vao));
        gl.bind_buffer(GL::ARRAY_BUFFER, Some(&buffer));
        // pos, uv, alpha
        gl.enable_vertex_attrib_array(0);
        gl.vertex_attrib_pointer_with_i32(0, 2, GL::FLOAT, false, STRIDE, 0);
        gl.enable_vertex_attrib_array(1);
        gl.vertex_attrib_pointer_with_i32(1, 2, GL::FLOAT, false, STRIDE, 8);
        gl.enable_vertex_attrib_array(2);
        gl.vertex_attrib_pointer_with_i32(2, 1, GL::FLOAT, false, STRIDE, 16);

        let handle = GlHandle { vao, buffer, count: Cell::new(0), material };
        self.upload(&handle, mesh);
        self.gl.bind_vertex_array(None);
        Ok(handle)
    }

    fn update_mesh(&mut self, handle: &GlHandle, mesh: &Mesh) -> Result<()> {
        if !self.context_alive {
            return Err(Error::Host("context already released".into()));
        }
        self.upload(handle, mesh);
        Ok(())
    }

    fn begin_frame(&mut self, background: Color) {
        let [r, g, b] = background.to_array();
        self.gl.clear_color(r, g, b, 1.0);
        self.gl.clear(GL::COLOR_BUFFER_BIT | GL::DEPTH_BUFFER_BIT);
    }

    fn draw(&mut self, handle: &GlHandle, transform: &Transform, phase: f32) {
        let count = handle.count.get();
        if count == 0 {
            return;
        }
        let gl = &self.gl;
        let p = self.programs.for_material(&handle.material);
        gl.use_program(Some(&p.program));

        match handle.material {
            Material::Glow { .. } => {
                gl.blend_func(GL::SRC_ALPHA, GL::ONE);
                gl.depth_mask(false);
            }
            Material::Line { .. } => {
                gl.blend_func(GL::SRC_ALPHA, GL::ONE_MINUS_SRC_ALPHA);
                gl.depth_mask(false);
            }
            Material::Ink { .. } | Material::Vortex => {
                gl.blend_func(GL::SRC_ALPHA, GL::ONE_MINUS_SRC_ALPHA);
                gl.depth_mask(true);
            }
        }

        gl.uniform2f(p.half_extent.as_ref(), self.viewport.half_width(), VIEW_HALF_HEIGHT);
        gl.uniform2f(p.offset.as_ref(), transform.x, transform.y);
        gl.uniform2f(p.scale.as_ref(), transform.scale_x, transform.scale_y);
        gl.uniform1f(p.rotation.as_ref(), transform.rotation);
        gl.uniform1f(p.depth.as_ref(), transform.z);
        gl.uniform1f(p.time.as_ref(), phase);
        gl.uniform2f(p.resolution.as_ref(), self.viewport.width() as f32, self.viewport.height() as f32);
        if let Material::Ink { color } | Material::Glow { color } | Material::Line { color } = handle.material {
            let [r, g, b] = color.to_array();
            gl.uniform3f(p.color.as_ref(), r, g, b);
        }

        gl.bind_vertex_array(Some(&handle.vao));
        gl.draw_arrays(GL::TRIANGLES, 0, count);
    }

    fn end_frame(&mut self) {
        self.gl.bind_vertex_array(None);
        self.gl.depth_mask(true);
    }

    fn release(&mut self, handle: GlHandle) {
        self.gl.delete_buffer(Some(&handle.buffer));
        self.gl.delete_vertex_array(Some(&handle.vao));
    }

    fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        let (w, h) = viewport.scaled(self.pixel_ratio());
        self.canvas.set_width(w);
        self.canvas.set_height(h);
        self.gl.viewport(0, 0, w as i32, h as i32);
    }

    fn detach_surface(&mut self) {
        if let Some(parent) = self.canvas.parent_node() {
            if parent.remove_child(&self.canvas).is_err() {
                tracing::debug!("canvas already detached");
            }
        }
    }

    fn release_context(&mut self) {
        if !self.context_alive {
            return;
        }
        self.context_alive = false;
        self.programs.delete(&self.gl);
        lose_context(&self.gl);
    }
}

fn css_size(fixed: Option<u32>) -> String {
    match fixed {
        Some(px) => format!("{px}px"),
        None => "100%".to_string(),
    }
}

fn lose_context(gl: &GL) {
    match gl.get_extension("WEBGL_lose_context") {
        Ok(Some(ext)) => ext.unchecked_into::<WebglLoseContext>().lose_context(),
        _ => tracing::debug!("WEBGL_lose_context unavailable; context left to the collector"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    const BROKEN_FRAG: &str = "#version 300 es\nprecision mediump float;\nout vec4 frag;\nvoid main() { frag = nope; }\n";

    fn context() -> Option<GL> {
        let document = web_sys::window()?.document()?;
        let canvas: HtmlCanvasElement = document.create_element("canvas").ok()?.dyn_into().ok()?;
        canvas.get_context("webgl2").ok()??.dyn_into().ok()
    }

    #[wasm_bindgen_test]
    fn link_failure_reports_the_stage() {
        let Some(gl) = context() else { return };
        let result = link_all(&gl, &[(SHAPE_VERT, LINE_FRAG), (SHAPE_VERT, BROKEN_FRAG)]);
        assert!(matches!(result, Err(Error::Shader { stage: "fragment", .. })));
    }

    #[wasm_bindgen_test]
    fn every_program_links() {
        let Some(gl) = context() else { return };
        let programs = Programs::build(&gl).unwrap();
        programs.delete(&gl);
    }

    #[wasm_bindgen_test]
    fn losing_the_context_is_observable() {
        let Some(gl) = context() else { return };
        if gl.get_extension("WEBGL_lose_context").ok().flatten().is_none() {
            return;
        }
        lose_context(&gl);
        assert!(gl.is_context_lost());
    }

    #[wasm_bindgen_test]
    fn fixed_sides_get_pixels_the_rest_fills() {
        assert_eq!(css_size(Some(320)), "320px");
        assert_eq!(css_size(None), "100%");
    }
}
