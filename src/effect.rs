// effect.rs - The object the page holds on to
//
// `new BackgroundEffect(container, options)` mounts a canvas and starts the
// frame loop; `dispose()` (or `free()`) stops everything and takes the
// canvas back out. All browser callbacks share one `Rc<Inner>` and check
// `disposed` before touching the scene.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{HtmlCanvasElement, HtmlElement, PointerEvent, ResizeObserver, Window};

use crate::animation::Animation;
use crate::config::{Config, EffectKind, Settings};
use crate::error::Error;
use crate::field::ParticleField;
use crate::logging;
use crate::render::Scene;
use crate::sim::InkWorld;
use crate::viewport::Viewport;
use crate::vortex::Vortex;
use crate::webgl::WebGlBackend;

type EffectScene = Scene<WebGlBackend, Box<dyn Animation>>;
type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

struct Inner {
    scene: RefCell<EffectScene>,
    disposed: Cell<bool>,
    pending_frame: Cell<Option<i32>>,
    last_timestamp: Cell<Option<f64>>,
}

#[wasm_bindgen]
pub struct BackgroundEffect {
    inner: Rc<Inner>,
    window: Window,
    tick: FrameCallback,
    observer: Option<(ResizeObserver, Closure<dyn FnMut(js_sys::Array)>)>,
    pointer: Option<Closure<dyn FnMut(PointerEvent)>>,
    window_resize: Option<Closure<dyn FnMut()>>,
}

#[wasm_bindgen]
impl BackgroundEffect {
    /// Mount into `container`. `options` is a JSON object; see `Config`.
    /// Throws `RenderingUnsupported` when WebGL2 is missing and
    /// `InvalidOptions` for bad options.
    #[wasm_bindgen(constructor)]
    pub fn new(container: HtmlElement, options: Option<String>) -> Result<BackgroundEffect, JsValue> {
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        let config = Config::from_json(options.as_deref().unwrap_or(""))?;
        logging::init(&config.log_level);
        let settings = config.validate()?;

        let window = web_sys::window().ok_or_else(|| Error::Host("no window".into()))?;
        let viewport = initial_viewport(&settings, &container);

        let backend = WebGlBackend::mount(&container, settings.max_pixel_ratio, settings.width, settings.height)
            .inspect_err(|err| tracing::warn!(%err, "could not mount background"))?;
        let canvas = backend.canvas().clone();

        let scene = Scene::new(backend, animation_for(&settings, viewport), viewport)?;
        let inner = Rc::new(Inner {
            scene: RefCell::new(scene),
            disposed: Cell::new(false),
            pending_frame: Cell::new(None),
            last_timestamp: Cell::new(None),
        });

        let mut effect = BackgroundEffect {
            inner,
            window,
            tick: Rc::new(RefCell::new(None)),
            observer: None,
            pointer: None,
            window_resize: None,
        };

        // Roll back the mount if any listener fails to install
        if let Err(err) = effect.install(&settings, &container, &canvas) {
            effect.dispose();
            return Err(err);
        }

        tracing::info!(kind = ?settings.kind, seed = ?settings.seed, "background effect started");
        Ok(effect)
    }

    /// Stop the loop, drop every listener and release the GPU context.
    /// Safe to call more than once.
    pub fn dispose(&mut self) {
        if self.inner.disposed.replace(true) {
            return;
        }

        if let Some(id) = self.inner.pending_frame.take() {
            if self.window.cancel_animation_frame(id).is_err() {
                tracing::debug!(id, "frame already cancelled");
            }
        }
        self.tick.borrow_mut().take();

        if let Some((observer, _callback)) = self.observer.take() {
            observer.disconnect();
        }
        if let Some(callback) = self.pointer.take() {
            self.stop_listening("pointermove", callback.as_ref());
        }
        if let Some(callback) = self.window_resize.take() {
            self.stop_listening("resize", callback.as_ref());
        }

        match self.inner.scene.try_borrow_mut() {
            Ok(mut scene) => {
                scene.dispose();
            }
            Err(_) => tracing::error!("scene busy during dispose"),
        }
    }

    #[wasm_bindgen(js_name = isDisposed)]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Frames drawn so far. Stops moving once disposed.
    #[wasm_bindgen(getter)]
    pub fn frames(&self) -> f64 {
        self.inner.scene.try_borrow().map_or(0.0, |scene| scene.frames() as f64)
    }
}

impl BackgroundEffect {
    fn install(&mut self, settings: &Settings, container: &HtmlElement, canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
        self.start_loop()?;
        if settings.width.is_none() || settings.height.is_none() {
            self.observe_container(settings, container)?;
        }
        if settings.kind == EffectKind::Particles {
            self.follow_pointer(canvas)?;
        }
        self.follow_pixel_ratio()?;
        Ok(())
    }

    fn stop_listening(&self, event: &str, callback: &JsValue) {
        if let Err(err) = self.window.remove_event_listener_with_callback(event, callback.unchecked_ref()) {
            tracing::debug!(event, ?err, "listener already gone");
        }
    }

    /// Moving the window to another screen changes `devicePixelRatio`
    /// without resizing the container.
    fn follow_pixel_ratio(&mut self) -> Result<(), JsValue> {
        let inner = Rc::clone(&self.inner);
        let callback = Closure::<dyn FnMut()>::new(move || {
            if inner.disposed.get() {
                return;
            }
            if let Ok(mut scene) = inner.scene.try_borrow_mut() {
                scene.refresh_surface();
            }
        });

        self.window
            .add_event_listener_with_callback("resize", callback.as_ref().unchecked_ref())?;
        self.window_resize = Some(callback);
        Ok(())
    }

    fn start_loop(&mut self) -> Result<(), JsValue> {
        let inner = Rc::clone(&self.inner);
        let window = self.window.clone();
        let next = Rc::clone(&self.tick);

        *self.tick.borrow_mut() = Some(Closure::new(move |timestamp: f64| {
            if inner.disposed.get() {
                return;
            }
            inner.pending_frame.set(None);

            let dt = match inner.last_timestamp.replace(Some(timestamp)) {
                Some(last) => ((timestamp - last) / 1000.0).max(0.0) as f32,
                None => 0.0,
            };

            let result = match inner.scene.try_borrow_mut() {
                Ok(mut scene) => scene.frame(dt),
                Err(_) => Ok(()),
            };
            if let Err(err) = result {
                tracing::error!(%err, "frame failed; animation stopped");
                return;
            }

            if let Some(callback) = next.borrow().as_ref() {
                match window.request_animation_frame(callback.as_ref().unchecked_ref()) {
                    Ok(id) => inner.pending_frame.set(Some(id)),
                    Err(err) => tracing::error!(?err, "could not schedule frame"),
                }
            }
        }));

        if let Some(callback) = self.tick.borrow().as_ref() {
            let id = self.window.request_animation_frame(callback.as_ref().unchecked_ref())?;
            self.inner.pending_frame.set(Some(id));
        }
        Ok(())
    }

    fn observe_container(&mut self, settings: &Settings, container: &HtmlElement) -> Result<(), JsValue> {
        let inner = Rc::clone(&self.inner);
        let target = container.clone();
        let (fixed_w, fixed_h) = (settings.width, settings.height);

        let callback = Closure::<dyn FnMut(js_sys::Array)>::new(move |_entries: js_sys::Array| {
            if inner.disposed.get() {
                return;
            }
            let w = fixed_w.map_or(target.client_width() as f64, f64::from);
            let h = fixed_h.map_or(target.client_height() as f64, f64::from);
            let viewport = Viewport::from_css(w, h);
            if let Ok(mut scene) = inner.scene.try_borrow_mut() {
                scene.resize(viewport.width(), viewport.height());
            }
        });

        let observer = ResizeObserver::new(callback.as_ref().unchecked_ref())?;
        observer.observe(container);
        self.observer = Some((observer, callback));
        Ok(())
    }

    fn follow_pointer(&mut self, canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
        let inner = Rc::clone(&self.inner);
        let canvas = canvas.clone();

        let callback = Closure::<dyn FnMut(PointerEvent)>::new(move |event: PointerEvent| {
            if inner.disposed.get() {
                return;
            }
            let rect = canvas.get_bounding_client_rect();
            let x = event.client_x() as f64 - rect.left();
            let y = event.client_y() as f64 - rect.top();
            if let Ok(mut scene) = inner.scene.try_borrow_mut() {
                scene.pointer(x, y);
            }
        });

        self.window
            .add_event_listener_with_callback("pointermove", callback.as_ref().unchecked_ref())?;
        self.pointer = Some(callback);
        Ok(())
    }
}

impl Drop for BackgroundEffect {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn initial_viewport(settings: &Settings, container: &HtmlElement) -> Viewport {
    let w = settings.width.map_or(container.client_width() as f64, f64::from);
    let h = settings.height.map_or(container.client_height() as f64, f64::from);
    Viewport::from_css(w, h)
}

fn animation_for(settings: &Settings, viewport: Viewport) -> Box<dyn Animation> {
    match settings.kind {
        EffectKind::Ink => Box::new(InkWorld::new(settings, viewport)),
        EffectKind::Particles => Box::new(ParticleField::new(settings, viewport)),
        EffectKind::Vortex => Box::new(Vortex::new(viewport)),
    }
}
