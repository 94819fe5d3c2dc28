// ============================================================================
// INK ENGINE - Animated backgrounds for the site, rendered with WebGL2
// ============================================================================
//
// Three effects share one presenter:
//
//   ink        strokes that drip, shed droplets and let them fall and merge
//   particles  a drifting glow field that reaches for the pointer
//   vortex     full-screen shader rings
//
// The simulations are plain Rust and step with `Animation::step(dt)`.
// `render::Scene` turns their shapes into backend calls; `webgl` is the
// browser backend and `headless` the in-memory one used by tests.
// In the browser, `BackgroundEffect` is the only export.

pub mod animation;
pub mod color;
pub mod config;
pub mod error;
pub mod field;
pub mod headless;
pub mod logging;
pub mod mesh;
pub mod render;
pub mod rng;
pub mod sim;
pub mod viewport;
pub mod vortex;

#[cfg(target_arch = "wasm32")]
mod effect;
#[cfg(target_arch = "wasm32")]
pub mod webgl;

pub use animation::{Animation, EntityId, FrameEvents};
pub use color::Color;
pub use config::{Config, EffectKind, Settings};
pub use error::{Error, Result};
pub use field::ParticleField;
pub use headless::HeadlessBackend;
pub use render::{Backend, Scene, SceneState};
pub use sim::InkWorld;
pub use viewport::Viewport;
pub use vortex::Vortex;

#[cfg(target_arch = "wasm32")]
pub use effect::BackgroundEffect;
