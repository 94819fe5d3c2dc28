// error.rs - Crate error type
//
// Everything fallible in the engine funnels into `Error`. The browser layer
// turns it into a JS `Error` so the page can catch `RenderingUnsupported`
// and fall back to a static background.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The host could not hand out a WebGL2 context.
    #[error("rendering unsupported: {0}")]
    RenderingUnsupported(String),

    #[error("invalid {field}: {value} (must be finite and non-negative)")]
    InvalidDimension { field: &'static str, value: f64 },

    #[error("invalid color {0:?} (expected #rgb or #rrggbb)")]
    InvalidColor(String),

    #[error("invalid options: {0}")]
    Config(#[from] serde_json::Error),

    #[error("{stage} shader failed: {log}")]
    Shader { stage: &'static str, log: String },

    /// A DOM or WebGL call threw.
    #[error("host error: {0}")]
    Host(String),
}

impl Error {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::RenderingUnsupported(_))
    }
}

impl From<wasm_bindgen::JsValue> for Error {
    fn from(js: wasm_bindgen::JsValue) -> Self {
        Error::Host(js.as_string().unwrap_or_else(|| format!("{js:?}")))
    }
}

impl From<Error> for wasm_bindgen::JsValue {
    fn from(err: Error) -> Self {
        let js = js_sys::Error::new(&err.to_string());
        let name = match err {
            Error::RenderingUnsupported(_) => "RenderingUnsupported",
            Error::InvalidDimension { .. } | Error::InvalidColor(_) | Error::Config(_) => {
                "InvalidOptions"
            }
            Error::Shader { .. } => "ShaderError",
            Error::Host(_) => "HostError",
        };
        js.set_name(name);
        js.into()
    }
}
