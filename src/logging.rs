// logging.rs - tracing subscriber setup
//
// Installed once per page; later calls (a second effect on the same page)
// keep the first subscriber. In the browser the formatted lines go to the
// devtools console, natively to stderr.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber at `level` ("info", "debug",
/// "ink_engine=trace", ...). An unparsable level falls back to `info`.
pub fn init(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    #[cfg(target_arch = "wasm32")]
    let builder = builder.without_time().with_ansi(false).with_writer(console::ConsoleMakeWriter);

    if builder.try_init().is_ok() {
        tracing::debug!(level, "logging ready");
    }
}

#[cfg(target_arch = "wasm32")]
mod console {
    use std::io;

    use tracing::{Level, Metadata};
    use tracing_subscriber::fmt::MakeWriter;

    /// Routes each event to the console method matching its level.
    pub struct ConsoleMakeWriter;

    pub struct ConsoleWriter {
        level: Level,
        buf: Vec<u8>,
    }

    impl io::Write for ConsoleWriter {
        fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
            self.buf.extend_from_slice(bytes);
            Ok(bytes.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Drop for ConsoleWriter {
        // One event per writer, so emit on drop
        fn drop(&mut self) {
            let text = String::from_utf8_lossy(&self.buf);
            let line = wasm_bindgen::JsValue::from_str(text.trim_end());
            match self.level {
                Level::ERROR => web_sys::console::error_1(&line),
                Level::WARN => web_sys::console::warn_1(&line),
                _ => web_sys::console::log_1(&line),
            }
        }
    }

    impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
        type Writer = ConsoleWriter;

        fn make_writer(&'a self) -> ConsoleWriter {
            ConsoleWriter { level: Level::INFO, buf: Vec::new() }
        }

        fn make_writer_for(&'a self, meta: &Metadata<'_>) -> ConsoleWriter {
            ConsoleWriter { level: *meta.level(), buf: Vec::new() }
        }
    }
}
