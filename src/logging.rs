use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the log filter, e.g. `RETYPE_LOG=debug`.
pub const LOG_ENV: &str = "RETYPE_LOG";

/// Send logs to `path`. The terminal belongs to the TUI, so nothing goes to
/// stdout or stderr. Returns false when the subscriber could not be set up.
pub fn init(path: &Path) -> bool {
    if let Some(parent) = path.parent() {
        if std::fs::create_dir_all(parent).is_err() {
            return false;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(path) else {
        return false;
    };

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .is_ok()
}
