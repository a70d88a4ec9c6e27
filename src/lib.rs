// Library surface for the binary and for headless/integration tests.
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod illustration;
pub mod library;
pub mod logging;
pub mod paginator;
pub mod render;
pub mod runtime;
pub mod session;
pub mod store;
pub mod ui;

pub use error::{Error, Result};

/// How long the event loop waits for input before ticking.
pub const TICK_RATE_MS: u64 = 100;
