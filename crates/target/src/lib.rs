//! Ambient stack (configuration, logging, error vocabulary) plus the facade
//! that wires the per-concern engines together into one running target
//! (spec.md §6, §8).

pub mod config;
pub mod error;
pub mod facade;

pub use config::Config;
pub use error::{Error, Result};
pub use facade::Target;

/// Installs a `tracing-subscriber` registry driven by `RUST_LOG`, the same
/// role the teacher's binary crate's `init_tracing` plays. Call once at
/// process start; a second call is a no-op rather than a panic, since tests
/// may end up calling it more than once across the crate.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
