//! Observability: subscriber setup and definition lifecycle events.

mod tracing;

pub use self::tracing::{
    DefinitionEmitter, DefinitionSpanAttributes, LoggingDefinitionEmitter, NoOpDefinitionEmitter,
    SpanTimer,
};

use tracing_subscriber::{fmt, EnvFilter};

/// Installs a formatting subscriber filtered by `RUST_LOG`, or by
/// `default_filter` when `RUST_LOG` is unset or invalid.
///
/// Returns false if a global subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt().with_env_filter(filter).with_target(true).try_init().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing("stepflow=debug");
        assert!(!init_tracing("stepflow=debug"));
    }
}
