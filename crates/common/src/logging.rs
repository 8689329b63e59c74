//! Tracing subscriber installation for applications embedding the client.

use crate::config::LogConfig;
use crate::error::{CommonError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a global `tracing` subscriber described by `config`.
///
/// `RUST_LOG`, when set, takes precedence over `config.filter`.
///
/// # Errors
///
/// Returns `CommonError::Configuration` for an invalid filter directive and
/// `CommonError::Logging` if a global subscriber is already installed.
pub fn try_init(config: &LogConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)
            .map_err(|e| CommonError::Configuration(format!("invalid log filter: {e}")))?,
    };

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    result.map_err(|e| CommonError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        let config = LogConfig::default();
        // Another test in this binary may have installed one already.
        let _ = try_init(&config);
        assert!(matches!(try_init(&config), Err(CommonError::Logging(_))));
    }
}
