//! Common configuration types for the signaling client components.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default tracing filter directive.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Logging configuration.
///
/// The library never holds a process-wide log level; this only describes the
/// subscriber an embedding application installs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive string (e.g. `signaling=debug,info`)
    pub filter: String,
    /// Enable JSON-formatted logs
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            json: false,
        }
    }
}

impl LogConfig {
    /// Load from a variable map. Reads `SIGNALING_LOG` and `SIGNALING_LOG_JSON`.
    #[must_use]
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let filter = vars
            .get("SIGNALING_LOG")
            .cloned()
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        let json = vars
            .get("SIGNALING_LOG_JSON")
            .and_then(|s| s.parse().ok())
            .unwrap_or(false);

        Self { filter, json }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LogConfig::from_vars(&HashMap::new());
        assert_eq!(config, LogConfig::default());
    }

    #[test]
    fn test_custom_values() {
        let vars = HashMap::from([
            ("SIGNALING_LOG".to_string(), "signaling=trace".to_string()),
            ("SIGNALING_LOG_JSON".to_string(), "true".to_string()),
        ]);
        let config = LogConfig::from_vars(&vars);
        assert_eq!(config.filter, "signaling=trace");
        assert!(config.json);
    }

    #[test]
    fn test_unparseable_json_flag_falls_back() {
        let vars = HashMap::from([("SIGNALING_LOG_JSON".to_string(), "yes".to_string())]);
        assert!(!LogConfig::from_vars(&vars).json);
    }
}
