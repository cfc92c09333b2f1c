//! Settings and runner configuration.

use serde::Deserialize;

/// Connection settings for the persistence layer.
///
/// Loaded by the host application (deserialized from its settings file) and
/// handed down explicitly; the framework holds no process-wide state.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub connection: String,
    #[serde(default)]
    pub test_connection: Option<String>,
}

impl Settings {
    /// The connection URL to use; QA runs prefer `test_connection`.
    pub fn url(&self, test: bool) -> &str {
        if test {
            self.test_connection.as_deref().unwrap_or(&self.connection)
        } else {
            &self.connection
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            connection: "mem://".to_string(),
            test_connection: None,
        }
    }
}

/// Controls suite execution and reporting.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// 0 = summary only, 1 = one line per unit, 2 = per-call detail.
    pub verbosity: u8,
    /// Abort the suite after the first failure or error.
    pub failfast: bool,
    pub use_colors: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            verbosity: 1,
            failfast: false,
            use_colors: atty::is(atty::Stream::Stderr),
        }
    }
}

impl RunnerConfig {
    pub fn new(verbosity: u8, failfast: bool) -> Self {
        Self {
            verbosity,
            failfast,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_prefers_test_connection_for_qa_runs() {
        let settings = Settings {
            connection: "mem://prod".to_string(),
            test_connection: Some("mem://test".to_string()),
        };
        assert_eq!(settings.url(false), "mem://prod");
        assert_eq!(settings.url(true), "mem://test");
    }

    #[test]
    fn url_falls_back_without_test_connection() {
        let settings = Settings::default();
        assert_eq!(settings.url(true), "mem://");
    }

    #[test]
    fn settings_deserialize() {
        let settings: Settings = serde_json::from_str(r#"{"connection": "mem://x"}"#).unwrap();
        assert_eq!(settings.connection, "mem://x");
        assert!(settings.test_connection.is_none());
    }
}
