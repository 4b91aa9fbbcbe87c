//! Runtime configuration, gathered from command-line flags and environment.

/// Default database file, relative to the working directory.
pub const DEFAULT_DATABASE: &str = "splitbill.db";

/// Environment variable holding a tracing filter directive.
pub const LOG_FILTER_ENV: &str = "SPLITBILL_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// SQLite database file path
    pub database: String,
    /// Raise logging to debug for this crate
    pub verbose: bool,
    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_string(),
            verbose: false,
            log_json: false,
        }
    }
}

impl Config {
    /// Filter directive used when no environment filter is set.
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose { "splitbill=debug" } else { "warn" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_depends_on_verbosity() {
        let mut config = Config::default();
        assert_eq!(config.database, "splitbill.db");
        assert_eq!(config.default_log_filter(), "warn");

        config.verbose = true;
        assert_eq!(config.default_log_filter(), "splitbill=debug");
    }
}
