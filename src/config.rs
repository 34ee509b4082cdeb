// Configuration module for reqtrace
// Reads from environment variables with sensible defaults

use std::env;
use std::str::FromStr;
use std::sync::OnceLock;

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Resolution engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// How many nodes to climb from a source position looking for type information
    /// (REQTRACE_ANCESTOR_SEARCH_DEPTH)
    pub ancestor_search_depth: usize,

    /// Maximum number of declarations followed when a supported-types member returns a
    /// variable (REQTRACE_MAX_CHASE_DEPTH)
    pub max_chase_depth: usize,

    /// Worker threads for the dependency fan-out, 0 lets rayon decide (REQTRACE_FANOUT_THREADS)
    pub fanout_threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ancestor_search_depth: 3,
            max_chase_depth: 8,
            fanout_threads: 0,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        let mut config = Config::default();
        override_from_env(
            "REQTRACE_ANCESTOR_SEARCH_DEPTH",
            &mut config.ancestor_search_depth,
        );
        override_from_env("REQTRACE_MAX_CHASE_DEPTH", &mut config.max_chase_depth);
        override_from_env("REQTRACE_FANOUT_THREADS", &mut config.fanout_threads);
        config
    }

    /// Get the global configuration instance
    pub fn get() -> &'static Config {
        CONFIG.get_or_init(Config::from_env)
    }
}

fn override_from_env<T>(key: &str, slot: &mut T)
where
    T: FromStr + std::fmt::Display,
{
    let Ok(val) = env::var(key) else {
        return;
    };
    match val.parse() {
        Ok(parsed) => *slot = parsed,
        Err(_) => tracing::warn!(
            "Invalid {} value: {}, using default: {}",
            key,
            val,
            slot
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ancestor_search_depth, 3);
        assert_eq!(config.max_chase_depth, 8);
        assert_eq!(config.fanout_threads, 0);
    }

    #[test]
    fn invalid_override_keeps_default() {
        let mut depth = 3usize;
        unsafe { env::set_var("REQTRACE_TEST_DEPTH", "not-a-number") };
        override_from_env("REQTRACE_TEST_DEPTH", &mut depth);
        assert_eq!(depth, 3);
        unsafe { env::set_var("REQTRACE_TEST_DEPTH", "5") };
        override_from_env("REQTRACE_TEST_DEPTH", &mut depth);
        assert_eq!(depth, 5);
        unsafe { env::remove_var("REQTRACE_TEST_DEPTH") };
    }
}
