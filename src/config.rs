//! Runtime configuration for the auth client and the reconciler. Values come
//! from CLI arguments (with environment fallbacks) on native targets and from
//! `window.PERMGATE_CONFIG` in the browser. Configuration values are public;
//! do not store secrets here.

use std::time::Duration;

/// Route the user is sent to when the session ends or is rejected.
pub const DEFAULT_ANONYMOUS_ROUTE: &str = "/";
/// Default request timeout applied to every remote call.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
/// Element checks run one at a time unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 1;

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub anonymous_route: String,
    pub concurrency: usize,
    pub request_timeout: Duration,
}

impl Config {
    #[must_use]
    pub fn new(api_base_url: &str) -> Self {
        Self {
            api_base_url: api_base_url.trim().to_string(),
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            anonymous_route: DEFAULT_ANONYMOUS_ROUTE.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            request_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

/// Optional values read at runtime; `None` keeps the configured value.
#[derive(Default)]
pub struct RuntimeOverrides {
    pub api_base_url: Option<String>,
    pub anonymous_route: Option<String>,
    pub concurrency: Option<usize>,
}

pub fn apply_overrides(config: &mut Config, runtime: RuntimeOverrides) {
    if let Some(value) = runtime.api_base_url {
        config.api_base_url = value;
    }
    if let Some(value) = runtime.anonymous_route {
        config.anonymous_route = value;
    }
    if let Some(value) = runtime.concurrency {
        config.concurrency = value.max(1);
    }
}

/// Trims a runtime value and treats blank strings as unset.
#[must_use]
pub fn normalize_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, RuntimeOverrides, apply_overrides, normalize_value};

    #[test]
    fn normalize_value_trims_and_rejects_empty() {
        assert_eq!(normalize_value(""), None);
        assert_eq!(normalize_value("   "), None);
        assert_eq!(
            normalize_value("  https://erp.example "),
            Some("https://erp.example".to_string())
        );
    }

    #[test]
    fn apply_overrides_ignores_missing_values() {
        let mut config = Config::new("https://api.default");
        let runtime = RuntimeOverrides {
            api_base_url: normalize_value(" "),
            anonymous_route: normalize_value(""),
            concurrency: None,
        };

        apply_overrides(&mut config, runtime);

        assert_eq!(config.api_base_url, "https://api.default");
        assert_eq!(config.anonymous_route, "/");
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn apply_overrides_overwrites_when_present() {
        let mut config = Config::new("https://api.default");
        let runtime = RuntimeOverrides {
            api_base_url: normalize_value("https://api.override"),
            anonymous_route: normalize_value("/login"),
            concurrency: Some(0),
        };

        apply_overrides(&mut config, runtime);

        assert_eq!(config.api_base_url, "https://api.override");
        assert_eq!(config.anonymous_route, "/login");
        // zero would stall the reconciler; clamp to sequential
        assert_eq!(config.concurrency, 1);
    }
}
