//! Client construction options.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::Result;
use crate::pacer::{PacerConfig, DEFAULT_MAX_RETRIES, DEFAULT_PACE_INTERVAL, DEFAULT_PACE_LIMIT};

pub const ENV_API_KEY: &str = "OCD_API_KEY";
pub const ENV_API_URL: &str = "OCD_API_URL";
pub const DEFAULT_API_URL: &str = "https://api.opencagedata.com/geocode/v1/json";
pub const DEFAULT_USER_AGENT: &str = concat!("ocd-geocoder/", env!("CARGO_PKG_VERSION"));

/// Options for [`crate::Geocoder`]. Every field is optional.
///
/// Can be built in code or loaded from a TOML file:
///
/// ```toml
/// api_key = "..."
/// pace_limit = 1
/// pace_interval_ms = 1000
/// cached = true
/// ```
#[derive(Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeocoderOptions {
    /// Falls back to `OCD_API_KEY`, then to no key
    pub api_key: Option<String>,
    /// Falls back to `OCD_API_URL`, then to [`DEFAULT_API_URL`]
    pub api_url: Option<String>,
    /// Requests per interval
    pub pace_limit: Option<u32>,
    pub pace_interval_ms: Option<u64>,
    /// Re-submissions after an HTTP 429
    pub max_retries: Option<u32>,
    /// Cache successful responses (default true)
    pub cached: Option<bool>,
    pub request_timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
}

impl GeocoderOptions {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let options: GeocoderOptions = toml::from_str(&content)?;
        Ok(options)
    }

    /// Resolve against the process environment
    pub fn resolve(&self) -> ResolvedOptions {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolve with a custom environment lookup
    pub fn resolve_with<F>(&self, env: F) -> ResolvedOptions
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |v: &String| !v.is_empty();

        let api_key = self
            .api_key
            .clone()
            .filter(non_empty)
            .or_else(|| env(ENV_API_KEY).filter(non_empty))
            .unwrap_or_default();

        let api_url = self
            .api_url
            .clone()
            .filter(non_empty)
            .or_else(|| env(ENV_API_URL).filter(non_empty))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let pacer = PacerConfig {
            limit: self.pace_limit.unwrap_or(DEFAULT_PACE_LIMIT),
            interval: self
                .pace_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_PACE_INTERVAL),
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            admission_timeout: None,
        };

        ResolvedOptions {
            api_key,
            api_url,
            pacer,
            cached: self.cached.unwrap_or(true),
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
            user_agent: self
                .user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        }
    }
}

/// Options with every fallback applied
#[derive(Clone)]
pub struct ResolvedOptions {
    pub api_key: String,
    pub api_url: String,
    pub pacer: PacerConfig,
    pub cached: bool,
    pub request_timeout: Option<Duration>,
    pub user_agent: String,
}

impl std::fmt::Debug for GeocoderOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeocoderOptions")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("api_url", &self.api_url)
            .field("pace_limit", &self.pace_limit)
            .field("pace_interval_ms", &self.pace_interval_ms)
            .field("max_retries", &self.max_retries)
            .field("cached", &self.cached)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl std::fmt::Debug for ResolvedOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedOptions")
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("api_url", &self.api_url)
            .field("pacer", &self.pacer)
            .field("cached", &self.cached)
            .field("request_timeout", &self.request_timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let resolved = GeocoderOptions::default().resolve_with(no_env);
        assert_eq!(resolved.api_key, "");
        assert_eq!(resolved.api_url, DEFAULT_API_URL);
        assert_eq!(resolved.pacer.limit, 1);
        assert_eq!(resolved.pacer.interval, Duration::from_millis(1000));
        assert!(resolved.cached);
        assert!(resolved.request_timeout.is_none());
    }

    #[test]
    fn test_env_fallback() {
        let env = |name: &str| match name {
            ENV_API_KEY => Some("env-key".to_string()),
            ENV_API_URL => Some("http://localhost:8080/json".to_string()),
            _ => None,
        };
        let resolved = GeocoderOptions::default().resolve_with(env);
        assert_eq!(resolved.api_key, "env-key");
        assert_eq!(resolved.api_url, "http://localhost:8080/json");

        let explicit = GeocoderOptions {
            api_key: Some("explicit".into()),
            ..Default::default()
        };
        assert_eq!(explicit.resolve_with(env).api_key, "explicit");
    }

    #[test]
    fn test_empty_values_fall_through() {
        let options = GeocoderOptions {
            api_key: Some(String::new()),
            api_url: Some(String::new()),
            ..Default::default()
        };
        let resolved = options.resolve_with(|_| Some(String::new()));
        assert_eq!(resolved.api_key, "");
        assert_eq!(resolved.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_debug_masks_key() {
        let options = GeocoderOptions {
            api_key: Some("hunter2".into()),
            ..Default::default()
        };
        let debug = format!("{:?}", options.resolve_with(no_env));
        assert!(!debug.contains("hunter2"));

        let debug = format!("{:?}", options);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("api_key: Some(\"***\")"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "api_key = \"abc\"\npace_limit = 5\npace_interval_ms = 250\ncached = false"
        )
        .unwrap();

        let options = GeocoderOptions::load_from_file(file.path()).unwrap();
        let resolved = options.resolve_with(no_env);
        assert_eq!(resolved.api_key, "abc");
        assert_eq!(resolved.pacer.limit, 5);
        assert_eq!(resolved.pacer.interval, Duration::from_millis(250));
        assert!(!resolved.cached);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_kye = \"typo\"").unwrap();
        assert!(GeocoderOptions::load_from_file(file.path()).is_err());
    }
}
