//! Loader for scraper configuration with file + environment overlays.
//!
//! Precedence, lowest first: built-in defaults, an optional config file
//! (YAML/TOML/JSON, inferred by suffix), `SIPHON_`-prefixed variables, and
//! finally the two documented plain variables `MAX_CONTENT_SIZE` (bytes) and
//! `REQUEST_TIMEOUT` (seconds).
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const MAX_CONTENT_SIZE_ENV: &str = "MAX_CONTENT_SIZE";
pub const REQUEST_TIMEOUT_ENV: &str = "REQUEST_TIMEOUT";

pub const DEFAULT_MAX_CONTENT_SIZE: usize = 1024 * 1024;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 10_000;

/// Process-wide settings, read once at start and passed by reference.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SiphonConfig {
    /// Upper bound for the (declared or streamed) response body, in bytes.
    #[serde(default = "default_max_content_size")]
    pub max_content_size: usize,
    /// Whole-exchange timeout, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    /// Characters of clean text kept before the truncation marker.
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,
    /// Action group reported when the invocation does not name one.
    #[serde(default = "default_action_group")]
    pub action_group: String,
    /// Function reported when the invocation does not name one.
    #[serde(default = "default_function")]
    pub function: String,
}

fn default_max_content_size() -> usize {
    DEFAULT_MAX_CONTENT_SIZE
}
fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}
fn default_max_text_length() -> usize {
    DEFAULT_MAX_TEXT_LENGTH
}
fn default_action_group() -> String {
    "web_scrape".into()
}
fn default_function() -> String {
    "scrape_website".into()
}

impl Default for SiphonConfig {
    fn default() -> Self {
        Self {
            max_content_size: default_max_content_size(),
            request_timeout: default_request_timeout(),
            max_text_length: default_max_text_length(),
            action_group: default_action_group(),
            function: default_function(),
        }
    }
}

impl SiphonConfig {
    pub fn request_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.max_content_size == 0 {
            return Err(ConfigError::Message(
                "max_content_size must be greater than zero".into(),
            ));
        }
        if self.request_timeout == 0 {
            return Err(ConfigError::Message(
                "request_timeout must be at least one second".into(),
            ));
        }
        if self.max_text_length == 0 {
            return Err(ConfigError::Message(
                "max_text_length must be greater than zero".into(),
            ));
        }
        Ok(self)
    }
}

/// Builder hides the `config` crate wiring (file + env overrides).
pub struct SiphonConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for SiphonConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SiphonConfigLoader {
    /// Start from the built-in defaults. `SIPHON_` variables are layered on in
    /// [`load`](Self::load), above every file source.
    ///
    /// ```
    /// use siphon_config::SiphonConfigLoader;
    ///
    /// let config = SiphonConfigLoader::new()
    ///     .with_yaml_str("max_text_length: 500")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.max_text_length, 500);
    /// assert_eq!(config.action_group, "web_scrape");
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a required YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent, so deployments can rely purely on environment
    /// variables.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder, apply the plain `MAX_CONTENT_SIZE` / `REQUEST_TIMEOUT`
    /// variables on top, and deserialize into a validated [`SiphonConfig`].
    ///
    /// ```
    /// use siphon_config::SiphonConfigLoader;
    ///
    /// temp_env::with_var("REQUEST_TIMEOUT", Some("5"), || {
    ///     let config = SiphonConfigLoader::new()
    ///         .with_yaml_str("request_timeout: 60")
    ///         .load()
    ///         .expect("valid configuration");
    ///     assert_eq!(config.request_timeout, 5);
    ///     assert_eq!(config.max_content_size, 1024 * 1024);
    /// });
    /// ```
    pub fn load(self) -> Result<SiphonConfig, ConfigError> {
        let max_content_size = read_env_number::<u64>(MAX_CONTENT_SIZE_ENV)?;
        let request_timeout = read_env_number::<u64>(REQUEST_TIMEOUT_ENV)?;

        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("SIPHON")
                    .prefix_separator("_")
                    .try_parsing(true),
            )
            .set_override_option("max_content_size", max_content_size)?
            .set_override_option("request_timeout", request_timeout)?
            .build()?;

        let typed: SiphonConfig = cfg.try_deserialize()?;
        typed.validate()
    }
}

fn read_env_number<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| {
                ConfigError::Message(format!("{name}={raw:?} is not a valid number: {e}"))
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const PLAIN_VARS: [(&str, Option<&str>); 2] =
        [(MAX_CONTENT_SIZE_ENV, None), (REQUEST_TIMEOUT_ENV, None)];

    #[test]
    #[serial]
    fn defaults_match_documented_values() {
        temp_env::with_vars(PLAIN_VARS, || {
            let cfg = SiphonConfigLoader::new().load().unwrap();
            assert_eq!(cfg, SiphonConfig::default());
            assert_eq!(cfg.max_content_size, 1_048_576);
            assert_eq!(cfg.request_timeout_duration(), Duration::from_secs(30));
            assert_eq!(cfg.max_text_length, 10_000);
        });
    }

    #[test]
    #[serial]
    fn plain_env_overrides_file_values() {
        temp_env::with_vars(
            [
                (MAX_CONTENT_SIZE_ENV, Some("2048")),
                (REQUEST_TIMEOUT_ENV, Some(" 7 ")),
            ],
            || {
                let cfg = SiphonConfigLoader::new()
                    .with_yaml_str("max_content_size: 99\nrequest_timeout: 99")
                    .load()
                    .unwrap();
                assert_eq!(cfg.max_content_size, 2048);
                assert_eq!(cfg.request_timeout, 7);
            },
        );
    }

    #[test]
    #[serial]
    fn prefixed_env_sets_other_fields() {
        temp_env::with_vars(
            [
                (MAX_CONTENT_SIZE_ENV, None),
                (REQUEST_TIMEOUT_ENV, None),
                ("SIPHON_MAX_TEXT_LENGTH", Some("250")),
                ("SIPHON_ACTION_GROUP", Some("scraper-group")),
            ],
            || {
                let cfg = SiphonConfigLoader::new().load().unwrap();
                assert_eq!(cfg.max_text_length, 250);
                assert_eq!(cfg.action_group, "scraper-group");
            },
        );
    }

    #[test]
    #[serial]
    fn garbage_number_is_rejected_with_variable_name() {
        temp_env::with_vars(
            [(MAX_CONTENT_SIZE_ENV, None), (REQUEST_TIMEOUT_ENV, Some("soon"))],
            || {
                let err = SiphonConfigLoader::new().load().unwrap_err();
                assert!(err.to_string().contains("REQUEST_TIMEOUT"));
            },
        );
    }

    #[test]
    #[serial]
    fn zero_limits_are_rejected() {
        temp_env::with_vars(
            [(MAX_CONTENT_SIZE_ENV, Some("0")), (REQUEST_TIMEOUT_ENV, None)],
            || {
                let err = SiphonConfigLoader::new().load().unwrap_err();
                assert!(err.to_string().contains("max_content_size"));
            },
        );
    }
}
