//! Runtime configuration loaded from the environment.

use std::fmt;
use std::time::Duration;

use figment::Figment;
use figment::providers::Env;
use fundu::DurationParser;
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

use crate::ingest::DEFAULT_BATCH_SIZE;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base tracing level for this crate's modules.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database_url: String,
    #[serde(default = "default_catalog_base_url")]
    pub catalog_base_url: String,
    /// Upper bound on a single catalog page request.
    #[serde(
        default = "default_catalog_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub catalog_timeout: Duration,
    #[serde(default = "default_batch_size")]
    pub ingest_batch_size: usize,
    #[serde(
        default = "default_shutdown_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub shutdown_timeout: Duration,
}

impl Config {
    /// Extract from raw environment variables (`DATABASE_URL`, `PORT`, ...).
    pub fn from_env() -> Result<Self, figment::Error> {
        Figment::new().merge(Env::raw()).extract()
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_catalog_base_url() -> String {
    "https://api.tvmaze.com".to_string()
}

fn default_catalog_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(8)
}

/// Accepts either a bare number of seconds or a duration string such as `"1.5s"` or `"2m"`.
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct DurationVisitor;

    impl Visitor<'_> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a number of seconds or a duration string like \"30s\"")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Duration, E> {
            Ok(Duration::from_secs(value))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Duration, E> {
            u64::try_from(value)
                .map(Duration::from_secs)
                .map_err(|_| E::custom(format!("duration cannot be negative: {value}")))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Duration, E> {
            let parsed = DurationParser::with_all_time_units()
                .parse(value.trim())
                .map_err(|e| E::custom(format!("invalid duration '{value}': {e}")))?;
            Duration::try_from(parsed)
                .map_err(|e| E::custom(format!("invalid duration '{value}': {e}")))
        }
    }

    deserializer.deserialize_any(DurationVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::providers::{Format, Toml};

    fn extract(toml: &str) -> Result<Config, figment::Error> {
        Figment::new().merge(Toml::string(toml)).extract()
    }

    #[test]
    fn test_defaults_apply() {
        let config = extract(r#"database_url = "postgres://localhost/shows""#).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.catalog_base_url, "https://api.tvmaze.com");
        assert_eq!(config.catalog_timeout, Duration::from_secs(30));
        assert_eq!(config.ingest_batch_size, 1000);
    }

    #[test]
    fn test_duration_strings_and_numbers() {
        let config = extract(
            r#"
            database_url = "postgres://localhost/shows"
            catalog_timeout = "2m"
            shutdown_timeout = 15
            "#,
        )
        .unwrap();

        assert_eq!(config.catalog_timeout, Duration::from_secs(120));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_invalid_duration_is_rejected() {
        let result = extract(
            r#"
            database_url = "postgres://localhost/shows"
            catalog_timeout = "soon"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_database_url_is_rejected() {
        assert!(extract("port = 9000").is_err());
    }
}
