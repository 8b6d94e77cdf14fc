use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, de};
use tracing::level_filters::LevelFilter;

/// Controls the logging system.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Logging {
    /// The log level for the avatar cache.
    #[serde(deserialize_with = "deserialize_level_filter")]
    pub level: LevelFilter,
}

impl Default for Logging {
    fn default() -> Self {
        Logging {
            level: LevelFilter::INFO,
        }
    }
}

/// Static configuration of the avatar cache.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Controls the logging system.
    pub logging: Logging,

    /// The timeout for establishing a connection to an avatar endpoint.
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Global timeout for fetching one avatar, including the bounded retry.
    #[serde(with = "humantime_serde")]
    pub max_download_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: Logging::default(),
            connect_timeout: Duration::from_millis(500),
            max_download_timeout: Duration::from_secs(15),
        }
    }
}

impl Config {
    /// Loads the configuration from the given YAML file, or the defaults
    /// when no path is provided.
    pub fn get(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_reader(
                fs::File::open(path).context("failed to open configuration file")?,
            ),
            None => Ok(Config::default()),
        }
    }

    fn from_reader(mut reader: impl std::io::Read) -> Result<Self> {
        let mut config = String::new();
        reader
            .read_to_string(&mut config)
            .context("failed reading config file")?;
        if config.trim().is_empty() {
            anyhow::bail!("config file empty");
        }
        serde_yaml::from_str(&config).context("failed to parse config YAML")
    }
}

#[derive(Debug)]
struct LevelFilterVisitor;

impl de::Visitor<'_> for LevelFilterVisitor {
    type Value = LevelFilter;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> std::fmt::Result {
        write!(
            formatter,
            r#"one of the strings "off", "error", "warn", "info", "debug", or "trace""#
        )
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        match v {
            "off" => Ok(LevelFilter::OFF),
            "error" => Ok(LevelFilter::ERROR),
            "warn" => Ok(LevelFilter::WARN),
            "info" => Ok(LevelFilter::INFO),
            "debug" => Ok(LevelFilter::DEBUG),
            "trace" => Ok(LevelFilter::TRACE),
            _ => Err(de::Error::unknown_variant(
                v,
                &["off", "error", "warn", "info", "debug", "trace"],
            )),
        }
    }
}

fn deserialize_level_filter<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<LevelFilter, D::Error> {
    deserializer.deserialize_str(LevelFilterVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::get(None).unwrap();
        assert_eq!(cfg.connect_timeout, Duration::from_millis(500));
        assert_eq!(cfg.max_download_timeout, Duration::from_secs(15));
        assert_eq!(cfg.logging.level, LevelFilter::INFO);
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
logging:
  level: debug
connect_timeout: 1s
max_download_timeout: 2m
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.logging.level, LevelFilter::DEBUG);
        assert_eq!(cfg.connect_timeout, Duration::from_secs(1));
        assert_eq!(cfg.max_download_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_empty_config_rejected() {
        let result = Config::from_reader("  \n".as_bytes());
        assert!(result.is_err());
    }
}
