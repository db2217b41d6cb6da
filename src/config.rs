use std::{env, path::PathBuf};

use thiserror::Error;

use crate::pipeline::config::{
    DEFAULT_FINANCIAL_AUTHORITIES, DEFAULT_FINANCIAL_KEYWORDS, DEFAULT_FINANCIAL_SECTORS,
    DigestConfig, GapFillConfig, QualityConfig, SelectionConfig, WindowConfig,
};

#[cfg(test)]
use once_cell::sync::Lazy;
#[cfg(test)]
pub(crate) static ENV_MUTEX: Lazy<std::sync::Mutex<()>> = Lazy::new(|| std::sync::Mutex::new(()));

/// Process configuration, read once at start-up.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pool_path: PathBuf,
    history_path: Option<PathBuf>,
    profile_path: Option<PathBuf>,
    schedule_enabled: bool,
    schedule_hour: u32,
    schedule_minute: u32,
    schedule_utc_offset_hours: i32,
    digest: DigestConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl Config {
    /// Read the worker configuration from the environment.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when `DIGEST_POOL_PATH` is unset or any value
    /// fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let pool_path = PathBuf::from(env_var("DIGEST_POOL_PATH")?);
        let history_path = optional_var("DIGEST_HISTORY_PATH").map(PathBuf::from);
        let profile_path = optional_var("DIGEST_PROFILE_PATH").map(PathBuf::from);

        let schedule_enabled = parse_bool("DIGEST_SCHEDULE_ENABLED", false)?;
        let schedule_hour = parse_bounded_u32("DIGEST_SCHEDULE_HOUR", 7, 23)?;
        let schedule_minute = parse_bounded_u32("DIGEST_SCHEDULE_MINUTE", 0, 59)?;
        let schedule_utc_offset_hours = parse_utc_offset("DIGEST_SCHEDULE_UTC_OFFSET_HOURS", 0)?;

        let window_defaults = WindowConfig::default();
        let window = WindowConfig {
            preferred_hours: parse_optional_u32("DIGEST_WINDOW_HOURS")?,
            max_hours: parse_u32("DIGEST_MAX_WINDOW_HOURS", window_defaults.max_hours)?,
            min_items: parse_usize("DIGEST_MIN_ITEMS", window_defaults.min_items)?,
            fetch_limit: parse_usize("DIGEST_FETCH_LIMIT", window_defaults.fetch_limit)?,
            allow_stale_fallback: parse_bool(
                "DIGEST_ALLOW_STALE_FALLBACK",
                window_defaults.allow_stale_fallback,
            )?,
            stale_fallback_limit: parse_usize(
                "DIGEST_STALE_FALLBACK_LIMIT",
                window_defaults.stale_fallback_limit,
            )?,
            ..window_defaults
        };
        if window.max_hours == 0 {
            return Err(ConfigError::Invalid {
                name: "DIGEST_MAX_WINDOW_HOURS",
                source: anyhow::anyhow!("must be greater than zero"),
            });
        }

        let quality = QualityConfig {
            financial_only: parse_bool("DIGEST_FINANCIAL_ONLY", true)?,
            financial_authorities: parse_csv(
                "DIGEST_FINANCIAL_AUTHORITIES",
                DEFAULT_FINANCIAL_AUTHORITIES,
            ),
            financial_sectors: parse_csv("DIGEST_FINANCIAL_SECTORS", DEFAULT_FINANCIAL_SECTORS),
            financial_keywords: parse_csv("DIGEST_FINANCIAL_KEYWORDS", DEFAULT_FINANCIAL_KEYWORDS),
            history_retention_days: parse_u32("DIGEST_HISTORY_RETENTION_DAYS", 14)?,
        };

        let selection_defaults = SelectionConfig::default();
        let selection = SelectionConfig {
            domestic_target: parse_usize(
                "DIGEST_DOMESTIC_TARGET",
                selection_defaults.domestic_target,
            )?,
            international_target: parse_usize(
                "DIGEST_INTERNATIONAL_TARGET",
                selection_defaults.international_target,
            )?,
            ..selection_defaults
        };

        let gap_fill_defaults = GapFillConfig::default();
        let gap_fill = GapFillConfig {
            supplemental_limit: parse_usize(
                "DIGEST_SUPPLEMENTAL_LIMIT",
                gap_fill_defaults.supplemental_limit,
            )?,
            ..gap_fill_defaults
        };

        let persona = optional_var("DIGEST_PERSONA").unwrap_or_else(|| "Executive".to_string());

        Ok(Self {
            pool_path,
            history_path,
            profile_path,
            schedule_enabled,
            schedule_hour,
            schedule_minute,
            schedule_utc_offset_hours,
            digest: DigestConfig {
                persona,
                window,
                quality,
                selection,
                gap_fill,
            },
        })
    }

    #[must_use]
    pub fn pool_path(&self) -> &std::path::Path {
        &self.pool_path
    }

    #[must_use]
    pub fn history_path(&self) -> Option<&std::path::Path> {
        self.history_path.as_deref()
    }

    #[must_use]
    pub fn profile_path(&self) -> Option<&std::path::Path> {
        self.profile_path.as_deref()
    }

    #[must_use]
    pub fn schedule_enabled(&self) -> bool {
        self.schedule_enabled
    }

    #[must_use]
    pub fn schedule_hour(&self) -> u32 {
        self.schedule_hour
    }

    #[must_use]
    pub fn schedule_minute(&self) -> u32 {
        self.schedule_minute
    }

    #[must_use]
    pub fn schedule_utc_offset_hours(&self) -> i32 {
        self.schedule_utc_offset_hours
    }

    #[must_use]
    pub fn digest(&self) -> &DigestConfig {
        &self.digest
    }
}

fn env_var(name: &'static str) -> Result<String, ConfigError> {
    optional_var(name).ok_or(ConfigError::Missing(name))
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim().parse::<usize>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_u32(name: &'static str, default: u32) -> Result<u32, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim().parse::<u32>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_optional_u32(name: &'static str) -> Result<Option<u32>, ConfigError> {
    optional_var(name)
        .map(|raw| {
            raw.parse::<u32>().map_err(|error| ConfigError::Invalid {
                name,
                source: anyhow::Error::new(error),
            })
        })
        .transpose()
}

fn parse_bounded_u32(name: &'static str, default: u32, max: u32) -> Result<u32, ConfigError> {
    let value = parse_u32(name, default)?;
    if value > max {
        return Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("value must be between 0 and {max}"),
        });
    }
    Ok(value)
}

fn parse_utc_offset(name: &'static str, default: i32) -> Result<i32, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    let parsed = raw.trim().parse::<i32>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })?;
    if !(-23..=23).contains(&parsed) {
        return Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("offset must be between -23 and 23 hours"),
        });
    }
    Ok(parsed)
}

fn parse_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("invalid boolean value: {raw}"),
        }),
    }
}

/// Comma-separated list; unset or blank falls back to `default`.
fn parse_csv(name: &'static str, default: &[&str]) -> Vec<String> {
    let values: Vec<String> = env::var(name)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if values.is_empty() {
        default.iter().map(ToString::to_string).collect()
    } else {
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: &[&str] = &[
        "DIGEST_POOL_PATH",
        "DIGEST_HISTORY_PATH",
        "DIGEST_PROFILE_PATH",
        "DIGEST_SCHEDULE_ENABLED",
        "DIGEST_SCHEDULE_HOUR",
        "DIGEST_SCHEDULE_MINUTE",
        "DIGEST_SCHEDULE_UTC_OFFSET_HOURS",
        "DIGEST_WINDOW_HOURS",
        "DIGEST_MAX_WINDOW_HOURS",
        "DIGEST_MIN_ITEMS",
        "DIGEST_FETCH_LIMIT",
        "DIGEST_ALLOW_STALE_FALLBACK",
        "DIGEST_STALE_FALLBACK_LIMIT",
        "DIGEST_FINANCIAL_ONLY",
        "DIGEST_FINANCIAL_AUTHORITIES",
        "DIGEST_FINANCIAL_SECTORS",
        "DIGEST_FINANCIAL_KEYWORDS",
        "DIGEST_HISTORY_RETENTION_DAYS",
        "DIGEST_DOMESTIC_TARGET",
        "DIGEST_INTERNATIONAL_TARGET",
        "DIGEST_SUPPLEMENTAL_LIMIT",
        "DIGEST_PERSONA",
    ];

    fn set_env(name: &str, value: &str) {
        // SAFETY: tests hold ENV_MUTEX and assign valid UTF-8 values.
        unsafe {
            env::set_var(name, value);
        }
    }

    fn remove_env(name: &str) {
        // SAFETY: tests hold ENV_MUTEX and clean up deterministic keys.
        unsafe {
            env::remove_var(name);
        }
    }

    fn reset_env() {
        for name in VARS {
            remove_env(name);
        }
    }

    #[test]
    fn from_env_uses_defaults_when_optional_missing() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();
        set_env("DIGEST_POOL_PATH", "/var/lib/digest/pool.json");

        let config = Config::from_env().expect("config should load");

        assert_eq!(config.pool_path(), std::path::Path::new("/var/lib/digest/pool.json"));
        assert_eq!(config.history_path(), None);
        assert!(!config.schedule_enabled());
        assert_eq!((config.schedule_hour(), config.schedule_minute()), (7, 0));
        assert_eq!(config.digest().persona, "Executive");
        assert_eq!(config.digest().window, WindowConfig::default());
        assert_eq!(config.digest().quality, QualityConfig::default());
        assert_eq!(config.digest().selection.total_target(), 15);
        reset_env();
    }

    #[test]
    fn from_env_reads_overrides() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();
        set_env("DIGEST_POOL_PATH", "pool.json");
        set_env("DIGEST_HISTORY_PATH", "sent.json");
        set_env("DIGEST_WINDOW_HOURS", "48");
        set_env("DIGEST_MIN_ITEMS", "8");
        set_env("DIGEST_ALLOW_STALE_FALLBACK", "off");
        set_env("DIGEST_FINANCIAL_ONLY", "no");
        set_env("DIGEST_FINANCIAL_AUTHORITIES", " FCA, PRA ,,");
        set_env("DIGEST_DOMESTIC_TARGET", "6");
        set_env("DIGEST_SCHEDULE_ENABLED", "yes");
        set_env("DIGEST_SCHEDULE_UTC_OFFSET_HOURS", "-5");
        set_env("DIGEST_PERSONA", "Compliance");

        let config = Config::from_env().expect("config should load");
        let digest = config.digest();

        assert_eq!(config.history_path(), Some(std::path::Path::new("sent.json")));
        assert_eq!(digest.window.preferred_hours, Some(48));
        assert_eq!(digest.window.min_items, 8);
        assert!(!digest.window.allow_stale_fallback);
        assert!(!digest.quality.financial_only);
        assert_eq!(digest.quality.financial_authorities, vec!["FCA", "PRA"]);
        assert_eq!(digest.selection.domestic_target, 6);
        assert!(config.schedule_enabled());
        assert_eq!(config.schedule_utc_offset_hours(), -5);
        assert_eq!(digest.persona, "Compliance");
        reset_env();
    }

    #[test]
    fn from_env_requires_pool_path() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();

        let err = Config::from_env().expect_err("pool path is required");

        assert!(matches!(err, ConfigError::Missing("DIGEST_POOL_PATH")));
    }

    #[test]
    fn from_env_rejects_invalid_values() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();
        set_env("DIGEST_POOL_PATH", "pool.json");

        set_env("DIGEST_ALLOW_STALE_FALLBACK", "maybe");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid { name: "DIGEST_ALLOW_STALE_FALLBACK", .. })
        ));
        remove_env("DIGEST_ALLOW_STALE_FALLBACK");

        set_env("DIGEST_SCHEDULE_HOUR", "24");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid { name: "DIGEST_SCHEDULE_HOUR", .. })
        ));
        remove_env("DIGEST_SCHEDULE_HOUR");

        set_env("DIGEST_MAX_WINDOW_HOURS", "0");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid { name: "DIGEST_MAX_WINDOW_HOURS", .. })
        ));
        reset_env();
    }
}
