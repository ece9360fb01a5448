//! Runtime configuration loaded from the environment.

use std::env;

use crate::error::ConfigError;
use crate::fixtures::FIXTURE_RECENT_SCANS;

/// Default port if not specified via environment variable.
pub const DEFAULT_PORT: u16 = 3000;

/// Default database path if not specified via environment variable.
pub const DEFAULT_DB_PATH: &str = "sqlite:herbtrace.db?mode=rwc";

pub const DEFAULT_SCAN_WINDOW_DAYS: u32 = 30;

pub const DEFAULT_ACTIVITY_LIMIT: usize = 10;

/// Which dataset source to serve from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSourceKind {
    Fixtures,
    Sqlite,
    Remote { url: String, token: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub data_source: DataSourceKind,
    pub database_url: String,
    /// Scan counter reported with the fixture source.
    pub recent_scans: u64,
    pub scan_window_days: u32,
    pub activity_limit: usize,
}

impl Config {
    /// Load configuration from `HERBTRACE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Numeric values that fail to parse fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup("HERBTRACE_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let database_url =
            lookup("HERBTRACE_DATABASE_URL").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());

        let recent_scans = lookup("HERBTRACE_RECENT_SCANS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(FIXTURE_RECENT_SCANS);

        let scan_window_days = lookup("HERBTRACE_SCAN_WINDOW_DAYS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_SCAN_WINDOW_DAYS);

        let activity_limit = lookup("HERBTRACE_ACTIVITY_LIMIT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_ACTIVITY_LIMIT);

        let source = lookup("HERBTRACE_DATA_SOURCE").unwrap_or_else(|| "fixtures".to_string());
        let data_source = match source.trim().to_ascii_lowercase().as_str() {
            "fixtures" => DataSourceKind::Fixtures,
            "sqlite" => DataSourceKind::Sqlite,
            "remote" => {
                let url = lookup("HERBTRACE_SNAPSHOT_URL")
                    .filter(|u| !u.trim().is_empty())
                    .ok_or(ConfigError::MissingSnapshotUrl)?;
                DataSourceKind::Remote {
                    url,
                    token: lookup("HERBTRACE_SNAPSHOT_TOKEN"),
                }
            }
            _ => return Err(ConfigError::UnknownDataSource(source)),
        };

        Ok(Self {
            port,
            data_source,
            database_url,
            recent_scans,
            scan_window_days,
            activity_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.data_source, DataSourceKind::Fixtures);
        assert_eq!(config.database_url, DEFAULT_DB_PATH);
        assert_eq!(config.recent_scans, FIXTURE_RECENT_SCANS);
        assert_eq!(config.scan_window_days, 30);
        assert_eq!(config.activity_limit, 10);
    }

    #[test]
    fn test_overrides_and_bad_numbers() {
        let config = Config::from_lookup(lookup_from(&[
            ("HERBTRACE_PORT", "8080"),
            ("HERBTRACE_DATA_SOURCE", "SQLite"),
            ("HERBTRACE_RECENT_SCANS", "not-a-number"),
            ("HERBTRACE_ACTIVITY_LIMIT", "3"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.data_source, DataSourceKind::Sqlite);
        assert_eq!(config.recent_scans, FIXTURE_RECENT_SCANS);
        assert_eq!(config.activity_limit, 3);
    }

    #[test]
    fn test_remote_requires_url() {
        let err = Config::from_lookup(lookup_from(&[("HERBTRACE_DATA_SOURCE", "remote")]));
        assert_eq!(err, Err(ConfigError::MissingSnapshotUrl));

        let config = Config::from_lookup(lookup_from(&[
            ("HERBTRACE_DATA_SOURCE", "remote"),
            ("HERBTRACE_SNAPSHOT_URL", "https://trace.example.org"),
        ]))
        .unwrap();
        assert_eq!(
            config.data_source,
            DataSourceKind::Remote {
                url: "https://trace.example.org".to_string(),
                token: None
            }
        );
    }

    #[test]
    fn test_unknown_source_rejected() {
        let err = Config::from_lookup(lookup_from(&[("HERBTRACE_DATA_SOURCE", "postgres")]));
        assert_eq!(
            err,
            Err(ConfigError::UnknownDataSource("postgres".to_string()))
        );
    }
}
