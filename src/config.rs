use std::env;
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;

/// The database used when `DB_URI` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://instance/app.db";

pub const DEFAULT_PORT: u16 = 5555;

pub const DEFAULT_ADMIN_PORT: u16 = 5556;

/// Settings read once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub admin_port: u16,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value
    /// of the named variable if it is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DB_URI").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_owned());
        let port = parse_port(&lookup, "CAMP_PORT", DEFAULT_PORT)?;
        let admin_port = parse_port(&lookup, "CAMP_ADMIN_PORT", DEFAULT_ADMIN_PORT)?;

        Ok(Config {
            database_url,
            port,
            admin_port,
        })
    }

    /// Returns the directory that must exist before the database file
    /// can be created, if the database lives in a file.
    pub fn database_directory(&self) -> Option<PathBuf> {
        let url = self.database_url.as_str();
        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))?;
        let path = path.split('?').next().unwrap_or(path);

        if path.is_empty() || path == ":memory:" {
            return None;
        }

        Path::new(path)
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
    }
}

fn parse_port(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: u16,
) -> Result<u16, ConfigError> {
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|source| ConfigError::InvalidPort {
                name,
                value,
                source,
            }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.port, 5555);
        assert_eq!(config.admin_port, 5556);
        assert_eq!(config.database_directory(), Some(PathBuf::from("instance")));
    }

    #[test]
    fn variables_override_defaults() {
        let config = config_from(&[
            ("DB_URI", "sqlite::memory:"),
            ("CAMP_PORT", "8080"),
            ("CAMP_ADMIN_PORT", " 8081 "),
        ])
        .unwrap();

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.port, 8080);
        assert_eq!(config.admin_port, 8081);
        assert_eq!(config.database_directory(), None);
    }

    #[test]
    fn invalid_ports_are_reported() {
        let error = config_from(&[("CAMP_PORT", "camp")]).unwrap_err();

        assert!(matches!(
            error,
            ConfigError::InvalidPort { name: "CAMP_PORT", .. }
        ));
    }

    #[test]
    fn bare_file_names_need_no_directory() {
        let config = config_from(&[("DB_URI", "sqlite://app.db?mode=rwc")]).unwrap();

        assert_eq!(config.database_directory(), None);
    }
}
