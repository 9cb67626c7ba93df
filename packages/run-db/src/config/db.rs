use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, RunDbError};

/// Raw `[system.auth_info]` table. Both values are optional at load time;
/// their absence is reported when the configuration is checked.
#[derive(Debug, Default, Deserialize)]
struct RawAuthInfo {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSystem {
    #[serde(default)]
    auth_info: RawAuthInfo,
}

#[derive(Debug, Deserialize)]
struct RawRunSettings {
    global_db_name: String,
    dc_version: String,
    dc_db_name: String,
    min_perc_disk_space_req: f64,
    user_run_life: String,
}

#[derive(Debug, Deserialize)]
struct RawDatabaseConfig {
    #[serde(default)]
    system: RawSystem,
    configuration: RawRunSettings,
}

/// Per-production database settings handed to the provisioning backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub global_db_name: String,
    pub dc_version: String,
    pub dc_db_name: String,
    /// Minimum free disk space, as a percentage (0..=100).
    pub min_perc_disk_space_req: f64,
    pub user_run_life: Duration,
}

impl RunSettings {
    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("global_db_name", &self.global_db_name),
            ("dc_version", &self.dc_version),
            ("dc_db_name", &self.dc_db_name),
        ] {
            if value.trim().is_empty() {
                return Err(RunDbError::config(format!(
                    "configuration.{field} must not be empty"
                )));
            }
        }

        if !(0.0..=100.0).contains(&self.min_perc_disk_space_req) {
            return Err(RunDbError::config(format!(
                "configuration.min_perc_disk_space_req must be within 0..=100, got {}",
                self.min_perc_disk_space_req
            )));
        }

        Ok(())
    }
}

/// Database configuration for one production.
///
/// `host` and `port` name the database server whose credentials are looked
/// up in the credential file.
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub settings: RunSettings,
}

impl DatabaseConfig {
    pub fn new(host: impl Into<String>, port: u16, settings: RunSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            host: Some(host.into()),
            port: Some(port),
            settings,
        })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let raw: RawDatabaseConfig = toml::from_str(contents)
            .map_err(|e| RunDbError::config(format!("invalid database configuration: {e}")))?;

        let user_run_life = humantime::parse_duration(&raw.configuration.user_run_life)
            .map_err(|e| {
                RunDbError::config(format!(
                    "configuration.user_run_life '{}' is not a valid duration: {e}",
                    raw.configuration.user_run_life
                ))
            })?;

        let settings = RunSettings {
            global_db_name: raw.configuration.global_db_name,
            dc_version: raw.configuration.dc_version,
            dc_db_name: raw.configuration.dc_db_name,
            min_perc_disk_space_req: raw.configuration.min_perc_disk_space_req,
            user_run_life,
        };
        settings.validate()?;

        Ok(Self {
            host: raw.system.auth_info.host,
            port: raw.system.auth_info.port,
            settings,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| RunDbError::io(path, e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            RunDbError::Config { message } => {
                RunDbError::config(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    /// Returns the configured host, or a configuration error if it is unset
    /// or empty.
    pub fn require_host(&self) -> Result<&str> {
        match self.host.as_deref() {
            Some(host) if !host.is_empty() => Ok(host),
            Some(_) => Err(RunDbError::config("database host must not be empty")),
            None => Err(RunDbError::config(
                "database host must be specified in config",
            )),
        }
    }

    /// Returns the configured port, or a configuration error if it is unset
    /// or zero.
    pub fn require_port(&self) -> Result<u16> {
        match self.port {
            Some(0) => Err(RunDbError::config("database port must be a positive integer")),
            Some(port) => Ok(port),
            None => Err(RunDbError::config(
                "database port must be specified in config",
            )),
        }
    }
}
