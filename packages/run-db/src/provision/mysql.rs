//! MySQL run database naming.
//!
//! Allocates the per-run database name from the resolved user, the data
//! challenge version and the run name. Creating the database itself is the
//! job of the MySQL administration tooling, not of this delegate.

use std::time::Duration;

use tracing::{debug, info};

use crate::config::db::DatabaseConfig;
use crate::provision::{DatabaseNames, ProvisioningDelegate, ProvisioningError, RunType};

/// Longest database name MySQL accepts.
pub const MAX_DB_NAME_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct MySqlDelegate {
    host: String,
    port: u16,
    global_db_name: String,
    dc_version: String,
    dc_db_name: String,
    min_perc_disk_space_req: f64,
    user_run_life: Duration,
}

impl MySqlDelegate {
    /// Build the delegate from the production database configuration.
    ///
    /// Host and port may still be unset here; the configurator reports that
    /// when it checks the configuration.
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            host: config.host.clone().unwrap_or_default(),
            port: config.port.unwrap_or_default(),
            global_db_name: config.settings.global_db_name.clone(),
            dc_version: config.settings.dc_version.clone(),
            dc_db_name: config.settings.dc_db_name.clone(),
            min_perc_disk_space_req: config.settings.min_perc_disk_space_req,
            user_run_life: config.settings.user_run_life,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn dc_db_name(&self) -> &str {
        &self.dc_db_name
    }

    pub fn min_perc_disk_space_req(&self) -> f64 {
        self.min_perc_disk_space_req
    }

    pub fn user_run_life(&self) -> Duration {
        self.user_run_life
    }

    /// `<user>_<dcVersion>_<runType>_<runName>`
    pub fn run_database_name(
        &self,
        run_name: &str,
        user: &str,
        run_type: RunType,
    ) -> Result<String, ProvisioningError> {
        validate_component("run name", run_name)?;
        validate_component("user", user)?;
        validate_component("dc_version", &self.dc_version)?;

        let name = format!("{user}_{}_{run_type}_{run_name}", self.dc_version);
        if name.len() > MAX_DB_NAME_LEN {
            return Err(ProvisioningError::new(format!(
                "run database name '{name}' exceeds {MAX_DB_NAME_LEN} characters"
            )));
        }
        Ok(name)
    }
}

fn validate_component(what: &str, value: &str) -> Result<(), ProvisioningError> {
    if value.is_empty() {
        return Err(ProvisioningError::new(format!("{what} must not be empty")));
    }
    if let Some(c) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
    {
        return Err(ProvisioningError::new(format!(
            "{what} '{value}' contains '{c}'; only letters, digits and '_' are allowed in database names"
        )));
    }
    Ok(())
}

impl ProvisioningDelegate for MySqlDelegate {
    fn backend_type(&self) -> &str {
        "MySQL"
    }

    fn prepare_for_new_run(
        &mut self,
        run_name: &str,
        user: &str,
        _password: &str,
        run_type: RunType,
    ) -> Result<DatabaseNames, ProvisioningError> {
        debug!(run_name, user, run_type = %run_type, "MySqlDelegate:prepare_for_new_run");

        validate_component("global_db_name", &self.global_db_name)?;
        let run_database = self.run_database_name(run_name, user, run_type)?;

        info!(
            host = %self.host,
            port = self.port,
            run_database = %run_database,
            global_database = %self.global_db_name,
            template = %self.dc_db_name,
            "run database allocated"
        );

        Ok(DatabaseNames::new(run_database, self.global_db_name.clone()))
    }

    fn run_finished(&mut self, db_name: &str) -> Result<(), ProvisioningError> {
        debug!(db_name, "MySqlDelegate:run_finished (no cleanup configured)");
        Ok(())
    }
}
