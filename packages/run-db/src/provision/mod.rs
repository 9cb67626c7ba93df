//! Run database provisioning interface.

use std::fmt;

use thiserror::Error;

pub mod mysql;

pub use mysql::MySqlDelegate;

/// Error raised by a provisioning backend. Opaque to the configurator and
/// passed through unchanged.
#[derive(Debug, Error)]
#[error("Provisioning error: {message}")]
pub struct ProvisioningError {
    pub message: String,
}

impl ProvisioningError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Category of run a database is prepared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunType {
    /// User-initiated run (`u`).
    #[default]
    User,
}

impl RunType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunType::User => "u",
        }
    }
}

impl fmt::Display for RunType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Database names allocated for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseNames {
    pub run_database: String,
    pub global_database: String,
}

impl DatabaseNames {
    pub fn new(run_database: impl Into<String>, global_database: impl Into<String>) -> Self {
        Self {
            run_database: run_database.into(),
            global_database: global_database.into(),
        }
    }
}

/// Backend-specific helper that provisions per-run databases.
///
/// The configurator only ever talks to this trait; each database backend
/// supplies its own implementation.
pub trait ProvisioningDelegate {
    /// Backend type tag, e.g. `"MySQL"`. Lower-cased, it becomes the URL
    /// scheme.
    fn backend_type(&self) -> &str;

    /// Create (or look up) the databases for a new run.
    fn prepare_for_new_run(
        &mut self,
        run_name: &str,
        user: &str,
        password: &str,
        run_type: RunType,
    ) -> Result<DatabaseNames, ProvisioningError>;

    /// Cleanup hook once a run's database is no longer in use.
    fn run_finished(&mut self, db_name: &str) -> Result<(), ProvisioningError>;
}

impl<D: ProvisioningDelegate + ?Sized> ProvisioningDelegate for Box<D> {
    fn backend_type(&self) -> &str {
        (**self).backend_type()
    }

    fn prepare_for_new_run(
        &mut self,
        run_name: &str,
        user: &str,
        password: &str,
        run_type: RunType,
    ) -> Result<DatabaseNames, ProvisioningError> {
        (**self).prepare_for_new_run(run_name, user, password, run_type)
    }

    fn run_finished(&mut self, db_name: &str) -> Result<(), ProvisioningError> {
        (**self).run_finished(db_name)
    }
}
