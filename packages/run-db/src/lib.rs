//! Per-run database configuration for pipeline productions.
//! Resolves credentials from the protected credential file and hands run
//! database provisioning to a backend delegate.

pub mod auth;
pub mod config;
pub mod configurator;
pub mod error;
pub mod logging;
pub mod provision;

pub use auth::credentials::{resolve, CredentialEntry, CredentialFile, ResolvedCredentials};
pub use auth::permissions::check_user_only_permissions;
pub use config::db::{DatabaseConfig, RunSettings};
pub use config::paths::CredentialPaths;
pub use configurator::{host_url, Configurator, DbInfo, RunContext, Stage};
pub use error::RunDbError;
pub use provision::{
    DatabaseNames, MySqlDelegate, ProvisioningDelegate, ProvisioningError, RunType,
};

// Auto-initialize logging for unit tests
#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    run_db_test_support::test_logging::init();
}
