//! Per-run database setup.
//!
//! A [`Configurator`] is created once per run. `setup()` checks that the
//! credential directory and file are private to the user, resolves the
//! credentials for the configured host and port, asks the provisioning
//! delegate for the run and global database names, and records the
//! resulting [`RunContext`].

use serde::Serialize;
use tracing::{debug, info, info_span, Span};

use crate::auth::credentials::{self, ResolvedCredentials};
use crate::auth::permissions::check_user_only_permissions;
use crate::config::db::DatabaseConfig;
use crate::config::paths::CredentialPaths;
use crate::error::{Result, RunDbError};
use crate::provision::{DatabaseNames, MySqlDelegate, ProvisioningDelegate, RunType};

/// `<scheme>://<host>:<port>`, the scheme being the lower-cased backend type.
pub fn host_url(backend_type: &str, host: &str, port: u16) -> String {
    format!("{}://{host}:{port}", backend_type.to_lowercase())
}

/// Databases prepared for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub run_id: String,
    pub database_name: String,
    pub global_database_name: String,
    pub host: String,
    pub port: u16,
    pub run_url: String,
    pub global_url: String,
}

/// Flat view of the run database handed to orchestration callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DbInfo {
    pub host: String,
    pub port: u16,
    pub runid: String,
    pub dbrun: String,
}

/// Where a configurator is in its one-shot setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Created,
    ConfigChecked,
    CredentialsResolved,
    Provisioned,
    Failed,
}

#[derive(Debug)]
enum SetupState {
    Created,
    ConfigChecked,
    CredentialsResolved(ResolvedCredentials),
    Provisioned {
        credentials: ResolvedCredentials,
        context: RunContext,
    },
    Failed,
}

impl SetupState {
    fn stage(&self) -> Stage {
        match self {
            SetupState::Created => Stage::Created,
            SetupState::ConfigChecked => Stage::ConfigChecked,
            SetupState::CredentialsResolved(_) => Stage::CredentialsResolved,
            SetupState::Provisioned { .. } => Stage::Provisioned,
            SetupState::Failed => Stage::Failed,
        }
    }

    fn credentials(&self) -> Option<&ResolvedCredentials> {
        match self {
            SetupState::CredentialsResolved(credentials)
            | SetupState::Provisioned { credentials, .. } => Some(credentials),
            _ => None,
        }
    }
}

pub struct Configurator<D> {
    run_id: String,
    db_config: DatabaseConfig,
    paths: CredentialPaths,
    delegate: D,
    state: SetupState,
    span: Span,
}

impl Configurator<MySqlDelegate> {
    /// Configurator backed by the MySQL delegate built from `db_config`.
    pub fn mysql(
        run_id: impl Into<String>,
        db_config: DatabaseConfig,
        paths: CredentialPaths,
    ) -> Self {
        let delegate = MySqlDelegate::from_config(&db_config);
        Self::new(run_id, db_config, paths, delegate)
    }
}

impl<D: ProvisioningDelegate> Configurator<D> {
    pub fn new(
        run_id: impl Into<String>,
        db_config: DatabaseConfig,
        paths: CredentialPaths,
        delegate: D,
    ) -> Self {
        let run_id = run_id.into();
        let span = info_span!("dbconfig", run_id = %run_id);
        Self {
            run_id,
            db_config,
            paths,
            delegate,
            state: SetupState::Created,
            span,
        }
    }

    /// Log under the caller's span instead of a fresh `dbconfig` span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn db_config(&self) -> &DatabaseConfig {
        &self.db_config
    }

    pub fn credential_paths(&self) -> &CredentialPaths {
        &self.paths
    }

    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    pub fn stage(&self) -> Stage {
        self.state.stage()
    }

    /// Run the whole setup sequence. Any error leaves the configurator
    /// `Failed`; nothing is retried.
    ///
    /// After a successful [`Configurator::check_configuration`] the resolved
    /// credentials are reused and only provisioning remains.
    pub fn setup(&mut self) -> Result<()> {
        let span = self.span.clone();
        let _enter = span.enter();
        debug!("Configurator:setup");

        let resolve_first = match self.state.stage() {
            Stage::Created => true,
            Stage::CredentialsResolved => false,
            stage => {
                return Err(RunDbError::invalid_state(format!(
                    "setup already attempted for run '{}' (stage {stage:?})",
                    self.run_id
                )));
            }
        };

        let result = self.setup_internal(resolve_first);
        self.fail_on_err(result)
    }

    fn setup_internal(&mut self, resolve_first: bool) -> Result<()> {
        if resolve_first {
            self.check_configuration_internal()?;
        }
        let names = self.prepare_for_new_run(RunType::User)?;

        let base_url = self.get_host_url()?;
        let run_url = format!("{base_url}/{}", names.run_database);
        let global_url = format!("{base_url}/{}", names.global_database);

        let credentials = match std::mem::replace(&mut self.state, SetupState::Failed) {
            SetupState::CredentialsResolved(credentials) => credentials,
            other => {
                let stage = other.stage();
                self.state = other;
                return Err(RunDbError::invalid_state(format!(
                    "credentials not resolved before provisioning (stage {stage:?})"
                )));
            }
        };

        let context = RunContext {
            run_id: self.run_id.clone(),
            database_name: names.run_database,
            global_database_name: names.global_database,
            host: credentials.host.clone(),
            port: credentials.port,
            run_url,
            global_url,
        };

        info!(
            run_url = %context.run_url,
            global_url = %context.global_url,
            "run database ready"
        );

        self.state = SetupState::Provisioned {
            credentials,
            context,
        };
        Ok(())
    }

    /// Check the configured host and port, the credential permissions, and
    /// resolve the credentials to use.
    pub fn check_configuration(&mut self) -> Result<()> {
        let span = self.span.clone();
        let _enter = span.enter();

        if self.state.stage() != Stage::Created {
            return Err(RunDbError::invalid_state(format!(
                "configuration already checked for run '{}' (stage {:?})",
                self.run_id,
                self.state.stage()
            )));
        }

        let result = self.check_configuration_internal();
        self.fail_on_err(result)
    }

    fn check_configuration_internal(&mut self) -> Result<()> {
        debug!("Configurator:check_configuration");

        let host = self.db_config.require_host()?.to_string();
        let port = self.db_config.require_port()?;

        check_user_only_permissions(self.paths.dir())?;
        check_user_only_permissions(self.paths.file())?;
        self.state = SetupState::ConfigChecked;

        let resolved = credentials::resolve(self.paths.file(), &host, port)?;
        debug!(host = %resolved.host, port = resolved.port, "using host at port");
        self.state = SetupState::CredentialsResolved(resolved);
        Ok(())
    }

    fn prepare_for_new_run(&mut self, run_type: RunType) -> Result<DatabaseNames> {
        debug!(run_type = %run_type, "Configurator:prepare_for_new_run");

        let credentials = self
            .state
            .credentials()
            .ok_or_else(|| RunDbError::not_ready("credentials have not been resolved"))?;

        let names = self.delegate.prepare_for_new_run(
            &self.run_id,
            &credentials.user,
            &credentials.password,
            run_type,
        )?;
        Ok(names)
    }

    /// Tell the delegate a run database is finished with.
    pub fn run_finished(&mut self, db_name: &str) -> Result<()> {
        let _enter = self.span.enter();
        debug!(db_name, "Configurator:run_finished");
        self.delegate.run_finished(db_name)?;
        Ok(())
    }

    /// Server URL without a database name.
    pub fn get_host_url(&self) -> Result<String> {
        let credentials = self
            .state
            .credentials()
            .ok_or_else(|| RunDbError::not_ready("credentials have not been resolved"))?;
        Ok(host_url(
            self.delegate.backend_type(),
            &credentials.host,
            credentials.port,
        ))
    }

    pub fn get_user(&self) -> Result<&str> {
        self.state
            .credentials()
            .map(|credentials| credentials.user.as_str())
            .ok_or_else(|| RunDbError::not_ready("credentials have not been resolved"))
    }

    pub fn run_context(&self) -> Result<&RunContext> {
        match &self.state {
            SetupState::Provisioned { context, .. } => Ok(context),
            other => Err(RunDbError::not_ready(format!(
                "run database not provisioned (stage {:?})",
                other.stage()
            ))),
        }
    }

    pub fn get_db_info(&self) -> Result<DbInfo> {
        let context = self.run_context()?;
        Ok(DbInfo {
            host: context.host.clone(),
            port: context.port,
            runid: context.run_id.clone(),
            dbrun: context.database_name.clone(),
        })
    }

    fn fail_on_err<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.state = SetupState::Failed;
        }
        result
    }
}
