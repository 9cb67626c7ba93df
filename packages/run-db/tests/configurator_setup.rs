//! End-to-end tests for the configurator setup sequence
//!
//! Tests prove:
//! - A successful setup exposes the run database through `get_db_info`
//! - Accessors fail before setup has succeeded
//! - Missing or empty host/port fails before the filesystem is touched
//! - `setup` after `check_configuration` reuses the resolved credentials
//! - Permission, matching and delegate failures abort setup and leave the
//!   configurator `Failed` without calling the delegate more than needed

use std::time::Duration;

use run_db::{
    Configurator, CredentialPaths, DatabaseConfig, DatabaseNames, DbInfo, ProvisioningDelegate,
    ProvisioningError, RunDbError, RunSettings, RunType, Stage,
};
use run_db_test_support::fixtures::{CredentialHome, CredentialSpec};
use run_db_test_support::test_logging;

#[derive(Debug, Clone, PartialEq)]
struct PrepareCall {
    run_name: String,
    user: String,
    password: String,
    run_type: RunType,
}

/// Delegate that records calls and returns canned names.
struct RecordingDelegate {
    names: DatabaseNames,
    fail_with: Option<String>,
    prepared: Vec<PrepareCall>,
    finished: Vec<String>,
}

impl RecordingDelegate {
    fn returning(run_db: &str, global_db: &str) -> Self {
        Self {
            names: DatabaseNames::new(run_db, global_db),
            fail_with: None,
            prepared: Vec::new(),
            finished: Vec::new(),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::returning("unused", "unused")
        }
    }
}

impl ProvisioningDelegate for RecordingDelegate {
    fn backend_type(&self) -> &str {
        "MySQL"
    }

    fn prepare_for_new_run(
        &mut self,
        run_name: &str,
        user: &str,
        password: &str,
        run_type: RunType,
    ) -> Result<DatabaseNames, ProvisioningError> {
        self.prepared.push(PrepareCall {
            run_name: run_name.to_string(),
            user: user.to_string(),
            password: password.to_string(),
            run_type,
        });
        match &self.fail_with {
            Some(message) => Err(ProvisioningError::new(message.clone())),
            None => Ok(self.names.clone()),
        }
    }

    fn run_finished(&mut self, db_name: &str) -> Result<(), ProvisioningError> {
        self.finished.push(db_name.to_string());
        Ok(())
    }
}

fn settings() -> RunSettings {
    RunSettings {
        global_db_name: "GlobalDB".to_string(),
        dc_version: "DC3b".to_string(),
        dc_db_name: "DC3b_DB".to_string(),
        min_perc_disk_space_req: 10.0,
        user_run_life: Duration::from_secs(14 * 24 * 3600),
    }
}

fn db_config(host: &str, port: u16) -> DatabaseConfig {
    DatabaseConfig::new(host, port, settings()).expect("valid config")
}

fn two_entry_home() -> CredentialHome {
    test_logging::init();
    CredentialHome::with_entries(&[
        CredentialSpec {
            name: "cred1",
            host: "h1",
            port: 3306,
            user: "a",
            password: "p1",
        },
        CredentialSpec {
            name: "cred2",
            host: "h2",
            port: 3306,
            user: "b",
            password: "p2",
        },
    ])
    .expect("Should create credential home")
}

#[test]
fn setup_exposes_db_info() {
    let home = two_entry_home();
    let mut configurator = Configurator::new(
        "run42",
        db_config("h2", 3306),
        CredentialPaths::from_home(home.home()),
        RecordingDelegate::returning("run_001", "global_db"),
    );

    configurator.setup().expect("setup should succeed");

    assert_eq!(configurator.stage(), Stage::Provisioned);
    assert_eq!(
        configurator.get_db_info().unwrap(),
        DbInfo {
            host: "h2".to_string(),
            port: 3306,
            runid: "run42".to_string(),
            dbrun: "run_001".to_string(),
        }
    );

    let context = configurator.run_context().unwrap();
    assert_eq!(context.global_database_name, "global_db");
    assert_eq!(context.run_url, "mysql://h2:3306/run_001");
    assert_eq!(context.global_url, "mysql://h2:3306/global_db");
    assert_eq!(configurator.get_host_url().unwrap(), "mysql://h2:3306");
    assert_eq!(configurator.get_user().unwrap(), "b");

    assert_eq!(
        configurator.delegate().prepared,
        vec![PrepareCall {
            run_name: "run42".to_string(),
            user: "b".to_string(),
            password: "p2".to_string(),
            run_type: RunType::User,
        }]
    );
}

#[test]
fn db_info_serializes_flat() {
    let home = two_entry_home();
    let mut configurator = Configurator::new(
        "run42",
        db_config("h1", 3306),
        CredentialPaths::from_home(home.home()),
        RecordingDelegate::returning("run_001", "global_db"),
    );
    configurator.setup().unwrap();

    let json = serde_json::to_value(configurator.get_db_info().unwrap()).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "host": "h1",
            "port": 3306,
            "runid": "run42",
            "dbrun": "run_001",
        })
    );
}

#[test]
fn accessors_fail_before_setup() {
    let home = two_entry_home();
    let configurator = Configurator::new(
        "run42",
        db_config("h2", 3306),
        CredentialPaths::from_home(home.home()),
        RecordingDelegate::returning("run_001", "global_db"),
    );

    assert_eq!(configurator.stage(), Stage::Created);
    assert!(matches!(
        configurator.get_db_info(),
        Err(RunDbError::NotReady { .. })
    ));
    assert!(matches!(
        configurator.get_host_url(),
        Err(RunDbError::NotReady { .. })
    ));
    assert!(configurator.run_context().is_err());
    assert!(configurator.get_user().is_err());
}

#[test]
fn check_configuration_resolves_without_provisioning() {
    let home = two_entry_home();
    let mut configurator = Configurator::new(
        "run42",
        db_config("h1", 3306),
        CredentialPaths::from_home(home.home()),
        RecordingDelegate::returning("run_001", "global_db"),
    );

    configurator.check_configuration().unwrap();

    assert_eq!(configurator.stage(), Stage::CredentialsResolved);
    assert_eq!(configurator.get_host_url().unwrap(), "mysql://h1:3306");
    assert!(configurator.get_db_info().is_err());
    assert!(configurator.delegate().prepared.is_empty());
}

#[test]
fn missing_host_fails_before_touching_files() {
    test_logging::init();
    let mut config = db_config("h1", 3306);
    config.host = None;

    // Nothing exists at these paths; a filesystem access would surface as Io.
    let mut configurator = Configurator::new(
        "run42",
        config,
        CredentialPaths::new("/nonexistent/.lsst", "/nonexistent/.lsst/db-auth.toml"),
        RecordingDelegate::returning("run_001", "global_db"),
    );

    let err = configurator.setup().unwrap_err();
    assert!(matches!(err, RunDbError::Config { .. }), "got {err:?}");
    assert!(err.to_string().contains("host"));
    assert_eq!(configurator.stage(), Stage::Failed);
}

#[test]
fn missing_port_fails_before_touching_files() {
    test_logging::init();
    let mut config = db_config("h1", 3306);
    config.port = None;

    let mut configurator = Configurator::new(
        "run42",
        config,
        CredentialPaths::new("/nonexistent/.lsst", "/nonexistent/.lsst/db-auth.toml"),
        RecordingDelegate::returning("run_001", "global_db"),
    );

    let err = configurator.setup().unwrap_err();
    assert!(matches!(err, RunDbError::Config { .. }), "got {err:?}");
    assert!(err.to_string().contains("port"));
}

#[test]
fn empty_host_fails_before_touching_files() {
    test_logging::init();
    let mut configurator = Configurator::new(
        "run42",
        db_config("", 3306),
        CredentialPaths::new("/nonexistent/.lsst", "/nonexistent/.lsst/db-auth.toml"),
        RecordingDelegate::returning("run_001", "global_db"),
    );

    let err = configurator.setup().unwrap_err();
    assert!(matches!(err, RunDbError::Config { .. }), "got {err:?}");
    assert!(configurator.delegate().prepared.is_empty());
}

#[test]
fn zero_port_fails_before_touching_files() {
    test_logging::init();
    let mut configurator = Configurator::new(
        "run42",
        db_config("h1", 0),
        CredentialPaths::new("/nonexistent/.lsst", "/nonexistent/.lsst/db-auth.toml"),
        RecordingDelegate::returning("run_001", "global_db"),
    );

    let err = configurator.setup().unwrap_err();
    assert!(matches!(err, RunDbError::Config { .. }), "got {err:?}");
    assert!(err.to_string().contains("port"));
}

#[cfg(unix)]
#[test]
fn group_readable_directory_aborts_setup() {
    let home = two_entry_home();
    home.set_dir_mode(0o750).unwrap();

    let mut configurator = Configurator::new(
        "run42",
        db_config("h2", 3306),
        CredentialPaths::from_home(home.home()),
        RecordingDelegate::returning("run_001", "global_db"),
    );

    let err = configurator.setup().unwrap_err();
    match &err {
        RunDbError::Permission { path, .. } => assert_eq!(path, &home.dir()),
        other => panic!("expected permission error, got {other:?}"),
    }
    assert_eq!(configurator.stage(), Stage::Failed);
    assert!(configurator.delegate().prepared.is_empty());
    assert!(configurator.get_db_info().is_err());
}

#[cfg(unix)]
#[test]
fn world_readable_file_aborts_setup() {
    let home = two_entry_home();
    home.set_file_mode(0o604).unwrap();

    let mut configurator = Configurator::new(
        "run42",
        db_config("h2", 3306),
        CredentialPaths::from_home(home.home()),
        RecordingDelegate::returning("run_001", "global_db"),
    );

    let err = configurator.setup().unwrap_err();
    match &err {
        RunDbError::Permission { path, message } => {
            assert_eq!(path, &home.file());
            assert!(message.contains("chmod"));
        }
        other => panic!("expected permission error, got {other:?}"),
    }
    assert!(configurator.delegate().prepared.is_empty());
}

#[test]
fn missing_credential_file_is_io_error() {
    test_logging::init();
    let home = CredentialHome::new().unwrap();

    let mut configurator = Configurator::new(
        "run42",
        db_config("h2", 3306),
        CredentialPaths::from_home(home.home()),
        RecordingDelegate::returning("run_001", "global_db"),
    );

    let err = configurator.setup().unwrap_err();
    assert!(matches!(err, RunDbError::Io { .. }), "got {err:?}");
}

#[test]
fn no_matching_entry_aborts_setup() {
    let home = two_entry_home();
    let mut configurator = Configurator::new(
        "run42",
        db_config("h2", 3307),
        CredentialPaths::from_home(home.home()),
        RecordingDelegate::returning("run_001", "global_db"),
    );

    let err = configurator.setup().unwrap_err();
    assert!(matches!(
        &err,
        RunDbError::NoMatchingCredential { host, port } if host == "h2" && *port == 3307
    ));
    assert_eq!(configurator.stage(), Stage::Failed);
    assert!(configurator.delegate().prepared.is_empty());
    assert!(configurator.get_user().is_err());
}

#[test]
fn delegate_error_propagates_unchanged() {
    let home = two_entry_home();
    let mut configurator = Configurator::new(
        "run42",
        db_config("h1", 3306),
        CredentialPaths::from_home(home.home()),
        RecordingDelegate::failing("disk space below threshold"),
    );

    let err = configurator.setup().unwrap_err();
    match &err {
        RunDbError::Provisioning(inner) => {
            assert_eq!(inner.message, "disk space below threshold")
        }
        other => panic!("expected provisioning error, got {other:?}"),
    }
    assert_eq!(
        err.to_string(),
        "Provisioning error: disk space below threshold"
    );
    assert_eq!(configurator.stage(), Stage::Failed);
    assert_eq!(configurator.delegate().prepared.len(), 1);
    assert!(configurator.get_db_info().is_err());
}

#[test]
fn setup_is_one_shot() {
    let home = two_entry_home();
    let mut configurator = Configurator::new(
        "run42",
        db_config("h2", 3306),
        CredentialPaths::from_home(home.home()),
        RecordingDelegate::returning("run_001", "global_db"),
    );

    configurator.setup().unwrap();
    let err = configurator.setup().unwrap_err();
    assert!(matches!(err, RunDbError::InvalidState { .. }));

    // The first run's context survives the rejected call.
    assert_eq!(configurator.get_db_info().unwrap().dbrun, "run_001");
    assert_eq!(configurator.delegate().prepared.len(), 1);
}

#[test]
fn failed_setup_is_not_retried() {
    let home = two_entry_home();
    let mut configurator = Configurator::new(
        "run42",
        db_config("h9", 3306),
        CredentialPaths::from_home(home.home()),
        RecordingDelegate::returning("run_001", "global_db"),
    );

    assert!(configurator.setup().is_err());
    let err = configurator.setup().unwrap_err();
    assert!(matches!(err, RunDbError::InvalidState { .. }));
}

#[test]
fn setup_after_check_configuration_reuses_credentials() {
    let home = two_entry_home();
    let mut configurator = Configurator::new(
        "run42",
        db_config("h2", 3306),
        CredentialPaths::from_home(home.home()),
        RecordingDelegate::returning("run_001", "global_db"),
    );

    configurator.check_configuration().unwrap();
    // Resolution already happened; setup must not read the file again.
    std::fs::remove_file(home.file()).unwrap();

    configurator.setup().expect("setup should provision");

    assert_eq!(configurator.stage(), Stage::Provisioned);
    assert_eq!(configurator.get_db_info().unwrap().dbrun, "run_001");
    assert_eq!(configurator.delegate().prepared.len(), 1);
    assert_eq!(configurator.delegate().prepared[0].user, "b");
}

#[test]
fn check_configuration_twice_is_invalid_state() {
    let home = two_entry_home();
    let mut configurator = Configurator::new(
        "run42",
        db_config("h1", 3306),
        CredentialPaths::from_home(home.home()),
        RecordingDelegate::returning("run_001", "global_db"),
    );

    configurator.check_configuration().unwrap();
    let err = configurator.check_configuration().unwrap_err();
    assert!(matches!(err, RunDbError::InvalidState { .. }));
    assert_eq!(configurator.stage(), Stage::CredentialsResolved);
}

#[test]
fn run_finished_reaches_delegate() {
    let home = two_entry_home();
    let mut configurator = Configurator::new(
        "run42",
        db_config("h2", 3306),
        CredentialPaths::from_home(home.home()),
        RecordingDelegate::returning("run_001", "global_db"),
    );
    configurator.setup().unwrap();

    configurator.run_finished("run_001").unwrap();
    assert_eq!(configurator.delegate().finished, vec!["run_001".to_string()]);
}

#[test]
fn mysql_configurator_names_run_database() {
    let home = two_entry_home();
    let mut configurator = Configurator::mysql(
        "run42",
        db_config("h1", 3306),
        CredentialPaths::from_home(home.home()),
    );

    configurator.setup().unwrap();

    let info = configurator.get_db_info().unwrap();
    assert_eq!(info.dbrun, "a_DC3b_u_run42");
    let context = configurator.run_context().unwrap();
    assert_eq!(context.global_url, "mysql://h1:3306/GlobalDB");
}

#[test]
fn credentials_with_quotes_and_backslashes_resolve() {
    test_logging::init();
    let home = CredentialHome::with_entries(&[CredentialSpec {
        name: "cred1",
        host: "h1",
        port: 3306,
        user: "o'brien",
        password: "p\"w\\d",
    }])
    .expect("Should create credential home");

    let mut configurator = Configurator::new(
        "run42",
        db_config("h1", 3306),
        CredentialPaths::from_home(home.home()),
        RecordingDelegate::returning("run_001", "global_db"),
    );
    configurator.setup().unwrap();

    let call = &configurator.delegate().prepared[0];
    assert_eq!(call.user, "o'brien");
    assert_eq!(call.password, "p\"w\\d");
}
