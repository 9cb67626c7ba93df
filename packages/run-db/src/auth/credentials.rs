//! Database credential lookup.
//!
//! Credentials live in a TOML file holding an ordered list of entry names
//! and one table per name:
//!
//! ```toml
//! [database]
//! auth_names = ["cred1", "cred2"]
//!
//! [database.auth_info.cred1]
//! host = "lsst10.ncsa.illinois.edu"
//! port = 3306
//! user = "moose"
//! password = "squirrel"
//!
//! [database.auth_info.cred2]
//! host = "lsst10.ncsa.illinois.edu"
//! port = 3306
//! user = "boris"
//! password = "natasha"
//! ```
//!
//! A request for a host and port is matched against the entries in the
//! order of `auth_names`; the first exact match wins.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, RunDbError};
use crate::logging::redact::Redacted;

#[derive(Deserialize)]
struct RawEntry {
    host: String,
    port: u16,
    user: String,
    password: String,
}

#[derive(Deserialize)]
struct RawDatabaseSection {
    auth_names: Vec<String>,
    #[serde(default)]
    auth_info: HashMap<String, RawEntry>,
}

#[derive(Deserialize)]
struct RawCredentialFile {
    database: RawDatabaseSection,
}

/// One named entry of the credential file.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialEntry {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl CredentialEntry {
    pub fn matches(&self, host: &str, port: u16) -> bool {
        self.host == host && self.port == port
    }
}

impl fmt::Debug for CredentialEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialEntry")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &Redacted(&self.password))
            .finish()
    }
}

/// Credentials selected for the configured host and port.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedCredentials {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl From<&CredentialEntry> for ResolvedCredentials {
    fn from(entry: &CredentialEntry) -> Self {
        Self {
            host: entry.host.clone(),
            port: entry.port,
            user: entry.user.clone(),
            password: entry.password.clone(),
        }
    }
}

impl fmt::Debug for ResolvedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedCredentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &Redacted(&self.password))
            .finish()
    }
}

/// The parsed credential file, entries in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialFile {
    entries: Vec<CredentialEntry>,
}

impl CredentialFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| RunDbError::io(path, e))?;
        Self::from_toml_str(&contents)
            .map_err(|message| RunDbError::config(format!("{}: {message}", path.display())))
    }

    /// Parse credential file contents. Errors are returned as plain messages
    /// so the caller can attach the file location.
    pub fn from_toml_str(contents: &str) -> Result<Self, String> {
        let raw: RawCredentialFile = toml::from_str(contents)
            .map_err(|e| format!("invalid credential file: {}", e.message()))?;

        let RawDatabaseSection {
            auth_names,
            auth_info,
        } = raw.database;

        let mut entries = Vec::with_capacity(auth_names.len());
        for name in auth_names {
            // A name may be listed more than once; each listing refers to the same table.
            let raw_entry = auth_info
                .get(&name)
                .ok_or_else(|| format!("credential entry '{name}' is listed but not defined"))?;
            entries.push(CredentialEntry {
                host: raw_entry.host.clone(),
                port: raw_entry.port,
                user: raw_entry.user.clone(),
                password: raw_entry.password.clone(),
                name,
            });
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[CredentialEntry] {
        &self.entries
    }

    /// First entry, in declaration order, matching `host` and `port` exactly.
    pub fn find(&self, host: &str, port: u16) -> Option<&CredentialEntry> {
        self.entries.iter().find(|entry| entry.matches(host, port))
    }
}

/// Load the credential file and select the entry for `host` and `port`.
pub fn resolve(credential_file: &Path, host: &str, port: u16) -> Result<ResolvedCredentials> {
    let file = CredentialFile::load(credential_file)?;

    match file.find(host, port) {
        Some(entry) => {
            debug!(
                host = %host,
                port,
                entry = %entry.name,
                user = %entry.user,
                "using credentials"
            );
            Ok(ResolvedCredentials::from(entry))
        }
        None => Err(RunDbError::NoMatchingCredential {
            host: host.to_string(),
            port,
        }),
    }
}
