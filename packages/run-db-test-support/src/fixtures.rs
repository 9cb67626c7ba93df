//! Throwaway home directories holding a `.lsst/db-auth.toml` credential file.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::TempDir;

pub const DIR_NAME: &str = ".lsst";
pub const FILE_NAME: &str = "db-auth.toml";

/// One `[database.auth_info.<name>]` table.
#[derive(Debug, Clone)]
pub struct CredentialSpec<'a> {
    pub name: &'a str,
    pub host: &'a str,
    pub port: u16,
    pub user: &'a str,
    pub password: &'a str,
}

#[derive(Serialize)]
struct AuthInfo<'a> {
    host: &'a str,
    port: u16,
    user: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct DatabaseSection<'a> {
    auth_names: Vec<&'a str>,
    auth_info: BTreeMap<&'a str, AuthInfo<'a>>,
}

#[derive(Serialize)]
struct CredentialFileDoc<'a> {
    database: DatabaseSection<'a>,
}

/// Render entries as credential file TOML, `auth_names` in slice order.
///
/// A name repeated in `entries` is listed repeatedly; its table holds the
/// last values given for it.
pub fn credential_toml(entries: &[CredentialSpec<'_>]) -> Result<String, toml::ser::Error> {
    let doc = CredentialFileDoc {
        database: DatabaseSection {
            auth_names: entries.iter().map(|e| e.name).collect(),
            auth_info: entries
                .iter()
                .map(|e| {
                    (
                        e.name,
                        AuthInfo {
                            host: e.host,
                            port: e.port,
                            user: e.user,
                            password: e.password,
                        },
                    )
                })
                .collect(),
        },
    };

    toml::to_string(&doc)
}

/// A temporary home directory with a private `.lsst` directory.
///
/// The directory starts at mode `0700`; files written through
/// [`CredentialHome::write_credentials`] get mode `0600`.
pub struct CredentialHome {
    temp: TempDir,
}

impl CredentialHome {
    pub fn new() -> io::Result<Self> {
        let temp = TempDir::new()?;
        let home = Self { temp };
        fs::create_dir(home.dir())?;
        home.set_dir_mode(0o700)?;
        Ok(home)
    }

    pub fn with_credentials(contents: &str) -> io::Result<Self> {
        let home = Self::new()?;
        home.write_credentials(contents)?;
        Ok(home)
    }

    pub fn with_entries(entries: &[CredentialSpec<'_>]) -> io::Result<Self> {
        let contents = credential_toml(entries).map_err(io::Error::other)?;
        Self::with_credentials(&contents)
    }

    pub fn home(&self) -> &Path {
        self.temp.path()
    }

    pub fn dir(&self) -> PathBuf {
        self.temp.path().join(DIR_NAME)
    }

    pub fn file(&self) -> PathBuf {
        self.dir().join(FILE_NAME)
    }

    pub fn write_credentials(&self, contents: &str) -> io::Result<()> {
        fs::write(self.file(), contents)?;
        self.set_file_mode(0o600)
    }

    #[cfg(unix)]
    pub fn set_dir_mode(&self, mode: u32) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(self.dir(), fs::Permissions::from_mode(mode))
    }

    #[cfg(unix)]
    pub fn set_file_mode(&self, mode: u32) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(self.file(), fs::Permissions::from_mode(mode))
    }

    #[cfg(not(unix))]
    pub fn set_dir_mode(&self, _mode: u32) -> io::Result<()> {
        Ok(())
    }

    #[cfg(not(unix))]
    pub fn set_file_mode(&self, _mode: u32) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for CredentialHome {
    fn drop(&mut self) {
        // TempDir cleanup needs to list the directory again.
        let _ = self.set_dir_mode(0o700);
    }
}
