use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Result, RunDbError};

pub const CREDENTIAL_DIR_NAME: &str = ".lsst";
pub const CREDENTIAL_FILE_NAME: &str = "db-auth.toml";

/// Location of the protected credential directory and the file inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPaths {
    dir: PathBuf,
    file: PathBuf,
}

impl CredentialPaths {
    /// `<home>/.lsst/db-auth.toml`
    pub fn from_home(home: impl AsRef<Path>) -> Self {
        let dir = home.as_ref().join(CREDENTIAL_DIR_NAME);
        let file = dir.join(CREDENTIAL_FILE_NAME);
        Self { dir, file }
    }

    /// Resolve the paths from the `HOME` environment variable.
    pub fn from_env() -> Result<Self> {
        let home = env::var_os("HOME")
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                RunDbError::config("Required environment variable 'HOME' is not set")
            })?;
        Ok(Self::from_home(home))
    }

    pub fn new(dir: impl Into<PathBuf>, file: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            file: file.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file(&self) -> &Path {
        &self.file
    }
}
