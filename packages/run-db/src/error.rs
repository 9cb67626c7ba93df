use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::provision::ProvisioningError;

#[derive(Debug, Error)]
pub enum RunDbError {
    #[error("Permission error: {message}")]
    Permission { path: PathBuf, message: String },
    #[error("Configuration error: {message}")]
    Config { message: String },
    #[error("couldn't find any matching authorization for host {host} and port {port}")]
    NoMatchingCredential { host: String, port: u16 },
    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Not ready: {message}")]
    NotReady { message: String },
    #[error("Invalid state: {message}")]
    InvalidState { message: String },
}

impl RunDbError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn not_ready(message: impl Into<String>) -> Self {
        Self::NotReady {
            message: message.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }
}

pub type Result<T, E = RunDbError> = std::result::Result<T, E>;
