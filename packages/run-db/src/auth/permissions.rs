//! Owner-only permission checks for credential material.

use std::fs;
use std::path::Path;

use tracing::warn;

use crate::error::{Result, RunDbError};

/// Group read/write/execute bits.
pub const GROUP_RWX: u32 = 0o070;
/// Other read/write/execute bits.
pub const OTHER_RWX: u32 = 0o007;

/// Fail unless `path` is inaccessible to group and other.
///
/// Symlinks are followed, so the check applies to the target.
pub fn check_user_only_permissions(path: &Path) -> Result<()> {
    let metadata = fs::metadata(path).map_err(|e| RunDbError::io(path, e))?;
    check_mode(path, &metadata)
}

#[cfg(unix)]
fn check_mode(path: &Path, metadata: &fs::Metadata) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = metadata.permissions().mode();
    if mode & (GROUP_RWX | OTHER_RWX) != 0 {
        warn!(
            path = %path.display(),
            mode = %format!("{:o}", mode & 0o777),
            "credential path is accessible to group or other"
        );
        return Err(RunDbError::Permission {
            path: path.to_path_buf(),
            message: format!(
                "File permissions on {} should not be readable, writable, or executable by 'group' or 'other'. Use chmod to fix this. (chmod 700 ~/.lsst)",
                path.display()
            ),
        });
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_mode(path: &Path, _metadata: &fs::Metadata) -> Result<()> {
    warn!(
        path = %path.display(),
        "mode bits are not available on this platform; skipping permission check"
    );
    Ok(())
}
