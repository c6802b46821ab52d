use std::fs::{self, DirBuilder, OpenOptions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::Path;

use tracing::info;

use crate::error::ProvisionError;

const KEY_FILE_MODE: u32 = 0o600;
const DIR_MODE: u32 = 0o700;
const FILE_MODE: u32 = 0o644;

/// Reports whether `path` exists.
///
/// Any failure to stat the path, including a permission error, counts as
/// absent, so the caller re-creates rather than skips.
#[must_use]
pub fn exists(path: &Path) -> bool {
    matches!(path.try_exists(), Ok(true))
}

/// Creates `path` with owner-only permissions unless it already exists.
/// The parent must exist.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> Result<bool, ProvisionError> {
    if exists(path) {
        return Ok(false);
    }
    info!("Creating directory {}", path.display());
    match DirBuilder::new().mode(DIR_MODE).create(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(err) => Err(ProvisionError::io("create directory", path, err)),
    }
}

/// Writes `contents` to `path` only if no file is there yet. An existing file
/// is never truncated.
///
/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn create_new(path: &Path, contents: &[u8]) -> Result<bool, ProvisionError> {
    let mut file = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(FILE_MODE)
        .open(path)
    {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(err) => return Err(ProvisionError::io("create file", path, err)),
    };
    file.write_all(contents)
        .and_then(|()| file.sync_all())
        .map_err(|err| ProvisionError::io("write file", path, err))?;
    Ok(true)
}

/// Replaces `path` with `contents` via a sibling temporary file, so readers
/// never observe a partially written file.
///
/// # Errors
/// Returns an error if the temporary file cannot be written or renamed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ProvisionError> {
    let file_name = path.file_name().map_or_else(
        || "artifact".into(),
        |name| name.to_string_lossy().into_owned(),
    );
    let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));
    let result = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(FILE_MODE)
        .open(&tmp_path)
        .and_then(|mut file| {
            file.write_all(contents)?;
            file.sync_all()
        });
    if let Err(err) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(ProvisionError::io("write file", &tmp_path, err));
    }
    fs::rename(&tmp_path, path).map_err(|err| {
        let _ = fs::remove_file(&tmp_path);
        ProvisionError::io("move into place", path, err)
    })
}

/// Applies restrictive permissions to a private key file.
///
/// # Errors
/// Returns an error if permissions cannot be set.
pub fn set_key_permissions(path: &Path) -> Result<(), ProvisionError> {
    fs::set_permissions(path, fs::Permissions::from_mode(KEY_FILE_MODE))
        .map_err(|err| ProvisionError::io("set permissions on", path, err))
}
