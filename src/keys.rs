use std::path::Path;

use tracing::{debug, info};

use crate::error::ProvisionError;
use crate::fs_util;
use crate::layout::{Artifact, Layout, Role};
use crate::pipeline::{Outcome, RunReport};
use crate::toolkit::{SigningToolkit, ensure_produced};

/// Generates the private key for `role` at `path` unless one is already
/// there. An existing key is authoritative and never replaced.
///
/// # Errors
/// Returns [`ProvisionError::KeyGeneration`] if the toolkit fails or leaves no
/// key behind.
pub fn ensure_private_key(
    toolkit: &dyn SigningToolkit,
    role: Role,
    path: &Path,
) -> Result<Outcome, ProvisionError> {
    if fs_util::exists(path) {
        debug!("{role} private key present at {}", path.display());
        return Ok(Outcome::Present);
    }
    info!("Generating {role} private key {}", path.display());
    toolkit
        .generate_private_key(path)
        .and_then(|()| ensure_produced("key generation", path))
        .map_err(|source| ProvisionError::KeyGeneration {
            role,
            path: path.to_path_buf(),
            source,
        })?;
    fs_util::set_key_permissions(path)?;
    Ok(Outcome::Created)
}

/// Ensures the root, intermediate and server keys, in that order.
///
/// # Errors
/// Returns the first key generation failure.
pub fn ensure_all(
    toolkit: &dyn SigningToolkit,
    layout: &Layout,
    report: &mut RunReport,
) -> Result<(), ProvisionError> {
    for role in Role::ALL {
        let path = layout.private_key(role);
        let outcome = ensure_private_key(toolkit, role, path)?;
        report.record(Artifact::PrivateKey(role), path, outcome);
    }
    Ok(())
}
