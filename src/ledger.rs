use tracing::{debug, info};

use crate::error::ProvisionError;
use crate::fs_util;
use crate::layout::{Artifact, AuthorityPaths};
use crate::pipeline::{Outcome, RunReport};

/// Hexadecimal value a fresh serial counter starts at.
pub const SERIAL_SEED: &str = "01";

/// Ensures the issuance database (empty) and serial counter (`01`) of an
/// authority exist. Existing ledger files are left untouched.
///
/// # Errors
/// Returns an error if either file cannot be created.
pub fn ensure_ledger(
    authority: &AuthorityPaths,
    report: &mut RunReport,
) -> Result<(), ProvisionError> {
    let role = authority.role;
    for (artifact, path, seed) in [
        (Artifact::Database(role), &authority.database, ""),
        (Artifact::Serial(role), &authority.serial, SERIAL_SEED),
    ] {
        let outcome = if fs_util::exists(path) {
            debug!("{artifact} present at {}", path.display());
            Outcome::Present
        } else if fs_util::create_new(path, seed.as_bytes())? {
            info!("Created {artifact} {}", path.display());
            Outcome::Created
        } else {
            Outcome::Present
        };
        report.record(artifact, path, outcome);
    }
    Ok(())
}
