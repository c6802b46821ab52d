use std::fs;

use tracing::{debug, info};

use crate::error::ProvisionError;
use crate::fs_util;
use crate::layout::{Artifact, Layout, Role};
use crate::pipeline::{Outcome, RunReport};

/// Order of certificates in the trust bundle, leaf first.
pub const CHAIN_ORDER: [Role; 3] = [Role::Server, Role::Intermediate, Role::Root];

/// Writes the server, intermediate and root certificates, concatenated in that
/// order, to the bundle path unless a bundle already exists.
///
/// All three certificates are read before anything is written, so a missing
/// certificate never leaves a partial bundle behind.
///
/// # Errors
/// Returns an error if any certificate cannot be read or the bundle cannot be
/// written.
pub fn assemble(layout: &Layout, report: &mut RunReport) -> Result<(), ProvisionError> {
    let bundle = &layout.server.bundle;
    if fs_util::exists(bundle) {
        debug!("Bundle present at {}", bundle.display());
        report.record(Artifact::Bundle, bundle, Outcome::Present);
        return Ok(());
    }

    let mut contents = Vec::new();
    for role in CHAIN_ORDER {
        let path = layout.certificate(role);
        let certificate =
            fs::read(path).map_err(|err| ProvisionError::io("read certificate", path, err))?;
        contents.extend_from_slice(&certificate);
    }

    info!("Writing trust bundle {}", bundle.display());
    fs_util::write_atomic(bundle, &contents)?;
    report.record(Artifact::Bundle, bundle, Outcome::Created);
    Ok(())
}
