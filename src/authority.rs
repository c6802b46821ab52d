//! Root and intermediate authority builders.
//!
//! Each authority moves through three stages, each skipped when its output
//! already exists: signing request, ledger plus signing configuration, and
//! certificate.

use std::path::Path;

use tracing::{debug, info};

use crate::error::ProvisionError;
use crate::fs_util;
use crate::layout::{Artifact, AuthorityPaths, Layout, Role};
use crate::ledger;
use crate::pipeline::{Outcome, RunReport};
use crate::template::{self, Bindings, Placeholder, TemplateKind};
use crate::toolkit::{Signer, SigningToolkit, ToolkitError, ensure_produced};

/// Files involved in producing one certificate signing request.
pub(crate) struct RequestFiles<'a> {
    pub(crate) role: Role,
    pub(crate) key: &'a Path,
    pub(crate) template: &'a Path,
    pub(crate) kind: TemplateKind,
    pub(crate) config: &'a Path,
    pub(crate) csr: &'a Path,
}

/// Hydrates `output` from `template` unless it already exists. A present
/// configuration is final, even if the template has since changed.
pub(crate) fn ensure_config(
    artifact: Artifact,
    kind: TemplateKind,
    template: &Path,
    output: &Path,
    bindings: &Bindings,
    report: &mut RunReport,
) -> Result<(), ProvisionError> {
    let outcome = if fs_util::exists(output) {
        debug!("{artifact} present at {}", output.display());
        Outcome::Present
    } else {
        template::hydrate(kind, template, output, bindings)?;
        Outcome::Created
    };
    report.record(artifact, output, outcome);
    Ok(())
}

pub(crate) fn ensure_signing_request(
    toolkit: &dyn SigningToolkit,
    files: &RequestFiles<'_>,
    bindings: &Bindings,
    report: &mut RunReport,
) -> Result<(), ProvisionError> {
    let role = files.role;
    if fs_util::exists(files.csr) {
        debug!("{role} CSR present at {}", files.csr.display());
        report.record(Artifact::Csr(role), files.csr, Outcome::Present);
        return Ok(());
    }
    ensure_config(
        Artifact::CsrConfig(role),
        files.kind,
        files.template,
        files.config,
        bindings,
        report,
    )?;
    info!("Generating {role} CSR {}", files.csr.display());
    toolkit
        .request_signing_request(files.key, files.config, files.csr)
        .and_then(|()| ensure_produced("CSR generation", files.csr))
        .map_err(|source| ProvisionError::SigningRequest {
            role,
            path: files.csr.to_path_buf(),
            source,
        })?;
    report.record(Artifact::Csr(role), files.csr, Outcome::Created);
    Ok(())
}

/// Runs `issue` unless `certificate` already exists.
pub(crate) fn ensure_certificate(
    role: Role,
    certificate: &Path,
    report: &mut RunReport,
    issue: impl FnOnce() -> Result<(), ToolkitError>,
) -> Result<(), ProvisionError> {
    if fs_util::exists(certificate) {
        debug!("{role} certificate present at {}", certificate.display());
        report.record(Artifact::Certificate(role), certificate, Outcome::Present);
        return Ok(());
    }
    info!("Issuing {role} certificate {}", certificate.display());
    issue()
        .and_then(|()| ensure_produced("certificate issuance", certificate))
        .map_err(|source| ProvisionError::CertificateIssuance {
            role,
            path: certificate.to_path_buf(),
            source,
        })?;
    report.record(Artifact::Certificate(role), certificate, Outcome::Created);
    Ok(())
}

fn ledger_bindings(authority: &AuthorityPaths) -> Bindings {
    Bindings::new()
        .bind_path(Placeholder::Database, &authority.database)
        .bind_path(Placeholder::Serial, &authority.serial)
}

/// Hydrates the signing configuration of `authority`, embedding the ledger of
/// `issuer`, the authority that performs the signing. The issuer's ledger
/// must already exist.
fn ensure_signing_config(
    authority: &AuthorityPaths,
    issuer: &AuthorityPaths,
    kind: TemplateKind,
    template: &Path,
    report: &mut RunReport,
) -> Result<(), ProvisionError> {
    ensure_config(
        Artifact::SigningConfig(authority.role),
        kind,
        template,
        &authority.signing_config,
        &ledger_bindings(issuer),
        report,
    )
}

fn request_files<'a>(
    authority: &'a AuthorityPaths,
    template: &'a Path,
    kind: TemplateKind,
) -> RequestFiles<'a> {
    RequestFiles {
        role: authority.role,
        key: &authority.private_key,
        template,
        kind,
        config: &authority.csr_config,
        csr: &authority.csr,
    }
}

/// Builds the self-signed root authority.
///
/// # Errors
/// Returns the first failing stage.
pub fn build_root(
    toolkit: &dyn SigningToolkit,
    layout: &Layout,
    report: &mut RunReport,
) -> Result<(), ProvisionError> {
    let root = &layout.root;
    let templates = &layout.templates;
    ensure_signing_request(
        toolkit,
        &request_files(root, &templates.root_csr, TemplateKind::RootCsr),
        &Bindings::new(),
        report,
    )?;
    ledger::ensure_ledger(root, report)?;
    ensure_signing_config(
        root,
        root,
        TemplateKind::RootAuthority,
        &templates.root_ca,
        report,
    )?;
    ensure_certificate(Role::Root, &root.certificate, report, || {
        toolkit.self_sign(
            &root.private_key,
            &root.signing_config,
            &root.csr,
            &root.certificate,
            &root.dir,
        )
    })
}

/// Builds the intermediate authority, signed by the root.
///
/// The root issues the intermediate, so the intermediate's signing
/// configuration records into the root ledger. The intermediate ledger is
/// seeded here for the server certificates it issues later. Runs after
/// [`build_root`].
///
/// # Errors
/// Returns the first failing stage.
pub fn build_intermediate(
    toolkit: &dyn SigningToolkit,
    layout: &Layout,
    report: &mut RunReport,
) -> Result<(), ProvisionError> {
    let intermediate = &layout.intermediate;
    let templates = &layout.templates;
    ensure_signing_request(
        toolkit,
        &request_files(
            intermediate,
            &templates.intermediate_csr,
            TemplateKind::IntermediateCsr,
        ),
        &Bindings::new(),
        report,
    )?;
    ledger::ensure_ledger(intermediate, report)?;
    ensure_signing_config(
        intermediate,
        &layout.root,
        TemplateKind::IntermediateAuthority,
        &templates.intermediate_ca,
        report,
    )?;
    let signer = Signer {
        key: &layout.root.private_key,
        certificate: &layout.root.certificate,
    };
    ensure_certificate(Role::Intermediate, &intermediate.certificate, report, || {
        toolkit.sign(
            &intermediate.csr,
            &intermediate.signing_config,
            signer,
            &intermediate.certificate,
            &layout.root.dir,
        )
    })
}
