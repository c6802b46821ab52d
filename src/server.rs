use crate::authority::{RequestFiles, ensure_certificate, ensure_config, ensure_signing_request};
use crate::error::ProvisionError;
use crate::layout::{Artifact, Layout, Role};
use crate::pipeline::RunReport;
use crate::template::{Bindings, Placeholder, TemplateKind};
use crate::toolkit::{Signer, SigningToolkit};

/// Builds the server certificate for the layout's domain, signed by the
/// intermediate authority. Runs after the intermediate builder.
///
/// # Errors
/// Returns the first failing stage.
pub fn build_server(
    toolkit: &dyn SigningToolkit,
    layout: &Layout,
    report: &mut RunReport,
) -> Result<(), ProvisionError> {
    let server = &layout.server;
    let intermediate = &layout.intermediate;
    let domain = Bindings::new().bind(Placeholder::Domain, layout.domain.as_str());

    ensure_signing_request(
        toolkit,
        &RequestFiles {
            role: Role::Server,
            key: &server.private_key,
            template: &layout.templates.server_csr,
            kind: TemplateKind::ServerCsr,
            config: &server.csr_config,
            csr: &server.csr,
        },
        &domain,
        report,
    )?;

    // The intermediate ledger was seeded by the intermediate builder.
    ensure_config(
        Artifact::SigningConfig(Role::Server),
        TemplateKind::ServerSigning,
        &layout.templates.server_signing,
        &server.signing_config,
        &domain
            .clone()
            .bind_path(Placeholder::Database, &intermediate.database)
            .bind_path(Placeholder::Serial, &intermediate.serial),
        report,
    )?;

    let signer = Signer {
        key: &intermediate.private_key,
        certificate: &intermediate.certificate,
    };
    ensure_certificate(Role::Server, &server.certificate, report, || {
        toolkit.sign(
            &server.csr,
            &server.signing_config,
            signer,
            &server.certificate,
            &intermediate.dir,
        )
    })
}
