use std::path::PathBuf;

use thiserror::Error;

use crate::layout::Role;
use crate::template::HydrationFault;
use crate::toolkit::ToolkitError;

/// Failure of a provisioning stage. Every variant aborts the run.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("failed to {action} {}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to generate {role} private key {}", path.display())]
    KeyGeneration {
        role: Role,
        path: PathBuf,
        #[source]
        source: ToolkitError,
    },

    #[error("failed to generate {role} certificate signing request {}", path.display())]
    SigningRequest {
        role: Role,
        path: PathBuf,
        #[source]
        source: ToolkitError,
    },

    #[error("failed to issue {role} certificate {}", path.display())]
    CertificateIssuance {
        role: Role,
        path: PathBuf,
        #[source]
        source: ToolkitError,
    },

    #[error("failed to hydrate {} from template {}", output.display(), template.display())]
    TemplateHydration {
        template: PathBuf,
        output: PathBuf,
        #[source]
        fault: HydrationFault,
    },
}

impl ProvisionError {
    pub(crate) fn io(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        ProvisionError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}
