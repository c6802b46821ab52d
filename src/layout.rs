use std::fmt;
use std::path::{Path, PathBuf};

pub const ROOT_AUTHORITY_DIR: &str = "root_authority";
pub const INTERMEDIATE_AUTHORITY_DIR: &str = "intermediate_authority";

const SERVER_KEY: &str = "server.pem";
const SERVER_CSR: &str = "server.csr";
const SERVER_CSR_CONFIG: &str = "server_csr.conf";
const SERVER_SIGNING_CONFIG: &str = "sign_server_by_intermediate.conf";
const SERVER_CERT: &str = "server.crt";
const SERVER_BUNDLE: &str = "server_bundle.crt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Root,
    Intermediate,
    Server,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Root, Role::Intermediate, Role::Server];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Root => "root",
            Role::Intermediate => "intermediate",
            Role::Server => "server",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every file the pipeline owns, keyed by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    PrivateKey(Role),
    CsrConfig(Role),
    Csr(Role),
    Database(Role),
    Serial(Role),
    SigningConfig(Role),
    Certificate(Role),
    Bundle,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::PrivateKey(role) => write!(f, "{role} private key"),
            Artifact::CsrConfig(role) => write!(f, "{role} CSR config"),
            Artifact::Csr(role) => write!(f, "{role} CSR"),
            Artifact::Database(role) => write!(f, "{role} database"),
            Artifact::Serial(role) => write!(f, "{role} serial number"),
            Artifact::SigningConfig(role) => write!(f, "{role} signing config"),
            Artifact::Certificate(role) => write!(f, "{role} certificate"),
            Artifact::Bundle => f.write_str("server bundle"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityPaths {
    pub role: Role,
    pub dir: PathBuf,
    pub private_key: PathBuf,
    pub csr_config: PathBuf,
    pub csr: PathBuf,
    pub signing_config: PathBuf,
    pub database: PathBuf,
    pub serial: PathBuf,
    pub certificate: PathBuf,
}

impl AuthorityPaths {
    fn resolve(output_root: &Path, dir_name: &str, role: Role) -> Self {
        let dir = output_root.join(dir_name);
        let prefix = role.as_str();
        Self {
            role,
            private_key: dir.join(format!("{prefix}.pem")),
            csr_config: dir.join(format!("{prefix}_csr.conf")),
            csr: dir.join(format!("{prefix}.csr")),
            signing_config: dir.join(format!("{prefix}_ca.conf")),
            database: dir.join(format!("{prefix}_database.txt")),
            serial: dir.join(format!("{prefix}_serial_number.txt")),
            certificate: dir.join(format!("{prefix}.crt")),
            dir,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerPaths {
    pub dir: PathBuf,
    pub private_key: PathBuf,
    pub csr_config: PathBuf,
    pub csr: PathBuf,
    pub signing_config: PathBuf,
    pub certificate: PathBuf,
    pub bundle: PathBuf,
}

/// Shared templates, one per configuration file the pipeline hydrates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatePaths {
    pub root_csr: PathBuf,
    pub root_ca: PathBuf,
    pub intermediate_csr: PathBuf,
    pub intermediate_ca: PathBuf,
    pub server_csr: PathBuf,
    pub server_signing: PathBuf,
}

impl TemplatePaths {
    fn resolve(templates_dir: &Path) -> Self {
        Self {
            root_csr: templates_dir.join("root_csr.conf"),
            root_ca: templates_dir.join("root_ca.conf"),
            intermediate_csr: templates_dir.join("intermediate_csr.conf"),
            intermediate_ca: templates_dir.join("intermediate_ca.conf"),
            server_csr: templates_dir.join(SERVER_CSR_CONFIG),
            server_signing: templates_dir.join(SERVER_SIGNING_CONFIG),
        }
    }
}

/// Every path a provisioning run touches, computed once from the output root
/// and the domain name.
///
/// The root and intermediate authorities sit directly under the output root
/// and are shared by every domain provisioned there; only the server
/// artifacts are scoped by domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub output_root: PathBuf,
    pub domain: String,
    pub root: AuthorityPaths,
    pub intermediate: AuthorityPaths,
    pub server: ServerPaths,
    pub templates: TemplatePaths,
}

impl Layout {
    /// Resolves the layout. Performs no I/O and accepts any domain string;
    /// domain validation belongs to the caller.
    #[must_use]
    pub fn resolve(output_root: &Path, templates_dir: &Path, domain: &str) -> Self {
        let server_dir = output_root.join(domain);
        Self {
            output_root: output_root.to_path_buf(),
            domain: domain.to_string(),
            root: AuthorityPaths::resolve(output_root, ROOT_AUTHORITY_DIR, Role::Root),
            intermediate: AuthorityPaths::resolve(
                output_root,
                INTERMEDIATE_AUTHORITY_DIR,
                Role::Intermediate,
            ),
            server: ServerPaths {
                private_key: server_dir.join(SERVER_KEY),
                csr_config: server_dir.join(SERVER_CSR_CONFIG),
                csr: server_dir.join(SERVER_CSR),
                signing_config: server_dir.join(SERVER_SIGNING_CONFIG),
                certificate: server_dir.join(SERVER_CERT),
                bundle: server_dir.join(SERVER_BUNDLE),
                dir: server_dir,
            },
            templates: TemplatePaths::resolve(templates_dir),
        }
    }

    /// Directories in creation order; every parent precedes its children.
    #[must_use]
    pub fn directories(&self) -> [&Path; 4] {
        [
            &self.output_root,
            &self.server.dir,
            &self.root.dir,
            &self.intermediate.dir,
        ]
    }

    #[must_use]
    pub fn private_key(&self, role: Role) -> &Path {
        match role {
            Role::Root => &self.root.private_key,
            Role::Intermediate => &self.intermediate.private_key,
            Role::Server => &self.server.private_key,
        }
    }

    #[must_use]
    pub fn certificate(&self, role: Role) -> &Path {
        match role {
            Role::Root => &self.root.certificate,
            Role::Intermediate => &self.intermediate.certificate,
            Role::Server => &self.server.certificate,
        }
    }

    /// Every artifact with its path, in the order a fresh run creates them.
    #[must_use]
    pub fn artifacts(&self) -> Vec<(Artifact, &Path)> {
        let mut artifacts: Vec<(Artifact, &Path)> = Role::ALL
            .iter()
            .map(|role| (Artifact::PrivateKey(*role), self.private_key(*role)))
            .collect();
        for authority in [&self.root, &self.intermediate] {
            let role = authority.role;
            artifacts.extend([
                (Artifact::CsrConfig(role), authority.csr_config.as_path()),
                (Artifact::Csr(role), authority.csr.as_path()),
                (Artifact::Database(role), authority.database.as_path()),
                (Artifact::Serial(role), authority.serial.as_path()),
                (Artifact::SigningConfig(role), authority.signing_config.as_path()),
                (Artifact::Certificate(role), authority.certificate.as_path()),
            ]);
        }
        artifacts.extend([
            (
                Artifact::CsrConfig(Role::Server),
                self.server.csr_config.as_path(),
            ),
            (Artifact::Csr(Role::Server), self.server.csr.as_path()),
            (
                Artifact::SigningConfig(Role::Server),
                self.server.signing_config.as_path(),
            ),
            (
                Artifact::Certificate(Role::Server),
                self.server.certificate.as_path(),
            ),
            (Artifact::Bundle, self.server.bundle.as_path()),
        ]);
        artifacts
    }
}
