//! Typed boundary to the external certificate-authority toolkit.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::debug;

use crate::config::OpenSslSettings;

#[derive(Debug, Error)]
pub enum ToolkitError {
    #[error("failed to run `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed ({status}): {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("{operation} reported success but {} was not produced", path.display())]
    MissingOutput {
        operation: &'static str,
        path: PathBuf,
    },
}

/// Key and certificate of the authority that signs a request.
#[derive(Debug, Clone, Copy)]
pub struct Signer<'a> {
    pub key: &'a Path,
    pub certificate: &'a Path,
}

/// Cryptographic operations the pipeline delegates. Implementations must not
/// touch ledger or configuration files except through the toolkit's own
/// bookkeeping.
pub trait SigningToolkit {
    /// Writes a new private key to `key`. The same algorithm serves every role.
    ///
    /// # Errors
    /// Returns an error if the toolkit reports failure.
    fn generate_private_key(&self, key: &Path) -> Result<(), ToolkitError>;

    /// Writes a certificate signing request for `key` to `csr`.
    ///
    /// # Errors
    /// Returns an error if the toolkit reports failure.
    fn request_signing_request(
        &self,
        key: &Path,
        config: &Path,
        csr: &Path,
    ) -> Result<(), ToolkitError>;

    /// Issues `certificate` for `csr`, signed by `key` itself.
    ///
    /// # Errors
    /// Returns an error if the toolkit reports failure.
    fn self_sign(
        &self,
        key: &Path,
        config: &Path,
        csr: &Path,
        certificate: &Path,
        out_dir: &Path,
    ) -> Result<(), ToolkitError>;

    /// Issues `certificate` for `csr`, signed by `signer`.
    ///
    /// # Errors
    /// Returns an error if the toolkit reports failure.
    fn sign(
        &self,
        csr: &Path,
        config: &Path,
        signer: Signer<'_>,
        certificate: &Path,
        out_dir: &Path,
    ) -> Result<(), ToolkitError>;
}

/// Confirms that a toolkit call which reported success left its output behind.
///
/// # Errors
/// Returns [`ToolkitError::MissingOutput`] if `path` does not exist.
pub fn ensure_produced(operation: &'static str, path: &Path) -> Result<(), ToolkitError> {
    if crate::fs_util::exists(path) {
        Ok(())
    } else {
        Err(ToolkitError::MissingOutput {
            operation,
            path: path.to_path_buf(),
        })
    }
}

/// Runs the `openssl` command-line tool with explicit argument vectors.
#[derive(Debug, Clone)]
pub struct OpenSslToolkit {
    binary: PathBuf,
    key_algorithm: String,
    csr_days: u32,
}

impl OpenSslToolkit {
    #[must_use]
    pub fn new(settings: &OpenSslSettings) -> Self {
        Self {
            binary: settings.binary.clone(),
            key_algorithm: settings.key_algorithm.clone(),
            csr_days: settings.csr_days,
        }
    }

    fn run(&self, args: &[&OsStr]) -> Result<(), ToolkitError> {
        let command = self.describe(args);
        debug!("Running {command}");
        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .map_err(|source| ToolkitError::Spawn {
                command: command.clone(),
                source,
            })?;
        if output.status.success() {
            return Ok(());
        }
        Err(ToolkitError::Failed {
            command,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    fn describe(&self, args: &[&OsStr]) -> String {
        let mut parts = vec![self.binary.to_string_lossy().into_owned()];
        parts.extend(args.iter().map(|arg| arg.to_string_lossy().into_owned()));
        parts.join(" ")
    }
}

impl SigningToolkit for OpenSslToolkit {
    fn generate_private_key(&self, key: &Path) -> Result<(), ToolkitError> {
        self.run(&[
            "genpkey".as_ref(),
            "-outform".as_ref(),
            "pem".as_ref(),
            "-out".as_ref(),
            key.as_os_str(),
            "-algorithm".as_ref(),
            self.key_algorithm.as_ref(),
        ])
    }

    fn request_signing_request(
        &self,
        key: &Path,
        config: &Path,
        csr: &Path,
    ) -> Result<(), ToolkitError> {
        let days = self.csr_days.to_string();
        self.run(&[
            "req".as_ref(),
            "-key".as_ref(),
            key.as_os_str(),
            "-out".as_ref(),
            csr.as_os_str(),
            "-days".as_ref(),
            days.as_ref(),
            "-new".as_ref(),
            "-config".as_ref(),
            config.as_os_str(),
        ])
    }

    fn self_sign(
        &self,
        key: &Path,
        config: &Path,
        csr: &Path,
        certificate: &Path,
        out_dir: &Path,
    ) -> Result<(), ToolkitError> {
        self.run(&[
            "ca".as_ref(),
            "-selfsign".as_ref(),
            "-keyfile".as_ref(),
            key.as_os_str(),
            "-config".as_ref(),
            config.as_os_str(),
            "-out".as_ref(),
            certificate.as_os_str(),
            "-in".as_ref(),
            csr.as_os_str(),
            "-outdir".as_ref(),
            out_dir.as_os_str(),
            "-verbose".as_ref(),
            "-batch".as_ref(),
        ])
    }

    fn sign(
        &self,
        csr: &Path,
        config: &Path,
        signer: Signer<'_>,
        certificate: &Path,
        out_dir: &Path,
    ) -> Result<(), ToolkitError> {
        self.run(&[
            "ca".as_ref(),
            "-in".as_ref(),
            csr.as_os_str(),
            "-out".as_ref(),
            certificate.as_os_str(),
            "-config".as_ref(),
            config.as_os_str(),
            "-keyfile".as_ref(),
            signer.key.as_os_str(),
            "-cert".as_ref(),
            signer.certificate.as_os_str(),
            "-outdir".as_ref(),
            out_dir.as_os_str(),
            "-batch".as_ref(),
        ])
    }
}

/// In-process toolkit for unit tests: writes deterministic artifacts and
/// records every call.
#[cfg(test)]
pub(crate) mod fake {
    use std::cell::RefCell;
    use std::fs;
    use std::path::Path;

    use super::{Signer, SigningToolkit, ToolkitError};

    #[derive(Debug, Default)]
    pub(crate) struct FakeToolkit {
        calls: RefCell<Vec<String>>,
        fail_on: Option<&'static str>,
        silent_on: Option<&'static str>,
    }

    impl FakeToolkit {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Fails the first call whose description starts with `prefix`.
        pub(crate) fn failing_on(prefix: &'static str) -> Self {
            Self {
                fail_on: Some(prefix),
                ..Self::default()
            }
        }

        /// Reports success without writing output for matching calls.
        pub(crate) fn silent_on(prefix: &'static str) -> Self {
            Self {
                silent_on: Some(prefix),
                ..Self::default()
            }
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        fn invoke(
            &self,
            call: String,
            output: &Path,
            contents: String,
        ) -> Result<(), ToolkitError> {
            self.calls.borrow_mut().push(call.clone());
            if self.fail_on.is_some_and(|prefix| call.starts_with(prefix)) {
                return Err(ToolkitError::Failed {
                    command: call,
                    status: "exit status: 1".to_string(),
                    stderr: "injected failure".to_string(),
                });
            }
            if self.silent_on.is_some_and(|prefix| call.starts_with(prefix)) {
                return Ok(());
            }
            fs::write(output, contents).map_err(|source| ToolkitError::Spawn {
                command: call,
                source,
            })
        }
    }

    fn config_value(config: &str, key: &str) -> Option<String> {
        config.lines().find_map(|line| {
            let (name, value) = line.split_once('=')?;
            (name.trim() == key).then(|| value.trim().to_string())
        })
    }

    /// Records an issued certificate in the ledger named by `config` and
    /// advances its serial, the way `openssl ca` does.
    fn record_issuance(config: &Path, certificate: &Path) {
        if !certificate.exists() {
            return;
        }
        let config = fs::read_to_string(config).unwrap_or_default();
        let (Some(database), Some(serial)) = (
            config_value(&config, "database"),
            config_value(&config, "serial"),
        ) else {
            return;
        };
        let current = fs::read_to_string(&serial).unwrap();
        let current = current.trim();
        let next = u64::from_str_radix(current, 16).unwrap() + 1;
        let mut entries = fs::read_to_string(&database).unwrap();
        entries.push_str(&format!("V\t{current}\t{}\n", name(certificate)));
        fs::write(&database, entries).unwrap();
        fs::write(&serial, format!("{next:02X}")).unwrap();
    }

    fn name(path: &Path) -> String {
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    impl SigningToolkit for FakeToolkit {
        fn generate_private_key(&self, key: &Path) -> Result<(), ToolkitError> {
            self.invoke(format!("genpkey {}", name(key)), key, format!("key:{}\n", name(key)))
        }

        fn request_signing_request(
            &self,
            key: &Path,
            config: &Path,
            csr: &Path,
        ) -> Result<(), ToolkitError> {
            let config = fs::read_to_string(config).unwrap_or_default();
            self.invoke(
                format!("req {}", name(csr)),
                csr,
                format!("csr:{}\n{config}", name(key)),
            )
        }

        fn self_sign(
            &self,
            key: &Path,
            config: &Path,
            csr: &Path,
            certificate: &Path,
            _out_dir: &Path,
        ) -> Result<(), ToolkitError> {
            self.invoke(
                format!("selfsign {}", name(certificate)),
                certificate,
                format!("cert:{} signed by {}\n", name(csr), name(key)),
            )?;
            record_issuance(config, certificate);
            Ok(())
        }

        fn sign(
            &self,
            csr: &Path,
            config: &Path,
            signer: Signer<'_>,
            certificate: &Path,
            _out_dir: &Path,
        ) -> Result<(), ToolkitError> {
            self.invoke(
                format!("sign {}", name(certificate)),
                certificate,
                format!(
                    "cert:{} signed by {} ({})\n",
                    name(csr),
                    name(signer.key),
                    name(signer.certificate)
                ),
            )?;
            record_issuance(config, certificate);
            Ok(())
        }
    }
}
