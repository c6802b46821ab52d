// Helper functions are shared across multiple test crates; not every helper is
// referenced in each test module.
#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chainroot::{Signer, SigningToolkit, ToolkitError};
use rcgen::{
    BasicConstraints, CertificateParams, CertificateSigningRequestParams, DnType, IsCa, Issuer,
    KeyPair, SerialNumber,
};

pub(crate) const FAKE_OPENSSL_LOG: &str = "FAKE_OPENSSL_LOG";
pub(crate) const FAKE_OPENSSL_FAIL: &str = "FAKE_OPENSSL_FAIL";

const FAKE_OPENSSL: &str = r#"#!/bin/sh
set -eu

cmd="${1:-}"
[ $# -gt 0 ] && shift

if [ -n "${FAKE_OPENSSL_LOG:-}" ]; then
  echo "$cmd" >> "$FAKE_OPENSSL_LOG"
fi

if [ "${FAKE_OPENSSL_FAIL:-}" = "$cmd" ]; then
  echo "fake openssl: $cmd refused" >&2
  exit 1
fi

out=""
input=""
while [ $# -gt 0 ]; do
  case "$1" in
    -out) out="$2"; shift 2 ;;
    -in) input="$2"; shift 2 ;;
    *) shift ;;
  esac
done

case "$cmd" in
  genpkey) echo "PRIVATE KEY $out" > "$out" ;;
  req) echo "CERTIFICATE REQUEST $out" > "$out" ;;
  ca) echo "CERTIFICATE for $input" > "$out" ;;
esac
"#;

pub(crate) fn write_fake_openssl(dir: &Path) -> Result<PathBuf> {
    let path = dir.join("openssl");
    fs::write(&path, FAKE_OPENSSL).context("Failed to write fake openssl script")?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o700))
        .context("Failed to set fake openssl permissions")?;
    Ok(path)
}

pub(crate) fn templates_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("templates")
}

/// Issues real X.509 material in-process so chain properties can be checked
/// without an openssl installation.
pub(crate) struct RcgenToolkit;

fn failed(operation: &str, err: impl std::fmt::Display) -> ToolkitError {
    ToolkitError::Failed {
        command: operation.to_string(),
        status: "rcgen".to_string(),
        stderr: err.to_string(),
    }
}

fn read(operation: &str, path: &Path) -> Result<String, ToolkitError> {
    fs::read_to_string(path).map_err(|source| ToolkitError::Spawn {
        command: format!("{operation} (read {})", path.display()),
        source,
    })
}

fn write(operation: &str, path: &Path, contents: &str) -> Result<(), ToolkitError> {
    fs::write(path, contents).map_err(|source| ToolkitError::Spawn {
        command: format!("{operation} (write {})", path.display()),
        source,
    })
}

fn config_value(config: &str, key: &str) -> Option<String> {
    config.lines().find_map(|line| {
        let (name, value) = line.split_once('=')?;
        (name.trim() == key).then(|| value.trim().to_string())
    })
}

/// Takes the next serial from the ledger named by `config` and records the
/// issuance there, as `openssl ca` does.
fn take_serial(
    operation: &str,
    config: &Path,
    certificate: &Path,
) -> Result<SerialNumber, ToolkitError> {
    let config = read(operation, config)?;
    let (Some(database), Some(serial)) = (
        config_value(&config, "database"),
        config_value(&config, "serial"),
    ) else {
        return Err(failed(operation, "config names no ledger"));
    };
    let (database, serial) = (PathBuf::from(database), PathBuf::from(serial));
    let current = read(operation, &serial)?.trim().to_string();
    let value = u64::from_str_radix(&current, 16).map_err(|err| failed(operation, err))?;
    let mut entries = read(operation, &database)?;
    entries.push_str(&format!("V\t{current}\t{}\n", certificate.display()));
    write(operation, &database, &entries)?;
    write(operation, &serial, &format!("{:02X}", value + 1))?;
    Ok(SerialNumber::from_slice(&value.to_be_bytes()))
}

impl SigningToolkit for RcgenToolkit {
    fn generate_private_key(&self, key: &Path) -> Result<(), ToolkitError> {
        let pair = KeyPair::generate().map_err(|err| failed("genpkey", err))?;
        write("genpkey", key, &pair.serialize_pem())
    }

    fn request_signing_request(
        &self,
        key: &Path,
        config: &Path,
        csr: &Path,
    ) -> Result<(), ToolkitError> {
        let pair = KeyPair::from_pem(&read("req", key)?).map_err(|err| failed("req", err))?;
        let cn = config_value(&read("req", config)?, "CN")
            .ok_or_else(|| failed("req", "config has no CN"))?;
        let mut params = CertificateParams::default();
        params.distinguished_name.push(DnType::CommonName, cn);
        let request = params
            .serialize_request(&pair)
            .and_then(|request| request.pem())
            .map_err(|err| failed("req", err))?;
        write("req", csr, &request)
    }

    fn self_sign(
        &self,
        key: &Path,
        config: &Path,
        csr: &Path,
        certificate: &Path,
        _out_dir: &Path,
    ) -> Result<(), ToolkitError> {
        let pair =
            KeyPair::from_pem(&read("selfsign", key)?).map_err(|err| failed("selfsign", err))?;
        let mut request = CertificateSigningRequestParams::from_pem(&read("selfsign", csr)?)
            .map_err(|err| failed("selfsign", err))?;
        request.params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        request.params.serial_number = Some(take_serial("selfsign", config, certificate)?);
        let cert = request
            .params
            .self_signed(&pair)
            .map_err(|err| failed("selfsign", err))?;
        write("selfsign", certificate, &cert.pem())
    }

    fn sign(
        &self,
        csr: &Path,
        config: &Path,
        signer: Signer<'_>,
        certificate: &Path,
        _out_dir: &Path,
    ) -> Result<(), ToolkitError> {
        let signer_key =
            KeyPair::from_pem(&read("ca", signer.key)?).map_err(|err| failed("ca", err))?;
        let issuer = Issuer::from_ca_cert_pem(&read("ca", signer.certificate)?, signer_key)
            .map_err(|err| failed("ca", err))?;
        let mut request = CertificateSigningRequestParams::from_pem(&read("ca", csr)?)
            .map_err(|err| failed("ca", err))?;
        request.params.serial_number = Some(take_serial("ca", config, certificate)?);
        let cert = request.signed_by(&issuer).map_err(|err| failed("ca", err))?;
        write("ca", certificate, &cert.pem())
    }
}
