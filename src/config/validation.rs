use anyhow::Result;

use super::{OpenSslSettings, Settings};

pub(crate) fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.output_dir.as_os_str().is_empty() {
        anyhow::bail!("output_dir must not be empty");
    }
    if settings.templates_dir.as_os_str().is_empty() {
        anyhow::bail!("templates_dir must not be empty");
    }
    validate_openssl(&settings.openssl)
}

fn validate_openssl(openssl: &OpenSslSettings) -> Result<()> {
    if openssl.binary.as_os_str().is_empty() {
        anyhow::bail!("openssl.binary must not be empty");
    }
    if openssl.key_algorithm.trim().is_empty() {
        anyhow::bail!("openssl.key_algorithm must not be empty");
    }
    if openssl.csr_days == 0 {
        anyhow::bail!("openssl.csr_days must be greater than 0");
    }
    Ok(())
}
