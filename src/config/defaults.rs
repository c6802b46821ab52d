use config::{ConfigBuilder, ConfigError, builder::DefaultState};

const DEFAULT_OUTPUT_DIR: &str = "output";
const DEFAULT_TEMPLATES_DIR: &str = "templates";
const DEFAULT_OPENSSL_BINARY: &str = "openssl";
const DEFAULT_KEY_ALGORITHM: &str = "rsa";
const DEFAULT_CSR_DAYS: u64 = 398;

pub(crate) fn apply_defaults(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    builder
        .set_default("output_dir", DEFAULT_OUTPUT_DIR)?
        .set_default("templates_dir", DEFAULT_TEMPLATES_DIR)?
        .set_default("openssl.binary", DEFAULT_OPENSSL_BINARY)?
        .set_default("openssl.key_algorithm", DEFAULT_KEY_ALGORITHM)?
        .set_default("openssl.csr_days", DEFAULT_CSR_DAYS)
}
