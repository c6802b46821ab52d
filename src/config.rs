use std::path::{Path, PathBuf};

use anyhow::Result;
use config::{Config, ConfigError, Environment, File, Map};
use serde::Deserialize;

mod defaults;
mod validation;

pub const DEFAULT_CONFIG_FILE: &str = "chainroot.toml";

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub output_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub openssl: OpenSslSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenSslSettings {
    pub binary: PathBuf,
    pub key_algorithm: String,
    pub csr_days: u32,
}

impl Settings {
    /// Creates a new `Settings` instance.
    ///
    /// # Errors
    /// Returns error if configuration parsing fails (e.g. invalid format).
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::load(config_path, Path::new(DEFAULT_CONFIG_FILE), None)
    }

    /// Loads settings with `default_file` standing in for `chainroot.toml`.
    /// `environment` replaces the process environment when given.
    fn load(
        config_path: Option<PathBuf>,
        default_file: &Path,
        environment: Option<Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut s = defaults::apply_defaults(Config::builder())?;

        // An explicit path must exist; the default file is optional.
        let source = match config_path {
            Some(path) => File::from(path).required(true),
            None => File::from(default_file).required(false),
        };
        s = s.add_source(source);

        // e.g. CHAINROOT_OUTPUT_DIR, CHAINROOT_OPENSSL__CSR_DAYS
        s = s.add_source(
            Environment::with_prefix("CHAINROOT")
                .prefix_separator("_")
                .separator("__")
                .source(environment),
        );

        s.build()?.try_deserialize()
    }

    /// Merges CLI arguments into the settings, overriding values if present.
    pub fn merge_with_args(&mut self, args: &crate::Args) {
        if let Some(output_dir) = &args.output_dir {
            output_dir.clone_into(&mut self.output_dir);
        }
        if let Some(templates_dir) = &args.templates_dir {
            templates_dir.clone_into(&mut self.templates_dir);
        }
        if let Some(openssl) = &args.openssl {
            openssl.clone_into(&mut self.openssl.binary);
        }
    }

    /// Validates configuration values for correctness.
    ///
    /// # Errors
    /// Returns error if any setting is empty or out of range.
    pub fn validate(&self) -> Result<()> {
        validation::validate_settings(self)
    }
}
