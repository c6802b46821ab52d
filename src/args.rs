use std::path::PathBuf;

use clap::Parser;

/// Provision a root, intermediate and server certificate chain for a domain.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Domain name the server certificate is issued for
    #[arg(value_parser = parse_domain)]
    pub domain: String,

    /// Path to configuration file (default: chainroot.toml)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Directory that receives the authorities and domain directories
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Directory holding the configuration templates
    #[arg(long)]
    pub templates_dir: Option<PathBuf>,

    /// Path to the openssl binary
    #[arg(long)]
    pub openssl: Option<PathBuf>,

    /// Show which artifacts exist and which a run would create, then exit
    #[arg(long)]
    pub plan: bool,
}

const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Accepts a DNS hostname: dot-separated labels of ASCII letters, digits and
/// inner hyphens. The result names one directory under the output root and is
/// written verbatim into generated configuration files.
///
/// # Errors
/// Returns a message when the input is not a valid hostname.
pub fn parse_domain(input: &str) -> Result<String, String> {
    let domain = input.trim();
    if domain.is_empty() {
        return Err("domain must not be empty".to_string());
    }
    if domain.len() > MAX_DOMAIN_LEN {
        return Err(format!("domain must be at most {MAX_DOMAIN_LEN} characters"));
    }
    for label in domain.split('.') {
        if let Err(reason) = check_label(label) {
            return Err(format!("invalid domain {domain:?}: {reason}"));
        }
    }
    Ok(domain.to_string())
}

fn check_label(label: &str) -> Result<(), &'static str> {
    if label.is_empty() {
        return Err("empty label");
    }
    if label.len() > MAX_LABEL_LEN {
        return Err("label longer than 63 characters");
    }
    if !label
        .bytes()
        .all(|byte| byte.is_ascii_alphanumeric() || byte == b'-')
    {
        return Err("labels may only contain ASCII letters, digits and '-'");
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err("labels must not start or end with '-'");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_domain_accepts_hostnames() {
        assert_eq!(parse_domain("example.com").unwrap(), "example.com");
        assert_eq!(parse_domain(" api.internal ").unwrap(), "api.internal");
        assert_eq!(parse_domain("localhost").unwrap(), "localhost");
        assert_eq!(parse_domain("xn--bcher-kva.de").unwrap(), "xn--bcher-kva.de");
        assert_eq!(parse_domain("10.internal").unwrap(), "10.internal");
    }

    #[test]
    fn test_parse_domain_rejects_paths() {
        for input in ["", "  ", ".", "..", "a/b", "/etc", "../escape", "bücher.de"] {
            assert!(parse_domain(input).is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn test_parse_domain_rejects_config_injection() {
        for input in [
            "evil.example\nbasicConstraints = critical, CA:true\n#",
            "evil.example\r",
            "a\tb.example",
            "with space.example",
            "{{domain}}",
            "a}}.example",
            "a=b.example",
            "a..example",
            "-lead.example",
            "trail-.example",
            "under_score.example",
        ] {
            assert!(parse_domain(input).is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn test_parse_domain_enforces_length_limits() {
        let label = "a".repeat(64);
        assert!(parse_domain(&format!("{label}.example")).is_err());
        assert!(parse_domain(&format!("{}.example", &label[1..])).is_ok());

        let long = vec!["abcdefghi"; 26].join(".");
        assert!(long.len() > 253);
        assert!(parse_domain(&long).is_err());
    }

    #[test]
    fn test_args_require_exactly_one_domain() {
        assert!(Args::try_parse_from(["chainroot"]).is_err());
        assert!(Args::try_parse_from(["chainroot", "a.example", "b.example"]).is_err());

        let args = Args::try_parse_from(["chainroot", "example.com", "--plan"]).unwrap();
        assert_eq!(args.domain, "example.com");
        assert!(args.plan);
    }
}
