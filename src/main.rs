use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chainroot::config::Settings;
use chainroot::{Args, Layout, OpenSslToolkit, Pipeline};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

use crate::cli::output::{print_plan, print_run_summary};

fn main() {
    if let Err(err) = run() {
        eprintln!("chainroot error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let mut settings =
        Settings::new(args.config.clone()).context("Failed to load configuration")?;
    settings.merge_with_args(&args);
    settings.validate()?;

    let output_root = absolute(&settings.output_dir)?;
    let templates_dir = absolute(&settings.templates_dir)?;
    let layout = Layout::resolve(&output_root, &templates_dir, &args.domain);

    if args.plan {
        print_plan(&layout, &chainroot::plan(&layout));
        return Ok(());
    }

    let toolkit = OpenSslToolkit::new(&settings.openssl);
    let report = Pipeline::new(&layout, &toolkit)
        .run()
        .with_context(|| format!("Failed to provision {}", args.domain))?;
    print_run_summary(&layout, &report);
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("Failed to resolve {}", path.display()))
}
