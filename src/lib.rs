pub mod args;
pub mod authority;
pub mod bundle;
pub mod config;
pub mod error;
pub mod fs_util;
pub mod keys;
pub mod layout;
pub mod ledger;
pub mod pipeline;
pub mod server;
pub mod template;
pub mod toolkit;

pub use args::Args;
pub use error::ProvisionError;
pub use layout::{Artifact, Layout, Role};
pub use pipeline::{Outcome, Pipeline, RunReport, plan};
pub use toolkit::{OpenSslToolkit, Signer, SigningToolkit, ToolkitError};
