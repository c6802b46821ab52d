use std::path::{Path, PathBuf};

use tracing::info;

use crate::authority::{build_intermediate, build_root};
use crate::bundle;
use crate::error::ProvisionError;
use crate::fs_util;
use crate::keys;
use crate::layout::{Artifact, Layout};
use crate::server::build_server;
use crate::toolkit::SigningToolkit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Present,
}

impl Outcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Created => "created",
            Outcome::Present => "present",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub artifact: Artifact,
    pub path: PathBuf,
    pub outcome: Outcome,
}

/// What a run did to each artifact it reached, in the order it reached them.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    entries: Vec<ReportEntry>,
}

impl RunReport {
    pub fn record(&mut self, artifact: Artifact, path: &Path, outcome: Outcome) {
        self.entries.push(ReportEntry {
            artifact,
            path: path.to_path_buf(),
            outcome,
        });
    }

    #[must_use]
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn created(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.outcome == Outcome::Created)
    }

    #[must_use]
    pub fn outcome(&self, artifact: Artifact) -> Option<Outcome> {
        self.entries
            .iter()
            .find(|entry| entry.artifact == artifact)
            .map(|entry| entry.outcome)
    }
}

/// Sequences every stage: directories, keys, root authority, intermediate
/// authority, server certificate, bundle.
///
/// Each stage runs on every invocation and skips whatever already exists, so
/// a rerun resumes where a failed run stopped. The first failure aborts the
/// run; completed stages are not rolled back.
pub struct Pipeline<'a> {
    layout: &'a Layout,
    toolkit: &'a dyn SigningToolkit,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub fn new(layout: &'a Layout, toolkit: &'a dyn SigningToolkit) -> Self {
        Self { layout, toolkit }
    }

    /// Runs all stages.
    ///
    /// # Errors
    /// Returns the first stage failure.
    pub fn run(&self) -> Result<RunReport, ProvisionError> {
        let mut report = RunReport::default();
        info!(
            "Provisioning {} under {}",
            self.layout.domain,
            self.layout.output_root.display()
        );
        for dir in self.layout.directories() {
            fs_util::ensure_dir(dir)?;
        }
        keys::ensure_all(self.toolkit, self.layout, &mut report)?;
        build_root(self.toolkit, self.layout, &mut report)?;
        build_intermediate(self.toolkit, self.layout, &mut report)?;
        build_server(self.toolkit, self.layout, &mut report)?;
        bundle::assemble(self.layout, &mut report)?;
        info!(
            "Provisioned {} ({} artifacts created)",
            self.layout.domain,
            report.created().count()
        );
        Ok(report)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedArtifact {
    pub artifact: Artifact,
    pub path: PathBuf,
    pub exists: bool,
}

/// Observes which artifacts a run would create, without writing anything.
#[must_use]
pub fn plan(layout: &Layout) -> Vec<PlannedArtifact> {
    layout
        .artifacts()
        .into_iter()
        .map(|(artifact, path)| PlannedArtifact {
            artifact,
            path: path.to_path_buf(),
            exists: fs_util::exists(path),
        })
        .collect()
}
