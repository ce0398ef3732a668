//! engine::request
//!
//! The input of one workflow run.

use std::path::PathBuf;

use crate::auth::CredentialOverride;
use crate::core::config::RepositoryConfig;

/// One already-exported file to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFile {
    /// Where the exporter wrote it.
    pub source: PathBuf,
    /// Repo-relative destination. `None` means
    /// `<exportSubfolder>/<source file name>`.
    pub destination: Option<PathBuf>,
}

impl ArtifactFile {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: None,
        }
    }

    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }
}

/// Resolved input for [`WorkflowEngine::run`](super::WorkflowEngine::run).
///
/// Built fresh per invocation and not modified by the engine.
#[derive(Debug, Clone)]
pub struct PushRequest {
    pub repository: RepositoryConfig,
    pub files: Vec<ArtifactFile>,
    /// Substituted for `{filename}` in templates.
    pub design_name: String,
    /// Raw commit message. Empty means "render the commit template".
    pub message: String,
    pub branch_override: Option<String>,
    pub force_push: bool,
    pub skip_pull: bool,
    /// Check the original branch out again after a successful run.
    pub return_to_original_branch: bool,
    pub credential: CredentialOverride,
    /// Warnings raised upstream (e.g. by the exporter); carried into the
    /// result without failing the run.
    pub upstream_warnings: Vec<String>,
}

impl PushRequest {
    pub fn new(repository: RepositoryConfig, design_name: impl Into<String>) -> Self {
        let skip_pull = repository.skip_pull_default;
        Self {
            repository,
            files: Vec::new(),
            design_name: design_name.into(),
            message: String::new(),
            branch_override: None,
            force_push: false,
            skip_pull,
            return_to_original_branch: false,
            credential: CredentialOverride::default(),
            upstream_warnings: Vec::new(),
        }
    }

    /// Add files that go to the export subfolder under their own names.
    pub fn with_files<I, P>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.files
            .extend(sources.into_iter().map(ArtifactFile::new));
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_branch_override(mut self, branch: impl Into<String>) -> Self {
        self.branch_override = Some(branch.into());
        self
    }
}
