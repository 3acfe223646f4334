//! Error types for the analysis pipeline.
//!
//! Per-file and per-symbol failures are values, never panics: the analyzer
//! collects [`AdapterError`]s next to its partial results, and the query
//! surface returns [`QueryError`] for unknown symbols or unfinished runs.

use crate::types::Language;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Failure while turning one file into the canonical model.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("no adapter registered for {language} ({path})")]
    UnsupportedLanguage { path: PathBuf, language: Language },

    #[error("failed to parse {path}: {reason}")]
    ParseFailure { path: PathBuf, reason: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("grammar for {language} could not be loaded: {reason}")]
    Grammar { language: Language, reason: String },
}

impl AdapterError {
    /// Short machine-readable tag for the failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::UnsupportedLanguage { .. } => FailureKind::UnsupportedLanguage,
            Self::ParseFailure { .. } | Self::Grammar { .. } => FailureKind::ParseFailure,
            Self::Io { .. } => FailureKind::IoFailure,
        }
    }
}

/// Run-aborting errors of a directory analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("project root {0} does not exist or is not a directory")]
    InvalidRoot(PathBuf),

    #[error("file discovery failed under {root}: {reason}")]
    Discovery { root: PathBuf, reason: String },
}

/// Errors returned by the read-only query surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("analysis incomplete: project is at stage {stage}")]
    AnalysisIncomplete { stage: String },

    #[error("project has not been analyzed: {0}")]
    ProjectNotAnalyzed(String),
}

/// Category of a non-fatal failure recorded during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnsupportedLanguage,
    ParseFailure,
    IoFailure,
    WorkerPanic,
}

/// A file that could not be analyzed during a directory scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: String,
    pub kind: FailureKind,
    pub message: String,
}

impl FileFailure {
    pub fn from_error(path: impl Into<String>, err: &AdapterError) -> Self {
        Self {
            path: path.into(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
