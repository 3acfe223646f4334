//! Pipeline configuration.
//!
//! Every knob has a default; an [`AppConfig`] can be read from JSON by the
//! binary and overridden by flags.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Directory names skipped during a directory scan.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    ".git",
    "__pycache__",
    "node_modules",
    ".venv",
    "venv",
    "dist",
    "build",
    "target",
];

/// Default cap on the size of a single analyzed file.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 2 * 1024 * 1024;

/// Settings for the [`UniversalAnalyzer`](crate::analyzer::UniversalAnalyzer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Route languages with a grammar profile to the query adapter.
    pub prefer_query_adapter: bool,
    /// When false the query adapter always uses the structural walk.
    pub use_queries: bool,
    pub excluded_dirs: Vec<String>,
    /// Extra glob patterns, matched against root-relative paths.
    pub exclude_patterns: Vec<String>,
    pub max_file_size: u64,
    pub include_hidden: bool,
    pub respect_gitignore: bool,
    /// Concurrent file analyses.
    pub workers: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            prefer_query_adapter: true,
            use_queries: true,
            excluded_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
            exclude_patterns: Vec::new(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            include_hidden: true,
            respect_gitignore: false,
            workers: default_workers(),
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl AnalyzerConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_exclude(mut self, pattern: &str) -> Self {
        self.exclude_patterns.push(pattern.to_string());
        self
    }

    pub fn with_excluded_dir(mut self, name: &str) -> Self {
        self.excluded_dirs.push(name.to_string());
        self
    }

    pub fn prefer_direct_adapter(mut self) -> Self {
        self.prefer_query_adapter = false;
        self
    }

    pub fn without_queries(mut self) -> Self {
        self.use_queries = false;
        self
    }

    pub fn respect_gitignore(mut self, respect: bool) -> Self {
        self.respect_gitignore = respect;
        self
    }
}

/// Which files the reference scan reads for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceScope {
    /// Only the file that defines the symbol.
    #[default]
    DefiningFile,
    /// Every analyzed file.
    Project,
}

/// Settings for the [`IntelligenceEngine`](crate::intelligence::IntelligenceEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_cycles: usize,
    pub max_cycle_length: usize,
    /// DFS steps spent on cycle enumeration before giving up.
    pub cycle_search_budget: usize,
    pub reference_scope: ReferenceScope,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_cycles: 10,
            max_cycle_length: 12,
            cycle_search_budget: 200_000,
            reference_scope: ReferenceScope::DefiningFile,
        }
    }
}

impl EngineConfig {
    pub fn with_reference_scope(mut self, scope: ReferenceScope) -> Self {
        self.reference_scope = scope;
        self
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub analyzer: AnalyzerConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn from_json_file(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
