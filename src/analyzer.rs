//! Universal Analyzer: language detection, adapter dispatch, and per-file /
//! per-directory orchestration.
//!
//! Directory scans fan out over a bounded pool of blocking tasks. Each file
//! is independent; a failing file becomes a [`FileFailure`] and never aborts
//! the scan.

use crate::config::AnalyzerConfig;
use crate::discovery::{DiscoveredFile, FileDiscovery};
use crate::error::{AdapterError, AnalysisError, FailureKind, FileFailure};
use crate::ids;
use crate::language;
use crate::registry::AdapterRegistry;
use crate::types::{File, Language};
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result of a directory scan: analyzed files keyed by root-relative path,
/// plus the files that could not be analyzed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DirectoryAnalysis {
    pub root: PathBuf,
    pub files: BTreeMap<String, File>,
    pub failures: Vec<FileFailure>,
}

impl DirectoryAnalysis {
    pub fn node_count(&self) -> usize {
        self.files.values().map(|f| f.nodes.len()).sum()
    }

    pub fn failed(&self, kind: FailureKind) -> impl Iterator<Item = &FileFailure> {
        self.failures.iter().filter(move |f| f.kind == kind)
    }
}

/// Entry point for turning files into canonical [`File`] records.
#[derive(Clone)]
pub struct UniversalAnalyzer {
    registry: Arc<AdapterRegistry>,
    config: Arc<AnalyzerConfig>,
}

impl Default for UniversalAnalyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

impl UniversalAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        let registry = AdapterRegistry::new(&config);
        Self {
            registry: Arc::new(registry),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn detect_language(&self, path: &Path) -> Language {
        language::detect_language(path)
    }

    /// Read and analyze one file from disk.
    pub fn analyze_file(&self, path: &Path) -> Result<File, AdapterError> {
        let bytes = std::fs::read(path).map_err(|source| AdapterError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.analyze_source(path, &bytes, None)
    }

    /// Analyze in-memory content.
    ///
    /// `declared` wins over detection when it is a known language. Content
    /// that is not valid UTF-8 is decoded lossily and tagged `utf-8-lossy`.
    pub fn analyze_source(
        &self,
        path: &Path,
        bytes: &[u8],
        declared: Option<Language>,
    ) -> Result<File, AdapterError> {
        let (content, encoding) = match std::str::from_utf8(bytes) {
            Ok(text) => (Cow::Borrowed(text), "utf-8"),
            Err(_) => (String::from_utf8_lossy(bytes), "utf-8-lossy"),
        };
        let language = declared
            .filter(Language::is_known)
            .unwrap_or_else(|| language::detect(path, &content));

        let adapter = self.registry.adapter_for(language).ok_or_else(|| {
            AdapterError::UnsupportedLanguage {
                path: path.to_path_buf(),
                language,
            }
        })?;

        let mut file = adapter.parse_file(path, &content, language)?;
        file.encoding = encoding.to_string();
        file.size_bytes = bytes.len() as u64;
        file.hash = ids::file_hash(bytes);
        Ok(file)
    }

    fn analyze_discovered(&self, entry: &DiscoveredFile, key: &str) -> Result<File, AdapterError> {
        let bytes = std::fs::read(&entry.path).map_err(|source| AdapterError::Io {
            path: entry.path.clone(),
            source,
        })?;
        self.analyze_source(Path::new(key), &bytes, Some(entry.language))
    }

    /// Analyze every discoverable file under `root` concurrently.
    ///
    /// Only an invalid root or a broken exclude pattern is an error; every
    /// per-file problem lands in [`DirectoryAnalysis::failures`].
    pub async fn analyze_directory(&self, root: &Path) -> Result<DirectoryAnalysis, AnalysisError> {
        tracing::info!("Starting analysis of {}", root.display());

        let discovery = FileDiscovery::from_config(&self.config);
        let discovered = discovery.discover(root)?;
        tracing::info!("Discovered {} files", discovered.len());

        let files: DashMap<String, File> = DashMap::new();
        let failures: DashMap<String, FileFailure> = DashMap::new();
        let workers = self.config.workers.max(1);

        stream::iter(discovered)
            .map(|entry| {
                let analyzer = self.clone();
                let key = relative_key(root, &entry.path);
                let files = &files;
                let failures = &failures;
                async move {
                    let task_key = key.clone();
                    let outcome = tokio::task::spawn_blocking(move || {
                        analyzer.analyze_discovered(&entry, &task_key)
                    })
                    .await;
                    match outcome {
                        Ok(Ok(file)) => {
                            files.insert(key, file);
                        }
                        Ok(Err(e)) => {
                            if matches!(e, AdapterError::UnsupportedLanguage { .. }) {
                                tracing::debug!("Skipping {}: {}", key, e);
                            } else {
                                tracing::warn!("Failed to analyze {}: {}", key, e);
                            }
                            failures.insert(key.clone(), FileFailure::from_error(key, &e));
                        }
                        Err(e) => {
                            tracing::warn!("Worker for {} did not finish: {}", key, e);
                            failures.insert(
                                key.clone(),
                                FileFailure {
                                    path: key,
                                    kind: FailureKind::WorkerPanic,
                                    message: e.to_string(),
                                },
                            );
                        }
                    }
                }
            })
            .buffer_unordered(workers)
            .collect::<Vec<()>>()
            .await;

        let files: BTreeMap<String, File> = files.into_iter().collect();
        let failures: BTreeMap<String, FileFailure> = failures.into_iter().collect();
        let analysis = DirectoryAnalysis {
            root: root.to_path_buf(),
            files,
            failures: failures.into_values().collect(),
        };

        tracing::info!(
            "Analysis complete: {} files, {} nodes, {} failures",
            analysis.files.len(),
            analysis.node_count(),
            analysis.failures.len()
        );
        Ok(analysis)
    }
}

/// Root-relative path with `/` separators.
fn relative_key(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    ids::normalize_path_for_id(rel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeKind;
    use tempfile::TempDir;

    #[test]
    fn test_analyze_source_declared_language() {
        let analyzer = UniversalAnalyzer::default();
        let file = analyzer
            .analyze_source(Path::new("script"), b"def f():\n    pass\n", Some(Language::Python))
            .unwrap();
        assert_eq!(file.language, Language::Python);
        assert!(file.nodes.iter().any(|n| n.name() == Some("f")));
    }

    #[test]
    fn test_analyze_source_detects_shebang() {
        let analyzer = UniversalAnalyzer::default();
        let file = analyzer
            .analyze_source(Path::new("tool"), b"#!/usr/bin/env python3\nx = 1\n", None)
            .unwrap();
        assert_eq!(file.language, Language::Python);
    }

    #[test]
    fn test_lossy_decoding() {
        let analyzer = UniversalAnalyzer::default();
        let bytes = b"name = 'caf\xe9'\n";
        let file = analyzer
            .analyze_source(Path::new("a.py"), bytes, None)
            .unwrap();
        assert_eq!(file.encoding, "utf-8-lossy");
        assert_eq!(file.size_bytes, bytes.len() as u64);
        assert_eq!(file.hash, ids::file_hash(bytes));
    }

    #[test]
    fn test_unsupported_language() {
        let analyzer = UniversalAnalyzer::default();
        let err = analyzer
            .analyze_source(Path::new("Main.java"), b"class Main {}", None)
            .unwrap_err();
        assert!(matches!(
            err,
            AdapterError::UnsupportedLanguage {
                language: Language::Java,
                ..
            }
        ));
        let err = analyzer
            .analyze_source(Path::new("notes.txt"), b"hello", None)
            .unwrap_err();
        assert!(matches!(err, AdapterError::UnsupportedLanguage { .. }));
    }

    #[test]
    fn test_analyze_file_missing() {
        let err = UniversalAnalyzer::default()
            .analyze_file(Path::new("/no/such/file.py"))
            .unwrap_err();
        assert!(matches!(err, AdapterError::Io { .. }));
    }

    #[test]
    fn test_direct_adapter_tag() {
        let analyzer = UniversalAnalyzer::new(AnalyzerConfig::default().prefer_direct_adapter());
        let file = analyzer
            .analyze_source(Path::new("a.py"), b"class A:\n    pass\n", None)
            .unwrap();
        assert_eq!(file.adapter.as_deref(), Some("direct"));
        assert_eq!(file.nodes[0].kind, NodeKind::Module);
    }

    #[tokio::test]
    async fn test_directory_keys_are_relative() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("pkg")).unwrap();
        std::fs::write(dir.path().join("pkg/mod.py"), "def f():\n    pass\n").unwrap();
        std::fs::write(dir.path().join("Main.java"), "class Main {}\n").unwrap();

        let analysis = UniversalAnalyzer::default()
            .analyze_directory(dir.path())
            .await
            .unwrap();
        assert_eq!(analysis.files.keys().collect::<Vec<_>>(), vec!["pkg/mod.py"]);
        assert_eq!(analysis.files["pkg/mod.py"].path, "pkg/mod.py");
        assert_eq!(analysis.failures.len(), 1);
        assert_eq!(analysis.failures[0].kind, FailureKind::UnsupportedLanguage);
    }
}
