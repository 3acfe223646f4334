//! File discovery.
//!
//! Walks a project root, pruning excluded directory names, and keeps files
//! whose extension maps to a known language.

use crate::config::AnalyzerConfig;
use crate::error::AnalysisError;
use crate::language::detect_language;
use crate::types::Language;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// A file selected for analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub language: Language,
}

/// Discovers analyzable files under a root.
pub struct FileDiscovery {
    /// Directory names pruned anywhere in the tree
    excluded_dirs: HashSet<String>,
    /// Root-relative glob excludes
    exclude_patterns: Vec<String>,
    include_hidden: bool,
    respect_gitignore: bool,
    max_file_size: u64,
}

impl Default for FileDiscovery {
    fn default() -> Self {
        Self::from_config(&AnalyzerConfig::default())
    }
}

impl FileDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self {
            excluded_dirs: config.excluded_dirs.iter().cloned().collect(),
            exclude_patterns: config.exclude_patterns.clone(),
            include_hidden: config.include_hidden,
            respect_gitignore: config.respect_gitignore,
            max_file_size: config.max_file_size,
        }
    }

    /// Add an exclude pattern.
    pub fn with_exclude(mut self, pattern: &str) -> Self {
        self.exclude_patterns.push(pattern.to_string());
        self
    }

    /// Override max file size.
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// Discover all analyzable files under `root`, sorted by path.
    pub fn discover(&self, root: &Path) -> Result<Vec<DiscoveredFile>, AnalysisError> {
        if !root.is_dir() {
            return Err(AnalysisError::InvalidRoot(root.to_path_buf()));
        }
        let excludes = build_globset(&self.exclude_patterns).map_err(|e| {
            AnalysisError::Discovery {
                root: root.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        let excluded_dirs = self.excluded_dirs.clone();
        let walker = WalkBuilder::new(root)
            .hidden(!self.include_hidden)
            .git_ignore(self.respect_gitignore)
            .git_global(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .ignore(self.respect_gitignore)
            .parents(self.respect_gitignore)
            .require_git(false)
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                !(is_dir
                    && entry.depth() > 0
                    && entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| excluded_dirs.contains(name)))
            })
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.path();
            let rel = path.strip_prefix(root).unwrap_or(path);
            if excludes.is_match(rel) {
                continue;
            }
            let language = detect_language(path);
            if !language.is_known() {
                continue;
            }
            if !self.within_size_limit(path) {
                tracing::debug!(
                    "Skipping {} (larger than {} bytes)",
                    path.display(),
                    self.max_file_size
                );
                continue;
            }
            files.push(DiscoveredFile {
                path: path.to_path_buf(),
                language,
            });
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    fn within_size_limit(&self, path: &Path) -> bool {
        let Ok(metadata) = fs::metadata(path) else {
            return false;
        };
        metadata.len() <= self.max_file_size
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn rel_paths(root: &Path, files: &[DiscoveredFile]) -> Vec<String> {
        files
            .iter()
            .map(|f| {
                f.path
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_skips_excluded_dirs_and_unknown_files() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "src/app.py", "x = 1\n");
        write(root, "src/util.ts", "export const a = 1;\n");
        write(root, "node_modules/lib/index.js", "module.exports = 1;\n");
        write(root, "pkg/__pycache__/app.py", "");
        write(root, "README.md", "# readme\n");
        write(root, "Main.java", "class Main {}\n");

        let files = FileDiscovery::new().discover(root).unwrap();
        assert_eq!(
            rel_paths(root, &files),
            vec!["Main.java", "src/app.py", "src/util.ts"]
        );
        assert_eq!(files[0].language, Language::Java);
    }

    #[test]
    fn test_glob_excludes_and_size_limit() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "a.py", "x = 1\n");
        write(root, "gen/b.py", "y = 2\n");
        write(root, "big.py", &"z = 3\n".repeat(100));

        let files = FileDiscovery::new()
            .with_exclude("gen/**")
            .with_max_file_size(64)
            .discover(root)
            .unwrap();
        assert_eq!(rel_paths(root, &files), vec!["a.py"]);
    }

    #[test]
    fn test_gitignore_is_opt_in() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, ".gitignore", "ignored.py\n");
        write(root, "ignored.py", "x = 1\n");
        write(root, "kept.py", "x = 1\n");

        let all = FileDiscovery::new().discover(root).unwrap();
        assert_eq!(rel_paths(root, &all), vec!["ignored.py", "kept.py"]);

        let config = AnalyzerConfig::default().respect_gitignore(true);
        let filtered = FileDiscovery::from_config(&config).discover(root).unwrap();
        assert_eq!(rel_paths(root, &filtered), vec!["kept.py"]);
    }

    #[test]
    fn test_invalid_root() {
        let err = FileDiscovery::new()
            .discover(Path::new("/definitely/not/here"))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidRoot(_)));
    }
}
