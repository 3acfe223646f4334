//! Textual reference scan.
//!
//! Every named symbol is searched for as a whole word, line by line, in the
//! files its scope covers. The occurrence on the symbol's own definition
//! line is skipped. This is name-based and over-matches across unrelated
//! symbols sharing a name.

use super::{CodeIntelligence, PipelineStage};
use crate::config::{EngineConfig, ReferenceScope};
use crate::ids;
use crate::types::*;
use rayon::prelude::*;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Supplies the full text of an analyzed file.
pub trait SourceReader: Sync {
    fn read(&self, path: &str) -> std::io::Result<String>;
}

/// Reads files relative to a project root.
#[derive(Debug, Clone)]
pub struct DiskSources {
    root: PathBuf,
}

impl DiskSources {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl SourceReader for DiskSources {
    fn read(&self, path: &str) -> std::io::Result<String> {
        let bytes = std::fs::read(self.root.join(path))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// In-memory sources keyed by file path.
#[derive(Debug, Clone, Default)]
pub struct MemorySources {
    files: HashMap<String, String>,
}

impl MemorySources {
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }
}

impl FromIterator<(String, String)> for MemorySources {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

impl SourceReader for MemorySources {
    fn read(&self, path: &str) -> std::io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, format!("no source for {path}"))
        })
    }
}

enum ScanOutcome {
    Found(Vec<Reference>),
    BadPattern(String, String),
}

/// Stage 3.
pub(super) fn analyze(
    intel: &mut CodeIntelligence,
    sources: &dyn SourceReader,
    config: &EngineConfig,
) {
    let stage = PipelineStage::ReferencesAnalyzed;

    let mut texts: BTreeMap<String, Arc<str>> = BTreeMap::new();
    let mut unreadable = Vec::new();
    for path in intel.files.keys() {
        match sources.read(path) {
            Ok(text) => {
                texts.insert(path.clone(), Arc::from(text));
            }
            Err(e) => unreadable.push((path.clone(), e.to_string())),
        }
    }
    for (path, message) in unreadable {
        intel.diagnose(stage, &path, format!("source unavailable: {message}"));
    }

    let outcomes: Vec<ScanOutcome> = {
        let symbols: Vec<&Node> = intel
            .symbols
            .values()
            .filter(|s| s.name().is_some_and(|n| !n.is_empty()))
            .collect();
        let texts = &texts;
        symbols
            .par_iter()
            .map(|symbol| scan_symbol(symbol, texts, config.reference_scope))
            .collect()
    };

    for outcome in outcomes {
        match outcome {
            ScanOutcome::Found(references) => {
                for reference in references {
                    intel.add_reference(reference);
                }
            }
            ScanOutcome::BadPattern(id, message) => intel.diagnose(stage, &id, message),
        }
    }
    tracing::debug!("{} stage: {} references", stage, intel.reference_count());
}

fn scan_symbol(
    symbol: &Node,
    texts: &BTreeMap<String, Arc<str>>,
    scope: ReferenceScope,
) -> ScanOutcome {
    let name = symbol.name().unwrap_or_default();
    let pattern = match Regex::new(&format!(r"\b{}\b", regex::escape(name))) {
        Ok(pattern) => pattern,
        Err(e) => return ScanOutcome::BadPattern(symbol.id.clone(), e.to_string()),
    };

    let mut references = Vec::new();
    match scope {
        ReferenceScope::DefiningFile => {
            let path = &symbol.location.file_path;
            if let Some(text) = texts.get(path) {
                scan_text(symbol, &pattern, path, text, &mut references);
            }
        }
        ReferenceScope::Project => {
            for (path, text) in texts {
                scan_text(symbol, &pattern, path, text, &mut references);
            }
        }
    }
    ScanOutcome::Found(references)
}

/// Whole-word occurrences of the symbol's name in one file.
pub fn scan_text(symbol: &Node, pattern: &Regex, path: &str, text: &str, out: &mut Vec<Reference>) {
    let is_defining_file = symbol.location.file_path == path;
    for (index, line) in text.lines().enumerate() {
        let line_no = index as u32 + 1;
        if is_defining_file && line_no == symbol.location.start_line {
            continue;
        }
        for m in pattern.find_iter(line) {
            let start = m.start() as u32;
            let end = m.end() as u32;
            out.push(Reference {
                id: ids::reference_id(&symbol.id, path, line_no, start),
                symbol_id: symbol.id.clone(),
                location: SourceLocation::line(path, line_no, start, end),
                kind: ReferenceKind::Reference,
                is_definition: false,
                context: line.trim().to_string(),
            });
        }
    }
}
