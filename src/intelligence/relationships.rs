//! Relationship inference: inheritance, containment, imports, and calls.
//!
//! All resolution is by name. A name resolves to a same-file candidate when
//! one exists, otherwise to the first candidate in `(file, line, column)`
//! order. Names that resolve to nothing emit nothing.

use super::{CodeIntelligence, PipelineStage, file_symbol_id};
use crate::types::*;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};

pub const SAME_FILE_CALL_CONFIDENCE: f64 = 0.8;
pub const CROSS_FILE_CALL_CONFIDENCE: f64 = 0.5;
pub const IMPORT_CONFIDENCE: f64 = 0.6;

/// Name lookup over every named symbol, in position order.
pub(crate) struct SymbolIndex<'a> {
    by_name: HashMap<&'a str, Vec<&'a Node>>,
}

impl<'a> SymbolIndex<'a> {
    pub fn new(symbols: impl Iterator<Item = &'a Node>) -> Self {
        let mut by_name: HashMap<&'a str, Vec<&'a Node>> = HashMap::new();
        for node in symbols {
            if let Some(name) = node.name() {
                by_name.entry(name).or_default().push(node);
            }
        }
        for candidates in by_name.values_mut() {
            candidates.sort_by(|a, b| {
                let (la, lb) = (&a.location, &b.location);
                (&la.file_path, la.start_line, la.start_column, &a.id)
                    .cmp(&(&lb.file_path, lb.start_line, lb.start_column, &b.id))
            });
        }
        Self { by_name }
    }

    pub fn named(&self, name: &str) -> &[&'a Node] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Resolve `name` from `file`, returning the target and whether it
    /// lives in the same file.
    pub fn resolve(
        &self,
        name: &str,
        file: &str,
        accept: impl Fn(&Node) -> bool,
    ) -> Option<(&'a Node, bool)> {
        let mut first = None;
        for candidate in self.named(name).iter().copied().filter(|n| accept(n)) {
            if candidate.location.file_path == file {
                return Some((candidate, true));
            }
            first.get_or_insert(candidate);
        }
        first.map(|n| (n, false))
    }
}

/// Final component of an import path: `a.b.C`, `a::b::C`, `./x/C` -> `C`.
pub fn import_tail(import: &str) -> &str {
    import
        .rsplit(['.', ':', '/'])
        .find(|s| !s.is_empty())
        .unwrap_or(import)
}

/// First component of an import path: `pkg.mod` -> `pkg`, `./utils` -> `utils`.
pub fn import_head(import: &str) -> &str {
    import
        .split(['.', ':', '/'])
        .find(|s| !s.is_empty())
        .unwrap_or(import)
}

/// Stage 2.
pub(super) fn analyze(intel: &mut CodeIntelligence) {
    let buffers: Vec<Vec<Relationship>> = {
        let index = SymbolIndex::new(intel.symbols.values());
        let symbols = &intel.symbols;
        intel
            .files
            .values()
            .collect::<Vec<_>>()
            .par_iter()
            .map(|file| file_relationships(file, symbols, &index))
            .collect()
    };

    let before = intel.relationships.len();
    for relationship in buffers.into_iter().flatten() {
        intel.add_relationship(relationship);
    }
    intel.file_dependencies = file_dependencies(&intel.files);

    tracing::debug!(
        "{} stage: {} relationships",
        PipelineStage::RelationshipsAnalyzed,
        intel.relationships.len() - before
    );
}

fn file_relationships(
    file: &File,
    symbols: &BTreeMap<String, Node>,
    index: &SymbolIndex<'_>,
) -> Vec<Relationship> {
    let mut out = Vec::new();
    for node in &file.nodes {
        if node.kind.is_class_like() {
            inheritance(node, &file.path, index, &mut out);
        }
        if let Some(parent) = node.parent_id.as_ref().and_then(|p| symbols.get(p)) {
            out.push(
                Relationship::new(&parent.id, &node.id, RelationKind::Contains)
                    .with_location(node.location.clone()),
            );
            out.push(
                Relationship::new(&node.id, &parent.id, RelationKind::ContainedIn)
                    .with_location(node.location.clone()),
            );
        }
    }
    imports(file, index, &mut out);
    for node in file.callables() {
        calls(node, &file.path, index, &mut out);
    }
    out
}

fn inheritance(node: &Node, file: &str, index: &SymbolIndex<'_>, out: &mut Vec<Relationship>) {
    let is_type = |n: &Node| n.kind.is_class_like() && n.id != node.id;
    let supertypes = node
        .extends
        .iter()
        .map(|name| (name, RelationKind::Extends))
        .chain(node.implements.iter().map(|name| (name, RelationKind::Implements)));
    for (name, kind) in supertypes {
        if let Some((target, _)) = index.resolve(name, file, is_type) {
            out.push(
                Relationship::new(&node.id, &target.id, kind)
                    .with_location(node.location.clone()),
            );
        }
    }
}

fn imports(file: &File, index: &SymbolIndex<'_>, out: &mut Vec<Relationship>) {
    let source = file_symbol_id(&file.path);
    let location = SourceLocation::line(file.path.as_str(), 1, 0, 0);
    for import in &file.imports {
        let tail = import_tail(import);
        let mut seen = HashSet::new();
        let candidates = index.named(import).iter().chain(index.named(tail));
        for target in candidates {
            if matches!(target.kind, NodeKind::Import | NodeKind::Export)
                || target.location.file_path == file.path
                || !seen.insert(target.id.as_str())
            {
                continue;
            }
            out.push(
                Relationship::new(&source, &target.id, RelationKind::Imports)
                    .with_location(location.clone())
                    .with_confidence(IMPORT_CONFIDENCE)
                    .with_context(import.as_str()),
            );
        }
    }
}

fn calls(node: &Node, file: &str, index: &SymbolIndex<'_>, out: &mut Vec<Relationship>) {
    for name in &node.call_names {
        let Some((target, same_file)) = index.resolve(name, file, |n| n.kind.is_callable()) else {
            continue;
        };
        let confidence = if same_file {
            SAME_FILE_CALL_CONFIDENCE
        } else {
            CROSS_FILE_CALL_CONFIDENCE
        };
        out.push(
            Relationship::new(&node.id, &target.id, RelationKind::Calls)
                .with_location(node.location.clone())
                .with_confidence(confidence)
                .with_context(name.as_str()),
        );
    }
}

/// Each file mapped to the analyzed files whose stem matches the first
/// component of one of its imports.
pub fn file_dependencies(files: &BTreeMap<String, File>) -> BTreeMap<String, Vec<String>> {
    let mut by_stem: HashMap<&str, Vec<&str>> = HashMap::new();
    for file in files.values() {
        by_stem.entry(file.stem()).or_default().push(file.path.as_str());
    }

    let mut deps = BTreeMap::new();
    for file in files.values() {
        let mut targets: Vec<String> = file
            .imports
            .iter()
            .flat_map(|import| by_stem.get(import_head(import)).into_iter().flatten())
            .filter(|path| **path != file.path)
            .map(|path| path.to_string())
            .collect();
        targets.sort();
        targets.dedup();
        if !targets.is_empty() {
            deps.insert(file.path.clone(), targets);
        }
    }
    deps
}
