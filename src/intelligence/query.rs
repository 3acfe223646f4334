//! Read-only queries over a `Ready` snapshot.

use super::{CodeIntelligence, FILE_ID_PREFIX};
use crate::error::QueryError;
use crate::types::*;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// Symbols affected by a change to `symbol_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactReport {
    pub symbol_id: String,
    pub max_depth: usize,
    pub impacted_symbols: Vec<String>,
    pub impacted_files: Vec<String>,
}

impl ImpactReport {
    pub fn total_impacted(&self) -> usize {
        self.impacted_symbols.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallEdge {
    pub source: String,
    pub target: String,
}

/// Depth-bounded slice of the call graph rooted at one symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallGraphView {
    pub root: String,
    pub max_depth: usize,
    /// Visited nodes in discovery order, each with its `depth` set.
    pub nodes: Vec<CallGraphNode>,
    pub edges: Vec<CallEdge>,
}

/// Filters for [`CodeIntelligence::search_symbols`].
#[derive(Debug, Clone, Default)]
pub struct SymbolQuery {
    /// Case-insensitive regex over symbol names; matched literally when it
    /// does not compile.
    pub pattern: String,
    pub kind: Option<NodeKind>,
    pub language: Option<Language>,
    pub limit: Option<usize>,
}

impl SymbolQuery {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Default::default()
        }
    }

    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matcher(&self) -> Option<Regex> {
        let build = |pattern: &str| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
        };
        build(&self.pattern)
            .or_else(|e| {
                tracing::debug!("Matching {:?} literally: {}", self.pattern, e);
                build(&regex::escape(&self.pattern))
            })
            .ok()
    }
}

impl CodeIntelligence {
    pub fn get_symbol(&self, id: &str) -> Result<&Node, QueryError> {
        self.require_ready()?;
        self.symbols
            .get(id)
            .ok_or_else(|| QueryError::SymbolNotFound(id.to_string()))
    }

    /// Symbols whose name matches `query`, ordered by name, file and line.
    pub fn search_symbols(&self, query: &SymbolQuery) -> Result<Vec<&Node>, QueryError> {
        self.require_ready()?;
        let matcher = query.matcher();
        let mut found: Vec<&Node> = self
            .symbols
            .values()
            .filter(|s| query.kind.is_none_or(|k| s.kind == k))
            .filter(|s| query.language.is_none_or(|l| s.language == l))
            .filter(|s| {
                s.name()
                    .zip(matcher.as_ref())
                    .is_some_and(|(n, m)| m.is_match(n))
            })
            .collect();
        found.sort_by(|a, b| {
            (a.name(), &a.location.file_path, a.location.start_line, &a.id).cmp(&(
                b.name(),
                &b.location.file_path,
                b.location.start_line,
                &b.id,
            ))
        });
        if let Some(limit) = query.limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    /// Relationships with `id` at either end, in insertion order. An empty
    /// `kinds` slice means every kind.
    pub fn get_symbol_relationships(
        &self,
        id: &str,
        kinds: &[RelationKind],
    ) -> Result<Vec<&Relationship>, QueryError> {
        self.require_ready()?;
        if !self.symbols.contains_key(id) && !self.outgoing.contains_key(id) {
            return Err(QueryError::SymbolNotFound(id.to_string()));
        }
        let indices: BTreeSet<usize> = self
            .incoming
            .get(id)
            .into_iter()
            .chain(self.outgoing.get(id))
            .flatten()
            .copied()
            .collect();
        Ok(indices
            .into_iter()
            .map(|i| &self.relationships[i])
            .filter(|r| kinds.is_empty() || kinds.contains(&r.kind))
            .collect())
    }

    pub fn get_symbol_references(&self, id: &str) -> Result<&[Reference], QueryError> {
        self.require_ready()?;
        if !self.symbols.contains_key(id) {
            return Err(QueryError::SymbolNotFound(id.to_string()));
        }
        Ok(self.references.get(id).map(Vec::as_slice).unwrap_or(&[]))
    }

    /// Breadth-first walk backward over dependency edges and textual
    /// references. Symbols at `max_depth` are reported but not expanded.
    /// Files that import an impacted symbol land in `impacted_files` only.
    pub fn impact_analysis(&self, id: &str, max_depth: usize) -> Result<ImpactReport, QueryError> {
        self.require_ready()?;
        if !self.symbols.contains_key(id) {
            return Err(QueryError::SymbolNotFound(id.to_string()));
        }

        let mut by_file: HashMap<&str, Vec<&Node>> = HashMap::new();
        for symbol in self.symbols.values() {
            by_file
                .entry(symbol.location.file_path.as_str())
                .or_default()
                .push(symbol);
        }

        let mut visited: HashSet<&str> = HashSet::from([id]);
        let mut impacted: BTreeSet<&str> = BTreeSet::new();
        let mut queue: VecDeque<(&str, usize)> = VecDeque::from([(id, 0)]);

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let referrers = self
                .references
                .get(current)
                .into_iter()
                .flatten()
                .flat_map(|r| {
                    by_file
                        .get(r.location.file_path.as_str())
                        .into_iter()
                        .flatten()
                        .filter(move |s| {
                            s.location
                                .contains_line(&r.location.file_path, r.location.start_line)
                        })
                        .map(|s| s.id.as_str())
                });
            let next: Vec<&str> = self.dependents(current).into_iter().chain(referrers).collect();
            for found in next {
                if visited.insert(found) {
                    impacted.insert(found);
                    queue.push_back((found, depth + 1));
                }
            }
        }

        // `file:` pseudo-ids reach the walk through import edges; they name
        // a file, not a symbol
        let (importers, impacted): (Vec<&str>, Vec<&str>) = impacted
            .into_iter()
            .partition(|s| s.starts_with(FILE_ID_PREFIX));
        let impacted_files: BTreeSet<&str> = impacted
            .iter()
            .filter_map(|s| self.symbols.get(*s))
            .map(|s| s.location.file_path.as_str())
            .chain(importers.iter().map(|s| &s[FILE_ID_PREFIX.len()..]))
            .collect();

        Ok(ImpactReport {
            symbol_id: id.to_string(),
            max_depth,
            impacted_symbols: impacted.into_iter().map(String::from).collect(),
            impacted_files: impacted_files.into_iter().map(String::from).collect(),
        })
    }

    /// Depth-first walk over `calls` edges. Each node is expanded once, so
    /// recursion in the call graph terminates.
    pub fn call_graph(&self, id: &str, depth: usize) -> Result<CallGraphView, QueryError> {
        self.require_ready()?;
        if !self.call_graph.contains_key(id) {
            return Err(QueryError::SymbolNotFound(id.to_string()));
        }

        let mut visited: HashSet<&str> = HashSet::new();
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        let mut stack: Vec<(&str, usize)> = vec![(id, 0)];

        while let Some((current, level)) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            let Some(node) = self.call_graph.get(current) else {
                continue;
            };
            let mut visited_node = node.clone();
            visited_node.depth = Some(level);
            nodes.push(visited_node);

            if level >= depth {
                continue;
            }
            for callee in &node.calls {
                edges.push(CallEdge {
                    source: current.to_string(),
                    target: callee.clone(),
                });
            }
            for callee in node.calls.iter().rev() {
                if !visited.contains(callee.as_str()) {
                    stack.push((callee.as_str(), level + 1));
                }
            }
        }

        Ok(CallGraphView {
            root: id.to_string(),
            max_depth: depth,
            nodes,
            edges,
        })
    }
}
