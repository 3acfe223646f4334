//! Intelligence Engine.
//!
//! Turns a set of canonical [`File`]s into a [`CodeIntelligence`] snapshot by
//! running a fixed sequence of whole-project stages:
//!
//! ```text
//! Empty -> SymbolsExtracted -> RelationshipsAnalyzed -> ReferencesAnalyzed
//!       -> CallGraphBuilt -> MetricsComputed -> Ready
//! ```
//!
//! Each stage finishes over the entire project before the next one starts.
//! Inside a stage, per-file and per-symbol work is sharded with rayon and
//! the per-shard buffers are concatenated in a fixed order, so two runs over
//! the same input produce identical snapshots.
//!
//! Snapshots are immutable once `Ready`; queries live in [`query`].

pub mod graph;
pub mod query;
pub mod references;
pub mod relationships;

use crate::analyzer::DirectoryAnalysis;
use crate::config::EngineConfig;
use crate::error::QueryError;
use crate::types::*;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

pub use query::{CallEdge, CallGraphView, ImpactReport, SymbolQuery};
pub use references::{DiskSources, MemorySources, SourceReader};

/// Prefix of the pseudo-symbol standing for a whole file.
pub const FILE_ID_PREFIX: &str = "file:";

/// Pseudo-symbol id of a file, used as the source of `imports` edges.
pub fn file_symbol_id(path: &str) -> String {
    format!("{FILE_ID_PREFIX}{path}")
}

/// Progress of a snapshot through the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    #[default]
    Empty,
    SymbolsExtracted,
    RelationshipsAnalyzed,
    ReferencesAnalyzed,
    CallGraphBuilt,
    MetricsComputed,
    Ready,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::SymbolsExtracted => "symbols_extracted",
            Self::RelationshipsAnalyzed => "relationships_analyzed",
            Self::ReferencesAnalyzed => "references_analyzed",
            Self::CallGraphBuilt => "call_graph_built",
            Self::MetricsComputed => "metrics_computed",
            Self::Ready => "ready",
        }
    }

    fn next(self) -> Option<Self> {
        Some(match self {
            Self::Empty => Self::SymbolsExtracted,
            Self::SymbolsExtracted => Self::RelationshipsAnalyzed,
            Self::RelationshipsAnalyzed => Self::ReferencesAnalyzed,
            Self::ReferencesAnalyzed => Self::CallGraphBuilt,
            Self::CallGraphBuilt => Self::MetricsComputed,
            Self::MetricsComputed => Self::Ready,
            Self::Ready => return None,
        })
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The analysis snapshot of one project.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CodeIntelligence {
    pub project_id: String,
    pub stage: PipelineStage,
    pub symbols: BTreeMap<String, Node>,
    pub files: BTreeMap<String, File>,
    pub relationships: Vec<Relationship>,
    /// Symbol id to its textual references.
    pub references: BTreeMap<String, Vec<Reference>>,
    pub dependency_graph: DependencyGraph,
    pub call_graph: BTreeMap<String, CallGraphNode>,
    /// File path to the analyzed files it imports.
    pub file_dependencies: BTreeMap<String, Vec<String>>,
    pub metrics: BTreeMap<String, serde_json::Value>,
    pub diagnostics: Vec<Diagnostic>,

    #[serde(skip)]
    relationship_ids: HashSet<String>,
    /// Target id to indices of relationships pointing at it.
    #[serde(skip)]
    incoming: HashMap<String, Vec<usize>>,
    /// Source id to indices of relationships leaving it.
    #[serde(skip)]
    outgoing: HashMap<String, Vec<usize>>,
}

impl CodeIntelligence {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Default::default()
        }
    }

    /// Run every stage over `files`.
    pub fn build(
        project_id: impl Into<String>,
        files: impl IntoIterator<Item = File>,
        sources: &dyn SourceReader,
        config: &EngineConfig,
    ) -> Self {
        let mut intelligence = Self::new(project_id);
        intelligence.extract_symbols(files);
        intelligence.advance_to(PipelineStage::Ready, sources, config);
        intelligence
    }

    /// Stage 1: take ownership of the files and index every node by id.
    pub fn extract_symbols(&mut self, files: impl IntoIterator<Item = File>) {
        if self.stage != PipelineStage::Empty {
            tracing::warn!(
                "Ignoring symbol extraction for {}: already at {}",
                self.project_id,
                self.stage
            );
            return;
        }
        for file in files {
            for node in &file.nodes {
                if self.symbols.contains_key(&node.id) {
                    self.diagnostics.push(Diagnostic {
                        stage: PipelineStage::SymbolsExtracted.to_string(),
                        subject: node.id.clone(),
                        message: format!("duplicate symbol id in {}", file.path),
                    });
                    continue;
                }
                self.symbols.insert(node.id.clone(), node.clone());
            }
            self.files.insert(file.path.clone(), file);
        }
        self.stage = PipelineStage::SymbolsExtracted;
        tracing::debug!(
            "Extracted {} symbols from {} files",
            self.symbols.len(),
            self.files.len()
        );
    }

    /// Run the remaining stages up to and including `target`.
    pub fn advance_to(
        &mut self,
        target: PipelineStage,
        sources: &dyn SourceReader,
        config: &EngineConfig,
    ) {
        while self.stage < target {
            let Some(next) = self.stage.next() else {
                break;
            };
            match next {
                PipelineStage::Empty => {}
                PipelineStage::SymbolsExtracted => self.extract_symbols(Vec::new()),
                PipelineStage::RelationshipsAnalyzed => relationships::analyze(self),
                PipelineStage::ReferencesAnalyzed => references::analyze(self, sources, config),
                PipelineStage::CallGraphBuilt => self.build_call_graph(),
                PipelineStage::MetricsComputed => graph::compute_metrics(self, config),
                PipelineStage::Ready => {}
            }
            self.stage = next;
        }
    }

    /// Stage 4: one call-graph node per callable, wired from `calls` edges.
    fn build_call_graph(&mut self) {
        for symbol in self.symbols.values().filter(|s| s.kind.is_callable()) {
            self.call_graph.insert(
                symbol.id.clone(),
                CallGraphNode {
                    symbol_id: symbol.id.clone(),
                    symbol_name: symbol.name.clone().unwrap_or_else(|| "unknown".to_string()),
                    symbol_kind: symbol.kind,
                    file_path: symbol.location.file_path.clone(),
                    calls: Vec::new(),
                    called_by: Vec::new(),
                    depth: None,
                    complexity: symbol.complexity,
                },
            );
        }
        for rel in self.relationships.iter().filter(|r| r.kind == RelationKind::Calls) {
            if let Some(node) = self.call_graph.get_mut(&rel.source_id) {
                node.calls.push(rel.target_id.clone());
            }
            if let Some(node) = self.call_graph.get_mut(&rel.target_id) {
                node.called_by.push(rel.source_id.clone());
            }
        }
    }

    /// Record a relationship; duplicates (same id) are dropped.
    pub fn add_relationship(&mut self, relationship: Relationship) -> bool {
        if !self.relationship_ids.insert(relationship.id.clone()) {
            return false;
        }
        let index = self.relationships.len();
        self.incoming
            .entry(relationship.target_id.clone())
            .or_default()
            .push(index);
        self.outgoing
            .entry(relationship.source_id.clone())
            .or_default()
            .push(index);
        self.dependency_graph.add_relationship(&relationship);
        self.relationships.push(relationship);
        true
    }

    pub fn add_reference(&mut self, reference: Reference) {
        self.references
            .entry(reference.symbol_id.clone())
            .or_default()
            .push(reference);
    }

    pub fn is_ready(&self) -> bool {
        self.stage == PipelineStage::Ready
    }

    pub(crate) fn require_ready(&self) -> Result<(), QueryError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(QueryError::AnalysisIncomplete {
                stage: self.stage.to_string(),
            })
        }
    }

    /// Relationships whose target is `id`.
    pub fn incoming(&self, id: &str) -> impl Iterator<Item = &Relationship> {
        self.incoming
            .get(id)
            .into_iter()
            .flatten()
            .map(|&i| &self.relationships[i])
    }

    /// Relationships whose source is `id`.
    pub fn outgoing(&self, id: &str) -> impl Iterator<Item = &Relationship> {
        self.outgoing
            .get(id)
            .into_iter()
            .flatten()
            .map(|&i| &self.relationships[i])
    }

    /// Symbols with a dependency edge (calls, uses, imports, extends,
    /// implements) pointing at `id`.
    pub fn dependents(&self, id: &str) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.incoming(id)
            .filter(|r| r.kind.is_dependency())
            .map(|r| r.source_id.as_str())
            .filter(|s| seen.insert(*s))
            .collect()
    }

    /// Symbols `id` depends on.
    pub fn dependencies(&self, id: &str) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.outgoing(id)
            .filter(|r| r.kind.is_dependency())
            .map(|r| r.target_id.as_str())
            .filter(|s| seen.insert(*s))
            .collect()
    }

    pub fn reference_count(&self) -> usize {
        self.references.values().map(Vec::len).sum()
    }

    pub(crate) fn diagnose(&mut self, stage: PipelineStage, subject: &str, message: String) {
        tracing::warn!("{} stage: {}: {}", stage, subject, message);
        self.diagnostics.push(Diagnostic {
            stage: stage.to_string(),
            subject: subject.to_string(),
            message,
        });
    }
}

/// Builds snapshots and keeps the latest one per project.
pub struct IntelligenceEngine {
    config: EngineConfig,
    snapshots: DashMap<String, Arc<CodeIntelligence>>,
}

impl Default for IntelligenceEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl IntelligenceEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            snapshots: DashMap::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build a snapshot for `project_id`, replacing any cached one.
    pub fn analyze_project(
        &self,
        project_id: &str,
        files: impl IntoIterator<Item = File>,
        sources: &dyn SourceReader,
    ) -> Arc<CodeIntelligence> {
        tracing::info!("Starting intelligence analysis for {}", project_id);
        let intelligence = CodeIntelligence::build(project_id, files, sources, &self.config);
        tracing::info!(
            "Intelligence analysis complete: {} symbols, {} relationships, {} references",
            intelligence.symbols.len(),
            intelligence.relationships.len(),
            intelligence.reference_count()
        );
        let snapshot = Arc::new(intelligence);
        self.snapshots
            .insert(project_id.to_string(), Arc::clone(&snapshot));
        snapshot
    }

    /// Build a snapshot from a directory scan, reading sources from its root.
    /// Files that failed to analyze are carried over as diagnostics.
    pub fn analyze_directory(
        &self,
        project_id: &str,
        analysis: DirectoryAnalysis,
    ) -> Arc<CodeIntelligence> {
        let sources = DiskSources::new(&analysis.root);
        let mut intelligence = CodeIntelligence::new(project_id);
        for failure in &analysis.failures {
            intelligence.diagnostics.push(Diagnostic {
                stage: "analysis".to_string(),
                subject: failure.path.clone(),
                message: failure.message.clone(),
            });
        }
        intelligence.extract_symbols(analysis.files.into_values());
        intelligence.advance_to(PipelineStage::Ready, &sources, &self.config);

        tracing::info!(
            "Intelligence analysis complete: {} symbols, {} relationships, {} references",
            intelligence.symbols.len(),
            intelligence.relationships.len(),
            intelligence.reference_count()
        );
        let snapshot = Arc::new(intelligence);
        self.snapshots
            .insert(project_id.to_string(), Arc::clone(&snapshot));
        snapshot
    }

    /// Latest snapshot of a project.
    pub fn snapshot(&self, project_id: &str) -> Result<Arc<CodeIntelligence>, QueryError> {
        self.snapshots
            .get(project_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| QueryError::ProjectNotAnalyzed(project_id.to_string()))
    }

    pub fn forget(&self, project_id: &str) -> bool {
        self.snapshots.remove(project_id).is_some()
    }

    pub fn projects(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.snapshots.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}
