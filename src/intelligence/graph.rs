//! Dependency-graph metrics and the project summary.
//!
//! The relationship set is collapsed into a simple directed graph (one edge
//! per ordered pair) for density, strongly connected components and cycle
//! enumeration. Cycle search is bounded by a result cap, a path-length cap
//! and a step budget; hitting any of them truncates the list silently.

use super::{CodeIntelligence, PipelineStage};
use crate::complexity::MetricsCollector;
use crate::config::EngineConfig;
use crate::types::*;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Bounds on cycle enumeration in [`graph_metrics`].
#[derive(Debug, Clone, Copy)]
pub struct CycleLimits {
    pub max_cycles: usize,
    pub max_length: usize,
    pub budget: usize,
}

impl From<&EngineConfig> for CycleLimits {
    fn from(config: &EngineConfig) -> Self {
        Self {
            max_cycles: config.max_cycles,
            max_length: config.max_cycle_length.max(1),
            budget: config.cycle_search_budget,
        }
    }
}

/// Structural statistics of a dependency graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphMetrics {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub density: f64,
    pub strongly_connected_components: usize,
    pub cycles: Vec<Vec<String>>,
}

/// Simple directed graph over string ids.
struct IdGraph<'a> {
    graph: DiGraph<&'a str, ()>,
}

impl<'a> IdGraph<'a> {
    fn new(nodes: &'a [String], edges: &'a [DependencyEdge]) -> Self {
        let mut graph = DiGraph::new();
        let mut index: HashMap<&'a str, NodeIndex> = HashMap::new();
        for id in nodes {
            index
                .entry(id.as_str())
                .or_insert_with(|| graph.add_node(id.as_str()));
        }
        let mut pairs = HashSet::new();
        for edge in edges {
            let source = *index
                .entry(edge.source.as_str())
                .or_insert_with(|| graph.add_node(edge.source.as_str()));
            let target = *index
                .entry(edge.target.as_str())
                .or_insert_with(|| graph.add_node(edge.target.as_str()));
            if pairs.insert((source, target)) {
                graph.add_edge(source, target, ());
            }
        }
        Self { graph }
    }

    /// Successors of `node` that may continue a cycle rooted at `start`,
    /// sorted descending so popping yields ascending order.
    fn successors(
        &self,
        node: NodeIndex,
        start: NodeIndex,
        component: &[usize],
    ) -> Vec<NodeIndex> {
        let scc = component[start.index()];
        let mut next: Vec<NodeIndex> = self
            .graph
            .neighbors(node)
            .filter(|n| n.index() >= start.index() && component[n.index()] == scc)
            .collect();
        next.sort_unstable_by(|a, b| b.cmp(a));
        next.dedup();
        next
    }
}

/// Compute metrics for a dependency graph.
pub fn graph_metrics(
    nodes: &[String],
    edges: &[DependencyEdge],
    limits: CycleLimits,
) -> GraphMetrics {
    let ids = IdGraph::new(nodes, edges);
    let n = ids.graph.node_count();
    let m = ids.graph.edge_count();
    let density = if n > 1 {
        m as f64 / (n as f64 * (n as f64 - 1.0))
    } else {
        0.0
    };

    let components = tarjan_scc(&ids.graph);
    let mut component = vec![0usize; n];
    for (c, members) in components.iter().enumerate() {
        for node in members {
            component[node.index()] = c;
        }
    }

    GraphMetrics {
        total_nodes: n,
        total_edges: m,
        density,
        strongly_connected_components: components.len(),
        cycles: find_cycles(&ids, &component, limits),
    }
}

/// Enumerate simple cycles, each rooted at its lowest node index.
fn find_cycles(ids: &IdGraph<'_>, component: &[usize], limits: CycleLimits) -> Vec<Vec<String>> {
    let mut cycles = Vec::new();
    let mut steps = 0usize;
    let mut on_path = vec![false; ids.graph.node_count()];

    for start in ids.graph.node_indices() {
        if cycles.len() >= limits.max_cycles || steps >= limits.budget {
            break;
        }
        let mut path = vec![start];
        on_path[start.index()] = true;
        let mut stack = vec![ids.successors(start, start, component)];

        while let Some(frontier) = stack.last_mut() {
            if cycles.len() >= limits.max_cycles || steps >= limits.budget {
                break;
            }
            let Some(next) = frontier.pop() else {
                stack.pop();
                if let Some(done) = path.pop() {
                    on_path[done.index()] = false;
                }
                continue;
            };
            steps += 1;
            if next == start {
                cycles.push(path.iter().map(|i| ids.graph[*i].to_string()).collect());
                continue;
            }
            if on_path[next.index()] || path.len() >= limits.max_length {
                continue;
            }
            path.push(next);
            on_path[next.index()] = true;
            stack.push(ids.successors(next, start, component));
        }

        for node in path.drain(..) {
            on_path[node.index()] = false;
        }
    }

    if steps >= limits.budget {
        tracing::debug!(
            "Cycle search stopped after {} steps with {} cycles",
            steps,
            cycles.len()
        );
    }
    cycles
}

/// Stage 5: graph metrics plus the project summary.
pub(super) fn compute_metrics(intel: &mut CodeIntelligence, config: &EngineConfig) {
    let metrics = graph_metrics(
        &intel.dependency_graph.nodes,
        &intel.dependency_graph.edges,
        CycleLimits::from(config),
    );

    let graph = &mut intel.dependency_graph;
    graph.total_nodes = metrics.total_nodes;
    graph.total_edges = metrics.total_edges;
    graph.density = metrics.density;
    graph.strongly_connected_components = metrics.strongly_connected_components;
    graph.cycles = metrics.cycles.clone();

    intel.metrics.insert(
        "graph_metrics".to_string(),
        json!({
            "total_nodes": metrics.total_nodes,
            "total_edges": metrics.total_edges,
            "density": metrics.density,
            "strongly_connected_components": metrics.strongly_connected_components,
            "cycles_found": metrics.cycles.len(),
        }),
    );
    let summary = project_summary(intel);
    intel.metrics.insert("summary".to_string(), summary);

    tracing::debug!(
        "{} stage: {} nodes, {} edges, {} cycles",
        PipelineStage::MetricsComputed,
        metrics.total_nodes,
        metrics.total_edges,
        metrics.cycles.len()
    );
}

fn project_summary(intel: &CodeIntelligence) -> serde_json::Value {
    let mut collector = MetricsCollector::new();
    let mut symbol_kinds: BTreeMap<&str, usize> = BTreeMap::new();
    for symbol in intel.symbols.values() {
        *symbol_kinds.entry(symbol.kind.as_str()).or_default() += 1;
        if symbol.kind.is_callable() {
            collector.add_symbol(symbol.complexity, symbol.cognitive_complexity);
        }
    }

    let mut languages: BTreeMap<&str, usize> = BTreeMap::new();
    let (mut total, mut code, mut comment, mut blank) = (0u64, 0u64, 0u64, 0u64);
    for file in intel.files.values() {
        *languages.entry(file.language.as_str()).or_default() += 1;
        total += u64::from(file.total_lines);
        code += u64::from(file.code_lines);
        comment += u64::from(file.comment_lines);
        blank += u64::from(file.blank_lines);
        if let Some(mi) = file.maintainability_index {
            collector.add_maintainability(mi);
        }
    }

    let mut relationship_kinds: BTreeMap<&str, usize> = BTreeMap::new();
    for rel in &intel.relationships {
        *relationship_kinds.entry(rel.kind.as_str()).or_default() += 1;
    }

    let complexity = collector.aggregate();
    json!({
        "total_files": intel.files.len(),
        "total_lines": total,
        "code_lines": code,
        "comment_lines": comment,
        "blank_lines": blank,
        "total_symbols": intel.symbols.len(),
        "total_relationships": intel.relationships.len(),
        "total_references": intel.reference_count(),
        "symbol_kinds": symbol_kinds,
        "relationship_kinds": relationship_kinds,
        "languages": languages,
        "average_complexity": complexity.average_cyclomatic,
        "max_complexity": complexity.max_cyclomatic,
        "average_cognitive_complexity": complexity.average_cognitive,
        "max_cognitive_complexity": complexity.max_cognitive,
        "average_maintainability": complexity.average_maintainability,
        "complexity_distribution": complexity.distribution,
        "quality_score": complexity.quality_score,
    })
}
