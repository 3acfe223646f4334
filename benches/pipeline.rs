//! Benchmarks for the analysis pipeline.
//!
//! ## Adapters
//! - Single-file latency of the direct and query Python adapters
//!
//! ## Full Pipeline
//! - Directory scan throughput (files/sec) over generated projects
//! - Engine build (relationships, references, graph metrics) on the result
//!
//! ## Queries
//! - Impact analysis and call-graph traversal on a built snapshot

use code_intel::parsing::LanguageAdapter;
use code_intel::parsing::python::PythonAdapter;
use code_intel::parsing::query::QueryAdapter;
use code_intel::{CodeIntelligence, IntelligenceEngine, Language, NodeKind, UniversalAnalyzer};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

// ============================================================================
// Fixture Generation
// ============================================================================

/// A Python module with `classes` classes of three methods each and
/// `functions` free functions that call into the previous module.
fn generate_python_module(index: usize, classes: usize, functions: usize) -> String {
    let mut code = String::new();
    if index > 0 {
        code.push_str(&format!("from mod_{} import helper_0\n\n", index - 1));
    }
    for c in 0..classes {
        code.push_str(&format!(
            r#"
class Model{index}_{c}:
    def __init__(self, value):
        self.value = value

    def update(self, delta):
        if delta > 0:
            self.value += delta
        return self.value

    def render(self):
        return helper_0(self.value)

"#
        ));
    }
    for f in 0..functions {
        let callee = if index > 0 { "helper_0" } else { "len" };
        code.push_str(&format!(
            r#"
def helper_{f}(x):
    for i in range(x):
        if i % 2 == 0:
            x = {callee}(i)
    return x

"#
        ));
    }
    code
}

fn create_project(modules: usize) -> TempDir {
    let temp = TempDir::new().unwrap();
    for i in 0..modules {
        fs::write(
            temp.path().join(format!("mod_{i}.py")),
            generate_python_module(i, 4, 6),
        )
        .unwrap();
    }
    temp
}

fn scan_and_build(root: &Path, runtime: &tokio::runtime::Runtime) -> Arc<CodeIntelligence> {
    let analysis = runtime
        .block_on(UniversalAnalyzer::default().analyze_directory(root))
        .unwrap();
    IntelligenceEngine::default().analyze_directory("bench", analysis)
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_adapters(c: &mut Criterion) {
    let mut group = c.benchmark_group("adapters/python");
    let code = generate_python_module(1, 10, 20);
    group.throughput(Throughput::Bytes(code.len() as u64));

    let direct = PythonAdapter::new();
    let query = QueryAdapter::new();
    let structural = QueryAdapter::structural_only();
    let adapters: [(&str, &dyn LanguageAdapter); 3] = [
        ("direct", &direct),
        ("query", &query),
        ("structural", &structural),
    ];
    for (label, adapter) in adapters {
        group.bench_with_input(BenchmarkId::new("parse_file", label), &code, |b, code| {
            b.iter(|| {
                black_box(
                    adapter
                        .parse_file(Path::new("mod_1.py"), code, Language::Python)
                        .unwrap(),
                )
            });
        });
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/full_project");
    group.sample_size(10);
    let runtime = tokio::runtime::Runtime::new().unwrap();

    for (modules, label) in [(10, "small"), (50, "medium"), (150, "large")] {
        let temp = create_project(modules);
        group.throughput(Throughput::Elements(modules as u64));

        group.bench_with_input(BenchmarkId::new("scan", label), &temp, |b, temp| {
            b.to_async(&runtime).iter(|| async {
                black_box(
                    UniversalAnalyzer::default()
                        .analyze_directory(temp.path())
                        .await
                        .unwrap(),
                )
            });
        });

        let analysis = runtime
            .block_on(UniversalAnalyzer::default().analyze_directory(temp.path()))
            .unwrap();
        group.bench_with_input(BenchmarkId::new("engine", label), &analysis, |b, analysis| {
            b.iter(|| {
                black_box(
                    IntelligenceEngine::default().analyze_directory("bench", analysis.clone()),
                )
            });
        });
    }
    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("queries");
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let temp = create_project(50);
    let snapshot = scan_and_build(temp.path(), &runtime);

    let seed = snapshot
        .symbols
        .values()
        .find(|s| s.name() == Some("helper_0") && s.kind == NodeKind::Function)
        .map(|s| s.id.clone())
        .unwrap();

    for depth in [2usize, 5, 10] {
        group.bench_with_input(BenchmarkId::new("impact_analysis", depth), &depth, |b, &depth| {
            b.iter(|| black_box(snapshot.impact_analysis(&seed, depth).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("call_graph", depth), &depth, |b, &depth| {
            b.iter(|| black_box(snapshot.call_graph(&seed, depth).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_adapters, bench_pipeline, bench_queries);
criterion_main!(benches);
