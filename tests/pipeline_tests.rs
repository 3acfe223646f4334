//! End-to-end tests: directory scan, engine build, and the query surface
//! over a small multi-language fixture project.

use code_intel::*;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::PathBuf;

fn fixture_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("project")
}

fn copy_fixture() -> tempfile::TempDir {
    let src_root = fixture_root();
    let temp = tempfile::tempdir().expect("tempdir");

    for entry in walkdir::WalkDir::new(&src_root) {
        let entry = entry.expect("walkdir entry");
        let path = entry.path();
        let rel = path.strip_prefix(&src_root).expect("strip prefix");
        let dest = temp.path().join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).expect("create dir");
        } else {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).expect("create parent");
            }
            fs::copy(path, &dest).expect("copy file");
        }
    }

    temp
}

async fn snapshot(root: &std::path::Path) -> std::sync::Arc<CodeIntelligence> {
    let analysis = UniversalAnalyzer::default()
        .analyze_directory(root)
        .await
        .expect("scan");
    IntelligenceEngine::default().analyze_directory("fixture", analysis)
}

fn find<'a>(intel: &'a CodeIntelligence, name: &str, kind: NodeKind) -> &'a Node {
    intel
        .symbols
        .values()
        .find(|s| s.name() == Some(name) && s.kind == kind)
        .unwrap_or_else(|| panic!("no {kind} named {name}"))
}

fn has_edge(intel: &CodeIntelligence, source: &str, target: &str, kind: RelationKind) -> bool {
    intel
        .relationships
        .iter()
        .any(|r| r.source_id == source && r.target_id == target && r.kind == kind)
}

#[tokio::test]
async fn test_scan_keeps_going_past_bad_files() {
    let temp = copy_fixture();
    let analysis = UniversalAnalyzer::default()
        .analyze_directory(temp.path())
        .await
        .expect("scan");

    let keys: Vec<&str> = analysis.files.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec![
            "app/models.py",
            "app/service.py",
            "core/lib.rs",
            "tools/main.go",
            "web/api.ts",
            "web/client.ts",
        ]
    );

    let mut failures: Vec<(&str, FailureKind)> = analysis
        .failures
        .iter()
        .map(|f| (f.path.as_str(), f.kind))
        .collect();
    failures.sort();
    assert_eq!(
        failures,
        vec![
            ("broken.py", FailureKind::ParseFailure),
            ("legacy/Main.java", FailureKind::UnsupportedLanguage),
        ]
    );
}

#[tokio::test]
async fn test_invalid_root_aborts() {
    let err = UniversalAnalyzer::default()
        .analyze_directory(std::path::Path::new("/definitely/not/here"))
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidRoot(_)));
}

#[tokio::test]
async fn test_relationships_across_languages() {
    let temp = copy_fixture();
    let intel = snapshot(temp.path()).await;
    assert!(intel.is_ready());

    let base = find(&intel, "Base", NodeKind::Class);
    let user = find(&intel, "User", NodeKind::Class);
    assert!(has_edge(&intel, &user.id, &base.id, RelationKind::Extends));

    let client = find(&intel, "Client", NodeKind::Interface);
    let http = find(&intel, "HttpClient", NodeKind::Class);
    assert!(has_edge(&intel, &http.id, &client.id, RelationKind::Implements));

    let shape = find(&intel, "Shape", NodeKind::Trait);
    assert!(intel
        .incoming(&shape.id)
        .any(|r| r.kind == RelationKind::Implements));

    assert!(has_edge(
        &intel,
        "file:app/service.py",
        &user.id,
        RelationKind::Imports
    ));
    assert_eq!(
        intel.file_dependencies.get("app/service.py"),
        Some(&vec!["app/models.py".to_string()])
    );

    let failed: Vec<&str> = intel
        .diagnostics
        .iter()
        .filter(|d| d.stage == "analysis")
        .map(|d| d.subject.as_str())
        .collect();
    assert_eq!(failed, vec!["broken.py", "legacy/Main.java"]);
}

#[tokio::test]
async fn test_impact_reaches_cross_file_callers() {
    let temp = copy_fixture();
    let intel = snapshot(temp.path()).await;

    let persist = find(&intel, "persist", NodeKind::Function);
    let save = find(&intel, "save", NodeKind::Method);
    let register = find(&intel, "register", NodeKind::Function);

    let report = intel.impact_analysis(&persist.id, 2).unwrap();
    assert!(report.impacted_symbols.contains(&save.id));
    assert!(report.impacted_symbols.contains(&register.id));
    assert!(!report.impacted_symbols.contains(&persist.id));
    assert!(report.impacted_files.contains(&"app/service.py".to_string()));

    let shallow = intel.impact_analysis(&persist.id, 1).unwrap();
    assert!(shallow.impacted_symbols.contains(&save.id));
    assert!(!shallow.impacted_symbols.contains(&register.id));
}

#[tokio::test]
async fn test_call_graph_from_entry_point() {
    let temp = copy_fixture();
    let intel = snapshot(temp.path()).await;

    let register = find(&intel, "register", NodeKind::Function);
    let view = intel.call_graph(&register.id, 3).unwrap();
    let depths: Vec<(&str, usize)> = view
        .nodes
        .iter()
        .map(|n| (n.symbol_name.as_str(), n.depth.unwrap_or(usize::MAX)))
        .collect();
    assert_eq!(depths[0], ("register", 0));
    assert!(depths.contains(&("save", 1)));
    assert!(depths.contains(&("greet", 1)));
    assert!(depths.contains(&("persist", 2)));
    assert!(depths.contains(&("format_name", 2)));

    let ts = find(&intel, "fetchUser", NodeKind::Function);
    let callers = &intel.call_graph[&ts.id].called_by;
    assert_eq!(callers.len(), 1);
    assert_eq!(intel.symbols[&callers[0]].name(), Some("load"));
}

#[tokio::test]
async fn test_snapshots_are_deterministic() {
    let temp = copy_fixture();
    let first = snapshot(temp.path()).await;
    let second = snapshot(temp.path()).await;
    assert_eq!(
        serde_json::to_value(&*first).unwrap(),
        serde_json::to_value(&*second).unwrap()
    );
}

#[tokio::test]
async fn test_summary_metrics() {
    let temp = copy_fixture();
    let intel = snapshot(temp.path()).await;

    let summary = &intel.metrics["summary"];
    assert_eq!(summary["total_files"], 6);
    assert_eq!(summary["languages"]["python"], 2);
    assert_eq!(summary["languages"]["typescript"], 2);
    let score = summary["quality_score"].as_f64().unwrap();
    assert!((0.0..=100.0).contains(&score));

    let graph = &intel.metrics["graph_metrics"];
    assert_eq!(
        graph["total_nodes"].as_u64().unwrap() as usize,
        intel.dependency_graph.total_nodes
    );
}

#[tokio::test]
async fn test_search_and_lookup() {
    let temp = copy_fixture();
    let intel = snapshot(temp.path()).await;

    let found = intel
        .search_symbols(&SymbolQuery::new("^(greet|GREETER)$"))
        .unwrap();
    let names: Vec<(&str, &str)> = found
        .iter()
        .map(|s| (s.name().unwrap(), s.location.file_path.as_str()))
        .collect();
    assert_eq!(
        names,
        vec![
            ("Greet", "tools/main.go"),
            ("Greeter", "tools/main.go"),
            ("greet", "app/models.py"),
        ]
    );

    let go_only = intel
        .search_symbols(&SymbolQuery::new("greet").with_language(Language::Go))
        .unwrap();
    assert!(go_only.iter().all(|s| s.language == Language::Go));

    let greet = find(&intel, "greet", NodeKind::Method);
    assert_eq!(intel.get_symbol(&greet.id).unwrap().id, greet.id);
    let rels = intel
        .get_symbol_relationships(&greet.id, &[RelationKind::Calls])
        .unwrap();
    assert!(rels.iter().all(|r| r.kind == RelationKind::Calls));
    assert!(!rels.is_empty());
}

#[tokio::test]
async fn test_impact_reaches_importing_files() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(temp.path().join("models.py"), "class User:\n    pass\n").unwrap();
    fs::write(temp.path().join("app.py"), "from models import User\n").unwrap();
    let intel = snapshot(temp.path()).await;

    let user = find(&intel, "User", NodeKind::Class);
    let report = intel.impact_analysis(&user.id, 3).unwrap();
    assert!(report.impacted_files.contains(&"app.py".to_string()));
    assert!(
        report
            .impacted_symbols
            .iter()
            .all(|id| intel.symbols.contains_key(id)),
        "{:?}",
        report.impacted_symbols
    );
}
