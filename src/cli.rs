//! code-intel - CLI for the universal code analysis pipeline
//!
//! # Usage
//!
//! ```bash
//! # Summarize a project
//! code-intel analyze /path/to/repo
//!
//! # Find symbols by name (case-insensitive regex)
//! code-intel symbols /path/to/repo "^parse_"
//!
//! # What breaks if this symbol changes?
//! code-intel impact /path/to/repo <symbol-id> --depth 3
//!
//! # Outgoing call tree
//! code-intel calls /path/to/repo <symbol-id> --depth 2
//! ```
//!
//! `--json` prints machine-readable output. Logs and errors go to stderr,
//! results to stdout. Exit codes: 0 = success, 1 = error.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use code_intel::{
    AppConfig, CallGraphView, CodeIntelligence, ImpactReport, IntelligenceEngine, ReferenceScope,
    SymbolQuery, UniversalAnalyzer,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "code-intel")]
#[command(version)]
#[command(about = "Multi-language symbol graphs, relationships and impact analysis")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON file with `analyzer` and `engine` settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Scan every file for references, not just the defining file
    #[arg(long, global = true)]
    project_references: bool,

    /// Number of files analyzed concurrently
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Output JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a directory and print the project summary
    Analyze {
        path: PathBuf,

        /// Print the whole snapshot instead of the summary (implies --json)
        #[arg(long)]
        full: bool,
    },

    /// Search symbols by name
    Symbols {
        path: PathBuf,
        pattern: String,

        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Symbols affected by a change to the given symbol
    Impact {
        path: PathBuf,
        symbol_id: String,

        #[arg(short, long, default_value = "3")]
        depth: usize,
    },

    /// Call tree rooted at the given symbol
    Calls {
        path: PathBuf,
        symbol_id: String,

        #[arg(short, long, default_value = "3")]
        depth: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (only to stderr to keep stdout clean)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let json = cli.json || matches!(cli.command, Commands::Analyze { full: true, .. });

    match run_command(&cli).await {
        Ok(output) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print_human_readable(&output);
            }
            Ok(())
        }
        Err(e) => {
            if json {
                let err = serde_json::json!({
                    "error": format!("{:#}", e)
                });
                eprintln!("{}", serde_json::to_string_pretty(&err)?);
            } else {
                eprintln!("Error: {:#}", e);
            }
            std::process::exit(1);
        }
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AppConfig::default(),
    };
    if cli.project_references {
        config.engine.reference_scope = ReferenceScope::Project;
    }
    if let Some(workers) = cli.workers {
        config.analyzer = config.analyzer.with_workers(workers);
    }
    Ok(config)
}

async fn build_snapshot(cli: &Cli, path: &Path) -> Result<Arc<CodeIntelligence>> {
    let config = load_config(cli)?;
    let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let project_id = root.display().to_string();

    let analysis = UniversalAnalyzer::new(config.analyzer)
        .analyze_directory(&root)
        .await?;
    let engine = IntelligenceEngine::new(config.engine);
    Ok(engine.analyze_directory(&project_id, analysis))
}

async fn run_command(cli: &Cli) -> Result<Output> {
    match &cli.command {
        Commands::Analyze { path, full } => {
            let snapshot = build_snapshot(cli, path).await?;
            if *full {
                return Ok(Output::Snapshot {
                    snapshot: Arc::unwrap_or_clone(snapshot),
                });
            }
            Ok(Output::Summary {
                project: snapshot.project_id.clone(),
                metrics: snapshot.metrics.clone(),
                diagnostics: snapshot.diagnostics.len(),
            })
        }
        Commands::Symbols {
            path,
            pattern,
            limit,
        } => {
            let snapshot = build_snapshot(cli, path).await?;
            let query = SymbolQuery::new(pattern.clone()).with_limit(*limit);
            let results = snapshot
                .search_symbols(&query)?
                .into_iter()
                .map(|s| SymbolResult {
                    id: s.id.clone(),
                    name: s.name.clone().unwrap_or_default(),
                    kind: s.kind.to_string(),
                    file: s.location.file_path.clone(),
                    line: s.location.start_line,
                })
                .collect();
            Ok(Output::Symbols {
                query: pattern.clone(),
                results,
            })
        }
        Commands::Impact {
            path,
            symbol_id,
            depth,
        } => {
            let snapshot = build_snapshot(cli, path).await?;
            let report = snapshot.impact_analysis(symbol_id, *depth)?;
            Ok(Output::Impact { report })
        }
        Commands::Calls {
            path,
            symbol_id,
            depth,
        } => {
            let snapshot = build_snapshot(cli, path).await?;
            let graph = snapshot.call_graph(symbol_id, *depth)?;
            Ok(Output::Calls { graph })
        }
    }
}

#[derive(serde::Serialize)]
#[serde(tag = "type")]
enum Output {
    Summary {
        project: String,
        metrics: std::collections::BTreeMap<String, serde_json::Value>,
        diagnostics: usize,
    },
    Snapshot {
        snapshot: CodeIntelligence,
    },
    Symbols {
        query: String,
        results: Vec<SymbolResult>,
    },
    Impact {
        report: ImpactReport,
    },
    Calls {
        graph: CallGraphView,
    },
}

#[derive(serde::Serialize)]
struct SymbolResult {
    id: String,
    name: String,
    kind: String,
    file: String,
    line: u32,
}

fn print_human_readable(output: &Output) {
    match output {
        Output::Summary {
            project,
            metrics,
            diagnostics,
        } => {
            println!("Project: {}", project);
            if let Some(summary) = metrics.get("summary") {
                let field = |key: &str| summary.get(key).cloned().unwrap_or_default();
                println!(
                    "  {} files, {} symbols, {} relationships, {} references",
                    field("total_files"),
                    field("total_symbols"),
                    field("total_relationships"),
                    field("total_references")
                );
                println!("  quality score: {}", field("quality_score"));
            }
            if let Some(graph) = metrics.get("graph_metrics") {
                let field = |key: &str| graph.get(key).cloned().unwrap_or_default();
                println!(
                    "  dependency graph: {} nodes, {} edges, {} components, {} cycles",
                    field("total_nodes"),
                    field("total_edges"),
                    field("strongly_connected_components"),
                    field("cycles_found")
                );
            }
            if *diagnostics > 0 {
                println!("  {} diagnostics (use --full to inspect)", diagnostics);
            }
        }
        Output::Snapshot { snapshot } => {
            println!("{} symbols", snapshot.symbols.len());
        }
        Output::Symbols { query, results } => {
            println!("Symbols matching \"{}\":", query);
            println!("Found {} matches:", results.len());
            for s in results {
                println!("  {} ({}) at {}:{}", s.name, s.kind, s.file, s.line);
                println!("    {}", s.id);
            }
        }
        Output::Impact { report } => {
            println!(
                "Changing {} impacts {} symbols in {} files (depth {}):",
                report.symbol_id,
                report.total_impacted(),
                report.impacted_files.len(),
                report.max_depth
            );
            for id in &report.impacted_symbols {
                println!("  {}", id);
            }
        }
        Output::Calls { graph } => {
            println!("Call graph of {} (depth {}):", graph.root, graph.max_depth);
            for node in &graph.nodes {
                let indent = "  ".repeat(node.depth.unwrap_or(0) + 1);
                println!(
                    "{}{} ({}) at {}",
                    indent, node.symbol_name, node.symbol_kind, node.file_path
                );
            }
            println!("{} edges", graph.edges.len());
        }
    }
}
