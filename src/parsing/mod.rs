//! Language adapters: native parse trees to the canonical model.
//!
//! Both adapters parse with tree-sitter. The direct adapter ([`python`])
//! walks the Python tree by hand with a static node-type table; the query
//! adapter ([`query`]) runs a declarative pattern per grammar and falls
//! back to a structural walk when the query yields nothing.

pub mod grammar;
pub mod hierarchy;
pub mod imports;
pub mod properties;
pub mod python;
pub mod query;

use crate::complexity;
use crate::error::AdapterError;
use crate::ids;
use crate::language::Grammar;
use crate::types::*;
use std::path::Path;
use tree_sitter::{Node as TsNode, Parser, Tree};

/// Which adapter produced a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    /// Hand-written walk over one grammar.
    Direct,
    /// Query-driven walk with a structural fallback.
    Query,
}

impl AdapterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Query => "query",
        }
    }
}

/// Trait for language adapters.
pub trait LanguageAdapter: Send + Sync {
    fn kind(&self) -> AdapterKind;

    /// Whether this adapter can handle `language`.
    fn supports(&self, language: Language) -> bool;

    /// Parse `content` and produce the canonical file record.
    fn parse_file(
        &self,
        path: &Path,
        content: &str,
        language: Language,
    ) -> Result<File, AdapterError>;

    /// Extract canonical nodes from an already-parsed tree.
    fn extract_nodes(&self, tree: &Tree, source: &str, path: &str, grammar: Grammar) -> Vec<Node>;
}

// ============================================================================
// Tree helpers
// ============================================================================

/// Parse `content` with a fresh parser (parsers are not `Sync`).
pub fn parse_tree(grammar: Grammar, path: &Path, content: &str) -> Result<Tree, AdapterError> {
    let mut parser = Parser::new();
    parser
        .set_language(&grammar.ts_language())
        .map_err(|e| AdapterError::Grammar {
            language: grammar.language(),
            reason: e.to_string(),
        })?;
    parser
        .parse(content, None)
        .ok_or_else(|| AdapterError::ParseFailure {
            path: path.to_path_buf(),
            reason: "parser returned no tree".to_string(),
        })
}

/// Control returned by a [`walk_tree`] visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Visit {
    Descend,
    Skip,
}

/// Pre-order walk with an explicit stack.
pub(crate) fn walk_tree<'t>(root: TsNode<'t>, mut visit: impl FnMut(TsNode<'t>) -> Visit) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if visit(node) == Visit::Skip {
            continue;
        }
        for i in (0..node.child_count()).rev() {
            if let Some(child) = node.child(i) {
                stack.push(child);
            }
        }
    }
}

pub(crate) fn text_of<'a>(bytes: &'a [u8], node: TsNode) -> Option<&'a str> {
    node.utf8_text(bytes).ok()
}

pub(crate) fn location_for(node: TsNode, path: &str) -> SourceLocation {
    let start = node.start_position();
    let end = node.end_position();
    SourceLocation::new(
        path,
        start.row as u32 + 1,
        start.column as u32,
        end.row as u32 + 1,
        end.column as u32,
    )
    .with_bytes(node.start_byte(), node.end_byte())
}

/// Extract the last identifier from a node's text.
pub(crate) fn last_ident_of(bytes: &[u8], node: TsNode) -> Option<String> {
    let text = text_of(bytes, node)?;
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|part| !part.is_empty())
        .last()
        .map(str::to_string)
}

/// Extract the first identifier from a node's text.
pub(crate) fn first_ident_of(text: &str) -> Option<&str> {
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .find(|part| !part.is_empty())
}

const IDENTIFIER_KINDS: &[&str] = &[
    "identifier",
    "type_identifier",
    "property_identifier",
    "field_identifier",
];

/// First identifier-like descendant, in document order.
pub(crate) fn first_identifier(bytes: &[u8], node: TsNode) -> Option<String> {
    let mut found = None;
    walk_tree(node, |n| {
        if found.is_some() {
            return Visit::Skip;
        }
        if IDENTIFIER_KINDS.contains(&n.kind()) {
            found = text_of(bytes, n).map(str::to_string);
            return Visit::Skip;
        }
        Visit::Descend
    });
    found
}

/// Kinds of all named descendants (excluding `node` itself).
pub(crate) fn named_descendant_kinds(node: TsNode) -> Vec<&'static str> {
    let mut kinds = Vec::new();
    walk_tree(node, |n| {
        if n.id() != node.id() && n.is_named() {
            kinds.push(n.kind());
        }
        Visit::Descend
    });
    kinds
}

/// Count enclosing control-flow and function constructs.
pub(crate) fn nesting_level(node: TsNode) -> u32 {
    let mut level = 0;
    let mut current = node.parent();
    while let Some(parent) = current {
        if grammar::NESTING_KINDS.contains(&parent.kind()) {
            level += 1;
        }
        current = parent.parent();
    }
    level
}

/// Whether any ancestor of `node` is a function-like definition.
pub(crate) fn has_enclosing_function(node: TsNode) -> bool {
    let mut current = node.parent();
    while let Some(parent) = current {
        if grammar::FUNCTION_KINDS.contains(&parent.kind()) {
            return true;
        }
        current = parent.parent();
    }
    false
}

/// Cyclomatic and cognitive complexity of one tree node.
pub(crate) fn node_complexity(bytes: &[u8], node: TsNode, callable: bool) -> (f64, u32) {
    let mut shape = complexity::NodeShape::flattened(node.kind(), named_descendant_kinds(node));
    if let Some(text) = text_of(bytes, node) {
        shape = shape.with_content(text);
    }
    let cyclomatic = complexity::cyclomatic(&shape);
    let nesting = nesting_level(node);
    let construct = if callable && has_enclosing_function(node) {
        "nested_function"
    } else {
        node.kind()
    };
    (cyclomatic as f64, complexity::cognitive(construct, nesting))
}

// ============================================================================
// Calls
// ============================================================================

/// Name of the callee in a call expression's function position.
pub(crate) fn callee_name(bytes: &[u8], function: TsNode) -> Option<String> {
    let mut node = function;
    loop {
        let next = match node.kind() {
            "identifier" | "property_identifier" | "field_identifier" | "type_identifier" => {
                return text_of(bytes, node).map(str::to_string);
            }
            "attribute" => node.child_by_field_name("attribute"),
            "member_expression" => node.child_by_field_name("property"),
            "selector_expression" | "field_expression" => node.child_by_field_name("field"),
            "scoped_identifier" => node.child_by_field_name("name"),
            "generic_function" => node.child_by_field_name("function"),
            "parenthesized_expression" => node.named_child(0),
            _ => None,
        };
        match next {
            Some(n) => node = n,
            None => return last_ident_of(bytes, node),
        }
    }
}

/// Raw callee names inside `body`, not descending into nested definitions.
pub(crate) fn collect_call_names(grammar: Grammar, bytes: &[u8], body: TsNode) -> Vec<String> {
    let profile = grammar::profile(grammar);
    let mut names: Vec<String> = Vec::new();
    walk_tree(body, |n| {
        if n.id() != body.id() && profile.is_definition(n.kind()) {
            return Visit::Skip;
        }
        if let Some(field) = profile.callee_field(n.kind()) {
            if let Some(function) = n.child_by_field_name(field) {
                if let Some(name) = callee_name(bytes, function) {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
            }
        }
        Visit::Descend
    });
    names
}

// ============================================================================
// File assembly
// ============================================================================

/// Line-prefix markers treated as comments.
pub const COMMENT_MARKERS: &[&str] = &["#", "//", "/*", "*", "<!--", "--", "///", "##"];

/// Line statistics of a source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineCounts {
    pub total: u32,
    pub code: u32,
    pub comment: u32,
    pub blank: u32,
}

pub fn count_lines(content: &str, comment_markers: &[&str]) -> LineCounts {
    let newlines = bytecount::count(content.as_bytes(), b'\n');
    let trailing = usize::from(!content.is_empty() && !content.ends_with('\n'));
    let mut counts = LineCounts {
        total: (newlines + trailing) as u32,
        ..LineCounts::default()
    };
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            counts.blank += 1;
        } else if comment_markers.iter().any(|m| trimmed.starts_with(m)) {
            counts.comment += 1;
        } else {
            counts.code += 1;
        }
    }
    counts
}

/// Operator (anonymous leaf) and operand (named leaf) tokens of a tree.
pub(crate) fn halstead_tokens(root: TsNode, bytes: &[u8]) -> (Vec<String>, Vec<String>) {
    let mut operators = Vec::new();
    let mut operands = Vec::new();
    walk_tree(root, |n| {
        if n.kind().contains("comment") {
            return Visit::Skip;
        }
        if n.child_count() == 0 {
            if n.is_named() {
                if let Some(text) = text_of(bytes, n) {
                    operands.push(text.to_string());
                }
            } else if !n.is_missing() {
                operators.push(n.kind().to_string());
            }
        }
        Visit::Descend
    });
    (operators, operands)
}

/// Everything an adapter extracted from one file.
pub(crate) struct Extraction<'t> {
    pub root: TsNode<'t>,
    pub nodes: Vec<Node>,
    pub imports: Vec<String>,
    pub exports: Vec<String>,
}

/// Build the canonical file record from an extraction.
pub(crate) fn assemble_file(
    path: &str,
    language: Language,
    content: &str,
    extraction: Extraction<'_>,
    adapter: AdapterKind,
    comment_markers: &[&str],
) -> File {
    let mut file = File::new(path, language);
    let lines = count_lines(content, comment_markers);
    file.size_bytes = content.len() as u64;
    file.hash = ids::file_hash(content.as_bytes());
    file.total_lines = lines.total;
    file.code_lines = lines.code;
    file.comment_lines = lines.comment;
    file.blank_lines = lines.blank;

    let callable: Vec<f64> = extraction
        .nodes
        .iter()
        .filter(|n| n.kind.is_callable())
        .map(|n| n.complexity)
        .collect();
    file.complexity = if callable.is_empty() {
        1.0
    } else {
        callable.iter().sum::<f64>() / callable.len() as f64
    };

    let (operators, operands) = halstead_tokens(extraction.root, content.as_bytes());
    let volume = complexity::halstead(&operators, &operands).volume;
    let comment_ratio = if lines.total > 0 {
        lines.comment as f64 / lines.total as f64
    } else {
        0.0
    };
    file.maintainability_index = Some(complexity::maintainability_index(
        file.complexity,
        volume,
        lines.code,
        comment_ratio,
    ));

    file.adapter = Some(adapter.as_str().to_string());
    file.metadata
        .insert("analyzer_type".to_string(), adapter.as_str().to_string());
    file.metadata
        .insert("language_detected".to_string(), language.to_string());
    file.metadata
        .insert("node_count".to_string(), extraction.nodes.len().to_string());

    file.nodes = extraction.nodes;
    file.imports = extraction.imports;
    file.exports = extraction.exports;
    file
}

/// A tree with syntax errors from which nothing was salvaged.
pub(crate) fn is_unrecoverable(tree: &Tree, nodes: &[Node], imports: &[String]) -> bool {
    tree.root_node().has_error()
        && imports.is_empty()
        && nodes
            .iter()
            .all(|n| n.kind == NodeKind::Module && n.native_kind.as_deref() == Some("module"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_lines() {
        let src = "# header\nimport os\n\n// not python but a marker\nx = 1\n";
        let counts = count_lines(src, COMMENT_MARKERS);
        assert_eq!(counts.total, 5);
        assert_eq!(counts.blank, 1);
        assert_eq!(counts.comment, 2);
        assert_eq!(counts.code, 2);
    }

    #[test]
    fn test_count_lines_without_trailing_newline() {
        assert_eq!(count_lines("a\nb", COMMENT_MARKERS).total, 2);
        assert_eq!(count_lines("", COMMENT_MARKERS).total, 0);
    }

    #[test]
    fn test_collect_call_names_skips_nested_definitions() {
        let src = concat!(
            "def outer():\n    helper()\n    obj.method(1)\n",
            "    def inner():\n        hidden()\n    return helper()\n",
        );
        let tree = parse_tree(Grammar::Python, Path::new("a.py"), src).unwrap();
        let root = tree.root_node();
        let outer = root.named_child(0).unwrap();
        assert_eq!(outer.kind(), "function_definition");
        let calls = collect_call_names(Grammar::Python, src.as_bytes(), outer);
        assert_eq!(calls, vec!["helper".to_string(), "method".to_string()]);
    }

    #[test]
    fn test_callee_name_for_member_calls() {
        let src = "function f() { this.store.save(x); run(); }";
        let tree = parse_tree(Grammar::JavaScript, Path::new("a.js"), src).unwrap();
        let f = tree.root_node().named_child(0).unwrap();
        let calls = collect_call_names(Grammar::JavaScript, src.as_bytes(), f);
        assert_eq!(calls, vec!["save".to_string(), "run".to_string()]);
    }

    #[test]
    fn test_halstead_tokens() {
        let src = "x = a + 1\n";
        let tree = parse_tree(Grammar::Python, Path::new("a.py"), src).unwrap();
        let (operators, operands) = halstead_tokens(tree.root_node(), src.as_bytes());
        assert_eq!(operators, vec!["=".to_string(), "+".to_string()]);
        assert_eq!(operands, vec!["x".to_string(), "a".to_string(), "1".to_string()]);
    }
}
