//! Direct adapter for Python.
//!
//! Walks the Python concrete syntax tree with an explicit work stack and a
//! static node-type table. Unmapped node types are not materialized but
//! their children are still visited, attached to the nearest mapped
//! ancestor.

use super::properties::{self, set_string_list, simple_type_name};
use super::{
    AdapterKind, Extraction, LanguageAdapter, assemble_file, collect_call_names, hierarchy,
    imports, is_unrecoverable, location_for, node_complexity, parse_tree, text_of,
};
use crate::error::AdapterError;
use crate::ids;
use crate::language::Grammar;
use crate::types::*;
use std::path::Path;
use tree_sitter::{Node as TsNode, Tree};

/// Python node types and the canonical kinds they map to.
const NODE_TABLE: &[(&str, NodeKind)] = &[
    ("module", NodeKind::Module),
    ("class_definition", NodeKind::Class),
    ("function_definition", NodeKind::Function),
    ("assignment", NodeKind::Variable),
    ("import_statement", NodeKind::Import),
    ("import_from_statement", NodeKind::Import),
    ("if_statement", NodeKind::Conditional),
    ("for_statement", NodeKind::Loop),
    ("while_statement", NodeKind::Loop),
    ("try_statement", NodeKind::Exception),
    ("lambda", NodeKind::Lambda),
    ("generator_expression", NodeKind::Generator),
];

/// Fields tried, in order, when naming a node.
const NAME_FIELDS: &[&str] = &["name", "left", "module_name"];

const COMMENT_MARKERS: &[&str] = &["#"];

fn kind_for(native: &str) -> Option<NodeKind> {
    NODE_TABLE
        .iter()
        .find(|(k, _)| *k == native)
        .map(|(_, kind)| *kind)
}

fn node_name(ts: TsNode, bytes: &[u8]) -> Option<String> {
    for field in NAME_FIELDS {
        let Some(candidate) = ts.child_by_field_name(field) else {
            continue;
        };
        let target = match candidate.kind() {
            "aliased_import" => candidate.child_by_field_name("name"),
            "identifier" | "dotted_name" | "relative_import" => Some(candidate),
            _ => None,
        };
        if let Some(text) = target.and_then(|t| text_of(bytes, t)) {
            return Some(text.to_string());
        }
    }
    None
}

/// Decorator names (last dotted component, without arguments).
pub(crate) fn decorators_of(ts: TsNode, bytes: &[u8]) -> Vec<String> {
    let Some(parent) = ts.parent() else {
        return Vec::new();
    };
    if parent.kind() != "decorated_definition" {
        return Vec::new();
    }
    (0..parent.named_child_count())
        .filter_map(|i| parent.named_child(i))
        .filter(|c| c.kind() == "decorator")
        .filter_map(|c| text_of(bytes, c))
        .filter_map(|text| {
            let text = text.trim_start_matches('@').trim();
            let head = text.split('(').next().unwrap_or(text);
            head.rsplit('.').next().map(|s| s.trim().to_string())
        })
        .filter(|s| !s.is_empty())
        .collect()
}

/// Apply decorator-derived flags and record the decorator list.
pub(crate) fn apply_decorators(node: &mut Node, decorators: &[String]) {
    for decorator in decorators {
        match decorator.as_str() {
            "staticmethod" | "classmethod" => node.is_static = true,
            "abstractmethod" => node.is_abstract = true,
            _ => {}
        }
    }
    set_string_list(node, "decorators", decorators);
}

/// Base class names of a class definition, in declaration order.
pub(crate) fn superclasses(ts: TsNode, bytes: &[u8]) -> Vec<String> {
    let Some(args) = ts.child_by_field_name("superclasses") else {
        return Vec::new();
    };
    (0..args.named_child_count())
        .filter_map(|i| args.named_child(i))
        .filter(|a| !matches!(a.kind(), "keyword_argument" | "comment"))
        .filter_map(|a| text_of(bytes, a))
        .filter_map(simple_type_name)
        .collect()
}

fn is_async(ts: TsNode) -> bool {
    ts.child(0).is_some_and(|c| c.kind() == "async")
}

/// Hand-written adapter over the Python grammar.
#[derive(Debug, Default)]
pub struct PythonAdapter;

impl PythonAdapter {
    pub fn new() -> Self {
        Self
    }

    fn build(&self, ts: TsNode, kind: NodeKind, path: &str, bytes: &[u8]) -> Node {
        let location = location_for(ts, path);
        let id = ids::node_id(&[
            &path,
            &location.start_line,
            &location.start_column,
            &ts.kind(),
        ]);
        let mut node = Node::new(id, kind, node_name(ts, bytes), Language::Python, location);
        node.native_kind = Some(ts.kind().to_string());

        match kind {
            NodeKind::Function => {
                node.is_async = is_async(ts);
                node.parameters = properties::parameters(ts, bytes);
                node.return_type = properties::return_type(ts, bytes);
                node.call_names = collect_call_names(Grammar::Python, bytes, ts);
                apply_decorators(&mut node, &decorators_of(ts, bytes));
            }
            NodeKind::Class => {
                let mut bases = superclasses(ts, bytes).into_iter();
                node.extends = bases.next();
                node.implements.extend(bases);
                apply_decorators(&mut node, &decorators_of(ts, bytes));
            }
            _ => {}
        }

        let (cyclomatic, cognitive) = node_complexity(bytes, ts, kind == NodeKind::Function);
        node.complexity = cyclomatic;
        node.cognitive_complexity = cognitive;
        node
    }
}

impl LanguageAdapter for PythonAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Direct
    }

    fn supports(&self, language: Language) -> bool {
        language == Language::Python
    }

    fn parse_file(
        &self,
        path: &Path,
        content: &str,
        language: Language,
    ) -> Result<File, AdapterError> {
        if !self.supports(language) {
            return Err(AdapterError::UnsupportedLanguage {
                path: path.to_path_buf(),
                language,
            });
        }
        let path_str = ids::normalize_path_for_id(path);
        let tree = parse_tree(Grammar::Python, path, content)?;
        let nodes = self.extract_nodes(&tree, content, &path_str, Grammar::Python);
        let root = tree.root_node();
        let imports = imports::extract_imports(Grammar::Python, root, content.as_bytes());

        if is_unrecoverable(&tree, &nodes, &imports) {
            return Err(AdapterError::ParseFailure {
                path: path.to_path_buf(),
                reason: "syntax errors left no recoverable nodes".to_string(),
            });
        }

        let extraction = Extraction {
            root,
            nodes,
            imports,
            exports: Vec::new(),
        };
        Ok(assemble_file(
            &path_str,
            Language::Python,
            content,
            extraction,
            AdapterKind::Direct,
            COMMENT_MARKERS,
        ))
    }

    fn extract_nodes(&self, tree: &Tree, source: &str, path: &str, grammar: Grammar) -> Vec<Node> {
        if grammar != Grammar::Python {
            return Vec::new();
        }
        let bytes = source.as_bytes();
        let mut nodes: Vec<Node> = Vec::new();
        let mut stack: Vec<(TsNode, Option<usize>)> = vec![(tree.root_node(), None)];

        while let Some((ts, parent)) = stack.pop() {
            let mut owner = parent;
            if ts.is_named() {
                if let Some(kind) = kind_for(ts.kind()) {
                    let mut node = self.build(ts, kind, path, bytes);
                    node.parent_id = parent.map(|p| nodes[p].id.clone());
                    nodes.push(node);
                    owner = Some(nodes.len() - 1);
                }
            }
            for i in (0..ts.named_child_count()).rev() {
                if let Some(child) = ts.named_child(i) {
                    stack.push((child, owner));
                }
            }
        }

        hierarchy::link_children(&mut nodes);
        hierarchy::refine_member_kinds(&mut nodes);
        nodes
    }
}
