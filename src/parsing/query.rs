//! Query-driven multi-language adapter.
//!
//! Strategy per file:
//! 1. run the grammar's compiled query once and build a node per match;
//! 2. if that yields nothing (no query, compile failure, or zero matches),
//!    walk the whole tree with the grammar's node-type table.
//!
//! Either way the flat node list goes through the hierarchy pass.

use super::grammar::{self, capture_kind};
use super::properties::{NodeContext, build_node, structural_name};
use super::{
    AdapterKind, COMMENT_MARKERS, Extraction, LanguageAdapter, Visit, assemble_file,
    first_ident_of, first_identifier, hierarchy, imports, is_unrecoverable, parse_tree, text_of,
    walk_tree,
};
use crate::error::AdapterError;
use crate::ids;
use crate::language::Grammar;
use crate::types::*;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tree_sitter::{Query, QueryCursor, StreamingIterator, Tree};

/// Adapter for every grammar with a profile.
pub struct QueryAdapter {
    queries: HashMap<Grammar, Query>,
    use_queries: bool,
}

impl QueryAdapter {
    /// Compile every grammar's query up front.
    pub fn new() -> Self {
        let mut queries = HashMap::new();
        for grammar in Grammar::ALL {
            if let Some(query) = compile(grammar) {
                queries.insert(grammar, query);
            }
        }
        Self {
            queries,
            use_queries: true,
        }
    }

    /// An adapter that always uses the structural walk.
    pub fn structural_only() -> Self {
        Self {
            queries: HashMap::new(),
            use_queries: false,
        }
    }

    pub fn has_query(&self, grammar: Grammar) -> bool {
        self.use_queries && self.queries.contains_key(&grammar)
    }

    fn query_nodes(&self, query: &Query, tree: &Tree, ctx: NodeContext<'_>) -> Vec<Node> {
        let mut nodes = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(query, tree.root_node(), ctx.bytes);

        while let Some(m) = matches.next() {
            let mut target = None;
            let mut name_node = None;
            for capture in m.captures {
                let capture_name = query.capture_names()[capture.index as usize];
                if capture_name == "name" {
                    name_node = Some(capture.node);
                } else if let Some(kind) = capture_kind(capture_name) {
                    target = Some((capture.node, kind));
                }
            }
            let Some((ts, kind)) = target else {
                continue;
            };

            let name = match name_node {
                Some(n) if ts.kind() == "impl_item" => text_of(ctx.bytes, n)
                    .and_then(first_ident_of)
                    .map(str::to_string),
                Some(n) => text_of(ctx.bytes, n).map(str::to_string),
                None => first_identifier(ctx.bytes, ts),
            };
            if name.is_none() && !matches!(kind, NodeKind::Import | NodeKind::Export) {
                continue;
            }
            if !seen.insert((ts.start_byte(), ts.end_byte(), kind)) {
                continue;
            }
            nodes.push(build_node(ctx, ts, kind, name));
        }
        nodes
    }

    fn walk_nodes(&self, tree: &Tree, ctx: NodeContext<'_>) -> Vec<Node> {
        let profile = grammar::profile(ctx.grammar);
        let mut nodes = Vec::new();
        walk_tree(tree.root_node(), |ts| {
            if !ts.is_named() {
                return Visit::Skip;
            }
            if let Some(kind) = profile.kind_for(ts.kind()) {
                let name = structural_name(ts, ctx.bytes);
                if name.is_some() || matches!(kind, NodeKind::Import | NodeKind::Export) {
                    nodes.push(build_node(ctx, ts, kind, name));
                }
            }
            Visit::Descend
        });
        nodes
    }
}

impl Default for QueryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn compile(grammar: Grammar) -> Option<Query> {
    let source = grammar::profile(grammar).query?;
    match Query::new(&grammar.ts_language(), source) {
        Ok(query) => Some(query),
        Err(e) => {
            tracing::warn!("Query for {:?} failed to compile, using tree walk: {}", grammar, e);
            None
        }
    }
}

impl LanguageAdapter for QueryAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Query
    }

    fn supports(&self, language: Language) -> bool {
        crate::language::has_grammar(language)
    }

    fn parse_file(
        &self,
        path: &Path,
        content: &str,
        language: Language,
    ) -> Result<File, AdapterError> {
        let grammar = Grammar::for_language(language, path).ok_or_else(|| {
            AdapterError::UnsupportedLanguage {
                path: path.to_path_buf(),
                language,
            }
        })?;
        let path_str = ids::normalize_path_for_id(path);
        let tree = parse_tree(grammar, path, content)?;
        let nodes = self.extract_nodes(&tree, content, &path_str, grammar);

        let root = tree.root_node();
        let bytes = content.as_bytes();
        let imports = imports::extract_imports(grammar, root, bytes);
        let exports = imports::extract_exports(grammar, root, bytes);

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
            exports,
        };
        Ok(assemble_file(
            &path_str,
            grammar.language(),
            content,
            extraction,
            AdapterKind::Query,
            COMMENT_MARKERS,
        ))
    }

    fn extract_nodes(&self, tree: &Tree, source: &str, path: &str, grammar: Grammar) -> Vec<Node> {
        let ctx = NodeContext {
            path,
            bytes: source.as_bytes(),
            grammar,
        };

        let mut nodes = match self.queries.get(&grammar) {
            Some(query) if self.use_queries => self.query_nodes(query, tree, ctx),
            _ => Vec::new(),
        };
        if nodes.is_empty() {
            tracing::debug!("No query matches for {}, walking tree", path);
            nodes = self.walk_nodes(tree, ctx);
        }

        hierarchy::build_hierarchy(&mut nodes);
        hierarchy::refine_member_kinds(&mut nodes);
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(adapter: &QueryAdapter, path: &str, src: &str) -> File {
        let path = Path::new(path);
        let language = crate::language::detect_language(path);
        adapter.parse_file(path, src, language).unwrap()
    }

    fn named<'a>(file: &'a File, name: &str, kind: NodeKind) -> &'a Node {
        file.nodes
            .iter()
            .find(|n| n.name() == Some(name) && n.kind == kind)
            .unwrap_or_else(|| panic!("no {kind} named {name}"))
    }

    const PYTHON_SRC: &str = r#"import os

class Base:
    pass

class Child(Base):
    def __init__(self):
        self.x = 1

    def run(self, n):
        if n > 1:
            return helper(n)
        return 0

def helper(n):
    return n * 2
"#;

    #[test]
    fn test_python_via_query() {
        let adapter = QueryAdapter::new();
        assert!(adapter.has_query(Grammar::Python));
        let file = parse(&adapter, "app.py", PYTHON_SRC);

        let child = named(&file, "Child", NodeKind::Class);
        assert_eq!(child.extends.as_deref(), Some("Base"));
        let init = named(&file, "__init__", NodeKind::Constructor);
        assert_eq!(init.parent_id.as_deref(), Some(child.id.as_str()));
        let run = named(&file, "run", NodeKind::Method);
        assert_eq!(run.call_names, vec!["helper".to_string()]);
        assert!(run.complexity >= 2.0);
        named(&file, "helper", NodeKind::Function);
        assert_eq!(file.imports, vec!["os"]);
        assert_eq!(file.adapter.as_deref(), Some("query"));
    }

    #[test]
    fn test_structural_walk_finds_the_same_symbols() {
        let query = parse(&QueryAdapter::new(), "app.py", PYTHON_SRC);
        let walked = parse(&QueryAdapter::structural_only(), "app.py", PYTHON_SRC);

        let names = |f: &File| {
            let mut v: Vec<(String, NodeKind)> = f
                .nodes
                .iter()
                .filter(|n| n.kind.is_callable() || n.kind.is_class_like())
                .filter_map(|n| Some((n.name()?.to_string(), n.kind)))
                .collect();
            v.sort();
            v
        };
        assert_eq!(names(&query), names(&walked));
    }

    #[test]
    fn test_javascript_classes() {
        let src = r#"import { helper } from './util';
class Animal {
  speak() { return helper(); }
}
class Dog extends Animal {
  constructor(name) { super(name); this.name = name; }
  static create() { return new Dog('rex'); }
}
const run = async () => Dog.create();
export { run };
"#;
        let file = parse(&QueryAdapter::new(), "zoo.js", src);
        let dog = named(&file, "Dog", NodeKind::Class);
        assert_eq!(dog.extends.as_deref(), Some("Animal"));
        named(&file, "constructor", NodeKind::Constructor);
        let create = named(&file, "create", NodeKind::Method);
        assert!(create.is_static);
        assert_eq!(create.call_names, vec!["Dog".to_string()]);
        let speak = named(&file, "speak", NodeKind::Method);
        assert_eq!(speak.call_names, vec!["helper".to_string()]);
        let run = named(&file, "run", NodeKind::Function);
        assert!(run.is_async);
        assert!(run.is_const);
        assert_eq!(run.call_names, vec!["create".to_string()]);
        assert_eq!(file.imports, vec!["./util"]);
        assert_eq!(file.exports, vec!["run"]);
    }

    #[test]
    fn test_typescript_interfaces() {
        let src = r#"export interface Repo<T> extends Base, Closeable {
  find(id: string): T;
}
export abstract class UserRepo extends BaseRepo<User> implements Repo<User> {
  public async find(id: string): Promise<User> { return this.load(id); }
}
export enum Color { Red, Green }
"#;
        let file = parse(&QueryAdapter::new(), "repo.ts", src);
        let repo = named(&file, "Repo", NodeKind::Interface);
        assert_eq!(repo.extends.as_deref(), Some("Base"));
        assert!(repo.implements.contains("Closeable"));

        let user_repo = named(&file, "UserRepo", NodeKind::Class);
        assert!(user_repo.is_abstract);
        assert_eq!(user_repo.extends.as_deref(), Some("BaseRepo"));
        assert!(user_repo.implements.contains("Repo"));

        let find = file
            .nodes
            .iter()
            .find(|n| n.name() == Some("find") && n.parent_id.as_deref() == Some(&user_repo.id))
            .unwrap();
        assert_eq!(find.kind, NodeKind::Method);
        assert!(find.is_async);
        assert_eq!(find.access_level, Some(AccessLevel::Public));
        assert_eq!(find.parameters[0].name, "id");
        assert_eq!(find.parameters[0].type_annotation.as_deref(), Some("string"));
        assert_eq!(find.return_type.as_deref(), Some("Promise<User>"));

        named(&file, "Color", NodeKind::Enum);
        assert_eq!(file.exports, vec!["Repo", "UserRepo", "Color"]);
    }

    #[test]
    fn test_go_types_and_methods() {
        let src = r#"package main

import "fmt"

type Shape interface {
	Area() float64
}

type Rect struct {
	W, H float64
}

func (r Rect) Area() float64 {
	return r.W * r.H
}

func helper() {
	fmt.Println(NewRect())
}
"#;
        let file = parse(&QueryAdapter::new(), "main.go", src);
        let shape = named(&file, "Shape", NodeKind::Interface);
        assert_eq!(shape.access_level, Some(AccessLevel::Public));
        named(&file, "Rect", NodeKind::Struct);
        named(&file, "Area", NodeKind::Method);
        let helper = named(&file, "helper", NodeKind::Function);
        assert_eq!(helper.access_level, Some(AccessLevel::Package));
        assert_eq!(
            helper.call_names,
            vec!["Println".to_string(), "NewRect".to_string()]
        );
        assert_eq!(file.imports, vec!["fmt"]);
    }

    #[test]
    fn test_rust_items() {
        let src = r#"use std::fmt::{self, Display};

pub struct Point { x: i32 }

pub trait Shape: Display { fn area(&self) -> f64; }

impl Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.x) }
}

impl Point {
    pub fn new(x: i32) -> Self { Point { x } }
    pub(crate) fn norm(&self) -> i32 { helper(self.x) }
}

fn helper(v: i32) -> i32 { v.abs() }
"#;
        let file = parse(&QueryAdapter::new(), "geo.rs", src);
        let point = named(&file, "Point", NodeKind::Struct);
        assert_eq!(point.access_level, Some(AccessLevel::Public));

        let shape = named(&file, "Shape", NodeKind::Trait);
        assert_eq!(shape.extends.as_deref(), Some("Display"));
        let area = named(&file, "area", NodeKind::Method);
        assert_eq!(area.parent_id.as_deref(), Some(shape.id.as_str()));

        let display_impl = file
            .nodes
            .iter()
            .find(|n| n.kind == NodeKind::Class && n.implements.contains("Display"))
            .unwrap();
        assert_eq!(display_impl.name(), Some("Point"));

        let norm = named(&file, "norm", NodeKind::Method);
        assert_eq!(norm.access_level, Some(AccessLevel::Internal));
        assert_eq!(norm.call_names, vec!["helper".to_string()]);
        assert_eq!(norm.parameters[0].name, "self");

        let helper = named(&file, "helper", NodeKind::Function);
        assert_eq!(helper.access_level, Some(AccessLevel::Private));
        assert_eq!(helper.return_type.as_deref(), Some("i32"));
        assert_eq!(file.imports, vec!["std::fmt", "std::fmt::Display"]);
    }

    #[test]
    fn test_empty_and_unsupported() {
        let adapter = QueryAdapter::new();
        let file = parse(&adapter, "empty.ts", "");
        assert!(file.nodes.is_empty());
        assert_eq!(file.total_lines, 0);

        let err = adapter
            .parse_file(Path::new("A.java"), "class A {}", Language::Java)
            .unwrap_err();
        assert!(matches!(err, AdapterError::UnsupportedLanguage { .. }));
    }

    #[test]
    fn test_ids_unique_within_file() {
        let file = parse(&QueryAdapter::new(), "app.py", PYTHON_SRC);
        let ids: HashSet<_> = file.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids.len(), file.nodes.len());
    }
}
