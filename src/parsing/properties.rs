//! Node construction shared by the query and structural strategies.
//!
//! Properties are read with keyword scans over a node's header text and a
//! handful of field lookups; nothing here resolves types.

use super::{
    collect_call_names, first_ident_of, first_identifier, location_for, node_complexity, python,
    text_of,
};
use crate::ids;
use crate::language::Grammar;
use crate::types::*;
use serde_json::json;
use tree_sitter::Node as TsNode;

/// Per-file inputs for node construction.
#[derive(Clone, Copy)]
pub(crate) struct NodeContext<'a> {
    pub path: &'a str,
    pub bytes: &'a [u8],
    pub grammar: Grammar,
}

/// Build a canonical node for `ts` with the given kind and name.
pub(crate) fn build_node(
    ctx: NodeContext<'_>,
    ts: TsNode<'_>,
    kind: NodeKind,
    name: Option<String>,
) -> Node {
    let kind = refine_kind(ts, kind);
    let location = location_for(ts, ctx.path);
    let label = name.clone().unwrap_or_else(|| ts.kind().to_string());
    let id = ids::node_id(&[
        &ctx.path,
        &label,
        &location.start_line,
        &location.start_column,
        &ts.start_byte(),
    ]);

    let mut node = Node::new(id, kind, name, ctx.grammar.language(), location);
    node.native_kind = Some(ts.kind().to_string());

    let header = header_text(ts, ctx.bytes);
    let tokens = header_tokens(header);
    apply_modifiers(&mut node, ts, ctx.bytes, &tokens);
    if kind != NodeKind::Import && kind != NodeKind::Export {
        node.access_level = visibility(ctx.grammar, header, &tokens, node.name());
    }

    if kind.is_callable() {
        let signature = function_value(ts).unwrap_or(ts);
        node.parameters = parameters(signature, ctx.bytes);
        node.return_type = return_type(signature, ctx.bytes);
        node.call_names = collect_call_names(ctx.grammar, ctx.bytes, ts);
    }

    if kind.is_class_like() {
        heritage(ts, ctx.bytes).apply(&mut node);
        if let Some(trait_name) = impl_trait(ts, ctx.bytes) {
            node.implements.insert(trait_name);
        }
    }

    if ctx.grammar == Grammar::Python {
        let decorators = python::decorators_of(ts, ctx.bytes);
        python::apply_decorators(&mut node, &decorators);
    }

    let (cyclomatic, cognitive) = node_complexity(ctx.bytes, ts, kind.is_callable());
    node.complexity = cyclomatic;
    node.cognitive_complexity = cognitive;
    node
}

/// Go type specs become structs or interfaces from their underlying type;
/// `const f = () => ...` declarators become functions.
fn refine_kind(ts: TsNode, kind: NodeKind) -> NodeKind {
    if function_value(ts).is_some() {
        return NodeKind::Function;
    }
    if ts.kind() != "type_spec" {
        return kind;
    }
    match ts.child_by_field_name("type").map(|t| t.kind()) {
        Some("struct_type") => NodeKind::Struct,
        Some("interface_type") => NodeKind::Interface,
        _ => kind,
    }
}

const FUNCTION_VALUE_KINDS: &[&str] = &["arrow_function", "function_expression", "function"];

/// The function a variable declarator is initialized with.
fn function_value<'t>(ts: TsNode<'t>) -> Option<TsNode<'t>> {
    if ts.kind() != "variable_declarator" {
        return None;
    }
    ts.child_by_field_name("value")
        .filter(|v| FUNCTION_VALUE_KINDS.contains(&v.kind()))
}

/// Name of a node found by the structural walk.
pub(crate) fn structural_name(ts: TsNode, bytes: &[u8]) -> Option<String> {
    if ts.kind() == "impl_item" {
        return ts
            .child_by_field_name("type")
            .and_then(|t| text_of(bytes, t))
            .and_then(first_ident_of)
            .map(str::to_string);
    }
    if let Some(name) = ts
        .child_by_field_name("name")
        .or_else(|| ts.child_by_field_name("left"))
    {
        if let Some(text) = text_of(bytes, name) {
            return Some(text.to_string());
        }
    }
    first_identifier(bytes, ts)
}

/// Text of the declaration up to its body, or its first line.
fn header_text<'a>(ts: TsNode, bytes: &'a [u8]) -> &'a str {
    let start = ts.start_byte();
    let end = match ts.child_by_field_name("body") {
        Some(body) => body.start_byte(),
        None => {
            let text = &bytes[start..ts.end_byte()];
            start + text.iter().position(|b| *b == b'\n').unwrap_or(text.len())
        }
    };
    std::str::from_utf8(&bytes[start..end.max(start)]).unwrap_or("")
}

fn header_tokens(header: &str) -> Vec<&str> {
    header
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| !t.is_empty())
        .collect()
}

fn apply_modifiers(node: &mut Node, ts: TsNode, bytes: &[u8], tokens: &[&str]) {
    for token in tokens {
        match *token {
            "static" => node.is_static = true,
            "async" => node.is_async = true,
            "abstract" => node.is_abstract = true,
            "final" | "sealed" => node.is_final = true,
            "const" | "readonly" => node.is_const = true,
            _ => {}
        }
    }
    if ts.kind() == "abstract_class_declaration" {
        node.is_abstract = true;
    }
    if node.kind == NodeKind::Constant {
        node.is_const = true;
    }
    // `const x = ...` puts the keyword on the enclosing declaration.
    if let Some(parent) = ts.parent() {
        if parent.kind() == "lexical_declaration" {
            let keyword = parent.child(0).and_then(|k| text_of(bytes, k));
            if keyword == Some("const") {
                node.is_const = true;
            }
        }
    }
}

fn visibility(
    grammar: Grammar,
    header: &str,
    tokens: &[&str],
    name: Option<&str>,
) -> Option<AccessLevel> {
    for token in tokens {
        match *token {
            "public" => return Some(AccessLevel::Public),
            "private" => return Some(AccessLevel::Private),
            "protected" => return Some(AccessLevel::Protected),
            "internal" => return Some(AccessLevel::Internal),
            _ => {}
        }
    }
    match grammar {
        Grammar::Rust => {
            let header = header.trim_start();
            if header.starts_with("pub(") || header.starts_with("pub (") {
                Some(AccessLevel::Internal)
            } else if tokens.first() == Some(&"pub") {
                Some(AccessLevel::Public)
            } else {
                Some(AccessLevel::Private)
            }
        }
        Grammar::Go => {
            let first = name?.chars().next()?;
            Some(if first.is_uppercase() {
                AccessLevel::Public
            } else {
                AccessLevel::Package
            })
        }
        _ => None,
    }
}

// ============================================================================
// Signatures
// ============================================================================

const PARAMETER_LIST_KINDS: &[&str] = &["parameters", "formal_parameters", "parameter_list"];

fn parameter_list<'t>(ts: TsNode<'t>) -> Option<TsNode<'t>> {
    if let Some(list) = ts.child_by_field_name("parameters") {
        return Some(list);
    }
    for i in 0..ts.named_child_count() {
        if let Some(child) = ts.named_child(i) {
            if PARAMETER_LIST_KINDS.contains(&child.kind()) {
                return Some(child);
            }
        }
    }
    None
}

fn strip_annotation(text: &str) -> String {
    text.trim()
        .trim_start_matches(':')
        .trim_start_matches("->")
        .trim()
        .to_string()
}

/// Declared parameters of a function-like node.
pub(crate) fn parameters(ts: TsNode, bytes: &[u8]) -> Vec<Parameter> {
    let Some(list) = parameter_list(ts) else {
        return Vec::new();
    };
    let mut params = Vec::new();
    for i in 0..list.named_child_count() {
        let Some(param) = list.named_child(i) else {
            continue;
        };
        if param.kind().contains("comment") {
            continue;
        }
        let name = match param.kind() {
            "identifier" => text_of(bytes, param).map(str::to_string),
            "self_parameter" => Some("self".to_string()),
            _ => param
                .child_by_field_name("name")
                .or_else(|| param.child_by_field_name("pattern"))
                .and_then(|n| text_of(bytes, n))
                .map(str::to_string)
                .or_else(|| first_identifier(bytes, param)),
        };
        let Some(name) = name else {
            continue;
        };
        let type_annotation = param
            .child_by_field_name("type")
            .and_then(|t| text_of(bytes, t))
            .map(strip_annotation);
        let default_value = param
            .child_by_field_name("value")
            .and_then(|v| text_of(bytes, v))
            .map(str::to_string);
        params.push(Parameter {
            name,
            type_annotation,
            default_value,
        });
    }
    params
}

/// Declared return type text.
pub(crate) fn return_type(ts: TsNode, bytes: &[u8]) -> Option<String> {
    ts.child_by_field_name("return_type")
        .or_else(|| ts.child_by_field_name("result"))
        .and_then(|t| text_of(bytes, t))
        .map(strip_annotation)
        .filter(|t| !t.is_empty())
}

// ============================================================================
// Inheritance
// ============================================================================

/// Drop generic arguments and qualification: `a.b.Base<T>` -> `Base`.
pub(crate) fn simple_type_name(text: &str) -> Option<String> {
    let mut depth = 0usize;
    let mut plain = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' | '[' => depth += 1,
            '>' | ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => plain.push(c),
            _ => {}
        }
    }
    plain
        .split(['.', ':'])
        .filter(|s| !s.trim().is_empty())
        .last()
        .map(|s| s.trim().to_string())
        .filter(|s| s.chars().all(|c| c.is_alphanumeric() || c == '_'))
}

/// Supertypes of a class-like node.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Supertypes {
    pub extends: Vec<String>,
    pub implements: Vec<String>,
}

impl Supertypes {
    /// First extended type wins; any further ones count as implemented.
    fn apply(self, node: &mut Node) {
        let mut extends = self.extends.into_iter();
        node.extends = extends.next();
        node.implements.extend(extends);
        node.implements.extend(self.implements);
    }
}

/// Parse `extends A implements B, C` clause text.
pub(crate) fn parse_heritage_clause(text: &str) -> Supertypes {
    let mut supertypes = Supertypes::default();
    let mut in_implements = false;
    let mut depth = 0usize;
    let mut current = String::new();

    let mut flush = |word: &mut String, in_implements: bool| {
        if let Some(name) = simple_type_name(word.trim()) {
            if in_implements {
                supertypes.implements.push(name);
            } else {
                supertypes.extends.push(name);
            }
        }
        word.clear();
    };

    for c in text.chars() {
        match c {
            '<' => {
                depth += 1;
                current.push(c);
            }
            '>' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' | ' ' | '\t' | '\n' | '{' if depth == 0 => {
                let keyword = match current.trim() {
                    "extends" => Some(false),
                    "implements" => Some(true),
                    _ => None,
                };
                match keyword {
                    Some(implements) => {
                        in_implements = implements;
                        current.clear();
                    }
                    None => flush(&mut current, in_implements),
                }
            }
            _ => current.push(c),
        }
    }
    flush(&mut current, in_implements);
    supertypes
}

fn heritage(ts: TsNode, bytes: &[u8]) -> Supertypes {
    match ts.kind() {
        "class_definition" => Supertypes {
            extends: python::superclasses(ts, bytes),
            implements: Vec::new(),
        },
        "trait_item" => Supertypes {
            extends: ts
                .child_by_field_name("bounds")
                .map(|bounds| {
                    (0..bounds.named_child_count())
                        .filter_map(|i| bounds.named_child(i))
                        .filter_map(|b| text_of(bytes, b))
                        .filter_map(simple_type_name)
                        .collect()
                })
                .unwrap_or_default(),
            implements: Vec::new(),
        },
        _ => (0..ts.child_count())
            .filter_map(|i| ts.child(i))
            .find(|child| matches!(child.kind(), "class_heritage" | "extends_type_clause"))
            .and_then(|child| text_of(bytes, child))
            .map(parse_heritage_clause)
            .unwrap_or_default(),
    }
}

/// Trait implemented by a Rust `impl Trait for Type` block.
fn impl_trait(ts: TsNode, bytes: &[u8]) -> Option<String> {
    if ts.kind() != "impl_item" {
        return None;
    }
    ts.child_by_field_name("trait")
        .and_then(|t| text_of(bytes, t))
        .and_then(simple_type_name)
}

/// Record free-form annotations as a JSON string list.
pub(crate) fn set_string_list(node: &mut Node, key: &str, values: &[String]) {
    if !values.is_empty() {
        node.annotations.insert(key.to_string(), json!(values));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_type_name() {
        assert_eq!(simple_type_name("Base"), Some("Base".into()));
        assert_eq!(simple_type_name("models.Model"), Some("Model".into()));
        assert_eq!(simple_type_name("Repo<User, Id>"), Some("Repo".into()));
        assert_eq!(simple_type_name("std::fmt::Display"), Some("Display".into()));
        assert_eq!(simple_type_name("metaclass=ABCMeta"), None);
    }

    #[test]
    fn test_parse_heritage_clause() {
        let parsed = parse_heritage_clause("extends Base<T> implements IFoo, IBar");
        assert_eq!(parsed.extends, vec!["Base".to_string()]);
        assert_eq!(parsed.implements, vec!["IFoo".to_string(), "IBar".to_string()]);

        let parsed = parse_heritage_clause("extends React.Component");
        assert_eq!(parsed.extends, vec!["Component".to_string()]);
        assert!(parsed.implements.is_empty());

        let parsed = parse_heritage_clause("implements Runnable");
        assert!(parsed.extends.is_empty());
        assert_eq!(parsed.implements, vec!["Runnable".to_string()]);
    }

    #[test]
    fn test_header_tokens() {
        assert_eq!(
            header_tokens("pub(crate) async fn run(x: u8)"),
            vec!["pub", "crate", "async", "fn", "run", "x", "u8"]
        );
    }
}
