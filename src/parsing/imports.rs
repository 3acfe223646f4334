//! Raw import and export names per grammar.
//!
//! Imports are kept as written (`os.path`, `./utils`, `std::fmt::Write`);
//! the engine resolves them by their final component.

use super::{Visit, text_of, walk_tree};
use crate::language::Grammar;
use tree_sitter::Node as TsNode;

fn strip_quotes(s: &str) -> String {
    s.trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .to_string()
}

/// All imports declared in the tree, in document order.
pub fn extract_imports(grammar: Grammar, root: TsNode, bytes: &[u8]) -> Vec<String> {
    let mut imports = Vec::new();
    walk_tree(root, |node| {
        match (grammar, node.kind()) {
            (Grammar::Python, "import_statement" | "import_from_statement") => {
                python_import(node, bytes, &mut imports);
                Visit::Skip
            }
            (Grammar::JavaScript | Grammar::TypeScript | Grammar::Tsx, "import_statement") => {
                if let Some(source) = node.child_by_field_name("source") {
                    if let Some(text) = text_of(bytes, source) {
                        imports.push(strip_quotes(text));
                    }
                }
                Visit::Skip
            }
            (Grammar::Go, "import_spec") => {
                if let Some(path) = node.child_by_field_name("path") {
                    if let Some(text) = text_of(bytes, path) {
                        imports.push(strip_quotes(text));
                    }
                }
                Visit::Skip
            }
            (Grammar::Rust, "use_declaration") => {
                if let Some(arg) = node.child_by_field_name("argument") {
                    extract_use_tree(arg, bytes, "", &mut imports);
                }
                Visit::Skip
            }
            _ => Visit::Descend,
        }
    });
    imports
}

fn python_import(node: TsNode, bytes: &[u8], imports: &mut Vec<String>) {
    let mut cursor = node.walk();
    let names: Vec<String> = node
        .children_by_field_name("name", &mut cursor)
        .filter_map(|n| {
            let target = if n.kind() == "aliased_import" {
                n.child_by_field_name("name")?
            } else {
                n
            };
            text_of(bytes, target).map(str::to_string)
        })
        .collect();

    if node.kind() == "import_statement" {
        imports.extend(names);
        return;
    }

    let module = node
        .child_by_field_name("module_name")
        .and_then(|m| text_of(bytes, m))
        .unwrap_or("");
    let base = module.trim_end_matches('.');
    let has_wildcard = (0..node.named_child_count())
        .filter_map(|i| node.named_child(i))
        .any(|c| c.kind() == "wildcard_import");

    let join = |name: &str| {
        if base.is_empty() {
            name.to_string()
        } else {
            format!("{base}.{name}")
        }
    };
    if has_wildcard {
        imports.push(join("*"));
    }
    for name in names {
        imports.push(join(&name));
    }
}

/// Flatten a Rust use tree into `a::b::c` paths.
fn extract_use_tree(node: TsNode, bytes: &[u8], prefix: &str, imports: &mut Vec<String>) {
    let join = |text: &str| {
        if prefix.is_empty() {
            text.to_string()
        } else {
            format!("{prefix}::{text}")
        }
    };

    match node.kind() {
        // `use a::b::{self, C}` imports `a::b` itself
        "self" if !prefix.is_empty() => imports.push(prefix.to_string()),
        "scoped_identifier" | "identifier" | "crate" | "self" | "super" => {
            if let Some(text) = text_of(bytes, node) {
                imports.push(join(text));
            }
        }
        "use_as_clause" => {
            if let Some(path) = node.child_by_field_name("path") {
                extract_use_tree(path, bytes, prefix, imports);
            }
        }
        "use_wildcard" => {
            let text = text_of(bytes, node).unwrap_or("*");
            imports.push(join(text));
        }
        "scoped_use_list" => {
            let path = node
                .child_by_field_name("path")
                .and_then(|p| text_of(bytes, p))
                .map(|p| join(p))
                .unwrap_or_else(|| prefix.to_string());
            if let Some(list) = node.child_by_field_name("list") {
                extract_use_tree(list, bytes, &path, imports);
            }
        }
        "use_list" => {
            for i in 0..node.named_child_count() {
                if let Some(child) = node.named_child(i) {
                    extract_use_tree(child, bytes, prefix, imports);
                }
            }
        }
        _ => {}
    }
}

/// Names exported by JavaScript/TypeScript `export` statements.
pub fn extract_exports(grammar: Grammar, root: TsNode, bytes: &[u8]) -> Vec<String> {
    if !matches!(
        grammar,
        Grammar::JavaScript | Grammar::TypeScript | Grammar::Tsx
    ) {
        return Vec::new();
    }
    let mut exports = Vec::new();
    walk_tree(root, |node| {
        if node.kind() != "export_statement" {
            return Visit::Descend;
        }
        export_names(node, bytes, &mut exports);
        Visit::Skip
    });
    exports
}

fn export_names(node: TsNode, bytes: &[u8], exports: &mut Vec<String>) {
    let text = text_of(bytes, node).unwrap_or("");
    if text.starts_with("export default") {
        exports.push("default".to_string());
        return;
    }

    if let Some(decl) = node.child_by_field_name("declaration") {
        if let Some(name) = decl.child_by_field_name("name").and_then(|n| text_of(bytes, n)) {
            exports.push(name.to_string());
            return;
        }
        // `export const a = 1, b = 2`
        for i in 0..decl.named_child_count() {
            let Some(child) = decl.named_child(i) else { continue };
            if child.kind() == "variable_declarator" {
                let name = child
                    .child_by_field_name("name")
                    .and_then(|n| text_of(bytes, n));
                if let Some(name) = name {
                    exports.push(name.to_string());
                }
            }
        }
        return;
    }

    let mut found = false;
    walk_tree(node, |n| {
        if n.kind() == "export_specifier" {
            let exported = n
                .child_by_field_name("alias")
                .or_else(|| n.child_by_field_name("name"))
                .and_then(|x| text_of(bytes, x));
            if let Some(name) = exported {
                exports.push(name.to_string());
                found = true;
            }
            return Visit::Skip;
        }
        Visit::Descend
    });
    if !found && text.contains('*') {
        exports.push("*".to_string());
    }
}
