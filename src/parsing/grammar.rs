//! Per-grammar tables: query patterns, structural node-type maps and call
//! expression shapes.

use crate::language::Grammar;
use crate::types::NodeKind;

/// Static description of how to read one grammar.
#[derive(Debug)]
pub struct GrammarProfile {
    pub grammar: Grammar,
    /// Declarative pattern. Every pattern has one kind capture and an
    /// optional `@name` capture.
    pub query: Option<&'static str>,
    /// Structural fallback: native node type to canonical kind.
    pub node_kinds: &'static [(&'static str, NodeKind)],
    /// Call expression kinds and the field holding the callee.
    pub calls: &'static [(&'static str, &'static str)],
}

impl GrammarProfile {
    pub fn kind_for(&self, native: &str) -> Option<NodeKind> {
        self.node_kinds
            .iter()
            .find(|(k, _)| *k == native)
            .map(|(_, kind)| *kind)
    }

    /// Definitions that own their own call lists.
    pub fn is_definition(&self, native: &str) -> bool {
        self.kind_for(native)
            .is_some_and(|k| k.is_callable() || k.is_class_like() || k == NodeKind::Module)
    }

    pub fn callee_field(&self, native: &str) -> Option<&'static str> {
        self.calls
            .iter()
            .find(|(k, _)| *k == native)
            .map(|(_, field)| *field)
    }
}

/// Canonical kind of a query capture name.
pub fn capture_kind(capture: &str) -> Option<NodeKind> {
    Some(match capture {
        "class" | "type" | "impl" => NodeKind::Class,
        "interface" => NodeKind::Interface,
        "function" => NodeKind::Function,
        "method" => NodeKind::Method,
        "variable" => NodeKind::Variable,
        "constant" => NodeKind::Constant,
        "struct" => NodeKind::Struct,
        "enum" => NodeKind::Enum,
        "trait" => NodeKind::Trait,
        "module" => NodeKind::Module,
        "import" => NodeKind::Import,
        "export" => NodeKind::Export,
        _ => return None,
    })
}

/// Constructs counted when computing a node's nesting level.
pub const NESTING_KINDS: &[&str] = &[
    "if_statement",
    "if_expression",
    "while_statement",
    "while_expression",
    "for_statement",
    "for_in_statement",
    "for_expression",
    "loop_expression",
    "try_statement",
    "switch_statement",
    "match_expression",
    "function_definition",
    "function_declaration",
    "function_item",
    "method_definition",
    "method_declaration",
    "arrow_function",
    "closure_expression",
    "func_literal",
    "lambda",
];

/// Function-like constructs; a callable inside one is a nested function.
pub const FUNCTION_KINDS: &[&str] = &[
    "function_definition",
    "function_declaration",
    "function_item",
    "method_definition",
    "method_declaration",
    "arrow_function",
    "function_expression",
    "closure_expression",
    "func_literal",
    "lambda",
];

// ============================================================================
// Python
// ============================================================================

const PYTHON_QUERY: &str = r#"
(class_definition name: (identifier) @name) @class
(function_definition name: (identifier) @name) @function
(assignment left: (identifier) @name) @variable
(import_statement) @import
(import_from_statement) @import
"#;

static PYTHON: GrammarProfile = GrammarProfile {
    grammar: Grammar::Python,
    query: Some(PYTHON_QUERY),
    node_kinds: &[
        ("class_definition", NodeKind::Class),
        ("function_definition", NodeKind::Function),
        ("assignment", NodeKind::Variable),
        ("import_statement", NodeKind::Import),
        ("import_from_statement", NodeKind::Import),
    ],
    calls: &[("call", "function")],
};

// ============================================================================
// JavaScript
// ============================================================================

const JAVASCRIPT_QUERY: &str = r#"
(class_declaration name: (identifier) @name) @class
(function_declaration name: (identifier) @name) @function
(generator_function_declaration name: (identifier) @name) @function
(method_definition name: (property_identifier) @name) @method
(variable_declarator name: (identifier) @name) @variable
(import_statement) @import
(export_statement) @export
"#;

static JAVASCRIPT: GrammarProfile = GrammarProfile {
    grammar: Grammar::JavaScript,
    query: Some(JAVASCRIPT_QUERY),
    node_kinds: &[
        ("class_declaration", NodeKind::Class),
        ("function_declaration", NodeKind::Function),
        ("generator_function_declaration", NodeKind::Function),
        ("method_definition", NodeKind::Method),
        ("variable_declarator", NodeKind::Variable),
        ("import_statement", NodeKind::Import),
        ("export_statement", NodeKind::Export),
    ],
    calls: &[("call_expression", "function"), ("new_expression", "constructor")],
};

// ============================================================================
// TypeScript / TSX
// ============================================================================

const TYPESCRIPT_QUERY: &str = r#"
(class_declaration name: (type_identifier) @name) @class
(abstract_class_declaration name: (type_identifier) @name) @class
(interface_declaration name: (type_identifier) @name) @interface
(enum_declaration name: (identifier) @name) @enum
(type_alias_declaration name: (type_identifier) @name) @type
(function_declaration name: (identifier) @name) @function
(generator_function_declaration name: (identifier) @name) @function
(method_definition name: (property_identifier) @name) @method
(method_signature name: (property_identifier) @name) @method
(variable_declarator name: (identifier) @name) @variable
(import_statement) @import
(export_statement) @export
"#;

const TYPESCRIPT_KINDS: &[(&str, NodeKind)] = &[
    ("class_declaration", NodeKind::Class),
    ("abstract_class_declaration", NodeKind::Class),
    ("interface_declaration", NodeKind::Interface),
    ("enum_declaration", NodeKind::Enum),
    ("type_alias_declaration", NodeKind::Class),
    ("function_declaration", NodeKind::Function),
    ("generator_function_declaration", NodeKind::Function),
    ("method_definition", NodeKind::Method),
    ("method_signature", NodeKind::Method),
    ("variable_declarator", NodeKind::Variable),
    ("import_statement", NodeKind::Import),
    ("export_statement", NodeKind::Export),
];

static TYPESCRIPT: GrammarProfile = GrammarProfile {
    grammar: Grammar::TypeScript,
    query: Some(TYPESCRIPT_QUERY),
    node_kinds: TYPESCRIPT_KINDS,
    calls: &[("call_expression", "function"), ("new_expression", "constructor")],
};

static TSX: GrammarProfile = GrammarProfile {
    grammar: Grammar::Tsx,
    query: Some(TYPESCRIPT_QUERY),
    node_kinds: TYPESCRIPT_KINDS,
    calls: &[("call_expression", "function"), ("new_expression", "constructor")],
};

// ============================================================================
// Go
// ============================================================================

const GO_QUERY: &str = r#"
(type_spec name: (type_identifier) @name) @type
(function_declaration name: (identifier) @name) @function
(method_declaration name: (field_identifier) @name) @method
(var_spec name: (identifier) @name) @variable
(const_spec name: (identifier) @name) @constant
(import_declaration) @import
"#;

static GO: GrammarProfile = GrammarProfile {
    grammar: Grammar::Go,
    query: Some(GO_QUERY),
    node_kinds: &[
        ("type_spec", NodeKind::Class),
        ("function_declaration", NodeKind::Function),
        ("method_declaration", NodeKind::Method),
        ("var_spec", NodeKind::Variable),
        ("const_spec", NodeKind::Constant),
        ("import_declaration", NodeKind::Import),
    ],
    calls: &[("call_expression", "function")],
};

// ============================================================================
// Rust
// ============================================================================

const RUST_QUERY: &str = r#"
(struct_item name: (type_identifier) @name) @struct
(enum_item name: (type_identifier) @name) @enum
(trait_item name: (type_identifier) @name) @trait
(function_item name: (identifier) @name) @function
(function_signature_item name: (identifier) @name) @function
(impl_item type: (_) @name) @impl
(const_item name: (identifier) @name) @constant
(static_item name: (identifier) @name) @variable
(mod_item name: (identifier) @name) @module
(type_item name: (type_identifier) @name) @type
(use_declaration) @import
"#;

static RUST: GrammarProfile = GrammarProfile {
    grammar: Grammar::Rust,
    query: Some(RUST_QUERY),
    node_kinds: &[
        ("struct_item", NodeKind::Struct),
        ("enum_item", NodeKind::Enum),
        ("trait_item", NodeKind::Trait),
        ("function_item", NodeKind::Function),
        ("function_signature_item", NodeKind::Function),
        ("impl_item", NodeKind::Class),
        ("const_item", NodeKind::Constant),
        ("static_item", NodeKind::Variable),
        ("mod_item", NodeKind::Module),
        ("type_item", NodeKind::Class),
        ("use_declaration", NodeKind::Import),
    ],
    calls: &[("call_expression", "function")],
};

/// Profile of a grammar.
pub fn profile(grammar: Grammar) -> &'static GrammarProfile {
    match grammar {
        Grammar::Python => &PYTHON,
        Grammar::JavaScript => &JAVASCRIPT,
        Grammar::TypeScript => &TYPESCRIPT,
        Grammar::Tsx => &TSX,
        Grammar::Go => &GO,
        Grammar::Rust => &RUST,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Query;

    #[test]
    fn test_every_query_compiles() {
        for grammar in Grammar::ALL {
            let profile = profile(grammar);
            assert_eq!(profile.grammar, grammar);
            let source = profile.query.unwrap();
            let query = Query::new(&grammar.ts_language(), source);
            assert!(query.is_ok(), "{grammar:?}: {:?}", query.err());
        }
    }

    #[test]
    fn test_every_capture_is_mapped() {
        for grammar in Grammar::ALL {
            let source = profile(grammar).query.unwrap();
            let query = Query::new(&grammar.ts_language(), source).unwrap();
            for name in query.capture_names() {
                assert!(
                    *name == "name" || capture_kind(name).is_some(),
                    "{grammar:?}: unmapped capture {name}"
                );
            }
        }
    }

    #[test]
    fn test_definition_kinds() {
        let py = profile(Grammar::Python);
        assert!(py.is_definition("function_definition"));
        assert!(py.is_definition("class_definition"));
        assert!(!py.is_definition("assignment"));
        assert_eq!(py.callee_field("call"), Some("function"));
        assert_eq!(py.callee_field("attribute"), None);
    }
}
