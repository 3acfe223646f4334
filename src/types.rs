//! Canonical, language-agnostic model shared by every adapter and the engine.
//!
//! Adapters produce [`File`]s owning flat vectors of [`Node`]s. Nodes refer
//! to each other only by id (`parent_id` / `children_ids`), never by pointer.
//! The engine layers [`Relationship`]s, [`Reference`]s, the call graph and
//! the dependency graph on top.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

// ============================================================================
// Enumerations
// ============================================================================

/// Source language of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Go,
    Rust,
    C,
    Cpp,
    Java,
    CSharp,
    Ruby,
    Php,
    Swift,
    Kotlin,
    Scala,
    Html,
    Css,
    Sql,
    Unknown,
}

impl Language {
    /// Every known language, in declaration order.
    pub const ALL: [Language; 17] = [
        Self::Python,
        Self::JavaScript,
        Self::TypeScript,
        Self::Go,
        Self::Rust,
        Self::C,
        Self::Cpp,
        Self::Java,
        Self::CSharp,
        Self::Ruby,
        Self::Php,
        Self::Swift,
        Self::Kotlin,
        Self::Scala,
        Self::Html,
        Self::Css,
        Self::Sql,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Go => "go",
            Self::Rust => "rust",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::Java => "java",
            Self::CSharp => "csharp",
            Self::Ruby => "ruby",
            Self::Php => "php",
            Self::Swift => "swift",
            Self::Kotlin => "kotlin",
            Self::Scala => "scala",
            Self::Html => "html",
            Self::Css => "css",
            Self::Sql => "sql",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != Self::Unknown
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a canonical node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Project,
    Package,
    Module,
    File,
    Class,
    Interface,
    Trait,
    Enum,
    Struct,
    Function,
    Method,
    Constructor,
    Destructor,
    Lambda,
    Generator,
    Variable,
    Constant,
    Parameter,
    Field,
    Property,
    Conditional,
    Loop,
    Exception,
    Import,
    Export,
    Include,
    Comment,
    Docstring,
    Annotation,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Package => "package",
            Self::Module => "module",
            Self::File => "file",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Trait => "trait",
            Self::Enum => "enum",
            Self::Struct => "struct",
            Self::Function => "function",
            Self::Method => "method",
            Self::Constructor => "constructor",
            Self::Destructor => "destructor",
            Self::Lambda => "lambda",
            Self::Generator => "generator",
            Self::Variable => "variable",
            Self::Constant => "constant",
            Self::Parameter => "parameter",
            Self::Field => "field",
            Self::Property => "property",
            Self::Conditional => "conditional",
            Self::Loop => "loop",
            Self::Exception => "exception",
            Self::Import => "import",
            Self::Export => "export",
            Self::Include => "include",
            Self::Comment => "comment",
            Self::Docstring => "docstring",
            Self::Annotation => "annotation",
        }
    }

    /// Functions, methods and constructors: the call-graph vertices.
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Self::Function | Self::Method | Self::Constructor | Self::Destructor
        )
    }

    /// Kinds that may carry `extends` / `implements` and own methods.
    pub fn is_class_like(&self) -> bool {
        matches!(
            self,
            Self::Class | Self::Interface | Self::Trait | Self::Struct | Self::Enum
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared visibility of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Public,
    Private,
    Protected,
    Internal,
    Package,
    File,
}

/// Kind of a directed relationship between two symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Extends,
    Implements,
    Calls,
    Uses,
    References,
    Instantiates,
    Imports,
    Exports,
    Overrides,
    OverriddenBy,
    Returns,
    Accepts,
    Throws,
    Decorates,
    Annotates,
    Contains,
    ContainedIn,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extends => "extends",
            Self::Implements => "implements",
            Self::Calls => "calls",
            Self::Uses => "uses",
            Self::References => "references",
            Self::Instantiates => "instantiates",
            Self::Imports => "imports",
            Self::Exports => "exports",
            Self::Overrides => "overrides",
            Self::OverriddenBy => "overridden_by",
            Self::Returns => "returns",
            Self::Accepts => "accepts",
            Self::Throws => "throws",
            Self::Decorates => "decorates",
            Self::Annotates => "annotates",
            Self::Contains => "contains",
            Self::ContainedIn => "contained_in",
        }
    }

    /// Kinds that make the source depend on the target.
    pub fn is_dependency(&self) -> bool {
        matches!(
            self,
            Self::Calls | Self::Uses | Self::Imports | Self::Extends | Self::Implements
        )
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a textual reference. Only `Reference` is produced today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Read,
    Write,
    Call,
    Definition,
    Declaration,
    Reference,
}

// ============================================================================
// Positions
// ============================================================================

/// Position of a syntax element. Lines are 1-based, columns 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub start_column: u32,
    pub end_column: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_byte: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_byte: Option<usize>,
}

impl SourceLocation {
    pub fn new(
        file_path: impl Into<String>,
        start_line: u32,
        start_column: u32,
        end_line: u32,
        end_column: u32,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            start_line,
            end_line: end_line.max(start_line),
            start_column,
            end_column,
            start_byte: None,
            end_byte: None,
        }
    }

    pub fn with_bytes(mut self, start_byte: usize, end_byte: usize) -> Self {
        self.start_byte = Some(start_byte);
        self.end_byte = Some(end_byte.max(start_byte));
        self
    }

    /// Location of a single line range in a file.
    pub fn line(
        file_path: impl Into<String>,
        line: u32,
        start_column: u32,
        end_column: u32,
    ) -> Self {
        Self::new(file_path, line, start_column, line, end_column)
    }

    /// True when `line` of `file_path` falls inside this location's line range.
    pub fn contains_line(&self, file_path: &str, line: u32) -> bool {
        self.file_path == file_path && self.start_line <= line && line <= self.end_line
    }

    /// Line-based containment of another location in the same file.
    pub fn contains(&self, other: &SourceLocation) -> bool {
        self.file_path == other.file_path
            && self.start_line <= other.start_line
            && other.end_line <= self.end_line
    }

    /// Byte-range containment that excludes identical ranges.
    pub fn strictly_contains_bytes(&self, other: &SourceLocation) -> bool {
        match (self.start_byte, self.end_byte, other.start_byte, other.end_byte) {
            (Some(s1), Some(e1), Some(s2), Some(e2)) => {
                s1 <= s2 && e2 <= e1 && (s1, e1) != (s2, e2)
            }
            _ => false,
        }
    }

    pub fn line_span(&self) -> u32 {
        self.end_line - self.start_line + 1
    }
}

// ============================================================================
// Nodes and files
// ============================================================================

/// A declared parameter of a function-like node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_annotation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// A symbol or syntactic unit in the canonical model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub name: Option<String>,
    pub language: Language,
    pub location: SourceLocation,
    pub parent_id: Option<String>,
    pub children_ids: Vec<String>,

    pub is_static: bool,
    pub is_async: bool,
    pub is_abstract: bool,
    pub is_final: bool,
    pub is_const: bool,
    pub access_level: Option<AccessLevel>,

    pub extends: Option<String>,
    pub implements: BTreeSet<String>,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,

    pub complexity: f64,
    pub cognitive_complexity: u32,
    pub lines_of_code: u32,

    /// Native node type the adapter mapped from.
    pub native_kind: Option<String>,
    /// Raw callee names found in this node's body, resolved by the engine.
    pub call_names: Vec<String>,
    pub annotations: BTreeMap<String, serde_json::Value>,
}

impl Node {
    pub fn new(
        id: String,
        kind: NodeKind,
        name: Option<String>,
        language: Language,
        location: SourceLocation,
    ) -> Self {
        let lines_of_code = location.line_span();
        Self {
            id,
            kind,
            name,
            language,
            location,
            parent_id: None,
            children_ids: Vec::new(),
            is_static: false,
            is_async: false,
            is_abstract: false,
            is_final: false,
            is_const: false,
            access_level: None,
            extends: None,
            implements: BTreeSet::new(),
            parameters: Vec::new(),
            return_type: None,
            complexity: 1.0,
            cognitive_complexity: 0,
            lines_of_code,
            native_kind: None,
            call_names: Vec::new(),
            annotations: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn file_path(&self) -> &str {
        &self.location.file_path
    }
}

/// Canonical record of one analyzed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    pub path: String,
    pub language: Language,
    pub encoding: String,
    pub size_bytes: u64,
    pub hash: String,
    pub total_lines: u32,
    pub code_lines: u32,
    pub comment_lines: u32,
    pub blank_lines: u32,
    pub nodes: Vec<Node>,
    pub imports: Vec<String>,
    pub exports: Vec<String>,
    pub complexity: f64,
    pub maintainability_index: Option<f64>,
    /// Which adapter produced this record.
    pub adapter: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl File {
    pub fn new(path: impl Into<String>, language: Language) -> Self {
        Self {
            path: path.into(),
            language,
            encoding: "utf-8".to_string(),
            size_bytes: 0,
            hash: String::new(),
            total_lines: 0,
            code_lines: 0,
            comment_lines: 0,
            blank_lines: 0,
            nodes: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            complexity: 1.0,
            maintainability_index: None,
            adapter: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Functions, methods and constructors declared in this file.
    pub fn callables(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.kind.is_callable())
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// File stem, used to resolve imports to files.
    pub fn stem(&self) -> &str {
        let name = self.path.rsplit(['/', '\\']).next().unwrap_or(&self.path);
        name.split('.').next().unwrap_or(name)
    }
}

// ============================================================================
// Engine-level records
// ============================================================================

/// A directed, typed edge between two symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub kind: RelationKind,
    pub location: Option<SourceLocation>,
    pub confidence: f64,
    pub context: Option<String>,
}

impl Relationship {
    pub fn new(source_id: &str, target_id: &str, kind: RelationKind) -> Self {
        Self {
            id: crate::ids::relationship_id(source_id, target_id, kind),
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            kind,
            location: None,
            confidence: 1.0,
            context: None,
        }
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// A textual occurrence of a symbol's name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub id: String,
    pub symbol_id: String,
    pub location: SourceLocation,
    pub kind: ReferenceKind,
    pub is_definition: bool,
    pub context: String,
}

/// One vertex of the call graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallGraphNode {
    pub symbol_id: String,
    pub symbol_name: String,
    pub symbol_kind: NodeKind,
    pub file_path: String,
    pub calls: Vec<String>,
    pub called_by: Vec<String>,
    /// Discovery depth, only set on query results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
    pub complexity: f64,
}

/// A `(source, target, kind)` dependency edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub source: String,
    pub target: String,
    pub kind: RelationKind,
}

/// Dependency graph over symbol and `file:` pseudo-symbol ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub nodes: Vec<String>,
    pub edges: Vec<DependencyEdge>,
    pub total_nodes: usize,
    pub total_edges: usize,
    pub density: f64,
    pub strongly_connected_components: usize,
    pub cycles: Vec<Vec<String>>,

    #[serde(skip)]
    node_set: HashSet<String>,
    #[serde(skip)]
    edge_set: HashSet<DependencyEdge>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the relationship's endpoints and edge, ignoring duplicates.
    pub fn add_relationship(&mut self, rel: &Relationship) {
        for id in [&rel.source_id, &rel.target_id] {
            if self.node_set.insert(id.clone()) {
                self.nodes.push(id.clone());
            }
        }
        let edge = DependencyEdge {
            source: rel.source_id.clone(),
            target: rel.target_id.clone(),
            kind: rel.kind,
        };
        if self.edge_set.insert(edge.clone()) {
            self.edges.push(edge);
        }
        self.total_nodes = self.nodes.len();
        self.total_edges = self.edges.len();
    }
}

/// A non-fatal problem recorded while building a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub stage: String,
    pub subject: String,
    pub message: String,
}
