//! Language detection and grammar selection.

use crate::types::Language;
use std::path::Path;

/// Extension table used by the analyzer. Every entry maps to a known language.
pub const EXTENSIONS: &[(&str, Language)] = &[
    ("py", Language::Python),
    ("pyw", Language::Python),
    ("pyi", Language::Python),
    ("js", Language::JavaScript),
    ("jsx", Language::JavaScript),
    ("mjs", Language::JavaScript),
    ("cjs", Language::JavaScript),
    ("ts", Language::TypeScript),
    ("tsx", Language::TypeScript),
    ("mts", Language::TypeScript),
    ("cts", Language::TypeScript),
    ("go", Language::Go),
    ("rs", Language::Rust),
    ("c", Language::C),
    ("h", Language::C),
    ("cpp", Language::Cpp),
    ("cc", Language::Cpp),
    ("cxx", Language::Cpp),
    ("hpp", Language::Cpp),
    ("hxx", Language::Cpp),
    ("java", Language::Java),
    ("cs", Language::CSharp),
    ("rb", Language::Ruby),
    ("php", Language::Php),
    ("swift", Language::Swift),
    ("kt", Language::Kotlin),
    ("kts", Language::Kotlin),
    ("scala", Language::Scala),
    ("html", Language::Html),
    ("htm", Language::Html),
    ("css", Language::Css),
    ("scss", Language::Css),
    ("sass", Language::Css),
    ("sql", Language::Sql),
];

/// Detect a file's language from its extension (case-insensitive).
pub fn detect_language(path: &Path) -> Language {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return Language::Unknown;
    };
    let ext = ext.to_ascii_lowercase();
    EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, lang)| *lang)
        .unwrap_or(Language::Unknown)
}

/// Guess a language from the first line of content (shebangs, `<?php`).
pub fn detect_from_content(content: &str) -> Language {
    let first = content.lines().next().unwrap_or("").trim();
    if first.starts_with("<?php") {
        return Language::Php;
    }
    let Some(shebang) = first.strip_prefix("#!") else {
        return Language::Unknown;
    };
    let interpreter = shebang
        .split_whitespace()
        .flat_map(|part| part.rsplit('/').next())
        .find(|part| *part != "env")
        .unwrap_or("");
    if interpreter.starts_with("python") {
        Language::Python
    } else if interpreter.starts_with("node") || interpreter == "deno" {
        Language::JavaScript
    } else if interpreter.starts_with("ruby") {
        Language::Ruby
    } else if interpreter.starts_with("php") {
        Language::Php
    } else {
        Language::Unknown
    }
}

/// Detect by extension, then by content when the extension is unknown.
pub fn detect(path: &Path, content: &str) -> Language {
    match detect_language(path) {
        Language::Unknown => detect_from_content(content),
        lang => lang,
    }
}

// ============================================================================
// Grammars
// ============================================================================

/// A tree-sitter grammar the adapters can parse with.
///
/// TypeScript has two grammars; `.tsx` files need the JSX-aware one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Grammar {
    Python,
    JavaScript,
    TypeScript,
    Tsx,
    Go,
    Rust,
}

impl Grammar {
    pub const ALL: [Grammar; 6] = [
        Grammar::Python,
        Grammar::JavaScript,
        Grammar::TypeScript,
        Grammar::Tsx,
        Grammar::Go,
        Grammar::Rust,
    ];

    /// Grammar for a language, using the path to pick TS vs TSX.
    pub fn for_language(language: Language, path: &Path) -> Option<Self> {
        match language {
            Language::Python => Some(Self::Python),
            Language::JavaScript => Some(Self::JavaScript),
            Language::TypeScript => {
                let is_tsx = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("tsx"));
                Some(if is_tsx { Self::Tsx } else { Self::TypeScript })
            }
            Language::Go => Some(Self::Go),
            Language::Rust => Some(Self::Rust),
            _ => None,
        }
    }

    pub fn language(&self) -> Language {
        match self {
            Self::Python => Language::Python,
            Self::JavaScript => Language::JavaScript,
            Self::TypeScript | Self::Tsx => Language::TypeScript,
            Self::Go => Language::Go,
            Self::Rust => Language::Rust,
        }
    }

    pub fn ts_language(&self) -> tree_sitter::Language {
        match self {
            Self::Python => tree_sitter_python::LANGUAGE.into(),
            Self::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Self::Go => tree_sitter_go::LANGUAGE.into(),
            Self::Rust => tree_sitter_rust::LANGUAGE.into(),
        }
    }
}

/// Languages that have a grammar.
pub fn has_grammar(language: Language) -> bool {
    Grammar::for_language(language, Path::new("")).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_table_never_unknown() {
        for (ext, lang) in EXTENSIONS {
            assert_ne!(*lang, Language::Unknown, "{ext}");
            let path = format!("file.{ext}");
            assert_eq!(detect_language(Path::new(&path)), *lang);
        }
    }

    #[test]
    fn test_extension_table_has_no_duplicates() {
        let mut seen = std::collections::HashSet::new();
        for (ext, _) in EXTENSIONS {
            assert!(seen.insert(*ext), "duplicate extension {ext}");
        }
    }

    #[test]
    fn test_detect_is_case_insensitive() {
        assert_eq!(detect_language(Path::new("A.PY")), Language::Python);
        assert_eq!(detect_language(Path::new("README")), Language::Unknown);
        assert_eq!(detect_language(Path::new("notes.md")), Language::Unknown);
    }

    #[test]
    fn test_detect_from_content() {
        assert_eq!(
            detect_from_content("#!/usr/bin/env python3\nprint(1)"),
            Language::Python
        );
        assert_eq!(detect_from_content("#!/usr/bin/node\n"), Language::JavaScript);
        assert_eq!(detect_from_content("<?php echo 1;"), Language::Php);
        assert_eq!(detect_from_content("hello"), Language::Unknown);
        assert_eq!(detect(Path::new("script"), "#!/bin/ruby\n"), Language::Ruby);
    }

    #[test]
    fn test_grammar_selection() {
        assert_eq!(
            Grammar::for_language(Language::TypeScript, Path::new("a.tsx")),
            Some(Grammar::Tsx)
        );
        assert_eq!(
            Grammar::for_language(Language::TypeScript, Path::new("a.ts")),
            Some(Grammar::TypeScript)
        );
        assert_eq!(Grammar::for_language(Language::Java, Path::new("A.java")), None);
        assert!(has_grammar(Language::Go));
        assert!(!has_grammar(Language::Sql));
    }
}
