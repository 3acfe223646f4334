//! Deterministic identifiers.
//!
//! Every id in the index is a pure function of its inputs so that
//! re-analysing identical sources yields identical snapshots.

use sha2::{Digest, Sha256};
use std::fmt::Display;
use std::path::Path;
use xxhash_rust::xxh3::xxh3_128;

/// Length of a hashed id in hex characters.
pub const ID_LEN: usize = 16;

const DELIMITER: char = ':';

/// Hash the `:`-joined parts into a 16-character hex id.
pub fn node_id(parts: &[&dyn Display]) -> String {
    let mut joined = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            joined.push(DELIMITER);
        }
        joined.push_str(&part.to_string());
    }
    let digest = format!("{:032x}", xxh3_128(joined.as_bytes()));
    digest[..ID_LEN].to_string()
}

/// Id of a relationship between two symbols.
pub fn relationship_id(source_id: &str, target_id: &str, kind: impl Display) -> String {
    node_id(&[&source_id, &target_id, &kind])
}

/// Id of a textual reference to a symbol.
pub fn reference_id(symbol_id: &str, file: &str, line: u32, column: u32) -> String {
    node_id(&[&symbol_id, &file, &line, &column])
}

/// Id of a symbol addressed by name rather than position.
pub fn symbol_id(file: &str, name: &str, kind: impl Display, line: u32) -> String {
    node_id(&[&file, &name, &kind, &line])
}

/// Content hash of a whole file (hex SHA-256).
pub fn file_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Normalize a path so ids do not depend on the host separator.
pub fn normalize_path_for_id(path: &Path) -> String {
    let text = path.to_string_lossy();
    if text.contains('\\') {
        text.replace('\\', "/")
    } else {
        text.into_owned()
    }
}

/// Accepts a 16-hex-character id or a UUID.
pub fn is_valid_id(id: &str) -> bool {
    if id.len() == ID_LEN && id.bytes().all(|b| b.is_ascii_hexdigit()) {
        return true;
    }
    uuid::Uuid::parse_str(id).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_is_stable() {
        let a = node_id(&[&"src/a.py", &3, &4, &"function_definition"]);
        let b = node_id(&[&"src/a.py", &3, &4, &"function_definition"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), ID_LEN);
        assert!(is_valid_id(&a));
    }

    #[test]
    fn test_node_id_changes_with_parts() {
        let a = node_id(&[&"src/a.py", &3]);
        let b = node_id(&[&"src/a.py", &4]);
        let c = node_id(&[&"src/a.py:3"]);
        assert_ne!(a, b);
        // Same joined text, same id.
        assert_eq!(a, c);
    }

    #[test]
    fn test_file_hash() {
        let h = file_hash(b"hello");
        assert_eq!(h.len(), 64);
        assert_eq!(h, file_hash(b"hello"));
        assert_ne!(h, file_hash(b"hello\n"));
    }

    #[test]
    fn test_is_valid_id() {
        assert!(is_valid_id("0123456789abcdef"));
        assert!(is_valid_id("67e55044-10b1-426f-9247-bb680e5fe0c8"));
        assert!(!is_valid_id("0123456789abcdeg"));
        assert!(!is_valid_id("abc"));
        assert!(!is_valid_id(""));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path_for_id(Path::new("a\\b\\c.rs")), "a/b/c.rs");
        assert_eq!(normalize_path_for_id(Path::new("a/b.rs")), "a/b.rs");
    }
}
