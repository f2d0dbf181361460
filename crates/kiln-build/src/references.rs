//! Source-to-source reference scanning
//!
//! A source file depends on another project source when it mentions that
//! source's type name (its file stem). Comments, string literals and
//! character literals are skipped; everything else is split into
//! identifiers and matched against the known type names.

use crate::path::RelativePath;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Maps simple type names to the project sources declaring them
#[derive(Debug, Clone, Default)]
pub struct ReferenceScanner {
    types: HashMap<String, Vec<RelativePath>>,
}

impl ReferenceScanner {
    /// Index the given source paths by file stem
    pub fn new<'a>(sources: impl IntoIterator<Item = &'a RelativePath>) -> Self {
        let mut types: HashMap<String, Vec<RelativePath>> = HashMap::new();
        for source in sources {
            types
                .entry(source.file_stem().to_string())
                .or_default()
                .push(source.clone());
        }
        Self { types }
    }

    /// Project sources referenced from `content`, excluding `path` itself
    pub fn scan(&self, path: &RelativePath, content: &str) -> BTreeSet<RelativePath> {
        identifiers(content)
            .into_iter()
            .filter_map(|identifier| self.types.get(identifier))
            .flatten()
            .filter(|source| *source != path)
            .cloned()
            .collect()
    }
}

/// Distinct identifiers outside comments and literals
fn identifiers(content: &str) -> HashSet<&str> {
    let bytes = content.as_bytes();
    let mut found = HashSet::new();
    let mut index = 0;

    while index < bytes.len() {
        match bytes[index] {
            b'/' if bytes.get(index + 1) == Some(&b'/') => {
                index = find_from(bytes, index + 2, b"\n").unwrap_or(bytes.len());
            }
            b'/' if bytes.get(index + 1) == Some(&b'*') => {
                index = find_from(bytes, index + 2, b"*/").map_or(bytes.len(), |end| end + 2);
            }
            b'"' if bytes[index..].starts_with(b"\"\"\"") => {
                index = find_from(bytes, index + 3, b"\"\"\"").map_or(bytes.len(), |end| end + 3);
            }
            quote @ (b'"' | b'\'') => {
                index = skip_literal(bytes, index + 1, quote);
            }
            byte if is_identifier_start(byte) => {
                let start = index;
                while index < bytes.len() && is_identifier_part(bytes[index]) {
                    index += 1;
                }
                found.insert(&content[start..index]);
            }
            _ => index += 1,
        }
    }

    found
}

fn find_from(bytes: &[u8], start: usize, needle: &[u8]) -> Option<usize> {
    if start >= bytes.len() {
        return None;
    }
    bytes[start..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| start + offset)
}

/// Index just past the closing quote, honoring backslash escapes
fn skip_literal(bytes: &[u8], mut index: usize, quote: u8) -> usize {
    while index < bytes.len() {
        match bytes[index] {
            b'\\' => index += 2,
            b'\n' => return index + 1,
            byte if byte == quote => return index + 1,
            _ => index += 1,
        }
    }
    bytes.len()
}

// Non-ASCII bytes count as identifier characters so UTF-8 names stay whole
fn is_identifier_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_' || byte == b'$' || byte >= 0x80
}

fn is_identifier_part(byte: u8) -> bool {
    is_identifier_start(byte) || byte.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(text: &str) -> RelativePath {
        RelativePath::new(text).unwrap()
    }

    fn scanner() -> ReferenceScanner {
        let sources = vec![
            path("app/Main.java"),
            path("app/Helper.java"),
            path("util/Strings.java"),
            path("util/Unused.java"),
        ];
        ReferenceScanner::new(&sources)
    }

    #[test]
    fn test_finds_referenced_types() {
        let content = r#"
            package app;

            import util.Strings;

            public class Main {
                public static void main(String[] args) {
                    Helper helper = new Helper();
                    System.out.println(Strings.join(args));
                }
            }
        "#;

        let references = scanner().scan(&path("app/Main.java"), content);
        assert_eq!(
            references.into_iter().collect::<Vec<_>>(),
            vec![path("app/Helper.java"), path("util/Strings.java")]
        );
    }

    #[test]
    fn test_ignores_comments_and_literals() {
        let content = r#"
            // Helper is mentioned here
            /* and Strings here,
               over two lines */
            class Main {
                String text = "Unused \" Helper";
                char c = '\'';
                String block = """
                    Strings
                    """;
            }
        "#;

        assert!(scanner().scan(&path("app/Main.java"), content).is_empty());
    }

    #[test]
    fn test_excludes_self() {
        let content = "class Helper { Helper next; }";
        assert!(scanner().scan(&path("app/Helper.java"), content).is_empty());
    }

    #[test]
    fn test_identifier_boundaries() {
        let content = "class Main { MyHelper a; Helper2 b; }";
        assert!(scanner().scan(&path("app/Main.java"), content).is_empty());
    }
}
