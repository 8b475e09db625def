//! Source parsing.
//!
//! A [`ParsedFile`] bundles the source text with its tree-sitter AST for
//! the lifetime of one update cycle. Parsing is a pure function of
//! `(source, language)`; parsers are not shared across threads.

use tree_sitter::{Parser, Tree};

use crate::error::{ParseError, ParseResult};
use crate::parsing::Language;

/// One parsed source file, alive for a single update cycle.
pub struct ParsedFile {
    pub file_path: String,
    pub language: Language,
    pub source: String,
    pub tree: Tree,
}

impl ParsedFile {
    /// Parse `source` with the grammar selected by `language` (and the
    /// file extension, for dialect splits like TSX).
    pub fn parse(
        file_path: impl Into<String>,
        source: impl Into<String>,
        language: Language,
    ) -> ParseResult<Self> {
        let file_path = file_path.into();
        let source = source.into();
        let dialect = language.dialect(&file_path);

        let mut parser = Parser::new();
        parser
            .set_language(&dialect.grammar())
            .map_err(|e| ParseError::GrammarInit {
                language: language.name().to_string(),
                reason: e.to_string(),
            })?;

        let tree = parser
            .parse(&source, None)
            .ok_or_else(|| ParseError::NoTree {
                file_path: file_path.clone(),
                language: language.name().to_string(),
            })?;

        Ok(Self {
            file_path,
            language,
            source,
            tree,
        })
    }
}

/// Extract the text of a node from the file's source.
pub fn node_text<'s>(node: tree_sitter::Node, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_typescript() {
        let parsed = ParsedFile::parse("a.ts", "function f() {}", Language::TypeScript).unwrap();
        assert_eq!(parsed.tree.root_node().kind(), "program");
        assert!(!parsed.tree.root_node().has_error());
    }

    #[test]
    fn parses_empty_source() {
        let parsed = ParsedFile::parse("a.ts", "", Language::TypeScript).unwrap();
        assert_eq!(parsed.tree.root_node().child_count(), 0);
    }

    #[test]
    fn parses_each_language() {
        for (path, source, language) in [
            ("a.ts", "const x = 1;", Language::TypeScript),
            ("a.tsx", "const x = <div/>;", Language::TypeScript),
            ("a.js", "var x = 1;", Language::JavaScript),
            ("a.py", "x = 1", Language::Python),
            ("a.rs", "fn main() {}", Language::Rust),
        ] {
            let parsed = ParsedFile::parse(path, source, language).unwrap();
            assert!(!parsed.tree.root_node().has_error(), "failed for {path}");
        }
    }
}
