//! Tree-sitter query execution.
//!
//! The runner projects raw query matches into a typed capture stream and
//! nothing more: no interpretation, no language knowledge. Capture names
//! follow the schema `@category.entity[.qualifier]` with
//! `category ∈ {local, hoist, reference}`.

use std::collections::HashSet;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Query, QueryCursor, Tree};

use crate::types::Range;

/// Capture category: lexical default, hoisted visibility, or a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureCategory {
    Local,
    Hoist,
    Reference,
}

/// What kind of source fragment the capture identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureEntity {
    Scope,
    Definition,
    Import,
    Export,
    Call,
    Read,
    Write,
    Type,
}

/// A parsed `@category.entity[.qualifier]` capture name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureName {
    pub category: CaptureCategory,
    pub entity: CaptureEntity,
    pub qualifier: Option<String>,
}

impl CaptureName {
    /// Parse a capture name. Returns `None` for names outside the schema,
    /// which the indexer reports as a query error.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.splitn(3, '.');
        let category = match parts.next()? {
            "local" => CaptureCategory::Local,
            "hoist" => CaptureCategory::Hoist,
            "reference" => CaptureCategory::Reference,
            _ => return None,
        };
        let entity = match parts.next()? {
            "scope" => CaptureEntity::Scope,
            "definition" => CaptureEntity::Definition,
            "import" => CaptureEntity::Import,
            "export" => CaptureEntity::Export,
            "call" => CaptureEntity::Call,
            "read" => CaptureEntity::Read,
            "write" => CaptureEntity::Write,
            "type" => CaptureEntity::Type,
            _ => return None,
        };
        let qualifier = parts.next().map(String::from);
        Some(Self {
            category,
            entity,
            qualifier,
        })
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }
}

/// One typed capture: a named fragment of source.
pub struct Capture<'t> {
    pub name: CaptureName,
    pub node: Node<'t>,
    pub range: Range,
    pub node_kind: &'static str,
    pub text: String,
}

/// Execute `query` over the tree, yielding the typed capture stream in
/// source order.
///
/// Duplicate captures for the same `(capture name, node)` pair are dropped:
/// downstream builders rely on one capture per call-expression node.
pub fn run_query<'t>(tree: &'t Tree, source: &str, query: &Query) -> Vec<Capture<'t>> {
    let capture_names = query.capture_names();
    let mut seen: HashSet<(u32, usize)> = HashSet::new();
    let mut captures = Vec::new();

    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, tree.root_node(), source.as_bytes());
    while let Some(m) = matches.next() {
        for capture in m.captures {
            if !seen.insert((capture.index, capture.node.id())) {
                continue;
            }
            let raw_name = capture_names[capture.index as usize];
            let Some(name) = CaptureName::parse(raw_name) else {
                tracing::debug!(capture = raw_name, "capture name outside schema, skipped");
                continue;
            };
            let node = capture.node;
            captures.push(Capture {
                name,
                node,
                range: Range::from_ts(node.range()),
                node_kind: node.kind(),
                text: node.utf8_text(source.as_bytes()).unwrap_or("").to_string(),
            });
        }
    }

    // Query matches arrive grouped by pattern; builders expect source order.
    captures.sort_by_key(|c| (c.range.start_line, c.range.start_column, c.node.id()));
    captures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::{Language, ParsedFile};

    #[test]
    fn parses_capture_names() {
        let name = CaptureName::parse("local.scope.function").unwrap();
        assert_eq!(name.category, CaptureCategory::Local);
        assert_eq!(name.entity, CaptureEntity::Scope);
        assert_eq!(name.qualifier(), Some("function"));

        let name = CaptureName::parse("hoist.definition.class").unwrap();
        assert_eq!(name.category, CaptureCategory::Hoist);
        assert_eq!(name.entity, CaptureEntity::Definition);

        let name = CaptureName::parse("reference.call").unwrap();
        assert_eq!(name.category, CaptureCategory::Reference);
        assert_eq!(name.entity, CaptureEntity::Call);
        assert_eq!(name.qualifier(), None);

        assert!(CaptureName::parse("bogus.scope").is_none());
        assert!(CaptureName::parse("local.widget").is_none());
        assert!(CaptureName::parse("local").is_none());
    }

    #[test]
    fn captures_are_typed_and_one_based() {
        let parsed =
            ParsedFile::parse("a.ts", "function f() {}\nf();\n", Language::TypeScript).unwrap();
        let query = Language::TypeScript.dialect("a.ts").query().unwrap();
        let captures = run_query(&parsed.tree, &parsed.source, query);

        let def = captures
            .iter()
            .find(|c| c.name.entity == CaptureEntity::Definition)
            .expect("function definition captured");
        assert_eq!(def.name.category, CaptureCategory::Hoist);
        assert_eq!(def.range.start_line, 1);

        let call = captures
            .iter()
            .find(|c| c.name.entity == CaptureEntity::Call)
            .expect("call captured");
        assert_eq!(call.range.start_line, 2);
        assert_eq!(call.text, "f()");
    }

    #[test]
    fn one_capture_per_call_expression() {
        let parsed = ParsedFile::parse(
            "a.ts",
            "function f() {}\nf();\nobj.m().n();\n",
            Language::TypeScript,
        )
        .unwrap();
        let query = Language::TypeScript.dialect("a.ts").query().unwrap();
        let captures = run_query(&parsed.tree, &parsed.source, query);

        let mut call_node_ids: Vec<usize> = captures
            .iter()
            .filter(|c| c.name.entity == CaptureEntity::Call)
            .map(|c| c.node.id())
            .collect();
        let before = call_node_ids.len();
        call_node_ids.dedup();
        assert_eq!(before, call_node_ids.len());
        // f(), obj.m(), and obj.m().n() are three distinct call expressions.
        assert_eq!(before, 3);
    }
}
