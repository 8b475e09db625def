//! Core identifier and location types shared across the indexing system.
//!
//! All positions are 1-based at this boundary. Tree-sitter's 0-based rows
//! and columns are translated when captures are ingested, so nothing above
//! the query runner ever sees a 0-based coordinate.

pub mod paths;
pub mod symbol_ref;

pub use paths::paths_match;
pub use symbol_ref::SymbolRef;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;

/// Globally unique symbol identifier within one project snapshot.
///
/// The encoded form is `kind:scope_path:name[:qualifier]`, e.g.
/// `method:module/Parser:advance` or `function:module:helper:42` when a
/// starting-line qualifier was needed to disambiguate. The string is opaque
/// to clients; it is not stable across edits that reshape scopes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(Box<str>);

impl SymbolId {
    pub fn new(kind_tag: &str, scope_path: &str, name: &str) -> Self {
        Self(format!("{kind_tag}:{scope_path}:{name}").into())
    }

    pub fn with_qualifier(kind_tag: &str, scope_path: &str, name: &str, qualifier: u32) -> Self {
        Self(format!("{kind_tag}:{scope_path}:{name}:{qualifier}").into())
    }

    /// Wrap an already-encoded identifier.
    pub fn from_raw(raw: impl Into<Box<str>>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `kind` segment of the encoded identifier.
    pub fn kind_tag(&self) -> &str {
        self.0.split(':').next().unwrap_or("")
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw source identifier, as it appears in the file.
pub type SymbolName = String;

/// File-local scope identifier. Scope ids restart at 1 for every file, with
/// 1 always naming the module (root) scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(NonZeroU32);

impl ScopeId {
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn value(&self) -> u32 {
        self.0.get()
    }

    /// The root (module) scope of any file.
    pub const ROOT: ScopeId = ScopeId(NonZeroU32::new(1).unwrap());
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.get())
    }
}

/// Monotonic scope id allocator used while building one file's scope tree.
#[derive(Debug)]
pub struct ScopeCounter(u32);

impl ScopeCounter {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn next_id(&mut self) -> ScopeId {
        self.0 += 1;
        ScopeId::new(self.0).expect("scope counter starts at 1")
    }
}

impl Default for ScopeCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// A source range with 1-based inclusive line/column endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Range {
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    /// Translate a tree-sitter node range (0-based rows/columns) into the
    /// 1-based public coordinate system.
    pub fn from_ts(range: tree_sitter::Range) -> Self {
        Self {
            start_line: range.start_point.row as u32 + 1,
            start_column: range.start_point.column as u32 + 1,
            end_line: range.end_point.row as u32 + 1,
            end_column: range.end_point.column as u32 + 1,
        }
    }

    pub fn contains_point(&self, line: u32, column: u32) -> bool {
        if line < self.start_line || line > self.end_line {
            return false;
        }
        if line == self.start_line && column < self.start_column {
            return false;
        }
        if line == self.end_line && column > self.end_column {
            return false;
        }
        true
    }

    /// Whether `other` lies entirely within this range.
    pub fn contains_range(&self, other: &Range) -> bool {
        self.contains_point(other.start_line, other.start_column)
            && self.contains_point(other.end_line, other.end_column)
    }

    /// Whether `other` lies within this range without sharing both endpoints.
    pub fn strictly_contains(&self, other: &Range) -> bool {
        self.contains_range(other) && self != other
    }

    /// Sort key implementing the `(start, -end)` ordering used by the scope
    /// builder: outer ranges first, ties broken larger-range-first.
    pub fn outer_first_key(&self) -> (u32, u32, std::cmp::Reverse<u32>, std::cmp::Reverse<u32>) {
        (
            self.start_line,
            self.start_column,
            std::cmp::Reverse(self.end_line),
            std::cmp::Reverse(self.end_column),
        )
    }
}

/// One occurrence in one file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file_path: String,
    #[serde(flatten)]
    pub range: Range,
}

impl Location {
    pub fn new(file_path: impl Into<String>, range: Range) -> Self {
        Self {
            file_path: file_path.into(),
            range,
        }
    }

    /// Canonical string uniquely identifying this occurrence within one
    /// file revision. Used as the key for resolved-reference maps.
    pub fn key(&self) -> LocationKey {
        LocationKey(
            format!(
                "{}:{}:{}-{}:{}",
                self.file_path,
                self.range.start_line,
                self.range.start_column,
                self.range.end_line,
                self.range.end_column
            )
            .into(),
        )
    }
}

/// Canonical key derived from a [`Location`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationKey(Box<str>);

impl LocationKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
