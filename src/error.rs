//! Error and diagnostic types for the semantic indexing system.
//!
//! Source-level problems (parse failures, unsupported extensions, resolution
//! limits) never surface as `Err`; they are reported as [`Diagnostic`]
//! values attached to the owning file's revision. The `Err` path is reserved
//! for programming errors and caller-triggered cancellation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::SymbolId;

/// Main error type for project-level operations.
#[derive(Error, Debug)]
pub enum IndexError {
    /// Two definitions produced the same symbol id after qualifier
    /// disambiguation. Indicates a builder bug; fatal to the file's update.
    #[error("registry conflict in '{file_path}': duplicate symbol id '{symbol_id}'")]
    RegistryConflict {
        file_path: String,
        symbol_id: SymbolId,
    },

    /// Caller-triggered cancellation. The update was rolled back; no
    /// registry state changed.
    #[error("update cancelled before commit; no changes were applied")]
    Cancelled,

    #[error("invalid symbol reference '{input}', expected <file_path>:<line>#<name>")]
    InvalidSymbolRef { input: String },

    #[error("invalid exclusion pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid configuration: {reason}")]
    ConfigError { reason: String },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Errors specific to turning source text into an AST.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to initialize {language} grammar: {reason}")]
    GrammarInit { language: String, reason: String },

    #[error("{language} parser produced no tree for '{file_path}'")]
    NoTree {
        file_path: String,
        language: String,
    },

    #[error("malformed {language} query: {reason}")]
    QueryError { language: String, reason: String },

    #[error("invalid UTF-8 in source file")]
    InvalidUtf8,
}

/// Severity of a per-file diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// Classification of a per-file diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Tree-sitter could not parse the source. The file contributes no
    /// records for this revision.
    ParseError,
    /// A language query failed to compile or produced a malformed capture.
    /// Treated as a parse error at the granularity of the query.
    QueryError,
    /// The file's extension maps to no supported language.
    LanguageNotSupported,
    /// The file matched an exclusion pattern and was not indexed.
    Excluded,
    /// Scope ranges overlapped without nesting; the violating scope was
    /// attached to its deepest fully-containing ancestor.
    ScopeOverlap,
    /// A re-export chain exceeded the hop limit and was cut.
    ResolutionCycle,
    /// Type propagation hit the round limit before reaching a fixed point.
    TypeFixpointNotReached,
}

/// A non-fatal, per-file finding produced during indexing or resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file_path: String,
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn error(file_path: impl Into<String>, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            kind,
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn warning(
        file_path: impl Into<String>,
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            kind,
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

/// Result type alias for project-level operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Result type alias for parse operations.
pub type ParseResult<T> = Result<T, ParseError>;
