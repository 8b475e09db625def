//! Language detection and grammar access.
//!
//! Languages are detected from file extensions. Each language owns a
//! tree-sitter grammar and a capture query; queries are compiled once per
//! process and shared.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tree_sitter::Query;

use crate::error::ParseError;
use crate::parsing::behavior::LanguageBehavior;
use crate::parsing::{javascript, python, rust, typescript};

/// Supported programming languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    TypeScript,
    JavaScript,
    Python,
    Rust,
}

/// Grammar dialect. TypeScript splits into TS and TSX grammars that share
/// one query source; every other language has exactly one dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Dialect {
    TypeScript,
    Tsx,
    JavaScript,
    Python,
    Rust,
}

impl Language {
    /// Detect language from a file extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "ts" | "tsx" => Some(Language::TypeScript),
            "js" | "jsx" => Some(Language::JavaScript),
            "py" => Some(Language::Python),
            "rs" => Some(Language::Rust),
            _ => None,
        }
    }

    /// Detect language from a file path.
    pub fn from_path(path: &str) -> Option<Self> {
        let ext = path.rsplit('.').next()?;
        if ext.len() == path.len() {
            return None;
        }
        Self::from_extension(ext)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Rust => "rust",
        }
    }

    /// The language-specific behavior adapter.
    pub fn behavior(&self) -> &'static dyn LanguageBehavior {
        match self {
            Language::TypeScript => &typescript::TypeScriptBehavior,
            Language::JavaScript => &javascript::JavaScriptBehavior,
            Language::Python => &python::PythonBehavior,
            Language::Rust => &rust::RustBehavior,
        }
    }

    pub(crate) fn dialect(&self, file_path: &str) -> Dialect {
        match self {
            Language::TypeScript if file_path.to_lowercase().ends_with(".tsx") => Dialect::Tsx,
            Language::TypeScript => Dialect::TypeScript,
            Language::JavaScript => Dialect::JavaScript,
            Language::Python => Dialect::Python,
            Language::Rust => Dialect::Rust,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Dialect {
    pub(crate) fn grammar(&self) -> tree_sitter::Language {
        match self {
            Dialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Dialect::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Dialect::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Dialect::Python => tree_sitter_python::LANGUAGE.into(),
            Dialect::Rust => tree_sitter_rust::LANGUAGE.into(),
        }
    }

    pub(crate) fn query_source(&self) -> &'static str {
        match self {
            Dialect::TypeScript | Dialect::Tsx => typescript::QUERY,
            Dialect::JavaScript => javascript::QUERY,
            Dialect::Python => python::QUERY,
            Dialect::Rust => rust::QUERY,
        }
    }

    /// The compiled capture query for this dialect, compiled on first use.
    pub(crate) fn query(&self) -> Result<&'static Query, ParseError> {
        static TS: OnceLock<Result<Query, String>> = OnceLock::new();
        static TSX: OnceLock<Result<Query, String>> = OnceLock::new();
        static JS: OnceLock<Result<Query, String>> = OnceLock::new();
        static PY: OnceLock<Result<Query, String>> = OnceLock::new();
        static RS: OnceLock<Result<Query, String>> = OnceLock::new();

        let cell = match self {
            Dialect::TypeScript => &TS,
            Dialect::Tsx => &TSX,
            Dialect::JavaScript => &JS,
            Dialect::Python => &PY,
            Dialect::Rust => &RS,
        };
        let language_name = match self {
            Dialect::TypeScript | Dialect::Tsx => "typescript",
            Dialect::JavaScript => "javascript",
            Dialect::Python => "python",
            Dialect::Rust => "rust",
        };

        cell.get_or_init(|| {
            Query::new(&self.grammar(), self.query_source()).map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(|reason| ParseError::QueryError {
            language: language_name.to_string(),
            reason: reason.clone(),
        })
    }
}
