//! Language-specific behavior abstraction.
//!
//! Everything the per-file pipeline needs to know about a concrete language
//! lives behind [`LanguageBehavior`]: scope boundary quirks, name and
//! signature extraction, import/export shapes, call-site classification,
//! and module path resolution. The builders themselves stay language
//! agnostic.

use tree_sitter::Node;

use crate::indexing::references::CallType;
use crate::indexing::scopes::ScopeKind;
use crate::symbol::{Initializer, Parameter};
use crate::types::Range;

/// An import statement, decomposed into one record per binding.
#[derive(Debug, Clone)]
pub struct RawImport {
    pub import_path: String,
    /// Name requested from the target module; `"*"` for namespace imports,
    /// `"default"` for default imports.
    pub imported_name: String,
    /// The local name the binding is visible under.
    pub local_name: String,
    pub is_namespace: bool,
    pub is_type_only: bool,
    pub range: Range,
}

/// An export clause entry. `local_name` is `None` for re-exports.
#[derive(Debug, Clone)]
pub struct RawExport {
    pub exported_name: String,
    pub local_name: Option<String>,
    /// Re-exports: the module specifier the name is forwarded from.
    pub source_path: Option<String>,
    /// Re-exports: the name on the source side.
    pub source_name: Option<String>,
    pub is_type_only: bool,
    pub range: Range,
}

/// The receiver of a method call (`obj` in `obj.m()`).
#[derive(Debug, Clone)]
pub struct RawReceiver {
    pub text: String,
    pub range: Range,
    /// True when the receiver is a type name rather than an instance
    /// (`Foo::new()` in Rust).
    pub is_static: bool,
}

/// A classified call site.
#[derive(Debug, Clone)]
pub struct RawCall {
    pub call_type: CallType,
    /// The callee name token.
    pub name: String,
    pub name_range: Range,
    pub receiver: Option<RawReceiver>,
    /// True when the callee is itself an anonymous function expression
    /// (immediately-invoked lambdas).
    pub anonymous_callee: bool,
}

/// Declared callable shape: parameters, return type, display signature.
#[derive(Debug, Clone, Default)]
pub struct CallableSignature {
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    pub signature: Option<String>,
}

/// Language-specific hooks used by the per-file pipeline.
pub trait LanguageBehavior: Send + Sync {
    /// Map a scope capture qualifier (`function`, `class`, ...) to a scope
    /// kind.
    fn scope_kind(&self, qualifier: Option<&str>) -> ScopeKind {
        match qualifier {
            Some("module") => ScopeKind::Module,
            Some("function") => ScopeKind::Function,
            Some("method") => ScopeKind::Method,
            Some("class") => ScopeKind::Class,
            Some("impl") => ScopeKind::Impl,
            Some("for") => ScopeKind::For,
            Some("catch") => ScopeKind::Catch,
            _ => ScopeKind::Block,
        }
    }

    /// Display name for a scope-creating node, used in scope paths.
    fn scope_name(&self, node: Node, source: &str) -> Option<String> {
        field_text(node, "name", source)
    }

    /// Name token of a definition node. `None` means anonymous.
    fn definition_name(&self, node: Node, source: &str) -> Option<(String, Range)> {
        default_definition_name(node, source)
    }

    /// Whether the definition node carries its own export marker (`pub` in
    /// Rust). Languages with export statements return false here and rely
    /// on export captures instead.
    fn is_exported_definition(&self, _node: Node, _source: &str) -> bool {
        false
    }

    /// Whether a `variable` capture should index as a constant.
    fn is_constant(&self, _node: Node, _source: &str) -> bool {
        false
    }

    /// Test heuristic for a definition.
    fn is_test_definition(&self, name: &str, file_path: &str, scope_path: &str) -> bool;

    /// Parameters, return type, and display signature of a callable node.
    fn callable_signature(&self, node: Node, source: &str) -> CallableSignature;

    /// Initializer shape and declared type of a variable-like node.
    fn variable_info(&self, _node: Node, _source: &str) -> (Option<Initializer>, Option<String>) {
        (None, None)
    }

    /// Base classes and implemented interfaces of a class-like node.
    fn class_heritage(&self, _node: Node, _source: &str) -> (Vec<String>, Vec<String>) {
        (Vec::new(), Vec::new())
    }

    /// For `impl` blocks: the target type name and the implemented trait,
    /// if any.
    fn impl_info(&self, _node: Node, _source: &str) -> Option<(String, Option<String>)> {
        None
    }

    /// Decompose an import statement node.
    fn collect_imports(&self, node: Node, source: &str) -> Vec<RawImport>;

    /// Decompose an export statement node.
    fn collect_exports(&self, _node: Node, _source: &str) -> Vec<RawExport> {
        Vec::new()
    }

    /// Whether a module-level definition is part of the implicit export
    /// surface (Python public names, Rust `pub` items). Languages with
    /// explicit export statements return false and rely on
    /// [`Self::collect_exports`].
    fn implicit_export(&self, _def: &crate::symbol::Definition) -> bool {
        false
    }

    /// Resolve an import specifier to one of the project's known files.
    /// Returns `None` for external modules.
    fn resolve_import_target(
        &self,
        import_path: &str,
        importing_file: &str,
        known_files: &[String],
    ) -> Option<String>;

    /// Classify a captured call-expression node.
    fn call_info(&self, node: Node, source: &str) -> Option<RawCall>;

    /// Whether `text` names the receiver of the enclosing class instance
    /// (`this`, `self`).
    fn is_self_receiver(&self, text: &str) -> bool;

    /// Method names that index as constructors.
    fn constructor_names(&self) -> &'static [&'static str] {
        &["constructor"]
    }

    /// Whether a plain function call that resolves to a class definition
    /// should be treated as a constructor call (Python instantiation).
    fn treats_class_call_as_constructor(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Shared node helpers
// ---------------------------------------------------------------------------

pub(crate) fn node_str(node: Node, source: &str) -> String {
    node.utf8_text(source.as_bytes()).unwrap_or("").to_string()
}

/// The common name-extraction rule: a `name` field when the node has one,
/// the node's own text for captures landing on bare name tokens
/// (parameters, enumerators), anonymous otherwise.
pub(crate) fn default_definition_name(node: Node, source: &str) -> Option<(String, Range)> {
    if let Some(name) = node.child_by_field_name("name") {
        return Some((node_str(name, source), Range::from_ts(name.range())));
    }
    if node.kind().ends_with("identifier") {
        return Some((node_str(node, source), Range::from_ts(node.range())));
    }
    None
}

pub(crate) fn field_text(node: Node, field: &str, source: &str) -> Option<String> {
    node.child_by_field_name(field)
        .map(|child| node_str(child, source))
}

/// Strip the leading `:`/`->` and whitespace from an annotation fragment.
pub(crate) fn clean_annotation(text: &str) -> String {
    text.trim_start_matches(':')
        .trim_start_matches("->")
        .trim()
        .to_string()
}

/// Remove matching quotes from a string literal's text.
pub(crate) fn unquote(text: &str) -> String {
    text.trim_matches(|c| c == '"' || c == '\'' || c == '`').to_string()
}

/// Single-line display signature: source from the node start to its body,
/// whitespace collapsed and truncated for display.
pub(crate) fn signature_before_body(node: Node, source: &str) -> Option<String> {
    let start = node.start_byte();
    let end = node
        .child_by_field_name("body")
        .map(|b| b.start_byte())
        .unwrap_or_else(|| node.end_byte());
    if end <= start || end > source.len() {
        return None;
    }
    let raw = source.get(start..end)?;
    let collapsed: String = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim().trim_end_matches('{').trim().to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(truncate_display(&trimmed, 200))
    }
}

fn truncate_display(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut boundary = max_bytes;
    while boundary > 0 && !s.is_char_boundary(boundary) {
        boundary -= 1;
    }
    format!("{}...", &s[..boundary])
}

/// Join a relative specifier (`./lib`, `../util/x`) against the importing
/// file's directory, normalizing `.` and `..` segments. Returns `None` for
/// non-relative specifiers.
pub(crate) fn resolve_relative_specifier(specifier: &str, importing_file: &str) -> Option<String> {
    if !specifier.starts_with("./") && !specifier.starts_with("../") && specifier != "." {
        return None;
    }
    let dir = match importing_file.rfind('/') {
        Some(idx) => &importing_file[..idx],
        None => "",
    };
    let mut segments: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in specifier.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    Some(segments.join("/"))
}

/// Find the first known file matching any candidate suffix, in candidate
/// order. Known files are scanned in sorted order for determinism.
pub(crate) fn match_known_file(candidates: &[String], known_files: &[String]) -> Option<String> {
    let mut sorted: Vec<&String> = known_files.iter().collect();
    sorted.sort();
    for candidate in candidates {
        if candidate.is_empty() {
            continue;
        }
        for file in &sorted {
            if crate::types::paths_match(candidate, file) {
                return Some((*file).clone());
            }
        }
    }
    None
}
