//! Reference extraction.
//!
//! Each reference capture is paired with its smallest enclosing scope. Call
//! captures additionally carry the call site classification (function,
//! method, constructor), the callee name token, and the receiver expression
//! when present. Receiver resolution is deferred to the resolution phase.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::parsing::behavior::LanguageBehavior;
use crate::parsing::query_runner::{Capture, CaptureEntity};
use crate::symbol::Definition;
use crate::types::{Location, Range, ScopeId, SymbolName};

use super::scopes::ScopeTree;

/// Reference flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefType {
    Read,
    Write,
    Call,
    Type,
    Import,
    Export,
}

/// How a call site invokes its callee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    Function,
    Method,
    Constructor,
}

/// The receiver expression of a method call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receiver {
    pub text: String,
    /// Always recorded; resolution is deferred.
    pub receiver_location: Location,
    /// Type-name receivers (`Point::new()`).
    pub is_static: bool,
}

/// Call-specific payload of a reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallInfo {
    pub call_type: CallType,
    /// Location of the callee name token.
    pub callee_location: Location,
    pub receiver: Option<Receiver>,
    /// True when the callee is known at parse time to be an anonymous
    /// function expression. Resolution widens this to parameters and
    /// function-typed variables.
    pub is_callback_invocation: bool,
}

/// One reference to a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub ref_type: RefType,
    pub name: SymbolName,
    /// For calls, the full call expression; otherwise the name token.
    pub location: Location,
    pub scope_id: ScopeId,
    pub call: Option<CallInfo>,
    /// Read references: true when the identifier sits inside a call's
    /// argument list (feeds indirect reachability).
    pub is_call_argument: bool,
}

impl Reference {
    pub fn is_call(&self) -> bool {
        self.ref_type == RefType::Call
    }
}

/// Build the reference list for one file from reference captures.
///
/// `definitions` supplies the name-token locations to exclude from read
/// references: a definition's own name is not a use of it.
pub fn build_references(
    file_path: &str,
    source: &str,
    behavior: &dyn LanguageBehavior,
    scopes: &ScopeTree,
    captures: &[Capture<'_>],
    definitions: &[Definition],
) -> Vec<Reference> {
    let mut references = Vec::new();

    // Ranges that disqualify an identifier from being a read reference.
    let mut claimed: HashSet<Range> = definitions
        .iter()
        .map(|def| def.location.range)
        .collect();
    let mut statement_spans: Vec<Range> = Vec::new();
    let mut write_ranges: HashSet<Range> = HashSet::new();

    // Calls first: their callee tokens claim identifiers.
    for capture in captures {
        match capture.name.entity {
            CaptureEntity::Call => {
                let Some(raw) = behavior.call_info(capture.node, source) else {
                    continue;
                };
                claimed.insert(raw.name_range);
                let scope_id = scopes.smallest_containing(&capture.range);
                references.push(Reference {
                    ref_type: RefType::Call,
                    name: raw.name.clone(),
                    location: Location::new(file_path, capture.range),
                    scope_id,
                    call: Some(CallInfo {
                        call_type: raw.call_type,
                        callee_location: Location::new(file_path, raw.name_range),
                        receiver: raw.receiver.map(|r| Receiver {
                            text: r.text,
                            receiver_location: Location::new(file_path, r.range),
                            is_static: r.is_static,
                        }),
                        is_callback_invocation: raw.anonymous_callee,
                    }),
                    is_call_argument: false,
                });
            }
            CaptureEntity::Import => {
                statement_spans.push(capture.range);
                references.push(Reference {
                    ref_type: RefType::Import,
                    name: String::new(),
                    location: Location::new(file_path, capture.range),
                    scope_id: scopes.smallest_containing(&capture.range),
                    call: None,
                    is_call_argument: false,
                });
            }
            CaptureEntity::Export => {
                statement_spans.push(capture.range);
                references.push(Reference {
                    ref_type: RefType::Export,
                    name: String::new(),
                    location: Location::new(file_path, capture.range),
                    scope_id: scopes.smallest_containing(&capture.range),
                    call: None,
                    is_call_argument: false,
                });
            }
            CaptureEntity::Write => {
                write_ranges.insert(capture.range);
            }
            _ => {}
        }
    }

    for capture in captures {
        match capture.name.entity {
            CaptureEntity::Write => {
                references.push(Reference {
                    ref_type: RefType::Write,
                    name: capture.text.clone(),
                    location: Location::new(file_path, capture.range),
                    scope_id: scopes.smallest_containing(&capture.range),
                    call: None,
                    is_call_argument: false,
                });
            }
            CaptureEntity::Type => {
                references.push(Reference {
                    ref_type: RefType::Type,
                    name: capture.text.clone(),
                    location: Location::new(file_path, capture.range),
                    scope_id: scopes.smallest_containing(&capture.range),
                    call: None,
                    is_call_argument: false,
                });
            }
            CaptureEntity::Read => {
                if claimed.contains(&capture.range) || write_ranges.contains(&capture.range) {
                    continue;
                }
                if statement_spans.iter().any(|span| span.contains_range(&capture.range)) {
                    continue;
                }
                references.push(Reference {
                    ref_type: RefType::Read,
                    name: capture.text.clone(),
                    location: Location::new(file_path, capture.range),
                    scope_id: scopes.smallest_containing(&capture.range),
                    call: None,
                    is_call_argument: in_call_arguments(capture.node),
                });
            }
            _ => {}
        }
    }

    references.sort_by_key(|r| {
        (
            r.location.range.start_line,
            r.location.range.start_column,
            r.location.range.end_line,
            r.location.range.end_column,
        )
    });
    references
}

/// Whether the node sits inside a call's argument list, before reaching a
/// statement boundary.
fn in_call_arguments(node: tree_sitter::Node) -> bool {
    let mut current = node.parent();
    let mut depth = 0;
    while let Some(parent) = current {
        match parent.kind() {
            "arguments" | "argument_list" => return true,
            "statement_block" | "block" | "module" | "program" | "source_file"
            | "expression_statement" => return false,
            _ => {}
        }
        depth += 1;
        if depth > 32 {
            return false;
        }
        current = parent.parent();
    }
    false
}
