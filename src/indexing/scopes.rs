//! Lexical scope tree construction.
//!
//! Scope-creating captures arrive as flat ranges. Sorting them outer-first
//! (`(start, -end)`) and pushing onto a stack yields the nesting structure:
//! each scope's parent is the nearest stack entry whose range fully
//! contains it. Overlapping, non-nested ranges produce a diagnostic and the
//! violating scope attaches to the deepest fully-containing ancestor.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Diagnostic, DiagnosticKind};
use crate::types::{Range, ScopeCounter, ScopeId};

/// Kind of a lexical scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Module,
    Function,
    Method,
    Class,
    Impl,
    Block,
    For,
    Catch,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Module => "module",
            ScopeKind::Function => "function",
            ScopeKind::Method => "method",
            ScopeKind::Class => "class",
            ScopeKind::Impl => "impl",
            ScopeKind::Block => "block",
            ScopeKind::For => "for",
            ScopeKind::Catch => "catch",
        }
    }

    /// Whether definitions in this scope are visible from line one
    /// (a hoist boundary) rather than only after their declaration.
    fn hoist_boundary(&self) -> bool {
        matches!(
            self,
            ScopeKind::Module
                | ScopeKind::Function
                | ScopeKind::Method
                | ScopeKind::Class
                | ScopeKind::Impl
        )
    }

    /// Sealed scopes hold members that are not lexically addressable from
    /// nested scopes (class bodies, impl blocks, interface bodies).
    pub fn sealed(&self) -> bool {
        matches!(self, ScopeKind::Class | ScopeKind::Impl)
    }
}

/// One node of the lexical scope tree. Scope ids are file-local.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexicalScope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub range: Range,
    pub parent_scope_id: Option<ScopeId>,
    pub child_scope_ids: Vec<ScopeId>,
    /// Whether this scope is a hoist boundary.
    pub hoisted: bool,
    /// Display name for named scopes (function, method, class), used in
    /// scope paths.
    pub name: Option<String>,
}

/// A scope-creating capture, before tree construction.
#[derive(Debug, Clone)]
pub struct ScopeCapture {
    pub kind: ScopeKind,
    pub range: Range,
    pub name: Option<String>,
    /// Tree-sitter node id, used to link definitions to the scopes their
    /// nodes create. Valid only for the lifetime of one parse.
    pub node_id: usize,
}

/// The scope tree of one file, rooted at the module scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeTree {
    scopes: IndexMap<ScopeId, LexicalScope>,
    root: Option<ScopeId>,
}

impl ScopeTree {
    pub fn root_scope_id(&self) -> ScopeId {
        self.root.unwrap_or(ScopeId::ROOT)
    }

    pub fn get(&self, id: ScopeId) -> Option<&LexicalScope> {
        self.scopes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LexicalScope> {
        self.scopes.values()
    }

    /// The deepest scope whose range contains `range`. Falls back to the
    /// root scope when nothing smaller matches.
    pub fn smallest_containing(&self, range: &Range) -> ScopeId {
        let mut current = self.root_scope_id();
        'descend: loop {
            let Some(scope) = self.get(current) else {
                return current;
            };
            for &child in &scope.child_scope_ids {
                if let Some(child_scope) = self.get(child) {
                    if child_scope.range.contains_range(range) {
                        current = child;
                        continue 'descend;
                    }
                }
            }
            return current;
        }
    }

    /// Whether `scope` is `ancestor` or lies beneath it.
    pub fn is_within(&self, scope: ScopeId, ancestor: ScopeId) -> bool {
        let mut current = Some(scope);
        let mut depth = 0u32;
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            depth += 1;
            if depth > 10_000 {
                return false;
            }
            current = self.get(id).and_then(|s| s.parent_scope_id);
        }
        false
    }

    /// Iterate from `from` outward to the root, inclusive.
    pub fn walk_out(&self, from: ScopeId) -> impl Iterator<Item = &LexicalScope> {
        let mut current = self.get(from);
        std::iter::from_fn(move || {
            let scope = current?;
            current = scope.parent_scope_id.and_then(|p| self.get(p));
            Some(scope)
        })
    }

    /// The `module/Name/...` path of a scope, used inside symbol ids.
    /// Named scopes contribute their name; anonymous scopes their kind.
    pub fn scope_path(&self, id: ScopeId) -> String {
        let mut segments: Vec<&str> = self
            .walk_out(id)
            .map(|scope| match (&scope.name, scope.kind) {
                (_, ScopeKind::Module) => "module",
                (Some(name), _) => name.as_str(),
                (None, kind) => kind.as_str(),
            })
            .collect();
        segments.reverse();
        segments.join("/")
    }

    /// The nearest enclosing scope (inclusive) of the given kinds.
    pub fn nearest_of_kind(&self, from: ScopeId, kinds: &[ScopeKind]) -> Option<&LexicalScope> {
        self.walk_out(from).find(|s| kinds.contains(&s.kind))
    }
}

/// Output of scope construction for one file.
#[derive(Debug)]
pub struct ScopeBuildResult {
    pub tree: ScopeTree,
    /// Tree-sitter node id of the scope-creating node, to the scope it
    /// created.
    pub scope_by_node: HashMap<usize, ScopeId>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Build the scope tree for one file from scope captures.
pub fn build_scope_tree(file_path: &str, mut captures: Vec<ScopeCapture>) -> ScopeBuildResult {
    let mut diagnostics = Vec::new();

    // Guarantee a module root that spans every capture, even if the query
    // did not produce one.
    let has_root = captures
        .iter()
        .any(|c| c.kind == ScopeKind::Module && captures.iter().all(|o| c.range.contains_range(&o.range)));
    if !has_root {
        let max_line = captures.iter().map(|c| c.range.end_line).max().unwrap_or(1);
        captures.push(ScopeCapture {
            kind: ScopeKind::Module,
            range: Range::new(1, 1, max_line.max(1), u32::MAX),
            name: None,
            node_id: usize::MAX,
        });
    }

    captures.sort_by_key(|c| c.range.outer_first_key());

    let mut counter = ScopeCounter::new();
    let mut tree = ScopeTree::default();
    let mut scope_by_node = HashMap::new();
    let mut stack: Vec<ScopeId> = Vec::new();

    for capture in captures {
        // Pop scopes that cannot contain the new range.
        while let Some(&top) = stack.last() {
            let top_range = tree.get(top).map(|s| s.range);
            match top_range {
                Some(range) if range.contains_range(&capture.range) => break,
                Some(range) => {
                    // Partial overlap: the popped scope started before this
                    // one but ends inside it.
                    if range.contains_point(capture.range.start_line, capture.range.start_column)
                        && !range.contains_range(&capture.range)
                    {
                        diagnostics.push(Diagnostic::warning(
                            file_path,
                            DiagnosticKind::ScopeOverlap,
                            format!(
                                "scope at {}:{} overlaps non-nested scope at {}:{}; attached to deepest containing ancestor",
                                capture.range.start_line,
                                capture.range.start_column,
                                range.start_line,
                                range.start_column
                            ),
                        ));
                    }
                    stack.pop();
                }
                None => {
                    stack.pop();
                }
            }
        }

        // Identical range to the current parent candidate of the same kind:
        // the capture describes the scope we already created (duplicate
        // query pattern); merge rather than nest.
        if let Some(&top) = stack.last() {
            if let Some(top_scope) = tree.get(top) {
                if top_scope.range == capture.range && top_scope.kind == capture.kind {
                    if capture.node_id != usize::MAX {
                        scope_by_node.insert(capture.node_id, top);
                    }
                    continue;
                }
            }
        }

        let id = counter.next_id();
        let parent = stack.last().copied();
        let scope = LexicalScope {
            id,
            kind: capture.kind,
            range: capture.range,
            parent_scope_id: parent,
            child_scope_ids: Vec::new(),
            hoisted: capture.kind.hoist_boundary(),
            name: capture.name,
        };
        if let Some(parent_id) = parent {
            if let Some(parent_scope) = tree.scopes.get_mut(&parent_id) {
                parent_scope.child_scope_ids.push(id);
            }
        } else {
            tree.root = Some(id);
        }
        tree.scopes.insert(id, scope);
        if capture.node_id != usize::MAX {
            scope_by_node.insert(capture.node_id, id);
        }
        stack.push(id);
    }

    ScopeBuildResult {
        tree,
        scope_by_node,
        diagnostics,
    }
}
