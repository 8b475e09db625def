//! Call graph construction and entry-point detection.
//!
//! The graph is logical: nodes are callable definitions, cross-referenced
//! by symbol id over flat tables. Each node's enclosed calls are the call
//! references whose scope lies within the callable's body; the callers
//! index inverts resolved call edges, skipping callback self-loops; entry
//! points are callables with no surviving inbound edge that are not marked
//! indirectly reachable.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::indexing::references::{CallType, RefType, Reference};
use crate::resolve::{FileResolutions, Resolution};
use crate::storage::{DefinitionRegistry, ReferenceRegistry, ScopeRegistry};
use crate::symbol::Definition;
use crate::types::{Location, ScopeId, SymbolId};

/// One call site inside a callable's body, with its resolved targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnclosedCall {
    pub name: String,
    pub location: Location,
    pub call_type: CallType,
    pub is_callback_invocation: bool,
    pub resolutions: Vec<Resolution>,
}

/// A callable definition as a call graph node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallableNode {
    pub symbol_id: SymbolId,
    pub name: String,
    pub location: Location,
    pub definition: Definition,
    pub enclosed_calls: Vec<EnclosedCall>,
    pub is_test: bool,
}

/// The project call graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallGraph {
    pub nodes: IndexMap<SymbolId, CallableNode>,
    pub entry_points: Vec<SymbolId>,
    /// Surrounding callable -> callables it references without calling, in
    /// contexts that may invoke them later.
    pub indirect_reachability: BTreeMap<SymbolId, Vec<SymbolId>>,
}

impl CallGraph {
    pub fn node(&self, symbol_id: &SymbolId) -> Option<&CallableNode> {
        self.nodes.get(symbol_id)
    }

    pub fn is_entry_point(&self, symbol_id: &SymbolId) -> bool {
        self.entry_points.contains(symbol_id)
    }
}

/// Options for [`CallGraphBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct CallGraphOptions {
    /// With `filter_files` set, also include nodes outside the filter that
    /// are called from inside it.
    pub include_external: bool,
    pub filter_files: Option<Vec<String>>,
}

/// Builds the call graph from registries and per-file resolutions.
pub struct CallGraphBuilder<'a> {
    pub definitions: &'a DefinitionRegistry,
    pub scopes: &'a ScopeRegistry,
    pub references: &'a ReferenceRegistry,
    pub resolutions: &'a HashMap<String, FileResolutions>,
}

impl<'a> CallGraphBuilder<'a> {
    /// The callers index: callee -> callers. A caller is a callable symbol
    /// or the per-file module pseudo-caller for top-level calls. Entries
    /// where caller equals callee are skipped when the call is a callback
    /// invocation.
    pub fn callers_index(&self) -> BTreeMap<SymbolId, BTreeSet<SymbolId>> {
        let mut index: BTreeMap<SymbolId, BTreeSet<SymbolId>> = BTreeMap::new();
        for (file, resolved) in self.resolutions {
            let owners = FileOwners::new(self.definitions, self.scopes, file);
            for reference in self.references.references_of(file) {
                if reference.ref_type != RefType::Call {
                    continue;
                }
                let key = reference.location.key();
                let targets = resolved.resolutions_at(&key);
                if targets.is_empty() {
                    continue;
                }
                let is_callback = resolved.is_callback_invocation(&key)
                    || reference
                        .call
                        .as_ref()
                        .is_some_and(|c| c.is_callback_invocation);
                let caller = owners
                    .owner_of(reference.scope_id)
                    .unwrap_or_else(|| module_caller(file));
                for resolution in targets {
                    let Some(target) = self.definitions.get(&resolution.symbol_id) else {
                        continue;
                    };
                    if !target.is_callable() {
                        continue;
                    }
                    if caller == resolution.symbol_id && is_callback {
                        // Callback self-loops are artifacts of scope-walk
                        // resolution, not recursion.
                        continue;
                    }
                    index
                        .entry(resolution.symbol_id.clone())
                        .or_default()
                        .insert(caller.clone());
                }
            }
        }
        index
    }

    pub fn build(&self, options: &CallGraphOptions) -> CallGraph {
        let mut graph = CallGraph::default();

        let mut files: Vec<String> = self.resolutions.keys().cloned().collect();
        for file in self.definitions.files() {
            if !files.contains(file) {
                files.push(file.clone());
            }
        }
        files.sort();

        let included = |file: &str| -> bool {
            match &options.filter_files {
                None => true,
                Some(filter) => filter
                    .iter()
                    .any(|f| crate::types::paths_match(f, file)),
            }
        };

        // Nodes, in (file, location) order.
        for file in &files {
            if !included(file) {
                continue;
            }
            self.add_file_nodes(file, &mut graph);
        }

        let callers = self.callers_index();

        // include_external: pull in call targets living outside the filter.
        if options.include_external && options.filter_files.is_some() {
            let mut external: Vec<SymbolId> = Vec::new();
            for node in graph.nodes.values() {
                for call in &node.enclosed_calls {
                    for resolution in &call.resolutions {
                        if !graph.nodes.contains_key(&resolution.symbol_id) {
                            external.push(resolution.symbol_id.clone());
                        }
                    }
                }
            }
            external.sort();
            external.dedup();
            for symbol_id in external {
                if let Some(def) = self.definitions.get(&symbol_id) {
                    if def.is_callable() {
                        let file = def.location.file_path.clone();
                        self.add_node_for(def.clone(), &file, &mut graph);
                    }
                }
            }
        }

        // Indirect reachability: callables referenced without being called,
        // in contexts that may invoke them later.
        for file in &files {
            let Some(resolved) = self.resolutions.get(file) else {
                continue;
            };
            let owners = FileOwners::new(self.definitions, self.scopes, file);
            for reference in self.references.references_of(file) {
                if reference.ref_type != RefType::Read {
                    continue;
                }
                let Some(owner) = owners.owner_of(reference.scope_id) else {
                    continue;
                };
                for resolution in resolved.resolutions_at(&reference.location.key()) {
                    let Some(target) = self.definitions.get(&resolution.symbol_id) else {
                        continue;
                    };
                    if !target.is_callable() {
                        continue;
                    }
                    if target.is_exported() || reference.is_call_argument {
                        let entry = graph
                            .indirect_reachability
                            .entry(owner.clone())
                            .or_default();
                        if !entry.contains(&resolution.symbol_id) {
                            entry.push(resolution.symbol_id.clone());
                        }
                    }
                }
            }
        }
        for targets in graph.indirect_reachability.values_mut() {
            targets.sort();
        }

        // Entry points: no surviving inbound edge, not indirectly reachable.
        let indirectly_reachable: BTreeSet<&SymbolId> = graph
            .indirect_reachability
            .values()
            .flatten()
            .collect();
        let mut entry_points: Vec<&CallableNode> = graph
            .nodes
            .values()
            .filter(|node| {
                callers
                    .get(&node.symbol_id)
                    .is_none_or(|callers| callers.is_empty())
                    && !indirectly_reachable.contains(&node.symbol_id)
            })
            .collect();
        entry_points.sort_by(|a, b| {
            (
                &a.location.file_path,
                a.location.range.start_line,
                &a.name,
            )
                .cmp(&(&b.location.file_path, b.location.range.start_line, &b.name))
        });
        graph.entry_points = entry_points
            .into_iter()
            .map(|node| node.symbol_id.clone())
            .collect();

        graph
    }

    fn add_file_nodes(&self, file: &str, graph: &mut CallGraph) {
        let mut callables: Vec<Definition> = self
            .definitions
            .in_file(file)
            .filter(|d| d.is_callable())
            .cloned()
            .collect();
        callables.sort_by_key(|d| {
            (
                d.location.range.start_line,
                d.location.range.start_column,
                d.name.clone(),
            )
        });
        for def in callables {
            self.add_node_for(def, file, graph);
        }
    }

    fn add_node_for(&self, def: Definition, file: &str, graph: &mut CallGraph) {
        if graph.nodes.contains_key(&def.symbol_id) {
            return;
        }
        let owners = FileOwners::new(self.definitions, self.scopes, file);
        let resolved = self.resolutions.get(file);

        let mut enclosed_calls = Vec::new();
        if def.body_scope.is_some() {
            for reference in self.references.references_of(file) {
                if reference.ref_type != RefType::Call {
                    continue;
                }
                if owners.owner_of(reference.scope_id).as_ref() != Some(&def.symbol_id) {
                    continue;
                }
                enclosed_calls.push(self.enclosed_call(reference, resolved));
            }
        }
        enclosed_calls.sort_by_key(|c| {
            (
                c.location.file_path.clone(),
                c.location.range.start_line,
                c.location.range.start_column,
            )
        });

        graph.nodes.insert(
            def.symbol_id.clone(),
            CallableNode {
                symbol_id: def.symbol_id.clone(),
                name: def.name.clone(),
                location: def.location.clone(),
                is_test: def.is_test(),
                enclosed_calls,
                definition: def,
            },
        );
    }

    fn enclosed_call(
        &self,
        reference: &Reference,
        resolved: Option<&FileResolutions>,
    ) -> EnclosedCall {
        let key = reference.location.key();
        let resolutions = resolved
            .map(|r| r.resolutions_at(&key).to_vec())
            .unwrap_or_default();
        let is_callback = resolved.map(|r| r.is_callback_invocation(&key)).unwrap_or(false)
            || reference
                .call
                .as_ref()
                .is_some_and(|c| c.is_callback_invocation);
        EnclosedCall {
            name: reference.name.clone(),
            location: reference.location.clone(),
            call_type: reference
                .call
                .as_ref()
                .map(|c| c.call_type)
                .unwrap_or(CallType::Function),
            is_callback_invocation: is_callback,
            resolutions,
        }
    }
}

/// The pseudo-caller representing a file's module-level code.
pub fn module_caller(file: &str) -> SymbolId {
    SymbolId::from_raw(format!("module:{file}"))
}

/// Maps scopes to their innermost enclosing callable within one file.
struct FileOwners {
    /// (body scope, depth, callable symbol), deepest preferred.
    bodies: Vec<(ScopeId, u32, SymbolId)>,
    ancestors: HashMap<ScopeId, Vec<ScopeId>>,
}

impl FileOwners {
    fn new(definitions: &DefinitionRegistry, scopes: &ScopeRegistry, file: &str) -> Self {
        let mut bodies = Vec::new();
        let mut ancestors: HashMap<ScopeId, Vec<ScopeId>> = HashMap::new();
        if let Some(tree) = scopes.get(file) {
            for scope in tree.iter() {
                let chain: Vec<ScopeId> = tree.walk_out(scope.id).map(|s| s.id).collect();
                ancestors.insert(scope.id, chain);
            }
            for def in definitions.in_file(file) {
                if !def.is_callable() {
                    continue;
                }
                if let Some(body) = def.body_scope {
                    let depth = ancestors.get(&body).map(|c| c.len() as u32).unwrap_or(0);
                    bodies.push((body, depth, def.symbol_id.clone()));
                }
            }
            // Deepest body first, stable on symbol id.
            bodies.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.2.cmp(&b.2)));
        }
        Self { bodies, ancestors }
    }

    /// The innermost callable whose body contains `scope_id`.
    fn owner_of(&self, scope_id: ScopeId) -> Option<SymbolId> {
        let chain = self.ancestors.get(&scope_id)?;
        self.bodies
            .iter()
            .find(|(body, _, _)| chain.contains(body))
            .map(|(_, _, symbol)| symbol.clone())
    }
}
