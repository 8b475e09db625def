//! The update coordinator.
//!
//! Owns all registries and serializes writes. `update_file` stages the new
//! per-file index first (pure computation, cancellable), then commits:
//! atomic per-file replacement in every registry, import edge recompute,
//! and re-resolution of the affected files in topological order. Readers
//! observe state only between updates.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::{Diagnostic, DiagnosticKind, IndexError, IndexResult, ParseError};
use crate::graph::{CallGraph, CallGraphBuilder, CallGraphOptions};
use crate::parsing::Language;
use crate::resolve::{
    CallResolver, FileResolutions, ResolverContext, TypeRegistry, build_type_hierarchy,
    propagate_types,
};
use crate::storage::{
    DefinitionRegistry, ExportRegistry, ImportGraph, ImportRegistry, ReferenceRegistry,
    ScopeRegistry,
};
use crate::symbol::{Definition, ExportRecord};
use crate::types::SymbolId;

use super::file_index::{SemanticIndex, index_file};
use super::references::Reference;
use super::scopes::ScopeTree;

/// Outcome of one `update_file` call.
#[derive(Debug, Clone, Default)]
pub struct UpdateResult {
    /// Diagnostics for the updated file's new revision.
    pub diagnostics: Vec<Diagnostic>,
    /// Dependent files re-resolved by this update, in processing order.
    pub dependents_reprocessed: Vec<String>,
}

/// Cooperative cancellation for `update_file`. Cancelling before the
/// commit point rolls the whole update back; no registry state changes.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The project-wide semantic index: registries, import graph, resolution
/// outputs, and the update protocol that keeps them consistent.
pub struct ProjectIndex {
    settings: Settings,
    excluded: Vec<glob::Pattern>,
    project_root: Option<String>,
    languages: BTreeMap<String, Language>,
    definitions: DefinitionRegistry,
    scope_registry: ScopeRegistry,
    export_registry: ExportRegistry,
    reference_registry: ReferenceRegistry,
    import_registry: ImportRegistry,
    import_graph: ImportGraph,
    /// `(file, import_path)` -> resolved target file.
    import_targets: HashMap<(String, String), String>,
    resolutions: HashMap<String, FileResolutions>,
    types: TypeRegistry,
    file_diagnostics: HashMap<String, Vec<Diagnostic>>,
}

impl Default for ProjectIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectIndex {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let mut index = Self {
            settings,
            excluded: Vec::new(),
            project_root: None,
            languages: BTreeMap::new(),
            definitions: DefinitionRegistry::new(),
            scope_registry: ScopeRegistry::new(),
            export_registry: ExportRegistry::new(),
            reference_registry: ReferenceRegistry::new(),
            import_registry: ImportRegistry::new(),
            import_graph: ImportGraph::new(),
            import_targets: HashMap::new(),
            resolutions: HashMap::new(),
            types: TypeRegistry::new(),
            file_diagnostics: HashMap::new(),
        };
        let patterns = index.settings.excluded_patterns.clone();
        for pattern in &patterns {
            if let Ok(compiled) = glob::Pattern::new(pattern) {
                index.excluded.push(compiled);
            }
        }
        index
    }

    /// Seed the project root and exclusion rules. Patterns act as a pure
    /// filter on `update_file` ingress.
    pub fn initialize(
        &mut self,
        project_root: impl Into<String>,
        excluded_patterns: &[String],
    ) -> IndexResult<()> {
        self.project_root = Some(project_root.into());
        self.excluded.clear();
        for pattern in excluded_patterns {
            let compiled =
                glob::Pattern::new(pattern).map_err(|e| IndexError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
            self.excluded.push(compiled);
        }
        info!(
            root = self.project_root.as_deref().unwrap_or(""),
            patterns = excluded_patterns.len(),
            "project initialized"
        );
        Ok(())
    }

    pub fn project_root(&self) -> Option<&str> {
        self.project_root.as_deref()
    }

    fn is_excluded(&self, file_path: &str) -> bool {
        self.excluded.iter().any(|p| p.matches(file_path))
    }

    /// Ingest, replace, or remove one file. `None` removes.
    pub fn update_file(&mut self, file_path: &str, source: Option<&str>) -> UpdateResult {
        match self.update_file_inner(file_path, source, None) {
            Ok(result) => result,
            // No token was supplied, so cancellation is impossible.
            Err(_) => UpdateResult::default(),
        }
    }

    /// Like [`Self::update_file`], but cancellable. Cancellation before the
    /// commit point returns `Err(Cancelled)` with no state change.
    pub fn update_file_cancellable(
        &mut self,
        file_path: &str,
        source: Option<&str>,
        token: &CancellationToken,
    ) -> IndexResult<UpdateResult> {
        self.update_file_inner(file_path, source, Some(token))
    }

    fn update_file_inner(
        &mut self,
        file_path: &str,
        source: Option<&str>,
        token: Option<&CancellationToken>,
    ) -> IndexResult<UpdateResult> {
        if self.is_excluded(file_path) {
            return Ok(UpdateResult {
                diagnostics: vec![Diagnostic::warning(
                    file_path,
                    DiagnosticKind::Excluded,
                    "file matches an exclusion pattern and was not indexed",
                )],
                dependents_reprocessed: Vec::new(),
            });
        }
        let Some(language) = Language::from_path(file_path) else {
            return Ok(UpdateResult {
                diagnostics: vec![Diagnostic::error(
                    file_path,
                    DiagnosticKind::LanguageNotSupported,
                    format!("language not supported for '{file_path}'"),
                )],
                dependents_reprocessed: Vec::new(),
            });
        };

        // Affected set from the OLD import graph, before any mutation.
        let old_closure = self.import_graph.dependents_closure(file_path);

        // Stage: compute the new index without touching shared state.
        let mut stage_diagnostics: Vec<Diagnostic> = Vec::new();
        let new_index: Option<SemanticIndex> = match source {
            None => None,
            Some(text) => match index_file(file_path, text, language) {
                Ok(index) => Some(index),
                Err(error) => {
                    warn!(file = file_path, %error, "file excluded from this revision");
                    stage_diagnostics.push(stage_error_diagnostic(file_path, &error));
                    None
                }
            },
        };

        if let Some(token) = token {
            if token.is_cancelled() {
                return Err(IndexError::Cancelled);
            }
        }

        // Commit: atomic per-file replacement.
        self.purge_file(file_path);
        match &new_index {
            Some(index) => {
                self.insert_index(index, language);
                let mut diagnostics = index.diagnostics.clone();
                diagnostics.extend(stage_diagnostics.iter().cloned());
                self.file_diagnostics.insert(file_path.to_string(), diagnostics);
            }
            None => {
                self.languages.remove(file_path);
                self.import_graph.remove_file(file_path);
                if !stage_diagnostics.is_empty() {
                    self.file_diagnostics
                        .insert(file_path.to_string(), stage_diagnostics.clone());
                }
            }
        }

        // Import edges may have shifted anywhere: a new file can satisfy a
        // previously-dangling import.
        let retargeted = self.recompute_import_edges();

        // Merge the old-graph closure with closures of files whose import
        // targets changed, preserving topological order per seed.
        let mut ordered: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for file in old_closure {
            if seen.insert(file.clone()) {
                ordered.push(file);
            }
        }
        let mut seeds: Vec<String> = retargeted.into_iter().collect();
        seeds.sort();
        for seed in seeds {
            for file in self.import_graph.dependents_closure(&seed) {
                if seen.insert(file.clone()) {
                    ordered.push(file);
                }
            }
        }

        self.resolve_affected(&ordered);

        let diagnostics = self
            .file_diagnostics
            .get(file_path)
            .cloned()
            .unwrap_or_default();
        let dependents_reprocessed: Vec<String> = ordered
            .into_iter()
            .filter(|f| f != file_path && self.languages.contains_key(f))
            .collect();
        debug!(
            file = file_path,
            dependents = dependents_reprocessed.len(),
            "update complete"
        );
        Ok(UpdateResult {
            diagnostics,
            dependents_reprocessed,
        })
    }

    /// Remove a file from the project. Equivalent to `update_file(path, None)`.
    pub fn remove_file(&mut self, file_path: &str) -> UpdateResult {
        self.update_file(file_path, None)
    }

    /// Batch ingest: per-file indexing fans out on the worker pool, then a
    /// single commit and resolution pass runs on the coordinator.
    pub fn add_files(&mut self, files: Vec<(String, String)>) -> Vec<UpdateResult> {
        let staged: Vec<(String, Option<Language>, Option<Result<SemanticIndex, IndexError>>)> =
            files
                .par_iter()
                .map(|(path, source)| {
                    if self.is_excluded(path) {
                        return (path.clone(), None, None);
                    }
                    let Some(language) = Language::from_path(path) else {
                        return (path.clone(), None, None);
                    };
                    (
                        path.clone(),
                        Some(language),
                        Some(index_file(path, source, language)),
                    )
                })
                .collect();

        let mut results: Vec<UpdateResult> = Vec::with_capacity(staged.len());
        let mut batch_files: Vec<String> = Vec::new();

        for (path, language, outcome) in staged {
            let mut result = UpdateResult::default();
            match (language, outcome) {
                (None, _) | (_, None) => {
                    let diagnostic = if self.is_excluded(&path) {
                        Diagnostic::warning(
                            &path,
                            DiagnosticKind::Excluded,
                            "file matches an exclusion pattern and was not indexed",
                        )
                    } else {
                        Diagnostic::error(
                            &path,
                            DiagnosticKind::LanguageNotSupported,
                            format!("language not supported for '{path}'"),
                        )
                    };
                    result.diagnostics.push(diagnostic);
                }
                (Some(language), Some(Ok(index))) => {
                    self.purge_file(&path);
                    self.insert_index(&index, language);
                    self.file_diagnostics
                        .insert(path.clone(), index.diagnostics.clone());
                    result.diagnostics = index.diagnostics.clone();
                    batch_files.push(path.clone());
                }
                (Some(_), Some(Err(error))) => {
                    self.purge_file(&path);
                    self.languages.remove(&path);
                    let diagnostic = stage_error_diagnostic(&path, &error);
                    self.file_diagnostics
                        .insert(path.clone(), vec![diagnostic.clone()]);
                    result.diagnostics.push(diagnostic);
                }
            }
            results.push(result);
        }

        self.recompute_import_edges();

        // One resolution pass over the batch and everything it affects.
        let mut ordered: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for seed in &batch_files {
            for file in self.import_graph.dependents_closure(seed) {
                if seen.insert(file.clone()) {
                    ordered.push(file);
                }
            }
        }
        self.resolve_affected(&ordered);

        // Refresh per-file diagnostics in the results now that resolution
        // diagnostics have landed.
        for ((path, _), result) in files.iter().zip(results.iter_mut()) {
            if let Some(diagnostics) = self.file_diagnostics.get(path) {
                result.diagnostics = diagnostics.clone();
            }
        }
        results
    }

    /// Every registry contribution of one file, removed.
    fn purge_file(&mut self, file_path: &str) {
        let removed: HashSet<SymbolId> = self
            .definitions
            .in_file(file_path)
            .map(|d| d.symbol_id.clone())
            .collect();
        self.types.purge(&removed);
        self.definitions.remove_file(file_path);
        self.scope_registry.remove_file(file_path);
        self.export_registry.remove_file(file_path);
        self.reference_registry.remove_file(file_path);
        self.import_registry.remove_file(file_path);
        self.resolutions.remove(file_path);
        self.file_diagnostics.remove(file_path);
        self.import_targets
            .retain(|(file, _), _| file.as_str() != file_path);
    }

    fn insert_index(&mut self, index: &SemanticIndex, language: Language) {
        self.definitions.insert_index(index);
        self.scope_registry.insert_index(index);
        self.export_registry.insert_index(index);
        self.reference_registry.insert_index(index);
        self.import_registry.insert_index(index);
        self.languages.insert(index.file_path.clone(), language);
    }

    /// Re-resolve every file's import targets against the current file set
    /// and update the import graph by diffing. Returns files whose target
    /// set changed.
    fn recompute_import_edges(&mut self) -> BTreeSet<String> {
        let known_files: Vec<String> = self.languages.keys().cloned().collect();
        let mut changed: BTreeSet<String> = BTreeSet::new();

        for (file, language) in self.languages.clone() {
            let behavior = language.behavior();
            let mut targets: BTreeSet<String> = BTreeSet::new();
            self.import_targets.retain(|(f, _), _| *f != file);
            for record in self.import_registry.imports_of(&file) {
                if let Some(target) =
                    behavior.resolve_import_target(&record.import_path, &file, &known_files)
                {
                    if target != file {
                        targets.insert(target.clone());
                    }
                    self.import_targets
                        .insert((file.clone(), record.import_path.clone()), target);
                }
            }
            // Re-exports depend on their source module the same way imports
            // do: a change there must reprocess this file.
            for record in self.export_registry.exports_of(&file) {
                let Some(from) = &record.re_export_from else {
                    continue;
                };
                if let Some(target) = behavior.resolve_import_target(from, &file, &known_files) {
                    if target != file {
                        targets.insert(target.clone());
                    }
                    self.import_targets
                        .insert((file.clone(), from.clone()), target);
                }
            }
            let old: BTreeSet<String> = self.import_graph.imports_of(&file).cloned().collect();
            if old != targets {
                changed.insert(file.clone());
                self.import_graph.set_imports(&file, targets);
            }
        }
        changed
    }

    /// Re-run name, type, and call resolution over `files` in order. Files
    /// not currently indexed are skipped; their stale outputs are gone
    /// already.
    fn resolve_affected(&mut self, files: &[String]) {
        let files: Vec<String> = files
            .iter()
            .filter(|f| self.languages.contains_key(*f))
            .cloned()
            .collect();
        if files.is_empty() {
            return;
        }

        // Clear stale outputs and derived types for the affected files.
        let mut affected_symbols: HashSet<SymbolId> = HashSet::new();
        for file in &files {
            self.resolutions.remove(file);
            for def in self.definitions.in_file(file) {
                affected_symbols.insert(def.symbol_id.clone());
            }
            if let Some(diagnostics) = self.file_diagnostics.get_mut(file) {
                diagnostics.retain(|d| {
                    !matches!(
                        d.kind,
                        DiagnosticKind::ResolutionCycle | DiagnosticKind::TypeFixpointNotReached
                    )
                });
            }
        }
        self.types.purge(&affected_symbols);

        let known_files: Vec<String> = self.languages.keys().cloned().collect();
        let ctx = ResolverContext {
            definitions: &self.definitions,
            scopes: &self.scope_registry,
            exports: &self.export_registry,
            imports: &self.import_registry,
            references: &self.reference_registry,
            import_targets: &self.import_targets,
            known_files: &known_files,
            limits: &self.settings.resolution,
        };

        let hierarchy = build_type_hierarchy(&ctx);
        let type_diagnostics = propagate_types(&ctx, &files, &mut self.types);

        let mut new_resolutions: Vec<(String, FileResolutions, Vec<Diagnostic>)> = Vec::new();
        for file in &files {
            let mut resolver = CallResolver::new(&ctx, &hierarchy, &self.types);
            let resolved = resolver.resolve_file(file);
            new_resolutions.push((file.clone(), resolved, resolver.diagnostics));
        }
        drop(ctx);

        for (file, resolved, diagnostics) in new_resolutions {
            self.resolutions.insert(file.clone(), resolved);
            if !diagnostics.is_empty() {
                self.file_diagnostics
                    .entry(file)
                    .or_default()
                    .extend(diagnostics);
            }
        }
        for diagnostic in type_diagnostics {
            self.file_diagnostics
                .entry(diagnostic.file_path.clone())
                .or_default()
                .push(diagnostic);
        }
    }

    // -----------------------------------------------------------------
    // Egress
    // -----------------------------------------------------------------

    /// Build the call graph from current state.
    pub fn get_call_graph(&self, options: Option<CallGraphOptions>) -> CallGraph {
        let builder = CallGraphBuilder {
            definitions: &self.definitions,
            scopes: &self.scope_registry,
            references: &self.reference_registry,
            resolutions: &self.resolutions,
        };
        builder.build(&options.unwrap_or_default())
    }

    /// The callers index used for entry-point detection.
    pub fn callers_index(&self) -> BTreeMap<SymbolId, BTreeSet<SymbolId>> {
        let builder = CallGraphBuilder {
            definitions: &self.definitions,
            scopes: &self.scope_registry,
            references: &self.reference_registry,
            resolutions: &self.resolutions,
        };
        builder.callers_index()
    }

    pub fn get_definitions(&self, file_path: &str) -> Vec<Definition> {
        let mut definitions: Vec<Definition> = self.definitions.in_file(file_path).cloned().collect();
        definitions.sort_by_key(|d| {
            (
                d.location.range.start_line,
                d.location.range.start_column,
                d.name.clone(),
            )
        });
        definitions
    }

    pub fn get_definition(&self, symbol_id: &SymbolId) -> Option<&Definition> {
        self.definitions.get(symbol_id)
    }

    /// Every reference whose resolutions include `symbol_id`.
    pub fn find_references(&self, symbol_id: &SymbolId) -> Vec<Reference> {
        let mut found = Vec::new();
        for (file, resolved) in &self.resolutions {
            for (key, resolutions) in &resolved.resolved_references {
                if !resolutions.iter().any(|r| &r.symbol_id == symbol_id) {
                    continue;
                }
                if let Some(reference) = self
                    .reference_registry
                    .references_of(file)
                    .iter()
                    .find(|r| &r.location.key() == key)
                {
                    found.push(reference.clone());
                }
            }
        }
        found.sort_by_key(|r| {
            (
                r.location.file_path.clone(),
                r.location.range.start_line,
                r.location.range.start_column,
            )
        });
        found
    }

    pub fn get_scope_tree(&self, file_path: &str) -> Option<&ScopeTree> {
        self.scope_registry.get(file_path)
    }

    pub fn get_exports(&self, file_path: &str) -> &[ExportRecord] {
        self.export_registry.exports_of(file_path)
    }

    pub fn get_diagnostics(&self, file_path: &str) -> &[Diagnostic] {
        self.file_diagnostics
            .get(file_path)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Callables calling `symbol_id`, from the callers index.
    pub fn get_callers(&self, symbol_id: &SymbolId) -> Vec<SymbolId> {
        self.callers_index()
            .get(symbol_id)
            .map(|callers| callers.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Callables `symbol_id` calls, from its node's enclosed calls.
    pub fn get_callees(&self, symbol_id: &SymbolId) -> Vec<SymbolId> {
        let graph = self.get_call_graph(None);
        let Some(node) = graph.node(symbol_id) else {
            return Vec::new();
        };
        let mut callees: Vec<SymbolId> = node
            .enclosed_calls
            .iter()
            .flat_map(|call| call.resolutions.iter().map(|r| r.symbol_id.clone()))
            .filter(|target| {
                self.definitions
                    .get(target)
                    .is_some_and(|d| d.is_callable())
            })
            .collect();
        callees.sort();
        callees.dedup();
        callees
    }

    /// Per-file resolution output (resolved references + callback flags).
    pub fn resolved_references(&self, file_path: &str) -> Option<&FileResolutions> {
        self.resolutions.get(file_path)
    }

    /// All indexed files, sorted.
    pub fn files(&self) -> Vec<String> {
        self.languages.keys().cloned().collect()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

fn stage_error_diagnostic(file_path: &str, error: &IndexError) -> Diagnostic {
    let kind = match error {
        IndexError::Parse(ParseError::QueryError { .. }) => DiagnosticKind::QueryError,
        IndexError::Parse(_) => DiagnosticKind::ParseError,
        _ => DiagnosticKind::ParseError,
    };
    Diagnostic::error(file_path, kind, error.to_string())
}

/// Shared handle: one writer, many readers, reads fenced from updates.
///
/// The coordinator itself is single-threaded over `&mut self`; this wrapper
/// provides the documented concurrency model for hosts that want it.
#[derive(Clone)]
pub struct SharedProjectIndex {
    inner: Arc<RwLock<ProjectIndex>>,
}

impl SharedProjectIndex {
    pub fn new(index: ProjectIndex) -> Self {
        Self {
            inner: Arc::new(RwLock::new(index)),
        }
    }

    pub fn update_file(&self, file_path: &str, source: Option<&str>) -> UpdateResult {
        self.inner.write().update_file(file_path, source)
    }

    pub fn read(&self) -> parking_lot::RwLockReadGuard<'_, ProjectIndex> {
        self.inner.read()
    }
}
