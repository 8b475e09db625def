//! Name resolution.
//!
//! A reference name resolves through, in order: the lexical scope walk from
//! its enclosing scope outward, the file's import bindings (following
//! export chains across files, bounded by the re-export hop limit), and
//! namespace member lookup. Method names are not resolved here; they wait
//! for receiver types to settle.

use std::collections::{HashMap, HashSet};
use tracing::trace;

use crate::config::ResolutionConfig;
use crate::error::{Diagnostic, DiagnosticKind};
use crate::parsing::Language;
use crate::storage::{
    DefinitionRegistry, ExportRegistry, ImportRegistry, ReferenceRegistry, ScopeRegistry,
};
use crate::symbol::{DefKind, Definition, ExportRecord, ImportRecord};
use crate::types::{ScopeId, SymbolId};

use super::{Confidence, Resolution, ResolutionReason, sort_resolutions};

/// Read-only view of everything resolution needs.
pub struct ResolverContext<'a> {
    pub definitions: &'a DefinitionRegistry,
    pub scopes: &'a ScopeRegistry,
    pub exports: &'a ExportRegistry,
    pub imports: &'a ImportRegistry,
    pub references: &'a ReferenceRegistry,
    /// `(file, import_path)` -> resolved target file.
    pub import_targets: &'a HashMap<(String, String), String>,
    /// Every indexed file, for re-export path resolution.
    pub known_files: &'a [String],
    pub limits: &'a ResolutionConfig,
}

impl<'a> ResolverContext<'a> {
    fn target_of(&self, file: &str, import_path: &str) -> Option<&String> {
        self.import_targets
            .get(&(file.to_string(), import_path.to_string()))
    }
}

/// Resolves names against the project registries.
pub struct NameResolver<'a> {
    ctx: &'a ResolverContext<'a>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> NameResolver<'a> {
    pub fn new(ctx: &'a ResolverContext<'a>) -> Self {
        Self {
            ctx,
            diagnostics: Vec::new(),
        }
    }

    /// Resolve a name used at `(file, scope_id, at_line)`.
    ///
    /// Returns an empty vector when nothing matches; that is not an error.
    pub fn resolve_name(
        &mut self,
        file: &str,
        name: &str,
        scope_id: ScopeId,
        at_line: u32,
    ) -> Vec<Resolution> {
        if let Some(local) = self.resolve_lexical(file, name, scope_id, at_line) {
            // Import bindings hand off to the exporting file. A binding
            // whose target or export cannot be found resolves to nothing;
            // an unknown symbol is not an error.
            if local.kind == DefKind::ImportBinding {
                let binding_id = local.symbol_id.clone();
                if let Some(record) = self.ctx.imports.by_binding(&binding_id) {
                    let record = record.clone();
                    return self.follow_import(file, &record);
                }
                return Vec::new();
            }
            return vec![Resolution::new(
                local.symbol_id.clone(),
                Confidence::Certain,
                ResolutionReason::Lexical,
            )];
        }

        // No lexical hit; try import bindings directly (hoisted to module
        // scope, so normally found by the walk; this covers glob imports).
        if let Some(record) = self.ctx.imports.binding_named(file, name) {
            let record = record.clone();
            return self.follow_import(file, &record);
        }

        // Glob imports: the name may come from any `import *`-ed module.
        let globs: Vec<ImportRecord> = self
            .ctx
            .imports
            .imports_of(file)
            .iter()
            .filter(|r| r.is_namespace && r.local_name == "*")
            .cloned()
            .collect();
        for record in globs {
            let Some(target) = self.ctx.target_of(file, &record.import_path).cloned() else {
                continue;
            };
            let resolutions = self.follow_export(&target, name, 1, &mut HashSet::new());
            if !resolutions.is_empty() {
                return resolutions;
            }
        }

        Vec::new()
    }

    /// The standard lexical scope walk: nearest visible definition wins.
    pub fn resolve_lexical(
        &self,
        file: &str,
        name: &str,
        scope_id: ScopeId,
        at_line: u32,
    ) -> Option<&'a Definition> {
        let tree = self.ctx.scopes.get(file)?;
        let mut crossed_callable = false;
        for (depth, scope) in tree.walk_out(scope_id).enumerate() {
            if depth as u32 >= self.ctx.limits.max_scope_depth {
                break;
            }
            // Members of sealed scopes (class bodies, impl blocks) are not
            // lexically addressable from nested callables.
            let skip = scope.kind.sealed() && crossed_callable;
            if !skip {
                let mut candidates: Vec<&Definition> = self
                    .ctx
                    .definitions
                    .in_scope(file, scope.id)
                    .filter(|def| {
                        def.name == name
                            && def.kind.is_lexical()
                            && (def.is_hoisted() || def.location.range.start_line <= at_line)
                    })
                    .collect();
                if !candidates.is_empty() {
                    // Latest declaration before the use site wins.
                    candidates.sort_by_key(|d| d.location.range.start_line);
                    let visible: Vec<&&Definition> = candidates
                        .iter()
                        .filter(|d| d.location.range.start_line <= at_line)
                        .collect();
                    return Some(visible.last().map(|d| **d).unwrap_or(candidates[0]));
                }
            }
            if matches!(
                scope.kind,
                crate::indexing::scopes::ScopeKind::Function
                    | crate::indexing::scopes::ScopeKind::Method
            ) {
                crossed_callable = true;
            }
        }
        None
    }

    /// Follow an import binding into the exporting file.
    fn follow_import(&mut self, file: &str, record: &ImportRecord) -> Vec<Resolution> {
        let Some(target) = self.ctx.target_of(file, &record.import_path).cloned() else {
            trace!(
                file,
                import_path = %record.import_path,
                "import target not in project"
            );
            return Vec::new();
        };
        if record.is_namespace {
            // The namespace itself is the binding; member access resolves
            // separately.
            return vec![Resolution::new(
                record.local_binding_symbol_id.clone(),
                Confidence::Certain,
                ResolutionReason::Import,
            )];
        }
        self.follow_export(&target, &record.imported_name, 0, &mut HashSet::new())
    }

    /// Look up an exported name in `file`, following re-export chains.
    ///
    /// `hops` counts re-export indirections: 0 is a direct export
    /// (`certain`), anything deeper is `probable`. Chains stop at the hop
    /// limit or on a revisit, with a cycle diagnostic.
    pub fn follow_export(
        &mut self,
        file: &str,
        name: &str,
        hops: u32,
        visited: &mut HashSet<(String, String)>,
    ) -> Vec<Resolution> {
        if hops > self.ctx.limits.max_reexport_hops {
            self.diagnostics.push(Diagnostic::warning(
                file,
                DiagnosticKind::ResolutionCycle,
                format!("re-export chain for '{name}' exceeded {} hops", self.ctx.limits.max_reexport_hops),
            ));
            return Vec::new();
        }
        if !visited.insert((file.to_string(), name.to_string())) {
            self.diagnostics.push(Diagnostic::warning(
                file,
                DiagnosticKind::ResolutionCycle,
                format!("re-export cycle while resolving '{name}'"),
            ));
            return Vec::new();
        }

        let records = self.ctx.exports.lookup(file, name);
        let chosen = choose_export(&records);
        let mut resolutions = Vec::new();

        match chosen {
            ExportChoice::Single(record) => {
                resolutions.extend(self.resolve_export_record(file, record.clone(), name, hops, visited));
            }
            ExportChoice::Tie(tied) => {
                // Same-named exports the tie-break could not separate:
                // emit every candidate as ambiguous.
                for record in tied {
                    for mut resolution in
                        self.resolve_export_record(file, record.clone(), name, hops, visited)
                    {
                        resolution.confidence = Confidence::Ambiguous;
                        resolutions.push(resolution);
                    }
                }
            }
            ExportChoice::None => {
                // Fall through to glob re-exports.
                let globs: Vec<ExportRecord> = self
                    .ctx
                    .exports
                    .glob_re_exports(file)
                    .into_iter()
                    .cloned()
                    .collect();
                for record in globs {
                    let Some(from) = &record.re_export_from else {
                        continue;
                    };
                    let Some(next) = self.resolve_re_export_path(file, from) else {
                        continue;
                    };
                    resolutions.extend(self.follow_export(&next, name, hops + 1, visited));
                    if !resolutions.is_empty() {
                        break;
                    }
                }
            }
        }

        sort_resolutions(&mut resolutions);
        resolutions
    }

    fn resolve_export_record(
        &mut self,
        file: &str,
        record: ExportRecord,
        name: &str,
        hops: u32,
        visited: &mut HashSet<(String, String)>,
    ) -> Vec<Resolution> {
        if let Some(local) = &record.local_symbol_id {
            let reason = if hops == 0 {
                ResolutionReason::Import
            } else {
                ResolutionReason::ReExport
            };
            let confidence = if hops == 0 {
                Confidence::Certain
            } else {
                Confidence::Probable
            };
            return vec![Resolution::new(local.clone(), confidence, reason)];
        }
        if let Some(from) = &record.re_export_from {
            let source_name = record
                .re_export_name
                .clone()
                .unwrap_or_else(|| name.to_string());
            if let Some(next) = self.resolve_re_export_path(file, from) {
                return self.follow_export(&next, &source_name, hops + 1, visited);
            }
        }
        Vec::new()
    }

    /// Resolve a re-export's module specifier relative to the exporting
    /// file, using that file's language rules.
    fn resolve_re_export_path(&self, file: &str, specifier: &str) -> Option<String> {
        let language = Language::from_path(file)?;
        language
            .behavior()
            .resolve_import_target(specifier, file, self.ctx.known_files)
    }

    /// Member lookup through a namespace import binding: `ns.member`.
    pub fn resolve_namespace_member(
        &mut self,
        file: &str,
        binding: &SymbolId,
        member: &str,
    ) -> Vec<Resolution> {
        let Some(record) = self.ctx.imports.by_binding(binding) else {
            return Vec::new();
        };
        if !record.is_namespace {
            return Vec::new();
        }
        let import_path = record.import_path.clone();
        let Some(target) = self.ctx.target_of(file, &import_path).cloned() else {
            return Vec::new();
        };
        self.follow_export(&target, member, 0, &mut HashSet::new())
    }
}

enum ExportChoice<'r> {
    Single(&'r ExportRecord),
    Tie(Vec<&'r ExportRecord>),
    None,
}

/// Tie-break same-named exports: value exports beat type-only exports;
/// beyond that the candidates stay ambiguous.
fn choose_export<'r>(records: &[&'r ExportRecord]) -> ExportChoice<'r> {
    if records.is_empty() {
        return ExportChoice::None;
    }
    if records.len() == 1 {
        return ExportChoice::Single(records[0]);
    }
    let values: Vec<&'r ExportRecord> = records
        .iter()
        .copied()
        .filter(|r| !r.is_type_only)
        .collect();
    match values.len() {
        1 => ExportChoice::Single(values[0]),
        0 => ExportChoice::Tie(records.to_vec()),
        _ => ExportChoice::Tie(values),
    }
}
