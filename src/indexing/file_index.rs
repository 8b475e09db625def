//! The per-file indexing pipeline.
//!
//! Four deterministic passes: query execution, scope construction,
//! definition extraction, reference extraction. The result is a pure
//! function of `(source, language)`; no registry state is consulted.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Diagnostic, IndexError};
use crate::parsing::query_runner::{self, CaptureEntity};
use crate::parsing::{Language, ParsedFile};
use crate::symbol::{DefKind, Definition, ExportRecord, ImportRecord};
use crate::types::ScopeId;

use super::definitions::{apply_impl_relations, build_definitions};
use super::references::{Reference, build_references};
use super::scopes::{ScopeCapture, ScopeTree, build_scope_tree};

/// The semantic index of one file revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticIndex {
    pub file_path: String,
    pub language: Language,
    pub root_scope_id: ScopeId,
    pub scopes: ScopeTree,
    pub definitions: Vec<Definition>,
    pub references: Vec<Reference>,
    pub imports: Vec<ImportRecord>,
    pub exports: Vec<ExportRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

impl SemanticIndex {
    pub fn definitions_by_kind(&self, kind: DefKind) -> impl Iterator<Item = &Definition> {
        self.definitions.iter().filter(move |d| d.kind == kind)
    }

    pub fn callables(&self) -> impl Iterator<Item = &Definition> {
        self.definitions.iter().filter(|d| d.is_callable())
    }
}

/// Index one file. Parse and query failures surface as `Err`; scope
/// anomalies surface as diagnostics on the returned index.
pub fn index_file(file_path: &str, source: &str, language: Language) -> Result<SemanticIndex, IndexError> {
    let parsed = ParsedFile::parse(file_path, source, language)?;
    let behavior = language.behavior();
    let query = language.dialect(file_path).query()?;

    // Pass 1: typed captures.
    let captures = query_runner::run_query(&parsed.tree, &parsed.source, query);
    debug!(file = file_path, captures = captures.len(), "query pass complete");

    // Pass 2: scope tree.
    let scope_captures: Vec<ScopeCapture> = captures
        .iter()
        .filter(|c| c.name.entity == CaptureEntity::Scope)
        .map(|c| ScopeCapture {
            kind: behavior.scope_kind(c.name.qualifier()),
            range: c.range,
            name: behavior.scope_name(c.node, &parsed.source),
            node_id: c.node.id(),
        })
        .collect();
    let scope_result = build_scope_tree(file_path, scope_captures);
    let mut diagnostics = scope_result.diagnostics;

    // Pass 3: definitions, imports, exports.
    let mut built = build_definitions(
        file_path,
        &parsed.source,
        behavior,
        &scope_result.tree,
        &scope_result.scope_by_node,
        &captures,
    )?;
    apply_impl_relations(&parsed.source, behavior, &captures, &mut built.definitions);

    // Pass 4: references.
    let references = build_references(
        file_path,
        &parsed.source,
        behavior,
        &scope_result.tree,
        &captures,
        &built.definitions,
    );

    diagnostics.retain(|d| d.file_path == file_path);
    Ok(SemanticIndex {
        file_path: file_path.to_string(),
        language,
        root_scope_id: scope_result.tree.root_scope_id(),
        scopes: scope_result.tree,
        definitions: built.definitions,
        references,
        imports: built.imports,
        exports: built.exports,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::references::{CallType, RefType};
    use crate::indexing::scopes::ScopeKind;

    fn index_ts(source: &str) -> SemanticIndex {
        index_file("a.ts", source, Language::TypeScript).unwrap()
    }

    #[test]
    fn indexes_function_definition_and_call() {
        let index = index_ts("function helper() {}\nhelper();\n");

        let helper = index
            .definitions_by_kind(DefKind::Function)
            .next()
            .expect("helper indexed");
        assert_eq!(helper.name, "helper");
        assert!(helper.is_hoisted());
        assert_eq!(helper.symbol_id.as_str(), "function:module:helper");
        assert_eq!(helper.scope_id, index.root_scope_id);
        assert!(helper.body_scope.is_some());

        let call = index
            .references
            .iter()
            .find(|r| r.is_call())
            .expect("call indexed");
        assert_eq!(call.name, "helper");
        assert_eq!(call.call.as_ref().unwrap().call_type, CallType::Function);
    }

    #[test]
    fn method_symbol_ids_walk_the_scope_path() {
        let index = index_ts("class C {\n  m() { this.m(); }\n}\n");

        let method = index
            .definitions_by_kind(DefKind::Method)
            .next()
            .expect("method indexed");
        assert_eq!(method.symbol_id.as_str(), "method:module/C:m");

        let class = index.definitions_by_kind(DefKind::Class).next().unwrap();
        assert_eq!(method.container.as_ref(), Some(&class.symbol_id));

        let call = index.references.iter().find(|r| r.is_call()).unwrap();
        let info = call.call.as_ref().unwrap();
        assert_eq!(info.call_type, CallType::Method);
        assert_eq!(info.receiver.as_ref().unwrap().text, "this");
    }

    #[test]
    fn duplicate_names_get_line_qualifiers() {
        let index = index_file(
            "a.py",
            "x = 1\nx = 2\n",
            Language::Python,
        )
        .unwrap();
        let ids: Vec<&str> = index
            .definitions_by_kind(DefKind::Variable)
            .map(|d| d.symbol_id.as_str())
            .collect();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], "variable:module:x");
        assert_eq!(ids[1], "variable:module:x:2");
    }

    #[test]
    fn anonymous_callables_are_definitions() {
        let index = index_ts("run(() => {});\nfunction run(cb) { cb(); }\n");
        let anonymous = index
            .definitions_by_kind(DefKind::Function)
            .find(|d| d.name == "<anonymous>")
            .expect("anonymous arrow indexed");
        assert!(anonymous.body_scope.is_some());
    }

    #[test]
    fn parameters_attach_to_the_callable_scope() {
        let index = index_ts("function run(cb) { cb(); }\n");
        let parameter = index
            .definitions_by_kind(DefKind::Parameter)
            .next()
            .expect("parameter indexed");
        assert_eq!(parameter.name, "cb");
        let run = index.definitions_by_kind(DefKind::Function).next().unwrap();
        assert_eq!(Some(parameter.scope_id), run.body_scope);
    }

    #[test]
    fn exports_mark_definitions_and_produce_records() {
        let index = index_ts("export function helper() {}\nfunction internal() {}\n");

        let helper = index
            .definitions
            .iter()
            .find(|d| d.name == "helper")
            .unwrap();
        assert!(helper.is_exported());
        let internal = index
            .definitions
            .iter()
            .find(|d| d.name == "internal")
            .unwrap();
        assert!(!internal.is_exported());

        assert_eq!(index.exports.len(), 1);
        assert_eq!(index.exports[0].exported_name, "helper");
        assert_eq!(
            index.exports[0].local_symbol_id.as_ref(),
            Some(&helper.symbol_id)
        );
    }

    #[test]
    fn imports_create_bindings() {
        let index = index_ts("import { helper } from \"./lib\";\nhelper();\n");

        assert_eq!(index.imports.len(), 1);
        let record = &index.imports[0];
        assert_eq!(record.import_path, "./lib");
        assert_eq!(record.imported_name, "helper");

        let binding = index
            .definitions_by_kind(DefKind::ImportBinding)
            .next()
            .expect("import binding definition");
        assert_eq!(binding.name, "helper");
        assert_eq!(binding.symbol_id, record.local_binding_symbol_id);
    }

    #[test]
    fn python_methods_and_rust_impls_link_containers() {
        let py = index_file(
            "a.py",
            "class C:\n    def m(self):\n        pass\n",
            Language::Python,
        )
        .unwrap();
        let method = py.definitions_by_kind(DefKind::Method).next().unwrap();
        let class = py.definitions_by_kind(DefKind::Class).next().unwrap();
        assert_eq!(method.container.as_ref(), Some(&class.symbol_id));

        let rs = index_file(
            "a.rs",
            "pub struct P;\nimpl P {\n    pub fn norm(&self) {}\n}\n",
            Language::Rust,
        )
        .unwrap();
        let method = rs.definitions_by_kind(DefKind::Method).next().unwrap();
        let strukt = rs.definitions_by_kind(DefKind::Struct).next().unwrap();
        assert_eq!(method.container.as_ref(), Some(&strukt.symbol_id));
        assert!(strukt.is_exported());
    }

    #[test]
    fn rust_trait_impls_record_implements() {
        let index = index_file(
            "a.rs",
            "pub trait Visit { fn visit(&self); }\npub struct P;\nimpl Visit for P {\n    fn visit(&self) {}\n}\n",
            Language::Rust,
        )
        .unwrap();
        let strukt = index.definitions_by_kind(DefKind::Struct).next().unwrap();
        assert_eq!(strukt.implements, vec!["Visit".to_string()]);
    }

    #[test]
    fn read_references_skip_definition_names_and_callees() {
        let index = index_ts("function helper() {}\nhelper();\nconst x = helper;\n");
        let reads: Vec<&Reference> = index
            .references
            .iter()
            .filter(|r| r.ref_type == RefType::Read)
            .collect();
        // Only the bare `helper` on the right-hand side is a read.
        assert_eq!(reads.len(), 1);
        assert_eq!(reads[0].name, "helper");
        assert_eq!(reads[0].location.range.start_line, 3);
    }

    #[test]
    fn scope_invariants_hold() {
        let index = index_ts(
            "class C {\n  m(a) {\n    const x = 1;\n    if (a) { const y = 2; }\n  }\n}\n",
        );
        for def in &index.definitions {
            let scope = index.scopes.get(def.scope_id).expect("scope exists");
            assert!(
                scope.range.contains_range(&def.location.range),
                "definition {} outside its scope",
                def.name
            );
        }
        for reference in &index.references {
            let scope = index.scopes.get(reference.scope_id).expect("scope exists");
            assert!(scope.range.contains_range(&reference.location.range));
        }
        // Scope kinds reflect construct kinds.
        assert!(index.scopes.iter().any(|s| s.kind == ScopeKind::Class));
        assert!(index.scopes.iter().any(|s| s.kind == ScopeKind::Method));
    }

    #[test]
    fn empty_source_yields_empty_index() {
        let index = index_ts("");
        assert!(index.definitions.is_empty());
        assert!(index.references.is_empty());
        assert!(index.exports.is_empty());
    }
}
