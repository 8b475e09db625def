//! Scope, export, reference, and import registries.
//!
//! Thin per-file tables sharing the same replacement semantics as the
//! definition registry: `remove_file` then `insert_index`, atomically from
//! the perspective of readers (the coordinator serializes writes).

use std::collections::HashMap;

use crate::indexing::SemanticIndex;
use crate::indexing::references::Reference;
use crate::indexing::scopes::ScopeTree;
use crate::symbol::{ExportRecord, ImportRecord};
use crate::types::SymbolId;

/// File -> scope tree.
#[derive(Debug, Default)]
pub struct ScopeRegistry {
    trees: HashMap<String, ScopeTree>,
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove_file(&mut self, file_path: &str) {
        self.trees.remove(file_path);
    }

    pub fn insert_index(&mut self, index: &SemanticIndex) {
        self.trees
            .insert(index.file_path.clone(), index.scopes.clone());
    }

    pub fn get(&self, file_path: &str) -> Option<&ScopeTree> {
        self.trees.get(file_path)
    }
}

/// File -> export records, with `(file, exported_name)` lookup.
#[derive(Debug, Default)]
pub struct ExportRegistry {
    by_file: HashMap<String, Vec<ExportRecord>>,
}

impl ExportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove_file(&mut self, file_path: &str) {
        self.by_file.remove(file_path);
    }

    pub fn insert_index(&mut self, index: &SemanticIndex) {
        self.by_file
            .insert(index.file_path.clone(), index.exports.clone());
    }

    pub fn exports_of(&self, file_path: &str) -> &[ExportRecord] {
        self.by_file.get(file_path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All records exporting `name` from `file_path`. Multiple records can
    /// share a name (value + type-only re-export); the resolver tie-breaks.
    pub fn lookup(&self, file_path: &str, name: &str) -> Vec<&ExportRecord> {
        self.exports_of(file_path)
            .iter()
            .filter(|record| record.exported_name == name)
            .collect()
    }

    /// Glob re-exports (`export * from "..."`) of a file.
    pub fn glob_re_exports(&self, file_path: &str) -> Vec<&ExportRecord> {
        self.exports_of(file_path)
            .iter()
            .filter(|record| {
                record.is_re_export() && record.re_export_name.as_deref() == Some("*")
            })
            .collect()
    }
}

/// File -> raw references.
#[derive(Debug, Default)]
pub struct ReferenceRegistry {
    by_file: HashMap<String, Vec<Reference>>,
}

impl ReferenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove_file(&mut self, file_path: &str) {
        self.by_file.remove(file_path);
    }

    pub fn insert_index(&mut self, index: &SemanticIndex) {
        self.by_file
            .insert(index.file_path.clone(), index.references.clone());
    }

    pub fn references_of(&self, file_path: &str) -> &[Reference] {
        self.by_file.get(file_path).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// File -> import records, with binding-symbol lookup.
#[derive(Debug, Default)]
pub struct ImportRegistry {
    by_file: HashMap<String, Vec<ImportRecord>>,
    by_binding: HashMap<SymbolId, ImportRecord>,
}

impl ImportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove_file(&mut self, file_path: &str) {
        if let Some(records) = self.by_file.remove(file_path) {
            for record in records {
                self.by_binding.remove(&record.local_binding_symbol_id);
            }
        }
    }

    pub fn insert_index(&mut self, index: &SemanticIndex) {
        for record in &index.imports {
            self.by_binding
                .insert(record.local_binding_symbol_id.clone(), record.clone());
        }
        self.by_file
            .insert(index.file_path.clone(), index.imports.clone());
    }

    pub fn imports_of(&self, file_path: &str) -> &[ImportRecord] {
        self.by_file.get(file_path).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn by_binding(&self, binding: &SymbolId) -> Option<&ImportRecord> {
        self.by_binding.get(binding)
    }

    /// The import record binding `name` locally in `file_path`.
    pub fn binding_named(&self, file_path: &str, name: &str) -> Option<&ImportRecord> {
        self.imports_of(file_path)
            .iter()
            .find(|record| record.local_name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::index_file;
    use crate::parsing::Language;

    #[test]
    fn export_lookup_finds_records() {
        let index = index_file(
            "lib.ts",
            "export function helper() {}\nexport { helper as util };\n",
            Language::TypeScript,
        )
        .unwrap();
        let mut registry = ExportRegistry::new();
        registry.insert_index(&index);

        assert_eq!(registry.lookup("lib.ts", "helper").len(), 1);
        assert_eq!(registry.lookup("lib.ts", "util").len(), 1);
        assert!(registry.lookup("lib.ts", "missing").is_empty());

        registry.remove_file("lib.ts");
        assert!(registry.exports_of("lib.ts").is_empty());
    }

    #[test]
    fn import_registry_links_bindings() {
        let index = index_file(
            "app.ts",
            "import { helper } from \"./lib\";\n",
            Language::TypeScript,
        )
        .unwrap();
        let mut registry = ImportRegistry::new();
        registry.insert_index(&index);

        let record = registry.binding_named("app.ts", "helper").unwrap();
        assert_eq!(record.import_path, "./lib");
        assert!(registry.by_binding(&record.local_binding_symbol_id).is_some());

        let binding = record.local_binding_symbol_id.clone();
        registry.remove_file("app.ts");
        assert!(registry.by_binding(&binding).is_none());
    }
}
