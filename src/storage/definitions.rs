//! The definition registry.
//!
//! Flat tables keyed by symbol id, with secondary indexes by file, location
//! key, scope, and name, plus the member index used for method dispatch.
//! The file is the unit of invalidation: updating a file removes its
//! previous contribution before the new one is inserted.

use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap};

use crate::indexing::SemanticIndex;
use crate::symbol::Definition;
use crate::types::{LocationKey, ScopeId, SymbolId, SymbolName};

#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    by_symbol: HashMap<SymbolId, Definition>,
    by_file: HashMap<String, Vec<SymbolId>>,
    by_location: HashMap<LocationKey, SymbolId>,
    by_scope: HashMap<(String, ScopeId), Vec<SymbolId>>,
    by_name: HashMap<SymbolName, BTreeSet<SymbolId>>,
    /// Container type -> member name -> member symbol.
    members: HashMap<SymbolId, IndexMap<SymbolName, SymbolId>>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every contribution of `file_path`.
    pub fn remove_file(&mut self, file_path: &str) {
        let Some(symbols) = self.by_file.remove(file_path) else {
            return;
        };
        for symbol_id in symbols {
            if let Some(def) = self.by_symbol.remove(&symbol_id) {
                self.by_location.remove(&def.location.key());
                if let Some(set) = self.by_name.get_mut(&def.name) {
                    set.remove(&symbol_id);
                    if set.is_empty() {
                        self.by_name.remove(&def.name);
                    }
                }
                self.members.remove(&symbol_id);
            }
        }
        self.by_scope.retain(|(file, _), _| file != file_path);
    }

    /// Insert one file's definitions. The file must have been removed
    /// first; double insertion is a coordinator bug.
    pub fn insert_index(&mut self, index: &SemanticIndex) {
        let file_path = index.file_path.clone();
        let mut file_symbols = Vec::with_capacity(index.definitions.len());

        for def in &index.definitions {
            let symbol_id = def.symbol_id.clone();
            file_symbols.push(symbol_id.clone());
            self.by_location.insert(def.location.key(), symbol_id.clone());
            self.by_scope
                .entry((file_path.clone(), def.scope_id))
                .or_default()
                .push(symbol_id.clone());
            self.by_name
                .entry(def.name.clone())
                .or_default()
                .insert(symbol_id.clone());
            if let Some(container) = &def.container {
                self.members
                    .entry(container.clone())
                    .or_default()
                    .insert(def.name.clone(), symbol_id.clone());
            }
            self.by_symbol.insert(symbol_id, def.clone());
        }

        self.by_file.insert(file_path, file_symbols);
    }

    pub fn get(&self, symbol_id: &SymbolId) -> Option<&Definition> {
        self.by_symbol.get(symbol_id)
    }

    pub fn at_location(&self, key: &LocationKey) -> Option<&Definition> {
        self.by_location.get(key).and_then(|id| self.by_symbol.get(id))
    }

    pub fn in_file(&self, file_path: &str) -> impl Iterator<Item = &Definition> {
        self.by_file
            .get(file_path)
            .into_iter()
            .flatten()
            .filter_map(|id| self.by_symbol.get(id))
    }

    pub fn in_scope(&self, file_path: &str, scope_id: ScopeId) -> impl Iterator<Item = &Definition> {
        self.by_scope
            .get(&(file_path.to_string(), scope_id))
            .into_iter()
            .flatten()
            .filter_map(|id| self.by_symbol.get(id))
    }

    /// All definitions carrying `name`, in stable symbol-id order.
    pub fn find_by_name(&self, name: &str) -> impl Iterator<Item = &Definition> {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|id| self.by_symbol.get(id))
    }

    /// Member lookup on a container type.
    pub fn member(&self, container: &SymbolId, member_name: &str) -> Option<&SymbolId> {
        self.members.get(container).and_then(|m| m.get(member_name))
    }

    pub fn members_of(&self, container: &SymbolId) -> impl Iterator<Item = (&SymbolName, &SymbolId)> {
        self.members.get(container).into_iter().flatten()
    }

    pub fn files(&self) -> impl Iterator<Item = &String> {
        self.by_file.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Definition> {
        self.by_symbol.values()
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::index_file;
    use crate::parsing::Language;

    fn registry_with(source: &str) -> DefinitionRegistry {
        let index = index_file("a.ts", source, Language::TypeScript).unwrap();
        let mut registry = DefinitionRegistry::new();
        registry.insert_index(&index);
        registry
    }

    #[test]
    fn indexes_by_name_and_location() {
        let registry = registry_with("function helper() {}\n");
        let def = registry.find_by_name("helper").next().unwrap();
        assert_eq!(def.name, "helper");
        assert_eq!(
            registry.at_location(&def.location.key()).unwrap().symbol_id,
            def.symbol_id
        );
    }

    #[test]
    fn member_index_links_class_members() {
        let registry = registry_with("class C { m() {} n() {} }\n");
        let class = registry.find_by_name("C").next().unwrap().symbol_id.clone();
        assert!(registry.member(&class, "m").is_some());
        assert!(registry.member(&class, "n").is_some());
        assert!(registry.member(&class, "missing").is_none());
        assert_eq!(registry.members_of(&class).count(), 2);
    }

    #[test]
    fn removal_clears_every_index() {
        let mut registry = registry_with("class C { m() {} }\nfunction f() {}\n");
        assert!(!registry.is_empty());
        let location = registry.find_by_name("f").next().unwrap().location.clone();

        registry.remove_file("a.ts");

        assert!(registry.is_empty());
        assert!(registry.find_by_name("f").next().is_none());
        assert!(registry.find_by_name("C").next().is_none());
        assert!(registry.at_location(&location.key()).is_none());
        assert_eq!(registry.in_file("a.ts").count(), 0);
    }

    #[test]
    fn reinsertion_restores_state() {
        let index = index_file("a.ts", "function f() {}\n", Language::TypeScript).unwrap();
        let mut registry = DefinitionRegistry::new();
        registry.insert_index(&index);
        let before: Vec<SymbolId> = registry.iter().map(|d| d.symbol_id.clone()).collect();

        registry.remove_file("a.ts");
        registry.insert_index(&index);
        let after: Vec<SymbolId> = registry.iter().map(|d| d.symbol_id.clone()).collect();
        assert_eq!(before, after);
    }
}
