//! Definition extraction.
//!
//! A handler registry maps each definition capture qualifier to a handler
//! spec describing how to build the record: which [`DefKind`] it produces,
//! and whether it carries a callable signature, an initializer, or class
//! heritage. The builder assigns scopes, encodes symbol ids, and
//! disambiguates duplicate names with a starting-line qualifier.

use std::collections::{HashMap, HashSet};
use tracing::debug;
use tree_sitter::Node;

use crate::error::IndexError;
use crate::parsing::behavior::LanguageBehavior;
use crate::parsing::query_runner::{Capture, CaptureCategory, CaptureEntity};
use crate::symbol::{DefFlags, DefKind, Definition, ExportRecord, ImportRecord};
use crate::types::{Location, Range, ScopeId, SymbolId};

use super::scopes::{ScopeKind, ScopeTree};

/// How to build a definition from a capture of a given qualifier.
#[derive(Debug, Clone, Copy)]
struct HandlerSpec {
    kind: DefKind,
    callable: bool,
    variable: bool,
    heritage: bool,
}

/// The per-language handler registry. Qualifiers not present here are
/// reported once per file as a malformed capture.
fn handler_for(qualifier: &str) -> Option<HandlerSpec> {
    let spec = |kind, callable, variable, heritage| HandlerSpec {
        kind,
        callable,
        variable,
        heritage,
    };
    match qualifier {
        "function" => Some(spec(DefKind::Function, true, false, false)),
        "method" => Some(spec(DefKind::Method, true, false, false)),
        "class" => Some(spec(DefKind::Class, false, false, true)),
        "interface" => Some(spec(DefKind::Interface, false, false, true)),
        "struct" => Some(spec(DefKind::Struct, false, false, false)),
        "trait" => Some(spec(DefKind::Trait, false, false, false)),
        "type_alias" => Some(spec(DefKind::TypeAlias, false, false, false)),
        "enum" => Some(spec(DefKind::Enum, false, false, false)),
        "enumerator" => Some(spec(DefKind::Enumerator, false, false, false)),
        "variable" => Some(spec(DefKind::Variable, false, true, false)),
        "constant" => Some(spec(DefKind::Constant, false, true, false)),
        "parameter" => Some(spec(DefKind::Parameter, false, false, false)),
        "property" => Some(spec(DefKind::Property, false, false, false)),
        "field" => Some(spec(DefKind::Field, false, false, false)),
        _ => None,
    }
}

/// Output of the definition pass for one file.
#[derive(Debug, Default)]
pub struct DefinitionBuildResult {
    pub definitions: Vec<Definition>,
    pub imports: Vec<ImportRecord>,
    pub exports: Vec<ExportRecord>,
}

/// Build definitions, import records, and export records for one file.
pub fn build_definitions(
    file_path: &str,
    source: &str,
    behavior: &dyn LanguageBehavior,
    scopes: &ScopeTree,
    scope_by_node: &HashMap<usize, ScopeId>,
    captures: &[Capture<'_>],
) -> Result<DefinitionBuildResult, IndexError> {
    let mut result = DefinitionBuildResult::default();
    let mut used_ids: HashSet<SymbolId> = HashSet::new();
    let root = scopes.root_scope_id();

    // Definition captures.
    for capture in captures {
        if capture.name.entity != CaptureEntity::Definition {
            continue;
        }
        let Some(spec) = capture.name.qualifier().and_then(handler_for) else {
            debug!(
                capture = ?capture.name,
                "definition capture without handler, skipped"
            );
            continue;
        };

        let named = behavior.definition_name(capture.node, source);
        if let Some((name, _)) = &named {
            if !is_plain_name(name) {
                // Destructuring patterns and similar compound shapes do not
                // produce a single named definition.
                continue;
            }
        }
        let (name, name_range, anonymous) = match named {
            Some((name, range)) => (name, range, false),
            None => ("<anonymous>".to_string(), capture.range, true),
        };

        let body_scope = scope_by_node.get(&capture.node.id()).copied();
        let scope_id = enclosing_scope(scopes, &name_range, body_scope);
        let scope_path = scopes.scope_path(scope_id);

        let mut kind = spec.kind;
        // Context adjustments: functions inside class/impl bodies are
        // methods; constructor names get their own kind.
        if kind == DefKind::Function && !anonymous {
            if let Some(enclosing) = scopes.get(scope_id) {
                if matches!(enclosing.kind, ScopeKind::Class | ScopeKind::Impl) {
                    kind = DefKind::Method;
                }
            }
        }
        if kind == DefKind::Method && behavior.constructor_names().contains(&name.as_str()) {
            kind = DefKind::Constructor;
        }

        let mut flags = DefFlags::empty();
        if capture.name.category == CaptureCategory::Hoist {
            flags |= DefFlags::HOISTED;
        }
        if behavior.is_exported_definition(capture.node, source) {
            flags |= DefFlags::EXPORTED;
        }
        if behavior.is_test_definition(&name, file_path, &scope_path) {
            flags |= DefFlags::TEST;
        }

        let symbol_id = allocate_symbol_id(
            file_path,
            &mut used_ids,
            kind,
            &scope_path,
            &name,
            &name_range,
        )?;

        let mut definition = Definition {
            symbol_id,
            name,
            kind,
            location: Location::new(file_path, name_range),
            scope_id,
            body_scope,
            flags,
            signature: None,
            parameters: Vec::new(),
            return_type: None,
            base_classes: Vec::new(),
            implements: Vec::new(),
            container: None,
            type_annotation: None,
            init: None,
        };

        if spec.callable || kind.is_callable() {
            let signature = behavior.callable_signature(capture.node, source);
            definition.parameters = signature.parameters;
            definition.return_type = signature.return_type;
            definition.signature = signature.signature;
        }
        if spec.variable {
            let (init, annotation) = behavior.variable_info(capture.node, source);
            definition.init = init;
            definition.type_annotation = annotation;
        }
        if spec.heritage {
            let (bases, implements) = behavior.class_heritage(capture.node, source);
            definition.base_classes = bases;
            definition.implements = implements;
        }
        if kind == DefKind::Parameter || kind == DefKind::Property || kind == DefKind::Field {
            definition.type_annotation = parameter_annotation(capture.node, source);
        }

        result.definitions.push(definition);
    }

    link_containers(scopes, &mut result.definitions);

    // Import bindings.
    for capture in captures {
        if capture.name.entity != CaptureEntity::Import {
            continue;
        }
        for raw in behavior.collect_imports(capture.node, source) {
            let scope_path = scopes.scope_path(root);
            let binding_id = if raw.local_name == "*" {
                // Glob imports have no named binding.
                SymbolId::with_qualifier(
                    DefKind::ImportBinding.tag(),
                    &scope_path,
                    "*",
                    raw.range.start_line,
                )
            } else {
                let id = allocate_symbol_id(
                    file_path,
                    &mut used_ids,
                    DefKind::ImportBinding,
                    &scope_path,
                    &raw.local_name,
                    &raw.range,
                )?;
                let mut flags = DefFlags::HOISTED;
                if raw.is_type_only {
                    flags |= DefFlags::TYPE_ONLY;
                }
                result.definitions.push(Definition {
                    symbol_id: id.clone(),
                    name: raw.local_name.clone(),
                    kind: DefKind::ImportBinding,
                    location: Location::new(file_path, raw.range),
                    scope_id: root,
                    body_scope: None,
                    flags,
                    signature: None,
                    parameters: Vec::new(),
                    return_type: None,
                    base_classes: Vec::new(),
                    implements: Vec::new(),
                    container: None,
                    type_annotation: None,
                    init: None,
                });
                id
            };
            result.imports.push(ImportRecord {
                file_path: file_path.to_string(),
                import_path: raw.import_path,
                imported_name: raw.imported_name,
                local_binding_symbol_id: binding_id,
                local_name: raw.local_name,
                is_namespace: raw.is_namespace,
                is_type_only: raw.is_type_only,
            });
        }
    }

    // Explicit exports.
    for capture in captures {
        if capture.name.entity != CaptureEntity::Export {
            continue;
        }
        for raw in behavior.collect_exports(capture.node, source) {
            let local_symbol_id = raw.local_name.as_deref().and_then(|local| {
                find_exportable(&mut result.definitions, local).map(|def| {
                    def.flags |= DefFlags::EXPORTED;
                    def.symbol_id.clone()
                })
            });
            result.exports.push(ExportRecord {
                file_path: file_path.to_string(),
                exported_name: raw.exported_name,
                local_symbol_id,
                is_type_only: raw.is_type_only,
                re_export_from: raw.source_path,
                re_export_name: raw.source_name,
            });
        }
    }

    // Implicit exports (Python public module-level names, Rust pub items).
    let implicit: Vec<(String, SymbolId)> = result
        .definitions
        .iter()
        .filter(|def| {
            def.scope_id == root
                && def.kind != DefKind::ImportBinding
                && behavior.implicit_export(def)
        })
        .map(|def| (def.name.clone(), def.symbol_id.clone()))
        .collect();
    for (name, symbol_id) in implicit {
        if result
            .exports
            .iter()
            .any(|e| e.exported_name == name && !e.is_re_export())
        {
            continue;
        }
        if let Some(def) = result
            .definitions
            .iter_mut()
            .find(|d| d.symbol_id == symbol_id)
        {
            def.flags |= DefFlags::EXPORTED;
        }
        result.exports.push(ExportRecord {
            file_path: file_path.to_string(),
            exported_name: name,
            local_symbol_id: Some(symbol_id),
            is_type_only: false,
            re_export_from: None,
            re_export_name: None,
        });
    }

    Ok(result)
}

/// The smallest scope containing the name token, excluding the scope the
/// definition's own node creates (a function's name sits inside its own
/// range but belongs to the parent scope).
fn enclosing_scope(scopes: &ScopeTree, name_range: &Range, body_scope: Option<ScopeId>) -> ScopeId {
    let mut scope_id = scopes.smallest_containing(name_range);
    if let Some(own) = body_scope {
        while scope_id == own {
            match scopes.get(scope_id).and_then(|s| s.parent_scope_id) {
                Some(parent) => scope_id = parent,
                None => break,
            }
        }
    }
    scope_id
}

/// Encode a symbol id, appending the starting line (and then the column)
/// when the plain form is taken. A conflict surviving both qualifiers is a
/// builder bug.
fn allocate_symbol_id(
    file_path: &str,
    used: &mut HashSet<SymbolId>,
    kind: DefKind,
    scope_path: &str,
    name: &str,
    range: &Range,
) -> Result<SymbolId, IndexError> {
    let plain = SymbolId::new(kind.tag(), scope_path, name);
    if used.insert(plain.clone()) {
        return Ok(plain);
    }
    let with_line = SymbolId::with_qualifier(kind.tag(), scope_path, name, range.start_line);
    if used.insert(with_line.clone()) {
        return Ok(with_line);
    }
    let with_column = SymbolId::from_raw(format!(
        "{}:{}",
        with_line.as_str(),
        range.start_column
    ));
    if used.insert(with_column.clone()) {
        return Ok(with_column);
    }
    Err(IndexError::RegistryConflict {
        file_path: file_path.to_string(),
        symbol_id: with_column,
    })
}

/// Attach member definitions to their containing type definition.
fn link_containers(scopes: &ScopeTree, definitions: &mut [Definition]) {
    // Scope id -> owning type definition.
    let mut type_by_body: HashMap<ScopeId, SymbolId> = HashMap::new();
    let mut type_by_name: HashMap<String, SymbolId> = HashMap::new();
    for def in definitions.iter() {
        if def.kind.is_type() {
            if let Some(body) = def.body_scope {
                type_by_body.insert(body, def.symbol_id.clone());
            }
            type_by_name
                .entry(def.name.clone())
                .or_insert_with(|| def.symbol_id.clone());
        }
    }

    for def in definitions.iter_mut() {
        if !matches!(
            def.kind,
            DefKind::Method | DefKind::Constructor | DefKind::Property | DefKind::Field
        ) {
            continue;
        }
        let Some(container_scope) =
            scopes.nearest_of_kind(def.scope_id, &[ScopeKind::Class, ScopeKind::Impl])
        else {
            continue;
        };
        def.container = type_by_body.get(&container_scope.id).cloned().or_else(|| {
            // Impl blocks: the type is defined elsewhere in the file; match
            // it by the impl target name.
            container_scope
                .name
                .as_ref()
                .and_then(|name| type_by_name.get(name).cloned())
        });
    }
}

/// Find a definition an export clause can legally name: something lexical
/// at any scope, preferring module-level entries.
fn find_exportable<'a>(
    definitions: &'a mut Vec<Definition>,
    name: &str,
) -> Option<&'a mut Definition> {
    let index = definitions
        .iter()
        .enumerate()
        .filter(|(_, d)| d.name == name && d.kind.is_lexical())
        .min_by_key(|(_, d)| d.scope_id.value())?
        .0;
    definitions.get_mut(index)
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Apply Rust-style impl/trait relationships collected from scope captures:
/// `impl Trait for Type` adds `Trait` to `Type`'s implements list.
pub fn apply_impl_relations(
    source: &str,
    behavior: &dyn LanguageBehavior,
    captures: &[Capture<'_>],
    definitions: &mut [Definition],
) {
    for capture in captures {
        if capture.name.entity != CaptureEntity::Scope
            || capture.name.qualifier() != Some("impl")
        {
            continue;
        }
        let Some((type_name, Some(trait_name))) = behavior.impl_info(capture.node, source) else {
            continue;
        };
        if let Some(def) = definitions
            .iter_mut()
            .find(|d| d.kind.is_type() && d.name == type_name)
        {
            if !def.implements.contains(&trait_name) {
                def.implements.push(trait_name);
            }
        }
    }
}

fn parameter_annotation_via_fields(node: Node, source: &str) -> Option<String> {
    use crate::parsing::behavior::{clean_annotation, node_str};
    node.child_by_field_name("type")
        .map(|t| clean_annotation(&node_str(t, source)))
}

/// Declared type of a parameter/property capture: the node's own `type`
/// field, or the parent's for captures that land on the bare name token.
fn parameter_annotation(node: Node, source: &str) -> Option<String> {
    if let Some(annotation) = parameter_annotation_via_fields(node, source) {
        return Some(annotation);
    }
    let parent = node.parent()?;
    match parent.kind() {
        "typed_parameter" | "typed_default_parameter" | "default_parameter" => {
            parameter_annotation_via_fields(parent, source)
        }
        _ => None,
    }
}
