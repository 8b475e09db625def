//! Type registry and propagation.
//!
//! Maps symbols to types. Sources in precedence order: explicit
//! annotations, constructor-call initializers, resolved-callee return
//! types, and propagation from another typed binding. Propagation iterates
//! to a fixed point over the affected files, bounded by the configured
//! round limit; leftovers stay unknown with a diagnostic.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::error::{Diagnostic, DiagnosticKind};
use crate::symbol::{DefKind, Definition, Initializer};
use crate::types::SymbolId;

use super::name::{NameResolver, ResolverContext};

/// A resolved type: a type-kind definition, or a primitive token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    Named(SymbolId),
    Primitive(String),
}

impl TypeRef {
    pub fn as_named(&self) -> Option<&SymbolId> {
        match self {
            TypeRef::Named(id) => Some(id),
            TypeRef::Primitive(_) => None,
        }
    }
}

/// `symbol -> type`. Keyed by symbol id, so entries for removed symbols
/// are purged when their defining file leaves the project.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<SymbolId, TypeRef>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn type_of(&self, symbol: &SymbolId) -> Option<&TypeRef> {
        self.types.get(symbol)
    }

    pub fn set(&mut self, symbol: SymbolId, type_ref: TypeRef) -> bool {
        match self.types.get(&symbol) {
            Some(existing) if *existing == type_ref => false,
            _ => {
                self.types.insert(symbol, type_ref);
                true
            }
        }
    }

    /// Drop entries whose symbol is gone.
    pub fn purge(&mut self, removed: &HashSet<SymbolId>) {
        self.types.retain(|symbol, _| !removed.contains(symbol));
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

const PRIMITIVES: &[&str] = &[
    "number", "string", "boolean", "void", "null", "undefined", "any", "unknown", "never",
    "bigint", "symbol", "object", "int", "float", "str", "bool", "bytes", "None", "i8", "i16",
    "i32", "i64", "i128", "u8", "u16", "u32", "u64", "u128", "usize", "isize", "f32", "f64",
    "char", "()",
];

/// Run bounded fixed-point type propagation over `files`.
pub fn propagate_types(
    ctx: &ResolverContext<'_>,
    files: &[String],
    registry: &mut TypeRegistry,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let limit = ctx.limits.type_propagation_rounds;

    for round in 0..limit {
        let mut changed = false;
        for file in files {
            for def in ctx.definitions.in_file(file) {
                if !matches!(
                    def.kind,
                    DefKind::Parameter
                        | DefKind::Variable
                        | DefKind::Constant
                        | DefKind::Property
                        | DefKind::Field
                ) {
                    continue;
                }
                if registry.type_of(&def.symbol_id).is_some() {
                    continue;
                }
                if let Some(type_ref) = infer_type(ctx, registry, file, def) {
                    changed |= registry.set(def.symbol_id.clone(), type_ref);
                }
            }
        }
        if !changed {
            debug!(round, "type propagation reached fixed point");
            return diagnostics;
        }
    }

    // One more probe: if anything would still change, the fixed point was
    // not reached within the limit.
    let mut residual = false;
    'outer: for file in files {
        for def in ctx.definitions.in_file(file) {
            if registry.type_of(&def.symbol_id).is_none()
                && matches!(def.kind, DefKind::Variable | DefKind::Parameter)
                && infer_type(ctx, registry, file, def).is_some()
            {
                residual = true;
                break 'outer;
            }
        }
    }
    if residual {
        for file in files {
            diagnostics.push(Diagnostic::warning(
                file.clone(),
                DiagnosticKind::TypeFixpointNotReached,
                format!("type propagation stopped after {limit} rounds; remaining types left unknown"),
            ));
        }
    }
    diagnostics
}

/// One inference step for one binding, honoring source precedence.
fn infer_type(
    ctx: &ResolverContext<'_>,
    registry: &TypeRegistry,
    file: &str,
    def: &Definition,
) -> Option<TypeRef> {
    let at_line = def.location.range.start_line;

    // 1. Explicit annotation.
    if let Some(annotation) = &def.type_annotation {
        if let Some(type_ref) = resolve_type_name(ctx, file, annotation, def, at_line) {
            return Some(type_ref);
        }
    }

    match def.init.as_ref() {
        // 2. Constructor-call right-hand side.
        Some(Initializer::Constructor(type_name)) => {
            resolve_type_name(ctx, file, type_name, def, at_line)
        }
        // 3. Return type of the called function (or Python instantiation).
        Some(Initializer::Call(callee)) => {
            let mut resolver = NameResolver::new(ctx);
            let resolutions = resolver.resolve_name(file, callee, def.scope_id, at_line);
            let target = resolutions.first()?;
            let callee_def = ctx.definitions.get(&target.symbol_id)?;
            if callee_def.kind.is_type() {
                return Some(TypeRef::Named(callee_def.symbol_id.clone()));
            }
            let return_type = callee_def.return_type.clone()?;
            let callee_file = callee_def.location.file_path.clone();
            let callee_def = callee_def.clone();
            resolve_type_name(ctx, &callee_file, &return_type, &callee_def, callee_def.location.range.start_line)
        }
        // 4. Assignment from another typed binding.
        Some(Initializer::Variable(other)) => {
            let resolver = NameResolver::new(ctx);
            let other_def = resolver.resolve_lexical(file, other, def.scope_id, at_line)?;
            registry.type_of(&other_def.symbol_id).cloned()
        }
        _ => None,
    }
}

/// Resolve a type annotation's text to a type definition or primitive.
fn resolve_type_name(
    ctx: &ResolverContext<'_>,
    file: &str,
    raw: &str,
    at: &Definition,
    at_line: u32,
) -> Option<TypeRef> {
    let name = raw.trim();
    if PRIMITIVES.contains(&name) {
        return Some(TypeRef::Primitive(name.to_string()));
    }
    if !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
        // Compound annotations (generics, unions) are not modeled.
        return None;
    }
    let mut resolver = NameResolver::new(ctx);
    let resolutions = resolver.resolve_name(file, name, at.scope_id, at_line);
    for resolution in &resolutions {
        if let Some(def) = ctx.definitions.get(&resolution.symbol_id) {
            if def.kind.is_type() {
                return Some(TypeRef::Named(def.symbol_id.clone()));
            }
        }
    }
    None
}
