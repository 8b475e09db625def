//! Call resolution.
//!
//! For each call reference, choose target symbols using the name
//! resolution output, the receiver's propagated type, and the inheritance
//! hierarchy. Method dispatch walks the chain upward to find the defining
//! class, then collects subclass overrides; interface receivers fan out to
//! implementers; unknown receivers fall back to project-wide method-name
//! lookup.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use tracing::trace;

use crate::error::Diagnostic;
use crate::indexing::references::{CallType, Reference, RefType};
use crate::indexing::scopes::ScopeKind;
use crate::parsing::Language;
use crate::symbol::{DefKind, Definition, Initializer};
use crate::types::{ScopeId, SymbolId};

use super::name::{NameResolver, ResolverContext};
use super::types::TypeRegistry;
use super::{Confidence, FileResolutions, Resolution, ResolutionReason, sort_resolutions};

/// Project-wide inheritance links, rebuilt from the definition registry
/// whenever resolution runs.
#[derive(Debug, Default)]
pub struct TypeHierarchy {
    /// class -> resolved base class symbols, in declaration order.
    bases_of: HashMap<SymbolId, Vec<SymbolId>>,
    /// base class -> direct subclasses.
    derived_of: HashMap<SymbolId, BTreeSet<SymbolId>>,
    /// interface/trait -> implementing types.
    implementers_of: HashMap<SymbolId, BTreeSet<SymbolId>>,
}

impl TypeHierarchy {
    pub fn bases(&self, type_id: &SymbolId) -> &[SymbolId] {
        self.bases_of.get(type_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn direct_subclasses(&self, type_id: &SymbolId) -> impl Iterator<Item = &SymbolId> {
        self.derived_of.get(type_id).into_iter().flatten()
    }

    pub fn implementers(&self, interface: &SymbolId) -> impl Iterator<Item = &SymbolId> {
        self.implementers_of.get(interface).into_iter().flatten()
    }

    /// All transitive subclasses of `type_id`.
    pub fn derived_closure(&self, type_id: &SymbolId) -> Vec<SymbolId> {
        let mut seen: BTreeSet<SymbolId> = BTreeSet::new();
        let mut queue: VecDeque<SymbolId> = VecDeque::new();
        queue.push_back(type_id.clone());
        while let Some(current) = queue.pop_front() {
            for derived in self.direct_subclasses(&current) {
                if seen.insert(derived.clone()) {
                    queue.push_back(derived.clone());
                }
            }
        }
        seen.into_iter().collect()
    }
}

/// Build the hierarchy by resolving every type's declared base and
/// interface names from its own scope.
pub fn build_type_hierarchy(ctx: &ResolverContext<'_>) -> TypeHierarchy {
    let mut hierarchy = TypeHierarchy::default();
    let mut files: Vec<&String> = ctx.definitions.files().collect();
    files.sort();

    for file in files {
        for def in ctx.definitions.in_file(file) {
            if !def.kind.is_type() {
                continue;
            }
            let at_line = def.location.range.start_line;
            for base_name in &def.base_classes {
                if let Some(base) = resolve_type_by_name(ctx, file, base_name, def.scope_id, at_line)
                {
                    hierarchy
                        .derived_of
                        .entry(base.clone())
                        .or_default()
                        .insert(def.symbol_id.clone());
                    hierarchy
                        .bases_of
                        .entry(def.symbol_id.clone())
                        .or_default()
                        .push(base);
                }
            }
            for interface_name in &def.implements {
                if let Some(interface) =
                    resolve_type_by_name(ctx, file, interface_name, def.scope_id, at_line)
                {
                    hierarchy
                        .implementers_of
                        .entry(interface)
                        .or_default()
                        .insert(def.symbol_id.clone());
                }
            }
        }
    }

    hierarchy
}

fn resolve_type_by_name(
    ctx: &ResolverContext<'_>,
    file: &str,
    name: &str,
    scope_id: ScopeId,
    at_line: u32,
) -> Option<SymbolId> {
    let mut resolver = NameResolver::new(ctx);
    resolver
        .resolve_name(file, name, scope_id, at_line)
        .into_iter()
        .find(|r| {
            ctx.definitions
                .get(&r.symbol_id)
                .is_some_and(|d| d.kind.is_type())
        })
        .map(|r| r.symbol_id)
}

/// Resolves every reference of one file, calls included.
pub struct CallResolver<'a> {
    ctx: &'a ResolverContext<'a>,
    hierarchy: &'a TypeHierarchy,
    types: &'a TypeRegistry,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> CallResolver<'a> {
    pub fn new(
        ctx: &'a ResolverContext<'a>,
        hierarchy: &'a TypeHierarchy,
        types: &'a TypeRegistry,
    ) -> Self {
        Self {
            ctx,
            hierarchy,
            types,
            diagnostics: Vec::new(),
        }
    }

    pub fn resolve_file(&mut self, file: &str) -> FileResolutions {
        let mut output = FileResolutions::default();
        let references: Vec<Reference> = self.ctx.references.references_of(file).to_vec();

        for reference in &references {
            let key = reference.location.key();
            let (mut resolutions, callback) = match reference.ref_type {
                RefType::Call => self.resolve_call(file, reference),
                RefType::Read | RefType::Write | RefType::Type => {
                    let mut resolver = NameResolver::new(self.ctx);
                    let resolved = resolver.resolve_name(
                        file,
                        &reference.name,
                        reference.scope_id,
                        reference.location.range.start_line,
                    );
                    self.diagnostics.append(&mut resolver.diagnostics);
                    (resolved, false)
                }
                RefType::Import | RefType::Export => (Vec::new(), false),
            };

            sort_resolutions(&mut resolutions);
            if callback {
                output.callback_invocations.insert(key.clone());
            }
            if !resolutions.is_empty() {
                output.resolved_references.insert(key, resolutions);
            }
        }

        output
    }

    /// Resolve one call reference. Returns the candidates and whether the
    /// call is a callback invocation.
    fn resolve_call(&mut self, file: &str, reference: &Reference) -> (Vec<Resolution>, bool) {
        let Some(call) = &reference.call else {
            return (Vec::new(), false);
        };
        let at_line = reference.location.range.start_line;

        match call.call_type {
            CallType::Function => {
                let mut resolver = NameResolver::new(self.ctx);
                let mut resolutions =
                    resolver.resolve_name(file, &reference.name, reference.scope_id, at_line);
                self.diagnostics.append(&mut resolver.diagnostics);

                // Script files call across files without imports; fall back
                // to a project-wide function-name lookup.
                if resolutions.is_empty() && is_plain_identifier(&reference.name) {
                    resolutions = self.unique_function_fallback(&reference.name);
                }

                let mut callback = call.is_callback_invocation;
                if let Some(first) = resolutions.first() {
                    if let Some(target) = self.ctx.definitions.get(&first.symbol_id) {
                        callback |= is_callback_target(target);

                        // Python-style instantiation: a plain call resolving
                        // to a class is a constructor call.
                        let language = Language::from_path(file);
                        let class_call = language
                            .map(|l| l.behavior().treats_class_call_as_constructor())
                            .unwrap_or(false);
                        if class_call && target.kind.is_type() {
                            return (self.constructor_targets(&first.symbol_id), callback);
                        }
                    }
                }
                (resolutions, callback)
            }
            CallType::Constructor => {
                let mut resolver = NameResolver::new(self.ctx);
                let resolutions =
                    resolver.resolve_name(file, &reference.name, reference.scope_id, at_line);
                self.diagnostics.append(&mut resolver.diagnostics);

                let Some(first) = resolutions.first() else {
                    return (Vec::new(), false);
                };
                let target = self.ctx.definitions.get(&first.symbol_id);
                match target {
                    Some(def) if def.kind.is_type() => {
                        (self.constructor_targets(&def.symbol_id.clone()), false)
                    }
                    // Constructing something that is not a class: keep the
                    // binding but drop confidence.
                    Some(def) => (
                        vec![Resolution::new(
                            def.symbol_id.clone(),
                            Confidence::Probable,
                            ResolutionReason::Constructor,
                        )],
                        false,
                    ),
                    None => (resolutions, false),
                }
            }
            CallType::Method => self.resolve_method_call(file, reference, at_line),
        }
    }

    /// A constructor call's targets: the class's constructor member when it
    /// has one, the class definition otherwise.
    fn constructor_targets(&self, class: &SymbolId) -> Vec<Resolution> {
        let constructor = self.ctx.definitions.members_of(class).find_map(|(_, member)| {
            self.ctx
                .definitions
                .get(member)
                .filter(|d| d.kind == DefKind::Constructor)
                .map(|d| d.symbol_id.clone())
        });
        vec![Resolution::new(
            constructor.unwrap_or_else(|| class.clone()),
            Confidence::Certain,
            ResolutionReason::Constructor,
        )]
    }

    fn resolve_method_call(
        &mut self,
        file: &str,
        reference: &Reference,
        at_line: u32,
    ) -> (Vec<Resolution>, bool) {
        let Some(call) = reference.call.as_ref() else {
            return (Vec::new(), false);
        };
        let method = reference.name.as_str();
        let language = Language::from_path(file);
        let behavior = language.map(|l| l.behavior());

        let receiver_type: Option<SymbolId> = match &call.receiver {
            None => None,
            Some(receiver) => {
                let is_self = behavior
                    .map(|b| b.is_self_receiver(&receiver.text))
                    .unwrap_or(false);
                if is_self {
                    self.enclosing_type(file, reference.scope_id)
                } else if receiver.is_static {
                    // `Point::new()`: the receiver text is the type name.
                    resolve_type_by_name(self.ctx, file, &receiver.text, reference.scope_id, at_line)
                } else if is_plain_identifier(&receiver.text) {
                    // Resolve the receiver binding, then its type. A
                    // namespace import binding resolves through the
                    // target module's exports instead.
                    let resolver = NameResolver::new(self.ctx);
                    let receiver_def =
                        resolver.resolve_lexical(file, &receiver.text, reference.scope_id, at_line);
                    match receiver_def {
                        Some(def) if def.kind == DefKind::ImportBinding => {
                            let binding = def.symbol_id.clone();
                            let mut resolver = NameResolver::new(self.ctx);
                            let namespaced =
                                resolver.resolve_namespace_member(file, &binding, method);
                            self.diagnostics.append(&mut resolver.diagnostics);
                            if !namespaced.is_empty() {
                                return (namespaced, false);
                            }
                            None
                        }
                        Some(def) => self
                            .types
                            .type_of(&def.symbol_id)
                            .and_then(|t| t.as_named())
                            .cloned(),
                        None => None,
                    }
                } else {
                    // Chained or compound receivers are not resolved.
                    None
                }
            }
        };

        match receiver_type {
            Some(type_id) => {
                let resolutions = self.dispatch_method(&type_id, method);
                if resolutions.is_empty() {
                    trace!(file, method, type_id = %type_id, "method not found on receiver type");
                    (self.unknown_receiver_fallback(method), false)
                } else {
                    (resolutions, false)
                }
            }
            None => (self.unknown_receiver_fallback(method), false),
        }
    }

    /// Dispatch `method` on a known receiver type.
    ///
    /// Walks the inheritance chain depth-first upward for the defining
    /// class, then collects overrides in the receiver type's subclasses.
    /// Interface/trait receivers emit one resolution per implementer.
    fn dispatch_method(&mut self, receiver_type: &SymbolId, method: &str) -> Vec<Resolution> {
        let Some(type_def) = self.ctx.definitions.get(receiver_type) else {
            return Vec::new();
        };

        if matches!(type_def.kind, DefKind::Interface | DefKind::Trait) {
            let mut resolutions = Vec::new();
            for implementer in self.hierarchy.implementers(receiver_type) {
                if let Some(found) = self.find_on_chain(implementer, method) {
                    resolutions.push(Resolution::new(
                        found,
                        Confidence::Certain,
                        ResolutionReason::Interface,
                    ));
                }
            }
            if resolutions.is_empty() {
                // No implementers: the interface's own member is the best
                // available target.
                if let Some(member) = self.ctx.definitions.member(receiver_type, method) {
                    resolutions.push(Resolution::new(
                        member.clone(),
                        Confidence::Certain,
                        ResolutionReason::Direct,
                    ));
                }
            }
            if resolutions.len() > 1 {
                for resolution in &mut resolutions {
                    resolution.confidence = Confidence::Ambiguous;
                }
            }
            return resolutions;
        }

        // Upward: first class in the chain defining the method.
        let mut defining: Option<(SymbolId, SymbolId)> = None; // (class, method symbol)
        let mut current = receiver_type.clone();
        let mut visited: HashSet<SymbolId> = HashSet::new();
        for _ in 0..self.ctx.limits.max_scope_depth {
            if !visited.insert(current.clone()) {
                break;
            }
            if let Some(member) = self.ctx.definitions.member(&current, method) {
                defining = Some((current.clone(), member.clone()));
                break;
            }
            match self.hierarchy.bases(&current).first() {
                Some(base) => current = base.clone(),
                None => break,
            }
        }
        let Some((_, base_method)) = defining else {
            return Vec::new();
        };

        let mut resolutions = vec![Resolution::new(
            base_method.clone(),
            Confidence::Certain,
            ResolutionReason::Direct,
        )];

        // Downward: overrides in the receiver type's subclasses.
        for derived in self.hierarchy.derived_closure(receiver_type) {
            if let Some(member) = self.ctx.definitions.member(&derived, method) {
                if *member != base_method {
                    let mut resolution = Resolution::new(
                        member.clone(),
                        Confidence::Certain,
                        ResolutionReason::Override,
                    );
                    resolution.override_chain = vec![base_method.clone(), member.clone()];
                    resolutions.push(resolution);
                }
            }
        }

        if resolutions.len() > 1 {
            for resolution in &mut resolutions {
                resolution.confidence = Confidence::Ambiguous;
            }
        }
        resolutions
    }

    /// Method lookup along one type's upward chain only.
    fn find_on_chain(&self, type_id: &SymbolId, method: &str) -> Option<SymbolId> {
        let mut current = type_id.clone();
        let mut visited: HashSet<SymbolId> = HashSet::new();
        for _ in 0..self.ctx.limits.max_scope_depth {
            if !visited.insert(current.clone()) {
                return None;
            }
            if let Some(member) = self.ctx.definitions.member(&current, method) {
                return Some(member.clone());
            }
            current = self.hierarchy.bases(&current).first()?.clone();
        }
        None
    }

    /// A bare call that no import or lexical binding explains: a uniquely
    /// named function resolves `probable`; several candidates all resolve
    /// `ambiguous`.
    fn unique_function_fallback(&self, name: &str) -> Vec<Resolution> {
        let candidates: Vec<&Definition> = self
            .ctx
            .definitions
            .find_by_name(name)
            .filter(|d| d.kind == DefKind::Function)
            .collect();
        match candidates.as_slice() {
            [] => Vec::new(),
            [only] => vec![Resolution::new(
                only.symbol_id.clone(),
                Confidence::Probable,
                ResolutionReason::UniqueName,
            )],
            many => many
                .iter()
                .map(|d| {
                    Resolution::new(
                        d.symbol_id.clone(),
                        Confidence::Ambiguous,
                        ResolutionReason::Candidate,
                    )
                })
                .collect(),
        }
    }

    /// Receiver type unknown: a uniquely-named method resolves `probable`;
    /// several candidates all resolve `ambiguous`.
    fn unknown_receiver_fallback(&self, method: &str) -> Vec<Resolution> {
        let candidates: Vec<&Definition> = self
            .ctx
            .definitions
            .find_by_name(method)
            .filter(|d| matches!(d.kind, DefKind::Method | DefKind::Constructor))
            .collect();
        match candidates.as_slice() {
            [] => Vec::new(),
            [only] => vec![Resolution::new(
                only.symbol_id.clone(),
                Confidence::Probable,
                ResolutionReason::UniqueName,
            )],
            many => many
                .iter()
                .map(|d| {
                    Resolution::new(
                        d.symbol_id.clone(),
                        Confidence::Ambiguous,
                        ResolutionReason::Candidate,
                    )
                })
                .collect(),
        }
    }

    /// The type whose body encloses `scope_id` (for `this`/`self`).
    fn enclosing_type(&self, file: &str, scope_id: ScopeId) -> Option<SymbolId> {
        let tree = self.ctx.scopes.get(file)?;
        let container = tree.nearest_of_kind(scope_id, &[ScopeKind::Class, ScopeKind::Impl])?;
        // A type definition owning this scope, or (for impl blocks) the
        // same-file type with the impl target's name.
        self.ctx
            .definitions
            .in_file(file)
            .find(|d| d.kind.is_type() && d.body_scope == Some(container.id))
            .map(|d| d.symbol_id.clone())
            .or_else(|| {
                let name = container.name.as_ref()?;
                self.ctx
                    .definitions
                    .in_file(file)
                    .find(|d| d.kind.is_type() && &d.name == name)
                    .map(|d| d.symbol_id.clone())
            })
    }
}

fn is_callback_target(def: &Definition) -> bool {
    match def.kind {
        DefKind::Parameter => true,
        DefKind::Variable | DefKind::Constant => matches!(def.init, Some(Initializer::Function)),
        _ => false,
    }
}

fn is_plain_identifier(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}
