//! The definition model.
//!
//! Definitions are a discriminated union over [`DefKind`]: one flat struct
//! whose optional fields are populated per kind, cross-referenced by
//! [`SymbolId`] strings rather than pointers. Classes carry their base
//! class and interface lists; callables carry parameters and return types;
//! variables carry annotations and initializer shapes for type inference.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::types::{Location, ScopeId, SymbolId, SymbolName};

/// Definition kind. Doubles as the `kind` segment of the encoded symbol id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefKind {
    Function,
    Method,
    Constructor,
    Class,
    Interface,
    Struct,
    Trait,
    TypeAlias,
    Enum,
    Enumerator,
    Variable,
    Constant,
    Parameter,
    Property,
    Field,
    ImportBinding,
    ExportBinding,
}

impl DefKind {
    /// The tag used as the first segment of a symbol id.
    pub fn tag(&self) -> &'static str {
        match self {
            DefKind::Function => "function",
            DefKind::Method => "method",
            DefKind::Constructor => "constructor",
            DefKind::Class => "class",
            DefKind::Interface => "interface",
            DefKind::Struct => "struct",
            DefKind::Trait => "trait",
            DefKind::TypeAlias => "type_alias",
            DefKind::Enum => "enum",
            DefKind::Enumerator => "enumerator",
            DefKind::Variable => "variable",
            DefKind::Constant => "constant",
            DefKind::Parameter => "parameter",
            DefKind::Property => "property",
            DefKind::Field => "field",
            DefKind::ImportBinding => "import",
            DefKind::ExportBinding => "export",
        }
    }

    /// Whether definitions of this kind become call graph nodes.
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            DefKind::Function | DefKind::Method | DefKind::Constructor
        )
    }

    /// Whether definitions of this kind can serve as a receiver type.
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            DefKind::Class
                | DefKind::Interface
                | DefKind::Struct
                | DefKind::Trait
                | DefKind::Enum
                | DefKind::TypeAlias
        )
    }

    /// Whether definitions of this kind participate in the lexical scope
    /// walk. Members are addressed through their container, not by name.
    pub fn is_lexical(&self) -> bool {
        !matches!(
            self,
            DefKind::Method
                | DefKind::Constructor
                | DefKind::Property
                | DefKind::Field
                | DefKind::Enumerator
        )
    }
}

bitflags! {
    /// Attribute flags shared by all definition kinds.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct DefFlags: u8 {
        /// Visible to other files through the export surface.
        const EXPORTED = 1;
        /// Matched the language's test heuristic.
        const TEST = 2;
        /// Visible throughout the enclosing scope, not just after the
        /// declaration line.
        const HOISTED = 4;
        /// Type-only binding (e.g. `import type`).
        const TYPE_ONLY = 8;
    }
}

/// Shape of a variable initializer, kept for type inference and callback
/// classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Initializer {
    /// `x = new Foo()`: the right-hand side constructs `Foo`.
    Constructor(SymbolName),
    /// `x = f(...)`: the right-hand side calls `f`.
    Call(SymbolName),
    /// `x = y`: the right-hand side reads another binding.
    Variable(SymbolName),
    /// `x = () => ...` or `x = function ...`: a function-typed binding.
    Function,
    /// Anything else.
    Other,
}

/// One function/method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: SymbolName,
    pub type_annotation: Option<String>,
}

/// A named entity introduced by source code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    pub symbol_id: SymbolId,
    pub name: SymbolName,
    pub kind: DefKind,
    /// Location of the name token, or of the whole node for anonymous
    /// callables.
    pub location: Location,
    /// Smallest scope containing the definition, excluding any scope the
    /// definition itself creates.
    pub scope_id: ScopeId,
    /// The scope this definition creates, for callables, classes, and
    /// other body-carrying kinds.
    pub body_scope: Option<ScopeId>,
    pub flags: DefFlags,
    pub signature: Option<String>,
    /// Callables: declared parameters in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    /// Callables: declared return type, verbatim.
    pub return_type: Option<String>,
    /// Classes/structs: base class names, verbatim.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub base_classes: Vec<SymbolName>,
    /// Classes: implemented interface/trait names, verbatim.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implements: Vec<SymbolName>,
    /// Members: symbol of the owning class/struct/interface, when the
    /// container is defined in the same file.
    pub container: Option<SymbolId>,
    /// Variables/parameters/properties: declared type, verbatim.
    pub type_annotation: Option<String>,
    /// Variables: initializer shape.
    pub init: Option<Initializer>,
}

impl Definition {
    pub fn is_exported(&self) -> bool {
        self.flags.contains(DefFlags::EXPORTED)
    }

    pub fn is_test(&self) -> bool {
        self.flags.contains(DefFlags::TEST)
    }

    pub fn is_hoisted(&self) -> bool {
        self.flags.contains(DefFlags::HOISTED)
    }

    pub fn is_callable(&self) -> bool {
        self.kind.is_callable()
    }
}

/// One name a file makes visible to importers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub file_path: String,
    pub exported_name: SymbolName,
    /// The local definition backing the export. `None` for re-exports.
    pub local_symbol_id: Option<SymbolId>,
    pub is_type_only: bool,
    /// Re-exports: the import path of the module the name is forwarded
    /// from, and the name it has there.
    pub re_export_from: Option<String>,
    pub re_export_name: Option<SymbolName>,
}

impl ExportRecord {
    pub fn is_re_export(&self) -> bool {
        self.re_export_from.is_some()
    }
}

/// One imported binding in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub file_path: String,
    /// The module specifier as written (`"./lib"`, `crate::io`, `os.path`).
    pub import_path: String,
    /// The name requested from the target module. `"*"` for namespace
    /// imports, `"default"` for default imports.
    pub imported_name: SymbolName,
    /// Symbol id of the local `ImportBinding` definition.
    pub local_binding_symbol_id: SymbolId,
    /// The local name the binding is visible under.
    pub local_name: SymbolName,
    pub is_namespace: bool,
    pub is_type_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Range;

    fn minimal_def(kind: DefKind, name: &str) -> Definition {
        Definition {
            symbol_id: SymbolId::new(kind.tag(), "module", name),
            name: name.to_string(),
            kind,
            location: Location::new("a.ts", Range::new(1, 1, 1, 10)),
            scope_id: ScopeId::ROOT,
            body_scope: None,
            flags: DefFlags::empty(),
            signature: None,
            parameters: Vec::new(),
            return_type: None,
            base_classes: Vec::new(),
            implements: Vec::new(),
            container: None,
            type_annotation: None,
            init: None,
        }
    }

    #[test]
    fn kind_tags_are_stable() {
        assert_eq!(DefKind::Method.tag(), "method");
        assert_eq!(DefKind::ImportBinding.tag(), "import");
    }

    #[test]
    fn callable_kinds() {
        assert!(DefKind::Function.is_callable());
        assert!(DefKind::Constructor.is_callable());
        assert!(!DefKind::Class.is_callable());
        assert!(!DefKind::Variable.is_callable());
    }

    #[test]
    fn members_are_not_lexical() {
        assert!(!DefKind::Method.is_lexical());
        assert!(!DefKind::Property.is_lexical());
        assert!(DefKind::Variable.is_lexical());
        assert!(DefKind::Function.is_lexical());
        assert!(DefKind::ImportBinding.is_lexical());
    }

    #[test]
    fn flags_compose() {
        let mut def = minimal_def(DefKind::Function, "helper");
        def.flags |= DefFlags::EXPORTED | DefFlags::HOISTED;
        assert!(def.is_exported());
        assert!(def.is_hoisted());
        assert!(!def.is_test());
    }
}
