//! Resolution: names, types, and calls.
//!
//! Resolution consumes the registries and produces, per file, a map from
//! reference location keys to candidate symbols with confidence. Nothing in
//! this module mutates registries; outputs are file-partitioned so the
//! coordinator can invalidate them per file.

pub mod calls;
pub mod name;
pub mod types;

pub use calls::{CallResolver, TypeHierarchy, build_type_hierarchy};
pub use name::{NameResolver, ResolverContext};
pub use types::{TypeRef, TypeRegistry, propagate_types};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::{LocationKey, SymbolId};

/// How sure the resolver is about a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Certain,
    Probable,
    Ambiguous,
}

impl Confidence {
    /// Sort rank: certain before probable before ambiguous.
    pub fn rank(&self) -> u8 {
        match self {
            Confidence::Certain => 0,
            Confidence::Probable => 1,
            Confidence::Ambiguous => 2,
        }
    }
}

/// Why a candidate was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionReason {
    /// Found by the lexical scope walk.
    Lexical,
    /// Followed an import binding to a direct export.
    Import,
    /// Followed a re-export chain.
    ReExport,
    /// A re-export chain hit the hop limit or revisited a file.
    CycleBroken,
    /// Method found on the receiver type or its ancestors.
    Direct,
    /// Subclass override of the directly-found method.
    Override,
    /// Receiver is an interface/trait; target is an implementer's method.
    Interface,
    /// Receiver type unknown; the method name is unique project-wide.
    UniqueName,
    /// Receiver type unknown; one of several same-named candidates.
    Candidate,
    /// Constructor dispatch.
    Constructor,
}

/// One candidate binding for a reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub symbol_id: SymbolId,
    pub confidence: Confidence,
    pub reason: ResolutionReason,
    /// Method dispatch: the override chain from the defining method to this
    /// candidate, when the candidate overrides an ancestor's method.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub override_chain: Vec<SymbolId>,
}

impl Resolution {
    pub fn new(symbol_id: SymbolId, confidence: Confidence, reason: ResolutionReason) -> Self {
        Self {
            symbol_id,
            confidence,
            reason,
            override_chain: Vec::new(),
        }
    }
}

/// Canonical resolution ordering: `(confidence rank, symbol_id)`.
pub fn sort_resolutions(resolutions: &mut [Resolution]) {
    resolutions.sort_by(|a, b| {
        a.confidence
            .rank()
            .cmp(&b.confidence.rank())
            .then_with(|| a.symbol_id.cmp(&b.symbol_id))
    });
}

/// Resolution output for one file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileResolutions {
    /// Location key of a reference -> its candidate symbols, canonically
    /// ordered.
    pub resolved_references: IndexMap<LocationKey, Vec<Resolution>>,
    /// Call locations whose callee is a parameter, a function-typed local,
    /// or an anonymous function expression.
    pub callback_invocations: BTreeSet<LocationKey>,
}

impl FileResolutions {
    pub fn resolutions_at(&self, key: &LocationKey) -> &[Resolution] {
        self.resolved_references
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_callback_invocation(&self, key: &LocationKey) -> bool {
        self.callback_invocations.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_ranks_order() {
        assert!(Confidence::Certain.rank() < Confidence::Probable.rank());
        assert!(Confidence::Probable.rank() < Confidence::Ambiguous.rank());
    }

    #[test]
    fn resolutions_sort_canonically() {
        let mut resolutions = vec![
            Resolution::new(
                SymbolId::from_raw("method:module/B:m"),
                Confidence::Ambiguous,
                ResolutionReason::Override,
            ),
            Resolution::new(
                SymbolId::from_raw("method:module/A:m"),
                Confidence::Ambiguous,
                ResolutionReason::Direct,
            ),
            Resolution::new(
                SymbolId::from_raw("function:module:z"),
                Confidence::Certain,
                ResolutionReason::Lexical,
            ),
        ];
        sort_resolutions(&mut resolutions);
        assert_eq!(resolutions[0].symbol_id.as_str(), "function:module:z");
        assert_eq!(resolutions[1].symbol_id.as_str(), "method:module/A:m");
        assert_eq!(resolutions[2].symbol_id.as_str(), "method:module/B:m");
    }
}
