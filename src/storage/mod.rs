//! Project-level registries.
//!
//! Five per-file registries plus the import graph. All of them share the
//! same invalidation unit (the file path) and the same replacement
//! semantics: removing a file's contribution and inserting the new one
//! happens inside one coordinator-held write, so readers never observe an
//! intermediate state.

pub mod definitions;
pub mod import_graph;
pub mod registries;

pub use definitions::DefinitionRegistry;
pub use import_graph::ImportGraph;
pub use registries::{ExportRegistry, ImportRegistry, ReferenceRegistry, ScopeRegistry};
