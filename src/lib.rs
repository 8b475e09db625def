//! Multi-language semantic code indexing with call graph analysis.
//!
//! The crate ingests source files, builds a per-file index of scopes,
//! definitions, and references driven by tree-sitter queries, composes
//! those indices into project-wide registries, and derives resolved name
//! bindings, type propagation, and a call graph with entry-point
//! detection. Updates are incremental: changing one file reprocesses that
//! file and its transitive importers, nothing else.
//!
//! # Example
//!
//! ```
//! use semgraph::ProjectIndex;
//!
//! let mut project = ProjectIndex::new();
//! project.update_file("lib.ts", Some("export function helper() {}"));
//! project.update_file(
//!     "app.ts",
//!     Some("import { helper } from \"./lib\";\nfunction main() { helper(); }"),
//! );
//!
//! let graph = project.get_call_graph(None);
//! assert_eq!(graph.entry_points.len(), 1);
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod indexing;
pub mod logging;
pub mod parsing;
pub mod resolve;
pub mod storage;
pub mod symbol;
pub mod types;

pub use config::Settings;
pub use error::{Diagnostic, DiagnosticKind, IndexError, IndexResult, ParseError, Severity};
pub use graph::{CallGraph, CallGraphBuilder, CallGraphOptions, CallableNode, EnclosedCall};
pub use indexing::{
    CallType, CancellationToken, ProjectIndex, RefType, Reference, ScopeKind, ScopeTree,
    SemanticIndex, SharedProjectIndex, UpdateResult, index_file,
};
pub use parsing::Language;
pub use resolve::{Confidence, FileResolutions, Resolution, ResolutionReason, TypeRef};
pub use symbol::{
    DefFlags, DefKind, Definition, ExportRecord, ImportRecord, Initializer, Parameter,
};
pub use types::{Location, LocationKey, Range, ScopeId, SymbolId, SymbolRef, paths_match};
