//! Per-file indexing pipeline and the update coordinator.

pub mod coordinator;
pub mod definitions;
pub mod file_index;
pub mod references;
pub mod scopes;

pub use coordinator::{CancellationToken, ProjectIndex, SharedProjectIndex, UpdateResult};
pub use file_index::{SemanticIndex, index_file};
pub use references::{CallInfo, CallType, Receiver, RefType, Reference};
pub use scopes::{LexicalScope, ScopeKind, ScopeTree};
