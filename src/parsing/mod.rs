//! Parsing layer: language detection, tree-sitter query execution, and
//! per-language behavior adapters.

pub mod behavior;
pub mod javascript;
pub mod language;
pub mod parser;
pub mod python;
pub mod query_runner;
pub mod rust;
pub mod typescript;

pub use behavior::{LanguageBehavior, RawCall, RawExport, RawImport, RawReceiver};
pub use language::Language;
pub use parser::ParsedFile;
pub use query_runner::{Capture, CaptureCategory, CaptureEntity, CaptureName, run_query};
