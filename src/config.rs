//! Configuration for the semantic indexer.
//!
//! Layered settings: built-in defaults, then an optional `semgraph.toml`,
//! then environment variable overrides. Environment variables are prefixed
//! with `SEMGRAPH_` and use double underscores for nesting:
//! `SEMGRAPH_RESOLUTION__TYPE_PROPAGATION_ROUNDS=4` sets
//! `resolution.type_propagation_rounds`.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Glob patterns excluded from indexing (e.g. `node_modules/**`).
    #[serde(default)]
    pub excluded_patterns: Vec<String>,

    /// Indexing configuration.
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Resolution limits.
    #[serde(default)]
    pub resolution: ResolutionConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexingConfig {
    /// Worker threads for parallel per-file indexing in batch ingest.
    #[serde(default = "default_parallel_threads")]
    pub parallel_threads: usize,

    /// Whether test definitions participate in entry-point detection.
    #[serde(default = "default_true")]
    pub include_tests: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ResolutionConfig {
    /// Upper bound on type propagation rounds before the fixed point is
    /// abandoned with a diagnostic.
    #[serde(default = "default_type_rounds")]
    pub type_propagation_rounds: u32,

    /// Maximum lexical scope depth walked during name resolution.
    #[serde(default = "default_scope_depth")]
    pub max_scope_depth: u32,

    /// Maximum re-export hops followed before the chain is cut.
    #[serde(default = "default_reexport_hops")]
    pub max_reexport_hops: u32,
}

fn default_parallel_threads() -> usize {
    num_cpus::get()
}
fn default_true() -> bool {
    true
}
fn default_type_rounds() -> u32 {
    8
}
fn default_scope_depth() -> u32 {
    64
}
fn default_reexport_hops() -> u32 {
    16
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            parallel_threads: default_parallel_threads(),
            include_tests: true,
        }
    }
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            type_propagation_rounds: default_type_rounds(),
            max_scope_depth: default_scope_depth(),
            max_reexport_hops: default_reexport_hops(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            excluded_patterns: Vec::new(),
            indexing: IndexingConfig::default(),
            resolution: ResolutionConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings from `semgraph.toml` in the working directory (if
    /// present) and `SEMGRAPH_*` environment variables.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("semgraph.toml"))
            .merge(Env::prefixed("SEMGRAPH_").split("__"))
            .extract()
    }

    /// Load settings from a specific TOML file, with env overrides.
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("SEMGRAPH_").split("__"))
            .extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_limits() {
        let settings = Settings::default();
        assert_eq!(settings.resolution.type_propagation_rounds, 8);
        assert_eq!(settings.resolution.max_scope_depth, 64);
        assert_eq!(settings.resolution.max_reexport_hops, 16);
        assert!(settings.excluded_patterns.is_empty());
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            "excluded_patterns = [\"vendor/**\"]\n\n[resolution]\ntype_propagation_rounds = 3"
        )
        .unwrap();

        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.excluded_patterns, vec!["vendor/**".to_string()]);
        assert_eq!(settings.resolution.type_propagation_rounds, 3);
        // Untouched keys keep their defaults.
        assert_eq!(settings.resolution.max_scope_depth, 64);
    }
}
