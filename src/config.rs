//! Layered configuration for the extractor.
//!
//! Defaults → TOML file → environment overrides, in that order. Environment
//! variables use the `CG_` prefix with double underscores separating nested
//! levels: `CG_PARSER__TYPE_CHECKER_BUDGET=2000` sets
//! `parser.type_checker_budget`.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    /// Parser core knobs.
    #[serde(default)]
    pub parser: ParserConfig,

    /// File discovery settings.
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Logging levels (default plus per-module overrides).
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ParserConfig {
    /// Total type-checker calls allowed per scan.
    #[serde(default = "default_type_checker_budget")]
    pub type_checker_budget: u32,

    /// How deep to follow re-export chains when building export maps.
    #[serde(default = "default_max_reexport_depth")]
    pub max_reexport_depth: usize,

    /// Minimum identifier length considered for reference-edge emission.
    #[serde(default = "default_ast_min_name_length")]
    pub ast_min_name_length: usize,

    /// Confidence gate for inferred edges; anything below is dropped.
    #[serde(default = "default_min_inferred_confidence")]
    pub min_inferred_confidence: f32,

    /// Identifiers ignored entirely (framework and environment globals).
    #[serde(default = "default_stop_names")]
    pub stop_names: Vec<String>,

    /// Module path aliases, tsconfig-style: `"@app/*" -> "src/*"`.
    #[serde(default)]
    pub paths: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexingConfig {
    /// Glob patterns excluded from directory discovery.
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is not set.
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides.
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_type_checker_budget() -> u32 {
    5_000
}
fn default_max_reexport_depth() -> usize {
    4
}
fn default_ast_min_name_length() -> usize {
    2
}
fn default_min_inferred_confidence() -> f32 {
    0.5
}
fn default_log_level() -> String {
    "warn".to_string()
}

fn default_stop_names() -> Vec<String> {
    [
        "console",
        "process",
        "require",
        "module",
        "exports",
        "JSON",
        "Math",
        "Object",
        "Array",
        "Promise",
        "String",
        "Number",
        "Boolean",
        "Symbol",
        "Error",
        "undefined",
        "NaN",
        "setTimeout",
        "setInterval",
        "clearTimeout",
        "clearInterval",
        "window",
        "document",
        "globalThis",
        "describe",
        "it",
        "test",
        "expect",
        "beforeEach",
        "afterEach",
        "beforeAll",
        "afterAll",
        "jest",
        "vi",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_ignore_patterns() -> Vec<String> {
    vec![
        "node_modules/**".to_string(),
        "dist/**".to_string(),
        "build/**".to_string(),
        ".git/**".to_string(),
        "*.min.js".to_string(),
    ]
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            type_checker_budget: default_type_checker_budget(),
            max_reexport_depth: default_max_reexport_depth(),
            ast_min_name_length: default_ast_min_name_length(),
            min_inferred_confidence: default_min_inferred_confidence(),
            stop_names: default_stop_names(),
            paths: HashMap::new(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: default_ignore_patterns(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl ParserConfig {
    pub fn is_stop_name(&self, name: &str) -> bool {
        self.stop_names.iter().any(|s| s == name)
    }
}

impl Settings {
    /// Load configuration from defaults, an optional TOML file, and the
    /// environment.
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from("codegraph.toml")
    }

    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("CG_").map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
            .extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.parser.type_checker_budget, 5_000);
        assert_eq!(settings.parser.max_reexport_depth, 4);
        assert_eq!(settings.parser.ast_min_name_length, 2);
        assert!((settings.parser.min_inferred_confidence - 0.5).abs() < f32::EPSILON);
        assert!(settings.parser.is_stop_name("console"));
        assert!(!settings.parser.is_stop_name("renderWidget"));
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("codegraph.toml");

        let toml_content = r#"
[parser]
type_checker_budget = 100
max_reexport_depth = 2

[parser.paths]
"@app/*" = "src/*"

[indexing]
ignore_patterns = ["vendor/**"]
"#;
        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.parser.type_checker_budget, 100);
        assert_eq!(settings.parser.max_reexport_depth, 2);
        assert_eq!(settings.parser.paths["@app/*"], "src/*");
        assert_eq!(settings.indexing.ignore_patterns, vec!["vendor/**"]);
        // Untouched values fall back to defaults
        assert_eq!(settings.parser.ast_min_name_length, 2);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("codegraph.toml");
        fs::write(&config_path, "[parser]\nmin_inferred_confidence = 0.7\n").unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert!((settings.parser.min_inferred_confidence - 0.7).abs() < f32::EPSILON);
        assert_eq!(settings.parser.type_checker_budget, 5_000);
        assert!(settings.parser.is_stop_name("describe"));
    }
}
