//! Language detection from file extensions.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Detected source language. Detection is a total function over the
/// extension table; everything unrecognized maps to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    TypeScript,
    Tsx,
    JavaScript,
    Jsx,
    Json,
    Unknown,
}

impl Language {
    /// Map an extension (without the dot) to a language tag.
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "ts" | "mts" | "cts" => Self::TypeScript,
            "tsx" => Self::Tsx,
            "js" | "mjs" | "cjs" => Self::JavaScript,
            "jsx" => Self::Jsx,
            "json" => Self::Json,
            _ => Self::Unknown,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Whether the extractor parses this language (as opposed to merely
    /// detecting it).
    pub fn is_parseable(&self) -> bool {
        matches!(
            self,
            Self::TypeScript | Self::Tsx | Self::JavaScript | Self::Jsx
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TypeScript => "typescript",
            Self::Tsx => "tsx",
            Self::JavaScript => "javascript",
            Self::Jsx => "jsx",
            Self::Json => "json",
            Self::Unknown => "unknown",
        }
    }
}

/// Extensions tried, in order, when resolving an extensionless module
/// specifier. Implementation files are preferred over declaration files
/// with the same basename.
pub const RESOLUTION_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mts", "cts", "d.ts"];
