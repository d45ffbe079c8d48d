//! Error types for the knowledge graph extractor.
//!
//! Structured errors via thiserror. None of these cross the facade boundary:
//! the facade converts every failure into a `Diagnostic` inside the
//! `ParseOutcome` (see `facade.rs`).

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while extracting entities and relationships from one file.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {language} file '{path}': {reason}")]
    Parse {
        path: PathBuf,
        language: String,
        reason: String,
    },

    #[error("Failed to initialize {language} grammar: {reason}")]
    GrammarInit { language: String, reason: String },

    #[error("Unsupported file type '{extension}' for '{path}'")]
    UnsupportedFileType { path: PathBuf, extension: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Scan cancelled")]
    Cancelled,

    #[error("{0}")]
    General(String),
}

/// Errors raised by module specifier / export map resolution.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Re-export depth limit {limit} reached at '{path}'")]
    DepthExceeded { path: String, limit: usize },

    #[error("Cycle detected through '{path}'")]
    Cycle { path: String },

    #[error("Cannot resolve specifier '{specifier}' from '{from}'")]
    Unresolved { specifier: String, from: String },
}

pub type ExtractResult<T> = Result<T, ExtractError>;
pub type ResolveResult<T> = Result<T, ResolveError>;
