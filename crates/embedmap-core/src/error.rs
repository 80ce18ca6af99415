/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Error types for embedmap-core.
 */

//! Error types for embedmap-core
//!
//! Errors here only cover the boundaries of the engine: reading inputs,
//! loading configuration, talking to the external compiler. Problems found
//! while normalizing a map are reported as [`crate::Diagnostic`]s instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapError {
    /// The compiler-native map could not be read as JSON.
    #[error("Invalid compiler-native map: {0}")]
    NativeMap(#[from] serde_json::Error),

    /// A V3 `mappings` string contained an invalid VLQ sequence.
    #[error("Invalid mappings at segment {segment} of line {line}: {message}")]
    Mappings {
        line: usize,
        segment: usize,
        message: String,
    },

    /// A configured pattern is not a valid regular expression.
    #[error("Invalid pattern for `{option}`: {source}")]
    Pattern {
        option: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// Errors raised by a [`crate::SnippetCompiler`].
#[derive(Error, Debug)]
pub enum CompileError {
    /// The compiler could not be started at all.
    #[error("Compiler `{program}` is unavailable: {source}")]
    Unavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The compiler ran but rejected the snippet.
    #[error("Compilation of {file} failed: {message}")]
    Failed { file: String, message: String },

    /// The compiler's output did not have a recognised shape.
    #[error("Unrecognised compiler output for {file}: {message}")]
    Output { file: String, message: String },
}

/// Errors raised by a [`crate::SyntaxParser`].
#[derive(Error, Debug)]
pub enum SyntaxError {
    #[error("Failed to load grammar: {0}")]
    Grammar(String),

    #[error("Parse failed: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, MapError>;
