/*
 * options.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Normalization options.
 */

//! Normalization options.
//!
//! Options are plain data so they can be read from a YAML file; the regex
//! patterns are compiled once into [`CompiledOptions`] before a run.

use crate::error::{MapError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_SYNTHETIC_INDEX_PATTERN: &str = r"^i\d*$";
pub const DEFAULT_LOOP_PATTERN: &str = r"for\s*\(";

/// User-facing normalization options.
///
/// ```
/// use embedmap_core::NormalizeOptions;
///
/// let opts = NormalizeOptions::from_yaml_str("adjust-separators: false\n").unwrap();
/// assert!(!opts.adjust_separators);
/// assert!(opts.protect_loops);
/// assert_eq!(opts.script_lang, "civet");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct NormalizeOptions {
    /// Identifiers matching this are compiler-synthesized loop counters
    pub synthetic_index_pattern: String,
    /// The analyzer only runs when the intermediate code matches this
    pub loop_pattern: String,
    /// Run the protected-construct analysis at all
    pub protect_loops: bool,
    /// Pull mappings that land on the space of a `, ` back onto the comma
    pub adjust_separators: bool,
    /// `lang` attribute that marks embedded snippets in host documents
    pub script_lang: String,
    /// `lang` attribute written back after compilation
    pub output_lang: String,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            synthetic_index_pattern: DEFAULT_SYNTHETIC_INDEX_PATTERN.to_string(),
            loop_pattern: DEFAULT_LOOP_PATTERN.to_string(),
            protect_loops: true,
            adjust_separators: true,
            script_lang: "civet".to_string(),
            output_lang: "ts".to_string(),
        }
    }
}

impl NormalizeOptions {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn compile(&self) -> Result<CompiledOptions> {
        let synthetic_index =
            Regex::new(&self.synthetic_index_pattern).map_err(|source| MapError::Pattern {
                option: "synthetic-index-pattern",
                source,
            })?;
        let loop_syntax = Regex::new(&self.loop_pattern).map_err(|source| MapError::Pattern {
            option: "loop-pattern",
            source,
        })?;
        Ok(CompiledOptions {
            synthetic_index,
            loop_syntax,
            protect_loops: self.protect_loops,
            adjust_separators: self.adjust_separators,
            script_lang: self.script_lang.clone(),
            output_lang: self.output_lang.clone(),
        })
    }
}

/// Options with their patterns compiled.
#[derive(Debug, Clone)]
pub struct CompiledOptions {
    pub synthetic_index: Regex,
    pub loop_syntax: Regex,
    pub protect_loops: bool,
    pub adjust_separators: bool,
    pub script_lang: String,
    pub output_lang: String,
}

impl CompiledOptions {
    pub fn is_synthetic_index(&self, name: &str) -> bool {
        self.synthetic_index.is_match(name)
    }
}

impl Default for CompiledOptions {
    fn default() -> Self {
        static DEFAULTS: once_cell::sync::Lazy<CompiledOptions> = once_cell::sync::Lazy::new(|| {
            NormalizeOptions::default()
                .compile()
                .expect("default patterns are valid")
        });
        DEFAULTS.clone()
    }
}
