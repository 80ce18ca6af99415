/*
 * mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Command implementations for the embedmap CLI.
 */

//! Command implementations for the embedmap CLI
//!
//! Each command module handles the CLI interface and delegates to
//! embedmap-core for the actual work.

use std::path::Path;

use anyhow::{Context, Result};
use embedmap_core::{CompiledOptions, Diagnostics, NormalizeOptions};

pub mod lookup;
pub mod normalize;
pub mod preprocess;

/// Load options from an optional YAML file and compile their patterns.
pub fn load_options(config: Option<&Path>) -> Result<CompiledOptions> {
    let options = match config {
        Some(path) => NormalizeOptions::from_file(path)
            .with_context(|| format!("Failed to load options from {}", path.display()))?,
        None => NormalizeOptions::default(),
    };
    Ok(options.compile()?)
}

/// Print diagnostics to stderr, one per line.
pub fn report(file: &str, diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        eprintln!("{}: {}", file, diagnostic.to_text());
    }
}
