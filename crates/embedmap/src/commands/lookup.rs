/*
 * lookup.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Lookup command implementation.
 */

//! Lookup command implementation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use embedmap_core::EncodedPositionMap;

/// Execute the lookup command
pub fn execute(map_path: &Path, line: usize, column: usize) -> Result<()> {
    let json = fs::read_to_string(map_path)
        .with_context(|| format!("Failed to read map {}", map_path.display()))?;
    let map = EncodedPositionMap::from_json(&json)
        .with_context(|| format!("Failed to parse map {}", map_path.display()))?;

    match map.original_position_for(line, column)? {
        Some(position) => println!("{}", serde_json::to_string(&position)?),
        None => anyhow::bail!("No mapping for generated position {}:{}", line, column),
    }
    Ok(())
}
