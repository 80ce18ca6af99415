/*
 * normalize.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Normalize command implementation.
 */

//! Normalize command implementation.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use embedmap_core::{
    CompilerNativeMap, HostDocument, SnippetPlacement, normalize_snippet,
};

/// Arguments for the normalize command
#[derive(Debug)]
pub struct NormalizeArgs {
    pub host: PathBuf,
    pub code: PathBuf,
    pub native_map: PathBuf,
    /// 1-based
    pub start_line: usize,
    pub indent: usize,
    pub config: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

/// Execute the normalize command
pub fn execute(args: NormalizeArgs) -> Result<()> {
    if args.start_line == 0 {
        anyhow::bail!("--start-line is 1-based");
    }
    let options = super::load_options(args.config.as_deref())?;

    let host_text = fs::read_to_string(&args.host)
        .with_context(|| format!("Failed to read host document {}", args.host.display()))?;
    let code = fs::read_to_string(&args.code)
        .with_context(|| format!("Failed to read code {}", args.code.display()))?;
    let native_json = fs::read_to_string(&args.native_map)
        .with_context(|| format!("Failed to read native map {}", args.native_map.display()))?;
    let native = CompilerNativeMap::from_json(&native_json)
        .with_context(|| format!("Failed to parse native map {}", args.native_map.display()))?;

    let host_path = args.host.to_string_lossy().to_string();
    let host = HostDocument::new(host_path.clone(), host_text);
    let placement = SnippetPlacement::new(args.start_line - 1, args.indent);

    let result = normalize_snippet(&code, &native, &host, placement, &options);
    super::report(&host_path, &result.diagnostics);

    let json = result.map.to_json()?;
    match &args.output {
        Some(path) => {
            fs::write(path, &json)
                .with_context(|| format!("Failed to write map to {}", path.display()))?;
            info!(output = %path.display(), "Wrote map");
        }
        None => println!("{}", json),
    }
    Ok(())
}
