/*
 * preprocess.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Preprocess command implementation.
 */

//! Preprocess command implementation.
//!
//! Each input file is processed on its own scoped thread; normalization
//! itself shares nothing between files.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result};
use tracing::{error, info};

use embedmap_core::{
    BlockInfo, CommandCompiler, Normalizer, TypeScriptParser, preprocess_document,
};

/// Arguments for the preprocess command
#[derive(Debug)]
pub struct PreprocessArgs {
    pub files: Vec<PathBuf>,
    pub compiler: String,
    pub compiler_args: Vec<String>,
    pub out_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

/// Execute the preprocess command
pub fn execute(args: PreprocessArgs) -> Result<()> {
    let options = super::load_options(args.config.as_deref())?;
    let compiler = CommandCompiler::new(&args.compiler).with_args(args.compiler_args.iter().cloned());
    let parser = TypeScriptParser;
    let normalizer = Normalizer::new(&options, &parser);

    if let Some(dir) = &args.out_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }

    let results: Vec<(PathBuf, Result<Vec<PathBuf>>)> = thread::scope(|scope| {
        let handles: Vec<_> = args
            .files
            .iter()
            .map(|file| {
                let compiler = &compiler;
                let normalizer = &normalizer;
                let out_dir = args.out_dir.as_deref();
                let handle = scope.spawn(move || process_file(file, out_dir, compiler, normalizer));
                (file.clone(), handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(file, handle)| {
                let result = handle
                    .join()
                    .unwrap_or_else(|_| Err(anyhow::anyhow!("worker thread panicked")));
                (file, result)
            })
            .collect()
    });

    let mut failed = 0;
    for (file, result) in &results {
        match result {
            Ok(written) => {
                for path in written {
                    info!(input = %file.display(), output = %path.display(), "Wrote");
                }
            }
            Err(e) => {
                failed += 1;
                error!(input = %file.display(), "{:#}", e);
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{} of {} files failed", failed, results.len());
    }
    Ok(())
}

/// Process one host document and return the paths written.
fn process_file(
    file: &Path,
    out_dir: Option<&Path>,
    compiler: &CommandCompiler,
    normalizer: &Normalizer<'_>,
) -> Result<Vec<PathBuf>> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let path = file.to_string_lossy().to_string();

    let result = preprocess_document(&path, &text, compiler, normalizer);
    super::report(&path, &result.diagnostics);

    let output = output_path(file, out_dir, &normalizer.options().output_lang);
    fs::write(&output, &result.code)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    let mut written = vec![output.clone()];

    let blocks = [("module", &result.module), ("instance", &result.instance)];
    for (kind, block) in blocks {
        if let Some(BlockInfo { map: Some(map), .. }) = block {
            let map_path = PathBuf::from(format!("{}.{}.map", output.display(), kind));
            fs::write(&map_path, map.to_json()?)
                .with_context(|| format!("Failed to write {}", map_path.display()))?;
            written.push(map_path);
        }
    }
    Ok(written)
}

/// `dir/App.svelte` becomes `dir/App.ts.svelte` (or the same name under
/// `out_dir`).
fn output_path(file: &Path, out_dir: Option<&Path>, lang: &str) -> PathBuf {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match file.extension() {
        Some(ext) => format!("{}.{}.{}", stem, lang, ext.to_string_lossy()),
        None => format!("{}.{}", stem, lang),
    };
    match out_dir {
        Some(dir) => dir.join(name),
        None => file.with_file_name(name),
    }
}
