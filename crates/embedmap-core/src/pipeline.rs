/*
 * pipeline.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Single-snippet orchestration.
 */

//! Single-snippet orchestration.
//!
//! ```text
//! intermediate code ──► analyze ──┐
//!                                 ├──► coalesce ──► inject overrides ──► encode
//! native map ─────────────────────┘
//! ```

use crate::analyzer::{self, AnalysisStatus};
use crate::coalescer::MappingCoalescer;
use crate::compile::{CompileOutput, SnippetCompiler};
use crate::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use crate::encoder::{EncodedPositionMap, MapEncoder};
use crate::host::{HostDocument, SnippetPlacement};
use crate::options::CompiledOptions;
use crate::overrides::OverrideInjector;
use crate::raw::CompilerNativeMap;
use crate::syntax::{SyntaxParser, TypeScriptParser};

/// Runs the normalization stages for one snippet at a time.
///
/// Holds no per-snippet state, so one normalizer can serve many snippets,
/// including from several threads.
#[derive(Clone, Copy)]
pub struct Normalizer<'a> {
    options: &'a CompiledOptions,
    parser: &'a dyn SyntaxParser,
}

/// A snippet after compilation and normalization.
#[derive(Debug, Clone)]
pub struct SnippetOutput {
    /// Intermediate code, or the snippet itself when compilation failed
    pub code: String,
    /// None when the compiler failed or returned no map
    pub map: Option<EncodedPositionMap>,
    pub native: Option<CompilerNativeMap>,
    pub compiled: bool,
}

impl<'a> Normalizer<'a> {
    pub fn new(options: &'a CompiledOptions, parser: &'a dyn SyntaxParser) -> Self {
        Self { options, parser }
    }

    pub fn options(&self) -> &CompiledOptions {
        self.options
    }

    /// Normalize the native map of already-compiled code into a V3 map over
    /// the host document.
    pub fn normalize(
        &self,
        code: &str,
        native: &CompilerNativeMap,
        host: &HostDocument,
        placement: SnippetPlacement,
        diagnostics: &mut Diagnostics,
    ) -> EncodedPositionMap {
        let analysis = analyzer::analyze(code, self.parser, self.options, diagnostics);
        if analysis.status == AnalysisStatus::ParseFailed {
            tracing::warn!(file = host.path(), "Loop protection disabled for snippet");
        }

        let coalesced = MappingCoalescer::new(
            host,
            placement,
            &analysis,
            self.options.adjust_separators,
        )
        .coalesce(native, diagnostics);
        let overrides = OverrideInjector::new(host, placement).inject(&analysis, native, diagnostics);

        tracing::debug!(
            file = host.path(),
            start_line = placement.start_line,
            coalesced = coalesced.len(),
            overrides = overrides.len(),
            "Normalized snippet map"
        );
        MapEncoder::new(host).encode(coalesced, overrides)
    }

    /// Compile a snippet and normalize its map.
    ///
    /// Never fails: an unavailable or failing compiler passes the snippet
    /// through unmapped, and a compiler without a map yields code only. Both
    /// are recorded as diagnostics.
    pub fn compile_and_normalize(
        &self,
        compiler: &dyn SnippetCompiler,
        snippet: &str,
        host: &HostDocument,
        placement: SnippetPlacement,
        diagnostics: &mut Diagnostics,
    ) -> SnippetOutput {
        let output = match compiler.compile(snippet, host.path()) {
            Ok(output) => output,
            Err(e) => {
                diagnostics.push(
                    Diagnostic::new(DiagnosticCode::CompilerUnavailable, e.to_string())
                        .on_host_line(placement.start_line),
                );
                return SnippetOutput {
                    code: snippet.to_string(),
                    map: None,
                    native: None,
                    compiled: false,
                };
            }
        };

        match output {
            CompileOutput::Code(code) => {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::MissingNativeMap,
                        format!("no map for snippet in {}", host.path()),
                    )
                    .on_host_line(placement.start_line),
                );
                SnippetOutput {
                    code,
                    map: None,
                    native: None,
                    compiled: true,
                }
            }
            CompileOutput::CodeWithMap { code, map } => {
                let encoded = self.normalize(&code, &map, host, placement, diagnostics);
                SnippetOutput {
                    code,
                    map: Some(encoded),
                    native: Some(map),
                    compiled: true,
                }
            }
        }
    }
}

/// A normalized map with the diagnostics raised while producing it.
#[derive(Debug, Clone)]
pub struct NormalizeResult {
    pub map: EncodedPositionMap,
    pub diagnostics: Diagnostics,
}

/// Normalize one snippet with the tree-sitter TypeScript parser.
pub fn normalize_snippet(
    code: &str,
    native: &CompilerNativeMap,
    host: &HostDocument,
    placement: SnippetPlacement,
    options: &CompiledOptions,
) -> NormalizeResult {
    let mut diagnostics = Diagnostics::new();
    let map = Normalizer::new(options, &TypeScriptParser).normalize(
        code,
        native,
        host,
        placement,
        &mut diagnostics,
    );
    NormalizeResult { map, diagnostics }
}
