/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Position-map normalization for compiled embedded snippets.
 */

//! Position-map normalization for compiled embedded snippets.
//!
//! A host document (a Svelte component, an HTML page) embeds snippets written
//! in a secondary syntax. An external compiler turns each snippet into
//! intermediate code and reports a compiler-native, snippet-local segment map.
//! This crate turns that map into a Source Map V3 document over the *host*
//! document:
//!
//! 1. [`raw`] classifies the native segments once.
//! 2. [`analyzer`] walks the intermediate code's syntax tree to find
//!    compiler-synthesized loop counters and user loop identifiers.
//! 3. [`coalescer`] reduces the segments of each generated line to at most
//!    one mapping per column, with deterministic tie-breaks.
//! 4. [`overrides`] maps loop identifiers directly onto the host text.
//! 5. [`encoder`] merges, deduplicates and VLQ-encodes the result.
//!
//! Failures inside normalization are never errors; they are reported through
//! [`Diagnostics`] and only reduce the precision of the map.
//!
//! ```
//! use embedmap_core::{CompilerNativeMap, CompiledOptions, HostDocument, SnippetPlacement};
//!
//! let host = HostDocument::new("App.svelte", "<script lang=\"civet\">\nx := 1\n</script>\n");
//! let native = CompilerNativeMap::from_lines(vec![vec![vec![0, 0, 0, 0]]], None);
//! let result = embedmap_core::normalize_snippet(
//!     "const x = 1\n",
//!     &native,
//!     &host,
//!     SnippetPlacement::new(1, 0),
//!     &CompiledOptions::default(),
//! );
//! assert_eq!(result.map.mappings, "AACA");
//! assert!(result.diagnostics.is_empty());
//! ```

pub mod analyzer;
pub mod coalescer;
pub mod compile;
pub mod decoder;
pub mod diagnostics;
pub mod encoder;
pub mod error;
pub mod host;
pub mod options;
pub mod overrides;
pub mod pipeline;
pub mod preprocess;
pub mod raw;
pub mod syntax;
mod vlq;

pub use analyzer::{AnalysisStatus, ConstructAnalysis, OverrideAnchor, ProtectedRange, ProtectedRanges};
pub use coalescer::{FinalMapping, MappingCoalescer, MappingOrigin, PendingMapping, prefer_candidate};
pub use compile::{CommandCompiler, CompileOutput, SnippetCompiler};
pub use decoder::{DecodedMapping, OriginalPosition, decode_mappings};
pub use diagnostics::{Diagnostic, DiagnosticCode, DiagnosticKind, Diagnostics};
pub use encoder::{EncodedPositionMap, MapEncoder};
pub use error::{CompileError, MapError, Result, SyntaxError};
pub use host::{HostDocument, HostPosition, SnippetPlacement};
pub use options::{CompiledOptions, NormalizeOptions};
pub use overrides::OverrideInjector;
pub use pipeline::{NormalizeResult, Normalizer, SnippetOutput, normalize_snippet};
pub use preprocess::{BlockInfo, PreprocessResult, ScriptKind, Snippet, extract_snippets, preprocess_document};
pub use raw::{CompilerNativeMap, RawSegment};
pub use syntax::{SyntaxNode, SyntaxParser, TypeScriptParser};
