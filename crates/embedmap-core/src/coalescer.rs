/*
 * coalescer.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Per-line coalescing of raw segments into final mappings.
 */

//! Per-line coalescing of raw segments into final mappings.
//!
//! Each generated line is walked left to right with an explicit state
//! machine. At most one mapping is pending at a time; several raw segments
//! that land on the same generated column compete for it through
//! [`prefer_candidate`], and the winner is flushed once the walk moves on.

use crate::analyzer::ConstructAnalysis;
use crate::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use crate::host::{HostDocument, SnippetPlacement};
use crate::raw::{CompilerNativeMap, RawSegment};
use serde::Serialize;

/// Which pass produced a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingOrigin {
    Coalesced,
    Override,
}

/// A mapping from generated code to the host document. All coordinates are
/// 0-based; the original side is already in host coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalMapping {
    pub generated_line: usize,
    pub generated_column: usize,
    pub original_line: usize,
    pub original_column: usize,
    pub name: Option<String>,
    pub origin: MappingOrigin,
}

/// The mapping a line is currently holding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMapping {
    pub generated_line: usize,
    pub generated_column: usize,
    pub original_line: usize,
    pub original_column: usize,
    pub name: Option<String>,
}

impl PendingMapping {
    fn into_final(self) -> FinalMapping {
        FinalMapping {
            generated_line: self.generated_line,
            generated_column: self.generated_column,
            original_line: self.original_line,
            original_column: self.original_column,
            name: self.name,
            origin: MappingOrigin::Coalesced,
        }
    }

    /// Take over the original position and name of `other`, keeping the
    /// generated position.
    fn retarget(&mut self, other: PendingMapping) {
        self.original_line = other.original_line;
        self.original_column = other.original_column;
        self.name = other.name;
    }
}

/// Decide whether `candidate` should replace `current` when both sit on the
/// same generated column.
///
/// Rules, first one that discriminates wins:
///
/// 1. a non-whitespace host character beats whitespace (past end of line
///    counts as non-whitespace);
/// 2. on the same host line, the smaller column wins;
/// 3. at the same column, a named candidate beats an unnamed current;
/// 4. on different host lines, the earlier line wins;
/// 5. otherwise the current mapping stays.
pub fn prefer_candidate(
    host: &HostDocument,
    current: &PendingMapping,
    candidate: &PendingMapping,
) -> bool {
    let current_ws = host.is_whitespace_at(current.original_line, current.original_column);
    let candidate_ws = host.is_whitespace_at(candidate.original_line, candidate.original_column);
    if current_ws != candidate_ws {
        return current_ws;
    }
    if candidate.original_line == current.original_line {
        if candidate.original_column != current.original_column {
            return candidate.original_column < current.original_column;
        }
        return candidate.name.is_some() && current.name.is_none();
    }
    candidate.original_line < current.original_line
}

enum LineState {
    Empty,
    Holding(PendingMapping),
}

/// Turns a [`CompilerNativeMap`] into final mappings in host coordinates.
pub struct MappingCoalescer<'a> {
    host: &'a HostDocument,
    placement: SnippetPlacement,
    analysis: &'a ConstructAnalysis,
    adjust_separators: bool,
}

impl<'a> MappingCoalescer<'a> {
    pub fn new(
        host: &'a HostDocument,
        placement: SnippetPlacement,
        analysis: &'a ConstructAnalysis,
        adjust_separators: bool,
    ) -> Self {
        Self {
            host,
            placement,
            analysis,
            adjust_separators,
        }
    }

    pub fn coalesce(
        &self,
        map: &CompilerNativeMap,
        diagnostics: &mut Diagnostics,
    ) -> Vec<FinalMapping> {
        let override_lines = self.analysis.anchor_lines();
        let mut out = Vec::new();
        for (line, segments) in map.lines().iter().enumerate() {
            // Lines holding an override anchor only keep their first segment
            let segments = if override_lines.contains(&line) {
                &segments[..segments.len().min(1)]
            } else {
                segments.as_slice()
            };
            self.coalesce_line(map, line, segments, diagnostics, &mut out);
        }
        tracing::debug!(mappings = out.len(), "Coalesced raw segments");
        out
    }

    fn coalesce_line(
        &self,
        map: &CompilerNativeMap,
        line: usize,
        segments: &[RawSegment],
        diagnostics: &mut Diagnostics,
        out: &mut Vec<FinalMapping>,
    ) {
        let mut state = LineState::Empty;
        let mut column: usize = 0;

        for segment in segments {
            if let Some(delta) = segment.delta() {
                let Some(next) = column.checked_add(delta) else {
                    diagnostics.push(
                        Diagnostic::new(
                            DiagnosticCode::MalformedSegment,
                            format!("column delta {} overflows the generated column", delta),
                        )
                        .at_generated(line, column),
                    );
                    // The rest of the line has no usable columns
                    break;
                };
                column = next;
            }
            let protected = self.analysis.protected.contains_strictly(line, column);

            match segment {
                RawSegment::Malformed { reason, .. } => {
                    diagnostics.push(
                        Diagnostic::new(DiagnosticCode::MalformedSegment, reason.clone())
                            .at_generated(line, column),
                    );
                }
                RawSegment::Advance { .. } if protected => {}
                RawSegment::Mapped { .. } if protected => {}
                RawSegment::Advance { delta } => {
                    if *delta > 1 {
                        if let LineState::Holding(pending) =
                            std::mem::replace(&mut state, LineState::Empty)
                        {
                            self.flush_range(pending, column, *delta, out);
                        }
                    }
                }
                RawSegment::Mapped {
                    original_line,
                    original_column,
                    name_index,
                    ..
                } => {
                    let name = name_index.and_then(|idx| map.name(idx));
                    if name.is_some_and(|n| self.analysis.is_synthetic(n)) {
                        continue;
                    }
                    let Some(candidate) = self.translate(
                        line,
                        column,
                        *original_line,
                        *original_column,
                        name,
                        diagnostics,
                    ) else {
                        continue;
                    };
                    state = match state {
                        LineState::Empty => LineState::Holding(candidate),
                        LineState::Holding(mut pending) if pending.generated_column == column => {
                            if prefer_candidate(self.host, &pending, &candidate) {
                                pending.retarget(candidate);
                            }
                            LineState::Holding(pending)
                        }
                        LineState::Holding(pending) => {
                            out.push(pending.into_final());
                            LineState::Holding(candidate)
                        }
                    };
                }
            }
        }

        if let LineState::Holding(pending) = state {
            out.push(pending.into_final());
        }
    }

    /// Emit a pending mapping as a range ending `delta` columns later.
    fn flush_range(
        &self,
        pending: PendingMapping,
        end_column: usize,
        delta: usize,
        out: &mut Vec<FinalMapping>,
    ) {
        let line_len = self.host.line_len(pending.original_line).unwrap_or(0);
        let end = FinalMapping {
            generated_line: pending.generated_line,
            generated_column: end_column,
            original_line: pending.original_line,
            original_column: pending.original_column.saturating_add(delta).min(line_len),
            name: pending.name.clone(),
            origin: MappingOrigin::Coalesced,
        };
        out.push(pending.into_final());
        out.push(end);
    }

    fn translate(
        &self,
        generated_line: usize,
        generated_column: usize,
        snippet_line: usize,
        snippet_column: usize,
        name: Option<&str>,
        diagnostics: &mut Diagnostics,
    ) -> Option<PendingMapping> {
        let Some(pos) = self.placement.snippet_to_host(
            self.host,
            snippet_line,
            snippet_column,
            self.adjust_separators,
        ) else {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::OutOfBounds,
                    format!(
                        "host has {} lines, segment points at snippet line {}",
                        self.host.line_count(),
                        snippet_line
                    ),
                )
                .at_generated(generated_line, generated_column)
                .on_host_line(self.placement.host_line(snippet_line)),
            );
            return None;
        };
        Some(PendingMapping {
            generated_line,
            generated_column,
            original_line: pos.line,
            original_column: pos.column,
            name: name.map(str::to_string),
        })
    }
}
