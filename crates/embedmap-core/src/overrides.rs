/*
 * overrides.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Direct mappings for loop identifiers.
 */

//! Direct mappings for loop identifiers.
//!
//! The compiler's map for a rewritten loop header is unreliable, so each
//! override anchor is mapped by finding its identifier on the host line the
//! header came from.

use crate::analyzer::{ConstructAnalysis, OverrideAnchor};
use crate::coalescer::{FinalMapping, MappingOrigin};
use crate::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use crate::host::{HostDocument, SnippetPlacement};
use crate::raw::{CompilerNativeMap, RawSegment};
use embedmap_source_map::byte_to_utf16_column;
use regex::Regex;

/// Emits start and end mappings for every override anchor.
pub struct OverrideInjector<'a> {
    host: &'a HostDocument,
    placement: SnippetPlacement,
}

impl<'a> OverrideInjector<'a> {
    pub fn new(host: &'a HostDocument, placement: SnippetPlacement) -> Self {
        Self { host, placement }
    }

    pub fn inject(
        &self,
        analysis: &ConstructAnalysis,
        map: &CompilerNativeMap,
        diagnostics: &mut Diagnostics,
    ) -> Vec<FinalMapping> {
        let mut out = Vec::with_capacity(analysis.anchors.len() * 2);
        for anchor in &analysis.anchors {
            if analysis.is_synthetic(&anchor.name) {
                continue;
            }
            if let Some((start, end)) = self.resolve(anchor, map, diagnostics) {
                tracing::debug!(
                    name = %anchor.name,
                    generated_line = anchor.line,
                    host_line = start.0,
                    host_column = start.1,
                    "Override mapping"
                );
                out.push(self.mapping(anchor, anchor.start, start));
                out.push(self.mapping(anchor, anchor.end, end));
            }
        }
        out
    }

    fn mapping(
        &self,
        anchor: &OverrideAnchor,
        generated_column: usize,
        (line, column): (usize, usize),
    ) -> FinalMapping {
        FinalMapping {
            generated_line: anchor.line,
            generated_column,
            original_line: line,
            original_column: column,
            name: Some(anchor.name.clone()),
            origin: MappingOrigin::Override,
        }
    }

    /// Host (line, column) of the identifier's start and end.
    fn resolve(
        &self,
        anchor: &OverrideAnchor,
        map: &CompilerNativeMap,
        diagnostics: &mut Diagnostics,
    ) -> Option<((usize, usize), (usize, usize))> {
        let Some(RawSegment::Mapped { original_line, .. }) = map.first_segment(anchor.line) else {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::OverrideNoSegment,
                    format!("no positioned first segment for `{}`", anchor.name),
                )
                .at_generated(anchor.line, anchor.start),
            );
            return None;
        };

        let host_line = self.placement.host_line(*original_line);
        let Some(text) = self.host.line_text(host_line) else {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::OutOfBounds,
                    format!("host line for `{}` is outside the document", anchor.name),
                )
                .at_generated(anchor.line, anchor.start)
                .on_host_line(host_line),
            );
            return None;
        };

        let found = Regex::new(&format!(r"\b{}\b", regex::escape(&anchor.name)))
            .ok()
            .and_then(|re| re.find(text))
            .and_then(|m| byte_to_utf16_column(text, m.start()));
        let Some(column) = found else {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::OverrideNotFound,
                    format!("`{}` does not occur as a word on its host line", anchor.name),
                )
                .at_generated(anchor.line, anchor.start)
                .on_host_line(host_line),
            );
            return None;
        };

        let end = column + anchor.name.encode_utf16().count();
        Some(((host_line, column), (host_line, end)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::AnalysisStatus;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    const HOST: &str = "<script lang=\"civet\">\n  for item of items\n    log item\n</script>\n";

    fn anchor(name: &str, line: usize, start: usize) -> OverrideAnchor {
        OverrideAnchor {
            name: name.to_string(),
            line,
            start,
            end: start + name.len(),
        }
    }

    fn inject(
        anchors: Vec<OverrideAnchor>,
        synthetic: &[&str],
        lines: Vec<Vec<Vec<i64>>>,
    ) -> (Vec<FinalMapping>, Diagnostics) {
        let host = HostDocument::new("App.svelte", HOST);
        let analysis = ConstructAnalysis {
            anchors,
            synthetic_names: synthetic.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
            ..ConstructAnalysis::empty(AnalysisStatus::Completed)
        };
        let map = CompilerNativeMap::from_lines(lines, None);
        let mut diagnostics = Diagnostics::new();
        let out = OverrideInjector::new(&host, SnippetPlacement::new(1, 2)).inject(
            &analysis,
            &map,
            &mut diagnostics,
        );
        (out, diagnostics)
    }

    fn mapping(gc: usize, ol: usize, oc: usize, name: &str) -> FinalMapping {
        FinalMapping {
            generated_line: 0,
            generated_column: gc,
            original_line: ol,
            original_column: oc,
            name: Some(name.to_string()),
            origin: MappingOrigin::Override,
        }
    }

    #[test]
    fn test_whole_word_match() {
        let (out, diagnostics) = inject(
            vec![anchor("item", 0, 11), anchor("items", 0, 19)],
            &[],
            vec![vec![vec![0, 0, 0, 0]]],
        );
        assert!(diagnostics.is_empty());
        // "  for item of items": `item` at 6, `items` at 14
        assert_eq!(
            out,
            vec![
                mapping(11, 1, 6, "item"),
                mapping(15, 1, 10, "item"),
                mapping(19, 1, 14, "items"),
                mapping(24, 1, 19, "items"),
            ]
        );
    }

    #[test]
    fn test_synthetic_anchor_skipped() {
        let (out, diagnostics) = inject(vec![anchor("i0", 0, 9)], &["i0"], vec![vec![vec![0, 0, 0, 0]]]);
        assert!(out.is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_no_positioned_segment() {
        let (out, diagnostics) = inject(vec![anchor("item", 0, 11)], &[], vec![vec![vec![4]]]);
        assert!(out.is_empty());
        assert_eq!(diagnostics.count(DiagnosticCode::OverrideNoSegment), 1);

        let (out, diagnostics) = inject(vec![anchor("item", 3, 11)], &[], vec![]);
        assert!(out.is_empty());
        assert_eq!(diagnostics.count(DiagnosticCode::OverrideNoSegment), 1);
    }

    #[test]
    fn test_identifier_not_on_host_line() {
        let (out, diagnostics) = inject(vec![anchor("entry", 0, 11)], &[], vec![vec![vec![0, 0, 0, 0]]]);
        assert!(out.is_empty());
        assert_eq!(diagnostics.count(DiagnosticCode::OverrideNotFound), 1);
        let d = diagnostics.iter().next().unwrap();
        assert_eq!(d.host_line, Some(1));
    }

    #[test]
    fn test_host_line_from_first_segment() {
        // The first segment points at snippet line 1, "  log item" on host line 2
        let (out, _) = inject(vec![anchor("item", 0, 4)], &[], vec![vec![vec![0, 0, 1, 0]]]);
        assert_eq!(out[0].original_line, 2);
        assert_eq!(out[0].original_column, 8);
    }
}
