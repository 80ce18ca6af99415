/*
 * analyzer.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Protected-construct analysis of intermediate code.
 */

//! Protected-construct analysis of intermediate code.
//!
//! The compiler synthesizes loop counters (`i`, `i0`, `i1`, ...) that have no
//! counterpart in the snippet, and it rewrites user loops so that the raw map
//! for a loop header is unreliable. One pre-order walk over the syntax tree
//! finds both:
//!
//! - synthetic identifiers, whose spans are protected from raw mappings;
//! - loop bindings, loop iterables and declarations directly inside a loop
//!   body, which are protected and also become override anchors.

use crate::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use crate::options::CompiledOptions;
use crate::syntax::{SyntaxKind, SyntaxNode, SyntaxParser};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A span of generated code excluded from raw mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ProtectedRange {
    pub line: usize,
    pub start: usize,
    pub end: usize,
}

/// Protected ranges grouped per generated line.
///
/// Ranges on a line are sorted and never overlap or touch: overlapping or
/// adjacent inputs are merged on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectedRanges {
    by_line: BTreeMap<usize, Vec<(usize, usize)>>,
}

impl ProtectedRanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ranges(ranges: impl IntoIterator<Item = ProtectedRange>) -> Self {
        let mut by_line: BTreeMap<usize, Vec<(usize, usize)>> = BTreeMap::new();
        for range in ranges {
            by_line
                .entry(range.line)
                .or_default()
                .push((range.start.min(range.end), range.start.max(range.end)));
        }
        for spans in by_line.values_mut() {
            spans.sort_unstable();
            let mut merged: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
            for &(start, end) in spans.iter() {
                match merged.last_mut() {
                    Some(last) if start <= last.1 => last.1 = last.1.max(end),
                    _ => merged.push((start, end)),
                }
            }
            *spans = merged;
        }
        Self { by_line }
    }

    /// Whether `column` lies strictly between the start and end of a range on
    /// `line`. Range boundaries are not protected.
    pub fn contains_strictly(&self, line: usize, column: usize) -> bool {
        self.by_line
            .get(&line)
            .is_some_and(|spans| spans.iter().any(|&(s, e)| s < column && column < e))
    }

    pub fn line(&self, line: usize) -> &[(usize, usize)] {
        self.by_line.get(&line).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = ProtectedRange> + '_ {
        self.by_line.iter().flat_map(|(&line, spans)| {
            spans
                .iter()
                .map(move |&(start, end)| ProtectedRange { line, start, end })
        })
    }

    pub fn len(&self) -> usize {
        self.by_line.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_line.is_empty()
    }
}

/// A user identifier in generated code that gets a directly computed mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverrideAnchor {
    pub name: String,
    pub line: usize,
    pub start: usize,
    pub end: usize,
}

/// How far the analysis got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisStatus {
    /// Turned off in the options
    Disabled,
    /// The code has no loop syntax, so nothing could be found
    NoLoops,
    /// The parser failed; results are empty
    ParseFailed,
    Completed,
}

/// Result of analysing one snippet's intermediate code.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructAnalysis {
    pub protected: ProtectedRanges,
    pub anchors: Vec<OverrideAnchor>,
    pub synthetic_names: BTreeSet<String>,
    /// Lines of loop bindings that were dropped as anchors because their name
    /// is synthetic. Raw segments there are still reduced to the first one.
    pub synthetic_anchor_lines: BTreeSet<usize>,
    pub status: AnalysisStatus,
}

impl ConstructAnalysis {
    pub fn empty(status: AnalysisStatus) -> Self {
        Self {
            protected: ProtectedRanges::new(),
            anchors: Vec::new(),
            synthetic_names: BTreeSet::new(),
            synthetic_anchor_lines: BTreeSet::new(),
            status,
        }
    }

    /// Generated lines owned by the override pass, including lines whose
    /// only anchor had a synthetic name.
    pub fn anchor_lines(&self) -> BTreeSet<usize> {
        self.anchors
            .iter()
            .map(|a| a.line)
            .chain(self.synthetic_anchor_lines.iter().copied())
            .collect()
    }

    pub fn is_synthetic(&self, name: &str) -> bool {
        self.synthetic_names.contains(name)
    }
}

/// Analyse intermediate code for synthetic identifiers and loop anchors.
///
/// Fails open: a parser error yields an empty analysis and a diagnostic.
pub fn analyze(
    code: &str,
    parser: &dyn SyntaxParser,
    options: &CompiledOptions,
    diagnostics: &mut Diagnostics,
) -> ConstructAnalysis {
    if !options.protect_loops {
        return ConstructAnalysis::empty(AnalysisStatus::Disabled);
    }
    if !options.loop_syntax.is_match(code) {
        tracing::debug!("No loop syntax in intermediate code, skipping analysis");
        return ConstructAnalysis::empty(AnalysisStatus::NoLoops);
    }

    let root = match parser.parse(code) {
        Ok(root) => root,
        Err(e) => {
            diagnostics.push(Diagnostic::new(
                DiagnosticCode::ProtectionDisabled,
                e.to_string(),
            ));
            return ConstructAnalysis::empty(AnalysisStatus::ParseFailed);
        }
    };

    let mut walker = Walker {
        options,
        ranges: Vec::new(),
        anchors: Vec::new(),
        synthetic: BTreeSet::new(),
    };
    walker.visit(&root);

    let Walker {
        ranges,
        mut anchors,
        synthetic,
        ..
    } = walker;
    // Synthetic names stay protected but never get an override; their lines
    // still lose every raw segment after the first
    let synthetic_anchor_lines: BTreeSet<usize> = anchors
        .iter()
        .filter(|a| synthetic.contains(&a.name))
        .map(|a| a.line)
        .collect();
    anchors.retain(|a| !synthetic.contains(&a.name));

    tracing::debug!(
        protected = ranges.len(),
        anchors = anchors.len(),
        synthetic = synthetic.len(),
        "Analysed intermediate code"
    );

    ConstructAnalysis {
        protected: ProtectedRanges::from_ranges(ranges),
        anchors,
        synthetic_names: synthetic,
        synthetic_anchor_lines,
        status: AnalysisStatus::Completed,
    }
}

struct Walker<'a> {
    options: &'a CompiledOptions,
    ranges: Vec<ProtectedRange>,
    anchors: Vec<OverrideAnchor>,
    synthetic: BTreeSet<String>,
}

impl Walker<'_> {
    fn visit(&mut self, node: &SyntaxNode) {
        match &node.kind {
            SyntaxKind::Identifier(name) if self.options.is_synthetic_index(name) => {
                self.synthetic.insert(name.clone());
                self.protect(node);
            }
            SyntaxKind::Iteration { declaration, .. } => {
                if declaration.is_some() {
                    if let Some(binding) = node.child_by_field("left") {
                        self.anchor(binding);
                    }
                }
                if let Some(iterable) = node.child_by_field("right") {
                    self.anchor(iterable);
                }
                if let Some(body) = node.child_by_field("body").filter(|b| b.is_block()) {
                    for declared in body_declarations(body) {
                        self.anchor(declared);
                    }
                }
            }
            _ => {}
        }
        for child in &node.children {
            self.visit(child);
        }
    }

    fn protect(&mut self, node: &SyntaxNode) -> bool {
        if !node.range.is_single_row() {
            return false;
        }
        self.ranges.push(ProtectedRange {
            line: node.range.start.row,
            start: node.range.start.column,
            end: node.range.end.column,
        });
        true
    }

    /// Protect and anchor a node when it is a bare identifier.
    fn anchor(&mut self, node: &SyntaxNode) {
        let Some(name) = node.identifier_name() else {
            return;
        };
        if self.protect(node) {
            self.anchors.push(OverrideAnchor {
                name: name.to_string(),
                line: node.range.start.row,
                start: node.range.start.column,
                end: node.range.end.column,
            });
        }
    }
}

/// Declared names of `const`/`let`/`var` statements directly inside a block.
fn body_declarations(body: &SyntaxNode) -> impl Iterator<Item = &SyntaxNode> {
    body.children
        .iter()
        .filter(|stmt| stmt.is_variable_declaration())
        .flat_map(|stmt| stmt.children.iter())
        .filter(|decl| decl.kind == SyntaxKind::VariableDeclarator)
        .filter_map(|decl| decl.child_by_field("name"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyntaxError;
    use crate::syntax::TypeScriptParser;
    use pretty_assertions::assert_eq;

    struct FailingParser;

    impl SyntaxParser for FailingParser {
        fn parse(&self, _code: &str) -> Result<SyntaxNode, SyntaxError> {
            Err(SyntaxError::Parse("unavailable".to_string()))
        }
    }

    fn run(code: &str) -> (ConstructAnalysis, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let analysis = analyze(
            code,
            &TypeScriptParser,
            &CompiledOptions::default(),
            &mut diagnostics,
        );
        (analysis, diagnostics)
    }

    fn range(line: usize, start: usize, end: usize) -> ProtectedRange {
        ProtectedRange { line, start, end }
    }

    #[test]
    fn test_merge_overlapping_and_touching() {
        let ranges = ProtectedRanges::from_ranges(vec![
            range(0, 10, 14),
            range(0, 2, 4),
            range(0, 12, 20),
            range(0, 20, 22),
            range(1, 5, 6),
        ]);
        assert_eq!(ranges.line(0), &[(2, 4), (10, 22)]);
        assert_eq!(ranges.line(1), &[(5, 6)]);
        assert_eq!(ranges.len(), 3);
    }

    #[test]
    fn test_strict_containment() {
        let ranges = ProtectedRanges::from_ranges(vec![range(3, 4, 8)]);
        assert!(!ranges.contains_strictly(3, 4));
        assert!(ranges.contains_strictly(3, 5));
        assert!(ranges.contains_strictly(3, 7));
        assert!(!ranges.contains_strictly(3, 8));
        assert!(!ranges.contains_strictly(2, 5));
    }

    #[test]
    fn test_for_of_loop() {
        let code = "for (const item of items) {\n  log(item)\n}\n";
        let (analysis, diagnostics) = run(code);
        assert!(diagnostics.is_empty());
        assert_eq!(analysis.status, AnalysisStatus::Completed);
        assert_eq!(
            analysis.anchors,
            vec![
                OverrideAnchor {
                    name: "item".to_string(),
                    line: 0,
                    start: 11,
                    end: 15
                },
                OverrideAnchor {
                    name: "items".to_string(),
                    line: 0,
                    start: 19,
                    end: 24
                },
            ]
        );
        assert_eq!(analysis.protected.line(0), &[(11, 15), (19, 24)]);
        assert!(analysis.synthetic_names.is_empty());
        assert_eq!(analysis.anchor_lines(), BTreeSet::from([0]));
    }

    #[test]
    fn test_synthetic_index_is_protection_only() {
        let code = "for (let i = 0; i < n; i++) {}\nfor (const i1 in table) {\n  const key = i1\n}\n";
        let (analysis, _) = run(code);

        assert_eq!(
            analysis.synthetic_names,
            BTreeSet::from(["i".to_string(), "i1".to_string()])
        );
        // i1 is the binding of the for-in but synthetic, so only `table` and
        // the body declaration `key` are anchored
        let names: Vec<&str> = analysis.anchors.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["table", "key"]);
        // `let i = 0; i < n; i++` has three protected `i` spans on line 0
        assert_eq!(analysis.protected.line(0), &[(9, 10), (16, 17), (23, 24)]);
        assert!(analysis.protected.contains_strictly(1, 12));
        assert_eq!(analysis.synthetic_anchor_lines, BTreeSet::from([1]));
    }

    #[test]
    fn test_synthetic_binding_line_still_owned_by_overrides() {
        let code = "for (const i of obj.list) {
  log(i)
}
";
        let (analysis, _) = run(code);
        assert!(analysis.anchors.is_empty());
        assert_eq!(analysis.anchor_lines(), BTreeSet::from([0]));
    }

    #[test]
    fn test_destructured_binding_not_anchored() {
        let code = "for (const [k, v] of pairs) {}";
        let (analysis, _) = run(code);
        let names: Vec<&str> = analysis.anchors.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["pairs"]);
    }

    #[test]
    fn test_member_iterable_not_anchored() {
        let code = "for (const x of obj.list) {}";
        let (analysis, _) = run(code);
        let names: Vec<&str> = analysis.anchors.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["x"]);
    }

    #[test]
    fn test_skips_without_loop_syntax() {
        let mut diagnostics = Diagnostics::new();
        // The failing parser proves the parse never happens
        let analysis = analyze(
            "const i0 = 1\n",
            &FailingParser,
            &CompiledOptions::default(),
            &mut diagnostics,
        );
        assert_eq!(analysis.status, AnalysisStatus::NoLoops);
        assert!(diagnostics.is_empty());
        assert!(analysis.protected.is_empty());
    }

    #[test]
    fn test_fails_open() {
        let mut diagnostics = Diagnostics::new();
        let analysis = analyze(
            "for (const x of xs) {}",
            &FailingParser,
            &CompiledOptions::default(),
            &mut diagnostics,
        );
        assert_eq!(analysis.status, AnalysisStatus::ParseFailed);
        assert!(analysis.protected.is_empty());
        assert!(analysis.anchors.is_empty());
        assert_eq!(diagnostics.count(DiagnosticCode::ProtectionDisabled), 1);
    }

    #[test]
    fn test_disabled() {
        let mut options = CompiledOptions::default();
        options.protect_loops = false;
        let mut diagnostics = Diagnostics::new();
        let analysis = analyze(
            "for (const x of xs) {}",
            &TypeScriptParser,
            &options,
            &mut diagnostics,
        );
        assert_eq!(analysis.status, AnalysisStatus::Disabled);
    }
}
