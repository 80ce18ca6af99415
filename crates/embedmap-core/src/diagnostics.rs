/*
 * diagnostics.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Structured diagnostics for map normalization.
 */

//! Structured diagnostics for map normalization.
//!
//! Normalization never fails outright: a malformed segment, a failed parse or
//! a missing identifier only degrade the precision of the produced map. Each
//! such event is recorded as a [`Diagnostic`] in the [`Diagnostics`] sink that
//! the caller owns, and mirrored as a `tracing` event.

use serde::{Deserialize, Serialize};

/// The kind of diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    /// Something was skipped and the map is less precise than it could be
    Warning,
    /// Expected degradation worth knowing about
    Info,
}

/// Stable identifiers for every diagnostic the engine emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    /// A raw segment had the wrong arity, a negative field or a bad name index
    #[serde(rename = "M-1-1")]
    MalformedSegment,
    /// A raw segment referenced a line outside the host document
    #[serde(rename = "M-1-2")]
    OutOfBounds,
    /// The syntax tree could not be built; protection and overrides are off
    #[serde(rename = "M-2-1")]
    ProtectionDisabled,
    /// The anchor's generated line has no positioned first segment
    #[serde(rename = "M-3-1")]
    OverrideNoSegment,
    /// The anchor's identifier does not occur as a whole word on its host line
    #[serde(rename = "M-3-2")]
    OverrideNotFound,
    /// The compiler could not be run or rejected the snippet
    #[serde(rename = "M-4-1")]
    CompilerUnavailable,
    /// The compiler returned code but no map
    #[serde(rename = "M-4-2")]
    MissingNativeMap,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::MalformedSegment => "M-1-1",
            DiagnosticCode::OutOfBounds => "M-1-2",
            DiagnosticCode::ProtectionDisabled => "M-2-1",
            DiagnosticCode::OverrideNoSegment => "M-3-1",
            DiagnosticCode::OverrideNotFound => "M-3-2",
            DiagnosticCode::CompilerUnavailable => "M-4-1",
            DiagnosticCode::MissingNativeMap => "M-4-2",
        }
    }

    pub fn kind(&self) -> DiagnosticKind {
        match self {
            DiagnosticCode::MissingNativeMap => DiagnosticKind::Info,
            _ => DiagnosticKind::Warning,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            DiagnosticCode::MalformedSegment => "Malformed map segment skipped",
            DiagnosticCode::OutOfBounds => "Mapping outside host document skipped",
            DiagnosticCode::ProtectionDisabled => "Loop protection disabled",
            DiagnosticCode::OverrideNoSegment => "Override skipped: no positioned segment",
            DiagnosticCode::OverrideNotFound => "Override skipped: identifier not found",
            DiagnosticCode::CompilerUnavailable => "Snippet passed through uncompiled",
            DiagnosticCode::MissingNativeMap => "Compiler returned no map",
        }
    }
}

/// A position in the generated (intermediate) code, 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedPosition {
    pub line: usize,
    pub column: usize,
}

/// One diagnostic event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,

    pub kind: DiagnosticKind,

    /// Specific information about this occurrence
    pub detail: String,

    /// Where in the generated code the event happened, if it is tied to one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated: Option<GeneratedPosition>,

    /// The host document line (0-based) involved, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_line: Option<usize>,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            kind: code.kind(),
            detail: detail.into(),
            generated: None,
            host_line: None,
        }
    }

    pub fn at_generated(mut self, line: usize, column: usize) -> Self {
        self.generated = Some(GeneratedPosition { line, column });
        self
    }

    pub fn on_host_line(mut self, line: usize) -> Self {
        self.host_line = Some(line);
        self
    }

    pub fn title(&self) -> &'static str {
        self.code.title()
    }

    /// Render as a single human-readable line.
    ///
    /// Positions are printed 1-based, the way editors show them.
    ///
    /// ```
    /// use embedmap_core::{Diagnostic, DiagnosticCode};
    ///
    /// let d = Diagnostic::new(DiagnosticCode::OverrideNotFound, "`item` not on host line")
    ///     .at_generated(3, 11);
    /// assert_eq!(
    ///     d.to_text(),
    ///     "Warning [M-3-2]: Override skipped: identifier not found (generated 4:12): `item` not on host line"
    /// );
    /// ```
    pub fn to_text(&self) -> String {
        let kind = match self.kind {
            DiagnosticKind::Warning => "Warning",
            DiagnosticKind::Info => "Info",
        };
        let mut text = format!("{} [{}]: {}", kind, self.code.as_str(), self.title());
        if let Some(pos) = self.generated {
            text.push_str(&format!(" (generated {}:{})", pos.line + 1, pos.column + 1));
        }
        if let Some(line) = self.host_line {
            text.push_str(&format!(" (host line {})", line + 1));
        }
        text.push_str(": ");
        text.push_str(&self.detail);
        text
    }

    /// Render as a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        let mut value = serde_json::json!({
            "code": self.code.as_str(),
            "kind": self.kind,
            "title": self.title(),
            "detail": self.detail,
        });
        if let Some(pos) = self.generated {
            value["generated"] = serde_json::json!({ "line": pos.line, "column": pos.column });
        }
        if let Some(line) = self.host_line {
            value["hostLine"] = serde_json::json!(line);
        }
        value
    }
}

/// Append-only collector owned by one snippet invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(
            code = diagnostic.code.as_str(),
            generated_line = diagnostic.generated.map(|p| p.line),
            generated_column = diagnostic.generated.map(|p| p.column),
            host_line = diagnostic.host_line,
            detail = %diagnostic.detail,
            "{}",
            diagnostic.title()
        );
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of diagnostics with the given code
    pub fn count(&self, code: DiagnosticCode) -> usize {
        self.items.iter().filter(|d| d.code == code).count()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
