/*
 * host.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Host document model and snippet-to-host coordinate translation.
 */

//! Host document model and snippet-to-host coordinate translation.
//!
//! Columns are UTF-16 code units, the unit the snippet compiler and the
//! TypeScript tooling consuming the maps both use.

use embedmap_source_map::FileInformation;
use serde::{Deserialize, Serialize};

/// The outer document that embeds one or more snippets.
#[derive(Debug, Clone)]
pub struct HostDocument {
    path: String,
    text: String,
    info: FileInformation,
}

impl HostDocument {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let info = FileInformation::new(&text);
        Self {
            path: path.into(),
            text,
            info,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn info(&self) -> &FileInformation {
        &self.info
    }

    pub fn line_count(&self) -> usize {
        self.info.line_count()
    }

    /// Text of a 0-based line, without its newline.
    pub fn line_text(&self, line: usize) -> Option<&str> {
        self.info.line_text(line, &self.text)
    }

    /// Length of a line in UTF-16 code units.
    pub fn line_len(&self, line: usize) -> Option<usize> {
        self.line_text(line).map(|text| text.encode_utf16().count())
    }

    /// The character covering a 0-based (line, column), if there is one.
    ///
    /// Both halves of a surrogate pair resolve to the same character.
    pub fn char_at(&self, line: usize, column: usize) -> Option<char> {
        let mut unit = 0;
        for c in self.line_text(line)?.chars() {
            unit += c.len_utf16();
            if column < unit {
                return Some(c);
            }
        }
        None
    }

    /// Whether the referenced character is whitespace.
    ///
    /// Positions past the end of a line are not whitespace.
    pub fn is_whitespace_at(&self, line: usize, column: usize) -> bool {
        self.char_at(line, column).is_some_and(char::is_whitespace)
    }
}

/// A 0-based position in the host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HostPosition {
    pub line: usize,
    pub column: usize,
}

/// Where a dedented snippet sits inside its host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnippetPlacement {
    /// Host line (0-based) holding snippet line 0
    pub start_line: usize,
    /// Indentation stripped from every snippet line before compiling
    pub removed_indent: usize,
    /// Extra column offset of snippet line 0, when the snippet starts on the
    /// same host line as its opening tag
    pub first_line_column: usize,
}

impl SnippetPlacement {
    pub fn new(start_line: usize, removed_indent: usize) -> Self {
        Self {
            start_line,
            removed_indent,
            first_line_column: 0,
        }
    }

    pub fn host_line(&self, snippet_line: usize) -> usize {
        self.start_line + snippet_line
    }

    pub fn host_column(&self, snippet_line: usize, snippet_column: usize) -> usize {
        let lead = if snippet_line == 0 {
            self.first_line_column
        } else {
            0
        };
        snippet_column + self.removed_indent + lead
    }

    /// Translate a snippet-local position into host coordinates.
    ///
    /// With `adjust_separators`, a column that lands on the space of a `, `
    /// pair is moved back onto the comma. Columns past the end of the host
    /// line are clamped to the line length. Returns None when the line is
    /// outside the host document.
    pub fn snippet_to_host(
        &self,
        host: &HostDocument,
        snippet_line: usize,
        snippet_column: usize,
        adjust_separators: bool,
    ) -> Option<HostPosition> {
        let line = self.host_line(snippet_line);
        let line_len = host.line_len(line)?;
        let mut column = self.host_column(snippet_line, snippet_column);

        if adjust_separators
            && column > 0
            && host.char_at(line, column - 1) == Some(',')
            && host.char_at(line, column) == Some(' ')
        {
            column -= 1;
        }

        Some(HostPosition {
            line,
            column: column.min(line_len),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> HostDocument {
        HostDocument::new(
            "App.svelte",
            "<script lang=\"civet\">\n  foo(a, b)\n  x := 1\n</script>\n",
        )
    }

    #[test]
    fn test_line_access() {
        let doc = host();
        assert_eq!(doc.line_count(), 5);
        assert_eq!(doc.line_text(1), Some("  foo(a, b)"));
        assert_eq!(doc.char_at(1, 2), Some('f'));
        assert_eq!(doc.char_at(1, 50), None);
        assert!(doc.is_whitespace_at(1, 0));
        assert!(!doc.is_whitespace_at(1, 50));
    }

    #[test]
    fn test_columns_are_utf16_units() {
        let doc = HostDocument::new("App.svelte", "log \"🎉\", item\n");
        // The emoji is a surrogate pair, so `item` starts at column 10
        assert_eq!(doc.line_len(0), Some(14));
        assert_eq!(doc.char_at(0, 5), Some('🎉'));
        assert_eq!(doc.char_at(0, 6), Some('🎉'));
        assert_eq!(doc.char_at(0, 8), Some(','));
        assert_eq!(doc.char_at(0, 10), Some('i'));
    }

    #[test]
    fn test_snippet_to_host_offsets_line_and_indent() {
        let doc = host();
        let placement = SnippetPlacement::new(1, 2);
        assert_eq!(
            placement.snippet_to_host(&doc, 1, 0, true),
            Some(HostPosition { line: 2, column: 2 })
        );
    }

    #[test]
    fn test_separator_adjustment() {
        let doc = host();
        let placement = SnippetPlacement::new(1, 2);
        // Snippet line 0 is "foo(a, b)"; column 6 is the space after the comma
        assert_eq!(
            placement.snippet_to_host(&doc, 0, 6, true),
            Some(HostPosition { line: 1, column: 7 })
        );
        // Column 7 is `b` itself and stays put
        assert_eq!(
            placement.snippet_to_host(&doc, 0, 7, true),
            Some(HostPosition { line: 1, column: 9 })
        );
        // Disabled
        assert_eq!(
            placement.snippet_to_host(&doc, 0, 6, false),
            Some(HostPosition { line: 1, column: 8 })
        );
    }

    #[test]
    fn test_out_of_bounds() {
        let doc = host();
        let placement = SnippetPlacement::new(1, 2);
        assert_eq!(placement.snippet_to_host(&doc, 10, 0, true), None);
        // Clamped to the end of "  x := 1"
        assert_eq!(
            placement.snippet_to_host(&doc, 1, 40, true),
            Some(HostPosition { line: 2, column: 8 })
        );
    }

    #[test]
    fn test_first_line_column() {
        let doc = HostDocument::new("a.html", "<script lang=\"civet\">x := 1</script>");
        let placement = SnippetPlacement {
            start_line: 0,
            removed_indent: 0,
            first_line_column: 21,
        };
        assert_eq!(
            placement.snippet_to_host(&doc, 0, 0, true),
            Some(HostPosition {
                line: 0,
                column: 21
            })
        );
    }
}
