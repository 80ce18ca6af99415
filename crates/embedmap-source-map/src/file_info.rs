/*
 * file_info.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Line index for location lookups.
 */

//! Line index for location lookups

use crate::types::Location;
use serde::{Deserialize, Serialize};

/// Line-break index over a text
///
/// Stores the byte offset of every newline so that offsets can be turned into
/// (row, column) positions and rows into line slices without rescanning the
/// whole text. The text itself is not stored; callers pass it back in when a
/// lookup needs UTF-16 columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInformation {
    /// Byte offsets of each newline character in the file
    line_breaks: Vec<usize>,

    /// Total length of the file in bytes
    total_length: usize,
}

impl FileInformation {
    /// Create file information by analyzing content
    ///
    /// # Example
    ///
    /// ```
    /// use embedmap_source_map::FileInformation;
    ///
    /// let info = FileInformation::new("line 1\nline 2\nline 3");
    /// assert_eq!(info.line_count(), 3);
    /// ```
    pub fn new(content: &str) -> Self {
        let line_breaks: Vec<usize> = content
            .char_indices()
            .filter_map(|(idx, ch)| if ch == '\n' { Some(idx) } else { None })
            .collect();

        FileInformation {
            line_breaks,
            total_length: content.len(),
        }
    }

    /// Convert a byte offset to a Location with row and UTF-16 column
    ///
    /// `content` must be the text this index was built from. Returns None if
    /// the offset is out of bounds or does not fall on a character boundary.
    ///
    /// # Example
    ///
    /// ```
    /// use embedmap_source_map::FileInformation;
    ///
    /// let text = "hello\nworld";
    /// let info = FileInformation::new(text);
    /// let loc = info.offset_to_location(6, text).unwrap();
    /// assert_eq!(loc.row, 1);
    /// assert_eq!(loc.column, 0);
    /// ```
    pub fn offset_to_location(&self, offset: usize, content: &str) -> Option<Location> {
        if offset > self.total_length {
            return None;
        }

        // A newline belongs to the line it terminates
        let row = match self.line_breaks.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx,
        };

        let line_start = self.line_start(row)?;
        let column = content.get(line_start..offset)?.encode_utf16().count();

        Some(Location {
            offset,
            row,
            column,
        })
    }

    /// Byte offset where `row` begins
    pub fn line_start(&self, row: usize) -> Option<usize> {
        if row == 0 {
            Some(0)
        } else {
            self.line_breaks.get(row - 1).map(|brk| brk + 1)
        }
    }

    /// Byte offset where `row` ends (exclusive, not counting its newline)
    pub fn line_end(&self, row: usize) -> Option<usize> {
        if row >= self.line_count() {
            return None;
        }
        Some(
            self.line_breaks
                .get(row)
                .copied()
                .unwrap_or(self.total_length),
        )
    }

    /// The text of `row` without its trailing newline
    pub fn line_text<'a>(&self, row: usize, content: &'a str) -> Option<&'a str> {
        let start = self.line_start(row)?;
        let end = self.line_end(row)?;
        content.get(start..end)
    }

    /// Get the total length of the file in bytes
    pub fn total_length(&self) -> usize {
        self.total_length
    }

    /// Get the number of lines in the file
    pub fn line_count(&self) -> usize {
        self.line_breaks.len() + 1
    }
}
