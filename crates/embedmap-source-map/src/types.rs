/*
 * types.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Core position types.
 */

//! Core position types

use serde::{Deserialize, Serialize};

/// A location in source text (0-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Byte offset from start of source
    pub offset: usize,
    /// Row number (0-indexed)
    pub row: usize,
    /// Column number (0-indexed, in UTF-16 code units as JavaScript tooling
    /// counts them)
    pub column: usize,
}

/// A range in source text from start to end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    /// Start location (inclusive)
    pub start: Location,
    /// End location (exclusive)
    pub end: Location,
}

impl Range {
    pub fn new(start: Location, end: Location) -> Self {
        Range { start, end }
    }

    /// Whether the range starts and ends on the same row
    pub fn is_single_row(&self) -> bool {
        self.start.row == self.end.row
    }

    /// Byte length of the range
    pub fn len(&self) -> usize {
        self.end.offset.saturating_sub(self.start.offset)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slice the text this range covers out of `source`
    pub fn slice<'a>(&self, source: &'a str) -> Option<&'a str> {
        source.get(self.start.offset..self.end.offset)
    }
}
