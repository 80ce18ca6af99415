/*
 * decoder.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Reading V3 mappings back.
 */

//! Reading V3 mappings back.
//!
//! Editor integrations resolve "go to definition" by asking for the original
//! position of a generated position; this is the same lookup.

use crate::encoder::EncodedPositionMap;
use crate::error::{MapError, Result};
use crate::vlq;
use serde::Serialize;

/// One decoded mapping. All fields are 0-based absolute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedMapping {
    pub generated_line: usize,
    pub generated_column: usize,
    /// None for column-only segments
    pub source: Option<usize>,
    pub original_line: usize,
    pub original_column: usize,
    pub name: Option<usize>,
}

/// The result of [`EncodedPositionMap::original_position_for`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OriginalPosition {
    pub source: String,
    /// 1-based
    pub line: usize,
    /// 0-based
    pub column: usize,
    pub name: Option<String>,
}

/// Decode a V3 `mappings` string.
pub fn decode_mappings(mappings: &str) -> Result<Vec<DecodedMapping>> {
    let mut out = Vec::new();
    let mut source = 0i64;
    let mut original_line = 0i64;
    let mut original_column = 0i64;
    let mut name = 0i64;

    for (line, groups) in mappings.split(';').enumerate() {
        let mut column = 0i64;
        for (index, segment) in groups.split(',').enumerate() {
            if segment.is_empty() {
                continue;
            }
            let invalid = |message: String| MapError::Mappings {
                line,
                segment: index,
                message,
            };
            let values = vlq::decode_segment(segment).map_err(invalid)?;

            column = advance(column, values[0]).ok_or_else(|| invalid("column overflow".into()))?;
            let mut decoded = DecodedMapping {
                generated_line: line,
                generated_column: to_index(column).ok_or_else(|| invalid("negative column".into()))?,
                source: None,
                original_line: 0,
                original_column: 0,
                name: None,
            };
            match values.len() {
                1 => {}
                4 | 5 => {
                    source = advance(source, values[1])
                        .ok_or_else(|| invalid("source index overflow".into()))?;
                    original_line = advance(original_line, values[2])
                        .ok_or_else(|| invalid("original line overflow".into()))?;
                    original_column = advance(original_column, values[3])
                        .ok_or_else(|| invalid("original column overflow".into()))?;
                    decoded.source = to_index(source);
                    decoded.original_line = to_index(original_line)
                        .ok_or_else(|| invalid("negative original line".into()))?;
                    decoded.original_column = to_index(original_column)
                        .ok_or_else(|| invalid("negative original column".into()))?;
                    if let Some(delta) = values.get(4) {
                        name = advance(name, *delta)
                            .ok_or_else(|| invalid("name index overflow".into()))?;
                        decoded.name = to_index(name);
                    }
                }
                n => return Err(invalid(format!("segment has {} fields", n))),
            }
            out.push(decoded);
        }
    }
    Ok(out)
}

fn advance(value: i64, delta: i64) -> Option<i64> {
    value.checked_add(delta)
}

fn to_index(value: i64) -> Option<usize> {
    usize::try_from(value).ok()
}

impl EncodedPositionMap {
    pub fn decode(&self) -> Result<Vec<DecodedMapping>> {
        decode_mappings(&self.mappings)
    }

    /// Original position of a generated `(line, column)`, with a 1-based
    /// line and a 0-based column.
    ///
    /// Picks the mapping with the greatest generated column not after
    /// `column` on that line.
    pub fn original_position_for(&self, line: usize, column: usize) -> Result<Option<OriginalPosition>> {
        let Some(generated_line) = line.checked_sub(1) else {
            return Ok(None);
        };
        let best = self
            .decode()?
            .into_iter()
            .filter(|m| m.generated_line == generated_line && m.generated_column <= column)
            .filter(|m| m.source.is_some())
            .max_by_key(|m| m.generated_column);

        Ok(best.and_then(|m| {
            let source = self.sources.get(m.source?)?.clone();
            Some(OriginalPosition {
                source,
                line: m.original_line + 1,
                column: m.original_column,
                name: m.name.and_then(|idx| self.names.get(idx).cloned()),
            })
        }))
    }
}
