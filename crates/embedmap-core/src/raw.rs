/*
 * raw.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Typed model of the compiler-native line-segment map.
 */

//! Typed model of the compiler-native line-segment map.
//!
//! The snippet compiler reports its map as one list of segments per generated
//! line. Each segment is an array of integers:
//!
//! ```text
//! [generatedColumnDelta]                                        advance only
//! [generatedColumnDelta, sourceIndex, originalLine, originalColumn]
//! [generatedColumnDelta, sourceIndex, originalLine, originalColumn, nameIndex]
//! ```
//!
//! Column deltas are relative to the previous segment on the same line.
//! Original positions are 0-based and local to the snippet. Segments are
//! classified once, when the map is built, so that later stages never look at
//! raw arrays again.

use serde::{Deserialize, Serialize};

/// One classified segment of a generated line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawSegment {
    /// Moves the generated column forward without mapping anything.
    Advance { delta: usize },
    /// Maps the generated column (after applying `delta`) to a snippet position.
    Mapped {
        delta: usize,
        source_index: usize,
        original_line: usize,
        original_column: usize,
        name_index: Option<usize>,
    },
    /// Could not be interpreted. When the delta was readable it still advances
    /// the generated column.
    Malformed { delta: Option<usize>, reason: String },
}

impl RawSegment {
    /// Classify a raw integer array.
    ///
    /// `name_count` is the length of the map's `names` table (0 when absent).
    pub fn classify(fields: &[i64], name_count: usize) -> RawSegment {
        let Some(&first) = fields.first() else {
            return RawSegment::Malformed {
                delta: None,
                reason: "empty segment".to_string(),
            };
        };
        let Ok(delta) = usize::try_from(first) else {
            return RawSegment::Malformed {
                delta: None,
                reason: format!("negative column delta {}", first),
            };
        };

        match fields.len() {
            1 => RawSegment::Advance { delta },
            4 | 5 => {
                let rest: Option<Vec<usize>> =
                    fields[1..].iter().map(|&v| usize::try_from(v).ok()).collect();
                let Some(rest) = rest else {
                    return RawSegment::Malformed {
                        delta: Some(delta),
                        reason: format!("negative position field in {:?}", fields),
                    };
                };
                let name_index = rest.get(3).copied();
                if let Some(idx) = name_index {
                    if idx >= name_count {
                        return RawSegment::Malformed {
                            delta: Some(delta),
                            reason: format!(
                                "name index {} out of range ({} names)",
                                idx, name_count
                            ),
                        };
                    }
                }
                RawSegment::Mapped {
                    delta,
                    source_index: rest[0],
                    original_line: rest[1],
                    original_column: rest[2],
                    name_index,
                }
            }
            n => RawSegment::Malformed {
                delta: Some(delta),
                reason: format!("segment has {} fields", n),
            },
        }
    }

    /// The column delta, if it could be read.
    pub fn delta(&self) -> Option<usize> {
        match self {
            RawSegment::Advance { delta } | RawSegment::Mapped { delta, .. } => Some(*delta),
            RawSegment::Malformed { delta, .. } => *delta,
        }
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, RawSegment::Mapped { .. })
    }
}

/// Wire shape of the compiler-native map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeMapJson {
    pub lines: Vec<Vec<Vec<i64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col_offset: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_line: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_column: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_offset: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_table: Option<Vec<i64>>,
}

/// The compiler-native map with every segment classified.
///
/// Immutable once built.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "NativeMapJson")]
pub struct CompilerNativeMap {
    lines: Vec<Vec<RawSegment>>,
    names: Option<Vec<String>>,
    source: Option<String>,
    /// Bookkeeping fields some compiler versions emit; carried, never interpreted
    extra: NativeMapExtras,
}

/// Optional compiler bookkeeping carried through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativeMapExtras {
    pub line: Option<i64>,
    pub col_offset: Option<i64>,
    pub src_line: Option<i64>,
    pub src_column: Option<i64>,
    pub src_offset: Option<i64>,
    pub src_table: Option<Vec<i64>>,
}

impl From<NativeMapJson> for CompilerNativeMap {
    fn from(json: NativeMapJson) -> Self {
        let name_count = json.names.as_ref().map_or(0, Vec::len);
        let lines = json
            .lines
            .iter()
            .map(|segments| {
                segments
                    .iter()
                    .map(|fields| RawSegment::classify(fields, name_count))
                    .collect()
            })
            .collect();
        CompilerNativeMap {
            lines,
            names: json.names,
            source: json.source,
            extra: NativeMapExtras {
                line: json.line,
                col_offset: json.col_offset,
                src_line: json.src_line,
                src_column: json.src_column,
                src_offset: json.src_offset,
                src_table: json.src_table,
            },
        }
    }
}

impl CompilerNativeMap {
    /// Build a map from raw segment arrays.
    pub fn from_lines(lines: Vec<Vec<Vec<i64>>>, names: Option<Vec<String>>) -> Self {
        NativeMapJson {
            lines,
            names,
            ..Default::default()
        }
        .into()
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_value(value: serde_json::Value) -> crate::Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn lines(&self) -> &[Vec<RawSegment>] {
        &self.lines
    }

    /// Segments of one generated line; empty when the line has none.
    pub fn line(&self, generated_line: usize) -> &[RawSegment] {
        self.lines.get(generated_line).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first_segment(&self, generated_line: usize) -> Option<&RawSegment> {
        self.line(generated_line).first()
    }

    pub fn names(&self) -> Option<&[String]> {
        self.names.as_deref()
    }

    /// Resolve a name index. Indices were range-checked during classification.
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.as_ref()?.get(index).map(String::as_str)
    }

    /// The snippet text the compiler saw, if it reported it.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn extras(&self) -> &NativeMapExtras {
        &self.extra
    }

    /// The raw integer arrays, reconstructed for reporting.
    ///
    /// Malformed segments are reproduced as far as they were understood.
    pub fn raw_lines(&self) -> Vec<Vec<Vec<i64>>> {
        self.lines
            .iter()
            .map(|segments| {
                segments
                    .iter()
                    .map(|segment| match segment {
                        RawSegment::Advance { delta } => vec![*delta as i64],
                        RawSegment::Mapped {
                            delta,
                            source_index,
                            original_line,
                            original_column,
                            name_index,
                        } => {
                            let mut fields = vec![
                                *delta as i64,
                                *source_index as i64,
                                *original_line as i64,
                                *original_column as i64,
                            ];
                            if let Some(idx) = name_index {
                                fields.push(*idx as i64);
                            }
                            fields
                        }
                        RawSegment::Malformed { delta, .. } => {
                            delta.map(|d| vec![d as i64]).unwrap_or_default()
                        }
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_classify_advance_and_mapped() {
        assert_eq!(
            RawSegment::classify(&[3], 0),
            RawSegment::Advance { delta: 3 }
        );
        assert_eq!(
            RawSegment::classify(&[2, 0, 1, 4], 0),
            RawSegment::Mapped {
                delta: 2,
                source_index: 0,
                original_line: 1,
                original_column: 4,
                name_index: None,
            }
        );
        assert_eq!(
            RawSegment::classify(&[0, 0, 0, 0, 1], 2),
            RawSegment::Mapped {
                delta: 0,
                source_index: 0,
                original_line: 0,
                original_column: 0,
                name_index: Some(1),
            }
        );
    }

    #[test]
    fn test_classify_malformed() {
        assert!(matches!(
            RawSegment::classify(&[], 0),
            RawSegment::Malformed { delta: None, .. }
        ));
        assert!(matches!(
            RawSegment::classify(&[-1, 0, 0, 0], 0),
            RawSegment::Malformed { delta: None, .. }
        ));
        assert!(matches!(
            RawSegment::classify(&[2, 0], 0),
            RawSegment::Malformed { delta: Some(2), .. }
        ));
        assert!(matches!(
            RawSegment::classify(&[1, 0, -3, 0], 0),
            RawSegment::Malformed { delta: Some(1), .. }
        ));
        assert!(matches!(
            RawSegment::classify(&[1, 0, 0, 0, 0, 0], 1),
            RawSegment::Malformed { delta: Some(1), .. }
        ));
    }

    #[test]
    fn test_name_index_out_of_range() {
        let segment = RawSegment::classify(&[0, 0, 0, 0, 2], 2);
        let RawSegment::Malformed { delta, reason } = segment else {
            panic!("expected malformed segment");
        };
        assert_eq!(delta, Some(0));
        assert!(reason.contains("out of range"));

        // No names table at all
        assert!(matches!(
            RawSegment::classify(&[0, 0, 0, 0, 0], 0),
            RawSegment::Malformed { .. }
        ));
    }

    #[test]
    fn test_from_json_with_optional_fields() {
        let json = r#"{
            "lines": [[[0, 0, 0, 0], [4]], [], [[2, 0, 1, 2, 0]]],
            "names": ["item"],
            "source": "for item of items",
            "srcLine": 0,
            "srcTable": [17]
        }"#;
        let map = CompilerNativeMap::from_json(json).unwrap();
        assert_eq!(map.lines().len(), 3);
        assert!(map.line(1).is_empty());
        assert!(map.line(9).is_empty());
        assert_eq!(map.name(0), Some("item"));
        assert_eq!(map.source(), Some("for item of items"));
        assert_eq!(map.extras().src_table, Some(vec![17]));
        assert!(map.extras().col_offset.is_none());
        assert!(map.first_segment(2).unwrap().is_mapping());
    }

    #[test]
    fn test_missing_lines_is_an_error() {
        assert!(CompilerNativeMap::from_json(r#"{"names": []}"#).is_err());
    }

    #[test]
    fn test_raw_lines_reproduces_input() {
        let lines = vec![vec![vec![0, 0, 0, 0], vec![4], vec![1, 0, 0, 5, 0]]];
        let map = CompilerNativeMap::from_lines(lines.clone(), Some(vec!["x".to_string()]));
        assert_eq!(map.raw_lines(), lines);
    }
}
