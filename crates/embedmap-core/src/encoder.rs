/*
 * encoder.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Assembly of the final V3 position map.
 */

//! Assembly of the final V3 position map.

use crate::coalescer::{FinalMapping, MappingOrigin};
use crate::host::HostDocument;
use crate::vlq;
use serde::{Deserialize, Serialize};

/// A Source Map V3 document anchored to the host document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedPositionMap {
    pub version: u8,
    pub file: String,
    pub sources: Vec<String>,
    #[serde(default)]
    pub sources_content: Vec<String>,
    #[serde(default)]
    pub names: Vec<String>,
    pub mappings: String,
}

impl EncodedPositionMap {
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether the map carries any mapping at all.
    pub fn is_empty(&self) -> bool {
        self.mappings.chars().all(|c| c == ';')
    }
}

/// Merges coalesced and override mappings into an [`EncodedPositionMap`].
pub struct MapEncoder<'a> {
    host: &'a HostDocument,
}

impl<'a> MapEncoder<'a> {
    pub fn new(host: &'a HostDocument) -> Self {
        Self { host }
    }

    pub fn encode(
        &self,
        coalesced: Vec<FinalMapping>,
        overrides: Vec<FinalMapping>,
    ) -> EncodedPositionMap {
        let mappings = merge(coalesced, overrides);

        let mut names: Vec<String> = Vec::new();
        for name in mappings.iter().filter_map(|m| m.name.as_ref()) {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }

        EncodedPositionMap {
            version: 3,
            file: self.host.path().to_string(),
            sources: vec![self.host.path().to_string()],
            sources_content: vec![self.host.text().to_string()],
            mappings: encode_mappings(&mappings, &names),
            names,
        }
    }
}

/// Sort by generated position and keep one mapping per coordinate: the
/// override if there is one, otherwise the last inserted.
pub fn merge(coalesced: Vec<FinalMapping>, overrides: Vec<FinalMapping>) -> Vec<FinalMapping> {
    let mut all: Vec<FinalMapping> = coalesced.into_iter().chain(overrides).collect();
    // Stable, so equal coordinates stay in insertion order
    all.sort_by_key(|m| (m.generated_line, m.generated_column));

    let mut merged: Vec<FinalMapping> = Vec::with_capacity(all.len());
    for mapping in all {
        match merged.last_mut() {
            Some(last)
                if last.generated_line == mapping.generated_line
                    && last.generated_column == mapping.generated_column =>
            {
                let keep_last =
                    last.origin == MappingOrigin::Override && mapping.origin != MappingOrigin::Override;
                if !keep_last {
                    *last = mapping;
                }
            }
            _ => merged.push(mapping),
        }
    }
    merged
}

fn encode_mappings(mappings: &[FinalMapping], names: &[String]) -> String {
    let mut out = String::new();
    let mut line = 0;
    let mut first_on_line = true;
    let mut prev_column = 0i64;
    let mut prev_original_line = 0i64;
    let mut prev_original_column = 0i64;
    let mut prev_name = 0i64;

    for mapping in mappings {
        while line < mapping.generated_line {
            out.push(';');
            line += 1;
            prev_column = 0;
            first_on_line = true;
        }
        if !first_on_line {
            out.push(',');
        }
        first_on_line = false;

        vlq::encode(mapping.generated_column as i64 - prev_column, &mut out);
        // Single source
        vlq::encode(0, &mut out);
        vlq::encode(mapping.original_line as i64 - prev_original_line, &mut out);
        vlq::encode(mapping.original_column as i64 - prev_original_column, &mut out);
        if let Some(idx) = mapping
            .name
            .as_ref()
            .and_then(|n| names.iter().position(|x| x == n))
        {
            vlq::encode(idx as i64 - prev_name, &mut out);
            prev_name = idx as i64;
        }

        prev_column = mapping.generated_column as i64;
        prev_original_line = mapping.original_line as i64;
        prev_original_column = mapping.original_column as i64;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn m(gl: usize, gc: usize, ol: usize, oc: usize, name: Option<&str>, origin: MappingOrigin) -> FinalMapping {
        FinalMapping {
            generated_line: gl,
            generated_column: gc,
            original_line: ol,
            original_column: oc,
            name: name.map(str::to_string),
            origin,
        }
    }

    fn host() -> HostDocument {
        HostDocument::new("App.svelte", "<script>\nfoo(a, b)\nx := 1\n</script>\n")
    }

    #[test]
    fn test_encode_basic() {
        let host = host();
        let map = MapEncoder::new(&host).encode(
            vec![
                m(1, 2, 2, 0, None, MappingOrigin::Coalesced),
                m(0, 0, 1, 0, None, MappingOrigin::Coalesced),
                m(0, 4, 1, 4, Some("a"), MappingOrigin::Coalesced),
            ],
            vec![],
        );
        insta::assert_snapshot!(map.mappings, @"AACA,IAAIA;EACJ");
        assert_eq!(map.names, vec!["a".to_string()]);
        assert_eq!(map.sources, vec!["App.svelte".to_string()]);
        assert_eq!(map.sources_content, vec![host.text().to_string()]);
        assert_eq!(map.version, 3);
    }

    #[test]
    fn test_empty_lines_are_separators() {
        let host = host();
        let map = MapEncoder::new(&host).encode(
            vec![m(2, 0, 1, 0, None, MappingOrigin::Coalesced)],
            vec![],
        );
        insta::assert_snapshot!(map.mappings, @";;AACA");
        assert!(!map.is_empty());
        assert!(MapEncoder::new(&host).encode(vec![], vec![]).is_empty());
    }

    #[test]
    fn test_override_wins_collision() {
        let merged = merge(
            vec![
                m(0, 4, 1, 0, None, MappingOrigin::Coalesced),
                m(0, 0, 1, 0, None, MappingOrigin::Coalesced),
            ],
            vec![m(0, 4, 1, 4, Some("a"), MappingOrigin::Override)],
        );
        assert_eq!(
            merged,
            vec![
                m(0, 0, 1, 0, None, MappingOrigin::Coalesced),
                m(0, 4, 1, 4, Some("a"), MappingOrigin::Override),
            ]
        );
    }

    #[test]
    fn test_last_inserted_wins_without_override() {
        let merged = merge(
            vec![
                m(0, 4, 1, 0, None, MappingOrigin::Coalesced),
                m(0, 4, 1, 2, None, MappingOrigin::Coalesced),
            ],
            vec![],
        );
        assert_eq!(merged, vec![m(0, 4, 1, 2, None, MappingOrigin::Coalesced)]);
    }

    #[test]
    fn test_names_in_first_appearance_order() {
        let host = host();
        let map = MapEncoder::new(&host).encode(
            vec![
                m(1, 0, 2, 0, Some("x"), MappingOrigin::Coalesced),
                m(0, 7, 1, 7, Some("b"), MappingOrigin::Coalesced),
                m(0, 4, 1, 4, Some("a"), MappingOrigin::Coalesced),
                m(0, 9, 1, 4, Some("a"), MappingOrigin::Coalesced),
            ],
            vec![],
        );
        assert_eq!(map.names, vec!["a", "b", "x"]);
    }

    #[test]
    fn test_json_shape() {
        let host = HostDocument::new("a.svelte", "x\n");
        let map = MapEncoder::new(&host).encode(
            vec![m(0, 0, 0, 0, Some("x"), MappingOrigin::Coalesced)],
            vec![],
        );
        insta::assert_snapshot!(
            map.to_json().unwrap(),
            @r#"{"version":3,"file":"a.svelte","sources":["a.svelte"],"sourcesContent":["x\n"],"names":["x"],"mappings":"AAAAA"}"#
        );
    }
}
