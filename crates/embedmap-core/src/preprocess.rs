/*
 * preprocess.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Host document preprocessing.
 */

//! Host document preprocessing.
//!
//! Finds the snippet blocks of a host document (`<script lang="civet">`),
//! compiles each one, splices the intermediate code back in, and keeps the
//! bookkeeping a language service needs to map positions in the rewritten
//! document back to the original.

use crate::compile::SnippetCompiler;
use crate::diagnostics::Diagnostics;
use crate::encoder::EncodedPositionMap;
use crate::host::{HostDocument, SnippetPlacement};
use crate::options::CompiledOptions;
use crate::pipeline::Normalizer;
use embedmap_source_map::FileInformation;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use std::ops::Range;

static SCRIPT_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<script\b([^>]*)>(.*?)</script\s*>").expect("valid script block regex")
});

static LANG_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(\blang\s*=\s*)(["'])([^"']*)(["'])"#).expect("valid lang attribute regex")
});

static MODULE_CONTEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bcontext\s*=\s*["']module["']"#).expect("valid context attribute regex")
});

/// Which script block a snippet came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptKind {
    /// `<script context="module">`
    Module,
    Instance,
}

/// One embedded snippet, dedented and ready to compile.
#[derive(Debug, Clone, PartialEq)]
pub struct Snippet {
    pub kind: ScriptKind,
    /// Attribute text of the opening tag, as written
    pub attributes: String,
    /// Byte span of the whole block, tags included
    pub block: Range<usize>,
    /// Byte span of the text between the tags
    pub content: Range<usize>,
    /// Dedented snippet text
    pub code: String,
    pub placement: SnippetPlacement,
}

impl Snippet {
    pub fn line_count(&self) -> usize {
        self.code.lines().count()
    }
}

/// Find every snippet block whose `lang` matches the configured script
/// language, in document order.
pub fn extract_snippets(text: &str, options: &CompiledOptions) -> Vec<Snippet> {
    let info = FileInformation::new(text);
    SCRIPT_BLOCK
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let attrs = caps.get(1)?;
            let body = caps.get(2)?;
            if lang_of(attrs.as_str()) != Some(options.script_lang.as_str()) {
                return None;
            }
            let kind = if MODULE_CONTEXT.is_match(attrs.as_str()) {
                ScriptKind::Module
            } else {
                ScriptKind::Instance
            };
            let (code, placement) = dedent(text, &info, body.start(), body.as_str());
            Some(Snippet {
                kind,
                attributes: attrs.as_str().to_string(),
                block: whole.range(),
                content: body.range(),
                code,
                placement,
            })
        })
        .collect()
}

fn lang_of(attributes: &str) -> Option<&str> {
    LANG_ATTR
        .captures(attributes)
        .and_then(|caps| caps.get(3))
        .map(|m| m.as_str())
}

/// Strip one leading newline and the common indentation of non-blank lines.
fn dedent(
    text: &str,
    info: &FileInformation,
    content_start: usize,
    content: &str,
) -> (String, SnippetPlacement) {
    let (content, skipped) = if let Some(rest) = content.strip_prefix("\r\n") {
        (rest, 2)
    } else if let Some(rest) = content.strip_prefix('\n') {
        (rest, 1)
    } else {
        (content, 0)
    };

    let start = info
        .offset_to_location(content_start + skipped, text)
        .map(|loc| (loc.row, loc.column))
        .unwrap_or((0, 0));
    let first_line_column = if skipped == 0 { start.1 } else { 0 };

    let indent = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.chars().take_while(|c| *c == ' ' || *c == '\t').count())
        .min()
        .unwrap_or(0);

    let mut code = String::with_capacity(content.len());
    for piece in content.split_inclusive('\n') {
        let strip = piece
            .chars()
            .take(indent)
            .take_while(|c| *c == ' ' || *c == '\t')
            .map(char::len_utf8)
            .sum::<usize>();
        code.push_str(&piece[strip..]);
    }

    let placement = SnippetPlacement {
        start_line: start.0,
        removed_indent: indent,
        first_line_column,
    };
    (code, placement)
}

/// Bookkeeping for one rewritten block.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    /// Normalized map from the original document to the block's code; None
    /// when the block was passed through
    pub map: Option<EncodedPositionMap>,
    /// Byte offset of the block's code in the processed document
    pub ts_start: usize,
    /// Byte offset just past the block's code in the processed document
    pub ts_end: usize,
    /// 1-based host line where the snippet starts
    pub original_content_start_line: usize,
    pub original_line_count: usize,
    pub compiled_line_count: usize,
    /// The compiler-native lines, before normalization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_map_lines: Option<Vec<Vec<Vec<i64>>>>,
}

/// A host document with its snippets replaced by intermediate code.
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessResult {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<BlockInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<BlockInfo>,
    #[serde(skip)]
    pub diagnostics: Diagnostics,
}

/// Compile every snippet of a host document and splice the results in.
///
/// Blocks that fail to compile are kept verbatim. Only the first block of
/// each kind gets a [`BlockInfo`].
pub fn preprocess_document(
    path: &str,
    text: &str,
    compiler: &dyn SnippetCompiler,
    normalizer: &Normalizer<'_>,
) -> PreprocessResult {
    let host = HostDocument::new(path, text);
    let snippets = extract_snippets(text, normalizer.options());
    let mut diagnostics = Diagnostics::new();
    let mut code = String::with_capacity(text.len());
    let mut module = None;
    let mut instance = None;
    let mut cursor = 0;

    for snippet in &snippets {
        code.push_str(&text[cursor..snippet.block.start]);
        cursor = snippet.block.end;

        let out = normalizer.compile_and_normalize(
            compiler,
            &snippet.code,
            &host,
            snippet.placement,
            &mut diagnostics,
        );

        let (ts_start, ts_end) = if out.compiled {
            let attributes = LANG_ATTR.replace(&snippet.attributes, |caps: &Captures| {
                format!(
                    "{}{}{}{}",
                    &caps[1],
                    &caps[2],
                    normalizer.options().output_lang,
                    &caps[4]
                )
            });
            code.push_str("<script");
            code.push_str(&attributes);
            code.push_str(">\n");
            let ts_start = code.len();
            code.push_str(&out.code);
            let ts_end = code.len();
            if !out.code.ends_with('\n') {
                code.push('\n');
            }
            code.push_str("</script>");
            (ts_start, ts_end)
        } else {
            let ts_start = code.len() + (snippet.content.start - snippet.block.start);
            code.push_str(&text[snippet.block.clone()]);
            (ts_start, ts_start + snippet.content.len())
        };

        let info = BlockInfo {
            ts_start,
            ts_end,
            original_content_start_line: snippet.placement.start_line + 1,
            original_line_count: snippet.line_count(),
            compiled_line_count: out.code.lines().count(),
            raw_map_lines: out.native.as_ref().map(|m| m.raw_lines()),
            map: out.map,
        };
        let slot = match snippet.kind {
            ScriptKind::Module => &mut module,
            ScriptKind::Instance => &mut instance,
        };
        if slot.is_none() {
            *slot = Some(info);
        } else {
            tracing::warn!(file = path, kind = ?snippet.kind, "Ignoring extra script block");
        }
    }
    code.push_str(&text[cursor..]);

    tracing::info!(
        file = path,
        blocks = snippets.len(),
        diagnostics = diagnostics.len(),
        "Preprocessed document"
    );
    PreprocessResult {
        code,
        module,
        instance,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::CompileOutput;
    use crate::error::CompileError;
    use crate::raw::CompilerNativeMap;
    use crate::syntax::TypeScriptParser;
    use pretty_assertions::assert_eq;

    const DOC: &str = "<script context=\"module\" lang=\"civet\">\n  export x := 1\n</script>\n\n<script lang=\"civet\">\n    y := 2\n      z := 3\n</script>\n<script>plain</script>\n";

    #[test]
    fn test_extract_snippets() {
        let snippets = extract_snippets(DOC, &CompiledOptions::default());
        assert_eq!(snippets.len(), 2);

        let module = &snippets[0];
        assert_eq!(module.kind, ScriptKind::Module);
        assert_eq!(module.code, "export x := 1\n");
        assert_eq!(module.placement, SnippetPlacement::new(1, 2));

        let instance = &snippets[1];
        assert_eq!(instance.kind, ScriptKind::Instance);
        assert_eq!(instance.code, "y := 2\n  z := 3\n");
        assert_eq!(instance.placement, SnippetPlacement::new(5, 4));
        assert_eq!(instance.line_count(), 2);
        assert_eq!(&DOC[instance.block.clone()][..7], "<script");
    }

    #[test]
    fn test_snippet_on_tag_line() {
        let doc = "<p>hi</p><script lang='civet'>x := 1</script>";
        let snippets = extract_snippets(doc, &CompiledOptions::default());
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].code, "x := 1");
        assert_eq!(
            snippets[0].placement,
            SnippetPlacement {
                start_line: 0,
                removed_indent: 0,
                first_line_column: 30,
            }
        );
    }

    #[test]
    fn test_other_lang_ignored() {
        let doc = "<script lang=\"ts\">const a = 1</script>";
        assert!(extract_snippets(doc, &CompiledOptions::default()).is_empty());
    }

    struct UppercaseCompiler;

    impl SnippetCompiler for UppercaseCompiler {
        fn compile(&self, snippet: &str, file_name: &str) -> Result<CompileOutput, CompileError> {
            if snippet.contains("fail") {
                return Err(CompileError::Failed {
                    file: file_name.to_string(),
                    message: "rejected".to_string(),
                });
            }
            let lines = (0..snippet.lines().count())
                .map(|i| vec![vec![0, 0, i as i64, 0]])
                .collect();
            Ok(CompileOutput::CodeWithMap {
                code: snippet.to_uppercase(),
                map: CompilerNativeMap::from_lines(lines, None),
            })
        }
    }

    #[test]
    fn test_preprocess_document() {
        let options = CompiledOptions::default();
        let normalizer = Normalizer::new(&options, &TypeScriptParser);
        let result = preprocess_document("App.svelte", DOC, &UppercaseCompiler, &normalizer);

        assert!(result.code.starts_with(
            "<script context=\"module\" lang=\"ts\">\nEXPORT X := 1\n</script>\n\n<script lang=\"ts\">\nY := 2\n  Z := 3\n</script>"
        ));
        assert!(result.code.ends_with("<script>plain</script>\n"));

        let module = result.module.unwrap();
        assert_eq!(&result.code[module.ts_start..module.ts_end], "EXPORT X := 1\n");
        assert_eq!(module.original_content_start_line, 2);
        assert_eq!(module.compiled_line_count, 1);
        // Line 0 of the block maps to column 2 of host line 1
        insta::assert_snapshot!(module.map.unwrap().mappings, @"AACE");

        let instance = result.instance.unwrap();
        assert_eq!(instance.original_content_start_line, 6);
        assert_eq!(instance.original_line_count, 2);
        assert_eq!(instance.raw_map_lines.unwrap().len(), 2);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_failed_block_kept_verbatim() {
        let doc = "<script lang=\"civet\">\nfail := 1\n</script>\n";
        let options = CompiledOptions::default();
        let normalizer = Normalizer::new(&options, &TypeScriptParser);
        let result = preprocess_document("App.svelte", doc, &UppercaseCompiler, &normalizer);
        assert_eq!(result.code, doc);
        let instance = result.instance.unwrap();
        assert!(instance.map.is_none());
        assert_eq!(&result.code[instance.ts_start..instance.ts_end], "\nfail := 1\n");
        assert_eq!(result.diagnostics.len(), 1);
    }
}
