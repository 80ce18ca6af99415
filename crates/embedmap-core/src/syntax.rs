/*
 * syntax.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Syntax tree service for the intermediate language.
 */

//! Syntax tree service for the intermediate language.
//!
//! The analyzer only needs a handful of node kinds (identifiers, iteration
//! constructs, variable declarations, blocks) with their spans. This module
//! defines that small tree model, the [`SyntaxParser`] seam that produces it,
//! and [`TypeScriptParser`], which builds it from a tree-sitter parse of
//! TypeScript.

use crate::error::SyntaxError;
use embedmap_source_map::{FileInformation, Location, Range};
use embedmap_treesitter_ast::{
    bottomup_traverse_concrete_tree, topdown_traverse_concrete_tree, FoldedChild, TraversePhase,
};
use tree_sitter::{Node, Parser};

/// Which kind of collection loop a construct is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationKind {
    /// `for (x of xs)`
    ForOf,
    /// `for (k in obj)`
    ForIn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxKind {
    Identifier(String),
    /// A for-of / for-in loop. `declaration` is the declaring keyword
    /// (`const`, `let`, `var`) when the loop declares its binding.
    Iteration {
        kind: IterationKind,
        declaration: Option<String>,
    },
    /// A `const`/`let`/`var` statement
    VariableDeclaration,
    /// One `name = value` inside a declaration
    VariableDeclarator,
    Block,
    /// An anonymous token such as a keyword or punctuation
    Token(String),
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: SyntaxKind,
    /// Grammar field this node fills in its parent (`left`, `right`, `body`, `name`)
    pub field: Option<&'static str>,
    pub range: Range,
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    pub fn new(kind: SyntaxKind, range: Range) -> Self {
        Self {
            kind,
            field: None,
            range,
            children: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: &'static str) -> Self {
        self.field = Some(field);
        self
    }

    pub fn with_children(mut self, children: Vec<SyntaxNode>) -> Self {
        self.children = children;
        self
    }

    pub fn child_by_field(&self, field: &str) -> Option<&SyntaxNode> {
        self.children.iter().find(|c| c.field == Some(field))
    }

    pub fn identifier_name(&self) -> Option<&str> {
        match &self.kind {
            SyntaxKind::Identifier(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_block(&self) -> bool {
        self.kind == SyntaxKind::Block
    }

    pub fn is_variable_declaration(&self) -> bool {
        self.kind == SyntaxKind::VariableDeclaration
    }
}

/// Produces a syntax tree for intermediate code.
pub trait SyntaxParser: Send + Sync {
    fn parse(&self, code: &str) -> Result<SyntaxNode, SyntaxError>;
}

/// Tree-sitter backed parser for TypeScript output.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeScriptParser;

const IDENTIFIER_KINDS: &[&str] = &[
    "identifier",
    "property_identifier",
    "shorthand_property_identifier",
    "shorthand_property_identifier_pattern",
];

impl SyntaxParser for TypeScriptParser {
    fn parse(&self, code: &str) -> Result<SyntaxNode, SyntaxError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
            .map_err(|e| SyntaxError::Grammar(e.to_string()))?;
        let tree = parser
            .parse(code, None)
            .ok_or_else(|| SyntaxError::Parse("tree-sitter returned no tree".to_string()))?;

        let root = tree.root_node();
        if root.has_error() {
            // Tree-sitter recovers from errors; the rest of the tree is still usable.
            if let Some(position) = first_error_position(&tree) {
                tracing::debug!(
                    row = position.row,
                    column = position.column,
                    "Intermediate code has syntax errors; continuing with recovered tree"
                );
            }
        }

        let info = FileInformation::new(code);
        let folded = bottomup_traverse_concrete_tree(
            &mut tree.walk(),
            &mut |node, children, input| convert_node(node, children, input, &info, code),
            code.as_bytes(),
        );
        Ok(folded.value)
    }
}

fn first_error_position(tree: &tree_sitter::Tree) -> Option<tree_sitter::Point> {
    let mut found = None;
    topdown_traverse_concrete_tree(&mut tree.walk(), &mut |node, phase| {
        if phase == TraversePhase::Enter && found.is_none() && (node.is_error() || node.is_missing())
        {
            found = Some(node.start_position());
        }
        found.is_none()
    });
    found
}

fn location(info: &FileInformation, code: &str, offset: usize) -> Location {
    info.offset_to_location(offset, code).unwrap_or(Location {
        offset,
        row: 0,
        column: 0,
    })
}

fn convert_node(
    node: &Node,
    children: Vec<FoldedChild<SyntaxNode>>,
    input: &[u8],
    info: &FileInformation,
    code: &str,
) -> SyntaxNode {
    let range = Range::new(
        location(info, code, node.start_byte()),
        location(info, code, node.end_byte()),
    );
    let text = || node.utf8_text(input).unwrap_or_default().to_string();

    let mut children: Vec<SyntaxNode> = children
        .into_iter()
        .map(|child| {
            let mut value = child.value;
            value.field = child.field;
            value
        })
        .collect();

    let kind = if !node.is_named() {
        SyntaxKind::Token(text())
    } else if IDENTIFIER_KINDS.contains(&node.kind()) {
        SyntaxKind::Identifier(text())
    } else {
        match node.kind() {
            "for_in_statement" => {
                // Prefer the grammar field, fall back to the bare keyword token
                let token = |field: &str, keywords: &[&str]| {
                    let tokens = || {
                        children.iter().filter_map(|c| match &c.kind {
                            SyntaxKind::Token(t) => Some((t, c.field)),
                            _ => None,
                        })
                    };
                    tokens()
                        .find(|(_, f)| *f == Some(field))
                        .or_else(|| tokens().find(|(t, _)| keywords.contains(&t.as_str())))
                        .map(|(t, _)| t.clone())
                };
                let kind = match token("operator", &["in", "of"]).as_deref() {
                    Some("in") => IterationKind::ForIn,
                    _ => IterationKind::ForOf,
                };
                SyntaxKind::Iteration {
                    kind,
                    declaration: token("kind", &["const", "let", "var"]),
                }
            }
            "lexical_declaration" | "variable_declaration" => SyntaxKind::VariableDeclaration,
            "variable_declarator" => SyntaxKind::VariableDeclarator,
            "statement_block" => SyntaxKind::Block,
            other => SyntaxKind::Other(other.to_string()),
        }
    };

    children.retain(|c| !matches!(c.kind, SyntaxKind::Token(_)));
    SyntaxNode::new(kind, range).with_children(children)
}
