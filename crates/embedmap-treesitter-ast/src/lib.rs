/*
 * lib.rs
 *
 * Copyright (c) 2025 Posit, PBC
 *
 * embedmap-treesitter-ast: Generic tree-sitter traversal for embedmap.
 *
 * The syntax service in embedmap-core converts concrete tree-sitter trees
 * into its own node model. This crate holds the grammar-agnostic walking
 * machinery it uses:
 *
 * - Top-down traversal with enter/exit phases and subtree pruning
 * - Bottom-up folding that hands each node its children's results together
 *   with the grammar field each child occupies
 */

pub mod traversals;

// Re-export commonly used items at crate root
pub use traversals::{
    bottomup_traverse_concrete_tree, topdown_traverse_concrete_tree, BottomUpTraversePhase,
    FoldedChild, TraversePhase,
};
