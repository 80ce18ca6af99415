/*
 * traversals.rs
 *
 * Copyright (c) 2025 Posit, PBC
 *
 * Generic traversal helpers for tree-sitter TreeCursor.
 */

use tree_sitter::{Node, TreeCursor};

/// Phase of tree traversal - whether we're entering or exiting a node.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum TraversePhase {
    Enter,
    Exit,
}

/// Top-down traversal of a tree-sitter tree.
///
/// Visits each node twice: once on entry (before children) and once on exit (after children).
/// The visitor returns `true` to descend into children, `false` to skip them.
///
/// # Example
/// ```ignore
/// topdown_traverse_concrete_tree(&mut cursor, &mut |node, phase| {
///     if phase == TraversePhase::Enter && node.is_error() {
///         first_error.get_or_insert(node.start_position());
///     }
///     first_error.is_none()
/// });
/// ```
pub fn topdown_traverse_concrete_tree<F>(cursor: &mut TreeCursor, visitor: &mut F)
where
    F: for<'a> FnMut(&'a Node, TraversePhase) -> bool,
{
    let mut stack: Vec<usize> = vec![0];
    while let Some(step) = stack.pop() {
        match step {
            0 => {
                stack.push(2); // exit
                if visitor(&cursor.node(), TraversePhase::Enter) && cursor.goto_first_child() {
                    stack.push(1); // go to parent
                    stack.push(3); // check for next sibling
                    stack.push(0); // recurse
                }
            }
            1 => {
                cursor.goto_parent();
            }
            2 => {
                visitor(&cursor.node(), TraversePhase::Exit);
            }
            3 => {
                if cursor.goto_next_sibling() {
                    stack.push(3); // continue sibling traversal
                    stack.push(0); // recurse
                }
            }
            _ => unreachable!(),
        }
    }
}

/// The folded result of one child node, tagged with its grammar kind and
/// the field it occupies in its parent (`left`, `right`, `body`, ...).
#[derive(Debug)]
pub struct FoldedChild<T> {
    pub kind: String,
    pub field: Option<&'static str>,
    pub value: T,
}

/// Phase tracking for bottom-up traversal, holding accumulated children.
#[derive(Debug)]
pub enum BottomUpTraversePhase<'a, T: std::fmt::Debug> {
    Enter(Node<'a>, Option<&'static str>),
    GoToSiblings(Node<'a>, Option<&'static str>, Vec<FoldedChild<T>>),
    Exit(Node<'a>, Option<&'static str>),
}

/// Bottom-up fold of a tree-sitter tree.
///
/// Processes children before parents. Each node's visitor call receives the
/// results of its children in source order, each tagged with the child's kind
/// and field name, so callers can pick out roles such as a loop's `left` or
/// `body` without re-querying the tree.
///
/// # Returns
/// The folded root, with `field` set to `None`.
///
/// # Example
/// ```ignore
/// let root = bottomup_traverse_concrete_tree(
///     &mut tree.walk(),
///     &mut |node, children, input| MyNode::from_children(node, children, input),
///     source.as_bytes(),
/// );
/// ```
pub fn bottomup_traverse_concrete_tree<F, T: std::fmt::Debug>(
    cursor: &mut TreeCursor,
    visitor: &mut F,
    input_bytes: &[u8],
) -> FoldedChild<T>
where
    F: for<'a> FnMut(&'a Node, Vec<FoldedChild<T>>, &[u8]) -> T,
{
    let mut stack: Vec<BottomUpTraversePhase<T>> =
        vec![BottomUpTraversePhase::Enter(cursor.node(), None)];

    loop {
        let Some(top) = stack.pop() else {
            panic!("Bottom-up traversal stack emptied before reaching the root");
        };
        match top {
            BottomUpTraversePhase::Enter(node, field) => {
                stack.push(BottomUpTraversePhase::GoToSiblings(node, field, Vec::new()));
                if cursor.goto_first_child() {
                    stack.push(BottomUpTraversePhase::Enter(
                        cursor.node(),
                        cursor.field_name(),
                    ));
                } else {
                    stack.push(BottomUpTraversePhase::Exit(node, field));
                }
            }
            BottomUpTraversePhase::GoToSiblings(node, field, children) => {
                stack.push(BottomUpTraversePhase::GoToSiblings(node, field, children));
                if cursor.goto_next_sibling() {
                    stack.push(BottomUpTraversePhase::Enter(
                        cursor.node(),
                        cursor.field_name(),
                    ));
                } else {
                    stack.push(BottomUpTraversePhase::Exit(node, field));
                    cursor.goto_parent();
                }
            }
            BottomUpTraversePhase::Exit(node, field) => {
                let Some(BottomUpTraversePhase::GoToSiblings(_, _, children)) = stack.pop() else {
                    panic!("Expected GoToSiblings phase on stack");
                };
                let folded = FoldedChild {
                    kind: node.kind().to_string(),
                    field,
                    value: visitor(&node, children, input_bytes),
                };
                match stack.last_mut() {
                    None => return folded, // we are done
                    Some(BottomUpTraversePhase::GoToSiblings(_, _, next_children)) => {
                        next_children.push(folded);
                    }
                    _ => {
                        panic!("Expected GoToSiblings phase on stack");
                    }
                }
            }
        }
    }
}
