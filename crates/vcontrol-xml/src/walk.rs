//! Forward traversal over a tree that has no parent links.
//!
//! Backtracking works by remembering the element a traversal descended from
//! (the anchor) and continuing with the anchor's next sibling once the
//! children are exhausted.

use crate::tree::Node;

/// Next node after `node`, backing out through `anchor` when the level is exhausted.
///
/// Returns `node`'s next sibling unless that sibling is a whitespace-only text
/// node with nothing after it; otherwise returns `anchor`'s next sibling.
pub fn advance<'a>(node: Node<'a>, anchor: Option<Node<'a>>) -> Option<Node<'a>> {
    if let Some(next) = node.next_sibling() {
        if !next.is_blank() || next.next_sibling().is_some() {
            return Some(next);
        }
    }
    anchor.and_then(|anchor| anchor.next_sibling())
}

/// Two-level traversal state used by the section compilers.
///
/// Only one anchor is remembered: descending again replaces it, and stepping
/// past the last child returns to the anchor's level and forgets it.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    current: Option<Node<'a>>,
    anchor: Option<Node<'a>>,
}

impl<'a> Cursor<'a> {
    pub fn new(first: Option<Node<'a>>) -> Self {
        Self {
            current: first,
            anchor: None,
        }
    }

    /// Cursor positioned on the first child of `node`.
    pub fn children_of(node: Node<'a>) -> Self {
        Self::new(node.first_child())
    }

    pub fn current(&self) -> Option<Node<'a>> {
        self.current
    }

    /// Element the cursor descended from, while it is still below it.
    pub fn anchor(&self) -> Option<Node<'a>> {
        self.anchor
    }

    /// Move into the children of `node`, remembering it as the anchor.
    ///
    /// A childless node is stepped over at its own level.
    pub fn descend(&mut self, node: Node<'a>) {
        match node.first_child() {
            Some(child) => {
                self.anchor = Some(node);
                self.current = Some(child);
            }
            None => {
                self.current = Some(node);
                self.step();
            }
        }
    }

    /// Move to the next node at this level, or back out to the anchor's sibling.
    pub fn step(&mut self) {
        let Some(node) = self.current else {
            return;
        };
        self.current = match advance(node, None) {
            Some(next) => Some(next),
            None => advance(node, self.anchor.take()),
        };
    }
}

/// Depth-first pre-order walk over `(depth, node)` pairs backed by an explicit stack.
///
/// Whitespace-only text nodes are skipped. The start node is reported at
/// depth 0; its own siblings are not visited.
#[derive(Debug, Clone)]
pub struct Descendants<'a> {
    stack: Vec<(usize, Node<'a>, bool)>,
}

impl<'a> Descendants<'a> {
    pub fn new(start: Node<'a>) -> Self {
        Self {
            stack: vec![(0, start, false)],
        }
    }
}

impl<'a> Iterator for Descendants<'a> {
    type Item = (usize, Node<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((depth, node, siblings)) = self.stack.pop() {
            if siblings {
                if let Some(next) = node.next_sibling() {
                    self.stack.push((depth, next, true));
                }
            }
            if node.is_blank() {
                continue;
            }
            if let Some(child) = node.first_child() {
                self.stack.push((depth + 1, child, true));
            }
            return Some((depth, node));
        }
        None
    }
}
