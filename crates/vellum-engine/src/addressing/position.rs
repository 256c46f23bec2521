//! # Position - Root + Offset Path
//!
//! A [`Position`] is a point between two units of address space inside some
//! element. It is stored as the [`Tree`] it belongs to plus a path of
//! offsets, one per level below the root:
//!
//! ```text
//! <root>
//!   <p>hello</p>          path [0, 3] = inside the p, between "hel" and "lo"
//!   <ul>                  path [1]    = in the root, before the ul
//!     <li>..</li>         path [1, 1] = in the ul, after the li
//!   </ul>
//! </root>
//! ```
//!
//! Every entry but the last names an element child by its start offset;
//! the last entry is the offset inside the innermost element (the
//! *parent*). Text is never a parent: a point inside a text run is just an
//! offset in the element holding that run.
//!
//! Positions resolve their ancestor chain once, at construction, and are
//! immutable afterwards. Comparison is lexicographic on paths, which puts
//! a position before any position nested inside the node that follows it.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{EngineError, Result};
use crate::model::{ElementNode, Node, NodeRef, Tree};

#[derive(Clone)]
pub struct Position {
    tree: Tree,
    path: Vec<usize>,
    /// Root first, parent last; one entry per path element.
    ancestors: Vec<NodeRef>,
}

impl Position {
    /// Resolve `path` against `tree`.
    ///
    /// Fails with [`EngineError::StalePath`] when an intermediate offset does
    /// not land on an element with addressable content, and with
    /// [`EngineError::OffsetOutOfBounds`] when the final offset exceeds the
    /// parent's maximum.
    pub fn from_path(tree: &Tree, path: Vec<usize>) -> Result<Position> {
        let Some((&offset, parents)) = path.split_last() else {
            return Err(EngineError::assertion("a position path needs an offset"));
        };

        let mut ancestors = Vec::with_capacity(path.len());
        let mut node = tree.root().clone();
        for (depth, &step) in parents.iter().enumerate() {
            let next = match &*node {
                Node::Element(element) if !element.is_leaf() => {
                    element.element_at(step).map(|(_, child)| child.clone())
                }
                _ => None,
            };
            let Some(next) = next else {
                return Err(EngineError::stale(&path[..=depth], "no element at offset"));
            };
            ancestors.push(node);
            node = next;
        }

        let parent = node
            .as_element()
            .ok_or_else(|| EngineError::assertion("position parent must be an element"))?;
        if parent.is_leaf() {
            return Err(EngineError::stale(&path, "element has no addressable content"));
        }
        let max = parent.max_offset();
        if offset > max {
            return Err(EngineError::OffsetOutOfBounds { offset, max });
        }

        ancestors.push(node);
        Ok(Position {
            tree: tree.clone(),
            path,
            ancestors,
        })
    }

    /// Resolve as much of `path` as still exists, clamping the final offset.
    pub fn from_path_clamped(tree: &Tree, path: &[usize]) -> Result<Position> {
        let mut resolved = Vec::with_capacity(path.len().max(1));
        let mut node = tree.root().clone();
        let mut offset = 0;

        for (depth, &step) in path.iter().enumerate() {
            offset = step;
            if depth + 1 == path.len() {
                break;
            }
            let child = node
                .as_element()
                .and_then(|element| element.element_at(step))
                .map(|(_, child)| child.clone())
                .filter(|child| !child.is_leaf());
            match child {
                Some(child) => {
                    resolved.push(step);
                    node = child;
                }
                None => break,
            }
        }

        resolved.push(offset.min(node.max_offset()));
        Position::from_path(tree, resolved)
    }

    /// Built from parts already known to be consistent.
    pub(crate) fn from_parts(tree: &Tree, path: Vec<usize>, ancestors: Vec<NodeRef>) -> Position {
        debug_assert_eq!(path.len(), ancestors.len());
        Position {
            tree: tree.clone(),
            path,
            ancestors,
        }
    }

    /// Position at `offset` inside `element`, which must belong to `tree`.
    pub fn from_in_element(tree: &Tree, element: &NodeRef, offset: usize) -> Result<Position> {
        let mut path = node_path(tree, element)?;
        let max = match &**element {
            Node::Element(e) if !e.is_leaf() => e.max_offset(),
            _ => return Err(EngineError::assertion("expected an element with content")),
        };
        if offset > max {
            return Err(EngineError::OffsetOutOfBounds { offset, max });
        }
        path.push(offset);
        Position::from_path(tree, path)
    }

    /// Position `char_offset` characters into `text`.
    pub fn from_in_text(tree: &Tree, text: &NodeRef, char_offset: usize) -> Result<Position> {
        let len = text
            .as_text()
            .map(|t| t.len())
            .ok_or_else(|| EngineError::assertion("expected a text node"))?;
        if char_offset > len {
            return Err(EngineError::OffsetOutOfBounds {
                offset: char_offset,
                max: len,
            });
        }
        let mut path = node_path(tree, text)?;
        if let Some(last) = path.last_mut() {
            *last += char_offset;
        }
        Position::from_path(tree, path)
    }

    pub fn from_before_node(tree: &Tree, node: &NodeRef) -> Result<Position> {
        let path = node_path(tree, node)?;
        if path.is_empty() {
            return Err(EngineError::assertion("the document root has no position before it"));
        }
        Position::from_path(tree, path)
    }

    pub fn from_after_node(tree: &Tree, node: &NodeRef) -> Result<Position> {
        let mut path = node_path(tree, node)?;
        match path.last_mut() {
            Some(last) => *last += node.offset_size(),
            None => {
                return Err(EngineError::assertion("the document root has no position after it"));
            }
        }
        Position::from_path(tree, path)
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn path(&self) -> &[usize] {
        &self.path
    }

    /// Number of elements between the root and the parent.
    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    pub fn parent_offset(&self) -> usize {
        self.path[self.path.len() - 1]
    }

    /// Path of the parent element.
    pub fn parent_path(&self) -> &[usize] {
        &self.path[..self.path.len() - 1]
    }

    pub fn parent(&self) -> &NodeRef {
        &self.ancestors[self.ancestors.len() - 1]
    }

    pub fn parent_element(&self) -> Result<&ElementNode> {
        self.parent()
            .as_element()
            .ok_or_else(|| EngineError::assertion("position parent must be an element"))
    }

    /// Root first, parent last.
    pub fn ancestors(&self) -> &[NodeRef] {
        &self.ancestors
    }

    /// Depth of the innermost ancestor matching `predicate`.
    pub fn find_ancestor<F>(&self, predicate: F) -> Option<usize>
    where
        F: Fn(&Node) -> bool,
    {
        self.ancestors.iter().rposition(|node| predicate(node))
    }

    pub fn compare(&self, other: &Position) -> Option<Ordering> {
        self.partial_cmp(other)
    }

    /// Same parent, offset moved by `delta` and clamped to `0..=max`.
    pub fn shifted_by(&self, delta: isize) -> Position {
        let max = self.parent().max_offset();
        let offset = self.parent_offset().saturating_add_signed(delta).min(max);
        self.with_offset_unchecked(offset)
    }

    pub fn with_offset(&self, offset: usize) -> Result<Position> {
        let max = self.parent().max_offset();
        if offset > max {
            return Err(EngineError::OffsetOutOfBounds { offset, max });
        }
        Ok(self.with_offset_unchecked(offset))
    }

    fn with_offset_unchecked(&self, offset: usize) -> Position {
        let mut path = self.path.clone();
        let last = path.len() - 1;
        path[last] = offset;
        Position {
            tree: self.tree.clone(),
            path,
            ancestors: self.ancestors.clone(),
        }
    }

    /// The node ending at or running through this position, ignoring
    /// zero-width text.
    pub fn node_before(&self) -> Option<NodeRef> {
        let offset = self.parent_offset();
        self.parent()
            .as_element()?
            .child_spans()
            .find(|span| span.start < offset && offset <= span.end)
            .map(|span| span.node.clone())
    }

    /// The node starting at or running through this position, ignoring
    /// zero-width text.
    pub fn node_after(&self) -> Option<NodeRef> {
        let offset = self.parent_offset();
        self.parent()
            .as_element()?
            .child_at(offset)
            .map(|span| span.node.clone())
    }

    /// A zero-width text run sitting exactly here.
    pub fn placeholder(&self) -> Option<NodeRef> {
        let offset = self.parent_offset();
        self.parent()
            .as_element()?
            .child_spans()
            .find(|span| span.is_empty() && span.start == offset && span.node.as_text().is_some())
            .map(|span| span.node.clone())
    }

    /// The text run this position falls strictly inside, with the character
    /// offset into it.
    pub fn text_at(&self) -> Option<(NodeRef, usize)> {
        let offset = self.parent_offset();
        self.parent()
            .as_element()?
            .child_spans()
            .find(|span| {
                span.start < offset && offset < span.end && span.node.as_text().is_some()
            })
            .map(|span| (span.node.clone(), offset - span.start))
    }

    /// Position in the grandparent just before the parent element.
    pub fn before_parent(&self) -> Result<Position> {
        if self.depth() == 0 {
            return Err(EngineError::assertion("the document root has no parent"));
        }
        let path = self.parent_path().to_vec();
        let ancestors = self.ancestors[..self.ancestors.len() - 1].to_vec();
        Ok(Position::from_parts(&self.tree, path, ancestors))
    }

    /// Position in the grandparent just after the parent element.
    pub fn after_parent(&self) -> Result<Position> {
        let before = self.before_parent()?;
        let offset = before.parent_offset() + 1;
        Ok(before.with_offset_unchecked(offset))
    }

    /// The same path resolved in another tree.
    pub fn rerooted(&self, tree: &Tree) -> Result<Position> {
        if self.tree.same(tree) {
            return Ok(self.clone());
        }
        Position::from_path(tree, self.path.clone())
    }

    pub fn rerooted_clamped(&self, tree: &Tree) -> Result<Position> {
        if self.tree.same(tree) {
            return Ok(self.clone());
        }
        Position::from_path_clamped(tree, &self.path)
    }
}

fn node_path(tree: &Tree, node: &NodeRef) -> Result<Vec<usize>> {
    tree.path_to(node)
        .ok_or_else(|| EngineError::stale(&[], "node is not part of this document"))
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.tree.same(&other.tree) && self.path == other.path
    }
}

impl PartialOrd for Position {
    /// Positions in different documents are unordered.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.tree
            .same(&other.tree)
            .then(|| self.path.cmp(&other.path))
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Position({:?})", self.path)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.path)
    }
}
