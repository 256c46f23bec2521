//! # Range - Ordered Pair of Positions
//!
//! A [`Range`] spans from `start` to `end` in one document, with
//! `start <= end` enforced on construction.
//!
//! Most structural edits only make sense inside a single parent element
//! (a *confined* range). [`Range::minimum_confined_ranges`] splits any range
//! into the shortest ordered list of confined ranges covering the same
//! content:
//!
//! ```text
//! <p>he[llo</p><p>mid</p><p>wor]ld</p>
//!
//!   [2, 5] in the first p
//!   [1, 2] in the root        (the whole middle p)
//!   [0, 3] in the last p
//! ```

use std::fmt;

use crate::addressing::position::Position;
use crate::error::{EngineError, Result};
use crate::model::{MarkSet, Node, NodeRef, Tree};

/// Whether a text run touching a range endpoint counts as containing it.
///
/// `Left` lets an endpoint stick to the run ending at it, `Right` to the
/// run starting at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stickiness {
    #[default]
    None,
    Left,
    Right,
    Both,
}

impl Stickiness {
    fn left(self) -> bool {
        matches!(self, Stickiness::Left | Stickiness::Both)
    }

    fn right(self) -> bool {
        matches!(self, Stickiness::Right | Stickiness::Both)
    }

    fn holds(self, offset: usize, start: usize, end: usize) -> bool {
        (start < offset && offset < end)
            || (offset == end && self.left())
            || (offset == start && self.right())
    }
}

/// How [`Range::context_nodes`] picks nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextStrategy {
    /// Nodes between the endpoints, plus text runs an endpoint falls inside.
    Contains,
    /// The common ancestor and its ancestors, plus a text run holding both
    /// endpoints.
    IsInside { start: Stickiness, end: Stickiness },
    /// Both of the above.
    Touches { start: Stickiness, end: Stickiness },
}

#[derive(Clone, PartialEq)]
pub struct Range {
    start: Position,
    end: Position,
}

impl Range {
    /// Range between two positions of the same document, in either order.
    pub fn new(a: Position, b: Position) -> Result<Range> {
        match a.partial_cmp(&b) {
            None => Err(EngineError::assertion(
                "range endpoints belong to different documents",
            )),
            Some(std::cmp::Ordering::Greater) => Ok(Range { start: b, end: a }),
            Some(_) => Ok(Range { start: a, end: b }),
        }
    }

    pub fn collapsed(at: Position) -> Range {
        Range {
            start: at.clone(),
            end: at,
        }
    }

    pub fn from_paths(tree: &Tree, start: Vec<usize>, end: Vec<usize>) -> Result<Range> {
        Range::new(
            Position::from_path(tree, start)?,
            Position::from_path(tree, end)?,
        )
    }

    pub fn from_around_node(tree: &Tree, node: &NodeRef) -> Result<Range> {
        Range::new(
            Position::from_before_node(tree, node)?,
            Position::from_after_node(tree, node)?,
        )
    }

    /// The whole content of an element.
    pub fn from_in_element(tree: &Tree, element: &NodeRef) -> Result<Range> {
        Range::new(
            Position::from_in_element(tree, element, 0)?,
            Position::from_in_element(tree, element, element.max_offset())?,
        )
    }

    /// The content of a node: inside for elements, around for the rest.
    pub fn from_in_node(tree: &Tree, node: &NodeRef) -> Result<Range> {
        match &**node {
            Node::Element(element) if !element.is_leaf() => Range::from_in_element(tree, node),
            _ => Range::from_around_node(tree, node),
        }
    }

    pub fn start(&self) -> &Position {
        &self.start
    }

    pub fn end(&self) -> &Position {
        &self.end
    }

    pub fn tree(&self) -> &Tree {
        self.start.tree()
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    pub fn is_confined(&self) -> bool {
        self.start.parent_path() == self.end.parent_path()
    }

    fn common_depth(&self) -> usize {
        self.start
            .parent_path()
            .iter()
            .zip(self.end.parent_path())
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// Deepest element containing both endpoints.
    pub fn common_ancestor(&self) -> NodeRef {
        self.start.ancestors()[self.common_depth()].clone()
    }

    /// Decompose into ordered, non-empty ranges each confined to one parent.
    ///
    /// A confined range comes back as itself; a range covering no content
    /// at all may come back empty.
    pub fn minimum_confined_ranges(&self) -> Vec<Range> {
        if self.is_confined() {
            return vec![self.clone()];
        }

        let common = self.common_depth();
        let start_path = self.start.path();
        let end_path = self.end.path();

        let mut pieces = Vec::new();
        let mut offset = self.start.parent_offset();
        for depth in (common + 1..=self.start.depth()).rev() {
            let max = self.start.ancestors()[depth].max_offset();
            pieces.push(piece(&self.start, depth, offset, max));
            offset = start_path[depth - 1] + 1;
        }
        let middle_start = offset;

        let mut tail = Vec::new();
        let mut offset = self.end.parent_offset();
        for depth in (common + 1..=self.end.depth()).rev() {
            tail.push(piece(&self.end, depth, 0, offset));
            offset = end_path[depth - 1];
        }
        let middle_end = offset;

        pieces.push(piece(&self.start, common, middle_start, middle_end));
        pieces.extend(tail.into_iter().rev());
        pieces.retain(|range| !range.is_collapsed());
        pieces
    }

    /// Nodes related to this range, in document order.
    pub fn context_nodes<F>(&self, strategy: ContextStrategy, filter: F) -> Vec<NodeRef>
    where
        F: Fn(&Node) -> bool,
    {
        match strategy {
            ContextStrategy::Contains => self.contained_nodes(&filter),
            ContextStrategy::IsInside { start, end } => self.enclosing_nodes(start, end, &filter),
            ContextStrategy::Touches { start, end } => {
                let mut nodes = self.enclosing_nodes(start, end, &filter);
                for node in self.contained_nodes(&filter) {
                    if !nodes.iter().any(|seen| std::sync::Arc::ptr_eq(seen, &node)) {
                        nodes.push(node);
                    }
                }
                nodes
            }
        }
    }

    fn contained_nodes(&self, filter: &dyn Fn(&Node) -> bool) -> Vec<NodeRef> {
        let mut out = Vec::new();
        for piece in self.minimum_confined_ranges() {
            let Some(parent) = piece.start.parent().as_element() else {
                continue;
            };
            let (a, b) = (piece.start.parent_offset(), piece.end.parent_offset());
            for span in parent.child_spans() {
                let whole = if span.is_empty() {
                    a < b && a <= span.start && span.start <= b
                } else {
                    span.start >= a && span.end <= b
                };
                if whole {
                    push_subtree(span.node, filter, &mut out);
                } else if span.node.as_text().is_some()
                    && span.start < b
                    && span.end > a
                    && filter(span.node)
                {
                    out.push(span.node.clone());
                }
            }
        }
        out
    }

    fn enclosing_nodes(
        &self,
        start: Stickiness,
        end: Stickiness,
        filter: &dyn Fn(&Node) -> bool,
    ) -> Vec<NodeRef> {
        let common = self.common_depth();
        let mut out: Vec<NodeRef> = self.start.ancestors()[..=common]
            .iter()
            .filter(|node| filter(node))
            .cloned()
            .collect();

        if self.is_confined()
            && let Some(parent) = self.start.parent().as_element()
        {
            let (a, b) = (self.start.parent_offset(), self.end.parent_offset());
            let shared = parent.child_spans().find(|span| {
                span.node.as_text().is_some()
                    && start.holds(a, span.start, span.end)
                    && end.holds(b, span.start, span.end)
            });
            if let Some(span) = shared
                && filter(span.node)
            {
                out.push(span.node.clone());
            }
        }
        out
    }

    /// Marks shared by every text run the range touches.
    ///
    /// A collapsed range reports the marks typing would inherit: a
    /// placeholder's here, else the run to the left, else to the right.
    pub fn get_marks(&self) -> MarkSet {
        if self.is_collapsed() {
            let marks_of = |node: Option<NodeRef>| {
                node.and_then(|node| node.as_text().map(|text| text.marks().clone()))
            };
            return marks_of(self.start.placeholder())
                .or_else(|| marks_of(self.start.node_before()))
                .or_else(|| marks_of(self.start.node_after()))
                .unwrap_or_default();
        }

        let texts = self.context_nodes(
            ContextStrategy::Touches {
                start: Stickiness::Both,
                end: Stickiness::Left,
            },
            |node| node.as_text().is_some_and(|text| !text.is_empty()),
        );
        let mut marks = texts.iter().filter_map(|node| node.as_text()).map(|t| t.marks());
        let Some(first) = marks.next() else {
            return MarkSet::new();
        };
        marks.fold(first.clone(), |acc, next| acc.intersection(next))
    }

    /// Plain text covered by the range.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for piece in self.minimum_confined_ranges() {
            let Some(parent) = piece.start.parent().as_element() else {
                continue;
            };
            let (a, b) = (piece.start.parent_offset(), piece.end.parent_offset());
            for span in parent.child_spans() {
                if span.end <= a || span.start >= b {
                    continue;
                }
                match &**span.node {
                    Node::Text(text) => {
                        let from = a.saturating_sub(span.start);
                        let to = (b - span.start).min(text.len());
                        out.push_str(text.slice(from, to).text());
                    }
                    node => out.push_str(&node.text_content()),
                }
            }
        }
        out
    }

    /// The same paths resolved in another tree.
    pub fn rerooted(&self, tree: &Tree) -> Result<Range> {
        Range::new(self.start.rerooted(tree)?, self.end.rerooted(tree)?)
    }

    pub fn rerooted_clamped(&self, tree: &Tree) -> Result<Range> {
        Range::new(
            self.start.rerooted_clamped(tree)?,
            self.end.rerooted_clamped(tree)?,
        )
    }
}

/// Confined range `a..b` in the ancestor of `from` at `depth`.
fn piece(from: &Position, depth: usize, a: usize, b: usize) -> Range {
    let ancestors = from.ancestors()[..=depth].to_vec();
    let mut start = from.path()[..depth].to_vec();
    let mut end = start.clone();
    start.push(a);
    end.push(b);
    Range {
        start: Position::from_parts(from.tree(), start, ancestors.clone()),
        end: Position::from_parts(from.tree(), end, ancestors),
    }
}

fn push_subtree(node: &NodeRef, filter: &dyn Fn(&Node) -> bool, out: &mut Vec<NodeRef>) {
    if filter(node) {
        out.push(node.clone());
    }
    if let Node::Element(element) = &**node
        && !element.is_leaf()
    {
        for child in element.children() {
            push_subtree(child, filter, out);
        }
    }
}

impl fmt::Debug for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Range({}..{})", self.start, self.end)
    }
}
