//! Child-list surgery on a single element, in offset terms.
//!
//! These functions only compute new child vectors; rebuilding the spine
//! up to the root is [`Tree::update_element`](crate::model::Tree)'s job.

use std::sync::Arc;

use crate::model::{ElementNode, Mark, MarkAction, Node, NodeRef, TextNode, normalize};

/// Children with offsets `start..end` replaced by `insert`.
///
/// Placeholders inside `start..=end` are dropped.
pub(crate) fn splice(
    element: &ElementNode,
    start: usize,
    end: usize,
    insert: Vec<NodeRef>,
) -> Vec<NodeRef> {
    let mut before = Vec::new();
    let mut after = Vec::new();

    for span in element.child_spans() {
        if span.is_empty() {
            if span.start < start {
                before.push(span.node.clone());
            } else if span.start > end {
                after.push(span.node.clone());
            }
            continue;
        }
        if span.end <= start {
            before.push(span.node.clone());
            continue;
        }
        if span.start >= end {
            after.push(span.node.clone());
            continue;
        }
        if let Node::Text(text) = &**span.node {
            if span.start < start {
                before.push(text_node(text.slice(0, start - span.start)));
            }
            if span.end > end {
                after.push(text_node(text.slice(end - span.start, text.len())));
            }
        }
    }

    before.extend(insert);
    before.extend(after);
    normalize(before)
}

/// Copies of the content between `start` and `end`, slicing partial text.
pub(crate) fn extract(element: &ElementNode, start: usize, end: usize) -> Vec<NodeRef> {
    let mut out = Vec::new();
    for span in element.child_spans() {
        if span.is_empty() {
            if start < span.start && span.start < end {
                out.push(span.node.clone());
            }
            continue;
        }
        if span.end <= start || span.start >= end {
            continue;
        }
        match &**span.node {
            Node::Text(text) if span.start < start || span.end > end => {
                let from = start.saturating_sub(span.start);
                let to = (end - span.start).min(text.len());
                out.push(text_node(text.slice(from, to)));
            }
            _ => out.push(span.node.clone()),
        }
    }
    out
}

/// Children divided at `offset`. A text run spanning it is cut in two;
/// placeholders at `offset` go right.
pub(crate) fn split_children(element: &ElementNode, offset: usize) -> (Vec<NodeRef>, Vec<NodeRef>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    for span in element.child_spans() {
        if span.is_empty() {
            if span.start < offset {
                left.push(span.node.clone());
            } else {
                right.push(span.node.clone());
            }
        } else if span.end <= offset {
            left.push(span.node.clone());
        } else if span.start >= offset {
            right.push(span.node.clone());
        } else if let Node::Text(text) = &**span.node {
            let at = offset - span.start;
            left.push(text_node(text.slice(0, at)));
            right.push(text_node(text.slice(at, text.len())));
        }
    }
    (left, right)
}

/// Children with `action` applied to every text run inside `start..end`,
/// descending into nested elements.
pub(crate) fn apply_mark(
    element: &ElementNode,
    start: usize,
    end: usize,
    mark: &Mark,
    action: MarkAction,
) -> Vec<NodeRef> {
    let mut out = Vec::with_capacity(element.children().len() + 2);
    for span in element.child_spans() {
        let overlaps = if span.is_empty() {
            start < span.start && span.start < end
        } else {
            span.start < end && span.end > start
        };
        if !overlaps {
            out.push(span.node.clone());
            continue;
        }
        match &**span.node {
            Node::Text(text) => {
                let from = start.saturating_sub(span.start);
                let to = (end - span.start).min(text.len());
                if from > 0 {
                    out.push(text_node(text.slice(0, from)));
                }
                let middle = text.slice(from, to);
                let marks = action.apply(middle.marks(), mark);
                out.push(text_node(middle.with_marks(marks)));
                if to < text.len() {
                    out.push(text_node(text.slice(to, text.len())));
                }
            }
            Node::Element(_) => out.push(mark_subtree(span.node, mark, action)),
            Node::Inline(_) => out.push(span.node.clone()),
        }
    }
    normalize(out)
}

fn mark_subtree(node: &NodeRef, mark: &Mark, action: MarkAction) -> NodeRef {
    match &**node {
        Node::Element(element) if !element.is_leaf() => {
            let children = element
                .children()
                .iter()
                .map(|child| mark_subtree(child, mark, action))
                .collect();
            Arc::new(Node::Element(element.with_children(normalize(children))))
        }
        Node::Text(text) => {
            let marks = action.apply(text.marks(), mark);
            text_node(text.with_marks(marks))
        }
        _ => node.clone(),
    }
}

fn text_node(text: TextNode) -> NodeRef {
    Arc::new(Node::Text(text))
}
