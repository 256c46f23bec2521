//! # Document Nodes
//!
//! A document is a tree of immutable [`Node`]s shared through [`NodeRef`]
//! (`Arc<Node>`). Nodes never point at their parent or siblings; ancestry is
//! always recovered by walking down from a root (see [`super::Tree`]). That
//! lets an old and a new document share every subtree an edit did not touch.
//!
//! ## Offsets
//!
//! Every node occupies [`Node::offset_size`] units of address space in its
//! parent:
//!
//! | node | offset size |
//! |------|-------------|
//! | element | 1 |
//! | inline component | 1 |
//! | text | number of characters |
//!
//! The largest valid offset inside an element is the sum of its children's
//! sizes, so text runs are addressable per character while elements are
//! addressable per child. Splitting or merging text runs never changes any
//! offset, which is what keeps positions stable across normalization.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::marks::MarkSet;
use super::schema::Schema;

pub type NodeRef = Arc<Node>;

/// Attribute map shared by every node kind. Ordered so rendering is stable.
pub type Attributes = BTreeMap<String, String>;

/// Marks an element's content as opaque: no positions inside it.
pub const OPAQUE_ATTRIBUTE: &str = "data-opaque";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
    Inline(InlineComponent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementNode {
    kind: String,
    attributes: Attributes,
    children: Vec<NodeRef>,
    block: bool,
    void: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode {
    text: String,
    marks: MarkSet,
    attributes: Attributes,
    /// Length in characters, cached because offsets are computed constantly.
    len: usize,
}

/// An atomic inline fragment with opaque props and a state bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineComponent {
    name: String,
    props: Attributes,
    state: Attributes,
    attributes: Attributes,
}

/// A child together with the offsets it spans inside its parent.
#[derive(Debug, Clone, Copy)]
pub struct ChildSpan<'a> {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub node: &'a NodeRef,
}

impl ChildSpan<'_> {
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl Node {
    /// Element classified by the default schema.
    pub fn element(kind: &str, children: Vec<NodeRef>) -> NodeRef {
        Schema::default_ref().element(kind, Attributes::new(), children)
    }

    pub fn text(text: &str) -> NodeRef {
        Arc::new(Node::Text(TextNode::new(text, MarkSet::new())))
    }

    pub fn marked_text(text: &str, marks: MarkSet) -> NodeRef {
        Arc::new(Node::Text(TextNode::new(text, marks)))
    }

    pub fn component(name: &str, props: Attributes) -> NodeRef {
        Arc::new(Node::Inline(InlineComponent::new(name, props)))
    }

    pub fn offset_size(&self) -> usize {
        match self {
            Node::Element(_) | Node::Inline(_) => 1,
            Node::Text(text) => text.len(),
        }
    }

    pub fn max_offset(&self) -> usize {
        match self {
            Node::Element(element) => element.max_offset(),
            Node::Text(text) => text.len(),
            Node::Inline(_) => 0,
        }
    }

    /// True for nodes with no addressable content of their own.
    pub fn is_leaf(&self) -> bool {
        match self {
            Node::Element(element) => element.is_leaf(),
            Node::Text(_) => false,
            Node::Inline(_) => true,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Node::Element(element) if element.is_block())
    }

    /// A zero-width text run that only carries marks.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Node::Text(text) if text.is_empty())
    }

    pub fn kind(&self) -> &str {
        match self {
            Node::Element(element) => &element.kind,
            Node::Text(_) => "#text",
            Node::Inline(component) => &component.name,
        }
    }

    pub fn attributes(&self) -> &Attributes {
        match self {
            Node::Element(element) => &element.attributes,
            Node::Text(text) => &text.attributes,
            Node::Inline(component) => &component.attributes,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes().get(name).map(String::as_str)
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextNode> {
        match self {
            Node::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_component(&self) -> Option<&InlineComponent> {
        match self {
            Node::Inline(component) => Some(component),
            _ => None,
        }
    }

    /// Concatenated text of this node and its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Element(element) => {
                for child in &element.children {
                    child.collect_text(out);
                }
            }
            Node::Text(text) => out.push_str(&text.text),
            Node::Inline(_) => {}
        }
    }

    pub fn with_attribute(&self, name: &str, value: Option<&str>) -> Node {
        let mut node = self.clone();
        let attributes = match &mut node {
            Node::Element(element) => &mut element.attributes,
            Node::Text(text) => &mut text.attributes,
            Node::Inline(component) => &mut component.attributes,
        };
        match value {
            Some(value) => attributes.insert(name.to_string(), value.to_string()),
            None => attributes.remove(name),
        };
        node
    }
}

impl ElementNode {
    /// Build an element, classifying its kind against `schema`.
    pub fn new(
        schema: &Schema,
        kind: impl Into<String>,
        attributes: Attributes,
        children: Vec<NodeRef>,
    ) -> Self {
        let kind = kind.into();
        Self {
            block: schema.is_block(&kind),
            void: schema.is_void(&kind),
            kind,
            attributes,
            children,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }

    pub fn is_block(&self) -> bool {
        self.block
    }

    /// Void kinds and opaque elements expose no positions inside them.
    pub fn is_leaf(&self) -> bool {
        self.void || self.attributes.contains_key(OPAQUE_ATTRIBUTE)
    }

    pub fn max_offset(&self) -> usize {
        if self.is_leaf() {
            return 0;
        }
        self.children.iter().map(|child| child.offset_size()).sum()
    }

    pub fn child_spans(&self) -> impl Iterator<Item = ChildSpan<'_>> + '_ {
        self.children
            .iter()
            .enumerate()
            .scan(0usize, |offset, (index, node)| {
                let start = *offset;
                *offset += node.offset_size();
                Some(ChildSpan {
                    index,
                    start,
                    end: *offset,
                    node,
                })
            })
    }

    /// The child whose span covers `offset` (`start <= offset < end`).
    /// Zero-width children never match.
    pub fn child_at(&self, offset: usize) -> Option<ChildSpan<'_>> {
        self.child_spans()
            .find(|span| span.start <= offset && offset < span.end)
    }

    /// The child starting at `offset`, preferring one with non-zero size.
    pub fn child_starting_at(&self, offset: usize) -> Option<ChildSpan<'_>> {
        let mut empty = None;
        for span in self.child_spans() {
            if span.start > offset {
                break;
            }
            if span.start == offset {
                if !span.is_empty() {
                    return Some(span);
                }
                empty.get_or_insert(span);
            }
        }
        empty
    }

    /// The element child sitting at `offset`, with its index.
    pub fn element_at(&self, offset: usize) -> Option<(usize, &NodeRef)> {
        self.child_at(offset)
            .filter(|span| matches!(&**span.node, Node::Element(_)))
            .map(|span| (span.index, span.node))
    }

    pub fn with_children(&self, children: Vec<NodeRef>) -> Self {
        Self {
            kind: self.kind.clone(),
            attributes: self.attributes.clone(),
            children,
            block: self.block,
            void: self.void,
        }
    }
}

impl TextNode {
    pub fn new(text: impl Into<String>, marks: MarkSet) -> Self {
        let text = text.into();
        Self {
            len: text.chars().count(),
            text,
            marks,
            attributes: Attributes::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn marks(&self) -> &MarkSet {
        &self.marks
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Characters `start..end`, keeping marks and attributes.
    pub fn slice(&self, start: usize, end: usize) -> TextNode {
        let end = end.min(self.len);
        let start = start.min(end);
        let from = byte_index(&self.text, start);
        let to = byte_index(&self.text, end);
        TextNode {
            text: self.text[from..to].to_string(),
            marks: self.marks.clone(),
            attributes: self.attributes.clone(),
            len: end - start,
        }
    }

    pub fn with_marks(&self, marks: MarkSet) -> TextNode {
        TextNode {
            marks,
            ..self.clone()
        }
    }

    pub fn can_merge(&self, other: &TextNode) -> bool {
        self.marks == other.marks && self.attributes == other.attributes
    }

    pub fn merged(&self, other: &TextNode) -> TextNode {
        let mut text = String::with_capacity(self.text.len() + other.text.len());
        text.push_str(&self.text);
        text.push_str(&other.text);
        TextNode {
            text,
            marks: self.marks.clone(),
            attributes: self.attributes.clone(),
            len: self.len + other.len,
        }
    }
}

fn byte_index(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(index, _)| index)
        .unwrap_or(text.len())
}

impl InlineComponent {
    pub fn new(name: impl Into<String>, props: Attributes) -> Self {
        Self {
            name: name.into(),
            props,
            state: Attributes::new(),
            attributes: Attributes::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn props(&self) -> &Attributes {
        &self.props
    }

    pub fn prop(&self, name: &str) -> Option<&str> {
        self.props.get(name).map(String::as_str)
    }

    pub fn state(&self) -> &Attributes {
        &self.state
    }

    pub fn with_state(&self, key: &str, value: Option<&str>) -> InlineComponent {
        let mut component = self.clone();
        match value {
            Some(value) => component.state.insert(key.to_string(), value.to_string()),
            None => component.state.remove(key),
        };
        component
    }
}

/// Coalesce adjacent text runs that carry the same marks and attributes.
/// Placeholders are kept as they are.
///
/// Offsets are unaffected, so this can run after any structural change.
pub(crate) fn normalize(children: Vec<NodeRef>) -> Vec<NodeRef> {
    let mut out: Vec<NodeRef> = Vec::with_capacity(children.len());
    for child in children {
        if let (Some(Node::Text(previous)), Node::Text(next)) =
            (out.last().map(|node| &**node), &*child)
            && !previous.is_empty()
            && !next.is_empty()
            && previous.can_merge(next)
        {
            let merged = previous.merged(next);
            if let Some(last) = out.last_mut() {
                *last = Arc::new(Node::Text(merged));
            }
            continue;
        }
        out.push(child);
    }
    out
}
