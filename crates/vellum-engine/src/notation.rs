//! # Notation Bridge
//!
//! Converts between the angle-bracket notation parsed by `vellum-syntax`
//! and engine nodes. It exists for fixtures, debugging and `Display`, not
//! as a persistence format.
//!
//! ```text
//! <p>plain <b>bold</b><b></b><component name="mention" id="7"/></p>
//!    |        |         |      |
//!    text     mark tag  empty mark tag = placeholder
//!                              inline component
//! ```
//!
//! Tags listed as mark tags become marks on the text they wrap; every other
//! tag becomes an element classified by the schema. Rendering wraps each
//! text run in its marks, outermost first in mark-set order, so rendering
//! the result of a parse gives back canonical notation. A notation built
//! [`with_marks`](Notation::with_marks) nests higher priority marks
//! outside lower ones instead.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use vellum_syntax::{MarkupElement, MarkupNode};

use crate::error::{EngineError, Result};
use crate::model::{
    Attributes, CORE_AUTHORITY, InlineComponent, Mark, MarkKey, MarkSet, Node, NodeRef, ROOT_KIND,
    Schema, TextNode, Tree, normalize,
};
use crate::registry::{MarkSpec, Registry};

/// Tag name for inline components.
pub const COMPONENT_TAG: &str = "component";
/// Attribute holding a non-core mark's authority.
pub const AUTHORITY_ATTRIBUTE: &str = "data-authority";

pub const DEFAULT_MARK_TAGS: &[&str] = &[
    "b", "strong", "i", "em", "u", "s", "code", "bold", "italic", "underline", "strike", "sub",
    "sup",
];

#[derive(Debug, Clone)]
pub struct Notation {
    schema: Schema,
    mark_tags: BTreeSet<String>,
    priorities: BTreeMap<MarkKey, i32>,
}

impl Default for Notation {
    fn default() -> Self {
        Self::new(Schema::default())
    }
}

impl Notation {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            mark_tags: DEFAULT_MARK_TAGS.iter().map(|tag| tag.to_string()).collect(),
            priorities: BTreeMap::new(),
        }
    }

    /// Registered marks become mark tags and render by their priority.
    pub fn with_marks(mut self, marks: &Registry<MarkSpec>) -> Self {
        for spec in marks.iter() {
            self.mark_tags.insert(spec.name.clone());
            self.priorities.insert(spec.mark().key(), spec.priority);
        }
        self
    }

    pub fn with_mark_tag(mut self, tag: impl Into<String>) -> Self {
        self.mark_tags.insert(tag.into());
        self
    }

    pub fn is_mark_tag(&self, tag: &str) -> bool {
        self.mark_tags.contains(tag)
    }

    /// A document whose root holds the parsed nodes.
    pub fn parse_document(&self, source: &str) -> Result<Tree> {
        let children = self.parse_fragment(source)?;
        let root = self.schema.element(ROOT_KIND, Attributes::new(), children);
        Ok(Tree::new(root))
    }

    pub fn parse_fragment(&self, source: &str) -> Result<Vec<NodeRef>> {
        let markup = vellum_syntax::parse(source)?;
        let mut out = Vec::new();
        self.convert(&markup, &MarkSet::new(), &mut out)?;
        Ok(normalize(out))
    }

    fn convert(
        &self,
        markup: &[MarkupNode],
        marks: &MarkSet,
        out: &mut Vec<NodeRef>,
    ) -> Result<()> {
        for node in markup {
            match node {
                MarkupNode::Text(text) => {
                    // indentation between tags
                    if text.text.contains('\n') && text.text.trim().is_empty() {
                        continue;
                    }
                    out.push(Node::marked_text(&text.text, marks.clone()));
                }
                MarkupNode::Element(element) if element.name == COMPONENT_TAG => {
                    out.push(component(element)?);
                }
                MarkupNode::Element(element) if self.is_mark_tag(&element.name) => {
                    let marks = marks.clone().with(mark(element));
                    if element.children.is_empty() {
                        out.push(Node::marked_text("", marks));
                    } else {
                        self.convert(&element.children, &marks, out)?;
                    }
                }
                MarkupNode::Element(element) => {
                    let mut children = Vec::new();
                    self.convert(&element.children, marks, &mut children)?;
                    let attributes = element.attributes.iter().cloned().collect();
                    out.push(self.schema.element(&element.name, attributes, normalize(children)));
                }
            }
        }
        Ok(())
    }

    pub fn render(&self, node: &Node) -> String {
        let mut out = String::new();
        render_into(node, &self.priorities, &mut out);
        out
    }

    pub fn render_document(&self, root: &Node) -> String {
        render_root(root, &self.priorities)
    }
}

fn mark(element: &MarkupElement) -> Mark {
    let mut mark = Mark::new(element.name.clone());
    for (name, value) in &element.attributes {
        if name == AUTHORITY_ATTRIBUTE {
            mark.authority = value.clone();
        } else {
            mark.attributes.insert(name.clone(), value.clone());
        }
    }
    mark
}

fn component(element: &MarkupElement) -> Result<NodeRef> {
    let name = element
        .attribute("name")
        .ok_or_else(|| EngineError::assertion("component tag without a name"))?;
    let props: Attributes = element
        .attributes
        .iter()
        .filter(|(key, _)| key != "name")
        .cloned()
        .collect();
    Ok(Node::component(name, props))
}

/// Parse with the default notation.
pub fn parse_document(source: &str) -> Result<Tree> {
    Notation::default().parse_document(source)
}

pub fn parse_fragment(source: &str) -> Result<Vec<NodeRef>> {
    Notation::default().parse_fragment(source)
}

/// Notation for a single node.
pub fn render(node: &Node) -> String {
    let mut out = String::new();
    render_into(node, &BTreeMap::new(), &mut out);
    out
}

/// Notation for a document: the root's children when the root is the
/// implicit root element.
pub fn render_document(root: &Node) -> String {
    render_root(root, &BTreeMap::new())
}

fn render_root(root: &Node, priorities: &BTreeMap<MarkKey, i32>) -> String {
    let mut out = String::new();
    match root {
        Node::Element(element) if element.kind() == ROOT_KIND => {
            for child in element.children() {
                render_into(child, priorities, &mut out);
            }
        }
        node => render_into(node, priorities, &mut out),
    }
    out
}

fn render_into(node: &Node, priorities: &BTreeMap<MarkKey, i32>, out: &mut String) {
    match node {
        Node::Element(element) => {
            out.push('<');
            out.push_str(element.kind());
            push_attributes(element.attributes(), out);
            if element.is_leaf() && element.children().is_empty() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in element.children() {
                render_into(child, priorities, out);
            }
            out.push_str("</");
            out.push_str(element.kind());
            out.push('>');
        }
        Node::Text(text) => render_text(text, priorities, out),
        Node::Inline(component) => render_component(component, out),
    }
}

fn render_text(text: &TextNode, priorities: &BTreeMap<MarkKey, i32>, out: &mut String) {
    if text.is_empty() && text.marks().is_empty() {
        return;
    }
    let mut marks: Vec<&Mark> = text.marks().iter().collect();
    // stable, so equal priorities keep set order
    marks.sort_by_key(|mark| Reverse(priorities.get(&mark.key()).copied().unwrap_or(0)));
    for mark in &marks {
        out.push('<');
        out.push_str(&mark.name);
        if mark.authority != CORE_AUTHORITY {
            push_attribute(AUTHORITY_ATTRIBUTE, &mark.authority, out);
        }
        push_attributes(&mark.attributes, out);
        out.push('>');
    }
    out.push_str(&html_escape::encode_text(text.text()));
    for mark in marks.iter().rev() {
        out.push_str("</");
        out.push_str(&mark.name);
        out.push('>');
    }
}

fn render_component(component: &InlineComponent, out: &mut String) {
    out.push('<');
    out.push_str(COMPONENT_TAG);
    push_attribute("name", component.name(), out);
    push_attributes(component.props(), out);
    out.push_str("/>");
}

fn push_attributes(attributes: &Attributes, out: &mut String) {
    for (name, value) in attributes {
        push_attribute(name, value, out);
    }
}

fn push_attribute(name: &str, value: &str, out: &mut String) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&html_escape::encode_double_quoted_attribute(value));
    out.push('"');
}
