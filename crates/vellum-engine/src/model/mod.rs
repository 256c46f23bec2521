//! The document model: nodes, marks, the element schema and rooted trees.

pub mod marks;
pub mod node;
pub mod schema;
pub mod tree;

pub use marks::{CORE_AUTHORITY, Mark, MarkAction, MarkKey, MarkSet};
pub(crate) use node::normalize;
pub use node::{
    Attributes, ChildSpan, ElementNode, InlineComponent, Node, NodeRef, OPAQUE_ATTRIBUTE, TextNode,
};
pub use schema::{ROOT_KIND, Schema};
pub use tree::Tree;
