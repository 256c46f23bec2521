use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};

use vellum_config::EditorConfig;

use super::node::{Attributes, ElementNode, Node, NodeRef};

/// Kind of the element wrapping a whole document.
pub const ROOT_KIND: &str = "root";

/// Classification of element kinds into block/inline and void.
///
/// Void kinds are leaves and never count as block-level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    inline_kinds: BTreeSet<String>,
    void_kinds: BTreeSet<String>,
}

static DEFAULT_SCHEMA: LazyLock<Schema> = LazyLock::new(|| Schema::from(&EditorConfig::default()));

impl Schema {
    pub fn new<I, V>(inline_kinds: I, void_kinds: V) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        Self {
            inline_kinds: inline_kinds.into_iter().map(Into::into).collect(),
            void_kinds: void_kinds.into_iter().map(Into::into).collect(),
        }
    }

    pub fn default_ref() -> &'static Schema {
        &DEFAULT_SCHEMA
    }

    pub fn is_block(&self, kind: &str) -> bool {
        !self.inline_kinds.contains(kind) && !self.void_kinds.contains(kind)
    }

    pub fn is_void(&self, kind: &str) -> bool {
        self.void_kinds.contains(kind)
    }

    pub fn element(&self, kind: &str, attributes: Attributes, children: Vec<NodeRef>) -> NodeRef {
        Arc::new(Node::Element(ElementNode::new(
            self, kind, attributes, children,
        )))
    }
}

impl Default for Schema {
    fn default() -> Self {
        DEFAULT_SCHEMA.clone()
    }
}

impl From<&EditorConfig> for Schema {
    fn from(editor: &EditorConfig) -> Self {
        Schema::new(editor.inline_kinds.iter().cloned(), editor.void_kinds.iter().cloned())
    }
}
