//! A document root plus the ancestry index derived from it.
//!
//! The index maps node identity (the `Arc` pointer) to the node's path and
//! parent. It is built lazily, once per root, and lives inside the `Tree` so
//! the "before" and "after" documents of an edit each carry their own copy
//! even where they share subtrees.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use super::node::{ElementNode, Node, NodeRef};
use crate::error::{EngineError, Result};

#[derive(Clone)]
pub struct Tree(Arc<TreeInner>);

struct TreeInner {
    root: NodeRef,
    index: OnceLock<HashMap<usize, IndexEntry>>,
}

struct IndexEntry {
    path: Vec<usize>,
    parent: Option<NodeRef>,
}

fn identity(node: &NodeRef) -> usize {
    Arc::as_ptr(node) as usize
}

impl Tree {
    pub fn new(root: NodeRef) -> Self {
        Self(Arc::new(TreeInner {
            root,
            index: OnceLock::new(),
        }))
    }

    pub fn root(&self) -> &NodeRef {
        &self.0.root
    }

    pub fn root_element(&self) -> Result<&ElementNode> {
        self.0
            .root
            .as_element()
            .ok_or_else(|| EngineError::assertion("document root must be an element"))
    }

    /// Two trees are the same document iff they share a root node.
    pub fn same(&self, other: &Tree) -> bool {
        Arc::ptr_eq(&self.0.root, &other.0.root)
    }

    fn index(&self) -> &HashMap<usize, IndexEntry> {
        self.0.index.get_or_init(|| {
            log::trace!("building ancestry index");
            let mut index = HashMap::new();
            let mut stack: Vec<(NodeRef, Vec<usize>, Option<NodeRef>)> =
                vec![(self.0.root.clone(), Vec::new(), None)];
            while let Some((node, path, parent)) = stack.pop() {
                if let Node::Element(element) = &*node {
                    for span in element.child_spans() {
                        let mut child_path = path.clone();
                        child_path.push(span.start);
                        stack.push((span.node.clone(), child_path, Some(node.clone())));
                    }
                }
                index
                    .entry(identity(&node))
                    .or_insert(IndexEntry { path, parent });
            }
            index
        })
    }

    /// Offset path of `node`: its offset in each ancestor below the root.
    /// The root itself has the empty path.
    pub fn path_to(&self, node: &NodeRef) -> Option<Vec<usize>> {
        self.index()
            .get(&identity(node))
            .map(|entry| entry.path.clone())
    }

    pub fn parent_of(&self, node: &NodeRef) -> Option<NodeRef> {
        self.index()
            .get(&identity(node))
            .and_then(|entry| entry.parent.clone())
    }

    pub fn contains(&self, node: &NodeRef) -> bool {
        self.index().contains_key(&identity(node))
    }

    /// The node whose path is `path`. A zero-width text sharing its start
    /// offset with another child loses to that child.
    pub fn node_at(&self, path: &[usize]) -> Option<NodeRef> {
        let mut node = self.0.root.clone();
        for &offset in path {
            let next = node.as_element()?.child_starting_at(offset)?.node.clone();
            node = next;
        }
        Some(node)
    }

    pub fn element_at(&self, path: &[usize]) -> Result<NodeRef> {
        match self.node_at(path) {
            Some(node) if node.as_element().is_some() => Ok(node),
            _ => Err(EngineError::stale(path, "no element at path")),
        }
    }

    /// All nodes in document order, root first.
    pub fn descendants(&self) -> Vec<NodeRef> {
        let mut out = Vec::new();
        let mut stack = vec![self.0.root.clone()];
        while let Some(node) = stack.pop() {
            if let Node::Element(element) = &*node {
                stack.extend(element.children().iter().rev().cloned());
            }
            out.push(node);
        }
        out
    }

    /// First node in document order matching `predicate`.
    pub fn find<F>(&self, predicate: F) -> Option<NodeRef>
    where
        F: Fn(&Node) -> bool,
    {
        self.descendants().into_iter().find(|node| predicate(node))
    }

    pub fn text_content(&self) -> String {
        self.0.root.text_content()
    }

    /// New tree with the node at `path` replaced by `f(node)`, rebuilding
    /// only the spine from the root down to it.
    pub fn update_node<F>(&self, path: &[usize], f: F) -> Result<Tree>
    where
        F: FnOnce(&Node) -> Result<Node>,
    {
        let root = rebuild(&self.0.root, path, 0, f)?;
        Ok(Tree::new(root))
    }

    pub fn update_element<F>(&self, path: &[usize], f: F) -> Result<Tree>
    where
        F: FnOnce(&ElementNode) -> Result<ElementNode>,
    {
        self.update_node(path, |node| match node {
            Node::Element(element) => Ok(Node::Element(f(element)?)),
            _ => Err(EngineError::stale(path, "expected an element")),
        })
    }
}

fn rebuild<F>(node: &NodeRef, path: &[usize], depth: usize, f: F) -> Result<NodeRef>
where
    F: FnOnce(&Node) -> Result<Node>,
{
    let Some(&offset) = path.get(depth) else {
        return Ok(Arc::new(f(node)?));
    };
    let element = node
        .as_element()
        .ok_or_else(|| EngineError::stale(&path[..depth], "expected an element"))?;
    let span = element
        .child_starting_at(offset)
        .ok_or_else(|| EngineError::stale(&path[..=depth], "no node at offset"))?;
    let index = span.index;
    let rebuilt = rebuild(span.node, path, depth + 1, f)?;

    let mut children = element.children().to_vec();
    children[index] = rebuilt;
    Ok(Arc::new(Node::Element(element.with_children(children))))
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::notation::render_document(&self.0.root))
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tree({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notation::parse_document;
    use pretty_assertions::assert_eq;

    fn tree() -> Tree {
        parse_document("<p>ab<em>c</em></p><ul><li><p>x</p></li></ul>").unwrap()
    }

    #[test]
    fn test_path_to_and_node_at_agree() {
        let tree = tree();
        for node in tree.descendants() {
            let path = tree.path_to(&node).unwrap();
            let found = tree.node_at(&path).unwrap();
            assert!(Arc::ptr_eq(&found, &node), "path {path:?}");
        }
    }

    #[test]
    fn test_paths_are_offsets() {
        let tree = tree();
        let x = tree.find(|n| n.as_text().is_some_and(|t| t.text() == "x")).unwrap();
        assert_eq!(tree.path_to(&x), Some(vec![1, 0, 0, 0]));
        assert_eq!(tree.path_to(tree.root()), Some(vec![]));
    }

    #[test]
    fn test_parent_of() {
        let tree = tree();
        let li = tree.find(|n| n.kind() == "li").unwrap();
        let ul = tree.parent_of(&li).unwrap();
        assert_eq!(ul.kind(), "ul");
        assert!(tree.parent_of(tree.root()).is_none());
    }

    #[test]
    fn test_update_element_rebuilds_spine_only() {
        let tree = tree();
        let updated = tree
            .update_element(&[1, 0], |li| Ok(li.with_children(vec![])))
            .unwrap();

        assert!(!updated.same(&tree));
        assert_eq!(updated.to_string(), "<p>ab<em>c</em></p><ul><li></li></ul>");

        // untouched subtree is shared
        let before = tree.node_at(&[0]).unwrap();
        let after = updated.node_at(&[0]).unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        // original unchanged
        assert_eq!(tree.to_string(), "<p>ab<em>c</em></p><ul><li><p>x</p></li></ul>");
    }

    #[test]
    fn test_update_stale_path() {
        let tree = tree();
        let error = tree.update_element(&[7], |e| Ok(e.clone())).unwrap_err();
        assert!(matches!(error, EngineError::StalePath { .. }));
    }

    #[test]
    fn test_find_in_document_order() {
        let tree = tree();
        let first_p = tree.find(|n| n.kind() == "p").unwrap();
        assert_eq!(first_p.text_content(), "abc");
        assert_eq!(tree.text_content(), "abcx");
    }
}
