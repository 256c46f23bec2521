//! Editing primitives: the intent-level operations built from steps.
//!
//! Each primitive carries its arguments into the current document, appends
//! one or more steps and returns the affected range in the document as it
//! stands afterwards.

use std::sync::Arc;

use crate::addressing::{Position, Range, Selection};
use crate::error::{EngineError, Result};
use crate::mapping::Bias;
use crate::model::{Attributes, Mark, MarkAction, MarkSet, Node, NodeRef};
use crate::registry::{ComponentSpec, MarkSpec};
use crate::steps::Step;

use super::Transaction;

/// Separator inserted between inline runs that `unwrap` would otherwise
/// join.
const LINE_BREAK_KIND: &str = "br";

impl Transaction {
    fn expect_range(range: Option<Range>, step: &'static str) -> Result<Range> {
        range.ok_or_else(|| EngineError::assertion(format!("{step} step produced no range")))
    }

    /// Insert `text` at `range`, replacing its content. Without explicit
    /// `marks` the text inherits the marks at the range. Returns a caret
    /// after the inserted text.
    pub fn insert_text(
        &mut self,
        range: &Range,
        text: &str,
        marks: Option<MarkSet>,
    ) -> Result<Range> {
        let range = self.clone_range(range)?;
        let marks = marks.unwrap_or_else(|| range.get_marks());
        let range = if range.is_confined() {
            range
        } else {
            self.delete(&range)?
        };
        let nodes = if text.is_empty() {
            Vec::new()
        } else {
            vec![Node::marked_text(text, marks)]
        };
        let inserted = self.step(Step::Replace { range, nodes })?;
        let inserted = Self::expect_range(inserted, "replace")?;
        Ok(Range::collapsed(inserted.end().clone()))
    }

    /// Insert `nodes` at `range`, replacing its content. Returns the range
    /// covering the inserted nodes.
    pub fn insert_nodes(&mut self, range: &Range, nodes: Vec<NodeRef>) -> Result<Range> {
        let range = self.clone_range(range)?;
        let range = if range.is_confined() {
            range
        } else {
            self.delete(&range)?
        };
        Self::expect_range(self.step(Step::Replace { range, nodes })?, "replace")
    }

    /// Insert an instance of a registered inline component.
    pub fn insert_component(
        &mut self,
        range: &Range,
        name: &str,
        props: Attributes,
    ) -> Result<Range> {
        let component = self
            .apply()
            .component_spec(name)
            .map(|spec| spec.instantiate(props))
            .ok_or_else(|| {
                EngineError::assertion(format!("component `{name}` is not registered"))
            })?;
        self.insert_nodes(range, vec![Arc::new(Node::Inline(component))])
    }

    /// Delete the content of `range`, piece by confined piece. Returns a
    /// caret where the range started.
    pub fn delete(&mut self, range: &Range) -> Result<Range> {
        let range = self.clone_range(range)?;
        let pieces = range.minimum_confined_ranges();
        for piece in pieces.iter().rev() {
            let piece = self.clone_range(piece)?;
            if piece.is_collapsed() {
                continue;
            }
            self.step(Step::Remove { range: piece })?;
        }
        let start = self.clone_position(range.start(), Bias::Left)?;
        Ok(Range::collapsed(start))
    }

    /// Remove whole nodes. Returns a caret where the first one was.
    pub fn remove_nodes(&mut self, nodes: &[NodeRef]) -> Result<Range> {
        let mut ranges = nodes
            .iter()
            .map(|node| self.locate(node).map(|(_, range)| range))
            .collect::<Result<Vec<_>>>()?;
        ranges.sort_by(|a, b| b.start().path().cmp(a.start().path()));
        let Some(first) = ranges.last().cloned() else {
            return Err(EngineError::assertion("no nodes to remove"));
        };
        for range in &ranges {
            let range = self.clone_range(range)?;
            self.step(Step::Remove { range })?;
        }
        let start = self.clone_position(first.start(), Bias::Left)?;
        Ok(Range::collapsed(start))
    }

    /// Replace `node` by `replacements`. Returns the range they cover.
    pub fn replace_nodes(&mut self, node: &NodeRef, replacements: Vec<NodeRef>) -> Result<Range> {
        let (_, range) = self.locate(node)?;
        Self::expect_range(
            self.step(Step::Replace {
                range,
                nodes: replacements,
            })?,
            "replace",
        )
    }

    pub fn add_mark(&mut self, range: &Range, mark: Mark) -> Result<Range> {
        self.mark(range, mark, MarkAction::Add)
    }

    pub fn remove_mark(&mut self, range: &Range, mark: Mark) -> Result<Range> {
        self.mark(range, mark, MarkAction::Remove)
    }

    fn mark(&mut self, range: &Range, mark: Mark, action: MarkAction) -> Result<Range> {
        let range = self.clone_range(range)?;
        if range.is_collapsed() {
            return Self::expect_range(
                self.step(Step::Mark {
                    range,
                    mark,
                    action,
                })?,
                "mark",
            );
        }
        for piece in range.minimum_confined_ranges() {
            let piece = self.clone_range(&piece)?;
            self.step(Step::Mark {
                range: piece,
                mark: mark.clone(),
                action,
            })?;
        }
        self.clone_range(&range)
    }

    /// Move the content of a confined range to `target`. Returns the
    /// range covering the moved content.
    pub fn move_to_position(&mut self, range: &Range, target: &Position) -> Result<Range> {
        let range = self.clone_range(range)?;
        if !range.is_confined() {
            return Err(EngineError::Unconfined { operation: "move" });
        }
        let target = self.clone_position(target, Bias::Left)?;
        Self::expect_range(self.step(Step::Move { range, target })?, "move")
    }

    /// Split the parent of `position` in two, unless the position sits at
    /// one of its edges, in which case it simply steps out of the parent.
    fn split_once(&mut self, position: &Position) -> Result<Position> {
        let offset = position.parent_offset();
        if offset == 0 {
            return position.before_parent();
        }
        if offset == position.parent().max_offset() {
            return position.after_parent();
        }
        let range = self.step(Step::Split {
            position: position.clone(),
            split_parent: true,
        })?;
        Ok(Self::expect_range(range, "split")?.start().clone())
    }

    /// Split upwards until the parent of the position satisfies
    /// `predicate` (or is the root). Returns the final position.
    pub fn split_until<F>(&mut self, position: &Position, predicate: F) -> Result<Position>
    where
        F: Fn(&Node) -> bool,
    {
        let mut position = self.clone_position(position, Bias::Left)?;
        while position.depth() > 0 && !predicate(position.parent()) {
            position = self.split_once(&position)?;
        }
        Ok(position)
    }

    /// Split upwards up to and including `limit`, which must contain the
    /// position. Returns the position between the two halves of `limit`.
    pub fn split_until_element(
        &mut self,
        position: &Position,
        limit: &NodeRef,
    ) -> Result<Position> {
        let limit_path = self.node_path(limit)?;
        if limit_path.is_empty() {
            return Err(EngineError::assertion("the document root cannot be split"));
        }
        let mut position = self.clone_position(position, Bias::Left)?;
        if !position.parent_path().starts_with(&limit_path) {
            return Err(EngineError::assertion("position is not inside the limit element"));
        }
        while position.parent_path().len() >= limit_path.len() {
            position = self.split_once(&position)?;
        }
        Ok(position)
    }

    /// Replace an element by its own content. With `ensure_block`, inline
    /// content that would run into inline neighbours is fenced off with
    /// line breaks. Returns the range covering the unwrapped content.
    pub fn unwrap(&mut self, node: &NodeRef, ensure_block: bool) -> Result<Range> {
        let (element, around) = self.locate(node)?;
        let Node::Element(inner) = &*element else {
            return Err(EngineError::assertion("only elements can be unwrapped"));
        };
        if inner.is_leaf() {
            return Err(EngineError::assertion("leaf elements have no content to unwrap"));
        }

        let parent = around.start().parent_path().to_vec();
        let start = around.start().parent_offset();
        let size = inner.max_offset();
        let first_inline = inner.children().first().is_some_and(|child| !child.is_block());
        let last_inline = inner.children().last().is_some_and(|child| !child.is_block());
        let was_block = inner.is_block();

        if size > 0 {
            let content = Range::from_in_element(around.tree(), &element)?;
            self.step(Step::Move {
                range: content,
                target: around.start().clone(),
            })?;
        }
        let document = self.document();
        let shell = Range::from_paths(
            &document,
            at(&parent, start + size),
            at(&parent, start + size + 1),
        )?;
        self.step(Step::Remove { range: shell })?;

        let mut end = start + size;
        let mut start = start;
        if ensure_block && was_block && size > 0 {
            let document = self.document();
            let after = Position::from_path(&document, at(&parent, end))?;
            if last_inline && after.node_after().is_some_and(|node| !node.is_block()) {
                self.insert_break(&after)?;
            }
            let before = Position::from_path(&self.document(), at(&parent, start))?;
            if first_inline && before.node_before().is_some_and(|node| !node.is_block()) {
                self.insert_break(&before)?;
                start += 1;
                end += 1;
            }
        }
        Range::from_paths(&self.document(), at(&parent, start), at(&parent, end))
    }

    fn insert_break(&mut self, at: &Position) -> Result<Range> {
        let schema = self.apply().settings().schema.clone();
        let separator = schema.element(LINE_BREAK_KIND, Attributes::new(), Vec::new());
        self.insert_nodes(&Range::collapsed(at.clone()), vec![separator])
    }

    /// Replace the selection. Returns the range spanning all of `ranges`.
    pub fn set_selection(&mut self, ranges: Vec<Range>, right_to_left: bool) -> Result<Range> {
        let ranges = ranges
            .iter()
            .map(|range| self.clone_range(range))
            .collect::<Result<Vec<_>>>()?;
        let selection = Selection::new(ranges, right_to_left);
        let ranges = selection.ranges();
        let (Some(first), Some(last)) = (ranges.first(), ranges.last()) else {
            return Err(EngineError::IncompleteSelection { missing: "anchor" });
        };
        let hull = Range::new(first.start().clone(), last.end().clone())?;
        self.step(Step::Selection(selection))?;
        Ok(hull)
    }

    pub fn select_range(&mut self, range: &Range) -> Result<Range> {
        self.set_selection(vec![range.clone()], false)
    }

    pub fn clear_selection(&mut self) -> Result<()> {
        self.step(Step::Selection(Selection::default()))?;
        Ok(())
    }

    /// Put a caret at the start (or end) of an element's content.
    pub fn collapse_in(&mut self, node: &NodeRef, at_end: bool) -> Result<Range> {
        let path = self.node_path(node)?;
        let document = self.document();
        let element = document
            .node_at(&path)
            .ok_or_else(|| EngineError::stale(&path, "node was removed"))?;
        let offset = if at_end { element.max_offset() } else { 0 };
        let caret = Range::collapsed(Position::from_in_element(&document, &element, offset)?);
        self.select_range(&caret)
    }

    pub fn set_attribute(&mut self, node: &NodeRef, name: &str, value: &str) -> Result<Range> {
        self.attribute(node, name, Some(value.to_string()))
    }

    pub fn remove_attribute(&mut self, node: &NodeRef, name: &str) -> Result<Range> {
        self.attribute(node, name, None)
    }

    fn attribute(&mut self, node: &NodeRef, name: &str, value: Option<String>) -> Result<Range> {
        let path = self.node_path(node)?;
        let range = self.step(Step::Attribute {
            path,
            name: name.to_string(),
            value,
        })?;
        match range {
            Some(range) => Ok(range),
            None => {
                let document = self.document();
                Range::from_in_element(&document, document.root())
            }
        }
    }

    /// Set or clear one state entry of an inline component. Returns the
    /// range around the component.
    pub fn set_component_state(
        &mut self,
        component: &NodeRef,
        key: &str,
        value: Option<&str>,
    ) -> Result<Range> {
        let path = self.node_path(component)?;
        let range = self.step(Step::ComponentState {
            path: path.clone(),
            key: key.to_string(),
            value: value.map(str::to_string),
        })?;
        range.ok_or_else(|| EngineError::stale(&path, "component vanished"))
    }

    pub fn set_config(&mut self, key: &str, value: Option<&str>) -> Result<()> {
        self.step(Step::Config {
            key: key.to_string(),
            value: value.map(str::to_string),
        })?;
        Ok(())
    }

    pub fn register_mark(&mut self, spec: MarkSpec) -> Result<()> {
        self.step(Step::RegisterMark(spec))?;
        Ok(())
    }

    pub fn register_component(&mut self, spec: ComponentSpec) -> Result<()> {
        self.step(Step::RegisterComponent(spec))?;
        Ok(())
    }

    /// Bring back the document and selection of the checkpoint `depth`
    /// links behind the current state.
    pub fn restore_snapshot(&mut self, depth: usize) -> Result<()> {
        self.step(Step::Restore { depth })?;
        Ok(())
    }
}

fn at(parent: &[usize], offset: usize) -> Vec<usize> {
    let mut path = parent.to_vec();
    path.push(offset);
    path
}
