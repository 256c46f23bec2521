//! # Steps - Atomic State Changes
//!
//! A [`Step`] is one pure function from a [`State`] to its successor. Each
//! application returns a [`StepOutcome`]: the new state, the
//! [`RangeMapper`] that carries positions across the change, and the
//! step's default result range (what a primitive hands back to its caller).
//!
//! Ranges and positions inside a step are resolved against the state by
//! *path*, so a step built against one tree can be replayed onto any tree
//! with the same shape.
//!
//! ## Document steps
//!
//! | step | map rule | default range |
//! |------|----------|---------------|
//! | `Replace` / `Remove` | splice | the inserted content |
//! | `Mark` | none | the marked range |
//! | `Split` | split | between the two halves |
//! | `Move` | move | the moved content at its destination |
//! | `Attribute` | none | around the node |
//! | `ComponentState` | none | around the component |
//!
//! Document steps also carry the state's selection across the change. The
//! remaining steps leave the tree alone.

pub(crate) mod surgery;

use std::collections::HashSet;
use std::sync::Arc;

use crate::addressing::{Position, Range, Selection};
use crate::error::{EngineError, Result};
use crate::mapping::{Bias, MapRule, RangeMapper};
use crate::model::{Mark, MarkAction, Node, NodeRef, Tree};
use crate::registry::{ComponentSpec, MarkSpec};
use crate::state::{State, StateData};

#[derive(Debug, Clone)]
pub enum Step {
    /// Replace the content of a confined range with `nodes`.
    Replace { range: Range, nodes: Vec<NodeRef> },
    /// Delete the content of a confined range.
    Remove { range: Range },
    /// Add or remove a mark over a confined range. A collapsed range
    /// leaves a placeholder carrying the toggled marks.
    Mark {
        range: Range,
        mark: Mark,
        action: MarkAction,
    },
    /// Split at a position. With `split_parent` the parent element becomes
    /// two siblings; without, only a text run at the position is cut.
    Split {
        position: Position,
        split_parent: bool,
    },
    /// Cut a confined range and reinsert it at `target`.
    Move { range: Range, target: Position },
    /// Set (`Some`) or remove (`None`) an attribute of the node at `path`.
    Attribute {
        path: Vec<usize>,
        name: String,
        value: Option<String>,
    },
    /// Set (`Some`) or remove (`None`) a state entry of the inline
    /// component at `path`.
    ComponentState {
        path: Vec<usize>,
        key: String,
        value: Option<String>,
    },
    Selection(Selection),
    Config { key: String, value: Option<String> },
    RegisterMark(MarkSpec),
    RegisterComponent(ComponentSpec),
    /// Swap in the document and selection of the checkpoint `depth` links
    /// back.
    Restore { depth: usize },
}

pub struct StepOutcome {
    pub state: State,
    pub mapper: RangeMapper,
    pub range: Option<Range>,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Replace { .. } => "replace",
            Step::Remove { .. } => "remove",
            Step::Mark { .. } => "mark",
            Step::Split { .. } => "split",
            Step::Move { .. } => "move",
            Step::Attribute { .. } => "attribute",
            Step::ComponentState { .. } => "component-state",
            Step::Selection(_) => "selection",
            Step::Config { .. } => "config",
            Step::RegisterMark(_) => "register-mark",
            Step::RegisterComponent(_) => "register-component",
            Step::Restore { .. } => "restore",
        }
    }

    /// True for steps that change the document tree.
    pub fn is_document_step(&self) -> bool {
        matches!(
            self,
            Step::Replace { .. }
                | Step::Remove { .. }
                | Step::Mark { .. }
                | Step::Split { .. }
                | Step::Move { .. }
                | Step::Attribute { .. }
                | Step::ComponentState { .. }
        )
    }

    pub fn apply(&self, state: &State) -> Result<StepOutcome> {
        log::trace!("applying {} step", self.name());
        let document = state.document();
        match self {
            Step::Replace { range, nodes } => {
                let range = range.rerooted(document)?;
                replace(state, &range, nodes.clone(), "replace")
            }
            Step::Remove { range } => {
                let range = range.rerooted(document)?;
                replace(state, &range, Vec::new(), "remove")
            }
            Step::Mark {
                range,
                mark,
                action,
            } => {
                let range = range.rerooted(document)?;
                apply_mark(state, &range, mark, *action)
            }
            Step::Split {
                position,
                split_parent,
            } => {
                let position = position.rerooted(document)?;
                if *split_parent {
                    split_parent_at(state, &position)
                } else {
                    split_text_at(state, &position)
                }
            }
            Step::Move { range, target } => {
                let range = range.rerooted(document)?;
                let target = target.rerooted(document)?;
                move_range(state, &range, &target)
            }
            Step::Attribute { path, name, value } => {
                let updated = document.update_node(path, |node| {
                    Ok(node.with_attribute(name, value.as_deref()))
                })?;
                let range = match updated.node_at(path) {
                    Some(node) if !path.is_empty() => {
                        Some(Range::from_around_node(&updated, &node)?)
                    }
                    _ => None,
                };
                document_outcome(state, updated.clone(), RangeMapper::onto(updated), range)
            }
            Step::ComponentState { path, key, value } => {
                let updated = document.update_node(path, |node| match node {
                    Node::Inline(component) => {
                        Ok(Node::Inline(component.with_state(key, value.as_deref())))
                    }
                    other => Err(EngineError::assertion(format!(
                        "a {} node has no component state",
                        other.kind()
                    ))),
                })?;
                let node = updated
                    .node_at(path)
                    .ok_or_else(|| EngineError::stale(path, "component vanished"))?;
                let range = Range::from_around_node(&updated, &node)?;
                document_outcome(state, updated.clone(), RangeMapper::onto(updated), Some(range))
            }
            Step::Selection(selection) => {
                let selection = selection.rerooted(document)?;
                let range = selection.primary().cloned();
                let mut data = state.edit();
                data.selection = selection;
                Ok(plain_outcome(data, range))
            }
            Step::Config { key, value } => {
                let mut data = state.edit();
                match value {
                    Some(value) => data.config.insert(key.clone(), value.clone()),
                    None => data.config.remove(key),
                };
                Ok(plain_outcome(data, None))
            }
            Step::RegisterMark(spec) => {
                let mut data = state.edit();
                data.marks = data.marks.with(spec.clone());
                Ok(plain_outcome(data, None))
            }
            Step::RegisterComponent(spec) => {
                let mut data = state.edit();
                data.components = data.components.with(spec.clone());
                Ok(plain_outcome(data, None))
            }
            Step::Restore { depth } => {
                let target = state.checkpoint(*depth)?;
                let mut data = state.edit();
                data.document = target.document().clone();
                data.selection = target.selection().clone();
                data.previous = target.previous_state().cloned();
                log::debug!("restoring checkpoint {depth} back");
                Ok(StepOutcome {
                    mapper: RangeMapper::new(MapRule::Reroot, data.document.clone()),
                    state: data.finish(),
                    range: None,
                })
            }
        }
    }
}

fn plain_outcome(data: StateData, range: Option<Range>) -> StepOutcome {
    StepOutcome {
        state: data.finish(),
        mapper: RangeMapper::identity(),
        range,
    }
}

/// Successor state over `document`, with the selection mapped across.
fn document_outcome(
    state: &State,
    document: Tree,
    mapper: RangeMapper,
    range: Option<Range>,
) -> Result<StepOutcome> {
    let mut data = state.edit();
    data.selection = state.selection().mapped(&mapper)?;
    data.document = document;
    Ok(StepOutcome {
        state: data.finish(),
        mapper,
        range,
    })
}

fn require_confined(range: &Range, operation: &'static str) -> Result<()> {
    if range.is_confined() {
        Ok(())
    } else {
        Err(EngineError::Unconfined { operation })
    }
}

fn at(document: &Tree, parent: &[usize], offset: usize) -> Result<Position> {
    let mut path = parent.to_vec();
    path.push(offset);
    Position::from_path(document, path)
}

fn replace(
    state: &State,
    range: &Range,
    nodes: Vec<NodeRef>,
    operation: &'static str,
) -> Result<StepOutcome> {
    require_confined(range, operation)?;
    let nodes = detach(state.document(), nodes);
    let parent = range.start().parent_path().to_vec();
    let (start, end) = (range.start().parent_offset(), range.end().parent_offset());
    let inserted: usize = nodes.iter().map(|node| node.offset_size()).sum();

    let updated = state.document().update_element(&parent, |element| {
        Ok(element.with_children(surgery::splice(element, start, end, nodes)))
    })?;
    let result = Range::new(
        at(&updated, &parent, start)?,
        at(&updated, &parent, start + inserted)?,
    )?;
    let mapper = RangeMapper::new(
        MapRule::Splice {
            parent,
            start,
            end,
            inserted,
        },
        updated.clone(),
    );
    document_outcome(state, updated, mapper, Some(result))
}

/// Copies of every incoming node the document already holds, or that
/// appears twice in `nodes`, so each node sits at one place in the tree.
fn detach(document: &Tree, nodes: Vec<NodeRef>) -> Vec<NodeRef> {
    let mut seen = HashSet::new();
    nodes
        .into_iter()
        .map(|node| detach_node(document, node, &mut seen))
        .collect()
}

fn detach_node(document: &Tree, node: NodeRef, seen: &mut HashSet<*const Node>) -> NodeRef {
    let shared = document.contains(&node) || !seen.insert(Arc::as_ptr(&node));
    if let Node::Element(element) = &*node {
        let children: Vec<NodeRef> = element
            .children()
            .iter()
            .map(|child| detach_node(document, child.clone(), seen))
            .collect();
        let rebuilt = children
            .iter()
            .zip(element.children())
            .any(|(new, old)| !Arc::ptr_eq(new, old));
        if rebuilt {
            return Arc::new(Node::Element(element.with_children(children)));
        }
    }
    if shared {
        log::trace!("copying a {} node already in the document", node.kind());
        Arc::new((*node).clone())
    } else {
        node
    }
}

fn apply_mark(
    state: &State,
    range: &Range,
    mark: &Mark,
    action: MarkAction,
) -> Result<StepOutcome> {
    require_confined(range, "mark")?;
    let parent = range.start().parent_path().to_vec();
    let (start, end) = (range.start().parent_offset(), range.end().parent_offset());

    let updated = if range.is_collapsed() {
        let marks = action.apply(&range.get_marks(), mark);
        let placeholder = Node::marked_text("", marks);
        state.document().update_element(&parent, |element| {
            Ok(element.with_children(surgery::splice(element, start, start, vec![placeholder])))
        })?
    } else {
        state.document().update_element(&parent, |element| {
            Ok(element.with_children(surgery::apply_mark(element, start, end, mark, action)))
        })?
    };
    let result = range.rerooted(&updated)?;
    document_outcome(state, updated.clone(), RangeMapper::onto(updated), Some(result))
}

fn split_text_at(state: &State, position: &Position) -> Result<StepOutcome> {
    if position.text_at().is_none() {
        let result = Range::collapsed(position.clone());
        return Ok(StepOutcome {
            state: state.clone(),
            mapper: RangeMapper::identity(),
            range: Some(result),
        });
    }
    let parent = position.parent_path().to_vec();
    let offset = position.parent_offset();
    let updated = state.document().update_element(&parent, |element| {
        let (left, right) = surgery::split_children(element, offset);
        Ok(element.with_children(left.into_iter().chain(right).collect()))
    })?;
    let result = Range::collapsed(at(&updated, &parent, offset)?);
    document_outcome(state, updated.clone(), RangeMapper::onto(updated), Some(result))
}

fn split_parent_at(state: &State, position: &Position) -> Result<StepOutcome> {
    if position.depth() == 0 {
        return Err(EngineError::assertion("the document root cannot be split"));
    }
    let parent = position.parent_path().to_vec();
    let offset = position.parent_offset();
    let (grandparent, parent_offset) = parent.split_at(parent.len() - 1);
    let parent_offset = parent_offset[0];
    let element = position.parent_element()?;
    let (left, right) = surgery::split_children(element, offset);
    let left = Arc::new(Node::Element(element.with_children(left)));
    let right = Arc::new(Node::Element(element.with_children(right)));

    let updated = state.document().update_element(grandparent, |outer| {
        let (index, _) = outer
            .element_at(parent_offset)
            .ok_or_else(|| EngineError::stale(&parent, "split parent vanished"))?;
        let mut children = outer.children().to_vec();
        children[index] = left;
        children.insert(index + 1, right);
        Ok(outer.with_children(children))
    })?;
    let result = Range::collapsed(at(&updated, grandparent, parent_offset + 1)?);
    let mapper = RangeMapper::new(MapRule::Split { parent, offset }, updated.clone());
    document_outcome(state, updated, mapper, Some(result))
}

fn move_range(state: &State, range: &Range, target: &Position) -> Result<StepOutcome> {
    require_confined(range, "move")?;
    let parent = range.start().parent_path().to_vec();
    let (start, end) = (range.start().parent_offset(), range.end().parent_offset());

    let target_path = target.path();
    if target_path.len() > parent.len() + 1 && target_path.starts_with(&parent) {
        let offset = target_path[parent.len()];
        if start <= offset && offset < end {
            return Err(EngineError::assertion("cannot move content into itself"));
        }
    }

    let document = state.document();
    let element = range.start().parent_element()?;
    let moved = surgery::extract(element, start, end);
    let size: usize = moved.iter().map(|node| node.offset_size()).sum();

    let cut = MapRule::Splice {
        parent: parent.clone(),
        start,
        end,
        inserted: 0,
    };
    let destination = cut.map_path(target_path, Bias::Left);
    let without = document.update_element(&parent, |element| {
        Ok(element.with_children(surgery::splice(element, start, end, Vec::new())))
    })?;

    let (dest_parent, dest_offset) = destination.split_at(destination.len() - 1);
    let dest_offset = dest_offset[0];
    let updated = without.update_element(dest_parent, |element| {
        Ok(element.with_children(surgery::splice(element, dest_offset, dest_offset, moved)))
    })?;

    let result = Range::new(
        at(&updated, dest_parent, dest_offset)?,
        at(&updated, dest_parent, dest_offset + size)?,
    )?;
    let mapper = RangeMapper::new(
        MapRule::Move {
            parent,
            start,
            end,
            destination: destination.clone(),
        },
        updated.clone(),
    );
    document_outcome(state, updated, mapper, Some(result))
}
