//! # Transaction - Building a New State
//!
//! A [`Transaction`] starts from one [`State`] and collects [`Step`]s.
//! Every step runs as soon as it is appended, against the state the
//! previous step produced, so later primitives in the same transaction see
//! earlier edits. [`Transaction::apply`] reads the latest derived state at
//! any point without finishing anything.
//!
//! ## Lifecycle
//!
//! ```text
//!   create_transaction()
//!          |
//!          v
//!     [ building ] --primitive--> step appended, applied, range returned
//!          |
//!          +--rollback()--> initial state, steps discarded
//!          |
//!          v
//!      commit() --> step listeners until quiet --> Commit
//!                                                  (state + mapper)
//! ```
//!
//! Ranges and positions handed to primitives may belong to any tree the
//! transaction has produced so far (or to a foreign tree of the same
//! shape); they are carried into the current tree before use and the
//! caller's copies are never touched.
//!
//! ## Listeners
//!
//! Step listeners see each step appended since they were last called and
//! may append more. Passes repeat until one adds nothing; more than
//! `max_listener_passes` passes fails the commit with
//! [`EngineError::ListenerLoop`].

mod primitives;

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::addressing::{Position, Range};
use crate::error::{EngineError, Result};
use crate::mapping::{Bias, RangeMapper};
use crate::model::{NodeRef, Tree};
use crate::state::State;
use crate::steps::Step;

/// Called with the steps appended since the listener last ran.
pub type StepListener = Rc<dyn Fn(&mut Transaction, &[Step]) -> Result<()>>;

/// Called once a transaction has been committed.
pub type DispatchListener = Rc<dyn Fn(&Commit)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// The result of a committed transaction.
#[derive(Debug, Clone)]
pub struct Commit {
    pub state: State,
    /// Carries positions from the initial document to the final one.
    pub mapper: RangeMapper,
    pub steps: Vec<Step>,
}

pub struct Transaction {
    initial: State,
    steps: Vec<Step>,
    /// `states[i]` is the state after `steps[i]`.
    states: Vec<State>,
    /// `mappers[i]` carries positions across `steps[i]`.
    mappers: Vec<RangeMapper>,
    snapshot: bool,
    step_listeners: Vec<(ListenerId, StepListener)>,
    dispatch_listeners: Vec<DispatchListener>,
    next_listener: u64,
}

impl Transaction {
    pub fn new(initial: State) -> Self {
        let snapshot = initial.settings().snapshot_by_default;
        Self {
            initial,
            steps: Vec::new(),
            states: Vec::new(),
            mappers: Vec::new(),
            snapshot,
            step_listeners: Vec::new(),
            dispatch_listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub fn initial(&self) -> &State {
        &self.initial
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_snapshot(&self) -> bool {
        self.snapshot
    }

    /// Whether the committed state links back to the initial one.
    pub fn set_snapshot(&mut self, snapshot: bool) {
        self.snapshot = snapshot;
    }

    /// The latest derived state.
    pub fn apply(&self) -> State {
        self.states
            .last()
            .cloned()
            .unwrap_or_else(|| self.initial.clone())
    }

    pub fn document(&self) -> Tree {
        self.apply().document().clone()
    }

    /// Composition of every step's mapper so far.
    pub fn mapping(&self) -> RangeMapper {
        self.mapping_from(0)
    }

    fn mapping_from(&self, index: usize) -> RangeMapper {
        RangeMapper::compose(self.mappers[index..].iter().cloned())
    }

    /// Append `step` and run it against the latest state. Returns the
    /// step's default range.
    ///
    /// A failing step leaves the transaction as it was.
    pub fn step(&mut self, step: Step) -> Result<Option<Range>> {
        let outcome = step.apply(&self.apply())?;
        log::debug!("step {}: {}", self.steps.len(), step.name());
        self.steps.push(step);
        self.states.push(outcome.state);
        self.mappers.push(outcome.mapper);
        Ok(outcome.range)
    }

    /// Every document this transaction has seen, oldest first.
    fn documents(&self) -> Vec<&Tree> {
        std::iter::once(self.initial.document())
            .chain(self.states.iter().map(State::document))
            .collect()
    }

    fn document_index(&self, tree: &Tree) -> Option<usize> {
        self.documents()
            .iter()
            .rposition(|document| document.same(tree))
    }

    /// `position` carried into the current document.
    pub fn clone_position(&self, position: &Position, bias: Bias) -> Result<Position> {
        match self.document_index(position.tree()) {
            Some(index) => self.mapping_from(index).map_position(position, bias),
            None => {
                log::debug!("re-rooting foreign position {position}");
                position.rerooted_clamped(&self.document())
            }
        }
    }

    /// `range` carried into the current document.
    pub fn clone_range(&self, range: &Range) -> Result<Range> {
        match self.document_index(range.tree()) {
            Some(index) => self.mapping_from(index).map_range(range),
            None => {
                log::debug!("re-rooting foreign range {range:?}");
                range.rerooted_clamped(&self.document())
            }
        }
    }

    /// Path of `node` in the current document, following it from whichever
    /// document of this transaction it was taken from.
    ///
    /// Fails with [`EngineError::StalePath`] when a later step removed the
    /// node: its two edges no longer enclose exactly its offset size.
    pub fn node_path(&self, node: &NodeRef) -> Result<Vec<usize>> {
        for (index, document) in self.documents().iter().enumerate().rev() {
            if Arc::ptr_eq(document.root(), node) {
                return Ok(Vec::new());
            }
            if document.contains(node) {
                let mapper = self.mapping_from(index);
                let before = mapper
                    .map_position(&Position::from_before_node(document, node)?, Bias::Right)?;
                let after = mapper
                    .map_position(&Position::from_after_node(document, node)?, Bias::Left)?;
                if before.parent_path() != after.parent_path()
                    || after.parent_offset() != before.parent_offset() + node.offset_size()
                {
                    return Err(EngineError::stale(before.path(), "node was removed"));
                }
                return Ok(before.path().to_vec());
            }
        }
        Err(EngineError::stale(&[], "node is not part of this transaction"))
    }

    /// The current version of `node` and the range around it.
    pub(crate) fn locate(&self, node: &NodeRef) -> Result<(NodeRef, Range)> {
        let path = self.node_path(node)?;
        if path.is_empty() {
            return Err(EngineError::assertion("the document root has no range around it"));
        }
        let document = self.document();
        let current = document
            .node_at(&path)
            .ok_or_else(|| EngineError::stale(&path, "node was removed"))?;
        let range = Range::from_around_node(&document, &current)?;
        Ok((current, range))
    }

    pub fn add_step_listener(&mut self, listener: StepListener) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.step_listeners.push((id, listener));
        id
    }

    pub fn remove_step_listener(&mut self, id: ListenerId) -> bool {
        let before = self.step_listeners.len();
        self.step_listeners.retain(|(listener, _)| *listener != id);
        self.step_listeners.len() != before
    }

    pub fn add_dispatch_listener(&mut self, listener: DispatchListener) {
        self.dispatch_listeners.push(listener);
    }

    /// Notify step listeners until a full pass appends nothing.
    fn run_step_listeners(&mut self) -> Result<()> {
        let max_passes = self.initial.settings().max_listener_passes;
        let mut seen: HashMap<ListenerId, usize> = HashMap::new();
        let mut passes = 0;

        loop {
            let before = self.steps.len();
            let listeners = self.step_listeners.clone();
            let mut notified = false;

            for (id, listener) in listeners {
                let from = seen.get(&id).copied().unwrap_or(0);
                if from >= self.steps.len() {
                    continue;
                }
                if !notified {
                    passes += 1;
                    if passes > max_passes {
                        log::warn!("step listeners did not settle after {max_passes} passes");
                        return Err(EngineError::ListenerLoop { passes: max_passes });
                    }
                    notified = true;
                }
                let fresh = self.steps[from..].to_vec();
                listener(self, &fresh)?;
                seen.insert(id, self.steps.len());
            }

            if self.steps.len() == before {
                log::trace!("step listeners settled after {passes} passes");
                return Ok(());
            }
        }
    }

    /// Finish the transaction.
    ///
    /// Step listeners run first. With the snapshot flag set the result
    /// links back to the initial state as its checkpoint. Dispatch
    /// listeners see the commit before it is returned.
    pub fn commit(mut self) -> Result<Commit> {
        self.run_step_listeners()?;

        let state = if self.steps.is_empty() {
            self.initial.clone()
        } else {
            let mut data = self.apply().edit();
            if self.snapshot {
                data.previous = Some(self.initial.clone());
            }
            data.finish()
        };
        log::debug!(
            "committing {} steps (snapshot: {})",
            self.steps.len(),
            self.snapshot
        );

        let commit = Commit {
            state,
            mapper: self.mapping(),
            steps: std::mem::take(&mut self.steps),
        };
        for listener in &self.dispatch_listeners {
            listener(&commit);
        }
        Ok(commit)
    }

    /// Discard every step, returning the initial state.
    pub fn rollback(self) -> State {
        log::debug!("rolling back {} steps", self.steps.len());
        self.initial
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("initial", &self.initial.id())
            .field("steps", &self.steps.len())
            .field("snapshot", &self.snapshot)
            .field("listeners", &self.step_listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Node;
    use crate::notation::parse_document;
    use pretty_assertions::assert_eq;
    use std::cell::{Cell, RefCell};

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn state(notation: &str) -> State {
        State::new(parse_document(notation).unwrap())
    }

    fn caret(tree: &Tree, path: &[usize]) -> Range {
        Range::collapsed(Position::from_path(tree, path.to_vec()).unwrap())
    }

    #[test]
    fn test_apply_sees_every_step() {
        init_logging();
        let state = state("<p>ab</p>");
        let mut tx = state.create_transaction();
        let at = caret(state.document(), &[0, 1]);

        tx.insert_text(&at, "1", None).unwrap();
        assert_eq!(tx.apply().document().to_string(), "<p>a1b</p>");
        tx.insert_text(&at, "2", None).unwrap();
        assert_eq!(tx.apply().document().to_string(), "<p>a12b</p>");
        assert_eq!(tx.steps().len(), 2);
        // the initial state is untouched
        assert_eq!(state.document().to_string(), "<p>ab</p>");
    }

    #[test]
    fn test_clone_range_maps_old_ranges_forward() {
        let state = state("<p>hello</p>");
        let mut tx = state.create_transaction();
        let end = caret(state.document(), &[0, 5]);

        tx.insert_text(&caret(state.document(), &[0, 0]), ">> ", None)
            .unwrap();
        let cloned = tx.clone_range(&end).unwrap();
        assert_eq!(cloned.start().path(), &[0, 8]);
        assert!(cloned.tree().same(&tx.document()));
    }

    #[test]
    fn test_foreign_ranges_are_rerooted_by_path() {
        let state = state("<p>hello</p>");
        let foreign = parse_document("<p>other text</p>").unwrap();
        let tx = state.create_transaction();

        let range = Range::from_paths(&foreign, vec![0, 2], vec![0, 9]).unwrap();
        let cloned = tx.clone_range(&range).unwrap();
        assert_eq!(cloned.start().path(), &[0, 2]);
        assert_eq!(cloned.end().path(), &[0, 5]);
    }

    #[test]
    fn test_node_path_follows_nodes_across_steps() {
        let state = state("<p>a</p><p>b</p>");
        let second = state.document().node_at(&[1]).unwrap();
        let mut tx = state.create_transaction();

        tx.insert_nodes(&caret(state.document(), &[0]), vec![Node::element("hr", vec![])])
            .unwrap();
        assert_eq!(tx.node_path(&second).unwrap(), vec![2]);
        assert_eq!(tx.node_path(state.document().root()).unwrap(), Vec::<usize>::new());
    }

    #[test]
    fn test_removed_nodes_are_stale() {
        let state = state("<p>a</p><p>b</p>");
        let first = state.document().node_at(&[0]).unwrap();
        let mut tx = state.create_transaction();
        tx.remove_nodes(&[first.clone()]).unwrap();
        assert_eq!(tx.document().to_string(), "<p>b</p>");

        assert!(matches!(tx.node_path(&first), Err(EngineError::StalePath { .. })));
        assert!(matches!(
            tx.set_attribute(&first, "class", "x"),
            Err(EngineError::StalePath { .. })
        ));
        assert!(matches!(
            tx.remove_nodes(&[first.clone()]),
            Err(EngineError::StalePath { .. })
        ));
        assert!(tx.collapse_in(&first, false).is_err());
        assert_eq!(tx.document().to_string(), "<p>b</p>");
    }

    #[test]
    fn test_node_path_survives_edits_next_to_the_node() {
        let state = state("<p>a</p><p>b</p><p>c</p>");
        let middle = state.document().node_at(&[1]).unwrap();
        let mut tx = state.create_transaction();
        tx.insert_nodes(&caret(state.document(), &[1]), vec![Node::element("hr", vec![])])
            .unwrap();
        tx.insert_nodes(&caret(state.document(), &[2]), vec![Node::element("hr", vec![])])
            .unwrap();
        tx.set_attribute(&middle, "class", "x").unwrap();
        assert_eq!(tx.node_path(&middle).unwrap(), vec![2]);
        assert_eq!(
            tx.document().to_string(),
            r#"<p>a</p><hr/><p class="x">b</p><hr/><p>c</p>"#
        );
    }

    #[test]
    fn test_failed_primitive_keeps_transaction_usable() {
        let state = state("<p>ab</p><p>cd</p>");
        let mut tx = state.create_transaction();
        let unconfined = Range::from_paths(state.document(), vec![0, 1], vec![1, 1]).unwrap();
        let target = Position::from_path(state.document(), vec![2]).unwrap();

        let error = tx.move_to_position(&unconfined, &target).unwrap_err();
        assert_eq!(error, EngineError::Unconfined { operation: "move" });
        assert!(tx.steps().is_empty());

        tx.insert_text(&caret(state.document(), &[1, 2]), "e", None)
            .unwrap();
        assert_eq!(tx.apply().document().to_string(), "<p>ab</p><p>cde</p>");
    }

    #[test]
    fn test_commit_links_checkpoint_only_with_snapshot() {
        let state = state("<p>a</p>");

        let mut tx = state.create_transaction();
        tx.insert_text(&caret(state.document(), &[0, 1]), "b", None)
            .unwrap();
        let committed = tx.commit().unwrap().state;
        assert_eq!(committed.previous_state(), Some(&state));

        let mut tx = committed.create_transaction();
        tx.set_snapshot(false);
        tx.insert_text(&caret(committed.document(), &[0, 2]), "c", None)
            .unwrap();
        let silent = tx.commit().unwrap().state;
        assert_eq!(silent.previous_state(), Some(&state));
        assert_eq!(silent.document().to_string(), "<p>abc</p>");
    }

    #[test]
    fn test_empty_commit_returns_initial_state() {
        let state = state("<p>a</p>");
        let commit = state.create_transaction().commit().unwrap();
        assert_eq!(commit.state, state);
        assert!(commit.mapper.is_identity());
    }

    #[test]
    fn test_rollback_discards_steps() {
        let state = state("<p>a</p>");
        let mut tx = state.create_transaction();
        tx.insert_text(&caret(state.document(), &[0, 0]), "z", None)
            .unwrap();
        assert_eq!(tx.rollback(), state);
    }

    #[test]
    fn test_commit_mapper_spans_all_steps() {
        let state = state("<p>abc</p>");
        let old = Position::from_path(state.document(), vec![0, 2]).unwrap();
        let mut tx = state.create_transaction();
        tx.insert_text(&caret(state.document(), &[0, 0]), "xy", None)
            .unwrap();
        tx.delete(&Range::from_paths(&tx.document(), vec![0, 0], vec![0, 1]).unwrap())
            .unwrap();
        let commit = tx.commit().unwrap();

        let mapped = commit.mapper.map_position(&old, Bias::Left).unwrap();
        assert_eq!(mapped.path(), &[0, 3]);
        assert!(mapped.tree().same(commit.state.document()));
    }

    #[test]
    fn test_listeners_see_only_new_steps() {
        let state = state("<p>a</p>");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut tx = state.create_transaction();

        let log = seen.clone();
        tx.add_step_listener(Rc::new(move |_tx: &mut Transaction, steps: &[Step]| {
            log.borrow_mut().push(steps.iter().map(Step::name).collect::<Vec<_>>());
            Ok(())
        }));
        tx.add_step_listener(Rc::new(|tx: &mut Transaction, steps: &[Step]| {
            if steps.iter().any(|step| matches!(step, Step::Replace { .. })) {
                tx.set_config("touched", Some("yes"))?;
            }
            Ok(())
        }));

        tx.insert_text(&caret(state.document(), &[0, 1]), "b", None)
            .unwrap();
        let commit = tx.commit().unwrap();

        assert_eq!(commit.state.config("touched"), Some("yes"));
        assert_eq!(*seen.borrow(), vec![vec!["replace"], vec!["config"]]);
    }

    #[test]
    fn test_removed_listener_is_not_called() {
        let state = state("<p>a</p>");
        let calls = Rc::new(Cell::new(0));
        let mut tx = state.create_transaction();

        let counter = calls.clone();
        let id = tx.add_step_listener(Rc::new(move |_: &mut Transaction, _: &[Step]| {
            counter.set(counter.get() + 1);
            Ok(())
        }));
        assert!(tx.remove_step_listener(id));
        assert!(!tx.remove_step_listener(id));

        tx.set_config("k", Some("v")).unwrap();
        tx.commit().unwrap();
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_dispatch_listeners_see_commit() {
        let state = state("<p>a</p>");
        let rendered = Rc::new(RefCell::new(String::new()));
        let mut tx = state.create_transaction();

        let sink = rendered.clone();
        tx.add_dispatch_listener(Rc::new(move |commit: &Commit| {
            *sink.borrow_mut() = commit.state.document().to_string();
        }));
        tx.insert_text(&caret(state.document(), &[0, 1]), "!", None)
            .unwrap();
        tx.commit().unwrap();
        assert_eq!(*rendered.borrow(), "<p>a!</p>");
    }
}
