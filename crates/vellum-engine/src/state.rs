//! # State - Immutable Editor Snapshots
//!
//! A [`State`] bundles everything a transaction reads: the document, the
//! selection, the mark and component registries, a string-keyed
//! configuration map and the engine settings. States are shared through an
//! `Arc` and never change once built; steps produce new ones through
//! [`State::edit`] and [`StateData::finish`].
//!
//! Committed snapshot transactions link their result back to the state they
//! started from. Walking [`State::previous_state`] therefore visits earlier
//! checkpoints, which is what undo restores.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;
use vellum_config::Config;

use crate::addressing::Selection;
use crate::error::{EngineError, Result};
use crate::model::{Mark, ROOT_KIND, Tree};
use crate::registry::{ComponentSpec, MarkSpec, Registry};
use crate::settings::EngineSettings;
use crate::transaction::Transaction;

#[derive(Clone)]
pub struct State(Arc<StateInner>);

struct StateInner {
    id: Uuid,
    data: StateData,
}

/// The mutable working copy of a state, used while a step builds its
/// successor.
#[derive(Clone)]
pub struct StateData {
    pub document: Tree,
    pub selection: Selection,
    pub marks: Registry<MarkSpec>,
    pub components: Registry<ComponentSpec>,
    pub config: BTreeMap<String, String>,
    pub settings: Arc<EngineSettings>,
    pub previous: Option<State>,
}

impl StateData {
    /// Seal into a new state with a fresh id.
    pub fn finish(self) -> State {
        State(Arc::new(StateInner {
            id: Uuid::new_v4(),
            data: self,
        }))
    }
}

impl State {
    /// A state over `document` with default settings and an empty selection.
    pub fn new(document: Tree) -> State {
        State::with_settings(document, EngineSettings::default())
    }

    pub fn with_settings(document: Tree, settings: EngineSettings) -> State {
        StateData {
            document,
            selection: Selection::default(),
            marks: Registry::default(),
            components: Registry::default(),
            config: BTreeMap::new(),
            settings: Arc::new(settings),
            previous: None,
        }
        .finish()
    }

    /// An empty document configured from a host [`Config`].
    pub fn from_config(config: &Config) -> State {
        let settings = EngineSettings::from(config);
        let root = settings.schema.element(ROOT_KIND, Default::default(), Vec::new());
        State::with_settings(Tree::new(root), settings)
    }

    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn document(&self) -> &Tree {
        &self.0.data.document
    }

    pub fn selection(&self) -> &Selection {
        &self.0.data.selection
    }

    pub fn marks(&self) -> &Registry<MarkSpec> {
        &self.0.data.marks
    }

    pub fn components(&self) -> &Registry<ComponentSpec> {
        &self.0.data.components
    }

    pub fn config(&self, key: &str) -> Option<&str> {
        self.0.data.config.get(key).map(String::as_str)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.0.data.settings
    }

    pub fn previous_state(&self) -> Option<&State> {
        self.0.data.previous.as_ref()
    }

    /// The checkpoint `n` links back; `0` is this state.
    pub fn nth_previous(&self, n: usize) -> Option<&State> {
        let mut state = self;
        for _ in 0..n {
            state = state.previous_state()?;
        }
        Some(state)
    }

    /// Number of checkpoints reachable behind this state.
    pub fn history_len(&self) -> usize {
        let mut len = 0;
        let mut state = self;
        while let Some(previous) = state.previous_state() {
            len += 1;
            state = previous;
        }
        len
    }

    pub fn mark_spec(&self, name: &str) -> Option<&MarkSpec> {
        self.0.data.marks.get(name)
    }

    pub fn component_spec(&self, name: &str) -> Option<&ComponentSpec> {
        self.0.data.components.get(name)
    }

    /// A mark for `name`, carrying the registered authority when there is
    /// one.
    pub fn create_mark(&self, name: &str) -> Mark {
        match self.mark_spec(name) {
            Some(spec) => spec.mark(),
            None => Mark::new(name),
        }
    }

    pub fn create_transaction(&self) -> Transaction {
        Transaction::new(self.clone())
    }

    /// Working copy for building a successor.
    pub fn edit(&self) -> StateData {
        self.0.data.clone()
    }

    /// The same state with at most `depth` checkpoints behind it.
    ///
    /// Kept checkpoints are relinked, not rebuilt: ids are preserved.
    pub fn with_history_limit(&self, depth: usize) -> State {
        if self.history_len() <= depth {
            return self.clone();
        }
        log::debug!("pruning undo history to {depth} checkpoints");
        self.relinked(depth)
    }

    fn relinked(&self, depth: usize) -> State {
        let mut data = self.0.data.clone();
        data.previous = match (&self.0.data.previous, depth) {
            (_, 0) | (None, _) => None,
            (Some(previous), _) => Some(previous.relinked(depth - 1)),
        };
        State(Arc::new(StateInner { id: self.0.id, data }))
    }

    pub(crate) fn checkpoint(&self, depth: usize) -> Result<&State> {
        self.nth_previous(depth).ok_or_else(|| {
            EngineError::assertion(format!("no checkpoint {depth} states back"))
        })
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("id", &self.0.id)
            .field("document", &self.0.data.document)
            .field("selection", &self.0.data.selection)
            .field("history", &self.history_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notation::parse_document;
    use pretty_assertions::assert_eq;

    fn chain(len: usize) -> State {
        let mut state = State::new(parse_document("<p>0</p>").unwrap());
        for _ in 0..len {
            let mut data = state.edit();
            data.previous = Some(state.clone());
            state = data.finish();
        }
        state
    }

    #[test]
    fn test_nth_previous_walks_checkpoints() {
        let state = chain(3);
        assert_eq!(state.history_len(), 3);
        assert_eq!(state.nth_previous(0), Some(&state));
        assert_eq!(state.nth_previous(1), state.previous_state());
        assert!(state.nth_previous(3).is_some());
        assert!(state.nth_previous(4).is_none());
        assert!(matches!(state.checkpoint(4), Err(EngineError::Assertion(_))));
    }

    #[test]
    fn test_with_history_limit_keeps_ids() {
        let state = chain(5);
        let pruned = state.with_history_limit(2);

        assert_eq!(pruned.history_len(), 2);
        assert_eq!(pruned.id(), state.id());
        assert_eq!(
            pruned.previous_state().map(State::id),
            state.previous_state().map(State::id)
        );
        assert_eq!(state.with_history_limit(0).history_len(), 0);
    }

    #[test]
    fn test_create_mark_uses_registered_authority() {
        let state = State::new(parse_document("<p>x</p>").unwrap());
        assert_eq!(state.create_mark("bold").authority, "core");

        let mut data = state.edit();
        data.marks = data.marks.with(MarkSpec::new("comment").with_authority("review"));
        let state = data.finish();
        assert_eq!(state.create_mark("comment").authority, "review");
    }

    #[test]
    fn test_from_config_builds_empty_root() {
        let mut config = Config::default();
        config.editor.undo_depth = 7;
        let state = State::from_config(&config);

        assert_eq!(state.document().root().kind(), ROOT_KIND);
        assert_eq!(state.document().root().max_offset(), 0);
        assert_eq!(state.settings().undo_depth, 7);
        assert!(state.selection().is_empty());
    }
}
