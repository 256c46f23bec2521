//! An editing session: the current state plus the listeners every
//! transaction it opens should carry.

use std::rc::Rc;

use crate::error::Result;
use crate::state::State;
use crate::transaction::{Commit, DispatchListener, StepListener, Transaction};

pub struct Editor {
    state: State,
    step_listeners: Vec<StepListener>,
    dispatch_listeners: Vec<DispatchListener>,
}

impl Editor {
    pub fn new(state: State) -> Self {
        Self {
            state,
            step_listeners: Vec::new(),
            dispatch_listeners: Vec::new(),
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn add_step_listener(&mut self, listener: StepListener) {
        self.step_listeners.push(listener);
    }

    pub fn add_dispatch_listener(&mut self, listener: DispatchListener) {
        self.dispatch_listeners.push(listener);
    }

    /// A transaction on the current state with the session's listeners
    /// attached.
    pub fn transaction(&self) -> Transaction {
        let mut tx = self.state.create_transaction();
        for listener in &self.step_listeners {
            tx.add_step_listener(Rc::clone(listener));
        }
        for listener in &self.dispatch_listeners {
            tx.add_dispatch_listener(Rc::clone(listener));
        }
        tx
    }

    /// Commit `tx` and make its result the current state.
    ///
    /// History beyond `undo_depth` checkpoints is dropped. A failing commit
    /// leaves the session unchanged.
    pub fn dispatch(&mut self, tx: Transaction) -> Result<Commit> {
        let mut commit = tx.commit()?;
        commit.state = commit
            .state
            .with_history_limit(commit.state.settings().undo_depth);
        self.state = commit.state.clone();
        Ok(commit)
    }

    pub fn can_undo(&self) -> bool {
        self.state.previous_state().is_some()
    }

    /// Restore the previous checkpoint. Returns `false` when there is none.
    pub fn undo(&mut self) -> Result<bool> {
        if !self.can_undo() {
            return Ok(false);
        }
        let mut tx = self.transaction();
        tx.set_snapshot(false);
        tx.restore_snapshot(1)?;
        self.dispatch(tx)?;
        log::debug!("undo: {} checkpoints left", self.state.history_len());
        Ok(true)
    }
}
