//! Structured-document editing engine.
//!
//! A document is an immutable [`Tree`] of elements, text runs and inline
//! components. Every edit is a [`Step`] applied inside a [`Transaction`],
//! which also maps positions held by callers through the edits made so far.
//! Committing a transaction yields a new [`State`]; the [`Editor`] keeps the
//! current state and walks back through snapshots for undo.
//!
//! ```
//! use vellum_engine::{Position, Range, State, notation::parse_document};
//!
//! let document = parse_document("<p>hello world</p>").unwrap();
//! let state = State::new(document.clone());
//! let p = document.node_at(&[0]).unwrap();
//!
//! let mut tx = state.create_transaction();
//! let at = Position::from_in_element(&document, &p, 5).unwrap();
//! tx.insert_text(&Range::collapsed(at), "X", None).unwrap();
//!
//! let commit = tx.commit().unwrap();
//! assert_eq!(commit.state.document().to_string(), "<p>helloX world</p>");
//! ```

pub mod addressing;
pub mod editor;
pub mod error;
pub mod mapping;
pub mod model;
pub mod notation;
pub mod registry;
pub mod settings;
pub mod state;
pub mod steps;
pub mod transaction;

pub use addressing::{ContextStrategy, Position, Range, Selection, Stickiness};
pub use editor::Editor;
pub use error::{EngineError, Result};
pub use mapping::{Bias, MapRule, RangeMapper};
pub use model::{
    Attributes, CORE_AUTHORITY, ElementNode, InlineComponent, Mark, MarkAction, MarkKey, MarkSet,
    Node, NodeRef, Schema, TextNode, Tree,
};
pub use registry::{ComponentSpec, MarkSpec, Registered, Registry};
pub use settings::EngineSettings;
pub use state::{State, StateData};
pub use steps::{Step, StepOutcome};
pub use transaction::{Commit, DispatchListener, ListenerId, StepListener, Transaction};
