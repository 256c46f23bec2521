//! Addressing: positions, ranges and selections over a [`Tree`](crate::model::Tree).

pub mod position;
pub mod range;
pub mod selection;

pub use position::Position;
pub use range::{ContextStrategy, Range, Stickiness};
pub use selection::Selection;
