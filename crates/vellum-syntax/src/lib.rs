//! # vellum-syntax
//!
//! Lexer and parser for the angle-bracket notation used to write vellum
//! documents in tests, fixtures and benchmarks.
//!
//! The notation is a small XML-like language:
//!
//! ```text
//! <p>Hello <strong>world</strong><br/></p>
//! ```
//!
//! This crate knows nothing about documents, marks or schemas. It turns
//! source text into a plain [`MarkupNode`] tree and leaves interpretation to
//! the engine's notation bridge.
//!
//! ## Pipeline
//!
//! ```text
//! Source Text → Lexer → Tokens → Parser → MarkupNode tree
//!               (Logos)          (stack of open elements)
//! ```
//!
//! - [`lexer`]: lossless tokenizer built with [Logos](https://docs.rs/logos)
//! - [`parser`]: builds the tree, decoding entities in text and attributes
//!
//! ## Example
//!
//! ```
//! use vellum_syntax::{MarkupNode, parse};
//!
//! let nodes = parse("<p class=\"lead\">a &amp; b</p>").unwrap();
//! let MarkupNode::Element(p) = &nodes[0] else { panic!() };
//! assert_eq!(p.name, "p");
//! assert_eq!(p.attribute("class"), Some("lead"));
//! ```

pub mod error;
pub mod lexer;
pub mod parser;

pub use error::ParseError;
pub use parser::{MarkupElement, MarkupNode, MarkupText, parse};
