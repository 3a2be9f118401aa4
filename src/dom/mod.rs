//! In-memory HTML document model
//!
//! A mutable arena document tree, parsed and serialized with html5ever, and
//! a small CSS selector engine. It provides the query and mutation surface the
//! template dispatcher renders into.

mod document;
mod parser;
pub mod selection;
pub mod selector;
mod serialize;

pub use document::{Document, Element, NodeId, NodeKind};
pub use selection::Selection;
pub use selector::{Selector, SelectorError};
