//! Template action dispatch
//!
//! The [`Dispatcher`] owns a cache of compiled templates and applies one of
//! four actions to a target node:
//!
//! - `get` / `find`: list rendered nodes, optionally for one template key
//! - `compiled` / `store`: return a copy of the compiled-template cache
//! - `clear` / `empty` / `remove`: remove rendered nodes, evicting their
//!   compiled templates unless told otherwise
//! - anything else: compile the template once, render it with data and
//!   append, return or parse the result
//!
//! Rendered output is wrapped in a `div` tagged with the
//! [`MARKER_ATTR`] attribute, which is how later calls find it again.

mod action;
mod cache;
mod dispatcher;
mod options;

pub use action::Action;
pub use cache::{marker_value, CacheSnapshot, CompiledCache, MARKER_ATTR};
pub use dispatcher::{Dispatcher, Outcome, TemplateRef};
pub use options::{ConfigError, Options, OutputType, Overrides, RemoveType};
