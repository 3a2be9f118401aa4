//! Template compilation
//!
//! Compiles Handlebars markup into a [`CompiledTemplate`], a render function
//! from a JSON data value to an HTML fragment. The built-in compiler uses the
//! `handlebars` crate in its default (non-strict) mode: missing values render
//! as empty strings and `{{expr}}` output is HTML-escaped.
//!
//! # Example
//!
//! ```rust
//! use handlebars_dom::template::compile;
//! use serde_json::json;
//!
//! let template = compile("<b>{{name}}</b>").unwrap();
//! assert_eq!(template.render(&json!({"name": "x"})).unwrap(), "<b>x</b>");
//! ```

use std::fmt;
use std::sync::Arc;

use handlebars::Handlebars;
use serde_json::Value;

pub use crate::error::{CompileError, RenderError};

/// Registry name of the single template each compiled program holds
const TEMPLATE_NAME: &str = "template";

enum Program {
    Handlebars(Handlebars<'static>),
    Native(Box<dyn Fn(&Value) -> String + Send + Sync>),
}

/// A compiled template: renders data into an HTML fragment
///
/// Cloning is cheap; clones share the compiled program.
#[derive(Clone)]
pub struct CompiledTemplate {
    program: Arc<Program>,
}

impl CompiledTemplate {
    /// Wrap an arbitrary render function
    pub fn from_fn<F>(render: F) -> Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        Self {
            program: Arc::new(Program::Native(Box::new(render))),
        }
    }

    /// Render the template with `data` as its context
    pub fn render(&self, data: &Value) -> Result<String, RenderError> {
        match self.program.as_ref() {
            Program::Handlebars(registry) => Ok(registry.render(TEMPLATE_NAME, data)?),
            Program::Native(f) => Ok(f(data)),
        }
    }

    /// Whether both handles refer to the same compiled program
    pub fn ptr_eq(&self, other: &CompiledTemplate) -> bool {
        Arc::ptr_eq(&self.program, &other.program)
    }
}

impl fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.program.as_ref() {
            Program::Handlebars(_) => f.write_str("CompiledTemplate(<handlebars>)"),
            Program::Native(_) => f.write_str("CompiledTemplate(<fn>)"),
        }
    }
}

/// Compile template markup
pub fn compile(markup: &str) -> Result<CompiledTemplate, CompileError> {
    let mut registry = Handlebars::new();
    registry.register_template_string(TEMPLATE_NAME, markup)?;
    Ok(CompiledTemplate {
        program: Arc::new(Program::Handlebars(registry)),
    })
}

/// Turns template markup into a render function
///
/// Implementations must be deterministic and free of side effects on the
/// document.
pub trait TemplateCompiler {
    fn compile(&self, markup: &str) -> Result<CompiledTemplate, CompileError>;
}

/// The built-in compiler, backed by the `handlebars` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct HandlebarsCompiler;

impl TemplateCompiler for HandlebarsCompiler {
    fn compile(&self, markup: &str) -> Result<CompiledTemplate, CompileError> {
        compile(markup)
    }
}

impl<F> TemplateCompiler for F
where
    F: Fn(&str) -> Result<CompiledTemplate, CompileError>,
{
    fn compile(&self, markup: &str) -> Result<CompiledTemplate, CompileError> {
        self(markup)
    }
}
