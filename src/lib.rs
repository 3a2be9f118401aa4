//! handlebars-dom - Compiled-template rendering into HTML documents
//!
//! This library compiles Handlebars templates embedded in a document,
//! caches them per template key and renders them into target nodes.
//!
//! # Example
//!
//! ```rust
//! use handlebars_dom::render;
//! use serde_json::json;
//!
//! let html = render(
//!     r#"<script id="t1" type="text/x-handlebars"><b>{{name}}</b></script><div id="out"></div>"#,
//!     "#out",
//!     "#t1",
//!     &json!({"name": "x"}),
//! );
//! assert!(html.contains(r##"<div id="out"><div data-template-id="#t1"><b>x</b></div></div>"##));
//! ```

pub mod dispatch;
pub mod dom;
pub mod error;
pub mod loader;
pub mod template;

pub use dispatch::{Action, Dispatcher, Options, Outcome, Overrides, TemplateRef};
pub use dom::{Document, Selection};
pub use error::{CompileError, RenderError};
pub use loader::{FileLoader, LoadError, MarkupLoader};
pub use template::{compile, CompiledTemplate, HandlebarsCompiler, TemplateCompiler};

use serde_json::Value;

/// Render a template into a document with default options
///
/// Parses `html`, adds the template `template_key` to the first node matching
/// `target`, and returns the serialized document. Unresolvable targets or
/// templates leave the document unchanged.
pub fn render(html: &str, target: &str, template_key: &str, data: &Value) -> String {
    render_with_options(html, target, template_key, data, Options::default())
}

/// Render a template into a document with custom default options
///
/// # Example
///
/// ```rust
/// use handlebars_dom::{render_with_options, Options};
/// use handlebars_dom::dispatch::OutputType;
/// use serde_json::json;
///
/// let options = Options::new().with_output(OutputType::Raw);
/// let source = "<p id='t'>{{n}}</p><div id='out'></div>";
/// let html = render_with_options(source, "#out", "#t", &json!({"n": 1}), options);
/// // Raw output does not touch the document
/// assert_eq!(html, r#"<p id="t">{{n}}</p><div id="out"></div>"#);
/// ```
pub fn render_with_options(
    html: &str,
    target: &str,
    template_key: &str,
    data: &Value,
    options: Options,
) -> String {
    let mut doc = Document::parse(html);
    let target = doc.select(target);
    let mut dispatcher = Dispatcher::new().with_defaults(options);
    dispatcher.add(&mut doc, &target, template_key, data, &Overrides::new());
    doc.to_html()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_render_appends_into_target() {
        let html = render(
            r#"<ul id="list"></ul><template id="row"><li>{{name}}</li></template>"#,
            "#list",
            "#row",
            &json!({"name": "Ada"}),
        );
        assert_eq!(
            html,
            concat!(
                r##"<ul id="list"><div data-template-id="#row"><li>Ada</li></div></ul>"##,
                r#"<template id="row"><li>{{name}}</li></template>"#,
            )
        );
    }

    #[test]
    fn test_render_missing_target_leaves_document() {
        let source = r#"<p id="t">{{n}}</p>"#;
        assert_eq!(render(source, "#nowhere", "#t", &json!({"n": 1})), source);
    }

    #[test]
    fn test_render_empty_data_is_noop() {
        let source = r#"<p id="t">{{n}}</p><div id="out"></div>"#;
        assert_eq!(render(source, "#out", "#t", &json!({})), source);
    }
}
