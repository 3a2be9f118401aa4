//! The template action dispatcher

use serde_json::Value;
use tracing::{debug, trace, warn};

use super::action::Action;
use super::cache::{marker_value, CacheSnapshot, CompiledCache, MARKER_ATTR};
use super::options::{Options, OutputType, Overrides, RemoveType};
use crate::dom::{Document, NodeId, Selection};
use crate::loader::MarkupLoader;
use crate::template::{HandlebarsCompiler, TemplateCompiler};

/// Identifies a template: a selector key, or a selection of nodes
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TemplateRef {
    /// A selector whose first match holds the template markup
    Key(String),
    /// A node collection; its key is the selector it was created from
    Selection(Selection),
    /// No template given
    #[default]
    Absent,
}

impl TemplateRef {
    /// The cache key, if one can be resolved
    ///
    /// Blank keys and selections built without a selector resolve to `None`.
    pub fn key(&self) -> Option<String> {
        let key = match self {
            TemplateRef::Key(key) => key.as_str(),
            TemplateRef::Selection(sel) => sel.selector()?,
            TemplateRef::Absent => return None,
        };
        if key.trim().is_empty() {
            None
        } else {
            Some(key.to_string())
        }
    }

    /// The key that filters GET and scopes removal
    ///
    /// Only an explicit key string counts. A selection is a reference to
    /// template markup, not a filter, so GET returns every rendered node and
    /// removal clears them all.
    pub fn concrete_key(&self) -> Option<String> {
        match self {
            TemplateRef::Key(_) => self.key(),
            TemplateRef::Selection(_) | TemplateRef::Absent => None,
        }
    }

    /// The node holding the template markup
    fn source_node(&self, doc: &Document, key: &str) -> Option<NodeId> {
        match self {
            TemplateRef::Key(_) => doc.select(key).first_node(),
            TemplateRef::Selection(sel) => sel.first_node(),
            TemplateRef::Absent => None,
        }
    }
}

impl From<&str> for TemplateRef {
    fn from(key: &str) -> Self {
        TemplateRef::Key(key.to_string())
    }
}

impl From<String> for TemplateRef {
    fn from(key: String) -> Self {
        TemplateRef::Key(key)
    }
}

impl From<Selection> for TemplateRef {
    fn from(sel: Selection) -> Self {
        TemplateRef::Selection(sel)
    }
}

impl From<&Selection> for TemplateRef {
    fn from(sel: &Selection) -> Self {
        TemplateRef::Selection(sel.clone())
    }
}

impl From<Option<&str>> for TemplateRef {
    fn from(key: Option<&str>) -> Self {
        key.map_or(TemplateRef::Absent, TemplateRef::from)
    }
}

/// Result of a dispatcher call
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The target, returned by mutating actions and no-ops
    Target(Selection),
    /// Rendered nodes found by a get
    Nodes(Selection),
    /// Copy of the compiled-template cache
    Compiled(CacheSnapshot),
    /// Rendered fragment as a string
    Raw(String),
    /// Rendered fragment as a detached document
    Html(Document),
}

impl Outcome {
    /// The target selection, for outcomes that return it
    pub fn target(&self) -> Option<&Selection> {
        match self {
            Outcome::Target(sel) => Some(sel),
            _ => None,
        }
    }

    pub fn nodes(&self) -> Option<&Selection> {
        match self {
            Outcome::Nodes(sel) => Some(sel),
            _ => None,
        }
    }

    pub fn raw(&self) -> Option<&str> {
        match self {
            Outcome::Raw(s) => Some(s),
            _ => None,
        }
    }
}

/// Compiles, caches, renders and removes templates in a document
///
/// Every operation degrades to a no-op returning the target when its inputs
/// do not resolve; nothing here returns an error.
pub struct Dispatcher<C = HandlebarsCompiler> {
    compiler: C,
    cache: CompiledCache,
    defaults: Options,
}

impl Dispatcher<HandlebarsCompiler> {
    /// Create a dispatcher using the built-in compiler
    pub fn new() -> Self {
        Self::with_compiler(HandlebarsCompiler)
    }
}

impl Default for Dispatcher<HandlebarsCompiler> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: TemplateCompiler> Dispatcher<C> {
    /// Create a dispatcher with a custom compiler and an empty cache
    pub fn with_compiler(compiler: C) -> Self {
        Self {
            compiler,
            cache: CompiledCache::new(),
            defaults: Options::default(),
        }
    }

    /// Replace the options every call starts from
    pub fn with_defaults(mut self, defaults: Options) -> Self {
        self.defaults = defaults;
        self
    }

    /// Start from an existing cache
    pub fn with_cache(mut self, cache: CompiledCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn defaults(&self) -> &Options {
        &self.defaults
    }

    pub fn cache(&self) -> &CompiledCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut CompiledCache {
        &mut self.cache
    }

    /// Resolve `action` and run it against the first node of `target`
    ///
    /// `data_or_options` is the render data for an add, and extra option
    /// overrides (camelCase keys) for a removal.
    pub fn dispatch(
        &mut self,
        doc: &mut Document,
        target: &Selection,
        action: &str,
        template: impl Into<TemplateRef>,
        data_or_options: &Value,
        overrides: &Overrides,
    ) -> Outcome {
        let Some(action) = Action::resolve(action) else {
            debug!("blank action, nothing to do");
            return Outcome::Target(target.clone());
        };
        let template = template.into();
        debug!(%action, key = ?template.key(), "dispatching");

        match action {
            Action::Get => Outcome::Nodes(self.get(doc, target, template)),
            Action::Compiled => Outcome::Compiled(self.compiled()),
            Action::Remove => {
                let overrides = overrides.then(&Overrides::from_value(data_or_options));
                Outcome::Target(self.remove(doc, target, template, &overrides))
            }
            Action::Add => self.add(doc, target, template, data_or_options, overrides),
        }
    }

    /// Rendered nodes under the target, restricted to the template's key
    /// when it is given as a key string
    pub fn get(
        &self,
        doc: &Document,
        target: &Selection,
        template: impl Into<TemplateRef>,
    ) -> Selection {
        let key = template.into().concrete_key();
        match target.first_node() {
            Some(container) => tagged_nodes(doc, container, key.as_deref()),
            None => Selection::default(),
        }
    }

    /// Owned copy of the compiled-template cache
    pub fn compiled(&self) -> CacheSnapshot {
        self.cache.snapshot()
    }

    /// Remove rendered nodes from the target
    ///
    /// With a key string and a removal type other than ALL only that
    /// template's nodes go; otherwise every rendered node does.
    pub fn remove(
        &mut self,
        doc: &mut Document,
        target: &Selection,
        template: impl Into<TemplateRef>,
        overrides: &Overrides,
    ) -> Selection {
        let options = self.defaults.merge(overrides);
        let Some(container) = target.first_node() else {
            return target.clone();
        };
        let key = template.into().concrete_key();
        let scope = match key {
            Some(_) if options.remove_type != RemoveType::All => RemoveType::Same,
            _ => RemoveType::All,
        };
        self.remove_rendered(
            doc,
            container,
            key.as_deref(),
            scope,
            options.delete_compiled,
        );
        target.clone()
    }

    /// Compile (once), render and output a template
    pub fn add(
        &mut self,
        doc: &mut Document,
        target: &Selection,
        template: impl Into<TemplateRef>,
        data: &Value,
        overrides: &Overrides,
    ) -> Outcome {
        let options = self.defaults.merge(overrides);
        let noop = Outcome::Target(target.clone());

        if options.validate && is_empty_data(data) {
            debug!("empty data, skipping render");
            return noop;
        }
        let template = template.into();
        let Some(key) = template.key() else {
            debug!("no template key, skipping render");
            return noop;
        };

        if self.cache.contains(&key) {
            trace!(key = %key, "compiled template cache hit");
        } else {
            let Some(source) = template.source_node(doc, &key) else {
                debug!(key = %key, "template source not found");
                return noop;
            };
            let markup = doc.inner_html(source);
            if !self.compile_and_store(&key, &markup) {
                return noop;
            }
        }

        self.render_into(doc, target, &key, data, &options)
    }

    /// Load markup from `location`, then add it using the location as key
    ///
    /// A cached location skips the load. A failed load is a no-op.
    pub fn add_from_source<L: MarkupLoader>(
        &mut self,
        loader: &L,
        doc: &mut Document,
        target: &Selection,
        location: &str,
        data: &Value,
        overrides: &Overrides,
    ) -> Outcome {
        if location.trim().is_empty() {
            return Outcome::Target(target.clone());
        }
        if !self.cache.contains(location) {
            let markup = match loader.load(location) {
                Ok(markup) => markup,
                Err(e) => {
                    warn!(location, error = %e, "failed to load template source");
                    return Outcome::Target(target.clone());
                }
            };
            if !self.compile_and_store(location, &markup) {
                return Outcome::Target(target.clone());
            }
        }
        self.add(doc, target, location, data, overrides)
    }

    fn compile_and_store(&mut self, key: &str, markup: &str) -> bool {
        match self.compiler.compile(markup) {
            Ok(compiled) => {
                debug!(key, "compiled template");
                self.cache.insert(key, compiled);
                true
            }
            Err(e) => {
                warn!(key, error = %e, "failed to compile template");
                false
            }
        }
    }

    fn render_into(
        &mut self,
        doc: &mut Document,
        target: &Selection,
        key: &str,
        data: &Value,
        options: &Options,
    ) -> Outcome {
        let noop = Outcome::Target(target.clone());

        if let Some(container) = target.first_node() {
            match options.remove_type {
                RemoveType::None => {}
                scope => self.remove_rendered(doc, container, Some(key), scope, false),
            }
            if !options.refill && !tagged_nodes(doc, container, Some(key)).is_empty() {
                debug!(key, "already rendered and refill disabled");
                return noop;
            }
        }

        let Some(compiled) = self.cache.get(key).cloned() else {
            return noop;
        };
        let rendered = compiled.render(data);
        if !options.store_compiled {
            self.cache.evict(key);
        }
        let fragment = match rendered {
            Ok(fragment) => fragment,
            Err(e) => {
                warn!(key, error = %e, "failed to render template");
                return noop;
            }
        };

        match options.output {
            OutputType::Raw | OutputType::Compiled => Outcome::Raw(fragment),
            OutputType::Html => Outcome::Html(Document::parse(&fragment)),
            OutputType::Append => {
                let Some(container) = target.first_node() else {
                    return noop;
                };
                let wrapper = doc.create_element("div");
                doc.set_attribute(wrapper, MARKER_ATTR, marker_value(key));
                doc.append_html(wrapper, &fragment);
                doc.append_child(container, wrapper);
                trace!(key, "appended rendered template");
                noop
            }
        }
    }

    fn remove_rendered(
        &mut self,
        doc: &mut Document,
        container: NodeId,
        key: Option<&str>,
        scope: RemoveType,
        delete_compiled: bool,
    ) {
        let filter = match scope {
            RemoveType::None => return,
            RemoveType::Same => match key {
                Some(key) => Some(key),
                None => return,
            },
            RemoveType::All => None,
        };

        let nodes = tagged_nodes(doc, container, filter);
        for id in nodes.iter() {
            if delete_compiled {
                if let Some(marker) = doc.attribute(id, MARKER_ATTR).map(str::to_string) {
                    self.cache.evict_marker(&marker);
                }
            }
            doc.remove(id);
        }
        if !nodes.is_empty() {
            debug!(removed = nodes.len(), "removed rendered templates");
        }
    }
}

/// Marker-tagged containers under `container`, optionally for one key
fn tagged_nodes(doc: &Document, container: NodeId, key: Option<&str>) -> Selection {
    let marker = key.map(marker_value);
    let nodes = doc
        .descendants(container)
        .into_iter()
        .filter(|&id| {
            let Some(el) = doc.element(id) else {
                return false;
            };
            if el.name != "div" {
                return false;
            }
            match (el.attr(MARKER_ATTR), &marker) {
                (Some(found), Some(wanted)) => found == wanted,
                (Some(_), None) => true,
                (None, _) => false,
            }
        })
        .collect();

    let selector = match &marker {
        Some(marker) => format!("div[{}=\"{}\"]", MARKER_ATTR, marker),
        None => format!("div[{}]", MARKER_ATTR),
    };
    Selection::with_selector(nodes, selector)
}

/// Null, empty objects, empty arrays and empty strings carry no data
fn is_empty_data(data: &Value) -> bool {
    match data {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const PAGE: &str = concat!(
        r#"<body><script id="t1" type="text/x-handlebars"><b>{{name}}</b></script>"#,
        r#"<div id="out"></div></body>"#,
    );

    fn setup() -> (Document, Selection, Dispatcher) {
        let doc = Document::parse(PAGE);
        let target = doc.select("#out");
        (doc, target, Dispatcher::new())
    }

    #[test]
    fn test_template_ref_key() {
        assert_eq!(TemplateRef::from("#t1").key(), Some("#t1".to_string()));
        assert_eq!(TemplateRef::from("  ").key(), None);
        assert_eq!(TemplateRef::Absent.key(), None);
        assert_eq!(TemplateRef::from(Selection::new(vec![])).key(), None);

        let doc = Document::parse(PAGE);
        assert_eq!(
            TemplateRef::from(doc.select("#t1")).key(),
            Some("#t1".to_string())
        );
    }

    #[test]
    fn test_concrete_key_only_for_key_strings() {
        let doc = Document::parse(PAGE);
        assert_eq!(
            TemplateRef::from("#t1").concrete_key(),
            Some("#t1".to_string())
        );
        assert_eq!(TemplateRef::from(" ").concrete_key(), None);
        assert_eq!(TemplateRef::from(doc.select("#t1")).concrete_key(), None);
        assert_eq!(TemplateRef::Absent.concrete_key(), None);
    }

    #[test]
    fn test_is_empty_data() {
        assert!(is_empty_data(&Value::Null));
        assert!(is_empty_data(&json!({})));
        assert!(is_empty_data(&json!([])));
        assert!(is_empty_data(&json!("")));
        assert!(!is_empty_data(&json!(0)));
        assert!(!is_empty_data(&json!(false)));
        assert!(!is_empty_data(&json!({"a": 1})));
    }

    #[test]
    fn test_add_appends_tagged_container() {
        let (mut doc, target, mut dispatcher) = setup();
        let outcome = dispatcher.add(
            &mut doc,
            &target,
            "#t1",
            &json!({"name": "x"}),
            &Overrides::new(),
        );
        assert_eq!(outcome.target(), Some(&target));
        assert_eq!(
            doc.inner_html(target.nodes()[0]),
            r##"<div data-template-id="#t1"><b>x</b></div>"##
        );
        assert!(dispatcher.cache().contains("#t1"));
    }

    #[test]
    fn test_add_missing_source_is_noop() {
        let (mut doc, target, mut dispatcher) = setup();
        dispatcher.add(&mut doc, &target, "#nope", &json!({"a": 1}), &Overrides::new());
        assert!(dispatcher.cache().is_empty());
        assert_eq!(doc.inner_html(target.nodes()[0]), "");
    }

    #[test]
    fn test_compile_failure_is_noop() {
        let mut doc = Document::parse(r#"<p id="bad">{{#if x}}</p><div id="out"></div>"#);
        let target = doc.select("#out");
        let mut dispatcher = Dispatcher::new();
        let data = json!({"x": 1});
        let outcome = dispatcher.add(&mut doc, &target, "#bad", &data, &Overrides::new());
        assert!(outcome.target().is_some());
        assert!(dispatcher.cache().is_empty());
        assert!(dispatcher.get(&doc, &target, TemplateRef::Absent).is_empty());
    }

    #[test]
    fn test_get_filters_by_key() {
        let mut doc = Document::parse(
            r#"<i id="a">A{{v}}</i><i id="b">B{{v}}</i><section id="out"></section>"#,
        );
        let target = doc.select("#out");
        let mut dispatcher = Dispatcher::new();
        let data = json!({"v": 1});
        dispatcher.add(&mut doc, &target, "#a", &data, &Overrides::new());
        dispatcher.add(&mut doc, &target, "#b", &data, &Overrides::new());
        dispatcher.add(&mut doc, &target, "#a", &data, &Overrides::new());

        assert_eq!(dispatcher.get(&doc, &target, "#a").len(), 2);
        assert_eq!(dispatcher.get(&doc, &target, "#b").len(), 1);
        assert_eq!(dispatcher.get(&doc, &target, TemplateRef::Absent).len(), 3);
    }

    #[test]
    fn test_render_failure_is_noop() {
        let mut doc = Document::parse(r#"<p id="t">{{#each}}x{{/each}}</p><div id="out"></div>"#);
        let target = doc.select("#out");
        let mut dispatcher = Dispatcher::new();
        let outcome = dispatcher.add(&mut doc, &target, "#t", &json!({"v": 1}), &Overrides::new());
        assert!(outcome.target().is_some());
        assert!(dispatcher.get(&doc, &target, "#t").is_empty());
        assert!(dispatcher.cache().contains("#t"));
    }

    #[test]
    fn test_remove_without_key_clears_all() {
        let mut doc = Document::parse(r#"<i id="a">{{v}}</i><i id="b">{{v}}</i><p id="out"></p>"#);
        let target = doc.select("#out");
        let mut dispatcher = Dispatcher::new();
        let data = json!({"v": 1});
        dispatcher.add(&mut doc, &target, "#a", &data, &Overrides::new());
        dispatcher.add(&mut doc, &target, "#b", &data, &Overrides::new());

        dispatcher.remove(&mut doc, &target, TemplateRef::Absent, &Overrides::new());
        assert!(dispatcher.get(&doc, &target, TemplateRef::Absent).is_empty());
        assert!(dispatcher.cache().is_empty());
    }

    #[test]
    fn test_blank_action_is_noop() {
        let (mut doc, target, mut dispatcher) = setup();
        let before = doc.to_html();
        let outcome = dispatcher.dispatch(
            &mut doc,
            &target,
            "  ",
            "#t1",
            &json!({"name": "x"}),
            &Overrides::new(),
        );
        assert!(outcome.target().is_some());
        assert_eq!(doc.to_html(), before);
    }

    #[test]
    fn test_empty_target_adds_nothing() {
        let (mut doc, _, mut dispatcher) = setup();
        let nowhere = doc.select("#missing");
        let before = doc.to_html();
        dispatcher.add(&mut doc, &nowhere, "#t1", &json!({"name": "x"}), &Overrides::new());
        assert_eq!(doc.to_html(), before);
    }
}
