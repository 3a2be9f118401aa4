//! Arena-backed document tree

use html5ever::serialize::TraversalScope;

use super::parser;
use super::selection::Selection;
use super::selector::Selector;
use super::serialize;

/// Handle to a node inside a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// An element's tag name and attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Lowercased tag name
    pub name: String,
    /// Attributes in source order; names are lowercased
    pub attributes: Vec<(String, String)>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            attributes: Vec::new(),
        }
    }

    /// Get an attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing any existing value
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some((_, v)) => *v = value,
            None => self.attributes.push((name.to_ascii_lowercase(), value)),
        }
    }

    /// Check the whitespace-separated `class` attribute
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_ascii_whitespace().any(|c| c == class))
    }
}

/// Node payload
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// The document root (exactly one per document)
    Root,
    Element(Element),
    Text(String),
    Comment(String),
    Doctype(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A mutable HTML document
///
/// Nodes live in an arena and are addressed by [`NodeId`]. Removing a node
/// detaches it from its parent; its id stays valid but it is no longer
/// reachable from the root. Ids belong to the document that created them:
/// an id this document never handed out reads as a missing node and is
/// ignored by the mutators.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only the root
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Parse HTML (a full document or a fragment)
    ///
    /// Input starting with a doctype or an `html`, `head` or `body` tag is
    /// parsed as a whole document, so those elements are kept. Anything else
    /// is parsed as the contents of a `<body>`.
    pub fn parse(html: &str) -> Self {
        if parser::is_document(html) {
            Self::parse_document(html)
        } else {
            Self::parse_fragment(html)
        }
    }

    /// Parse a complete document, creating `html`, `head` and `body`
    pub fn parse_document(html: &str) -> Self {
        let mut doc = Self::new();
        let root = doc.root();
        parser::parse_document_into(&mut doc, root, html);
        doc
    }

    /// Parse a fragment in `<body>` context
    pub fn parse_fragment(html: &str) -> Self {
        let mut doc = Self::new();
        let root = doc.root();
        parser::parse_fragment_into(&mut doc, root, html);
        doc
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Whether `id` names a node of this document
    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|node| &node.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.kind(id)? {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(id.0)?.kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.nodes.get(id.0) {
            Some(node) => &node.children,
            None => &[],
        }
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeKind::Element(Element::new(name)))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    /// Create a detached comment node
    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Comment(text.into()))
    }

    pub fn create_doctype(&mut self, name: impl Into<String>) -> NodeId {
        self.push(NodeKind::Doctype(name.into()))
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attr(name))
    }

    /// Set an attribute on an element; no-op for non-element nodes
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(el) = self.element_mut(id) {
            el.set_attr(name, value);
        }
    }

    /// Append `child` as the last child of `parent`, detaching it first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if !self.contains(parent) || !self.contains(child) {
            return;
        }
        if parent == child || self.is_ancestor(child, parent) {
            return;
        }
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Append text to `parent`, merging with a trailing text node
    pub(crate) fn append_text(&mut self, parent: NodeId, text: &str) {
        if text.is_empty() || !self.contains(parent) {
            return;
        }
        if let Some(&last) = self.nodes[parent.0].children.last() {
            if let NodeKind::Text(existing) = &mut self.nodes[last.0].kind {
                existing.push_str(text);
                return;
            }
        }
        let node = self.create_text(text);
        self.append_child(parent, node);
    }

    /// Parse `html` as the inner HTML of `parent` and append the result
    pub fn append_html(&mut self, parent: NodeId, html: &str) {
        if self.contains(parent) {
            parser::parse_fragment_into(self, parent, html);
        }
    }

    /// Detach a node (and its subtree) from the tree
    pub fn remove(&mut self, id: NodeId) {
        self.detach(id);
    }

    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.nodes.get_mut(id.0).and_then(|node| node.parent.take()) else {
            return;
        };
        if let Some(parent) = self.nodes.get_mut(parent.0) {
            parent.children.retain(|&c| c != id);
        }
    }

    /// Whether `ancestor` is a proper ancestor of `id`
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = self.parent(id);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.parent(p);
        }
        false
    }

    /// Whether the node is still reachable from the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root() || self.is_ancestor(self.root(), id)
    }

    /// All descendants of `id` in document order, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Select elements across the whole document
    pub fn select(&self, selector: &str) -> Selection {
        self.find(self.root(), selector)
    }

    /// Select descendants of `scope` matching `selector`
    ///
    /// An invalid selector yields an empty selection. The selector string is
    /// recorded on the returned selection either way.
    pub fn find(&self, scope: NodeId, selector: &str) -> Selection {
        let nodes = match Selector::parse(selector) {
            Ok(sel) => self
                .descendants(scope)
                .into_iter()
                .filter(|&id| sel.matches(self, id))
                .collect(),
            Err(_) => Vec::new(),
        };
        Selection::with_selector(nodes, selector)
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(NodeKind::Text(t)) = self.kind(id) {
            out.push_str(t);
        }
        for node in self.descendants(id) {
            if let Some(NodeKind::Text(t)) = self.kind(node) {
                out.push_str(t);
            }
        }
        out
    }

    /// Serialize the children of a node
    ///
    /// Text inside raw-text elements such as `<script>` comes back verbatim.
    pub fn inner_html(&self, id: NodeId) -> String {
        serialize::to_html(self, id, serialize::children_scope(self, id))
    }

    /// Serialize a node including its own tag
    pub fn outer_html(&self, id: NodeId) -> String {
        serialize::to_html(self, id, TraversalScope::IncludeNode)
    }

    /// Serialize the whole document
    pub fn to_html(&self) -> String {
        self.inner_html(self.root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_append() {
        let mut doc = Document::new();
        let div = doc.create_element("DIV");
        doc.set_attribute(div, "Id", "main");
        doc.append_child(doc.root(), div);
        doc.append_text(div, "hi");

        assert_eq!(doc.element(div).unwrap().name, "div");
        assert_eq!(doc.attribute(div, "id"), Some("main"));
        assert_eq!(doc.to_html(), r#"<div id="main">hi</div>"#);
    }

    #[test]
    fn test_append_text_merges() {
        let mut doc = Document::new();
        let root = doc.root();
        doc.append_text(root, "a");
        doc.append_text(root, "b");
        assert_eq!(doc.children(root).len(), 1);
        assert_eq!(doc.text_content(root), "ab");
    }

    #[test]
    fn test_remove_detaches_subtree() {
        let mut doc = Document::parse("<ul><li>a</li><li>b</li></ul>");
        let items = doc.select("li");
        assert_eq!(items.len(), 2);

        let first = items.nodes()[0];
        doc.remove(first);
        assert!(!doc.is_attached(first));
        assert_eq!(doc.to_html(), "<ul><li>b</li></ul>");
    }

    #[test]
    fn test_append_child_rejects_cycles() {
        let mut doc = Document::parse("<div><span></span></div>");
        let div = doc.select("div").nodes()[0];
        let span = doc.select("span").nodes()[0];
        doc.append_child(span, div);
        assert_eq!(doc.to_html(), "<div><span></span></div>");
    }

    #[test]
    fn test_descendants_document_order() {
        let doc = Document::parse("<a><b></b><c><d></d></c></a><e></e>");
        let names: Vec<_> = doc
            .descendants(doc.root())
            .into_iter()
            .filter_map(|id| doc.element(id).map(|e| e.name.clone()))
            .collect();
        assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_foreign_node_ids_are_ignored() {
        let mut small = Document::parse("<p>x</p>");
        let big = Document::parse("<ul><li>a</li><li>b</li><li>c</li></ul>");
        let foreign = big.select("li").nodes()[2];
        assert!(!small.contains(foreign));

        assert_eq!(small.kind(foreign), None);
        assert!(small.element(foreign).is_none());
        assert!(small.children(foreign).is_empty());
        assert_eq!(small.parent(foreign), None);
        assert_eq!(small.inner_html(foreign), "");
        assert_eq!(small.outer_html(foreign), "");

        let before = small.to_html();
        let root = small.root();
        small.append_child(root, foreign);
        small.append_html(foreign, "<b>y</b>");
        small.remove(foreign);
        assert_eq!(small.to_html(), before);
        assert_eq!(big.select("li").len(), 3);
    }

    #[test]
    fn test_has_class() {
        let mut el = Element::new("p");
        el.set_attr("class", "lead  big");
        assert!(el.has_class("big"));
        assert!(!el.has_class("bi"));
    }
}
