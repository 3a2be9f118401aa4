//! HTML parsing with html5ever
//!
//! The markup is parsed into an `RcDom` and copied into the arena. Fragments
//! are parsed in the context of the element they are inserted into, which
//! decides how text inside raw-text elements like `<script>` is tokenized.

use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, parse_fragment, ParseOpts};
use markup5ever::{LocalName, Namespace, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use super::document::{Document, NodeId};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Qualified name of an HTML element
pub(crate) fn html_name(local: &str) -> QualName {
    QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from(local))
}

/// Whether `html` looks like a whole document rather than a fragment
pub(crate) fn is_document(html: &str) -> bool {
    let head = html.trim_start().as_bytes();
    ["<!doctype", "<html", "<head", "<body"].iter().any(|start| {
        head.len() >= start.len()
            && head[..start.len()].eq_ignore_ascii_case(start.as_bytes())
            && !head
                .get(start.len())
                .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'-')
    })
}

/// Parse a complete document and copy it under `parent`
pub(crate) fn parse_document_into(doc: &mut Document, parent: NodeId, html: &str) {
    let dom = parse_document(RcDom::default(), ParseOpts::default()).one(html);
    copy_children(doc, parent, &dom.document);
}

/// Parse a fragment as the inner HTML of `parent` and append the result
pub(crate) fn parse_fragment_into(doc: &mut Document, parent: NodeId, html: &str) {
    let context = match doc.element(parent) {
        Some(el) => html_name(&el.name),
        None => html_name("body"),
    };
    let dom =
        parse_fragment(RcDom::default(), ParseOpts::default(), context, Vec::new()).one(html);

    // The fragment parser roots its output in a synthetic <html> element
    let top = dom.document.children.borrow();
    for child in top.iter() {
        match &child.data {
            NodeData::Element { name, .. } if name.local.as_ref() == "html" => {
                copy_children(doc, parent, child)
            }
            _ => copy_node(doc, parent, child),
        }
    }
}

fn copy_children(doc: &mut Document, parent: NodeId, handle: &Handle) {
    for child in handle.children.borrow().iter() {
        copy_node(doc, parent, child);
    }
}

fn copy_node(doc: &mut Document, parent: NodeId, handle: &Handle) {
    match &handle.data {
        NodeData::Document => copy_children(doc, parent, handle),
        NodeData::Doctype { name, .. } => {
            let node = doc.create_doctype(name.to_string());
            doc.append_child(parent, node);
        }
        NodeData::Text { contents } => doc.append_text(parent, &contents.borrow()),
        NodeData::Comment { contents } => {
            let node = doc.create_comment(contents.to_string());
            doc.append_child(parent, node);
        }
        NodeData::Element {
            name,
            attrs,
            template_contents,
            ..
        } => {
            let node = doc.create_element(name.local.as_ref());
            for attr in attrs.borrow().iter() {
                let key = match &attr.name.prefix {
                    Some(prefix) => format!("{}:{}", prefix, attr.name.local),
                    None => attr.name.local.to_string(),
                };
                doc.set_attribute(node, &key, attr.value.to_string());
            }
            doc.append_child(parent, node);
            copy_children(doc, node, handle);
            // <template> keeps its markup in a separate fragment
            if let Some(contents) = template_contents.borrow().as_ref() {
                copy_children(doc, node, contents);
            }
        }
        NodeData::ProcessingInstruction { .. } => {}
    }
}
