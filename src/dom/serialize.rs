//! HTML serialization through html5ever's serializer

use std::io;

use html5ever::serialize::{serialize, Serialize, SerializeOpts, Serializer, TraversalScope};
use markup5ever::{LocalName, Namespace, QualName};

use super::document::{Document, NodeId, NodeKind};
use super::parser::html_name;

struct NodeRef<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl NodeRef<'_> {
    fn serialize_children<S: Serializer>(&self, serializer: &mut S) -> io::Result<()> {
        for &child in self.doc.children(self.id) {
            NodeRef {
                doc: self.doc,
                id: child,
            }
            .serialize(serializer, TraversalScope::IncludeNode)?;
        }
        Ok(())
    }
}

impl Serialize for NodeRef<'_> {
    fn serialize<S: Serializer>(
        &self,
        serializer: &mut S,
        traversal_scope: TraversalScope,
    ) -> io::Result<()> {
        let Some(kind) = self.doc.kind(self.id) else {
            return Ok(());
        };
        if let TraversalScope::ChildrenOnly(_) = traversal_scope {
            return self.serialize_children(serializer);
        }
        match kind {
            NodeKind::Root => self.serialize_children(serializer),
            NodeKind::Element(el) => {
                let name = html_name(&el.name);
                let attrs: Vec<(QualName, &str)> = el
                    .attributes
                    .iter()
                    .map(|(key, value)| (attribute_name(key), value.as_str()))
                    .collect();
                let attr_refs = attrs.iter().map(|(key, value)| (key, *value));
                serializer.start_elem(name.clone(), attr_refs)?;
                self.serialize_children(serializer)?;
                serializer.end_elem(name)
            }
            NodeKind::Text(text) => serializer.write_text(text),
            NodeKind::Comment(text) => serializer.write_comment(text),
            NodeKind::Doctype(name) => serializer.write_doctype(name),
        }
    }
}

fn attribute_name(key: &str) -> QualName {
    QualName::new(None, Namespace::from(""), LocalName::from(key))
}

/// Serialize a node, or only its children, to a string
///
/// Children of raw-text elements (`script`, `style`, ...) are written
/// verbatim when the scope names their parent.
pub(crate) fn to_html(doc: &Document, id: NodeId, traversal_scope: TraversalScope) -> String {
    let mut buf = Vec::new();
    let opts = SerializeOpts {
        traversal_scope,
        ..SerializeOpts::default()
    };
    if serialize(&mut buf, &NodeRef { doc, id }, opts).is_err() {
        return String::new();
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Scope for serializing the children of `id`
pub(crate) fn children_scope(doc: &Document, id: NodeId) -> TraversalScope {
    TraversalScope::ChildrenOnly(doc.element(id).map(|el| html_name(&el.name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_text_and_attributes_escaped() {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        doc.set_attribute(p, "title", r#"say "hi" & go"#);
        doc.append_child(doc.root(), p);
        let text = doc.create_text("a < b & c > d");
        doc.append_child(p, text);
        assert_eq!(
            doc.to_html(),
            r#"<p title="say &quot;hi&quot; &amp; go">a &lt; b &amp; c &gt; d</p>"#
        );
    }

    #[test]
    fn test_round_trip() {
        let source = concat!(
            r#"<ul class="list"><li data-id="1">One &amp; two</li>"#,
            r#"<li>x<br>y</li></ul><!--end-->"#,
        );
        assert_eq!(Document::parse(source).to_html(), source);
    }

    #[test]
    fn test_raw_text_not_escaped() {
        let doc = Document::parse("<style>a > b { color: red }</style>");
        assert_eq!(doc.to_html(), "<style>a > b { color: red }</style>");
    }

    #[test]
    fn test_inner_html_of_script_is_verbatim() {
        let doc = Document::parse(r#"<script id="t"><b>x</b> && y</script>"#);
        let script = doc.select("#t").nodes()[0];
        assert_eq!(doc.inner_html(script), "<b>x</b> && y");
        assert_eq!(doc.outer_html(script), r#"<script id="t"><b>x</b> && y</script>"#);
    }

    #[test]
    fn test_inner_html_of_textarea_is_escaped() {
        let doc = Document::parse("<textarea id=t><b></textarea>");
        let area = doc.select("#t").nodes()[0];
        assert_eq!(doc.inner_html(area), "&lt;b&gt;");
    }

    #[test]
    fn test_boolean_attribute_serialized_empty() {
        let doc = Document::parse("<input disabled>");
        assert_eq!(doc.to_html(), r#"<input disabled="">"#);
    }
}
