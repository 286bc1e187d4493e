use crate::dom::{Document, NodeId};
use crate::error::Result;
use crate::html2wt::handlers::DomHandler;
use crate::html2wt::SerializeContext;

fn is_quote(doc: &Document, node: NodeId) -> bool {
    matches!(doc.name(node), Some("b" | "i")) && !doc.is_literal_html(node)
}

/// `''italic''` and `'''bold'''`.
///
/// Apostrophes run together with the markers around them, so a
/// `<nowiki/>` goes between a marker and any neighbouring `'`.
pub struct QuoteHandler;

impl QuoteHandler {
    fn marker(doc: &Document, node: NodeId) -> &'static str {
        if doc.is_named(node, "b") {
            "'''"
        } else {
            "''"
        }
    }

    fn needs_leading_nowiki(doc: &Document, node: NodeId) -> bool {
        match doc.previous_non_deleted_sibling(node) {
            Some(prev) if is_quote(doc, prev) => true,
            Some(prev) => doc.text(prev).is_some_and(|t| t.ends_with('\'')),
            None => false,
        }
    }

    fn needs_trailing_nowiki(doc: &Document, node: NodeId) -> bool {
        doc.next_non_deleted_sibling(node)
            .and_then(|n| doc.text(n))
            .is_some_and(|t| t.starts_with('\''))
    }
}

impl DomHandler for QuoteHandler {
    fn handle(
        &self,
        node: NodeId,
        cx: &mut SerializeContext<'_>,
        _wrapper_unmodified: bool,
    ) -> Result<Option<NodeId>> {
        let doc = cx.doc;
        let marker = Self::marker(doc, node);

        if Self::needs_leading_nowiki(doc, node) {
            cx.emit("<nowiki/>", node);
        }
        cx.emit(marker, node);

        if doc.first_child(node).is_none() {
            cx.emit("<nowiki/>", node);
        } else {
            let edge_apostrophe = |c: Option<NodeId>, leading: bool| {
                c.and_then(|c| doc.text(c)).is_some_and(|t| {
                    if leading {
                        t.starts_with('\'')
                    } else {
                        t.ends_with('\'')
                    }
                })
            };
            if edge_apostrophe(doc.first_child(node), true) {
                cx.emit("<nowiki/>", node);
            }
            cx.serialize_children(node)?;
            if edge_apostrophe(doc.last_child(node), false) {
                cx.emit("<nowiki/>", node);
            }
        }

        cx.emit(marker, node);
        if Self::needs_trailing_nowiki(doc, node) {
            cx.emit("<nowiki/>", node);
        }
        Ok(doc.next_sibling(node))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::SerializerOptions;
    use crate::dom::Document;
    use crate::html2wt::WikitextSerializer;

    fn serialize(doc: &Document) -> String {
        WikitextSerializer::default()
            .serialize(doc, None, None)
            .unwrap()
            .wikitext
    }

    #[test]
    fn bold_and_italic() {
        let mut doc = Document::new();
        let body = doc.body();
        let b = doc.append_element(body, "b", &[]);
        doc.append_text(b, "bold");
        doc.append_text(body, " and ");
        let i = doc.append_element(body, "i", &[]);
        doc.append_text(i, "italic");
        assert_eq!(serialize(&doc), "'''bold''' and ''italic''");
    }

    #[test]
    fn apostrophes_next_to_markers_are_separated() {
        let mut doc = Document::new();
        let body = doc.body();
        doc.append_text(body, "l'");
        let b = doc.append_element(body, "b", &[]);
        doc.append_text(b, "x");
        doc.append_text(body, "'s");
        assert_eq!(serialize(&doc), "l'<nowiki/>'''x'''<nowiki/>'s");
    }

    #[test]
    fn adjacent_and_empty_quotes() {
        let mut doc = Document::new();
        let body = doc.body();
        let i = doc.append_element(body, "i", &[]);
        doc.append_text(i, "a");
        doc.append_element(body, "b", &[]);
        let raw = WikitextSerializer::new(SerializerOptions {
            scrub_wikitext: false,
            ..SerializerOptions::default()
        })
        .serialize(&doc, None, None)
        .unwrap();
        assert_eq!(raw.wikitext, "''a''<nowiki/>'''<nowiki/>'''");
        assert_eq!(serialize(&doc), "''a''");
    }
}
