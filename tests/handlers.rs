use html2wt::dom::load::load_html;
use html2wt::dom::{Document, NodeId};
use html2wt::error::{Error, Result};
use html2wt::html2wt::{
    CancelToken, Constraint, DomHandler, ExtensionOutput, ExtensionSerializer, SerializeContext,
    WikitextSerializer,
};
use std::sync::Arc;

struct Note;

impl DomHandler for Note {
    fn handle(
        &self,
        node: NodeId,
        cx: &mut SerializeContext<'_>,
        _wrapper_unmodified: bool,
    ) -> Result<Option<NodeId>> {
        let text = cx.doc.text_content(node);
        cx.emit(&format!("NOTE: {text}"), node);
        Ok(cx.doc.next_sibling(node))
    }

    fn before(&self, _node: NodeId, _other: NodeId, _cx: &SerializeContext<'_>) -> Constraint {
        Constraint::exactly(1)
    }
}

#[test]
fn custom_handler_controls_its_separator() {
    let mut doc = Document::new();
    let body = doc.body();
    doc.append_text(body, "a");
    let aside = doc.append_element(body, "aside", &[]);
    doc.append_text(aside, "n");

    let mut ser = WikitextSerializer::default();
    ser.register_handler("aside", None, Arc::new(Note));
    let out = ser.serialize(&doc, None, None).unwrap();
    assert_eq!(out.wikitext, "a\nNOTE: n");
}

struct Passthrough;

impl ExtensionSerializer for Passthrough {
    fn dom_to_wikitext(
        &self,
        _node: NodeId,
        _cx: &mut SerializeContext<'_>,
        _wrapper_unmodified: bool,
    ) -> Result<ExtensionOutput> {
        Ok(ExtensionOutput::UseDefault)
    }
}

#[test]
fn extension_can_defer_to_the_default() {
    let html = r#"<html><body><span typeof="mw:Extension/poem" data-mw='{"name":"poem","attrs":{"compact":""},"body":{"extsrc":"x"}}'></span></body></html>"#;
    let doc = load_html(html).unwrap().document;

    let mut ser = WikitextSerializer::default();
    ser.register_extension("poem", Arc::new(Passthrough));
    let out = ser.serialize(&doc, None, None).unwrap();
    assert_eq!(out.wikitext, "<poem compact=\"\">x</poem>");
}

#[test]
fn cancelled_run_stops_with_an_error() {
    let mut doc = Document::new();
    let body = doc.body();
    let p = doc.append_element(body, "p", &[]);
    doc.append_text(p, "x");

    let token = CancelToken::new();
    token.cancel();
    let err = WikitextSerializer::default()
        .serialize(&doc, None, Some(&token))
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}
