use html2wt::config::SerializerOptions;
use html2wt::dom::load::load_html;
use html2wt::dom::{NodeId, Severity};
use html2wt::error::Result;
use html2wt::html2wt::{Constraint, DomHandler, SerializeContext, WikitextSerializer};
use html2wt::serialize_html;
use std::sync::Arc;

fn wt(body: &str) -> String {
    let html = format!("<html><body>{body}</body></html>");
    serialize_html(&html, &SerializerOptions::default())
        .unwrap()
        .wikitext
}

#[test]
fn unordered_list() {
    assert_eq!(wt("<ul><li>a</li><li>b</li></ul>"), "*a\n*b");
}

#[test]
fn nested_list() {
    assert_eq!(wt("<ul><li>a<ol><li>b</li></ol></li></ul>"), "*a\n*#b");
}

#[test]
fn table_from_parsed_html() {
    // the HTML parser wraps the row in an implicit <tbody>
    assert_eq!(wt("<table><tr><td>A</td></tr></table>"), "{|\n|-\n|A\n|}");
}

#[test]
fn adjacent_paragraphs() {
    assert_eq!(wt("<p>a</p><p>b</p>"), "a\n\nb");
}

#[test]
fn heading_then_paragraph() {
    assert_eq!(wt("<h2>T</h2><p>x</p>"), "== T ==\nx");
}

#[test]
fn bold_and_italic() {
    assert_eq!(
        wt("<p><b>bold</b> and <i>italic</i></p>"),
        "'''bold''' and ''italic''"
    );
}

#[test]
fn text_that_looks_like_markup_is_protected() {
    let out = wt("<p>[[x]]</p>");
    assert_eq!(out, "<nowiki>[[x]]</nowiki>");
}

#[test]
fn heading_style_follows_options() {
    let opts = SerializerOptions {
        space_in_new_headings: false,
        ..SerializerOptions::default()
    };
    let out = serialize_html("<html><body><h2>T</h2></body></html>", &opts).unwrap();
    assert_eq!(out.wikitext, "==T==");
}

#[test]
fn malformed_metadata_is_a_load_warning() {
    let out = serialize_html(
        r#"<html><body><p data-parsoid='{not json'>x</p></body></html>"#,
        &SerializerOptions::default(),
    )
    .unwrap();
    assert_eq!(out.wikitext, "x");
    let diag = out
        .diagnostics
        .iter()
        .find(|d| d.code.as_deref() == Some("html2wt.load.bad_metadata"))
        .expect("load diagnostic");
    assert_eq!(diag.severity, Severity::Warning);
}

#[test]
fn output_never_has_trailing_newline_runs() {
    for body in [
        "<p>a</p>",
        "<ul><li>a</li></ul>",
        "<table><tr><td>A</td></tr></table>",
        "<h2>T</h2>",
    ] {
        let out = wt(body);
        assert!(!out.ends_with('\n'), "{body:?} -> {out:?}");
        assert!(!out.starts_with('\n'), "{body:?} -> {out:?}");
    }
}

struct Inline;

impl DomHandler for Inline {
    fn handle(
        &self,
        node: NodeId,
        cx: &mut SerializeContext<'_>,
        _wrapper_unmodified: bool,
    ) -> Result<Option<NodeId>> {
        cx.emit("<<", node);
        cx.serialize_children(node)?;
        Ok(cx.doc.next_sibling(node))
    }

    fn first_child(&self, _node: NodeId, _child: NodeId, _cx: &SerializeContext<'_>) -> Constraint {
        Constraint::exactly(0)
    }
}

struct Block;

impl DomHandler for Block {
    fn handle(
        &self,
        node: NodeId,
        cx: &mut SerializeContext<'_>,
        _wrapper_unmodified: bool,
    ) -> Result<Option<NodeId>> {
        cx.emit("BLOCK", node);
        Ok(cx.doc.next_sibling(node))
    }

    fn before(&self, _node: NodeId, _other: NodeId, _cx: &SerializeContext<'_>) -> Constraint {
        Constraint::exactly(2).forced()
    }
}

#[test]
fn conflicting_handlers_are_reported_with_the_resolution() {
    let doc = load_html("<html><body><samp><kbd></kbd></samp></body></html>")
        .unwrap()
        .document;
    let mut ser = WikitextSerializer::default();
    ser.register_handler("samp", None, Arc::new(Inline));
    ser.register_handler("kbd", None, Arc::new(Block));
    let out = ser.serialize(&doc, None, None).unwrap();

    assert_eq!(out.wikitext, "<<\n\nBLOCK");
    let diag = out
        .diagnostics
        .iter()
        .find(|d| {
            d.code.as_deref() == Some("html2wt.separator.conflict") && d.message.contains("kbd")
        })
        .expect("conflict diagnostic");
    assert_eq!(diag.severity, Severity::Warning);
    assert!(diag.message.contains("samp"));
    assert_eq!(diag.notes, vec!["{0, 0} vs {2, 2}, resolved to {2, 2}".to_string()]);
}

#[test]
fn link_trail_letters_are_kept_out_of_the_link() {
    assert_eq!(
        wt(r#"<p><a rel="mw:WikiLink" href="./Foo">Foo</a>bar</p>"#),
        "[[Foo]]<nowiki/>bar"
    );
}

#[test]
fn formatting_is_tidied_before_serializing() {
    assert_eq!(wt("<p><b>x</b><b>y</b></p>"), "'''xy'''");
    assert_eq!(wt("<p><b></b>y</p>"), "y");
    assert_eq!(wt("<p>a<i> b </i>c</p>"), "a ''b'' c");

    let raw = serialize_html(
        "<html><body><p><b>x</b><b>y</b></p></body></html>",
        &SerializerOptions {
            scrub_wikitext: false,
            ..SerializerOptions::default()
        },
    )
    .unwrap();
    assert_eq!(raw.wikitext, "'''x'''<nowiki/>'''y'''");
}
