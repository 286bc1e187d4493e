//! HTML -> arena [`Document`].
//!
//! `data-parsoid`, `data-mw` and `data-parsoid-diff` are JSON attributes in
//! the HTML; they are decoded into the metadata side table and removed from
//! the element's attribute list.

use crate::dom::{DataDiff, DataMw, DataParsoid, Diagnostic, DiagnosticPhase, Document, NodeId};
use crate::error::{Error, Result};
use scraper::{ElementRef, Html, Selector};

#[derive(Debug)]
pub struct LoadOutput {
    pub document: Document,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn load_html(html: &str) -> Result<LoadOutput> {
    let parsed = Html::parse_document(html);
    let selector = Selector::parse("body").map_err(|e| Error::Html(e.to_string()))?;
    let body_ref = parsed
        .select(&selector)
        .next()
        .ok_or_else(|| Error::Html("document has no <body>".to_string()))?;

    let mut loader = Loader {
        doc: Document::new(),
        diagnostics: Vec::new(),
    };
    let body = loader.doc.body();
    loader.absorb_attrs(body, body_ref);
    loader.walk_children(body, body_ref);

    Ok(LoadOutput {
        document: loader.doc,
        diagnostics: loader.diagnostics,
    })
}

struct Loader {
    doc: Document,
    diagnostics: Vec<Diagnostic>,
}

impl Loader {
    fn walk_children(&mut self, parent: NodeId, el: ElementRef<'_>) {
        for child in el.children() {
            match child.value() {
                scraper::Node::Element(e) => {
                    let id = self.doc.create_element(e.name(), Vec::new());
                    self.doc.append(parent, id);
                    if let Some(child_ref) = ElementRef::wrap(child) {
                        self.absorb_attrs(id, child_ref);
                        // <template> content lives in a fragment; nothing to serialize.
                        if e.name() != "template" {
                            self.walk_children(id, child_ref);
                        }
                    }
                }
                scraper::Node::Text(t) => {
                    self.doc.append_text(parent, &t[..]);
                }
                scraper::Node::Comment(c) => {
                    self.doc.append_comment(parent, &c[..]);
                }
                _ => {}
            }
        }
    }

    fn absorb_attrs(&mut self, id: NodeId, el: ElementRef<'_>) {
        let tag = el.value().name().to_string();
        for (name, value) in el.value().attrs() {
            match name {
                "data-parsoid" => {
                    if let Some(dp) = self.decode::<DataParsoid>(&tag, name, value) {
                        self.doc.meta_mut(id).dp = dp;
                    }
                }
                "data-mw" => {
                    if let Some(mw) = self.decode::<DataMw>(&tag, name, value) {
                        self.doc.meta_mut(id).mw = Some(mw);
                    }
                }
                "data-parsoid-diff" => {
                    if let Some(diff) = self.decode::<DataDiff>(&tag, name, value) {
                        self.doc.meta_mut(id).diff = diff.diff;
                        self.doc.set_diff_applied(true);
                    }
                }
                _ => self.doc.set_attr(id, name, value),
            }
        }
    }

    fn decode<T: serde::de::DeserializeOwned>(
        &mut self,
        tag: &str,
        attr: &str,
        value: &str,
    ) -> Option<T> {
        match serde_json::from_str(value) {
            Ok(v) => Some(v),
            Err(e) => {
                let diag = Diagnostic::warning(
                    DiagnosticPhase::Load,
                    "html2wt.load.bad_metadata",
                    format!("<{tag}> has malformed {attr}: {e}"),
                )
                .with_note("the node is treated as having no metadata for this attribute");
                diag.log();
                self.diagnostics.push(diag);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{DiffMark, DomSourceRange, Stx};

    #[test]
    fn moves_metadata_into_side_table() {
        let html = r#"<html><body data-parsoid='{"dsr":[0,6,0,0]}'><p data-parsoid='{"dsr":[0,6,0,0]}' data-parsoid-diff='{"diff":["subtree-changed"]}' class="x">hello<!--c--></p></body></html>"#;
        let out = load_html(html).unwrap();
        let doc = &out.document;
        assert!(out.diagnostics.is_empty());
        assert!(doc.diff_applied());

        let body = doc.body();
        assert_eq!(doc.dp(body).dsr, Some(DomSourceRange::new(0, 6, 0, 0)));
        let p = doc.first_child(body).unwrap();
        assert_eq!(doc.name(p), Some("p"));
        assert_eq!(doc.attrs(p).len(), 1);
        assert_eq!(doc.attr(p, "class"), Some("x"));
        assert!(doc.meta(p).has_diff_mark(DiffMark::SubtreeChanged));

        let kids: Vec<_> = doc.children(p).collect();
        assert_eq!(doc.text(kids[0]), Some("hello"));
        assert_eq!(doc.comment(kids[1]), Some("c"));
    }

    #[test]
    fn malformed_json_is_a_warning_not_an_error() {
        let html = r#"<body><b data-parsoid='{"stx":' data-mw='{}'>x</b></body>"#;
        let out = load_html(html).unwrap();
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(
            out.diagnostics[0].code.as_deref(),
            Some("html2wt.load.bad_metadata")
        );
        let b = out.document.first_child(out.document.body()).unwrap();
        assert_eq!(out.document.dp(b).stx, None);
        assert!(out.document.mw(b).is_some());
    }

    #[test]
    fn stx_survives_loading() {
        let out = load_html(r#"<body><ul data-parsoid='{"stx":"html"}'><li>a</li></ul></body>"#)
            .unwrap();
        let ul = out.document.first_child(out.document.body()).unwrap();
        assert!(out.document.dp(ul).is_stx(Stx::Html));
        assert!(!out.document.diff_applied());
    }
}
