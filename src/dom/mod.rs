//! Annotated DOM consumed by the wikitext serializer.
//!
//! This module defines the **contract** between:
//! 1) whatever produced the HTML (a wikitext parser that recorded source
//!    ranges and syntax flavors), and
//! 2) serializing that DOM back to wikitext.
//!
//! Design goals:
//! - Node identity is stable (`NodeId`) so metadata can live in a side table.
//! - Source ranges are codepoint offsets into the **original wikitext**.
//! - Unknown widths stay unknown; they are never guessed as zero.

mod bundle;
mod data;
mod diagnostic;
pub mod diff;
pub mod load;
mod node;
mod query;
mod span;

pub use bundle::*;
pub use data::*;
pub use diagnostic::*;
pub use node::*;
pub use query::is_whitespace_only;
pub use span::*;

/// JSON schema version for the page bundle.
///
/// Bump this when making non-backwards-compatible changes to the JSON structure.
pub const SCHEMA_VERSION: u32 = 1;

/// The serializer name stored in the page bundle.
pub const SERIALIZER_NAME: &str = "html2wt";

/// The serializer version stored in the page bundle.
pub const SERIALIZER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bundle_json_round_trip() {
        let mut doc = Document::new();
        let body = doc.body();
        let p = doc.append_element(body, "p", &[]);
        doc.append_text(p, "x");
        doc.meta_mut(p).dp.dsr = Some(DomSourceRange::new(0, 1, 0, 0));
        doc.meta_mut(p).add_diff_mark(DiffMark::SubtreeChanged);
        let tpl = doc.append_element(body, "span", &[("typeof", "mw:Transclusion")]);
        doc.meta_mut(tpl).mw = Some(DataMw {
            parts: vec![TemplatePart::Text("{{x}}".into())],
            ..DataMw::default()
        });

        let bundle = PageBundle::from_document(
            &doc,
            vec![Diagnostic::warning(
                DiagnosticPhase::Serialize,
                "example",
                "example diagnostic",
            )
            .with_range(Some(SourceRange::new(0, 1)))],
        );
        assert_eq!(bundle.ids.len(), 2);
        assert_eq!(bundle.ids[&p].tag, "p");

        let json = serde_json::to_string_pretty(&bundle).expect("serialize");
        let back: PageBundle = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(bundle, back);
    }
}
