use crate::dom::{Document, NodeId};
use crate::error::Result;
use crate::html2wt::handlers::fallback::serialize_as_html;
use crate::html2wt::handlers::DomHandler;
use crate::html2wt::{ChunkKind, Constraint, NestedMode, SerializeContext};
use percent_encoding::percent_decode_str;

/// Images and other media: `[[File:X|options|caption]]`.
pub struct MediaHandler;

fn decode_title(href: &str) -> String {
    let trimmed = href.trim_start_matches("./");
    percent_decode_str(trimmed)
        .decode_utf8_lossy()
        .replace('_', " ")
}

fn first_descendant(doc: &Document, node: NodeId, name: &str) -> Option<NodeId> {
    doc.descendants(node).into_iter().find(|&n| doc.is_named(n, name))
}

fn class_suffix<'d>(doc: &'d Document, node: NodeId, prefix: &str) -> Option<&'d str> {
    doc.attr(node, "class")?
        .split_ascii_whitespace()
        .find_map(|c| c.strip_prefix(prefix))
}

impl MediaHandler {
    pub(crate) fn is_media(doc: &Document, node: NodeId) -> bool {
        doc.type_of_with_prefix(node, "mw:Image").is_some()
            || doc.type_of_with_prefix(node, "mw:File").is_some()
    }

    fn is_external_image(doc: &Document, node: NodeId) -> bool {
        doc.is_named(node, "img") && doc.attr_has_token(node, "rel", "mw:externalImage")
    }

    /// Options in the order they are conventionally written.
    fn options(doc: &Document, node: NodeId, img: NodeId, resource: &str) -> Vec<String> {
        let mut opts = Vec::new();

        let kind = doc
            .type_of_with_prefix(node, "mw:Image/")
            .or_else(|| doc.type_of_with_prefix(node, "mw:File/"));
        let kind = kind.and_then(|t| t.rsplit('/').next());
        match kind {
            Some("Thumb") => opts.push("thumb".to_string()),
            Some("Frame") => opts.push("frame".to_string()),
            Some("Frameless") => opts.push("frameless".to_string()),
            _ => {}
        }
        if class_suffix(doc, node, "mw-image-").is_some_and(|c| c == "border") {
            opts.push("border".to_string());
        }
        if let Some(align) = class_suffix(doc, node, "mw-halign-") {
            opts.push(align.to_string());
        }
        if let Some(align) = class_suffix(doc, node, "mw-valign-") {
            opts.push(align.to_string());
        }

        let width = doc.attr(img, "width");
        if width.is_some() && width != doc.attr(img, "data-file-width") {
            let height = doc.attr(img, "height");
            let explicit_height = height.is_some()
                && doc.dp(img).sa.contains_key("height")
                && height != doc.attr(img, "data-file-height");
            match (width, explicit_height) {
                (Some(w), true) => opts.push(format!("{w}x{}px", height.unwrap_or(""))),
                (Some(w), false) => opts.push(format!("{w}px")),
                _ => {}
            }
        }

        if let Some(alt) = doc.attr(img, "alt") {
            opts.push(format!("alt={alt}"));
        }

        let link = doc.parent(img).filter(|&p| doc.is_named(p, "a"));
        match link.and_then(|a| doc.attr(a, "href")) {
            None => opts.push("link=".to_string()),
            Some(href) if href != resource => {
                let target = if href.starts_with("./") {
                    decode_title(href)
                } else {
                    href.to_string()
                };
                opts.push(format!("link={target}"));
            }
            Some(_) => {}
        }
        opts
    }
}

impl DomHandler for MediaHandler {
    fn handle(
        &self,
        node: NodeId,
        cx: &mut SerializeContext<'_>,
        wrapper_unmodified: bool,
    ) -> Result<Option<NodeId>> {
        let doc = cx.doc;
        if Self::is_external_image(doc, node) {
            let src = doc.attr(node, "src").unwrap_or("");
            cx.emit_constrained(src, node, ChunkKind::AutoUrl);
            return Ok(doc.next_sibling(node));
        }
        if !Self::is_media(doc, node) {
            return serialize_as_html(cx, node, wrapper_unmodified);
        }
        let Some(img) = first_descendant(doc, node, "img")
            .or_else(|| first_descendant(doc, node, "video"))
            .or_else(|| first_descendant(doc, node, "audio"))
        else {
            return serialize_as_html(cx, node, wrapper_unmodified);
        };

        let resource_attr = doc.attr(img, "resource").unwrap_or("");
        let file = doc
            .dp(img)
            .shadow_source("resource", resource_attr)
            .map(str::to_string)
            .unwrap_or_else(|| decode_title(resource_attr));

        let mut parts = vec![file];
        parts.extend(Self::options(doc, node, img, resource_attr));

        if let Some(caption) = first_descendant(doc, node, "figcaption") {
            let text = cx.serialize_children_to_string(caption, NestedMode::Link)?;
            if !text.is_empty() {
                parts.push(text);
            }
        }

        cx.emit(&format!("[[{}]]", parts.join("|")), node);
        Ok(doc.next_sibling(node))
    }

    fn before(&self, node: NodeId, _other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        own_line_at_body_level(cx.doc, node)
    }

    fn after(&self, node: NodeId, _other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        own_line_at_body_level(cx.doc, node)
    }
}

fn own_line_at_body_level(doc: &Document, node: NodeId) -> Constraint {
    let at_body = doc.parent(node).is_some_and(|p| doc.is_body(p));
    if doc.is_named(node, "figure") && doc.is_new_element(node) && at_body {
        Constraint::new(1, 2)
    } else {
        Constraint::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html2wt::WikitextSerializer;

    fn serialize(doc: &Document) -> String {
        WikitextSerializer::default()
            .serialize(doc, None, None)
            .unwrap()
            .wikitext
    }

    #[test]
    fn thumbnail_with_caption() {
        let mut doc = Document::new();
        let body = doc.body();
        let figure = doc.append_element(
            body,
            "figure",
            &[("typeof", "mw:Image/Thumb"), ("class", "mw-halign-right")],
        );
        let a = doc.append_element(figure, "a", &[("href", "./File:Foo.jpg")]);
        doc.append_element(
            a,
            "img",
            &[
                ("resource", "./File:Foo.jpg"),
                ("src", "//upload.example/Foo.jpg"),
                ("width", "100"),
                ("data-file-width", "640"),
            ],
        );
        let caption = doc.append_element(figure, "figcaption", &[]);
        doc.append_text(caption, "A foo");
        assert_eq!(
            serialize(&doc),
            "[[File:Foo.jpg|thumb|right|100px|A foo]]"
        );
    }

    #[test]
    fn inline_image_without_link() {
        let mut doc = Document::new();
        let body = doc.body();
        let p = doc.append_element(body, "p", &[]);
        doc.append_text(p, "see ");
        let span = doc.append_element(p, "span", &[("typeof", "mw:Image")]);
        doc.append_element(
            span,
            "img",
            &[("resource", "./File:Bar_baz.png"), ("alt", "bar")],
        );
        assert_eq!(serialize(&doc), "see [[File:Bar baz.png|alt=bar|link=]]");
    }

    #[test]
    fn external_image_is_its_url() {
        let mut doc = Document::new();
        let body = doc.body();
        doc.append_element(
            body,
            "img",
            &[("rel", "mw:externalImage"), ("src", "https://example.org/x.png")],
        );
        assert_eq!(serialize(&doc), "https://example.org/x.png");
    }

    #[test]
    fn new_figure_gets_its_own_line() {
        let mut doc = Document::new();
        let body = doc.body();
        doc.append_text(body, "before");
        let figure = doc.append_element(body, "figure", &[("typeof", "mw:Image")]);
        let a = doc.append_element(figure, "a", &[("href", "./File:X.png")]);
        doc.append_element(a, "img", &[("resource", "./File:X.png")]);
        assert_eq!(serialize(&doc), "before\n[[File:X.png]]");
    }
}
