use crate::dom::NodeId;
use crate::error::Result;
use crate::html2wt::handlers::DomHandler;
use crate::html2wt::{serialize_attributes, Constraint, SerializeContext};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub(crate) fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// The literal HTML start tag of `node`, or its original text when only
/// its content changed.
pub(crate) fn html_start_tag(cx: &mut SerializeContext<'_>, node: NodeId, wrapper_unmodified: bool) -> String {
    let doc = cx.doc;
    let name = doc.name(node).unwrap_or("span");
    if name == "pre" {
        cx.state.in_html_pre = true;
    }
    let dp = doc.dp(node);
    if wrapper_unmodified {
        if let Some(src) = dp.dsr.and_then(|d| d.open_range()).and_then(|r| cx.orig_slice(r)) {
            return src.to_string();
        }
    }
    if dp.auto_inserted_start {
        return String::new();
    }
    let close = if is_void_element(name) || dp.self_close {
        " /"
    } else {
        ""
    };
    let tag = format!("<{name}{}{close}>", serialize_attributes(doc, node, &[]));
    if name == "nowiki" {
        tag.replace('<', "&lt;")
    } else {
        tag
    }
}

pub(crate) fn html_end_tag(cx: &mut SerializeContext<'_>, node: NodeId, wrapper_unmodified: bool) -> String {
    let doc = cx.doc;
    let name = doc.name(node).unwrap_or("span");
    if name == "pre" {
        cx.state.in_html_pre = false;
    }
    let dp = doc.dp(node);
    if wrapper_unmodified {
        if let Some(src) = dp.dsr.and_then(|d| d.close_range()).and_then(|r| cx.orig_slice(r)) {
            return src.to_string();
        }
    }
    if dp.auto_inserted_end || is_void_element(name) || dp.self_close {
        return String::new();
    }
    format!("</{name}>")
}

/// Emits `node` as literal HTML around its serialized children.
pub(crate) fn serialize_as_html(
    cx: &mut SerializeContext<'_>,
    node: NodeId,
    wrapper_unmodified: bool,
) -> Result<Option<NodeId>> {
    let doc = cx.doc;
    let start = html_start_tag(cx, node, wrapper_unmodified);
    cx.emit(&start, node);

    if doc.first_child(node).is_some() {
        if doc.is_named(node, "pre") {
            // the HTML parser drops one leading newline inside <pre>
            let lost = doc
                .first_child(node)
                .and_then(|c| doc.text(c))
                .filter(|t| t.starts_with('\n'))
                .map_or("", |_| "\n");
            cx.emit(lost, node);
        }
        cx.serialize_children(node)?;
    }

    let end = html_end_tag(cx, node, wrapper_unmodified);
    cx.emit(&end, node);
    Ok(doc.next_sibling(node))
}

/// Literal HTML for anything without a wikitext form. Never fails on
/// well-formed input.
pub struct FallbackHandler;

impl DomHandler for FallbackHandler {
    fn handle(
        &self,
        node: NodeId,
        cx: &mut SerializeContext<'_>,
        wrapper_unmodified: bool,
    ) -> Result<Option<NodeId>> {
        serialize_as_html(cx, node, wrapper_unmodified)
    }
}

/// `<pre>` written as HTML: content is copied without escaping and may
/// span any number of lines.
pub struct HtmlPreHandler;

impl DomHandler for HtmlPreHandler {
    fn handle(
        &self,
        node: NodeId,
        cx: &mut SerializeContext<'_>,
        wrapper_unmodified: bool,
    ) -> Result<Option<NodeId>> {
        serialize_as_html(cx, node, wrapper_unmodified)
    }

    fn first_child(&self, _node: NodeId, _child: NodeId, _cx: &SerializeContext<'_>) -> Constraint {
        Constraint::new(0, Constraint::UNBOUNDED)
    }

    fn last_child(&self, _node: NodeId, _child: NodeId, _cx: &SerializeContext<'_>) -> Constraint {
        Constraint::new(0, Constraint::UNBOUNDED)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::SerializerOptions;
    use crate::dom::{Document, Stx};
    use crate::html2wt::WikitextSerializer;

    #[test]
    fn unknown_elements_become_literal_html() {
        let mut doc = Document::new();
        let body = doc.body();
        let div = doc.append_element(body, "div", &[("class", "box")]);
        doc.append_text(div, "x");
        doc.append_element(div, "br", &[("clear", "all")]);
        let out = WikitextSerializer::new(SerializerOptions::default())
            .serialize(&doc, None, None)
            .unwrap();
        assert_eq!(out.wikitext, "<div class=\"box\">x<br clear=\"all\" /></div>");
    }

    #[test]
    fn html_pre_keeps_markup_unescaped() {
        let mut doc = Document::new();
        let body = doc.body();
        let pre = doc.append_element(body, "pre", &[]);
        doc.meta_mut(pre).dp.stx = Some(Stx::Html);
        doc.append_text(pre, "* not a list");
        let out = WikitextSerializer::default().serialize(&doc, None, None).unwrap();
        assert_eq!(out.wikitext, "<pre>* not a list</pre>");
    }
}
