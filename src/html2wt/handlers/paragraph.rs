use crate::dom::{Document, NodeId};
use crate::error::Result;
use crate::html2wt::handlers::link::is_sol_transparent_link;
use crate::html2wt::handlers::DomHandler;
use crate::html2wt::separators::SOL_TAGS;
use crate::html2wt::{Constraint, SerializeContext};
use regex::Regex;
use std::sync::LazyLock;

static NL_THEN_CONTENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\S").expect("newline-content regex"));

/// Whether `node`, next to a `<p>`, reparses as part of a paragraph: text,
/// or an inline element with no line-level meaning of its own.
pub(crate) fn treat_as_pp_transition(doc: &Document, node: NodeId) -> bool {
    if doc.is_text(node) {
        return true;
    }
    doc.is_element(node)
        && !doc.is_body(node)
        && !doc.is_block_node(node)
        && !doc.is_literal_html(node)
        && !doc.is_encapsulation_wrapper(node)
        && !is_sol_transparent_link(doc, node)
        && doc.type_of_with_prefix(node, "mw:Includes/").is_none()
}

pub(crate) fn is_pp_transition(doc: &Document, node: NodeId) -> bool {
    (doc.is_named(node, "p") && !doc.is_literal_html(node)) || treat_as_pp_transition(doc, node)
}

fn in_figcaption(doc: &Document, node: NodeId) -> bool {
    doc.closest(node, |a| doc.is_named(a, "figcaption")).is_some()
}

/// Whether a block with visible markup sits on the wikitext line that ends
/// at `node`.
///
/// Walks backwards from `node` rather than forwards from the line's first
/// node: a reused node may have produced several lines.
fn curr_line_has_block_node(cx: &SerializeContext<'_>, node: NodeId, skip_node: bool) -> bool {
    let doc = cx.doc;
    let line_first = cx.state.buf.line.first_node;
    if !skip_node && NL_THEN_CONTENT.is_match(&doc.text_content(node)) {
        return false;
    }

    let mut parent = doc.parent(node);
    let mut cur = doc.previous_non_deleted_sibling(node);
    loop {
        if cur.is_some_and(|n| doc.is_body(n)) {
            return false;
        }
        while let Some(n) = cur {
            if doc.is_block_node_with_visible_wt(n) {
                return true;
            }
            if doc.text_content(n).contains('\n') {
                return false;
            }
            cur = doc.previous_non_deleted_sibling(n);
            if let (Some(c), Some(first)) = (cur, line_first) {
                if c == first || doc.is_ancestor_of(c, first) {
                    return false;
                }
            }
        }
        let Some(p) = parent else { return false };
        cur = Some(p);
        parent = doc.parent(p);
    }
}

/// Whether the line started after `node` might open with a visible block.
fn new_line_might_have_block_node(doc: &Document, node: NodeId) -> bool {
    let mut cur = doc.next_non_deleted_sibling(node);
    while let Some(n) = cur {
        if let Some(text) = doc.text(n) {
            if text.contains('\n') {
                return false;
            }
        } else if let Some(name) = doc.name(n) {
            if SOL_TAGS.contains(&name) && !doc.is_literal_html(n) {
                return false;
            }
            return doc.is_block_node_with_visible_wt(n);
        }
        cur = doc.next_non_deleted_sibling(n);
    }
    false
}

pub struct ParagraphHandler;

impl DomHandler for ParagraphHandler {
    fn handle(
        &self,
        node: NodeId,
        cx: &mut SerializeContext<'_>,
        _wrapper_unmodified: bool,
    ) -> Result<Option<NodeId>> {
        cx.serialize_children(node)?;
        Ok(cx.doc.next_sibling(node))
    }

    fn before(&self, node: NodeId, other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        let doc = cx.doc;
        if doc.parent(node) == Some(other) {
            if matches!(doc.name(other), Some("td" | "th" | "body")) {
                return Constraint::new(0, 1);
            }
            if doc.is_list_item(other) {
                return Constraint::exactly(0);
            }
        }

        let p_p = doc.previous_non_deleted_sibling(node) == Some(other)
            && doc.is_named(other, "p")
            && !doc.is_literal_html(other);
        let text_p = treat_as_pp_transition(doc, other)
            && doc.previous_non_sep_sibling(node) == Some(other)
            && !curr_line_has_block_node(cx, other, false);
        if p_p || text_p {
            return Constraint::exactly(2);
        }

        if treat_as_pp_transition(doc, other)
            || (doc.is_block_node(other)
                && !doc.is_named(other, "blockquote")
                && doc.parent(node) == Some(other))
            || (cx.emits_sol_transparent_single_line_wt(other) && doc.is_new_element(node))
        {
            if in_figcaption(doc, other) {
                return Constraint::default();
            }
            return Constraint::new(1, 2);
        }
        Constraint::default()
    }

    fn after(&self, node: NodeId, other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        let doc = cx.doc;
        let ends_in_br = doc.last_child(node).is_some_and(|c| doc.is_named(c, "br"));
        if !ends_in_br
            && is_pp_transition(doc, other)
            && !curr_line_has_block_node(cx, node, true)
            && !new_line_might_have_block_node(doc, other)
        {
            return Constraint::exactly(2);
        }
        if doc.is_body(other) {
            return Constraint::default();
        }
        if treat_as_pp_transition(doc, other)
            || (doc.is_block_node(other)
                && !doc.is_named(other, "blockquote")
                && doc.parent(node) == Some(other))
        {
            if in_figcaption(doc, other) {
                return Constraint::default();
            }
            return Constraint::new(1, 2);
        }
        Constraint::default()
    }

    // leading blanks before a paragraph would start an indent-pre
    fn force_sol(&self) -> bool {
        true
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
    fn text_then_paragraph_needs_a_blank_line() {
        let mut doc = Document::new();
        let body = doc.body();
        doc.append_text(body, "loose");
        let p = doc.append_element(body, "p", &[]);
        doc.append_text(p, "para");
        assert_eq!(serialize(&doc), "loose\n\npara");
    }

    #[test]
    fn paragraph_after_heading_needs_one_newline() {
        let mut doc = Document::new();
        let body = doc.body();
        let h = doc.append_element(body, "h2", &[]);
        doc.append_text(h, "T");
        let p = doc.append_element(body, "p", &[]);
        doc.append_text(p, "x");
        assert_eq!(serialize(&doc), "== T ==\nx");
    }

    #[test]
    fn paragraph_in_cell_stays_on_the_cell_line() {
        let mut doc = Document::new();
        let body = doc.body();
        let table = doc.append_element(body, "table", &[]);
        let tr = doc.append_element(table, "tr", &[]);
        let td = doc.append_element(tr, "td", &[]);
        let p = doc.append_element(td, "p", &[]);
        doc.append_text(p, "x");
        assert!(serialize(&doc).contains("\n|x\n"));
    }

    #[test]
    fn pp_transition_classification() {
        let mut doc = Document::new();
        let body = doc.body();
        let text = doc.append_text(body, "t");
        let b = doc.append_element(body, "b", &[]);
        let div = doc.append_element(body, "div", &[]);
        let tpl = doc.append_element(body, "span", &[("typeof", "mw:Transclusion")]);
        assert!(treat_as_pp_transition(&doc, text));
        assert!(treat_as_pp_transition(&doc, b));
        assert!(!treat_as_pp_transition(&doc, div));
        assert!(!treat_as_pp_transition(&doc, tpl));
        assert!(!treat_as_pp_transition(&doc, body));
    }
}
