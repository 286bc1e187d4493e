//! Structural predicates over the arena DOM.

use crate::dom::{DiffMark, Document, NodeId, Stx};

const BLOCK_TAGS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "body",
    "caption",
    "center",
    "dd",
    "details",
    "dialog",
    "dir",
    "div",
    "dl",
    "dt",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hgroup",
    "hr",
    "html",
    "li",
    "main",
    "menu",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "tbody",
    "td",
    "tfoot",
    "th",
    "thead",
    "tr",
    "ul",
];

/// Elements whose wikitext form has no visible markup of its own.
const ZERO_WIDTH_WT_TAGS: &[&str] = &["p", "meta", "tbody", "thead", "tfoot"];

const TABLE_CHILD_TAGS: &[&str] = &["caption", "tbody", "thead", "tfoot", "tr", "td", "th"];

const ENCAPSULATION_TYPES: &[&str] = &["mw:Transclusion", "mw:Param"];

/// Whether `s` is inter-element whitespace.
pub fn is_whitespace_only(s: &str) -> bool {
    s.chars().all(|c| matches!(c, ' ' | '\t' | '\r' | '\n'))
}

impl Document {
    pub fn is_block_node(&self, id: NodeId) -> bool {
        self.name(id).is_some_and(|n| BLOCK_TAGS.contains(&n))
    }

    pub fn is_zero_width_wikitext_elt(&self, id: NodeId) -> bool {
        self.name(id)
            .is_some_and(|n| ZERO_WIDTH_WT_TAGS.contains(&n) && !self.is_literal_html(id))
    }

    /// Block node that produces visible wikitext (a `<p>` does not).
    pub fn is_block_node_with_visible_wt(&self, id: NodeId) -> bool {
        self.is_block_node(id) && !self.is_zero_width_wikitext_elt(id)
    }

    pub fn is_list(&self, id: NodeId) -> bool {
        matches!(self.name(id), Some("ul" | "ol" | "dl"))
    }

    pub fn is_list_item(&self, id: NodeId) -> bool {
        matches!(self.name(id), Some("li" | "dt" | "dd"))
    }

    pub fn is_table_child_tag(&self, id: NodeId) -> bool {
        self.name(id).is_some_and(|n| TABLE_CHILD_TAGS.contains(&n))
    }

    pub fn is_literal_html(&self, id: NodeId) -> bool {
        self.is_element(id) && self.dp(id).is_stx(Stx::Html)
    }

    pub fn is_body(&self, id: NodeId) -> bool {
        id == self.body()
    }

    /// Element inserted by the tree builder for both its start and end tag.
    pub fn is_builder_inserted(&self, id: NodeId) -> bool {
        let dp = self.dp(id);
        dp.auto_inserted_start && dp.auto_inserted_end
    }

    /// Elements with no source counterpart, i.e. added by an edit.
    pub fn is_new_element(&self, id: NodeId) -> bool {
        self.is_element(id)
            && (self.meta(id).has_diff_mark(DiffMark::Inserted) || self.dp(id).dsr.is_none())
    }

    // ------------------------------------------------------------------
    // separators and diff markers

    pub fn is_iew(&self, id: NodeId) -> bool {
        self.text(id).is_some_and(is_whitespace_only)
    }

    pub fn is_diff_marker(&self, id: NodeId) -> bool {
        self.is_named(id, "meta") && self.type_of_with_prefix(id, "mw:DiffMarker").is_some()
    }

    pub fn is_deleted_block_marker(&self, id: NodeId) -> bool {
        self.is_diff_marker(id) && self.attr(id, "data-is-block").is_some()
    }

    /// Anything that contributes separator text rather than content.
    pub fn is_sep_node(&self, id: NodeId) -> bool {
        self.is_comment(id) || self.is_iew(id) || self.is_diff_marker(id)
    }

    pub fn is_content_node(&self, id: NodeId) -> bool {
        !self.is_sep_node(id)
    }

    pub fn has_diff_markers(&self, id: NodeId) -> bool {
        !self.meta(id).diff.is_empty() || self.is_diff_marker(id)
    }

    /// True unless the node itself carries a mark other than subtree/children
    /// changes.
    pub fn only_subtree_changed(&self, id: NodeId) -> bool {
        self.meta(id)
            .diff
            .iter()
            .all(|m| matches!(m, DiffMark::SubtreeChanged | DiffMark::ChildrenChanged))
    }

    pub fn previous_non_sep_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.prev_sibling(id);
        while let Some(n) = cur {
            if self.is_content_node(n) {
                return Some(n);
            }
            cur = self.prev_sibling(n);
        }
        None
    }

    pub fn next_non_sep_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.next_sibling(id);
        while let Some(n) = cur {
            if self.is_content_node(n) {
                return Some(n);
            }
            cur = self.next_sibling(n);
        }
        None
    }

    pub fn first_non_sep_child(&self, id: NodeId) -> Option<NodeId> {
        let first = self.first_child(id)?;
        if self.is_content_node(first) {
            Some(first)
        } else {
            self.next_non_sep_sibling(first)
        }
    }

    pub fn last_non_sep_child(&self, id: NodeId) -> Option<NodeId> {
        let last = self.last_child(id)?;
        if self.is_content_node(last) {
            Some(last)
        } else {
            self.previous_non_sep_sibling(last)
        }
    }

    pub fn first_non_deleted_child(&self, id: NodeId) -> Option<NodeId> {
        let first = self.first_child(id)?;
        if self.is_diff_marker(first) {
            self.next_non_deleted_sibling(first)
        } else {
            Some(first)
        }
    }

    pub fn last_non_deleted_child(&self, id: NodeId) -> Option<NodeId> {
        let last = self.last_child(id)?;
        if self.is_diff_marker(last) {
            self.previous_non_deleted_sibling(last)
        } else {
            Some(last)
        }
    }

    pub fn previous_non_deleted_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.prev_sibling(id);
        while let Some(n) = cur {
            if !self.is_diff_marker(n) {
                return Some(n);
            }
            cur = self.prev_sibling(n);
        }
        None
    }

    pub fn next_non_deleted_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.next_sibling(id);
        while let Some(n) = cur {
            if !self.is_diff_marker(n) {
                return Some(n);
            }
            cur = self.next_sibling(n);
        }
        None
    }

    /// Whether a deleted block sits right after (`ltr`) or before `id` in
    /// the wikitext, looking through zero-width wrappers like `<p>`.
    pub fn next_to_deleted_block_node(&self, id: NodeId, ltr: bool) -> bool {
        let mut node = id;
        loop {
            if self.is_body(node) {
                return false;
            }
            let step = |n: NodeId| {
                if ltr {
                    self.next_sibling(n)
                } else {
                    self.prev_sibling(n)
                }
            };
            let mut sib = step(node);
            while let Some(s) = sib {
                if self.is_comment(s) || self.is_iew(s) {
                    sib = step(s);
                } else {
                    break;
                }
            }
            match sib {
                Some(s) => return self.is_deleted_block_marker(s),
                None => match self.parent(node) {
                    Some(p) if self.is_zero_width_wikitext_elt(p) => node = p,
                    _ => return false,
                },
            }
        }
    }

    // ------------------------------------------------------------------
    // encapsulation

    /// The node that opens an encapsulated region (carries its `typeof`).
    pub fn is_first_encapsulation_wrapper(&self, id: NodeId) -> bool {
        let Some(ty) = self.attr(id, "typeof") else {
            return false;
        };
        ty.split_ascii_whitespace()
            .any(|t| ENCAPSULATION_TYPES.contains(&t) || t.starts_with("mw:Extension/"))
    }

    /// Any node of an encapsulated region, first or not.
    pub fn is_encapsulation_wrapper(&self, id: NodeId) -> bool {
        self.is_first_encapsulation_wrapper(id)
            || self.attr(id, "about").is_some_and(|a| a.starts_with("#mwt"))
    }

    /// `id` plus the following siblings sharing its `about`, including the
    /// whitespace and comments between them.
    pub fn about_siblings(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = vec![id];
        let Some(about) = self.attr(id, "about") else {
            return out;
        };
        let mut pending = Vec::new();
        let mut cur = self.next_sibling(id);
        while let Some(n) = cur {
            if self.attr(n, "about") == Some(about) {
                out.append(&mut pending);
                out.push(n);
            } else if self.is_comment(n) || self.is_iew(n) {
                pending.push(n);
            } else {
                break;
            }
            cur = self.next_sibling(n);
        }
        out
    }

    /// The first sibling after the encapsulated region that starts at `id`.
    pub fn skip_over_encapsulated_content(&self, id: NodeId) -> Option<NodeId> {
        let group = self.about_siblings(id);
        group.last().and_then(|&n| self.next_sibling(n))
    }

    // ------------------------------------------------------------------
    // lists and tables

    /// Nearest ancestor for which `pred` holds.
    pub fn closest(&self, id: NodeId, pred: impl Fn(NodeId) -> bool) -> Option<NodeId> {
        let mut cur = self.parent(id);
        while let Some(n) = cur {
            if pred(n) {
                return Some(n);
            }
            cur = self.parent(n);
        }
        None
    }

    /// Whether `id` sits inside a table written as literal HTML.
    pub fn in_html_table(&self, id: NodeId) -> bool {
        self.closest(id, |n| self.is_named(n, "table"))
            .is_some_and(|t| self.is_literal_html(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::DomSourceRange;

    #[test]
    fn non_sep_siblings_skip_whitespace_comments_and_markers() {
        let mut doc = Document::new();
        let body = doc.body();
        let a = doc.append_element(body, "p", &[]);
        doc.append_text(body, "\n ");
        doc.append_comment(body, "c");
        doc.append_element(body, "meta", &[("typeof", "mw:DiffMarker/deleted")]);
        let b = doc.append_element(body, "p", &[]);

        assert_eq!(doc.next_non_sep_sibling(a), Some(b));
        assert_eq!(doc.previous_non_sep_sibling(b), Some(a));
        assert_eq!(doc.first_non_sep_child(body), Some(a));
        assert_eq!(doc.last_non_sep_child(body), Some(b));
    }

    #[test]
    fn about_group_is_skipped_as_a_unit() {
        let mut doc = Document::new();
        let body = doc.body();
        let first = doc.append_element(
            body,
            "p",
            &[("typeof", "mw:Transclusion"), ("about", "#mwt1")],
        );
        doc.append_text(body, "\n");
        doc.append_element(body, "p", &[("about", "#mwt1")]);
        let after = doc.append_element(body, "p", &[]);

        assert!(doc.is_first_encapsulation_wrapper(first));
        assert_eq!(doc.about_siblings(first).len(), 3);
        assert_eq!(doc.skip_over_encapsulated_content(first), Some(after));
    }

    #[test]
    fn deleted_block_detected_through_paragraph() {
        let mut doc = Document::new();
        let body = doc.body();
        let p = doc.append_element(body, "p", &[]);
        let t = doc.append_text(p, "x");
        doc.append_text(body, "\n");
        doc.append_element(
            body,
            "meta",
            &[("typeof", "mw:DiffMarker/deleted"), ("data-is-block", "true")],
        );

        assert!(doc.next_to_deleted_block_node(t, true));
        assert!(doc.next_to_deleted_block_node(p, true));
        assert!(!doc.next_to_deleted_block_node(p, false));
    }

    #[test]
    fn new_elements_lack_source_ranges() {
        let mut doc = Document::new();
        let body = doc.body();
        let fresh = doc.append_element(body, "h2", &[]);
        let old = doc.append_element(body, "h2", &[]);
        doc.meta_mut(old).dp.dsr = Some(DomSourceRange::new(0, 7, 2, 2));

        assert!(doc.is_new_element(fresh));
        assert!(!doc.is_new_element(old));
        doc.meta_mut(old).add_diff_mark(DiffMark::Inserted);
        assert!(doc.is_new_element(old));
    }
}
