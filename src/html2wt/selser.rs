//! Selective serialization: reusing original wikitext for DOM regions the
//! edit did not touch.

use crate::dom::{DiffMark, Document, NodeId, Stx};
use crate::html2wt::{ChunkKind, SepType, SerializeContext};

/// Whether the original source of `node` still reads the same in the place
/// the node now occupies.
///
/// Table cells and rows, and nested lists, have position-dependent markup:
/// `||` only works after another cell on the same line, a first row has no
/// `|-`, and the bullets of a nested item belong to its first sibling.
pub fn orig_src_valid_in_edited_context(doc: &Document, node: NodeId) -> bool {
    match doc.name(node) {
        Some("td" | "th") => {
            let Some(prev) = doc.prev_sibling(node) else {
                return true;
            };
            let prev_meta = doc.meta(prev);
            if !doc.is_diff_marker(prev)
                && !prev_meta.has_diff_mark(DiffMark::Inserted)
                && !prev_meta.has_diff_mark(DiffMark::ChildrenChanged)
            {
                return true;
            }
            !doc.dp(node).is_stx(Stx::Row)
        }
        Some("tr") if doc.dp(node).start_tag_src.is_none() => {
            doc.previous_non_sep_sibling(node).is_none()
        }
        _ if is_nested_list_or_item(doc, node) => {
            let mut prev = doc.prev_sibling(node);
            if prev.is_none() {
                return false;
            }
            while let Some(p) = prev {
                if doc.is_diff_marker(p) || doc.meta(p).has_diff_mark(DiffMark::Inserted) {
                    return false;
                }
                prev = doc.prev_sibling(p);
            }
            true
        }
        _ => true,
    }
}

fn is_nested_list_or_item(doc: &Document, node: NodeId) -> bool {
    (doc.is_list(node) || doc.is_list_item(node))
        && doc.closest(node, |a| doc.is_list_item(a)).is_some()
}

/// What selser decided for one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reuse {
    /// The original source was emitted; continue at this sibling.
    Emitted(Option<NodeId>),
    /// The node must be re-serialized by its handler.
    Rebuild { wrapper_unmodified: bool },
}

impl SerializeContext<'_> {
    /// Emits `node`'s original source when it is safe to do so.
    pub(crate) fn try_reuse_source(&mut self, node: NodeId) -> Reuse {
        let doc = self.doc;
        let not_reusable = Reuse::Rebuild {
            wrapper_unmodified: false,
        };
        if !self.state.selser_mode || self.state.in_modified_content {
            return not_reusable;
        }
        let Some(src) = self.orig_src() else {
            return not_reusable;
        };
        if !orig_src_valid_in_edited_context(doc, node) {
            return not_reusable;
        }
        let dp = doc.dp(node);
        let Some(dsr) = dp.dsr.filter(|d| d.has_valid_tag_widths()) else {
            return not_reusable;
        };
        let (Some(start), Some(end)) = (dsr.start, dsr.end) else {
            return not_reusable;
        };
        if end > src.len() {
            log::debug!("dsr [{start},{end}] of {} runs past the source", self.node_label(node));
            return not_reusable;
        }
        let zero_width_ok = end == start && matches!(doc.name(node), Some("p" | "br"));
        if end <= start && !zero_width_ok {
            return not_reusable;
        }

        if !doc.has_diff_markers(node) {
            self.state.curr_node_unmodified = true;

            if doc.is_zero_width_wikitext_elt(node) {
                if let Some(first) = doc.first_child(node) {
                    let on_sol = self.state.buf.on_sol;
                    if let Some(pending) = self
                        .state
                        .sep
                        .constraints
                        .as_mut()
                        .filter(|p| p.info.sep_type == SepType::Sibling)
                    {
                        pending.info.on_sol = on_sol;
                        pending.info.sep_type = SepType::ParentChild;
                        pending.info.node_a = node;
                        pending.info.node_b = first;
                    }
                }
            }

            let out = src.slice_between(start, end).unwrap_or("");
            log::debug!("reusing source [{start},{end}] for {}: {out:?}", self.node_label(node));

            let suppress_single_line = doc.is_first_encapsulation_wrapper(node)
                || matches!(doc.name(node), Some("dl" | "ul" | "ol"))
                || (doc.is_named(node, "table")
                    && doc.parent(node).is_some_and(|p| doc.is_named(p, "dd"))
                    && doc.previous_non_sep_sibling(node).is_none());
            let kind = ChunkKind::for_reused_source(doc, node);
            if suppress_single_line {
                let mut cx = self.disable_single_line();
                cx.emit_constrained(out, node, kind);
            } else {
                self.emit_constrained(out, node, kind);
            }

            let next = if doc.is_first_encapsulation_wrapper(node) {
                doc.skip_over_encapsulated_content(node)
            } else {
                doc.next_sibling(node)
            };
            return Reuse::Emitted(next);
        }

        let auto_inserted = dp.auto_inserted_start || dp.auto_inserted_end;
        Reuse::Rebuild {
            wrapper_unmodified: doc.only_subtree_changed(node)
                && (!auto_inserted || matches!(doc.name(node), Some("td" | "th" | "tr"))),
        }
    }
}
