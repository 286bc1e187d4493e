//! Marks the edited DOM against the original one so that the serializer
//! knows which regions may reuse source text.
//!
//! The comparison is a relaxed tree-equality walk with single-level
//! look-ahead: siblings skipped over in the edited DOM are `inserted`,
//! siblings skipped over in the original DOM leave a
//! `mw:DiffMarker/deleted` meta behind, and same-named elements that differ
//! shallowly are `modified-wrapper`.

use crate::dom::{Attr, DiffMark, Document, NodeId, NodeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffOutcome {
    /// No difference was found anywhere.
    pub is_empty: bool,
}

/// Diffs `edited` against `base`, writing marks into `edited`.
pub fn diff_documents(base: &Document, edited: &mut Document) -> DiffOutcome {
    let mut differ = Differ { base, edited };
    let found = differ.diff_children(base.body(), differ.edited.body());
    edited.set_diff_applied(true);
    log::debug!("dom diff complete, changes found: {found}");
    DiffOutcome { is_empty: !found }
}

struct Differ<'b, 'e> {
    base: &'b Document,
    edited: &'e mut Document,
}

fn sorted_attrs(attrs: &[Attr]) -> Vec<(&str, &str)> {
    let mut v: Vec<_> = attrs
        .iter()
        .filter(|a| a.name != "about")
        .map(|a| (a.name.as_str(), a.value.as_str()))
        .collect();
    v.sort_unstable();
    v
}

impl Differ<'_, '_> {
    fn tree_equals(&self, a: NodeId, b: NodeId, deep: bool) -> bool {
        let (base, edited) = (self.base, &*self.edited);
        match (base.kind(a), edited.kind(b)) {
            (NodeKind::Text(x), NodeKind::Text(y)) => x == y,
            (NodeKind::Comment(x), NodeKind::Comment(y)) => x == y,
            (NodeKind::Element(x), NodeKind::Element(y)) => {
                if x.name != y.name
                    || sorted_attrs(&x.attrs) != sorted_attrs(&y.attrs)
                    || base.dp(a) != edited.dp(b)
                    || base.mw(a) != edited.mw(b)
                {
                    return false;
                }
                if !deep {
                    return true;
                }
                let ka: Vec<_> = base.children(a).collect();
                let kb: Vec<_> = edited.children(b).collect();
                ka.len() == kb.len()
                    && ka
                        .iter()
                        .zip(&kb)
                        .all(|(&ca, &cb)| self.tree_equals(ca, cb, true))
            }
            _ => false,
        }
    }

    fn next_base(&self, n: NodeId) -> Option<NodeId> {
        if self.base.is_encapsulation_wrapper(n) {
            self.base.skip_over_encapsulated_content(n)
        } else {
            self.base.next_sibling(n)
        }
    }

    fn next_edited(&self, n: NodeId) -> Option<NodeId> {
        if self.edited.is_encapsulation_wrapper(n) {
            self.edited.skip_over_encapsulated_content(n)
        } else {
            self.edited.next_sibling(n)
        }
    }

    fn diff_children(&mut self, base_parent: NodeId, new_parent: NodeId) -> bool {
        let mut base_node = self.base.first_child(base_parent);
        let mut new_node = self.edited.first_child(new_parent);
        let mut found_overall = false;

        while let (Some(b), Some(n)) = (base_node, new_node) {
            let mut cur_base = b;
            let mut cur_new = n;
            let mut dont_advance_new = false;

            if !self.tree_equals(b, n, false) {
                log::trace!("domdiff: {b:?} != {n:?}");
                let mut found = false;

                // look-ahead in the edited DOM for insertions
                if self.base.is_content_node(b) {
                    let mut la = self.edited.next_sibling(n);
                    while let Some(l) = la {
                        if self.edited.is_content_node(l) && self.tree_equals(b, l, true) {
                            let mut mark = n;
                            while mark != l {
                                let next = self.edited.next_sibling(mark);
                                self.mark_node(mark, DiffMark::Inserted, false);
                                match next {
                                    Some(m) => mark = m,
                                    None => break,
                                }
                            }
                            found = true;
                            cur_new = l;
                            break;
                        }
                        la = self.next_edited(l);
                    }
                }

                // look-ahead in the original DOM for deletions
                if !found && self.edited.is_content_node(n) {
                    let mut is_block = self.base.is_block_node_with_visible_wt(b);
                    let mut la = self.base.next_sibling(b);
                    while let Some(l) = la {
                        if self.base.is_content_node(l) && self.tree_equals(l, n, true) {
                            self.mark_node(n, DiffMark::Deleted, is_block);
                            cur_base = l;
                            found = true;
                            break;
                        } else if self.base.is_content_node(l) {
                            is_block = self.base.is_block_node_with_visible_wt(l);
                        }
                        la = self.next_base(l);
                    }
                }

                if !found {
                    let same_wrapper = self.edited.is_element(n)
                        && self.base.name(b) == self.edited.name(n)
                        && self.base.dp(b).stx == self.edited.dp(n).stx;
                    if !self.edited.is_element(n) {
                        let is_block = self.base.is_block_node_with_visible_wt(b);
                        self.mark_node(n, DiffMark::Deleted, is_block);
                    } else if same_wrapper {
                        self.mark_node(n, DiffMark::ModifiedWrapper, false);
                        if !self.base.is_encapsulation_wrapper(b)
                            && !self.edited.is_encapsulation_wrapper(n)
                            && self.diff_children(b, n)
                        {
                            self.mark_node(n, DiffMark::SubtreeChanged, false);
                        }
                    } else {
                        dont_advance_new = true;
                        let is_block = self.base.is_block_node_with_visible_wt(b);
                        self.mark_node(n, DiffMark::Deleted, is_block);
                    }
                }

                self.mark_node(new_parent, DiffMark::ChildrenChanged, false);
                found_overall = true;
            } else if !self.base.is_encapsulation_wrapper(b)
                && !self.edited.is_encapsulation_wrapper(n)
            {
                let differs = self.diff_children(b, n);
                if differs {
                    self.mark_node(n, DiffMark::SubtreeChanged, false);
                }
                found_overall |= differs;
            }

            base_node = self.next_base(cur_base);
            new_node = if dont_advance_new {
                Some(cur_new)
            } else {
                self.next_edited(cur_new)
            };
        }

        while let Some(n) = new_node {
            let next = self.next_edited(n);
            self.mark_node(n, DiffMark::Inserted, false);
            found_overall = true;
            new_node = next;
        }

        if let Some(b) = base_node {
            self.mark_node(new_parent, DiffMark::ChildrenChanged, false);
            if self.edited.first_child(new_parent).is_some() {
                let meta = self.deletion_marker(self.base.is_block_node_with_visible_wt(b));
                self.edited.append(new_parent, meta);
            }
            found_overall = true;
        }

        found_overall
    }

    fn deletion_marker(&mut self, is_block: bool) -> NodeId {
        let meta = self.edited.create_element("meta", Vec::new());
        self.edited.set_attr(meta, "typeof", "mw:DiffMarker/deleted");
        if is_block {
            self.edited.set_attr(meta, "data-is-block", "true");
        }
        meta
    }

    fn mark_node(&mut self, node: NodeId, mark: DiffMark, block_deleted: bool) {
        match mark {
            DiffMark::Deleted => {
                let meta = self.deletion_marker(block_deleted);
                self.edited.insert_before(node, meta);
            }
            DiffMark::Inserted if !self.edited.is_element(node) => {
                let meta = self.edited.create_element("meta", Vec::new());
                self.edited.set_attr(meta, "typeof", "mw:DiffMarker/inserted");
                self.edited.insert_before(node, meta);
            }
            _ => self.edited.meta_mut(node).add_diff_mark(mark),
        }
        if matches!(mark, DiffMark::Deleted | DiffMark::Inserted) {
            if let Some(p) = self.edited.parent(node) {
                self.edited.meta_mut(p).add_diff_mark(DiffMark::ChildrenChanged);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::DomSourceRange;

    fn para(doc: &mut Document, text: &str, dsr: Option<DomSourceRange>) -> NodeId {
        let body = doc.body();
        let p = doc.append_element(body, "p", &[]);
        doc.meta_mut(p).dp.dsr = dsr;
        doc.append_text(p, text);
        p
    }

    #[test]
    fn identical_documents_have_no_marks() {
        let mut base = Document::new();
        para(&mut base, "a", Some(DomSourceRange::new(0, 1, 0, 0)));
        let mut edited = base.clone();
        let out = diff_documents(&base, &mut edited);
        assert!(out.is_empty);
        assert!(edited.diff_applied());
        let p = edited.first_child(edited.body()).unwrap();
        assert!(edited.meta(p).diff.is_empty());
    }

    #[test]
    fn changed_text_marks_subtree_and_inserts_marker() {
        let mut base = Document::new();
        para(&mut base, "a", Some(DomSourceRange::new(0, 1, 0, 0)));
        let mut edited = Document::new();
        let p = para(&mut edited, "b", Some(DomSourceRange::new(0, 1, 0, 0)));

        let out = diff_documents(&base, &mut edited);
        assert!(!out.is_empty);
        assert!(edited.meta(p).has_diff_mark(DiffMark::SubtreeChanged));
        assert!(edited.meta(p).has_diff_mark(DiffMark::ChildrenChanged));
        let first = edited.first_child(p).unwrap();
        assert!(edited.is_diff_marker(first));
    }

    #[test]
    fn appended_paragraph_is_inserted() {
        let mut base = Document::new();
        para(&mut base, "a", Some(DomSourceRange::new(0, 1, 0, 0)));
        let mut edited = base.clone();
        let added = para(&mut edited, "new", None);

        diff_documents(&base, &mut edited);
        assert!(edited.meta(added).has_diff_mark(DiffMark::Inserted));
        assert!(
            edited
                .meta(edited.body())
                .has_diff_mark(DiffMark::ChildrenChanged)
        );
    }

    #[test]
    fn removed_trailing_block_leaves_block_marker() {
        let mut base = Document::new();
        para(&mut base, "a", Some(DomSourceRange::new(0, 1, 0, 0)));
        para(&mut base, "b", Some(DomSourceRange::new(3, 4, 0, 0)));
        let mut edited = Document::new();
        let kept = para(&mut edited, "a", Some(DomSourceRange::new(0, 1, 0, 0)));

        diff_documents(&base, &mut edited);
        let marker = edited.next_sibling(kept).unwrap();
        assert!(edited.is_diff_marker(marker));
        // a <p> has no visible wikitext of its own
        assert!(!edited.is_deleted_block_marker(marker));
    }
}
