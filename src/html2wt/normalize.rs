//! Tree cleanups applied before serialization.
//!
//! Edited or hand-written HTML often carries shapes that serialize to
//! noisy wikitext: `<b>x</b><b>y</b>` needs a `<nowiki/>` between the two
//! bold runs, an empty `<i></i>` turns into `''''` and a space at the end
//! of a link lands inside `[[...]]`. These passes rewrite such shapes into
//! equivalent, simpler ones. In selective serialization the rewritten
//! nodes get diff marks so their source is not reused.

use crate::dom::{DiffMark, Document, NodeId, Stx};
use crate::html2wt::handlers::is_sol_transparent_link;
use crate::html2wt::selser::orig_src_valid_in_edited_context;

const QUOTE_TAGS: &[&str] = &["b", "i"];

const FORMATTING_TAGS: &[&str] = &[
    "b", "big", "code", "em", "font", "i", "s", "small", "strike", "strong", "tt", "u",
];

/// Normalizes the tree under `doc.body()` in place.
///
/// `selser` adds diff marks to every node a pass touches and leaves
/// unmodified nodes alone.
pub fn normalize(doc: &mut Document, selser: bool) {
    let body = doc.body();
    let mut normalizer = Normalizer {
        doc,
        selser,
        in_inserted: false,
    };
    normalizer.process_node(body, true);
}

struct Normalizer<'d> {
    doc: &'d mut Document,
    selser: bool,
    in_inserted: bool,
}

fn marker_type(mark: DiffMark) -> &'static str {
    match mark {
        DiffMark::Inserted => "mw:DiffMarker/inserted",
        DiffMark::Deleted => "mw:DiffMarker/deleted",
        DiffMark::Moved => "mw:DiffMarker/moved",
        DiffMark::ModifiedWrapper => "mw:DiffMarker/modified-wrapper",
        DiffMark::ChildrenChanged => "mw:DiffMarker/children-changed",
        DiffMark::SubtreeChanged => "mw:DiffMarker/subtree-changed",
    }
}

impl Normalizer<'_> {
    // ------------------------------------------------------------------
    // diff marks

    fn marker_before(&self, node: NodeId, mark: DiffMark) -> bool {
        self.doc
            .prev_sibling(node)
            .is_some_and(|p| self.doc.has_type_of(p, marker_type(mark)))
    }

    fn has_mark(&self, node: NodeId, mark: DiffMark) -> bool {
        match mark {
            DiffMark::Deleted => self.marker_before(node, mark),
            DiffMark::Inserted if !self.doc.is_element(node) => self.marker_before(node, mark),
            _ => self.doc.meta(node).has_diff_mark(mark),
        }
    }

    fn set_mark(&mut self, node: NodeId, mark: DiffMark) {
        let as_meta = matches!(mark, DiffMark::Deleted | DiffMark::Moved)
            || !self.doc.is_element(node);
        if as_meta {
            let meta = self.doc.create_element("meta", Vec::new());
            self.doc.set_attr(meta, "typeof", marker_type(mark));
            self.doc.insert_before(node, meta);
        } else {
            self.doc.meta_mut(node).add_diff_mark(mark);
        }
    }

    fn add_diff_marks(&mut self, node: NodeId, mark: DiffMark, dont_recurse: bool) {
        if !self.selser || self.has_mark(node, mark) {
            return;
        }
        if self.in_inserted && mark == DiffMark::Inserted {
            return;
        }

        if !self.doc.is_new_element(node) {
            self.set_mark(node, mark);
            if matches!(mark, DiffMark::Inserted | DiffMark::Deleted) {
                if let Some(parent) = self.doc.parent(node) {
                    self.doc.meta_mut(parent).add_diff_mark(DiffMark::ChildrenChanged);
                }
            }
        }
        if dont_recurse {
            return;
        }

        let mut cur = self.doc.parent(node);
        while let Some(n) = cur.filter(|&n| self.doc.is_element(n) && !self.doc.is_body(n)) {
            if self.doc.meta(n).has_diff_mark(DiffMark::SubtreeChanged) {
                return;
            }
            if !self.doc.is_new_element(n) {
                self.doc.meta_mut(n).add_diff_mark(DiffMark::SubtreeChanged);
            }
            cur = self.doc.parent(n);
        }
    }

    fn has_inserted_mark(&self, node: NodeId) -> bool {
        self.has_mark(node, DiffMark::Inserted)
    }

    // ------------------------------------------------------------------
    // predicates

    fn attrs_equal(&self, a: NodeId, b: NodeId, ignore: &[&str]) -> bool {
        let kept = |n: NodeId| {
            let mut attrs: Vec<(&str, &str)> = self
                .doc
                .attrs(n)
                .iter()
                .filter(|at| !ignore.contains(&at.name.as_str()))
                .map(|at| (at.name.as_str(), at.value.as_str()))
                .collect();
            attrs.sort_unstable();
            attrs
        };
        kept(a) == kept(b) && self.doc.mw(a) == self.doc.mw(b)
    }

    fn similar(&self, a: NodeId, b: NodeId) -> bool {
        let doc = &*self.doc;
        if doc.is_named(a, "a") {
            return doc.is_element(b) && self.attrs_equal(a, b, &["id", "title"]);
        }
        let a_html = doc.is_literal_html(a);
        let b_html = doc.is_literal_html(b);
        (!a_html && !b_html) || (a_html && b_html && self.attrs_equal(a, b, &[]))
    }

    fn mergeable(&self, a: NodeId, b: NodeId) -> bool {
        let doc = &*self.doc;
        doc.is_element(a) && doc.name(a) == doc.name(b) && self.similar(a, b)
    }

    /// `a` has a single child that could merge with `b` if the two were
    /// swapped, as in `<b><i>x</i></b><i>y</i>`.
    fn swappable(&self, a: NodeId, b: NodeId) -> bool {
        let doc = &*self.doc;
        let mut children = doc.children(a).filter(|&c| !doc.is_diff_marker(c));
        let (Some(only), None) = (children.next(), children.next()) else {
            return false;
        };
        self.similar(a, only) && self.mergeable(only, b)
    }

    fn rewriteable_pair(&self, a: NodeId, b: NodeId) -> bool {
        let doc = &*self.doc;
        if doc.name(a).is_some_and(|n| QUOTE_TAGS.contains(&n)) {
            return doc.name(b).is_some_and(|n| QUOTE_TAGS.contains(&n));
        }
        doc.is_named(a, "a")
            && doc.is_named(b, "a")
            && (doc.is_new_element(a) || doc.is_new_element(b))
    }

    fn is_rendering_transparent(&self, node: NodeId) -> bool {
        let doc = &*self.doc;
        doc.is_comment(node)
            || is_sol_transparent_link(doc, node)
            || (doc.is_named(node, "meta") && !doc.is_diff_marker(node))
    }

    /// No content besides diff markers and spaces or tabs.
    fn essentially_empty(&self, node: NodeId) -> bool {
        let doc = &*self.doc;
        doc.children(node).all(|c| {
            if doc.is_element(c) {
                doc.is_diff_marker(c)
            } else if let Some(t) = doc.text(c) {
                t.chars().all(|ch| ch == ' ' || ch == '\t')
            } else {
                false
            }
        })
    }

    // ------------------------------------------------------------------
    // rewrites

    fn migrate_children(&mut self, from: NodeId, to: NodeId) {
        while let Some(c) = self.doc.first_child(from) {
            self.doc.append(to, c);
        }
    }

    /// Joins adjacent text children and drops empty ones.
    fn join_text_children(&mut self, node: NodeId) {
        let mut cur = self.doc.first_child(node);
        while let Some(c) = cur {
            let next = self.doc.next_sibling(c);
            let Some(text) = self.doc.text(c) else {
                cur = next;
                continue;
            };
            if text.is_empty() {
                self.doc.detach(c);
                cur = next;
                continue;
            }
            match next.and_then(|n| self.doc.text(n).map(|t| (n, t.to_string()))) {
                Some((n, more)) => {
                    let joined = format!("{text}{more}");
                    self.doc.set_text(c, joined);
                    self.doc.detach(n);
                }
                None => cur = next,
            }
        }
    }

    /// Moves all of `b`'s children into `a` and removes `b`.
    fn merge(&mut self, a: NodeId, b: NodeId) -> NodeId {
        let sentinel = self.doc.first_child(b);

        // diff markers between the two
        if let Some(between) = self.doc.next_sibling(a).filter(|&n| n != b) {
            self.doc.append(a, between);
        }
        self.migrate_children(b, a);
        self.doc.detach(b);
        self.join_text_children(a);

        if let Some(s) = sentinel {
            if self.doc.parent(s).is_some() {
                self.add_diff_marks(s, DiffMark::Moved, true);
            }
            self.add_diff_marks(a, DiffMark::ChildrenChanged, true);
        }
        if let Some(next) = self.doc.next_sibling(a) {
            self.add_diff_marks(next, DiffMark::Moved, true);
        }
        if let Some(parent) = self.doc.parent(a) {
            self.add_diff_marks(parent, DiffMark::ChildrenChanged, false);
        }
        a
    }

    /// `b` is `a`'s only child; makes `a` the only child of `b` instead.
    fn swap(&mut self, a: NodeId, b: NodeId) -> NodeId {
        self.migrate_children(b, a);
        self.doc.insert_before(a, b);
        self.doc.append(b, a);

        if let Some(first) = self.doc.first_child(a) {
            self.add_diff_marks(first, DiffMark::Moved, true);
        }
        self.add_diff_marks(a, DiffMark::Moved, true);
        self.add_diff_marks(b, DiffMark::Moved, true);
        self.add_diff_marks(a, DiffMark::ChildrenChanged, true);
        self.add_diff_marks(b, DiffMark::ChildrenChanged, true);
        if let Some(parent) = self.doc.parent(b) {
            self.add_diff_marks(parent, DiffMark::ChildrenChanged, false);
        }
        b
    }

    fn edge_child(&self, node: NodeId, rtl: bool) -> Option<NodeId> {
        if rtl {
            self.doc.last_non_deleted_child(node)
        } else {
            self.doc.first_non_deleted_child(node)
        }
    }

    /// Moves category and language links at the start (or end, with `rtl`)
    /// of a heading out of it.
    fn hoist_links(&mut self, node: NodeId, rtl: bool) {
        let Some(parent) = self.doc.parent(node) else {
            return;
        };
        let mut stop = self.edge_child(node, rtl);
        let mut hoistable = false;
        while let Some(s) = stop {
            let next = if rtl {
                self.doc.previous_non_deleted_sibling(s)
            } else {
                self.doc.next_non_deleted_sibling(s)
            };
            if self.doc.is_content_node(s) {
                if !self.is_rendering_transparent(s) || self.doc.is_encapsulation_wrapper(s) {
                    break;
                }
                hoistable = true;
            }
            stop = next;
        }
        if !hoistable {
            return;
        }

        let first_moved = self.edge_child(node, rtl);
        let mut mv = first_moved;
        while let Some(m) = mv.filter(|&m| Some(m) != stop) {
            if rtl {
                match self.doc.next_non_deleted_sibling(node) {
                    Some(after) => self.doc.insert_before(after, m),
                    None => self.doc.append(parent, m),
                }
            } else {
                self.doc.insert_before(node, m);
            }
            mv = self.edge_child(node, rtl);
        }

        if let Some(s) = stop {
            if let Some(text) = self.doc.text(s) {
                let trimmed = if rtl {
                    text.trim_end()
                } else {
                    text.trim_start()
                };
                let trimmed = trimmed.to_string();
                self.doc.set_text(s, trimmed);
            }
        }

        if let Some(f) = first_moved {
            self.add_diff_marks(f, DiffMark::Moved, true);
        }
        if let Some(s) = stop {
            self.add_diff_marks(s, DiffMark::Moved, true);
        }
        self.add_diff_marks(node, DiffMark::ChildrenChanged, true);
        self.add_diff_marks(parent, DiffMark::ChildrenChanged, false);
    }

    /// Replaces every `<br>` below `node` with a space.
    fn strip_brs(&mut self, node: NodeId) {
        let mut child = self.doc.first_child(node);
        while let Some(c) = child {
            let next = self.doc.next_sibling(c);
            if self.doc.is_named(c, "br") {
                let space = self.doc.create_text(" ");
                self.doc.insert_before(c, space);
                self.doc.detach(c);
            } else if self.doc.is_element(c) {
                self.strip_brs(c);
            }
            child = next;
        }
    }

    /// Removes `node` when it has no content; returns what to visit next.
    fn strip_if_empty(&mut self, node: NodeId) -> Option<NodeId> {
        let next = self.doc.next_non_deleted_sibling(node);
        if !self.essentially_empty(node) {
            return Some(node);
        }
        log::trace!("normalize  | dropping empty <{}>", self.doc.name(node).unwrap_or(""));
        self.add_diff_marks(node, DiffMark::Deleted, true);
        self.doc.detach(node);
        next
    }

    fn move_trailing_spaces_out(&mut self, node: NodeId) {
        let Some(last) = self.doc.last_non_deleted_child(node) else {
            return;
        };
        let Some(text) = self.doc.text(last) else {
            return;
        };
        let kept = text.trim_end();
        if kept.len() == text.len() {
            return;
        }
        let spaces = text[kept.len()..].to_string();
        let kept = kept.to_string();
        self.doc.set_text(last, kept);

        let next = self.doc.next_non_deleted_sibling(node);
        if let Some(next) = next {
            let next_text = self.doc.text(next).map(str::to_string);
            if !next_text.as_deref().is_some_and(|t| t.starts_with(char::is_whitespace)) {
                let target = match next_text {
                    Some(t) => {
                        self.doc.set_text(next, format!("{spaces}{t}"));
                        next
                    }
                    None => {
                        let txt = self.doc.create_text(spaces);
                        self.doc.insert_before(next, txt);
                        txt
                    }
                };
                self.add_diff_marks(target, DiffMark::Inserted, true);
            }
        }
        self.add_diff_marks(last, DiffMark::Inserted, true);
        if let Some(parent) = self.doc.parent(node) {
            self.add_diff_marks(parent, DiffMark::ChildrenChanged, false);
        }
    }

    fn move_leading_spaces_out(&mut self, node: NodeId) {
        let Some(first) = self.doc.first_non_deleted_child(node) else {
            return;
        };
        let Some(text) = self.doc.text(first) else {
            return;
        };
        let kept = text.trim_start();
        if kept.len() == text.len() {
            return;
        }
        let spaces = text[..text.len() - kept.len()].to_string();
        let kept = kept.to_string();
        self.doc.set_text(first, kept);

        let prev = self.doc.previous_non_deleted_sibling(node);
        let prev_text = prev.and_then(|p| self.doc.text(p).map(str::to_string));
        if !prev_text.as_deref().is_some_and(|t| t.ends_with(char::is_whitespace)) {
            let target = match (prev, prev_text) {
                (Some(p), Some(t)) => {
                    self.doc.set_text(p, format!("{t}{spaces}"));
                    p
                }
                _ => {
                    let txt = self.doc.create_text(spaces);
                    self.doc.insert_before(node, txt);
                    txt
                }
            };
            self.add_diff_marks(target, DiffMark::Inserted, true);
        }
        self.add_diff_marks(first, DiffMark::Inserted, true);
        if let Some(parent) = self.doc.parent(node) {
            self.add_diff_marks(parent, DiffMark::ChildrenChanged, false);
        }
    }

    /// `<a href="./Foo"><b>Foo</b></a>` becomes `<b><a href="./Foo">Foo</a></b>`
    /// so the link keeps its simple form.
    fn move_format_tags_outside_link(&mut self, node: NodeId) -> Option<NodeId> {
        if let Some(sibling) = self.doc.next_non_deleted_sibling(node) {
            self.normalize_sibling_pair(node, sibling);
        }
        // merging may have moved the link into a new parent; it stays valid
        let Some(first) = self.doc.first_non_deleted_child(node) else {
            return Some(node);
        };
        let Some(href) = self.doc.attr(node, "href") else {
            return Some(node);
        };
        let target = href.replacen("./", "", 1);
        let single = self.doc.next_non_deleted_sibling(first).is_none();
        let blocked = ["color", "style", "class"]
            .iter()
            .any(|a| self.doc.attr(first, a).is_some());
        if !self.doc.is_element(first)
            || !single
            || blocked
            || self.doc.text_content(node) != target
        {
            return Some(node);
        }
        while let Some(child) = self
            .doc
            .first_non_deleted_child(node)
            .filter(|&c| self.doc.name(c).is_some_and(|n| FORMATTING_TAGS.contains(&n)))
        {
            self.swap(node, child);
        }
        Some(first)
    }

    // ------------------------------------------------------------------
    // traversal

    fn skips_unmodified(&self, node: NodeId) -> bool {
        self.selser
            && !self.doc.is_body(node)
            && !self.in_inserted
            && !self.doc.has_diff_markers(node)
            && orig_src_valid_in_edited_context(self.doc, node)
    }

    /// Returns `node` when it is unchanged, or the node to continue with.
    fn normalize_node(&mut self, node: NodeId) -> Option<NodeId> {
        if self.skips_unmodified(node) {
            return Some(node);
        }
        let Some(name) = self.doc.name(node).map(str::to_string) else {
            return Some(node);
        };
        match name.as_str() {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.hoist_links(node, false);
                self.hoist_links(node, true);
                self.strip_brs(node);
                self.strip_if_empty(node)
            }
            "b" | "i" => {
                let kept = self.strip_if_empty(node);
                if kept != Some(node) {
                    return kept;
                }
                self.move_leading_spaces_out(node);
                self.move_trailing_spaces_out(node);
                Some(node)
            }
            "a" => {
                let next = self.doc.next_non_deleted_sibling(node);
                if self.doc.attr(node, "rel") == Some("mw:WikiLink")
                    && self.strip_if_empty(node) != Some(node)
                {
                    return next;
                }
                self.move_trailing_spaces_out(node);
                self.move_format_tags_outside_link(node)
            }
            "td" => {
                self.space_before_escapable_cell_prefix(node);
                Some(node)
            }
            "font" if self.doc.attrs(node).is_empty() => {
                let next = self.doc.next_non_deleted_sibling(node);
                while let Some(c) = self.doc.first_child(node) {
                    self.doc.insert_before(node, c);
                }
                self.doc.detach(node);
                next
            }
            _ => Some(node),
        }
    }

    /// A cell starting with `-`, `+` or `}` would read as table syntax;
    /// a leading space is quieter than a `<nowiki/>`.
    fn space_before_escapable_cell_prefix(&mut self, node: NodeId) {
        let dp = self.doc.dp(node);
        let later_row_cell = dp.is_stx(Stx::Row)
            && self
                .doc
                .parent(node)
                .is_some_and(|p| self.doc.first_non_sep_child(p) != Some(node));
        if dp.is_stx(Stx::Html) || later_row_cell {
            return;
        }
        let Some(first) = self.doc.first_non_deleted_child(node) else {
            return;
        };
        let Some(text) = self.doc.text(first) else {
            return;
        };
        if text.starts_with(['-', '+', '}']) {
            let spaced = format!(" {text}");
            self.doc.set_text(first, spaced);
            self.add_diff_marks(first, DiffMark::Inserted, true);
        }
    }

    /// Merges `a` and `b` when they are the same formatting, directly or
    /// after swapping one with its only child. Returns the node to pair
    /// with the next sibling.
    fn normalize_sibling_pair(&mut self, a: NodeId, b: NodeId) -> Option<NodeId> {
        if !self.rewriteable_pair(a, b) {
            return Some(b);
        }
        let merged = if self.mergeable(a, b) {
            self.merge(a, b)
        } else if self.swappable(a, b) {
            let Some(child) = self.doc.first_non_deleted_child(a) else {
                return Some(b);
            };
            let outer = self.swap(a, child);
            self.merge(outer, b)
        } else if self.swappable(b, a) {
            let Some(child) = self.doc.first_non_deleted_child(b) else {
                return Some(b);
            };
            let outer = self.swap(b, child);
            self.merge(a, outer)
        } else {
            return Some(b);
        };
        log::trace!("normalize  | merged <{}>", self.doc.name(merged).unwrap_or(""));
        self.process_subtree(merged, false);
        Some(merged)
    }

    fn process_subtree(&mut self, node: NodeId, recurse: bool) {
        let Some(first) = self.doc.first_non_deleted_child(node) else {
            return;
        };
        let mut a = self.process_node(first, recurse);
        while let Some(cur) = a {
            let Some(b) = self.doc.next_non_deleted_sibling(cur) else {
                return;
            };
            a = match self.process_node(b, recurse) {
                Some(b) if self.doc.previous_non_deleted_sibling(b) == Some(cur) => {
                    self.normalize_sibling_pair(cur, b)
                }
                other => other,
            };
        }
    }

    /// Normalizes `node` (after its subtree when `recurse`) until it stops
    /// changing, skipping template and extension output.
    fn process_node(&mut self, node: NodeId, recurse: bool) -> Option<NodeId> {
        let mut node = node;
        loop {
            let mut cur = Some(node);
            while let Some(n) = cur.filter(|&n| self.doc.is_first_encapsulation_wrapper(n)) {
                cur = self.doc.skip_over_encapsulated_content(n);
            }
            let n = cur?;

            let inserted = self.has_inserted_mark(n);
            let outer = self.in_inserted;
            if inserted {
                self.in_inserted = true;
            }
            if recurse && self.doc.is_element(n) {
                self.process_subtree(n, true);
            }
            let next = self.normalize_node(n);
            self.in_inserted = outer;

            match next {
                Some(next) if next == n => return Some(n),
                Some(next) => node = next,
                None => return None,
            }
        }
    }
}
