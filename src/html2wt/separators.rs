//! Separator constraints and separator text.
//!
//! Every transition between two nodes (parent to first child, sibling to
//! sibling, last child to parent) records a newline [`Constraint`]. The
//! constraints pile up until the next chunk of output, at which point a
//! separator is chosen: original source when it can be reused, otherwise
//! buffered DOM whitespace fitted to the constraint.

use crate::dom::{Diagnostic, DiagnosticPhase, DiffMark, DomSourceRange, NodeId};
use crate::html2wt::selser::orig_src_valid_in_edited_context;
use crate::html2wt::{Constraint, ConstraintInfo, PendingConstraint, SepType, SerializeContext};
use regex::Regex;
use std::sync::LazyLock;

static VALID_SEP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\s|<!--(?s:.)*?-->)*$").expect("valid sep regex"));

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!--(?s:.)*?-->").expect("comment regex"));

// blanks on the last line, optionally followed by a comment and the rest of the line
static WS_COMMENTS_TAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"( +)(<!--(?s:.)*?-->[^\n]*)?$").expect("ws-comments regex")
});

static NL_WS_COMMENTS_TAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n+( +)(<!--(?s:.)*?-->[^\n]*)?$").expect("nl-ws-comments regex")
});

/// Tags that only parse as wikitext at the start of a line.
pub(crate) const SOL_TAGS: &[&str] = &[
    "pre", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "dl", "li", "dt", "dd", "table",
    "caption", "tr", "td", "th", "hr",
];

const BLOCK_SCOPE_OPENERS: &[&str] = &[
    "blockquote", "center", "div", "dl", "dd", "dt", "h1", "h2", "h3", "h4", "h5", "h6", "li",
    "ol", "p", "pre", "table", "tr", "ul",
];

/// Whether `sep` is made only of whitespace and comments.
pub fn is_valid_sep(sep: &str) -> bool {
    VALID_SEP.is_match(sep)
}

pub(crate) fn strip_comments(text: &str) -> std::borrow::Cow<'_, str> {
    COMMENT.replace_all(text, "")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SepBit<'s> {
    text: &'s str,
    /// A comment, or a run of comment-only lines; newlines in it do not count.
    ignored: bool,
}

fn comment_len(s: &str) -> Option<usize> {
    let body = s.strip_prefix("<!--")?;
    body.find("-->").map(|end| end + 7)
}

/// Length of a run of lines that hold nothing but blanks and comments, each
/// introduced by a newline and followed by another one.
fn comment_lines_len(s: &str) -> Option<usize> {
    let mut total = 0;
    loop {
        let rest = &s[total..];
        if !rest.starts_with('\n') {
            break;
        }
        let mut j = 1;
        let mut saw_comment = false;
        loop {
            let tail = &rest[j..];
            j += tail.len() - tail.trim_start_matches([' ', '\t']).len();
            match comment_len(&rest[j..]) {
                Some(n) => {
                    j += n;
                    saw_comment = true;
                }
                None => break,
            }
        }
        if saw_comment && rest[j..].starts_with('\n') {
            total += j;
        } else {
            break;
        }
    }
    (total > 0).then_some(total)
}

fn split_sep(sep: &str) -> Vec<SepBit<'_>> {
    let mut bits = Vec::new();
    let mut plain_start = 0;
    let mut i = 0;
    while i < sep.len() {
        let rest = &sep[i..];
        match comment_lines_len(rest).or_else(|| comment_len(rest)) {
            Some(n) => {
                if plain_start < i {
                    bits.push(SepBit {
                        text: &sep[plain_start..i],
                        ignored: false,
                    });
                }
                bits.push(SepBit {
                    text: &sep[i..i + n],
                    ignored: true,
                });
                i += n;
                plain_start = i;
            }
            None => i += rest.chars().next().map_or(1, char::len_utf8),
        }
    }
    if plain_start < sep.len() {
        bits.push(SepBit {
            text: &sep[plain_start..],
            ignored: false,
        });
    }
    bits
}

/// Newlines in `sep` that the wikitext parser would see.
pub fn count_newlines(sep: &str) -> usize {
    split_sep(sep)
        .iter()
        .filter(|b| !b.ignored)
        .map(|b| b.text.matches('\n').count())
        .sum()
}

/// Removes newlines outside comments, last ones first, until at most `max`
/// remain.
fn trim_newlines(sep: &str, count: usize, max: usize) -> String {
    let mut bits: Vec<(String, bool)> = split_sep(sep)
        .into_iter()
        .map(|b| (b.text.to_string(), b.ignored))
        .collect();
    let mut n = count;
    for (text, ignored) in bits.iter_mut().rev() {
        if n <= max {
            break;
        }
        if *ignored {
            continue;
        }
        while n > max {
            let Some(i) = text.find('\n') else { break };
            text.remove(i);
            n -= 1;
        }
    }
    bits.into_iter().map(|(t, _)| t).collect()
}

impl SerializeContext<'_> {
    /// Records the newline constraint between `a` and `b` and merges it into
    /// whatever is still pending.
    pub(crate) fn update_separator_constraints(&mut self, a: NodeId, b: NodeId) {
        let doc = self.doc;
        let ha = self.handler_for(a);
        let hb = self.handler_for(b);

        let (sep_type, a_cons, b_cons) = if doc.parent(b) == Some(a) {
            let bc = if doc.is_element(b) {
                hb.before(b, a, self)
            } else {
                Constraint::default()
            };
            (SepType::ParentChild, ha.first_child(a, b, self), bc)
        } else if doc.parent(a) == Some(b) {
            let ac = if doc.is_element(a) {
                ha.after(a, b, self)
            } else {
                Constraint::default()
            };
            (SepType::ChildParent, ac, hb.last_child(b, a, self))
        } else {
            let ac = if doc.is_element(a) {
                ha.after(a, b, self)
            } else {
                Constraint::default()
            };
            let bc = if doc.is_element(b) {
                hb.before(b, a, self)
            } else {
                Constraint::default()
            };
            (SepType::Sibling, ac, bc)
        };

        let mut constraint = self.merge_constraints(a_cons, b_cons, a, b);
        if let Some(pending) = self.state.sep.constraints {
            constraint = self.merge_constraints(pending.constraint, constraint, a, b);
        }

        log::trace!(
            "constraint | {sep_type:?} | <{},{}> | {constraint:?}",
            self.node_label(a),
            self.node_label(b)
        );

        self.state.sep.constraints = Some(PendingConstraint {
            constraint,
            info: ConstraintInfo {
                on_sol: self.state.buf.on_sol,
                force_sol: hb.force_sol() && doc.is_element(b),
                sep_type,
                node_a: a,
                node_b: b,
            },
        });
    }

    fn merge_constraints(
        &mut self,
        old: Constraint,
        new: Constraint,
        a: NodeId,
        b: NodeId,
    ) -> Constraint {
        let merged = old.merge(new);
        if merged.conflict {
            let diag = Diagnostic::warning(
                DiagnosticPhase::Serialize,
                "html2wt.separator.conflict",
                format!(
                    "incompatible newline constraints between <{}> and <{}>",
                    self.node_label(a),
                    self.node_label(b)
                ),
            )
            .with_note(format!(
                "{{{}, {}}} vs {{{}, {}}}, resolved to {{{}, {}}}",
                old.min,
                fmt_max(old.max),
                new.min,
                fmt_max(new.max),
                merged.constraint.min,
                fmt_max(merged.constraint.max)
            ));
            self.push_diagnostic(diag);
        }
        merged.constraint
    }

    /// Fits `sep` to `constraint`: kept as-is when its newline count is in
    /// range, padded with newlines below `min`, trimmed above `max`.
    pub(crate) fn make_separator(
        &self,
        sep: &str,
        constraint: Constraint,
        info: Option<ConstraintInfo>,
    ) -> String {
        let doc = self.doc;
        let nl_count = count_newlines(sep);
        let mut min = constraint.min;
        if min > 0 && (self.state.buf.at_start_of_output || self.state.at_end_of_output) {
            // the document edge already counts as a line start
            min -= 1;
        }

        let out = if min > 0 && nl_count < min {
            let pad = "\n".repeat(min - nl_count);
            let prepend = match info {
                Some(i) if i.sep_type == SepType::ParentChild => {
                    let first = doc
                        .children(i.node_a)
                        .find(|&c| !doc.is_diff_marker(c));
                    !first.is_some_and(|c| doc.is_content_node(c))
                        && !(doc.is_table_child_tag(i.node_b) && !doc.is_literal_html(i.node_b))
                }
                Some(i) if i.sep_type == SepType::Sibling => doc.is_literal_html(i.node_b),
                _ => false,
            };
            if prepend {
                pad + sep
            } else {
                format!("{sep}{pad}")
            }
        } else if nl_count > constraint.max {
            trim_newlines(sep, nl_count, constraint.max)
        } else {
            sep.to_string()
        };

        log::trace!(
            "make-sep   | {out:?}, {sep:?}, min {min}, count {nl_count}, max {}",
            fmt_max(constraint.max)
        );
        out
    }

    /// The constraint to honor for the separator about to be emitted.
    fn effective_constraint(&self) -> (Option<Constraint>, Option<ConstraintInfo>) {
        let pending = self.state.sep.constraints;
        let info = pending.map(|p| p.info);
        if self.state.single_line.enforced() {
            return (Some(Constraint::single_line()), info);
        }
        (pending.map(|p| p.constraint), info)
    }

    /// Emits the separator owed before `node`.
    pub(crate) fn emit_sep_for_node(&mut self, node: NodeId) {
        let doc = self.doc;
        let st = &self.state;
        let again = st.sep.last_source_node == Some(node);
        let orig_usable = !again
            && st.prev_node_unmodified
            && st.curr_node_unmodified
            && !st
                .prev_node
                .is_some_and(|p| doc.next_to_deleted_block_node(p, true))
            && !doc.next_to_deleted_block_node(node, false);

        let orig = if orig_usable {
            match st.prev_node {
                Some(prev) if doc.is_element(prev) && doc.is_element(node) => {
                    let end = doc.dp(prev).dsr.and_then(|d| d.end);
                    let start = doc.dp(node).dsr.and_then(|d| d.start);
                    match (end, start, self.orig_src()) {
                        (Some(e), Some(s), Some(src)) => {
                            src.slice_between(e, s).map(str::to_string)
                        }
                        _ => None,
                    }
                }
                _ => st.sep.src.clone(),
            }
        } else {
            None
        };

        let sep = match orig.filter(|s| is_valid_sep(s)) {
            Some(orig) => {
                log::trace!("orig-sep   | {orig:?}");
                match self.effective_constraint() {
                    (Some(c), info) => self.make_separator(&orig, c, info),
                    (None, _) => orig,
                }
            }
            None => self.build_sep(node).unwrap_or_default(),
        };
        self.emit_sep(sep, node);
    }

    fn emit_sep(&mut self, sep: String, node: NodeId) {
        let sep = if self.state.single_line.enforced() {
            sep.replace('\n', " ")
        } else {
            sep
        };
        log::trace!("---> sep   | {sep:?}");
        self.state.buf.push(&sep);
        self.state.sep.constraints = None;
        self.state.sep.src = None;
        self.state.sep.last_source_node = Some(node);
        if strip_comments(&sep).ends_with('\n') {
            self.state.buf.on_sol = true;
        }
    }

    /// Chooses the separator text when the verbatim gap between two
    /// unmodified neighbours is not available.
    fn build_sep(&mut self, node: NodeId) -> Option<String> {
        let doc = self.doc;
        let prev = self.state.sep.last_source_node;
        let mut sep: Option<String> = None;

        if let Some(prev) = prev.filter(|&p| p != node && self.state.selser_mode) {
            let usable = !self.state.in_modified_content
                && !doc.next_to_deleted_block_node(prev, true)
                && !doc.next_to_deleted_block_node(node, false)
                && orig_src_valid_in_edited_context(doc, prev)
                && orig_src_valid_in_edited_context(doc, node);
            if usable {
                sep = self.orig_sep_between(prev, node);
            } else if !doc.has_diff_markers(prev) {
                self.recover_sep_before_inserted(prev, node);
            }
        }

        log::trace!(
            "maybe-sep  | node: {}, sep: {sep:?}, src: {:?}",
            self.node_label(node),
            self.state.sep.src
        );

        let (constraint, info) = self.effective_constraint();
        let src_differs = self
            .state
            .sep
            .src
            .as_deref()
            .is_some_and(|src| !src.is_empty() && Some(src) != sep.as_deref());
        if sep.is_none() || src_differs {
            sep = if constraint.is_some() || self.state.sep.src.as_deref().is_some_and(|s| !s.is_empty()) {
                let c = constraint.unwrap_or(Constraint::exactly(0));
                Some(self.make_separator(self.state.sep.src_str(), c, info))
            } else {
                None
            };
        }

        sep.map(|s| self.make_sep_indent_pre_safe(s, info))
    }

    /// Source text between `prev` and `node` derived from their DSRs.
    fn orig_sep_between(&self, prev: NodeId, node: NodeId) -> Option<String> {
        let doc = self.doc;
        let src = self.orig_src()?;

        let dsr_a = if doc.is_element(prev) {
            auto_inserted_dsr(self, prev)
        } else {
            let parent = doc.parent(prev)?;
            let parent_close = doc.dp(parent).dsr.and_then(|d| d.close_width);
            let prev_elt = doc.prev_sibling(prev).filter(|&p| doc.is_element(p));
            if doc.next_sibling(prev).is_none() && parent != node && parent_close == Some(0) {
                // text at the end of a zero-width wrapper like <p>
                auto_inserted_dsr(self, parent)
            } else if let Some(pe) = prev_elt
                .filter(|_| !doc.meta(parent).has_diff_mark(DiffMark::ChildrenChanged))
            {
                let end = doc.dp(pe).dsr.and_then(|d| d.end)?;
                let len = match (doc.text(prev), doc.comment(prev)) {
                    (Some(t), _) => t.chars().count(),
                    (_, Some(c)) => c.chars().count() + 7,
                    _ => 0,
                };
                Some(DomSourceRange::new(
                    end,
                    end + len + self.indent_pre_dsr_correction(prev),
                    0,
                    0,
                ))
            } else {
                None
            }
        }?;

        let dsr_b = if doc.is_element(node) {
            let mut n = node;
            if doc.parent(prev) == Some(node) {
                // walk up to an ancestor whose range is known
                while doc.next_sibling(n).is_none()
                    && !doc.is_body(n)
                    && !doc.dp(n).dsr.is_some_and(|d| d.start.is_some() && d.end.is_some())
                {
                    match doc.parent(n) {
                        Some(p) => n = p,
                        None => break,
                    }
                }
            }
            auto_inserted_dsr(self, n)
        } else {
            let parent = doc.parent(node)?;
            let parent_dsr = doc.dp(parent).dsr?;
            if parent != prev && parent_dsr.open_width == Some(0) {
                let sep_len = preceding_separator_text_len(self, node)?;
                let mut d = parent_dsr;
                if let Some(s) = d.start.filter(|_| sep_len > 0) {
                    d.start = Some(s + sep_len);
                }
                Some(d)
            } else {
                None
            }
        }?;

        if !dsr_a.is_valid() || !dsr_b.is_valid() {
            return None;
        }
        let (a_start, a_end) = (dsr_a.start?, dsr_a.end?);
        let (b_start, b_end) = (dsr_b.start?, dsr_b.end?);

        let sep = if a_start <= b_start {
            if b_end <= a_end {
                if a_start == b_start && a_end == b_end {
                    Some("")
                } else {
                    // parent to child
                    dsr_a
                        .inner_start()
                        .and_then(|inner| src.slice_between(inner, b_start))
                }
            } else if a_end <= b_start {
                src.slice_between(a_end, b_start)
            } else {
                // child to parent
                dsr_b
                    .inner_end()
                    .and_then(|inner| src.slice_between(a_end, inner))
            }
        } else if a_end <= b_end {
            dsr_b
                .inner_end()
                .and_then(|inner| src.slice_between(a_end, inner))
        } else {
            log::debug!("dsr backwards between {prev:?} and {node:?}");
            None
        };

        sep.filter(|s| is_valid_sep(s)).map(str::to_string)
    }

    /// When `prev` is unmodified and the node after it was inserted, the
    /// original gap after `prev` is carried over as buffered separator text.
    fn recover_sep_before_inserted(&mut self, prev: NodeId, node: NodeId) {
        let doc = self.doc;
        let Some(next) = doc
            .next_non_sep_sibling(prev)
            .filter(|&n| doc.meta(n).has_diff_mark(DiffMark::Inserted))
        else {
            return;
        };
        if node != next {
            // every wrapper between `node` and `next` must be zero-width
            let mut n = doc.parent(node);
            while let Some(p) = n.filter(|&p| p != next) {
                if !doc.is_zero_width_wikitext_elt(p) {
                    return;
                }
                n = doc.parent(p);
            }
            if n.is_none() {
                return;
            }
        }
        let Some(src) = self.orig_src() else { return };
        let Some(o1) = doc.is_element(prev).then(|| doc.dp(prev).dsr.and_then(|d| d.end)).flatten()
        else {
            return;
        };
        let o2 = match doc.next_non_sep_sibling(next) {
            None => doc
                .parent(prev)
                .and_then(|p| doc.dp(p).dsr)
                .and_then(|d| d.inner_end()),
            Some(orig_next) if !doc.has_diff_markers(orig_next) && doc.is_element(orig_next) => {
                doc.dp(orig_next).dsr.and_then(|d| d.start)
            }
            Some(_) => None,
        };
        if let Some(recovered) = o2.and_then(|o2| src.slice_between(o1, o2)) {
            if is_valid_sep(recovered) {
                log::debug!("recovered separator {recovered:?} before inserted node");
                self.state.sep.src = Some(recovered.to_string());
            }
        }
    }

    fn indent_pre_dsr_correction(&self, text_node: NodeId) -> usize {
        let doc = self.doc;
        let Some(text) = doc.text(text_node) else {
            return 0;
        };
        let Some(parent) = doc.parent(text_node) else {
            return 0;
        };
        if !doc.is_named(parent, "pre") || doc.is_literal_html(parent) {
            return 0;
        }
        let mut nls = text.matches('\n').count();
        if doc.last_child(parent) == Some(text_node) && text.ends_with('\n') {
            nls = nls.saturating_sub(1);
        }
        nls
    }

    /// Keeps trailing blanks in `sep` from starting an indent-pre before
    /// `node_b`: they are stripped, or wrapped in `<nowiki>`.
    fn make_sep_indent_pre_safe(&mut self, sep: String, info: Option<ConstraintInfo>) -> String {
        let Some(info) = info else { return sep };
        if self.state.in_indent_pre || self.state.in_html_pre {
            return sep;
        }
        let doc = self.doc;
        let force_sol = info.force_sol && info.sep_type != SepType::ChildParent;
        let at_risk = NL_WS_COMMENTS_TAIL.is_match(&sep)
            || (WS_COMMENTS_TAIL.is_match(&sep) && (info.on_sol || force_sol));
        if !at_risk {
            return sep;
        }

        let orig_b = info.node_b;
        let mut safe = false;
        let mut node_b = Some(orig_b);
        if self.preceding_space_suppresses_indent_pre(orig_b, orig_b) {
            safe = true;
        } else if info.sep_type == SepType::Sibling || doc.is_body(info.node_a) {
            while let Some(n) = node_b.filter(|&n| {
                doc.is_diff_marker(n) || self.emits_sol_transparent_single_line_wt(n)
            }) {
                node_b = doc.next_sibling(n);
            }
            safe = node_b.is_none_or(|n| self.preceding_space_suppresses_indent_pre(n, orig_b));
        }

        if let Some(nb) = node_b.filter(|&n| !safe && !doc.is_body(n)) {
            let mut parent = doc.parent(nb);
            while let Some(p) = parent.filter(|&p| doc.is_zero_width_wikitext_elt(p)) {
                parent = doc.parent(p);
            }
            if let Some(p) = parent {
                safe = doc.is_named(p, "blockquote")
                    || doc.closest(p, |a| doc.is_named(a, "blockquote")).is_some();
            }
            while let Some(p) = parent.filter(|&p| !safe && !doc.is_body(p)) {
                let name = doc.name(p).unwrap_or("");
                if BLOCK_SCOPE_OPENERS.contains(&name) && (name != "p" || doc.is_literal_html(p)) {
                    safe = true;
                } else if matches!(name, "td" | "th") {
                    break;
                }
                parent = doc.parent(p);
            }
        }

        let strip = (info.on_sol || force_sol)
            && node_b.is_some_and(|n| {
                !doc.is_literal_html(n) && doc.name(n).is_some_and(|t| SOL_TAGS.contains(&t))
            });
        if safe && !strip {
            return sep;
        }

        let strip = strip || self.options.strip_indent_pre_whitespace;
        let mut wrapped = false;
        let out = WS_COMMENTS_TAIL
            .replace(&sep, |caps: &regex::Captures<'_>| {
                let rest = caps.get(2).map_or("", |m| m.as_str());
                if strip {
                    rest.to_string()
                } else {
                    wrapped = true;
                    format!("<nowiki>{}</nowiki>{rest}", &caps[1])
                }
            })
            .into_owned();
        if wrapped {
            self.state.buf.on_sol = false;
        }
        log::trace!("ipre-safe  | {out:?}");
        out
    }

    fn preceding_space_suppresses_indent_pre(&self, node: NodeId, sep_node: NodeId) -> bool {
        let doc = self.doc;
        if node != sep_node {
            if let Some(text) = doc.text(node) {
                return text.trim_start_matches([' ', '\t']).starts_with('\n');
            }
        }
        if doc.is_named(node, "br") {
            return true;
        }
        if doc.is_first_encapsulation_wrapper(node) {
            return match doc.first_child(node) {
                None => true,
                Some(c) => doc.text(c).is_some_and(|t| t.starts_with('\n')),
            };
        }
        doc.is_block_node_with_visible_wt(node)
    }

    pub(crate) fn emits_sol_transparent_single_line_wt(&self, node: NodeId) -> bool {
        let doc = self.doc;
        if let Some(text) = doc.text(node) {
            return text.chars().all(|c| c == ' ' || c == '\t');
        }
        doc.is_comment(node)
            || doc.attr_has_token(node, "rel", "mw:PageProp/Category")
            || (doc.is_named(node, "meta") && !doc.is_diff_marker(node))
    }
}

/// The node's DSR with the widths of builder-inserted tags unknown.
fn auto_inserted_dsr(cx: &SerializeContext<'_>, node: NodeId) -> Option<DomSourceRange> {
    let dp = cx.doc.dp(node);
    let mut dsr = dp.dsr?;
    if dp.auto_inserted_start {
        dsr.open_width = None;
    }
    if dp.auto_inserted_end {
        dsr.close_width = None;
    }
    Some(dsr)
}

/// Source length of the whitespace and comments before `node` in its parent,
/// or `None` when an element precedes it.
fn preceding_separator_text_len(cx: &SerializeContext<'_>, node: NodeId) -> Option<usize> {
    let doc = cx.doc;
    let mut len = 0;
    let mut cur = Some(node);
    while let Some(n) = cur {
        if doc.is_iew(n) {
            len += doc.text(n).map_or(0, |t| t.chars().count());
        } else if let Some(c) = doc.comment(n) {
            len += c.chars().count() + 7;
        } else if n != node {
            return None;
        }
        cur = doc.prev_sibling(n);
    }
    Some(len)
}

fn fmt_max(max: usize) -> String {
    if max == Constraint::UNBOUNDED {
        "inf".to_string()
    } else {
        max.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_only_lines_do_not_count() {
        assert_eq!(count_newlines("\n\n"), 2);
        assert_eq!(count_newlines("\n<!-- c -->\n"), 1);
        assert_eq!(count_newlines("\n  <!--a--> <!--b-->\n\n"), 2);
        assert_eq!(count_newlines("<!--\n\n-->"), 0);
        assert_eq!(count_newlines(" <!--x--> \n"), 1);
    }

    #[test]
    fn split_keeps_every_byte() {
        let sep = "\n <!--a-->\n\t<!--b-->x\n";
        let joined: String = split_sep(sep).iter().map(|b| b.text).collect();
        assert_eq!(joined, sep);
    }

    #[test]
    fn trimming_skips_comments() {
        assert_eq!(trim_newlines("\n\n\n", 3, 1), "\n");
        let sep = "\n<!--a-->\n\n";
        assert_eq!(count_newlines(sep), 2);
        assert_eq!(trim_newlines(sep, 2, 1), "\n<!--a-->\n");
        assert_eq!(trim_newlines("\n  \n", 2, 0), "  ");
    }

    #[test]
    fn valid_separators() {
        assert!(is_valid_sep(""));
        assert!(is_valid_sep(" \n<!-- x -->\t\n"));
        assert!(!is_valid_sep("\nx\n"));
        assert!(!is_valid_sep("<!-- open"));
    }
}
