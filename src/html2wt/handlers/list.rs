use crate::dom::{Diagnostic, DiagnosticPhase, Document, NodeId, Stx};
use crate::error::Result;
use crate::html2wt::handlers::{leading_space, DomHandler};
use crate::html2wt::{Constraint, SerializeContext};

const FORMATTING_ELEMENTS: &[&str] = &[
    "a", "b", "big", "code", "em", "font", "i", "nobr", "s", "small", "strike", "strong", "tt",
    "u",
];

/// Builds the bullet prefix of `node` by walking up the list nesting.
///
/// Each wikitext list level contributes one character. HTML-syntax lists
/// end the walk, except wrappers the tree builder inserted on both ends,
/// which have no source of their own.
pub(crate) fn list_bullets(cx: &mut SerializeContext<'_>, node: NodeId) -> String {
    let doc = cx.doc;
    let new_default = if cx.options.space_after_new_bullets {
        " "
    } else {
        ""
    };
    let space = leading_space(cx, node, new_default);

    let mut bullets = String::new();
    let mut cur = Some(node);
    while let Some(n) = cur.filter(|&n| !doc.is_body(n)) {
        let name = doc.name(n).unwrap_or("");
        let html = doc.is_literal_html(n);
        if !html && matches!(name, "ul" | "ol" | "dl" | "li" | "dt" | "dd") {
            match name {
                "li" => match doc.closest(n, |a| matches!(doc.name(a), Some("ul" | "ol"))) {
                    Some(list) if doc.is_named(list, "ol") => bullets.insert(0, '#'),
                    Some(_) => bullets.insert(0, '*'),
                    None => {
                        let diag = Diagnostic::warning(
                            DiagnosticPhase::Serialize,
                            "html2wt.list.orphan_item",
                            format!("<li> {} has no enclosing <ul> or <ol>", cx.node_label(n)),
                        )
                        .with_range(doc.dp(n).dsr.and_then(|d| d.range()));
                        cx.push_diagnostic(diag);
                    }
                },
                "dt" => bullets.insert(0, ';'),
                "dd" => bullets.insert(0, ':'),
                _ => {}
            }
        } else if !html || !doc.is_builder_inserted(n) {
            break;
        }
        cur = doc.parent(n);
    }

    if bullets.is_empty() {
        bullets
    } else {
        bullets + &space
    }
}

/// Newline constraint after a list or list item.
fn list_eol(doc: &Document, node: NodeId, other: NodeId) -> Constraint {
    if doc.is_body(other) {
        return Constraint::default();
    }
    if doc.is_text(other) {
        return Constraint::new(1, 2);
    }
    if !doc.is_element(other) {
        return Constraint::default();
    }
    if doc.is_first_encapsulation_wrapper(other) {
        return Constraint::new(usize::from(doc.is_list(node)), 2);
    }

    let next = doc.next_non_sep_sibling(node);
    let other_dp = doc.dp(other);
    if (next == Some(other) && other_dp.is_stx(Stx::Html)) || other_dp.src.is_some() {
        return Constraint::default();
    }
    if next == Some(other) && (doc.is_list(other) || doc.is_list_item(other)) {
        if doc.is_list(node) && doc.name(other) == doc.name(node) {
            // adjacent lists of one type would merge
            return Constraint::exactly(2);
        }
        if doc.is_list_item(node)
            || doc
                .parent(node)
                .is_some_and(|p| matches!(doc.name(p), Some("li" | "dd")))
        {
            return Constraint::exactly(1);
        }
        return Constraint::new(1, 2);
    }
    if doc.is_list(other) || other_dp.is_stx(Stx::Html) {
        // the enclosing list decides
        return Constraint::default();
    }
    if let Some(parent) = doc.parent(node) {
        if doc.is_block_node(parent) && doc.last_non_sep_child(parent) == Some(node) {
            return Constraint::new(1, 2);
        }
    }
    if doc.name(other).is_some_and(|n| FORMATTING_ELEMENTS.contains(&n)) {
        return Constraint::exactly(1);
    }
    Constraint::new(1, 2)
}

fn emits_own_bullets(doc: &Document, node: NodeId) -> bool {
    doc.first_non_sep_child(node)
        .is_none_or(|c| !doc.is_list(c) || doc.is_literal_html(c))
}

fn serialize_item_content(cx: &mut SerializeContext<'_>, node: NodeId) -> Result<()> {
    let mut cx = cx.enforce_single_line();
    cx.serialize_children(node)
}

fn item_first_child(doc: &Document, child: NodeId) -> Constraint {
    if doc.is_list(child) {
        Constraint::default()
    } else {
        Constraint::exactly(0)
    }
}

/// `ul`, `ol` and `dl`.
pub struct ListHandler;

impl DomHandler for ListHandler {
    fn handle(
        &self,
        node: NodeId,
        cx: &mut SerializeContext<'_>,
        _wrapper_unmodified: bool,
    ) -> Result<Option<NodeId>> {
        let doc = cx.doc;
        let mut cx = cx.disable_single_line();

        let mut first = doc.first_non_sep_child(node);
        while let Some(f) = first.filter(|&f| doc.is_builder_inserted(f)) {
            first = doc.first_non_sep_child(f);
        }
        let item_first = first.is_some_and(|f| {
            let expected = match doc.name(node) {
                Some("dl") => matches!(doc.name(f), Some("dt" | "dd")),
                _ => doc.is_named(f, "li"),
            };
            expected && !doc.is_literal_html(f)
        });
        if !item_first {
            let bullets = list_bullets(&mut cx, node);
            cx.emit(&bullets, node);
        }

        cx.serialize_children(node)?;
        Ok(doc.next_sibling(node))
    }

    fn before(&self, node: NodeId, other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        let doc = cx.doc;
        if doc.is_body(other) {
            return Constraint::exactly(0);
        }
        let parent = doc.parent(node);
        if parent.is_some_and(|p| doc.is_list_item(p)) && doc.parent(other) == parent {
            return Constraint::exactly(1);
        }
        Constraint::new(1, 2)
    }

    fn after(&self, node: NodeId, other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        list_eol(cx.doc, node, other)
    }

    fn force_sol(&self) -> bool {
        true
    }
}

/// `li`, `dt` and `dd` on their own line.
pub struct ListItemHandler;

impl DomHandler for ListItemHandler {
    fn handle(
        &self,
        node: NodeId,
        cx: &mut SerializeContext<'_>,
        _wrapper_unmodified: bool,
    ) -> Result<Option<NodeId>> {
        let doc = cx.doc;
        if emits_own_bullets(doc, node) {
            let bullets = list_bullets(cx, node);
            cx.emit(&bullets, node);
        }
        serialize_item_content(cx, node)?;
        Ok(doc.next_sibling(node))
    }

    fn before(&self, node: NodeId, other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        let doc = cx.doc;
        let list = match doc.name(node) {
            Some("li") => ["ul", "ol"].as_slice(),
            _ => ["dl"].as_slice(),
        };
        let list_parent =
            doc.parent(node) == Some(other) && doc.name(other).is_some_and(|n| list.contains(&n));
        if list_parent || (doc.is_named(node, "li") && doc.is_literal_html(other)) {
            return Constraint::default();
        }
        Constraint::new(1, 2)
    }

    fn after(&self, node: NodeId, other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        let doc = cx.doc;
        if doc.is_named(node, "dt") && doc.is_named(other, "dd") && doc.dp(other).is_stx(Stx::Row) {
            return Constraint::exactly(0);
        }
        list_eol(doc, node, other)
    }

    fn first_child(&self, _node: NodeId, child: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        item_first_child(cx.doc, child)
    }

    fn force_sol(&self) -> bool {
        true
    }
}

/// `dd` written on its `dt`'s line, as in `;term:definition`.
pub struct RowDefinitionHandler;

impl DomHandler for RowDefinitionHandler {
    fn handle(
        &self,
        node: NodeId,
        cx: &mut SerializeContext<'_>,
        _wrapper_unmodified: bool,
    ) -> Result<Option<NodeId>> {
        let doc = cx.doc;
        if emits_own_bullets(doc, node) {
            cx.emit(":", node);
        }
        serialize_item_content(cx, node)?;
        Ok(doc.next_sibling(node))
    }

    fn before(&self, _node: NodeId, _other: NodeId, _cx: &SerializeContext<'_>) -> Constraint {
        Constraint::exactly(0)
    }

    fn after(&self, node: NodeId, other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        list_eol(cx.doc, node, other)
    }

    fn first_child(&self, _node: NodeId, child: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        item_first_child(cx.doc, child)
    }
}
