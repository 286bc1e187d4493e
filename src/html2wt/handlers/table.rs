use crate::dom::{NodeId, Stx};
use crate::error::Result;
use crate::html2wt::handlers::{leading_space, max_nls_in_table, DomHandler};
use crate::html2wt::{
    serialize_attributes, Constraint, ConstraintInfo, NestedMode, PendingConstraint,
    SepType, SerializeContext,
};

/// Opening markup of a table line: `symbol`, then the attributes and
/// `attr_end` when there are any.
fn table_tag(
    cx: &SerializeContext<'_>,
    node: NodeId,
    symbol: &str,
    attr_end: &str,
    wrapper_unmodified: bool,
) -> String {
    if wrapper_unmodified {
        let src = cx
            .doc
            .dp(node)
            .dsr
            .and_then(|d| d.open_range())
            .and_then(|r| cx.orig_slice(r));
        if let Some(src) = src {
            return src.to_string();
        }
    }
    let attrs = serialize_attributes(cx.doc, node, &[]);
    if attrs.is_empty() {
        symbol.to_string()
    } else {
        format!("{symbol}{attrs}{attr_end}")
    }
}

fn serialize_table(
    cx: &mut SerializeContext<'_>,
    node: NodeId,
    wrapper_unmodified: bool,
) -> Result<()> {
    let doc = cx.doc;
    let dp = doc.dp(node);
    let open = table_tag(
        cx,
        node,
        dp.start_tag_src.as_deref().unwrap_or("{|"),
        "",
        wrapper_unmodified,
    );
    cx.emit(&open, node);

    cx.state.wiki_table_nesting += 1;
    let res = cx.serialize_children(node);
    cx.state.wiki_table_nesting -= 1;
    res?;

    if cx.state.sep.constraints.is_none() {
        // a table without rows still needs its closing line
        cx.state.sep.constraints = Some(PendingConstraint {
            constraint: Constraint::new(1, 2),
            info: ConstraintInfo {
                on_sol: cx.state.buf.on_sol,
                force_sol: false,
                sep_type: SepType::ChildParent,
                node_a: node,
                node_b: node,
            },
        });
    }
    cx.emit(dp.end_tag_src.as_deref().unwrap_or("|}"), node);
    Ok(())
}

/// `{| ... |}`.
pub struct TableHandler;

impl DomHandler for TableHandler {
    fn handle(
        &self,
        node: NodeId,
        cx: &mut SerializeContext<'_>,
        wrapper_unmodified: bool,
    ) -> Result<Option<NodeId>> {
        let doc = cx.doc;
        // `:{|` keeps its rows on separate lines inside the item
        let indented = doc.parent(node).is_some_and(|p| doc.is_named(p, "dd"))
            && doc.previous_non_sep_sibling(node).is_none();
        if indented {
            let mut cx = cx.disable_single_line();
            serialize_table(&mut cx, node, wrapper_unmodified)?;
        } else {
            serialize_table(cx, node, wrapper_unmodified)?;
        }
        Ok(doc.next_sibling(node))
    }

    fn before(&self, node: NodeId, other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        let doc = cx.doc;
        if doc.parent(node) == Some(other) && doc.is_named(other, "dd") {
            return Constraint::exactly(0);
        }
        Constraint::new(1, 2)
    }

    fn after(&self, node: NodeId, other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        let doc = cx.doc;
        if (doc.is_new_element(node) || doc.is_new_element(other)) && !doc.is_body(other) {
            Constraint::new(1, 2)
        } else {
            Constraint::default()
        }
    }

    fn first_child(&self, node: NodeId, child: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        Constraint::new(1, max_nls_in_table(cx.doc, node, child))
    }

    fn last_child(&self, node: NodeId, child: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        Constraint::new(1, max_nls_in_table(cx.doc, node, child))
    }

    fn force_sol(&self) -> bool {
        true
    }
}

/// `tbody`, `thead` and `tfoot` have no markup of their own.
pub struct TableSectionHandler;

impl DomHandler for TableSectionHandler {
    fn handle(
        &self,
        node: NodeId,
        cx: &mut SerializeContext<'_>,
        _wrapper_unmodified: bool,
    ) -> Result<Option<NodeId>> {
        cx.serialize_children(node)?;
        Ok(cx.doc.next_sibling(node))
    }
}

/// `|-`.
pub struct RowHandler;

impl RowHandler {
    /// Whether the row needs its `|-` line.
    ///
    /// The first row of a table may leave it out, unless the section
    /// holding it is not the first thing in the table (a caption aside),
    /// or the section has no source position of its own.
    fn marker_needed(cx: &SerializeContext<'_>, node: NodeId) -> bool {
        let doc = cx.doc;
        if doc.dp(node).start_tag_src.is_some() || doc.previous_non_sep_sibling(node).is_some() {
            return true;
        }
        let Some(section) = doc
            .parent(node)
            .filter(|&p| matches!(doc.name(p), Some("tbody" | "thead" | "tfoot")))
        else {
            return true;
        };
        doc.is_new_element(section)
            || doc
                .previous_non_sep_sibling(section)
                .is_some_and(|s| !doc.is_named(s, "caption"))
    }
}

impl DomHandler for RowHandler {
    fn handle(
        &self,
        node: NodeId,
        cx: &mut SerializeContext<'_>,
        wrapper_unmodified: bool,
    ) -> Result<Option<NodeId>> {
        let doc = cx.doc;
        if Self::marker_needed(cx, node) {
            let symbol = doc.dp(node).start_tag_src.as_deref().unwrap_or("|-");
            let tag = table_tag(cx, node, symbol, "", wrapper_unmodified);
            cx.emit(&tag, node);
        }
        cx.serialize_children(node)?;
        Ok(doc.next_sibling(node))
    }

    fn before(&self, node: NodeId, other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        let min = usize::from(Self::marker_needed(cx, node));
        Constraint::new(min, max_nls_in_table(cx.doc, node, other))
    }

    fn after(&self, node: NodeId, other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        Constraint::new(0, max_nls_in_table(cx.doc, node, other))
    }
}

/// `td` and `th`, on their own line (`|`, `!`) or sharing one (`||`, `!!`).
pub struct CellHandler;

impl CellHandler {
    /// Row syntax only holds after a cell of the same kind.
    fn uses_row_syntax(cx: &SerializeContext<'_>, node: NodeId) -> bool {
        let doc = cx.doc;
        doc.dp(node).is_stx(Stx::Row)
            && doc
                .previous_non_deleted_sibling(node)
                .is_some_and(|p| doc.name(p) == doc.name(node))
    }
}

impl DomHandler for CellHandler {
    fn handle(
        &self,
        node: NodeId,
        cx: &mut SerializeContext<'_>,
        wrapper_unmodified: bool,
    ) -> Result<Option<NodeId>> {
        let doc = cx.doc;
        let single = if doc.is_named(node, "th") { "!" } else { "|" };
        let double = if doc.is_named(node, "th") { "!!" } else { "||" };

        let row = Self::uses_row_syntax(cx, node);
        let symbol = doc
            .dp(node)
            .start_tag_src
            .as_deref()
            .filter(|_| !doc.dp(node).is_stx(Stx::Row) || row)
            .unwrap_or(if row { double } else { single });
        let at_sol = cx.state.buf.on_sol
            || cx
                .state
                .sep
                .constraints
                .is_some_and(|p| p.constraint.min > 0);
        let symbol = if at_sol && symbol == double {
            single
        } else {
            symbol
        };

        let tag = table_tag(cx, node, symbol, " |", wrapper_unmodified);
        let lead = leading_space(cx, node, "");
        cx.emit(&format!("{tag}{lead}"), node);

        let next_is_row = doc
            .next_non_sep_sibling(node)
            .is_some_and(|n| doc.is_element(n) && doc.dp(n).is_stx(Stx::Row));
        if next_is_row && doc.first_child(node).is_none() {
            cx.emit(" ", node);
            return Ok(doc.next_sibling(node));
        }

        if next_is_row || doc.dp(node).is_stx(Stx::Row) {
            let mut cx = cx.enforce_single_line();
            cx.serialize_children(node)?;
        } else {
            let mut cx = cx.disable_single_line();
            cx.serialize_children(node)?;
        }
        Ok(doc.next_sibling(node))
    }

    fn before(&self, node: NodeId, other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        let max = max_nls_in_table(cx.doc, node, other);
        if cx.doc.dp(node).is_stx(Stx::Row) {
            Constraint::new(0, max)
        } else {
            Constraint::new(1, max)
        }
    }

    fn after(&self, node: NodeId, other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        Constraint::new(0, max_nls_in_table(cx.doc, node, other))
    }
}

/// `|+`.
pub struct CaptionHandler;

impl DomHandler for CaptionHandler {
    fn handle(
        &self,
        node: NodeId,
        cx: &mut SerializeContext<'_>,
        wrapper_unmodified: bool,
    ) -> Result<Option<NodeId>> {
        let doc = cx.doc;
        let symbol = doc.dp(node).start_tag_src.as_deref().unwrap_or("|+");
        let tag = table_tag(cx, node, symbol, " |", wrapper_unmodified);
        let content = cx.serialize_children_to_string(node, NestedMode::Caption)?;
        cx.emit(&format!("{tag}{content}"), node);
        Ok(doc.next_sibling(node))
    }

    fn before(&self, node: NodeId, other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        let max = max_nls_in_table(cx.doc, node, other);
        if cx.doc.is_named(other, "table") {
            Constraint::new(0, max)
        } else {
            Constraint::new(1, max)
        }
    }

    fn after(&self, node: NodeId, other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        Constraint::new(1, max_nls_in_table(cx.doc, node, other))
    }
}

#[cfg(test)]
mod tests {
    use crate::dom::{Document, Stx};
    use crate::html2wt::WikitextSerializer;

    fn serialize(doc: &Document) -> String {
        WikitextSerializer::default()
            .serialize(doc, None, None)
            .unwrap()
            .wikitext
    }

    #[test]
    fn new_table_with_one_cell() {
        let mut doc = Document::new();
        let body = doc.body();
        let table = doc.append_element(body, "table", &[]);
        let tr = doc.append_element(table, "tr", &[]);
        let td = doc.append_element(tr, "td", &[]);
        doc.append_text(td, "A");
        assert_eq!(serialize(&doc), "{|\n|-\n|A\n|}");
    }

    #[test]
    fn empty_table_keeps_its_closing_line() {
        let mut doc = Document::new();
        let body = doc.body();
        doc.append_element(body, "table", &[]);
        assert_eq!(serialize(&doc), "{|\n|}");
    }

    #[test]
    fn row_cells_share_a_line() {
        let mut doc = Document::new();
        let body = doc.body();
        let table = doc.append_element(body, "table", &[("class", "wikitable")]);
        let tr = doc.append_element(table, "tr", &[]);
        let a = doc.append_element(tr, "th", &[]);
        doc.append_text(a, "A");
        let b = doc.append_element(tr, "th", &[]);
        doc.meta_mut(b).dp.stx = Some(Stx::Row);
        doc.append_text(b, "B");
        assert_eq!(
            serialize(&doc),
            "{| class=\"wikitable\"\n|-\n!A!!B\n|}"
        );
    }

    #[test]
    fn row_cell_content_is_kept_on_the_row_line() {
        let mut doc = Document::new();
        let body = doc.body();
        let table = doc.append_element(body, "table", &[]);
        let tr = doc.append_element(table, "tr", &[]);
        let a = doc.append_element(tr, "td", &[]);
        doc.append_text(a, "one\ntwo");
        let b = doc.append_element(tr, "td", &[]);
        doc.meta_mut(b).dp.stx = Some(Stx::Row);
        doc.append_text(b, "three");
        assert_eq!(serialize(&doc), "{|\n|-\n|one two||three\n|}");
    }

    #[test]
    fn cell_attributes_and_caption() {
        let mut doc = Document::new();
        let body = doc.body();
        let table = doc.append_element(body, "table", &[]);
        let caption = doc.append_element(table, "caption", &[]);
        doc.append_text(caption, "Cap");
        let tr = doc.append_element(table, "tr", &[]);
        let td = doc.append_element(tr, "td", &[("style", "color:red")]);
        doc.append_text(td, "x");
        assert_eq!(
            serialize(&doc),
            "{|\n|+Cap\n|-\n| style=\"color:red\" |x\n|}"
        );
    }
}
