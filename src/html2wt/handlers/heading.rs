use crate::dom::NodeId;
use crate::error::Result;
use crate::html2wt::handlers::{leading_space, trailing_space, DomHandler};
use crate::html2wt::{Constraint, SerializeContext};

/// `h1`-`h6` as `=` runs around single-line content.
pub struct HeadingHandler;

fn level(cx: &SerializeContext<'_>, node: NodeId) -> usize {
    cx.doc
        .name(node)
        .and_then(|n| n.strip_prefix('h'))
        .and_then(|n| n.parse().ok())
        .unwrap_or(1)
}

impl DomHandler for HeadingHandler {
    fn handle(
        &self,
        node: NodeId,
        cx: &mut SerializeContext<'_>,
        _wrapper_unmodified: bool,
    ) -> Result<Option<NodeId>> {
        let doc = cx.doc;
        let marker = "=".repeat(level(cx, node));
        let space = if cx.options.space_in_new_headings {
            " "
        } else {
            ""
        };
        let lead = leading_space(cx, node, space);
        let trail = trailing_space(cx, node, space);

        cx.emit(&format!("{marker}{lead}"), node);
        let mut cx = cx.enforce_single_line();
        if doc.first_child(node).is_some() {
            cx.serialize_children(node)?;
        } else {
            cx.emit("<nowiki/>", node);
        }
        // the separator owed by the last child lands on the heading line too
        cx.emit(&format!("{trail}{marker}"), node);
        Ok(doc.next_sibling(node))
    }

    fn before(&self, node: NodeId, other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        let doc = cx.doc;
        let prev = doc.previous_non_sep_sibling(node);
        if doc.is_new_element(node) && prev.is_some() && !doc.is_encapsulation_wrapper(other) {
            return Constraint::exactly(2);
        }
        if doc.is_new_element(other) && prev == Some(other) {
            return Constraint::exactly(2);
        }
        Constraint::new(1, 2)
    }

    fn after(&self, _node: NodeId, _other: NodeId, _cx: &SerializeContext<'_>) -> Constraint {
        Constraint::new(1, 2)
    }

    fn force_sol(&self) -> bool {
        true
    }
}
