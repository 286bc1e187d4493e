//! Per-tag serialization handlers.
//!
//! A handler turns one element into wikitext and states how many newlines
//! it wants around itself and its children. Handlers are looked up per
//! node through [`HandlerRegistry::lookup`].

mod encapsulated;
mod fallback;
mod heading;
mod link;
mod list;
mod media;
mod misc;
mod paragraph;
mod quote;
mod table;

pub use encapsulated::{EncapsulatedHandler, ExtensionOutput, ExtensionRegistry, ExtensionSerializer};
pub use fallback::{FallbackHandler, HtmlPreHandler};
pub use heading::HeadingHandler;
pub use link::LinkHandler;
pub(crate) use link::is_sol_transparent_link;
pub use list::{ListHandler, ListItemHandler, RowDefinitionHandler};
pub use media::MediaHandler;
pub use misc::{BlockquoteHandler, BodyHandler, BrHandler, HrHandler, MetaHandler, PreHandler, SpanHandler};
pub use paragraph::ParagraphHandler;
pub use quote::QuoteHandler;
pub use table::{CaptionHandler, CellHandler, RowHandler, TableHandler, TableSectionHandler};

use crate::dom::{Document, NodeId, Stx};
use crate::error::Result;
use crate::html2wt::{Constraint, SerializeContext};
use std::collections::HashMap;
use std::sync::Arc;

/// Serialization of one kind of element.
///
/// The four boundary callbacks default to `{0, 2}`; `other` is the node on
/// the far side of the boundary.
pub trait DomHandler: Send + Sync {
    /// Emits wikitext for `node` and returns the next sibling to visit.
    fn handle(
        &self,
        node: NodeId,
        cx: &mut SerializeContext<'_>,
        wrapper_unmodified: bool,
    ) -> Result<Option<NodeId>>;

    fn before(&self, _node: NodeId, _other: NodeId, _cx: &SerializeContext<'_>) -> Constraint {
        Constraint::default()
    }

    fn after(&self, _node: NodeId, _other: NodeId, _cx: &SerializeContext<'_>) -> Constraint {
        Constraint::default()
    }

    fn first_child(&self, _node: NodeId, _child: NodeId, _cx: &SerializeContext<'_>) -> Constraint {
        Constraint::default()
    }

    fn last_child(&self, _node: NodeId, _child: NodeId, _cx: &SerializeContext<'_>) -> Constraint {
        Constraint::default()
    }

    /// The handler's markup only parses at the start of a line.
    fn force_sol(&self) -> bool {
        false
    }
}

#[derive(Clone)]
struct TagEntry {
    default: Option<Arc<dyn DomHandler>>,
    by_stx: Vec<(Stx, Arc<dyn DomHandler>)>,
}

/// Tag (and syntax flavor) to handler table.
#[derive(Clone)]
pub struct HandlerRegistry {
    tags: HashMap<String, TagEntry>,
    fallback: Arc<dyn DomHandler>,
    encapsulated: Arc<dyn DomHandler>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl HandlerRegistry {
    /// A registry with no tag handlers; everything goes to the fallback.
    pub fn empty() -> Self {
        Self {
            tags: HashMap::new(),
            fallback: Arc::new(FallbackHandler),
            encapsulated: Arc::new(EncapsulatedHandler),
        }
    }

    pub fn with_defaults() -> Self {
        let mut reg = Self::empty();
        reg.register("body", None, Arc::new(BodyHandler));
        reg.register("p", None, Arc::new(ParagraphHandler));
        for level in 1..=6 {
            reg.register(&format!("h{level}"), None, Arc::new(HeadingHandler));
        }
        for tag in ["ul", "ol", "dl"] {
            reg.register(tag, None, Arc::new(ListHandler));
        }
        for tag in ["li", "dt", "dd"] {
            reg.register(tag, None, Arc::new(ListItemHandler));
        }
        reg.register("dd", Some(Stx::Row), Arc::new(RowDefinitionHandler));
        reg.register("table", None, Arc::new(TableHandler));
        for tag in ["tbody", "thead", "tfoot"] {
            reg.register(tag, None, Arc::new(TableSectionHandler));
        }
        reg.register("tr", None, Arc::new(RowHandler));
        reg.register("td", None, Arc::new(CellHandler));
        reg.register("th", None, Arc::new(CellHandler));
        reg.register("caption", None, Arc::new(CaptionHandler));
        reg.register("b", None, Arc::new(QuoteHandler));
        reg.register("i", None, Arc::new(QuoteHandler));
        reg.register("pre", None, Arc::new(PreHandler));
        reg.register("pre", Some(Stx::Html), Arc::new(HtmlPreHandler));
        reg.register("hr", None, Arc::new(HrHandler));
        reg.register("br", None, Arc::new(BrHandler));
        reg.register("a", None, Arc::new(LinkHandler));
        reg.register("link", None, Arc::new(LinkHandler));
        reg.register("figure", None, Arc::new(MediaHandler));
        reg.register("img", None, Arc::new(MediaHandler));
        reg.register("meta", None, Arc::new(MetaHandler));
        reg.register("span", None, Arc::new(SpanHandler));
        reg.register("blockquote", None, Arc::new(BlockquoteHandler));
        reg
    }

    /// Registers `handler` for `tag`, or for `tag` with syntax `stx` only.
    pub fn register(&mut self, tag: &str, stx: Option<Stx>, handler: Arc<dyn DomHandler>) {
        let entry = self
            .tags
            .entry(tag.to_ascii_lowercase())
            .or_insert_with(|| TagEntry {
                default: None,
                by_stx: Vec::new(),
            });
        match stx {
            None => entry.default = Some(handler),
            Some(stx) => {
                entry.by_stx.retain(|(s, _)| *s != stx);
                entry.by_stx.push((stx, handler));
            }
        }
    }

    pub fn fallback(&self) -> &dyn DomHandler {
        self.fallback.as_ref()
    }

    /// The handler registered for a bare tag name.
    pub fn for_tag(&self, tag: &str) -> Option<&dyn DomHandler> {
        self.tags.get(tag)?.default.as_deref()
    }

    /// The handler that serializes `node`.
    pub fn lookup(&self, doc: &Document, node: NodeId) -> &dyn DomHandler {
        let Some(name) = doc.name(node) else {
            return self.fallback();
        };
        if doc.is_first_encapsulation_wrapper(node) {
            return self.encapsulated.as_ref();
        }
        let entry = self.tags.get(name);
        let dp = doc.dp(node);
        if let (Some(entry), Some(stx)) = (entry, dp.stx) {
            if let Some((_, h)) = entry.by_stx.iter().find(|(s, _)| *s == stx) {
                return h.as_ref();
            }
        }
        if dp.is_stx(Stx::Html) && name != "a" {
            return self.fallback();
        }
        if doc.is_table_child_tag(node) && doc.in_html_table(node) {
            return self.fallback();
        }
        if doc.is_list_item(node)
            && doc
                .parent(node)
                .is_some_and(|p| doc.is_list(p) && doc.is_literal_html(p))
        {
            return self.fallback();
        }
        entry
            .and_then(|e| e.default.as_deref())
            .unwrap_or_else(|| self.fallback())
    }
}

/// Space to put after the opening markup of `node`.
///
/// New elements get `new_default` unless their content already starts
/// with whitespace; reused wrappers copy the blank the source had there.
pub(crate) fn leading_space(cx: &SerializeContext<'_>, node: NodeId, new_default: &str) -> String {
    let doc = cx.doc;
    if doc.is_new_element(node) {
        let starts_blank = |c: NodeId| {
            doc.text(c)
                .is_some_and(|t| t.starts_with(char::is_whitespace))
        };
        return match first_non_deleted_child(doc, node) {
            Some(c) if !starts_blank(c) => new_default.to_string(),
            _ => String::new(),
        };
    }
    let dsr = doc.dp(node).dsr;
    let pos = dsr.and_then(|d| Some((d.inner_start()?, d.inner_end()?)));
    source_blank_at(cx, pos.and_then(|(s, e)| (s < e).then_some(s)))
}

/// Space to put before the closing markup of `node`; see [`leading_space`].
pub(crate) fn trailing_space(cx: &SerializeContext<'_>, node: NodeId, new_default: &str) -> String {
    let doc = cx.doc;
    if doc.is_new_element(node) {
        let ends_blank = |c: NodeId| doc.text(c).is_some_and(|t| t.ends_with(char::is_whitespace));
        return match last_non_deleted_child(doc, node) {
            Some(c) if !ends_blank(c) => new_default.to_string(),
            _ => String::new(),
        };
    }
    let dsr = doc.dp(node).dsr;
    let pos = dsr.and_then(|d| Some((d.inner_start()?, d.inner_end()?)));
    source_blank_at(cx, pos.and_then(|(s, e)| (s < e).then_some(e - 1)))
}

fn source_blank_at(cx: &SerializeContext<'_>, pos: Option<usize>) -> String {
    if !cx.state.selser_mode || cx.state.in_modified_content {
        return String::new();
    }
    let blank = pos
        .and_then(|p| cx.orig_src()?.slice_between(p, p + 1))
        .filter(|c| *c == " " || *c == "\t");
    blank.unwrap_or("").to_string()
}

fn first_non_deleted_child(doc: &Document, node: NodeId) -> Option<NodeId> {
    let first = doc.first_child(node)?;
    if doc.is_diff_marker(first) {
        doc.next_non_deleted_sibling(first)
    } else {
        Some(first)
    }
}

fn last_non_deleted_child(doc: &Document, node: NodeId) -> Option<NodeId> {
    let last = doc.last_child(node)?;
    if doc.is_diff_marker(last) {
        doc.previous_non_deleted_sibling(last)
    } else {
        Some(last)
    }
}

/// Newline ceiling at a table boundary: one when either side is new.
pub(crate) fn max_nls_in_table(doc: &Document, node: NodeId, other: NodeId) -> usize {
    if doc.is_new_element(node) || doc.is_new_element(other) {
        1
    } else {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler_ptr(h: &dyn DomHandler) -> *const () {
        h as *const dyn DomHandler as *const ()
    }

    #[test]
    fn lookup_order() {
        let reg = HandlerRegistry::with_defaults();
        let mut doc = Document::new();
        let body = doc.body();
        let p = doc.append_element(body, "p", &[]);
        let html_p = doc.append_element(body, "p", &[]);
        doc.meta_mut(html_p).dp.stx = Some(Stx::Html);
        let tpl = doc.append_element(body, "p", &[("typeof", "mw:Transclusion")]);
        let unknown = doc.append_element(body, "section", &[]);

        let fallback = handler_ptr(reg.fallback());
        assert_ne!(handler_ptr(reg.lookup(&doc, p)), fallback);
        assert_eq!(handler_ptr(reg.lookup(&doc, html_p)), fallback);
        assert_eq!(handler_ptr(reg.lookup(&doc, unknown)), fallback);
        assert_eq!(
            handler_ptr(reg.lookup(&doc, tpl)),
            handler_ptr(reg.encapsulated.as_ref())
        );
    }

    #[test]
    fn cells_of_html_tables_use_the_fallback() {
        let reg = HandlerRegistry::with_defaults();
        let mut doc = Document::new();
        let body = doc.body();
        let table = doc.append_element(body, "table", &[]);
        let tr = doc.append_element(table, "tr", &[]);
        let td = doc.append_element(tr, "td", &[]);
        let fallback = handler_ptr(reg.fallback());
        assert_ne!(handler_ptr(reg.lookup(&doc, td)), fallback);
        doc.meta_mut(table).dp.stx = Some(Stx::Html);
        assert_eq!(handler_ptr(reg.lookup(&doc, td)), fallback);
    }
}
