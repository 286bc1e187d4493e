use crate::dom::{Document, NodeId};
use crate::error::Result;
use crate::html2wt::handlers::fallback::{html_start_tag, serialize_as_html};
use crate::html2wt::handlers::{DomHandler, MediaHandler};
use crate::html2wt::{escape_entities, Constraint, NestedMode, SerializeContext};
use regex::Regex;
use std::sync::LazyLock;

static LEADING_COMMENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[ \t]*<!--(?s:.)*?-->[ \t]*)*").expect("leading comments regex")
});

static COMMENT_ONLY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[ \t]*<!--(?s:.)*?-->[ \t]*)+$").expect("comment-only line regex")
});

/// Emits `dp.src` of a placeholder; a source made only of newlines goes to
/// the separator instead.
pub(crate) fn emit_placeholder_src(cx: &mut SerializeContext<'_>, node: NodeId) {
    let src = cx.doc.dp(node).src.as_deref().unwrap_or("");
    if !src.is_empty() && src.chars().all(|c| c == '\n') {
        cx.append_sep(src);
    } else {
        cx.emit(src, node);
    }
}

fn is_placeholder(doc: &Document, node: NodeId) -> bool {
    doc.type_of_with_prefix(node, "mw:Placeholder").is_some()
}

fn is_wikitext_pre(doc: &Document, node: NodeId) -> bool {
    doc.is_named(node, "pre") && !doc.is_literal_html(node)
}

/// Puts the indent-pre space in front of every line that has content.
/// Comments at the start of a line stay in front of the space.
fn indent_lines(content: &str) -> String {
    content
        .split('\n')
        .map(|line| {
            if line.is_empty() || COMMENT_ONLY_LINE.is_match(line) {
                return line.to_string();
            }
            let n = LEADING_COMMENTS.find(line).map_or(0, |m| m.end());
            format!("{} {}", &line[..n], &line[n..])
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Indent-pre: every line of content starts with a space.
pub struct PreHandler;

impl DomHandler for PreHandler {
    fn handle(
        &self,
        node: NodeId,
        cx: &mut SerializeContext<'_>,
        _wrapper_unmodified: bool,
    ) -> Result<Option<NodeId>> {
        let content = cx.serialize_children_to_string(node, NestedMode::IndentPre)?;
        let (content, trailing_nl) = match content.strip_suffix('\n') {
            Some(c) => (c, true),
            None => (content.as_str(), false),
        };
        let out = indent_lines(content);
        cx.emit(&out, node);
        if trailing_nl {
            cx.append_sep("\n");
        }
        Ok(cx.doc.next_sibling(node))
    }

    fn before(&self, _node: NodeId, other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        if is_wikitext_pre(cx.doc, other) {
            Constraint::at_least(2)
        } else {
            Constraint::at_least(1)
        }
    }

    fn after(&self, _node: NodeId, other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        if is_wikitext_pre(cx.doc, other) {
            Constraint::at_least(2)
        } else {
            Constraint::at_least(1)
        }
    }

    fn force_sol(&self) -> bool {
        true
    }
}

pub struct HrHandler;

impl DomHandler for HrHandler {
    fn handle(
        &self,
        node: NodeId,
        cx: &mut SerializeContext<'_>,
        _wrapper_unmodified: bool,
    ) -> Result<Option<NodeId>> {
        let extra = cx.doc.dp(node).extra_dashes.unwrap_or(0);
        cx.emit(&"-".repeat(4 + extra), node);
        Ok(cx.doc.next_sibling(node))
    }

    fn before(&self, _node: NodeId, _other: NodeId, _cx: &SerializeContext<'_>) -> Constraint {
        Constraint::new(1, 2)
    }

    fn force_sol(&self) -> bool {
        true
    }
}

/// Line break. Inside a wikitext paragraph it has no markup of its own;
/// the separator it triggers is the line break.
pub struct BrHandler;

impl BrHandler {
    fn is_silent(node: NodeId, cx: &SerializeContext<'_>) -> bool {
        let doc = cx.doc;
        !cx.state.single_line.enforced()
            && !doc.is_literal_html(node)
            && doc.parent(node).is_some_and(|p| doc.is_named(p, "p"))
    }
}

impl DomHandler for BrHandler {
    fn handle(
        &self,
        node: NodeId,
        cx: &mut SerializeContext<'_>,
        wrapper_unmodified: bool,
    ) -> Result<Option<NodeId>> {
        if Self::is_silent(node, cx) {
            cx.emit("", node);
        } else {
            let tag = html_start_tag(cx, node, wrapper_unmodified);
            cx.emit(&tag, node);
        }
        Ok(cx.doc.next_sibling(node))
    }

    fn before(&self, node: NodeId, other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        let doc = cx.doc;
        if doc.parent(node) == Some(other) && doc.is_named(other, "p") {
            Constraint::new(1, 2)
        } else {
            Constraint::default()
        }
    }

    fn after(&self, node: NodeId, _other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        let doc = cx.doc;
        let in_list_item = doc.parent(node).is_some_and(|p| doc.is_list_item(p));
        if Self::is_silent(node, cx) && !in_list_item {
            Constraint::new(1, 2)
        } else {
            Constraint::default()
        }
    }
}

pub struct BodyHandler;

impl DomHandler for BodyHandler {
    fn handle(
        &self,
        node: NodeId,
        cx: &mut SerializeContext<'_>,
        _wrapper_unmodified: bool,
    ) -> Result<Option<NodeId>> {
        cx.serialize_children(node)?;
        Ok(cx.doc.next_sibling(node))
    }

    fn first_child(&self, _node: NodeId, _child: NodeId, _cx: &SerializeContext<'_>) -> Constraint {
        Constraint::new(0, 1)
    }
}

/// `<blockquote>` has no wikitext form; it is written as HTML but its
/// content starts on the tag's line.
pub struct BlockquoteHandler;

impl DomHandler for BlockquoteHandler {
    fn handle(
        &self,
        node: NodeId,
        cx: &mut SerializeContext<'_>,
        wrapper_unmodified: bool,
    ) -> Result<Option<NodeId>> {
        serialize_as_html(cx, node, wrapper_unmodified)
    }

    fn first_child(&self, _node: NodeId, _child: NodeId, _cx: &SerializeContext<'_>) -> Constraint {
        Constraint::exactly(0)
    }
}

/// Page properties, include directives and placeholders.
pub struct MetaHandler;

impl MetaHandler {
    fn wants_own_line(node: NodeId, cx: &SerializeContext<'_>) -> bool {
        cx.doc.is_new_element(node) && !is_placeholder(cx.doc, node)
    }
}

impl DomHandler for MetaHandler {
    fn handle(
        &self,
        node: NodeId,
        cx: &mut SerializeContext<'_>,
        wrapper_unmodified: bool,
    ) -> Result<Option<NodeId>> {
        let doc = cx.doc;
        let dp = doc.dp(node);
        let next = doc.next_sibling(node);

        if dp.src.is_some() && is_placeholder(doc, node) {
            emit_placeholder_src(cx, node);
            return Ok(next);
        }

        if let Some(prop) = doc.attr(node, "property") {
            let Some(word) = prop.strip_prefix("mw:PageProp/") else {
                return serialize_as_html(cx, node, wrapper_unmodified);
            };
            let out = if word == "categorydefaultsort" {
                let key = doc.attr(node, "content").unwrap_or("");
                match dp.src.as_deref().and_then(|src| src.split_once(':')) {
                    Some((prefix, _)) => format!("{prefix}:{key}}}}}"),
                    None => format!("{{{{DEFAULTSORT:{key}}}}}"),
                }
            } else {
                match &dp.src {
                    Some(src) => src.clone(),
                    None => format!("__{}__", word.to_ascii_uppercase()),
                }
            };
            cx.emit(&out, node);
            return Ok(next);
        }

        let Some(include) = doc.type_of_with_prefix(node, "mw:Includes/") else {
            return serialize_as_html(cx, node, wrapper_unmodified);
        };
        let default_tag = match include {
            "mw:Includes/IncludeOnly" => "",
            "mw:Includes/IncludeOnly/End" => return Ok(next),
            "mw:Includes/NoInclude" => "<noinclude>",
            "mw:Includes/NoInclude/End" => "</noinclude>",
            "mw:Includes/OnlyInclude" => "<onlyinclude>",
            "mw:Includes/OnlyInclude/End" => "</onlyinclude>",
            _ => return serialize_as_html(cx, node, wrapper_unmodified),
        };
        let out = dp.src.as_deref().unwrap_or(default_tag);
        cx.emit(out, node);
        Ok(next)
    }

    fn before(&self, node: NodeId, other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        let doc = cx.doc;
        let defaultsort = doc
            .attr(node, "property")
            .is_some_and(|p| p.contains("mw:PageProp/categorydefaultsort"));
        if defaultsort {
            // outside the paragraph it has to stay outside on reparse
            if doc.is_named(other, "p") && !doc.is_literal_html(other) {
                return Constraint::at_least(2);
            }
            return Constraint::at_least(1);
        }
        if Self::wants_own_line(node, cx) {
            Constraint::at_least(1)
        } else {
            Constraint::default()
        }
    }

    fn after(&self, node: NodeId, _other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        if Self::wants_own_line(node, cx) {
            Constraint::at_least(1)
        } else {
            Constraint::default()
        }
    }
}

/// Spans generated for wikitext constructs: nowiki, entities, media.
pub struct SpanHandler;

impl SpanHandler {
    fn emit_nowiki(cx: &mut SerializeContext<'_>, node: NodeId) {
        let content = cx.doc.text_content(node);
        let escaped = escape_entities(&content).replace("</nowiki", "&lt;/nowiki");
        cx.emit(&format!("<nowiki>{escaped}</nowiki>"), node);
    }

    fn emit_entity(cx: &mut SerializeContext<'_>, node: NodeId) {
        let doc = cx.doc;
        let content = doc.text_content(node);
        let out = match doc.dp(node).src.as_deref() {
            Some(src) if html_escape::decode_html_entities(src) == content => src.to_string(),
            _ => content.chars().map(|c| format!("&#x{:X};", c as u32)).collect(),
        };
        cx.emit(&out, node);
    }
}

impl DomHandler for SpanHandler {
    fn handle(
        &self,
        node: NodeId,
        cx: &mut SerializeContext<'_>,
        wrapper_unmodified: bool,
    ) -> Result<Option<NodeId>> {
        let doc = cx.doc;
        if doc.has_type_of(node, "mw:Nowiki") {
            Self::emit_nowiki(cx, node);
        } else if doc.has_type_of(node, "mw:Entity") {
            Self::emit_entity(cx, node);
        } else if is_placeholder(doc, node) && doc.dp(node).src.is_some() {
            emit_placeholder_src(cx, node);
        } else if MediaHandler::is_media(doc, node) {
            return MediaHandler.handle(node, cx, wrapper_unmodified);
        } else {
            return serialize_as_html(cx, node, wrapper_unmodified);
        }
        Ok(doc.next_sibling(node))
    }

    fn before(&self, node: NodeId, other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        if MediaHandler::is_media(cx.doc, node) {
            MediaHandler.before(node, other, cx)
        } else {
            Constraint::default()
        }
    }

    fn after(&self, node: NodeId, other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        if MediaHandler::is_media(cx.doc, node) {
            MediaHandler.after(node, other, cx)
        } else {
            Constraint::default()
        }
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
    fn indent_skips_empty_and_comment_lines() {
        assert_eq!(indent_lines("a\n\nb"), " a\n\n b");
        assert_eq!(indent_lines("<!--c-->\nx"), "<!--c-->\n x");
        assert_eq!(indent_lines("<!--c-->x"), "<!--c--> x");
    }

    #[test]
    fn pre_lines_are_indented() {
        let mut doc = Document::new();
        let body = doc.body();
        let pre = doc.append_element(body, "pre", &[]);
        doc.append_text(pre, "one\ntwo");
        assert_eq!(serialize(&doc), " one\n two");
    }

    #[test]
    fn rule_with_extra_dashes() {
        let mut doc = Document::new();
        let body = doc.body();
        let hr = doc.append_element(body, "hr", &[]);
        doc.meta_mut(hr).dp.extra_dashes = Some(2);
        assert_eq!(serialize(&doc), "------");
    }

    #[test]
    fn page_properties_and_defaultsort() {
        let mut doc = Document::new();
        let body = doc.body();
        doc.append_element(body, "meta", &[("property", "mw:PageProp/notoc")]);
        doc.append_element(
            body,
            "meta",
            &[("property", "mw:PageProp/categorydefaultsort"), ("content", "Key")],
        );
        assert_eq!(serialize(&doc), "__NOTOC__\n{{DEFAULTSORT:Key}}");
    }

    #[test]
    fn nowiki_and_entity_spans() {
        let mut doc = Document::new();
        let body = doc.body();
        let p = doc.append_element(body, "p", &[]);
        let nowiki = doc.append_element(p, "span", &[("typeof", "mw:Nowiki")]);
        doc.append_text(nowiki, "[[x]]");
        let ent = doc.append_element(p, "span", &[("typeof", "mw:Entity")]);
        doc.append_text(ent, "\u{a0}");
        doc.meta_mut(ent).dp.src = Some("&nbsp;".into());
        assert_eq!(serialize(&doc), "<nowiki>[[x]]</nowiki>&nbsp;");
    }
}
