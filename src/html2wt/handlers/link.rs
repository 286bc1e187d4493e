use crate::dom::{Diagnostic, DiagnosticPhase, DiffMark, Document, NodeId, Stx};
use crate::error::Result;
use crate::html2wt::handlers::fallback::serialize_as_html;
use crate::html2wt::handlers::DomHandler;
use crate::html2wt::{escape_entities, ChunkKind, Constraint, NestedMode, SerializeContext};
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

static NAMESPACED_TARGET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(category|file|image)\s*:").expect("namespaced target regex")
});

static RELATIVE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\.\.?/)+").expect("relative prefix regex"));

/// What a link element stands for in wikitext.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkKind {
    Wiki,
    Category,
    Redirect,
    Language,
    External,
}

fn link_kind(doc: &Document, node: NodeId) -> Option<LinkKind> {
    let rel = doc.attr(node, "rel").unwrap_or("");
    for token in rel.split_ascii_whitespace() {
        let kind = match token {
            "mw:WikiLink" => LinkKind::Wiki,
            "mw:WikiLink/Category" | "mw:PageProp/Category" => LinkKind::Category,
            "mw:PageProp/redirect" => LinkKind::Redirect,
            "mw:WikiLink/Language" | "mw:PageProp/Language" => LinkKind::Language,
            t if t == "mw:ExtLink" || t.starts_with("mw:ExtLink/") => LinkKind::External,
            _ => continue,
        };
        return Some(kind);
    }
    // plain html anchors become external links
    (doc.is_named(node, "a") && doc.attr(node, "href").is_some()).then_some(LinkKind::External)
}

/// Links that sit on a line of their own without affecting what follows:
/// categories, redirects and language links.
pub(crate) fn is_sol_transparent_link(doc: &Document, node: NodeId) -> bool {
    matches!(doc.name(node), Some("a" | "link"))
        && matches!(
            link_kind(doc, node),
            Some(LinkKind::Category | LinkKind::Redirect | LinkKind::Language)
        )
}

/// A link target, either verbatim from the source or rebuilt from `href`.
struct Target {
    value: String,
    from_src: bool,
}

fn link_target(doc: &Document, node: NodeId) -> Target {
    let href = doc.attr(node, "href").unwrap_or("");
    if let Some(src) = doc.dp(node).shadow_source("href", href) {
        return Target {
            value: src.to_string(),
            from_src: true,
        };
    }
    Target {
        value: href.to_string(),
        from_src: false,
    }
}

/// `./Foo_bar%C3%A9` to `Foo baré`.
fn page_title(href: &str) -> String {
    let stripped = RELATIVE_PREFIX.replace(href, "");
    percent_decode_str(&stripped)
        .decode_utf8_lossy()
        .replace('_', " ")
}

/// Entity-encodes characters that would end or break a bracketed URL.
fn escape_ext_link_url(url: &str) -> Cow<'_, str> {
    let needs = |c: char| {
        matches!(c, '[' | ']' | '<' | '>' | '"' | '\u{7f}' | '\u{a0}' | '\u{1680}' | '\u{180e}')
            || c <= ' '
            || ('\u{2000}'..='\u{200a}').contains(&c)
            || matches!(c, '\u{202f}' | '\u{205f}' | '\u{3000}')
    };
    if !url.chars().any(needs) {
        return Cow::Borrowed(url);
    }
    let mut out = String::with_capacity(url.len() + 8);
    for c in url.chars() {
        if needs(c) {
            out.push_str(&format!("&#x{:X};", u32::from(c)));
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// The text of `node` when every child is a text node.
fn plain_content(doc: &Document, node: NodeId) -> Option<String> {
    let mut children = doc.children(node).peekable();
    children.peek()?;
    children
        .all(|c| doc.is_text(c))
        .then(|| doc.text_content(node))
}

fn content_modified(doc: &Document, node: NodeId) -> bool {
    let meta = doc.meta(node);
    meta.has_diff_mark(DiffMark::SubtreeChanged) || meta.has_diff_mark(DiffMark::ChildrenChanged)
}

/// Whether `target` is unusable inside `[[...]]`.
fn is_bad_target(target: &str) -> bool {
    target.trim().is_empty()
        || target
            .chars()
            .any(|c| matches!(c, '|' | '[' | ']' | '{' | '}' | '<' | '>' | '\n'))
}

fn report_bad_target(cx: &mut SerializeContext<'_>, node: NodeId, target: &str) {
    let doc = cx.doc;
    let diag = Diagnostic::warning(
        DiagnosticPhase::Serialize,
        "html2wt.link.bad_target",
        format!("link {} has an unusable target {target:?}", cx.node_label(node)),
    )
    .with_range(doc.dp(node).dsr.and_then(|d| d.range()))
    .with_note("the link text was emitted without the link");
    cx.push_diagnostic(diag);
}

/// `a` and `link` elements: wiki links, categories, redirects, language
/// links and external links.
pub struct LinkHandler;

impl LinkHandler {
    fn wiki_link(cx: &mut SerializeContext<'_>, node: NodeId) -> Result<()> {
        let doc = cx.doc;
        let target = link_target(doc, node);
        let modified = !target.from_src || content_modified(doc, node);
        let title = if target.from_src {
            target.value.clone()
        } else {
            page_title(&target.value)
        };

        let content = plain_content(doc, node);
        let simple = content.as_deref().is_some_and(|c| {
            let c = c.replace('_', " ");
            let t = title.trim_start_matches(':').replace('_', " ");
            (modified || !doc.dp(node).is_stx(Stx::Piped)) && c == t
        });

        let mut link_target = escape_entities(&title).into_owned();
        if !target.from_src && NAMESPACED_TARGET.is_match(&link_target) {
            // a plain link to a category or file page
            link_target.insert(0, ':');
        }

        if is_bad_target(&title) {
            report_bad_target(cx, node, &title);
            let text = cx.serialize_children_to_string(node, NestedMode::Link)?;
            cx.emit(&text, node);
            return Ok(());
        }

        if simple {
            cx.emit_constrained(&format!("[[{link_target}]]"), node, ChunkKind::WikiLink);
            return Ok(());
        }

        let mut text = cx.serialize_children_to_string(node, NestedMode::Link)?;
        if text.is_empty() {
            // an empty pipe would trigger the pipe trick
            text = "<nowiki/>".to_string();
        }
        cx.emit_constrained(&format!("[[{link_target}|{text}]]"), node, ChunkKind::WikiLink);
        Ok(())
    }

    fn category(cx: &mut SerializeContext<'_>, node: NodeId) -> Result<()> {
        let doc = cx.doc;
        let target = link_target(doc, node);
        let (page, sort_key) = match target.value.split_once('#') {
            Some((page, key)) => (page, Some(key)),
            None => (target.value.as_str(), None),
        };
        let page = if target.from_src {
            page.to_string()
        } else {
            page_title(page)
        };
        let sort_key = sort_key.map(|k| {
            percent_decode_str(k)
                .decode_utf8_lossy()
                .replace("%23", "#")
        });
        match sort_key {
            Some(key) => cx.emit(&format!("[[{page}|{key}]]"), node),
            None => cx.emit(&format!("[[{page}]]"), node),
        }
        Ok(())
    }

    fn redirect(cx: &mut SerializeContext<'_>, node: NodeId) -> Result<()> {
        let doc = cx.doc;
        let target = link_target(doc, node);
        let prefix = doc.dp(node).src.as_deref().unwrap_or("#REDIRECT ");
        let mut title = if target.from_src {
            target.value
        } else {
            page_title(&target.value)
        };
        if !title.starts_with(':') && NAMESPACED_TARGET.is_match(&title) {
            // otherwise the page would be categorized instead
            title.insert(0, ':');
        }
        cx.emit(&format!("{prefix}[[{title}]]"), node);
        Ok(())
    }

    fn language(cx: &mut SerializeContext<'_>, node: NodeId) -> Result<()> {
        let doc = cx.doc;
        let target = link_target(doc, node);
        let title = if target.from_src {
            target.value
        } else {
            page_title(&target.value)
        };
        cx.emit(&format!("[[{title}]]"), node);
        Ok(())
    }

    fn external(cx: &mut SerializeContext<'_>, node: NodeId) -> Result<()> {
        let doc = cx.doc;
        let target = link_target(doc, node);
        let href = doc.attr(node, "href").unwrap_or("");
        let url = if target.from_src {
            Cow::Borrowed(target.value.as_str())
        } else {
            escape_ext_link_url(&target.value)
        };
        let dp = doc.dp(node);

        let content = plain_content(doc, node);
        if dp.is_stx(Stx::Magiclink) {
            if let Some(text) = content {
                cx.emit_constrained(&text, node, ChunkKind::MagicLink);
                return Ok(());
            }
        }
        let bare = content
            .as_deref()
            .is_some_and(|c| c == target.value || c == href);
        if bare && (dp.is_stx(Stx::Url) || doc.is_new_element(node) || content_modified(doc, node)) {
            cx.emit_constrained(&url, node, ChunkKind::AutoUrl);
            return Ok(());
        }

        let text = cx.serialize_children_to_string(node, NestedMode::Link)?;
        let wt = if url.starts_with('#') {
            if text.is_empty() {
                format!("[[{url}]]")
            } else {
                format!("[[{url}|{text}]]")
            }
        } else if text.is_empty() {
            format!("[{url}]")
        } else {
            format!("[{url} {text}]")
        };
        cx.emit(&wt, node);
        Ok(())
    }
}

impl DomHandler for LinkHandler {
    fn handle(
        &self,
        node: NodeId,
        cx: &mut SerializeContext<'_>,
        wrapper_unmodified: bool,
    ) -> Result<Option<NodeId>> {
        let doc = cx.doc;
        match link_kind(doc, node) {
            Some(LinkKind::Wiki) => Self::wiki_link(cx, node)?,
            Some(LinkKind::Category) => Self::category(cx, node)?,
            Some(LinkKind::Redirect) => Self::redirect(cx, node)?,
            Some(LinkKind::Language) => Self::language(cx, node)?,
            Some(LinkKind::External) => Self::external(cx, node)?,
            None => return serialize_as_html(cx, node, wrapper_unmodified),
        }
        Ok(doc.next_sibling(node))
    }

    fn before(&self, node: NodeId, other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        let doc = cx.doc;
        if doc.is_new_element(node)
            && link_kind(doc, node) == Some(LinkKind::Category)
            && !doc.is_body(other)
        {
            return Constraint::new(1, 2);
        }
        Constraint::default()
    }

    fn after(&self, node: NodeId, other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        let doc = cx.doc;
        if doc.is_new_element(node)
            && link_kind(doc, node) == Some(LinkKind::Category)
            && !doc.is_body(other)
        {
            return Constraint::new(1, 2);
        }
        Constraint::default()
    }
}
