//! Escapes between adjacent chunks of output.
//!
//! Some constructs only keep their meaning if the text around them does not
//! run into them: letters after `[[Foo]]` become part of the link text, a
//! word character glued to a bare URL or `ISBN 123` breaks the autolink.
//! Such chunks are pushed with a [`ChunkKind`]; the buffer checks the left
//! context when the chunk lands and the right context when the next chunk
//! does, and separates them with `<nowiki/>` when needed.

use crate::dom::{Document, NodeId, Stx};
use regex::Regex;
use std::sync::LazyLock;

pub(crate) const NOWIKI: &str = "<nowiki/>";

// characters a bracket-less URL may continue with
static URL_CHAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[^\[\]<>"\x00-\x20\x7F\x{A0}\x{1680}\x{180E}\x{2000}-\x{200A}\x{202F}\x{205F}\x{3000}]"#)
        .expect("url char regex")
});

// entities that end a bare URL even though `&` alone would not
static URL_BREAKING_ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^&(?:lt|gt|nbsp|#x0*(?:3[CcEe]|[Aa]0)|#0*(?:60|62|160));")
        .expect("url breaking entity regex")
});

static OPEN_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&[#0-9a-zA-Z]*$").expect("open entity regex"));

static ENTITY_REST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[#0-9a-zA-Z]*;").expect("entity rest regex"));

/// How a chunk constrains the text on either side of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkKind {
    #[default]
    Plain,
    /// `[[target]]` or `[[target|text]]`; link trails follow it.
    WikiLink,
    /// A bare URL.
    AutoUrl,
    /// `ISBN ...`, `RFC ...`, `PMID ...`.
    MagicLink,
}

/// What the text after a chunk must not start with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SuffixRule {
    LinkTrail,
    UrlContinuation { open_entity: bool },
    WordChar,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl ChunkKind {
    /// The kind of a node's original source when it is reused verbatim.
    pub fn for_reused_source(doc: &Document, node: NodeId) -> Self {
        let dp = doc.dp(node);
        let rel = doc.attr(node, "rel").unwrap_or("");
        let wiki_rel = rel
            .split_ascii_whitespace()
            .any(|t| matches!(t, "mw:WikiLink" | "mw:WikiLink/Interwiki"));
        if doc.is_named(node, "a") && wiki_rel && (dp.is_stx(Stx::Simple) || dp.is_stx(Stx::Piped)) {
            ChunkKind::WikiLink
        } else if (doc.is_named(node, "a") && dp.is_stx(Stx::Url))
            || (doc.is_named(node, "img") && doc.attr_has_token(node, "rel", "mw:externalImage"))
        {
            ChunkKind::AutoUrl
        } else if dp.is_stx(Stx::Magiclink) {
            ChunkKind::MagicLink
        } else {
            ChunkKind::Plain
        }
    }

    /// Whether `left`, the text before the chunk on its line, would run
    /// into it.
    pub(crate) fn rejects_prefix(self, left: &str) -> bool {
        match self {
            ChunkKind::Plain => false,
            // an odd run of `[` would open a bracket around the link
            ChunkKind::WikiLink => {
                let run = left.len() - left.trim_end_matches('[').len();
                run % 2 == 1
            }
            ChunkKind::AutoUrl | ChunkKind::MagicLink => {
                left.chars().next_back().is_some_and(is_word_char)
            }
        }
    }

    pub(crate) fn suffix_rule(self, text: &str) -> Option<SuffixRule> {
        match self {
            ChunkKind::Plain => None,
            ChunkKind::WikiLink => Some(SuffixRule::LinkTrail),
            ChunkKind::AutoUrl => Some(SuffixRule::UrlContinuation {
                open_entity: OPEN_ENTITY.is_match(text),
            }),
            ChunkKind::MagicLink => Some(SuffixRule::WordChar),
        }
    }
}

impl SuffixRule {
    /// Whether `right`, the text that follows, would be absorbed.
    pub(crate) fn rejects(self, right: &str) -> bool {
        match self {
            SuffixRule::LinkTrail => right.starts_with(|c: char| c.is_ascii_alphabetic()),
            SuffixRule::WordChar => right.chars().next().is_some_and(is_word_char),
            SuffixRule::UrlContinuation { open_entity } => {
                if open_entity && ENTITY_REST.is_match(right) {
                    return true;
                }
                !right.starts_with("''")
                    && !URL_BREAKING_ENTITY.is_match(right)
                    && URL_CHAR.is_match(right)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_trails_and_brackets() {
        let trail = ChunkKind::WikiLink.suffix_rule("[[Foo]]").unwrap();
        assert!(trail.rejects("bar"));
        assert!(!trail.rejects(" bar"));
        assert!(!trail.rejects("'s"));
        assert!(ChunkKind::WikiLink.rejects_prefix("x["));
        assert!(!ChunkKind::WikiLink.rejects_prefix("x[["));
        assert!(!ChunkKind::WikiLink.rejects_prefix("x"));
    }

    #[test]
    fn bare_url_context() {
        let rule = ChunkKind::AutoUrl.suffix_rule("http://example.org").unwrap();
        assert!(rule.rejects("/more"));
        assert!(rule.rejects(".x"));
        assert!(!rule.rejects(" next"));
        assert!(!rule.rejects("''i''"));
        assert!(!rule.rejects("&lt;"));
        assert!(ChunkKind::AutoUrl.rejects_prefix("word"));
        assert!(!ChunkKind::AutoUrl.rejects_prefix("word "));

        let open = ChunkKind::AutoUrl.suffix_rule("http://example.org/&amp").unwrap();
        assert!(open.rejects("x;"));
    }

    #[test]
    fn magic_links_need_word_boundaries() {
        let rule = ChunkKind::MagicLink.suffix_rule("RFC 1234").unwrap();
        assert!(rule.rejects("5"));
        assert!(!rule.rejects("."));
        assert!(ChunkKind::MagicLink.rejects_prefix("x"));
    }
}
