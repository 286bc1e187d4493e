//! Escaping of DOM text so that it reparses as the same text.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);").expect("entity regex")
});

// markup that is significant anywhere on a line
static INLINE_MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \[\[ | \]\] | \{\{ | \}\} | '' | ~~~ | -\{ | \}-
        | __[A-Z]+__
        | <[A-Za-z/!]
        | \[(?i:https?:|ftp:|mailto:|//)
        | (?i:\b(?:ISBN|RFC|PMID)\s+\d)
        ",
    )
    .expect("inline markup regex")
});

/// Where an escaped text chunk lands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EscapeContext {
    pub on_sol: bool,
    pub in_table: bool,
    pub in_link: bool,
    pub in_indent_pre: bool,
}

/// `&amp;`-escapes anything that would decode as a character reference.
pub fn escape_entities(text: &str) -> Cow<'_, str> {
    ENTITY.replace_all(text, "&amp;$1;")
}

fn wrap_nowiki(text: &str) -> String {
    format!("<nowiki>{}</nowiki>", text.replace("</nowiki", "&lt;/nowiki"))
}

fn sol_sensitive_prefix(line: &str, cx: EscapeContext) -> Option<usize> {
    let first = line.chars().next()?;
    match first {
        '*' | '#' | ':' | ';' => Some(1),
        '=' if line.trim_end().len() > 1 && line.trim_end().ends_with('=') => Some(1),
        '-' if line.starts_with("----") => Some(4),
        '{' if line.starts_with("{|") => Some(2),
        '|' | '!' if cx.in_table => Some(1),
        ' ' | '\t' if !cx.in_indent_pre => {
            let ws = line.len() - line.trim_start_matches([' ', '\t']).len();
            (ws < line.len()).then_some(ws)
        }
        _ => None,
    }
}

/// Protects `text` against reparsing as wikitext markup.
///
/// Text containing inline markup is wrapped in `<nowiki>` as a whole;
/// otherwise only line-start characters that would open a list, heading,
/// table or indent-pre are wrapped.
pub fn escape_wikitext(text: &str, cx: EscapeContext) -> Cow<'_, str> {
    if text.is_empty() {
        return Cow::Borrowed(text);
    }
    let risky = INLINE_MARKUP.is_match(text)
        || (cx.in_link && text.contains('|'))
        || (cx.in_table && (text.contains("||") || text.contains("!!")));
    if risky {
        return Cow::Owned(wrap_nowiki(text));
    }

    let mut out = String::new();
    let mut changed = false;
    for (i, line) in text.split_inclusive('\n').enumerate() {
        let at_sol = i > 0 || cx.on_sol;
        match sol_sensitive_prefix(line, cx).filter(|_| at_sol) {
            Some(n) => {
                out.push_str(&wrap_nowiki(&line[..n]));
                out.push_str(&line[n..]);
                changed = true;
            }
            None => out.push_str(line),
        }
    }
    if changed {
        Cow::Owned(out)
    } else {
        Cow::Borrowed(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sol() -> EscapeContext {
        EscapeContext {
            on_sol: true,
            ..EscapeContext::default()
        }
    }

    #[test]
    fn entities_are_double_escaped() {
        assert_eq!(escape_entities("a &amp; b &#160; &x"), "a &amp;amp; b &amp;#160; &x");
        assert!(matches!(escape_entities("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn inline_markup_is_nowiki_wrapped() {
        let cx = EscapeContext::default();
        assert_eq!(escape_wikitext("[[x]]", cx), "<nowiki>[[x]]</nowiki>");
        assert_eq!(escape_wikitext("it''s", cx), "<nowiki>it''s</nowiki>");
        assert_eq!(escape_wikitext("a <b> c", cx), "<nowiki>a <b> c</nowiki>");
        assert_eq!(escape_wikitext("plain text", cx), "plain text");
    }

    #[test]
    fn line_start_markup_only_escaped_on_sol() {
        assert_eq!(escape_wikitext("*x", sol()), "<nowiki>*</nowiki>x");
        assert_eq!(escape_wikitext("*x", EscapeContext::default()), "*x");
        assert_eq!(escape_wikitext("a\n#b", EscapeContext::default()), "a\n<nowiki>#</nowiki>b");
        assert_eq!(escape_wikitext("----", sol()), "<nowiki>----</nowiki>");
        assert_eq!(escape_wikitext("  x", sol()), "<nowiki>  </nowiki>x");
    }

    #[test]
    fn table_and_link_contexts() {
        let table = EscapeContext {
            in_table: true,
            ..sol()
        };
        assert_eq!(escape_wikitext("|x", table), "<nowiki>|</nowiki>x");
        assert_eq!(escape_wikitext("a||b", table), "<nowiki>a||b</nowiki>");
        let link = EscapeContext {
            in_link: true,
            ..EscapeContext::default()
        };
        assert_eq!(escape_wikitext("a|b", link), "<nowiki>a|b</nowiki>");
    }
}
