use crate::dom::{Document, NodeId};
use regex::Regex;
use std::sync::LazyLock;

static AUTO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^mw[\w-]{2,}$").expect("auto id regex"));

/// Keeps the tokens of a `typeof`/`rel` value that are not parser-internal.
fn user_tokens(value: &str) -> String {
    value
        .split_ascii_whitespace()
        .filter(|t| !t.starts_with("mw:"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Renders the attributes of `node` as ` name="value"` pairs for a wikitext
/// table line or a literal HTML tag.
///
/// Values whose rendered form is unchanged are written as they appeared in
/// the source. Parser-internal attributes are left out, and so are the
/// names in `skip`.
pub fn serialize_attributes(doc: &Document, node: NodeId, skip: &[&str]) -> String {
    let dp = doc.dp(node);
    let mut out = String::new();
    for attr in doc.attrs(node) {
        let name = attr.name.as_str();
        if skip.contains(&name) || name.starts_with("data-mw") || name.starts_with("data-parsoid") {
            continue;
        }
        let value: String = match name {
            "about" if attr.value.starts_with("#mwt") => continue,
            "id" if AUTO_ID.is_match(&attr.value) => continue,
            "typeof" | "rel" => {
                let kept = user_tokens(&attr.value);
                if kept.is_empty() {
                    continue;
                }
                kept
            }
            _ => dp
                .shadow_source(name, &attr.value)
                .unwrap_or(&attr.value)
                .to_string(),
        };
        out.push(' ');
        out.push_str(name);
        if !value.is_empty() {
            out.push_str("=\"");
            out.push_str(&html_escape::encode_double_quoted_attribute(&value));
            out.push('"');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_internal_attributes_and_prefers_source_values() {
        let mut doc = Document::new();
        let body = doc.body();
        let div = doc.append_element(
            body,
            "div",
            &[
                ("class", "a \"b\""),
                ("typeof", "mw:Transclusion"),
                ("about", "#mwt3"),
                ("id", "mwAg"),
                ("style", "color:red"),
                ("hidden", ""),
            ],
        );
        let dp = &mut doc.meta_mut(div).dp;
        dp.a.insert("style".into(), Some("color:red".into()));
        dp.sa.insert("style".into(), Some("color: red".into()));

        assert_eq!(
            serialize_attributes(&doc, div, &[]),
            " class=\"a &quot;b&quot;\" style=\"color: red\" hidden"
        );
        assert_eq!(serialize_attributes(&doc, div, &["class", "style", "hidden"]), "");
    }
}
