use crate::dom::{
    Diagnostic, DiagnosticPhase, Document, NodeId, ParamInfo, Stx, TemplateInvocation,
    TemplatePart,
};
use crate::error::{Error, Result};
use crate::html2wt::handlers::list::list_bullets;
use crate::html2wt::handlers::DomHandler;
use crate::html2wt::{Constraint, SerializeContext};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// What an extension serializer produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionOutput {
    Wikitext(String),
    /// Render the tag from `data-mw` instead.
    UseDefault,
}

/// Serializes the content of one extension tag (`<ref>`, `<gallery>`, ...).
pub trait ExtensionSerializer: Send + Sync {
    fn dom_to_wikitext(
        &self,
        node: NodeId,
        cx: &mut SerializeContext<'_>,
        wrapper_unmodified: bool,
    ) -> Result<ExtensionOutput>;

    /// Newline constraint before the tag; `None` leaves it to the default.
    fn before(&self, _node: NodeId, _other: NodeId, _cx: &SerializeContext<'_>) -> Option<Constraint> {
        None
    }
}

/// Extension serializers by tag name.
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
    by_name: HashMap<String, Arc<dyn ExtensionSerializer>>,
}

impl ExtensionRegistry {
    pub fn register(&mut self, name: &str, ext: Arc<dyn ExtensionSerializer>) {
        self.by_name.insert(name.to_ascii_lowercase(), ext);
    }

    pub fn get(&self, name: &str) -> Option<&dyn ExtensionSerializer> {
        self.by_name
            .get(&name.to_ascii_lowercase())
            .map(|e| e.as_ref())
    }
}

const ENCAPSULATION_TYPES: &[&str] = &["mw:Transclusion", "mw:Param"];

fn transclusion_type<'d>(doc: &'d Document, node: NodeId) -> Option<&'d str> {
    doc.attr(node, "typeof")?
        .split_ascii_whitespace()
        .find(|t| ENCAPSULATION_TYPES.contains(t))
}

/// `data-mw.name`, or the name in `typeof="mw:Extension/<name>"`.
fn extension_name(doc: &Document, node: NodeId) -> Option<String> {
    let named = doc
        .mw(node)
        .and_then(|mw| mw.name.clone())
        .filter(|n| !n.is_empty());
    named.or_else(|| {
        doc.type_of_with_prefix(node, "mw:Extension/")
            .and_then(|t| t.strip_prefix("mw:Extension/"))
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    })
}

fn param_wt(value: &Value) -> Option<&str> {
    value.get("wt")?.as_str()
}

/// Serializes one `{{...}}` or `{{{...}}}` invocation.
///
/// Parameters keep their source order from `data-parsoid.pi`; ones only
/// known to `data-mw` follow in the order they appear there. A parameter
/// stays positional while its key is the next number, it was not written
/// `name=value` and its value has no `=`. Named values are trimmed and
/// regain their source spacing.
fn invocation_wt(
    cx: &mut SerializeContext<'_>,
    node: NodeId,
    inv: &TemplateInvocation,
    open: &str,
    close: &str,
) -> String {
    let doc = cx.doc;
    let new_element = doc.is_new_element(node);
    let mut target = inv.target.wt.clone();
    if new_element {
        target = target.replace('\n', " ").trim().to_string();
    }
    let mut out = format!("{open}{target}");

    let arg_info: &[ParamInfo] = inv
        .i
        .and_then(|i| doc.dp(node).pi.get(i))
        .map_or(&[], Vec::as_slice);
    let mut params: Vec<(&str, &Value)> = inv
        .params
        .iter()
        .map(|(k, v)| (k.trim(), v))
        .collect();

    let order = arg_info
        .iter()
        .map(|a| a.k.as_str())
        .chain(inv.params.keys().map(|k| k.trim()))
        .collect::<Vec<_>>();

    let mut numeric_index = 1;
    for key in order {
        let Some(pos) = params.iter().position(|(k, _)| *k == key) else {
            continue;
        };
        let (key, value) = params.remove(pos);
        let info = arg_info.iter().find(|a| a.k == key);

        let wt = match param_wt(value) {
            Some(wt) => wt,
            None => {
                let diag = Diagnostic::warning(
                    DiagnosticPhase::Serialize,
                    "html2wt.template.param_without_wt",
                    format!(
                        "parameter {key:?} of {target:?} on {} has no wikitext",
                        cx.node_label(node)
                    ),
                );
                cx.push_diagnostic(diag);
                ""
            }
        };
        let key_wt = value
            .get("key")
            .and_then(|k| k.get("wt"))
            .and_then(Value::as_str);
        let name = key_wt.unwrap_or(key);

        let as_named = info.is_some_and(|a| a.named)
            || key_wt.is_some()
            || key != numeric_index.to_string()
            || wt.contains('=');

        out.push('|');
        if !as_named {
            // whitespace is significant in positional values
            out.push_str(wt);
            numeric_index += 1;
            continue;
        }
        let [name_before, name_after, value_before, value_after] = match info
            .and_then(|a| a.spc.as_ref())
        {
            Some(spc) if !name.is_empty() => spc.clone(),
            _ => Default::default(),
        };
        let arg = format!(
            "{name_before}{name}{name_after}={value_before}{}{value_after}",
            wt.trim()
        );
        if new_element {
            out.push_str(arg.replace('\n', " ").trim());
        } else {
            out.push_str(&arg);
        }
    }
    out.push_str(close);
    out
}

fn parts_wt(cx: &mut SerializeContext<'_>, node: NodeId, parts: &[TemplatePart]) -> String {
    let mut out = String::new();
    for part in parts {
        match part {
            TemplatePart::Text(text) => out.push_str(text),
            TemplatePart::Template { template } => {
                out.push_str(&invocation_wt(cx, node, template, "{{", "}}"));
            }
            TemplatePart::Arg { templatearg } => {
                out.push_str(&invocation_wt(cx, node, templatearg, "{{{", "}}}"));
            }
        }
    }
    out
}

/// `<name attrs>extsrc</name>` from `data-mw`, self-closed without a body.
fn default_extension_wt(cx: &mut SerializeContext<'_>, node: NodeId, name: &str) -> String {
    let doc = cx.doc;
    let mw = doc.mw(node).cloned().unwrap_or_default();
    let mut tag = format!("<{name}");
    for (key, value) in &mw.attrs {
        let value = match value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        tag.push(' ');
        tag.push_str(key);
        tag.push_str("=\"");
        tag.push_str(&html_escape::encode_double_quoted_attribute(&value));
        tag.push('"');
    }
    let Some(body) = mw.body else {
        tag.push_str(" />");
        return tag;
    };
    tag.push('>');
    match body.extsrc {
        Some(src) => tag.push_str(&src),
        None => {
            let diag = Diagnostic::warning(
                DiagnosticPhase::Serialize,
                "html2wt.extension.no_src",
                format!("extension <{name}> on {} has a body without source", cx.node_label(node)),
            );
            cx.push_diagnostic(diag);
        }
    }
    tag.push_str(&format!("</{name}>"));
    tag
}

fn src_fallback(cx: &mut SerializeContext<'_>, node: NodeId, what: &str) -> Option<String> {
    let doc = cx.doc;
    let src = doc.dp(node).src.clone()?;
    let diag = Diagnostic::warning(
        DiagnosticPhase::Serialize,
        "html2wt.encapsulated.src_fallback",
        format!("{what} on {} has no data-mw; using its source text", cx.node_label(node)),
    )
    .with_range(doc.dp(node).dsr.and_then(|d| d.range()));
    cx.push_diagnostic(diag);
    Some(src)
}

/// Templates, template parameters and extension tags: regenerated from
/// `data-mw`, not from the DOM they expanded to.
pub struct EncapsulatedHandler;

impl EncapsulatedHandler {
    fn source(
        cx: &mut SerializeContext<'_>,
        node: NodeId,
        wrapper_unmodified: bool,
    ) -> Result<String> {
        let doc = cx.doc;
        if let Some(ty) = transclusion_type(doc, node) {
            if let Some(mw) = doc.mw(node).filter(|mw| !mw.parts.is_empty()) {
                return Ok(parts_wt(cx, node, &mw.parts));
            }
            return src_fallback(cx, node, ty).ok_or_else(|| {
                Error::BadInput(format!(
                    "Cannot serialize {ty} without data-mw.parts or data-parsoid.src"
                ))
            });
        }

        match extension_name(doc, node) {
            Some(name) => {
                let output = match cx.extension(&name) {
                    Some(ext) => ext.dom_to_wikitext(node, cx, wrapper_unmodified)?,
                    None => ExtensionOutput::UseDefault,
                };
                Ok(match output {
                    ExtensionOutput::Wikitext(wt) => wt,
                    ExtensionOutput::UseDefault => default_extension_wt(cx, node, &name),
                })
            }
            None => src_fallback(cx, node, "extension").ok_or_else(|| {
                Error::BadInput(
                    "Cannot serialize extension without data-mw.name or data-parsoid.src"
                        .to_string(),
                )
            }),
        }
    }

    /// Bullets owed by the enclosing lists when a templated list or list
    /// item does not carry them in its own source.
    fn list_prefix(cx: &mut SerializeContext<'_>, node: NodeId) -> String {
        let doc = cx.doc;
        let is_list_like = doc.is_list(node) || doc.is_list_item(node);
        let row_dd = doc.is_named(node, "dd") && doc.dp(node).is_stx(Stx::Row);
        if !is_list_like
            || row_dd
            || doc.previous_non_sep_sibling(node).is_some()
            || Self::parent_bullets_emitted(doc, node)
            || !Self::lacks_shared_prefix(doc, node)
        {
            return String::new();
        }
        match doc.parent(node) {
            Some(parent) => list_bullets(cx, parent),
            None => String::new(),
        }
    }

    fn parent_bullets_emitted(doc: &Document, node: NodeId) -> bool {
        if doc.is_literal_html(node) {
            return true;
        }
        if doc.is_list(node) {
            return !doc.parent(node).is_some_and(|p| doc.is_list_item(p));
        }
        let mut parent = doc.parent(node);
        while let Some(p) = parent.filter(|&p| doc.is_builder_inserted(p)) {
            parent = doc.parent(p);
        }
        let expected: &[&str] = if doc.is_named(node, "li") {
            &["ul", "ol"]
        } else {
            &["dl"]
        };
        !parent
            .and_then(|p| doc.name(p))
            .is_some_and(|n| expected.contains(&n))
    }

    /// A templated item whose source starts with fewer than two bullets was
    /// not given the bullets of the lists around it.
    fn lacks_shared_prefix(doc: &Document, node: NodeId) -> bool {
        if doc.has_type_of(node, "mw:Transclusion") {
            return match doc.mw(node).and_then(|mw| mw.parts.first()) {
                Some(TemplatePart::Text(first)) => {
                    !(first.len() >= 2 && first.chars().all(|c| matches!(c, '*' | '#' | ':' | ';')))
                }
                _ => true,
            };
        }
        doc.type_of_with_prefix(node, "mw:Extension/").is_some() || doc.has_type_of(node, "mw:Param")
    }
}

impl DomHandler for EncapsulatedHandler {
    fn handle(
        &self,
        node: NodeId,
        cx: &mut SerializeContext<'_>,
        wrapper_unmodified: bool,
    ) -> Result<Option<NodeId>> {
        let doc = cx.doc;
        let src = Self::source(cx, node, wrapper_unmodified)?;
        let mut cx = cx.disable_single_line();
        let prefix = Self::list_prefix(&mut cx, node);
        cx.emit(&format!("{prefix}{src}"), node);
        Ok(doc.skip_over_encapsulated_content(node))
    }

    fn before(&self, node: NodeId, other: NodeId, cx: &SerializeContext<'_>) -> Constraint {
        let doc = cx.doc;
        if doc.type_of_with_prefix(node, "mw:Extension/").is_some()
            && !doc.has_type_of(node, "mw:Transclusion")
        {
            let hook = extension_name(doc, node)
                .and_then(|name| cx.extension(&name))
                .and_then(|ext| ext.before(node, other, cx));
            if let Some(c) = hook {
                return c;
            }
        }
        match doc.dp(node).first_wikitext_node.as_deref() {
            Some(first) => cx.handler_for_first_wikitext_node(first).before(node, other, cx),
            None => Constraint::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{DataMw, DomSourceRange, ExtensionBody, TemplateTarget};
    use crate::html2wt::WikitextSerializer;
    use serde_json::json;

    fn template(target: &str, params: Value) -> TemplatePart {
        TemplatePart::Template {
            template: TemplateInvocation {
                target: TemplateTarget {
                    wt: target.to_string(),
                    href: None,
                },
                params: params.as_object().cloned().unwrap_or_default(),
                i: Some(0),
            },
        }
    }

    #[test]
    fn positional_then_named_params() {
        let mut doc = Document::new();
        let body = doc.body();
        let span = doc.append_element(
            body,
            "span",
            &[("typeof", "mw:Transclusion"), ("about", "#mwt1")],
        );
        doc.append_text(span, "expanded");
        doc.meta_mut(span).mw = Some(DataMw {
            parts: vec![template(
                "echo",
                json!({
                    "1": {"wt": "a"},
                    "2": {"wt": "b"},
                    "3": {"wt": "x=y"},
                    "4": {"wt": "d"},
                    "name": {"wt": " v "}
                }),
            )],
            ..DataMw::default()
        });
        let out = WikitextSerializer::default().serialize(&doc, None, None).unwrap();
        assert_eq!(out.wikitext, "{{echo|a|b|3=x=y|4=d|name=v}}");
    }

    #[test]
    fn params_keep_the_order_they_were_given_in() {
        let mut doc = Document::new();
        let body = doc.body();
        let span = doc.append_element(body, "span", &[("typeof", "mw:Transclusion")]);
        doc.meta_mut(span).mw = Some(DataMw {
            parts: vec![template(
                "cite",
                json!({"title": {"wt": "T"}, "author": {"wt": "A"}, "2": {"wt": "b"}}),
            )],
            ..DataMw::default()
        });
        let out = WikitextSerializer::default().serialize(&doc, None, None).unwrap();
        assert_eq!(out.wikitext, "{{cite|title=T|author=A|2=b}}");
    }

    #[test]
    fn source_order_and_spacing_win_over_data_mw_order() {
        let mut doc = Document::new();
        let body = doc.body();
        let span = doc.append_element(body, "span", &[("typeof", "mw:Transclusion")]);
        doc.meta_mut(span).dp.dsr = Some(DomSourceRange::new(0, 0, 0, 0));
        doc.meta_mut(span).mw = Some(DataMw {
            parts: vec![template(
                "cite",
                json!({
                    "added": {"wt": "new"},
                    "title": {"wt": "T"},
                    "1": {"wt": "pos"},
                    "author": {"wt": "A"}
                }),
            )],
            ..DataMw::default()
        });
        doc.meta_mut(span).dp.pi = vec![vec![
            ParamInfo {
                k: "author".into(),
                named: false,
                spc: Some([" ".into(), " ".into(), " ".into(), "\n".into()]),
            },
            ParamInfo {
                k: "1".into(),
                named: true,
                spc: None,
            },
            ParamInfo {
                k: "title".into(),
                ..ParamInfo::default()
            },
        ]];
        let out = WikitextSerializer::default().serialize(&doc, None, None).unwrap();
        assert_eq!(
            out.wikitext,
            "{{cite| author = A\n|1=pos|title=T|added=new}}"
        );
    }

    #[test]
    fn extension_attributes_keep_their_order() {
        let mut doc = Document::new();
        let body = doc.body();
        let ext = doc.append_element(body, "span", &[("typeof", "mw:Extension/ref")]);
        doc.meta_mut(ext).mw = Some(DataMw {
            name: Some("ref".into()),
            attrs: json!({"name": "n", "group": "g"})
                .as_object()
                .cloned()
                .unwrap_or_default(),
            body: Some(ExtensionBody {
                extsrc: Some("x".into()),
            }),
            ..DataMw::default()
        });
        let out = WikitextSerializer::default().serialize(&doc, None, None).unwrap();
        assert_eq!(out.wikitext, "<ref name=\"n\" group=\"g\">x</ref>");
    }

    #[test]
    fn about_siblings_are_skipped() {
        let mut doc = Document::new();
        let body = doc.body();
        let first = doc.append_element(
            body,
            "p",
            &[("typeof", "mw:Transclusion"), ("about", "#mwt2")],
        );
        doc.append_text(first, "one");
        let second = doc.append_element(body, "p", &[("about", "#mwt2")]);
        doc.append_text(second, "two");
        doc.meta_mut(first).mw = Some(DataMw {
            parts: vec![
                TemplatePart::Text("lead ".into()),
                template("x", json!({})),
            ],
            ..DataMw::default()
        });
        let out = WikitextSerializer::default().serialize(&doc, None, None).unwrap();
        assert_eq!(out.wikitext, "lead {{x}}");
    }

    #[test]
    fn extension_default_rendering() {
        let mut doc = Document::new();
        let body = doc.body();
        let ext = doc.append_element(body, "span", &[("typeof", "mw:Extension/ref")]);
        doc.meta_mut(ext).mw = Some(DataMw {
            name: Some("ref".into()),
            attrs: json!({"name": "a"}).as_object().cloned().unwrap_or_default(),
            body: Some(ExtensionBody {
                extsrc: Some("cite".into()),
            }),
            ..DataMw::default()
        });
        let empty = doc.append_element(body, "span", &[("typeof", "mw:Extension/references")]);
        doc.meta_mut(empty).mw = Some(DataMw::default());
        let out = WikitextSerializer::default().serialize(&doc, None, None).unwrap();
        assert_eq!(out.wikitext, "<ref name=\"a\">cite</ref><references />");
    }

    struct Upper;

    impl ExtensionSerializer for Upper {
        fn dom_to_wikitext(
            &self,
            node: NodeId,
            cx: &mut SerializeContext<'_>,
            _wrapper_unmodified: bool,
        ) -> Result<ExtensionOutput> {
            Ok(ExtensionOutput::Wikitext(format!(
                "<shout>{}</shout>",
                cx.doc.text_content(node).to_uppercase()
            )))
        }
    }

    #[test]
    fn registered_extension_is_used() {
        let mut doc = Document::new();
        let body = doc.body();
        let ext = doc.append_element(body, "span", &[("typeof", "mw:Extension/shout")]);
        doc.append_text(ext, "hi");
        let mut ser = WikitextSerializer::default();
        ser.register_extension("shout", Arc::new(Upper));
        let out = ser.serialize(&doc, None, None).unwrap();
        assert_eq!(out.wikitext, "<shout>HI</shout>");
    }

    #[test]
    fn missing_data_is_an_error_or_a_fallback() {
        let mut doc = Document::new();
        let body = doc.body();
        let tpl = doc.append_element(body, "span", &[("typeof", "mw:Transclusion")]);
        let err = WikitextSerializer::default()
            .serialize(&doc, None, None)
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("Cannot serialize mw:Transclusion without data-mw.parts or data-parsoid.src"));

        doc.meta_mut(tpl).dp.src = Some("{{old}}".into());
        let out = WikitextSerializer::default().serialize(&doc, None, None).unwrap();
        assert_eq!(out.wikitext, "{{old}}");
        assert!(out
            .diagnostics
            .iter()
            .any(|d| d.code.as_deref() == Some("html2wt.encapsulated.src_fallback")));
    }
}
