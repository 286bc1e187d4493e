use crate::dom::DomSourceRange;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which wikitext syntax variant produced an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stx {
    /// Literal HTML tag in the source.
    Html,
    /// Same-line table cell (`||`) or definition (`;a:b`).
    Row,
    /// `[[target|text]]`
    Piped,
    Simple,
    /// Bare URL.
    Url,
    Magiclink,
    #[serde(other)]
    Other,
}

/// Serializer-facing part of `data-parsoid`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DataParsoid {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stx: Option<Stx>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dsr: Option<DomSourceRange>,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub auto_inserted_start: bool,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub auto_inserted_end: bool,

    /// Tag name of the first wikitext construct inside encapsulated content.
    #[serde(rename = "firstWikitextNode", skip_serializing_if = "Option::is_none")]
    pub first_wikitext_node: Option<String>,

    /// Verbatim source for placeholders and opaque content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_tag_src: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_tag_src: Option<String>,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub self_close: bool,

    #[serde(rename = "extra_dashes", skip_serializing_if = "Option::is_none")]
    pub extra_dashes: Option<usize>,

    /// Attribute values as rendered into the DOM.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub a: BTreeMap<String, Option<String>>,

    /// Attribute values as written in the source.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub sa: BTreeMap<String, Option<String>>,

    /// Source order and spacing of template parameters, one list per
    /// template part (indexed by the part's `i`).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pi: Vec<Vec<ParamInfo>>,
}

/// How one template parameter was written in the source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamInfo {
    pub k: String,
    /// Written as `name=value` even though it is numbered.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub named: bool,
    /// Whitespace around the name and the value: `[before name, after
    /// name, before value, after value]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spc: Option<[String; 4]>,
}

impl DataParsoid {
    pub fn is_stx(&self, stx: Stx) -> bool {
        self.stx == Some(stx)
    }

    /// Source text for attribute `name`, if the rendered value is still
    /// `current`.
    pub fn shadow_source(&self, name: &str, current: &str) -> Option<&str> {
        let rendered = self.a.get(name)?.as_deref();
        if rendered != Some(current) {
            return None;
        }
        self.sa.get(name)?.as_deref()
    }
}

/// One part of a transclusion: literal wikitext or a template/parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplatePart {
    Text(String),
    Template { template: TemplateInvocation },
    Arg { templatearg: TemplateInvocation },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateInvocation {
    pub target: TemplateTarget,
    pub params: serde_json::Map<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub i: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateTarget {
    pub wt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extsrc: Option<String>,
}

/// `data-mw`: what an encapsulated region was generated from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataMw {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<TemplatePart>,

    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub attrs: serde_json::Map<String, serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<ExtensionBody>,
}

/// Marks left on a node by the DOM diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiffMark {
    Inserted,
    Deleted,
    ModifiedWrapper,
    ChildrenChanged,
    SubtreeChanged,
    /// Reordered among its siblings by normalization.
    Moved,
}

/// `data-parsoid-diff`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataDiff {
    pub diff: Vec<DiffMark>,
}

/// Everything the serializer knows about a node beyond its tag and attrs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeMetadata {
    pub dp: DataParsoid,
    pub mw: Option<DataMw>,
    pub diff: Vec<DiffMark>,
}

impl NodeMetadata {
    pub fn has_diff_mark(&self, mark: DiffMark) -> bool {
        self.diff.contains(&mark)
    }

    pub fn add_diff_mark(&mut self, mark: DiffMark) {
        if !self.diff.contains(&mark) {
            self.diff.push(mark);
        }
    }
}
