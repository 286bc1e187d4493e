use crate::dom::{
    DataMw, DataParsoid, Diagnostic, DiffMark, Document, NodeId, SCHEMA_VERSION, SERIALIZER_NAME,
    SERIALIZER_VERSION,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// JSON dump of a document's metadata side table, for inspection.
///
/// Entries are keyed by [`NodeId`]; nodes without any metadata are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageBundle {
    /// Schema version for this JSON payload.
    pub schema_version: u32,

    pub serializer: SerializerInfo,

    /// How to interpret all source offsets contained in this file.
    pub offset_encoding: OffsetEncoding,

    pub diff_applied: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,

    pub ids: BTreeMap<NodeId, BundleEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetEncoding {
    pub unit: OffsetUnit,
    pub base: OffsetBase,
}

impl Default for OffsetEncoding {
    fn default() -> Self {
        Self {
            unit: OffsetUnit::Codepoint,
            base: OffsetBase::OriginalWikitext,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetUnit {
    /// Unicode scalar values.
    Codepoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetBase {
    OriginalWikitext,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleEntry {
    pub tag: String,

    pub parsoid: DataParsoid,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mw: Option<DataMw>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diff: Vec<DiffMark>,
}

impl PageBundle {
    pub fn from_document(doc: &Document, diagnostics: Vec<Diagnostic>) -> Self {
        let mut ids = BTreeMap::new();
        for id in doc.descendants(doc.body()) {
            let Some(tag) = doc.name(id) else {
                continue;
            };
            let meta = doc.meta(id);
            if meta.dp == DataParsoid::default() && meta.mw.is_none() && meta.diff.is_empty() {
                continue;
            }
            ids.insert(
                id,
                BundleEntry {
                    tag: tag.to_string(),
                    parsoid: meta.dp.clone(),
                    mw: meta.mw.clone(),
                    diff: meta.diff.clone(),
                },
            );
        }

        Self {
            schema_version: SCHEMA_VERSION,
            serializer: SerializerInfo {
                name: SERIALIZER_NAME.to_string(),
                version: SERIALIZER_VERSION.to_string(),
            },
            offset_encoding: OffsetEncoding::default(),
            diff_applied: doc.diff_applied(),
            diagnostics,
            ids,
        }
    }
}
