use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Options controlling how synthesized (non-reused) wikitext looks.
///
/// Loadable from YAML; every field is optional in the file:
///
/// ```yaml
/// space_in_new_headings: false
/// escape_text: true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializerOptions {
    /// `== Title ==` instead of `==Title==` for headings added by an edit.
    pub space_in_new_headings: bool,

    /// `* item` instead of `*item` for list items added by an edit.
    pub space_after_new_bullets: bool,

    /// Protect text that would otherwise reparse as markup.
    pub escape_text: bool,

    /// Drop trailing horizontal whitespace on a separator's last line when
    /// the next node is inline, so it can't start an indent-pre.
    pub strip_indent_pre_whitespace: bool,

    /// Tidy the tree before serializing: merge adjacent bold or italic
    /// runs, drop empty formatting and headings, move edge spaces out of
    /// formatting and links.
    pub scrub_wikitext: bool,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            space_in_new_headings: true,
            space_after_new_bullets: false,
            escape_text: true,
            strip_indent_pre_whitespace: true,
            scrub_wikitext: true,
        }
    }
}

impl SerializerOptions {
    pub fn from_yaml_str(src: &str) -> Result<Self> {
        // an empty file deserializes to `null`
        if src.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(src)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let src = fs::read_to_string(path)?;
        Self::from_yaml_str(&src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let opts = SerializerOptions::from_yaml_str("space_in_new_headings: false\n").unwrap();
        assert!(!opts.space_in_new_headings);
        assert!(opts.escape_text);
        assert!(!opts.space_after_new_bullets);
        assert!(opts.scrub_wikitext);
    }

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(
            SerializerOptions::from_yaml_str("  \n").unwrap(),
            SerializerOptions::default()
        );
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(SerializerOptions::from_yaml_str("escape_text: [1, 2]").is_err());
    }
}
