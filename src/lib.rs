pub mod config;
pub mod dom;
pub mod error;
pub mod html2wt;

use config::SerializerOptions;
use dom::diff::diff_documents;
use dom::load::load_html;
use dom::{Document, SourceText};
use error::{Error, Result};
use html2wt::{SerializeOutput, WikitextSerializer};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Files for selective serialization: the wikitext the edited HTML was
/// produced from, and optionally the unedited HTML to diff against.
///
/// Without `original_html` the edited HTML must already carry
/// `data-parsoid-diff` marks.
#[derive(Debug, Clone, Default)]
pub struct SelserInputs {
    pub original_html: Option<PathBuf>,
    pub original_wt: PathBuf,
}

/// A serialized document together with the (diff-marked) DOM it came from.
#[derive(Debug)]
pub struct Conversion {
    pub document: Document,
    pub output: SerializeOutput,
}

/// Loads `html` and serializes all of it.
pub fn serialize_html(html: &str, opts: &SerializerOptions) -> Result<SerializeOutput> {
    Ok(convert(html, None, None, opts)?.output)
}

/// Diffs `edited_html` against `original_html` and serializes it, reusing
/// `original_wt` wherever the edit left the DOM alone.
pub fn selser_html(
    edited_html: &str,
    original_html: &str,
    original_wt: &str,
    opts: &SerializerOptions,
) -> Result<SerializeOutput> {
    Ok(convert(edited_html, Some(original_html), Some(original_wt), opts)?.output)
}

/// Load, diff (when an original DOM is given) and serialize.
///
/// Load diagnostics come first in the output, followed by the serializer's.
pub fn convert(
    edited_html: &str,
    original_html: Option<&str>,
    original_wt: Option<&str>,
    opts: &SerializerOptions,
) -> Result<Conversion> {
    let loaded = load_html(edited_html)?;
    let mut document = loaded.document;
    let mut diagnostics = loaded.diagnostics;

    if let Some(orig) = original_html {
        let base = load_html(orig)?;
        diagnostics.extend(base.diagnostics);
        let outcome = diff_documents(&base.document, &mut document);
        if outcome.is_empty {
            log::debug!("edited document is identical to the original");
        }
    }

    let source = original_wt.map(SourceText::new);
    let serializer = WikitextSerializer::new(opts.clone());
    let mut output = serializer.serialize(&document, source.as_ref(), None)?;

    diagnostics.append(&mut output.diagnostics);
    output.diagnostics = diagnostics;
    Ok(Conversion { document, output })
}

/// Single file mode: read `html_path` (and the selser inputs, if any) and convert.
pub fn run(
    html_path: &Path,
    selser: Option<&SelserInputs>,
    opts: &SerializerOptions,
) -> Result<Conversion> {
    let edited = read_lossy(html_path)?;
    match selser {
        None => convert(&edited, None, None, opts),
        Some(inputs) => {
            let original_wt = read_lossy(&inputs.original_wt)?;
            let original_html = inputs
                .original_html
                .as_deref()
                .map(read_lossy)
                .transpose()?;
            convert(&edited, original_html.as_deref(), Some(&original_wt), opts)
        }
    }
}

/// Bulk mode: Walk the provided HTML root directory and serialize every `.html`
/// file into a `.wiki` file at the same relative path under `wt_root`.
pub fn serialize_all_in_dirs(
    html_root: &Path,
    wt_root: &Path,
    opts: &SerializerOptions,
) -> Result<()> {
    let start_time = Instant::now();

    if !html_root.exists() {
        return Err(Error::Other(format!(
            "HTML source directory not found: {}",
            html_root.display()
        )));
    }

    let mut entries: Vec<_> = WalkDir::new(html_root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_type().is_file() && e.path().extension().is_some_and(|ext| ext == "html")
        })
        .collect();

    entries.sort_by(|a, b| a.path().cmp(b.path()));

    let serializer = WikitextSerializer::new(opts.clone());
    let total = entries.len();
    let mut count = 0;

    for entry in entries {
        let path = entry.path();
        let relative = path.strip_prefix(html_root)?;

        let mut wt_path = wt_root.join(relative);
        wt_path.set_extension("wiki");

        if let Some(parent) = wt_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let html = read_lossy(path)?;
        let loaded = load_html(&html)?;
        let out = serializer.serialize(&loaded.document, None, None)?;
        fs::write(&wt_path, &out.wikitext)?;

        count += 1;

        let total_ms = start_time.elapsed().as_millis();
        let mins = total_ms / 60_000;
        let secs = (total_ms % 60_000) / 1_000;
        let ms = total_ms % 1_000;
        eprintln!(
            "[{:>4}/{:>4}] [{:02}:{:02}.{:03}] Serialized: {:?}",
            count, total, mins, secs, ms, wt_path
        );
    }

    let total_secs = start_time.elapsed().as_secs_f64();
    let avg_str = if count > 0 {
        format!("{:.3}s", total_secs / count as f64)
    } else {
        "-".to_string()
    };

    eprintln!(
        "Done. Serialized {} files in {:.3}s (avg {}/doc).",
        count, total_secs, avg_str
    );
    Ok(())
}

fn read_lossy(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;

    // tolerate invalid UTF-8 rather than failing the whole run
    Ok(String::from_utf8(bytes)
        .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_plain_html() {
        let out = serialize_html(
            "<html><body><p>a</p><p>b</p></body></html>",
            &SerializerOptions::default(),
        )
        .unwrap();
        assert_eq!(out.wikitext, "a\n\nb");
    }

    #[test]
    fn selser_without_edits_returns_source() {
        let wt = "'''bold'''";
        let html = r#"<html><body data-parsoid='{"dsr":[0,10,0,0]}'><p data-parsoid='{"dsr":[0,10,0,0]}'><b data-parsoid='{"dsr":[0,10,3,3]}'>bold</b></p></body></html>"#;
        let out = selser_html(html, html, wt, &SerializerOptions::default()).unwrap();
        assert_eq!(out.wikitext, wt);
    }

    #[test]
    fn missing_bulk_root_is_an_error() {
        let err = serialize_all_in_dirs(
            Path::new("/definitely/not/here"),
            Path::new("/tmp/out"),
            &SerializerOptions::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("HTML source directory not found"));
    }
}
