//! AFL++ fuzz target for `html2wt`.
//!
//! This binary is stdin-driven so it can be used with AFL++.
//! Build and run it via `cargo-afl`:
//!
//! ```bash
//! cargo install cargo-afl
//!
//! cargo afl build --release --features afl_fuzz --bin html2wt_afl_serialize
//!
//! mkdir -p fuzz/afl/out
//!
//! cargo afl fuzz \
//!   -i fuzz/afl/in \
//!   -o fuzz/afl/out \
//!   target/release/html2wt_afl_serialize
//! ```
//!
//! Rust panics normally unwind and exit with a non-crashing status code.
//! AFL++ only treats crashes as signals/aborts. We therefore catch any unwind
//! and turn it into `abort()`.

use std::io::Read;

use html2wt::config::SerializerOptions;
use html2wt::dom::diff::diff_documents;
use html2wt::dom::load::load_html;
use html2wt::dom::{PageBundle, SourceText};
use html2wt::error::Error;
use html2wt::html2wt::WikitextSerializer;

const MAX_INPUT_LEN: usize = 1_000_000; // 1MB guardrail; AFL++ will typically cap this anyway.

fn run_one_input(data: &[u8]) {
    if data.len() > MAX_INPUT_LEN {
        return;
    }

    // lossy conversion keeps the harness total (no early returns that reduce coverage).
    let html = String::from_utf8_lossy(data).to_string();

    let Ok(loaded) = load_html(&html) else {
        return;
    };
    let serializer = WikitextSerializer::new(SerializerOptions::default());

    // full serialization: bad-input errors are fine, panics are not.
    let full = match serializer.serialize(&loaded.document, None, None) {
        Ok(out) => out,
        Err(Error::BadInput(_)) => return,
        Err(e) => panic!("unexpected error kind: {e}"),
    };

    // the bundle and diagnostics must always be encodable.
    let bundle = PageBundle::from_document(&loaded.document, full.diagnostics.clone());
    let json = serde_json::to_vec(&bundle).unwrap();
    let _back: PageBundle = serde_json::from_slice(&json).unwrap();

    // selser of an unedited document against arbitrary source text: dsr
    // offsets from the input may point anywhere, and must never be trusted
    // past the end of the source.
    let mut edited = loaded.document.clone();
    diff_documents(&loaded.document, &mut edited);
    let src = SourceText::new(full.wikitext.clone());
    let _ = serializer.serialize(&edited, Some(&src), None);
}

fn main() {
    let mut data = Vec::new();
    std::io::stdin().read_to_end(&mut data).unwrap();

    // convert any panic into an abort().
    if std::panic::catch_unwind(|| run_one_input(&data)).is_err() {
        std::process::abort();
    }
}
