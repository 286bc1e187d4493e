//! DOM -> wikitext serializer.
//!
//! The walk is depth-first and strictly ordered. Before a node emits
//! anything, the separator owed since the previous output is resolved from
//! the newline constraints both neighbours declared (see [`separators`]).
//! In selective mode, nodes the edit left alone are replaced by their
//! original source.
//!
//! ```no_run
//! use html2wt::config::SerializerOptions;
//! use html2wt::dom::load::load_html;
//! use html2wt::html2wt::WikitextSerializer;
//!
//! let doc = load_html("<p>Hello</p>")?.document;
//! let out = WikitextSerializer::new(SerializerOptions::default()).serialize(&doc, None, None)?;
//! assert_eq!(out.wikitext, "Hello");
//! # Ok::<(), html2wt::error::Error>(())
//! ```

mod attrs;
mod buffer;
mod constrained;
mod constraint;
mod escape;
pub mod handlers;
mod normalize;
mod selser;
mod separators;
mod single_line;
mod state;

pub use attrs::serialize_attributes;
pub use buffer::{CurrentLine, EmitBuffer};
pub use constrained::ChunkKind;
pub use constraint::{Constraint, Merged};
pub use escape::{escape_entities, escape_wikitext, EscapeContext};
pub use handlers::{DomHandler, ExtensionOutput, ExtensionRegistry, ExtensionSerializer, HandlerRegistry};
pub use normalize::normalize;
pub use selser::orig_src_valid_in_edited_context;
pub use separators::{count_newlines, is_valid_sep};
pub use single_line::{SingleLineContext, SingleLineGuard};
pub use state::{ConstraintInfo, PendingConstraint, SepState, SepType, SerializerState};

use crate::config::SerializerOptions;
use crate::dom::{Diagnostic, DiagnosticPhase, DiffMark, Document, NodeId, SourceRange, SourceText};
use crate::error::{Error, Result};
use regex::Regex;
use selser::Reuse;
use separators::strip_comments;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

static SEP_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*\n+[ \t\r\n]*").expect("sep prefix regex"));

static SEP_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t\r\n]*$").expect("sep suffix regex"));

/// Shared flag for aborting a serialization from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SerializeOutput {
    pub wikitext: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Which nested pass [`SerializeContext::serialize_children_to_string`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestedMode {
    Link,
    Caption,
    IndentPre,
}

/// Reusable serializer: handler tables plus output options.
#[derive(Clone, Default)]
pub struct WikitextSerializer {
    handlers: HandlerRegistry,
    extensions: ExtensionRegistry,
    options: SerializerOptions,
}

impl WikitextSerializer {
    pub fn new(options: SerializerOptions) -> Self {
        Self {
            handlers: HandlerRegistry::with_defaults(),
            extensions: ExtensionRegistry::default(),
            options,
        }
    }

    pub fn options(&self) -> &SerializerOptions {
        &self.options
    }

    pub fn register_handler(
        &mut self,
        tag: &str,
        stx: Option<crate::dom::Stx>,
        handler: Arc<dyn DomHandler>,
    ) {
        self.handlers.register(tag, stx, handler);
    }

    pub fn register_extension(&mut self, name: &str, ext: Arc<dyn ExtensionSerializer>) {
        self.extensions.register(name, ext);
    }

    /// Serializes the body of `doc`.
    ///
    /// With `orig`, nodes the diff left unmarked reuse their original
    /// source. Without diff information on `doc` that would be guesswork,
    /// so the document is serialized in full and a warning is recorded.
    pub fn serialize(
        &self,
        doc: &Document,
        orig: Option<&SourceText>,
        cancel: Option<&CancelToken>,
    ) -> Result<SerializeOutput> {
        let mut diagnostics = Vec::new();
        let orig = match orig {
            Some(src) if doc.diff_applied() => Some(src),
            Some(_) => {
                let diag = Diagnostic::warning(
                    DiagnosticPhase::Serialize,
                    "html2wt.selser.no_diff",
                    "original source given but the document carries no diff information",
                )
                .with_note("serializing the whole document instead of reusing source");
                diag.log();
                diagnostics.push(diag);
                None
            }
            None => None,
        };

        let normalized;
        let doc = if self.options.scrub_wikitext {
            let mut copy = doc.clone();
            normalize(&mut copy, orig.is_some());
            normalized = copy;
            &normalized
        } else {
            doc
        };

        let mut state = SerializerState::new(orig.is_some());
        state.diagnostics = diagnostics;
        let mut cx = SerializeContext {
            doc,
            state,
            options: &self.options,
            handlers: &self.handlers,
            extensions: &self.extensions,
            orig_src: orig,
            cancel,
        };
        cx.kick_off(doc.body(), true)?;

        let SerializerState {
            buf, diagnostics, ..
        } = cx.state;
        Ok(SerializeOutput {
            wikitext: buf.into_string(),
            diagnostics,
        })
    }
}

/// Everything one serialization run reads and writes. Handlers receive it
/// by `&mut` and recurse through it.
pub struct SerializeContext<'a> {
    pub doc: &'a Document,
    pub state: SerializerState,
    pub options: &'a SerializerOptions,
    handlers: &'a HandlerRegistry,
    extensions: &'a ExtensionRegistry,
    orig_src: Option<&'a SourceText>,
    cancel: Option<&'a CancelToken>,
}

impl<'a> SerializeContext<'a> {
    pub fn handler_for(&self, node: NodeId) -> &'a dyn DomHandler {
        self.handlers.lookup(self.doc, node)
    }

    /// Handler for a `firstWikitextNode` value such as `TABLE` or `P_html`.
    pub fn handler_for_first_wikitext_node(&self, name: &str) -> &'a dyn DomHandler {
        let lower = name.to_ascii_lowercase();
        let (tag, html) = match lower.strip_suffix("_html") {
            Some(tag) => (tag, true),
            None => (lower.as_str(), false),
        };
        if html && tag != "a" {
            return self.handlers.fallback();
        }
        self.handlers
            .for_tag(tag)
            .unwrap_or_else(|| self.handlers.fallback())
    }

    pub fn extension(&self, name: &str) -> Option<&'a dyn ExtensionSerializer> {
        self.extensions.get(name)
    }

    pub fn orig_src(&self) -> Option<&'a SourceText> {
        self.orig_src
    }

    pub fn orig_slice(&self, range: SourceRange) -> Option<&'a str> {
        self.orig_src?.slice(range)
    }

    /// Short node description for logs and diagnostics.
    pub fn node_label(&self, node: NodeId) -> String {
        match self.doc.name(node) {
            Some(name) => format!("{name}#{}", node.0),
            None if self.doc.is_text(node) => format!("#text#{}", node.0),
            None => format!("#comment#{}", node.0),
        }
    }

    pub fn push_diagnostic(&mut self, diag: Diagnostic) {
        diag.log();
        self.state.diagnostics.push(diag);
    }

    /// Forbids newlines until the guard is dropped.
    pub fn enforce_single_line(&mut self) -> SingleLineGuard<'_, 'a> {
        SingleLineGuard::new(self, true)
    }

    /// Allows newlines again inside an enforced scope until the guard is
    /// dropped.
    pub fn disable_single_line(&mut self) -> SingleLineGuard<'_, 'a> {
        SingleLineGuard::new(self, false)
    }

    /// Buffers separator text (whitespace, comments) for the next emission.
    pub fn append_sep(&mut self, text: &str) {
        self.state.sep.append_src(text);
    }

    /// Emits `text` verbatim after the separator owed before `node`.
    pub fn emit(&mut self, text: &str, node: NodeId) {
        self.emit_chunk(text, node, false);
    }

    /// Emits `text` after the separator owed before `node`, escaping it
    /// against reparsing as markup when `escape` is set.
    pub fn emit_chunk(&mut self, text: &str, node: NodeId, escape: bool) {
        self.emit_text(text, node, escape, ChunkKind::Plain);
    }

    /// Emits markup that must not run into its neighbours, such as a wiki
    /// link followed by letters that would become its link trail.
    pub fn emit_constrained(&mut self, text: &str, node: NodeId, kind: ChunkKind) {
        self.emit_text(text, node, false, kind);
    }

    fn emit_text(&mut self, text: &str, node: NodeId, escape: bool, kind: ChunkKind) {
        let text = if self.state.single_line.enforced() {
            text.replace('\n', " ")
        } else {
            text.to_string()
        };
        self.emit_sep_for_node(node);

        let buf = &mut self.state.buf;
        if buf.on_sol {
            buf.reset_line(Some(node));
        }
        let out = if escape {
            escape_wikitext(
                &text,
                EscapeContext {
                    on_sol: buf.on_sol,
                    in_table: self.state.wiki_table_nesting > 0,
                    in_link: self.state.in_link,
                    in_indent_pre: self.state.in_indent_pre,
                },
            )
            .into_owned()
        } else {
            text
        };
        log::trace!("---> chunk | {out:?}");
        buf.push_chunk(&out, kind);
        if !out.is_empty() && !strip_comments(&out).is_empty() {
            buf.on_sol = out.ends_with('\n');
        }
        if !buf.as_str().is_empty() {
            buf.at_start_of_output = false;
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        match self.cancel {
            Some(token) if token.is_cancelled() => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }

    /// Serializes `node` and returns the next sibling to visit.
    pub fn serialize_node(&mut self, node: NodeId) -> Result<Option<NodeId>> {
        self.check_cancelled()?;
        let doc = self.doc;
        log::trace!("walk       | {}", self.node_label(node));

        if let Some(c) = doc.comment(node) {
            self.append_sep(&format!("<!--{c}-->"));
            return Ok(doc.next_sibling(node));
        }
        if doc.is_iew(node) && !self.state.in_indent_pre {
            self.append_sep(doc.text(node).unwrap_or(""));
            return Ok(doc.next_sibling(node));
        }
        if doc.is_diff_marker(node) {
            self.state.update_modification_flags(node);
            self.state.sep.last_source_node = Some(node);
            return Ok(doc.next_sibling(node));
        }

        let prev = doc
            .previous_non_sep_sibling(node)
            .or_else(|| doc.parent(node));
        if let Some(prev) = prev {
            self.update_separator_constraints(prev, node);
        }

        let next = if doc.is_element(node) {
            self.serialize_element(node)?
        } else {
            self.serialize_text(node);
            doc.next_sibling(node)
        };

        let after = first_content_node(doc, next).or_else(|| doc.parent(node));
        if let Some(after) = after {
            self.update_separator_constraints(node, after);
        }
        self.state.update_modification_flags(node);
        Ok(next)
    }

    fn serialize_element(&mut self, node: NodeId) -> Result<Option<NodeId>> {
        let wrapper_unmodified = match self.try_reuse_source(node) {
            Reuse::Emitted(next) => return Ok(next),
            Reuse::Rebuild { wrapper_unmodified } => wrapper_unmodified,
        };
        self.state.curr_node_unmodified = false;
        let handler = self.handler_for(node);

        let inserted =
            self.state.selser_mode && self.doc.meta(node).has_diff_mark(DiffMark::Inserted);
        let saved = self.state.in_modified_content;
        if inserted {
            self.state.in_modified_content = true;
        }
        let next = handler.handle(node, self, wrapper_unmodified);
        self.state.in_modified_content = saved;
        next
    }

    fn serialize_text(&mut self, node: NodeId) {
        let doc = self.doc;
        let Some(full) = doc.text(node) else { return };

        if self.state.selser_mode {
            let prev = doc.prev_sibling(node);
            self.state.curr_node_unmodified = !self.state.in_modified_content
                && match prev {
                    None => doc.parent(node).is_some_and(|p| doc.is_body(p)),
                    Some(p) => !doc.is_diff_marker(p),
                };
        } else {
            self.state.curr_node_unmodified = false;
        }

        let mut text = full;
        let mut trailing = None;
        if !self.state.in_indent_pre {
            if let Some(m) = SEP_PREFIX.find(text) {
                self.append_sep(m.as_str());
                text = &text[m.end()..];
            }
            if let Some(m) = SEP_SUFFIX.find(text) {
                trailing = Some(m.as_str());
                text = &text[..m.start()];
            }
        }

        let escape = self.options.escape_text
            && (self.state.buf.on_sol || !self.state.curr_node_unmodified)
            && !self.state.in_html_pre;
        let text = escape_entities(text);
        self.emit_chunk(&text, node, escape);

        if let Some(nl) = trailing {
            if self.state.sep.src_str().is_empty() {
                self.append_sep(nl);
            }
        }
    }

    /// Serializes every child of `parent` in order.
    pub fn serialize_children(&mut self, parent: NodeId) -> Result<()> {
        let mut child = self.doc.first_child(parent);
        while let Some(c) = child {
            child = self.serialize_node(c)?;
        }
        self.state.curr_node_unmodified = false;
        Ok(())
    }

    /// Serializes the children of `node` into a scratch buffer and returns
    /// the text, leaving the main output and separator untouched.
    pub fn serialize_children_to_string(&mut self, node: NodeId, mode: NestedMode) -> Result<String> {
        let saved_buf = std::mem::replace(&mut self.state.buf, EmitBuffer::nested());
        let saved_sep = std::mem::take(&mut self.state.sep);
        let saved_flags = (
            self.state.prev_node_unmodified,
            self.state.curr_node_unmodified,
            self.state.prev_node,
        );
        let saved_mode = std::mem::replace(self.mode_flag(mode), true);

        let result = {
            let mut cx = self.disable_single_line();
            cx.kick_off(node, false)
        };

        *self.mode_flag(mode) = saved_mode;
        let nested = std::mem::replace(&mut self.state.buf, saved_buf);
        self.state.sep = saved_sep;
        (
            self.state.prev_node_unmodified,
            self.state.curr_node_unmodified,
            self.state.prev_node,
        ) = saved_flags;

        result?;
        Ok(nested.into_string())
    }

    fn mode_flag(&mut self, mode: NestedMode) -> &mut bool {
        match mode {
            NestedMode::Link => &mut self.state.in_link,
            NestedMode::Caption => &mut self.state.in_caption,
            NestedMode::IndentPre => &mut self.state.in_indent_pre,
        }
    }

    /// Serializes the children of `node` and the separator that closes it.
    fn kick_off(&mut self, node: NodeId, top_level: bool) -> Result<()> {
        self.state.sep.last_source_node = Some(node);
        self.state.curr_node_unmodified = false;
        self.state.update_modification_flags(node);
        self.state.buf.reset_line(self.doc.first_child(node));

        self.serialize_children(node)?;

        self.state.at_end_of_output = top_level;
        self.emit("", node);
        self.state.at_end_of_output = false;
        Ok(())
    }
}

/// `start` if it is content, else the next content sibling after it.
fn first_content_node(doc: &Document, start: Option<NodeId>) -> Option<NodeId> {
    let n = start?;
    if doc.is_content_node(n) {
        Some(n)
    } else {
        doc.next_non_sep_sibling(n)
    }
}
