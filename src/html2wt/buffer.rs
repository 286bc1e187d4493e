use crate::dom::NodeId;
use crate::html2wt::constrained::{ChunkKind, SuffixRule, NOWIKI};

/// Text emitted since the last newline, plus the node that started it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentLine {
    pub text: String,
    pub first_node: Option<NodeId>,
}

/// Append-only wikitext output.
///
/// Besides the finished text it tracks the line being written and whether
/// the next chunk lands at the start of a line, which most escaping and
/// separator decisions depend on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitBuffer {
    out: String,
    pub line: CurrentLine,
    pub on_sol: bool,
    pub at_start_of_output: bool,
    /// Constraint the last constrained chunk puts on what follows it.
    pending_suffix: Option<SuffixRule>,
}

impl Default for EmitBuffer {
    fn default() -> Self {
        Self {
            out: String::new(),
            line: CurrentLine::default(),
            on_sol: true,
            at_start_of_output: true,
            pending_suffix: None,
        }
    }
}

impl EmitBuffer {
    /// A scratch buffer for nested passes; it never starts a line or the
    /// document.
    pub fn nested() -> Self {
        Self {
            on_sol: false,
            at_start_of_output: false,
            ..Self::default()
        }
    }

    pub fn push(&mut self, text: &str) {
        self.push_chunk(text, ChunkKind::Plain);
    }

    /// Appends `text`, separating it with `<nowiki/>` from neighbours it
    /// would otherwise run into.
    pub fn push_chunk(&mut self, text: &str, kind: ChunkKind) {
        if text.is_empty() {
            return;
        }
        if self.pending_suffix.take().is_some_and(|rule| rule.rejects(text)) {
            self.push_raw(NOWIKI);
        }
        if kind.rejects_prefix(&self.line.text) {
            self.push_raw(NOWIKI);
        }
        self.push_raw(text);
        self.pending_suffix = kind.suffix_rule(text);
    }

    fn push_raw(&mut self, text: &str) {
        self.out.push_str(text);
        match text.rfind('\n') {
            Some(i) => {
                self.line.text.clear();
                self.line.text.push_str(&text[i + 1..]);
            }
            None => self.line.text.push_str(text),
        }
    }

    /// Starts a new line whose first contribution comes from `first_node`.
    pub fn reset_line(&mut self, first_node: Option<NodeId>) {
        self.line = CurrentLine {
            text: String::new(),
            first_node,
        };
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn last_char(&self) -> Option<char> {
        self.out.chars().next_back()
    }

    pub fn into_string(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_tracks_current_line() {
        let mut buf = EmitBuffer::default();
        buf.push("ab");
        assert_eq!(buf.line.text, "ab");
        buf.push("c\nde");
        assert_eq!(buf.line.text, "de");
        buf.push("");
        assert_eq!(buf.as_str(), "abc\nde");
        assert_eq!(buf.last_char(), Some('e'));
    }

    #[test]
    fn link_trail_gets_a_nowiki() {
        let mut buf = EmitBuffer::default();
        buf.push_chunk("[[Foo]]", ChunkKind::WikiLink);
        buf.push("");
        buf.push("bar");
        assert_eq!(buf.as_str(), "[[Foo]]<nowiki/>bar");

        let mut buf = EmitBuffer::default();
        buf.push_chunk("[[Foo]]", ChunkKind::WikiLink);
        buf.push(" bar");
        buf.push("[");
        buf.push_chunk("[[Baz]]", ChunkKind::WikiLink);
        assert_eq!(buf.as_str(), "[[Foo]] bar[<nowiki/>[[Baz]]");
        assert_eq!(buf.line.text, "[[Foo]] bar[<nowiki/>[[Baz]]");
    }

    #[test]
    fn nested_buffer_is_mid_line() {
        let buf = EmitBuffer::nested();
        assert!(!buf.on_sol && !buf.at_start_of_output);
        assert!(buf.into_string().is_empty());
    }
}
