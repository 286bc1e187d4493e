use crate::dom::{Diagnostic, NodeId};
use crate::html2wt::{Constraint, EmitBuffer, SingleLineContext};

/// How the two nodes around a separator relate in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SepType {
    ParentChild,
    ChildParent,
    Sibling,
}

/// Where a pending constraint came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstraintInfo {
    pub on_sol: bool,
    pub force_sol: bool,
    pub sep_type: SepType,
    pub node_a: NodeId,
    pub node_b: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingConstraint {
    pub constraint: Constraint,
    pub info: ConstraintInfo,
}

/// The separator between the last emitted chunk and the next one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SepState {
    pub constraints: Option<PendingConstraint>,
    /// Whitespace and comments buffered from the DOM.
    pub src: Option<String>,
    pub last_source_node: Option<NodeId>,
}

impl SepState {
    pub fn append_src(&mut self, text: &str) {
        self.src.get_or_insert_with(String::new).push_str(text);
    }

    pub fn src_str(&self) -> &str {
        self.src.as_deref().unwrap_or("")
    }
}

/// Mutable state of one serialization run.
#[derive(Debug, Default)]
pub struct SerializerState {
    pub sep: SepState,
    pub buf: EmitBuffer,
    pub single_line: SingleLineContext,
    pub diagnostics: Vec<Diagnostic>,

    pub selser_mode: bool,
    pub in_modified_content: bool,
    pub prev_node: Option<NodeId>,
    pub prev_node_unmodified: bool,
    pub curr_node_unmodified: bool,

    pub in_link: bool,
    pub in_caption: bool,
    pub in_indent_pre: bool,
    pub in_html_pre: bool,
    pub wiki_table_nesting: usize,
    /// Set while the final separator of the document is built.
    pub at_end_of_output: bool,
}

impl SerializerState {
    pub fn new(selser_mode: bool) -> Self {
        Self {
            selser_mode,
            ..Self::default()
        }
    }

    /// Shifts the "current node" flags once a node has been handled.
    pub fn update_modification_flags(&mut self, node: NodeId) {
        self.prev_node_unmodified = self.curr_node_unmodified;
        self.curr_node_unmodified = false;
        self.prev_node = Some(node);
    }
}
