use crate::dom::{DataMw, DataParsoid, NodeMetadata};
use serde::{Deserialize, Serialize};

/// Stable identity of a node inside one [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lower-cased tag name.
    pub name: String,
    pub attrs: Vec<Attr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
        }
    }
}

/// Arena DOM rooted at a `<body>` element.
///
/// Every node has a [`NodeMetadata`] entry in a side table indexed by the
/// same [`NodeId`]; metadata never lives in the attribute list.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    meta: Vec<NodeMetadata>,
    body: NodeId,
    diff_applied: bool,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            meta: Vec::new(),
            body: NodeId(0),
            diff_applied: false,
        };
        doc.body = doc.create_element("body", Vec::new());
        doc
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Number of nodes ever allocated, detached ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the body has no children.
    pub fn is_empty(&self) -> bool {
        self.first_child(self.body).is_none()
    }

    /// Whether diff marks are present (from a DOM diff or from the input).
    pub fn diff_applied(&self) -> bool {
        self.diff_applied
    }

    pub fn set_diff_applied(&mut self, applied: bool) {
        self.diff_applied = applied;
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(kind));
        self.meta.push(NodeMetadata::default());
        id
    }

    pub fn create_element(&mut self, name: &str, attrs: Vec<Attr>) -> NodeId {
        self.alloc(NodeKind::Element(Element {
            name: name.to_ascii_lowercase(),
            attrs,
        }))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Comment(text.into()))
    }

    // ------------------------------------------------------------------
    // node access

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.kind(id) {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Tag name for elements, `None` otherwise.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.name.as_str())
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Element(_))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Text(_))
    }

    pub fn is_comment(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Comment(_))
    }

    pub fn is_named(&self, id: NodeId, name: &str) -> bool {
        self.name(id) == Some(name)
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn comment(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Comment(t) => Some(t),
            _ => None,
        }
    }

    pub fn attrs(&self, id: NodeId) -> &[Attr] {
        self.element(id).map(|e| e.attrs.as_slice()).unwrap_or(&[])
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let NodeKind::Element(e) = &mut self.nodes[id.index()].kind {
            match e.attrs.iter_mut().find(|a| a.name == name) {
                Some(a) => a.value = value,
                None => e.attrs.push(Attr {
                    name: name.to_string(),
                    value,
                }),
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        if let NodeKind::Element(e) = &mut self.nodes[id.index()].kind {
            let pos = e.attrs.iter().position(|a| a.name == name)?;
            return Some(e.attrs.remove(pos).value);
        }
        None
    }

    /// Whether the whitespace-separated attribute `name` contains `token`.
    pub fn attr_has_token(&self, id: NodeId, name: &str, token: &str) -> bool {
        self.attr(id, name)
            .is_some_and(|v| v.split_ascii_whitespace().any(|t| t == token))
    }

    /// First `typeof` token starting with `prefix`.
    pub fn type_of_with_prefix(&self, id: NodeId, prefix: &str) -> Option<&str> {
        self.attr(id, "typeof")?
            .split_ascii_whitespace()
            .find(|t| t.starts_with(prefix))
    }

    pub fn has_type_of(&self, id: NodeId, token: &str) -> bool {
        self.attr_has_token(id, "typeof", token)
    }

    // ------------------------------------------------------------------
    // metadata side table

    pub fn meta(&self, id: NodeId) -> &NodeMetadata {
        &self.meta[id.index()]
    }

    pub fn meta_mut(&mut self, id: NodeId) -> &mut NodeMetadata {
        &mut self.meta[id.index()]
    }

    pub fn dp(&self, id: NodeId) -> &DataParsoid {
        &self.meta(id).dp
    }

    pub fn mw(&self, id: NodeId) -> Option<&DataMw> {
        self.meta(id).mw.as_ref()
    }

    // ------------------------------------------------------------------
    // navigation

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).first_child
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).last_child
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).prev_sibling
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next_sibling
    }

    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            doc: self,
            next: self.first_child(id),
        }
    }

    /// Pre-order walk of `id` and everything below it.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            out.push(n);
            let kids: Vec<NodeId> = self.children(n).collect();
            stack.extend(kids.into_iter().rev());
        }
        out
    }

    pub fn is_ancestor_of(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        while let Some(p) = self.parent(node) {
            if p == ancestor {
                return true;
            }
            node = p;
        }
        false
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for n in self.descendants(id) {
            if let Some(t) = self.text(n) {
                out.push_str(t);
            }
        }
        out
    }

    // ------------------------------------------------------------------
    // mutation

    /// Replaces the content of a text node; other nodes are left alone.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let NodeKind::Text(t) = &mut self.nodes[id.index()].kind {
            *t = text.into();
        }
    }

    /// Unlinks `child` from its parent and siblings.
    pub fn detach(&mut self, child: NodeId) {
        let (parent, prev, next) = {
            let n = self.node(child);
            (n.parent, n.prev_sibling, n.next_sibling)
        };
        if let Some(p) = prev {
            self.nodes[p.index()].next_sibling = next;
        } else if let Some(par) = parent {
            self.nodes[par.index()].first_child = next;
        }
        if let Some(n) = next {
            self.nodes[n.index()].prev_sibling = prev;
        } else if let Some(par) = parent {
            self.nodes[par.index()].last_child = prev;
        }
        let n = &mut self.nodes[child.index()];
        n.parent = None;
        n.prev_sibling = None;
        n.next_sibling = None;
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        let last = self.last_child(parent);
        {
            let c = &mut self.nodes[child.index()];
            c.parent = Some(parent);
            c.prev_sibling = last;
        }
        match last {
            Some(l) => self.nodes[l.index()].next_sibling = Some(child),
            None => self.nodes[parent.index()].first_child = Some(child),
        }
        self.nodes[parent.index()].last_child = Some(child);
    }

    /// Inserts `child` immediately before `reference`.
    pub fn insert_before(&mut self, reference: NodeId, child: NodeId) {
        let Some(parent) = self.parent(reference) else {
            return;
        };
        self.detach(child);
        let prev = self.prev_sibling(reference);
        {
            let c = &mut self.nodes[child.index()];
            c.parent = Some(parent);
            c.prev_sibling = prev;
            c.next_sibling = Some(reference);
        }
        self.nodes[reference.index()].prev_sibling = Some(child);
        match prev {
            Some(p) => self.nodes[p.index()].next_sibling = Some(child),
            None => self.nodes[parent.index()].first_child = Some(child),
        }
    }

    // ------------------------------------------------------------------
    // builder helpers

    pub fn append_element(&mut self, parent: NodeId, name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attrs = attrs
            .iter()
            .map(|(n, v)| Attr {
                name: n.to_string(),
                value: v.to_string(),
            })
            .collect();
        let id = self.create_element(name, attrs);
        self.append(parent, id);
        id
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.create_text(text);
        self.append(parent, id);
        id
    }

    pub fn append_comment(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.create_comment(text);
        self.append(parent, id);
        id
    }
}

pub struct Children<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let cur = self.next?;
        self.next = self.doc.next_sibling(cur);
        Some(cur)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_insert_detach_keep_links_consistent() {
        let mut doc = Document::new();
        let body = doc.body();
        let a = doc.append_element(body, "P", &[]);
        let c = doc.append_element(body, "p", &[]);
        let b = doc.create_text("mid");
        doc.insert_before(c, b);

        assert_eq!(doc.name(a), Some("p"));
        assert_eq!(doc.children(body).collect::<Vec<_>>(), vec![a, b, c]);
        assert_eq!(doc.prev_sibling(c), Some(b));
        assert_eq!(doc.next_sibling(a), Some(b));

        doc.detach(a);
        assert_eq!(doc.first_child(body), Some(b));
        assert_eq!(doc.prev_sibling(b), None);
        assert_eq!(doc.parent(a), None);

        doc.detach(c);
        assert_eq!(doc.last_child(body), Some(b));
        assert_eq!(doc.children(body).count(), 1);
    }

    #[test]
    fn attrs_and_typeof_tokens() {
        let mut doc = Document::new();
        let body = doc.body();
        let span = doc.append_element(
            body,
            "span",
            &[("typeof", "mw:Transclusion mw:Image/Thumb")],
        );
        assert!(doc.has_type_of(span, "mw:Transclusion"));
        assert_eq!(doc.type_of_with_prefix(span, "mw:Image"), Some("mw:Image/Thumb"));
        doc.set_attr(span, "class", "x");
        assert_eq!(doc.attr(span, "class"), Some("x"));
        assert_eq!(doc.remove_attr(span, "class").as_deref(), Some("x"));
        assert_eq!(doc.attr(span, "class"), None);
    }

    #[test]
    fn text_content_is_document_order() {
        let mut doc = Document::new();
        let body = doc.body();
        let p = doc.append_element(body, "p", &[]);
        doc.append_text(p, "a");
        let b = doc.append_element(p, "b", &[]);
        doc.append_text(b, "b");
        doc.append_comment(p, "ignored");
        doc.append_text(p, "c");
        assert_eq!(doc.text_content(body), "abc");
    }
}
