use crate::html2wt::SerializeContext;
use std::ops::{Deref, DerefMut};

/// Stack of "newlines forbidden here" scopes.
///
/// Headings, list items and same-line table cells push an enforcing frame;
/// constructs that legitimately span lines inside them (nested lists,
/// reused source, templates) push a disabling frame. The innermost frame
/// decides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SingleLineContext {
    stack: Vec<bool>,
}

impl SingleLineContext {
    pub fn enforce(&mut self) {
        self.stack.push(true);
    }

    pub fn disable(&mut self) {
        self.stack.push(false);
    }

    pub fn pop(&mut self) {
        self.stack.pop();
    }

    pub fn enforced(&self) -> bool {
        self.stack.last().copied().unwrap_or(false)
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub(crate) fn truncate(&mut self, depth: usize) {
        self.stack.truncate(depth);
    }
}

/// Scoped single-line frame; restores the stack when dropped, on every
/// exit path including `?` returns and unwinding.
pub struct SingleLineGuard<'c, 'a> {
    cx: &'c mut SerializeContext<'a>,
    depth: usize,
}

impl<'c, 'a> SingleLineGuard<'c, 'a> {
    pub(crate) fn new(cx: &'c mut SerializeContext<'a>, enforce: bool) -> Self {
        let depth = cx.state.single_line.depth();
        if enforce {
            cx.state.single_line.enforce();
        } else {
            cx.state.single_line.disable();
        }
        Self { cx, depth }
    }
}

impl<'a> Deref for SingleLineGuard<'_, 'a> {
    type Target = SerializeContext<'a>;

    fn deref(&self) -> &Self::Target {
        &*self.cx
    }
}

impl DerefMut for SingleLineGuard<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.cx
    }
}

impl Drop for SingleLineGuard<'_, '_> {
    fn drop(&mut self) {
        self.cx.state.single_line.truncate(self.depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SerializerOptions;
    use crate::dom::Document;
    use crate::error::Error;
    use crate::html2wt::{SerializerState, WikitextSerializer};

    #[test]
    fn failed_handler_unwinds_its_scope() {
        let mut doc = Document::new();
        let body = doc.body();
        let li = doc.append_element(body, "li", &[]);
        doc.append_element(li, "span", &[("typeof", "mw:Transclusion")]);
        let opts = SerializerOptions::default();
        let ser = WikitextSerializer::new(opts.clone());
        let mut cx = SerializeContext {
            doc: &doc,
            state: SerializerState::new(false),
            options: &opts,
            handlers: &ser.handlers,
            extensions: &ser.extensions,
            orig_src: None,
            cancel: None,
        };
        let res = {
            let mut cx = cx.enforce_single_line();
            assert_eq!(cx.state.single_line.depth(), 1);
            cx.serialize_children(li)
        };
        assert!(matches!(res, Err(Error::BadInput(_))));
        assert_eq!(cx.state.single_line.depth(), 0);
        assert!(!cx.state.single_line.enforced());
    }

    #[test]
    fn innermost_frame_decides() {
        let mut slc = SingleLineContext::default();
        assert!(!slc.enforced());
        slc.enforce();
        assert!(slc.enforced());
        slc.disable();
        assert!(!slc.enforced());
        slc.pop();
        assert!(slc.enforced());
        slc.pop();
        assert!(!slc.enforced());
        assert_eq!(slc.depth(), 0);
    }
}
