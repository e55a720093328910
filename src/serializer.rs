//! Turns a sanitized [`Tree`] back into an HTML byte string. Mirrors the walker's iterative,
//! explicit-work-stack traversal (SPEC_FULL.md §4.4/§5) so serializing an adversarially deep
//! tree cannot overflow the native call stack.

use crate::buffer::{Buffer, EscapeContext};
use crate::tags::{is_raw_text, is_void, Tag};
use crate::tree::{Doctype, NodeId, NodeKind, Tree};

/// Serializes the whole document rooted at `tree.root`, including its doctype.
///
/// `allow_doctype` controls the fallback used when the source had no explicit doctype: when
/// `true`, a bare `<!DOCTYPE html>` is emitted; when `false`, none is.
pub fn serialize_document_with(tree: &Tree, allow_doctype: bool) -> String {
    let mut buf = Buffer::with_capacity(estimate_capacity(tree));
    emit_doctype(&mut buf, tree.doctype.as_ref(), allow_doctype);
    serialize_children(tree, tree.root, &mut buf);
    buf.into_string()
}

/// Serializes the whole document, emitting a bare `<!DOCTYPE html>` fallback when the source
/// had none. Equivalent to `serialize_document_with(tree, true)`; most callers that have run
/// a [`Policy`](crate::policy::Policy) should instead call [`serialize_document_with`] with
/// `policy.allow_doctype()`.
pub fn serialize_document(tree: &Tree) -> String {
    serialize_document_with(tree, true)
}

/// Serializes the fragment rooted at `root` (itself not emitted; only its children are) —
/// used for `DocumentFragment` and `<template>` content roots.
pub fn serialize_fragment(tree: &Tree, root: NodeId) -> String {
    let mut buf = Buffer::with_capacity(estimate_capacity(tree));
    serialize_children(tree, root, &mut buf);
    buf.into_string()
}

fn estimate_capacity(tree: &Tree) -> usize {
    tree.live_count().saturating_mul(16)
}

fn emit_doctype(buf: &mut Buffer, doctype: Option<&Doctype>, allow_doctype: bool) {
    match doctype {
        Some(d) => {
            buf.push_raw("<!DOCTYPE ");
            buf.push_raw(&d.name);
            match (d.public_id.is_empty(), d.system_id.is_empty()) {
                (false, false) => {
                    buf.push_raw(" PUBLIC \"");
                    buf.push_raw(&d.public_id);
                    buf.push_raw("\" \"");
                    buf.push_raw(&d.system_id);
                    buf.push_char('"');
                }
                (false, true) => {
                    buf.push_raw(" PUBLIC \"");
                    buf.push_raw(&d.public_id);
                    buf.push_char('"');
                }
                (true, false) => {
                    buf.push_raw(" SYSTEM \"");
                    buf.push_raw(&d.system_id);
                    buf.push_char('"');
                }
                (true, true) => {}
            }
            buf.push_raw(">");
        }
        None if allow_doctype => buf.push_raw("<!DOCTYPE html>"),
        None => {}
    }
}

/// One step in the explicit serialization work stack.
enum Frame {
    /// Emit the node at `id` (open tag, text, comment, whatever its kind calls for).
    Node { id: NodeId },
    /// Emit the closing tag for `tag`/`name`; pushed alongside a `Node` frame's children so it
    /// fires after them.
    Close { tag: Tag, unknown_name: Box<str> },
}

fn serialize_children(tree: &Tree, parent: NodeId, buf: &mut Buffer) {
    let mut stack: Vec<Frame> = tree
        .get(parent)
        .children()
        .iter()
        .rev()
        .map(|&id| Frame::Node { id })
        .collect();

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Close { tag, unknown_name } => {
                buf.push_raw("</");
                buf.push_raw(tag_name(tag, &unknown_name));
                buf.push_char('>');
            }
            Frame::Node { id } => serialize_one(tree, id, buf, &mut stack),
        }
    }
}

fn serialize_one(tree: &Tree, id: NodeId, buf: &mut Buffer, stack: &mut Vec<Frame>) {
    let node = tree.get(id);
    match node.kind() {
        NodeKind::Document => {
            // Only ever reached for a `<template>` content fragment's root when it is itself
            // walked as `parent` by `serialize_children`; the real document root is handled by
            // `serialize_document`, which never pushes a `Node` frame for `tree.root` itself.
            for &child in node.children() {
                stack.push(Frame::Node { id: child });
            }
        }
        NodeKind::Element { tag, unknown_name, attrs } => {
            let tag = *tag;
            emit_open_tag(buf, tag_name(tag, unknown_name), attrs);
            if is_void(tag) {
                return;
            }
            push_children_with_close(tree, id, tag, Box::from(""), stack);
        }
        NodeKind::Template { attrs, .. } => {
            emit_open_tag(buf, "template", attrs);
            buf.push_raw("</template>");
        }
        NodeKind::Whitespace(s) => buf.push_raw(s),
        NodeKind::Text(s) => {
            if parent_is_raw_text(tree, node.parent()) {
                buf.push_raw(s);
            } else {
                buf.push_escaped(s, EscapeContext::Text);
            }
        }
        NodeKind::CData(s) => {
            if parent_is_raw_text(tree, node.parent()) {
                buf.push_raw(s);
            } else {
                buf.push_escaped(s, EscapeContext::Text);
            }
        }
        NodeKind::Comment(s) => {
            buf.push_raw("<!--");
            buf.push_raw(s);
            buf.push_raw("-->");
        }
    }
}

fn push_children_with_close(
    tree: &Tree,
    id: NodeId,
    tag: Tag,
    unknown_name: Box<str>,
    stack: &mut Vec<Frame>,
) {
    stack.push(Frame::Close { tag, unknown_name });
    for &child in tree.get(id).children().iter().rev() {
        stack.push(Frame::Node { id: child });
    }
}

fn parent_is_raw_text(tree: &Tree, parent: Option<NodeId>) -> bool {
    parent
        .and_then(|p| tree.get(p).tag())
        .map(is_raw_text)
        .unwrap_or(false)
}

fn emit_open_tag(buf: &mut Buffer, name: &str, attrs: &[crate::tree::Attribute]) {
    buf.push_char('<');
    buf.push_raw(name);
    for attr in attrs {
        buf.push_char(' ');
        buf.push_raw(&attr.name);
        buf.push_raw("=\"");
        buf.push_escaped(&attr.value, EscapeContext::Attribute);
        buf.push_char('"');
    }
    buf.push_char('>');
}

fn tag_name<'a>(tag: Tag, unknown_name: &'a str) -> &'a str {
    if tag == Tag::Unknown {
        unknown_name
    } else {
        tag.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Attribute, Node};

    fn elem(tree: &mut Tree, tag: Tag, attrs: Vec<Attribute>) -> NodeId {
        tree.alloc(Node {
            kind: NodeKind::Element {
                tag,
                unknown_name: "".into(),
                attrs,
            },
            parent: None,
            index_in_parent: 0,
            children: Vec::new(),
        })
    }

    fn text(tree: &mut Tree, s: &str) -> NodeId {
        tree.alloc(Node {
            kind: NodeKind::Text(s.into()),
            parent: None,
            index_in_parent: 0,
            children: Vec::new(),
        })
    }

    #[test]
    fn escapes_text_and_attributes() {
        let mut tree = Tree::new();
        let root = tree.root;
        let a = elem(
            &mut tree,
            Tag::A,
            vec![Attribute::new("href", "\"><script>")],
        );
        let t = text(&mut tree, "<b>");
        tree.append_child(root, a);
        tree.append_child(a, t);

        let out = serialize_document_with(&tree, false);
        assert_eq!(
            out,
            "<a href=\"&quot;&gt;&lt;script&gt;\">&lt;b&gt;</a>"
        );
    }

    #[test]
    fn void_elements_have_no_closing_tag() {
        let mut tree = Tree::new();
        let root = tree.root;
        let br = elem(&mut tree, Tag::Br, Vec::new());
        tree.append_child(root, br);
        assert_eq!(serialize_document_with(&tree, false), "<br>");
    }

    #[test]
    fn script_contents_serialize_raw() {
        let mut tree = Tree::new();
        let root = tree.root;
        let script = elem(&mut tree, Tag::Script, Vec::new());
        let body = text(&mut tree, "a < b && c");
        tree.append_child(root, script);
        tree.append_child(script, body);
        assert_eq!(
            serialize_document_with(&tree, false),
            "<script>a < b && c</script>"
        );
    }

    #[test]
    fn doctype_fallback_when_allowed() {
        let tree = Tree::new();
        assert_eq!(serialize_document_with(&tree, true), "<!DOCTYPE html>");
        assert_eq!(serialize_document_with(&tree, false), "");
    }

    #[test]
    fn explicit_doctype_is_echoed() {
        let mut tree = Tree::new();
        tree.doctype = Some(Doctype {
            name: "html".into(),
            public_id: "".into(),
            system_id: "".into(),
        });
        assert_eq!(serialize_document_with(&tree, false), "<!DOCTYPE html>");
    }
}
