//! The parser adapter: an `html5ever::tree_builder::TreeSink` implementation that builds
//! directly into this crate's [`Tree`] arena, so there is no intermediate DOM to convert out
//! of (SPEC_FULL.md §4.5).

use std::borrow::Cow;

use html5ever::driver as html;
use html5ever::interface::Attribute as Html5Attribute;
use html5ever::tree_builder::{ElementFlags as Html5ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{ExpandedName, QualName};
use tendril::stream::TendrilSink;
use tendril::StrTendril;

use crate::error::SanitizeError;
use crate::policy::Policy;
use crate::tags::Tag;
use crate::tree::{AttrNamespace, Attribute, Doctype, Node, NodeId, NodeKind, Tree};

/// Knobs bounding how much work a single parse is allowed to do, plus an optional policy to
/// sanitize with immediately after parsing.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// If set, the parsed tree is sanitized under this policy before being returned.
    pub sanitizer: Option<Policy>,
    /// Rejects input larger than this many bytes before parsing begins.
    pub max_input_bytes: usize,
    /// Rejects (via [`SanitizeError::Parse`]) a parse that would allocate more than this many
    /// tree nodes.
    pub max_nodes: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            sanitizer: None,
            max_input_bytes: 10 * 1024 * 1024,
            max_nodes: 250_000,
        }
    }
}

/// Parses `text` as a full HTML document, returning the resulting (possibly sanitized) tree.
pub fn parse_document(text: &str, options: &ParseOptions) -> Result<Tree, SanitizeError> {
    parse_with(text, options, None)
}

/// Parses `text` as an HTML fragment, as if it were the content of a `<div>` (HTML5's
/// standard fragment-parsing context), returning the resulting (possibly sanitized) tree
/// rooted at `tree.root`, whose children are the fragment's top-level nodes.
pub fn parse_fragment(text: &str, options: &ParseOptions) -> Result<Tree, SanitizeError> {
    parse_with(text, options, Some("div"))
}

/// Parses `bytes` after validating them as UTF-8, surfacing [`SanitizeError::Encoding`] for
/// anything else. All other input in this crate arrives as `&str`, which the type system
/// already guarantees is valid UTF-8; this is the one entry point that accepts raw bytes.
pub fn parse_document_bytes(bytes: &[u8], options: &ParseOptions) -> Result<Tree, SanitizeError> {
    parse_document(std::str::from_utf8(bytes)?, options)
}

fn parse_with(
    text: &str,
    options: &ParseOptions,
    fragment_context: Option<&str>,
) -> Result<Tree, SanitizeError> {
    if text.len() > options.max_input_bytes {
        return Err(SanitizeError::Parse(format!(
            "input of {} bytes exceeds max_input_bytes ({})",
            text.len(),
            options.max_input_bytes
        )));
    }

    let cleaned = preprocess(text);
    let sink = Sink::new(options.max_nodes);

    let sink = match fragment_context {
        None => html::parse_document(sink, html::ParseOpts::default()).one(cleaned),
        Some(context_tag) => {
            let context = QualName::new(None, html5ever::ns!(html), html5ever::LocalName::from(context_tag));
            html::parse_fragment(sink, html::ParseOpts::default(), context, Vec::new()).one(cleaned)
        }
    };

    if sink.node_limit_exceeded {
        return Err(SanitizeError::Parse(format!(
            "parse exceeded max_nodes ({})",
            options.max_nodes
        )));
    }

    let mut tree = sink.tree;
    if let Some(policy) = &options.sanitizer {
        crate::walker::sanitize(policy, &mut tree, tree.root);
    }
    Ok(tree)
}

/// Strips bytes that are neither HTML5 whitespace (tab, CR, LF, form feed), printable ASCII,
/// nor part of a multi-byte UTF-8 sequence. `text` is already known-valid UTF-8 (it is a
/// `&str`), so every non-ASCII `char` here is by construction a valid sequence and is passed
/// through unchanged; only stray ASCII control bytes are ever dropped.
fn preprocess(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        let keep = matches!(c, '\t' | '\r' | '\n' | '\u{000C}')
            || ('\u{0020}'..='\u{007E}').contains(&c)
            || (c as u32) >= 0x80;
        if keep {
            out.push(c);
        } else {
            tracing::warn!(codepoint = c as u32, "dropped disallowed byte during preprocessing");
        }
    }
    out
}

fn attr_namespace(name: &QualName) -> AttrNamespace {
    if name.ns == html5ever::ns!(xlink) {
        AttrNamespace::Xlink
    } else if name.ns == html5ever::ns!(xml) {
        AttrNamespace::Xml
    } else if name.ns == html5ever::ns!(xmlns) {
        AttrNamespace::Xmlns
    } else {
        AttrNamespace::None
    }
}

fn convert_attr(attr: Html5Attribute) -> Attribute {
    Attribute {
        namespace: attr_namespace(&attr.name),
        name: attr.name.local.as_ref().to_ascii_lowercase().into(),
        value: attr.value,
    }
}

/// The `TreeSink` implementation. `Self::Handle` and `Self::Output` are both [`NodeId`] / the
/// sink itself, so no conversion pass stands between the parser and this crate's arena.
struct Sink {
    tree: Tree,
    /// The original `html5ever::QualName` for every live element/template handle, so
    /// `elem_name` can hand back a borrowed `ExpandedName` the way `markup5ever::rcdom` does.
    names: std::collections::HashMap<NodeId, QualName>,
    max_nodes: usize,
    node_limit_exceeded: bool,
    quirks_mode: QuirksMode,
}

impl Sink {
    fn new(max_nodes: usize) -> Self {
        Sink {
            tree: Tree::new(),
            names: std::collections::HashMap::new(),
            max_nodes,
            node_limit_exceeded: false,
            quirks_mode: QuirksMode::NoQuirks,
        }
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        if self.tree.live_count() >= self.max_nodes {
            self.node_limit_exceeded = true;
        }
        self.tree.alloc(node)
    }

    fn leaf(kind: NodeKind) -> Node {
        Node {
            kind,
            parent: None,
            index_in_parent: 0,
            children: Vec::new(),
        }
    }
}

impl TreeSink for Sink {
    type Handle = NodeId;
    type Output = Sink;

    fn finish(self) -> Self::Output {
        self
    }

    fn parse_error(&mut self, msg: Cow<'static, str>) {
        tracing::trace!(message = %msg, "html5ever parse error");
    }

    fn set_quirks_mode(&mut self, mode: QuirksMode) {
        self.quirks_mode = mode;
    }

    fn get_document(&mut self) -> Self::Handle {
        self.tree.root
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> ExpandedName<'a> {
        self.names
            .get(target)
            .expect("elem_name called on a non-element handle")
            .expanded()
    }

    fn create_element(
        &mut self,
        name: QualName,
        html_attrs: Vec<Html5Attribute>,
        flags: Html5ElementFlags,
    ) -> Self::Handle {
        let tag = Tag::from_name(name.local.as_ref());
        let unknown_name: Box<str> = if tag == Tag::Unknown {
            name.local.as_ref().to_ascii_lowercase().into()
        } else {
            "".into()
        };
        let attrs: Vec<Attribute> = html_attrs.into_iter().map(convert_attr).collect();

        let id = if flags.template {
            let content = self.alloc(Sink::leaf(NodeKind::Document));
            self.alloc(Sink::leaf(NodeKind::Template { attrs, content }))
        } else {
            self.alloc(Sink::leaf(NodeKind::Element {
                tag,
                unknown_name,
                attrs,
            }))
        };
        self.names.insert(id, name);
        id
    }

    fn create_comment(&mut self, text: StrTendril) -> Self::Handle {
        self.alloc(Sink::leaf(NodeKind::Comment(text)))
    }

    fn create_pi(&mut self, target: StrTendril, data: StrTendril) -> Self::Handle {
        // HTML5 parsing never actually invokes this (processing instructions are only
        // meaningful for XML); a "bogus comment" is the closest faithful representation.
        let text = tendril::format_tendril!("{}{}{}", target, " ", data);
        self.alloc(Sink::leaf(NodeKind::Comment(text)))
    }

    fn append(&mut self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        match child {
            NodeOrText::AppendNode(id) => self.tree.append_child(*parent, id),
            NodeOrText::AppendText(text) => {
                let id = self.alloc(Sink::leaf(NodeKind::Text(text)));
                self.tree.append_child(*parent, id);
            }
        }
    }

    fn append_before_sibling(&mut self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        match new_node {
            NodeOrText::AppendNode(id) => self.tree.insert_before(*sibling, id),
            NodeOrText::AppendText(text) => {
                let id = self.alloc(Sink::leaf(NodeKind::Text(text)));
                self.tree.insert_before(*sibling, id);
            }
        }
    }

    fn append_based_on_parent_node(
        &mut self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        if self.tree.get(*element).parent().is_some() {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &mut self,
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    ) {
        self.tree.doctype = Some(Doctype {
            name: name.to_string().into_boxed_str(),
            public_id: public_id.to_string().into_boxed_str(),
            system_id: system_id.to_string().into_boxed_str(),
        });
    }

    fn get_template_contents(&mut self, target: &Self::Handle) -> Self::Handle {
        match self.tree.get(*target).kind() {
            NodeKind::Template { content, .. } => *content,
            _ => panic!("get_template_contents called on a non-template handle"),
        }
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        x == y
    }

    fn add_attrs_if_missing(&mut self, target: &Self::Handle, html_attrs: Vec<Html5Attribute>) {
        let Some(existing) = self.tree.get(*target).attrs() else {
            return;
        };
        let present: std::collections::HashSet<Box<str>> =
            existing.iter().map(|a| a.name.clone()).collect();
        let to_add: Vec<Attribute> = html_attrs
            .into_iter()
            .map(convert_attr)
            .filter(|a| !present.contains(&a.name))
            .collect();
        if let Some(attrs) = self.tree.get_mut(*target).attrs_mut() {
            attrs.extend(to_add);
        }
    }

    fn remove_from_parent(&mut self, target: &Self::Handle) {
        self.tree.detach(*target);
    }

    fn reparent_children(&mut self, node: &Self::Handle, new_parent: &Self::Handle) {
        self.tree.move_all_children(*node, *new_parent);
    }

    fn mark_script_already_started(&mut self, _node: &Self::Handle) {}

    fn set_current_line(&mut self, _line_number: u64) {}

    fn pop(&mut self, _node: &Self::Handle) {}
}
