//! `htmlshield` is a policy-driven HTML sanitization library. It parses untrusted HTML with
//! [html5ever] — the same engine browsers use — and walks the resulting tree under a
//! caller-supplied [`Policy`], removing or rewriting anything the policy doesn't explicitly
//! allow.
//!
//! Unlike a regex-based filter, this crate never operates on the raw text of the document: it
//! always parses first, so there's no syntactic trick (broken tags, encoded attributes, junk
//! bytes) that can smuggle disallowed markup past the sanitizer.
//!
//! # Examples
//!
//! ```
//! use htmlshield::{ElementFlag, Policy};
//!
//! let mut policy = Policy::new();
//! policy.set_flag("b", ElementFlag::Allow, true).unwrap();
//! policy.set_flag("p", ElementFlag::Allow, true).unwrap();
//!
//! let output = htmlshield::sanitize_html(
//!     "<p>hi<script>alert(1)</script> <b>there</b></p>",
//!     &policy,
//! )
//! .unwrap();
//! assert_eq!(output, "<p>hi <b>there</b></p>");
//! ```
//!
//! [html5ever]: https://github.com/servo/html5ever "The HTML parser in Servo"

mod buffer;
mod error;
mod parser;
mod policy;
mod serializer;
mod strset;
mod tags;
mod tree;
mod walker;

pub use error::SanitizeError;
pub use parser::ParseOptions;
pub use policy::{AttributeTarget, ElementFlag, ElementPolicy, Policy, Scheme, ANY_ATTRIBUTE};
pub use tree::NodeId;

use tree::Tree;

/// A parsed HTML document, ready to be sanitized (if it wasn't already, see
/// [`ParseOptions::sanitizer`]) and serialized.
///
/// Backed by an arena-based tree rather than a reference-counted node graph: every node is
/// addressed by a small integer handle, and the whole document is freed in one deallocation
/// when the `Document` is dropped.
pub struct Document {
    tree: Tree,
    allow_doctype: bool,
}

impl Document {
    /// Parses `text` as a complete HTML document (`<!DOCTYPE>`, `<html>`, `<head>`, `<body>`
    /// inferred per the HTML5 tree construction algorithm, same as a browser would).
    ///
    /// If `options.sanitizer` is set, the policy is applied immediately after parsing, before
    /// this function returns — so a returned `Document` is already safe to serialize and embed.
    ///
    /// # Examples
    ///
    /// ```
    /// use htmlshield::{Document, ParseOptions};
    /// let doc = Document::parse("<title>hi</title><p>x</p>", &ParseOptions::default()).unwrap();
    /// let html = doc.to_html();
    /// assert!(html.starts_with("<!DOCTYPE html>"));
    /// assert!(html.contains("<title>hi</title>"));
    /// assert!(html.contains("<p>x</p>"));
    /// ```
    pub fn parse(text: &str, options: &ParseOptions) -> Result<Document, SanitizeError> {
        Ok(Document {
            tree: parser::parse_document(text, options)?,
            allow_doctype: options.sanitizer.as_ref().map_or(true, Policy::allow_doctype),
        })
    }

    /// Parses `bytes` after validating them as UTF-8 (see [`SanitizeError::Encoding`]); every
    /// other entry point in this crate takes `&str`, which the type system already guarantees
    /// is valid UTF-8.
    pub fn parse_bytes(bytes: &[u8], options: &ParseOptions) -> Result<Document, SanitizeError> {
        Ok(Document {
            tree: parser::parse_document_bytes(bytes, options)?,
            allow_doctype: options.sanitizer.as_ref().map_or(true, Policy::allow_doctype),
        })
    }

    /// Sanitizes this document in place under `policy`. Idempotent: sanitizing an already-
    /// sanitized document under the same policy is a no-op.
    pub fn sanitize(&mut self, policy: &Policy) {
        let root = self.tree.root;
        walker::sanitize(policy, &mut self.tree, root);
        self.allow_doctype = policy.allow_doctype();
    }

    /// Serializes the document to an HTML string.
    ///
    /// A `<!DOCTYPE html>` is emitted for documents with no explicit doctype, unless the
    /// document has been sanitized (here or via `ParseOptions::sanitizer`) under a policy with
    /// [`Policy::set_allow_doctype`]`(false)`.
    pub fn to_html(&self) -> String {
        serializer::serialize_document_with(&self.tree, self.allow_doctype)
    }

    /// Writes the document's serialized HTML to `w`.
    pub fn write_to(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        w.write_all(self.to_html().as_bytes())
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document").field("html", &self.to_html()).finish()
    }
}

impl From<Document> for String {
    fn from(doc: Document) -> String {
        doc.to_html()
    }
}

/// A parsed HTML fragment: the result of parsing as if the input were the contents of a
/// `<div>`, with no inferred `<html>`/`<head>`/`<body>` wrapper. This is the shape most
/// callers want for sanitizing a comment body, a chat message, or any other snippet that will
/// be embedded into a larger page.
pub struct DocumentFragment {
    tree: Tree,
}

impl DocumentFragment {
    /// Parses `text` as an HTML fragment. See [`Document::parse`] for the `options.sanitizer`
    /// behavior.
    ///
    /// # Examples
    ///
    /// ```
    /// use htmlshield::{DocumentFragment, ParseOptions};
    /// let frag = DocumentFragment::parse("<b>hi</b>", &ParseOptions::default()).unwrap();
    /// assert_eq!(frag.to_html(), "<b>hi</b>");
    /// ```
    pub fn parse(text: &str, options: &ParseOptions) -> Result<DocumentFragment, SanitizeError> {
        Ok(DocumentFragment {
            tree: parser::parse_fragment(text, options)?,
        })
    }

    /// Sanitizes this fragment in place under `policy`.
    pub fn sanitize(&mut self, policy: &Policy) {
        let root = self.tree.root;
        walker::sanitize(policy, &mut self.tree, root);
    }

    /// Serializes the fragment's contents (no doctype, no wrapper element).
    pub fn to_html(&self) -> String {
        serializer::serialize_fragment(&self.tree, self.tree.root)
    }

    /// Writes the fragment's serialized HTML to `w`.
    pub fn write_to(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        w.write_all(self.to_html().as_bytes())
    }
}

impl std::fmt::Debug for DocumentFragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentFragment")
            .field("html", &self.to_html())
            .finish()
    }
}

impl From<DocumentFragment> for String {
    fn from(frag: DocumentFragment) -> String {
        frag.to_html()
    }
}

/// Serializes a [`Document`] or [`DocumentFragment`] without borrowing into either type's own
/// `to_html`/`write_to` methods directly — useful when code is generic over "anything this
/// crate can turn back into HTML".
pub struct Serializer<'a>(SerializerTarget<'a>);

enum SerializerTarget<'a> {
    Document(&'a Document),
    Fragment(&'a DocumentFragment),
}

impl<'a> Serializer<'a> {
    /// Builds a serializer over a full [`Document`].
    pub fn new(document: &'a Document) -> Self {
        Serializer(SerializerTarget::Document(document))
    }

    /// Builds a serializer over a [`DocumentFragment`].
    pub fn new_fragment(fragment: &'a DocumentFragment) -> Self {
        Serializer(SerializerTarget::Fragment(fragment))
    }

    /// Serializes to an HTML string.
    pub fn to_html(&self) -> String {
        match &self.0 {
            SerializerTarget::Document(doc) => doc.to_html(),
            SerializerTarget::Fragment(frag) => frag.to_html(),
        }
    }

    /// Writes the serialized HTML to `w`.
    pub fn write_to(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        w.write_all(self.to_html().as_bytes())
    }
}

/// Parses `input` as an HTML fragment, sanitizes it under `policy`, and serializes the
/// result — the common case, in the spirit of the teacher crate's top-level `clean()`
/// convenience function.
///
/// # Examples
///
/// ```
/// use htmlshield::{ElementFlag, Policy};
/// let mut policy = Policy::new();
/// policy.set_flag("b", ElementFlag::Allow, true).unwrap();
/// let output = htmlshield::sanitize_html("<b>hi</b><script>x</script>", &policy).unwrap();
/// assert_eq!(output, "<b>hi</b>");
/// ```
pub fn sanitize_html(input: &str, policy: &Policy) -> Result<String, SanitizeError> {
    let options = ParseOptions {
        sanitizer: Some(policy.clone()),
        ..ParseOptions::default()
    };
    Ok(DocumentFragment::parse(input, &options)?.to_html())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permissive_policy() -> Policy {
        let mut policy = Policy::new();
        policy.set_all_flags(ElementFlag::Allow, true);
        policy
    }

    #[test]
    fn sanitize_html_strips_disallowed_tags() {
        let mut policy = Policy::new();
        policy.set_flag("p", ElementFlag::Allow, true).unwrap();
        let out = sanitize_html("<p>a<script>alert(1)</script>b</p>", &policy).unwrap();
        assert_eq!(out, "<p>ab</p>");
    }

    #[test]
    fn document_roundtrips_through_full_parse() {
        let doc = Document::parse("<p>x</p>", &ParseOptions::default()).unwrap();
        assert!(doc.to_html().contains("<html>"));
        assert!(doc.to_html().contains("<p>x</p>"));
    }

    #[test]
    fn fragment_parse_and_sanitize_are_composable() {
        let mut frag =
            DocumentFragment::parse("<p>x</p><script>y</script>", &ParseOptions::default())
                .unwrap();
        frag.sanitize(&permissive_policy());
        assert!(frag.to_html().contains("<p>x</p>"));
    }

    #[test]
    fn debug_impl_shows_serialized_html() {
        let frag = DocumentFragment::parse("<i>z</i>", &ParseOptions::default()).unwrap();
        assert_eq!(format!("{:?}", frag), "DocumentFragment { html: \"<i>z</i>\" }");
    }

    #[test]
    fn parse_bytes_accepts_valid_utf8() {
        let doc = Document::parse_bytes("<p>x</p>".as_bytes(), &ParseOptions::default()).unwrap();
        assert!(doc.to_html().contains("<p>x</p>"));
    }

    #[test]
    fn parse_bytes_rejects_invalid_utf8() {
        let err = Document::parse_bytes(&[0xff, 0xfe, 0x00], &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, SanitizeError::Encoding(_)));
    }

    #[test]
    fn serializer_wraps_document_and_fragment_identically_to_their_own_to_html() {
        let doc = Document::parse("<p>x</p>", &ParseOptions::default()).unwrap();
        assert_eq!(Serializer::new(&doc).to_html(), doc.to_html());

        let frag = DocumentFragment::parse("<p>x</p>", &ParseOptions::default()).unwrap();
        assert_eq!(Serializer::new_fragment(&frag).to_html(), frag.to_html());
    }

    #[test]
    fn sanitized_document_honors_allow_doctype_false() {
        let mut policy = permissive_policy();
        policy.set_allow_doctype(false);
        let options = ParseOptions {
            sanitizer: Some(policy),
            ..ParseOptions::default()
        };
        let doc = Document::parse("<p>x</p>", &options).unwrap();
        assert!(!doc.to_html().starts_with("<!DOCTYPE"));
    }
}
