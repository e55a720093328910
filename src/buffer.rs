//! A growable output buffer for the serializer, and the HTML escaping tables it (and
//! attribute-value rewriting) share.

/// Which HTML context a string is being written into, which determines whether `"` needs
/// escaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeContext {
    /// Element text content: `&`, `<`, `>` are escaped; `"` passes through verbatim.
    Text,
    /// A quoted attribute value: `&`, `<`, `>`, and `"` are all escaped.
    Attribute,
}

const fn build_escape_table() -> [Option<&'static str>; 256] {
    let mut table = [None; 256];
    table[b'"' as usize] = Some("&quot;");
    table[b'&' as usize] = Some("&amp;");
    table[b'<' as usize] = Some("&lt;");
    table[b'>' as usize] = Some("&gt;");
    table
}

static ESCAPE_TABLE: [Option<&'static str>; 256] = build_escape_table();

/// A growable string buffer that accumulates serialized HTML.
///
/// Backed by a plain `String`: the input text itself already arrives as
/// `tendril::StrTendril` from the parser (see [`crate::tree::NodeKind`]), so the only place
/// that needs a mutable, growable accumulator is the serializer's output side.
#[derive(Debug, Default)]
pub struct Buffer(String);

impl Buffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Buffer(String::new())
    }

    /// Creates an empty buffer with at least `capacity` bytes of headroom.
    pub fn with_capacity(capacity: usize) -> Self {
        Buffer(String::with_capacity(capacity))
    }

    /// Appends raw text with no escaping (used for whitespace-wrap nodes, raw-text element
    /// contents, and markup punctuation the serializer itself emits).
    pub fn push_raw(&mut self, s: &str) {
        self.0.push_str(s);
    }

    /// Appends a single raw byte-sized ASCII character with no escaping.
    pub fn push_char(&mut self, c: char) {
        self.0.push(c);
    }

    /// Appends `s`, escaping it for `context`. Runs of bytes that need no escaping are
    /// copied in one `push_str` rather than byte-by-byte.
    pub fn push_escaped(&mut self, s: &str, context: EscapeContext) {
        let bytes = s.as_bytes();
        let mut start = 0;
        for (i, &b) in bytes.iter().enumerate() {
            let replacement = match ESCAPE_TABLE[b as usize] {
                Some(r) if b != b'"' || context == EscapeContext::Attribute => r,
                _ => continue,
            };
            if start < i {
                // SAFETY: `start..i` is a byte range between two points that were both
                // found by scanning `bytes` at ASCII-only positions, so it can't split a
                // multi-byte UTF-8 sequence.
                self.0.push_str(&s[start..i]);
            }
            self.0.push_str(replacement);
            start = i + 1;
        }
        if start < bytes.len() {
            self.0.push_str(&s[start..]);
        }
    }

    /// Consumes the buffer, returning the accumulated `String`.
    pub fn into_string(self) -> String {
        self.0
    }

    /// Borrows the accumulated contents so far.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Extracts the scheme token from an attribute value for protocol-allow-list checks
/// (SPEC_FULL.md §4.2 step 2): strips leading ASCII whitespace, then scans forward to the
/// first of `/`, `:`, `#`, or end-of-string.
///
/// Returns the normalized (whitespace-stripped) value and the scheme token: `"/"` or `"#"`
/// for the corresponding relative sentinels, or the lowercased text before a `:`.
pub fn extract_scheme(value: &str) -> (String, SchemeToken) {
    let trimmed = value.trim_start_matches(|c: char| c.is_ascii_whitespace());
    let stop = trimmed
        .find(|c: char| c == '/' || c == ':' || c == '#')
        .unwrap_or(trimmed.len());
    let token = match trimmed.as_bytes().get(stop) {
        None | Some(b'/') => SchemeToken::Relative,
        Some(b'#') => SchemeToken::Fragment,
        Some(b':') => SchemeToken::Named(trimmed[..stop].to_ascii_lowercase()),
        _ => unreachable!(),
    };
    (trimmed.to_string(), token)
}

/// The classification of an attribute value's leading scheme, per SPEC_FULL.md §4.2 step 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemeToken {
    /// The value has no scheme and is not fragment-only: a path-relative URL.
    Relative,
    /// The value starts with `#`: a fragment-only URL.
    Fragment,
    /// A named scheme, already lowercased, found before the first `:`.
    Named(String),
}

impl SchemeToken {
    /// The allow-set token this scheme checks against: `/`, `#`, or the named scheme.
    pub fn as_set_token(&self) -> &str {
        match self {
            SchemeToken::Relative => "/",
            SchemeToken::Fragment => "#",
            SchemeToken::Named(name) => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_text_context_but_passes_quotes() {
        let mut buf = Buffer::new();
        buf.push_escaped("1 < 2 & \"ok\"", EscapeContext::Text);
        assert_eq!(buf.into_string(), "1 &lt; 2 &amp; \"ok\"");
    }

    #[test]
    fn escapes_attribute_context_including_quotes() {
        let mut buf = Buffer::new();
        buf.push_escaped("1 < 2 & \"ok\"", EscapeContext::Attribute);
        assert_eq!(buf.into_string(), "1 &lt; 2 &amp; &quot;ok&quot;");
    }

    #[test]
    fn copies_unescapable_runs_in_bulk() {
        let mut buf = Buffer::new();
        buf.push_escaped("plain text, no escapes needed", EscapeContext::Text);
        assert_eq!(buf.into_string(), "plain text, no escapes needed");
    }

    #[test]
    fn extract_scheme_absolute_url() {
        let (value, token) = extract_scheme("  HTTPS://example.com");
        assert_eq!(value, "HTTPS://example.com");
        assert_eq!(token, SchemeToken::Named("https".into()));
    }

    #[test]
    fn extract_scheme_relative_path() {
        let (_, token) = extract_scheme("/x");
        assert_eq!(token, SchemeToken::Relative);
    }

    #[test]
    fn extract_scheme_fragment() {
        let (_, token) = extract_scheme("#section");
        assert_eq!(token, SchemeToken::Fragment);
    }

    #[test]
    fn extract_scheme_bare_word_is_relative() {
        let (_, token) = extract_scheme("test");
        assert_eq!(token, SchemeToken::Relative);
    }

    #[test]
    fn extract_scheme_javascript_is_named() {
        let (_, token) = extract_scheme("javascript:alert(1)");
        assert_eq!(token, SchemeToken::Named("javascript".into()));
    }
}
