//! The error surface shared by policy configuration and document parsing.

use std::str::Utf8Error;

/// Everything that can go wrong while configuring a [`Policy`](crate::policy::Policy) or
/// running a document through [`Document::parse`](crate::Document::parse).
///
/// Sanitizing an already-parsed tree never fails: malformed or adversarial nodes are
/// silently removed, which is the entire point of the walker. Only configuration and
/// parsing are fallible.
#[derive(Debug, thiserror::Error)]
pub enum SanitizeError {
    /// A caller-supplied tag name does not map to any tag in the known-tag enumeration.
    #[error("unknown tag `{0}`")]
    UnknownTag(String),

    /// The input bytes were not valid UTF-8.
    #[error("input is not valid UTF-8: {0}")]
    Encoding(#[from] Utf8Error),

    /// A caller supplied a value of the wrong shape, such as an empty attribute name.
    #[error("invalid value: {0}")]
    TypeError(String),

    /// The HTML5 parser reported a failure, or a resource bound
    /// (`ParseOptions::max_input_bytes` / `max_nodes`) was exceeded.
    #[error("parse failed: {0}")]
    Parse(String),
}
