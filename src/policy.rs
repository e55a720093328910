//! The in-memory representation of a sanitization configuration: per-tag flags, global and
//! per-element allowed attributes/classes, per-(element, attribute) allowed URL protocols,
//! nesting limits, and comment/doctype toggles.

use std::collections::HashMap;

use bitflags::bitflags;

use crate::error::SanitizeError;
use crate::strset::StringSet;
use crate::tags::{Tag, ALL_TAGS};

bitflags! {
    /// Per-tag behavior bits. See the flag semantics table in SPEC_FULL.md §6.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ElementFlags: u8 {
        /// The element survives; without this bit, it is removed (and either unwrapped or,
        /// with `REMOVE_CONTENTS`, dropped entirely with its children).
        const ALLOW = 0b001;
        /// On removal, the element's children are discarded along with it. Without this
        /// bit, removal unwraps: the children replace the element in its parent.
        const REMOVE_CONTENTS = 0b010;
        /// On removal, a single-space text node is inserted in the element's former slot,
        /// to prevent adjacent text from coalescing into one word.
        const WRAP_WHITESPACE = 0b100;
    }
}

/// A single named flag, for use with [`Policy::set_flag`] / [`Policy::set_all_flags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementFlag {
    /// See [`ElementFlags::ALLOW`].
    Allow,
    /// See [`ElementFlags::REMOVE_CONTENTS`].
    RemoveContents,
    /// See [`ElementFlags::WRAP_WHITESPACE`].
    WrapWhitespace,
}

impl From<ElementFlag> for ElementFlags {
    fn from(flag: ElementFlag) -> Self {
        match flag {
            ElementFlag::Allow => ElementFlags::ALLOW,
            ElementFlag::RemoveContents => ElementFlags::REMOVE_CONTENTS,
            ElementFlag::WrapWhitespace => ElementFlags::WRAP_WHITESPACE,
        }
    }
}

/// A scheme accepted by a [`ProtocolPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme<'a> {
    /// A named scheme, e.g. `"https"` or `"mailto"`. Always compared lowercase.
    Named(&'a str),
    /// The relative-URL sentinel: adds both `/` (path-relative) and `#` (fragment-only).
    Relative,
}

/// The set of URL schemes allowed for one (element, attribute) pair, e.g. `a:href`.
#[derive(Debug, Clone, Default)]
pub struct ProtocolPolicy {
    allowed: StringSet,
}

impl ProtocolPolicy {
    fn new() -> Self {
        ProtocolPolicy::default()
    }

    fn apply(&mut self, schemes: &[Scheme<'_>]) {
        for scheme in schemes {
            match scheme {
                Scheme::Named(name) => {
                    self.allowed.insert(&name.to_ascii_lowercase());
                }
                Scheme::Relative => {
                    self.allowed.insert("/");
                    self.allowed.insert("#");
                }
            }
        }
    }

    /// Whether `token` (already lowercased for named schemes, or the literal `/`/`#`
    /// sentinel) is permitted.
    pub fn allows(&self, token: &str) -> bool {
        self.allowed.contains(token)
    }
}

/// The target of an attribute/class allow-list edit: a specific element, or every element.
#[derive(Debug, Clone, Copy)]
pub enum AttributeTarget<'a> {
    /// A specific tag, by its lowercased name.
    Element(&'a str),
    /// Every known element.
    All,
}

/// Required-attribute sentinel meaning "any non-empty attribute set satisfies this element".
pub const ANY_ATTRIBUTE: &str = "*";

/// Per-element sanitization rules layered on top of a [`Policy`]'s global rules.
#[derive(Debug, Clone, Default)]
pub struct ElementPolicy {
    /// Maximum nesting depth for this tag (0 = unlimited).
    pub max_nested: u32,
    attr_allowed: StringSet,
    attr_required: StringSet,
    class_allowed: StringSet,
    protocols: HashMap<Box<str>, ProtocolPolicy>,
}

impl ElementPolicy {
    /// Attribute names this element additionally allows, beyond the policy's globals.
    pub fn attr_allowed(&self) -> &StringSet {
        &self.attr_allowed
    }

    /// Attribute names of which at least one must be present (or `*` for "any attribute").
    pub fn attr_required(&self) -> &StringSet {
        &self.attr_required
    }

    /// CSS class tokens this element additionally allows, beyond the policy's globals.
    pub fn class_allowed(&self) -> &StringSet {
        &self.class_allowed
    }

    /// The [`ProtocolPolicy`] registered for `attr_name`, if any.
    pub fn protocol_policy(&self, attr_name: &str) -> Option<&ProtocolPolicy> {
        self.protocols.get(attr_name)
    }
}

/// A complete sanitization configuration.
///
/// A `Policy` is immutable once handed to [`sanitize`](crate::walker::sanitize): it is read
/// by value (`&Policy`) during a sanitize run and may be shared across any number of
/// concurrent runs on disjoint documents, since it borrows nothing and sanitizing never
/// mutates it.
#[derive(Debug, Clone)]
pub struct Policy {
    flags: HashMap<Tag, ElementFlags>,
    attr_allowed: StringSet,
    class_allowed: StringSet,
    element_sanitizers: HashMap<Tag, ElementPolicy>,
    allow_comments: bool,
    allow_doctype: bool,
}

impl Default for Policy {
    /// The all-disallowed, no-comments, no-doctype configuration: every known tag starts
    /// with an empty flag set (removed, unwrapped, no whitespace guard), matching a
    /// maximally conservative starting point that callers layer allow-rules onto.
    fn default() -> Self {
        let mut flags = HashMap::with_capacity(ALL_TAGS.len());
        for tag in ALL_TAGS {
            flags.insert(tag, ElementFlags::empty());
        }
        Policy {
            flags,
            attr_allowed: StringSet::new(),
            class_allowed: StringSet::new(),
            element_sanitizers: HashMap::new(),
            allow_comments: false,
            allow_doctype: false,
        }
    }
}

impl Policy {
    /// Creates a policy that disallows everything: no tags, no attributes, no comments.
    /// Callers build up an allow-list from here with the `set_*` methods.
    pub fn new() -> Self {
        Policy::default()
    }

    fn lookup_tag(name: &str) -> Result<Tag, SanitizeError> {
        let tag = Tag::from_name(name);
        if tag == Tag::Unknown {
            Err(SanitizeError::UnknownTag(name.to_string()))
        } else {
            Ok(tag)
        }
    }

    /// This tag's current flags, or an empty set if unrecognized (should not happen for
    /// tags validated through `lookup_tag`, but `Tag::Unknown` has no flags entry).
    pub fn flags(&self, tag: Tag) -> ElementFlags {
        self.flags.get(&tag).copied().unwrap_or_else(ElementFlags::empty)
    }

    /// The [`ElementPolicy`] registered for `tag`, if any `set_allowed_*`/`set_max_nested`
    /// call has configured one.
    pub fn element_policy(&self, tag: Tag) -> Option<&ElementPolicy> {
        self.element_sanitizers.get(&tag)
    }

    /// Attribute names allowed on every element, regardless of tag.
    pub fn global_attr_allowed(&self) -> &StringSet {
        &self.attr_allowed
    }

    /// CSS class tokens allowed on every element, regardless of tag.
    pub fn global_class_allowed(&self) -> &StringSet {
        &self.class_allowed
    }

    /// Whether comments survive sanitization.
    pub fn allow_comments(&self) -> bool {
        self.allow_comments
    }

    /// Whether a `<!DOCTYPE html>` is emitted for documents with no explicit doctype.
    pub fn allow_doctype(&self) -> bool {
        self.allow_doctype
    }

    fn element_policy_mut(&mut self, tag: Tag) -> &mut ElementPolicy {
        self.element_sanitizers.entry(tag).or_default()
    }

    /// Sets or clears one [`ElementFlag`] on `element_name`.
    pub fn set_flag(
        &mut self,
        element_name: &str,
        flag: ElementFlag,
        value: bool,
    ) -> Result<(), SanitizeError> {
        let tag = Self::lookup_tag(element_name)?;
        let bit: ElementFlags = flag.into();
        let entry = self.flags.entry(tag).or_insert_with(ElementFlags::empty);
        entry.set(bit, value);
        Ok(())
    }

    /// Sets or clears one [`ElementFlag`] on every known tag.
    pub fn set_all_flags(&mut self, flag: ElementFlag, value: bool) {
        let bit: ElementFlags = flag.into();
        for tag in ALL_TAGS {
            let entry = self.flags.entry(tag).or_insert_with(ElementFlags::empty);
            entry.set(bit, value);
        }
    }

    /// Sets whether comments survive sanitization.
    pub fn set_allow_comments(&mut self, value: bool) {
        self.allow_comments = value;
    }

    /// Sets whether a `<!DOCTYPE html>` is emitted for documents with no explicit doctype.
    pub fn set_allow_doctype(&mut self, value: bool) {
        self.allow_doctype = value;
    }

    /// Allows or disallows `attr_name` on `target` (a specific element, or every element).
    pub fn set_allowed_attribute(
        &mut self,
        target: AttributeTarget<'_>,
        attr_name: &str,
        value: bool,
    ) -> Result<(), SanitizeError> {
        if attr_name.is_empty() {
            return Err(SanitizeError::TypeError(
                "attribute name must not be empty".into(),
            ));
        }
        match target {
            AttributeTarget::All => {
                if value {
                    self.attr_allowed.insert(attr_name);
                } else {
                    self.attr_allowed.remove(attr_name);
                }
            }
            AttributeTarget::Element(name) => {
                let tag = Self::lookup_tag(name)?;
                let policy = self.element_policy_mut(tag);
                if value {
                    policy.attr_allowed.insert(attr_name);
                } else {
                    policy.attr_allowed.remove(attr_name);
                }
            }
        }
        Ok(())
    }

    /// Marks `attr_name` (or the `*` sentinel) as required on `element_name`: at least one
    /// required name must be present, or if `*` is listed, the element simply must carry at
    /// least one attribute.
    pub fn set_required_attribute(
        &mut self,
        element_name: &str,
        attr_name: &str,
        value: bool,
    ) -> Result<(), SanitizeError> {
        let tag = Self::lookup_tag(element_name)?;
        let policy = self.element_policy_mut(tag);
        if value {
            policy.attr_required.insert(attr_name);
        } else {
            policy.attr_required.remove(attr_name);
        }
        Ok(())
    }

    /// Allows or disallows `class_token` on `target` (a specific element, or every
    /// element).
    pub fn set_allowed_class(
        &mut self,
        target: AttributeTarget<'_>,
        class_token: &str,
        value: bool,
    ) -> Result<(), SanitizeError> {
        if class_token.is_empty() {
            return Err(SanitizeError::TypeError(
                "class token must not be empty".into(),
            ));
        }
        match target {
            AttributeTarget::All => {
                if value {
                    self.class_allowed.insert(class_token);
                } else {
                    self.class_allowed.remove(class_token);
                }
            }
            AttributeTarget::Element(name) => {
                let tag = Self::lookup_tag(name)?;
                let policy = self.element_policy_mut(tag);
                if value {
                    policy.class_allowed.insert(class_token);
                } else {
                    policy.class_allowed.remove(class_token);
                }
            }
        }
        Ok(())
    }

    /// Sets the URL schemes allowed on `element_name`'s `attr_name` attribute (e.g. `a`'s
    /// `href`), replacing any previously configured set.
    pub fn set_allowed_protocols(
        &mut self,
        element_name: &str,
        attr_name: &str,
        schemes: &[Scheme<'_>],
    ) -> Result<(), SanitizeError> {
        if attr_name.is_empty() {
            return Err(SanitizeError::TypeError(
                "attribute name must not be empty".into(),
            ));
        }
        let tag = Self::lookup_tag(element_name)?;
        let policy = self.element_policy_mut(tag);
        let mut proto = ProtocolPolicy::new();
        proto.apply(schemes);
        policy.protocols.insert(attr_name.into(), proto);
        Ok(())
    }

    /// Sets the nesting-depth limit for `element_name` (0 = unlimited).
    pub fn set_max_nested(&mut self, element_name: &str, limit: u32) -> Result<(), SanitizeError> {
        let tag = Self::lookup_tag(element_name)?;
        self.element_policy_mut(tag).max_nested = limit;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tag_is_rejected() {
        let mut policy = Policy::new();
        let err = policy
            .set_flag("not-a-real-tag", ElementFlag::Allow, true)
            .unwrap_err();
        assert!(matches!(err, SanitizeError::UnknownTag(name) if name == "not-a-real-tag"));
    }

    #[test]
    fn set_all_flags_skips_unknown_sentinel() {
        let mut policy = Policy::new();
        policy.set_all_flags(ElementFlag::Allow, true);
        assert!(policy.flags(Tag::Div).contains(ElementFlags::ALLOW));
        assert!(policy.flags(Tag::Unknown).is_empty());
    }

    #[test]
    fn protocols_accept_relative_sentinel() {
        let mut policy = Policy::new();
        policy
            .set_allowed_protocols("a", "href", &[Scheme::Relative])
            .unwrap();
        let proto = policy
            .element_policy(Tag::A)
            .unwrap()
            .protocol_policy("href")
            .unwrap();
        assert!(proto.allows("/"));
        assert!(proto.allows("#"));
        assert!(!proto.allows("https"));
    }

    #[test]
    fn protocol_schemes_are_lowercased() {
        let mut policy = Policy::new();
        policy
            .set_allowed_protocols("a", "href", &[Scheme::Named("HTTPS")])
            .unwrap();
        let proto = policy
            .element_policy(Tag::A)
            .unwrap()
            .protocol_policy("href")
            .unwrap();
        assert!(proto.allows("https"));
    }

    #[test]
    fn default_policy_disallows_every_tag() {
        let policy = Policy::default();
        for tag in ALL_TAGS {
            assert!(!policy.flags(tag).contains(ElementFlags::ALLOW));
        }
    }
}
