//! The sanitization walker: the core decision engine. Recursively (in the sense of "tree
//! shaped", not "native call stack" — see SPEC_FULL.md §5/§9) descends the tree, mutating it
//! in place.

use std::collections::HashMap;

use crate::buffer::{extract_scheme, SchemeToken};
use crate::policy::{ElementFlags, Policy};
use crate::tags::Tag;
use crate::tree::{AttrNamespace, Node, NodeId, NodeKind, Tree};

/// Sanitizes `tree` in place under `policy`, starting from `root` (normally `tree.root`, or
/// the root of a `<template>` content fragment when called recursively).
///
/// Implemented as an explicit work-stack traversal rather than native recursion, so that an
/// adversarially deep document cannot overflow the native call stack (SPEC_FULL.md §5).
pub fn sanitize(policy: &Policy, tree: &mut Tree, root: NodeId) {
    let allowed_tags = crate::tags::ALL_TAGS
        .iter()
        .filter(|&&tag| policy.flags(tag).contains(ElementFlags::ALLOW))
        .count();
    tracing::debug!(
        allowed_tags,
        global_attrs = policy.global_attr_allowed().len(),
        "starting sanitize pass"
    );

    let mut depth: HashMap<Tag, u32> = HashMap::new();
    let mut stack: Vec<Frame> = vec![Frame::Walk {
        parent: root,
        index: 0,
    }];

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Leave { tag } => {
                decrement_depth(&mut depth, tag);
            }
            Frame::Walk { parent, index } => {
                walk_one_step(policy, tree, parent, index, &mut depth, &mut stack);
            }
        }
    }
}

enum Frame {
    /// Resume walking `parent`'s children starting at `index`.
    Walk { parent: NodeId, index: usize },
    /// Decrement the depth counter for `tag` once the subtree pushed alongside this frame
    /// has been fully walked.
    Leave { tag: Tag },
}

fn depth_of(depth: &HashMap<Tag, u32>, tag: Tag) -> u32 {
    depth.get(&tag).copied().unwrap_or(0)
}

fn increment_depth(depth: &mut HashMap<Tag, u32>, tag: Tag) {
    *depth.entry(tag).or_insert(0) += 1;
}

fn decrement_depth(depth: &mut HashMap<Tag, u32>, tag: Tag) {
    if let Some(count) = depth.get_mut(&tag) {
        *count -= 1;
        if *count == 0 {
            depth.remove(&tag);
        }
    }
}

/// Processes children of `parent` starting at `index`, pushing follow-up [`Frame`]s back
/// onto `stack` instead of recursing natively. Each call either fully drains `parent`'s
/// children (no element children left to descend into) or pushes exactly one descent plus a
/// resume frame and returns, so the outer loop in [`sanitize`] drives it to completion.
fn walk_one_step(
    policy: &Policy,
    tree: &mut Tree,
    parent: NodeId,
    mut index: usize,
    depth: &mut HashMap<Tag, u32>,
    stack: &mut Vec<Frame>,
) {
    loop {
        if index >= tree.get(parent).children().len() {
            return;
        }
        let child = tree.get(parent).children()[index];

        if let Some(tag) = element_tag(tree.get(child)) {
            if let Some(element_policy) = policy.element_policy(tag) {
                if element_policy.max_nested > 0 && depth_of(depth, tag) >= element_policy.max_nested
                {
                    tracing::trace!(tag = tag.as_str(), "removed: nesting limit exceeded");
                    remove_child_with_policy(tree, parent, index, policy.flags(tag));
                    continue;
                }
            }
        }

        if try_remove_child(policy, tree, parent, index) {
            continue;
        }

        if let Some(tag) = element_tag(tree.get(child)) {
            increment_depth(depth, tag);
            let descend_into = match tree.get(child).kind() {
                NodeKind::Template { content, .. } => *content,
                _ => child,
            };
            stack.push(Frame::Walk {
                parent,
                index: index + 1,
            });
            stack.push(Frame::Leave { tag });
            stack.push(Frame::Walk {
                parent: descend_into,
                index: 0,
            });
            return;
        }

        index += 1;
    }
}

fn element_tag(node: &Node) -> Option<Tag> {
    node.tag()
}

/// Decides whether `parent`'s child at `index` should be removed, mutating attributes and
/// children in place along the way. Returns `true` if the child was removed (so the caller
/// should re-examine the same index rather than advancing).
fn try_remove_child(policy: &Policy, tree: &mut Tree, parent: NodeId, index: usize) -> bool {
    let child = tree.get(parent).children()[index];
    match tree.get(child).kind() {
        NodeKind::Comment(_) => {
            if !policy.allow_comments() {
                tree.remove_child_at(parent, index, false);
                true
            } else {
                false
            }
        }
        NodeKind::Element { .. } | NodeKind::Template { .. } => {
            let tag = tree.get(child).tag().expect("matched an element/template node");
            sanitize_iframe_contents(tree, child, policy);

            let allowed = policy.flags(tag).contains(ElementFlags::ALLOW);
            let keep = allowed && sanitize_attributes(policy, tree, child, tag);

            if keep {
                return false;
            }

            tracing::trace!(tag = tag.as_str(), "removed: disallowed or missing required attr");
            if matches!(tag, Tag::Script | Tag::Style | Tag::Math | Tag::Svg) {
                clear_children(tree, child);
            }
            remove_child_with_policy(tree, parent, index, policy.flags(tag));
            true
        }
        _ => false,
    }
}

/// `<iframe>` fallback content is untrusted HTML and is cleared wholesale when the iframe
/// itself is kept (SPEC_FULL.md §4.2 step 3; resolves Open Question 1 in DESIGN.md).
fn sanitize_iframe_contents(tree: &mut Tree, child: NodeId, policy: &Policy) {
    if tree.get(child).tag() != Some(Tag::Iframe) {
        return;
    }
    if !policy.flags(Tag::Iframe).contains(ElementFlags::ALLOW) {
        return;
    }
    clear_children(tree, child);
}

fn clear_children(tree: &mut Tree, node: NodeId) {
    while !tree.get(node).children().is_empty() {
        tree.remove_child_at(node, 0, false);
    }
}

/// Removes `parent`'s child at `index`, honoring `flags` to decide between hard removal
/// (`REMOVE_CONTENTS`) and unwrap.
fn remove_child_with_policy(tree: &mut Tree, parent: NodeId, index: usize, flags: ElementFlags) {
    let wrap = flags.contains(ElementFlags::WRAP_WHITESPACE);
    if flags.contains(ElementFlags::REMOVE_CONTENTS) {
        tree.remove_child_at(parent, index, wrap);
    } else {
        let child = tree.get(parent).children()[index];
        tree.reparent_children_at(parent, child, index, wrap);
    }
}

/// Scrubs `element`'s attributes in place, returning `false` if a required attribute is
/// missing (in which case the element itself must be removed).
fn sanitize_attributes(policy: &Policy, tree: &mut Tree, element: NodeId, tag: Tag) -> bool {
    let element_policy = policy.element_policy(tag);

    let mut index = 0;
    loop {
        let attrs_len = tree.get(element).attrs().map(<[_]>::len).unwrap_or(0);
        if index >= attrs_len {
            break;
        }
        if should_keep_attribute(policy, element_policy, tree, element, index) {
            index += 1;
        } else {
            remove_attr_at(tree, element, index);
        }
    }

    coerce_meta_charset(tree, element, tag);

    enforce_required_attribute(element_policy, tree, element)
}

fn remove_attr_at(tree: &mut Tree, element: NodeId, index: usize) {
    if let Some(attrs) = tree.get_mut(element).attrs_mut() {
        attrs.remove(index);
    }
}

fn attr_name_at(tree: &Tree, element: NodeId, index: usize) -> Box<str> {
    tree.get(element).attrs().expect("element has attrs")[index]
        .name
        .clone()
}

fn should_keep_attribute(
    policy: &Policy,
    element_policy: Option<&crate::policy::ElementPolicy>,
    tree: &mut Tree,
    element: NodeId,
    index: usize,
) -> bool {
    let name = attr_name_at(tree, element, index);

    let globally_allowed = policy.global_attr_allowed().contains(&name);
    let element_allowed = element_policy
        .map(|p| p.attr_allowed().contains(&name))
        .unwrap_or(false);
    if !globally_allowed && !element_allowed {
        return false;
    }

    if let Some(proto) = element_policy.and_then(|p| p.protocol_policy(&name)) {
        let value = tree.get(element).attrs().expect("element has attrs")[index]
            .value
            .to_string();
        let (normalized, token) = extract_scheme(&value);
        tree.get_mut(element).attrs_mut().expect("element has attrs")[index].value =
            normalized.into();
        if !proto.allows(token.as_set_token()) {
            return false;
        }
    }

    if &*name == "class" {
        return sanitize_class_attribute(policy, element_policy, tree, element, index);
    }

    true
}

/// Applies CSS class-token filtering in place to the attribute at `index` (assumed to be
/// `class`). Returns `false` (remove the attribute entirely) if no token survives.
fn sanitize_class_attribute(
    policy: &Policy,
    element_policy: Option<&crate::policy::ElementPolicy>,
    tree: &mut Tree,
    element: NodeId,
    index: usize,
) -> bool {
    let global_set = policy.global_class_allowed();
    let element_set = element_policy.map(|p| p.class_allowed());

    let global_empty = global_set.is_empty();
    let element_empty = element_set.map(|s| s.is_empty()).unwrap_or(true);
    if global_empty && element_empty {
        return true;
    }

    let value = tree.get(element).attrs().expect("element has attrs")[index]
        .value
        .to_string();

    let kept: Vec<&str> = value
        .split(|c: char| c.is_ascii_whitespace())
        .filter(|token| !token.is_empty())
        .filter(|token| {
            global_set.contains(token) || element_set.map(|s| s.contains(token)).unwrap_or(false)
        })
        .collect();

    if kept.is_empty() {
        return false;
    }

    let rebuilt = kept.join(" ");
    tree.get_mut(element).attrs_mut().expect("element has attrs")[index].value = rebuilt.into();
    true
}

fn coerce_meta_charset(tree: &mut Tree, element: NodeId, tag: Tag) {
    if tag != Tag::Meta {
        return;
    }
    if let Some(attrs) = tree.get_mut(element).attrs_mut() {
        for attr in attrs.iter_mut() {
            if &*attr.name == "charset" && &*attr.value != "utf-8" {
                attr.value = "utf-8".into();
            }
        }
    }
}

fn enforce_required_attribute(
    element_policy: Option<&crate::policy::ElementPolicy>,
    tree: &Tree,
    element: NodeId,
) -> bool {
    let Some(element_policy) = element_policy else {
        return true;
    };
    if element_policy.attr_required().is_empty() {
        return true;
    }
    let Some(attrs) = tree.get(element).attrs() else {
        return true;
    };
    if element_policy.attr_required().contains(crate::policy::ANY_ATTRIBUTE) {
        return !attrs.is_empty();
    }
    attrs
        .iter()
        .any(|attr| element_policy.attr_required().contains(&attr.name))
}

#[allow(dead_code)]
fn namespace_is_none(ns: AttrNamespace) -> bool {
    matches!(ns, AttrNamespace::None)
}
