//! Comment boundary collection.
//!
//! Given one resolved signature, walk the tree to gather the full extent of
//! the comment's body as a list of parts, terminating at the first
//! unambiguous foreign-content boundary. The walk is an explicit state
//! machine over step kinds, hard-bounded so that malformed trees degrade to
//! one skipped comment rather than a hung pass.

use std::collections::HashSet;

use crate::config::PageConfig;
use crate::dom::predicates::{
    is_heading, is_inline_node, is_list_container, is_list_container_tag, is_list_item_tag,
    is_strikethrough_tag,
};
use crate::dom::{ContentDom, NodeId, NodeRole, RoleMap};
use crate::signature::Signature;

/// How a part was reached during collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The signature itself, or trailing inline content captured with it.
    Start,
    /// Previous sibling.
    Back,
    /// Parent, after siblings were exhausted.
    Up,
    /// Last non-inline child of a part that had foreign content.
    Dive,
    /// Synthetic node the normalizer substituted for earlier parts.
    Replaced,
}

/// One node gathered while walking a comment's extent.
#[derive(Debug, Clone)]
pub struct CommentPart {
    pub node: NodeId,
    pub step: Step,
    pub is_text: bool,
    pub is_heading: bool,
    /// The part's subtree contains this comment's own signature.
    pub has_own_signature: bool,
    /// The part's subtree contains content belonging elsewhere.
    pub has_foreign_content: bool,
}

/// Hard bound on collection iterations. Hitting it means a malformed or
/// adversarial tree; the comment is abandoned and reported.
pub const WALK_BUDGET: usize = 500;

/// Returned when the walk budget is exhausted.
#[derive(Debug)]
pub struct WalkExhausted;

/// Context shared by the boundary checks.
pub struct BoundaryScope<'a> {
    pub dom: &'a ContentDom,
    pub config: &'a PageConfig,
    pub roles: &'a RoleMap,
    /// Marker node to signature index, for every signature on the page.
    pub owners: &'a std::collections::HashMap<NodeId, usize>,
    /// Index of the signature being collected.
    pub own: usize,
}

impl<'a> BoundaryScope<'a> {
    /// Markers belonging to this comment (primary plus merged extras).
    fn is_own_marker(&self, node: NodeId) -> bool {
        self.owners.get(&node) == Some(&self.own)
    }

    fn subtree_contains_own_signature(&self, node: NodeId) -> bool {
        self.dom
            .descendants(node)
            .any(|d| self.roles.is(d, NodeRole::SignatureMarker) && self.is_own_marker(d))
    }

    /// A node is foreign in itself: it carries a foreign marker class, is a
    /// cell of a multi-signature table, is the table of contents, an
    /// outdent marker, a talk-page message box (namespace-gated, and never
    /// when reached by climbing out of it), another comment's signature, or
    /// matches the configured custom predicate.
    fn node_is_foreign(&self, node: NodeId, step: Step) -> bool {
        let dom = self.dom;
        let Some(tag) = dom.tag(node) else {
            return false;
        };
        let classes = dom.classes(node);

        if classes
            .iter()
            .any(|c| self.config.foreign_marker_classes.contains(c))
        {
            return true;
        }
        if let Some(outdent) = &self.config.outdent_marker_class
            && classes.iter().any(|c| c == outdent)
        {
            return true;
        }
        if classes.iter().any(|c| *c == self.config.toc_class)
            || dom.attr(node, "id") == Some(self.config.toc_class.as_str())
        {
            return true;
        }
        if matches!(tag, "td" | "th") && self.in_multi_signature_table(node) {
            return true;
        }
        if step != Step::Up
            && self
                .config
                .message_box_namespaces
                .contains(&self.config.namespace)
            && classes
                .iter()
                .any(|c| self.config.message_box_classes.contains(c))
        {
            return true;
        }
        if self.roles.is(node, NodeRole::SignatureMarker) && !self.is_own_marker(node) {
            return true;
        }
        // A struck run holding a sign-off is a retracted comment fragment,
        // not body content.
        if is_strikethrough_tag(tag)
            && self
                .dom
                .descendants(node)
                .any(|d| self.roles.get(d).is_some())
        {
            return true;
        }
        if let Some(pred) = &self.config.custom_foreign_predicate
            && pred(dom, node)
        {
            return true;
        }
        false
    }

    /// A table with signatures in more than one place is a structured
    /// discussion artifact, not a comment container.
    fn in_multi_signature_table(&self, cell: NodeId) -> bool {
        let mut table = NodeId::NONE;
        for ancestor in self.dom.ancestors(cell) {
            if self.dom.tag(ancestor) == Some("table") {
                table = ancestor;
                break;
            }
        }
        if table.is_none() {
            return false;
        }
        let count = self
            .dom
            .descendants(table)
            .filter(|&d| self.roles.is(d, NodeRole::SignatureMarker))
            .count();
        count >= 2
    }

    fn subtree_has_foreign(&self, node: NodeId) -> bool {
        self.dom
            .descendants(node)
            .filter(|&d| d != node)
            .any(|d| self.node_is_foreign(d, Step::Dive))
    }

    /// Introductory lists lead a section in; they never belong to the first
    /// reply below them.
    pub fn is_intro_list(&self, node: NodeId) -> bool {
        is_intro_list(self.dom, node)
    }

    /// Vote-list bound: a plain list container whose first item holds the
    /// signature marks the start of the comment; escaping it would swallow
    /// the proposal text above.
    fn is_vote_list_boundary(&self, node: NodeId) -> bool {
        let Some(tag) = self.dom.tag(node) else {
            return false;
        };
        let qualifies = match tag {
            "ol" | "ul" => true,
            // A bare description list is ordinary reply indentation; only a
            // nested one bounds a vote.
            "dl" => self
                .dom
                .ancestors(node)
                .iter()
                .any(|&a| self.dom.tag(a).is_some_and(is_list_container_tag)),
            _ => false,
        };
        if !qualifies {
            return false;
        }
        // One item is indentation or numbering, not a vote list.
        let items: Vec<NodeId> = self
            .dom
            .children(node)
            .filter(|&c| self.dom.is_element(c))
            .collect();
        match items.first() {
            Some(&first) if items.len() >= 2 => self.subtree_contains_own_signature(first),
            _ => false,
        }
    }

    fn make_part(&self, node: NodeId, step: Step) -> CommentPart {
        let is_text = self.dom.is_text(node);
        let has_own =
            (!is_text && self.subtree_contains_own_signature(node)) || self.is_own_marker(node);
        CommentPart {
            node,
            step,
            is_text,
            is_heading: is_heading(self.dom, node),
            has_own_signature: has_own,
            has_foreign_content: !is_text
                && (self.subtree_has_foreign(node)
                    || (step == Step::Up && self.node_is_foreign(node, Step::Up))),
        }
    }
}

/// An introductory list: a list container whose preceding sibling is a
/// heading, whose first item is a definition term, or which is a gallery.
/// These lead a section in and never belong to the first reply below them.
pub fn is_intro_list(dom: &ContentDom, node: NodeId) -> bool {
    if !is_list_container(dom, node) {
        return false;
    }
    if dom.has_class(node, "gallery") {
        return true;
    }
    if let Some(first) = dom.children(node).find(|&c| dom.is_element(c))
        && dom.tag(first) == Some("dt")
    {
        return true;
    }
    let mut prev = dom.get(node).map(|n| n.prev_sibling).unwrap_or(NodeId::NONE);
    while prev.is_some() && dom.text(prev).is_some_and(|t| t.trim().is_empty()) {
        prev = dom.get(prev).map(|n| n.prev_sibling).unwrap_or(NodeId::NONE);
    }
    prev.is_some() && is_heading(dom, prev)
}

/// Collect the parts of one comment, in reverse document order (nearest to
/// the signature first). The caller re-sorts to document order after
/// normalization.
pub fn collect_parts(
    scope: &BoundaryScope<'_>,
    sig: &Signature,
) -> Result<Vec<CommentPart>, WalkExhausted> {
    let dom = scope.dom;
    let mut parts: Vec<CommentPart> = Vec::new();

    // Trailing inline content on the signature's own line.
    let trailing = collect_trailing(scope, sig.marker);
    for &node in trailing.iter().rev() {
        let mut part = scope.make_part(node, Step::Start);
        part.has_foreign_content = false;
        parts.push(part);
    }
    parts.push(scope.make_part(sig.marker, Step::Start));

    let mut visited: HashSet<NodeId> = parts.iter().map(|p| p.node).collect();
    let mut iterations = 0usize;

    loop {
        iterations += 1;
        if iterations > WALK_BUDGET {
            return Err(WalkExhausted);
        }

        let last = parts.last().expect("parts start non-empty");
        let last_node = last.node;

        let (node, step) = if last.has_foreign_content && !last.has_own_signature {
            // Recover genuine comment content nested alongside foreign
            // content by descending into the last block-level child.
            let dive_target = dom
                .children(last.node)
                .filter(|&c| dom.is_element(c) && !is_inline_node(dom, c))
                .last();
            match dive_target {
                Some(child) => (child, Step::Dive),
                None => break,
            }
        } else {
            let current = match dom.get(last.node) {
                Some(n) => n,
                None => break,
            };
            if current.prev_sibling.is_some() {
                (current.prev_sibling, Step::Back)
            } else if current.parent.is_some()
                && dom
                    .get(current.parent)
                    .is_some_and(|p| !matches!(p.data, crate::dom::NodeData::Document))
                && !matches!(dom.tag(current.parent), Some("body") | Some("html"))
            {
                (current.parent, Step::Up)
            } else {
                break;
            }
        };

        if visited.contains(&node) {
            break;
        }
        visited.insert(node);

        // Comments never span headings.
        if is_heading(dom, node) {
            parts.push(scope.make_part(node, step));
            break;
        }

        // Intro-list boundary: never capture the list itself or an item of
        // it reached sideways. Climbing up into one is allowed only when
        // the comment's item is all the list holds (then the list IS the
        // comment, not a section lead-in).
        if step == Step::Back && scope.is_intro_list(node) {
            break;
        }
        if step == Step::Up && scope.is_intro_list(node) {
            let came_from = last_node;
            let has_other_content = dom
                .children(node)
                .filter(|&c| dom.is_element(c))
                .any(|c| c != came_from);
            if has_other_content {
                break;
            }
        }
        if step == Step::Back
            && dom.tag(node).is_some_and(is_list_item_tag)
            && dom
                .get(node)
                .map(|n| n.parent)
                .is_some_and(|p| scope.is_intro_list(p))
        {
            break;
        }

        if matches!(step, Step::Back | Step::Up) && scope.is_vote_list_boundary(node) {
            break;
        }

        if step != Step::Up && scope.node_is_foreign(node, step) {
            let mut part = scope.make_part(node, step);
            part.has_foreign_content = true;
            parts.push(part);
            break;
        }

        parts.push(scope.make_part(node, step));
    }

    Ok(parts)
}

/// Inline content following the signature, up to the first block, foreign
/// node, or marker belonging to another comment.
fn collect_trailing(scope: &BoundaryScope<'_>, marker: NodeId) -> Vec<NodeId> {
    let dom = scope.dom;
    let mut out = Vec::new();
    let mut cursor = marker;
    loop {
        let next = match dom.get(cursor) {
            Some(n) => n.next_sibling,
            None => break,
        };
        if next.is_none() || !is_inline_node(dom, next) {
            break;
        }
        if scope.node_is_foreign(next, Step::Back) {
            break;
        }
        let contains_marker = dom
            .descendants(next)
            .any(|d| scope.roles.get(d).is_some() && !scope.is_own_marker(d));
        if contains_marker {
            break;
        }
        out.push(next);
        cursor = next;
    }
    out
}
