//! Pass 4: List flattening.

use crate::collect::{CommentPart, Step};
use crate::dom::predicates::{is_inline_node, is_list_container_tag, is_list_item_tag};
use crate::dom::{Attr, ContentDom, NodeId, NodeRole, RoleMap, WRAPPER_CLASS};

use super::NormalizeScope;

/// Replace transparent list wrappers with their real content, and rewrap a
/// whole-comment ordered list.
///
/// A captured list or item whose text equals the concatenated text of its
/// block-level descendants (whitespace aside) adds no content of its own:
/// it is replaced by those descendants, recursing through uniform nested
/// wrappers. Special case: a single `ol` wrapping an entire comment with no
/// foreign signature inside is enumeration markup used for layout; it is
/// rewrapped as a generic block, or a `dl`/`dd` pair when the list is
/// acting as indentation inside a thread.
pub fn flatten_lists(
    dom: &mut ContentDom,
    roles: &mut RoleMap,
    scope: &NormalizeScope<'_>,
    parts: &mut Vec<CommentPart>,
) {
    if rewrap_whole_comment_ol(dom, roles, scope, parts) {
        return;
    }

    let mut idx = 0;
    while idx < parts.len() {
        let node = parts[idx].node;
        let is_list_shape = dom
            .tag(node)
            .is_some_and(|t| is_list_container_tag(t) || is_list_item_tag(t));
        if !is_list_shape {
            idx += 1;
            continue;
        }

        let mut replacements = Vec::new();
        flatten_into(dom, node, &mut replacements);
        if replacements.len() == 1 && replacements[0] == node {
            idx += 1;
            continue;
        }

        // The tree is left alone: the part list now points at the wrapper's
        // real content, which is what placement and levels should see.
        let template = parts[idx].clone();
        let new_parts: Vec<CommentPart> = replacements
            .iter()
            .map(|&r| CommentPart {
                node: r,
                step: Step::Replaced,
                is_text: false,
                is_heading: false,
                has_own_signature: template.has_own_signature,
                has_foreign_content: false,
            })
            .collect();
        let added = new_parts.len();
        parts.splice(idx..=idx, new_parts);
        idx += added;
    }
}

/// Recursively resolve a node to its replacement set. A node whose text is
/// exactly its block descendants' text dissolves into them; anything else
/// represents itself.
fn flatten_into(dom: &ContentDom, node: NodeId, out: &mut Vec<NodeId>) {
    let blocks = block_children(dom, node);
    if blocks.is_empty() || !text_matches(dom, node, &blocks) {
        out.push(node);
        return;
    }
    for block in blocks {
        flatten_into(dom, block, out);
    }
}

/// Maximal block-level element descendants: direct children, looking
/// through nothing.
fn block_children(dom: &ContentDom, node: NodeId) -> Vec<NodeId> {
    dom.children(node)
        .filter(|&c| dom.is_element(c) && !is_inline_node(dom, c))
        .collect()
}

/// The wrapper adds no text of its own.
fn text_matches(dom: &ContentDom, node: NodeId, blocks: &[NodeId]) -> bool {
    let whole: String = dom
        .text_content(node)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let parts: String = blocks
        .iter()
        .flat_map(|&b| dom.text_content(b).chars().collect::<Vec<_>>())
        .filter(|c| !c.is_whitespace())
        .collect();
    whole == parts
}

/// The whole-comment `ol` special case. Returns true when it applied.
fn rewrap_whole_comment_ol(
    dom: &mut ContentDom,
    roles: &mut RoleMap,
    scope: &NormalizeScope<'_>,
    parts: &mut Vec<CommentPart>,
) -> bool {
    if parts.len() != 1 {
        return false;
    }
    let ol = parts[0].node;
    if dom.tag(ol) != Some("ol") {
        return false;
    }
    let has_foreign_signature = dom.descendants(ol).any(|d| {
        roles.is(d, NodeRole::SignatureMarker)
            && scope.owners.get(&d) != Some(&scope.own)
    });
    if has_foreign_signature {
        return false;
    }
    let items: Vec<NodeId> = dom
        .children(ol)
        .filter(|&c| dom.tag(c) == Some("li"))
        .collect();
    if items.len() != 1 {
        return false;
    }
    let item = items[0];

    // Enumeration used as indentation becomes a description-list pair;
    // a top-level enumeration becomes a plain block.
    let indented = dom
        .ancestors(ol)
        .iter()
        .any(|&a| dom.tag(a).is_some_and(is_list_item_tag));

    let wrapper_class = Attr {
        name: "class".to_string(),
        value: WRAPPER_CLASS.to_string(),
    };
    let (outer, inner) = if indented {
        let dl = dom.create_element("dl", vec![wrapper_class]);
        let dd = dom.create_element("dd", vec![]);
        dom.append(dl, dd);
        (dl, dd)
    } else {
        let div = dom.create_element("div", vec![wrapper_class]);
        (div, div)
    };

    let children: Vec<NodeId> = dom.children(item).collect();
    for child in children {
        dom.detach(child);
        dom.append(inner, child);
    }
    dom.insert_before(ol, outer);
    dom.detach(ol);
    roles.set(outer, NodeRole::Wrapper);

    parts[0] = CommentPart {
        node: outer,
        step: Step::Replaced,
        is_text: false,
        is_heading: false,
        has_own_signature: parts[0].has_own_signature,
        has_foreign_content: false,
    };
    true
}
