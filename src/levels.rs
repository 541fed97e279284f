//! Reply levels.
//!
//! A comment's level is the count of list-container ancestors between its
//! outermost body node and the page root. Renderers split one logical
//! indentation list into several adjacent containers (an intervening image
//! is enough), so a whole-tree repair pass coalesces `list + list` siblings
//! of identical tag first, translating `dd`/`li` items when an indentation
//! list crosses a `ul`/`dl` boundary. Resolved depths are cached per
//! container for the rest of the pass.

use std::collections::HashMap;

use crate::dom::predicates::{is_list_container, is_list_container_tag};
use crate::dom::{ContentDom, NodeData, NodeId};

/// Coalesce adjacent sibling list containers across the whole tree. Run
/// once per pass, before any level is computed.
pub fn repair_lists(dom: &mut ContentDom) {
    let root = dom.root();
    fuse_recursive(dom, root);
}

fn fuse_recursive(dom: &mut ContentDom, parent: NodeId) {
    // Children first, so nested lists are already coalesced when their
    // parents are examined.
    let children: Vec<NodeId> = dom.children(parent).collect();
    for child in children {
        fuse_recursive(dom, child);
    }
    fuse_siblings(dom, parent);
}

fn fuse_siblings(dom: &mut ContentDom, parent: NodeId) {
    let mut cursor = dom.get(parent).map(|n| n.first_child).unwrap_or(NodeId::NONE);

    while cursor.is_some() {
        if is_list_container(dom, cursor) {
            while let Some((right, lone_image)) = fusable_follower(dom, cursor) {
                if let Some(image) = lone_image {
                    tuck_into_last_item(dom, cursor, image);
                }
                fuse_pair(dom, cursor, right);
            }
        }
        cursor = dom.get(cursor).map(|n| n.next_sibling).unwrap_or(NodeId::NONE);
    }
}

/// The next list container this one can absorb: the following sibling
/// (whitespace text aside), optionally with a single intervening image that
/// split the list in the first place.
fn fusable_follower(dom: &ContentDom, left: NodeId) -> Option<(NodeId, Option<NodeId>)> {
    let left_tag = dom.tag(left)?.to_string();

    let mut probe = next_non_blank(dom, left);
    let mut lone_image = None;
    if dom.tag(probe) == Some("img") {
        lone_image = Some(probe);
        probe = next_non_blank(dom, probe);
    }

    let right_tag = dom.tag(probe)?;
    if !compatible_lists(&left_tag, right_tag) {
        return None;
    }
    Some((probe, lone_image))
}

fn next_non_blank(dom: &ContentDom, from: NodeId) -> NodeId {
    let mut cursor = dom.get(from).map(|n| n.next_sibling).unwrap_or(NodeId::NONE);
    while cursor.is_some() && dom.text(cursor).is_some_and(|t| t.trim().is_empty()) {
        cursor = dom.get(cursor).map(|n| n.next_sibling).unwrap_or(NodeId::NONE);
    }
    cursor
}

/// Identical tags always fuse. `ul` and `dl` are both indentation carriers
/// in rendered threads, so they fuse across the boundary (items are
/// retagged); `ol` keeps enumeration semantics and only fuses with itself.
fn compatible_lists(left: &str, right: &str) -> bool {
    if !is_list_container_tag(left) || !is_list_container_tag(right) {
        return false;
    }
    left == right || matches!((left, right), ("ul", "dl") | ("dl", "ul"))
}

fn tuck_into_last_item(dom: &mut ContentDom, list: NodeId, image: NodeId) {
    let last_item = dom.get(list).map(|n| n.last_child).unwrap_or(NodeId::NONE);
    dom.detach(image);
    if last_item.is_some() {
        dom.append(last_item, image);
    } else {
        dom.append(list, image);
    }
}

/// Move every child of `right` to the end of `left`, retagging items that
/// cross the `ul`/`dl` boundary, then drop the emptied container.
fn fuse_pair(dom: &mut ContentDom, left: NodeId, right: NodeId) {
    let item_tag = match dom.tag(left) {
        Some("dl") => Some("dd"),
        Some("ul") | Some("ol") => Some("li"),
        _ => None,
    };

    let children: Vec<NodeId> = dom.children(right).collect();
    for child in children {
        if let Some(target) = item_tag
            && let Some(node) = dom.get_mut(child)
            && let NodeData::Element { tag, .. } = &mut node.data
            && matches!(tag.as_str(), "li" | "dd")
            && tag != target
        {
            *tag = target.to_string();
        }
        dom.detach(child);
        dom.append(left, child);
    }
    dom.detach(right);
}

/// Per-pass cache of resolved container depths. Reset with every pass;
/// stale entries would survive tree repairs and corrupt levels.
#[derive(Debug, Default)]
pub struct LevelCache {
    depths: HashMap<NodeId, u32>,
}

impl LevelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Depth of a list container: one more than its nearest list-container
    /// ancestor's depth.
    fn container_depth(&mut self, dom: &ContentDom, container: NodeId) -> u32 {
        if let Some(&depth) = self.depths.get(&container) {
            return depth;
        }
        let parent_depth = nearest_list_ancestor(dom, container)
            .map(|a| self.container_depth(dom, a))
            .unwrap_or(0);
        let depth = parent_depth + 1;
        self.depths.insert(container, depth);
        depth
    }

    /// Level of a comment whose outermost body node is `node`.
    pub fn level_of(&mut self, dom: &ContentDom, node: NodeId) -> u32 {
        nearest_list_ancestor(dom, node)
            .map(|a| self.container_depth(dom, a))
            .unwrap_or(0)
    }
}

fn nearest_list_ancestor(dom: &ContentDom, node: NodeId) -> Option<NodeId> {
    dom.ancestors(node)
        .into_iter()
        .find(|&a| is_list_container(dom, a))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacent_same_tag_lists_fused() {
        let mut dom = ContentDom::new();
        let root = dom.root();
        let ul1 = dom.create_element("ul", vec![]);
        dom.append(root, ul1);
        let li1 = dom.create_element("li", vec![]);
        dom.append(ul1, li1);
        let ul2 = dom.create_element("ul", vec![]);
        dom.append(root, ul2);
        let li2 = dom.create_element("li", vec![]);
        dom.append(ul2, li2);

        repair_lists(&mut dom);

        let lists: Vec<_> = dom
            .children(root)
            .filter(|&c| dom.tag(c) == Some("ul"))
            .collect();
        assert_eq!(lists.len(), 1);
        let items: Vec<_> = dom.children(lists[0]).collect();
        assert_eq!(items, vec![li1, li2]);
    }

    #[test]
    fn ul_dl_fused_with_item_translation() {
        let mut dom = ContentDom::new();
        let root = dom.root();
        let dl = dom.create_element("dl", vec![]);
        dom.append(root, dl);
        let dd = dom.create_element("dd", vec![]);
        dom.append(dl, dd);
        let ul = dom.create_element("ul", vec![]);
        dom.append(root, ul);
        let li = dom.create_element("li", vec![]);
        dom.append(ul, li);

        repair_lists(&mut dom);

        let children: Vec<_> = dom.children(root).collect();
        assert_eq!(children, vec![dl]);
        let tags: Vec<_> = dom
            .children(dl)
            .filter_map(|c| dom.tag(c).map(str::to_string))
            .collect();
        assert_eq!(tags, vec!["dd", "dd"]);
    }

    #[test]
    fn intervening_image_tucked_and_fused() {
        let mut dom = ContentDom::new();
        let root = dom.root();
        let ul1 = dom.create_element("ul", vec![]);
        dom.append(root, ul1);
        let li1 = dom.create_element("li", vec![]);
        dom.append(ul1, li1);
        let img = dom.create_element("img", vec![]);
        dom.append(root, img);
        let ul2 = dom.create_element("ul", vec![]);
        dom.append(root, ul2);
        let li2 = dom.create_element("li", vec![]);
        dom.append(ul2, li2);

        repair_lists(&mut dom);

        let top: Vec<_> = dom.children(root).collect();
        assert_eq!(top.len(), 1);
        // The image landed inside the first item.
        assert!(dom.children(li1).any(|c| c == img));
        let items: Vec<_> = dom.children(top[0]).collect();
        assert_eq!(items, vec![li1, li2]);
    }

    #[test]
    fn ol_not_fused_across_kinds() {
        let mut dom = ContentDom::new();
        let root = dom.root();
        let ol = dom.create_element("ol", vec![]);
        dom.append(root, ol);
        let ul = dom.create_element("ul", vec![]);
        dom.append(root, ul);

        repair_lists(&mut dom);
        assert_eq!(dom.children(root).count(), 2);
    }

    #[test]
    fn levels_from_list_ancestry() {
        let mut dom = ContentDom::new();
        let root = dom.root();
        let p = dom.create_element("p", vec![]);
        dom.append(root, p);
        let ul = dom.create_element("ul", vec![]);
        dom.append(root, ul);
        let li = dom.create_element("li", vec![]);
        dom.append(ul, li);
        let dl = dom.create_element("dl", vec![]);
        dom.append(li, dl);
        let dd = dom.create_element("dd", vec![]);
        dom.append(dl, dd);

        let mut cache = LevelCache::new();
        assert_eq!(cache.level_of(&dom, p), 0);
        assert_eq!(cache.level_of(&dom, li), 1);
        assert_eq!(cache.level_of(&dom, dd), 2);
        // Cached lookups agree.
        assert_eq!(cache.level_of(&dom, dd), 2);
    }
}
