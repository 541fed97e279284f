//! Arena-based content tree.
//!
//! The parser operates on an arena-allocated tree of elements and text
//! leaves. All nodes live in a contiguous vector; parent/child/sibling links
//! are indices into it, which keeps traversal cache-friendly and makes the
//! in-place mutations the pipeline performs (splitting text leaves, wrapping
//! sibling runs) cheap pointer surgery.

use std::collections::HashMap;

/// Unique identifier for a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel value for no node.
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check if this is a valid node ID.
    pub fn is_some(&self) -> bool {
        self.0 != u32::MAX
    }

    /// Check if this is the sentinel value.
    pub fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }
}

/// Node payload.
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Document root.
    Document,
    /// Element with lowercase tag name, class list, and remaining attributes.
    Element {
        tag: String,
        classes: Vec<String>,
        attrs: Vec<Attr>,
    },
    /// Text leaf.
    Text(String),
    /// Markup comment. Ignored by every stage, kept so ingestion is lossless.
    Comment(String),
}

/// Element attribute.
#[derive(Debug, Clone)]
pub struct Attr {
    pub name: String,
    pub value: String,
}

/// A node in the content tree.
#[derive(Debug)]
pub struct ContentNode {
    pub data: NodeData,
    pub parent: NodeId,
    pub first_child: NodeId,
    pub last_child: NodeId,
    pub prev_sibling: NodeId,
    pub next_sibling: NodeId,
}

impl ContentNode {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
        }
    }
}

/// Arena content tree.
pub struct ContentDom {
    nodes: Vec<ContentNode>,
    root: NodeId,
}

impl ContentDom {
    /// Create a new empty tree with a document root.
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            root: NodeId::NONE,
        };
        dom.root = dom.alloc(ContentNode::new(NodeData::Document));
        dom
    }

    fn alloc(&mut self, node: ContentNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Get the document root ID.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get a node by ID.
    pub fn get(&self, id: NodeId) -> Option<&ContentNode> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    /// Get a mutable node by ID.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut ContentNode> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    /// Create a new element node. The tag is lowercased; `class` attributes
    /// are pre-split for fast membership checks.
    pub fn create_element(&mut self, tag: &str, attrs: Vec<Attr>) -> NodeId {
        let mut classes = Vec::new();
        let mut rest = Vec::new();
        for attr in attrs {
            if attr.name == "class" {
                classes = attr
                    .value
                    .split_whitespace()
                    .map(|s| s.to_string())
                    .collect();
            } else {
                rest.push(attr);
            }
        }
        self.alloc(ContentNode::new(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            classes,
            attrs: rest,
        }))
    }

    /// Create a new text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(ContentNode::new(NodeData::Text(text.into())))
    }

    /// Create a markup comment node.
    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(ContentNode::new(NodeData::Comment(text.into())))
    }

    /// Append a child to a parent node.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        let last_child = self.get(parent).map(|n| n.last_child).unwrap_or(NodeId::NONE);

        if let Some(child_node) = self.get_mut(child) {
            child_node.parent = parent;
            child_node.prev_sibling = last_child;
            child_node.next_sibling = NodeId::NONE;
        }

        if last_child.is_some() {
            if let Some(last_node) = self.get_mut(last_child) {
                last_node.next_sibling = child;
            }
        }

        if let Some(parent_node) = self.get_mut(parent) {
            if parent_node.first_child.is_none() {
                parent_node.first_child = child;
            }
            parent_node.last_child = child;
        }
    }

    /// Insert a node before a sibling.
    pub fn insert_before(&mut self, sibling: NodeId, new_node: NodeId) {
        let (parent, prev) = self
            .get(sibling)
            .map(|n| (n.parent, n.prev_sibling))
            .unwrap_or((NodeId::NONE, NodeId::NONE));

        if let Some(new) = self.get_mut(new_node) {
            new.parent = parent;
            new.prev_sibling = prev;
            new.next_sibling = sibling;
        }

        if let Some(sib) = self.get_mut(sibling) {
            sib.prev_sibling = new_node;
        }

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = new_node;
            }
        } else if let Some(par) = self.get_mut(parent) {
            par.first_child = new_node;
        }
    }

    /// Detach a node from its parent and sibling chain. The node itself (and
    /// its subtree) stays alive in the arena and can be re-inserted.
    pub fn detach(&mut self, id: NodeId) {
        let (parent, prev, next) = match self.get(id) {
            Some(n) => (n.parent, n.prev_sibling, n.next_sibling),
            None => return,
        };

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = next;
            }
        } else if parent.is_some() {
            if let Some(p) = self.get_mut(parent) {
                p.first_child = next;
            }
        }

        if next.is_some() {
            if let Some(n) = self.get_mut(next) {
                n.prev_sibling = prev;
            }
        } else if parent.is_some() {
            if let Some(p) = self.get_mut(parent) {
                p.last_child = prev;
            }
        }

        if let Some(node) = self.get_mut(id) {
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
        }
    }

    /// Wrap the contiguous sibling range `first..=last` (document order,
    /// same parent) in `wrapper`. The wrapper takes the range's place in the
    /// sibling chain.
    pub fn wrap_siblings(&mut self, first: NodeId, last: NodeId, wrapper: NodeId) {
        debug_assert_eq!(
            self.get(first).map(|n| n.parent),
            self.get(last).map(|n| n.parent)
        );
        self.insert_before(first, wrapper);
        let mut cursor = first;
        while cursor.is_some() {
            let next = self.get(cursor).map(|n| n.next_sibling).unwrap_or(NodeId::NONE);
            self.detach(cursor);
            self.append(wrapper, cursor);
            if cursor == last {
                break;
            }
            cursor = next;
        }
    }

    /// Number of nodes ever allocated (detached nodes included).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree is empty (only the document root).
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Iterate over children of a node.
    pub fn children(&self, parent: NodeId) -> ChildrenIter<'_> {
        let first = self.get(parent).map(|n| n.first_child).unwrap_or(NodeId::NONE);
        ChildrenIter { dom: self, current: first }
    }

    /// Iterate over the subtree rooted at `root` in document order,
    /// including `root` itself.
    pub fn descendants(&self, root: NodeId) -> DescendantsIter<'_> {
        DescendantsIter { dom: self, root, current: root, done: false }
    }
}

impl Default for ContentDom {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over children of a node.
pub struct ChildrenIter<'a> {
    dom: &'a ContentDom,
    current: NodeId,
}

impl<'a> Iterator for ChildrenIter<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_none() {
            return None;
        }
        let id = self.current;
        self.current = self.dom.get(id).map(|n| n.next_sibling).unwrap_or(NodeId::NONE);
        Some(id)
    }
}

/// Document-order subtree iterator.
pub struct DescendantsIter<'a> {
    dom: &'a ContentDom,
    root: NodeId,
    current: NodeId,
    done: bool,
}

impl<'a> Iterator for DescendantsIter<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.current.is_none() {
            return None;
        }
        let id = self.current;

        // Descend first, then advance through siblings, climbing back up
        // until the subtree root is reached again.
        let node = self.dom.get(id)?;
        if node.first_child.is_some() {
            self.current = node.first_child;
        } else {
            let mut cursor = id;
            loop {
                if cursor == self.root {
                    self.done = true;
                    break;
                }
                let n = match self.dom.get(cursor) {
                    Some(n) => n,
                    None => {
                        self.done = true;
                        break;
                    }
                };
                if n.next_sibling.is_some() {
                    self.current = n.next_sibling;
                    break;
                }
                cursor = n.parent;
                if cursor.is_none() {
                    self.done = true;
                    break;
                }
            }
        }
        Some(id)
    }
}

/// Element/text accessors.
impl ContentDom {
    /// Get an element's lowercase tag name.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { tag, .. } => Some(tag.as_str()),
            _ => None,
        })
    }

    /// Get an element's classes.
    pub fn classes(&self, id: NodeId) -> &[String] {
        static EMPTY: &[String] = &[];
        self.get(id)
            .and_then(|n| match &n.data {
                NodeData::Element { classes, .. } => Some(classes.as_slice()),
                _ => None,
            })
            .unwrap_or(EMPTY)
    }

    /// Check if an element carries the given class.
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.classes(id).iter().any(|c| c == class)
    }

    /// Get an attribute value.
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|a| a.name == name)
                .map(|a| a.value.as_str()),
            _ => None,
        })
    }

    /// Check if node is an element.
    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.data, NodeData::Element { .. }))
    }

    /// Check if node is a text leaf.
    pub fn is_text(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| matches!(n.data, NodeData::Text(_)))
    }

    /// Get the string content of a text leaf.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Concatenated text of the subtree rooted at `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for n in self.descendants(id) {
            if let Some(t) = self.text(n) {
                out.push_str(t);
            }
        }
        out
    }

    /// Check whether `ancestor` is `node` or one of its ancestors.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = node;
        while cursor.is_some() {
            if cursor == ancestor {
                return true;
            }
            cursor = self.get(cursor).map(|n| n.parent).unwrap_or(NodeId::NONE);
        }
        false
    }

    /// Ancestors of `id`, nearest first, root last.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.get(id).map(|n| n.parent).unwrap_or(NodeId::NONE);
        while cursor.is_some() {
            out.push(cursor);
            cursor = self.get(cursor).map(|n| n.parent).unwrap_or(NodeId::NONE);
        }
        out
    }

    /// The ancestor-or-self of `node` whose parent is `parent`, if any.
    pub fn ancestor_with_parent(&self, node: NodeId, parent: NodeId) -> Option<NodeId> {
        let mut cursor = node;
        while cursor.is_some() {
            let p = self.get(cursor)?.parent;
            if p == parent {
                return Some(cursor);
            }
            cursor = p;
        }
        None
    }

    /// Compare two nodes in document order. Returns `true` when `a` starts
    /// before `b`. An ancestor starts before its descendants.
    pub fn is_before(&self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return false;
        }
        let mut path_a = self.ancestors(a);
        path_a.reverse();
        path_a.push(a);
        let mut path_b = self.ancestors(b);
        path_b.reverse();
        path_b.push(b);

        let common = path_a.iter().zip(&path_b).take_while(|(x, y)| x == y).count();
        if common == path_a.len() {
            // a is an ancestor of b
            return true;
        }
        if common == path_b.len() {
            return false;
        }
        // Compare the diverging children under the common ancestor.
        let (ca, cb) = (path_a[common], path_b[common]);
        let parent = self.get(ca).map(|n| n.parent).unwrap_or(NodeId::NONE);
        for child in self.children(parent) {
            if child == ca {
                return true;
            }
            if child == cb {
                return false;
            }
        }
        false
    }
}

/// Per-pass map from synthesized marker nodes to their roles. Recognition of
/// "is this a timestamp/signature marker" goes through this table instead of
/// re-parsing text; the reserved marker classes on the elements themselves
/// exist only so a re-scan of an already-mutated tree stays idempotent.
#[derive(Debug, Default)]
pub struct RoleMap {
    roles: HashMap<NodeId, NodeRole>,
}

/// Role of a synthesized marker node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Wraps exactly one matched timestamp substring.
    TimestampMarker,
    /// Wraps a resolved signature run (author link through timestamp).
    SignatureMarker,
    /// Synthetic block container created by the normalizer.
    Wrapper,
}

impl RoleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, node: NodeId, role: NodeRole) {
        self.roles.insert(node, role);
    }

    pub fn get(&self, node: NodeId) -> Option<NodeRole> {
        self.roles.get(&node).copied()
    }

    pub fn is(&self, node: NodeId, role: NodeRole) -> bool {
        self.get(node) == Some(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_append() {
        let mut dom = ContentDom::new();

        let div = dom.create_element(
            "DIV",
            vec![Attr { name: "class".into(), value: "a b".into() }],
        );
        dom.append(dom.root(), div);

        assert_eq!(dom.tag(div), Some("div"));
        assert!(dom.has_class(div, "a"));
        assert!(dom.has_class(div, "b"));
        assert!(!dom.has_class(div, "c"));

        let p1 = dom.create_element("p", vec![]);
        let p2 = dom.create_element("p", vec![]);
        dom.append(div, p1);
        dom.append(div, p2);

        let children: Vec<_> = dom.children(div).collect();
        assert_eq!(children, vec![p1, p2]);
    }

    #[test]
    fn insert_and_detach() {
        let mut dom = ContentDom::new();
        let parent = dom.create_element("p", vec![]);
        dom.append(dom.root(), parent);
        let a = dom.create_text("a");
        let c = dom.create_text("c");
        dom.append(parent, a);
        dom.append(parent, c);

        let b = dom.create_text("b");
        dom.insert_before(c, b);
        let texts: Vec<_> = dom
            .children(parent)
            .filter_map(|id| dom.text(id))
            .collect();
        assert_eq!(texts, vec!["a", "b", "c"]);

        dom.detach(b);
        let texts: Vec<_> = dom
            .children(parent)
            .filter_map(|id| dom.text(id))
            .collect();
        assert_eq!(texts, vec!["a", "c"]);
    }

    #[test]
    fn wrap_sibling_run() {
        let mut dom = ContentDom::new();
        let parent = dom.create_element("p", vec![]);
        dom.append(dom.root(), parent);
        let a = dom.create_text("a");
        let b = dom.create_text("b");
        let c = dom.create_text("c");
        dom.append(parent, a);
        dom.append(parent, b);
        dom.append(parent, c);

        let wrapper = dom.create_element("span", vec![]);
        dom.wrap_siblings(a, b, wrapper);

        let children: Vec<_> = dom.children(parent).collect();
        assert_eq!(children, vec![wrapper, c]);
        let wrapped: Vec<_> = dom.children(wrapper).collect();
        assert_eq!(wrapped, vec![a, b]);
    }

    #[test]
    fn document_order() {
        let mut dom = ContentDom::new();
        let div = dom.create_element("div", vec![]);
        dom.append(dom.root(), div);
        let p1 = dom.create_element("p", vec![]);
        let p2 = dom.create_element("p", vec![]);
        dom.append(div, p1);
        dom.append(div, p2);
        let t = dom.create_text("x");
        dom.append(p1, t);

        assert!(dom.is_before(p1, p2));
        assert!(!dom.is_before(p2, p1));
        // Ancestors come before their descendants.
        assert!(dom.is_before(div, t));
        assert!(dom.is_before(t, p2));
    }

    #[test]
    fn subtree_iteration_and_text() {
        let mut dom = ContentDom::new();
        let div = dom.create_element("div", vec![]);
        dom.append(dom.root(), div);
        let p = dom.create_element("p", vec![]);
        dom.append(div, p);
        let t1 = dom.create_text("Hello ");
        dom.append(p, t1);
        let em = dom.create_element("em", vec![]);
        dom.append(p, em);
        let t2 = dom.create_text("world");
        dom.append(em, t2);

        let order: Vec<_> = dom.descendants(div).collect();
        assert_eq!(order, vec![div, p, t1, em, t2]);
        assert_eq!(dom.text_content(div), "Hello world");
    }
}
