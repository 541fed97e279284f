//! html5ever ingestion for the arena content tree.
//!
//! Callers that hold rendered page HTML (rather than an already-built tree)
//! parse it through here. The sink builds the arena directly, so no
//! intermediate DOM representation exists.

use std::cell::RefCell;
use std::collections::HashMap;

use html5ever::driver::ParseOpts;
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{Attribute as Html5Attribute, QualName, parse_document};

use super::arena::{Attr, ContentDom, NodeData, NodeId};

/// Parse an HTML document into a [`ContentDom`].
pub fn parse_html(html: &str) -> ContentDom {
    let sink = DomSink::new();
    parse_document(sink, ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes())
        .into_dom()
}

/// Handle used by the TreeSink to reference nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHandle(pub NodeId);

impl Default for NodeHandle {
    fn default() -> Self {
        NodeHandle(NodeId::NONE)
    }
}

/// TreeSink implementation that builds a [`ContentDom`].
///
/// Interior mutability (RefCell) because the TreeSink trait takes `&self`
/// everywhere. Element qualified names are kept boxed on the side purely to
/// serve `elem_name`; the arena itself stores plain lowercase tag strings.
pub struct DomSink {
    dom: RefCell<ContentDom>,
    names: RefCell<HashMap<NodeId, Box<QualName>>>,
    quirks_mode: RefCell<QuirksMode>,
}

impl Default for DomSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DomSink {
    pub fn new() -> Self {
        Self {
            dom: RefCell::new(ContentDom::new()),
            names: RefCell::new(HashMap::new()),
            quirks_mode: RefCell::new(QuirksMode::NoQuirks),
        }
    }

    /// Consume the sink and return the tree.
    pub fn into_dom(self) -> ContentDom {
        self.dom.into_inner()
    }

    fn append_text(&self, parent: NodeId, text: &str) {
        let mut dom = self.dom.borrow_mut();
        // Coalesce with a trailing text sibling so leaves stay maximal.
        let last = dom.get(parent).map(|n| n.last_child).unwrap_or(NodeId::NONE);
        if let Some(node) = dom.get_mut(last)
            && let NodeData::Text(existing) = &mut node.data
        {
            existing.push_str(text);
            return;
        }
        let id = dom.create_text(text);
        dom.append(parent, id);
    }
}

impl TreeSink for DomSink {
    type Handle = NodeHandle;
    type Output = Self;
    type ElemName<'a>
        = &'a QualName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        self
    }

    fn parse_error(&self, _msg: std::borrow::Cow<'static, str>) {
        // Lenient, like browsers.
    }

    fn get_document(&self) -> Self::Handle {
        NodeHandle(self.dom.borrow().root())
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        static EMPTY: QualName = QualName {
            prefix: None,
            ns: html5ever::ns!(),
            local: html5ever::local_name!(""),
        };
        let names = self.names.borrow();
        match names.get(&target.0) {
            Some(name) => {
                // SAFETY: the QualName is behind a Box whose heap allocation
                // is stable across map growth, and the map lives as long as
                // self; entries are never removed. The borrow checker cannot
                // see this through the RefCell, so the lifetime is extended
                // manually.
                unsafe { std::mem::transmute::<&QualName, &'a QualName>(&**name) }
            }
            None => &EMPTY,
        }
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Html5Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let converted: Vec<Attr> = attrs
            .into_iter()
            .map(|a| Attr {
                name: a.name.local.to_string(),
                value: a.value.to_string(),
            })
            .collect();
        let id = self
            .dom
            .borrow_mut()
            .create_element(name.local.as_ref(), converted);
        self.names.borrow_mut().insert(id, Box::new(name));
        NodeHandle(id)
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        NodeHandle(self.dom.borrow_mut().create_comment(text.to_string()))
    }

    fn create_pi(&self, _target: StrTendril, _data: StrTendril) -> Self::Handle {
        NodeHandle(self.dom.borrow_mut().create_comment(String::new()))
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        match child {
            NodeOrText::AppendNode(node) => {
                self.dom.borrow_mut().append(parent.0, node.0);
            }
            NodeOrText::AppendText(text) => {
                self.append_text(parent.0, &text);
            }
        }
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        let parent = self
            .dom
            .borrow()
            .get(element.0)
            .map(|n| n.parent)
            .unwrap_or(NodeId::NONE);
        if parent.is_some() {
            match child {
                NodeOrText::AppendNode(node) => {
                    self.dom.borrow_mut().append(parent, node.0);
                }
                NodeOrText::AppendText(text) => {
                    self.append_text(parent, &text);
                }
            }
            return;
        }
        self.append(prev_element, child);
    }

    fn append_doctype_to_document(
        &self,
        _name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
        // Doctype carries nothing the segmentation stages look at.
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        *target
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        x.0 == y.0
    }

    fn set_quirks_mode(&self, mode: QuirksMode) {
        *self.quirks_mode.borrow_mut() = mode;
    }

    fn append_before_sibling(&self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        let mut dom = self.dom.borrow_mut();
        match new_node {
            NodeOrText::AppendNode(node) => {
                dom.insert_before(sibling.0, node.0);
            }
            NodeOrText::AppendText(text) => {
                let text_node = dom.create_text(text.to_string());
                dom.insert_before(sibling.0, text_node);
            }
        }
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Html5Attribute>) {
        let mut dom = self.dom.borrow_mut();
        if let Some(node) = dom.get_mut(target.0)
            && let NodeData::Element { attrs: existing, classes, .. } = &mut node.data
        {
            for attr in attrs {
                let name = attr.name.local.to_string();
                if name == "class" {
                    if classes.is_empty() {
                        *classes = attr
                            .value
                            .split_whitespace()
                            .map(|s| s.to_string())
                            .collect();
                    }
                } else if !existing.iter().any(|a| a.name == name) {
                    existing.push(Attr { name, value: attr.value.to_string() });
                }
            }
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        self.dom.borrow_mut().detach(target.0);
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        let children: Vec<_> = self.dom.borrow().children(node.0).collect();
        let mut dom = self.dom.borrow_mut();
        for child in children {
            dom.detach(child);
            dom.append(new_parent.0, child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find_tag(dom: &ContentDom, tag: &str) -> Option<NodeId> {
        dom.descendants(dom.root()).find(|&id| dom.tag(id) == Some(tag))
    }

    #[test]
    fn basic_parse() {
        let dom = parse_html("<html><body><p>Hello</p></body></html>");
        let p = find_tag(&dom, "p").expect("should find p");
        let text_id = dom.children(p).next().expect("p should have child");
        assert_eq!(dom.text(text_id), Some("Hello"));
    }

    #[test]
    fn classes_and_attrs() {
        let dom = parse_html(r#"<dd class="outdent deep" data-level="3">x</dd>"#);
        let dd = find_tag(&dom, "dd").expect("should find dd");
        assert!(dom.has_class(dd, "outdent"));
        assert!(dom.has_class(dd, "deep"));
        assert_eq!(dom.attr(dd, "data-level"), Some("3"));
    }

    #[test]
    fn adjacent_text_coalesced() {
        let dom = parse_html("<p>a<!-- break -->b</p>");
        let p = find_tag(&dom, "p").expect("should find p");
        // Text before and after the markup comment stays as two leaves
        // separated by the comment node.
        let texts: Vec<_> = dom
            .children(p)
            .filter_map(|id| dom.text(id))
            .collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn list_structure() {
        let dom = parse_html("<ul><li>one</li><li>two</li></ul>");
        let ul = find_tag(&dom, "ul").expect("should find ul");
        let items: Vec<_> = dom
            .children(ul)
            .filter(|&id| dom.tag(id) == Some("li"))
            .collect();
        assert_eq!(items.len(), 2);
    }
}
