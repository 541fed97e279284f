//! Shared tag predicates for the segmentation stages.

use super::arena::{ContentDom, NodeId};

/// Check if a tag renders inline. Text leaves count as inline content; the
/// walks that climb "while the ancestor is inline" use this to find the
/// nearest block boundary.
pub fn is_inline_tag(tag: &str) -> bool {
    matches!(
        tag,
        "a" | "abbr"
            | "b"
            | "bdi"
            | "bdo"
            | "big"
            | "br"
            | "cite"
            | "code"
            | "data"
            | "del"
            | "dfn"
            | "em"
            | "font"
            | "i"
            | "img"
            | "ins"
            | "kbd"
            | "mark"
            | "q"
            | "rp"
            | "rt"
            | "ruby"
            | "s"
            | "samp"
            | "small"
            | "span"
            | "strike"
            | "strong"
            | "sub"
            | "sup"
            | "time"
            | "tt"
            | "u"
            | "var"
            | "wbr"
    )
}

/// Check if a tag is a list container (the indentation carriers of threaded
/// discussions).
pub fn is_list_container_tag(tag: &str) -> bool {
    matches!(tag, "ul" | "ol" | "dl")
}

/// Check if a tag is a list item.
pub fn is_list_item_tag(tag: &str) -> bool {
    matches!(tag, "li" | "dd" | "dt")
}

/// Heading level for `h1`..`h6`, if the tag is a heading.
pub fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// Check if a tag renders struck-through content.
pub fn is_strikethrough_tag(tag: &str) -> bool {
    matches!(tag, "s" | "strike" | "del")
}

/// Check if a node is an inline element or a text leaf.
pub fn is_inline_node(dom: &ContentDom, id: NodeId) -> bool {
    if dom.is_text(id) {
        return true;
    }
    dom.tag(id).is_some_and(is_inline_tag)
}

/// Check if a node is an element with a block rendering.
pub fn is_block_element(dom: &ContentDom, id: NodeId) -> bool {
    dom.tag(id).is_some_and(|t| !is_inline_tag(t))
}

/// Check if a node is a heading element.
pub fn is_heading(dom: &ContentDom, id: NodeId) -> bool {
    dom.tag(id).and_then(heading_level).is_some()
}

/// Check if a node is a list container element.
pub fn is_list_container(dom: &ContentDom, id: NodeId) -> bool {
    dom.tag(id).is_some_and(is_list_container_tag)
}

/// Check if a text leaf holds only whitespace.
pub fn is_blank_text(dom: &ContentDom, id: NodeId) -> bool {
    dom.text(id).is_some_and(|t| t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_classes() {
        assert!(is_inline_tag("span"));
        assert!(is_inline_tag("small"));
        assert!(!is_inline_tag("p"));
        assert!(!is_inline_tag("dl"));

        assert!(is_list_container_tag("dl"));
        assert!(!is_list_container_tag("dd"));
        assert!(is_list_item_tag("dd"));

        assert_eq!(heading_level("h2"), Some(2));
        assert_eq!(heading_level("p"), None);

        assert!(is_strikethrough_tag("s"));
        assert!(!is_strikethrough_tag("b"));
    }
}
