//! Pass 3: Part filtering.

use crate::collect::{CommentPart, is_intro_list};
use crate::dom::ContentDom;

/// Drop every part that is still foreign, a heading boundary, or a bare
/// text node (its content has either been enclosed by pass 2 or belongs to
/// an element part). Then trim empty paragraphs at the document-start end
/// and re-apply the intro-list boundary now that text-node noise is gone.
pub fn filter_parts(dom: &ContentDom, parts: &mut Vec<CommentPart>) {
    parts.retain(|p| !p.has_foreign_content && !p.is_heading && !p.is_text);

    // Collection order puts the document-start end last.
    while let Some(last) = parts.last() {
        if is_empty_block(dom, last) {
            parts.pop();
        } else {
            break;
        }
    }

    if let Some(idx) = parts.iter().position(|p| is_intro_list(dom, p.node)) {
        parts.truncate(idx);
    }
}

fn is_empty_block(dom: &ContentDom, part: &CommentPart) -> bool {
    matches!(dom.tag(part.node), Some("p") | Some("div"))
        && dom.text_content(part.node).trim().is_empty()
}
