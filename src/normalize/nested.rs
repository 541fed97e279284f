//! Pass 1: Nested part removal.

use crate::collect::{CommentPart, Step};
use crate::dom::ContentDom;

/// A part collected via `up` with no foreign content already contains every
/// part gathered between it and the most recent `dive`: those entries are
/// redundant and are spliced out, leaving the parent to represent them.
///
/// Parts with foreign content are left alone; their useful descendants were
/// collected individually and must survive the later filter on their own.
pub fn remove_nested_parts(dom: &ContentDom, parts: &mut Vec<CommentPart>) {
    let mut result: Vec<CommentPart> = Vec::with_capacity(parts.len());

    for part in parts.drain(..) {
        if part.step == Step::Up && !part.has_foreign_content {
            while let Some(last) = result.last() {
                if last.step == Step::Dive {
                    break;
                }
                if dom.contains(part.node, last.node) {
                    result.pop();
                } else {
                    break;
                }
            }
        }
        result.push(part);
    }

    *parts = result;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::NodeId;

    fn part(node: NodeId, step: Step) -> CommentPart {
        CommentPart {
            node,
            step,
            is_text: false,
            is_heading: false,
            has_own_signature: false,
            has_foreign_content: false,
        }
    }

    #[test]
    fn up_subsumes_collected_children() {
        let mut dom = ContentDom::new();
        let li = dom.create_element("li", vec![]);
        dom.append(dom.root(), li);
        let text = dom.create_text("reply");
        dom.append(li, text);
        let sig = dom.create_element("span", vec![]);
        dom.append(li, sig);

        let mut parts = vec![
            part(sig, Step::Start),
            part(text, Step::Back),
            part(li, Step::Up),
        ];
        remove_nested_parts(&dom, &mut parts);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].node, li);
    }

    #[test]
    fn foreign_up_subsumes_nothing() {
        let mut dom = ContentDom::new();
        let div = dom.create_element("div", vec![]);
        dom.append(dom.root(), div);
        let p = dom.create_element("p", vec![]);
        dom.append(div, p);

        let mut up = part(div, Step::Up);
        up.has_foreign_content = true;
        let mut parts = vec![part(p, Step::Start), up];
        remove_nested_parts(&dom, &mut parts);
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn subsumption_stops_at_dive() {
        let mut dom = ContentDom::new();
        let outer = dom.create_element("div", vec![]);
        dom.append(dom.root(), outer);
        let foreign = dom.create_element("div", vec![]);
        dom.append(outer, foreign);
        let recovered = dom.create_element("p", vec![]);
        dom.append(foreign, recovered);
        let own = dom.create_element("p", vec![]);
        dom.append(outer, own);

        let mut parts = vec![
            part(own, Step::Start),
            part(recovered, Step::Dive),
            part(outer, Step::Up),
        ];
        remove_nested_parts(&dom, &mut parts);
        // The dive part survives even though it is a descendant of the
        // up part's node.
        assert_eq!(parts.len(), 3);
    }
}
