//! Pass 2: Inline run enclosure.

use crate::collect::{CommentPart, Step};
use crate::dom::predicates::is_inline_node;
use crate::dom::{Attr, ContentDom, NodeId, NodeRole, RoleMap, WRAPPER_CLASS};

/// Wrap maximal runs of `back`/`start` parts that are inline content in one
/// synthetic block container, so a comment signed mid-line gets a real
/// block-level body node. Runs whose parent is already inline are left for
/// the enclosing element to represent, and runs with nothing but whitespace
/// are never wrapped.
pub fn enclose_inline_runs(
    dom: &mut ContentDom,
    roles: &mut RoleMap,
    parts: &mut Vec<CommentPart>,
) {
    // Runs are contiguous in collection order, which is reverse document
    // order: the run's last entry is the first sibling on the page.
    let mut runs: Vec<(usize, usize)> = Vec::new();
    let mut run_start: Option<usize> = None;

    for (idx, part) in parts.iter().enumerate() {
        let in_run = matches!(part.step, Step::Back | Step::Start)
            && is_inline_node(dom, part.node)
            && !part.has_foreign_content
            && !part.is_heading;
        if in_run {
            if run_start.is_none() {
                run_start = Some(idx);
            }
        } else if let Some(start) = run_start.take() {
            runs.push((start, idx - 1));
        }
    }
    if let Some(start) = run_start {
        runs.push((start, parts.len() - 1));
    }

    // Wrap in reverse so earlier indices stay valid.
    for (start, end) in runs.into_iter().rev() {
        if !worth_wrapping(dom, &parts[start..=end]) {
            continue;
        }
        let doc_first = parts[end].node;
        let doc_last = parts[start].node;

        let parent = dom.get(doc_first).map(|n| n.parent).unwrap_or(NodeId::NONE);
        if is_inline_node(dom, parent) {
            continue;
        }

        let wrapper = dom.create_element(
            "div",
            vec![Attr {
                name: "class".to_string(),
                value: WRAPPER_CLASS.to_string(),
            }],
        );
        dom.wrap_siblings(doc_first, doc_last, wrapper);
        roles.set(wrapper, NodeRole::Wrapper);

        let has_own = parts[start..=end].iter().any(|p| p.has_own_signature);
        parts.splice(
            start..=end,
            [CommentPart {
                node: wrapper,
                step: Step::Replaced,
                is_text: false,
                is_heading: false,
                has_own_signature: has_own,
                has_foreign_content: false,
            }],
        );
    }
}

/// A run earns a wrapper only if some member is an inline element or
/// non-whitespace text.
fn worth_wrapping(dom: &ContentDom, run: &[CommentPart]) -> bool {
    run.iter().any(|p| {
        if p.is_text {
            dom.text(p.node).is_some_and(|t| !t.trim().is_empty())
        } else {
            true
        }
    })
}
