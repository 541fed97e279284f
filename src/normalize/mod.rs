//! Comment body normalization.
//!
//! The collector's part list is raw: parents duplicate children it already
//! gathered, inline fragments sit unanchored at block level, foreign and
//! heading boundary parts are still present, and single-purpose list
//! wrappers hide the comment's true content. Four sequential passes clean
//! this up:
//!
//! 1. **Nested removal** - parents collected via `up` subsume their
//!    already-collected descendants
//! 2. **Inline enclosure** - maximal inline/text runs get one synthetic
//!    block container
//! 3. **Filter** - foreign, heading, and text parts are dropped; intro-list
//!    boundaries are re-applied at element granularity
//! 4. **List flattening** - transparent list wrappers are replaced by their
//!    real content, and a whole-comment ordered list is rewrapped

mod enclose;
mod filter;
mod flatten;
mod nested;

use std::collections::HashMap;

use crate::collect::CommentPart;
use crate::dom::{ContentDom, NodeId, RoleMap};

/// Ownership context the passes need: which signature markers belong to the
/// comment being normalized.
pub struct NormalizeScope<'a> {
    pub owners: &'a HashMap<NodeId, usize>,
    pub own: usize,
}

/// Run all normalization passes, returning the comment's final body nodes
/// in document order.
pub fn normalize_parts(
    dom: &mut ContentDom,
    roles: &mut RoleMap,
    scope: &NormalizeScope<'_>,
    mut parts: Vec<CommentPart>,
) -> Vec<NodeId> {
    nested::remove_nested_parts(dom, &mut parts);
    enclose::enclose_inline_runs(dom, roles, &mut parts);
    filter::filter_parts(dom, &mut parts);
    flatten::flatten_lists(dom, roles, scope, &mut parts);

    // Document order, outermost nodes only.
    let mut nodes: Vec<NodeId> = parts.iter().map(|p| p.node).collect();
    nodes.sort_by(|&a, &b| {
        if a == b {
            std::cmp::Ordering::Equal
        } else if dom.is_before(a, b) {
            std::cmp::Ordering::Less
        } else {
            std::cmp::Ordering::Greater
        }
    });
    nodes.dedup();
    let snapshot = nodes.clone();
    nodes.retain(|&n| {
        !snapshot
            .iter()
            .any(|&other| other != n && dom.contains(other, n))
    });
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::{BoundaryScope, collect_parts};
    use crate::config::PageConfig;
    use crate::dom::parse_html;
    use crate::links::LinkCache;
    use crate::scan::scan_timestamps;
    use crate::signature::{AnchorRegistry, resolve_signatures};

    fn body_of(html: &str, index: usize) -> (ContentDom, Vec<NodeId>) {
        let mut dom = parse_html(html);
        let config = PageConfig::default();
        let mut roles = RoleMap::new();
        let mut links = LinkCache::new();
        let mut anchors = AnchorRegistry::new();
        let timestamps = scan_timestamps(&mut dom, &config, &mut roles);
        let resolved = resolve_signatures(
            &mut dom, &config, &mut roles, &mut links, &mut anchors, &timestamps,
        );
        let parts = {
            let scope = BoundaryScope {
                dom: &dom,
                config: &config,
                roles: &roles,
                owners: &resolved.owners,
                own: index,
            };
            collect_parts(&scope, &resolved.signatures[index]).expect("within budget")
        };
        let scope = NormalizeScope { owners: &resolved.owners, own: index };
        let body = normalize_parts(&mut dom, &mut roles, &scope, parts);
        (dom, body)
    }

    #[test]
    fn full_pipeline_single_paragraph() {
        let (dom, body) = body_of(
            r#"<p>Hello world. --<a href="/wiki/User:Alice">Alice</a> 23:29, 10 May 2019 (UTC)</p>"#,
            0,
        );
        assert_eq!(body.len(), 1);
        assert_eq!(dom.tag(body[0]), Some("p"));
        let text = dom.text_content(body[0]);
        assert!(text.starts_with("Hello world."));
        assert!(text.contains("(UTC)"));
    }

    #[test]
    fn foreign_content_never_in_body() {
        let (dom, body) = body_of(
            concat!(
                r#"<p>First. --<a href="/wiki/User:Alice">Alice</a> 10:00, 1 January 2020 (UTC)</p>"#,
                r#"<p>Second. --<a href="/wiki/User:Bob">Bob</a> 11:00, 1 January 2020 (UTC)</p>"#,
            ),
            1,
        );
        for &node in &body {
            assert!(!dom.text_content(node).contains("First."));
        }
    }

    #[test]
    fn body_nodes_in_document_order() {
        let (dom, body) = body_of(
            concat!(
                "<div>",
                r#"<p>Original. --<a href="/wiki/User:Alice">Alice</a> 10:00, 1 January 2020 (UTC)</p>"#,
                "<p>Recovered intro.</p>",
                "</div>",
                r#"<p>Signed here. --<a href="/wiki/User:Bob">Bob</a> 11:00, 1 January 2020 (UTC)</p>"#,
            ),
            1,
        );
        assert!(body.len() >= 2);
        for pair in body.windows(2) {
            assert!(dom.is_before(pair[0], pair[1]));
        }
        assert!(dom.text_content(body[0]).contains("Recovered intro"));
    }
}
