//! Signature resolution.
//!
//! Starting at each timestamp marker, walk backward through the tree to
//! find the contiguous run of nodes forming the author's signature, resolve
//! "unsigned" template markers, and merge duplicate sign-offs within one
//! block into a single primary signature.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::PageConfig;
use crate::dom::predicates::{is_inline_tag, is_strikethrough_tag};
use crate::dom::{
    Attr, ContentDom, NodeId, NodeRole, RoleMap, SIGNATURE_MARKER_CLASS, TIMESTAMP_MARKER_CLASS,
};
use crate::links::{ClassifiedLink, LinkCache, LinkKind, classify_node};
use crate::scan::Timestamp;

/// A resolved signature: the author-identifying run that closes a comment.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Signature {
    /// Marker element wrapping the signature run (for unsigned-template-only
    /// signatures, the template element itself).
    pub marker: NodeId,
    /// The timestamp text, empty for unsigned-only signatures.
    pub timestamp_text: String,
    /// The instant; absent for unsigned-only signatures.
    pub date: Option<DateTime<Utc>>,
    /// Normalized author name.
    pub author_name: String,
    /// Node of the author's user-page link, when one was found.
    pub author_link: Option<NodeId>,
    /// Node of the author's talk-page link, when one was found.
    pub author_talk_link: Option<NodeId>,
    /// True when the signature came from an "unsigned" template.
    pub is_unsigned: bool,
    /// Page-unique anchor, `YYYYMMDDHHmm_Author_Name` (collision-suffixed).
    pub anchor: String,
    /// Duplicate sign-offs merged into this signature, document order.
    pub extra_signatures: Vec<Signature>,
}

/// Page-scoped anchor collision registry. Reset per pass.
#[derive(Debug, Default)]
pub struct AnchorRegistry {
    counts: HashMap<String, u32>,
}

impl AnchorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a base anchor, returning it unchanged on first use and
    /// suffixed `_2`, `_3`, ... on collisions.
    pub fn register(&mut self, base: &str) -> String {
        let count = self.counts.entry(base.to_string()).or_insert(0);
        *count += 1;
        if *count == 1 {
            base.to_string()
        } else {
            format!("{}_{}", base, count)
        }
    }
}

/// Resolver output: primary signatures in order, plus the ownership table
/// mapping every synthesized marker node to its signature's index (extras
/// map to the primary they merged into).
pub struct ResolvedSignatures {
    pub signatures: Vec<Signature>,
    pub owners: HashMap<NodeId, usize>,
}

/// Resolve every timestamp into a signature, merge same-block duplicates,
/// and pick up unsigned-template-only signatures.
pub fn resolve_signatures(
    dom: &mut ContentDom,
    config: &PageConfig,
    roles: &mut RoleMap,
    links: &mut LinkCache,
    anchors: &mut AnchorRegistry,
    timestamps: &[Timestamp],
) -> ResolvedSignatures {
    // Candidates in document order, each tagged with its enclosing block so
    // that same-block duplicates can merge afterwards.
    let mut candidates: Vec<(NodeId, Signature)> = Vec::new();

    for ts in timestamps {
        let (block, unsigned_anchor) = climb_to_block(dom, config, ts.marker);
        match resolve_one(dom, config, roles, links, ts, unsigned_anchor) {
            Some(sig) => candidates.push((block, sig)),
            None => {
                debug!(timestamp = %ts.text, "discarding timestamp with no author");
            }
        }
    }

    // Same block, same author: the last sign-off is the primary, earlier
    // ones become its extra signatures.
    let mut merged: Vec<(NodeId, Signature)> = Vec::new();
    for (block, sig) in candidates {
        match merged.last_mut() {
            Some((prev_block, primary))
                if *prev_block == block && primary.author_name == sig.author_name =>
            {
                let mut extra = std::mem::replace(primary, sig);
                let trailing = std::mem::take(&mut extra.extra_signatures);
                primary.extra_signatures.push(extra);
                primary.extra_signatures.extend(trailing);
            }
            _ => merged.push((block, sig)),
        }
    }

    let mut signatures: Vec<Signature> = Vec::new();
    for (_, mut sig) in merged {
        sig.anchor = anchors.register(&anchor_base(&sig));
        signatures.push(sig);
    }

    // Unsigned templates that never got a timestamp are valid dateless
    // signatures; they sort after every dated one.
    let unsigned = collect_unsigned_only(dom, config, roles, links);
    for mut sig in unsigned {
        sig.anchor = anchors.register(&anchor_base(&sig));
        signatures.push(sig);
    }

    let mut owners = HashMap::new();
    for (index, sig) in signatures.iter().enumerate() {
        owners.insert(sig.marker, index);
        for extra in &sig.extra_signatures {
            owners.insert(extra.marker, index);
        }
    }

    ResolvedSignatures { signatures, owners }
}

/// Walk upward from a timestamp marker while the ancestors are inline,
/// returning the nearest block-level ancestor and any inline ancestor that
/// carries the unsigned-template class.
fn climb_to_block(
    dom: &ContentDom,
    config: &PageConfig,
    marker: NodeId,
) -> (NodeId, Option<NodeId>) {
    let mut unsigned_anchor = None;
    let mut cursor = marker;
    loop {
        let parent = match dom.get(cursor) {
            Some(n) => n.parent,
            None => return (cursor, unsigned_anchor),
        };
        if parent.is_none() {
            return (cursor, unsigned_anchor);
        }
        match dom.tag(parent) {
            Some(tag) if is_inline_tag(tag) => {
                if dom.has_class(parent, &config.unsigned_marker_class) {
                    unsigned_anchor = Some(parent);
                }
                cursor = parent;
            }
            _ => return (parent, unsigned_anchor),
        }
    }
}

/// Resolve one timestamp into a signature via the budgeted backward walk.
fn resolve_one(
    dom: &mut ContentDom,
    config: &PageConfig,
    roles: &mut RoleMap,
    links: &mut LinkCache,
    ts: &Timestamp,
    unsigned_anchor: Option<NodeId>,
) -> Option<Signature> {
    let start = unsigned_anchor.unwrap_or(ts.marker);

    let mut author: Option<ClassifiedLink> = None;
    let mut author_link = None;
    let mut author_talk_link = None;
    let mut sig_start = start;
    let mut links_since_author = 0u32;
    let mut budget = config.signature_scan_limit as i64;

    // The start node itself is inspected first: unsigned templates carry
    // the author link inside the marker run, not before it.
    scan_links(
        dom, config, links, start, &mut author, &mut author_link, &mut author_talk_link,
        &mut sig_start, &mut links_since_author, start,
    );

    let mut cursor = start;
    'walk: loop {
        let node = loop {
            let current = dom.get(cursor)?;
            if current.prev_sibling.is_some() {
                break current.prev_sibling;
            }
            let parent = current.parent;
            // Climb only while the parent renders inline; a block parent is
            // the signature's outer bound.
            if parent.is_some() && dom.tag(parent).is_some_and(is_inline_tag) {
                cursor = parent;
                continue;
            }
            break NodeId::NONE;
        };
        if node.is_none() {
            break;
        }
        cursor = node;

        // A prior marker means the previous comment's sign-off: boundary.
        if roles.get(node).is_some()
            || dom.has_class(node, TIMESTAMP_MARKER_CLASS)
            || dom.has_class(node, SIGNATURE_MARKER_CLASS)
        {
            break;
        }

        // Struck-out content before an already-found author is a retracted
        // earlier sign-off; exclude the run.
        if author.is_some() && dom.tag(node).is_some_and(is_strikethrough_tag) {
            break;
        }

        budget -= dom.text_content(node).chars().count() as i64;
        if budget < 0 {
            break;
        }

        if !scan_links(
            dom, config, links, node, &mut author, &mut author_link, &mut author_talk_link,
            &mut sig_start, &mut links_since_author, node,
        ) {
            break 'walk;
        }
    }

    let author = author?;

    let marker = wrap_signature(dom, roles, sig_start, ts.marker);
    Some(Signature {
        marker,
        timestamp_text: ts.text.clone(),
        date: Some(ts.date),
        author_name: author.username,
        author_link,
        author_talk_link,
        is_unsigned: unsigned_anchor.is_some(),
        anchor: String::new(),
        extra_signatures: Vec::new(),
    })
}

/// Classify the links inside one visited node, nearest-to-timestamp first.
/// The first author name found wins; a link to a different user ends the
/// walk (`false`), except that one different name immediately after the
/// chosen author's own link is tolerated (users who mention a redirect to
/// their own page right before signing).
#[allow(clippy::too_many_arguments)]
fn scan_links(
    dom: &ContentDom,
    config: &PageConfig,
    links: &mut LinkCache,
    node: NodeId,
    author: &mut Option<ClassifiedLink>,
    author_link: &mut Option<NodeId>,
    author_talk_link: &mut Option<NodeId>,
    sig_start: &mut NodeId,
    links_since_author: &mut u32,
    boundary_node: NodeId,
) -> bool {
    let mut link_nodes: Vec<NodeId> = dom
        .descendants(node)
        .filter(|&id| dom.tag(id) == Some("a"))
        .collect();
    link_nodes.reverse();

    for link_node in link_nodes {
        let Some(classified) = classify_node(dom, link_node, config, links) else {
            continue;
        };
        match author {
            None => {
                record_link(&classified, link_node, author_link, author_talk_link);
                *author = Some(classified);
                *sig_start = boundary_node;
            }
            Some(current) => {
                if classified.username == current.username {
                    record_link(&classified, link_node, author_link, author_talk_link);
                    *sig_start = boundary_node;
                    *links_since_author = 0;
                } else {
                    *links_since_author += 1;
                    if *links_since_author > 1 {
                        // A second user's signature: the walk has crossed
                        // into the previous comment.
                        return false;
                    }
                }
            }
        }
    }
    true
}

fn record_link(
    classified: &ClassifiedLink,
    node: NodeId,
    author_link: &mut Option<NodeId>,
    author_talk_link: &mut Option<NodeId>,
) {
    match classified.kind {
        LinkKind::User | LinkKind::UserSubpage | LinkKind::Contribs => {
            if author_link.is_none() {
                *author_link = Some(node);
            }
        }
        LinkKind::UserTalk | LinkKind::UserTalkSubpage => {
            if author_talk_link.is_none() {
                *author_talk_link = Some(node);
            }
        }
    }
}

/// Wrap the accumulated run, from the signature start boundary through the
/// timestamp marker, into one marker element in place. When the walk
/// ascended through inline parents, the wrap happens at the start
/// boundary's depth.
fn wrap_signature(
    dom: &mut ContentDom,
    roles: &mut RoleMap,
    sig_start: NodeId,
    ts_marker: NodeId,
) -> NodeId {
    let (first, last) = if dom.contains(sig_start, ts_marker) {
        (sig_start, sig_start)
    } else {
        let parent = dom.get(sig_start).map(|n| n.parent).unwrap_or(NodeId::NONE);
        match dom.ancestor_with_parent(ts_marker, parent) {
            Some(last) => (sig_start, last),
            None => {
                debug!("signature run is not a sibling range; wrapping marker only");
                (ts_marker, ts_marker)
            }
        }
    };

    let wrapper = dom.create_element(
        "span",
        vec![Attr {
            name: "class".to_string(),
            value: SIGNATURE_MARKER_CLASS.to_string(),
        }],
    );
    dom.wrap_siblings(first, last, wrapper);
    roles.set(wrapper, NodeRole::SignatureMarker);
    wrapper
}

/// Find unsigned-template elements that contain no timestamp marker: these
/// are valid, dateless signatures.
fn collect_unsigned_only(
    dom: &ContentDom,
    config: &PageConfig,
    roles: &mut RoleMap,
    links: &mut LinkCache,
) -> Vec<Signature> {
    let candidates: Vec<NodeId> = dom
        .descendants(dom.root())
        .filter(|&id| {
            dom.has_class(id, &config.unsigned_marker_class)
                && roles.get(id).is_none()
                && !dom
                    .descendants(id)
                    .any(|d| roles.is(d, NodeRole::TimestampMarker))
        })
        .collect();

    let mut out = Vec::new();
    for node in candidates {
        let mut link_nodes: Vec<NodeId> = dom
            .descendants(node)
            .filter(|&id| dom.tag(id) == Some("a"))
            .collect();
        link_nodes.reverse();

        let mut author = None;
        let mut author_link = None;
        let mut author_talk_link = None;
        for link_node in link_nodes {
            if let Some(classified) = classify_node(dom, link_node, config, links) {
                record_link(&classified, link_node, &mut author_link, &mut author_talk_link);
                author.get_or_insert(classified);
            }
        }

        let Some(author) = author else {
            debug!("unsigned template with no user link; skipped");
            continue;
        };

        roles.set(node, NodeRole::SignatureMarker);
        out.push(Signature {
            marker: node,
            timestamp_text: String::new(),
            date: None,
            author_name: author.username,
            author_link,
            author_talk_link,
            is_unsigned: true,
            anchor: String::new(),
            extra_signatures: Vec::new(),
        });
    }
    out
}

/// Anchor base: UTC instant (`YYYYMMDDHHmm`, zeros when dateless) joined
/// with the underscored author name.
fn anchor_base(sig: &Signature) -> String {
    let instant = match sig.date {
        Some(date) => date.format("%Y%m%d%H%M").to_string(),
        None => "000000000000".to_string(),
    };
    format!("{}_{}", instant, sig.author_name.replace(' ', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;
    use crate::scan::scan_timestamps;
    use chrono::TimeZone;

    fn resolve(html: &str) -> (ContentDom, ResolvedSignatures) {
        let mut dom = parse_html(html);
        let config = PageConfig::default();
        let mut roles = RoleMap::new();
        let mut links = LinkCache::new();
        let mut anchors = AnchorRegistry::new();
        let timestamps = scan_timestamps(&mut dom, &config, &mut roles);
        let resolved = resolve_signatures(
            &mut dom, &config, &mut roles, &mut links, &mut anchors, &timestamps,
        );
        (dom, resolved)
    }

    #[test]
    fn simple_signature() {
        let (_, resolved) = resolve(
            r#"<p>Hello world. --<a href="/wiki/User:Alice">Alice</a> 23:29, 10 May 2019 (UTC)</p>"#,
        );
        assert_eq!(resolved.signatures.len(), 1);
        let sig = &resolved.signatures[0];
        assert_eq!(sig.author_name, "Alice");
        assert_eq!(
            sig.date,
            Some(Utc.with_ymd_and_hms(2019, 5, 10, 23, 29, 0).unwrap())
        );
        assert_eq!(sig.anchor, "201905102329_Alice");
        assert!(sig.author_link.is_some());
        assert!(!sig.is_unsigned);
    }

    #[test]
    fn signature_run_wrapped_in_place() {
        let (dom, resolved) = resolve(
            r#"<p>Text. --<a href="/wiki/User:Alice">Alice</a> (<a href="/wiki/User_talk:Alice">talk</a>) 23:29, 10 May 2019 (UTC)</p>"#,
        );
        let sig = &resolved.signatures[0];
        // The wrapped run spans from the author link through the timestamp.
        let content = dom.text_content(sig.marker);
        assert!(content.starts_with("Alice"));
        assert!(content.ends_with("(UTC)"));
        assert!(sig.author_talk_link.is_some());
    }

    #[test]
    fn bare_timestamp_discarded() {
        let (_, resolved) = resolve("<p>Just a date: 23:29, 10 May 2019 (UTC)</p>");
        assert!(resolved.signatures.is_empty());
    }

    #[test]
    fn different_author_bounds_signature() {
        let (_, resolved) = resolve(concat!(
            r#"<p>First said a thing. --<a href="/wiki/User:Alice">Alice</a> 10:00, 1 January 2020 (UTC)</p>"#,
            r#"<p>Second replies. --<a href="/wiki/User:Bob">Bob</a> 11:00, 1 January 2020 (UTC)</p>"#,
        ));
        assert_eq!(resolved.signatures.len(), 2);
        assert_eq!(resolved.signatures[0].author_name, "Alice");
        assert_eq!(resolved.signatures[1].author_name, "Bob");
    }

    #[test]
    fn extra_signature_merged() {
        let (_, resolved) = resolve(concat!(
            r#"<p>Thinking aloud. <a href="/wiki/User:Alice">Alice</a> 10:00, 1 January 2020 (UTC) "#,
            r#"on reflection, yes. <a href="/wiki/User:Alice">Alice</a> 11:00, 1 January 2020 (UTC)</p>"#,
        ));
        assert_eq!(resolved.signatures.len(), 1);
        let sig = &resolved.signatures[0];
        assert_eq!(sig.extra_signatures.len(), 1);
        // The later sign-off is primary; the earlier one is the extra.
        assert_eq!(
            sig.date,
            Some(Utc.with_ymd_and_hms(2020, 1, 1, 11, 0, 0).unwrap())
        );
        assert_eq!(
            sig.extra_signatures[0].date,
            Some(Utc.with_ymd_and_hms(2020, 1, 1, 10, 0, 0).unwrap())
        );
        // Both markers map to the one signature.
        assert_eq!(resolved.owners.len(), 2);
    }

    #[test]
    fn same_block_different_authors_not_merged() {
        let (_, resolved) = resolve(concat!(
            r#"<p>Agreed. <a href="/wiki/User:Alice">Alice</a> 10:00, 1 January 2020 (UTC) "#,
            r#"Same. <a href="/wiki/User:Bob">Bob</a> 11:00, 1 January 2020 (UTC)</p>"#,
        ));
        assert_eq!(resolved.signatures.len(), 2);
    }

    #[test]
    fn anchor_collisions_suffixed() {
        let mut registry = AnchorRegistry::new();
        assert_eq!(registry.register("202001011000_Alice"), "202001011000_Alice");
        assert_eq!(registry.register("202001011000_Alice"), "202001011000_Alice_2");
        assert_eq!(registry.register("202001011000_Alice"), "202001011000_Alice_3");
    }

    #[test]
    fn redirect_mention_tolerated() {
        // A link to a different name immediately before the author's own
        // link does not end the signature.
        let (_, resolved) = resolve(concat!(
            r#"<p>Moving my page, see <a href="/wiki/User:Oldname">Oldname</a> "#,
            r#"--<a href="/wiki/User:Alice">Alice</a> 10:00, 1 January 2020 (UTC)</p>"#,
        ));
        assert_eq!(resolved.signatures.len(), 1);
        assert_eq!(resolved.signatures[0].author_name, "Alice");
    }

    #[test]
    fn struck_run_excluded() {
        let (dom, resolved) = resolve(concat!(
            r#"<p><s>Old text <a href="/wiki/User:Alice">Alice</a></s> "#,
            r#"New text --<a href="/wiki/User:Alice">Alice</a> 10:00, 1 January 2020 (UTC)</p>"#,
        ));
        assert_eq!(resolved.signatures.len(), 1);
        let sig = &resolved.signatures[0];
        // The struck run is outside the wrapped signature.
        assert!(!dom.text_content(sig.marker).contains("Old text"));
    }

    #[test]
    fn unsigned_template_with_timestamp() {
        let (_, resolved) = resolve(concat!(
            r#"<p>Forgot to sign. <span class="unsigned">— Preceding unsigned comment added by "#,
            r#"<a href="/wiki/Special:Contributions/192.0.2.7">192.0.2.7</a> "#,
            r#"10:00, 1 January 2020 (UTC)</span></p>"#,
        ));
        assert_eq!(resolved.signatures.len(), 1);
        let sig = &resolved.signatures[0];
        assert!(sig.is_unsigned);
        assert_eq!(sig.author_name, "192.0.2.7");
        assert!(sig.date.is_some());
    }

    #[test]
    fn unsigned_template_without_timestamp() {
        let (_, resolved) = resolve(concat!(
            r#"<p>Forgot to sign. <span class="unsigned">— Preceding unsigned comment added by "#,
            r#"<a href="/wiki/User:Carol">Carol</a></span></p>"#,
        ));
        assert_eq!(resolved.signatures.len(), 1);
        let sig = &resolved.signatures[0];
        assert!(sig.is_unsigned);
        assert!(sig.date.is_none());
        assert_eq!(sig.anchor, "000000000000_Carol");
    }
}
