//! Timestamp scanning.
//!
//! The scanner walks every text leaf not inside an excluded subtree,
//! applies the wiki's timestamp grammar, and splits each matching leaf into
//! leading text, a marker element wrapping only the matched substring, and
//! trailing text. The mutation is intentional: later stages recognize
//! "timestamp marker" structurally (and via the role table) without ever
//! re-parsing text. A leaf with no match is simply skipped.

use chrono::{DateTime, Utc};

use crate::config::PageConfig;
use crate::dom::{
    Attr, ContentDom, NodeId, NodeRole, RoleMap, SIGNATURE_MARKER_CLASS, TIMESTAMP_MARKER_CLASS,
};

/// One timestamp occurrence, after its marker has been synthesized.
#[derive(Debug, Clone)]
pub struct Timestamp {
    /// The marker element wrapping the matched substring.
    pub marker: NodeId,
    /// The matched timestamp text.
    pub text: String,
    /// Text that followed the match within the original leaf.
    pub remainder: String,
    /// The instant, normalized to UTC.
    pub date: DateTime<Utc>,
}

/// Scan the tree and synthesize a marker element for every timestamp.
/// Returns the occurrences in document order.
pub fn scan_timestamps(
    dom: &mut ContentDom,
    config: &PageConfig,
    roles: &mut RoleMap,
) -> Vec<Timestamp> {
    // Snapshot the candidate leaves first: splitting mutates the sibling
    // chains the iterator would be walking.
    let mut candidates = Vec::new();
    for id in dom.descendants(dom.root()) {
        if let Some(text) = dom.text(id) {
            if excluded(dom, id, config, roles) {
                continue;
            }
            let matches = config.grammar.find_all(text);
            if !matches.is_empty() {
                candidates.push((id, text.to_string(), matches));
            }
        }
    }

    let mut out = Vec::new();
    for (leaf, text, matches) in candidates {
        let mut cursor = 0usize;
        for (i, m) in matches.iter().enumerate() {
            if m.start > cursor {
                let lead = dom.create_text(&text[cursor..m.start]);
                dom.insert_before(leaf, lead);
            }

            let marker = dom.create_element(
                "span",
                vec![Attr {
                    name: "class".to_string(),
                    value: TIMESTAMP_MARKER_CLASS.to_string(),
                }],
            );
            let inner = dom.create_text(m.text.clone());
            dom.append(marker, inner);
            dom.insert_before(leaf, marker);
            roles.set(marker, NodeRole::TimestampMarker);

            let remainder_end = matches.get(i + 1).map(|n| n.start).unwrap_or(text.len());
            out.push(Timestamp {
                marker,
                text: m.text.clone(),
                remainder: text[m.end..remainder_end].to_string(),
                date: m.date,
            });

            cursor = m.end;
        }
        if cursor < text.len() {
            let trail = dom.create_text(&text[cursor..]);
            dom.insert_before(leaf, trail);
        }
        dom.detach(leaf);
    }

    out
}

/// Check whether a text leaf sits inside a subtree the scanner must skip:
/// an excluded tag or class, or an already-synthesized marker (so a second
/// scan over a mutated tree finds nothing new inside markers).
fn excluded(dom: &ContentDom, leaf: NodeId, config: &PageConfig, roles: &RoleMap) -> bool {
    for ancestor in dom.ancestors(leaf) {
        if let Some(tag) = dom.tag(ancestor) {
            if config.excluded_tags.contains(tag) {
                return true;
            }
            if dom
                .classes(ancestor)
                .iter()
                .any(|c| config.excluded_classes.contains(c))
            {
                return true;
            }
            if roles.get(ancestor).is_some()
                || dom.has_class(ancestor, TIMESTAMP_MARKER_CLASS)
                || dom.has_class(ancestor, SIGNATURE_MARKER_CLASS)
            {
                return true;
            }
        }
    }
    false
}
