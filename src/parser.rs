//! The parse pipeline.
//!
//! One pass over one page snapshot: repair split lists, scan timestamps,
//! resolve signatures, collect and normalize each comment's extent, then
//! compute levels and assemble sections. All page-scoped state lives in
//! locals created here, so concurrent passes over different trees never
//! share anything.

use tracing::{debug, warn};

use crate::collect::{BoundaryScope, WalkExhausted, collect_parts};
use crate::config::PageConfig;
use crate::dom::{ContentDom, NodeId, RoleMap};
use crate::levels::{LevelCache, repair_lists};
use crate::links::LinkCache;
use crate::normalize::{NormalizeScope, normalize_parts};
use crate::scan::scan_timestamps;
use crate::sections::{SectionForest, SectionId, assemble_sections};
use crate::signature::{AnchorRegistry, Signature, resolve_signatures};

/// A recognized comment.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Comment {
    /// The signature that closes the comment.
    pub signature: Signature,
    /// The comment's extent: outermost body nodes, document order. Never
    /// overlaps another comment's body.
    pub body: Vec<NodeId>,
    /// Reply nesting depth; top-level comments are 0.
    pub level: u32,
    /// Position in document order among all comments.
    pub index: usize,
    /// The section the comment falls in, absent above the first heading.
    pub section: Option<SectionId>,
}

impl Comment {
    /// The comment's page-unique anchor.
    pub fn anchor(&self) -> &str {
        &self.signature.anchor
    }

    /// Normalized author name.
    pub fn author(&self) -> &str {
        &self.signature.author_name
    }

    /// The signature instant in UTC, absent for dateless unsigned comments.
    pub fn timestamp_utc(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.signature.date
    }
}

/// Recoverable conditions surfaced to the caller. Nothing here aborts a
/// pass; each one means a single comment was skipped.
#[derive(Debug, Clone, thiserror::Error)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum Warning {
    /// The boundary walk hit its hard iteration bound, which indicates a
    /// malformed or adversarial tree around this signature.
    #[error("boundary walk budget exhausted near {anchor}")]
    WalkBudgetExhausted { anchor: String },
}

/// Everything one pass produced. The mutated tree stays with the caller.
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ParseOutput {
    pub comments: Vec<Comment>,
    pub sections: SectionForest,
    pub warnings: Vec<Warning>,
    signatures_found: usize,
}

impl ParseOutput {
    /// Look a comment up by its anchor.
    pub fn find_by_anchor(&self, anchor: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.anchor() == anchor)
    }

    /// Human-readable recognition summary, for callers surfacing omissions.
    pub fn summary(&self) -> String {
        format!(
            "{} signatures found, {} comments recognized",
            self.signatures_found,
            self.comments.len()
        )
    }
}

/// Segment one page's content tree into comments and sections.
///
/// The tree is mutated in place (timestamp and signature markers are
/// synthesized, inline runs are wrapped); callers that re-parse must supply
/// a fresh snapshot, not the mutated tree.
pub fn parse(dom: &mut ContentDom, config: &PageConfig) -> ParseOutput {
    let mut roles = RoleMap::new();
    let mut links = LinkCache::new();
    let mut anchors = AnchorRegistry::new();

    // Coalesce renderer-split lists before anything is positioned on them.
    repair_lists(dom);

    let timestamps = scan_timestamps(dom, config, &mut roles);
    debug!(count = timestamps.len(), "timestamps located");

    let resolved = resolve_signatures(dom, config, &mut roles, &mut links, &mut anchors, &timestamps);
    let signatures_found = resolved
        .signatures
        .iter()
        .map(|s| 1 + s.extra_signatures.len())
        .sum();

    let mut warnings = Vec::new();
    let mut comments = Vec::new();

    for (own, sig) in resolved.signatures.iter().enumerate() {
        let collected = {
            let scope = BoundaryScope {
                dom,
                config,
                roles: &roles,
                owners: &resolved.owners,
                own,
            };
            collect_parts(&scope, sig)
        };
        let parts = match collected {
            Ok(parts) => parts,
            Err(WalkExhausted) => {
                warn!(anchor = %sig.anchor, "boundary walk budget exhausted; comment skipped");
                warnings.push(Warning::WalkBudgetExhausted { anchor: sig.anchor.clone() });
                continue;
            }
        };

        let scope = NormalizeScope { owners: &resolved.owners, own };
        let body = normalize_parts(dom, &mut roles, &scope, parts);
        if body.is_empty() {
            debug!(anchor = %sig.anchor, "comment normalized to nothing; skipped");
            continue;
        }

        comments.push(Comment {
            signature: sig.clone(),
            body,
            level: 0,
            index: 0,
            section: None,
        });
    }

    comments.sort_by(|a, b| {
        let (pa, pb) = (a.body[0], b.body[0]);
        if pa == pb {
            std::cmp::Ordering::Equal
        } else if dom.is_before(pa, pb) {
            std::cmp::Ordering::Less
        } else {
            std::cmp::Ordering::Greater
        }
    });

    let mut levels = LevelCache::new();
    for (index, comment) in comments.iter_mut().enumerate() {
        comment.index = index;
        comment.level = levels.level_of(dom, comment.body[0]);
    }

    let positions: Vec<NodeId> = comments.iter().map(|c| c.body[0]).collect();
    let (sections, assignments) = assemble_sections(dom, &positions);
    for (comment, section) in comments.iter_mut().zip(assignments) {
        comment.section = section;
    }

    ParseOutput {
        comments,
        sections,
        warnings,
        signatures_found,
    }
}
