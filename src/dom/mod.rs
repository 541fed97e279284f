//! Arena content tree, HTML ingestion, and shared tag predicates.

mod arena;
mod html;
pub mod predicates;

pub use arena::{Attr, ChildrenIter, ContentDom, ContentNode, DescendantsIter, NodeData, NodeId, NodeRole, RoleMap};
pub use html::{DomSink, parse_html};

/// Class carried by synthesized timestamp marker elements. Kept on the
/// element (in addition to the per-pass role table) so that re-scanning an
/// already-mutated tree never finds a timestamp inside an existing marker.
pub const TIMESTAMP_MARKER_CLASS: &str = "cq-timestamp";

/// Class carried by synthesized signature marker elements.
pub const SIGNATURE_MARKER_CLASS: &str = "cq-signature";

/// Class carried by synthetic block wrappers created by the normalizer.
pub const WRAPPER_CLASS: &str = "cq-wrapper";
