//! Section assembly.
//!
//! Headings are discovered by a document-order scan, independent of comment
//! collection. Every comment whose position falls after heading *H* and
//! before the next heading of level ≤ *H*'s belongs to *H*'s section;
//! sections nest by heading level.

use crate::dom::predicates::heading_level;
use crate::dom::{ContentDom, NodeId};

/// Index of a section within its forest.
pub type SectionId = usize;

/// A heading-delimited group of comments.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Section {
    /// The heading element that opens the section.
    pub heading: NodeId,
    /// Heading text, whitespace-normalized.
    pub title: String,
    /// Heading depth, 1-6.
    pub level: u8,
    /// Indices of the comments directly in this section, document order.
    pub comments: Vec<usize>,
    /// Nested subsections.
    pub children: Vec<SectionId>,
    /// Enclosing section, absent for top-level headings.
    pub parent: Option<SectionId>,
}

/// All sections of one page, as a flat arena with root indices.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct SectionForest {
    pub sections: Vec<Section>,
    pub roots: Vec<SectionId>,
}

impl SectionForest {
    pub fn get(&self, id: SectionId) -> Option<&Section> {
        self.sections.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Build the section forest and assign each comment (given by a document
/// position anchor) to the section it falls in. Returns the forest and the
/// per-comment assignment; comments before the first heading get `None`.
pub fn assemble_sections(
    dom: &ContentDom,
    positions: &[NodeId],
) -> (SectionForest, Vec<Option<SectionId>>) {
    let headings: Vec<(NodeId, u8)> = dom
        .descendants(dom.root())
        .filter_map(|id| {
            dom.tag(id)
                .and_then(heading_level)
                .map(|level| (id, level))
        })
        .collect();

    let mut forest = SectionForest::default();
    let mut stack: Vec<SectionId> = Vec::new();

    for &(heading, level) in &headings {
        while let Some(&top) = stack.last() {
            if forest.sections[top].level >= level {
                stack.pop();
            } else {
                break;
            }
        }
        let parent = stack.last().copied();
        let id = forest.sections.len();
        forest.sections.push(Section {
            heading,
            title: normalize_title(&dom.text_content(heading)),
            level,
            comments: Vec::new(),
            children: Vec::new(),
            parent,
        });
        match parent {
            Some(p) => forest.sections[p].children.push(id),
            None => forest.roots.push(id),
        }
        stack.push(id);
    }

    let mut assignments = Vec::with_capacity(positions.len());
    for (index, &position) in positions.iter().enumerate() {
        let section = forest
            .sections
            .iter()
            .enumerate()
            .rev()
            .find(|(_, s)| dom.is_before(s.heading, position))
            .map(|(id, _)| id);
        if let Some(id) = section {
            forest.sections[id].comments.push(index);
        }
        assignments.push(section);
    }

    (forest, assignments)
}

fn normalize_title(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
