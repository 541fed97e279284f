//! # colloquy
//!
//! Comment and section segmentation for threaded discussion pages.
//!
//! Talk pages render as ordinary markup: headings, indented lists, free
//! text. No markup convention delimits where one comment ends and the next
//! begins - comments have to be inferred from signature patterns (user
//! links followed by a timestamp) and tree topology. This crate does that
//! inference: given a page's content tree and the wiki's timestamp and
//! signature conventions, it produces discrete, addressable comments
//! (author, timestamp, body extent, reply level) and the heading-delimited
//! section tree around them.
//!
//! ## Quick start
//!
//! ```
//! use colloquy::{PageConfig, parse, parse_html};
//!
//! let html = r#"<h2>Weather</h2>
//! <p>Looks like rain. --<a href="/wiki/User:Alice">Alice</a> 23:29, 10 May 2019 (UTC)</p>
//! <dl><dd>Bring a coat. --<a href="/wiki/User:Bob">Bob</a> 08:01, 11 May 2019 (UTC)</dd></dl>"#;
//!
//! let mut dom = parse_html(html);
//! let config = PageConfig::default();
//! let output = parse(&mut dom, &config);
//!
//! assert_eq!(output.comments.len(), 2);
//! assert_eq!(output.comments[0].author(), "Alice");
//! assert_eq!(output.comments[1].level, 1);
//! assert_eq!(output.sections.sections[0].title, "Weather");
//! ```
//!
//! ## What the parser does to the tree
//!
//! The pass mutates the tree it is given: matched timestamps are split out
//! of their text leaves into marker elements, signature runs are wrapped,
//! and mid-line comments get a synthetic block container. Callers that
//! want to re-parse must supply a fresh snapshot - running a pass over an
//! already-mutated tree is not supported (the timestamp scanner itself is
//! guarded, but wrappers accumulate).
//!
//! Per-wiki conventions (timestamp grammar, marker classes, namespaces,
//! host) are supplied through [`PageConfig`]; nothing locale-specific is
//! hard-coded.

pub mod collect;
pub mod config;
pub mod dom;
pub mod error;
pub mod grammar;
pub mod levels;
pub mod links;
pub mod normalize;
pub mod parser;
pub mod scan;
pub mod sections;
pub mod signature;

pub use config::PageConfig;
pub use dom::{ContentDom, NodeId, parse_html};
pub use error::{Error, Result};
pub use grammar::{TimestampFormat, TimestampGrammar};
pub use parser::{Comment, ParseOutput, Warning, parse};
pub use scan::Timestamp;
pub use sections::{Section, SectionForest, SectionId};
pub use signature::Signature;
