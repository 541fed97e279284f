//! Collaborator-supplied page configuration.
//!
//! Everything locale- or wiki-specific lives here: the timestamp grammar,
//! marker classes for templates the parser must recognize, the wiki's host
//! and URL layout for link classification, and namespace tables. The
//! `Default` impl carries English-wiki conventions so tests and quick
//! starts need no boilerplate.

use std::collections::HashSet;

use crate::dom::{ContentDom, NodeId};
use crate::grammar::TimestampGrammar;

/// Custom foreign-content predicate, consulted by the boundary collector in
/// addition to the built-in rules.
pub type ForeignPredicate = Box<dyn Fn(&ContentDom, NodeId) -> bool>;

/// Configuration for one parse pass over one page snapshot.
pub struct PageConfig {
    /// Compiled timestamp grammar for the wiki's locale.
    pub grammar: TimestampGrammar,

    /// Character budget for the backward signature walk.
    pub signature_scan_limit: usize,

    /// Class identifying "unsigned" template output.
    pub unsigned_marker_class: String,

    /// Classes identifying closed/foreign content blocks.
    pub foreign_marker_classes: HashSet<String>,

    /// Class identifying outdent templates, if the wiki has them.
    pub outdent_marker_class: Option<String>,

    /// Classes identifying talk-page message boxes.
    pub message_box_classes: Vec<String>,

    /// Namespaces in which message boxes count as foreign content.
    pub message_box_namespaces: Vec<i32>,

    /// Tags whose subtrees the timestamp scanner skips entirely.
    pub excluded_tags: HashSet<String>,

    /// Classes whose subtrees the timestamp scanner skips entirely.
    pub excluded_classes: HashSet<String>,

    /// Class or id of the page's table-of-contents container.
    pub toc_class: String,

    /// Class rendered on links to the current page.
    pub self_link_class: String,

    /// Host of the current wiki; links elsewhere are foreign.
    pub wiki_host: String,

    /// Pretty-URL article prefix, e.g. `/wiki/`.
    pub article_path: String,

    /// Script-URL path, e.g. `/w/index.php`.
    pub script_path: String,

    /// Localized namespace prefixes (lowercase, spaces) to namespace ids.
    pub namespace_aliases: Vec<(String, i32)>,

    /// Namespace id of user pages.
    pub user_namespace_id: i32,

    /// Namespace id of user talk pages.
    pub user_talk_namespace_id: i32,

    /// Localized prefixes of the contributions special page (lowercase).
    pub contribs_page_aliases: Vec<String>,

    /// Namespace id of the current page.
    pub namespace: i32,

    /// Title of the current page, without namespace prefix.
    pub page_title: String,

    /// Extension point: additional foreign-content detection.
    pub custom_foreign_predicate: Option<ForeignPredicate>,
}

impl PageConfig {
    /// English-wiki defaults for a user-talk page with the given title.
    pub fn for_talk_page(title: &str) -> Self {
        Self {
            page_title: title.to_string(),
            ..Self::default()
        }
    }

    /// Look up a namespace prefix (already lowercased, underscores as
    /// spaces) in the alias table.
    pub fn namespace_id(&self, prefix: &str) -> Option<i32> {
        self.namespace_aliases
            .iter()
            .find(|(alias, _)| alias == prefix)
            .map(|&(_, id)| id)
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            grammar: TimestampGrammar::english(),
            signature_scan_limit: 100,
            unsigned_marker_class: "unsigned".to_string(),
            foreign_marker_classes: HashSet::from(["mw-notalk".to_string()]),
            outdent_marker_class: Some("outdent-template".to_string()),
            message_box_classes: vec![
                "tmbox".to_string(),
                "ombox".to_string(),
                "cmbox".to_string(),
                "fmbox".to_string(),
            ],
            message_box_namespaces: vec![0, 4],
            excluded_tags: HashSet::from(["blockquote".to_string()]),
            excluded_classes: HashSet::new(),
            toc_class: "toc".to_string(),
            self_link_class: "mw-selflink".to_string(),
            wiki_host: "en.wikipedia.org".to_string(),
            article_path: "/wiki/".to_string(),
            script_path: "/w/index.php".to_string(),
            namespace_aliases: vec![
                ("user".to_string(), 2),
                ("user talk".to_string(), 3),
                ("special".to_string(), -1),
            ],
            user_namespace_id: 2,
            user_talk_namespace_id: 3,
            contribs_page_aliases: vec!["special:contributions".to_string()],
            namespace: 3,
            page_title: String::new(),
            custom_foreign_predicate: None,
        }
    }
}
