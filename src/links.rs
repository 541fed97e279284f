//! Link classification.
//!
//! Signatures are recognized by the user links they contain. This module
//! resolves a hyperlink's target page name (stripping protocol, host,
//! localized path prefixes, and fragment) and classifies it as a user page,
//! user talk page, contributions page, or subpage thereof, on the current
//! wiki or a foreign one. Classification is pure per href string and
//! memoized per pass in a [`LinkCache`].

use std::collections::HashMap;

use percent_encoding::percent_decode_str;

use crate::config::PageConfig;
use crate::dom::{ContentDom, NodeId};

/// What a link points at, signature-wise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// The user's page.
    User,
    /// The user's talk page.
    UserTalk,
    /// The user's contributions listing (how IP edits are signed).
    Contribs,
    /// A subpage of the user's page.
    UserSubpage,
    /// A subpage of the user's talk page.
    UserTalkSubpage,
}

/// A classified user-related link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLink {
    pub kind: LinkKind,
    /// True when the link's host differs from the current wiki's host.
    pub foreign: bool,
    /// Normalized user name the link identifies.
    pub username: String,
}

/// Per-pass memo of href classifications.
#[derive(Debug, Default)]
pub struct LinkCache {
    map: HashMap<String, Option<ClassifiedLink>>,
}

impl LinkCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify an href, consulting the memo first.
    pub fn classify(&mut self, href: &str, config: &PageConfig) -> Option<ClassifiedLink> {
        if let Some(cached) = self.map.get(href) {
            return cached.clone();
        }
        let result = classify_href(href, config);
        self.map.insert(href.to_string(), result.clone());
        result
    }
}

/// Classify a link-like element. Handles the self-link edge case (a link to
/// the current page renders with a marker class and no href): on a
/// user-talk page whose title has no subpage path, such a link identifies
/// the page's owner.
pub fn classify_node(
    dom: &ContentDom,
    node: NodeId,
    config: &PageConfig,
    cache: &mut LinkCache,
) -> Option<ClassifiedLink> {
    if dom.tag(node) != Some("a") {
        return None;
    }
    match dom.attr(node, "href") {
        Some(href) => cache.classify(href, config),
        None => {
            if dom.has_class(node, &config.self_link_class)
                && config.namespace == config.user_talk_namespace_id
                && !config.page_title.contains('/')
                && !config.page_title.is_empty()
            {
                Some(ClassifiedLink {
                    kind: LinkKind::UserTalk,
                    foreign: false,
                    username: normalize_username(&config.page_title),
                })
            } else {
                None
            }
        }
    }
}

/// Classify an href string.
pub fn classify_href(href: &str, config: &PageConfig) -> Option<ClassifiedLink> {
    let (host, title) = resolve_title(href, config)?;
    let foreign = host.is_some_and(|h| h != config.wiki_host);
    classify_title(&title, config).map(|(kind, username)| ClassifiedLink {
        kind,
        foreign,
        username,
    })
}

/// Strip protocol, host, path prefix, query, and fragment from an href,
/// yielding the host (if absolute) and the decoded target page name.
fn resolve_title<'a>(href: &'a str, config: &PageConfig) -> Option<(Option<&'a str>, String)> {
    let (host, path) = if let Some(rest) = href
        .strip_prefix("https://")
        .or_else(|| href.strip_prefix("http://"))
        .or_else(|| href.strip_prefix("//"))
    {
        let slash = rest.find('/')?;
        (Some(&rest[..slash]), &rest[slash..])
    } else {
        (None, href)
    };

    let path = path.split('#').next().unwrap_or(path);

    let raw_title = if let Some(rest) = path.strip_prefix(config.article_path.as_str()) {
        rest.split('?').next().unwrap_or(rest)
    } else if let Some(rest) = path.strip_prefix(config.script_path.as_str()) {
        let query = rest.strip_prefix('?')?;
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix("title="))?
    } else {
        return None;
    };

    let decoded = percent_decode_str(raw_title).decode_utf8().ok()?;
    let title = decoded.replace('_', " ").trim().to_string();
    if title.is_empty() {
        return None;
    }
    Some((host, title))
}

/// Classify a decoded page title against the wiki's namespace tables.
fn classify_title(title: &str, config: &PageConfig) -> Option<(LinkKind, String)> {
    for alias in &config.contribs_page_aliases {
        if let Some(rest) = strip_prefix_ci(title, alias)
            && let Some(name) = rest.strip_prefix('/')
        {
            if name.is_empty() {
                return None;
            }
            return Some((LinkKind::Contribs, normalize_username(name)));
        }
    }

    let colon = title.find(':')?;
    let prefix = title[..colon].trim().to_lowercase();
    let ns = config.namespace_id(&prefix)?;
    let rest = title[colon + 1..].trim();
    if rest.is_empty() {
        return None;
    }

    let (base, is_subpage) = match rest.find('/') {
        Some(slash) => (&rest[..slash], true),
        None => (rest, false),
    };

    let kind = if ns == config.user_namespace_id {
        if is_subpage { LinkKind::UserSubpage } else { LinkKind::User }
    } else if ns == config.user_talk_namespace_id {
        if is_subpage { LinkKind::UserTalkSubpage } else { LinkKind::UserTalk }
    } else {
        return None;
    };

    Some((kind, normalize_username(base)))
}

/// Normalize a user name: trim, first character upper-cased, IPv6 literals
/// fully upper-cased. Underscores were already turned to spaces during
/// title resolution.
pub fn normalize_username(name: &str) -> String {
    let name = name.trim();
    if is_ipv6_literal(name) {
        return name.to_uppercase();
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Case-insensitive prefix strip that never assumes lowercasing preserves
/// byte lengths.
fn strip_prefix_ci<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let mut rest = text;
    for pc in prefix.chars() {
        let tc = rest.chars().next()?;
        if tc.to_lowercase().ne(pc.to_lowercase()) {
            return None;
        }
        rest = &rest[tc.len_utf8()..];
    }
    Some(rest)
}

fn is_ipv6_literal(name: &str) -> bool {
    name.contains(':')
        && name
            .chars()
            .all(|c| c.is_ascii_hexdigit() || c == ':' || c == '.')
}
