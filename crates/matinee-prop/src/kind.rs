//! Node kind tags.
//!
//! Renderers pick a presentation from the kind of a node. The well-known
//! kinds are a closed enum; anything else round-trips through
//! [`NodeKind::Extension`] so third-party views keep working without a
//! stringly typed core.

use std::fmt;

/// Presentation hint attached to a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Browsable container.
    Directory,
    /// Generic list entry.
    Item,
    /// Playable video entry.
    Video,
    /// Clickable action entry.
    Action,
    /// Entry that navigates to another URL.
    Location,
    /// Visual divider between groups of entries.
    Separator,
    /// Settings page container.
    Settings,
    /// Boolean toggle setting.
    Bool,
    /// Free-form text setting.
    Text,
    /// Integer slider setting.
    Integer,
    /// Read-only informational entry.
    Info,
    /// Page that failed to open.
    OpenError,
    /// Kind the core does not know about. The tag is preserved verbatim.
    Extension(String),
}

impl NodeKind {
    /// Canonical tag for this kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            NodeKind::Directory => "directory",
            NodeKind::Item => "item",
            NodeKind::Video => "video",
            NodeKind::Action => "action",
            NodeKind::Location => "location",
            NodeKind::Separator => "separator",
            NodeKind::Settings => "settings",
            NodeKind::Bool => "bool",
            NodeKind::Text => "text",
            NodeKind::Integer => "integer",
            NodeKind::Info => "info",
            NodeKind::OpenError => "openerror",
            NodeKind::Extension(tag) => tag,
        }
    }

    /// Parses a tag. Unknown tags become [`NodeKind::Extension`].
    #[must_use]
    pub fn parse(tag: &str) -> Self {
        match tag {
            "directory" => NodeKind::Directory,
            "item" => NodeKind::Item,
            "video" => NodeKind::Video,
            "action" => NodeKind::Action,
            "location" => NodeKind::Location,
            "separator" => NodeKind::Separator,
            "settings" => NodeKind::Settings,
            "bool" => NodeKind::Bool,
            "text" => NodeKind::Text,
            "integer" => NodeKind::Integer,
            "info" => NodeKind::Info,
            "openerror" => NodeKind::OpenError,
            other => NodeKind::Extension(other.to_owned()),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tags_round_trip() {
        for tag in [
            "directory",
            "item",
            "video",
            "action",
            "location",
            "separator",
            "settings",
            "bool",
            "text",
            "integer",
            "info",
            "openerror",
        ] {
            let kind = NodeKind::parse(tag);
            assert!(!matches!(kind, NodeKind::Extension(_)), "{tag} should be well-known");
            assert_eq!(kind.as_str(), tag);
        }
    }

    #[test]
    fn unknown_tags_are_preserved() {
        let kind = NodeKind::parse("carousel");
        assert_eq!(kind, NodeKind::Extension("carousel".into()));
        assert_eq!(kind.as_str(), "carousel");
        assert_eq!(kind.to_string(), "carousel");
    }
}
