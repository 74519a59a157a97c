use thiserror::Error;

use crate::access_lists::LocalListKind;

pub const MAX_ENTRY_LENGTH: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEntry {
    Email(String),
    Domain(String),
    Invalid(InvalidEntry),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidEntry {
    #[error("empty entry")]
    Empty,
    #[error("entry is too long ({0} > {} characters)", MAX_ENTRY_LENGTH)]
    TooLong(usize),
    #[error("more than one '@' in '{0}'")]
    MultipleAt(String),
    #[error("whitespace inside '{0}'")]
    Whitespace(String),
    #[error("'#' starts a comment and can't be part of '{0}'")]
    CommentMarker(String),
}

/// Strips the `#` comment and surrounding whitespace off a raw list line.
///
/// Returns `None` for blank and comment-only lines.
pub fn parse_line(line: &str) -> Option<&str> {
    let content = match line.find('#') {
        Some(comment_start_idx) => &line[..comment_start_idx],
        None => line,
    };

    let content = content.trim();
    (!content.is_empty()).then_some(content)
}

/// Infers the entry kind from the shape of an already parsed line.
///
/// A leading `@` marks an explicit domain, but only for the whitelist.
pub fn classify_entry(entry: &str, list: LocalListKind) -> ListEntry {
    let length = entry.chars().count();
    if length == 0 {
        return ListEntry::Invalid(InvalidEntry::Empty);
    }
    if length > MAX_ENTRY_LENGTH {
        return ListEntry::Invalid(InvalidEntry::TooLong(length));
    }

    if list == LocalListKind::Whitelist {
        if let Some(domain) = entry.strip_prefix('@') {
            let domain = domain.trim();
            return if domain.is_empty() {
                ListEntry::Invalid(InvalidEntry::Empty)
            } else if domain.contains('@') {
                ListEntry::Invalid(InvalidEntry::MultipleAt(entry.into()))
            } else if domain.contains(char::is_whitespace) {
                ListEntry::Invalid(InvalidEntry::Whitespace(entry.into()))
            } else {
                ListEntry::Domain(domain.to_lowercase())
            };
        }
    }

    if entry.contains(char::is_whitespace) {
        return ListEntry::Invalid(InvalidEntry::Whitespace(entry.into()));
    }

    match entry.matches('@').count() {
        0 => ListEntry::Domain(entry.to_lowercase()),
        1 => ListEntry::Email(entry.to_lowercase()),
        _ => ListEntry::Invalid(InvalidEntry::MultipleAt(entry.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_comments_and_whitespace() {
        assert_eq!(parse_line("  spam@bad.com  # reported twice"), Some("spam@bad.com"));
        assert_eq!(parse_line("\texample.com\r"), Some("example.com"));
        assert_eq!(parse_line("# Whitelist"), None);
        assert_eq!(parse_line("   "), None);
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("   # indented comment"), None);
    }

    #[test]
    fn classifies_by_shape() {
        assert_eq!(
            classify_entry("Ok@Trusted.com", LocalListKind::Whitelist),
            ListEntry::Email("ok@trusted.com".into())
        );
        assert_eq!(
            classify_entry("BigCorp.com", LocalListKind::Blacklist),
            ListEntry::Domain("bigcorp.com".into())
        );
        assert_eq!(
            classify_entry("a@b@c.com", LocalListKind::Blacklist),
            ListEntry::Invalid(InvalidEntry::MultipleAt("a@b@c.com".into()))
        );
        assert_eq!(
            classify_entry("bad domain.com", LocalListKind::Whitelist),
            ListEntry::Invalid(InvalidEntry::Whitespace("bad domain.com".into()))
        );
        assert_eq!(
            classify_entry("a b@c.com", LocalListKind::Blacklist),
            ListEntry::Invalid(InvalidEntry::Whitespace("a b@c.com".into()))
        );
    }

    #[test]
    fn domain_marker_only_on_whitelist() {
        assert_eq!(
            classify_entry("@BigCorp.com", LocalListKind::Whitelist),
            ListEntry::Domain("bigcorp.com".into())
        );
        assert_eq!(
            classify_entry("@bigcorp.com", LocalListKind::Blacklist),
            ListEntry::Email("@bigcorp.com".into())
        );
        assert_eq!(
            classify_entry("@", LocalListKind::Whitelist),
            ListEntry::Invalid(InvalidEntry::Empty)
        );
    }

    #[test]
    fn rejects_long_entries() {
        let domain = format!("{}.com", "a".repeat(252));
        assert_eq!(domain.len(), 256);
        assert_eq!(
            classify_entry(&domain, LocalListKind::Blacklist),
            ListEntry::Invalid(InvalidEntry::TooLong(256))
        );

        let domain = format!("{}.com", "a".repeat(251));
        assert!(matches!(
            classify_entry(&domain, LocalListKind::Blacklist),
            ListEntry::Domain(_)
        ));
    }

    proptest! {
        #[test]
        fn parse_line_is_idempotent(line in ".{0,80}") {
            if let Some(parsed) = parse_line(&line) {
                prop_assert_eq!(parse_line(parsed), Some(parsed));
            }
        }

        #[test]
        fn rendered_entry_roundtrip(entry in "[a-z0-9.-]{1,30}(@[a-z0-9.-]{1,30})?", comment in "[ -~]{0,20}") {
            let rendered = format!("  {} # {}", entry, comment);
            prop_assert_eq!(parse_line(&rendered), Some(entry.as_str()));
        }
    }
}
