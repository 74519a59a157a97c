mod parsers;
mod process_line;

use std::path::Path;

use anyhow::Context;
pub use parsers::{classify_entry, parse_line, InvalidEntry, ListEntry, MAX_ENTRY_LENGTH};
pub(crate) use process_line::ProcessLine;

use super::AggregatedLists;

/// Per-file outcome of feeding list lines into [`AggregatedLists`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ParseStats {
    pub valid: usize,
    pub invalid: usize,
}

pub(crate) fn parse_list_content<T: ProcessLine>(
    content: &str,
    kind: &T,
    lists: &mut AggregatedLists,
    origin: &str,
) -> ParseStats {
    let mut stats = ParseStats::default();

    for (line_num, line) in content.lines().enumerate() {
        // Skip comments and empty lines
        let Some(entry) = parse_line(line) else {
            continue;
        };

        match kind.process_line(entry, lists) {
            Ok(()) => stats.valid += 1,
            Err(e) => {
                tracing::warn!(origin, line = line_num + 1, "Skipping invalid entry: {}", e);
                stats.invalid += 1;
            }
        }
    }

    if stats.invalid > 0 {
        tracing::warn!(origin, invalid = stats.invalid, "Some entries were skipped");
    }

    stats
}

pub(crate) async fn parse_list_file<T: ProcessLine>(
    path: &Path,
    kind: &T,
    lists: &mut AggregatedLists,
) -> anyhow::Result<ParseStats> {
    let data = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("error while reading the list file {:?}", path))?;

    Ok(parse_list_content(&data, kind, lists, &path.to_string_lossy()))
}

#[cfg(test)]
mod tests {
    use spamguard_common::RecordType;

    use super::*;
    use crate::access_lists::LocalListKind;

    #[test]
    fn counts_valid_and_invalid_lines() {
        let content = "# Whitelist\n\nok@trusted.com\n@bigcorp.com # whole company\nbad entry\na@b@c\n";
        let mut lists = AggregatedLists::new();
        let stats = parse_list_content(content, &LocalListKind::Whitelist, &mut lists, "whitelist.txt");

        assert_eq!(stats, ParseStats { valid: 2, invalid: 2 });
        assert!(lists.whitelist_emails().contains("ok@trusted.com"));
        assert!(lists.whitelist_domains().contains("bigcorp.com"));
    }

    #[test]
    fn remote_payload_uses_same_comment_rules() {
        let content = "# header\n203.0.113.0/24 # drop\n\n  198.51.100.0/25\n";
        let mut lists = AggregatedLists::new();
        let stats = parse_list_content(content, &RecordType::IpCidr, &mut lists, "drop");

        assert_eq!(stats.valid, 2);
        assert!(lists.blacklist_ips().contains("203.0.113.0"));
        assert!(lists.blacklist_ips().contains("198.51.100.0"));
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut lists = AggregatedLists::new();
        let result = parse_list_file(&dir.path().join("nope.txt"), &RecordType::Domain, &mut lists).await;
        assert!(result.is_err());
    }
}
