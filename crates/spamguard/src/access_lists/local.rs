use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use thiserror::Error;

use super::parse::{classify_entry, parse_line, parse_list_file, InvalidEntry, ListEntry, ParseStats};
use super::AggregatedLists;
use crate::util::write_to_file;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalListKind {
    Whitelist,
    Blacklist,
}

impl LocalListKind {
    fn header(&self) -> &'static str {
        match self {
            LocalListKind::Whitelist => {
                "# Whitelist - one email address or domain per line\n\
                 # Example:\n\
                 # trusted@example.com\n\
                 # example.com\n\
                 # @example.org\n"
            }
            LocalListKind::Blacklist => {
                "# Blacklist - one email address or domain per line\n\
                 # Example:\n\
                 # spam@example.com\n\
                 # spammer-domain.com\n"
            }
        }
    }
}

impl fmt::Display for LocalListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalListKind::Whitelist => f.write_str("whitelist"),
            LocalListKind::Blacklist => f.write_str("blacklist"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ListEditError {
    #[error("invalid entry: {0}")]
    Invalid(#[from] InvalidEntry),
    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Added,
    AlreadyPresent,
    Removed,
    NotPresent,
}

/// Outcome of loading one local list into the aggregated sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalListReport {
    pub path: PathBuf,
    pub created: bool,
    pub stats: ParseStats,
    pub error: Option<String>,
}

/// Entries of a local list split by kind, sorted for display.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GroupedEntries {
    pub emails: Vec<String>,
    pub domains: Vec<String>,
}

impl GroupedEntries {
    pub fn len(&self) -> usize {
        self.emails.len() + self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A user maintained allow or deny list backed by a flat text file.
#[derive(Debug, Clone)]
pub struct LocalList {
    path: PathBuf,
    kind: LocalListKind,
    created: bool,
}

impl LocalList {
    /// Opens the list, creating the file with header comments if it's missing.
    pub async fn open(path: impl Into<PathBuf>, kind: LocalListKind) -> anyhow::Result<Self> {
        let path = path.into();

        let created = !tokio::fs::try_exists(&path)
            .await
            .with_context(|| format!("failed to check whether {:?} exists", path))?;

        if created {
            tracing::warn!(path = ?path, "Local {} not found, creating an empty one", kind);
            write_to_file(&path, kind.header())
                .await
                .with_context(|| format!("failed to create the {} file", kind))?;
        }

        Ok(LocalList { path, kind, created })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn was_created(&self) -> bool {
        self.created
    }

    pub(crate) async fn load_into(&self, lists: &mut AggregatedLists) -> LocalListReport {
        let (stats, error) = match parse_list_file(&self.path, &self.kind, lists).await {
            Ok(stats) => {
                tracing::info!(
                    path = ?self.path,
                    valid = stats.valid,
                    total = stats.valid + stats.invalid,
                    "Loaded local {}",
                    self.kind
                );
                (stats, None)
            }
            Err(e) => {
                tracing::error!(path = ?self.path, "Failed to load the local {}: {:#}", self.kind, e);
                (ParseStats::default(), Some(format!("{:#}", e)))
            }
        };

        LocalListReport {
            path: self.path.clone(),
            created: self.created,
            stats,
            error,
        }
    }

    async fn read_lines(&self) -> anyhow::Result<Vec<String>> {
        let data = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("error while reading {:?}", self.path))?;
        Ok(data.lines().map(str::to_owned).collect())
    }

    /// Cleaned, lowercased entries in file order, without duplicates.
    pub async fn entries(&self) -> anyhow::Result<Vec<String>> {
        let mut entries: Vec<String> = Vec::new();
        for line in self.read_lines().await? {
            if let Some(entry) = parse_line(&line).map(str::to_lowercase) {
                if !entries.contains(&entry) {
                    entries.push(entry);
                }
            }
        }
        Ok(entries)
    }

    pub async fn grouped_entries(&self) -> anyhow::Result<GroupedEntries> {
        let (mut emails, mut domains): (Vec<_>, Vec<_>) =
            self.entries().await?.into_iter().partition(|entry| entry.contains('@'));
        emails.sort();
        domains.sort();
        Ok(GroupedEntries { emails, domains })
    }

    pub async fn add(&self, entry: &str) -> Result<EditOutcome, ListEditError> {
        let entry = normalize(entry)?;
        if let ListEntry::Invalid(reason) = classify_entry(&entry, self.kind) {
            return Err(reason.into());
        }

        if self.entries().await?.contains(&entry) {
            return Ok(EditOutcome::AlreadyPresent);
        }

        let mut data = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("error while reading {:?}", self.path))?;
        if !data.is_empty() && !data.ends_with('\n') {
            data.push('\n');
        }
        data.push_str(&entry);
        data.push('\n');

        write_to_file(&self.path, &data).await?;
        tracing::info!(path = ?self.path, entry = %entry, "Added to {}", self.kind);

        Ok(EditOutcome::Added)
    }

    /// Drops every line holding the entry, other lines (comments included) are kept as is.
    pub async fn remove(&self, entry: &str) -> Result<EditOutcome, ListEditError> {
        let entry = normalize(entry)?;
        let lines = self.read_lines().await?;

        let retained: Vec<&str> = lines
            .iter()
            .map(String::as_str)
            .filter(|line| parse_line(line).map(str::to_lowercase).as_deref() != Some(entry.as_str()))
            .collect();

        if retained.len() == lines.len() {
            return Ok(EditOutcome::NotPresent);
        }

        let mut data = retained.join("\n");
        data.push('\n');
        write_to_file(&self.path, &data).await?;
        tracing::info!(path = ?self.path, entry = %entry, "Removed from {}", self.kind);

        Ok(EditOutcome::Removed)
    }
}

fn normalize(entry: &str) -> Result<String, InvalidEntry> {
    let entry = entry.trim().to_lowercase();
    if entry.contains('#') {
        return Err(InvalidEntry::CommentMarker(entry));
    }
    Ok(entry)
}
