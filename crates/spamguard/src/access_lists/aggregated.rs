use std::collections::HashSet;

/// In-memory snapshot of every allow/deny entry known to a single load.
///
/// The same entry may sit in both a whitelist and a blacklist set; precedence
/// is resolved by [`ClassificationGate`](crate::ClassificationGate) at query time.
#[derive(Debug, Default, Clone)]
pub struct AggregatedLists {
    pub(crate) whitelist_emails: HashSet<String>,
    pub(crate) whitelist_domains: HashSet<String>,
    pub(crate) blacklist_emails: HashSet<String>,
    pub(crate) blacklist_domains: HashSet<String>,
    pub(crate) blacklist_ips: HashSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListStats {
    pub whitelist_emails: usize,
    pub whitelist_domains: usize,
    pub blacklist_emails: usize,
    pub blacklist_domains: usize,
    pub blacklist_ips: usize,
}

impl ListStats {
    pub fn whitelist_total(&self) -> usize {
        self.whitelist_emails + self.whitelist_domains
    }

    pub fn blacklist_total(&self) -> usize {
        self.blacklist_emails + self.blacklist_domains + self.blacklist_ips
    }
}

impl AggregatedLists {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn whitelist_emails(&self) -> &HashSet<String> {
        &self.whitelist_emails
    }

    pub fn whitelist_domains(&self) -> &HashSet<String> {
        &self.whitelist_domains
    }

    pub fn blacklist_emails(&self) -> &HashSet<String> {
        &self.blacklist_emails
    }

    pub fn blacklist_domains(&self) -> &HashSet<String> {
        &self.blacklist_domains
    }

    pub fn blacklist_ips(&self) -> &HashSet<String> {
        &self.blacklist_ips
    }

    pub fn stats(&self) -> ListStats {
        ListStats {
            whitelist_emails: self.whitelist_emails.len(),
            whitelist_domains: self.whitelist_domains.len(),
            blacklist_emails: self.blacklist_emails.len(),
            blacklist_domains: self.blacklist_domains.len(),
            blacklist_ips: self.blacklist_ips.len(),
        }
    }
}
