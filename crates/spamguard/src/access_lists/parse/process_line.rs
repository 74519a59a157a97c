use spamguard_common::RecordType;

use super::parsers::{classify_entry, InvalidEntry, ListEntry};
use crate::access_lists::{AggregatedLists, LocalListKind};

/// Routes a single parsed line into the matching set of [`AggregatedLists`].
pub(crate) trait ProcessLine {
    fn process_line(&self, entry: &str, lists: &mut AggregatedLists) -> Result<(), InvalidEntry>;
}

impl ProcessLine for LocalListKind {
    fn process_line(&self, entry: &str, lists: &mut AggregatedLists) -> Result<(), InvalidEntry> {
        let (emails, domains) = match self {
            LocalListKind::Whitelist => (&mut lists.whitelist_emails, &mut lists.whitelist_domains),
            LocalListKind::Blacklist => (&mut lists.blacklist_emails, &mut lists.blacklist_domains),
        };

        match classify_entry(entry, *self) {
            ListEntry::Email(email) => {
                emails.insert(email);
            }
            ListEntry::Domain(domain) => {
                domains.insert(domain);
            }
            ListEntry::Invalid(reason) => return Err(reason),
        }

        Ok(())
    }
}

impl ProcessLine for RecordType {
    fn process_line(&self, entry: &str, lists: &mut AggregatedLists) -> Result<(), InvalidEntry> {
        match self {
            RecordType::Ip => {
                lists.blacklist_ips.insert(entry.into());
            }
            RecordType::Domain => {
                lists.blacklist_domains.insert(entry.to_lowercase());
            }
            RecordType::Email => {
                lists.blacklist_emails.insert(entry.to_lowercase());
            }
            RecordType::IpCidr => {
                // Only the network address is kept, the prefix length is dropped
                let address = entry.split('/').next().unwrap_or(entry);
                lists.blacklist_ips.insert(address.into());
            }
        }

        Ok(())
    }
}
