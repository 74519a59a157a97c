use spamguard_common::{Verdict, VerdictSource};

use crate::access_lists::AggregatedLists;
use crate::classifier::{MessageSummary, SpamClassifier};

/// Final spam/ham decision for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub is_spam: bool,
    pub reason: String,
    pub source: VerdictSource,
}

/// Answers list queries against a loaded snapshot.
///
/// Whitelist always beats blacklist, and within one list an exact address
/// beats its domain. Only an `Unknown` verdict reaches the classifier.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationGate<'a> {
    lists: &'a AggregatedLists,
}

impl<'a> ClassificationGate<'a> {
    pub fn new(lists: &'a AggregatedLists) -> Self {
        ClassificationGate { lists }
    }

    pub fn check_email(&self, address: &str) -> Verdict {
        let address = address.trim();
        let normalized = address.to_lowercase();
        let Some((_, domain)) = normalized.split_once('@') else {
            return Verdict::Unknown;
        };
        let domain = domain.split('@').next().unwrap_or(domain);

        if self.lists.whitelist_emails.contains(&normalized) {
            tracing::info!(address, "Sender is whitelisted");
            return Verdict::Whitelisted(format!("Whitelist: {}", address));
        }
        if !domain.is_empty() && self.lists.whitelist_domains.contains(domain) {
            tracing::info!(domain, "Sender domain is whitelisted");
            return Verdict::Whitelisted(format!("Whitelist: @{}", domain));
        }

        if self.lists.blacklist_emails.contains(&normalized) {
            tracing::info!(address, "Sender is blacklisted");
            return Verdict::Blacklisted(format!("Blacklist: {}", address));
        }
        if !domain.is_empty() && self.lists.blacklist_domains.contains(domain) {
            tracing::info!(domain, "Sender domain is blacklisted");
            return Verdict::Blacklisted(format!("Blacklist: @{}", domain));
        }

        Verdict::Unknown
    }

    /// IPs can only be blacklisted, there is no IP whitelist.
    pub fn check_ip(&self, ip: &str) -> Verdict {
        let ip = ip.trim();
        if !ip.is_empty() && self.lists.blacklist_ips.contains(ip) {
            tracing::info!(ip, "Sender IP is blacklisted");
            return Verdict::Blacklisted(format!("Blacklist IP: {}", ip));
        }

        Verdict::Unknown
    }

    /// List checks first, the classifier only for senders no list knows about.
    pub async fn classify<C: SpamClassifier>(&self, classifier: &C, message: &MessageSummary) -> Decision {
        let sender = extract_address(&message.sender);

        let mut verdict = self.check_email(sender);
        if !verdict.is_known() {
            if let Some(ip) = message.ip.as_deref() {
                verdict = self.check_ip(ip);
            }
        }

        match verdict {
            Verdict::Whitelisted(reason) => Decision {
                is_spam: false,
                reason,
                source: VerdictSource::Whitelist,
            },
            Verdict::Blacklisted(reason) => Decision {
                is_spam: true,
                reason,
                source: VerdictSource::Blacklist,
            },
            Verdict::Unknown => {
                let verdict = classifier.classify(sender, &message.subject, &message.body).await;
                Decision {
                    is_spam: verdict.is_spam,
                    reason: verdict.rationale,
                    source: VerdictSource::Classifier,
                }
            }
        }
    }
}

/// Pulls the bare address out of a `From`-style value: `Jane <jane@x.com>` -> `jane@x.com`.
pub fn extract_address(sender: &str) -> &str {
    let sender = sender.trim();
    match (sender.rfind('<'), sender.rfind('>')) {
        (Some(start), Some(end)) if start < end => sender[start + 1..end].trim(),
        _ => sender,
    }
}
