mod util;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
pub use util::sha1_hex;

/// Outcome of checking a sender or an IP against the allow/deny lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Whitelisted(String),
    Blacklisted(String),
    /// Not on any list, the classifier oracle has to decide
    Unknown,
}

impl Verdict {
    pub fn is_known(&self) -> bool {
        !matches!(self, Verdict::Unknown)
    }
}

/// Where a final spam/ham decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictSource {
    Whitelist,
    Blacklist,
    Classifier,
}

/// Record format of an external deny-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Ip,
    IpCidr,
    Domain,
    Email,
}

impl RecordType {
    pub const ALL: [RecordType; 4] = [RecordType::Ip, RecordType::IpCidr, RecordType::Domain, RecordType::Email];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Ip => "ip",
            RecordType::IpCidr => "ip_cidr",
            RecordType::Domain => "domain",
            RecordType::Email => "email",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown record type '{}'", s))
    }
}
