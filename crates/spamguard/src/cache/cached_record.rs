use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use spamguard_common::RecordType;

/// Fetch metadata of one external source, keyed by source name in `metadata.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub last_update: DateTime<Utc>,
    pub url: String,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// SHA-1 of the last downloaded payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl CacheRecord {
    pub fn new(url: impl Into<String>, record_type: RecordType, checksum: Option<String>) -> Self {
        CacheRecord {
            last_update: Utc::now(),
            url: url.into(),
            record_type,
            checksum,
        }
    }

    pub(super) fn age_at(&self, now: DateTime<Utc>) -> TimeDelta {
        now - self.last_update
    }
}

/// Reads an RFC 3339 timestamp, or a naive ISO-8601 one taken as local time.
pub(super) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.with_timezone(&Utc));
    }

    let naive = raw.parse::<NaiveDateTime>().ok()?;
    Local
        .from_local_datetime(&naive)
        .single()
        .map(|timestamp| timestamp.with_timezone(&Utc))
}

fn deserialize_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp '{}'", raw)))
}

/// Renders an age with its two coarsest units, always rounding down.
pub fn format_age(age: TimeDelta) -> String {
    let seconds = age.num_seconds().max(0);
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}
