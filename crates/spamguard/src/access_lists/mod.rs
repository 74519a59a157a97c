mod aggregated;
mod local;
mod parse;

pub use aggregated::{AggregatedLists, ListStats};
pub use local::{EditOutcome, GroupedEntries, ListEditError, LocalList, LocalListKind, LocalListReport};
pub(crate) use parse::parse_list_content;
pub use parse::{classify_entry, parse_line, InvalidEntry, ListEntry, ParseStats, MAX_ENTRY_LENGTH};
