mod logging;
pub use logging::setup_logging;
mod access_lists;
pub use access_lists::{
    classify_entry, parse_line, AggregatedLists, EditOutcome, GroupedEntries, InvalidEntry, ListEditError,
    ListEntry, ListStats, LocalList, LocalListKind, LocalListReport, ParseStats, MAX_ENTRY_LENGTH,
};
mod sources;
pub use sources::{ListSource, RegistryError, SourceError, SourceRegistry};
mod cache;
pub use cache::{format_age, CacheRecord, CacheStore, METADATA_FILE_NAME};
mod aggregator;
pub use aggregator::{
    AggregatorConfig, ListAggregator, LoadReport, LoadedLists, SourceReport, SourceStatus,
    DEFAULT_FETCH_TIMEOUT, DEFAULT_UPDATE_INTERVAL_HOURS,
};
mod gate;
pub use gate::{extract_address, ClassificationGate, Decision};
mod classifier;
pub use classifier::{ClassifierVerdict, MessageSummary, OllamaClassifier, SpamClassifier};
mod cli;
pub use cli::{Args, Command, ListAction};
mod app;
pub use app::App;
mod util;

#[cfg(test)]
pub(crate) mod test_utils;

pub use spamguard_common::{RecordType, Verdict, VerdictSource};
