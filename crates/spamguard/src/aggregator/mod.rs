mod upstream;

use std::path::PathBuf;
use std::time::Duration;

use chrono::TimeDelta;
use spamguard_common::sha1_hex;
use upstream::fetch_list;

use crate::access_lists::{parse_list_content, AggregatedLists, LocalList, LocalListKind, LocalListReport};
use crate::cache::{CacheRecord, CacheStore};
use crate::sources::{ListSource, SourceRegistry};
use crate::util::http_client;

pub const DEFAULT_UPDATE_INTERVAL_HOURS: u32 = 24;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub whitelist_path: PathBuf,
    pub blacklist_path: PathBuf,
    pub update_interval: TimeDelta,
    pub fetch_timeout: Duration,
}

/// How a single external source contributed to a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    /// Served from a cache younger than the update interval
    Cached { age: String, entries: usize },
    Fetched { entries: usize, unchanged: bool },
    /// The fetch failed, an older cached payload was used instead
    StaleFallback { error: String, entries: usize },
    /// The fetch failed and nothing was cached
    Inactive { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub name: String,
    pub status: SourceStatus,
}

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub whitelist: LocalListReport,
    pub blacklist: LocalListReport,
    pub sources: Vec<SourceReport>,
}

impl LoadReport {
    pub fn inactive_sources(&self) -> impl Iterator<Item = &str> {
        self.sources
            .iter()
            .filter(|report| matches!(report.status, SourceStatus::Inactive { .. }))
            .map(|report| report.name.as_str())
    }

    pub fn active_sources(&self) -> usize {
        self.sources.len() - self.inactive_sources().count()
    }
}

#[derive(Debug)]
pub struct LoadedLists {
    pub lists: AggregatedLists,
    pub report: LoadReport,
}

/// Merges the local allow/deny lists with every enabled external source.
///
/// Sources are processed one after another in registry order. A failing
/// source never aborts the load of the others.
pub struct ListAggregator {
    config: AggregatorConfig,
    registry: SourceRegistry,
    cache: CacheStore,
    client: reqwest::Client,
}

impl ListAggregator {
    pub fn new(config: AggregatorConfig, registry: SourceRegistry, cache: CacheStore) -> anyhow::Result<Self> {
        let client = http_client(config.fetch_timeout)?;
        Ok(ListAggregator::with_client(config, registry, cache, client))
    }

    pub fn with_client(
        config: AggregatorConfig,
        registry: SourceRegistry,
        cache: CacheStore,
        client: reqwest::Client,
    ) -> Self {
        ListAggregator {
            config,
            registry,
            cache,
            client,
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub async fn load_all(&mut self, force_update: bool) -> LoadedLists {
        tracing::info!(force_update, "Loading all lists");
        let mut lists = AggregatedLists::new();

        let whitelist = self
            .load_local(self.config.whitelist_path.clone(), LocalListKind::Whitelist, &mut lists)
            .await;
        let blacklist = self
            .load_local(self.config.blacklist_path.clone(), LocalListKind::Blacklist, &mut lists)
            .await;

        let enabled: Vec<ListSource> = self.registry.enabled().cloned().collect();
        if enabled.is_empty() {
            tracing::info!("No external blacklist sources enabled");
        }

        let mut sources = Vec::with_capacity(enabled.len());
        for source in enabled.iter() {
            let status = self.load_source(source, force_update, &mut lists).await;
            sources.push(SourceReport {
                name: source.name.clone(),
                status,
            });
        }

        let stats = lists.stats();
        tracing::info!(
            whitelist_emails = stats.whitelist_emails,
            whitelist_domains = stats.whitelist_domains,
            blacklist_emails = stats.blacklist_emails,
            blacklist_domains = stats.blacklist_domains,
            blacklist_ips = stats.blacklist_ips,
            "Lists loaded"
        );

        LoadedLists {
            lists,
            report: LoadReport {
                whitelist,
                blacklist,
                sources,
            },
        }
    }

    async fn load_local(&self, path: PathBuf, kind: LocalListKind, lists: &mut AggregatedLists) -> LocalListReport {
        match LocalList::open(&path, kind).await {
            Ok(list) => list.load_into(lists).await,
            Err(e) => {
                tracing::error!(path = ?path, "Failed to open the local {}: {:#}", kind, e);
                LocalListReport {
                    path,
                    created: false,
                    stats: Default::default(),
                    error: Some(format!("{:#}", e)),
                }
            }
        }
    }

    async fn load_source(&mut self, source: &ListSource, force_update: bool, lists: &mut AggregatedLists) -> SourceStatus {
        let name = source.name.as_str();

        if !force_update && self.cache.is_fresh(name, self.config.update_interval) {
            match self.cache.read_payload(name).await {
                Ok(Some(payload)) => {
                    let age = self.cache.age_label(name);
                    tracing::info!(source = %name, age = %age, "Cache is fresh, loading from cache");
                    let stats = parse_list_content(&payload, &source.record_type, lists, name);
                    return SourceStatus::Cached {
                        age,
                        entries: stats.valid,
                    };
                }
                Ok(None) => tracing::warn!(source = %name, "Cache metadata is fresh but the payload is missing"),
                Err(e) => tracing::warn!(source = %name, "Failed to read the cached payload: {:#}", e),
            }
        }

        tracing::info!(source = %name, url = %source.url, "Fetching {}", source.description);
        let body = match fetch_list(&self.client, &source.url).await {
            Ok(body) => body,
            Err(e) => return self.fall_back_to_cache(source, format!("{:#}", e), lists).await,
        };

        let checksum = sha1_hex(&body);
        let unchanged = self
            .cache
            .get(name)
            .and_then(|record| record.checksum.as_deref())
            .is_some_and(|previous| previous == checksum);

        let payload = match self.cache.write_payload(name, &body).await {
            Ok(()) => {
                self.cache
                    .record(name, CacheRecord::new(&source.url, source.record_type, Some(checksum)));
                self.cache.persist().await;

                // Parse what actually landed in the cache
                match self.cache.read_payload(name).await {
                    Ok(Some(payload)) => payload,
                    _ => body,
                }
            }
            Err(e) => {
                tracing::error!(source = %name, "Failed to cache the payload: {:#}", e);
                body
            }
        };

        let stats = parse_list_content(&payload, &source.record_type, lists, name);
        tracing::info!(source = %name, entries = stats.valid, unchanged, "External list loaded");

        SourceStatus::Fetched {
            entries: stats.valid,
            unchanged,
        }
    }

    async fn fall_back_to_cache(&self, source: &ListSource, error: String, lists: &mut AggregatedLists) -> SourceStatus {
        let name = source.name.as_str();
        tracing::error!(source = %name, "Failed to fetch the list: {}", error);

        match self.cache.read_payload(name).await {
            Ok(Some(payload)) => {
                tracing::warn!(source = %name, age = %self.cache.age_label(name), "Using stale cache");
                let stats = parse_list_content(&payload, &source.record_type, lists, name);
                SourceStatus::StaleFallback {
                    error,
                    entries: stats.valid,
                }
            }
            Ok(None) => {
                tracing::warn!(source = %name, "No cache available, source is inactive for this load");
                SourceStatus::Inactive { error }
            }
            Err(e) => {
                tracing::warn!(source = %name, "Cached payload is unreadable, source is inactive: {:#}", e);
                SourceStatus::Inactive { error }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use chrono::Utc;
    use spamguard_common::RecordType;

    use super::*;
    use crate::test_utils::{test_client, unreachable_url, TestServer};

    async fn build_aggregator(dir: &Path, registry_yaml: &str) -> ListAggregator {
        let config = AggregatorConfig {
            whitelist_path: dir.join("whitelist.txt"),
            blacklist_path: dir.join("blacklist.txt"),
            update_interval: TimeDelta::hours(24),
            fetch_timeout: Duration::from_secs(5),
        };
        let registry = SourceRegistry::parse(registry_yaml).expect("registry should be valid");
        let cache = CacheStore::load(dir.join("external")).await;

        let client = test_client(config.fetch_timeout);

        ListAggregator::with_client(config, registry, cache, client)
    }

    async fn seed_cache(dir: &Path, name: &str, record_type: RecordType, payload: &str, age: TimeDelta) {
        let mut cache = CacheStore::load(dir.join("external")).await;
        cache.write_payload(name, payload).await.unwrap();
        let mut record = CacheRecord::new("https://example.org/seeded.txt", record_type, None);
        record.last_update = Utc::now() - age;
        cache.record(name, record);
        assert!(cache.persist().await);
    }

    fn source_yaml(name: &str, url: &str, record_type: &str) -> String {
        format!("{}:\n  url: \"{}\"\n  type: {}\n  description: \"{} list\"\n", name, url, record_type, name)
    }

    #[tokio::test]
    async fn one_unreachable_source_does_not_abort_the_load() {
        let dir = tempfile::tempdir().unwrap();
        seed_cache(dir.path(), "domains", RecordType::Domain, "Spammer.Example\n", TimeDelta::hours(1)).await;
        seed_cache(dir.path(), "drop", RecordType::IpCidr, "203.0.113.0/24 # sbl\n", TimeDelta::hours(1)).await;

        let registry = [
            source_yaml("domains", &unreachable_url("/domains.txt").await, "domain"),
            source_yaml("down", &unreachable_url("/down.txt").await, "ip"),
            source_yaml("drop", &unreachable_url("/drop.txt").await, "ip_cidr"),
        ]
        .concat();
        let mut aggregator = build_aggregator(dir.path(), &registry).await;

        let LoadedLists { lists, report } = aggregator.load_all(false).await;

        assert!(lists.blacklist_domains().contains("spammer.example"));
        assert!(lists.blacklist_ips().contains("203.0.113.0"));
        assert_eq!(report.inactive_sources().collect::<Vec<_>>(), ["down"]);
        assert_eq!(report.active_sources(), 2);
        assert!(matches!(
            report.sources[0].status,
            SourceStatus::Cached { entries: 1, .. }
        ));
    }

    #[tokio::test]
    async fn fetched_payload_is_cached_and_reused() {
        let dir = tempfile::tempdir().unwrap();
        let server = TestServer::start(200, "# bad senders\nBulk@Spammer.Example\nspam@junk.example\n").await;
        let registry = source_yaml("emails", &server.url("/emails.txt"), "email");
        let mut aggregator = build_aggregator(dir.path(), &registry).await;

        let first = aggregator.load_all(false).await;
        assert_eq!(
            first.report.sources[0].status,
            SourceStatus::Fetched {
                entries: 2,
                unchanged: false
            }
        );
        assert!(first.lists.blacklist_emails().contains("bulk@spammer.example"));
        assert_eq!(server.hits(), 1);

        let cached = std::fs::read_to_string(dir.path().join("external").join("emails.txt")).unwrap();
        assert!(cached.contains("Bulk@Spammer.Example"));
        let record = aggregator.cache().get("emails").expect("fetch should be recorded");
        assert_eq!(record.record_type, RecordType::Email);
        assert!(record.checksum.is_some());

        // Fresh cache, no network
        let second = aggregator.load_all(false).await;
        assert!(matches!(second.report.sources[0].status, SourceStatus::Cached { entries: 2, .. }));
        assert_eq!(server.hits(), 1);

        // Forced refresh of an identical payload
        let third = aggregator.load_all(true).await;
        assert_eq!(
            third.report.sources[0].status,
            SourceStatus::Fetched {
                entries: 2,
                unchanged: true
            }
        );
        assert_eq!(server.hits(), 2);
    }

    #[tokio::test]
    async fn stale_cache_is_used_when_fetch_fails() {
        let dir = tempfile::tempdir().unwrap();
        seed_cache(dir.path(), "ips", RecordType::Ip, "192.0.2.10\n192.0.2.11\n", TimeDelta::days(3)).await;

        let registry = source_yaml("ips", &unreachable_url("/ips.txt").await, "ip");
        let mut aggregator = build_aggregator(dir.path(), &registry).await;

        let LoadedLists { lists, report } = aggregator.load_all(false).await;
        assert!(matches!(
            report.sources[0].status,
            SourceStatus::StaleFallback { entries: 2, .. }
        ));
        assert!(lists.blacklist_ips().contains("192.0.2.11"));
        assert_eq!(report.inactive_sources().count(), 0);
    }

    #[tokio::test]
    async fn error_status_without_cache_makes_source_inactive() {
        let dir = tempfile::tempdir().unwrap();
        let server = TestServer::start(503, "maintenance").await;
        let registry = source_yaml("flaky", &server.url("/list.txt"), "domain");
        let mut aggregator = build_aggregator(dir.path(), &registry).await;

        let LoadedLists { lists, report } = aggregator.load_all(false).await;
        assert!(matches!(report.sources[0].status, SourceStatus::Inactive { .. }));
        assert!(lists.blacklist_domains().is_empty());
        assert!(aggregator.cache().get("flaky").is_none());
    }

    #[tokio::test]
    async fn disabled_sources_are_not_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let server = TestServer::start(200, "spammer.example\n").await;
        let registry = format!("{}  enabled: false\n", source_yaml("off", &server.url("/off.txt"), "domain"));
        let mut aggregator = build_aggregator(dir.path(), &registry).await;

        let LoadedLists { lists, report } = aggregator.load_all(true).await;
        assert!(report.sources.is_empty());
        assert!(lists.blacklist_domains().is_empty());
        assert_eq!(server.hits(), 0);
    }

    #[tokio::test]
    async fn local_lists_are_created_and_merged() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("blacklist.txt"), "spam@bad.com\nbad.com\nbroken line\n").unwrap();
        seed_cache(dir.path(), "domains", RecordType::Domain, "bad.com\nworse.com\n", TimeDelta::hours(1)).await;

        let registry = source_yaml("domains", "https://example.org/domains.txt", "domain");
        let mut aggregator = build_aggregator(dir.path(), &registry).await;

        let LoadedLists { lists, report } = aggregator.load_all(false).await;

        assert!(report.whitelist.created);
        assert!(dir.path().join("whitelist.txt").exists());
        assert_eq!(report.blacklist.stats.valid, 2);
        assert_eq!(report.blacklist.stats.invalid, 1);

        let stats = lists.stats();
        assert_eq!(stats.blacklist_emails, 1);
        assert_eq!(stats.blacklist_domains, 2);
        assert_eq!(stats.whitelist_total(), 0);
    }
}
