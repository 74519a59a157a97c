use std::time::Duration;

use anyhow::Context as _;
use chrono::TimeDelta;
use spamguard_common::Verdict;

use crate::access_lists::{EditOutcome, LocalList, LocalListKind};
use crate::aggregator::{AggregatorConfig, ListAggregator, LoadReport, LoadedLists, SourceStatus};
use crate::cache::CacheStore;
use crate::classifier::{MessageSummary, OllamaClassifier};
use crate::cli::{Command, ListAction};
use crate::sources::SourceRegistry;
use crate::{Args, ClassificationGate};

pub struct App;

impl App {
    pub async fn run(args: Args) -> anyhow::Result<()> {
        match &args.command {
            Command::Whitelist { action } => App::edit_list(&args, LocalListKind::Whitelist, action).await,
            Command::Blacklist { action } => App::edit_list(&args, LocalListKind::Blacklist, action).await,
            Command::Update { force } => {
                let mut aggregator = App::build_aggregator(&args).await?;
                let LoadedLists { lists, report } = aggregator.load_all(*force || args.force_update).await;
                print_report(&report);
                print_stats(&aggregator, &lists);
                Ok(())
            }
            Command::Check { address, ip } => {
                let mut aggregator = App::build_aggregator(&args).await?;
                let LoadedLists { lists, .. } = aggregator.load_all(args.force_update).await;
                let gate = ClassificationGate::new(&lists);

                println!("{}: {}", address, describe(&gate.check_email(address)));
                if let Some(ip) = ip {
                    println!("{}: {}", ip, describe(&gate.check_ip(ip)));
                }
                Ok(())
            }
            Command::Classify {
                sender,
                subject,
                body,
                ip,
            } => {
                let mut aggregator = App::build_aggregator(&args).await?;
                let LoadedLists { lists, .. } = aggregator.load_all(args.force_update).await;
                let classifier = OllamaClassifier::new(&args.ollama_url, args.spam_model.clone())
                    .context("failed to set up the classifier")?;
                if !classifier.is_available().await {
                    tracing::warn!(url = %args.ollama_url, "Ollama is not reachable, unknown senders will be treated as ham");
                }

                let message = MessageSummary {
                    sender: sender.clone(),
                    subject: subject.clone(),
                    body: body.clone(),
                    ip: ip.clone(),
                };
                let decision = ClassificationGate::new(&lists).classify(&classifier, &message).await;

                let label = if decision.is_spam { "SPAM" } else { "HAM" };
                println!("{} ({:?}): {}", label, decision.source, decision.reason);
                Ok(())
            }
            Command::Stats => {
                let mut aggregator = App::build_aggregator(&args).await?;
                let LoadedLists { lists, .. } = aggregator.load_all(args.force_update).await;
                print_stats(&aggregator, &lists);
                Ok(())
            }
        }
    }

    pub async fn build_aggregator(args: &Args) -> anyhow::Result<ListAggregator> {
        let config = AggregatorConfig {
            whitelist_path: args.whitelist_path(),
            blacklist_path: args.blacklist_path(),
            update_interval: TimeDelta::hours(args.update_interval_hours.into()),
            fetch_timeout: Duration::from_secs(args.fetch_timeout_secs),
        };
        let registry = SourceRegistry::load(&args.sources_path()).await;
        let cache = CacheStore::load(args.cache_path()).await;

        ListAggregator::new(config, registry, cache).context("failed to set up the list aggregator")
    }

    async fn edit_list(args: &Args, kind: LocalListKind, action: &ListAction) -> anyhow::Result<()> {
        let path = match kind {
            LocalListKind::Whitelist => args.whitelist_path(),
            LocalListKind::Blacklist => args.blacklist_path(),
        };
        let list = LocalList::open(path, kind).await?;
        if list.was_created() {
            println!("Created the {} at {}", kind, list.path().display());
        }

        match action {
            ListAction::Add { entry } => match list.add(entry).await.context("failed to add the entry")? {
                EditOutcome::AlreadyPresent => println!("'{}' is already on the {}", entry.trim(), kind),
                _ => println!("Added to the {}: {}", kind, entry.trim().to_lowercase()),
            },
            ListAction::Remove { entry } => match list.remove(entry).await.context("failed to remove the entry")? {
                EditOutcome::NotPresent => println!("'{}' is not on the {}", entry.trim(), kind),
                _ => println!("Removed from the {}: {}", kind, entry.trim().to_lowercase()),
            },
            ListAction::Show => {
                let grouped = list.grouped_entries().await?;
                println!("{} ({})", kind.to_string().to_uppercase(), list.path().display());
                if grouped.is_empty() {
                    println!("  (empty)");
                }
                if !grouped.emails.is_empty() {
                    println!("Email addresses ({}):", grouped.emails.len());
                    grouped.emails.iter().for_each(|email| println!("  {}", email));
                }
                if !grouped.domains.is_empty() {
                    println!("Domains ({}):", grouped.domains.len());
                    grouped.domains.iter().for_each(|domain| println!("  {}", domain));
                }
                println!("Total: {} entries", grouped.len());
            }
        }

        Ok(())
    }
}

fn describe(verdict: &Verdict) -> String {
    match verdict {
        Verdict::Whitelisted(reason) => format!("not spam ({})", reason),
        Verdict::Blacklisted(reason) => format!("spam ({})", reason),
        Verdict::Unknown => "unknown, the classifier decides".into(),
    }
}

fn print_report(report: &LoadReport) {
    for local in [&report.whitelist, &report.blacklist] {
        match &local.error {
            Some(error) => println!("{}: failed ({})", local.path.display(), error),
            None => println!(
                "{}: {} valid, {} skipped{}",
                local.path.display(),
                local.stats.valid,
                local.stats.invalid,
                if local.created { " (created)" } else { "" }
            ),
        }
    }

    for source in report.sources.iter() {
        let status = match &source.status {
            SourceStatus::Cached { age, entries } => format!("{} entries from cache (age {})", entries, age),
            SourceStatus::Fetched { entries, unchanged } => format!(
                "{} entries fetched{}",
                entries,
                if *unchanged { ", unchanged" } else { "" }
            ),
            SourceStatus::StaleFallback { error, entries } => {
                format!("{} entries from stale cache ({})", entries, error)
            }
            SourceStatus::Inactive { error } => format!("inactive ({})", error),
        };
        println!("{}: {}", source.name, status);
    }
}

fn print_stats(aggregator: &ListAggregator, lists: &crate::AggregatedLists) {
    let stats = lists.stats();
    println!(
        "Whitelist: {} emails, {} domains ({} total)",
        stats.whitelist_emails,
        stats.whitelist_domains,
        stats.whitelist_total()
    );
    println!(
        "Blacklist: {} emails, {} domains, {} IPs ({} total)",
        stats.blacklist_emails,
        stats.blacklist_domains,
        stats.blacklist_ips,
        stats.blacklist_total()
    );

    let cache = aggregator.cache();
    println!("Cache: {}", cache.dir().display());
    for (name, record) in cache.records() {
        println!(
            "  {}: last update {} ({} ago)",
            name,
            record.last_update.to_rfc3339(),
            cache.age_label(name)
        );
    }
}
