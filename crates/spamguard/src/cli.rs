use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::aggregator::{DEFAULT_FETCH_TIMEOUT, DEFAULT_UPDATE_INTERVAL_HOURS};
use crate::classifier::{DEFAULT_MODEL, DEFAULT_OLLAMA_URL};

#[derive(Parser)]
#[command(version, name = "spamguard", about = "Allow/deny list driven spam classification")]
pub struct Args {
    #[arg(long, global = true, env = "LISTS_DIR", value_name = "PATH", default_value = "data/lists")]
    pub lists_dir: PathBuf,
    #[arg(long, global = true, env = "WHITELIST_FILE", value_name = "PATH")]
    pub whitelist_file: Option<PathBuf>,
    #[arg(long, global = true, env = "BLACKLIST_FILE", value_name = "PATH")]
    pub blacklist_file: Option<PathBuf>,
    #[arg(long, global = true, env = "BLACKLIST_SOURCES_FILE", value_name = "PATH")]
    pub sources_file: Option<PathBuf>,
    #[arg(long, global = true, env = "LISTS_CACHE_DIR", value_name = "PATH")]
    pub cache_dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        env = "LIST_UPDATE_INTERVAL",
        value_name = "HOURS",
        default_value_t = DEFAULT_UPDATE_INTERVAL_HOURS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub update_interval_hours: u32,
    #[arg(long, global = true, env = "FORCE_LIST_UPDATE", default_value_t = false)]
    pub force_update: bool,
    #[arg(long, global = true, value_name = "SECONDS", default_value_t = DEFAULT_FETCH_TIMEOUT.as_secs())]
    pub fetch_timeout_secs: u64,
    #[arg(long, global = true, env = "OLLAMA_URL", value_name = "URL", default_value = DEFAULT_OLLAMA_URL)]
    pub ollama_url: String,
    #[arg(long, global = true, env = "SPAM_MODEL", value_name = "MODEL", default_value = DEFAULT_MODEL)]
    pub spam_model: String,
    #[arg(long, global = true, env = "LOG_PATH", value_name = "PATH", default_value = "spamguard.log")]
    pub log_file: PathBuf,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage the local whitelist
    Whitelist {
        #[command(subcommand)]
        action: ListAction,
    },
    /// Manage the local blacklist
    Blacklist {
        #[command(subcommand)]
        action: ListAction,
    },
    /// Load every list, refreshing stale external sources
    Update {
        #[arg(long)]
        force: bool,
    },
    /// Check a sender address (and optionally an IP) against the lists
    Check {
        address: String,
        #[arg(long, value_name = "IP")]
        ip: Option<String>,
    },
    /// Full decision: lists first, then the classifier
    Classify {
        #[arg(long, value_name = "FROM")]
        sender: String,
        #[arg(long, default_value = "")]
        subject: String,
        #[arg(long, default_value = "")]
        body: String,
        #[arg(long, value_name = "IP")]
        ip: Option<String>,
    },
    /// Show list and cache statistics
    Stats,
}

#[derive(Subcommand)]
pub enum ListAction {
    Add { entry: String },
    Remove { entry: String },
    Show,
}

impl Args {
    pub fn whitelist_path(&self) -> PathBuf {
        self.whitelist_file
            .clone()
            .unwrap_or_else(|| self.lists_dir.join("whitelist.txt"))
    }

    pub fn blacklist_path(&self) -> PathBuf {
        self.blacklist_file
            .clone()
            .unwrap_or_else(|| self.lists_dir.join("blacklist.txt"))
    }

    pub fn sources_path(&self) -> PathBuf {
        self.sources_file
            .clone()
            .unwrap_or_else(|| self.lists_dir.join("blacklist_sources.yaml"))
    }

    pub fn cache_path(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| self.lists_dir.join("external"))
    }
}
