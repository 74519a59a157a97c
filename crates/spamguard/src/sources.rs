use std::path::{Path, PathBuf};

use anyhow::Context;
use hashlink::LinkedHashMap;
use serde_yaml::{Mapping, Value};
use spamguard_common::RecordType;
use thiserror::Error;

const REQUIRED_FIELDS: [&str; 3] = ["url", "type", "description"];

/// An external deny-list provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSource {
    pub name: String,
    pub url: String,
    pub record_type: RecordType,
    pub description: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("source name must be a string, found {0}")]
    InvalidName(&'static str),
    #[error("source name '{0}' can't be used as a cache file name")]
    UnsafeName(String),
    #[error("expected a mapping of fields, found {0}")]
    NotAMapping(&'static str),
    #[error("missing fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("invalid URL '{0}', expected http:// or https://")]
    InvalidUrl(String),
    #[error("invalid type '{0}', expected one of ip, ip_cidr, domain, email")]
    InvalidRecordType(String),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("YAML syntax error: {0}")]
    Syntax(#[from] serde_yaml::Error),
    #[error("expected a mapping of source names, found {0}")]
    NotAMapping(&'static str),
}

/// Validated set of external list sources, in file order.
#[derive(Debug, Default, Clone)]
pub struct SourceRegistry {
    sources: LinkedHashMap<String, ListSource>,
    rejected: Vec<(String, SourceError)>,
}

impl SourceRegistry {
    /// Loads the registry, seeding it from `<path>.example` when the file is missing.
    pub async fn load(path: &Path) -> Self {
        let mut template = path.as_os_str().to_owned();
        template.push(".example");
        SourceRegistry::load_with_template(path, &PathBuf::from(template)).await
    }

    pub async fn load_with_template(path: &Path, template: &Path) -> Self {
        match SourceRegistry::try_load(path, template).await {
            Ok(registry) => registry,
            Err(e) => {
                tracing::error!(path = ?path, "External blacklists won't be loaded: {:#}", e);
                SourceRegistry::default()
            }
        }
    }

    async fn try_load(path: &Path, template: &Path) -> anyhow::Result<Self> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            if !tokio::fs::try_exists(template).await.unwrap_or(false) {
                anyhow::bail!("source registry {:?} is missing and there is no template {:?}", path, template);
            }

            tracing::info!(path = ?path, template = ?template, "Creating the source registry from its template");
            tokio::fs::copy(template, path)
                .await
                .with_context(|| format!("failed to copy {:?} to {:?}", template, path))?;
        }

        let data = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("error while reading {:?}", path))?;

        let registry = SourceRegistry::parse(&data)?;
        if registry.is_empty() {
            tracing::warn!(path = ?path, "No valid external blacklist sources configured");
        } else {
            tracing::info!(path = ?path, sources = registry.len(), "Loaded blacklist sources");
        }

        Ok(registry)
    }

    /// Parses and validates registry YAML. Only a broken top-level structure is an error.
    pub fn parse(data: &str) -> Result<Self, RegistryError> {
        let mut registry = SourceRegistry::default();
        if data.trim().is_empty() {
            return Ok(registry);
        }

        let mapping = match serde_yaml::from_str::<Value>(data)? {
            // An empty file
            Value::Null => return Ok(registry),
            Value::Mapping(mapping) => mapping,
            other => return Err(RegistryError::NotAMapping(value_kind(&other))),
        };

        for (key, value) in mapping.iter() {
            let name = match key.as_str() {
                Some(name) => name.to_owned(),
                None => serde_yaml::to_string(key).unwrap_or_default().trim().to_owned(),
            };

            match validate_source(key, value) {
                Ok(source) => {
                    registry.sources.insert(source.name.clone(), source);
                }
                Err(e) => {
                    tracing::warn!(source = %name, "Skipping source: {}", e);
                    registry.rejected.push((name, e));
                }
            }
        }

        if !registry.rejected.is_empty() {
            tracing::warn!(skipped = registry.rejected.len(), "Invalid source entries were skipped");
        }

        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&ListSource> {
        self.sources.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ListSource> {
        self.sources.values()
    }

    pub fn enabled(&self) -> impl Iterator<Item = &ListSource> {
        self.iter().filter(|source| source.enabled)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn skipped(&self) -> usize {
        self.rejected.len()
    }

    pub fn rejected(&self) -> &[(String, SourceError)] {
        &self.rejected
    }
}

fn validate_source(key: &Value, value: &Value) -> Result<ListSource, SourceError> {
    let name = key.as_str().ok_or(SourceError::InvalidName(value_kind(key)))?;
    // The name doubles as the payload file name inside the cache directory
    if name.trim().is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return Err(SourceError::UnsafeName(name.to_owned()));
    }

    let Value::Mapping(fields) = value else {
        return Err(SourceError::NotAMapping(value_kind(value)));
    };

    let missing: Vec<_> = REQUIRED_FIELDS
        .into_iter()
        .filter(|field| !fields.contains_key(*field))
        .collect();
    if !missing.is_empty() {
        return Err(SourceError::MissingFields(missing));
    }

    let url = match field_str(fields, "url") {
        Some(url) if url.starts_with("http://") || url.starts_with("https://") => url.to_owned(),
        Some(url) => return Err(SourceError::InvalidUrl(url.to_owned())),
        None => return Err(SourceError::InvalidUrl(render(&fields["url"]))),
    };

    let record_type = match field_str(fields, "type") {
        Some(raw) => raw
            .parse::<RecordType>()
            .map_err(|_| SourceError::InvalidRecordType(raw.to_owned()))?,
        None => return Err(SourceError::InvalidRecordType(render(&fields["type"]))),
    };

    let description = field_str(fields, "description").map(str::to_owned).unwrap_or_default();

    let enabled = match fields.get("enabled") {
        None => true,
        Some(Value::Bool(enabled)) => *enabled,
        Some(other) => {
            tracing::warn!(source = %name, value = %render(other), "Invalid 'enabled' value, disabling the source");
            false
        }
    };

    Ok(ListSource {
        name: name.to_owned(),
        url,
        record_type,
        description,
        enabled,
    })
}

fn field_str<'a>(fields: &'a Mapping, field: &str) -> Option<&'a str> {
    fields.get(field).and_then(Value::as_str)
}

fn render(value: &Value) -> String {
    serde_yaml::to_string(value).unwrap_or_default().trim().to_owned()
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
