use std::path::Path;
use std::time::Duration;

use anyhow::Context;

/// HTTP client whose every request is bounded by `timeout`.
pub fn http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build the HTTP client")
}

/// Writes `data` to `path`, creating any missing parent directories.
pub async fn write_to_file(path: &Path, data: impl AsRef<[u8]>) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("error while creating parent directories for {:?}", path))?;
    }

    tokio::fs::write(path, data)
        .await
        .with_context(|| format!("error while writing to {:?}", path))
}

/// Reads a file to a string, treating a missing file as `None`.
pub async fn read_optional(path: &Path) -> anyhow::Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(anyhow::anyhow!("error while reading {:?}: {}", path, e)),
    }
}
