use anyhow::Context as _;

/// Downloads a list payload as plain text. Non-2xx responses are errors.
pub(super) async fn fetch_list(client: &reqwest::Client, url: &str) -> anyhow::Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .context("error while requesting the list")?
        .error_for_status()
        .context("list host returned an error status")?;

    response.text().await.context("error while reading the list body")
}
