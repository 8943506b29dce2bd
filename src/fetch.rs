// src/fetch.rs

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::debug;
use url::Url;

/// Substitute an entity code into a `{code}` URL template and validate it.
pub fn page_url(template: &str, code: &str) -> Result<Url> {
    let raw = template.replace("{code}", code);
    Url::parse(&raw).with_context(|| format!("parsing page URL {}", raw))
}

/// Single GET of an HTML page. Transport and status errors are returned
/// as-is; there is no retry.
pub async fn fetch_page(client: &Client, url: &Url) -> Result<String> {
    debug!("Fetching text from {}", url);
    client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("GET {} failed", url))?
        .error_for_status()
        .with_context(|| format!("Non-success status {}", url))?
        .text()
        .await
        .with_context(|| format!("Reading text from {}", url))
}
