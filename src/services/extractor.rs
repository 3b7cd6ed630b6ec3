use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::ingest::ArticleFetcher;
use crate::models::Article;

/// Client for a Mercury style article extraction service.
///
/// The service answers `GET /parser?url=...` with the readable content
/// of the page as JSON. Fields it cannot extract come back null.
pub struct ExtractorClient {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ParserResponse {
    url: Option<String>,
    title: Option<String>,
    content: Option<String>,
}

impl ExtractorClient {
    pub fn new(api_url: String, api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            api_url,
            api_key,
        }
    }
}

#[async_trait]
impl ArticleFetcher for ExtractorClient {
    async fn fetch(&self, cancel: &CancellationToken, url: &str) -> anyhow::Result<Article> {
        let mut request = self
            .client
            .get(format!("{}/parser", self.api_url))
            .query(&[("url", url)]);

        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key.as_str());
        }

        // The whole exchange, body included, races the token so a
        // cancelled ingest stops downloading instead of riding out the
        // client timeout.
        let parsed = tokio::select! {
            parsed = async {
                let response = request.send().await.context("cannot reach extractor")?;
                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    let excerpt: String = body.chars().take(200).collect();
                    anyhow::bail!("invalid response {status}: {excerpt}");
                }
                response
                    .json::<ParserResponse>()
                    .await
                    .context("cannot decode response body")
            } => parsed?,
            _ = cancel.cancelled() => anyhow::bail!("operation cancelled"),
        };

        // The extractor reports the URL it ended up at, which is the one
        // worth storing. Fall back to the requested URL when it is silent.
        Ok(Article {
            url: parsed.url.unwrap_or_else(|| url.to_string()),
            title: parsed.title.unwrap_or_else(|| "Untitled".to_string()),
            content: parsed.content.unwrap_or_default(),
        })
    }
}
