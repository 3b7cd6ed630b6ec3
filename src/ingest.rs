use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::db::{PageStore, StoreError};
use crate::models::Article;

/// Something that can turn a URL into readable article content.
#[async_trait]
pub trait ArticleFetcher: Send + Sync {
    async fn fetch(&self, cancel: &CancellationToken, url: &str) -> anyhow::Result<Article>;
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("no URL provided")]
    EmptyUrl,

    #[error("invalid access key")]
    InvalidKey,

    #[error("cannot fetch article: {0}")]
    Fetch(#[source] anyhow::Error),

    #[error("{0}")]
    Store(#[from] StoreError),
}

/// Saves new pages: validates the request, fetches readable content for
/// the URL, and stores the result.
#[derive(Clone)]
pub struct Ingester {
    store: PageStore,
    fetcher: Arc<dyn ArticleFetcher>,
    access_key: Option<String>,
}

impl Ingester {
    pub fn new(
        store: PageStore,
        fetcher: Arc<dyn ArticleFetcher>,
        access_key: Option<String>,
    ) -> Self {
        Self {
            store,
            fetcher,
            access_key,
        }
    }

    /// Fetches `url` and stores it as a new page, returning the page id.
    ///
    /// The URL is trimmed and rejected before any network traffic if it
    /// is empty, and the access key is checked first when one is
    /// configured. The stored URL is the one the fetcher reports, which
    /// may differ from the submitted one after redirects.
    pub async fn ingest(
        &self,
        cancel: &CancellationToken,
        url: &str,
        key: Option<&str>,
    ) -> Result<i64, IngestError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(IngestError::EmptyUrl);
        }

        if let Some(expected) = &self.access_key {
            if key != Some(expected.as_str()) {
                return Err(IngestError::InvalidKey);
            }
        }

        let article = self
            .fetcher
            .fetch(cancel, url)
            .await
            .map_err(IngestError::Fetch)?;

        let page_id = self
            .store
            .add_page(cancel, &article.url, &article.title, &article.content)
            .await?;

        tracing::debug!("Saved page {}: {}", page_id, article.url);
        Ok(page_id)
    }
}
