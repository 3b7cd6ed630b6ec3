use serde::{Deserialize, Serialize};

/// Readable article content as reported by the extraction service.
/// `url` is the canonical URL after redirects, which is what gets stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub url: String,
    pub title: String,
    pub content: String,
}
