use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bookmarked page. Immutable once stored, apart from deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub page_id: i64,
    pub url: String,
    pub title: String,
    pub content: String,
    /// Assigned by the store at insertion time; the sole ordering key.
    pub created_at: DateTime<Utc>,
}

/// Listing row. `content` is deliberately absent, listings never load it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSummary {
    pub page_id: i64,
    pub url: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// A page together with its closest neighbors in creation order.
/// `next` was created after `current`, `prev` before; either end of the
/// timeline has none.
#[derive(Debug, Clone)]
pub struct Surrounding {
    pub prev: Option<Page>,
    pub current: Page,
    pub next: Option<Page>,
}
