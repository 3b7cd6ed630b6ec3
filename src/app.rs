use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::db::PageStore;
use crate::error::Result;
use crate::ingest::{ArticleFetcher, IngestError, Ingester};
use crate::models::{PageSummary, Surrounding};
use crate::services::ExtractorClient;
use crate::tui::AppAction;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Feed,
    Reading,
}

// Message for a completed background save
pub struct AddResult {
    pub url: String,
    pub result: std::result::Result<i64, IngestError>,
}

pub struct App {
    // Data
    pub pages: Vec<PageSummary>,
    pub current: Option<Surrounding>,
    pub reading_text: Option<String>,

    // UI state
    pub view: View,
    pub selected_index: usize,
    pub scroll: u16,
    pub url_input_active: bool,
    pub url_input: String,
    pub show_help: bool,
    pub status: Option<String>,

    // Paging state
    next_cursor: Option<DateTime<Utc>>,
    end_of_feed: bool,
    page_size: u32,

    // Async state
    pub is_adding: bool,
    add_rx: mpsc::Receiver<AddResult>,
    add_tx: mpsc::Sender<AddResult>,

    // Services
    pub store: PageStore,
    ingester: Ingester,
    access_key: Option<String>,
    cancel: CancellationToken,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let store = PageStore::open(&config.db_path).await?;

        let fetcher: Arc<dyn ArticleFetcher> = Arc::new(ExtractorClient::new(
            config.extractor_api_url.clone(),
            config.extractor_api_key.clone(),
        ));
        let ingester = Ingester::new(store.clone(), fetcher, config.access_key.clone());

        let cancel = CancellationToken::new();
        let pages = store
            .list_pages(&cancel, config.page_size, Utc::now())
            .await?;
        let cursor = next_cursor(&pages, config.page_size);

        let (add_tx, add_rx) = mpsc::channel(1);

        Ok(Self {
            pages,
            current: None,
            reading_text: None,
            view: View::Feed,
            selected_index: 0,
            scroll: 0,
            url_input_active: false,
            url_input: String::new(),
            show_help: false,
            status: None,
            end_of_feed: cursor.is_none(),
            next_cursor: cursor,
            page_size: config.page_size,
            is_adding: false,
            add_rx,
            add_tx,
            store,
            ingester,
            access_key: config.access_key.clone(),
            cancel,
        })
    }

    pub fn selected_page(&self) -> Option<&PageSummary> {
        self.pages.get(self.selected_index)
    }

    pub async fn handle_action(&mut self, action: AppAction) -> Result<bool> {
        match action {
            AppAction::Quit => {
                // Aborts whatever the store and any background save are doing.
                self.cancel.cancel();
                return Ok(true);
            }

            AppAction::MoveUp => {
                if !self.pages.is_empty() && self.selected_index > 0 {
                    self.selected_index -= 1;
                }
            }

            AppAction::MoveDown => {
                let len = self.pages.len();
                if len > 0 && self.selected_index < len - 1 {
                    self.selected_index += 1;
                } else if len > 0 {
                    // At the bottom; try to pull in the next batch.
                    self.load_more().await?;
                    if self.selected_index < self.pages.len() - 1 {
                        self.selected_index += 1;
                    }
                }
            }

            AppAction::MoveToTop => {
                self.selected_index = 0;
            }

            AppAction::MoveToBottom => {
                if !self.pages.is_empty() {
                    self.selected_index = self.pages.len() - 1;
                }
            }

            AppAction::Select => {
                if let Some(page) = self.selected_page() {
                    let id = page.page_id;
                    self.open_page(id).await?;
                }
            }

            AppAction::Back => {
                self.view = View::Feed;
                self.current = None;
                self.reading_text = None;
                self.scroll = 0;
            }

            AppAction::NewerPage => {
                let id = self
                    .current
                    .as_ref()
                    .and_then(|s| s.next.as_ref())
                    .map(|p| p.page_id);
                if let Some(id) = id {
                    self.open_page(id).await?;
                }
            }

            AppAction::OlderPage => {
                let id = self
                    .current
                    .as_ref()
                    .and_then(|s| s.prev.as_ref())
                    .map(|p| p.page_id);
                if let Some(id) = id {
                    self.open_page(id).await?;
                }
            }

            AppAction::ScrollDown => {
                self.scroll = self.scroll.saturating_add(1);
            }

            AppAction::ScrollUp => {
                self.scroll = self.scroll.saturating_sub(1);
            }

            AppAction::OpenInBrowser => {
                let url = match self.view {
                    View::Reading => self.current.as_ref().map(|s| s.current.url.clone()),
                    View::Feed => self.selected_page().map(|p| p.url.clone()),
                };
                if let Some(url) = url {
                    let _ = open::that(&url);
                }
            }

            AppAction::DeletePage => {
                if let Some(page) = self.selected_page() {
                    let id = page.page_id;
                    match self.store.del_page(&self.cancel, id).await {
                        Ok(()) => self.status = Some("page deleted".to_string()),
                        Err(e) if e.is_not_found() => {
                            self.status = Some("page was already gone".to_string());
                        }
                        Err(e) => return Err(e.into()),
                    }
                    // Either way the row no longer exists; drop it locally.
                    self.pages.retain(|p| p.page_id != id);
                    let len = self.pages.len();
                    if len > 0 && self.selected_index >= len {
                        self.selected_index = len - 1;
                    }
                }
            }

            AppAction::Refresh => {
                self.status = None;
                self.reload_pages().await?;
            }

            AppAction::StartAdd => {
                self.url_input_active = true;
                self.url_input.clear();
            }

            AppAction::ShowHelp => {
                self.show_help = true;
            }

            AppAction::HideHelp => {
                self.show_help = false;
            }

            AppAction::UrlInputChar(c) => {
                self.url_input.push(c);
            }

            AppAction::UrlInputBackspace => {
                self.url_input.pop();
            }

            AppAction::UrlInputConfirm => {
                let url = self.url_input.trim().to_string();
                self.url_input_active = false;
                self.url_input.clear();
                if !url.is_empty() {
                    self.submit_url(url);
                }
            }

            AppAction::UrlInputCancel => {
                self.url_input_active = false;
                self.url_input.clear();
            }
        }

        Ok(false)
    }

    /// Loads the page behind `page_id` into the reading view. A page
    /// that vanished in the meantime falls back to the feed with a note.
    async fn open_page(&mut self, page_id: i64) -> Result<()> {
        match self.store.page_with_surrounding(&self.cancel, page_id).await {
            Ok(surrounding) => {
                self.reading_text = Some(page_text(&surrounding.current.content));
                self.current = Some(surrounding);
                self.scroll = 0;
                self.view = View::Reading;
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("Page {} disappeared: {}", page_id, e);
                self.status = Some("page is gone".to_string());
                self.pages.retain(|p| p.page_id != page_id);
                let len = self.pages.len();
                if len > 0 && self.selected_index >= len {
                    self.selected_index = len - 1;
                }
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Fetches the batch after the current one and appends it. The
    /// cursor is inclusive, so the boundary row comes back as the head
    /// of the new batch and gets dropped here.
    async fn load_more(&mut self) -> Result<()> {
        if self.end_of_feed {
            return Ok(());
        }
        let Some(cursor) = self.next_cursor else {
            return Ok(());
        };

        let batch = self
            .store
            .list_pages(&self.cancel, self.page_size, cursor)
            .await?;
        self.next_cursor = next_cursor(&batch, self.page_size);
        self.end_of_feed = self.next_cursor.is_none();

        let known: std::collections::HashSet<i64> =
            self.pages.iter().map(|p| p.page_id).collect();
        let before = self.pages.len();
        self.pages
            .extend(batch.into_iter().filter(|p| !known.contains(&p.page_id)));

        // A full batch of rows we already hold cannot advance the cursor
        // past their shared timestamp; stop asking.
        if self.pages.len() == before && self.next_cursor == Some(cursor) {
            self.end_of_feed = true;
        }
        Ok(())
    }

    async fn reload_pages(&mut self) -> Result<()> {
        let pages = self
            .store
            .list_pages(&self.cancel, self.page_size, Utc::now())
            .await?;
        self.next_cursor = next_cursor(&pages, self.page_size);
        self.end_of_feed = self.next_cursor.is_none();
        self.pages = pages;

        let len = self.pages.len();
        if len == 0 {
            self.selected_index = 0;
        } else if self.selected_index >= len {
            self.selected_index = len - 1;
        }
        Ok(())
    }

    /// Starts saving a URL in the background. One save at a time; the
    /// outcome comes back through `poll_add_result`.
    fn submit_url(&mut self, url: String) {
        if self.is_adding {
            self.status = Some("still saving the previous page".to_string());
            return;
        }
        self.is_adding = true;
        self.status = Some(format!("saving {url}..."));

        let ingester = self.ingester.clone();
        let key = self.access_key.clone();
        let cancel = self.cancel.child_token();
        let tx = self.add_tx.clone();

        tokio::spawn(async move {
            let result = ingester.ingest(&cancel, &url, key.as_deref()).await;
            let _ = tx.send(AddResult { url, result }).await;
        });
    }

    /// Poll for a completed save (non-blocking)
    pub async fn poll_add_result(&mut self) -> Result<()> {
        if let Ok(added) = self.add_rx.try_recv() {
            self.is_adding = false;
            match added.result {
                Ok(page_id) => {
                    self.status = Some(format!("saved page #{page_id}"));
                    self.reload_pages().await?;
                }
                Err(e) => {
                    tracing::error!("Failed to save {}: {}", added.url, e);
                    self.status = Some(match &e {
                        IngestError::Store(err) if err.is_conflict() => {
                            "already bookmarked".to_string()
                        }
                        IngestError::EmptyUrl => "no URL provided".to_string(),
                        IngestError::InvalidKey => "invalid access key".to_string(),
                        other => format!("save failed: {other}"),
                    });
                }
            }
        }
        Ok(())
    }

    /// Saves a single page without entering the TUI. The key is passed
    /// through exactly as given so scripted callers face the same access
    /// check as remote ones.
    pub async fn add_page_headless(&self, url: &str, key: Option<&str>) -> Result<i64> {
        let page_id = self.ingester.ingest(&self.cancel, url, key).await?;
        Ok(page_id)
    }
}

/// The cursor for the batch after `batch`, or `None` when `batch` was
/// the last one. A short batch means the store ran out of rows.
fn next_cursor(batch: &[PageSummary], page_size: u32) -> Option<DateTime<Utc>> {
    if batch.len() < page_size as usize {
        return None;
    }
    batch.last().map(|p| p.created_at)
}

/// Renders stored HTML into plain text for the reading pane. Wrapping
/// happens at draw time, so the conversion width just needs to be wide
/// enough to never insert its own line breaks.
fn page_text(content: &str) -> String {
    html2text::from_read(content.as_bytes(), 10_000).unwrap_or_else(|_| content.to_string())
}

/// Human readable age of a timestamp, coarse on purpose.
pub fn timeago(t: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(t);

    let days = duration.num_days();
    if days > 1 {
        return format!("{days} days ago");
    }
    if days == 1 {
        return "1 day ago".to_string();
    }

    let hours = duration.num_hours();
    if hours > 1 {
        return format!("{hours} hours ago");
    }
    if hours == 1 {
        return "1 hour ago".to_string();
    }

    let minutes = duration.num_minutes();
    if minutes > 1 {
        return format!("{minutes} minutes ago");
    }
    if minutes == 1 {
        return "1 minute ago".to_string();
    }

    "just now".to_string()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn test_config(db_path: &str) -> Config {
        Config {
            db_path: db_path.to_string(),
            extractor_api_url: "http://localhost:0".to_string(),
            extractor_api_key: None,
            access_key: None,
            page_size: 25,
        }
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, minute, 0).unwrap()
    }

    #[test]
    fn timeago_picks_the_coarsest_unit() {
        let now = Utc::now();
        assert_eq!(timeago(now - chrono::Duration::days(3)), "3 days ago");
        assert_eq!(timeago(now - chrono::Duration::hours(26)), "1 day ago");
        assert_eq!(timeago(now - chrono::Duration::hours(5)), "5 hours ago");
        assert_eq!(timeago(now - chrono::Duration::minutes(90)), "1 hour ago");
        assert_eq!(timeago(now - chrono::Duration::minutes(12)), "12 minutes ago");
        assert_eq!(timeago(now - chrono::Duration::seconds(90)), "1 minute ago");
        assert_eq!(timeago(now - chrono::Duration::seconds(30)), "just now");
    }

    #[test]
    fn next_cursor_only_continues_after_full_batches() {
        let full: Vec<PageSummary> = (0..3)
            .map(|i| PageSummary {
                page_id: i,
                url: format!("https://example.com/{i}"),
                title: format!("P{i}"),
                created_at: at(3 - i as u32),
            })
            .collect();

        assert_eq!(next_cursor(&full, 3), Some(full[2].created_at));
        assert_eq!(next_cursor(&full, 4), None);
        assert_eq!(next_cursor(&[], 3), None);
    }

    #[test]
    fn page_text_strips_markup() {
        let text = page_text("<p>Hello <b>world</b></p>");
        assert!(text.contains("Hello"));
        assert!(text.contains("world"));
    }

    #[tokio::test]
    async fn url_input_flow_feeds_the_popup_state() {
        let mut app = App::new(&test_config(":memory:")).await.unwrap();

        app.handle_action(AppAction::StartAdd).await.unwrap();
        assert!(app.url_input_active);

        for c in "https://x".chars() {
            app.handle_action(AppAction::UrlInputChar(c)).await.unwrap();
        }
        assert_eq!(app.url_input, "https://x");

        app.handle_action(AppAction::UrlInputBackspace).await.unwrap();
        assert_eq!(app.url_input, "https://");

        app.handle_action(AppAction::UrlInputCancel).await.unwrap();
        assert!(!app.url_input_active);
        assert!(app.url_input.is_empty());
    }

    #[tokio::test]
    async fn delete_action_removes_the_selected_row() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db_path = db_path.to_str().unwrap();

        let cancel = CancellationToken::new();
        let store = PageStore::open(db_path).await.unwrap();
        store.add_page(&cancel, "https://a", "A", "").await.unwrap();
        store.add_page(&cancel, "https://b", "B", "").await.unwrap();

        let mut app = App::new(&test_config(db_path)).await.unwrap();
        assert_eq!(app.pages.len(), 2);

        // Newest first, so the selection starts on B.
        let quit = app.handle_action(AppAction::DeletePage).await.unwrap();
        assert!(!quit);
        assert_eq!(app.pages.len(), 1);
        assert_eq!(app.pages[0].url, "https://a");

        let left = app.store.list_pages(&cancel, 10, Utc::now()).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].url, "https://a");
    }

    #[tokio::test]
    async fn moving_past_the_bottom_loads_the_next_batch() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db_path = db_path.to_str().unwrap();

        let store = PageStore::open(db_path).await.unwrap();
        for i in 0..5 {
            store
                .add_page_at(&format!("https://example.com/{i}"), &format!("P{i}"), "", at(i))
                .await
                .unwrap();
        }

        let mut config = test_config(db_path);
        config.page_size = 2;
        let mut app = App::new(&config).await.unwrap();
        assert_eq!(app.pages.len(), 2);

        // Walk well past the bottom; every step over the edge pulls in
        // another batch without duplicating the boundary row.
        for _ in 0..10 {
            app.handle_action(AppAction::MoveDown).await.unwrap();
        }

        let ids: Vec<i64> = app.pages.iter().map(|p| p.page_id).collect();
        let mut deduped = ids.clone();
        deduped.dedup();
        assert_eq!(ids, deduped);
        assert_eq!(app.pages.len(), 5);
        assert_eq!(app.selected_index, 4);
    }

    #[tokio::test]
    async fn reading_view_walks_between_neighbors() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db_path = db_path.to_str().unwrap();

        let store = PageStore::open(db_path).await.unwrap();
        let a = store.add_page_at("https://a", "A", "<p>a</p>", at(1)).await.unwrap();
        let b = store.add_page_at("https://b", "B", "<p>b</p>", at(2)).await.unwrap();
        let c = store.add_page_at("https://c", "C", "<p>c</p>", at(3)).await.unwrap();

        let mut app = App::new(&test_config(db_path)).await.unwrap();

        // Select the middle page (index 1 in newest-first order).
        app.handle_action(AppAction::MoveDown).await.unwrap();
        app.handle_action(AppAction::Select).await.unwrap();
        assert_eq!(app.view, View::Reading);
        assert!(app.reading_text.is_some());

        let current = app.current.as_ref().unwrap();
        assert_eq!(current.current.page_id, b);
        assert_eq!(current.prev.as_ref().unwrap().page_id, a);
        assert_eq!(current.next.as_ref().unwrap().page_id, c);

        app.handle_action(AppAction::NewerPage).await.unwrap();
        let current = app.current.as_ref().unwrap();
        assert_eq!(current.current.page_id, c);
        assert!(current.next.is_none());

        app.handle_action(AppAction::Back).await.unwrap();
        assert_eq!(app.view, View::Feed);
        assert!(app.current.is_none());
        assert!(app.reading_text.is_none());
    }
}
