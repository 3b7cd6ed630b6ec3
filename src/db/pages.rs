use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;
use tokio_util::sync::CancellationToken;

use crate::models::{Page, PageSummary, Surrounding};

use super::error::StoreError;
use super::schema::SCHEMA;

/// Durable store of pages ordered by creation time.
///
/// All statements run on the connection's background thread, which
/// serializes them; clones share that connection. Every operation takes a
/// cancellation token and interrupts its statement when the token fires.
#[derive(Clone)]
pub struct PageStore {
    conn: Connection,
    interrupt: Arc<rusqlite::InterruptHandle>,
}

impl PageStore {
    /// Opens the database and ensures the schema. Safe to call on an
    /// existing database; never alters stored data.
    pub async fn open(db_path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)
            .await
            .map_err(StoreError::from_call)?;

        let interrupt = conn
            .call(|conn| {
                conn.execute_batch(SCHEMA)?;
                Ok(conn.get_interrupt_handle())
            })
            .await
            .map_err(StoreError::from_call)?;

        Ok(Self {
            conn,
            interrupt: Arc::new(interrupt),
        })
    }

    /// Inserts a new page and returns its id. The creation time is
    /// assigned here, never supplied by the caller. Fails with a
    /// Conflict kind when the URL is already bookmarked.
    pub async fn add_page(
        &self,
        cancel: &CancellationToken,
        url: &str,
        title: &str,
        content: &str,
    ) -> Result<i64, StoreError> {
        self.insert_page(cancel, url, title, content, Utc::now())
            .await
    }

    async fn insert_page(
        &self,
        cancel: &CancellationToken,
        url: &str,
        title: &str,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let url = url.to_string();
        let title = title.to_string();
        let content = content.to_string();
        let created_at = fmt_created_at(created_at);

        self.call(cancel, move |conn| {
            match conn.execute(
                "INSERT INTO pages (url, title, content, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![url, title, content, created_at],
            ) {
                Ok(_) => Ok(conn.last_insert_rowid()),
                Err(err) if is_unique_violation(&err) => {
                    Err(StoreError::conflict(err, "page already bookmarked").into())
                }
                Err(err) => Err(err.into()),
            }
        })
        .await
    }

    /// Deletes a page by id. A missing page reports NotFound, which is
    /// detected from the affected row count.
    pub async fn del_page(
        &self,
        cancel: &CancellationToken,
        page_id: i64,
    ) -> Result<(), StoreError> {
        self.call(cancel, move |conn| {
            let n = conn.execute("DELETE FROM pages WHERE page_id = ?1", params![page_id])?;
            if n != 1 {
                return Err(StoreError::not_found("page not found").into());
            }
            Ok(())
        })
        .await
    }

    /// Lists up to `limit` pages created at or before `created_lte`,
    /// newest first. To fetch the following batch, pass the last row's
    /// `created_at` back in; the boundary is inclusive, so that row
    /// returns as the head of the next batch. An empty result means the
    /// end was reached.
    pub async fn list_pages(
        &self,
        cancel: &CancellationToken,
        limit: u32,
        created_lte: DateTime<Utc>,
    ) -> Result<Vec<PageSummary>, StoreError> {
        let cursor = fmt_created_at(created_lte);

        self.call(cancel, move |conn| {
            let mut stmt = conn.prepare(
                r#"SELECT page_id, url, title, created_at
                   FROM pages
                   WHERE created_at <= ?1
                   ORDER BY created_at DESC, page_id DESC
                   LIMIT ?2"#,
            )?;
            let pages = stmt
                .query_map(params![cursor, limit], |row| page_summary_from_row(row))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(pages)
        })
        .await
    }

    /// Fetches a page together with its closest neighbors in creation
    /// order: `next` is the oldest page created strictly after it, `prev`
    /// the newest created strictly before. All three reads run inside a
    /// single transaction so the result is a consistent snapshot.
    pub async fn page_with_surrounding(
        &self,
        cancel: &CancellationToken,
        page_id: i64,
    ) -> Result<Surrounding, StoreError> {
        self.call(cancel, move |conn| {
            let tx = match conn.transaction() {
                Ok(tx) => tx,
                Err(err) => return Err(StoreError::tx_begin(err).into()),
            };

            // Keep the stored text form for the neighbor comparisons so
            // formatting differences cannot skew them.
            let (current, created_at_raw) = match tx.query_row(
                "SELECT page_id, url, title, content, created_at FROM pages WHERE page_id = ?1 LIMIT 1",
                params![page_id],
                |row| Ok((page_from_row(row)?, row.get::<_, String>(4)?)),
            ) {
                Ok(found) => found,
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    return Err(StoreError::not_found(format!("no page with id={page_id}")).into());
                }
                Err(err) => return Err(err.into()),
            };

            let next = tx
                .query_row(
                    r#"SELECT page_id, url, title, content, created_at
                       FROM pages
                       WHERE created_at > ?1
                       ORDER BY created_at ASC
                       LIMIT 1"#,
                    params![created_at_raw],
                    |row| page_from_row(row),
                )
                .optional()?;

            let prev = tx
                .query_row(
                    r#"SELECT page_id, url, title, content, created_at
                       FROM pages
                       WHERE created_at < ?1
                       ORDER BY created_at DESC
                       LIMIT 1"#,
                    params![created_at_raw],
                    |row| page_from_row(row),
                )
                .optional()?;

            if let Err(err) = tx.commit() {
                return Err(StoreError::tx_end(err).into());
            }

            Ok(Surrounding {
                prev,
                current,
                next,
            })
        })
        .await
    }

    /// Runs a closure on the connection thread, racing it against the
    /// cancellation token. The closure re-checks the token when the
    /// connection picks it up, so a call cancelled while still queued
    /// never executes its statement; a call cancelled mid-statement is
    /// interrupted. A statement that finishes in the same instant may
    /// still have taken effect.
    async fn call<F, T>(&self, cancel: &CancellationToken, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> tokio_rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        if cancel.is_cancelled() {
            return Err(StoreError::cancelled());
        }

        let token = cancel.clone();
        let running = Arc::new(AtomicBool::new(false));
        let closure_running = running.clone();
        let fut = self.conn.call(move |conn| {
            // Bail before touching the database if the caller gave up
            // while this closure sat queued behind other statements.
            if token.is_cancelled() {
                return Err(StoreError::cancelled().into());
            }
            closure_running.store(true, Ordering::SeqCst);
            let result = f(conn);
            closure_running.store(false, Ordering::SeqCst);
            result
        });
        tokio::pin!(fut);

        tokio::select! {
            result = &mut fut => result.map_err(StoreError::from_call),
            _ = cancel.cancelled() => {
                // The interrupt handle reaches whatever statement the
                // shared connection is on, so fire it only while this
                // call's own statement runs; a closure still in the
                // queue bails on its token check instead.
                if running.load(Ordering::SeqCst) {
                    self.interrupt.interrupt();
                    let _ = fut.await;
                }
                Err(StoreError::cancelled())
            }
        }
    }

    #[cfg(test)]
    pub(crate) async fn add_page_at(
        &self,
        url: &str,
        title: &str,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        self.insert_page(&CancellationToken::new(), url, title, content, created_at)
            .await
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

// Fixed precision keeps the text column ordered the same way as the
// timestamps it encodes.
fn fmt_created_at(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn created_at_from_row(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_created_at(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("invalid created_at: {raw}").into(),
        )
    })
}

fn page_from_row(row: &Row) -> rusqlite::Result<Page> {
    Ok(Page {
        page_id: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        created_at: created_at_from_row(row, 4)?,
    })
}

fn page_summary_from_row(row: &Row) -> rusqlite::Result<PageSummary> {
    Ok(PageSummary {
        page_id: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        created_at: created_at_from_row(row, 3)?,
    })
}
