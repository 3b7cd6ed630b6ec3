pub const SCHEMA: &str = r#"
-- pages table
-- created_at holds fixed precision RFC 3339 UTC text, so lexicographic
-- order in SQL is chronological order. AUTOINCREMENT keeps ids from being
-- reused after deletes.
CREATE TABLE IF NOT EXISTS pages (
    page_id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pages_created_at ON pages(created_at DESC);
"#;
