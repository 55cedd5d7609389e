//! Schema migrations, applied in order on open.

pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "news table with unique link, country/published indexes",
        sql: r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS news (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    country        TEXT NOT NULL,
    title          TEXT NOT NULL,
    original_title TEXT NOT NULL,
    link           TEXT NOT NULL UNIQUE,
    published      TEXT NOT NULL DEFAULT 'unknown',
    sentiment      TEXT NOT NULL DEFAULT 'unknown',
    political_bias TEXT NOT NULL DEFAULT 'unknown',
    ingested_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_news_country ON news(country);
CREATE INDEX IF NOT EXISTS idx_news_published ON news(published);

INSERT OR IGNORE INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
