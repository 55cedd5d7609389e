//! libSQL-backed news store with insert-if-absent semantics keyed by link.
//!
//! The `UNIQUE(link)` constraint plus `ON CONFLICT DO NOTHING` makes the insert
//! atomic per link; writes additionally go through one async lock so the
//! embedded database only ever sees a single writer.

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use libsql::{params, Connection, Database, Row};
use tokio::sync::Mutex;

use crate::error::PersistenceError;
use crate::model::{NewsItem, Published};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyPresent,
}

pub struct NewsStore {
    // Keeps the database open for as long as `conn` is in use.
    _db: Database,
    conn: Connection,
    write_lock: Mutex<()>,
}

const SELECT_COLUMNS: &str =
    "SELECT country, title, original_title, link, published, sentiment, political_bias, ingested_at FROM news";

// Dated rows newest first, then the "unknown" ones; id breaks ties.
const ORDER_CLAUSE: &str = "ORDER BY (published = 'unknown') ASC, published DESC, id DESC";

impl NewsStore {
    /// Open or create the database at `path` and apply pending migrations.
    pub async fn open(path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| PersistenceError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let db = libsql::Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        let store = Self {
            _db: db,
            conn,
            write_lock: Mutex::new(()),
        };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), PersistenceError> {
        let current = self.schema_version().await;
        for m in migrations::all_migrations() {
            if m.version > current {
                tracing::info!(
                    target: "store",
                    version = m.version,
                    description = m.description,
                    "applying migration"
                );
                self.conn.execute_batch(m.sql).await.map_err(|e| {
                    PersistenceError::Storage(format!("migration v{} failed: {e}", m.version))
                })?;
            }
        }
        Ok(())
    }

    /// 0 when nothing has been applied yet (table missing).
    async fn schema_version(&self) -> u32 {
        match self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await
        {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            Err(_) => 0,
        }
    }

    /// Store `item` unless its link is already present. A duplicate is not an error.
    pub async fn insert_if_absent(&self, item: &NewsItem) -> Result<InsertOutcome, PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let changed = self
            .conn
            .execute(
                "INSERT INTO news (country, title, original_title, link, published, sentiment, political_bias, ingested_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(link) DO NOTHING",
                params![
                    item.country.as_str(),
                    item.translated_title.as_str(),
                    item.original_title.as_str(),
                    item.canonical_link.as_str(),
                    item.published_at.to_db_string(),
                    item.sentiment.as_str(),
                    item.political_bias.as_str(),
                    item.ingested_at.to_rfc3339()
                ],
            )
            .await?;

        Ok(if changed == 0 {
            InsertOutcome::AlreadyPresent
        } else {
            InsertOutcome::Inserted
        })
    }

    /// Items for `country` (all countries when `None`), newest first.
    /// An unknown country simply yields no rows.
    pub async fn query(
        &self,
        country: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<NewsItem>, PersistenceError> {
        // SQLite treats a negative LIMIT as "no limit".
        let limit = limit.map(i64::from).unwrap_or(-1);
        let mut rows = match country {
            Some(c) => {
                let sql = format!("{SELECT_COLUMNS} WHERE country = ?1 {ORDER_CLAUSE} LIMIT ?2");
                self.conn.query(&sql, params![c, limit]).await?
            }
            None => {
                let sql = format!("{SELECT_COLUMNS} {ORDER_CLAUSE} LIMIT ?1");
                self.conn.query(&sql, params![limit]).await?
            }
        };

        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(row_to_item(&row)?);
        }
        Ok(out)
    }

    pub async fn count(&self) -> Result<u64, PersistenceError> {
        let mut rows = self.conn.query("SELECT COUNT(*) FROM news", params![]).await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?.max(0) as u64),
            None => Ok(0),
        }
    }

    pub async fn contains(&self, link: &str) -> Result<bool, PersistenceError> {
        let mut rows = self
            .conn
            .query("SELECT 1 FROM news WHERE link = ?1 LIMIT 1", params![link])
            .await?;
        Ok(rows.next().await?.is_some())
    }
}

fn row_to_item(row: &Row) -> Result<NewsItem, PersistenceError> {
    let ingested_raw = row.get::<String>(7)?;
    let ingested_at = DateTime::parse_from_rfc3339(&ingested_raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PersistenceError::Corrupt(format!("ingested_at '{ingested_raw}': {e}")))?;

    Ok(NewsItem {
        country: row.get::<String>(0)?,
        translated_title: row.get::<String>(1)?,
        original_title: row.get::<String>(2)?,
        canonical_link: row.get::<String>(3)?,
        published_at: Published::from_db_str(&row.get::<String>(4)?),
        sentiment: row
            .get::<String>(5)?
            .parse()
            .map_err(PersistenceError::Corrupt)?,
        political_bias: row
            .get::<String>(6)?
            .parse()
            .map_err(PersistenceError::Corrupt)?,
        ingested_at,
    })
}
