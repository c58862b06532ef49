use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use nd_core::{
    ArticleRecord, BulkWriteResult, DocumentStore, Enrichment, Error, Result, Sentiment, SourceName,
    StoredArticle, WriteError,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        url TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        source TEXT NOT NULL,
        published_at TEXT,
        image_url TEXT,
        category TEXT,
        keywords TEXT NOT NULL DEFAULT '[]',
        sentiment TEXT,
        summary TEXT,
        saved_flag INTEGER NOT NULL DEFAULT 0,
        view_count INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_articles_source ON articles (source, published_at)",
    "CREATE INDEX IF NOT EXISTS idx_articles_created_at ON articles (created_at)",
];

// The update only fires when a scraped field differs, so rows_affected is 0
// for an identical re-upsert.
// Any write statement takes the database write lock, even when it matches no
// rows. Issued first in a bulk write so the existence checks below can't race
// another writer.
const TAKE_WRITE_LOCK: &str = "UPDATE articles SET url = url WHERE 0";

const UPSERT: &str = r#"
    INSERT INTO articles (url, title, content, source, published_at, image_url, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
    ON CONFLICT(url) DO UPDATE SET
        title = excluded.title,
        content = excluded.content,
        source = excluded.source,
        published_at = excluded.published_at,
        image_url = excluded.image_url,
        updated_at = excluded.updated_at
    WHERE articles.title IS NOT excluded.title
        OR articles.content IS NOT excluded.content
        OR articles.source IS NOT excluded.source
        OR articles.published_at IS NOT excluded.published_at
        OR articles.image_url IS NOT excluded.image_url
"#;

fn db_error(context: &str, e: sqlx::Error) -> Error {
    Error::Database(format!("{}: {}", context, e))
}

/// Fixed-width UTC timestamps so that text comparison matches time order.
fn encode_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_time(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Database(format!("Failed to parse date {:?}: {}", raw, e)))
}

pub struct SqliteStore {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SqliteStore {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| db_error("Failed to connect to database", e))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| db_error(&format!("Failed to run migration {}", i), e))?;
        }

        info!(path = %db_path.display(), "SQLite store ready");
        Ok(Self {
            pool,
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

async fn upsert_one(
    conn: &mut SqliteConnection,
    record: &ArticleRecord,
    now: &str,
) -> std::result::Result<UpsertOutcome, sqlx::Error> {
    let existed = sqlx::query("SELECT 1 FROM articles WHERE url = ?")
        .bind(&record.url)
        .fetch_optional(&mut *conn)
        .await?
        .is_some();

    let affected = sqlx::query(UPSERT)
        .bind(&record.url)
        .bind(&record.title)
        .bind(&record.content)
        .bind(record.source.as_str())
        .bind(record.published_at.as_ref().map(encode_time))
        .bind(record.image_url.as_deref())
        .bind(now)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    Ok(match (existed, affected) {
        (false, _) => UpsertOutcome::Inserted,
        (true, 0) => UpsertOutcome::Unchanged,
        (true, _) => UpsertOutcome::Modified,
    })
}

enum UpsertOutcome {
    Inserted,
    Modified,
    Unchanged,
}

fn row_to_article(row: &SqliteRow) -> Result<StoredArticle> {
    let get_err = |e: sqlx::Error| db_error("Failed to read row", e);

    let source: String = row.try_get("source").map_err(get_err)?;
    let published_at: Option<String> = row.try_get("published_at").map_err(get_err)?;
    let keywords: String = row.try_get("keywords").map_err(get_err)?;
    let sentiment: Option<String> = row.try_get("sentiment").map_err(get_err)?;
    let created_at: String = row.try_get("created_at").map_err(get_err)?;
    let updated_at: String = row.try_get("updated_at").map_err(get_err)?;
    let view_count: i64 = row.try_get("view_count").map_err(get_err)?;

    Ok(StoredArticle {
        record: ArticleRecord {
            title: row.try_get("title").map_err(get_err)?,
            url: row.try_get("url").map_err(get_err)?,
            content: row.try_get("content").map_err(get_err)?,
            published_at: published_at.as_deref().map(decode_time).transpose()?,
            source: source.parse::<SourceName>()?,
            image_url: row.try_get("image_url").map_err(get_err)?,
        },
        enrichment: Enrichment {
            category: row.try_get("category").map_err(get_err)?,
            keywords: serde_json::from_str(&keywords)?,
            sentiment: sentiment.as_deref().map(str::parse::<Sentiment>).transpose()?,
            summary: row.try_get("summary").map_err(get_err)?,
        },
        saved_flag: row.try_get("saved_flag").map_err(get_err)?,
        view_count: view_count.max(0) as u64,
        created_at: decode_time(&created_at)?,
        updated_at: decode_time(&updated_at)?,
    })
}

#[async_trait]
impl DocumentStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn find_one(&self, url: &str) -> Result<Option<StoredArticle>> {
        let row = sqlx::query("SELECT * FROM articles WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find article", e))?;
        row.as_ref().map(row_to_article).transpose()
    }

    async fn bulk_upsert(&self, records: &[ArticleRecord]) -> Result<BulkWriteResult> {
        let now = encode_time(&Utc::now());
        let mut result = BulkWriteResult::default();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;
        sqlx::query(TAKE_WRITE_LOCK)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to lock articles", e))?;

        for (index, record) in records.iter().enumerate() {
            match upsert_one(&mut *tx, record, &now).await {
                Ok(UpsertOutcome::Inserted) => {
                    result.inserted += 1;
                    result.upserted_urls.push(record.url.clone());
                }
                Ok(UpsertOutcome::Modified) => result.modified += 1,
                Ok(UpsertOutcome::Unchanged) => result.matched += 1,
                Err(e) => result.errors.push(WriteError {
                    index,
                    url: record.url.clone(),
                    message: e.to_string(),
                }),
            }
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit bulk upsert", e))?;

        debug!(
            inserted = result.inserted,
            modified = result.modified,
            matched = result.matched,
            errors = result.errors.len(),
            "SQLite bulk upsert"
        );
        Ok(result)
    }

    async fn update_enrichment(&self, url: &str, enrichment: &Enrichment) -> Result<()> {
        let keywords = serde_json::to_string(&enrichment.keywords)?;
        let affected = sqlx::query(
            r#"
            UPDATE articles
            SET category = ?, keywords = ?, sentiment = ?, summary = ?, updated_at = ?
            WHERE url = ?
            "#,
        )
        .bind(enrichment.category.as_deref())
        .bind(keywords)
        .bind(enrichment.sentiment.map(|s| s.as_str()))
        .bind(enrichment.summary.as_deref())
        .bind(encode_time(&Utc::now()))
        .bind(url)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update enrichment", e))?
        .rows_affected();

        if affected == 0 {
            return Err(Error::Storage(format!("No document with url {}", url)));
        }
        Ok(())
    }

    async fn set_saved(&self, url: &str, saved: bool) -> Result<()> {
        let affected = sqlx::query("UPDATE articles SET saved_flag = ? WHERE url = ?")
            .bind(saved)
            .bind(url)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to update saved flag", e))?
            .rows_affected();

        if affected == 0 {
            return Err(Error::Storage(format!("No document with url {}", url)));
        }
        Ok(())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM articles WHERE saved_flag = 0 AND created_at < ?")
            .bind(encode_time(&cutoff))
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete old articles", e))?;
        Ok(result.rows_affected())
    }

    async fn get_by_source(&self, source: SourceName) -> Result<Vec<StoredArticle>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM articles
            WHERE source = ?
            ORDER BY published_at DESC
            "#,
        )
        .bind(source.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get articles by source", e))?;

        rows.iter().map(row_to_article).collect()
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to count articles", e))?;
        Ok(count.max(0) as u64)
    }
}
