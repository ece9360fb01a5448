//! SQLite storage layer for Herbtrace.
//!
//! Records are stored as JSON bodies keyed by `(kind, id)`. Bodies are not
//! validated on the way in; ingestion validates them when a snapshot is
//! loaded, so a bad row only costs that row. The store also keeps the QR
//! scan log behind the `recentScans` counter.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::warn;

use crate::dataset::RawDataset;
use crate::model::RecordKind;

const ALL_KINDS: [RecordKind; 6] = [
    RecordKind::User,
    RecordKind::CollectionEvent,
    RecordKind::ProcessingStep,
    RecordKind::QualityTest,
    RecordKind::Batch,
    RecordKind::Recall,
];

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Create a new storage instance and initialize the schema.
    ///
    /// # Arguments
    ///
    /// * `database_url` - SQLite connection string (e.g., "sqlite:herbtrace.db" or "sqlite::memory:")
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let mut options = SqlitePoolOptions::new().max_connections(5);
        if database_url.contains(":memory:") {
            // An in-memory database lives exactly as long as its one connection
            options = options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = options.connect(database_url).await?;

        let storage = Self { pool };
        storage.initialize_schema().await?;

        Ok(storage)
    }

    /// Create the database schema if it doesn't exist.
    async fn initialize_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                id TEXT NOT NULL,
                body TEXT NOT NULL,
                UNIQUE(kind, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS qr_scans (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                qr_code TEXT NOT NULL,
                ts INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Index for scan-window counts
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_qr_scans_ts
            ON qr_scans(ts)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert or replace a record.
    ///
    /// Replacing keeps the record's original position in load order.
    pub async fn upsert_record(
        &self,
        kind: RecordKind,
        id: &str,
        body: &Value,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO records (kind, id, body)
            VALUES (?, ?, ?)
            ON CONFLICT(kind, id) DO UPDATE SET body = excluded.body
            "#,
        )
        .bind(kind.as_str())
        .bind(id)
        .bind(body.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Number of stored records of all kinds.
    pub async fn record_count(&self) -> anyhow::Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as total FROM records")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get("total"))
    }

    /// Store every record of a raw snapshot.
    ///
    /// Records without a string `id` cannot be keyed and are skipped.
    pub async fn seed(&self, raw: &RawDataset) -> anyhow::Result<usize> {
        let mut stored = 0;

        for kind in ALL_KINDS {
            for record in raw.records(kind) {
                match record.get("id").and_then(Value::as_str) {
                    Some(id) => {
                        self.upsert_record(kind, id, record).await?;
                        stored += 1;
                    }
                    None => warn!(kind = %kind, "Not storing record without an id"),
                }
            }
        }

        Ok(stored)
    }

    /// Read all records in insertion order.
    ///
    /// A body that is not valid JSON is passed through as a JSON string so
    /// ingestion reports it as malformed.
    pub async fn load_raw(&self) -> anyhow::Result<RawDataset> {
        let rows = sqlx::query(
            r#"
            SELECT kind, body
            FROM records
            ORDER BY seq
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut raw = RawDataset::default();

        for row in rows {
            let kind_key: String = row.get("kind");
            let body: String = row.get("body");

            let Some(kind) = RecordKind::from_key(&kind_key) else {
                warn!(kind = %kind_key, "Ignoring row of unknown kind");
                continue;
            };

            let value = serde_json::from_str(&body).unwrap_or(Value::String(body));
            raw.push(kind, value);
        }

        Ok(raw)
    }

    /// Record one consumer QR scan.
    pub async fn record_scan(&self, qr_code: &str, at: DateTime<Utc>) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO qr_scans (qr_code, ts)
            VALUES (?, ?)
            "#,
        )
        .bind(qr_code)
        .bind(at.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Count scans at or after `since`.
    pub async fn count_scans_since(&self, since: DateTime<Utc>) -> anyhow::Result<u64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) as total
            FROM qr_scans
            WHERE ts >= ?
            "#,
        )
        .bind(since.timestamp())
        .fetch_one(&self.pool)
        .await?;

        let total: i64 = row.get("total");
        Ok(u64::try_from(total).unwrap_or(0))
    }
}
