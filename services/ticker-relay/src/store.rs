//! Read access to the snapshot store
//!
//! The relay does not own the persistence layer; it consumes it through two
//! read operations. `SnapshotStore` is the seam the relay loop is written
//! against, with `PgSnapshotStore` as the production Postgres implementation
//! and scripted implementations in the tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use types::tick::PriceRecord;

/// Errors surfaced by snapshot store reads.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("snapshot store query failed: {0}")]
    Query(#[from] sqlx::Error),
}

/// Read-only view of the append-only price record stream.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// The single most recent record, or `None` if the store is empty.
    async fn fetch_latest(&self) -> Result<Option<PriceRecord>, StoreError>;

    /// All records strictly newer than `watermark`, ascending by time.
    async fn fetch_after(&self, watermark: DateTime<Utc>)
        -> Result<Vec<PriceRecord>, StoreError>;
}

/// Postgres-backed snapshot store.
pub struct PgSnapshotStore {
    pool: PgPool,
    table: String,
}

impl PgSnapshotStore {
    pub fn new(pool: PgPool, table: String) -> Self {
        Self { pool, table }
    }
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    async fn fetch_latest(&self) -> Result<Option<PriceRecord>, StoreError> {
        let sql = format!(
            "SELECT time, bid, ask FROM {} ORDER BY time DESC LIMIT 1",
            self.table
        );
        let row = sqlx::query(&sql).fetch_optional(&self.pool).await?;
        row.map(record_from_row).transpose().map_err(Into::into)
    }

    async fn fetch_after(
        &self,
        watermark: DateTime<Utc>,
    ) -> Result<Vec<PriceRecord>, StoreError> {
        let sql = format!(
            "SELECT time, bid, ask FROM {} WHERE time > $1 ORDER BY time ASC",
            self.table
        );
        let rows = sqlx::query(&sql)
            .bind(watermark)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(record_from_row)
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(Into::into)
    }
}

fn record_from_row(row: PgRow) -> Result<PriceRecord, sqlx::Error> {
    Ok(PriceRecord {
        time: row.try_get("time")?,
        bid: row.try_get("bid")?,
        ask: row.try_get("ask")?,
    })
}
