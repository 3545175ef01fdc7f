//! # Postgres Metadata Store
//!
//! Persists asset records to the `asset_records` table via SQLx.
//!
//! The database is **optional**. When `DATABASE_URL` is set, records are
//! persisted to PostgreSQL. When absent, callers fall back to
//! [`MemoryMetadataStore`](crate::MemoryMetadataStore) and state does not
//! survive restarts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gitcas_core::{AssetName, AssetRecord, AssetStats, BranchId, ContentDigest, NewAssetRecord};
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::metadata::{MetadataError, MetadataStore};

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, MetadataError> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set, running in-memory only mode. \
                 Asset records will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;
    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

/// [`MetadataStore`] over a Postgres pool.
#[derive(Debug, Clone)]
pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(sqlx::FromRow)]
struct AssetRow {
    id: i64,
    hash: String,
    name: String,
    size: i64,
    branch: i64,
    created_at: DateTime<Utc>,
}

impl AssetRow {
    fn into_record(self) -> Result<AssetRecord, MetadataError> {
        let id = self.id;
        let corrupt = |what: &str| MetadataError::Corrupt(format!("row {id}: {what}"));
        Ok(AssetRecord {
            id,
            hash: ContentDigest::from_hex(&self.hash).map_err(|e| corrupt(&e.to_string()))?,
            name: AssetName::new(&self.name).map_err(|e| corrupt(&e.to_string()))?,
            size: u64::try_from(self.size).map_err(|_| corrupt("negative size"))?,
            branch: BranchId::new(
                u64::try_from(self.branch).map_err(|_| corrupt("negative branch"))?,
            ),
            created_at: self.created_at,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT id, hash, name, size, branch, created_at FROM asset_records";

fn to_i64(value: u64, what: &str) -> Result<i64, MetadataError> {
    i64::try_from(value).map_err(|_| MetadataError::Corrupt(format!("{what} {value} exceeds i64")))
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn find_by_hash(
        &self,
        hash: &ContentDigest,
    ) -> Result<Option<AssetRecord>, MetadataError> {
        let row = sqlx::query_as::<_, AssetRow>(&format!("{SELECT_COLUMNS} WHERE hash = $1 LIMIT 1"))
            .bind(hash.to_hex())
            .fetch_optional(&self.pool)
            .await?;
        row.map(AssetRow::into_record).transpose()
    }

    async fn latest(&self) -> Result<Option<AssetRecord>, MetadataError> {
        let row = sqlx::query_as::<_, AssetRow>(&format!("{SELECT_COLUMNS} ORDER BY id DESC LIMIT 1"))
            .fetch_optional(&self.pool)
            .await?;
        row.map(AssetRow::into_record).transpose()
    }

    async fn branch_size(&self, branch: BranchId) -> Result<u64, MetadataError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(size), 0)::BIGINT FROM asset_records WHERE branch = $1",
        )
        .bind(to_i64(branch.value(), "branch")?)
        .fetch_one(&self.pool)
        .await?;
        Ok(total.max(0) as u64)
    }

    async fn stats(&self) -> Result<AssetStats, MetadataError> {
        let (count, size): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*)::BIGINT, COALESCE(SUM(size), 0)::BIGINT FROM asset_records",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(AssetStats {
            asset_count: count.max(0) as u64,
            asset_size: size.max(0) as u64,
        })
    }

    async fn upsert(&self, records: &[NewAssetRecord]) -> Result<Vec<AssetRecord>, MetadataError> {
        let mut tx = self.pool.begin().await?;
        let mut out = Vec::with_capacity(records.len());
        for record in records {
            sqlx::query(
                "INSERT INTO asset_records (hash, name, size, branch)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (hash) DO NOTHING",
            )
            .bind(record.hash.to_hex())
            .bind(record.name.as_str())
            .bind(to_i64(record.size, "size")?)
            .bind(to_i64(record.branch.value(), "branch")?)
            .execute(&mut *tx)
            .await?;

            let row = sqlx::query_as::<_, AssetRow>(&format!("{SELECT_COLUMNS} WHERE hash = $1"))
                .bind(record.hash.to_hex())
                .fetch_one(&mut *tx)
                .await?;
            out.push(row.into_record()?);
        }
        tx.commit().await?;
        Ok(out)
    }
}
