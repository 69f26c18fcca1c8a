//! Storage seam for the status sync.
//!
//! The sync only needs four things from storage: a restartable scan, a status
//! write, an audit append and a history lookup. `PgOpportunityStore` backs
//! them with Postgres; tests use `kernel::MemoryOpportunityStore`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use sqlx::PgPool;

use super::models::{AdminLog, Learn2Earn, Learn2EarnStatus};
use crate::common::Learn2EarnId;

#[async_trait]
pub trait BaseOpportunityStore: Send + Sync {
    /// Lazily produce every opportunity. Each call starts a fresh scan.
    fn scan(&self) -> BoxStream<'_, Result<Learn2Earn>>;

    async fn find(&self, id: Learn2EarnId) -> Result<Option<Learn2Earn>>;

    async fn update_status(
        &self,
        id: Learn2EarnId,
        status: Learn2EarnStatus,
        at: DateTime<Utc>,
    ) -> Result<()>;

    async fn append_audit(&self, entry: &AdminLog) -> Result<()>;

    async fn audit_history(&self, id: Learn2EarnId) -> Result<Vec<AdminLog>>;
}

/// Rows per keyset page when scanning
pub const DEFAULT_SCAN_PAGE_SIZE: i64 = 500;

/// Postgres-backed store.
///
/// Owns the pool handle: build it at process start, `close` it on the way out.
#[derive(Clone)]
pub struct PgOpportunityStore {
    pool: PgPool,
    page_size: i64,
}

impl PgOpportunityStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            page_size: DEFAULT_SCAN_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: i64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Wait for in-flight queries and close every connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl BaseOpportunityStore for PgOpportunityStore {
    fn scan(&self) -> BoxStream<'_, Result<Learn2Earn>> {
        Learn2Earn::stream_all(&self.pool, self.page_size)
    }

    async fn find(&self, id: Learn2EarnId) -> Result<Option<Learn2Earn>> {
        Learn2Earn::find_by_id(id, &self.pool).await
    }

    async fn update_status(
        &self,
        id: Learn2EarnId,
        status: Learn2EarnStatus,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let rows = Learn2Earn::update_status(id, status, at, &self.pool)
            .await
            .context("UPDATE learn2earn failed")?;
        if rows == 0 {
            anyhow::bail!("opportunity {} no longer exists", id);
        }
        Ok(())
    }

    async fn append_audit(&self, entry: &AdminLog) -> Result<()> {
        entry
            .insert(&self.pool)
            .await
            .context("INSERT INTO admin_logs failed")
    }

    async fn audit_history(&self, id: Learn2EarnId) -> Result<Vec<AdminLog>> {
        AdminLog::find_for_learn2earn(id, &self.pool).await
    }
}
