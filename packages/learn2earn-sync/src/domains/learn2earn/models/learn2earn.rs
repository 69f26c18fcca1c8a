use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::fmt;
use typed_builder::TypedBuilder;

use crate::common::Learn2EarnId;

/// Lifecycle status of a Learn2Earn opportunity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "learn2earn_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Learn2EarnStatus {
    #[default]
    Draft,
    Active,
    Completed,
}

impl fmt::Display for Learn2EarnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Learn2EarnStatus::Draft => write!(f, "draft"),
            Learn2EarnStatus::Active => write!(f, "active"),
            Learn2EarnStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Learn2Earn opportunity - SQL persistence layer
///
/// Rows are created and edited by the web app (creation and participation
/// flows). This service only reads them and rewrites `status`.
///
/// `contract_id` is set once the opportunity is deployed on-chain; from then
/// on the contract owns the lifecycle and the sync leaves the row alone.
#[derive(FromRow, Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Learn2Earn {
    #[builder(default)]
    pub id: Learn2EarnId,
    #[builder(default)]
    pub contract_id: Option<String>,
    pub title: String,

    // Raw dates as written by the web app
    #[builder(default)]
    pub start_date: Option<String>,
    #[builder(default)]
    pub end_date: Option<String>,

    // Participation
    #[builder(default)]
    pub max_participants: Option<i32>,
    #[builder(default = 0)]
    pub total_participants: i32,

    #[builder(default)]
    pub status: Learn2EarnStatus,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

impl Learn2Earn {
    /// Whether the lifecycle belongs to an on-chain contract.
    ///
    /// A blank contract id is treated as missing.
    pub fn is_anchored(&self) -> bool {
        self.contract_id
            .as_deref()
            .is_some_and(|contract| !contract.trim().is_empty())
    }

    /// Find opportunity by ID
    pub async fn find_by_id(id: Learn2EarnId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM learn2earn WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// One keyset page of opportunities with ids greater than `after`, ordered by id
    pub async fn find_page(
        after: Option<Learn2EarnId>,
        limit: i64,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM learn2earn
             WHERE $1::uuid IS NULL OR id > $1
             ORDER BY id
             LIMIT $2",
        )
        .bind(after)
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Stream every opportunity, ordered by id.
    ///
    /// Rows are read in keyset pages of `page_size`. Only one page is held in
    /// memory, and no connection is held between pages, so the caller can
    /// write through the same pool while it walks the stream (even a pool of
    /// one). Calling it again restarts the scan.
    pub fn stream_all(pool: &PgPool, page_size: i64) -> BoxStream<'_, Result<Self>> {
        let page_size = page_size.max(1);
        stream::try_unfold(Some(None), move |cursor| {
            Self::next_page(cursor, page_size, pool)
        })
        .map_ok(|page| stream::iter(page.into_iter().map(Ok::<_, anyhow::Error>)))
        .try_flatten()
        .boxed()
    }

    /// `cursor` is `None` once the last page has been read.
    async fn next_page(
        cursor: Option<Option<Learn2EarnId>>,
        page_size: i64,
        pool: &PgPool,
    ) -> Result<Option<(Vec<Self>, Option<Option<Learn2EarnId>>)>> {
        let Some(after) = cursor else {
            return Ok(None);
        };

        let page = Self::find_page(after, page_size, pool).await?;
        let next = match page.last() {
            Some(last) if page.len() as i64 == page_size => Some(Some(last.id)),
            Some(_) => None,
            None => return Ok(None),
        };

        Ok(Some((page, next)))
    }

    /// Count opportunities grouped by stored status
    pub async fn count_by_status(pool: &PgPool) -> Result<Vec<(Learn2EarnStatus, i64)>> {
        sqlx::query_as::<_, (Learn2EarnStatus, i64)>(
            "SELECT status, COUNT(*) FROM learn2earn GROUP BY status ORDER BY status",
        )
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Insert opportunity
    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO learn2earn (
                id,
                contract_id,
                title,
                start_date,
                end_date,
                max_participants,
                total_participants,
                status
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(self.id)
        .bind(&self.contract_id)
        .bind(&self.title)
        .bind(&self.start_date)
        .bind(&self.end_date)
        .bind(self.max_participants)
        .bind(self.total_participants)
        .bind(self.status)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Overwrite the stored status.
    ///
    /// Returns the number of rows touched (0 if the opportunity is gone).
    pub async fn update_status(
        id: Learn2EarnId,
        status: Learn2EarnStatus,
        updated_at: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<u64> {
        let result = sqlx::query("UPDATE learn2earn SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(status)
            .bind(updated_at)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
