use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use super::learn2earn::{Learn2Earn, Learn2EarnStatus};
use crate::common::{AdminLogId, Learn2EarnId};

/// Action tag for entries written by the status sync
pub const STATUS_SYNC_ACTION: &str = "learn2earn_status_sync";

/// Audit log entry - append-only record of a status transition
#[derive(FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminLog {
    pub id: AdminLogId,
    pub action: String,
    pub learn2earn_id: Learn2EarnId,
    pub title: String,
    pub old_status: Learn2EarnStatus,
    pub new_status: Learn2EarnStatus,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl AdminLog {
    /// Build the entry for a status change observed by the sync
    pub fn status_change(
        opportunity: &Learn2Earn,
        old_status: Learn2EarnStatus,
        new_status: Learn2EarnStatus,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AdminLogId::new(),
            action: STATUS_SYNC_ACTION.to_string(),
            learn2earn_id: opportunity.id,
            title: opportunity.title.clone(),
            old_status,
            new_status,
            message: format!(
                "Learn2Earn \"{}\" status changed from {} to {}",
                opportunity.title, old_status, new_status
            ),
            created_at: at,
        }
    }

    /// Insert entry
    pub async fn insert(&self, pool: &PgPool) -> Result<()> {
        sqlx::query(
            "INSERT INTO admin_logs (
                id,
                action,
                learn2earn_id,
                title,
                old_status,
                new_status,
                message,
                created_at
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(self.id)
        .bind(&self.action)
        .bind(self.learn2earn_id)
        .bind(&self.title)
        .bind(self.old_status)
        .bind(self.new_status)
        .bind(&self.message)
        .bind(self.created_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// All entries for one opportunity, oldest first
    pub async fn find_for_learn2earn(id: Learn2EarnId, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM admin_logs
             WHERE learn2earn_id = $1
             ORDER BY created_at, id",
        )
        .bind(id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
