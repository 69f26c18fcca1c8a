//! Test fixtures for creating opportunities.
//!
//! These fixtures use the model methods directly to create test data.

use anyhow::Result;
use chrono::Duration;
use learn2earn_sync_core::common::Learn2EarnId;
use learn2earn_sync_core::domains::learn2earn::{Learn2Earn, Learn2EarnStatus};
use sqlx::PgPool;

use super::test_now;

/// Create an opportunity that started yesterday and ends tomorrow
pub async fn create_running_opportunity(
    pool: &PgPool,
    title: &str,
    status: Learn2EarnStatus,
) -> Result<Learn2EarnId> {
    let opportunity = Learn2Earn::builder()
        .title(title.to_string())
        .start_date(Some((test_now() - Duration::days(1)).to_rfc3339()))
        .end_date(Some((test_now() + Duration::days(1)).to_rfc3339()))
        .status(status)
        .build()
        .insert(pool)
        .await?;

    Ok(opportunity.id)
}

/// Create an opportunity with full control over dates and counts
pub async fn create_opportunity(
    pool: &PgPool,
    title: &str,
    start_date: Option<&str>,
    end_date: Option<&str>,
    max_participants: Option<i32>,
    total_participants: i32,
    status: Learn2EarnStatus,
) -> Result<Learn2EarnId> {
    let opportunity = Learn2Earn::builder()
        .title(title.to_string())
        .start_date(start_date.map(str::to_string))
        .end_date(end_date.map(str::to_string))
        .max_participants(max_participants)
        .total_participants(total_participants)
        .status(status)
        .build()
        .insert(pool)
        .await?;

    Ok(opportunity.id)
}

/// Create an opportunity already deployed to a contract
pub async fn create_anchored_opportunity(
    pool: &PgPool,
    title: &str,
    status: Learn2EarnStatus,
) -> Result<Learn2EarnId> {
    let opportunity = Learn2Earn::builder()
        .title(title.to_string())
        .contract_id(Some("0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string()))
        .start_date(Some((test_now() - Duration::days(1)).to_rfc3339()))
        .status(status)
        .build()
        .insert(pool)
        .await?;

    Ok(opportunity.id)
}

/// Read back the stored status
pub async fn stored_status(pool: &PgPool, id: Learn2EarnId) -> Result<Learn2EarnStatus> {
    let opportunity = Learn2Earn::find_by_id(id, pool)
        .await?
        .ok_or_else(|| anyhow::anyhow!("opportunity {} missing", id))?;
    Ok(opportunity.status)
}
