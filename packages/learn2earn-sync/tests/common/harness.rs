//! Test harness with testcontainers for integration testing.
//!
//! One Postgres container is shared by every test. Each test gets its own
//! freshly migrated database inside it, because the sync scans whole tables
//! and parallel tests would otherwise see each other's rows.

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use learn2earn_sync_core::domains::learn2earn::{
    CompletionPolicy, PgOpportunityStore, StatusSynchronizer,
};
use learn2earn_sync_core::kernel::{FixedClock, SyncDeps};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

/// Shared test infrastructure that persists across all tests.
struct SharedTestInfra {
    base_url: String,
    // Keep the container alive for the entire test run
    _postgres: ContainerAsync<Postgres>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let postgres = Postgres::default()
            .with_tag("16")
            .with_cmd(["-c", "max_connections=200"])
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let pg_host = postgres.get_host().await?;
        let pg_port = postgres.get_host_port_ipv4(5432).await?;
        let base_url = format!("postgresql://postgres:postgres@{}:{}", pg_host, pg_port);

        Ok(Self {
            base_url,
            _postgres: postgres,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }
}

/// Fixed instant every integration test syncs at.
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 15, 0, 0, 0).unwrap()
}

/// Test harness that manages test infrastructure.
///
/// ```ignore
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &TestHarness) {
///     let report = ctx.sync(CompletionPolicy::Terminal).run_sync().await.unwrap();
/// }
/// ```
pub struct TestHarness {
    /// Database pool - use this for test fixtures.
    pub db_pool: PgPool,
    pub db_url: String,
    pub store: PgOpportunityStore,
    pub clock: Arc<FixedClock>,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create test harness")
    }

    async fn teardown(self) {
        self.store.close().await;
    }
}

impl TestHarness {
    /// Creates a harness backed by a new, migrated database.
    pub async fn new() -> Result<Self> {
        let infra = SharedTestInfra::get().await;

        let admin_pool = PgPool::connect(&format!("{}/postgres", infra.base_url))
            .await
            .context("Failed to connect to Postgres")?;
        let db_name = format!("learn2earn_{}", Uuid::new_v4().simple());
        sqlx::query(&format!("CREATE DATABASE \"{}\"", db_name))
            .execute(&admin_pool)
            .await
            .context("Failed to create test database")?;
        admin_pool.close().await;

        let db_url = format!("{}/{}", infra.base_url, db_name);
        let db_pool = PgPool::connect(&db_url)
            .await
            .context("Failed to connect to test database")?;

        sqlx::migrate!("./migrations")
            .run(&db_pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self {
            store: PgOpportunityStore::new(db_pool.clone()),
            db_pool,
            db_url,
            clock: Arc::new(FixedClock::new(test_now())),
        })
    }

    pub fn deps(&self) -> SyncDeps {
        SyncDeps::new(Arc::new(self.store.clone()), self.clock.clone())
    }

    /// A store over its own pool of exactly one connection.
    ///
    /// A short acquire timeout turns "scan holds the only connection" into a
    /// quick failure instead of a hang.
    pub async fn single_connection_store(&self, page_size: i64) -> Result<PgOpportunityStore> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&self.db_url)
            .await
            .context("Failed to connect single-connection pool")?;
        Ok(PgOpportunityStore::new(pool).with_page_size(page_size))
    }

    pub fn sync(&self, policy: CompletionPolicy) -> StatusSynchronizer {
        StatusSynchronizer::new(&self.deps(), policy)
    }
}
