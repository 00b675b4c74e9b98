mod content_repo;
pub mod memory;
mod user_repo;

pub use content_repo::PgContentStore;
pub use user_repo::PgUserStore;

use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::PgPool;

use crate::config::Config;
use crate::error::Result;
use crate::models::{BatchOutcome, ContentFilter, ContentRecord, NewContent, NewUser, Page, User};

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Account storage.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new account. Duplicate username or email is a `Conflict`.
    async fn create_user(&self, user: &NewUser) -> Result<User>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
}

/// Catalog storage. Listings are ordered by id.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn list(&self, filter: &ContentFilter, page: Page) -> Result<Vec<ContentRecord>>;

    /// Substring match over title, director, cast and description
    async fn search(&self, q: &str, page: Page) -> Result<Vec<ContentRecord>>;

    async fn get(&self, id: i64) -> Result<Option<ContentRecord>>;

    /// Count every record, or only those of one type
    async fn count(&self, content_type: Option<&str>) -> Result<i64>;

    /// `(rating, count)` for every non-empty rating, unordered
    async fn rating_counts(&self) -> Result<Vec<(String, i64)>>;

    async fn distinct_ratings(&self) -> Result<Vec<String>>;

    /// Raw `listed_in` values of every record that has one
    async fn listed_in_values(&self) -> Result<Vec<String>>;

    /// Raw distinct `country` values
    async fn country_values(&self) -> Result<Vec<String>>;

    /// Insert, update or skip each row by `show_id`, atomically per call.
    async fn upsert_batch(&self, rows: &[NewContent]) -> Result<BatchOutcome>;
}

#[derive(Clone)]
pub struct Database {
    pub pg: PgPool,
}

impl Database {
    pub async fn connect(config: &Config, service_name: &str) -> anyhow::Result<Self> {
        let db_config = config.db_config(service_name);
        db_config.log_config();

        let pg = db_pool::create_pool(&db_config).await?;
        tracing::info!("PostgreSQL connection pool established");

        Ok(Self { pg })
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        tracing::info!("Running database migrations...");
        MIGRATOR.run(&self.pg).await?;
        tracing::info!("Database migrations completed");
        Ok(())
    }

    /// Applied migration versions with their descriptions, oldest first
    pub async fn applied_migrations(&self) -> anyhow::Result<Vec<(i64, String)>> {
        let rows = sqlx::query_as::<_, (i64, String)>(
            "SELECT version, description FROM _sqlx_migrations WHERE success ORDER BY version",
        )
        .fetch_all(&self.pg)
        .await?;
        Ok(rows)
    }

    pub async fn close(&self) {
        self.pg.close().await;
        tracing::info!("Database pool closed");
    }
}
