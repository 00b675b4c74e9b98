//! Database connection pool management
//!
//! Builds the PostgreSQL pool and blocks start-up until the database answers,
//! so a freshly started container does not race the database it depends on.

mod metrics;

use metrics::{record_readiness_probe, update_pool_metrics};

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Database connection pool configuration
#[derive(Clone)]
pub struct DbConfig {
    /// Service name for metrics labeling
    pub service_name: String,
    /// PostgreSQL connection URL
    pub database_url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Bound on a single readiness probe
    pub connect_timeout_secs: u64,
    /// Connection acquisition timeout (get connection from pool)
    pub acquire_timeout_secs: u64,
    /// Connection idle timeout
    pub idle_timeout_secs: u64,
    /// How many readiness probes to issue before giving up
    pub startup_attempts: u32,
    /// Pause between readiness probes
    pub retry_interval_ms: u64,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("service_name", &self.service_name)
            .field("database_url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("idle_timeout_secs", &self.idle_timeout_secs)
            .field("startup_attempts", &self.startup_attempts)
            .field("retry_interval_ms", &self.retry_interval_ms)
            .finish()
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            service_name: String::from("unknown"),
            database_url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 5,
            acquire_timeout_secs: 10,
            idle_timeout_secs: 600,
            startup_attempts: 30,
            retry_interval_ms: 1000,
        }
    }
}

impl DbConfig {
    pub fn new(service_name: &str, database_url: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            database_url: database_url.to_string(),
            ..Self::default()
        }
    }

    /// Log pool configuration details
    pub fn log_config(&self) {
        info!(
            "Database Pool Configuration: \
             max_connections={}, min_connections={}, \
             connect_timeout={}s, acquire_timeout={}s, startup_attempts={}",
            self.max_connections,
            self.min_connections,
            self.connect_timeout_secs,
            self.acquire_timeout_secs,
            self.startup_attempts
        );
    }
}

/// Create a PostgreSQL connection pool and wait until the database is ready.
///
/// The pool itself is built lazily; readiness is then established by issuing
/// `SELECT 1` up to `startup_attempts` times, `retry_interval_ms` apart. The
/// last probe error is returned if the database never answers.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool, sqlx::Error> {
    debug!(
        "Creating database pool: service={}, max={}, min={}, acquire_timeout={}s",
        config.service_name,
        config.max_connections,
        config.min_connections,
        config.acquire_timeout_secs
    );

    let options = PgConnectOptions::from_str(&config.database_url)?;
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .test_before_acquire(true)
        .connect_lazy_with(options);

    wait_until_ready(&pool, config).await?;

    info!(
        service = %config.service_name,
        "Database pool created and verified successfully"
    );

    update_pool_metrics(&pool, &config.service_name);
    {
        let pool_clone = pool.clone();
        let service = config.service_name.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(30));
            loop {
                interval.tick().await;
                if pool_clone.is_closed() {
                    break;
                }
                update_pool_metrics(&pool_clone, &service);
            }
        });
    }

    Ok(pool)
}

async fn wait_until_ready(pool: &PgPool, config: &DbConfig) -> Result<(), sqlx::Error> {
    let attempts = config.startup_attempts.max(1);
    let probe_timeout = Duration::from_secs(config.connect_timeout_secs.max(1));
    let mut last_error = None;

    for attempt in 1..=attempts {
        let probe = tokio::time::timeout(probe_timeout, sqlx::query("SELECT 1").execute(pool));
        let err = match probe.await {
            Ok(Ok(_)) => {
                record_readiness_probe(&config.service_name, true);
                return Ok(());
            }
            Ok(Err(e)) => e,
            Err(_) => sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Database readiness probe timeout",
            )),
        };

        record_readiness_probe(&config.service_name, false);
        warn!(
            service = %config.service_name,
            attempt,
            attempts,
            error = %err,
            "Database not ready yet"
        );
        last_error = Some(err);

        if attempt < attempts {
            tokio::time::sleep(Duration::from_millis(config.retry_interval_ms)).await;
        }
    }

    pool.close().await;
    Err(last_error.unwrap_or(sqlx::Error::PoolTimedOut))
}
