//! Prometheus metrics for the database connection pool
//!
//! Tracks pool size by state and start-up readiness probes

use prometheus::{register_int_counter_vec, register_int_gauge_vec, IntCounterVec, IntGaugeVec};
use sqlx::PgPool;

lazy_static::lazy_static! {
    /// Database connection pool size by state (idle/active/max)
    static ref DB_POOL_CONNECTIONS: IntGaugeVec = register_int_gauge_vec!(
        "db_pool_connections",
        "Database pool connection count by state",
        &["service", "state"]
    ).expect("Prometheus metrics registration should succeed at startup");

    /// Readiness probes issued while waiting for the database, by outcome
    static ref DB_POOL_READINESS_PROBES: IntCounterVec = register_int_counter_vec!(
        "db_pool_readiness_probes_total",
        "Start-up readiness probes against the database",
        &["service", "outcome"]
    ).expect("Prometheus metrics registration should succeed at startup");
}

/// Update connection pool metrics (called periodically)
pub(crate) fn update_pool_metrics(pool: &PgPool, service: &str) {
    let size = pool.size() as i64;
    let idle = pool.num_idle() as i64;

    DB_POOL_CONNECTIONS
        .with_label_values(&[service, "idle"])
        .set(idle);

    DB_POOL_CONNECTIONS
        .with_label_values(&[service, "active"])
        .set(size - idle);

    DB_POOL_CONNECTIONS
        .with_label_values(&[service, "max"])
        .set(pool.options().get_max_connections() as i64);
}

pub(crate) fn record_readiness_probe(service: &str, ready: bool) {
    let outcome = if ready { "ready" } else { "failed" };
    DB_POOL_READINESS_PROBES
        .with_label_values(&[service, outcome])
        .inc();
}
