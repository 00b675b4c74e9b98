//! Prometheus metrics for the catalog service
//!
//! Import row outcomes plus the `/metrics` exposition endpoint

use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

use crate::models::BatchOutcome;

lazy_static::lazy_static! {
    /// Imported CSV rows by outcome (inserted/updated/skipped/rejected)
    static ref CATALOG_IMPORT_ROWS: IntCounterVec = register_int_counter_vec!(
        "catalog_import_rows_total",
        "CSV rows processed by the catalog importer, by outcome",
        &["outcome"]
    ).expect("Prometheus metrics registration should succeed at startup");
}

pub(crate) fn record_import_batch(outcome: &BatchOutcome) {
    CATALOG_IMPORT_ROWS
        .with_label_values(&["inserted"])
        .inc_by(outcome.inserted);
    CATALOG_IMPORT_ROWS
        .with_label_values(&["updated"])
        .inc_by(outcome.updated);
    CATALOG_IMPORT_ROWS
        .with_label_values(&["skipped"])
        .inc_by(outcome.skipped);
}

/// Rows that never reached the store (no show_id or undecodable)
pub(crate) fn record_rejected_rows(count: u64) {
    CATALOG_IMPORT_ROWS
        .with_label_values(&["rejected"])
        .inc_by(count);
}

/// Render every registered metric in the Prometheus text format.
pub fn render() -> anyhow::Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_import_counter() {
        record_import_batch(&BatchOutcome {
            inserted: 2,
            updated: 1,
            skipped: 0,
        });

        let text = render().unwrap();
        assert!(text.contains("catalog_import_rows_total"));
        assert!(text.contains("outcome=\"inserted\""));
    }
}
