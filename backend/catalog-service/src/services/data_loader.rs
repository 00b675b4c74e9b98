//! Bulk CSV import into the catalog.
//!
//! Rows are keyed on `show_id`; each one is inserted, updated or skipped
//! depending on what is already stored. One transaction per batch.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use csv::{ReaderBuilder, StringRecord, Trim};

use super::CatalogService;
use crate::db::ContentStore;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{BatchOutcome, ImportReport, NewContent};

/// Rows decoded from a CSV file, ready to upsert.
#[derive(Debug, Default)]
pub struct ParsedCsv {
    pub rows: Vec<NewContent>,
    /// Every data row read, decodable or not
    pub processed: u64,
    /// Rows dropped before reaching the store
    pub skipped: u64,
}

/// Column positions resolved from the header row.
struct Columns {
    show_id: usize,
    content_type: Option<usize>,
    title: Option<usize>,
    director: Option<usize>,
    cast: Option<usize>,
    country: Option<usize>,
    date_added: Option<usize>,
    release_year: Option<usize>,
    rating: Option<usize>,
    duration: Option<usize>,
    listed_in: Option<usize>,
    description: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };

        let show_id = find("show_id").ok_or_else(|| {
            AppError::Validation("CSV header must contain a show_id column".to_string())
        })?;

        Ok(Self {
            show_id,
            content_type: find("type"),
            title: find("title"),
            director: find("director"),
            cast: find("cast"),
            country: find("country"),
            date_added: find("date_added"),
            release_year: find("release_year"),
            rating: find("rating"),
            duration: find("duration"),
            listed_in: find("listed_in"),
            description: find("description"),
        })
    }

    /// Decode one record; `None` when it has no show_id.
    fn decode(&self, record: &StringRecord) -> Option<NewContent> {
        let text = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let show_id = text(Some(self.show_id))?;
        Some(NewContent {
            show_id,
            content_type: text(self.content_type),
            title: text(self.title),
            director: text(self.director),
            cast_members: text(self.cast),
            country: text(self.country),
            date_added: text(self.date_added),
            release_year: text(self.release_year)
                .as_deref()
                .and_then(normalize_release_year),
            rating: text(self.rating),
            duration: text(self.duration),
            listed_in: text(self.listed_in),
            description: text(self.description),
        })
    }
}

/// Parse a year that may have been exported as a float (`2019.0`).
/// Non-numeric and non-positive values become `None`.
pub fn normalize_release_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if let Ok(year) = raw.parse::<i64>() {
        return i32::try_from(year).ok().filter(|y| *y > 0);
    }

    let year = raw.parse::<f64>().ok().filter(|y| y.is_finite())?.trunc();
    if year > 0.0 && year <= f64::from(i32::MAX) {
        Some(year as i32)
    } else {
        None
    }
}

pub fn parse_csv<R: io::Read>(reader: R) -> Result<ParsedCsv> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| AppError::Validation(format!("Unreadable CSV header: {e}")))?
        .clone();
    let columns = Columns::from_headers(&headers)?;

    let mut parsed = ParsedCsv::default();
    for result in rdr.records() {
        parsed.processed += 1;
        match result {
            Ok(record) => match columns.decode(&record) {
                Some(row) => parsed.rows.push(row),
                None => parsed.skipped += 1,
            },
            Err(e) => {
                tracing::warn!(row = parsed.processed, error = %e, "Skipping undecodable CSV row");
                parsed.skipped += 1;
            }
        }
    }

    Ok(parsed)
}

pub fn read_csv_file(path: &Path) -> Result<ParsedCsv> {
    if !path.is_file() {
        return Err(AppError::NotFound(format!("CSV file {}", path.display())));
    }

    let file = std::fs::File::open(path).map_err(|e| {
        AppError::Internal(anyhow::anyhow!("failed to open {}: {e}", path.display()))
    })?;
    parse_csv(file)
}

pub struct DataLoader {
    content: Arc<dyn ContentStore>,
    batch_size: usize,
}

impl DataLoader {
    pub fn new(content: Arc<dyn ContentStore>, batch_size: usize) -> Self {
        Self {
            content,
            batch_size: batch_size.max(1),
        }
    }

    #[tracing::instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn load_file(&self, path: &Path) -> Result<ImportReport> {
        let owned: PathBuf = path.to_path_buf();
        tracing::info!("Reading CSV file");
        let parsed = tokio::task::spawn_blocking(move || read_csv_file(&owned)).await??;

        self.import(parsed).await
    }

    pub async fn import(&self, parsed: ParsedCsv) -> Result<ImportReport> {
        tracing::info!(
            rows = parsed.processed,
            decodable = parsed.rows.len(),
            "CSV parsed"
        );

        let mut totals = BatchOutcome::default();
        let mut done = 0usize;
        for chunk in parsed.rows.chunks(self.batch_size) {
            let outcome = self.content.upsert_batch(chunk).await?;
            metrics::record_import_batch(&outcome);
            totals.merge(outcome);

            done += chunk.len();
            tracing::info!(
                committed = done,
                total = parsed.rows.len(),
                "Import batch committed"
            );
        }
        metrics::record_rejected_rows(parsed.skipped);

        let statistics = CatalogService::new(self.content.clone()).stats().await?;

        let report = ImportReport {
            status: "success".to_string(),
            records_processed: parsed.processed,
            records_inserted: totals.inserted,
            records_updated: totals.updated,
            records_skipped: totals.skipped + parsed.skipped,
            statistics,
        };
        tracing::info!(
            inserted = report.records_inserted,
            updated = report.records_updated,
            skipped = report.records_skipped,
            "Import finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryContentStore;

    const HEADER: &str =
        "show_id,type,title,director,cast,country,date_added,release_year,rating,duration,listed_in,description";

    #[test]
    fn test_normalize_release_year() {
        assert_eq!(normalize_release_year("2019"), Some(2019));
        assert_eq!(normalize_release_year(" 2019.0 "), Some(2019));
        assert_eq!(normalize_release_year("2019.7"), Some(2019));
        assert_eq!(normalize_release_year("0"), None);
        assert_eq!(normalize_release_year("-5"), None);
        assert_eq!(normalize_release_year("unknown"), None);
        assert_eq!(normalize_release_year("NaN"), None);
        assert_eq!(normalize_release_year("1e12"), None);
    }

    #[test]
    fn test_parse_trims_and_nulls_empty_fields() {
        let csv = format!(
            "{HEADER}\n s1 ,Movie,  Dick Johnson Is Dead ,,,United States,\"September 25, 2021\",2020,PG-13,90 min,Documentaries,A film\n"
        );
        let parsed = parse_csv(csv.as_bytes()).unwrap();

        assert_eq!(parsed.processed, 1);
        assert_eq!(parsed.skipped, 0);
        let row = &parsed.rows[0];
        assert_eq!(row.show_id, "s1");
        assert_eq!(row.title.as_deref(), Some("Dick Johnson Is Dead"));
        assert_eq!(row.director, None);
        assert_eq!(row.cast_members, None);
        assert_eq!(row.date_added.as_deref(), Some("September 25, 2021"));
        assert_eq!(row.release_year, Some(2020));
    }

    #[test]
    fn test_rows_without_show_id_are_skipped() {
        let csv = format!("{HEADER}\n,Movie,No Id\ns2,TV Show,Blood & Water\n");
        let parsed = parse_csv(csv.as_bytes()).unwrap();

        assert_eq!(parsed.processed, 2);
        assert_eq!(parsed.skipped, 1);
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].content_type.as_deref(), Some("TV Show"));
    }

    #[test]
    fn test_missing_optional_columns() {
        let parsed = parse_csv("show_id,title\ns1,Only Title\n".as_bytes()).unwrap();
        assert_eq!(parsed.rows[0].title.as_deref(), Some("Only Title"));
        assert_eq!(parsed.rows[0].rating, None);
    }

    #[test]
    fn test_missing_show_id_header_is_validation_error() {
        let result = parse_csv("title,type\nA,Movie\n".as_bytes());
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let result = read_csv_file(Path::new("/definitely/not/here.csv"));
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_import_counts_and_reimport_skips() {
        let store = Arc::new(MemoryContentStore::new());
        let loader = DataLoader::new(store.clone(), 2);
        let csv = format!(
            "{HEADER}\ns1,Movie,One,,,,,2020,PG,,Dramas,\ns2,TV Show,Two,,,,,2021,TV-MA,,Comedies,\ns3,Movie,Three,,,,,2019.0,R,,Dramas,\n,Movie,Nameless,,,,,,,,,\n"
        );

        let first = loader.import(parse_csv(csv.as_bytes()).unwrap()).await.unwrap();
        assert_eq!(first.status, "success");
        assert_eq!(first.records_processed, 4);
        assert_eq!(first.records_inserted, 3);
        assert_eq!(first.records_updated, 0);
        assert_eq!(first.records_skipped, 1);
        assert_eq!(first.statistics.total_content, 3);

        let second = loader.import(parse_csv(csv.as_bytes()).unwrap()).await.unwrap();
        assert_eq!(second.records_inserted, 0);
        assert_eq!(second.records_updated, 0);
        assert_eq!(second.records_skipped, 4);

        let changed = csv.replace("s2,TV Show,Two,", "s2,TV Show,Two (Director's Cut),");
        let third = loader.import(parse_csv(changed.as_bytes()).unwrap()).await.unwrap();
        assert_eq!(third.records_updated, 1);
        assert_eq!(third.records_skipped, 3);
        assert_eq!(
            third.records_inserted + third.records_updated + third.records_skipped,
            third.records_processed
        );
    }
}
