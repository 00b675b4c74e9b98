use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One catalog entry (movie or show) as stored.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: i64,
    pub show_id: String,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    pub title: Option<String>,
    pub director: Option<String>,
    #[serde(rename = "cast")]
    pub cast_members: Option<String>,
    pub country: Option<String>,
    pub date_added: Option<String>,
    pub release_year: Option<i32>,
    pub rating: Option<String>,
    pub duration: Option<String>,
    pub listed_in: Option<String>,
    pub description: Option<String>,
}

/// A catalog entry as read from an import file, keyed on `show_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContent {
    pub show_id: String,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    pub title: Option<String>,
    pub director: Option<String>,
    #[serde(rename = "cast")]
    pub cast_members: Option<String>,
    pub country: Option<String>,
    pub date_added: Option<String>,
    pub release_year: Option<i32>,
    pub rating: Option<String>,
    pub duration: Option<String>,
    pub listed_in: Option<String>,
    pub description: Option<String>,
}

impl ContentRecord {
    pub fn from_new(id: i64, row: &NewContent) -> Self {
        let mut record = Self {
            id,
            show_id: row.show_id.clone(),
            content_type: None,
            title: None,
            director: None,
            cast_members: None,
            country: None,
            date_added: None,
            release_year: None,
            rating: None,
            duration: None,
            listed_in: None,
            description: None,
        };
        record.apply(row);
        record
    }

    /// Overwrite every descriptive field with the incoming values.
    pub fn apply(&mut self, row: &NewContent) {
        self.content_type = row.content_type.clone();
        self.title = row.title.clone();
        self.director = row.director.clone();
        self.cast_members = row.cast_members.clone();
        self.country = row.country.clone();
        self.date_added = row.date_added.clone();
        self.release_year = row.release_year;
        self.rating = row.rating.clone();
        self.duration = row.duration.clone();
        self.listed_in = row.listed_in.clone();
        self.description = row.description.clone();
    }

    /// True when every descriptive field equals the incoming row.
    pub fn same_as(&self, row: &NewContent) -> bool {
        self.show_id == row.show_id
            && self.content_type == row.content_type
            && self.title == row.title
            && self.director == row.director
            && self.cast_members == row.cast_members
            && self.country == row.country
            && self.date_added == row.date_added
            && self.release_year == row.release_year
            && self.rating == row.rating
            && self.duration == row.duration
            && self.listed_in == row.listed_in
            && self.description == row.description
    }

    /// Free-text search over title, director, cast and description.
    pub fn matches_text(&self, q: &str) -> bool {
        let needle = q.to_lowercase();
        [
            &self.title,
            &self.director,
            &self.cast_members,
            &self.description,
        ]
        .into_iter()
        .any(|field| contains_ci(field.as_deref(), &needle))
    }
}

fn contains_ci(haystack: Option<&str>, lowered_needle: &str) -> bool {
    haystack
        .map(|h| h.to_lowercase().contains(lowered_needle))
        .unwrap_or(false)
}

/// What an import did with one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    Inserted,
    Updated,
    Skipped,
}

impl RowOutcome {
    pub fn classify(existing: Option<&ContentRecord>, incoming: &NewContent) -> Self {
        match existing {
            None => RowOutcome::Inserted,
            Some(record) if record.same_as(incoming) => RowOutcome::Skipped,
            Some(_) => RowOutcome::Updated,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RowOutcome::Inserted => "inserted",
            RowOutcome::Updated => "updated",
            RowOutcome::Skipped => "skipped",
        }
    }
}

/// Per-batch tally of row outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub inserted: u64,
    pub updated: u64,
    pub skipped: u64,
}

impl BatchOutcome {
    pub fn record(&mut self, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Inserted => self.inserted += 1,
            RowOutcome::Updated => self.updated += 1,
            RowOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn merge(&mut self, other: BatchOutcome) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.skipped += other.skipped;
    }

    pub fn total(&self) -> u64 {
        self.inserted + self.updated + self.skipped
    }
}

/// Listing filters. `None` means "do not filter on this field".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentFilter {
    pub content_type: Option<String>,
    pub rating: Option<String>,
    pub release_year: Option<i32>,
    pub country: Option<String>,
    pub category: Option<String>,
    pub title: Option<String>,
    pub director: Option<String>,
    pub cast: Option<String>,
}

impl ContentFilter {
    /// Drop string filters that are empty or whitespace only.
    pub fn normalized(self) -> Self {
        fn keep(v: Option<String>) -> Option<String> {
            v.filter(|s| !s.trim().is_empty())
        }

        Self {
            content_type: keep(self.content_type),
            rating: keep(self.rating),
            release_year: self.release_year,
            country: keep(self.country),
            category: keep(self.category),
            title: keep(self.title),
            director: keep(self.director),
            cast: keep(self.cast),
        }
    }

    /// Exact match on type, rating and year; case-insensitive substring elsewhere.
    pub fn matches(&self, record: &ContentRecord) -> bool {
        fn exact(want: &Option<String>, have: &Option<String>) -> bool {
            want.as_ref().map_or(true, |w| have.as_deref() == Some(w.as_str()))
        }
        fn substring(want: &Option<String>, have: &Option<String>) -> bool {
            want.as_ref()
                .map_or(true, |w| contains_ci(have.as_deref(), &w.to_lowercase()))
        }

        exact(&self.content_type, &record.content_type)
            && exact(&self.rating, &record.rating)
            && self
                .release_year
                .map_or(true, |year| record.release_year == Some(year))
            && substring(&self.country, &record.country)
            && substring(&self.category, &record.listed_in)
            && substring(&self.title, &record.title)
            && substring(&self.director, &record.director)
            && substring(&self.cast, &record.cast_members)
    }
}

pub const DEFAULT_PAGE_LIMIT: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

impl Page {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }

    /// Apply this page to an already ordered sequence.
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        let offset = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit).unwrap_or(0);
        items.iter().skip(offset).take(limit).cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingCount {
    pub rating: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentStats {
    pub total_content: i64,
    pub movies: i64,
    pub tv_shows: i64,
    pub by_rating: Vec<RatingCount>,
    pub by_category: Vec<CategoryCount>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterValues {
    pub ratings: Vec<String>,
    pub countries: Vec<String>,
    pub categories: Vec<String>,
}

/// Result of a CSV import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub status: String,
    pub records_processed: u64,
    pub records_inserted: u64,
    pub records_updated: u64,
    pub records_skipped: u64,
    pub statistics: ContentStats,
}
