use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::ContentStore;
use crate::error::Result;
use crate::models::{BatchOutcome, ContentFilter, ContentRecord, NewContent, Page, RowOutcome};

const CONTENT_COLUMNS: &str = "id, show_id, content_type, title, director, cast_members, \
     country, date_added, release_year, rating, duration, listed_in, description";

/// Insert a row or overwrite the stored one when any field differs.
///
/// Returns `true` for an insert, `false` for an update and no row when the
/// stored record is identical. Concurrent imports of the same `show_id`
/// serialise on the unique index instead of failing.
const UPSERT_CONTENT: &str = r#"
    INSERT INTO catalog_content (
        show_id, content_type, title, director, cast_members, country,
        date_added, release_year, rating, duration, listed_in, description
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
    ON CONFLICT (show_id) DO UPDATE SET
        content_type = EXCLUDED.content_type,
        title = EXCLUDED.title,
        director = EXCLUDED.director,
        cast_members = EXCLUDED.cast_members,
        country = EXCLUDED.country,
        date_added = EXCLUDED.date_added,
        release_year = EXCLUDED.release_year,
        rating = EXCLUDED.rating,
        duration = EXCLUDED.duration,
        listed_in = EXCLUDED.listed_in,
        description = EXCLUDED.description
    WHERE (
        catalog_content.content_type, catalog_content.title, catalog_content.director,
        catalog_content.cast_members, catalog_content.country, catalog_content.date_added,
        catalog_content.release_year, catalog_content.rating, catalog_content.duration,
        catalog_content.listed_in, catalog_content.description
    ) IS DISTINCT FROM (
        EXCLUDED.content_type, EXCLUDED.title, EXCLUDED.director,
        EXCLUDED.cast_members, EXCLUDED.country, EXCLUDED.date_added,
        EXCLUDED.release_year, EXCLUDED.rating, EXCLUDED.duration,
        EXCLUDED.listed_in, EXCLUDED.description
    )
    RETURNING (xmax = 0) AS inserted
"#;

pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Build an ILIKE pattern that matches `value` literally anywhere in the column.
pub(crate) fn like_pattern(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn push_exact<'a>(qb: &mut QueryBuilder<'a, Postgres>, column: &str, value: &Option<String>) {
    if let Some(v) = value {
        qb.push(format!(" AND {column} = "));
        qb.push_bind(v.clone());
    }
}

fn push_substring<'a>(qb: &mut QueryBuilder<'a, Postgres>, column: &str, value: &Option<String>) {
    if let Some(v) = value {
        qb.push(format!(" AND {column} ILIKE "));
        qb.push_bind(like_pattern(v));
        qb.push(" ESCAPE '\\'");
    }
}

fn push_page<'a>(qb: &mut QueryBuilder<'a, Postgres>, page: Page) {
    qb.push(" ORDER BY id LIMIT ");
    qb.push_bind(page.limit);
    qb.push(" OFFSET ");
    qb.push_bind(page.offset);
}

#[async_trait]
impl ContentStore for PgContentStore {
    async fn list(&self, filter: &ContentFilter, page: Page) -> Result<Vec<ContentRecord>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {CONTENT_COLUMNS} FROM catalog_content WHERE TRUE"
        ));

        push_exact(&mut qb, "content_type", &filter.content_type);
        push_exact(&mut qb, "rating", &filter.rating);
        if let Some(year) = filter.release_year {
            qb.push(" AND release_year = ");
            qb.push_bind(year);
        }
        push_substring(&mut qb, "country", &filter.country);
        push_substring(&mut qb, "listed_in", &filter.category);
        push_substring(&mut qb, "title", &filter.title);
        push_substring(&mut qb, "director", &filter.director);
        push_substring(&mut qb, "cast_members", &filter.cast);
        push_page(&mut qb, page);

        let rows = qb
            .build_query_as::<ContentRecord>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn search(&self, q: &str, page: Page) -> Result<Vec<ContentRecord>> {
        let pattern = like_pattern(q);
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {CONTENT_COLUMNS} FROM catalog_content WHERE ("
        ));

        let mut columns = qb.separated(" OR ");
        for column in ["title", "director", "cast_members", "description"] {
            columns.push(format!("{column} ILIKE "));
            columns.push_bind_unseparated(pattern.clone());
            columns.push_unseparated(" ESCAPE '\\'");
        }
        qb.push(")");
        push_page(&mut qb, page);

        let rows = qb
            .build_query_as::<ContentRecord>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get(&self, id: i64) -> Result<Option<ContentRecord>> {
        let record = sqlx::query_as::<_, ContentRecord>(&format!(
            "SELECT {CONTENT_COLUMNS} FROM catalog_content WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn count(&self, content_type: Option<&str>) -> Result<i64> {
        let count = match content_type {
            Some(t) => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM catalog_content WHERE content_type = $1",
                )
                .bind(t)
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM catalog_content")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count)
    }

    async fn rating_counts(&self) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT rating, COUNT(*)
            FROM catalog_content
            WHERE rating IS NOT NULL AND rating <> ''
            GROUP BY rating
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn distinct_ratings(&self) -> Result<Vec<String>> {
        let rows = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT rating
            FROM catalog_content
            WHERE rating IS NOT NULL AND rating <> ''
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn listed_in_values(&self) -> Result<Vec<String>> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT listed_in FROM catalog_content WHERE listed_in IS NOT NULL AND listed_in <> ''",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn country_values(&self) -> Result<Vec<String>> {
        let rows = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT country
            FROM catalog_content
            WHERE country IS NOT NULL AND country <> ''
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn upsert_batch(&self, rows: &[NewContent]) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        let mut tx = self.pool.begin().await?;

        for row in rows {
            let inserted = sqlx::query_scalar::<_, bool>(UPSERT_CONTENT)
                .bind(&row.show_id)
                .bind(&row.content_type)
                .bind(&row.title)
                .bind(&row.director)
                .bind(&row.cast_members)
                .bind(&row.country)
                .bind(&row.date_added)
                .bind(row.release_year)
                .bind(&row.rating)
                .bind(&row.duration)
                .bind(&row.listed_in)
                .bind(&row.description)
                .fetch_optional(&mut *tx)
                .await?;

            outcome.record(match inserted {
                Some(true) => RowOutcome::Inserted,
                Some(false) => RowOutcome::Updated,
                None => RowOutcome::Skipped,
            });
        }

        tx.commit().await?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("drama"), "%drama%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c:\\"), "%c:\\\\%");
    }
}
