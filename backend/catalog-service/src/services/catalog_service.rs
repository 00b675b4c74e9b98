use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::db::ContentStore;
use crate::error::{AppError, Result};
use crate::models::{
    CategoryCount, ContentFilter, ContentRecord, ContentStats, FilterValues, Page, RatingCount,
};

pub const MOVIE: &str = "Movie";
pub const TV_SHOW: &str = "TV Show";
const TOP_CATEGORIES: usize = 20;

pub struct CatalogService {
    content: Arc<dyn ContentStore>,
}

impl CatalogService {
    pub fn new(content: Arc<dyn ContentStore>) -> Self {
        Self { content }
    }

    pub async fn list(&self, filter: ContentFilter, page: Page) -> Result<Vec<ContentRecord>> {
        self.content.list(&filter.normalized(), page).await
    }

    pub async fn search(&self, q: &str, page: Page) -> Result<Vec<ContentRecord>> {
        self.content.search(q, page).await
    }

    pub async fn get(&self, id: i64) -> Result<ContentRecord> {
        self.content
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("content {id}")))
    }

    pub async fn by_rating(&self, rating: &str, page: Page) -> Result<Vec<ContentRecord>> {
        let filter = ContentFilter {
            rating: Some(rating.to_string()),
            ..ContentFilter::default()
        };
        self.content.list(&filter, page).await
    }

    pub async fn by_category(&self, category: &str, page: Page) -> Result<Vec<ContentRecord>> {
        let filter = ContentFilter {
            category: Some(category.to_string()),
            ..ContentFilter::default()
        };
        self.content.list(&filter, page).await
    }

    pub async fn ratings(&self) -> Result<Vec<String>> {
        let ratings = self.content.distinct_ratings().await?;
        Ok(ratings
            .into_iter()
            .filter(|r| !r.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect())
    }

    pub async fn categories(&self) -> Result<Vec<String>> {
        Ok(split_unique(&self.content.listed_in_values().await?))
    }

    pub async fn countries(&self) -> Result<Vec<String>> {
        Ok(split_unique(&self.content.country_values().await?))
    }

    pub async fn filter_values(&self) -> Result<FilterValues> {
        Ok(FilterValues {
            ratings: self.ratings().await?,
            countries: self.countries().await?,
            categories: self.categories().await?,
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn stats(&self) -> Result<ContentStats> {
        let total_content = self.content.count(None).await?;
        let movies = self.content.count(Some(MOVIE)).await?;
        let tv_shows = self.content.count(Some(TV_SHOW)).await?;
        let rating_counts = self.content.rating_counts().await?;
        let listed_in = self.content.listed_in_values().await?;

        Ok(ContentStats {
            total_content,
            movies,
            tv_shows,
            by_rating: rank_ratings(rating_counts),
            by_category: top_categories(&listed_in, TOP_CATEGORIES),
        })
    }
}

/// Split comma separated values, trim them and return the sorted unique set.
pub fn split_unique(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Order by count descending, then rating ascending.
pub fn rank_ratings(counts: Vec<(String, i64)>) -> Vec<RatingCount> {
    let mut ranked: Vec<RatingCount> = counts
        .into_iter()
        .filter(|(rating, _)| !rating.is_empty())
        .map(|(rating, count)| RatingCount { rating, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.rating.cmp(&b.rating)));
    ranked
}

/// Count each comma separated category and keep the `limit` most frequent.
pub fn top_categories(listed_in: &[String], limit: usize) -> Vec<CategoryCount> {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for category in listed_in
        .iter()
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|c| !c.is_empty())
    {
        *counts.entry(category).or_insert(0) += 1;
    }

    let mut ranked: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(category, count)| CategoryCount {
            category: category.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.category.cmp(&b.category))
    });
    ranked.truncate(limit);
    ranked
}
