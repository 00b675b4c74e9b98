use axum::{extract::State, routing::get, Json, Router};
use serde::Deserialize;
use validator::Validate;

use crate::error::Result;
use crate::extract::{PathParam, ValidatedQuery};
use crate::models::{
    ContentFilter, ContentRecord, ContentStats, Page, DEFAULT_PAGE_LIMIT,
};
use crate::validators::empty_string_as_none;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/content", get(list_content))
        .route("/content/", get(list_content))
        .route("/content/:id", get(get_content))
        .route("/content/search/query", get(search_content))
        .route("/content/by-rating/:rating", get(content_by_rating))
        .route("/content/by-category/:category", get(content_by_category))
        .route("/content/filters/ratings", get(all_ratings))
        .route("/content/filters/categories", get(all_categories))
        .route("/content/filters/countries", get(all_countries))
        .route("/content/stats/overview", get(statistics))
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "must be between 1 and 100"))]
    pub limit: i64,
    #[serde(default)]
    #[validate(range(min = 0, message = "must not be negative"))]
    pub offset: i64,
}

impl PageQuery {
    pub fn page(&self) -> Page {
        Page::new(self.limit, self.offset)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ContentQuery {
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    pub rating: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub release_year: Option<i32>,
    pub country: Option<String>,
    pub category: Option<String>,
    pub title: Option<String>,
    pub director: Option<String>,
    pub cast: Option<String>,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "must be between 1 and 100"))]
    pub limit: i64,
    #[serde(default)]
    #[validate(range(min = 0, message = "must not be negative"))]
    pub offset: i64,
}

impl ContentQuery {
    pub fn into_parts(self) -> (ContentFilter, Page) {
        let page = Page::new(self.limit, self.offset);
        let filter = ContentFilter {
            content_type: self.content_type,
            rating: self.rating,
            release_year: self.release_year,
            country: self.country,
            category: self.category,
            title: self.title,
            director: self.director,
            cast: self.cast,
        };
        (filter, page)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SearchQuery {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub q: String,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "must be between 1 and 100"))]
    pub limit: i64,
    #[serde(default)]
    #[validate(range(min = 0, message = "must not be negative"))]
    pub offset: i64,
}

impl SearchQuery {
    pub fn page(&self) -> Page {
        Page::new(self.limit, self.offset)
    }
}

async fn list_content(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<ContentQuery>,
) -> Result<Json<Vec<ContentRecord>>> {
    let (filter, page) = query.into_parts();
    Ok(Json(state.catalog_service().list(filter, page).await?))
}

async fn get_content(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<ContentRecord>> {
    Ok(Json(state.catalog_service().get(id).await?))
}

async fn search_content(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<SearchQuery>,
) -> Result<Json<Vec<ContentRecord>>> {
    Ok(Json(
        state
            .catalog_service()
            .search(&query.q, query.page())
            .await?,
    ))
}

async fn content_by_rating(
    State(state): State<AppState>,
    PathParam(rating): PathParam<String>,
    ValidatedQuery(query): ValidatedQuery<PageQuery>,
) -> Result<Json<Vec<ContentRecord>>> {
    Ok(Json(
        state
            .catalog_service()
            .by_rating(&rating, query.page())
            .await?,
    ))
}

async fn content_by_category(
    State(state): State<AppState>,
    PathParam(category): PathParam<String>,
    ValidatedQuery(query): ValidatedQuery<PageQuery>,
) -> Result<Json<Vec<ContentRecord>>> {
    Ok(Json(
        state
            .catalog_service()
            .by_category(&category, query.page())
            .await?,
    ))
}

async fn all_ratings(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    Ok(Json(state.catalog_service().ratings().await?))
}

async fn all_categories(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    Ok(Json(state.catalog_service().categories().await?))
}

async fn all_countries(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    Ok(Json(state.catalog_service().countries().await?))
}

async fn statistics(State(state): State<AppState>) -> Result<Json<ContentStats>> {
    Ok(Json(state.catalog_service().stats().await?))
}
