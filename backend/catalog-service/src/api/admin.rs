use std::path::Path;

use axum::{
    extract::{Query, State},
    routing::post,
    Extension, Json, Router,
};
use serde::Deserialize;

use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::ImportReport;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/load-data", post(load_data))
}

#[derive(Debug, Deserialize)]
pub struct LoadDataQuery {
    pub csv_path: Option<String>,
}

async fn load_data(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<LoadDataQuery>,
) -> Result<Json<ImportReport>> {
    let csv_path = query
        .csv_path
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| state.config.catalog.default_csv_path.clone());

    tracing::info!(user_id = user.id, csv_path = %csv_path, "Catalog import requested");

    let report = state.data_loader().load_file(Path::new(&csv_path)).await?;
    Ok(Json(report))
}
