use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::api::state::AppState;
use crate::api::ApiError;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub collections: BTreeMap<&'static str, usize>,
}

pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let collections = state
        .store
        .counts()
        .await?
        .into_iter()
        .map(|(c, n)| (c.filename().trim_end_matches(".jsonl"), n))
        .collect();

    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        collections,
    }))
}
