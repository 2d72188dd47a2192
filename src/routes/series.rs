use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use super::{detached, BatchRequest, WindowParams};
use crate::models::SeriesResult;
use crate::state::AppState;
use crate::utils::errors::RouteError;

#[derive(Debug, Serialize)]
pub struct SeriesResponse {
    pub window: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub coins: Vec<String>,
    pub series: Vec<SeriesResult>,
}

pub fn routes() -> axum::Router<Arc<AppState>> {
    Router::new().route("/api/series", get(api_series))
}

/// GET /api/series?coins=BTC,ETH&date=YYYY-MM-DD&window=yesterday|ytd
async fn api_series(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WindowParams>,
) -> Result<Json<SeriesResponse>, RouteError> {
    let request = BatchRequest::resolve(&params, state.clock.now())?;
    let (curves, coins, window) = (state.curves.clone(), request.coins.clone(), request.window);
    let series = detached(async move { curves.get_series_batch(&coins, &window).await }).await?;

    Ok(Json(SeriesResponse {
        window: request.window_name(),
        date: request.date(),
        coins: request.coins,
        series,
    }))
}
