use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use super::detached;
use crate::services::news_points_service::NewsPoints;
use crate::services::window_service;
use crate::state::AppState;
use crate::utils::errors::RouteError;

#[derive(Debug, Default, Deserialize)]
pub struct NewsPointsParams {
    pub coin: Option<String>,
    pub date: Option<String>,
    pub window: Option<String>,
}

pub fn routes() -> axum::Router<Arc<AppState>> {
    Router::new().route("/api/news_points", get(api_news_points))
}

/// GET /api/news_points?coin=BTC&date=YYYY-MM-DD&window=yesterday|ytd
async fn api_news_points(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NewsPointsParams>,
) -> Result<Json<NewsPoints>, RouteError> {
    let coin = params
        .coin
        .as_deref()
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| "BTC".to_string());
    let window = window_service::resolve(params.window.as_deref(), params.date.as_deref(), state.clock.now())?;

    let points = detached(async move { state.news_points.news_points(&coin, &window).await }).await?;
    Ok(Json(points))
}
