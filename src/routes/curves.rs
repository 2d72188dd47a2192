use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use super::{detached, BatchRequest, WindowParams};
use crate::models::CurveResult;
use crate::state::AppState;
use crate::utils::errors::RouteError;

/// |return| below this reads as a flat day
const TREND_THRESHOLD: f64 = 0.005;

#[derive(Debug, Serialize)]
pub struct CurvesResponse {
    pub window: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub coins: Vec<String>,
    pub curves: Vec<CurveResult>,
    /// One text line per successful summary, with its trend
    pub text: Vec<String>,
}

pub fn routes() -> axum::Router<Arc<AppState>> {
    Router::new().route("/api/curves", get(api_curves))
}

fn describe_all(curves: &[CurveResult]) -> Vec<String> {
    curves
        .iter()
        .filter_map(|c| match c {
            CurveResult::Summary(s) => Some(format!("{} trend={}", s.describe(), s.trend_direction(TREND_THRESHOLD))),
            CurveResult::Failure(_) => None,
        })
        .collect()
}

/// GET /api/curves?coins=BTC,ETH&date=YYYY-MM-DD&window=yesterday|ytd
async fn api_curves(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WindowParams>,
) -> Result<Json<CurvesResponse>, RouteError> {
    let request = BatchRequest::resolve(&params, state.clock.now())?;
    let (service, coins, window) = (state.curves.clone(), request.coins.clone(), request.window);
    let curves = detached(async move { service.get_curves(&coins, &window).await }).await?;

    Ok(Json(CurvesResponse {
        window: request.window_name(),
        date: request.date(),
        coins: request.coins,
        text: describe_all(&curves),
        curves,
    }))
}
