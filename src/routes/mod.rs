pub mod curves;
pub mod news_points;
pub mod series;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::coin::parse_coin_list;
use crate::models::{TimeWindow, WindowKind};
use crate::services::window_service::{self, WindowError};
use crate::state::AppState;
use crate::utils::errors::RouteError;

/// Assemble the API router.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(series::routes())
        .merge(curves::routes())
        .merge(news_points::routes())
}

/// Run handler work on its own task so a panic becomes a 500 instead of a dropped connection
pub async fn detached<F>(work: F) -> Result<F::Output, RouteError>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    Ok(tokio::spawn(work).await?)
}

/// `?coins=&date=&window=`
#[derive(Debug, Default, Deserialize)]
pub struct WindowParams {
    pub coins: Option<String>,
    pub date: Option<String>,
    pub window: Option<String>,
}

/// Coins and window resolved from a batch request
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub coins: Vec<String>,
    pub window: TimeWindow,
}

impl BatchRequest {
    pub fn resolve(params: &WindowParams, now: DateTime<Utc>) -> Result<Self, WindowError> {
        let window = window_service::resolve(params.window.as_deref(), params.date.as_deref(), now)?;
        let mut coins = parse_coin_list(params.coins.as_deref().unwrap_or("BTC"));
        if coins.is_empty() {
            coins.push("BTC".to_string());
        }
        Ok(Self { coins, window })
    }

    /// Response `window` field: `date`, `ytd` or `yesterday`
    pub fn window_name(&self) -> &'static str {
        match self.window.kind {
            WindowKind::Day(_) => "date",
            WindowKind::YearToDate => "ytd",
            WindowKind::Yesterday => "yesterday",
        }
    }

    /// Response `date` field, for day windows only
    pub fn date(&self) -> Option<String> {
        match self.window.kind {
            WindowKind::Day(d) => Some(d.format("%Y-%m-%d").to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_detached_work_returns_its_output() {
        assert_eq!(detached(async { 7 }).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_panicking_work_is_server_error() {
        let err = detached(async {
            if true {
                panic!("provider bug");
            }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, RouteError::Internal(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap()
    }

    fn params(coins: Option<&str>, date: Option<&str>, window: Option<&str>) -> WindowParams {
        WindowParams {
            coins: coins.map(str::to_string),
            date: date.map(str::to_string),
            window: window.map(str::to_string),
        }
    }

    #[test]
    fn test_defaults_to_btc_today() {
        let req = BatchRequest::resolve(&WindowParams::default(), now()).unwrap();
        assert_eq!(req.coins, vec!["BTC"]);
        assert_eq!(req.window_name(), "date");
        assert_eq!(req.date().as_deref(), Some("2024-03-15"));
    }

    #[test]
    fn test_date_wins_over_window() {
        let req = BatchRequest::resolve(&params(Some("eth, sol,"), Some("2024-01-02"), Some("ytd")), now()).unwrap();
        assert_eq!(req.coins, vec!["ETH", "SOL"]);
        assert_eq!(req.window_name(), "date");
        assert_eq!(req.window.from_iso(), "2024-01-02T00:00:00.000Z");
    }

    #[test]
    fn test_named_windows() {
        let ytd = BatchRequest::resolve(&params(None, None, Some("YTD")), now()).unwrap();
        assert_eq!(ytd.window_name(), "ytd");
        assert_eq!(ytd.date(), None);

        let y = BatchRequest::resolve(&params(Some(" , "), Some(""), Some("yesterday")), now()).unwrap();
        assert_eq!(y.window_name(), "yesterday");
        assert_eq!(y.coins, vec!["BTC"]);
    }

    #[test]
    fn test_bad_date_is_rejected() {
        let err = BatchRequest::resolve(&params(None, Some("2024-13-40"), None), now()).unwrap_err();
        assert!(matches!(err, WindowError::InvalidDate(_)));
    }
}
