use serde::Deserialize;

use crate::models::PricePoint;

/// Response of `/coins/{id}/market_chart` and `/coins/{id}/market_chart/range`
///
/// `prices` is a list of `[timestamp_ms, price]` pairs.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketChartResponse {
    #[serde(default)]
    pub prices: Vec<(f64, f64)>,
}

impl MarketChartResponse {
    pub fn into_points(self) -> Vec<PricePoint> {
        self.prices
            .into_iter()
            .filter(|(t, p)| t.is_finite() && p.is_finite())
            .map(|(t, p)| PricePoint::new(t as i64, p))
            .collect()
    }
}

/// API key header flavour
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKey {
    Pro(String),
    Demo(String),
    None,
}

impl ApiKey {
    /// Pro key wins over demo key; empty strings count as absent
    pub fn from_keys(pro: &str, demo: &str) -> Self {
        if !pro.is_empty() {
            ApiKey::Pro(pro.to_string())
        } else if !demo.is_empty() {
            ApiKey::Demo(demo.to_string())
        } else {
            ApiKey::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_chart_decodes_pairs() {
        let body = r#"{"prices":[[1710374400000,71000.5],[1710378000000.0,71250.25]],"market_caps":[]}"#;
        let parsed: MarketChartResponse = serde_json::from_str(body).unwrap();
        let points = parsed.into_points();
        assert_eq!(points, vec![PricePoint::new(1710374400000, 71000.5), PricePoint::new(1710378000000, 71250.25)]);
    }

    #[test]
    fn test_missing_prices_is_empty() {
        let parsed: MarketChartResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.into_points().is_empty());
    }

    #[test]
    fn test_api_key_precedence() {
        assert_eq!(ApiKey::from_keys("p", "d"), ApiKey::Pro("p".to_string()));
        assert_eq!(ApiKey::from_keys("", "d"), ApiKey::Demo("d".to_string()));
        assert_eq!(ApiKey::from_keys("", ""), ApiKey::None);
    }
}
