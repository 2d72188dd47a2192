//! Price series models

use serde::{Deserialize, Serialize};

/// A single sample on a price series
///
/// `t` is milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub t: i64,
    pub price: f64,
}

impl PricePoint {
    pub fn new(t: i64, price: f64) -> Self {
        Self { t, price }
    }
}

/// Sort a series ascending by time
pub fn sort_ascending(points: &mut [PricePoint]) {
    points.sort_by_key(|p| p.t);
}
