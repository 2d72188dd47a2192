use serde_json::Value;

use crate::api::fetcher::ApiError;
use crate::models::PricePoint;

/// Index of the open time in a kline row
const OPEN_TIME: usize = 0;
/// Index of the close price in a kline row (sent as a string)
const CLOSE: usize = 4;

/// Normalize `/api/v3/klines` rows into `(open time, close)` points
///
/// Rows are heterogeneous arrays: `[openTime, "open", "high", "low", "close", ...]`.
pub fn klines_to_points(rows: Vec<Vec<Value>>) -> Result<Vec<PricePoint>, ApiError> {
    rows.iter()
        .map(|row| {
            let t = row
                .get(OPEN_TIME)
                .and_then(Value::as_i64)
                .ok_or_else(|| ApiError::DeserializationError("kline missing open time".to_string()))?;
            let close = row
                .get(CLOSE)
                .and_then(|v| match v {
                    Value::String(s) => s.parse::<f64>().ok(),
                    Value::Number(n) => n.as_f64(),
                    _ => None,
                })
                .ok_or_else(|| ApiError::DeserializationError("kline missing close price".to_string()))?;
            Ok(PricePoint::new(t, close))
        })
        .collect()
}
