use crate::models::PricePoint;

/// Price the market was trading at when `ts` (ms) happened
///
/// `series` must be ascending by `t`. Timestamps outside the series clamp to
/// its first or last price; inside, the bracketing pair is interpolated
/// linearly.
pub fn price_at(series: &[PricePoint], ts: i64) -> Option<f64> {
    let first = series.first()?;
    let last = series.last()?;
    if ts <= first.t {
        return Some(first.price);
    }
    if ts >= last.t {
        return Some(last.price);
    }

    // First index with t > ts; 1..len since first.t < ts < last.t
    let hi = series.partition_point(|p| p.t <= ts);
    let p0 = series[hi - 1];
    let p1 = series[hi];
    if p1.t == p0.t {
        return Some(p0.price);
    }

    let frac = (ts - p0.t) as f64 / (p1.t - p0.t) as f64;
    Some(p0.price + frac * (p1.price - p0.price))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(points: &[(i64, f64)]) -> Vec<PricePoint> {
        points.iter().map(|(t, p)| PricePoint::new(*t, *p)).collect()
    }

    #[test]
    fn test_midpoint() {
        let s = series(&[(0, 100.0), (100, 200.0)]);
        assert_eq!(price_at(&s, 50), Some(150.0));
    }

    #[test]
    fn test_clamps_to_ends() {
        let s = series(&[(10, 100.0), (20, 120.0), (30, 90.0)]);
        assert_eq!(price_at(&s, -5), Some(100.0));
        assert_eq!(price_at(&s, 10), Some(100.0));
        assert_eq!(price_at(&s, 30), Some(90.0));
        assert_eq!(price_at(&s, 1_000), Some(90.0));
    }

    #[test]
    fn test_exact_sample_hits() {
        let s = series(&[(10, 100.0), (20, 120.0), (30, 90.0)]);
        assert_eq!(price_at(&s, 20), Some(120.0));
    }

    #[test]
    fn test_stays_within_bracket() {
        let s = series(&[(0, 50.0), (7, 80.0), (13, 20.0), (40, 20.0), (41, 95.5), (100, 1.0)]);
        for ts in 0..=100 {
            let price = price_at(&s, ts).unwrap();
            let hi = s.partition_point(|p| p.t < ts).min(s.len() - 1);
            let lo = if s[hi].t == ts { hi } else { hi.saturating_sub(1) };
            let (a, b) = (s[lo].price, s[hi].price);
            assert!(price >= a.min(b) - 1e-9 && price <= a.max(b) + 1e-9, "ts={} price={}", ts, price);
        }
    }

    #[test]
    fn test_duplicate_timestamps() {
        let s = series(&[(0, 10.0), (50, 20.0), (50, 30.0), (100, 40.0)]);
        assert_eq!(price_at(&s, 50), Some(30.0));
        assert_eq!(price_at(&s, 75), Some(35.0));
    }

    #[test]
    fn test_empty_series() {
        assert_eq!(price_at(&[], 5), None);
    }
}
