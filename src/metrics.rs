use crate::models::Side;

/// Monetary value of one point of the WDO mini-dollar contract, per lot.
/// A domain constant, not configurable per trade.
pub const POINT_VALUE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeMetrics {
    pub points: f64,
    pub result: f64,
}

/// Derive points and monetary result for a trade. Inputs are assumed
/// pre-validated; NaN propagates through for the caller to reject.
pub fn compute_metrics(side: Side, lots: f64, entry_price: f64, exit_price: f64) -> TradeMetrics {
    let points = match side {
        Side::Buy => exit_price - entry_price,
        Side::Sell => entry_price - exit_price,
    };
    let result = points * lots * POINT_VALUE;

    TradeMetrics {
        points: round2(points),
        result: round2(result),
    }
}

/// Round to 2 fractional digits, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
