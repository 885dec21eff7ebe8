use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::Trade;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub breakevens: usize,
    pub win_rate: f64,
    pub total_points: f64,
    pub total_result: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub profit_factor: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquityCurvePoint {
    pub date: String,
    pub cumulative_result: f64,
    pub daily_result: f64,
    pub trade_count: usize,
}

/// Aggregate performance figures over the given trades. NaN results (rows
/// imported with unparseable numbers) are left out of every aggregate.
pub fn dashboard_stats(trades: &[Trade]) -> DashboardStats {
    let mut wins = 0;
    let mut losses = 0;
    let mut breakevens = 0;
    let mut total_points = 0.0;
    let mut total_result = 0.0;
    let mut gross_profit = 0.0;
    let mut gross_loss = 0.0;
    let mut best_trade = f64::NEG_INFINITY;
    let mut worst_trade = f64::INFINITY;
    let mut counted = 0usize;

    for trade in trades {
        if trade.result.is_nan() {
            continue;
        }
        counted += 1;
        total_result += trade.result;
        if !trade.points.is_nan() {
            total_points += trade.points;
        }

        if trade.result > 0.0 {
            wins += 1;
            gross_profit += trade.result;
        } else if trade.result < 0.0 {
            losses += 1;
            gross_loss += trade.result.abs();
        } else {
            breakevens += 1;
        }

        best_trade = best_trade.max(trade.result);
        worst_trade = worst_trade.min(trade.result);
    }

    let closed = wins + losses;
    let win_rate = if closed > 0 {
        (wins as f64 / closed as f64) * 100.0
    } else {
        0.0
    };

    let profit_factor = if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    DashboardStats {
        total_trades: trades.len(),
        wins,
        losses,
        breakevens,
        win_rate,
        total_points,
        total_result,
        gross_profit,
        gross_loss,
        profit_factor,
        best_trade: if counted > 0 { best_trade } else { 0.0 },
        worst_trade: if counted > 0 { worst_trade } else { 0.0 },
    }
}

/// Daily cumulative result, grouped by trade date and sorted ascending.
pub fn equity_curve(trades: &[Trade]) -> Vec<EquityCurvePoint> {
    let mut daily: BTreeMap<String, (f64, usize)> = BTreeMap::new();

    for trade in trades {
        if trade.result.is_nan() {
            continue;
        }
        let entry = daily.entry(trade.date.clone()).or_insert((0.0, 0));
        entry.0 += trade.result;
        entry.1 += 1;
    }

    let mut cumulative = 0.0;
    daily
        .into_iter()
        .map(|(date, (daily_result, trade_count))| {
            cumulative += daily_result;
            EquityCurvePoint {
                date,
                cumulative_result: cumulative,
                daily_result,
                trade_count,
            }
        })
        .collect()
}
