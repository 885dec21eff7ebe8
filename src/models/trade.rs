use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics;
use crate::numeric::parse_number;

/// Trade direction. Wire labels are the Portuguese ones used by the
/// spreadsheet mirror and the CSV export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "Compra", alias = "Buy")]
    Buy,
    #[serde(rename = "Venda", alias = "Sell")]
    Sell,
}

impl Side {
    pub fn label(&self) -> &'static str {
        match self {
            Side::Buy => "Compra",
            Side::Sell => "Venda",
        }
    }

    /// Lenient parse accepting the wire label, the English name or the
    /// single-letter shorthand used by older exports.
    pub fn parse(text: &str) -> Option<Side> {
        match text.trim().to_lowercase().as_str() {
            "compra" | "buy" | "c" => Some(Side::Buy),
            "venda" | "sell" | "v" => Some(Side::Sell),
            _ => None,
        }
    }
}

impl Default for Side {
    fn default() -> Self {
        Side::Buy
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single journal entry. `id` is the reconciliation key and is never
/// reassigned; `trade_number` is a display sequence assigned at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: i64,
    #[serde(default)]
    pub trade_number: u32,
    pub asset: String,
    pub side: Side,
    /// ISO `YYYY-MM-DD`, no time-of-day component.
    pub date: String,
    pub lots: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub points: f64,
    pub result: f64,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub structure: String,
    #[serde(default)]
    pub trigger: String,
}

/// Raw form input as the user typed it. Numeric fields are locale strings
/// ("1.234,56" and "12,5" are both valid) and are normalized during
/// validation, never at the call sites.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeForm {
    pub asset: String,
    pub side: Side,
    pub date: String,
    pub lots: String,
    pub entry_price: String,
    pub exit_price: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub structure: String,
    #[serde(default)]
    pub trigger: String,
}

/// A validated trade record, ready for metric derivation and insertion.
#[derive(Debug, Clone)]
pub struct TradeDraft {
    pub asset: String,
    pub side: Side,
    pub date: String,
    pub lots: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub notes: String,
    pub region: String,
    pub structure: String,
    pub trigger: String,
}

impl TradeDraft {
    /// Materialize a full trade with derived metrics under the given
    /// identity.
    pub fn into_trade(self, id: i64, trade_number: u32) -> Trade {
        let m = metrics::compute_metrics(self.side, self.lots, self.entry_price, self.exit_price);
        Trade {
            id,
            trade_number,
            asset: self.asset,
            side: self.side,
            date: self.date,
            lots: self.lots,
            entry_price: self.entry_price,
            exit_price: self.exit_price,
            points: m.points,
            result: m.result,
            notes: self.notes,
            region: self.region,
            structure: self.structure,
            trigger: self.trigger,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("asset must not be empty")]
    EmptyAsset,

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("field '{field}' is not a valid number: '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("lots must be a positive quantity, got {0}")]
    NonPositiveLots(f64),
}

/// Validate a raw form into a draft. Pure function over the structured
/// input record; rejects before any store mutation so there is never
/// partial state.
pub fn validate(form: &TradeForm) -> Result<TradeDraft, ValidationError> {
    let asset = form.asset.trim().to_string();
    if asset.is_empty() {
        return Err(ValidationError::EmptyAsset);
    }

    let date = NaiveDate::parse_from_str(form.date.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(form.date.clone()))?
        .format("%Y-%m-%d")
        .to_string();

    let lots = parse_field("lots", &form.lots)?;
    if !(lots > 0.0) {
        return Err(ValidationError::NonPositiveLots(lots));
    }
    let entry_price = parse_field("entryPrice", &form.entry_price)?;
    let exit_price = parse_field("exitPrice", &form.exit_price)?;

    Ok(TradeDraft {
        asset,
        side: form.side,
        date,
        lots,
        entry_price,
        exit_price,
        notes: form.notes.trim().to_string(),
        region: form.region.trim().to_string(),
        structure: form.structure.trim().to_string(),
        trigger: form.trigger.trim().to_string(),
    })
}

fn parse_field(field: &'static str, value: &str) -> Result<f64, ValidationError> {
    let n = parse_number(value);
    if n.is_nan() {
        return Err(ValidationError::InvalidNumber {
            field,
            value: value.to_string(),
        });
    }
    Ok(n)
}

/// Result-sign selector for the filter bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultSign {
    Positive,
    Negative,
    Zero,
}

impl ResultSign {
    pub fn matches(&self, result: f64) -> bool {
        match self {
            ResultSign::Positive => result > 0.0,
            ResultSign::Negative => result < 0.0,
            ResultSign::Zero => result == 0.0,
        }
    }
}

/// Transient projection over the ledger. Never mutates it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeFilters {
    pub asset: Option<String>,
    pub side: Option<Side>,
    pub date: Option<String>,
    pub result_sign: Option<ResultSign>,
    pub region: Option<String>,
    pub structure: Option<String>,
    pub trigger: Option<String>,
}

impl TradeFilters {
    pub fn matches(&self, trade: &Trade) -> bool {
        if let Some(asset) = &self.asset {
            if !trade.asset.to_lowercase().contains(&asset.to_lowercase()) {
                return false;
            }
        }
        if let Some(side) = self.side {
            if trade.side != side {
                return false;
            }
        }
        if let Some(date) = &self.date {
            if &trade.date != date {
                return false;
            }
        }
        if let Some(sign) = self.result_sign {
            if !sign.matches(trade.result) {
                return false;
            }
        }
        if let Some(region) = &self.region {
            if &trade.region != region {
                return false;
            }
        }
        if let Some(structure) = &self.structure {
            if &trade.structure != structure {
                return false;
            }
        }
        if let Some(trigger) = &self.trigger {
            if &trade.trigger != trigger {
                return false;
            }
        }
        true
    }
}
