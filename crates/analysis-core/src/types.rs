use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Company profile scalars. Every field may be missing upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub long_name: Option<String>,
    pub sector: Option<String>,
    pub country: Option<String>,
    pub industry: Option<String>,
    pub current_price: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub beta: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub price_to_book: Option<f64>,
    pub dividend_rate: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub payout_ratio: Option<f64>,
    pub return_on_assets: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub current_ratio: Option<f64>,
    pub long_term_debt_to_equity: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub operating_margins: Option<f64>,
    pub profit_margins: Option<f64>,
}

/// A financial statement: line-item name to per-period values, most recent period first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementTable {
    /// Period end dates, aligned with the value columns.
    #[serde(default)]
    pub periods: Vec<NaiveDate>,
    #[serde(default)]
    pub items: BTreeMap<String, Vec<Option<f64>>>,
}

impl StatementTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(mut self, name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        self.insert(name, values);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<Option<f64>>) {
        self.items.insert(name.into(), values);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All period values of a line item, or `None` if the statement does not carry it.
    pub fn line(&self, name: &str) -> Option<&[Option<f64>]> {
        self.items.get(name).map(Vec::as_slice)
    }

    /// Most recent value of a line item. `None` when the item is absent or its
    /// latest period has no value.
    pub fn latest(&self, name: &str) -> Option<f64> {
        self.line(name)
            .and_then(|values| values.first().copied().flatten())
            .filter(|v| v.is_finite())
    }

    /// End date of the most recent period, when known.
    pub fn latest_period(&self) -> Option<NaiveDate> {
        self.periods.first().copied()
    }
}

/// Everything one fetch returns for a ticker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFinancials {
    pub symbol: String,
    pub profile: Option<Profile>,
    pub balance_sheet: Option<StatementTable>,
    pub income_statement: Option<StatementTable>,
    pub cash_flow: Option<StatementTable>,
}

/// Ratios derived from one [`RawFinancials`]. Fields the inputs could not
/// support are `None`, never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub ticker: String,
    #[serde(flatten)]
    pub profile: Profile,
    pub price_to_fcf: Option<f64>,
    pub wacc: Option<f64>,
    pub total_debt: Option<f64>,
    pub total_equity: Option<f64>,
    pub roic: Option<f64>,
    pub eva: Option<f64>,
    pub balance_sheet_as_of: Option<NaiveDate>,
}

/// Placeholder stored for a ticker whose fetch failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedAnalysis {
    pub ticker: String,
    pub error: String,
}

/// One cached outcome per ticker.
///
/// `Failed` comes first: untagged variants are tried in order and every
/// `DerivedMetrics` field but `ticker` is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisRecord {
    Failed(FailedAnalysis),
    Metrics(DerivedMetrics),
}

impl AnalysisRecord {
    pub fn ticker(&self) -> &str {
        match self {
            AnalysisRecord::Metrics(m) => &m.ticker,
            AnalysisRecord::Failed(f) => &f.ticker,
        }
    }

    pub fn metrics(&self) -> Option<&DerivedMetrics> {
        match self {
            AnalysisRecord::Metrics(m) => Some(m),
            AnalysisRecord::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AnalysisRecord::Metrics(_) => None,
            AnalysisRecord::Failed(f) => Some(&f.error),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, AnalysisRecord::Failed(_))
    }
}
