//! Table and chart models handed to the presentation layer.

use crate::cache::ResultCache;
use analysis_core::{AnalysisRecord, DerivedMetrics};
use chrono::NaiveDate;
use serde::Serialize;

/// How a column's numbers should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    Text,
    Number,
    /// Fraction shown as a percentage.
    Percent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Column {
    pub header: &'static str,
    pub kind: ColumnKind,
}

const fn column(header: &'static str, kind: ColumnKind) -> Column {
    Column { header, kind }
}

/// Main ratio table layout. Total debt, total equity and error text are not
/// columns here; debt and equity are charted through [`SolvencyBreakdown`].
pub const RATIO_COLUMNS: [Column; 22] = [
    column("Ticker", ColumnKind::Text),
    column("Name", ColumnKind::Text),
    column("Sector", ColumnKind::Text),
    column("Country", ColumnKind::Text),
    column("Industry", ColumnKind::Text),
    column("Price", ColumnKind::Number),
    column("P/E", ColumnKind::Number),
    column("P/B", ColumnKind::Number),
    column("P/FCF", ColumnKind::Number),
    column("Dividend Rate", ColumnKind::Number),
    column("Dividend Yield", ColumnKind::Percent),
    column("Payout Ratio", ColumnKind::Percent),
    column("ROA", ColumnKind::Percent),
    column("ROE", ColumnKind::Percent),
    column("Current Ratio", ColumnKind::Number),
    column("LtDebt/Eq", ColumnKind::Number),
    column("Debt/Eq", ColumnKind::Number),
    column("Oper Margin", ColumnKind::Percent),
    column("Profit Margin", ColumnKind::Percent),
    column("WACC", ColumnKind::Percent),
    column("ROIC", ColumnKind::Percent),
    column("EVA", ColumnKind::Percent),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    fn text(value: &Option<String>) -> Self {
        value.clone().map(Cell::Text).unwrap_or(Cell::Empty)
    }

    fn number(value: Option<f64>) -> Self {
        value.map(Cell::Number).unwrap_or(Cell::Empty)
    }
}

/// One row per cached ticker, cells aligned with [`RATIO_COLUMNS`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatioRow {
    pub ticker: String,
    pub cells: Vec<Cell>,
    pub failed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatioTable {
    pub columns: &'static [Column],
    pub rows: Vec<RatioRow>,
}

impl RatioTable {
    pub fn from_cache(cache: &ResultCache) -> Self {
        Self {
            columns: &RATIO_COLUMNS,
            rows: cache.iter().map(ratio_row).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn ratio_row(record: &AnalysisRecord) -> RatioRow {
    let ticker = record.ticker().to_string();
    let cells = match record {
        AnalysisRecord::Metrics(m) => metric_cells(m),
        AnalysisRecord::Failed(_) => {
            let mut cells = vec![Cell::Empty; RATIO_COLUMNS.len()];
            cells[0] = Cell::Text(ticker.clone());
            cells
        }
    };
    RatioRow {
        ticker,
        cells,
        failed: record.is_failure(),
    }
}

fn metric_cells(m: &DerivedMetrics) -> Vec<Cell> {
    let p = &m.profile;
    vec![
        Cell::Text(m.ticker.clone()),
        Cell::text(&p.long_name),
        Cell::text(&p.sector),
        Cell::text(&p.country),
        Cell::text(&p.industry),
        Cell::number(p.current_price),
        Cell::number(p.trailing_pe),
        Cell::number(p.price_to_book),
        Cell::number(m.price_to_fcf),
        Cell::number(p.dividend_rate),
        Cell::number(p.dividend_yield),
        Cell::number(p.payout_ratio),
        Cell::number(p.return_on_assets),
        Cell::number(p.return_on_equity),
        Cell::number(p.current_ratio),
        Cell::number(p.long_term_debt_to_equity),
        Cell::number(p.debt_to_equity),
        Cell::number(p.operating_margins),
        Cell::number(p.profit_margins),
        Cell::number(m.wacc),
        Cell::number(m.roic),
        Cell::number(m.eva),
    ]
}

/// Debt versus equity for one ticker, in currency units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolvencyBreakdown {
    pub ticker: String,
    pub total_debt: Option<f64>,
    pub total_equity: Option<f64>,
    pub as_of: Option<NaiveDate>,
}

impl SolvencyBreakdown {
    /// `None` for tickers never analyzed or whose fetch failed.
    pub fn from_cache(cache: &ResultCache, ticker: &str) -> Option<Self> {
        let metrics = cache.get(ticker)?.metrics()?;
        Some(Self {
            ticker: metrics.ticker.clone(),
            total_debt: metrics.total_debt,
            total_equity: metrics.total_equity,
            as_of: metrics.balance_sheet_as_of,
        })
    }

    pub fn categories(&self) -> [(&'static str, Option<f64>); 2] {
        [("Total Debt", self.total_debt), ("Total Equity", self.total_equity)]
    }
}
