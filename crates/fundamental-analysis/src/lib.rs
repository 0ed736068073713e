use analysis_core::{line_items, DerivedMetrics, RawFinancials, StatementTable};
use serde::{Deserialize, Serialize};

pub const RISK_FREE_RATE: f64 = 0.0435;
pub const EXPECTED_MARKET_RETURN: f64 = 0.085;
pub const COST_OF_DEBT: f64 = 0.055;
pub const CORPORATE_TAX_RATE: f64 = 0.21;

/// Capital-market inputs of the WACC estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapitalMarketAssumptions {
    pub risk_free_rate: f64,
    pub expected_market_return: f64,
    /// Pre-tax rate applied whenever the company carries any debt.
    pub cost_of_debt: f64,
    pub tax_rate: f64,
}

impl Default for CapitalMarketAssumptions {
    fn default() -> Self {
        Self {
            risk_free_rate: RISK_FREE_RATE,
            expected_market_return: EXPECTED_MARKET_RETURN,
            cost_of_debt: COST_OF_DEBT,
            tax_rate: CORPORATE_TAX_RATE,
        }
    }
}

/// Derives valuation and solvency ratios from one ticker's raw records.
///
/// Every step works on `Option`s: a missing or unusable input makes that
/// step, and everything downstream of it, `None`. Nothing here fails.
pub struct FundamentalAnalysisEngine {
    assumptions: CapitalMarketAssumptions,
}

impl FundamentalAnalysisEngine {
    pub fn new() -> Self {
        Self::with_assumptions(CapitalMarketAssumptions::default())
    }

    pub fn with_assumptions(assumptions: CapitalMarketAssumptions) -> Self {
        Self { assumptions }
    }

    pub fn assumptions(&self) -> &CapitalMarketAssumptions {
        &self.assumptions
    }

    pub fn derive(&self, raw: RawFinancials) -> DerivedMetrics {
        let profile = raw.profile.unwrap_or_default();
        let price = profile.current_price;
        let shares = profile.shares_outstanding;

        let total_debt = raw.balance_sheet.as_ref().and_then(calculate_total_debt);
        let total_equity = raw
            .balance_sheet
            .as_ref()
            .and_then(|bs| bs.latest(line_items::TOTAL_STOCKHOLDER_EQUITY));

        let cost_of_equity = profile.beta.and_then(|beta| self.cost_of_equity(beta));
        let market_cap = price.zip(shares).and_then(|(p, s)| finite(p * s));
        let wacc = match (market_cap, total_debt, cost_of_equity) {
            (Some(e), Some(d), Some(re)) => self.calculate_wacc(e, d, re),
            _ => None,
        };

        let operating_cash_flow = raw
            .cash_flow
            .as_ref()
            .and_then(|cf| cf.latest(line_items::OPERATING_CASH_FLOW));
        let price_to_fcf = match (price, operating_cash_flow, shares) {
            (Some(p), Some(ocf), Some(s)) => self.calculate_price_to_fcf(p, ocf, s),
            _ => None,
        };

        let invested_capital = total_debt.zip(total_equity).and_then(|(d, e)| finite(d + e));
        let ebit = raw
            .income_statement
            .as_ref()
            .and_then(|is| is.latest(line_items::EBIT));
        let roic = match (ebit, invested_capital) {
            (Some(ebit), Some(capital)) => self.calculate_roic(ebit, capital),
            _ => None,
        };
        let eva = roic.zip(wacc).and_then(|(r, w)| finite(r - w));

        DerivedMetrics {
            ticker: raw.symbol,
            profile,
            price_to_fcf,
            wacc,
            total_debt,
            total_equity,
            roic,
            eva,
            balance_sheet_as_of: raw.balance_sheet.as_ref().and_then(StatementTable::latest_period),
        }
    }

    /// CAPM: Rf + beta * (Rm - Rf).
    pub fn cost_of_equity(&self, beta: f64) -> Option<f64> {
        let a = &self.assumptions;
        finite(a.risk_free_rate + beta * (a.expected_market_return - a.risk_free_rate))
    }

    /// Zero for a debt-free company, the fixed rate otherwise.
    pub fn cost_of_debt(&self, total_debt: f64) -> f64 {
        if total_debt > 0.0 {
            self.assumptions.cost_of_debt
        } else {
            0.0
        }
    }

    pub fn calculate_wacc(&self, market_cap: f64, total_debt: f64, cost_of_equity: f64) -> Option<f64> {
        let capital = market_cap + total_debt;
        if capital == 0.0 {
            return None;
        }
        let rd = self.cost_of_debt(total_debt);
        finite(
            (market_cap / capital) * cost_of_equity
                + (total_debt / capital) * rd * (1.0 - self.assumptions.tax_rate),
        )
    }

    fn calculate_price_to_fcf(&self, price: f64, operating_cash_flow: f64, shares: f64) -> Option<f64> {
        if shares == 0.0 {
            return None;
        }
        let cash_flow_per_share = operating_cash_flow / shares;
        if cash_flow_per_share == 0.0 {
            return None;
        }
        finite(price / cash_flow_per_share)
    }

    fn calculate_roic(&self, ebit: f64, invested_capital: f64) -> Option<f64> {
        if invested_capital == 0.0 {
            None
        } else {
            finite(ebit / invested_capital)
        }
    }
}

impl Default for FundamentalAnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive with the default capital-market assumptions.
pub fn derive(raw: RawFinancials) -> DerivedMetrics {
    FundamentalAnalysisEngine::new().derive(raw)
}

/// Long-term plus short-term debt from the latest period. A debt line the
/// statement does not carry counts as zero; an empty statement, or a carried
/// line without a latest value, leaves the total undefined.
fn calculate_total_debt(sheet: &StatementTable) -> Option<f64> {
    if sheet.is_empty() {
        return None;
    }
    let long_term = debt_component(sheet, line_items::LONG_TERM_DEBT)?;
    let short_term = debt_component(sheet, line_items::SHORT_LONG_TERM_DEBT)?;
    finite(long_term + short_term)
}

fn debt_component(sheet: &StatementTable, name: &str) -> Option<f64> {
    match sheet.line(name) {
        None => Some(0.0),
        Some(_) => sheet.latest(name),
    }
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
