//! Statement line-item names as they appear in a [`StatementTable`](crate::StatementTable).

pub const LONG_TERM_DEBT: &str = "Long Term Debt";
pub const SHORT_LONG_TERM_DEBT: &str = "Short Long Term Debt";
pub const TOTAL_STOCKHOLDER_EQUITY: &str = "Total Stockholder Equity";
pub const EBIT: &str = "EBIT";
pub const OPERATING_CASH_FLOW: &str = "Total Cash From Operating Activities";
