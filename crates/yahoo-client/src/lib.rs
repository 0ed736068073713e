use analysis_core::{AnalysisError, FinancialDataSource, Profile, RawFinancials, StatementTable};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::Mutex;

pub const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";
pub const DEFAULT_COOKIE_URL: &str = "https://fc.yahoo.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

const MODULES: &str = "price,summaryDetail,defaultKeyStatistics,financialData,assetProfile,\
balanceSheetHistory,incomeStatementHistory,cashflowStatementHistory";

/// Modules merged into the flat profile, earlier entries win on key collisions.
const PROFILE_MODULES: [&str; 5] = [
    "financialData",
    "summaryDetail",
    "defaultKeyStatistics",
    "price",
    "assetProfile",
];

#[derive(Debug, Clone)]
pub struct YahooConfig {
    pub base_url: String,
    /// Page visited once before the crumb request so the session carries Yahoo's cookie.
    pub cookie_url: Option<String>,
    pub timeout: Duration,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cookie_url: Some(DEFAULT_COOKIE_URL.to_string()),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Yahoo Finance `quoteSummary` client. One [`fetch`](FinancialDataSource::fetch) is one request.
pub struct YahooClient {
    client: Client,
    base_url: String,
    cookie_url: Option<String>,
    /// Outer `None` until the handshake has been attempted; the inner value is its outcome.
    crumb: Mutex<Option<Option<String>>>,
}

impl YahooClient {
    pub fn new(config: YahooConfig) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .timeout(config.timeout)
            .build()
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cookie_url: config.cookie_url,
            crumb: Mutex::new(None),
        })
    }

    /// Session crumb. The handshake runs once per session and its outcome is kept,
    /// so a failed handshake is not repeated for every ticker; requests then go
    /// out without a crumb.
    async fn crumb(&self) -> Option<String> {
        let mut cached = self.crumb.lock().await;
        if let Some(outcome) = cached.as_ref() {
            return outcome.clone();
        }

        let crumb = self.request_crumb().await;
        if crumb.is_none() {
            tracing::warn!("Yahoo crumb handshake failed, continuing without a crumb");
        }
        *cached = Some(crumb.clone());
        crumb
    }

    /// Forget a crumb Yahoo rejected so the next fetch performs a new handshake.
    async fn invalidate_crumb(&self, rejected: &str) {
        let mut cached = self.crumb.lock().await;
        if matches!(cached.as_ref(), Some(Some(crumb)) if crumb == rejected) {
            tracing::debug!("Yahoo rejected the session crumb, discarding it");
            *cached = None;
        }
    }

    async fn request_crumb(&self) -> Option<String> {
        if let Some(cookie_url) = &self.cookie_url {
            if let Err(e) = self.client.get(cookie_url).send().await {
                tracing::debug!("Cookie request to {} failed: {}", cookie_url, e);
            }
        }

        let url = format!("{}/v1/test/getcrumb", self.base_url);
        let response = match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::debug!("Crumb request returned HTTP {}", response.status());
                return None;
            }
            Err(e) => {
                tracing::debug!("Crumb request failed: {}", e);
                return None;
            }
        };

        let text = response.text().await.ok()?;
        let crumb = text.trim();
        if crumb.is_empty() || crumb.contains('<') {
            return None;
        }
        Some(crumb.to_string())
    }

    /// Fetch profile, balance sheet, income statement and cash flow for one ticker.
    pub async fn get_quote_summary(&self, ticker: &str) -> Result<RawFinancials, AnalysisError> {
        validate_ticker(ticker)?;

        let url = format!("{}/v10/finance/quoteSummary/{}", self.base_url, ticker);
        let crumb = self.crumb().await;
        let mut query = vec![("modules", MODULES.to_string())];
        if let Some(crumb) = &crumb {
            query.push(("crumb", crumb.clone()));
        }

        tracing::debug!("GET {} for {}", url, ticker);
        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            if let Some(crumb) = &crumb {
                self.invalidate_crumb(crumb).await;
            }
        }
        if status == StatusCode::NOT_FOUND {
            let body: Option<Value> = response.json().await.ok();
            let description = body
                .as_ref()
                .and_then(|b| b.get("quoteSummary"))
                .and_then(|s| s.get("error"))
                .map(describe_error)
                .unwrap_or_else(|| format!("Quote not found for symbol: {}", ticker));
            return Err(AnalysisError::DataUnavailable(description));
        }
        if !status.is_success() {
            return Err(AnalysisError::ApiError(format!(
                "HTTP {}: {}",
                status,
                response.text().await.unwrap_or_default()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AnalysisError::MalformedPayload(e.to_string()))?;

        parse_quote_summary(ticker, &body)
    }
}

#[async_trait]
impl FinancialDataSource for YahooClient {
    async fn fetch(&self, ticker: &str) -> Result<RawFinancials, AnalysisError> {
        self.get_quote_summary(ticker).await
    }
}

/// Symbols Yahoo accepts in a URL path: letters, digits, `.`, `-`, `^`, `=`.
pub fn validate_ticker(ticker: &str) -> Result<(), AnalysisError> {
    let valid = !ticker.is_empty()
        && ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='));
    if valid {
        Ok(())
    } else {
        Err(AnalysisError::InvalidTicker(ticker.to_string()))
    }
}

/// Map a decoded `quoteSummary` response onto [`RawFinancials`].
pub fn parse_quote_summary(symbol: &str, body: &Value) -> Result<RawFinancials, AnalysisError> {
    let summary = body
        .get("quoteSummary")
        .ok_or_else(|| AnalysisError::MalformedPayload("missing quoteSummary".to_string()))?;

    if let Some(error) = summary.get("error").filter(|e| !e.is_null()) {
        return Err(AnalysisError::DataUnavailable(describe_error(error)));
    }

    let result = summary
        .get("result")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
        .ok_or_else(|| AnalysisError::DataUnavailable(format!("No quote summary for {}", symbol)))?;

    Ok(RawFinancials {
        symbol: symbol.to_string(),
        profile: parse_profile(result),
        balance_sheet: parse_statements(result, "balanceSheetHistory", "balanceSheetStatements"),
        income_statement: parse_statements(result, "incomeStatementHistory", "incomeStatementHistory"),
        cash_flow: parse_statements(result, "cashflowStatementHistory", "cashflowStatements"),
    })
}

fn describe_error(error: &Value) -> String {
    error
        .get("description")
        .and_then(Value::as_str)
        .or_else(|| error.get("code").and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string())
}

fn parse_profile(result: &Value) -> Option<Profile> {
    if !PROFILE_MODULES.iter().any(|m| result.get(m).is_some()) {
        return None;
    }

    let number = |key: &str| {
        PROFILE_MODULES
            .iter()
            .find_map(|m| result.get(m).and_then(|module| yahoo_number(module.get(key))))
    };
    let text = |key: &str| {
        PROFILE_MODULES
            .iter()
            .find_map(|m| result.get(m).and_then(|module| yahoo_text(module.get(key))))
    };

    Some(Profile {
        long_name: text("longName").or_else(|| text("shortName")),
        sector: text("sector"),
        country: text("country"),
        industry: text("industry"),
        current_price: number("currentPrice").or_else(|| number("regularMarketPrice")),
        shares_outstanding: number("sharesOutstanding"),
        beta: number("beta"),
        trailing_pe: number("trailingPE"),
        price_to_book: number("priceToBook"),
        dividend_rate: number("dividendRate"),
        dividend_yield: number("dividendYield"),
        payout_ratio: number("payoutRatio"),
        return_on_assets: number("returnOnAssets"),
        return_on_equity: number("returnOnEquity"),
        current_ratio: number("currentRatio"),
        long_term_debt_to_equity: number("longTermDebtEquity"),
        debt_to_equity: number("debtToEquity"),
        operating_margins: number("operatingMargins"),
        profit_margins: number("profitMargins"),
    })
}

/// Statements come back as one object per period; pivot them into line items,
/// most recent period first. Lines with no value in any period are dropped.
fn parse_statements(result: &Value, module: &str, list_key: &str) -> Option<StatementTable> {
    let entries = result.get(module)?.get(list_key)?.as_array()?;
    let mut periods: Vec<(Option<i64>, &Map<String, Value>)> = entries
        .iter()
        .filter_map(Value::as_object)
        .map(|entry| (yahoo_number(entry.get("endDate")).map(|ts| ts as i64), entry))
        .collect();
    if periods.is_empty() {
        return None;
    }
    periods.sort_by(|a, b| b.0.cmp(&a.0));

    let mut table = StatementTable::new();
    table.periods = periods
        .iter()
        .map(|(ts, _)| ts.and_then(|t| DateTime::from_timestamp(t, 0)).map(|dt| dt.date_naive()))
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default();

    let mut keys: Vec<&String> = periods
        .iter()
        .flat_map(|(_, entry)| entry.keys())
        .filter(|k| k.as_str() != "endDate" && k.as_str() != "maxAge")
        .collect();
    keys.sort();
    keys.dedup();

    for key in keys {
        let values: Vec<Option<f64>> = periods
            .iter()
            .map(|(_, entry)| yahoo_number(entry.get(key.as_str())))
            .collect();
        if values.iter().any(Option::is_some) {
            table.insert(line_item_name(key), values);
        }
    }

    Some(table)
}

/// Yahoo wraps numbers as `{"raw": 1.0, "fmt": "1.00"}`; some endpoints send bare numbers.
fn yahoo_number(value: Option<&Value>) -> Option<f64> {
    let value = value?;
    let raw = match value.get("raw") {
        Some(raw) => raw.as_f64(),
        None => value.as_f64(),
    };
    raw.filter(|v| v.is_finite())
}

fn yahoo_text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `longTermDebt` -> `Long Term Debt`, with acronym overrides.
pub fn line_item_name(key: &str) -> String {
    match key {
        "ebit" => return "EBIT".to_string(),
        "ebitda" => return "EBITDA".to_string(),
        _ => {}
    }

    let mut name = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if i == 0 {
            name.extend(c.to_uppercase());
        } else if c.is_ascii_uppercase() {
            name.push(' ');
            name.push(c);
        } else {
            name.push(c);
        }
    }
    name
}
