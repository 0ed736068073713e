use analysis_core::{AnalysisRecord, FailedAnalysis, FinancialDataSource};
use fundamental_analysis::FundamentalAnalysisEngine;
use serde::Serialize;
use std::time::Duration;

pub mod cache;
pub mod report;
pub mod tickers;

pub use cache::ResultCache;
pub use report::{Cell, Column, ColumnKind, RatioRow, RatioTable, SolvencyBreakdown, RATIO_COLUMNS};
pub use tickers::{normalize_ticker, normalize_tickers, MAX_TICKERS};

/// Pause between two consecutive fetches in a batch.
pub const DEFAULT_PACING: Duration = Duration::from_millis(1500);

/// Emitted right before a ticker is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProgress {
    pub ticker: String,
    /// 1-based position among the tickers this batch actually fetches.
    pub position: usize,
    pub total: usize,
}

/// What one batch run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Normalized tickers of the request, in order.
    pub requested: Vec<String>,
    /// Tickers fetched by this run, in fetch order.
    pub analyzed: Vec<String>,
    /// Tickers already in the cache, left untouched.
    pub skipped: Vec<String>,
    /// Subset of `analyzed` whose fetch failed.
    pub failed: Vec<String>,
}

impl BatchReport {
    /// True when tickers were requested but every one of them was cached.
    pub fn already_analyzed(&self) -> bool {
        !self.requested.is_empty() && self.analyzed.is_empty()
    }
}

/// Owns the session cache and runs the sequential fetch-derive-store loop.
pub struct AnalysisOrchestrator {
    data_source: Box<dyn FinancialDataSource>,
    fundamental_analyzer: FundamentalAnalysisEngine,
    cache: ResultCache,
    pacing: Duration,
}

impl AnalysisOrchestrator {
    pub fn new(data_source: Box<dyn FinancialDataSource>) -> Self {
        Self {
            data_source,
            fundamental_analyzer: FundamentalAnalysisEngine::new(),
            cache: ResultCache::new(),
            pacing: DEFAULT_PACING,
        }
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_engine(mut self, engine: FundamentalAnalysisEngine) -> Self {
        self.fundamental_analyzer = engine;
        self
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn ratio_table(&self) -> RatioTable {
        RatioTable::from_cache(&self.cache)
    }

    pub fn solvency(&self, ticker: &str) -> Option<SolvencyBreakdown> {
        let ticker = normalize_ticker(ticker)?;
        SolvencyBreakdown::from_cache(&self.cache, &ticker)
    }

    /// Analyze a comma-separated ticker list.
    pub async fn analyze_batch(&mut self, input: &str) -> BatchReport {
        self.analyze_batch_with_progress(input, |_| {}).await
    }

    /// Like [`analyze_batch`](Self::analyze_batch), calling `on_progress` before each fetch.
    ///
    /// Cached tickers (successes and failures alike) are skipped. The rest are
    /// fetched one at a time in input order with the pacing interval between
    /// them; each outcome is stored as soon as it is known.
    pub async fn analyze_batch_with_progress<F>(&mut self, input: &str, mut on_progress: F) -> BatchReport
    where
        F: FnMut(&BatchProgress),
    {
        let requested = normalize_tickers(input);
        let (pending, skipped): (Vec<String>, Vec<String>) = requested
            .iter()
            .cloned()
            .partition(|t| !self.cache.contains(t));

        let mut report = BatchReport {
            requested,
            skipped,
            ..BatchReport::default()
        };

        if pending.is_empty() {
            if !report.requested.is_empty() {
                tracing::info!("All {} tickers already analyzed", report.requested.len());
            }
            return report;
        }

        tracing::info!(
            "Starting batch: {} new tickers, {} already cached",
            pending.len(),
            report.skipped.len()
        );

        let total = pending.len();
        for (i, ticker) in pending.into_iter().enumerate() {
            if i > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }

            tracing::info!("Processing {} ({}/{})", ticker, i + 1, total);
            on_progress(&BatchProgress {
                ticker: ticker.clone(),
                position: i + 1,
                total,
            });

            let record = self.analyze_one(&ticker).await;
            if record.is_failure() {
                report.failed.push(ticker.clone());
            }
            self.cache.insert(record);
            report.analyzed.push(ticker);
        }

        tracing::info!(
            "Batch finished: {} analyzed, {} failed",
            report.analyzed.len(),
            report.failed.len()
        );
        report
    }

    async fn analyze_one(&self, ticker: &str) -> AnalysisRecord {
        match self.data_source.fetch(ticker).await {
            Ok(raw) => {
                let mut metrics = self.fundamental_analyzer.derive(raw);
                metrics.ticker = ticker.to_string();
                tracing::debug!(
                    "{}: wacc={:?} roic={:?} eva={:?}",
                    ticker,
                    metrics.wacc,
                    metrics.roic,
                    metrics.eva
                );
                AnalysisRecord::Metrics(metrics)
            }
            Err(e) => {
                tracing::warn!("Failed to analyze {}: {}", ticker, e);
                AnalysisRecord::Failed(FailedAnalysis {
                    ticker: ticker.to_string(),
                    error: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{line_items, AnalysisError, Profile, RawFinancials, StatementTable};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// In-memory data source that records every fetch.
    struct FakeSource {
        responses: HashMap<String, Result<RawFinancials, AnalysisError>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn ok(mut self, ticker: &str, price: f64) -> Self {
            self.responses.insert(ticker.to_string(), Ok(raw(ticker, price)));
            self
        }

        fn err(mut self, ticker: &str, error: AnalysisError) -> Self {
            self.responses.insert(ticker.to_string(), Err(error));
            self
        }
    }

    #[async_trait]
    impl FinancialDataSource for FakeSource {
        async fn fetch(&self, ticker: &str) -> Result<RawFinancials, AnalysisError> {
            self.calls.lock().unwrap().push(ticker.to_string());
            self.responses
                .get(ticker)
                .cloned()
                .unwrap_or_else(|| Err(AnalysisError::DataUnavailable(format!("no data for {}", ticker))))
        }
    }

    fn raw(ticker: &str, price: f64) -> RawFinancials {
        RawFinancials {
            symbol: ticker.to_string(),
            profile: Some(Profile {
                current_price: Some(price),
                shares_outstanding: Some(100.0),
                beta: Some(1.0),
                ..Profile::default()
            }),
            balance_sheet: Some(
                StatementTable::new()
                    .with_item(line_items::LONG_TERM_DEBT, vec![Some(100.0)])
                    .with_item(line_items::TOTAL_STOCKHOLDER_EQUITY, vec![Some(400.0)]),
            ),
            income_statement: Some(StatementTable::new().with_item(line_items::EBIT, vec![Some(50.0)])),
            cash_flow: None,
        }
    }

    fn orchestrator(source: FakeSource) -> (AnalysisOrchestrator, Arc<Mutex<Vec<String>>>) {
        let calls = source.calls.clone();
        let orchestrator = AnalysisOrchestrator::new(Box::new(source)).with_pacing(Duration::ZERO);
        (orchestrator, calls)
    }

    #[tokio::test]
    async fn test_batch_fetches_each_ticker_once_in_order() {
        let (mut orch, calls) = orchestrator(FakeSource::new().ok("AAPL", 10.0).ok("MSFT", 20.0));

        let report = orch.analyze_batch("aapl, MSFT ,AAPL").await;

        assert_eq!(report.requested, vec!["AAPL", "MSFT"]);
        assert_eq!(report.analyzed, vec!["AAPL", "MSFT"]);
        assert!(report.failed.is_empty());
        assert!(!report.already_analyzed());
        assert_eq!(*calls.lock().unwrap(), vec!["AAPL", "MSFT"]);

        let aapl = orch.cache().get("AAPL").and_then(AnalysisRecord::metrics).unwrap();
        assert_eq!(aapl.total_debt, Some(100.0));
        assert_eq!(aapl.roic, Some(0.1));
        assert!(aapl.wacc.is_some());
    }

    #[tokio::test]
    async fn test_rerun_does_not_refetch() {
        let (mut orch, calls) = orchestrator(FakeSource::new().ok("AAPL", 10.0));

        orch.analyze_batch("AAPL").await;
        let stored = orch.cache().get("AAPL").cloned();

        let report = orch.analyze_batch("aapl").await;
        assert!(report.already_analyzed());
        assert_eq!(report.skipped, vec!["AAPL"]);
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(orch.cache().get("AAPL").cloned(), stored);
    }

    #[tokio::test]
    async fn test_failure_recorded_and_batch_continues() {
        let source = FakeSource::new()
            .err("BAD", AnalysisError::ApiError("HTTP 500: boom".to_string()))
            .ok("GOOD", 5.0);
        let (mut orch, calls) = orchestrator(source);

        let report = orch.analyze_batch("BAD,GOOD").await;

        assert_eq!(report.failed, vec!["BAD"]);
        assert_eq!(report.analyzed, vec!["BAD", "GOOD"]);
        assert_eq!(*calls.lock().unwrap(), vec!["BAD", "GOOD"]);

        let bad = orch.cache().get("BAD").unwrap();
        assert_eq!(
            bad,
            &AnalysisRecord::Failed(FailedAnalysis {
                ticker: "BAD".to_string(),
                error: "API error: HTTP 500: boom".to_string(),
            })
        );
        assert!(bad.metrics().is_none());
        assert!(orch.cache().get("GOOD").unwrap().metrics().is_some());
    }

    #[tokio::test]
    async fn test_failed_ticker_is_not_retried() {
        let (mut orch, calls) = orchestrator(FakeSource::new().ok("AAPL", 10.0));

        orch.analyze_batch("NOPE").await;
        let report = orch.analyze_batch("NOPE,AAPL").await;

        assert_eq!(report.skipped, vec!["NOPE"]);
        assert_eq!(report.analyzed, vec!["AAPL"]);
        assert_eq!(*calls.lock().unwrap(), vec!["NOPE", "AAPL"]);
        assert!(orch.cache().get("NOPE").unwrap().is_failure());
    }

    #[tokio::test]
    async fn test_progress_counts_only_new_tickers() {
        let (mut orch, _) = orchestrator(FakeSource::new().ok("A", 1.0).ok("B", 2.0).ok("C", 3.0));
        orch.analyze_batch("B").await;

        let mut seen = Vec::new();
        orch.analyze_batch_with_progress("A,B,C", |p| seen.push(p.clone())).await;

        assert_eq!(
            seen,
            vec![
                BatchProgress { ticker: "A".to_string(), position: 1, total: 2 },
                BatchProgress { ticker: "C".to_string(), position: 2, total: 2 },
            ]
        );
        assert_eq!(orch.cache().tickers().collect::<Vec<_>>(), vec!["B", "A", "C"]);
    }

    #[tokio::test]
    async fn test_empty_input_does_nothing() {
        let (mut orch, calls) = orchestrator(FakeSource::new());
        let report = orch.analyze_batch(" , ").await;
        assert_eq!(report, BatchReport::default());
        assert!(!report.already_analyzed());
        assert!(calls.lock().unwrap().is_empty());
        assert!(orch.cache().is_empty());
    }

    #[tokio::test]
    async fn test_only_first_fifty_tickers_fetched() {
        let (mut orch, calls) = orchestrator(FakeSource::new());
        let input: Vec<String> = (0..75).map(|i| format!("S{}", i)).collect();

        let report = orch.analyze_batch(&input.join(",")).await;

        assert_eq!(report.analyzed.len(), MAX_TICKERS);
        assert_eq!(calls.lock().unwrap().len(), MAX_TICKERS);
        assert!(!orch.cache().contains("S50"));
    }

    #[tokio::test]
    async fn test_record_keyed_by_requested_ticker() {
        let mut source = FakeSource::new();
        source
            .responses
            .insert("BRK-B".to_string(), Ok(raw("BRK.B", 400.0)));
        let (mut orch, _) = orchestrator(source);

        orch.analyze_batch("brk-b").await;
        let record = orch.cache().get("BRK-B").unwrap();
        assert_eq!(record.ticker(), "BRK-B");
        assert_eq!(orch.solvency("brk-b").unwrap().total_equity, Some(400.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_between_tickers() {
        let source = FakeSource::new().ok("A", 1.0).ok("B", 1.0).ok("C", 1.0);
        let mut orch = AnalysisOrchestrator::new(Box::new(source)).with_pacing(Duration::from_millis(1500));

        let start = tokio::time::Instant::now();
        orch.analyze_batch("A,B,C").await;
        let elapsed = start.elapsed();

        // two gaps for three tickers, none after the last
        assert!(elapsed >= Duration::from_millis(3000));
        assert!(elapsed < Duration::from_millis(4500));
    }

    #[tokio::test]
    async fn test_ratio_table_includes_failures() {
        let (mut orch, _) = orchestrator(FakeSource::new().ok("AAPL", 10.0));
        orch.analyze_batch("AAPL,NOPE").await;

        let table = orch.ratio_table();
        assert_eq!(table.rows.len(), 2);
        assert!(!table.rows[0].failed);
        assert!(table.rows[1].failed);
        assert!(orch.solvency("NOPE").is_none());
    }
}
