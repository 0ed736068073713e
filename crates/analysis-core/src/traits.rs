use async_trait::async_trait;
use crate::{AnalysisError, RawFinancials};

/// Remote provider of per-ticker company data.
///
/// One call is one fetch: implementations must not retry or cache on their own,
/// the batch loop decides when a ticker is fetched.
#[async_trait]
pub trait FinancialDataSource: Send + Sync {
    async fn fetch(&self, ticker: &str) -> Result<RawFinancials, AnalysisError>;
}
