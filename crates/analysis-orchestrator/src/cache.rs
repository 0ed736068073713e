use analysis_core::AnalysisRecord;
use std::collections::HashMap;

/// Session results keyed by ticker. Insert-only: a stored record is never
/// replaced or evicted, and iteration follows insertion order.
#[derive(Debug, Default)]
pub struct ResultCache {
    records: Vec<AnalysisRecord>,
    index: HashMap<String, usize>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.index.contains_key(ticker)
    }

    pub fn get(&self, ticker: &str) -> Option<&AnalysisRecord> {
        self.index.get(ticker).map(|&i| &self.records[i])
    }

    /// Store a record under its ticker. Returns `false` and drops `record`
    /// if the ticker is already present.
    pub fn insert(&mut self, record: AnalysisRecord) -> bool {
        if self.contains(record.ticker()) {
            return false;
        }
        self.index.insert(record.ticker().to_string(), self.records.len());
        self.records.push(record);
        true
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnalysisRecord> {
        self.records.iter()
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(AnalysisRecord::ticker)
    }
}
