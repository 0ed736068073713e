use std::collections::HashSet;

/// Upper bound on tickers per batch.
pub const MAX_TICKERS: usize = 50;

/// Trimmed, uppercased symbol, or `None` for blank input.
pub fn normalize_ticker(raw: &str) -> Option<String> {
    let ticker = raw.trim().to_uppercase();
    if ticker.is_empty() {
        None
    } else {
        Some(ticker)
    }
}

/// Parse a comma-separated ticker list: normalize each entry, drop blanks,
/// keep the first occurrence of duplicates and cap at [`MAX_TICKERS`].
pub fn normalize_tickers(input: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    input
        .split(',')
        .filter_map(normalize_ticker)
        .filter(|ticker| seen.insert(ticker.clone()))
        .take(MAX_TICKERS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_and_duplicates_collapse() {
        assert_eq!(normalize_tickers("AAPL, aapl, MSFT"), vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn test_blank_entries_dropped() {
        assert_eq!(normalize_tickers(" ,tsla,, ,\tamzn ,"), vec!["TSLA", "AMZN"]);
        assert!(normalize_tickers("").is_empty());
        assert!(normalize_tickers(" , ,").is_empty());
    }

    #[test]
    fn test_truncates_after_dedup() {
        let mut symbols: Vec<String> = Vec::new();
        for i in 0..60 {
            symbols.push(format!("T{}", i));
            // duplicates must not consume slots
            symbols.push(format!("t{}", i));
        }
        let tickers = normalize_tickers(&symbols.join(","));
        assert_eq!(tickers.len(), MAX_TICKERS);
        assert_eq!(tickers.first().map(String::as_str), Some("T0"));
        assert_eq!(tickers.last().map(String::as_str), Some("T49"));
    }

    #[test]
    fn test_order_preserved() {
        assert_eq!(normalize_tickers("msft,aapl,msft,goog"), vec!["MSFT", "AAPL", "GOOG"]);
    }
}
