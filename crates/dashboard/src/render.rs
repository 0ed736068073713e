use analysis_orchestrator::{Cell, ColumnKind, RatioTable, SolvencyBreakdown};

const MISSING: &str = "-";
const MAX_TEXT_WIDTH: usize = 24;
const BAR_WIDTH: usize = 40;

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

/// `$1.2B`-style amount; sign kept in front of the dollar sign.
pub fn format_usd(v: f64) -> String {
    let sign = if v < 0.0 { "-" } else { "" };
    let a = v.abs();
    if a >= 1_000_000_000_000.0 {
        format!("{}${:.2}T", sign, a / 1_000_000_000_000.0)
    } else if a >= 1_000_000_000.0 {
        format!("{}${:.2}B", sign, a / 1_000_000_000.0)
    } else if a >= 1_000_000.0 {
        format!("{}${:.2}M", sign, a / 1_000_000.0)
    } else if a >= 1_000.0 {
        format!("{}${:.1}K", sign, a / 1_000.0)
    } else {
        format!("{}${:.0}", sign, a)
    }
}

pub fn format_cell(cell: &Cell, kind: ColumnKind) -> String {
    match (cell, kind) {
        (Cell::Empty, _) => MISSING.to_string(),
        (Cell::Text(s), _) => truncate(s, MAX_TEXT_WIDTH),
        (Cell::Number(v), ColumnKind::Percent) => format!("{:.2}%", v * 100.0),
        (Cell::Number(v), _) => format!("{:.2}", v),
    }
}

/// Plain-text grid: text columns left-aligned, numbers right-aligned.
pub fn render_table(table: &RatioTable) -> String {
    if table.is_empty() {
        return "No tickers analyzed yet.\n".to_string();
    }

    let rendered: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| {
            row.cells
                .iter()
                .zip(table.columns)
                .map(|(cell, col)| format_cell(cell, col.kind))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            rendered
                .iter()
                .filter_map(|r| r.get(i))
                .map(|s| s.chars().count())
                .chain(std::iter::once(col.header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: Vec<String>| -> String {
        cells
            .iter()
            .zip(table.columns)
            .zip(&widths)
            .map(|((s, col), &w)| match col.kind {
                ColumnKind::Text => format!("{:<w$}", s, w = w),
                _ => format!("{:>w$}", s, w = w),
            })
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&line(table.columns.iter().map(|c| c.header.to_string()).collect()));
    out.push('\n');
    out.push_str(&widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-"));
    out.push('\n');
    for cells in rendered {
        out.push_str(&line(cells));
        out.push('\n');
    }
    out
}

/// Horizontal debt-vs-equity bars scaled to the larger magnitude.
pub fn render_solvency(breakdown: &SolvencyBreakdown) -> String {
    let categories = breakdown.categories();
    let scale = categories
        .iter()
        .filter_map(|(_, v)| v.map(f64::abs))
        .fold(0.0_f64, f64::max);

    let mut out = match breakdown.as_of {
        Some(date) => format!("{} solvency (balance sheet {})\n", breakdown.ticker, date.format("%Y-%m-%d")),
        None => format!("{} solvency\n", breakdown.ticker),
    };

    let label_width = categories.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
    for (label, value) in categories {
        let (bar, amount) = match value {
            Some(v) => {
                let len = if scale > 0.0 {
                    ((v.abs() / scale) * BAR_WIDTH as f64).round() as usize
                } else {
                    0
                };
                ("█".repeat(len), format_usd(v))
            }
            None => (String::new(), MISSING.to_string()),
        };
        out.push_str(&format!(
            "{:<lw$}  {:<bw$}  {}\n",
            label,
            bar,
            amount,
            lw = label_width,
            bw = BAR_WIDTH
        ));
    }
    out
}
