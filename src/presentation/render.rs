//! Text and HTML renderings of the table

use std::fmt::Write;

use crate::models::result::IndicatorResult;
use crate::services::symbols::strip_suffix_ignore_case;

pub const HEADERS: [&str; 9] = [
    "Symbol",
    "Price",
    "RSI",
    "RSI Band",
    "MACD",
    "Signal",
    "Histogram",
    "Crossover",
    "Volume",
];

const ERROR_CELL: &str = "Error";

/// Display symbol without the exchange suffix
pub fn display_symbol<'a>(symbol: &'a str, suffix: &str) -> &'a str {
    strip_suffix_ignore_case(symbol, suffix).unwrap_or(symbol)
}

/// Digits grouped by thousands: 1234567 -> "1,234,567"
pub fn format_volume(volume: u64) -> String {
    group_thousands(&volume.to_string())
}

/// Two decimals with grouped integer part and a rupee sign
pub fn format_price(price: f64) -> String {
    let raw = format!("{:.2}", price.abs());
    let (int_part, frac) = raw.split_once('.').unwrap_or((raw.as_str(), "00"));
    let sign = if price < 0.0 { "-" } else { "" };
    format!("{}₹{}.{}", sign, group_thousands(int_part), frac)
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Cells of one row, in `HEADERS` order
pub fn row_cells(row: &IndicatorResult, suffix: &str) -> Vec<String> {
    let symbol = display_symbol(row.symbol(), suffix).to_string();
    match row.values() {
        Some(v) => vec![
            symbol,
            format_price(v.price),
            format!("{:.2}", v.rsi),
            v.rsi_signal.label().to_string(),
            format!("{:.4}", v.macd),
            format!("{:.4}", v.macd_signal_line),
            format!("{:+.4}", v.macd_histogram),
            v.macd_crossover.label().to_string(),
            format_volume(v.volume),
        ],
        None => {
            let mut cells = vec![symbol];
            cells.extend(std::iter::repeat(ERROR_CELL.to_string()).take(HEADERS.len() - 1));
            cells
        }
    }
}

/// Fixed-width table for terminals
pub fn render_text(rows: &[&IndicatorResult], suffix: &str) -> String {
    let body: Vec<Vec<String>> = rows.iter().map(|r| row_cells(r, suffix)).collect();

    let mut widths: Vec<usize> = HEADERS.iter().map(|h| h.chars().count()).collect();
    for cells in &body {
        for (w, cell) in widths.iter_mut().zip(cells) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
    push_line(&mut out, &header, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, &rule, &widths);
    for cells in &body {
        push_line(&mut out, cells, &widths);
    }

    // error details below the table
    for row in rows {
        if let Some(err) = row.error() {
            let _ = writeln!(out, "{}: {}", display_symbol(row.symbol(), suffix), err);
        }
    }
    out
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, w)| {
            let pad = w.saturating_sub(cell.chars().count());
            format!("{}{}", cell, " ".repeat(pad))
        })
        .collect();
    let _ = writeln!(out, "{}", padded.join("  ").trim_end());
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// CSS class for a row, driving the band/crossover colours
fn row_class(row: &IndicatorResult) -> String {
    match row.values() {
        Some(v) => format!("rsi-{:?} macd-{:?}", v.rsi_signal, v.macd_crossover).to_lowercase(),
        None => "error".to_string(),
    }
}

/// Standalone HTML page with the table
pub fn render_html(
    rows: &[&IndicatorResult],
    suffix: &str,
    generated_at: &str,
    refresh_seconds: Option<u64>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "<!DOCTYPE html>");
    let _ = writeln!(out, "<html><head><meta charset=\"utf-8\">");
    if let Some(secs) = refresh_seconds {
        let _ = writeln!(out, "<meta http-equiv=\"refresh\" content=\"{}\">", secs);
    }
    let _ = writeln!(out, "<title>Stock RSI &amp; MACD</title>");
    let _ = writeln!(
        out,
        "<style>table{{border-collapse:collapse}}td,th{{padding:4px 8px;border:1px solid #ccc}}\
         .rsi-overbought td:nth-child(3){{color:#c00}}.rsi-oversold td:nth-child(3){{color:#080}}\
         .macd-bullish td:nth-child(8),.macd-above td:nth-child(8){{color:#080}}\
         .macd-bearish td:nth-child(8),.macd-below td:nth-child(8){{color:#c00}}\
         .error td{{color:#888}}</style>"
    );
    let _ = writeln!(out, "</head><body>");
    let _ = writeln!(out, "<p>Last updated: {}</p>", escape_html(generated_at));
    let _ = writeln!(out, "<table><thead><tr>");
    for h in HEADERS {
        let _ = write!(out, "<th>{}</th>", h);
    }
    let _ = writeln!(out, "</tr></thead><tbody>");
    for row in rows {
        let title = row
            .error()
            .map(|e| format!(" title=\"{}\"", escape_html(&e.to_string())))
            .unwrap_or_default();
        let _ = write!(out, "<tr class=\"{}\"{}>", row_class(row), title);
        for cell in row_cells(row, suffix) {
            let _ = write!(out, "<td>{}</td>", escape_html(&cell));
        }
        let _ = writeln!(out, "</tr>");
    }
    let _ = writeln!(out, "</tbody></table></body></html>");
    out
}
