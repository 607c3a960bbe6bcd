//! Numeric cell classification.
//!
//! Filing tables mix real figures with dash placeholders, parenthesized
//! negatives, currency marks and footnote text. These helpers decide whether a
//! cell reads as a number and whether a whole table carries enough numbers to
//! be worth keeping.

/// Default fraction of non-empty cells that must be numeric.
pub const DEFAULT_DENSITY_THRESHOLD: f64 = 0.25;

/// Default absolute number of numeric cells a table must contain.
pub const DEFAULT_MIN_NUMERIC_CELLS: usize = 3;

const EM_DASH: char = '\u{2014}';
const EN_DASH: char = '\u{2013}';

/// Normalizes raw cell text.
///
/// Runs of non-breaking spaces, zero-width spaces, tabs and line breaks
/// collapse to a single space, then the result is trimmed.
pub fn clean_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for ch in text.chars() {
        if matches!(ch, '\u{a0}' | '\u{200b}' | '\t' | '\n' | '\r') {
            if !in_run {
                out.push(' ');
                in_run = true;
            }
        } else {
            out.push(ch);
            in_run = false;
        }
    }
    out.trim().to_string()
}

/// Returns true when `text` reads as a number under filing conventions.
///
/// Currency signs, percent signs, parentheses, thousands separators,
/// whitespace and em/en dashes are ignored. A cell that is empty after
/// stripping, or holds a lone minus sign, is a zero/blank placeholder and
/// counts as numeric.
///
/// ```
/// use edgarbook_extract::numeric::is_numeric_cell;
///
/// assert!(is_numeric_cell("$ (1,234.5)"));
/// assert!(is_numeric_cell("12%"));
/// assert!(is_numeric_cell("\u{2014}"));
/// assert!(!is_numeric_cell("Total revenue"));
/// ```
pub fn is_numeric_cell(text: &str) -> bool {
    let stripped: String = text
        .chars()
        .filter(|c| {
            !matches!(*c, '$' | ',' | '%' | '(' | ')' | EM_DASH | EN_DASH) && !c.is_whitespace()
        })
        .collect();

    if stripped.is_empty() || stripped == "-" {
        return true;
    }
    stripped.parse::<f64>().is_ok()
}

/// Returns true when `rows` are numeric enough to be a financial table.
///
/// Only non-empty cells (after [`clean_text`]) are counted. The numeric
/// fraction must reach `threshold` and the numeric count must reach
/// `min_numeric_cells`; a table with no non-empty cells never qualifies.
pub fn has_sufficient_numeric_density<R: AsRef<[String]>>(
    rows: &[R],
    threshold: f64,
    min_numeric_cells: usize,
) -> bool {
    let mut total = 0usize;
    let mut numeric = 0usize;

    for row in rows {
        for cell in row.as_ref() {
            let text = clean_text(cell);
            if text.is_empty() {
                continue;
            }
            total += 1;
            if is_numeric_cell(&text) {
                numeric += 1;
            }
        }
    }

    if total == 0 {
        return false;
    }
    (numeric as f64 / total as f64) >= threshold && numeric >= min_numeric_cells
}
