//! Matching reported facts to the filing they belong to.

use crate::edgar::facts::FinancialFact;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Period type for financial statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodType {
    /// Quarterly (10-Q) filing
    Quarterly,
    /// Annual (10-K) filing
    Annual,
}

impl PeriodType {
    /// Period type of a filing form; amendments count as their base form.
    pub fn from_form(form: &str) -> Option<Self> {
        if form.starts_with("10-K") {
            Some(Self::Annual)
        } else if form.starts_with("10-Q") {
            Some(Self::Quarterly)
        } else {
            None
        }
    }

    /// Fact forms accepted for a filing of this period type.
    pub const fn fact_forms(self) -> &'static [&'static str] {
        match self {
            Self::Annual => &["10-K", "10-K/A"],
            Self::Quarterly => &["10-Q", "10-Q/A"],
        }
    }

    /// Longest gap in days between period end and filing date.
    pub const fn max_lag_days(self) -> i64 {
        match self {
            Self::Annual => 120,
            Self::Quarterly => 90,
        }
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

/// Whether `fact` was reported for the filing filed on `filing_date`.
///
/// Annual filings take only annual facts whose period ended 0 to 120 days
/// before the filing date; quarterly filings take quarterly facts within 0 to
/// 90 days. Facts dated after the filing, other filing types and unparseable
/// dates never match. Restatements filed outside the window are missed.
pub fn matches(fact: &FinancialFact, filing_date: &str, filing_type: &str) -> bool {
    let Some(period) = PeriodType::from_form(filing_type) else {
        return false;
    };
    if !period.fact_forms().contains(&fact.form_type.as_str()) {
        return false;
    }
    let (Some(end), Some(filed)) = (parse_date(&fact.period_end), parse_date(filing_date)) else {
        return false;
    };
    let lag = (filed - end).num_days();
    (0..=period.max_lag_days()).contains(&lag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn fact(form: &str, end: &str) -> FinancialFact {
        FinancialFact {
            value: Some(1.0),
            period_end: end.to_string(),
            period_start: String::new(),
            form_type: form.to_string(),
            filed_date: String::new(),
            fiscal_year: None,
            fiscal_period: None,
            unit: "USD".to_string(),
        }
    }

    #[rstest]
    // 2024-04-29 is 120 days after 2023-12-31
    #[case("10-K", "2023-12-31", "2024-04-29", "10-K", true)]
    #[case("10-K", "2023-12-31", "2024-04-30", "10-K", false)]
    #[case("10-K", "2023-12-31", "2023-12-31", "10-K", true)]
    #[case("10-K", "2024-01-01", "2023-12-31", "10-K", false)]
    #[case("10-K/A", "2023-12-31", "2024-02-01", "10-K", true)]
    #[case("10-K", "2023-12-31", "2024-02-01", "10-K/A", true)]
    #[case("10-Q", "2023-12-31", "2024-02-01", "10-K", false)]
    // 2024-03-30 is 90 days after 2023-12-31
    #[case("10-Q", "2023-12-31", "2024-03-30", "10-Q", true)]
    #[case("10-Q", "2023-12-31", "2024-03-31", "10-Q", false)]
    #[case("10-Q/A", "2023-12-31", "2024-02-01", "10-Q", true)]
    #[case("10-K", "2023-12-31", "2024-02-01", "10-Q", false)]
    #[case("8-K", "2023-12-31", "2024-01-05", "8-K", false)]
    #[case("10-K", "", "2024-02-01", "10-K", false)]
    #[case("10-K", "2023-12-31", "02/01/2024", "10-K", false)]
    fn test_matches(
        #[case] fact_form: &str,
        #[case] end: &str,
        #[case] filing_date: &str,
        #[case] filing_type: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(matches(&fact(fact_form, end), filing_date, filing_type), expected);
    }

    #[test]
    fn test_period_type_from_form() {
        assert_eq!(PeriodType::from_form("10-K"), Some(PeriodType::Annual));
        assert_eq!(PeriodType::from_form("10-KT"), Some(PeriodType::Annual));
        assert_eq!(PeriodType::from_form("10-Q/A"), Some(PeriodType::Quarterly));
        assert_eq!(PeriodType::from_form("20-F"), None);
    }
}
