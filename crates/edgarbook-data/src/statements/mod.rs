//! Financial statements assembled from XBRL company facts.

pub mod assembler;
pub mod concepts;
pub mod period;

pub use assembler::StatementAssembler;
pub use concepts::{ConceptMapping, ConceptResolver, ResolvedConcept};
pub use period::PeriodType;

use crate::error::DataError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Canonical label → period key → value.
pub type StatementData = BTreeMap<String, BTreeMap<String, f64>>;

/// The three statements built from company facts.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
pub enum StatementKind {
    /// Income statement
    #[display("Income Statement")]
    #[serde(rename = "Income Statement")]
    Income,
    /// Balance sheet
    #[display("Balance Sheet")]
    #[serde(rename = "Balance Sheet")]
    Balance,
    /// Cash flow statement
    #[display("Cash Flow")]
    #[serde(rename = "Cash Flow")]
    CashFlow,
}

impl StatementKind {
    /// Every statement, in presentation order.
    pub const ALL: [Self; 3] = [Self::Income, Self::Balance, Self::CashFlow];

    /// Candidate concepts for this statement, in priority order.
    pub const fn concepts(self) -> &'static [ConceptMapping] {
        match self {
            Self::Income => concepts::INCOME_STATEMENT_CONCEPTS,
            Self::Balance => concepts::BALANCE_SHEET_CONCEPTS,
            Self::CashFlow => concepts::CASH_FLOW_CONCEPTS,
        }
    }

    /// Display name, also used as the sheet name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Income => "Income Statement",
            Self::Balance => "Balance Sheet",
            Self::CashFlow => "Cash Flow",
        }
    }
}

impl FromStr for StatementKind {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DataError::UnknownStatement(s.to_string()))
    }
}

/// Assembled statements plus the sorted union of their periods.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialStatements {
    /// Statement data by kind; every kind is present, possibly empty
    pub statements: BTreeMap<StatementKind, StatementData>,
    /// All period keys across statements, ascending
    pub periods: Vec<String>,
}

impl FinancialStatements {
    /// Data for one statement, if assembled.
    pub fn statement(&self, kind: StatementKind) -> Option<&StatementData> {
        self.statements.get(&kind)
    }

    /// Whether no statement has any line item.
    pub fn is_empty(&self) -> bool {
        self.statements.values().all(BTreeMap::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in StatementKind::ALL {
            assert_eq!(kind.to_string(), kind.name());
            assert_eq!(kind.name().parse::<StatementKind>().unwrap(), kind);
        }
        assert_eq!("cash flow".parse::<StatementKind>().unwrap(), StatementKind::CashFlow);
    }

    #[test]
    fn test_unknown_statement() {
        let err = "Statement of Equity".parse::<StatementKind>().unwrap_err();
        assert!(matches!(err, DataError::UnknownStatement(name) if name == "Statement of Equity"));
    }

    #[test]
    fn test_statements_serialize_by_name() {
        let mut built = FinancialStatements::default();
        built.statements.insert(StatementKind::Balance, StatementData::new());
        let json = serde_json::to_value(&built).unwrap();
        assert!(json["statements"].get("Balance Sheet").is_some());
        assert!(built.is_empty());
    }
}
