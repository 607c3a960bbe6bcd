//! Concept-to-label mappings and the resolver that applies them.
//!
//! Companies, and the same company across years, report the same line item
//! under different XBRL concepts. Each statement lists its candidates in
//! priority order; several concepts may share one canonical label, and the
//! first one with any reported facts claims the label.

use crate::edgar::facts::{CompanyFacts, FinancialFact, US_GAAP};
use std::collections::HashSet;
use tracing::debug;

/// One candidate concept and the label it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConceptMapping {
    /// XBRL concept name within the taxonomy
    pub concept: &'static str,
    /// Canonical display label
    pub label: &'static str,
}

const fn map(concept: &'static str, label: &'static str) -> ConceptMapping {
    ConceptMapping { concept, label }
}

/// Income statement concepts, in priority order.
pub const INCOME_STATEMENT_CONCEPTS: &[ConceptMapping] = &[
    map("Revenues", "Revenue"),
    map("RevenueFromContractWithCustomerExcludingAssessedTax", "Revenue"),
    map("SalesRevenueNet", "Revenue"),
    map("RevenueFromContractWithCustomerIncludingAssessedTax", "Revenue"),
    map("CostOfRevenue", "Cost of Revenue"),
    map("CostOfGoodsAndServicesSold", "Cost of Revenue"),
    map("CostOfGoodsSold", "Cost of Goods Sold"),
    map("GrossProfit", "Gross Profit"),
    map("ResearchAndDevelopmentExpense", "Research & Development"),
    map("SellingGeneralAndAdministrativeExpense", "Selling, General & Administrative"),
    map("SellingAndMarketingExpense", "Selling & Marketing"),
    map("GeneralAndAdministrativeExpense", "General & Administrative"),
    map("OperatingExpenses", "Total Operating Expenses"),
    map("OperatingIncomeLoss", "Operating Income (Loss)"),
    map("InterestExpense", "Interest Expense"),
    map("InterestIncome", "Interest Income"),
    map("InterestIncomeExpenseNet", "Net Interest Income (Expense)"),
    map("OtherNonoperatingIncomeExpense", "Other Non-Operating Income (Expense)"),
    map(
        "IncomeLossFromContinuingOperationsBeforeIncomeTaxesExtraordinaryItemsNoncontrollingInterest",
        "Income Before Tax",
    ),
    map("IncomeTaxExpenseBenefit", "Income Tax Expense (Benefit)"),
    map("NetIncomeLoss", "Net Income (Loss)"),
    map("EarningsPerShareBasic", "EPS (Basic)"),
    map("EarningsPerShareDiluted", "EPS (Diluted)"),
    map(
        "WeightedAverageNumberOfShareOutstandingBasicAndDiluted",
        "Weighted Avg Shares (Basic & Diluted)",
    ),
    map("WeightedAverageNumberOfSharesOutstandingBasic", "Weighted Avg Shares (Basic)"),
    map("WeightedAverageNumberOfDilutedSharesOutstanding", "Weighted Avg Shares (Diluted)"),
];

/// Balance sheet concepts, in priority order.
pub const BALANCE_SHEET_CONCEPTS: &[ConceptMapping] = &[
    map("CashAndCashEquivalentsAtCarryingValue", "Cash & Cash Equivalents"),
    map("ShortTermInvestments", "Short-Term Investments"),
    map(
        "CashCashEquivalentsAndShortTermInvestments",
        "Cash, Equivalents & Short-Term Investments",
    ),
    map("AccountsReceivableNetCurrent", "Accounts Receivable"),
    map("InventoryNet", "Inventory"),
    map("PrepaidExpenseAndOtherAssetsCurrent", "Prepaid Expenses & Other Current Assets"),
    map("AssetsCurrent", "Total Current Assets"),
    map("PropertyPlantAndEquipmentNet", "Property, Plant & Equipment (Net)"),
    map("Goodwill", "Goodwill"),
    map("IntangibleAssetsNetExcludingGoodwill", "Intangible Assets (Net)"),
    map("OtherAssetsNoncurrent", "Other Non-Current Assets"),
    map("Assets", "Total Assets"),
    map("AccountsPayableCurrent", "Accounts Payable"),
    map("AccruedLiabilitiesCurrent", "Accrued Liabilities"),
    map("LongTermDebtCurrent", "Current Portion of Long-Term Debt"),
    map("ShortTermBorrowings", "Short-Term Borrowings"),
    map("LiabilitiesCurrent", "Total Current Liabilities"),
    map("LongTermDebtNoncurrent", "Long-Term Debt"),
    map("LongTermDebt", "Long-Term Debt"),
    map("OperatingLeaseLiabilityNoncurrent", "Operating Lease Liabilities (Non-Current)"),
    map("OtherLiabilitiesNoncurrent", "Other Non-Current Liabilities"),
    map("Liabilities", "Total Liabilities"),
    map("CommonStockValue", "Common Stock"),
    map("AdditionalPaidInCapital", "Additional Paid-In Capital"),
    map("AdditionalPaidInCapitalCommonStock", "Additional Paid-In Capital"),
    map("RetainedEarningsAccumulatedDeficit", "Retained Earnings (Accumulated Deficit)"),
    map(
        "AccumulatedOtherComprehensiveIncomeLossNetOfTax",
        "Accumulated Other Comprehensive Income (Loss)",
    ),
    map("TreasuryStockValue", "Treasury Stock"),
    map("StockholdersEquity", "Total Stockholders' Equity"),
    map("LiabilitiesAndStockholdersEquity", "Total Liabilities & Stockholders' Equity"),
];

/// Cash flow statement concepts, in priority order.
pub const CASH_FLOW_CONCEPTS: &[ConceptMapping] = &[
    map("NetIncomeLoss", "Net Income"),
    map("DepreciationDepletionAndAmortization", "Depreciation & Amortization"),
    map("ShareBasedCompensation", "Stock-Based Compensation"),
    map("DeferredIncomeTaxExpenseBenefit", "Deferred Income Taxes"),
    map("IncreaseDecreaseInAccountsReceivable", "Change in Accounts Receivable"),
    map("IncreaseDecreaseInInventories", "Change in Inventories"),
    map("IncreaseDecreaseInAccountsPayable", "Change in Accounts Payable"),
    map("IncreaseDecreaseInAccruedLiabilities", "Change in Accrued Liabilities"),
    map("NetCashProvidedByUsedInOperatingActivities", "Net Cash from Operating Activities"),
    map("PaymentsToAcquirePropertyPlantAndEquipment", "Capital Expenditures"),
    map("PaymentsToAcquireBusinessesNetOfCashAcquired", "Acquisitions (Net of Cash)"),
    map("PaymentsToAcquireInvestments", "Purchases of Investments"),
    map("ProceedsFromSaleAndMaturityOfMarketableSecurities", "Proceeds from Sale of Investments"),
    map(
        "ProceedsFromMaturitiesPrepaymentsAndCallsOfAvailableForSaleSecurities",
        "Proceeds from Maturities of Investments",
    ),
    map("NetCashProvidedByUsedInInvestingActivities", "Net Cash from Investing Activities"),
    map("ProceedsFromIssuanceOfLongTermDebt", "Proceeds from Long-Term Debt"),
    map("RepaymentsOfLongTermDebt", "Repayments of Long-Term Debt"),
    map("PaymentsOfDividends", "Dividends Paid"),
    map("PaymentsOfDividendsCommonStock", "Dividends Paid (Common Stock)"),
    map("PaymentsForRepurchaseOfCommonStock", "Share Repurchases"),
    map("ProceedsFromIssuanceOfCommonStock", "Proceeds from Stock Issuance"),
    map("NetCashProvidedByUsedInFinancingActivities", "Net Cash from Financing Activities"),
    map(
        "CashCashEquivalentsRestrictedCashAndRestrictedCashEquivalentsPeriodIncreaseDecreaseIncludingExchangeRateEffect",
        "Net Change in Cash",
    ),
    map("CashAndCashEquivalentsPeriodIncreaseDecrease", "Net Change in Cash"),
];

/// A concept chosen for a label, with its facts in payload order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConcept {
    /// Concept that won the label
    pub concept: &'static str,
    /// Canonical label
    pub label: &'static str,
    /// Every fact reported for the concept
    pub facts: Vec<FinancialFact>,
}

/// Picks one concept per canonical label.
#[derive(Debug, Clone)]
pub struct ConceptResolver {
    taxonomy: String,
}

impl Default for ConceptResolver {
    fn default() -> Self {
        Self::new(US_GAAP)
    }
}

impl ConceptResolver {
    /// Resolver reading facts from `taxonomy`.
    pub fn new(taxonomy: impl Into<String>) -> Self {
        Self { taxonomy: taxonomy.into() }
    }

    /// Taxonomy facts are read from.
    pub fn taxonomy(&self) -> &str {
        &self.taxonomy
    }

    /// Resolve `mappings` against `facts`.
    ///
    /// Mappings are tried in order. The first concept for a label that has any
    /// reported facts claims the label, and later synonyms are skipped even if
    /// they also have facts. Output keeps mapping order and never repeats a
    /// label.
    ///
    /// Periods are not considered here: a concept whose facts match none of the
    /// selected filings still claims its label, so the label ends up with no
    /// values even when a later synonym covers those filings.
    pub fn resolve(&self, mappings: &[ConceptMapping], facts: &CompanyFacts) -> Vec<ResolvedConcept> {
        let mut seen: HashSet<&'static str> = HashSet::new();
        let mut resolved = Vec::new();

        for mapping in mappings {
            if seen.contains(mapping.label) || !facts.has_facts(&self.taxonomy, mapping.concept) {
                continue;
            }
            seen.insert(mapping.label);
            resolved.push(ResolvedConcept {
                concept: mapping.concept,
                label: mapping.label,
                facts: facts.concept_facts(&self.taxonomy, mapping.concept),
            });
        }

        debug!(candidates = mappings.len(), resolved = resolved.len(), "resolved concepts");
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts_with(concepts: &[&str]) -> CompanyFacts {
        let body: Vec<String> = concepts
            .iter()
            .map(|c| {
                format!(
                    r#""{c}": {{"units": {{"USD": [{{"val": 1, "end": "2023-12-31", "form": "10-K"}}]}}}}"#
                )
            })
            .collect();
        CompanyFacts::from_json(&format!(r#"{{"facts": {{"us-gaap": {{{}}}}}}}"#, body.join(",")))
            .unwrap()
    }

    #[test]
    fn test_first_concept_with_facts_claims_label() {
        let facts = facts_with(&["SalesRevenueNet", "RevenueFromContractWithCustomerExcludingAssessedTax"]);
        let resolved = ConceptResolver::default().resolve(INCOME_STATEMENT_CONCEPTS, &facts);

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].label, "Revenue");
        assert_eq!(resolved[0].concept, "RevenueFromContractWithCustomerExcludingAssessedTax");
    }

    #[test]
    fn test_labels_unique_in_every_statement() {
        let all: Vec<&str> = INCOME_STATEMENT_CONCEPTS
            .iter()
            .chain(BALANCE_SHEET_CONCEPTS)
            .chain(CASH_FLOW_CONCEPTS)
            .map(|m| m.concept)
            .collect();
        let facts = facts_with(&all);

        for mappings in [INCOME_STATEMENT_CONCEPTS, BALANCE_SHEET_CONCEPTS, CASH_FLOW_CONCEPTS] {
            let resolved = ConceptResolver::default().resolve(mappings, &facts);
            let labels: HashSet<&str> = resolved.iter().map(|r| r.label).collect();
            assert_eq!(labels.len(), resolved.len());
        }
    }

    #[test]
    fn test_order_follows_mappings() {
        let facts = facts_with(&["NetIncomeLoss", "CostOfRevenue", "Revenues"]);
        let labels: Vec<&str> = ConceptResolver::default()
            .resolve(INCOME_STATEMENT_CONCEPTS, &facts)
            .iter()
            .map(|r| r.label)
            .collect();
        assert_eq!(labels, vec!["Revenue", "Cost of Revenue", "Net Income (Loss)"]);
    }

    #[test]
    fn test_other_taxonomy_ignored() {
        let facts = CompanyFacts::from_json(
            r#"{"facts": {"ifrs-full": {"Revenues": {"units": {"USD": [{"val": 1}]}}}}}"#,
        )
        .unwrap();
        assert!(ConceptResolver::default().resolve(INCOME_STATEMENT_CONCEPTS, &facts).is_empty());
        assert_eq!(
            ConceptResolver::new("ifrs-full").resolve(INCOME_STATEMENT_CONCEPTS, &facts).len(),
            1
        );
    }

    #[test]
    fn test_shared_labels_exist() {
        // several lists rely on label sharing for synonyms
        let revenue = INCOME_STATEMENT_CONCEPTS.iter().filter(|m| m.label == "Revenue").count();
        let debt = BALANCE_SHEET_CONCEPTS.iter().filter(|m| m.label == "Long-Term Debt").count();
        assert_eq!((revenue, debt), (4, 2));
    }
}
