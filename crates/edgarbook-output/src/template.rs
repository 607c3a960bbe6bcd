//! Statement layout templates.
//!
//! A template is an ordered list of [`LineItem`]s. Data items pull reported
//! values by label, formula items combine rows emitted earlier in the same
//! template. References are checked once when a structure is built, so the
//! renderer only ever looks backwards.

use edgarbook_data::statements::StatementKind;
use std::collections::HashSet;
use std::sync::LazyLock;
use thiserror::Error;

/// Errors raised while building a statement structure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A formula refers to an id that is only declared further down.
    #[error("item `{item}` refers to `{reference}` before it is declared")]
    ForwardReference {
        /// Referring formula id
        item: String,
        /// Referenced id
        reference: String,
    },

    /// A formula refers to an id that does not exist.
    #[error("item `{item}` refers to undeclared id `{reference}`")]
    UndeclaredReference {
        /// Referring formula id
        item: String,
        /// Referenced id
        reference: String,
    },

    /// Two items share an id.
    #[error("id `{0}` is declared more than once")]
    DuplicateId(String),
}

/// A line item pulled straight from statement data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataItem {
    /// Row id that formulas refer to
    pub id: String,
    /// Candidate labels, first present wins
    pub labels: Vec<String>,
    /// Flip the sign of reported values
    pub negate: bool,
}

/// A derived subtotal or total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaItem {
    /// Row id that later formulas refer to
    pub id: String,
    /// Display label
    pub label: String,
    /// Ids added
    pub plus: Vec<String>,
    /// Ids subtracted
    pub minus: Vec<String>,
    /// Labels used as plain values when no component was emitted
    pub fallback: Vec<String>,
    /// Major total rather than subtotal
    pub total: bool,
    /// Flip the sign of the result
    pub negate: bool,
}

impl FormulaItem {
    /// Formula with no components yet.
    pub fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            plus: Vec::new(),
            minus: Vec::new(),
            fallback: Vec::new(),
            total: false,
            negate: false,
        }
    }

    /// Ids to add.
    pub fn plus(mut self, ids: &[&str]) -> Self {
        self.plus = owned(ids);
        self
    }

    /// Ids to subtract.
    pub fn minus(mut self, ids: &[&str]) -> Self {
        self.minus = owned(ids);
        self
    }

    /// Fallback labels.
    pub fn fallback(mut self, labels: &[&str]) -> Self {
        self.fallback = owned(labels);
        self
    }

    /// Mark as a major total.
    pub const fn total(mut self) -> Self {
        self.total = true;
        self
    }

    /// Sign-flip the result.
    pub const fn negated(mut self) -> Self {
        self.negate = true;
        self
    }
}

/// One entry of a statement template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineItem {
    /// Reported value
    Data(DataItem),
    /// Derived value
    Formula(FormulaItem),
    /// Bold section header
    Section(String),
    /// Blank row
    Spacer,
}

impl LineItem {
    /// Data item.
    pub fn data(id: &str, labels: &[&str]) -> Self {
        Self::Data(DataItem { id: id.to_string(), labels: owned(labels), negate: false })
    }

    /// Data item shown with its sign flipped.
    pub fn negated_data(id: &str, labels: &[&str]) -> Self {
        Self::Data(DataItem { id: id.to_string(), labels: owned(labels), negate: true })
    }

    /// Section header.
    pub fn section(label: &str) -> Self {
        Self::Section(label.to_string())
    }

    /// Row id, for items that have one.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Data(item) => Some(&item.id),
            Self::Formula(item) => Some(&item.id),
            Self::Section(_) | Self::Spacer => None,
        }
    }
}

impl From<FormulaItem> for LineItem {
    fn from(item: FormulaItem) -> Self {
        Self::Formula(item)
    }
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}

/// A validated statement template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementStructure {
    items: Vec<LineItem>,
}

impl StatementStructure {
    /// Validate and build a structure.
    ///
    /// Every formula component must name an id declared earlier in `items`,
    /// and ids must be unique.
    pub fn new(items: Vec<LineItem>) -> Result<Self, TemplateError> {
        validate(&items)?;
        Ok(Self { items })
    }

    /// Items in layout order.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Built-in template for a statement.
    pub fn builtin(kind: StatementKind) -> &'static Self {
        match kind {
            StatementKind::Income => &INCOME_STRUCTURE,
            StatementKind::Balance => &BALANCE_STRUCTURE,
            StatementKind::CashFlow => &CASH_FLOW_STRUCTURE,
        }
    }
}

fn validate(items: &[LineItem]) -> Result<(), TemplateError> {
    let all_ids: HashSet<&str> = items.iter().filter_map(LineItem::id).collect();
    let mut declared: HashSet<&str> = HashSet::new();

    for item in items {
        if let LineItem::Formula(formula) = item {
            for reference in formula.plus.iter().chain(&formula.minus) {
                if declared.contains(reference.as_str()) {
                    continue;
                }
                let item = formula.id.clone();
                let reference = reference.clone();
                return Err(if all_ids.contains(reference.as_str()) {
                    TemplateError::ForwardReference { item, reference }
                } else {
                    TemplateError::UndeclaredReference { item, reference }
                });
            }
        }
        if let Some(id) = item.id()
            && !declared.insert(id)
        {
            return Err(TemplateError::DuplicateId(id.to_string()));
        }
    }
    Ok(())
}

// Built-in templates are checked by the tests below; constructing them
// skips validation so the statics stay infallible.

static INCOME_STRUCTURE: LazyLock<StatementStructure> = LazyLock::new(|| StatementStructure {
    items: vec![
        LineItem::data("revenue", &["Revenue"]),
        LineItem::data("cogs", &["Cost of Revenue", "Cost of Goods Sold"]),
        FormulaItem::new("gross_profit", "Gross Profit")
            .plus(&["revenue"])
            .minus(&["cogs"])
            .fallback(&["Gross Profit"])
            .into(),
        LineItem::Spacer,
        LineItem::data("rd", &["Research & Development"]),
        LineItem::data(
            "sga",
            &["Selling, General & Administrative", "Selling & Marketing", "General & Administrative"],
        ),
        FormulaItem::new("opex", "Total Operating Expenses")
            .plus(&["rd", "sga"])
            .fallback(&["Total Operating Expenses"])
            .into(),
        LineItem::Spacer,
        FormulaItem::new("op_income", "Operating Income (Loss)")
            .plus(&["gross_profit"])
            .minus(&["opex"])
            .fallback(&["Operating Income (Loss)"])
            .into(),
        LineItem::Spacer,
        LineItem::data("int_exp", &["Interest Expense"]),
        LineItem::data("int_inc", &["Interest Income"]),
        LineItem::data("int_net", &["Net Interest Income (Expense)"]),
        LineItem::data("other_nonop", &["Other Non-Operating Income (Expense)"]),
        FormulaItem::new("pretax", "Income Before Tax")
            .plus(&["op_income", "int_inc", "int_net", "other_nonop"])
            .minus(&["int_exp"])
            .fallback(&["Income Before Tax"])
            .into(),
        LineItem::Spacer,
        LineItem::data("tax", &["Income Tax Expense (Benefit)"]),
        FormulaItem::new("net_income", "Net Income (Loss)")
            .plus(&["pretax"])
            .minus(&["tax"])
            .fallback(&["Net Income (Loss)"])
            .total()
            .into(),
        LineItem::Spacer,
        LineItem::data("eps_basic", &["EPS (Basic)"]),
        LineItem::data("eps_diluted", &["EPS (Diluted)"]),
        LineItem::data("shares_bd", &["Weighted Avg Shares (Basic & Diluted)"]),
        LineItem::data("shares_b", &["Weighted Avg Shares (Basic)"]),
        LineItem::data("shares_d", &["Weighted Avg Shares (Diluted)"]),
    ],
});

static BALANCE_STRUCTURE: LazyLock<StatementStructure> = LazyLock::new(|| StatementStructure {
    items: vec![
        LineItem::section("ASSETS"),
        LineItem::data("cash", &["Cash & Cash Equivalents"]),
        LineItem::data("st_inv", &["Short-Term Investments"]),
        LineItem::data("ar", &["Accounts Receivable"]),
        LineItem::data("inv", &["Inventory"]),
        LineItem::data("prepaid", &["Prepaid Expenses & Other Current Assets"]),
        FormulaItem::new("ca", "Total Current Assets")
            .plus(&["cash", "st_inv", "ar", "inv", "prepaid"])
            .fallback(&["Total Current Assets"])
            .into(),
        LineItem::Spacer,
        LineItem::data("ppe", &["Property, Plant & Equipment (Net)"]),
        LineItem::data("gw", &["Goodwill"]),
        LineItem::data("intang", &["Intangible Assets (Net)"]),
        LineItem::data("other_nca", &["Other Non-Current Assets"]),
        FormulaItem::new("total_assets", "Total Assets")
            .plus(&["ca", "ppe", "gw", "intang", "other_nca"])
            .fallback(&["Total Assets"])
            .total()
            .into(),
        LineItem::Spacer,
        LineItem::section("LIABILITIES"),
        LineItem::data("ap", &["Accounts Payable"]),
        LineItem::data("accrued", &["Accrued Liabilities"]),
        LineItem::data("cur_ltd", &["Current Portion of Long-Term Debt"]),
        LineItem::data("st_borr", &["Short-Term Borrowings"]),
        FormulaItem::new("cl", "Total Current Liabilities")
            .plus(&["ap", "accrued", "cur_ltd", "st_borr"])
            .fallback(&["Total Current Liabilities"])
            .into(),
        LineItem::Spacer,
        LineItem::data("lt_debt", &["Long-Term Debt"]),
        LineItem::data("lease", &["Operating Lease Liabilities (Non-Current)"]),
        LineItem::data("other_ncl", &["Other Non-Current Liabilities"]),
        FormulaItem::new("total_liab", "Total Liabilities")
            .plus(&["cl", "lt_debt", "lease", "other_ncl"])
            .fallback(&["Total Liabilities"])
            .into(),
        LineItem::Spacer,
        LineItem::section("STOCKHOLDERS' EQUITY"),
        LineItem::data("cs", &["Common Stock"]),
        LineItem::data("apic", &["Additional Paid-In Capital"]),
        LineItem::data("re", &["Retained Earnings (Accumulated Deficit)"]),
        LineItem::data("aoci", &["Accumulated Other Comprehensive Income (Loss)"]),
        LineItem::negated_data("treasury", &["Treasury Stock"]),
        FormulaItem::new("total_eq", "Total Stockholders' Equity")
            .plus(&["cs", "apic", "re", "aoci", "treasury"])
            .fallback(&["Total Stockholders' Equity"])
            .into(),
        LineItem::Spacer,
        FormulaItem::new("total_le", "Total Liabilities & Stockholders' Equity")
            .plus(&["total_liab", "total_eq"])
            .fallback(&["Total Liabilities & Stockholders' Equity"])
            .total()
            .into(),
    ],
});

static CASH_FLOW_STRUCTURE: LazyLock<StatementStructure> = LazyLock::new(|| StatementStructure {
    items: vec![
        LineItem::section("OPERATING ACTIVITIES"),
        LineItem::data("cf_ni", &["Net Income"]),
        LineItem::data("da", &["Depreciation & Amortization"]),
        LineItem::data("sbc", &["Stock-Based Compensation"]),
        LineItem::data("def_tax", &["Deferred Income Taxes"]),
        LineItem::data("chg_ar", &["Change in Accounts Receivable"]),
        LineItem::data("chg_inv", &["Change in Inventories"]),
        LineItem::data("chg_ap", &["Change in Accounts Payable"]),
        LineItem::data("chg_acc", &["Change in Accrued Liabilities"]),
        FormulaItem::new("cfo", "Net Cash from Operating Activities")
            .plus(&["cf_ni", "da", "sbc", "def_tax", "chg_ar", "chg_inv", "chg_ap", "chg_acc"])
            .fallback(&["Net Cash from Operating Activities"])
            .into(),
        LineItem::Spacer,
        LineItem::section("INVESTING ACTIVITIES"),
        LineItem::negated_data("capex", &["Capital Expenditures"]),
        LineItem::negated_data("acq", &["Acquisitions (Net of Cash)"]),
        LineItem::negated_data("buy_inv", &["Purchases of Investments"]),
        LineItem::data("sell_inv", &["Proceeds from Sale of Investments"]),
        LineItem::data("mat_inv", &["Proceeds from Maturities of Investments"]),
        FormulaItem::new("cfi", "Net Cash from Investing Activities")
            .plus(&["capex", "acq", "buy_inv", "sell_inv", "mat_inv"])
            .fallback(&["Net Cash from Investing Activities"])
            .into(),
        LineItem::Spacer,
        LineItem::section("FINANCING ACTIVITIES"),
        LineItem::data("debt_proc", &["Proceeds from Long-Term Debt"]),
        LineItem::negated_data("debt_repay", &["Repayments of Long-Term Debt"]),
        LineItem::negated_data("divs", &["Dividends Paid", "Dividends Paid (Common Stock)"]),
        LineItem::negated_data("buybacks", &["Share Repurchases"]),
        LineItem::data("stock_iss", &["Proceeds from Stock Issuance"]),
        FormulaItem::new("cff", "Net Cash from Financing Activities")
            .plus(&["debt_proc", "debt_repay", "divs", "buybacks", "stock_iss"])
            .fallback(&["Net Cash from Financing Activities"])
            .into(),
        LineItem::Spacer,
        FormulaItem::new("net_cash", "Net Change in Cash")
            .plus(&["cfo", "cfi", "cff"])
            .fallback(&["Net Change in Cash"])
            .total()
            .into(),
    ],
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_templates_are_valid() {
        for kind in StatementKind::ALL {
            let items = StatementStructure::builtin(kind).items().to_vec();
            assert!(!items.is_empty());
            assert!(StatementStructure::new(items).is_ok(), "{kind} template");
        }
    }

    #[test]
    fn test_builtin_labels_come_from_concept_lists() {
        use std::collections::HashSet;

        for kind in StatementKind::ALL {
            let known: HashSet<&str> = kind.concepts().iter().map(|m| m.label).collect();
            for item in StatementStructure::builtin(kind).items() {
                if let LineItem::Data(data) = item {
                    assert!(
                        data.labels.iter().any(|label| known.contains(label.as_str())),
                        "{} has no label produced for {kind}",
                        data.id
                    );
                }
            }
        }
    }

    #[test]
    fn test_forward_reference_rejected() {
        let err = StatementStructure::new(vec![
            FormulaItem::new("gross_profit", "Gross Profit").plus(&["revenue"]).into(),
            LineItem::data("revenue", &["Revenue"]),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            TemplateError::ForwardReference {
                item: "gross_profit".to_string(),
                reference: "revenue".to_string()
            }
        );
    }

    #[test]
    fn test_undeclared_reference_rejected() {
        let err = StatementStructure::new(vec![
            LineItem::data("revenue", &["Revenue"]),
            FormulaItem::new("gross_profit", "Gross Profit")
                .plus(&["revenue"])
                .minus(&["cogs"])
                .into(),
        ])
        .unwrap_err();
        assert!(matches!(err, TemplateError::UndeclaredReference { reference, .. } if reference == "cogs"));
    }

    #[test]
    fn test_self_reference_rejected() {
        let err = StatementStructure::new(vec![
            FormulaItem::new("loop", "Loop").plus(&["loop"]).into(),
        ])
        .unwrap_err();
        assert!(matches!(err, TemplateError::ForwardReference { .. }));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let err = StatementStructure::new(vec![
            LineItem::data("revenue", &["Revenue"]),
            LineItem::Spacer,
            LineItem::data("revenue", &["Sales"]),
        ])
        .unwrap_err();
        assert_eq!(err, TemplateError::DuplicateId("revenue".to_string()));
    }
}
