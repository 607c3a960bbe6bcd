//! Builds statement data for a set of selected filings.

use super::concepts::ConceptResolver;
use super::period::matches;
use super::{FinancialStatements, StatementData, StatementKind};
use crate::edgar::facts::CompanyFacts;
use crate::edgar::filings::FilingDescriptor;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Produces `{label → {period → value}}` for each statement.
#[derive(Debug, Clone, Default)]
pub struct StatementAssembler {
    resolver: ConceptResolver,
}

impl StatementAssembler {
    /// Assembler reading the US GAAP taxonomy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assembler with a custom resolver.
    pub const fn with_resolver(resolver: ConceptResolver) -> Self {
        Self { resolver }
    }

    /// Build every statement for `filings`.
    ///
    /// For each resolved concept and each filing, the first fact in payload
    /// order that matches the filing period and has a value is recorded under
    /// its period end. A period already filled by an earlier filing keeps its
    /// first value. Labels with no matched period are left out.
    pub fn build(&self, facts: &CompanyFacts, filings: &[FilingDescriptor]) -> FinancialStatements {
        let mut statements = BTreeMap::new();
        let mut periods = BTreeSet::new();
        debug!(
            concepts = facts.concept_count(self.resolver.taxonomy()),
            filings = filings.len(),
            "assembling statements"
        );

        for kind in StatementKind::ALL {
            let data = self.build_statement(kind, facts, filings);
            for values in data.values() {
                periods.extend(values.keys().cloned());
            }
            debug!(statement = %kind, line_items = data.len(), "assembled statement");
            statements.insert(kind, data);
        }

        FinancialStatements { statements, periods: periods.into_iter().collect() }
    }

    /// Build a single statement.
    pub fn build_statement(
        &self,
        kind: StatementKind,
        facts: &CompanyFacts,
        filings: &[FilingDescriptor],
    ) -> StatementData {
        let mut data = StatementData::new();

        for resolved in self.resolver.resolve(kind.concepts(), facts) {
            let mut values: BTreeMap<String, f64> = BTreeMap::new();

            for filing in filings {
                let hit = resolved.facts.iter().find_map(|fact| {
                    let value = fact.value?;
                    matches(fact, &filing.date, &filing.form_type).then_some((fact, value))
                });
                if let Some((fact, value)) = hit {
                    values.entry(fact.period_end.clone()).or_insert(value);
                }
            }

            if !values.is_empty() {
                data.insert(resolved.label.to_string(), values);
            }
        }

        data
    }
}
