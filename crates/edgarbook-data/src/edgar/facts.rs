//! XBRL company-facts payload.
//!
//! The `companyfacts` endpoint returns every fact a company ever reported,
//! grouped as `facts → taxonomy → concept → units → [fact]`. Unit order in the
//! payload is significant for first-match scans, so units are kept as an
//! ordered list rather than a hash map.

use crate::error::Result;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The US GAAP taxonomy key.
pub const US_GAAP: &str = "us-gaap";

/// One reported XBRL value, copied verbatim from the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialFact {
    /// Reported value; the payload occasionally carries `null`
    pub value: Option<f64>,
    /// Period end (`YYYY-MM-DD`), empty when absent
    pub period_end: String,
    /// Period start, empty for instant facts
    pub period_start: String,
    /// Form the fact was reported on (`10-K`, `10-Q/A`, ...)
    pub form_type: String,
    /// Date the reporting filing was filed
    pub filed_date: String,
    /// Fiscal year
    pub fiscal_year: Option<i32>,
    /// Fiscal period (`FY`, `Q1`, ...)
    pub fiscal_period: Option<String>,
    /// Unit key the fact was listed under (`USD`, `shares`, ...)
    pub unit: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RawFact {
    #[serde(default)]
    val: Option<f64>,
    #[serde(default)]
    end: Option<String>,
    #[serde(default)]
    start: Option<String>,
    #[serde(default)]
    form: Option<String>,
    #[serde(default)]
    filed: Option<String>,
    #[serde(default)]
    fy: Option<i32>,
    #[serde(default)]
    fp: Option<String>,
}

impl RawFact {
    fn into_fact(self, unit: &str) -> FinancialFact {
        FinancialFact {
            value: self.val,
            period_end: self.end.unwrap_or_default(),
            period_start: self.start.unwrap_or_default(),
            form_type: self.form.unwrap_or_default(),
            filed_date: self.filed.unwrap_or_default(),
            fiscal_year: self.fy,
            fiscal_period: self.fp,
            unit: unit.to_string(),
        }
    }
}

/// Facts reported for a single concept.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConceptFacts {
    /// Human-readable label supplied by EDGAR
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "ordered_units")]
    units: Vec<(String, Vec<RawFact>)>,
}

impl ConceptFacts {
    /// All facts across units, in payload order.
    pub fn facts(&self) -> Vec<FinancialFact> {
        self.units
            .iter()
            .flat_map(|(unit, entries)| {
                entries.iter().cloned().map(move |raw| raw.into_fact(unit))
            })
            .collect()
    }

    /// Whether any unit lists at least one fact.
    pub fn is_empty(&self) -> bool {
        self.units.iter().all(|(_, entries)| entries.is_empty())
    }
}

/// Parsed `companyfacts` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyFacts {
    /// Company name
    #[serde(default, rename = "entityName")]
    pub entity_name: Option<String>,
    #[serde(default)]
    facts: HashMap<String, HashMap<String, ConceptFacts>>,
}

impl CompanyFacts {
    /// Parse a raw payload.
    ///
    /// Parse from text rather than from a `serde_json::Value`: the latter does
    /// not keep object key order.
    pub fn from_json(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Facts for `concept` in `taxonomy`, in payload order; empty if unreported.
    pub fn concept_facts(&self, taxonomy: &str, concept: &str) -> Vec<FinancialFact> {
        self.concept(taxonomy, concept)
            .map(ConceptFacts::facts)
            .unwrap_or_default()
    }

    /// Raw concept entry.
    pub fn concept(&self, taxonomy: &str, concept: &str) -> Option<&ConceptFacts> {
        self.facts.get(taxonomy)?.get(concept)
    }

    /// Whether `concept` has any reported facts.
    pub fn has_facts(&self, taxonomy: &str, concept: &str) -> bool {
        self.concept(taxonomy, concept).is_some_and(|c| !c.is_empty())
    }

    /// Number of concepts reported under `taxonomy`.
    pub fn concept_count(&self, taxonomy: &str) -> usize {
        self.facts.get(taxonomy).map_or(0, HashMap::len)
    }
}

fn ordered_units<'de, D>(deserializer: D) -> std::result::Result<Vec<(String, Vec<RawFact>)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct UnitsVisitor;

    impl<'de> Visitor<'de> for UnitsVisitor {
        type Value = Vec<(String, Vec<RawFact>)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of unit names to fact lists")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut units = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, Vec<RawFact>>()? {
                units.push(entry);
            }
            Ok(units)
        }

        fn visit_unit<E>(self) -> std::result::Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(UnitsVisitor)
}
