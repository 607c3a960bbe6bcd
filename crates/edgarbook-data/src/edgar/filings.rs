//! Filing listings from the EDGAR submissions API.
//!
//! The submissions endpoint returns the most recent filings as parallel
//! arrays, plus the names of older batch files holding the rest of the
//! history. [`filter_filings`] flattens those batches into
//! [`FilingDescriptor`]s for the requested form types.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Host serving archived filing documents.
pub const ARCHIVES_BASE_URL: &str = "https://www.sec.gov/Archives/edgar/data";

/// Form types listed when the caller does not ask for specific ones.
pub const DEFAULT_FORMS: &[&str] = &["10-K", "10-Q", "8-K"];

/// Default look-back window in years.
pub const DEFAULT_LOOKBACK_YEARS: u32 = 5;

/// Pad a CIK to the 10 digits EDGAR URLs require.
///
/// ```
/// # use edgarbook_data::edgar::filings::pad_cik;
/// assert_eq!(pad_cik("320193"), "0000320193");
/// ```
pub fn pad_cik(cik: &str) -> String {
    format!("{:0>10}", cik.trim())
}

/// CIK without zero padding, as used in archive paths.
pub fn unpadded_cik(cik: &str) -> String {
    let trimmed = cik.trim();
    trimmed
        .parse::<u64>()
        .map_or_else(|_| trimmed.to_string(), |n| n.to_string())
}

/// Response from `submissions/CIK##########.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Submissions {
    /// CIK as returned (unpadded)
    #[serde(default)]
    pub cik: String,
    /// Company name
    #[serde(default)]
    pub name: String,
    /// Filing history
    #[serde(default)]
    pub filings: FilingHistory,
}

/// Recent filings plus pointers to older batches.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilingHistory {
    /// Most recent filings
    #[serde(default)]
    pub recent: FilingBatch,
    /// Older batch files, fetched separately
    #[serde(default)]
    pub files: Vec<SubmissionFile>,
}

/// Reference to an older submissions batch.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionFile {
    /// File name relative to the submissions directory
    pub name: String,
    /// Number of filings in the batch
    #[serde(default)]
    pub filing_count: Option<u32>,
}

/// Filings as parallel arrays; index `i` of each array describes one filing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingBatch {
    /// Accession numbers
    #[serde(default)]
    pub accession_number: Vec<String>,
    /// Filing dates in `YYYY-MM-DD`
    #[serde(default)]
    pub filing_date: Vec<String>,
    /// Form types
    #[serde(default)]
    pub form: Vec<String>,
    /// Primary document file names
    #[serde(default)]
    pub primary_document: Vec<String>,
    /// Primary document descriptions
    #[serde(default)]
    pub primary_doc_description: Vec<String>,
}

/// One filing selected for extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingDescriptor {
    /// Form type (`10-K`, `10-Q/A`, ...)
    #[serde(rename = "type")]
    pub form_type: String,
    /// Filing date (`YYYY-MM-DD`)
    pub date: String,
    /// Accession number
    pub accession: String,
    /// Primary document file name
    #[serde(default)]
    pub primary_doc: String,
    /// Full primary document URL, empty when there is no primary document
    #[serde(default)]
    pub doc_url: String,
    /// Primary document description
    #[serde(default)]
    pub description: String,
}

impl FilingDescriptor {
    /// A descriptor with no document attached.
    pub fn new(
        form_type: impl Into<String>,
        date: impl Into<String>,
        accession: impl Into<String>,
    ) -> Self {
        Self {
            form_type: form_type.into(),
            date: date.into(),
            accession: accession.into(),
            ..Self::default()
        }
    }

    /// Attach a primary document and derive its archive URL.
    pub fn with_document(mut self, cik: &str, primary_doc: impl Into<String>) -> Self {
        self.primary_doc = primary_doc.into();
        self.doc_url = document_url(cik, &self.accession, &self.primary_doc);
        self
    }
}

/// Archive URL for a filing's primary document; empty when `primary_doc` is.
pub fn document_url(cik: &str, accession: &str, primary_doc: &str) -> String {
    if primary_doc.is_empty() {
        return String::new();
    }
    format!(
        "{ARCHIVES_BASE_URL}/{}/{}/{}",
        unpadded_cik(cik),
        accession.replace('-', ""),
        primary_doc
    )
}

/// Which filings to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingQuery {
    /// Base form types; `/A` amendments of each are included
    pub forms: Vec<String>,
    /// Look-back window in years (365-day years)
    pub years: u32,
}

impl Default for FilingQuery {
    fn default() -> Self {
        Self {
            forms: DEFAULT_FORMS.iter().map(|f| (*f).to_string()).collect(),
            years: DEFAULT_LOOKBACK_YEARS,
        }
    }
}

impl FilingQuery {
    /// Whether `form` is requested, directly or as an amendment.
    pub fn wants(&self, form: &str) -> bool {
        self.forms
            .iter()
            .any(|f| f == form || form.strip_suffix("/A") == Some(f.as_str()))
    }
}

/// Flatten submission batches into descriptors, newest first.
///
/// Filings of unrequested forms, with unparseable dates, or filed before
/// `now - years` are skipped. Ties on date keep batch order.
pub fn filter_filings(
    cik: &str,
    batches: &[FilingBatch],
    query: &FilingQuery,
    now: DateTime<Utc>,
) -> Vec<FilingDescriptor> {
    let cutoff = now.naive_utc() - Duration::days(365 * i64::from(query.years));
    let mut filings = Vec::new();

    for batch in batches {
        for (i, form) in batch.form.iter().enumerate() {
            if !query.wants(form) {
                continue;
            }
            let (Some(date), Some(accession)) =
                (batch.filing_date.get(i), batch.accession_number.get(i))
            else {
                continue;
            };
            let Ok(filed) = NaiveDate::parse_from_str(date, "%Y-%m-%d") else {
                continue;
            };
            if filed.and_time(NaiveTime::MIN) < cutoff {
                continue;
            }

            let primary_doc = batch.primary_document.get(i).cloned().unwrap_or_default();
            let mut descriptor =
                FilingDescriptor::new(form.clone(), date.clone(), accession.clone())
                    .with_document(cik, primary_doc);
            descriptor.description = batch
                .primary_doc_description
                .get(i)
                .cloned()
                .unwrap_or_default();
            filings.push(descriptor);
        }
    }

    filings.sort_by(|a, b| b.date.cmp(&a.date));
    filings
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn batch(rows: &[(&str, &str, &str, &str)]) -> FilingBatch {
        let mut batch = FilingBatch::default();
        for (form, date, accession, doc) in rows {
            batch.form.push((*form).to_string());
            batch.filing_date.push((*date).to_string());
            batch.accession_number.push((*accession).to_string());
            batch.primary_document.push((*doc).to_string());
            batch.primary_doc_description.push(format!("{form} report"));
        }
        batch
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_pad_and_unpad_cik() {
        assert_eq!(pad_cik("1234"), "0000001234");
        assert_eq!(pad_cik("1234567890"), "1234567890");
        assert_eq!(unpadded_cik("0000320193"), "320193");
        assert_eq!(unpadded_cik("abc"), "abc");
    }

    #[test]
    fn test_document_url() {
        assert_eq!(
            document_url("0000320193", "0000320193-23-000077", "aapl-20230930.htm"),
            "https://www.sec.gov/Archives/edgar/data/320193/000032019323000077/aapl-20230930.htm"
        );
        assert_eq!(document_url("320193", "0000320193-23-000077", ""), "");
    }

    #[test]
    fn test_filters_forms_and_amendments() {
        let recent = batch(&[
            ("10-K", "2024-02-01", "a-1", "k.htm"),
            ("4", "2024-02-02", "a-2", "form4.xml"),
            ("10-K/A", "2024-03-01", "a-3", "ka.htm"),
            ("8-K", "2024-04-01", "a-4", "8k.htm"),
            ("S-1", "2024-04-02", "a-5", "s1.htm"),
        ]);
        let filings = filter_filings("42", &[recent], &FilingQuery::default(), now());
        let forms: Vec<&str> = filings.iter().map(|f| f.form_type.as_str()).collect();
        assert_eq!(forms, vec!["8-K", "10-K/A", "10-K"]);
        assert_eq!(filings[0].description, "8-K report");
        assert_eq!(
            filings[0].doc_url,
            "https://www.sec.gov/Archives/edgar/data/42/a4/8k.htm"
        );
    }

    #[test]
    fn test_lookback_cutoff() {
        let recent = batch(&[
            ("10-K", "2019-07-01", "new", "a.htm"),
            ("10-K", "2019-06-30", "old", "b.htm"),
            ("10-Q", "not-a-date", "bad", "c.htm"),
        ]);
        // five 365-day years before 2024-06-30 12:00 is 2019-07-02 12:00
        let query = FilingQuery { forms: vec!["10-K".into(), "10-Q".into()], years: 5 };
        assert!(filter_filings("1", &[recent.clone()], &query, now()).is_empty());

        let query = FilingQuery { years: 6, ..query };
        let filings = filter_filings("1", &[recent], &query, now());
        let accessions: Vec<&str> = filings.iter().map(|f| f.accession.as_str()).collect();
        assert_eq!(accessions, vec!["new", "old"]);
    }

    #[test]
    fn test_older_batches_merged_newest_first() {
        let recent = batch(&[("10-Q", "2024-05-01", "r-1", "q.htm")]);
        let older = batch(&[
            ("10-K", "2022-02-01", "o-1", "k.htm"),
            ("10-Q", "2023-08-01", "o-2", "q2.htm"),
        ]);
        let filings = filter_filings("1", &[recent, older], &FilingQuery::default(), now());
        let dates: Vec<&str> = filings.iter().map(|f| f.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-05-01", "2023-08-01", "2022-02-01"]);
    }

    #[test]
    fn test_ragged_arrays_tolerated() {
        let mut recent = batch(&[("10-K", "2024-02-01", "a-1", "k.htm")]);
        recent.primary_document.clear();
        recent.primary_doc_description.clear();
        recent.form.push("10-Q".into());

        let filings = filter_filings("1", &[recent], &FilingQuery::default(), now());
        assert_eq!(filings.len(), 1);
        assert_eq!(filings[0].primary_doc, "");
        assert_eq!(filings[0].doc_url, "");
    }

    #[test]
    fn test_descriptor_serializes_type_field() {
        let filing = FilingDescriptor::new("10-K", "2024-02-01", "a-1");
        let json = serde_json::to_value(&filing).unwrap();
        assert_eq!(json["type"], "10-K");
        let back: FilingDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(back, filing);
    }

    #[test]
    fn test_submissions_payload() {
        let payload = r#"{
            "cik": "320193", "name": "Apple Inc.",
            "filings": {
                "recent": {"accessionNumber": ["x"], "filingDate": ["2024-01-01"],
                           "form": ["10-Q"], "primaryDocument": ["q.htm"]},
                "files": [{"name": "CIK0000320193-submissions-001.json", "filingCount": 1200}]
            }
        }"#;
        let submissions: Submissions = serde_json::from_str(payload).unwrap();
        assert_eq!(submissions.name, "Apple Inc.");
        assert_eq!(submissions.filings.recent.form, vec!["10-Q"]);
        assert!(submissions.filings.recent.primary_doc_description.is_empty());
        assert_eq!(submissions.filings.files[0].filing_count, Some(1200));
    }
}
