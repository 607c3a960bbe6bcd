//! SEC EDGAR data fetching and parsing.
//!
//! This module provides access to SEC EDGAR including:
//! - The company ticker directory and search
//! - Filing listings from the submissions API
//! - XBRL company facts
//! - Raw filing documents
//!
//! # Example
//!
//! ```no_run
//! use edgarbook_data::edgar::{CompanyDirectory, EdgarClient, FilingQuery};
//! use chrono::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = EdgarClient::new()?;
//!     let mut directory = CompanyDirectory::new(Duration::hours(1));
//!     let hits = directory.search(&client, "apple").await?;
//!
//!     let filings = client.list_filings(&hits[0].cik, &FilingQuery::default()).await?;
//!     println!("Found {} filings", filings.len());
//!
//!     let facts = client.company_facts(&hits[0].cik).await?;
//!     println!("{:?}", facts.entity_name);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod directory;
pub mod facts;
pub mod filings;

pub use client::EdgarClient;
pub use directory::{CompanyDirectory, CompanyEntry, rank_companies};
pub use facts::{CompanyFacts, FinancialFact, US_GAAP};
pub use filings::{FilingDescriptor, FilingQuery, filter_filings};
