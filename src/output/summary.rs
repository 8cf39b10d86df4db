//! Country listing and run summary documents

use crate::record::{CountryRef, UniversityRef};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Number of universities listed as samples per country in the run summary
pub const SAMPLE_SIZE: usize = 3;

/// Flat listing of one country's universities (`{code}_universities.json`)
#[derive(Debug, Clone, Serialize)]
pub struct CountryListing<'a> {
    pub country: &'a str,
    pub country_code: &'a str,
    pub url: &'a str,
    pub universities_count: usize,
    pub universities: &'a [UniversityRef],
    pub scraped_at: DateTime<Utc>,
}

impl<'a> CountryListing<'a> {
    pub fn new(
        country: &'a CountryRef,
        universities: &'a [UniversityRef],
        scraped_at: DateTime<Utc>,
    ) -> Self {
        Self {
            country: &country.name,
            country_code: &country.code,
            url: &country.source_url,
            universities_count: universities.len(),
            universities,
            scraped_at,
        }
    }
}

/// Per-country entry of the run summary
#[derive(Debug, Clone, Serialize)]
pub struct CountrySummary {
    pub country: String,
    pub country_code: String,
    pub url: String,
    pub universities_count: usize,
    pub records_written: usize,
    pub sample_universities: Vec<UniversityRef>,
}

impl CountrySummary {
    pub fn new(country: &CountryRef, universities: &[UniversityRef], records_written: usize) -> Self {
        Self {
            country: country.name.clone(),
            country_code: country.code.clone(),
            url: country.source_url.clone(),
            universities_count: universities.len(),
            records_written,
            sample_universities: universities.iter().take(SAMPLE_SIZE).cloned().collect(),
        }
    }
}

/// Summary of a whole run (`scraping_summary.json` by default)
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub session_start: DateTime<Utc>,
    pub session_end: DateTime<Utc>,
    pub duration_seconds: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
    pub listings_only: bool,
    pub countries_processed: usize,
    pub universities_found: usize,
    pub records_written: usize,
    pub failures: usize,
    pub countries: Vec<CountrySummary>,
}
