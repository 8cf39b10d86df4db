//! Run controller - main scrape orchestration
//!
//! The controller owns the page session and runs the pipeline strictly in
//! sequence:
//! - discover countries and apply the country filter
//! - discover each country's universities (and write its listing)
//! - load each university, read its remaining program pages, extract,
//!   optionally enrich and write it
//! - pause between universities and countries
//!
//! The page session is closed on every exit path.

mod stats;

pub use stats::{print_statistics, RunStats};

use crate::config::Config;
use crate::discovery::LinkDiscoverer;
use crate::extract::{FieldExtractor, ProgramPager};
use crate::llm::LlmClient;
use crate::output::{CountrySummary, RecordWriter, RunSummary};
use crate::page::{slugify, PageClient};
use crate::record::{CountryRef, UniversityRef};
use crate::Result;
use chrono::Utc;
use std::time::Duration;

/// Which discovered countries a run visits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CountryFilter {
    #[default]
    All,
    /// Lowercased names or codes
    Only(Vec<String>),
}

impl CountryFilter {
    /// Parses a comma-separated list of country names or codes; `all` or an
    /// empty list selects everything
    pub fn parse(list: &str) -> Self {
        let wanted: Vec<String> = list
            .split(',')
            .map(|item| item.trim().to_lowercase())
            .filter(|item| !item.is_empty())
            .collect();

        if wanted.is_empty() || wanted.iter().any(|item| item == "all") {
            Self::All
        } else {
            Self::Only(wanted)
        }
    }

    /// Whether `country` is selected, comparing names and codes case-insensitively
    pub fn matches(&self, country: &CountryRef) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => {
                let name = country.name.to_lowercase();
                let code = country.code.to_lowercase();
                let slug = slugify(&country.name);
                wanted
                    .iter()
                    .any(|item| *item == name || *item == code || slugify(item) == slug)
            }
        }
    }
}

/// Drives one scrape run
pub struct RunController {
    config: Config,
    page: Box<dyn PageClient>,
    llm: Option<Box<dyn LlmClient>>,
    discoverer: LinkDiscoverer,
    extractor: FieldExtractor,
    pager: ProgramPager,
    writer: RecordWriter,
    listings_only: bool,
    config_hash: Option<String>,
}

impl RunController {
    /// Creates a new controller
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `page` - The page session, owned and closed by the controller
    /// * `llm` - LLM for AI fallbacks; `None` disables them
    ///
    /// # Returns
    ///
    /// * `Ok(RunController)` - Successfully created controller
    /// * `Err(ScrapeError)` - A configured pattern failed to compile
    pub fn new(
        config: Config,
        page: Box<dyn PageClient>,
        llm: Option<Box<dyn LlmClient>>,
    ) -> Result<Self> {
        let discoverer = LinkDiscoverer::new(&config)?;
        let extractor = FieldExtractor::new(&config);
        let pager = ProgramPager::new(&config);
        let writer = RecordWriter::new(&config.output.directory)
            .with_summary_file(&config.output.summary_file);

        Ok(Self {
            config,
            page,
            llm,
            discoverer,
            extractor,
            pager,
            writer,
            listings_only: false,
            config_hash: None,
        })
    }

    /// Only discover and write country listings, without visiting universities
    pub fn listings_only(mut self, enabled: bool) -> Self {
        self.listings_only = enabled;
        self
    }

    /// Hash of the configuration file, recorded in the run summary
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    /// Runs the pipeline and closes the page session
    ///
    /// Unit failures (a country, a university, an AI call) are logged and
    /// counted; only a failure to write the run summary is returned.
    pub async fn run(&mut self, filter: &CountryFilter) -> Result<RunStats> {
        let result = self.run_inner(filter).await;

        if let Err(e) = self.page.close().await {
            tracing::warn!("Failed to close page session: {}", e);
        }

        result
    }

    async fn run_inner(&mut self, filter: &CountryFilter) -> Result<RunStats> {
        let session_start = Utc::now();
        let start_time = std::time::Instant::now();
        let mut stats = RunStats::default();
        let mut summaries = Vec::new();

        tracing::info!(
            "Starting run against {} (listings only: {})",
            self.config.site.base_url,
            self.listings_only
        );

        let countries = self
            .discoverer
            .discover_countries(self.page.as_mut(), self.llm.as_deref())
            .await;
        let countries: Vec<CountryRef> = countries
            .into_iter()
            .filter(|country| filter.matches(country))
            .collect();

        if countries.is_empty() {
            tracing::warn!("No countries to process");
        } else {
            tracing::info!("Processing {} countries", countries.len());
        }

        for (index, country) in countries.iter().enumerate() {
            tracing::info!(
                "[{}/{}] Processing {} ({})",
                index + 1,
                countries.len(),
                country.name,
                country.code
            );

            let universities = self
                .discoverer
                .discover_universities(self.page.as_mut(), country)
                .await;
            stats.countries_processed += 1;
            stats.universities_found += universities.len();

            if self.listings_only || self.config.output.country_summaries {
                if let Err(e) = self
                    .writer
                    .write_country_listing(country, &universities, Utc::now())
                {
                    tracing::error!("Failed to write listing for {}: {}", country.name, e);
                }
            }

            let mut written = 0;
            if !self.listings_only {
                written = self
                    .scrape_universities(country, &universities, &mut stats, start_time)
                    .await;
            }

            summaries.push(CountrySummary::new(country, &universities, written));

            if index + 1 < countries.len() {
                pause(self.config.pacing.country_delay_ms).await;
            }
        }

        let session_end = Utc::now();
        let summary = RunSummary {
            session_start,
            session_end,
            duration_seconds: (session_end - session_start).num_seconds(),
            config_hash: self.config_hash.clone(),
            listings_only: self.listings_only,
            countries_processed: stats.countries_processed,
            universities_found: stats.universities_found,
            records_written: stats.records_written,
            failures: stats.failures,
            countries: summaries,
        };
        self.writer.write_run_summary(&summary)?;

        tracing::info!(
            "Run completed: {} countries, {} universities, {} records, {} failures in {:?}",
            stats.countries_processed,
            stats.universities_found,
            stats.records_written,
            stats.failures,
            start_time.elapsed()
        );

        Ok(stats)
    }

    /// Scrapes every university of a country, returning how many were written
    async fn scrape_universities(
        &mut self,
        country: &CountryRef,
        universities: &[UniversityRef],
        stats: &mut RunStats,
        start_time: std::time::Instant,
    ) -> usize {
        let mut written = 0;

        for (index, university) in universities.iter().enumerate() {
            if self.scrape_university(country, university).await {
                written += 1;
                stats.records_written += 1;
            } else {
                stats.failures += 1;
            }

            let processed = stats.records_written + stats.failures;
            if processed % 10 == 0 {
                let rate = processed as f64 / start_time.elapsed().as_secs_f64().max(0.001);
                tracing::info!(
                    "Progress: {} universities processed, {} written, {:.2} pages/sec",
                    processed,
                    stats.records_written,
                    rate
                );
            }

            if index + 1 < universities.len() {
                pause(self.config.pacing.request_delay_ms).await;
            }
        }

        written
    }

    /// Loads, extracts and writes one university
    async fn scrape_university(&mut self, country: &CountryRef, university: &UniversityRef) -> bool {
        tracing::debug!("Processing university: {}", university.url);

        if let Err(e) = self.page.load(&university.url).await {
            tracing::warn!("Failed to load {}: {}", university.url, e);
            return false;
        }

        let html = match self.page.current_html() {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("No HTML for {}: {}", university.url, e);
                return false;
            }
        };

        let extra_pages = self
            .pager
            .collect(self.page.as_ref(), &university.id, &html)
            .await;

        let mut record = self.extractor.extract(&html, &university.url);
        self.extractor.merge_program_pages(&mut record, &extra_pages);

        if let Some(llm) = self.llm.as_deref() {
            let text = if extra_pages.is_empty() {
                html
            } else {
                std::iter::once(html).chain(extra_pages).collect::<Vec<_>>().join("\n")
            };
            record = self
                .extractor
                .enrich_with_ai(llm, &text, &university.url, record)
                .await;
        }

        if record.location.country.is_empty() {
            record.location.country = country.name.clone();
        }
        if record.name.is_empty() || record.name == "Unknown" {
            record.name = university.name.clone();
        }

        let written = self.writer.write(
            &record,
            &country.name,
            &record.location.city,
            &record.name,
        );

        if written {
            tracing::info!(
                "Saved {} ({} programs)",
                record.name,
                record.program_count()
            );
        }

        written
    }
}

async fn pause(millis: u64) {
    if millis > 0 {
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ScrapeError, UniversityRecord};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn country(name: &str, code: &str) -> CountryRef {
        CountryRef {
            name: name.to_string(),
            code: code.to_string(),
            source_url: format!("https://example.com/en/universities_{}", code),
        }
    }

    #[test]
    fn test_country_filter_parse() {
        assert_eq!(CountryFilter::parse("all"), CountryFilter::All);
        assert_eq!(CountryFilter::parse(" , "), CountryFilter::All);
        assert_eq!(CountryFilter::parse("Turkey, ALL"), CountryFilter::All);
        assert_eq!(
            CountryFilter::parse("Turkey, germany"),
            CountryFilter::Only(vec!["turkey".to_string(), "germany".to_string()])
        );
    }

    #[test]
    fn test_country_filter_matches_names_and_codes() {
        let filter = CountryFilter::parse("TURKEY,United Kingdom");
        assert!(filter.matches(&country("Turkey", "turkey")));
        assert!(filter.matches(&country("United Kingdom", "uk")));
        assert!(!filter.matches(&country("Germany", "germany")));

        let filter = CountryFilter::parse("united_kingdom");
        assert!(filter.matches(&country("United Kingdom", "uk")));
    }

    /// In-memory page session serving fixed documents by URL
    struct FakePage {
        pages: HashMap<String, String>,
        current: Option<String>,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl PageClient for FakePage {
        async fn load(&mut self, url: &str) -> Result<()> {
            if self.pages.contains_key(url) {
                self.current = Some(url.to_string());
                Ok(())
            } else {
                Err(ScrapeError::Status {
                    url: url.to_string(),
                    status: 404,
                })
            }
        }

        fn current_html(&self) -> Result<String> {
            self.current
                .as_ref()
                .and_then(|url| self.pages.get(url))
                .cloned()
                .ok_or(ScrapeError::NoPage)
        }

        fn current_url(&self) -> Option<String> {
            self.current.clone()
        }

        async fn click(&mut self, selector: &str) -> Result<()> {
            Err(ScrapeError::MissingElement {
                selector: selector.to_string(),
            })
        }

        async fn fetch_document(&self, url: &str) -> Result<String> {
            self.pages.get(url).cloned().ok_or(ScrapeError::Status {
                url: url.to_string(),
                status: 404,
            })
        }

        async fn close(&mut self) -> Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn test_config(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.site.base_url = "https://example.com".to_string();
        config.output.directory = dir.path().to_string_lossy().to_string();
        config.pacing.request_delay_ms = 0;
        config.pacing.country_delay_ms = 0;
        config.ai.enabled = false;
        config
    }

    fn fake_site() -> HashMap<String, String> {
        let mut pages = HashMap::new();
        pages.insert(
            "https://example.com/en/universities".to_string(),
            r#"<select name="country"><option value="">Select country</option>
               <option value="turkey">Turkey</option><option value="germany">Germany</option></select>"#
                .to_string(),
        );
        pages.insert(
            "https://example.com/en/universities_turkey".to_string(),
            r#"<a href="/en/1/bilkent-university">Bilkent University</a>
               <a href="/en/2/missing-university">Missing University</a>
               <a href="/en/1/bilkent-university">Bilkent again</a>"#
                .to_string(),
        );
        pages.insert(
            "https://example.com/en/universities_germany".to_string(),
            "<p>No universities listed</p>".to_string(),
        );
        pages.insert(
            "https://example.com/en/1/bilkent-university".to_string(),
            r#"<h1>Bilkent University</h1><table><tr><td>City</td><td>Ankara</td></tr></table>"#
                .to_string(),
        );
        pages
    }

    #[tokio::test]
    async fn test_run_writes_records_and_closes_page() {
        let dir = TempDir::new().unwrap();
        let closed = Arc::new(AtomicBool::new(false));
        let page = FakePage {
            pages: fake_site(),
            current: None,
            closed: closed.clone(),
        };

        let mut controller =
            RunController::new(test_config(&dir), Box::new(page), None).unwrap();
        let stats = controller.run(&CountryFilter::parse("turkey")).await.unwrap();

        assert_eq!(
            stats,
            RunStats {
                countries_processed: 1,
                universities_found: 2,
                records_written: 1,
                failures: 1,
            }
        );
        assert!(closed.load(Ordering::SeqCst));

        let record_path = dir
            .path()
            .join("Turkey")
            .join("Ankara")
            .join("Bilkent_University.json");
        let record: UniversityRecord =
            serde_json::from_str(&std::fs::read_to_string(record_path).unwrap()).unwrap();
        assert_eq!(record.location.country, "Turkey");
        assert!(dir.path().join("turkey_universities.json").exists());
        assert!(dir.path().join("scraping_summary.json").exists());
    }

    #[tokio::test]
    async fn test_listings_only_skips_university_pages() {
        let dir = TempDir::new().unwrap();
        let page = FakePage {
            pages: fake_site(),
            current: None,
            closed: Arc::new(AtomicBool::new(false)),
        };

        let mut controller = RunController::new(test_config(&dir), Box::new(page), None)
            .unwrap()
            .listings_only(true);
        let stats = controller.run(&CountryFilter::All).await.unwrap();

        assert_eq!(stats.countries_processed, 2);
        assert_eq!(stats.universities_found, 2);
        assert_eq!(stats.records_written, 0);
        assert!(dir.path().join("germany_universities.json").exists());
        assert!(!dir.path().join("Turkey").exists());

        let summary: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("scraping_summary.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(summary["listings_only"], true);
        assert_eq!(summary["countries"][0]["sample_universities"][0]["id"], "1");
    }

    #[tokio::test]
    async fn test_page_closed_when_summary_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, "file").unwrap();

        let mut config = test_config(&dir);
        config.output.directory = blocker.to_string_lossy().to_string();

        let closed = Arc::new(AtomicBool::new(false));
        let page = FakePage {
            pages: HashMap::new(),
            current: None,
            closed: closed.clone(),
        };

        let mut controller = RunController::new(config, Box::new(page), None).unwrap();
        assert!(controller.run(&CountryFilter::All).await.is_err());
        assert!(closed.load(Ordering::SeqCst));
    }
}
