//! University field extraction
//!
//! Extraction runs in two stages:
//! - `extract` reads a record from the page with selectors, regexes and
//!   JSON-LD; it is pure and deterministic
//! - `enrich_with_ai` asks the LLM for whatever the heuristics missed and
//!   issues follow-up prompts while programs are still short of the expected
//!   count; it never fails and returns the record so far on any error
//!
//! Universities with paginated program lists get their follow-on pages from
//! `ProgramPager`; `merge_program_pages` folds their programs into the record
//! before the AI stage sees the combined text.

pub mod ai;
pub mod heuristics;
pub mod json_ld;
pub mod pagination;
pub mod programs;

pub use pagination::ProgramPager;

use crate::config::{Config, ExtractionStrategy};
use crate::llm::LlmClient;
use crate::page::{title_from_slug, visible_text};
use crate::record::{Location, ProgramCatalog, UniversityRecord};
use heuristics::QuickFacts;
use scraper::Html;
use url::Url;

/// Extracts `UniversityRecord`s from university pages
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    strategy: ExtractionStrategy,
    min_description_length: usize,
    expected_programs: Option<usize>,
    max_followup_passes: u32,
    text_limit: usize,
}

impl FieldExtractor {
    pub fn new(config: &Config) -> Self {
        Self {
            strategy: config.extraction.strategy,
            min_description_length: config.extraction.min_description_length,
            expected_programs: config.extraction.expected_programs,
            max_followup_passes: config.extraction.max_followup_passes,
            text_limit: config.ai.text_limit,
        }
    }

    /// Extracts a record from page HTML with heuristics only
    ///
    /// # Arguments
    ///
    /// * `html` - The university page HTML
    /// * `url` - The page URL, stored as `sourceUrl` and used for the slug fallback
    ///
    /// # Returns
    ///
    /// A record with every field set; missing values are empty, or `Unknown`
    /// for city and type. Country is left empty when the page does not name it.
    pub fn extract(&self, html: &str, url: &str) -> UniversityRecord {
        let document = Html::parse_document(html);
        let facts = QuickFacts::from_document(&document);
        let org = json_ld::organization(&document);

        let name = heuristics::first_text(&document, "h1")
            .or_else(|| slug_title(url))
            .unwrap_or_else(|| "Unknown".to_string());

        let city = facts
            .get(&["location", "city"])
            .and_then(|fact| heuristics::city_from_location(&fact.value))
            .or_else(|| {
                heuristics::meta_content(&document, &["geo.placename", "og:locality", "city"])
                    .and_then(|value| heuristics::city_from_location(&value))
            })
            .or_else(|| {
                org.locality
                    .as_deref()
                    .and_then(heuristics::city_from_location)
            })
            .unwrap_or_else(|| "Unknown".to_string());

        let country = facts
            .get(&["country"])
            .map(|fact| fact.value.clone())
            .or_else(|| org.country.clone())
            .unwrap_or_default();

        let kind = facts
            .get(&["type", "institution type", "university type"])
            .map(|fact| fact.value.clone())
            .unwrap_or_else(|| "Unknown".to_string());

        let website = facts
            .get(&["website", "official website"])
            .map(|fact| {
                fact.href
                    .clone()
                    .filter(|href| href.starts_with("http://") || href.starts_with("https://"))
                    .unwrap_or_else(|| fact.value.clone())
            })
            .or_else(|| org.url.clone())
            .unwrap_or_default();

        let description = heuristics::description(&document, self.min_description_length)
            .or_else(|| org.description.clone())
            .unwrap_or_default();

        UniversityRecord {
            name,
            location: Location { country, city },
            kind,
            website,
            description,
            rankings: heuristics::rankings(&document),
            tuition_fees: heuristics::tuition_fees(&document),
            study_programs: programs::heuristic_programs(&document).to_programs(),
            source_url: url.to_string(),
        }
    }

    /// Adds the programs listed on follow-on program pages to `record`
    ///
    /// Returns the number of programs that were new.
    pub fn merge_program_pages(&self, record: &mut UniversityRecord, pages: &[String]) -> usize {
        if pages.is_empty() {
            return 0;
        }

        let mut catalog = ProgramCatalog::from_programs(&record.study_programs);
        let added: usize = pages
            .iter()
            .map(|html| catalog.merge(programs::heuristic_programs(&Html::parse_document(html))))
            .sum();

        record.study_programs = catalog.to_programs();
        added
    }

    /// Expected number of programs: configured, else the page's pagination marker
    pub fn expected_program_count(&self, html: &str) -> Option<usize> {
        self.expected_programs
            .or_else(|| heuristics::expected_program_count(&visible_text(html, &[])))
    }

    /// Whether the LLM should be asked about this record
    pub fn needs_ai(&self, record: &UniversityRecord, expected: Option<usize>) -> bool {
        self.strategy == ExtractionStrategy::AiAssisted
            && (record.study_programs.is_empty()
                || expected.is_some_and(|target| record.program_count() < target))
    }

    /// Enriches a heuristic record with LLM output
    ///
    /// AI values only fill fields the heuristics left empty; AI programs merge
    /// into the existing ones without duplicates. While a target count exists
    /// and programs are short of it, up to `max-followup-passes` follow-ups ask
    /// for the missing programs; a pass that adds nothing ends the loop.
    ///
    /// Any LLM error or malformed reply is logged and the record built so far
    /// is returned.
    pub async fn enrich_with_ai(
        &self,
        llm: &dyn LlmClient,
        html: &str,
        url: &str,
        record: UniversityRecord,
    ) -> UniversityRecord {
        let expected = self.expected_program_count(html);
        if !self.needs_ai(&record, expected) {
            return record;
        }

        let text = ai::prompt_text(html, self.text_limit);
        tracing::debug!(
            "AI extraction for {} ({} chars, expected programs: {:?})",
            url,
            text.len(),
            expected
        );

        let reply = match llm
            .complete(ai::EXTRACTION_PROMPT, &ai::extraction_message(url, &text, expected))
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("AI extraction failed for {}: {}", url, e);
                return record;
            }
        };

        let Some(extraction) = ai::parse_extraction(&reply) else {
            tracing::warn!("AI extraction returned malformed JSON for {}", url);
            return record;
        };

        let mut enriched = record;
        ai::fill_missing_fields(&mut enriched, &extraction.fields);

        let mut catalog = ProgramCatalog::from_programs(&enriched.study_programs);
        let added = catalog.merge(extraction.catalog);
        tracing::info!("AI added {} programs for {}", added, url);

        if let Some(target) = expected {
            self.follow_up(llm, url, &text, target, &mut catalog).await;
        }

        enriched.study_programs = catalog.to_programs();
        enriched
    }

    async fn follow_up(
        &self,
        llm: &dyn LlmClient,
        url: &str,
        text: &str,
        target: usize,
        catalog: &mut ProgramCatalog,
    ) {
        for pass in 1..=self.max_followup_passes {
            if catalog.len() >= target {
                break;
            }

            tracing::info!(
                "Follow-up pass {} for {}: {} of {} programs",
                pass,
                url,
                catalog.len(),
                target
            );

            let message = ai::followup_message(catalog, target, text);
            let missing = match llm.complete(ai::FOLLOWUP_PROMPT, &message).await {
                Ok(reply) => match ai::parse_missing_programs(&reply) {
                    Some(missing) => missing,
                    None => {
                        tracing::warn!("Follow-up reply for {} was malformed", url);
                        break;
                    }
                },
                Err(e) => {
                    tracing::warn!("Follow-up request for {} failed: {}", url, e);
                    break;
                }
            };

            if catalog.merge(missing) == 0 {
                tracing::debug!("Follow-up pass {} added nothing", pass);
                break;
            }
        }
    }
}

fn slug_title(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let slug = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let title = title_from_slug(slug);
    (!title.is_empty()).then_some(title)
}
