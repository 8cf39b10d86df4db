use crate::config::types::{
    AiConfig, Config, CountryEntry, CountrySource, DiscoveryConfig, ExtractionConfig, OutputConfig,
    SiteConfig,
};
use crate::ConfigError;
use regex::Regex;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_discovery_config(&config.discovery, &config.countries)?;
    validate_extraction_config(&config.extraction)?;
    validate_ai_config(&config.ai)?;
    validate_output_config(&config.output)?;
    validate_countries(&config.countries)?;
    Ok(())
}

/// Validates site URLs, patterns and selectors
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            config.base_url
        )));
    }

    for (name, path) in [
        ("listing-path", &config.listing_path),
        ("sitemap-path", &config.sitemap_path),
        ("programs-page-template", &config.programs_page_template),
    ] {
        if !path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "{} must start with '/', got '{}'",
                name, path
            )));
        }
    }

    if !config.country_url_template.contains("{code}") {
        return Err(ConfigError::Validation(format!(
            "country-url-template must contain '{{code}}', got '{}'",
            config.country_url_template
        )));
    }

    for placeholder in ["{id}", "{page}"] {
        if !config.programs_page_template.contains(placeholder) {
            return Err(ConfigError::Validation(format!(
                "programs-page-template must contain '{}', got '{}'",
                placeholder, config.programs_page_template
            )));
        }
    }

    validate_regex("country-url-pattern", &config.country_url_pattern, 1)?;
    validate_regex("university-pattern", &config.university_pattern, 2)?;

    Selector::parse(&config.country_dropdown_selector).map_err(|e| {
        ConfigError::InvalidPattern(format!(
            "Invalid country-dropdown-selector '{}': {:?}",
            config.country_dropdown_selector, e
        ))
    })?;

    if config.sitemap_limit < 1 {
        return Err(ConfigError::Validation(
            "sitemap-limit must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates a regex and the minimum number of capture groups it must expose
fn validate_regex(name: &str, pattern: &str, min_groups: usize) -> Result<(), ConfigError> {
    let regex = Regex::new(pattern)
        .map_err(|e| ConfigError::InvalidPattern(format!("Invalid {}: {}", name, e)))?;

    // captures_len counts the implicit whole-match group
    if regex.captures_len() < min_groups + 1 {
        return Err(ConfigError::InvalidPattern(format!(
            "{} needs at least {} capture group(s), got {}",
            name,
            min_groups,
            regex.captures_len() - 1
        )));
    }

    Ok(())
}

fn validate_discovery_config(
    config: &DiscoveryConfig,
    countries: &[CountryEntry],
) -> Result<(), ConfigError> {
    if config.country_source == CountrySource::Fixed && countries.is_empty() {
        return Err(ConfigError::Validation(
            "country-source = \"fixed\" requires at least one [[country]] entry".to_string(),
        ));
    }

    if config.max_universities_per_country == Some(0) {
        return Err(ConfigError::Validation(
            "max-universities-per-country must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    if config.max_program_pages < 1 {
        return Err(ConfigError::Validation(
            "max-program-pages must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates LLM configuration
fn validate_ai_config(config: &AiConfig) -> Result<(), ConfigError> {
    if !config.enabled {
        return Ok(());
    }

    Url::parse(&config.api_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid ai api-url: {}", e)))?;

    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation("ai model cannot be empty".to_string()));
    }

    if !(0.0..=2.0).contains(&config.temperature) {
        return Err(ConfigError::Validation(format!(
            "ai temperature must be between 0.0 and 2.0, got {}",
            config.temperature
        )));
    }

    if config.max_tokens < 1 {
        return Err(ConfigError::Validation(
            "ai max-tokens must be >= 1".to_string(),
        ));
    }

    if config.html_limit < 100 || config.text_limit < 100 {
        return Err(ConfigError::Validation(format!(
            "ai html-limit and text-limit must be >= 100, got {} and {}",
            config.html_limit, config.text_limit
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.summary_file.is_empty()
        || config.summary_file.contains('/')
        || config.summary_file.contains('\\')
    {
        return Err(ConfigError::Validation(format!(
            "summary-file must be a plain file name, got '{}'",
            config.summary_file
        )));
    }

    Ok(())
}

/// Validates fixed country entries
fn validate_countries(countries: &[CountryEntry]) -> Result<(), ConfigError> {
    for entry in countries {
        if entry.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Country name cannot be empty".to_string(),
            ));
        }

        if entry.code.is_empty()
            || !entry
                .code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::InvalidPattern(format!(
                "Country code '{}' must be non-empty and contain only letters, digits, '_' or '-'",
                entry.code
            )));
        }
    }

    Ok(())
}
