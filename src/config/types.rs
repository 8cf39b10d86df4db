use serde::Deserialize;

/// Main configuration structure for Unipage-Scout
///
/// Every section has defaults targeting the unipage listing site, so an
/// empty TOML document is a valid configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Fixed country list, used when `discovery.country-source = "fixed"`
    /// and as the last fallback of the other sources
    #[serde(default, rename = "country")]
    pub countries: Vec<CountryEntry>,
}

/// Where the listing site lives and how its URLs are shaped
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Scheme and host of the site, without trailing slash
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Path of the listing page carrying the country dropdown
    #[serde(rename = "listing-path", default = "default_listing_path")]
    pub listing_path: String,

    /// Country page path with a `{code}` placeholder
    #[serde(
        rename = "country-url-template",
        default = "default_country_url_template"
    )]
    pub country_url_template: String,

    /// CSS selector for the `<option>` elements of the country dropdown
    #[serde(
        rename = "country-dropdown-selector",
        default = "default_country_dropdown_selector"
    )]
    pub country_dropdown_selector: String,

    /// Regex pulling the country code out of a country page URL
    #[serde(rename = "country-url-pattern", default = "default_country_url_pattern")]
    pub country_url_pattern: String,

    /// Regex matching university page URLs; capture 1 is the id, capture 2 the slug
    #[serde(rename = "university-pattern", default = "default_university_pattern")]
    pub university_pattern: String,

    /// Path of the XML sitemap
    #[serde(rename = "sitemap-path", default = "default_sitemap_path")]
    pub sitemap_path: String,

    /// Maximum number of university URLs taken from the sitemap
    #[serde(rename = "sitemap-limit", default = "default_sitemap_limit")]
    pub sitemap_limit: usize,

    /// Program list page of a university, with `{id}` and `{page}` placeholders
    #[serde(
        rename = "programs-page-template",
        default = "default_programs_page_template"
    )]
    pub programs_page_template: String,
}

/// How countries and universities are discovered
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(rename = "country-source", default)]
    pub country_source: CountrySource,

    /// Upper bound on universities visited per country (unbounded when absent)
    #[serde(rename = "max-universities-per-country", default)]
    pub max_universities_per_country: Option<usize>,
}

/// Strategy used to enumerate countries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CountrySource {
    /// Read the dropdown on the listing page, falling back to the LLM
    #[default]
    Dropdown,
    /// Ask the LLM for country filter candidates directly
    Ai,
    /// Use the configured `[[country]]` list only
    Fixed,
}

/// Field extraction behavior
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub strategy: ExtractionStrategy,

    /// Minimum length for a description element to be accepted
    #[serde(
        rename = "min-description-length",
        default = "default_min_description_length"
    )]
    pub min_description_length: usize,

    /// Expected number of programs; when absent the page's pagination marker is used
    #[serde(rename = "expected-programs", default)]
    pub expected_programs: Option<usize>,

    /// Follow-up prompts issued when the program count falls short
    #[serde(
        rename = "max-followup-passes",
        default = "default_max_followup_passes"
    )]
    pub max_followup_passes: u32,

    /// Program list pages read per university, the university page included;
    /// 1 disables pagination
    #[serde(rename = "max-program-pages", default = "default_max_program_pages")]
    pub max_program_pages: u32,
}

/// Strategy used to extract university records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionStrategy {
    /// Selectors and regexes only
    Heuristic,
    /// Heuristics first, LLM for whatever they miss
    #[default]
    AiAssisted,
}

/// Page session settings
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_browser_timeout_secs")]
    pub timeout_secs: u64,

    /// Connect timeout (seconds)
    #[serde(
        rename = "connect-timeout-secs",
        default = "default_connect_timeout_secs"
    )]
    pub connect_timeout_secs: u64,

    /// Wait after each navigation to let dynamic content settle (milliseconds)
    #[serde(rename = "settle-ms", default = "default_settle_ms")]
    pub settle_ms: u64,
}

/// Fixed pause between network-bound steps
#[derive(Debug, Clone, Deserialize)]
pub struct PacingConfig {
    /// Pause after each university page (milliseconds)
    #[serde(rename = "request-delay-ms", default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Pause after each country (milliseconds)
    #[serde(rename = "country-delay-ms", default = "default_country_delay_ms")]
    pub country_delay_ms: u64,
}

/// LLM collaborator settings
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base URL of the chat-completions API
    #[serde(rename = "api-url", default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// API key; takes precedence over the environment variable
    #[serde(rename = "api-key", default)]
    pub api_key: Option<String>,

    /// Environment variable holding the API key
    #[serde(rename = "api-key-env", default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(rename = "max-tokens", default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-call timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_ai_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum characters of raw HTML sent in discovery prompts
    #[serde(rename = "html-limit", default = "default_html_limit")]
    pub html_limit: usize,

    /// Maximum characters of page text sent in extraction prompts
    #[serde(rename = "text-limit", default = "default_text_limit")]
    pub text_limit: usize,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root directory of the `country/city/name.json` tree
    #[serde(default = "default_output_directory")]
    pub directory: String,

    /// Write `{code}_universities.json` listing files
    #[serde(rename = "country-summaries", default = "default_true")]
    pub country_summaries: bool,

    /// File name of the run summary inside `directory`
    #[serde(rename = "summary-file", default = "default_summary_file")]
    pub summary_file: String,
}

/// A fixed country entry
#[derive(Debug, Clone, Deserialize)]
pub struct CountryEntry {
    /// Display name (e.g., "Turkey")
    pub name: String,

    /// Code templated into the country URL (e.g., "turkey")
    pub code: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            listing_path: default_listing_path(),
            country_url_template: default_country_url_template(),
            country_dropdown_selector: default_country_dropdown_selector(),
            country_url_pattern: default_country_url_pattern(),
            university_pattern: default_university_pattern(),
            sitemap_path: default_sitemap_path(),
            sitemap_limit: default_sitemap_limit(),
            programs_page_template: default_programs_page_template(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            country_source: CountrySource::default(),
            max_universities_per_country: None,
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            strategy: ExtractionStrategy::default(),
            min_description_length: default_min_description_length(),
            expected_programs: None,
            max_followup_passes: default_max_followup_passes(),
            max_program_pages: default_max_program_pages(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_browser_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: default_request_delay_ms(),
            country_delay_ms: default_country_delay_ms(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: default_api_url(),
            model: default_model(),
            api_key: None,
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_ai_timeout_secs(),
            html_limit: default_html_limit(),
            text_limit: default_text_limit(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            country_summaries: true,
            summary_file: default_summary_file(),
        }
    }
}

impl AiConfig {
    /// Resolves the API key: explicit override, then config, then environment
    pub fn resolve_api_key(&self, cli_override: Option<&str>) -> Option<String> {
        cli_override
            .map(str::to_string)
            .or_else(|| self.api_key.clone())
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "https://www.unipage.net".to_string()
}

fn default_listing_path() -> String {
    "/en/universities".to_string()
}

fn default_country_url_template() -> String {
    "/en/universities_{code}".to_string()
}

fn default_country_dropdown_selector() -> String {
    "select[name='country'] option, select#country option".to_string()
}

fn default_country_url_pattern() -> String {
    r"universities_([a-z_]+?)(?:_ab)?/?$".to_string()
}

fn default_university_pattern() -> String {
    r"/en/(\d+)/([^/?#]+)".to_string()
}

fn default_sitemap_path() -> String {
    "/sitemap.xml".to_string()
}

fn default_sitemap_limit() -> usize {
    200
}

fn default_programs_page_template() -> String {
    "/en/programs?universityIds[]={id}&page={page}".to_string()
}

fn default_min_description_length() -> usize {
    100
}

fn default_max_followup_passes() -> u32 {
    2
}

fn default_max_program_pages() -> u32 {
    15
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

fn default_browser_timeout_secs() -> u64 {
    20
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_settle_ms() -> u64 {
    3000
}

fn default_request_delay_ms() -> u64 {
    2000
}

fn default_country_delay_ms() -> u64 {
    1000
}

fn default_api_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_model() -> String {
    "deepseek/deepseek-r1:free".to_string()
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".to_string()
}

fn default_max_tokens() -> u32 {
    4000
}

fn default_temperature() -> f32 {
    0.1
}

fn default_ai_timeout_secs() -> u64 {
    60
}

fn default_html_limit() -> usize {
    8000
}

fn default_text_limit() -> usize {
    40000
}

fn default_output_directory() -> String {
    "./universities".to_string()
}

fn default_summary_file() -> String {
    "scraping_summary.json".to_string()
}
