//! Integration tests for the scrape pipeline
//!
//! These tests use wiremock to serve a small listing site (listing page,
//! country pages, university pages, sitemap) and an LLM endpoint, and run
//! the full pipeline against them with output in a temporary directory.

use std::path::Path;
use tempfile::TempDir;
use unipage_scout::config::{parse_config, Config};
use unipage_scout::extract::FieldExtractor;
use unipage_scout::llm::{LlmClient, OpenRouterClient};
use unipage_scout::page::HttpPageClient;
use unipage_scout::{CountryFilter, RunController, UniversityRecord};
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING_PAGE: &str = r#"
<html><body>
  <form>
    <select name="country">
      <option value="">Select country</option>
      <option value="turkey">Turkey</option>
      <option value="germany">Germany</option>
    </select>
  </form>
</body></html>
"#;

const TURKEY_PAGE: &str = r#"
<html><body>
  <nav><a href="/en/universities">All universities</a><a href="/en/about">About</a></nav>
  <ul>
    <li><a href="/en/1/bilkent-university">Bilkent University</a></li>
    <li><a href="/en/2/ankara-university">Ankara University</a></li>
    <li><a href="/en/1/bilkent-university">Bilkent University (again)</a></li>
  </ul>
  <a href="https://twitter.com/unipage">Twitter</a>
</body></html>
"#;

const BILKENT_PAGE: &str = r#"
<html><head><title>Bilkent University</title></head><body>
  <h1>Bilkent University</h1>
  <table class="quick-facts">
    <tr><th>Location</th><td>Ankara, Turkey</td></tr>
    <tr><th>Country</th><td>Turkey</td></tr>
    <tr><th>Type</th><td>Private</td></tr>
    <tr><th>Website</th><td><a href="https://www.bilkent.edu.tr">bilkent.edu.tr</a></td></tr>
  </table>
  <div class="faculty-block" data-level="bachelor">
    <h3>Faculty of Engineering</h3>
    <a href="/en/programs/1-computer-engineering">Computer Engineering</a>
  </div>
</body></html>
"#;

const ANKARA_PAGE: &str = r#"
<html><body>
  <h1>Ankara University</h1>
  <dl>
    <dt>City</dt><dd>Ankara</dd>
    <dt>Country</dt><dd>Turkey</dd>
  </dl>
</body></html>
"#;

const LINK_LISTING_PAGE: &str = r#"
<html><body>
  <div class="countries">
    <a class="tr" href="/en/universities_turkey">Turkey</a>
    <a class="home" href="/en/universities">Universities</a>
  </div>
</body></html>
"#;

const PAGED_COUNTRY_PAGE: &str = r#"
<html><body>
  <a href="/en/1/bilkent-university">Bilkent University</a>
</body></html>
"#;

const PAGED_BILKENT_PAGE: &str = r#"
<html><body>
  <h1>Bilkent University</h1>
  <table class="quick-facts">
    <tr><th>Location</th><td>Ankara, Turkey</td></tr>
  </table>
  <div class="faculty-block" data-level="bachelor">
    <h3>Faculty of Science</h3>
    <a href="/en/programs/10-physics">Physics</a>
    <a href="/en/programs/11-chemistry">Chemistry</a>
  </div>
  <p>Items 1-2 of 3</p>
</body></html>
"#;

async fn mount_program_page(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/en/programs"))
        .and(query_param("universityIds[]", "1"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Builds a validated configuration pointing at the mock site
fn test_config(site: &MockServer, output: &Path, ai_url: Option<&str>) -> Config {
    let ai = match ai_url {
        Some(url) => format!("enabled = true\napi-url = '{}'\ntimeout-secs = 5", url),
        None => "enabled = false".to_string(),
    };

    let toml = format!(
        r#"
[site]
base-url = "{}"

[browser]
timeout-secs = 5
settle-ms = 0

[pacing]
request-delay-ms = 0
country-delay-ms = 0

[ai]
{}

[output]
directory = '{}'
"#,
        site.uri(),
        ai,
        output.display()
    );

    parse_config(&toml).unwrap()
}

fn controller(config: Config, llm: Option<Box<dyn LlmClient>>) -> RunController {
    let page = HttpPageClient::new(&config.browser).unwrap();
    RunController::new(config, Box::new(page), llm).unwrap()
}

fn read_record(path: &Path) -> UniversityRecord {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_full_run_with_dropdown() {
    let server = MockServer::start().await;
    mount_page(&server, "/en/universities", LISTING_PAGE).await;
    mount_page(&server, "/en/universities_turkey", TURKEY_PAGE).await;
    mount_page(&server, "/en/1/bilkent-university", BILKENT_PAGE).await;
    mount_page(&server, "/en/2/ankara-university", ANKARA_PAGE).await;

    let output = TempDir::new().unwrap();
    let config = test_config(&server, output.path(), None);

    let stats = controller(config, None)
        .run(&CountryFilter::parse("Turkey"))
        .await
        .unwrap();

    assert_eq!(stats.countries_processed, 1);
    assert_eq!(stats.universities_found, 2);
    assert_eq!(stats.records_written, 2);
    assert_eq!(stats.failures, 0);

    let bilkent = read_record(
        &output
            .path()
            .join("Turkey")
            .join("Ankara")
            .join("Bilkent_University.json"),
    );
    assert_eq!(bilkent.name, "Bilkent University");
    assert_eq!(bilkent.location.city, "Ankara");
    assert_eq!(bilkent.kind, "Private");
    assert_eq!(bilkent.website, "https://www.bilkent.edu.tr");
    assert_eq!(bilkent.study_programs.len(), 1);
    assert_eq!(bilkent.study_programs[0].level, "Bachelor");
    assert_eq!(bilkent.study_programs[0].faculty, "Faculty of Engineering");
    assert!(bilkent.source_url.ends_with("/en/1/bilkent-university"));

    assert!(output
        .path()
        .join("Turkey")
        .join("Ankara")
        .join("Ankara_University.json")
        .exists());

    let listing = read_json(&output.path().join("turkey_universities.json"));
    assert_eq!(listing["universities_count"], 2);
    assert_eq!(listing["universities"][0]["id"], "1");
    assert_eq!(listing["universities"][1]["name"], "Ankara University");

    let summary = read_json(&output.path().join("scraping_summary.json"));
    assert_eq!(summary["records_written"], 2);
    assert_eq!(summary["countries"][0]["country_code"], "turkey");
}

#[tokio::test]
async fn test_rerun_is_byte_identical() {
    let server = MockServer::start().await;
    mount_page(&server, "/en/universities", LISTING_PAGE).await;
    mount_page(&server, "/en/universities_turkey", TURKEY_PAGE).await;
    mount_page(&server, "/en/1/bilkent-university", BILKENT_PAGE).await;
    mount_page(&server, "/en/2/ankara-university", ANKARA_PAGE).await;

    let output = TempDir::new().unwrap();
    let record_path = output
        .path()
        .join("Turkey")
        .join("Ankara")
        .join("Bilkent_University.json");

    let filter = CountryFilter::parse("turkey");
    controller(test_config(&server, output.path(), None), None)
        .run(&filter)
        .await
        .unwrap();
    let first = std::fs::read(&record_path).unwrap();

    controller(test_config(&server, output.path(), None), None)
        .run(&filter)
        .await
        .unwrap();
    assert_eq!(first, std::fs::read(&record_path).unwrap());
}

#[tokio::test]
async fn test_sitemap_fallback_in_listings_only_mode() {
    let server = MockServer::start().await;
    mount_page(&server, "/en/universities", LISTING_PAGE).await;
    mount_page(
        &server,
        "/en/universities_germany",
        "<html><body><p>Nothing here yet</p></body></html>",
    )
    .await;

    let sitemap = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>{uri}/en/universities_germany</loc></url>
  <url><loc>{uri}/en/10/tu-munich</loc></url>
  <url><loc>{uri}/en/11/heidelberg-university</loc></url>
  <url><loc>{uri}/en/10/tu-munich</loc></url>
</urlset>"#,
        uri = server.uri()
    );
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sitemap))
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let config = test_config(&server, output.path(), None);

    let stats = controller(config, None)
        .listings_only(true)
        .run(&CountryFilter::parse("germany"))
        .await
        .unwrap();

    assert_eq!(stats.universities_found, 2);
    assert_eq!(stats.records_written, 0);

    let listing = read_json(&output.path().join("germany_universities.json"));
    assert_eq!(listing["universities"][0]["name"], "Tu Munich");
    assert_eq!(listing["universities"][1]["id"], "11");
    assert!(!output.path().join("Germany").exists());
}

#[tokio::test]
async fn test_empty_sitemap_yields_no_universities() {
    let server = MockServer::start().await;
    mount_page(&server, "/en/universities", LISTING_PAGE).await;
    mount_page(&server, "/en/universities_germany", "<p>Empty</p>").await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<urlset><url><loc>https://example.com/en/about</loc></url></urlset>",
        ))
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let stats = controller(test_config(&server, output.path(), None), None)
        .run(&CountryFilter::parse("germany"))
        .await
        .unwrap();

    assert_eq!(stats.countries_processed, 1);
    assert_eq!(stats.universities_found, 0);
    assert_eq!(stats.failures, 0);
}

#[tokio::test]
async fn test_fixed_countries_when_listing_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/en/universities"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_page(&server, "/en/universities_turkey", TURKEY_PAGE).await;

    let output = TempDir::new().unwrap();
    let mut config = test_config(&server, output.path(), None);
    config.countries = vec![unipage_scout::config::CountryEntry {
        name: "Turkey".to_string(),
        code: "turkey".to_string(),
    }];

    let stats = controller(config, None)
        .listings_only(true)
        .run(&CountryFilter::All)
        .await
        .unwrap();

    assert_eq!(stats.countries_processed, 1);
    assert_eq!(stats.universities_found, 2);
}

#[tokio::test]
async fn test_ai_fills_missing_fields_and_programs() {
    let server = MockServer::start().await;
    mount_page(&server, "/en/universities", LISTING_PAGE).await;
    mount_page(&server, "/en/universities_turkey", TURKEY_PAGE).await;
    mount_page(&server, "/en/1/bilkent-university", BILKENT_PAGE).await;
    mount_page(&server, "/en/2/ankara-university", ANKARA_PAGE).await;

    let llm_server = MockServer::start().await;
    let reply = serde_json::json!({
        "university": {
            "name": "Ankara Universitesi",
            "type": "Public",
            "location": {"country": "Turkey", "city": "Ankara"},
            "study_programs": [{
                "level": "Bachelor",
                "faculties": [{
                    "name": "Faculty of Law",
                    "programs": [
                        {"name": "Law", "duration_months": 48, "exams": ["YKS"]},
                        "International Relations"
                    ]
                }]
            }]
        }
    });
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": format!("```json\n{}\n```", reply)}}]
        })))
        .expect(1)
        .mount(&llm_server)
        .await;

    let output = TempDir::new().unwrap();
    let config = test_config(&server, output.path(), Some(&llm_server.uri()));
    let llm = OpenRouterClient::new(&config.ai, "test-key").unwrap();

    let stats = controller(config, Some(Box::new(llm)))
        .run(&CountryFilter::parse("turkey"))
        .await
        .unwrap();
    assert_eq!(stats.records_written, 2);

    let ankara = read_record(
        &output
            .path()
            .join("Turkey")
            .join("Ankara")
            .join("Ankara_University.json"),
    );
    // Heuristic name wins, AI fills the unknown type
    assert_eq!(ankara.name, "Ankara University");
    assert_eq!(ankara.kind, "Public");
    assert_eq!(ankara.study_programs.len(), 2);
    assert_eq!(ankara.study_programs[0].program_name, "Law");
    assert_eq!(ankara.study_programs[0].duration_months, Some(48));
    assert_eq!(ankara.study_programs[0].exam_requirements, vec!["YKS"]);

    // Bilkent already had programs, so no LLM call was made for it
    let bilkent = read_record(
        &output
            .path()
            .join("Turkey")
            .join("Ankara")
            .join("Bilkent_University.json"),
    );
    assert_eq!(bilkent.study_programs.len(), 1);
}

#[tokio::test]
async fn test_malformed_ai_reply_keeps_heuristic_record() {
    let server = MockServer::start().await;
    mount_page(&server, "/en/universities", LISTING_PAGE).await;
    mount_page(&server, "/en/universities_turkey", TURKEY_PAGE).await;
    mount_page(&server, "/en/1/bilkent-university", BILKENT_PAGE).await;
    mount_page(&server, "/en/2/ankara-university", ANKARA_PAGE).await;

    let llm_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "I could not find {any data"}}]
        })))
        .expect(1)
        .mount(&llm_server)
        .await;

    let output = TempDir::new().unwrap();
    let config = test_config(&server, output.path(), Some(&llm_server.uri()));
    let expected = FieldExtractor::new(&config).extract(
        ANKARA_PAGE,
        &format!("{}/en/2/ankara-university", server.uri()),
    );
    let llm = OpenRouterClient::new(&config.ai, "test-key").unwrap();

    let stats = controller(config, Some(Box::new(llm)))
        .run(&CountryFilter::parse("turkey"))
        .await
        .unwrap();
    assert_eq!(stats.records_written, 2);
    assert_eq!(stats.failures, 0);

    let ankara = read_record(
        &output
            .path()
            .join("Turkey")
            .join("Ankara")
            .join("Ankara_University.json"),
    );
    assert_eq!(ankara, expected);
}

#[tokio::test]
async fn test_missing_university_page_counts_failure() {
    let server = MockServer::start().await;
    mount_page(&server, "/en/universities", LISTING_PAGE).await;
    mount_page(&server, "/en/universities_turkey", TURKEY_PAGE).await;
    mount_page(&server, "/en/1/bilkent-university", BILKENT_PAGE).await;
    Mock::given(method("GET"))
        .and(path("/en/2/ankara-university"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let stats = controller(test_config(&server, output.path(), None), None)
        .run(&CountryFilter::parse("turkey"))
        .await
        .unwrap();

    assert_eq!(stats.records_written, 1);
    assert_eq!(stats.failures, 1);

    let summary = read_json(&output.path().join("scraping_summary.json"));
    assert_eq!(summary["failures"], 1);
    assert_eq!(summary["countries"][0]["records_written"], 1);
}

#[tokio::test]
async fn test_program_pages_are_concatenated() {
    let server = MockServer::start().await;
    mount_page(&server, "/en/universities", LISTING_PAGE).await;
    mount_page(&server, "/en/universities_turkey", PAGED_COUNTRY_PAGE).await;
    mount_page(&server, "/en/1/bilkent-university", PAGED_BILKENT_PAGE).await;
    mount_program_page(
        &server,
        r#"<html><body>
          <div class="faculty-block" data-level="bachelor">
            <h3>Faculty of Science</h3>
            <a href="/en/programs/12-mathematics">Mathematics</a>
          </div>
          <p>Items 3-3 of 3</p>
        </body></html>"#,
    )
    .await;

    let output = TempDir::new().unwrap();
    let stats = controller(test_config(&server, output.path(), None), None)
        .run(&CountryFilter::parse("turkey"))
        .await
        .unwrap();
    assert_eq!(stats.records_written, 1);

    let bilkent = read_record(
        &output
            .path()
            .join("Turkey")
            .join("Ankara")
            .join("Bilkent_University.json"),
    );
    let names: Vec<&str> = bilkent
        .study_programs
        .iter()
        .map(|program| program.program_name.as_str())
        .collect();
    assert_eq!(names.len(), 3);
    for expected in ["Physics", "Chemistry", "Mathematics"] {
        assert!(names.contains(&expected), "missing {}", expected);
    }
    assert!(bilkent
        .study_programs
        .iter()
        .all(|program| program.faculty == "Faculty of Science"));
}

#[tokio::test]
async fn test_ai_reads_text_of_every_program_page() {
    let server = MockServer::start().await;
    mount_page(&server, "/en/universities", LISTING_PAGE).await;
    mount_page(&server, "/en/universities_turkey", PAGED_COUNTRY_PAGE).await;
    mount_page(&server, "/en/1/bilkent-university", PAGED_BILKENT_PAGE).await;
    mount_program_page(
        &server,
        "<html><body><ul><li>Marine Biology</li></ul><p>Items 3-3 of 3</p></body></html>",
    )
    .await;

    let llm_server = MockServer::start().await;
    let reply = serde_json::json!({
        "university": {
            "study_programs": [{
                "level": "Bachelor",
                "faculties": [{"name": "Faculty of Science", "programs": ["Marine Biology"]}]
            }]
        }
    });
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("Marine Biology"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": reply.to_string()}}]
        })))
        .expect(1)
        .mount(&llm_server)
        .await;

    let output = TempDir::new().unwrap();
    let config = test_config(&server, output.path(), Some(&llm_server.uri()));
    let llm = OpenRouterClient::new(&config.ai, "test-key").unwrap();

    let stats = controller(config, Some(Box::new(llm)))
        .run(&CountryFilter::parse("turkey"))
        .await
        .unwrap();
    assert_eq!(stats.records_written, 1);

    let bilkent = read_record(
        &output
            .path()
            .join("Turkey")
            .join("Ankara")
            .join("Bilkent_University.json"),
    );
    assert_eq!(bilkent.study_programs.len(), 3);
    assert!(bilkent
        .study_programs
        .iter()
        .any(|program| program.program_name == "Marine Biology"));
}

#[tokio::test]
async fn test_ai_country_discovery_without_dropdown() {
    let server = MockServer::start().await;
    mount_page(&server, "/en/universities", LINK_LISTING_PAGE).await;
    mount_page(&server, "/en/universities_turkey", TURKEY_PAGE).await;

    let llm_server = MockServer::start().await;
    let candidates = serde_json::json!([
        {"selector": "a.tr", "text": "Turkey"},
        {"selector": "a.home", "text": "Universities"},
        {"selector": "a.missing", "text": "Atlantis"},
        {"selector": "a.tr", "text": "Turkey"}
    ]);
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("Listing page URL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": candidates.to_string()}}]
        })))
        .expect(1)
        .mount(&llm_server)
        .await;

    let output = TempDir::new().unwrap();
    let config = test_config(&server, output.path(), Some(&llm_server.uri()));
    let llm = OpenRouterClient::new(&config.ai, "test-key").unwrap();

    let stats = controller(config, Some(Box::new(llm)))
        .listings_only(true)
        .run(&CountryFilter::All)
        .await
        .unwrap();

    assert_eq!(stats.countries_processed, 1);
    assert_eq!(stats.universities_found, 2);

    let listing = read_json(&output.path().join("turkey_universities.json"));
    assert_eq!(listing["country"], "Turkey");
    assert_eq!(listing["universities_count"], 2);
}
