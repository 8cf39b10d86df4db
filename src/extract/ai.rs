//! LLM-assisted extraction: prompt building and reply parsing
//!
//! Replies are parsed leniently. A level, faculty or program that does not
//! fit the expected shape is skipped, but a reply without the expected
//! top-level object is treated as malformed.

use crate::llm::{extract_json_object, truncate_to_char_boundary};
use crate::page::visible_text;
use crate::record::{CatalogProgram, Fee, ProgramCatalog, UniversityRecord};
use serde_json::Value;

/// Words that mark page text worth keeping when it has to be shortened
const PROGRAM_KEYWORDS: &[&str] = &[
    "bachelor", "master", "phd", "doctorate", "program", "degree", "faculty", "department",
    "school", "tuition",
];

/// Words per chunk when prioritizing program content
const CHUNK_WORDS: usize = 100;

/// Page text budget for follow-up prompts
const FOLLOWUP_TEXT_LIMIT: usize = 15_000;

pub const EXTRACTION_PROMPT: &str = r#"You extract structured data about a university from the text of its profile page.

Return ONLY valid JSON in exactly this structure:
{
  "university": {
    "name": "University name",
    "type": "public | private | private non-profit",
    "location": {"country": "Country", "city": "City"},
    "website": "http://...",
    "description": "Short description",
    "study_programs": [
      {
        "level": "Bachelor | Master | Doctorate",
        "faculties": [
          {
            "name": "Faculty name",
            "programs": [
              {
                "name": "Program name",
                "duration_months": 48,
                "exams": ["IELTS", "TOEFL"],
                "price": {"amount": 14468, "currency": "USD", "period": "year"}
              }
            ]
          }
        ]
      }
    ]
  }
}

Rules:
- Extract EVERY program mentioned, at every level and in every faculty
- Use null for values that are not in the text; never invent data
- Return ONLY the JSON object"#;

pub const FOLLOWUP_PROMPT: &str = r#"You find study programs that a previous extraction missed.
You receive the programs already extracted and the page text.

Return ONLY valid JSON in this structure, listing only programs that are NOT already extracted:
{
  "missing_programs": [
    {
      "level": "Bachelor | Master | Doctorate",
      "faculty": "Faculty name",
      "program": {"name": "Program name", "duration_months": 48, "exams": [], "price": null}
    }
  ]
}

Return {"missing_programs": []} if nothing is missing."#;

/// Fields of the university object in an extraction reply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AiFields {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
}

/// A parsed extraction reply
#[derive(Debug, Clone, Default)]
pub struct AiExtraction {
    pub fields: AiFields,
    pub catalog: ProgramCatalog,
}

/// Page text for extraction prompts, at most `limit` bytes
///
/// Navigation, header, footer and script content is dropped. When the text
/// is too long, chunks mentioning program keywords are kept first (plus the
/// opening chunk), then the result is hard-truncated.
pub fn prompt_text(html: &str, limit: usize) -> String {
    let text = visible_text(html, &["head", "nav", "footer", "header"]);
    if text.len() <= limit {
        return text;
    }

    let words: Vec<&str> = text.split(' ').collect();
    let mut kept = Vec::new();
    for (index, chunk) in words.chunks(CHUNK_WORDS).enumerate() {
        let has_keyword = chunk.iter().any(|word| {
            let lower = word.to_lowercase();
            PROGRAM_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
        });
        if index == 0 || has_keyword {
            kept.push(chunk.join(" "));
        }
    }

    let prioritized = kept.join(" ");
    truncate_to_char_boundary(&prioritized, limit).to_string()
}

/// User message for the first extraction prompt
pub fn extraction_message(url: &str, text: &str, expected: Option<usize>) -> String {
    let target = match expected {
        Some(count) => format!("The page lists {} programs in total; extract all of them.\n", count),
        None => String::new(),
    };
    format!("Source URL: {}\n{}\nPage text:\n{}", url, target, text)
}

/// User message for a follow-up prompt
pub fn followup_message(catalog: &ProgramCatalog, target: usize, text: &str) -> String {
    let current = catalog.program_lines();
    let listed = if current.is_empty() {
        "(none)".to_string()
    } else {
        current.join("\n")
    };

    format!(
        "Programs already extracted ({}):\n{}\n\nAbout {} programs are still missing.\n\nPage text:\n{}",
        current.len(),
        listed,
        target.saturating_sub(current.len()),
        truncate_to_char_boundary(text, FOLLOWUP_TEXT_LIMIT)
    )
}

/// Parses an extraction reply; `None` when it has no university object
pub fn parse_extraction(reply: &str) -> Option<AiExtraction> {
    let root = extract_json_object(reply)?;
    let university = root.get("university").filter(|u| u.is_object())?;

    let location = university.get("location");
    let fields = AiFields {
        name: text_field(university.get("name")),
        kind: text_field(university.get("type")),
        country: location.and_then(|l| text_field(l.get("country"))),
        city: location.and_then(|l| text_field(l.get("city"))),
        website: text_field(university.get("website")),
        description: text_field(university.get("description")).or_else(|| {
            university
                .get("about")
                .and_then(|about| text_field(about.get("description")))
        }),
    };

    let mut catalog = ProgramCatalog::new();
    for level in array(university.get("study_programs")) {
        let level_name = text_field(level.get("level")).unwrap_or_default();
        for faculty in array(level.get("faculties")) {
            let faculty_name = text_field(faculty.get("name")).unwrap_or_default();
            for program in array(faculty.get("programs")) {
                if let Some(program) = parse_program(program) {
                    catalog.insert(&level_name, &faculty_name, program);
                }
            }
        }
    }

    Some(AiExtraction { fields, catalog })
}

/// Parses a follow-up reply; `None` when `missing_programs` is absent
pub fn parse_missing_programs(reply: &str) -> Option<ProgramCatalog> {
    let root = extract_json_object(reply)?;
    let missing = root.get("missing_programs")?.as_array()?;

    let mut catalog = ProgramCatalog::new();
    for item in missing {
        let level = text_field(item.get("level")).unwrap_or_default();
        let faculty = text_field(item.get("faculty")).unwrap_or_default();
        if let Some(program) = item.get("program").and_then(parse_program) {
            catalog.insert(&level, &faculty, program);
        }
    }
    Some(catalog)
}

/// Fills record fields the heuristics left empty or `Unknown`
pub fn fill_missing_fields(record: &mut UniversityRecord, fields: &AiFields) {
    fill(&mut record.name, &fields.name);
    fill(&mut record.kind, &fields.kind);
    fill(&mut record.location.country, &fields.country);
    fill(&mut record.location.city, &fields.city);
    fill(&mut record.website, &fields.website);
    fill(&mut record.description, &fields.description);
}

fn fill(target: &mut String, value: &Option<String>) {
    if target.is_empty() || target == "Unknown" {
        if let Some(value) = value {
            *target = value.clone();
        }
    }
}

/// A program given either as a bare name or as an object
fn parse_program(value: &Value) -> Option<CatalogProgram> {
    if let Some(name) = value.as_str() {
        return Some(CatalogProgram::named(name.trim())).filter(|p| !p.name.is_empty());
    }

    let name = text_field(value.get("name"))?;
    Some(CatalogProgram {
        name,
        duration_months: value.get("duration_months").and_then(months),
        exams: array(value.get("exams"))
            .filter_map(|exam| text_field(Some(exam)))
            .collect(),
        price: value
            .get("price")
            .and_then(|price| serde_json::from_value::<Fee>(price.clone()).ok()),
    })
}

fn months(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .and_then(|m| u32::try_from(m).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text_field(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
        .map(str::to_string)
}

fn array(value: Option<&Value>) -> impl Iterator<Item = &Value> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter())
        .into_iter()
        .flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY: &str = r#"```json
{
  "university": {
    "name": "Bilkent University",
    "type": "private non-profit",
    "location": {"country": "Turkey", "city": "Ankara"},
    "website": "http://www.bilkent.edu.tr",
    "description": null,
    "study_programs": [
      {"level": "Bachelor", "faculties": [
        {"name": "Faculty of Law", "programs": [
          {"name": "Law", "duration_months": 48.0, "exams": ["IELTS", null], "price": {"cost": 16945, "currency": "USD", "period": "year"}},
          {"name": "Law"},
          {"duration_months": 12},
          "Political Science"
        ]}
      ]},
      {"level": "Master", "faculties": "not a list"}
    ]
  }
}
```"#;

    #[test]
    fn test_parse_extraction() {
        let extraction = parse_extraction(REPLY).unwrap();

        assert_eq!(extraction.fields.name.as_deref(), Some("Bilkent University"));
        assert_eq!(extraction.fields.city.as_deref(), Some("Ankara"));
        assert_eq!(extraction.fields.description, None);

        let programs = extraction.catalog.to_programs();
        assert_eq!(programs.len(), 2);
        assert_eq!(programs[0].program_name, "Law");
        assert_eq!(programs[0].duration_months, Some(48));
        assert_eq!(programs[0].exam_requirements, vec!["IELTS"]);
        assert_eq!(programs[0].price.as_ref().unwrap().amount, 16945.0);
        assert_eq!(programs[1].program_name, "Political Science");
    }

    #[test]
    fn test_parse_extraction_malformed() {
        assert!(parse_extraction("The page is about a university.").is_none());
        assert!(parse_extraction(r#"{"programs": []}"#).is_none());
    }

    #[test]
    fn test_parse_missing_programs() {
        let reply = r#"{"missing_programs": [
            {"level": "Master", "faculty": "Engineering", "program": {"name": "MSc Robotics"}},
            {"level": "Master", "faculty": "Engineering", "program": "MSc Robotics"},
            {"level": "Doctorate", "faculty": "Science", "program": "Physics"},
            {"level": "Doctorate", "faculty": "Science"}
        ]}"#;

        let catalog = parse_missing_programs(reply).unwrap();
        assert_eq!(
            catalog.program_lines(),
            vec!["Master / Engineering / MSc Robotics", "Doctorate / Science / Physics"]
        );
        assert!(parse_missing_programs(r#"{"programs": []}"#).is_none());
    }

    #[test]
    fn test_fill_missing_fields_only_fills_gaps() {
        let mut record = UniversityRecord {
            name: "Bilkent University".to_string(),
            kind: "Unknown".to_string(),
            ..Default::default()
        };
        let fields = AiFields {
            name: Some("Other Name".to_string()),
            kind: Some("Private".to_string()),
            city: Some("Ankara".to_string()),
            ..Default::default()
        };

        fill_missing_fields(&mut record, &fields);
        assert_eq!(record.name, "Bilkent University");
        assert_eq!(record.kind, "Private");
        assert_eq!(record.location.city, "Ankara");
        assert_eq!(record.website, "");
    }

    #[test]
    fn test_prompt_text_prioritizes_program_chunks() {
        let filler = "lorem ".repeat(300);
        let html = format!(
            "<html><body><nav>Menu</nav><p>Intro</p><p>{filler}</p><p>Bachelor programs: Law</p><p>{filler}</p></body></html>"
        );

        let text = prompt_text(&html, 1000);
        assert!(text.len() <= 1000);
        assert!(text.starts_with("Intro"));
        assert!(text.contains("Bachelor programs: Law"));
        assert!(!text.contains("Menu"));
    }

    #[test]
    fn test_prompt_text_short_page_unchanged() {
        let text = prompt_text("<p>Bilkent <b>University</b></p>", 1000);
        assert_eq!(text, "Bilkent University");
    }

    #[test]
    fn test_followup_message_lists_programs() {
        let mut catalog = ProgramCatalog::new();
        catalog.insert("Bachelor", "Law", CatalogProgram::named("Law"));
        let message = followup_message(&catalog, 5, "text");
        assert!(message.contains("Programs already extracted (1)"));
        assert!(message.contains("Bachelor / Law / Law"));
        assert!(message.contains("About 4 programs are still missing"));
    }
}
