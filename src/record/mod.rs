//! Data model for discovered countries, university links and extracted records
//!
//! - `CountryRef` and `UniversityRef` are produced by discovery
//! - `UniversityRecord` is the JSON document written per university
//! - `ProgramCatalog` is the nested level/faculty/program form used while
//!   merging AI replies, flattened into `UniversityRecord::study_programs`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A country whose university listing can be visited
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryRef {
    /// Display name (e.g., "Turkey")
    pub name: String,

    /// Code used in the country URL (e.g., "turkey")
    pub code: String,

    /// Absolute URL of the country's university listing
    pub source_url: String,
}

/// A university link found on a country listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniversityRef {
    /// Numeric id taken from the URL
    pub id: String,

    pub name: String,

    /// Absolute URL of the university page
    pub url: String,

    pub country_code: String,
}

/// Country and city of a university
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub country: String,
    pub city: String,
}

/// A monetary amount with its currency and billing period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fee {
    #[serde(alias = "cost")]
    pub amount: f64,
    pub currency: String,
    #[serde(default = "default_period")]
    pub period: String,
}

fn default_period() -> String {
    "year".to_string()
}

/// A single study program in flattened form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyProgram {
    pub level: String,
    pub faculty: String,
    pub program_name: String,
    pub duration_months: Option<u32>,
    pub exam_requirements: Vec<String>,
    pub price: Option<Fee>,
}

/// The structured record written for one university
///
/// Field order is the serialization order and maps are `BTreeMap`, so the
/// same input always serializes to the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversityRecord {
    pub name: String,
    pub location: Location,
    #[serde(rename = "type")]
    pub kind: String,
    pub website: String,
    pub description: String,
    /// Ranking source → rank
    pub rankings: BTreeMap<String, u32>,
    /// Study level (or `general`) → fee
    pub tuition_fees: BTreeMap<String, Fee>,
    pub study_programs: Vec<StudyProgram>,
    pub source_url: String,
}

impl UniversityRecord {
    /// Number of study programs in the record
    pub fn program_count(&self) -> usize {
        self.study_programs.len()
    }
}

/// A program inside the nested catalog
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogProgram {
    pub name: String,
    pub duration_months: Option<u32>,
    pub exams: Vec<String>,
    pub price: Option<Fee>,
}

impl CatalogProgram {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            duration_months: None,
            exams: Vec::new(),
            price: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Faculty {
    name: String,
    programs: Vec<CatalogProgram>,
}

#[derive(Debug, Clone, PartialEq)]
struct Level {
    name: String,
    faculties: Vec<Faculty>,
}

/// Nested `level → faculty → programs` catalog
///
/// Levels and faculties keep insertion order. Names are compared
/// case-insensitively after trimming, so a program is stored at most once
/// per level/faculty pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramCatalog {
    levels: Vec<Level>,
}

impl ProgramCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from flattened programs, dropping duplicates
    pub fn from_programs(programs: &[StudyProgram]) -> Self {
        let mut catalog = Self::new();
        for program in programs {
            catalog.insert(
                &program.level,
                &program.faculty,
                CatalogProgram {
                    name: program.program_name.clone(),
                    duration_months: program.duration_months,
                    exams: program.exam_requirements.clone(),
                    price: program.price.clone(),
                },
            );
        }
        catalog
    }

    /// Inserts a program, creating the level and faculty as needed
    ///
    /// # Returns
    ///
    /// `true` if the program was added, `false` if its name was empty or
    /// already present under the same level and faculty
    pub fn insert(&mut self, level: &str, faculty: &str, program: CatalogProgram) -> bool {
        let program_name = program.name.trim();
        if program_name.is_empty() {
            return false;
        }

        let level = non_empty_or(level, "Unknown");
        let faculty = non_empty_or(faculty, "General");

        let level_idx = match self.levels.iter().position(|l| same_name(&l.name, level)) {
            Some(idx) => idx,
            None => {
                self.levels.push(Level {
                    name: level.to_string(),
                    faculties: Vec::new(),
                });
                self.levels.len() - 1
            }
        };
        let faculties = &mut self.levels[level_idx].faculties;

        let faculty_idx = match faculties.iter().position(|f| same_name(&f.name, faculty)) {
            Some(idx) => idx,
            None => {
                faculties.push(Faculty {
                    name: faculty.to_string(),
                    programs: Vec::new(),
                });
                faculties.len() - 1
            }
        };
        let programs = &mut faculties[faculty_idx].programs;

        if programs.iter().any(|p| same_name(&p.name, program_name)) {
            return false;
        }

        programs.push(CatalogProgram {
            name: program_name.to_string(),
            ..program
        });
        true
    }

    /// Merges another catalog into this one, returning how many programs were added
    pub fn merge(&mut self, other: ProgramCatalog) -> usize {
        let mut added = 0;
        for level in other.levels {
            for faculty in level.faculties {
                for program in faculty.programs {
                    if self.insert(&level.name, &faculty.name, program) {
                        added += 1;
                    }
                }
            }
        }
        added
    }

    /// Total number of programs across all levels
    pub fn len(&self) -> usize {
        self.levels
            .iter()
            .flat_map(|l| l.faculties.iter())
            .map(|f| f.programs.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lines of the form `Level / Faculty / Program`, in catalog order
    pub fn program_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for level in &self.levels {
            for faculty in &level.faculties {
                for program in &faculty.programs {
                    lines.push(format!("{} / {} / {}", level.name, faculty.name, program.name));
                }
            }
        }
        lines
    }

    /// Flattens the catalog into record programs
    pub fn to_programs(&self) -> Vec<StudyProgram> {
        let mut programs = Vec::with_capacity(self.len());
        for level in &self.levels {
            for faculty in &level.faculties {
                for program in &faculty.programs {
                    programs.push(StudyProgram {
                        level: level.name.clone(),
                        faculty: faculty.name.clone(),
                        program_name: program.name.clone(),
                        duration_months: program.duration_months,
                        exam_requirements: program.exams.clone(),
                        price: program.price.clone(),
                    });
                }
            }
        }
        programs
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback
    } else {
        trimmed
    }
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
