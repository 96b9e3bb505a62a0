//! Structured resume data from raw model output.

pub mod normalize;
pub mod parser;
pub mod prompts;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use normalize::{is_diploma_entry, normalize_experience, validate_email, validate_phone};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Education {
    pub degree: Option<String>,
    pub college: Option<String>,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkExperience {
    pub title: Option<String>,
    pub company: Option<String>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
}

/// A candidate profile after validation and normalisation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedResume {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub skills: Vec<String>,
    pub ug: Option<Education>,
    pub pg: Option<Education>,
    pub total_experience_years: Option<String>,
    pub work_experience: Vec<WorkExperience>,
}

/// Builds a [`ParsedResume`] from the model's JSON, tolerating loose typing.
pub fn build_parsed_resume(parsed: &Value) -> ParsedResume {
    ParsedResume {
        name: str_field(parsed, "name"),
        email: validate_email(parsed.get("email").and_then(Value::as_str)),
        phone: validate_phone(parsed.get("phone").and_then(Value::as_str)),
        linkedin: str_field(parsed, "linkedin"),
        github: str_field(parsed, "github"),
        skills: extract_skills(parsed),
        ug: extract_education(parsed, "ug_education"),
        pg: extract_education(parsed, "pg_education"),
        total_experience_years: parsed
            .get("total_experience_years")
            .and_then(normalize_experience),
        work_experience: extract_work_experience(parsed),
    }
}

/// Non-blank trimmed string field.
fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Years may come back as numbers or numeric strings.
fn year_field(value: &Value, key: &str) -> Option<i32> {
    let year = match value.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    year.and_then(|y| i32::try_from(y).ok())
}

fn extract_skills(parsed: &Value) -> Vec<String> {
    let mut skills: Vec<String> = parsed
        .get("skills")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    let mut seen = std::collections::HashSet::new();
    skills.retain(|s| seen.insert(s.to_lowercase()));
    skills
}

fn extract_education(parsed: &Value, key: &str) -> Option<Education> {
    let edu = parsed.get(key).filter(|v| v.is_object())?;
    let education = Education {
        degree: str_field(edu, "degree"),
        college: str_field(edu, "college"),
        year: year_field(edu, "year"),
    };

    if is_diploma_entry(education.degree.as_deref(), education.college.as_deref()) {
        info!(
            "Filtering out diploma from {key}: {:?} at {:?}",
            education.degree, education.college
        );
        return None;
    }
    if education == Education::default() {
        return None;
    }
    Some(education)
}

fn extract_work_experience(parsed: &Value) -> Vec<WorkExperience> {
    parsed
        .get("work_experience")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter(|v| v.is_object())
                .map(|job| WorkExperience {
                    title: str_field(job, "title"),
                    company: str_field(job, "company"),
                    start_year: year_field(job, "start_year"),
                    end_year: year_field(job, "end_year"),
                })
                .filter(|job| job.title.is_some() || job.company.is_some())
                .collect()
        })
        .unwrap_or_default()
}
