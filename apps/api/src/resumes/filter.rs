//! Mandatory / optional skill filtering.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::resume::ResumeRow;

const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Default, Deserialize)]
pub struct SkillFilter {
    #[serde(default)]
    pub mandatory_skills: Vec<String>,
    #[serde(default)]
    pub optional_skills: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FilteredResume {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub skills: Vec<String>,
    pub total_experience_years: String,
    pub uploaded_by_email: String,
}

/// Canonical form for skill comparison: "Node.js " and "nodejs" match, as do "Machine Learning" and "machinelearning".
pub fn normalize_skill(skill: &str) -> String {
    skill
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| *c != ' ' && *c != '.')
        .collect()
}

impl SkillFilter {
    /// Mandatory skills must all be present. Optional skills only narrow the
    /// result when no mandatory skill is given, and then one match suffices.
    pub fn matches(&self, resume_skills: &[String]) -> bool {
        let have: Vec<String> = resume_skills.iter().map(|s| normalize_skill(s)).collect();
        let has = |skill: &String| have.contains(&normalize_skill(skill));

        if !self.mandatory_skills.is_empty() {
            return self.mandatory_skills.iter().all(has);
        }
        if !self.optional_skills.is_empty() {
            return self.optional_skills.iter().any(has);
        }
        true
    }

    /// Applies the filter to rows already ordered newest first.
    pub fn apply(&self, rows: Vec<ResumeRow>) -> Vec<FilteredResume> {
        rows.into_iter()
            .filter(|row| self.matches(&row.skills))
            .map(|row| FilteredResume {
                id: row.id,
                name: row.name,
                email: row.email,
                phone: row.phone,
                skills: row.skills,
                total_experience_years: row
                    .total_experience_years
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                uploaded_by_email: row
                    .uploaded_by_email
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::types::Json;

    fn row(name: &str, skills: &[&str]) -> ResumeRow {
        ResumeRow {
            id: Uuid::new_v4(),
            filename: format!("{name}.pdf"),
            name: Some(name.to_string()),
            email: None,
            phone: None,
            linkedin: None,
            github: None,
            skills: skills.iter().map(|s| s.to_string()).collect(),
            ug_degree: None,
            ug_college: None,
            ug_year: None,
            pg_degree: None,
            pg_college: None,
            pg_year: None,
            total_experience_years: None,
            work_experience: Json(vec![]),
            s3_key: String::new(),
            mime_type: "application/pdf".to_string(),
            size_bytes: 0,
            uploaded_by: None,
            uploaded_by_email: None,
            content_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    fn filter(mandatory: &[&str], optional: &[&str]) -> SkillFilter {
        SkillFilter {
            mandatory_skills: mandatory.iter().map(|s| s.to_string()).collect(),
            optional_skills: optional.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn skills(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_skill() {
        assert_eq!(normalize_skill("  Node.js "), "nodejs");
        assert_eq!(normalize_skill("Machine Learning"), "machinelearning");
        assert_eq!(normalize_skill("C++"), "c++");
    }

    #[test]
    fn test_mandatory_requires_all() {
        let f = filter(&["python", "Node JS"], &[]);
        assert!(f.matches(&skills(&["Python", "NodeJS", "SQL"])));
        assert!(!f.matches(&skills(&["Python", "SQL"])));
    }

    #[test]
    fn test_optional_ignored_when_mandatory_present() {
        let f = filter(&["Python"], &["Rust"]);
        assert!(f.matches(&skills(&["Python"])));
    }

    #[test]
    fn test_optional_requires_any() {
        let f = filter(&[], &["Rust", "Go"]);
        assert!(f.matches(&skills(&["go"])));
        assert!(!f.matches(&skills(&["Java"])));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(SkillFilter::default().matches(&[]));
    }

    #[test]
    fn test_apply_fills_missing_fields() {
        let mut with_exp = row("Kavya", &["Rust"]);
        with_exp.total_experience_years = Some("4.5".to_string());
        with_exp.uploaded_by_email = Some("hr@example.com".to_string());
        let rows = vec![with_exp, row("Rahul", &["Java"]), row("Sana", &["rust"])];

        let out = filter(&["rust"], &[]).apply(rows);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].name.as_deref(), Some("Kavya"));
        assert_eq!(out[0].total_experience_years, "4.5");
        assert_eq!(out[0].uploaded_by_email, "hr@example.com");
        assert_eq!(out[1].total_experience_years, "N/A");
        assert_eq!(out[1].uploaded_by_email, "N/A");
    }
}
