//! Cleanup and validation of individual fields returned by the model.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

static TRUNCATED_WEBMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)@(gmail|yahoo|hotmail|outlook|icloud)\.c(?:om)?\b").expect("valid regex")
});
static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid regex")
});
static PLUS_YEARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*\+").expect("valid regex"));
static YEARS_AND_MONTHS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*years?\s*(\d+)\s*months?").expect("valid regex")
});
static MONTHS_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*months?").expect("valid regex"));
static YEARS_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*years?").expect("valid regex"));
static BARE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)?)$").expect("valid regex"));

/// Repairs the OCR and copy-paste mistakes that show up most often in contact details.
pub fn fix_ocr_artifacts(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = TRUNCATED_WEBMAIL.replace_all(text, |caps: &Captures| {
        format!("@{}.com", caps[1].to_lowercase())
    });
    let text = text.replace('|', "I");
    let text = replace_between_letters(&text, '0', 'O');
    replace_between_letters(&text, '1', 'l')
}

/// Replaces `from` with `to` wherever it sits between two ASCII letters of the input.
fn replace_between_letters(text: &str, from: char, to: char) -> String {
    let chars: Vec<char> = text.chars().collect();
    chars
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let between_letters = i > 0
                && chars[i - 1].is_ascii_alphabetic()
                && chars.get(i + 1).is_some_and(|n| n.is_ascii_alphabetic());
            if c == from && between_letters {
                to
            } else {
                c
            }
        })
        .collect()
}

/// Returns the lower-cased address if it is well formed after OCR repair.
pub fn validate_email(email: Option<&str>) -> Option<String> {
    let email = email?.trim();
    if email.is_empty() {
        return None;
    }
    let email = fix_ocr_artifacts(email);
    EMAIL.is_match(&email).then(|| email.to_lowercase())
}

/// Keeps the phone number as written when it has 10 to 15 digits.
pub fn validate_phone(phone: Option<&str>) -> Option<String> {
    let phone = phone?;
    if phone.is_empty() {
        return None;
    }
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    (10..=15).contains(&digits).then(|| phone.to_string())
}

/// Normalises total experience into `"N+"`, a float string (`"4.5"`, `"5.0"`)
/// or, for bare numbers, the integer form when whole (`"6"`).
pub fn normalize_experience(value: &Value) -> Option<String> {
    let raw = match value {
        Value::Null | Value::Bool(false) => return None,
        Value::String(s) if s.is_empty() => return None,
        Value::Number(n) if n.as_f64() == Some(0.0) => return None,
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    };

    let exp = raw.trim().to_lowercase();
    if exp.is_empty() || exp == "null" || exp == "none" {
        return None;
    }

    if exp.contains('+') {
        return PLUS_YEARS.captures(&exp).map(|c| format!("{}+", &c[1]));
    }

    if let Some(c) = YEARS_AND_MONTHS.captures(&exp) {
        let years: f64 = c[1].parse().ok()?;
        let months: f64 = c[2].parse().ok()?;
        return Some(format_float(years + round1(months / 12.0)));
    }

    if let Some(c) = MONTHS_ONLY.captures(&exp) {
        let months: f64 = c[1].parse().ok()?;
        return Some(format_float(round1(months / 12.0)));
    }

    if let Some(c) = YEARS_ONLY.captures(&exp) {
        let years: f64 = c[1].parse().ok()?;
        return Some(format_float(years));
    }

    if let Some(c) = BARE_NUMBER.captures(&exp) {
        let value: f64 = c[1].parse().ok()?;
        return Some(if value.fract() == 0.0 {
            format!("{}", value as i64)
        } else {
            format_float(value)
        });
    }

    None
}

/// True for diploma-level education, which is not reported as UG or PG.
pub fn is_diploma_entry(degree: Option<&str>, college: Option<&str>) -> bool {
    let degree = degree.unwrap_or("").to_lowercase();
    let college = college.unwrap_or("").to_lowercase();
    degree.contains("diploma") || college.contains("diploma") || college.contains("polytechnic")
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Float rendering that always shows a fractional part (`4.0`, `4.5`).
fn format_float(x: f64) -> String {
    if x.fract() == 0.0 {
        format!("{x:.1}")
    } else {
        format!("{x}")
    }
}
