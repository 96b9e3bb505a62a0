//! The resume pipeline: extract text, ask the model, validate the answer.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{Datelike, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use crate::extraction::extract_text_blocking;
use crate::llm_client::{extract_json_block, CompletionBackend};
use crate::parsing::prompts::build_parse_prompt;
use crate::parsing::{build_parsed_resume, ParsedResume};

/// Minimum trimmed text length worth sending to the model.
const MIN_TEXT_CHARS: usize = 10;

pub const NO_BACKEND_NOTE: &str = "No API key - text extracted but not parsed";

/// Result of running one file through the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct ParseOutcome {
    pub filename: String,
    pub success: bool,
    pub data: Option<ParsedResume>,
    /// Failure reason, or an advisory note on success.
    pub error: Option<String>,
}

impl ParseOutcome {
    fn failed(filename: &str, reason: impl Into<String>) -> Self {
        Self {
            filename: filename.to_string(),
            success: false,
            data: None,
            error: Some(reason.into()),
        }
    }
}

pub struct ResumeParser {
    backend: Option<Arc<dyn CompletionBackend>>,
}

impl ResumeParser {
    /// `None` runs in extract-only mode: text is validated but no fields are parsed.
    pub fn new(backend: Option<Arc<dyn CompletionBackend>>) -> Self {
        if backend.is_none() {
            warn!("No LLM backend configured. Parser will extract text only.");
        }
        Self { backend }
    }

    pub fn backend_name(&self) -> Option<&str> {
        self.backend.as_deref().map(|b| b.name())
    }

    pub async fn process(&self, bytes: Bytes, filename: &str) -> ParseOutcome {
        let text = match extract_text_blocking(bytes, filename.to_string()).await {
            Ok(text) => text,
            Err(e) => {
                error!("Error processing {filename}: {e}");
                return ParseOutcome::failed(filename, e.to_string());
            }
        };

        if text.trim().chars().count() < MIN_TEXT_CHARS {
            error!("Error processing {filename}: no meaningful text extracted");
            return ParseOutcome::failed(filename, "No meaningful text extracted");
        }

        let Some(backend) = &self.backend else {
            return ParseOutcome {
                filename: filename.to_string(),
                success: true,
                data: Some(ParsedResume::default()),
                error: Some(NO_BACKEND_NOTE.to_string()),
            };
        };

        match self.parse_text(backend.as_ref(), &text).await {
            Some(data) => ParseOutcome {
                filename: filename.to_string(),
                success: true,
                data: Some(data),
                error: None,
            },
            None => ParseOutcome::failed(filename, "Failed to parse resume"),
        }
    }

    async fn parse_text(&self, backend: &dyn CompletionBackend, text: &str) -> Option<ParsedResume> {
        let prompt = build_parse_prompt(text, Utc::now().year());

        let response = backend
            .complete(&prompt)
            .await
            .map_err(|e| error!("LLM error from {}: {e}", backend.name()))
            .ok()?;

        let parsed: Value = serde_json::from_str(extract_json_block(&response))
            .map_err(|e| error!("JSON parsing error: {e}"))
            .ok()?;

        if !parsed.is_object() {
            error!("JSON parsing error: expected an object, got {parsed}");
            return None;
        }

        Some(build_parsed_resume(&parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::LlmError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Backend that replays a canned answer and records the prompts it saw.
    struct CannedBackend {
        answer: Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedBackend {
        fn answering(answer: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(answer.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                answer: Err("boom".to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionBackend for CannedBackend {
        async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.answer.clone().map_err(|message| LlmError::Api {
                status: 500,
                message,
            })
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    const RESUME: &[u8] = b"Meera Iyer\nmeera.iyer@example.com\nSkills: Rust, Kubernetes\n";

    #[tokio::test]
    async fn test_process_success() {
        let backend = CannedBackend::answering(
            "```json\n{\"name\": \"Meera Iyer\", \"email\": \"meera.iyer@example.com\", \"skills\": [\"Rust\", \"Kubernetes\"], \"total_experience_years\": \"3\"}\n```",
        );
        let parser = ResumeParser::new(Some(backend.clone()));

        let outcome = parser.process(Bytes::from_static(RESUME), "meera.txt").await;
        assert!(outcome.success, "{:?}", outcome.error);
        let data = outcome.data.unwrap();
        assert_eq!(data.name.as_deref(), Some("Meera Iyer"));
        assert_eq!(data.skills, vec!["Rust", "Kubernetes"]);
        assert_eq!(data.total_experience_years.as_deref(), Some("3"));

        let prompts = backend.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Skills: Rust, Kubernetes"));
    }

    #[tokio::test]
    async fn test_process_without_backend_returns_empty_profile() {
        let parser = ResumeParser::new(None);
        let outcome = parser.process(Bytes::from_static(RESUME), "meera.txt").await;
        assert!(outcome.success);
        assert_eq!(outcome.data, Some(ParsedResume::default()));
        assert_eq!(outcome.error.as_deref(), Some(NO_BACKEND_NOTE));
    }

    #[tokio::test]
    async fn test_process_rejects_near_empty_text() {
        let backend = CannedBackend::answering("{}");
        let parser = ResumeParser::new(Some(backend.clone()));
        let outcome = parser.process(Bytes::from_static(b"  hi \n\n"), "blank.txt").await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("No meaningful text extracted"));
        assert!(backend.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_process_unsupported_type() {
        let parser = ResumeParser::new(None);
        let outcome = parser.process(Bytes::from_static(RESUME), "meera.odt").await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("Unsupported file type: .odt"));
    }

    #[tokio::test]
    async fn test_process_backend_failure() {
        let parser = ResumeParser::new(Some(CannedBackend::failing()));
        let outcome = parser.process(Bytes::from_static(RESUME), "meera.txt").await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("Failed to parse resume"));
    }

    #[tokio::test]
    async fn test_process_non_json_answer() {
        let parser = ResumeParser::new(Some(CannedBackend::answering("Sorry, I cannot help.")));
        let outcome = parser.process(Bytes::from_static(RESUME), "meera.txt").await;
        assert!(!outcome.success);

        let parser = ResumeParser::new(Some(CannedBackend::answering("[1, 2]")));
        let outcome = parser.process(Bytes::from_static(RESUME), "meera.txt").await;
        assert!(!outcome.success);
    }
}
