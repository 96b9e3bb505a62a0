// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.

/// Closing instruction that enforces JSON-only output.
pub const JSON_ONLY_REMINDER: &str =
    "REMINDER: Output ONLY the JSON object. No markdown, no code fences, no explanations.";
