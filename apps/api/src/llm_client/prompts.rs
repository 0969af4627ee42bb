// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// System prompt for verbatim transcription of uploaded pages.
pub const TRANSCRIPTION_SYSTEM: &str = "You are a careful transcription assistant. \
    Reproduce the text visible in the provided images exactly, in reading order. \
    Do NOT summarize, interpret, or add commentary.";
