// Review synthesis: multipart intake, extraction, gap analysis, prompt build,
// section splitting and deterministic fallback.
// All LLM calls go through llm_client — no direct Anthropic calls here.

pub mod extraction;
pub mod fallback;
pub mod gap_analysis;
pub mod generator;
pub mod handlers;
pub mod models;
pub mod prompts;
pub mod sections;
pub mod upload;
