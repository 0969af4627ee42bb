//! Review synthesis — orchestrates prompt build, completion, splitting and fallback.
//!
//! Flow: inputs → presence map → (skip?) → prompt → completion → split_sections →
//!       fill missing sections from fallback → response.
//!
//! Every failure of the completion service is absorbed here: the caller always
//! receives four populated sections.

use tracing::{info, warn};

use crate::llm_client::{CompletionRequest, CompletionService};
use crate::synthesis::extraction::truncate_chars;
use crate::synthesis::fallback::{fill_missing, generate_fallback};
use crate::synthesis::gap_analysis::{analyze_gaps, GapAnalysis};
use crate::synthesis::models::{
    InputSummary, ItpScores, ReviewInputs, SynthesisResponse, SynthesisSource,
};
use crate::synthesis::prompts::{SYNTHESIS_PROMPT_TEMPLATE, SYNTHESIS_SYSTEM};
use crate::synthesis::sections::{split_sections, SECTION_PLACEHOLDER};

/// Length of the text excerpts echoed back in `input_summary`.
const EXCERPT_CHARS: usize = 500;

#[derive(Debug, Clone, Copy)]
pub struct SynthesisOptions {
    /// Skip the completion call when no input category is present.
    pub skip_when_empty: bool,
}

fn gap_analysis_for(inputs: &ReviewInputs) -> Option<GapAnalysis> {
    match (&inputs.employee_itp, &inputs.manager_itp) {
        (Some(employee), Some(manager)) => Some(analyze_gaps(employee, manager)),
        _ => None,
    }
}

fn summarize(inputs: &ReviewInputs, gaps: Option<GapAnalysis>) -> InputSummary {
    InputSummary {
        employee_itp: inputs.employee_itp,
        manager_itp: inputs.manager_itp,
        gap_analysis: gaps,
        feedback_360_excerpt: inputs
            .feedback_360
            .as_deref()
            .map(|t| truncate_chars(t, EXCERPT_CHARS)),
        self_review_excerpt: inputs
            .self_review
            .as_deref()
            .map(|t| truncate_chars(t, EXCERPT_CHARS)),
        manager_comments: inputs.manager_comments.clone(),
    }
}

fn format_scores(scores: &ItpScores) -> String {
    format!(
        "Humble {}/10, Hungry {}/10, Smart {}/10",
        scores.humble, scores.hungry, scores.smart
    )
}

/// Builds the synthesis prompt, listing only the sources that are present.
pub fn build_synthesis_prompt(inputs: &ReviewInputs, gaps: Option<&GapAnalysis>) -> String {
    let mut sources = Vec::new();
    let mut blocks = Vec::new();

    if inputs.employee_itp.is_some() || inputs.manager_itp.is_some() {
        sources.push("Ideal Team Player assessment");
        let mut block = String::from("IDEAL TEAM PLAYER SCORES (1-10):");
        if let Some(scores) = &inputs.employee_itp {
            block.push_str(&format!("\n- Self-assessment: {}", format_scores(scores)));
        }
        if let Some(scores) = &inputs.manager_itp {
            block.push_str(&format!("\n- Manager assessment: {}", format_scores(scores)));
        }
        if let Some(gaps) = gaps {
            block.push_str("\nGAP ANALYSIS:");
            for line in gaps.lines() {
                block.push_str(&format!("\n- {line}"));
            }
        }
        blocks.push(block);
    }
    if let Some(text) = &inputs.feedback_360 {
        sources.push("360 feedback");
        blocks.push(format!("360 FEEDBACK:\n{text}"));
    }
    if let Some(text) = &inputs.self_review {
        sources.push("employee self-review");
        blocks.push(format!("EMPLOYEE SELF-REVIEW:\n{text}"));
    }
    if let Some(text) = &inputs.manager_comments {
        sources.push("manager comments");
        blocks.push(format!("MANAGER COMMENTS:\n{text}"));
    }

    let sources = if sources.is_empty() {
        "none".to_string()
    } else {
        sources.join(", ")
    };
    let inputs_text = if blocks.is_empty() {
        "No inputs were supplied. Say so plainly under each heading.".to_string()
    } else {
        blocks.join("\n\n")
    };

    SYNTHESIS_PROMPT_TEMPLATE
        .replace("{sources}", &sources)
        .replace("{inputs}", &inputs_text)
}

/// Produces a four-section review. Never fails.
pub async fn synthesize(
    service: &dyn CompletionService,
    inputs: ReviewInputs,
    options: SynthesisOptions,
) -> SynthesisResponse {
    let inputs_used = inputs.inputs_used();
    let gaps = gap_analysis_for(&inputs);

    let respond = |sections, source| SynthesisResponse {
        sections,
        inputs_used,
        source,
        input_summary: summarize(&inputs, gaps.clone()),
    };

    if !inputs_used.any() && options.skip_when_empty {
        info!("No review inputs supplied; returning no-data fallback without a completion call");
        return respond(generate_fallback(&inputs), SynthesisSource::Fallback);
    }

    let request = CompletionRequest::text(
        SYNTHESIS_SYSTEM,
        build_synthesis_prompt(&inputs, gaps.as_ref()),
    );

    let reply = match service.complete(&request).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!("Review synthesis call failed, using fallback: {e}");
            return respond(generate_fallback(&inputs), SynthesisSource::Fallback);
        }
    };

    let outcome = split_sections(&reply);
    if outcome.found_nothing() {
        warn!(
            "Synthesis reply had no recognizable sections ({} chars), using fallback",
            reply.len()
        );
        return respond(generate_fallback(&inputs), SynthesisSource::Fallback);
    }
    if !outcome.missing.is_empty() {
        warn!(
            "Synthesis reply missing sections {:?}, filling from fallback",
            outcome.missing
        );
    }

    info!(
        "Review synthesized: {} section boundaries, inputs={:?}",
        outcome.boundaries_found, inputs_used
    );
    let sections = fill_missing(
        outcome.sections,
        generate_fallback(&inputs),
        SECTION_PLACEHOLDER,
    );
    respond(sections, SynthesisSource::Ai)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::llm_client::LlmError;

    /// Records prompts and replies with a fixed result.
    struct RecordingService {
        reply: Option<&'static str>,
        prompts: Mutex<Vec<String>>,
    }

    impl RecordingService {
        fn new(reply: Option<&'static str>) -> Self {
            Self {
                reply,
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionService for RecordingService {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            self.reply
                .map(str::to_string)
                .ok_or(LlmError::Api {
                    status: 503,
                    message: "down".to_string(),
                })
        }
    }

    const OPTIONS: SynthesisOptions = SynthesisOptions {
        skip_when_empty: true,
    };

    fn scored_inputs() -> ReviewInputs {
        ReviewInputs {
            employee_itp: Some(ItpScores { humble: 5, hungry: 5, smart: 5 }),
            manager_itp: Some(ItpScores { humble: 8, hungry: 5, smart: 3 }),
            manager_comments: Some("Reliable under pressure".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_prompt_lists_only_present_sources() {
        let inputs = scored_inputs();
        let gaps = gap_analysis_for(&inputs);
        let prompt = build_synthesis_prompt(&inputs, gaps.as_ref());

        assert!(prompt.contains("AVAILABLE SOURCES: Ideal Team Player assessment, manager comments"));
        assert!(prompt.contains("Self-assessment: Humble 5/10, Hungry 5/10, Smart 5/10"));
        assert!(prompt.contains("Humble: manager rates 3 points higher"));
        assert!(prompt.contains("MANAGER COMMENTS:\nReliable under pressure"));
        assert!(!prompt.contains("360 FEEDBACK"));
        assert!(!prompt.contains("EMPLOYEE SELF-REVIEW"));
    }

    #[tokio::test]
    async fn test_empty_inputs_skip_the_call() {
        let service = RecordingService::new(Some("Strengths\nunused"));
        let response = synthesize(&service, ReviewInputs::default(), OPTIONS).await;

        assert_eq!(service.call_count(), 0);
        assert_eq!(response.source, SynthesisSource::Fallback);
        assert!(!response.inputs_used.any());
        assert_eq!(
            response.sections,
            generate_fallback(&ReviewInputs::default())
        );
    }

    #[tokio::test]
    async fn test_empty_inputs_still_call_when_configured() {
        let service = RecordingService::new(None);
        let options = SynthesisOptions {
            skip_when_empty: false,
        };
        let response = synthesize(&service, ReviewInputs::default(), options).await;

        assert_eq!(service.call_count(), 1);
        assert!(service.prompts.lock().unwrap()[0].contains("AVAILABLE SOURCES: none"));
        assert_eq!(response.source, SynthesisSource::Fallback);
    }

    #[tokio::test]
    async fn test_service_failure_degrades_to_fallback() {
        let service = RecordingService::new(None);
        let inputs = scored_inputs();
        let response = synthesize(&service, inputs.clone(), OPTIONS).await;

        assert_eq!(service.call_count(), 1);
        assert_eq!(response.source, SynthesisSource::Fallback);
        assert_eq!(response.sections, generate_fallback(&inputs));
        assert!(response.inputs_used.itp_scores);
        assert!(response.input_summary.gap_analysis.is_some());
    }

    #[tokio::test]
    async fn test_unstructured_reply_degrades_to_fallback() {
        let service = RecordingService::new(Some("I cannot help with that."));
        let inputs = scored_inputs();
        let response = synthesize(&service, inputs.clone(), OPTIONS).await;

        assert_eq!(response.source, SynthesisSource::Fallback);
        assert_eq!(response.sections, generate_fallback(&inputs));
    }

    #[tokio::test]
    async fn test_partial_reply_is_completed_from_fallback() {
        let service = RecordingService::new(Some(
            "## Strengths\nKeeps the team calm.\n## Overall Assessment\nA strong year.",
        ));
        let inputs = scored_inputs();
        let response = synthesize(&service, inputs.clone(), OPTIONS).await;
        let fallback = generate_fallback(&inputs);

        assert_eq!(response.source, SynthesisSource::Ai);
        assert_eq!(response.sections.strengths, "Keeps the team calm.");
        assert_eq!(response.sections.overall_assessment, "A strong year.");
        assert_eq!(
            response.sections.development_feedback,
            fallback.development_feedback
        );
        assert_eq!(response.sections.goals, fallback.goals);
    }

    #[tokio::test]
    async fn test_summary_echoes_truncated_excerpts() {
        let service = RecordingService::new(None);
        let inputs = ReviewInputs {
            feedback_360: Some("x".repeat(EXCERPT_CHARS + 50)),
            ..Default::default()
        };
        let response = synthesize(&service, inputs, OPTIONS).await;
        assert_eq!(
            response
                .input_summary
                .feedback_360_excerpt
                .map(|e| e.chars().count()),
            Some(EXCERPT_CHARS)
        );
    }
}
