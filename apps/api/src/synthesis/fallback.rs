//! Fallback generator — deterministic review text built only from local inputs.
//!
//! Used when the completion service is unavailable, returns unusable output, or
//! is skipped because nothing was supplied. Never fails and always returns four
//! non-empty sections. With no inputs at all the text carries no digits.

use crate::synthesis::gap_analysis::{analyze_gaps, Alignment};
use crate::synthesis::models::{ItpScores, ReviewInputs, ReviewSections};

const NO_DATA_STRENGTHS: &str = "No performance inputs were provided for this review cycle, \
    so strengths could not be assessed. Add assessment scores, peer feedback, a self-review \
    or manager comments to generate a complete review.";
const NO_DATA_DEVELOPMENT: &str = "Development feedback requires at least one performance \
    input. Areas for growth will be identified here once inputs are added.";
const NO_DATA_GOALS: &str = "Goals should be agreed between the employee and manager once \
    performance inputs for this cycle are available.";
const NO_DATA_OVERALL: &str = "An overall assessment could not be generated because no \
    performance inputs were supplied.";

/// Scores that drive trait-level wording: the manager's rating when present,
/// otherwise the self-assessment.
fn reference_scores(inputs: &ReviewInputs) -> Option<(ItpScores, &'static str)> {
    inputs
        .manager_itp
        .map(|s| (s, "manager rating"))
        .or_else(|| inputs.employee_itp.map(|s| (s, "self-assessment")))
}

pub fn generate_fallback(inputs: &ReviewInputs) -> ReviewSections {
    let used = inputs.inputs_used();
    if !used.any() {
        return ReviewSections {
            strengths: NO_DATA_STRENGTHS.to_string(),
            development_feedback: NO_DATA_DEVELOPMENT.to_string(),
            goals: NO_DATA_GOALS.to_string(),
            overall_assessment: NO_DATA_OVERALL.to_string(),
        };
    }

    let reference = reference_scores(inputs);
    let gaps = match (&inputs.employee_itp, &inputs.manager_itp) {
        (Some(employee), Some(manager)) => Some(analyze_gaps(employee, manager)),
        _ => None,
    };

    // Strengths
    let mut strengths = Vec::new();
    if let Some((scores, source)) = &reference {
        let top = scores.strongest();
        strengths.push(format!(
            "Highest-rated Ideal Team Player trait: {} ({}/10, {source}).",
            top.label(),
            scores.get(top)
        ));
    }
    if let Some(comments) = &inputs.manager_comments {
        strengths.push(format!("Manager comments: \"{}\"", comments.trim()));
    }
    if used.feedback_360 {
        strengths.push(
            "Peer feedback was provided; review it for strengths recognized by colleagues."
                .to_string(),
        );
    }
    if used.self_review {
        strengths.push(
            "The employee's self-review was provided and should be read alongside this summary."
                .to_string(),
        );
    }

    // Development feedback
    let mut development = Vec::new();
    if let Some(gaps) = &gaps {
        development.push("Self-assessment vs manager rating:".to_string());
        development.extend(gaps.lines());
    }
    if let Some((scores, source)) = &reference {
        let low = scores.weakest();
        development.push(format!(
            "Lowest-rated trait: {} ({}/10, {source}); focus development here.",
            low.label(),
            scores.get(low)
        ));
    }
    if development.is_empty() {
        development.push(
            "No specific development areas could be derived from the supplied inputs; \
             discuss growth areas directly with the employee."
                .to_string(),
        );
    }

    // Goals
    let mut goals = Vec::new();
    if let Some((scores, _)) = &reference {
        let (top, low) = (scores.strongest(), scores.weakest());
        if top == low {
            goals.push(format!(
                "Maintain the current balance across all traits, starting with {}.",
                top.label()
            ));
        } else {
            goals.push(format!(
                "Build on {} while raising {} before the next review cycle.",
                top.label(),
                low.label()
            ));
        }
    }
    if let Some(gaps) = &gaps {
        let blind_spots: Vec<&str> = gaps
            .flagged()
            .filter(|g| g.alignment == Alignment::BlindSpot)
            .map(|g| g.itp_trait.label())
            .collect();
        let overrated: Vec<&str> = gaps
            .flagged()
            .filter(|g| g.alignment == Alignment::Overconfidence)
            .map(|g| g.itp_trait.label())
            .collect();
        if !blind_spots.is_empty() {
            goals.push(format!(
                "Recognize strengths the employee undervalues: {}.",
                blind_spots.join(", ")
            ));
        }
        if !overrated.is_empty() {
            goals.push(format!(
                "Agree on concrete evidence of progress for: {}.",
                overrated.join(", ")
            ));
        }
    }
    if goals.is_empty() {
        goals.push(
            "Agree on a small set of measurable goals for the coming cycle during the review \
             conversation."
                .to_string(),
        );
    }

    // Overall
    let mut sources = Vec::new();
    if used.itp_scores {
        sources.push("Ideal Team Player scores");
    }
    if used.feedback_360 {
        sources.push("peer feedback");
    }
    if used.self_review {
        sources.push("self-review");
    }
    if used.manager_comments {
        sources.push("manager comments");
    }
    let overall = format!(
        "This review was assembled from: {}. Automated synthesis was unavailable, so this \
         summary reflects the supplied inputs only and should be completed by the manager.",
        sources.join(", ")
    );

    ReviewSections {
        strengths: strengths.join("\n"),
        development_feedback: development.join("\n"),
        goals: goals.join("\n"),
        overall_assessment: overall,
    }
}

/// Replaces any placeholder section with the matching fallback section.
pub fn fill_missing(
    mut sections: ReviewSections,
    fallback: ReviewSections,
    placeholder: &str,
) -> ReviewSections {
    if sections.strengths == placeholder {
        sections.strengths = fallback.strengths;
    }
    if sections.development_feedback == placeholder {
        sections.development_feedback = fallback.development_feedback;
    }
    if sections.goals == placeholder {
        sections.goals = fallback.goals;
    }
    if sections.overall_assessment == placeholder {
        sections.overall_assessment = fallback.overall_assessment;
    }
    sections
}
