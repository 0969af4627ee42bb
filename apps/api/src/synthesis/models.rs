//! Data types shared across the synthesis pipeline.

use serde::{Deserialize, Serialize};

use crate::synthesis::gap_analysis::GapAnalysis;

pub const MIN_ITP_SCORE: u8 = 1;
pub const MAX_ITP_SCORE: u8 = 10;

/// The three Ideal Team Player traits, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItpTrait {
    Humble,
    Hungry,
    Smart,
}

impl ItpTrait {
    pub const ALL: [ItpTrait; 3] = [ItpTrait::Humble, ItpTrait::Hungry, ItpTrait::Smart];

    pub fn label(self) -> &'static str {
        match self {
            ItpTrait::Humble => "Humble",
            ItpTrait::Hungry => "Hungry",
            ItpTrait::Smart => "Smart",
        }
    }
}

/// One Ideal Team Player rating: three integers, each in `[1, 10]`.
///
/// Deserialization accepts capitalized keys because vision models echo
/// the trait names the way they appear on the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItpScores {
    #[serde(alias = "Humble")]
    pub humble: u8,
    #[serde(alias = "Hungry")]
    pub hungry: u8,
    #[serde(alias = "Smart")]
    pub smart: u8,
}

impl ItpScores {
    pub fn get(&self, t: ItpTrait) -> u8 {
        match t {
            ItpTrait::Humble => self.humble,
            ItpTrait::Hungry => self.hungry,
            ItpTrait::Smart => self.smart,
        }
    }

    pub fn is_valid(&self) -> bool {
        ItpTrait::ALL
            .iter()
            .all(|t| (MIN_ITP_SCORE..=MAX_ITP_SCORE).contains(&self.get(*t)))
    }

    /// Returns the scores only when every trait lies in `[1, 10]`.
    pub fn validated(self) -> Option<Self> {
        self.is_valid().then_some(self)
    }

    /// Highest-rated trait; ties go to the earlier trait in display order.
    pub fn strongest(&self) -> ItpTrait {
        ItpTrait::ALL
            .into_iter()
            .fold(ItpTrait::Humble, |best, t| {
                if self.get(t) > self.get(best) {
                    t
                } else {
                    best
                }
            })
    }

    /// Lowest-rated trait; ties go to the earlier trait in display order.
    pub fn weakest(&self) -> ItpTrait {
        ItpTrait::ALL
            .into_iter()
            .fold(ItpTrait::Humble, |worst, t| {
                if self.get(t) < self.get(worst) {
                    t
                } else {
                    worst
                }
            })
    }
}

/// Everything the pipeline knows after uploads are extracted.
/// Every field is optional; any subset may be absent.
#[derive(Debug, Clone, Default)]
pub struct ReviewInputs {
    pub employee_itp: Option<ItpScores>,
    pub manager_itp: Option<ItpScores>,
    pub feedback_360: Option<String>,
    pub self_review: Option<String>,
    pub manager_comments: Option<String>,
}

impl ReviewInputs {
    pub fn inputs_used(&self) -> InputsUsed {
        InputsUsed {
            itp_scores: self.employee_itp.is_some() || self.manager_itp.is_some(),
            feedback_360: self.feedback_360.is_some(),
            self_review: self.self_review.is_some(),
            manager_comments: self.manager_comments.is_some(),
        }
    }
}

/// Presence map: which input categories were available for this synthesis.
/// Display/audit only — never drives control flow beyond the empty check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputsUsed {
    pub itp_scores: bool,
    pub feedback_360: bool,
    pub self_review: bool,
    pub manager_comments: bool,
}

impl InputsUsed {
    pub fn any(&self) -> bool {
        self.itp_scores || self.feedback_360 || self.self_review || self.manager_comments
    }
}

/// The four narrative sections of a synthesized review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSections {
    pub strengths: String,
    pub development_feedback: String,
    pub goals: String,
    pub overall_assessment: String,
}

/// Where the returned sections came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisSource {
    Ai,
    Fallback,
}

/// Echo of the extracted inputs, returned alongside the sections.
#[derive(Debug, Clone, Serialize)]
pub struct InputSummary {
    pub employee_itp: Option<ItpScores>,
    pub manager_itp: Option<ItpScores>,
    pub gap_analysis: Option<GapAnalysis>,
    pub feedback_360_excerpt: Option<String>,
    pub self_review_excerpt: Option<String>,
    pub manager_comments: Option<String>,
}

/// Response body of `POST /api/v1/reviews/synthesize`.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesisResponse {
    #[serde(flatten)]
    pub sections: ReviewSections,
    pub inputs_used: InputsUsed,
    pub source: SynthesisSource,
    pub input_summary: InputSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_itp_scores_accept_capitalized_keys() {
        let scores: ItpScores =
            serde_json::from_str(r#"{"Humble": 7, "Hungry": 8, "Smart": 6}"#).unwrap();
        assert_eq!(scores.get(ItpTrait::Humble), 7);
        assert_eq!(scores.get(ItpTrait::Hungry), 8);
        assert_eq!(scores.get(ItpTrait::Smart), 6);
    }

    #[test]
    fn test_scores_outside_range_are_rejected() {
        let zero = ItpScores { humble: 0, hungry: 5, smart: 5 };
        let eleven = ItpScores { humble: 5, hungry: 11, smart: 5 };
        let edges = ItpScores { humble: 1, hungry: 10, smart: 5 };
        assert!(zero.validated().is_none());
        assert!(eleven.validated().is_none());
        assert_eq!(edges.validated(), Some(edges));
    }

    #[test]
    fn test_strongest_and_weakest_break_ties_in_display_order() {
        let scores = ItpScores { humble: 6, hungry: 9, smart: 6 };
        assert_eq!(scores.strongest(), ItpTrait::Hungry);
        assert_eq!(scores.weakest(), ItpTrait::Humble);

        let flat = ItpScores { humble: 5, hungry: 5, smart: 5 };
        assert_eq!(flat.strongest(), ItpTrait::Humble);
        assert_eq!(flat.weakest(), ItpTrait::Humble);
    }

    #[test]
    fn test_inputs_used_reflects_available_categories() {
        let inputs = ReviewInputs {
            manager_itp: Some(ItpScores { humble: 5, hungry: 5, smart: 5 }),
            manager_comments: Some("Solid year".to_string()),
            ..Default::default()
        };
        let used = inputs.inputs_used();
        assert!(used.itp_scores);
        assert!(!used.feedback_360);
        assert!(!used.self_review);
        assert!(used.manager_comments);
        assert!(used.any());
        assert!(!ReviewInputs::default().inputs_used().any());
    }

    #[test]
    fn test_response_flattens_sections() {
        let response = SynthesisResponse {
            sections: ReviewSections {
                strengths: "a".to_string(),
                development_feedback: "b".to_string(),
                goals: "c".to_string(),
                overall_assessment: "d".to_string(),
            },
            inputs_used: InputsUsed::default(),
            source: SynthesisSource::Fallback,
            input_summary: InputSummary {
                employee_itp: None,
                manager_itp: None,
                gap_analysis: None,
                feedback_360_excerpt: None,
                self_review_excerpt: None,
                manager_comments: None,
            },
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["strengths"], "a");
        assert_eq!(json["overall_assessment"], "d");
        assert_eq!(json["source"], "fallback");
        assert_eq!(json["inputs_used"]["itp_scores"], false);
    }
}
