//! Section splitter: partitions free-form review text into the four review sections.
//!
//! This is a best-effort leniency mechanism for unpredictable model output, not
//! a parser. There is no grammar and no correctness guarantee:
//!
//! - a line is a boundary when, lowercased, it contains any keyword of a section;
//!   sections are checked in a fixed order and the first match wins;
//! - leading numbering, heading hashes, bullets and emphasis markers are stripped
//!   from the boundary line, and any text after a `:` on it opens the section;
//! - other lines append to whichever section is open; lines before the first
//!   boundary are dropped;
//! - body lines that happen to contain a keyword ("responds well to feedback")
//!   will start a new section. That is accepted.
//!
//! If no boundary is found anywhere, every section holds [`SECTION_PLACEHOLDER`].

use once_cell::sync::Lazy;
use regex::Regex;

use crate::synthesis::models::ReviewSections;

pub const SECTION_PLACEHOLDER: &str = "Unable to extract this section from the generated review.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Strengths,
    DevelopmentFeedback,
    Goals,
    OverallAssessment,
}

impl SectionKind {
    fn index(self) -> usize {
        match self {
            SectionKind::Strengths => 0,
            SectionKind::DevelopmentFeedback => 1,
            SectionKind::Goals => 2,
            SectionKind::OverallAssessment => 3,
        }
    }
}

/// Keyword table, in match priority order.
const SECTION_KEYWORDS: &[(SectionKind, &[&str])] = &[
    (SectionKind::Strengths, &["strength"]),
    (SectionKind::DevelopmentFeedback, &["development", "feedback"]),
    (SectionKind::Goals, &["goal", "next year"]),
    (SectionKind::OverallAssessment, &["overall", "assessment"]),
];

static RE_LEADING_MARKERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:#{1,6}\s*)?(?:[-•]\s+)?[*_]*\s*(?:\d+[.)]\s*)?[*_\s]*").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOutcome {
    pub sections: ReviewSections,
    pub boundaries_found: usize,
    /// Sections that never received content.
    pub missing: Vec<SectionKind>,
}

impl SplitOutcome {
    pub fn found_nothing(&self) -> bool {
        self.boundaries_found == 0
    }
}

/// Returns the section a line opens, if any.
pub fn classify_line(line: &str) -> Option<SectionKind> {
    let lower = line.to_lowercase();
    SECTION_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(kind, _)| *kind)
}

/// Text carried on the boundary line itself, after `Heading:`.
fn inline_content(line: &str) -> Option<&str> {
    let stripped = RE_LEADING_MARKERS.replace(line, "");
    let offset = line.len() - stripped.len();
    let rest = &line[offset..];
    let (_, after) = rest.split_once(':')?;
    let after = after.trim().trim_matches(|c| c == '*' || c == '_').trim();
    (!after.is_empty()).then_some(after)
}

pub fn split_sections(text: &str) -> SplitOutcome {
    let mut buckets: [Vec<&str>; 4] = Default::default();
    let mut active: Option<SectionKind> = None;
    let mut boundaries_found = 0;

    for line in text.lines() {
        if let Some(kind) = classify_line(line) {
            boundaries_found += 1;
            active = Some(kind);
            if let Some(content) = inline_content(line) {
                buckets[kind.index()].push(content);
            }
            continue;
        }
        if let Some(kind) = active {
            buckets[kind.index()].push(line);
        }
    }

    let mut missing = Vec::new();
    let mut take = |kind: SectionKind| -> String {
        let joined = buckets[kind.index()].join("\n");
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            missing.push(kind);
            SECTION_PLACEHOLDER.to_string()
        } else {
            trimmed.to_string()
        }
    };

    let sections = ReviewSections {
        strengths: take(SectionKind::Strengths),
        development_feedback: take(SectionKind::DevelopmentFeedback),
        goals: take(SectionKind::Goals),
        overall_assessment: take(SectionKind::OverallAssessment),
    };

    SplitOutcome {
        sections,
        boundaries_found,
        missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LABELED: &str = "\
Here is the review you asked for.

## 1. Strengths
Consistently ships on time.
Mentors new hires.

**2. Development Feedback**
Could delegate more.

3) Goals
- Lead the Q3 migration
- Present at the engineering all-hands

### Overall Assessment
A dependable contributor who raised the bar this cycle.
";

    #[test]
    fn test_four_labeled_sections_are_recovered() {
        let outcome = split_sections(LABELED);
        let s = &outcome.sections;

        assert_eq!(outcome.boundaries_found, 4);
        assert!(outcome.missing.is_empty());
        assert_eq!(s.strengths, "Consistently ships on time.\nMentors new hires.");
        assert_eq!(s.development_feedback, "Could delegate more.");
        assert_eq!(
            s.goals,
            "- Lead the Q3 migration\n- Present at the engineering all-hands"
        );
        assert_eq!(
            s.overall_assessment,
            "A dependable contributor who raised the bar this cycle."
        );
    }

    #[test]
    fn test_sections_cover_content_without_overlap() {
        let outcome = split_sections(LABELED);
        let s = &outcome.sections;
        let all = [
            &s.strengths,
            &s.development_feedback,
            &s.goals,
            &s.overall_assessment,
        ];

        let content_lines: Vec<&str> = LABELED
            .lines()
            .skip_while(|l| classify_line(l).is_none())
            .filter(|l| classify_line(l).is_none() && !l.trim().is_empty())
            .collect();
        let recovered: Vec<&str> = all
            .iter()
            .flat_map(|section| section.lines())
            .filter(|l| !l.trim().is_empty())
            .collect();
        assert_eq!(recovered, content_lines);

        for (i, a) in all.iter().enumerate() {
            for b in all.iter().skip(i + 1) {
                assert!(!a.contains(b.as_str()) && !b.contains(a.as_str()));
            }
        }
    }

    #[test]
    fn test_no_keywords_yields_placeholder_everywhere() {
        let outcome = split_sections("She did fine.\nNothing else to add.");
        assert!(outcome.found_nothing());
        assert_eq!(outcome.missing.len(), 4);
        let s = outcome.sections;
        for section in [
            s.strengths,
            s.development_feedback,
            s.goals,
            s.overall_assessment,
        ] {
            assert_eq!(section, SECTION_PLACEHOLDER);
        }
    }

    #[test]
    fn test_empty_text_yields_placeholder() {
        let outcome = split_sections("");
        assert!(outcome.found_nothing());
        assert_eq!(outcome.sections.goals, SECTION_PLACEHOLDER);
    }

    #[test]
    fn test_first_matching_category_wins() {
        // "strength" is checked before "development"
        assert_eq!(
            classify_line("Strengths and development areas"),
            Some(SectionKind::Strengths)
        );
        // "feedback" is checked before "assessment"
        assert_eq!(
            classify_line("Feedback assessment"),
            Some(SectionKind::DevelopmentFeedback)
        );
        assert_eq!(classify_line("Plans for NEXT YEAR"), Some(SectionKind::Goals));
        assert_eq!(classify_line("Nothing here"), None);
    }

    #[test]
    fn test_inline_content_after_colon_is_kept() {
        let text = "**Strengths:** Calm under pressure.\nGreat code reviews.\n\
                    **Goals:** Own the billing service.";
        let outcome = split_sections(text);
        assert_eq!(
            outcome.sections.strengths,
            "Calm under pressure.\nGreat code reviews."
        );
        assert_eq!(outcome.sections.goals, "Own the billing service.");
    }

    #[test]
    fn test_missing_sections_are_reported() {
        let outcome = split_sections("Strengths\nCurious and thorough.\nGoals\nShip v2.");
        assert_eq!(outcome.boundaries_found, 2);
        assert_eq!(
            outcome.missing,
            vec![SectionKind::DevelopmentFeedback, SectionKind::OverallAssessment]
        );
        assert_eq!(outcome.sections.development_feedback, SECTION_PLACEHOLDER);
        assert_eq!(outcome.sections.strengths, "Curious and thorough.");
    }

    #[test]
    fn test_body_line_with_keyword_opens_a_section() {
        let text = "Strengths\n\
                    She gives thoughtful feedback to juniors.\n\
                    Ships reliably.\n\
                    Delegate more.";
        let outcome = split_sections(text);

        assert_eq!(outcome.boundaries_found, 2);
        assert_eq!(outcome.sections.strengths, SECTION_PLACEHOLDER);
        assert_eq!(
            outcome.sections.development_feedback,
            "Ships reliably.\nDelegate more."
        );
        assert!(!outcome.sections.development_feedback.contains("juniors"));
    }

    #[test]
    fn test_preamble_before_first_boundary_is_dropped() {
        let outcome = split_sections("Sure! Below is the review.\nStrengths\nFocused.");
        assert_eq!(outcome.sections.strengths, "Focused.");
    }
}
