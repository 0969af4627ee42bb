//! Gap analysis between an employee's ITP self-assessment and their manager's rating.
//!
//! Each trait is compared independently: `difference = manager − self`.
//! A gap of less than two points counts as alignment.

use serde::Serialize;

use crate::synthesis::models::{ItpScores, ItpTrait};

/// Minimum absolute difference that flags a trait.
pub const GAP_THRESHOLD: i16 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Aligned,
    /// Manager rates the trait higher than the employee does.
    BlindSpot,
    /// Employee rates the trait higher than the manager does.
    Overconfidence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraitGap {
    #[serde(rename = "trait")]
    pub itp_trait: ItpTrait,
    pub self_score: u8,
    pub manager_score: u8,
    pub difference: i16,
    pub alignment: Alignment,
}

impl TraitGap {
    pub fn describe(&self) -> String {
        let name = self.itp_trait.label();
        match self.alignment {
            Alignment::Aligned => format!(
                "{name}: good alignment (self {}, manager {}).",
                self.self_score, self.manager_score
            ),
            Alignment::BlindSpot => format!(
                "{name}: manager rates {} points higher than self ({} vs {}); \
                 possible blind spot, the employee may be undervaluing this strength.",
                self.difference, self.manager_score, self.self_score
            ),
            Alignment::Overconfidence => format!(
                "{name}: self rates {} points higher than manager ({} vs {}); \
                 possible overconfidence in this area.",
                -self.difference, self.self_score, self.manager_score
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GapAnalysis {
    pub traits: Vec<TraitGap>,
}

impl GapAnalysis {
    pub fn flagged(&self) -> impl Iterator<Item = &TraitGap> {
        self.traits
            .iter()
            .filter(|g| g.alignment != Alignment::Aligned)
    }

    /// One line per trait, in display order.
    pub fn lines(&self) -> Vec<String> {
        self.traits.iter().map(TraitGap::describe).collect()
    }
}

pub fn analyze_gaps(self_scores: &ItpScores, manager_scores: &ItpScores) -> GapAnalysis {
    let traits = ItpTrait::ALL
        .into_iter()
        .map(|t| {
            let self_score = self_scores.get(t);
            let manager_score = manager_scores.get(t);
            let difference = manager_score as i16 - self_score as i16;
            let alignment = if difference >= GAP_THRESHOLD {
                Alignment::BlindSpot
            } else if difference <= -GAP_THRESHOLD {
                Alignment::Overconfidence
            } else {
                Alignment::Aligned
            };
            TraitGap {
                itp_trait: t,
                self_score,
                manager_score,
                difference,
                alignment,
            }
        })
        .collect();

    GapAnalysis { traits }
}
