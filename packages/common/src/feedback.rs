use serde::{Deserialize, Serialize};

use crate::complexity::ComplexityClass;

/// Headline label derived from the rubric score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
pub enum OverallRating {
    #[serde(rename = "Strong Solution")]
    StrongSolution,
    #[serde(rename = "Good Attempt")]
    GoodAttempt,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
}

impl OverallRating {
    /// Score bands: 80 and above, 60 and above, below 60.
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => Self::StrongSolution,
            60..=79 => Self::GoodAttempt,
            _ => Self::NeedsImprovement,
        }
    }
}

/// Rubric-derived assessment attached to a completed report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct FeedbackAssessment {
    /// 0-100.
    pub score: u8,
    #[schema(value_type = String, example = "O(n)")]
    pub estimated_time_complexity: ComplexityClass,
    #[schema(value_type = String, example = "O(n)")]
    pub estimated_space_complexity: ComplexityClass,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    /// 0-100.
    pub interview_readiness: u8,
    pub overall_rating: OverallRating,
}
