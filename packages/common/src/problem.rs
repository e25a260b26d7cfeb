use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::complexity::ComplexityClass;

/// Problem difficulty as shown in the challenge library.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// A worked example shown alongside the problem statement.
#[derive(Clone, Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Example {
    pub input: String,
    pub output: String,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Canonical complexity of the reference solution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ComplexityReference {
    #[schema(value_type = String, example = "O(n)")]
    pub time: ComplexityClass,
    #[schema(value_type = String, example = "O(n)")]
    pub space: ComplexityClass,
}

fn default_weight() -> u32 {
    1
}

/// A single input/expected-output pair used for grading.
#[derive(Clone, Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TestCase {
    #[schema(example = "two-sum-1")]
    pub id: String,
    /// Payload written to the program's stdin.
    pub input: String,
    pub expected_output: String,
    /// Hidden cases never reveal input or output to the candidate.
    #[serde(default)]
    pub hidden: bool,
    /// Relative weight. Default: 1.
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Overrides the engine's per-case wall-clock timeout.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_baseline_lines() -> usize {
    30
}

/// A published problem. Immutable once it enters the catalog.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Problem {
    pub id: String,
    pub title: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    /// Historical acceptance percentage, display only.
    #[serde(default)]
    pub acceptance_rate: Option<f32>,
    #[serde(default)]
    pub examples: Vec<Example>,
    #[serde(default)]
    pub constraints: Vec<String>,
    pub reference: ComplexityReference,
    pub test_cases: Vec<TestCase>,
    pub supported_languages: BTreeSet<String>,
    /// Length in code lines of a typical accepted solution. Default: 30.
    #[serde(default = "default_baseline_lines")]
    pub baseline_lines: usize,
}

impl Problem {
    pub fn supports_language(&self, language: &str) -> bool {
        self.supported_languages.contains(language)
    }

    /// Whether the statement declares boundary constraints on its input.
    pub fn declares_constraints(&self) -> bool {
        !self.constraints.is_empty()
    }

    pub fn visible_test_cases(&self) -> impl Iterator<Item = &TestCase> {
        self.test_cases.iter().filter(|tc| !tc.hidden)
    }

    pub fn total_weight(&self) -> u32 {
        self.test_cases.iter().map(|tc| tc.weight).sum()
    }
}
