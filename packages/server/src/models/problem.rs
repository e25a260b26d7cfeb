use common::{Difficulty, Example, Problem};
use serde::{Deserialize, Serialize};

/// Query parameters for the problem library.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProblemListQuery {
    /// Only problems of this difficulty.
    #[param(example = "Easy")]
    pub difficulty: Option<Difficulty>,
    /// Only problems in this category (case-insensitive). `all` disables the filter.
    #[param(example = "Array")]
    pub category: Option<String>,
    /// Case-insensitive substring of the title or description.
    #[param(example = "sum")]
    pub search: Option<String>,
}

impl ProblemListQuery {
    pub fn matches(&self, problem: &Problem) -> bool {
        if self.difficulty.is_some_and(|d| d != problem.difficulty) {
            return false;
        }
        if let Some(category) = self.category.as_deref().map(str::trim)
            && !category.is_empty()
            && !category.eq_ignore_ascii_case("all")
            && !category.eq_ignore_ascii_case(&problem.category)
        {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                problem.title.to_lowercase().contains(&term)
                    || problem.description.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }
}

/// Problem summary for the library view.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ProblemSummary {
    #[schema(example = "two-sum")]
    pub id: String,
    #[schema(example = "Two Sum")]
    pub title: String,
    pub difficulty: Difficulty,
    #[schema(example = "Array")]
    pub category: String,
    pub description: String,
    #[schema(example = 49.2)]
    pub acceptance_rate: Option<f32>,
    /// Complexity of the reference solution.
    #[schema(example = "O(n)")]
    pub time_complexity: String,
    #[schema(example = "O(n)")]
    pub space_complexity: String,
    pub supported_languages: Vec<String>,
}

impl From<&Problem> for ProblemSummary {
    fn from(problem: &Problem) -> Self {
        Self {
            id: problem.id.clone(),
            title: problem.title.clone(),
            difficulty: problem.difficulty,
            category: problem.category.clone(),
            description: problem.description.clone(),
            acceptance_rate: problem.acceptance_rate,
            time_complexity: problem.reference.time.to_string(),
            space_complexity: problem.reference.space.to_string(),
            supported_languages: problem.supported_languages.iter().cloned().collect(),
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProblemListResponse {
    pub data: Vec<ProblemSummary>,
    pub total: usize,
}

/// A visible test case. Hidden cases are only counted.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SampleTestCase {
    #[schema(example = "two-sum-1")]
    pub id: String,
    #[schema(example = "[2,7,11,15]\n9\n")]
    pub input: String,
    #[schema(example = "[0,1]")]
    pub expected_output: String,
}

/// Full problem statement.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ProblemDetail {
    #[serde(flatten)]
    pub summary: ProblemSummary,
    pub examples: Vec<Example>,
    pub constraints: Vec<String>,
    pub sample_test_cases: Vec<SampleTestCase>,
    pub hidden_test_case_count: usize,
}

impl From<&Problem> for ProblemDetail {
    fn from(problem: &Problem) -> Self {
        Self {
            summary: problem.into(),
            examples: problem.examples.clone(),
            constraints: problem.constraints.clone(),
            sample_test_cases: problem
                .visible_test_cases()
                .map(|tc| SampleTestCase {
                    id: tc.id.clone(),
                    input: tc.input.clone(),
                    expected_output: tc.expected_output.clone(),
                })
                .collect(),
            hidden_test_case_count: problem.test_cases.iter().filter(|tc| tc.hidden).count(),
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct LanguagesResponse {
    #[schema(example = "two-sum")]
    pub problem_id: String,
    /// Languages accepted for this problem by the running engine.
    #[schema(example = json!(["cpp", "python"]))]
    pub languages: Vec<String>,
}
