//! Readiness rubric.
//!
//! | Rule                                                    | Effect |
//! |---------------------------------------------------------|--------|
//! | base: round(100 * passed / total), 0 with no cases      |        |
//! | estimated time within reference (needs a passing case)  | +10    |
//! | estimated time worse than reference                     | -10    |
//! | estimated space within reference (needs a passing case) | +5     |
//! | more than 3x the problem's baseline line count          | -10    |
//! | no input validation, problem declares constraints       | -5     |
//!
//! The result is clamped to 0..=100. Readiness blends in the historical pass
//! rate at 70/30 when one is supplied. All arithmetic is integer.

use common::{FeedbackAssessment, OverallRating, Problem, SubmissionReport};

use super::cost_model::CodeSignals;

const TIME_BONUS: i32 = 10;
const TIME_PENALTY: i32 = 10;
const SPACE_BONUS: i32 = 5;
const LENGTH_PENALTY: i32 = 10;
const VALIDATION_PENALTY: i32 = 5;
const LENGTH_FACTOR: usize = 3;

/// Assess a finalized report. Deterministic for identical inputs.
pub fn assess(
    report: &SubmissionReport,
    source_code: &str,
    language: &str,
    problem: &Problem,
    historical_pass_rate: Option<u8>,
) -> FeedbackAssessment {
    let signals = CodeSignals::analyze(source_code, language);
    let time = signals.estimated_time();
    let space = signals.estimated_space();
    let reference = &problem.reference;

    let passed = report.passed_count();
    let total = report.total_count();
    let any_passed = passed > 0;
    let time_ok = time.within(&reference.time);
    let space_ok = space.within(&reference.space);
    let too_long = signals.code_lines > LENGTH_FACTOR * problem.baseline_lines;
    let missing_validation = problem.declares_constraints() && !signals.has_validation;

    let mut score = base_score(passed, total);
    if time_ok && any_passed {
        score += TIME_BONUS;
    }
    if !time_ok {
        score -= TIME_PENALTY;
    }
    if space_ok && any_passed {
        score += SPACE_BONUS;
    }
    if too_long {
        score -= LENGTH_PENALTY;
    }
    if missing_validation {
        score -= VALIDATION_PENALTY;
    }
    let score = score.clamp(0, 100) as u8;

    let mut strengths = Vec::new();
    if report.all_passed() {
        strengths.push("All test cases pass".to_string());
    }
    if time_ok && any_passed {
        strengths.push(format!(
            "Meets the reference time complexity ({})",
            reference.time
        ));
    }
    if signals.hash_lookup && any_passed {
        strengths.push("Uses a hash-based lookup structure".to_string());
    }
    if signals.has_validation {
        strengths.push("Proper edge case handling".to_string());
    }
    if signals.descriptive_naming() {
        strengths.push("Good variable naming conventions".to_string());
    }
    if signals.code_lines <= problem.baseline_lines && any_passed {
        strengths.push("Concise implementation".to_string());
    }
    if signals.has_comments {
        strengths.push("Well-commented code".to_string());
    }

    let mut improvements = Vec::new();
    if passed < total {
        improvements.push(format!(
            "Fix failing test cases ({} of {} failed)",
            total - passed,
            total
        ));
    }
    if !time_ok {
        improvements.push(format!(
            "Aim for {} time complexity (estimated {})",
            reference.time, time
        ));
    }
    if !space_ok {
        improvements.push(format!(
            "Reduce auxiliary space toward {} (estimated {})",
            reference.space, space
        ));
    }
    if missing_validation {
        improvements.push("Consider adding input validation".to_string());
    }
    if !signals.has_comments {
        improvements.push("Add comments explaining the algorithm approach".to_string());
    }
    if too_long {
        improvements.push(format!(
            "Simplify the implementation ({} lines, typical solutions use about {})",
            signals.code_lines, problem.baseline_lines
        ));
    }
    if signals.cryptic_naming() && signals.declared_names > 0 {
        improvements.push("Use more descriptive variable names".to_string());
    }

    FeedbackAssessment {
        score,
        estimated_time_complexity: time,
        estimated_space_complexity: space,
        strengths,
        improvements,
        interview_readiness: readiness(score, historical_pass_rate),
        overall_rating: OverallRating::from_score(score),
    }
}

/// round(100 * passed / total), half up.
fn base_score(passed: usize, total: usize) -> i32 {
    if total == 0 {
        return 0;
    }
    ((200 * passed + total) / (2 * total)) as i32
}

/// round(0.7 * score + 0.3 * history), half up.
fn readiness(score: u8, historical_pass_rate: Option<u8>) -> u8 {
    match historical_pass_rate {
        Some(history) => {
            let history = u32::from(history.min(100));
            ((7 * u32::from(score) + 3 * history + 5) / 10) as u8
        }
        None => score,
    }
}
