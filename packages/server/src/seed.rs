//! Built-in problem set used when no catalog file is configured.
//!
//! Test case input is one JSON value per line on stdin; expected output is a
//! single JSON value (or bare word for string answers).

use common::{ComplexityClass, ComplexityReference, Difficulty, Example, Problem, TestCase};

const LANGUAGES: &[&str] = &["cpp", "java", "javascript", "python"];

fn case(id: &str, input: &str, expected_output: &str, hidden: bool) -> TestCase {
    TestCase {
        id: id.to_string(),
        input: input.to_string(),
        expected_output: expected_output.to_string(),
        hidden,
        weight: 1,
        timeout_ms: None,
    }
}

fn example(input: &str, output: &str, explanation: Option<&str>) -> Example {
    Example {
        input: input.to_string(),
        output: output.to_string(),
        explanation: explanation.map(str::to_string),
    }
}

#[allow(clippy::too_many_arguments)]
fn problem(
    id: &str,
    title: &str,
    difficulty: Difficulty,
    category: &str,
    description: &str,
    acceptance_rate: f32,
    (time, space): (ComplexityClass, ComplexityClass),
    baseline_lines: usize,
) -> Problem {
    Problem {
        id: id.to_string(),
        title: title.to_string(),
        difficulty,
        category: category.to_string(),
        description: description.to_string(),
        acceptance_rate: Some(acceptance_rate),
        examples: Vec::new(),
        constraints: Vec::new(),
        reference: ComplexityReference { time, space },
        test_cases: Vec::new(),
        supported_languages: LANGUAGES.iter().map(|l| l.to_string()).collect(),
        baseline_lines,
    }
}

/// The default challenge library.
pub fn problems() -> Vec<Problem> {
    use ComplexityClass::*;

    vec![
        Problem {
            examples: vec![
                example(
                    "nums = [2,7,11,15], target = 9",
                    "[0,1]",
                    Some("Because nums[0] + nums[1] == 9, we return [0, 1]."),
                ),
                example("nums = [3,2,4], target = 6", "[1,2]", None),
            ],
            constraints: vec![
                "2 ≤ nums.length ≤ 10⁴".into(),
                "-10⁹ ≤ nums[i] ≤ 10⁹".into(),
                "-10⁹ ≤ target ≤ 10⁹".into(),
                "Only one valid answer exists.".into(),
            ],
            test_cases: vec![
                case("two-sum-1", "[2,7,11,15]\n9\n", "[0,1]", false),
                case("two-sum-2", "[3,2,4]\n6\n", "[1,2]", false),
                case("two-sum-3", "[3,3]\n6\n", "[0,1]", true),
                case("two-sum-4", "[-1,-2,-3,-4,-5]\n-8\n", "[2,4]", true),
            ],
            ..problem(
                "two-sum",
                "Two Sum",
                Difficulty::Easy,
                "Array",
                "Given an array of integers, return indices of two numbers that add up to a target.",
                49.2,
                (Linear, Linear),
                15,
            )
        },
        Problem {
            examples: vec![
                example("head = [1,2,3,4,5]", "[5,4,3,2,1]", None),
                example("head = [1,2]", "[2,1]", None),
            ],
            constraints: vec![
                "The number of nodes in the list is in the range [0, 5000].".into(),
                "-5000 ≤ Node.val ≤ 5000".into(),
            ],
            test_cases: vec![
                case("reverse-linked-list-1", "[1,2,3,4,5]\n", "[5,4,3,2,1]", false),
                case("reverse-linked-list-2", "[1,2]\n", "[2,1]", false),
                case("reverse-linked-list-3", "[]\n", "[]", true),
                case("reverse-linked-list-4", "[7]\n", "[7]", true),
            ],
            ..problem(
                "reverse-linked-list",
                "Reverse Linked List",
                Difficulty::Easy,
                "Linked List",
                "Given the head of a singly linked list, reverse the list and return the reversed list.",
                67.8,
                (Linear, Constant),
                20,
            )
        },
        Problem {
            examples: vec![example(
                "nums = [-2,1,-3,4,-1,2,1,-5,4]",
                "6",
                Some("The subarray [4,-1,2,1] has the largest sum 6."),
            )],
            constraints: vec![
                "1 ≤ nums.length ≤ 10⁵".into(),
                "-10⁴ ≤ nums[i] ≤ 10⁴".into(),
            ],
            test_cases: vec![
                case("maximum-subarray-1", "[-2,1,-3,4,-1,2,1,-5,4]\n", "6", false),
                case("maximum-subarray-2", "[1]\n", "1", false),
                case("maximum-subarray-3", "[5,4,-1,7,8]\n", "23", true),
                case("maximum-subarray-4", "[-3,-1,-2]\n", "-1", true),
            ],
            ..problem(
                "maximum-subarray",
                "Maximum Subarray",
                Difficulty::Medium,
                "Dynamic Programming",
                "Find the contiguous subarray with the largest sum and return its sum.",
                48.3,
                (Linear, Constant),
                15,
            )
        },
        Problem {
            examples: vec![
                example("s = \"()[]{}\"", "true", None),
                example("s = \"(]\"", "false", None),
            ],
            constraints: vec![
                "1 ≤ s.length ≤ 10⁴".into(),
                "s consists of parentheses only '()[]{}'.".into(),
            ],
            test_cases: vec![
                case("valid-parentheses-1", "\"()\"\n", "true", false),
                case("valid-parentheses-2", "\"()[]{}\"\n", "true", false),
                case("valid-parentheses-3", "\"(]\"\n", "false", false),
                case("valid-parentheses-4", "\"([)]\"\n", "false", true),
                case("valid-parentheses-5", "\"{[]}\"\n", "true", true),
            ],
            ..problem(
                "valid-parentheses",
                "Valid Parentheses",
                Difficulty::Easy,
                "Stack",
                "Given a string containing just the characters '(', ')', '{', '}', '[' and ']', determine if the input string is valid.",
                40.1,
                (Linear, Linear),
                20,
            )
        },
        Problem {
            examples: vec![
                example("s = \"babad\"", "\"bab\"", Some("\"aba\" is also a valid answer.")),
                example("s = \"cbbd\"", "\"bb\"", None),
            ],
            constraints: vec![
                "1 ≤ s.length ≤ 1000".into(),
                "s consist of only digits and English letters.".into(),
            ],
            test_cases: vec![
                case("longest-palindromic-substring-1", "\"cbbd\"\n", "bb", false),
                case("longest-palindromic-substring-2", "\"a\"\n", "a", false),
                case("longest-palindromic-substring-3", "\"forgeeksskeegfor\"\n", "geeksskeeg", true),
                case("longest-palindromic-substring-4", "\"racecar\"\n", "racecar", true),
            ],
            ..problem(
                "longest-palindromic-substring",
                "Longest Palindromic Substring",
                Difficulty::Medium,
                "String",
                "Given a string s, return the longest palindromic substring in s.",
                31.4,
                (Quadratic, Constant),
                30,
            )
        },
        Problem {
            examples: vec![example(
                "lists = [[1,4,5],[1,3,4],[2,6]]",
                "[1,1,2,3,4,4,5,6]",
                Some("Merging the three sorted lists yields one sorted list."),
            )],
            constraints: vec![
                "k == lists.length".into(),
                "0 ≤ k ≤ 10⁴".into(),
                "lists[i] is sorted in ascending order.".into(),
            ],
            test_cases: vec![
                case("merge-k-sorted-lists-1", "[[1,4,5],[1,3,4],[2,6]]\n", "[1,1,2,3,4,4,5,6]", false),
                case("merge-k-sorted-lists-2", "[]\n", "[]", false),
                case("merge-k-sorted-lists-3", "[[]]\n", "[]", true),
                case("merge-k-sorted-lists-4", "[[2],[1],[3]]\n", "[1,2,3]", true),
            ],
            ..problem(
                "merge-k-sorted-lists",
                "Merge k Sorted Lists",
                Difficulty::Hard,
                "Linked List",
                "You are given an array of k linked-lists lists, each linked-list is sorted in ascending order. Merge all the linked-lists into one sorted linked-list and return it.",
                43.8,
                (Linearithmic, Linear),
                35,
            )
        },
    ]
}
