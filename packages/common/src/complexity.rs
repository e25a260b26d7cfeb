use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Asymptotic growth class in big-O notation.
///
/// Ordering follows growth rate, so `Linear < Quadratic` and any polynomial
/// class sorts below `Exponential`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ComplexityClass {
    Constant,
    Logarithmic,
    Linear,
    Linearithmic,
    Quadratic,
    Cubic,
    /// `O(n^k)` for k >= 4.
    Polynomial(u8),
    Exponential,
}

impl ComplexityClass {
    /// Class of `depth` nested linear loops.
    pub fn from_loop_depth(depth: usize) -> Self {
        match depth {
            0 => Self::Constant,
            1 => Self::Linear,
            2 => Self::Quadratic,
            3 => Self::Cubic,
            k => Self::Polynomial(u8::try_from(k).unwrap_or(u8::MAX)),
        }
    }

    /// Returns true if `self` grows no faster than `reference`.
    pub fn within(&self, reference: &ComplexityClass) -> bool {
        self <= reference
    }
}

impl fmt::Display for ComplexityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant => f.write_str("O(1)"),
            Self::Logarithmic => f.write_str("O(log n)"),
            Self::Linear => f.write_str("O(n)"),
            Self::Linearithmic => f.write_str("O(n log n)"),
            Self::Quadratic => f.write_str("O(n^2)"),
            Self::Cubic => f.write_str("O(n^3)"),
            Self::Polynomial(k) => write!(f, "O(n^{k})"),
            Self::Exponential => f.write_str("O(2^n)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized complexity '{0}', expected big-O notation such as O(n log n)")]
pub struct ParseComplexityError(String);

impl FromStr for ComplexityClass {
    type Err = ParseComplexityError;

    /// Accepts the common spellings used in problem statements:
    /// `O(1)`, `O(log n)`, `O(n)`, `O(n log k)`, `O(n^2)`, `O(n²)`, `O(2^n)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        let inner = compact
            .strip_prefix("o(")
            .and_then(|rest| rest.strip_suffix(')'))
            .unwrap_or(&compact);

        let class = match inner {
            "1" => Self::Constant,
            "n" | "k" | "m" | "m+n" | "n+m" => Self::Linear,
            "n^2" | "n²" | "n*n" => Self::Quadratic,
            "n^3" | "n³" => Self::Cubic,
            "2^n" => Self::Exponential,
            other if other.starts_with("log") => Self::Logarithmic,
            other if other.starts_with("nlog") => Self::Linearithmic,
            other => match other.strip_prefix("n^").and_then(|k| k.parse::<u8>().ok()) {
                Some(k) => Self::from_loop_depth(k as usize),
                None => return Err(ParseComplexityError(s.to_string())),
            },
        };
        Ok(class)
    }
}

impl TryFrom<String> for ComplexityClass {
    type Error = ParseComplexityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ComplexityClass> for String {
    fn from(value: ComplexityClass) -> Self {
        value.to_string()
    }
}
