//! Static cost model.
//!
//! Source text is reduced to a handful of structural signals after comments
//! and string literals are stripped. The model never executes or fully parses
//! the program; it is a heuristic for the common shapes of interview
//! solutions (nested loops, sorting, recursion, auxiliary collections).

use std::sync::LazyLock;

use common::ComplexityClass;
use regex::Regex;

/// Comment syntax and block structure of a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFamily {
    /// `#` comments, indentation blocks.
    Python,
    /// `//` and `/* */` comments, brace blocks.
    Braces,
}

impl SourceFamily {
    pub fn from_language(language: &str) -> Self {
        match language {
            "python" | "python3" | "pypy" => Self::Python,
            _ => Self::Braces,
        }
    }
}

macro_rules! regex {
    ($name:ident, $pattern:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($pattern).expect(concat!("invalid regex: ", stringify!($name))));
    };
}

regex!(LOOP_KEYWORD, r"\b(?:for|while|do)\b|\.(?:forEach|map|filter|reduce|some|every|flatMap)\s*\(");
regex!(
    SORT_CALL,
    r"\bsort(?:ed)?\s*\(|\.sort\s*\(|\bheapq\b|\bPriorityQueue\b|\bpriority_queue\b|\bqsort\s*\("
);
regex!(
    ALLOCATION,
    r"\bnew\s+\w+(?:<[^>]*>)?\s*[\[(]|\b(?:vector|unordered_map|unordered_set|map|set|deque|queue|stack|priority_queue|list)\s*<|\b(?:dict|set|list|defaultdict|Counter|deque)\s*\(|=\s*\[|=\s*\{\s*\}"
);
regex!(
    NESTED_ALLOCATION,
    r"vector\s*<\s*vector|new\s+\w+\s*\[[^\]]*\]\s*\[|\[\s*\[[^\]]*\]\s*\*|\]\s*for\s+\w+\s+in\b.*\]\s*for\b|Array\s*\([^)]*\)\s*\.fill\([^)]*\)\s*\.map"
);
regex!(
    HASH_LOOKUP,
    r"\b(?:Map|Set|HashMap|HashSet|LinkedHashMap|unordered_map|unordered_set|dict|defaultdict|Counter)\b|=\s*\{\s*\}|\bset\s*\("
);
regex!(
    VALIDATION,
    r"\bif\b[^\n]*(?:\bnot\b|!\s*[\w(]|\b(?:null|None|nullptr|undefined)\b|\blen\s*\(|\.length\b|\.size\s*\(\)|\.empty\s*\(\)|\.isEmpty\s*\(\)|[<>]=?\s*0\b|==\s*0\b)|\b(?:raise|throw)\b"
);
regex!(PY_DEF, r"(?m)^([ \t]*)def\s+([A-Za-z_]\w*)\s*\(");
regex!(
    BRACE_FN,
    r"\b([A-Za-z_]\w*)\s*\([^(){};]*\)\s*(?:const\s*)?(?:throws\s+[\w\s,.]+)?\{"
);
regex!(
    ARROW_FN,
    r"\b(?:const|let|var)\s+([A-Za-z_]\w*)\s*=\s*(?:async\s*)?(?:\([^()]*\)|[A-Za-z_]\w*)\s*=>\s*\{"
);
regex!(PY_ASSIGN, r"(?m)^[ \t]*([A-Za-z_]\w*)\s*=[^=]");
regex!(PY_FOR_TARGET, r"\bfor\s+([A-Za-z_]\w*)\s+in\b");
regex!(
    TYPED_DECL,
    r"\b(?:int|long|short|double|float|char|bool|boolean|auto|var|let|const|String|string|size_t)\s*[&*]?\s+([A-Za-z_]\w*)"
);

const NOT_FUNCTIONS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "function", "else", "do", "synchronized",
    "sizeof", "foreach",
];

/// Short names that are conventional and never count against naming.
const CONVENTIONAL_SHORT: &[&str] = &["i", "j", "k", "n", "m", "_"];

/// Structural signals extracted from a submission's source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeSignals {
    pub max_loop_depth: usize,
    pub sorts: bool,
    /// Most self-calls found in the body of any single function.
    pub self_calls: usize,
    pub allocates_collection: bool,
    pub nested_allocation: bool,
    pub hash_lookup: bool,
    pub has_validation: bool,
    pub has_comments: bool,
    /// Non-blank lines after comments are removed.
    pub code_lines: usize,
    pub declared_names: usize,
    pub short_names: usize,
}

impl CodeSignals {
    pub fn analyze(source: &str, language: &str) -> Self {
        let family = SourceFamily::from_language(language);
        let stripped = strip_comments_and_strings(source, family);
        let code = stripped.code.as_str();

        let (declared_names, short_names) = naming_counts(code, family);
        Self {
            max_loop_depth: match family {
                SourceFamily::Python => python_loop_depth(code),
                SourceFamily::Braces => brace_loop_depth(code),
            },
            sorts: SORT_CALL.is_match(code),
            self_calls: max_self_calls(code, family),
            allocates_collection: ALLOCATION.is_match(code),
            nested_allocation: NESTED_ALLOCATION.is_match(code),
            hash_lookup: HASH_LOOKUP.is_match(code),
            has_validation: VALIDATION.is_match(code),
            has_comments: stripped.has_comments,
            code_lines: code.lines().filter(|l| !l.trim().is_empty()).count(),
            declared_names,
            short_names,
        }
    }

    pub fn estimated_time(&self) -> ComplexityClass {
        let mut time = ComplexityClass::from_loop_depth(self.max_loop_depth);
        if self.self_calls >= 2 {
            time = ComplexityClass::Exponential;
        } else if self.self_calls == 1 {
            time = time.max(ComplexityClass::Linear);
        }
        if self.sorts {
            time = time.max(ComplexityClass::Linearithmic);
        }
        time
    }

    pub fn estimated_space(&self) -> ComplexityClass {
        let mut space = ComplexityClass::Constant;
        if self.allocates_collection {
            space = ComplexityClass::Linear;
        }
        if self.nested_allocation {
            space = ComplexityClass::Quadratic;
        }
        if self.self_calls > 0 {
            space = space.max(ComplexityClass::Linear);
        }
        space
    }

    /// At most a quarter of the declared names are unconventional single letters.
    pub fn descriptive_naming(&self) -> bool {
        self.declared_names > 0 && self.short_names * 4 <= self.declared_names
    }

    /// More than half of the declared names are unconventional single letters.
    pub fn cryptic_naming(&self) -> bool {
        self.short_names * 2 > self.declared_names
    }
}

#[derive(Debug)]
struct Stripped {
    code: String,
    has_comments: bool,
}

/// Remove comments and blank out string literal contents. Newlines are kept
/// so line-based measurements stay aligned with the original.
fn strip_comments_and_strings(source: &str, family: SourceFamily) -> Stripped {
    let chars: Vec<char> = source.chars().collect();
    let mut code = String::with_capacity(source.len());
    let mut has_comments = false;
    let mut i = 0;

    let skip_line = |i: &mut usize| {
        while *i < chars.len() && chars[*i] != '\n' {
            *i += 1;
        }
    };

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match (family, c, next) {
            (SourceFamily::Python, '#', _) | (SourceFamily::Braces, '/', Some('/')) => {
                has_comments = true;
                skip_line(&mut i);
            }
            (SourceFamily::Braces, '/', Some('*')) => {
                has_comments = true;
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    if chars[i] == '\n' {
                        code.push('\n');
                    }
                    i += 1;
                }
                i += 2;
            }
            (SourceFamily::Python, '"' | '\'', _)
                if next == Some(c) && chars.get(i + 2) == Some(&c) =>
            {
                // Triple-quoted block; a docstring documents like a comment.
                has_comments = true;
                i += 3;
                while i < chars.len()
                    && !(chars[i] == c && chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c))
                {
                    if chars[i] == '\n' {
                        code.push('\n');
                    }
                    i += 1;
                }
                i += 3;
                code.push_str("\"\"");
            }
            (_, '"' | '\'', _) | (SourceFamily::Braces, '`', _) => {
                i += 1;
                while i < chars.len() && chars[i] != c {
                    if chars[i] == '\n' {
                        // Unterminated literal; the newline stays in the code.
                        if c != '`' {
                            break;
                        }
                        code.push('\n');
                    } else if chars[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
                if chars.get(i) == Some(&c) {
                    i += 1;
                }
                code.push(c);
                code.push(c);
            }
            _ => {
                code.push(c);
                i += 1;
            }
        }
    }

    Stripped { code, has_comments }
}

fn count_loops(header: &str) -> usize {
    LOOP_KEYWORD.find_iter(header).count()
}

/// Loop nesting in brace languages. A scope opened after a loop header counts
/// as one level; a braceless loop body counts at the statement that ends it.
fn brace_loop_depth(code: &str) -> usize {
    let mut scopes: Vec<usize> = Vec::new();
    let mut header = String::new();
    let mut parens = 0i32;
    let mut max_depth = 0;

    for c in code.chars() {
        match c {
            '(' => {
                parens += 1;
                header.push(c);
            }
            ')' => {
                parens -= 1;
                header.push(c);
            }
            '{' => {
                scopes.push(count_loops(&header));
                max_depth = max_depth.max(scopes.iter().sum());
                header.clear();
            }
            '}' => {
                scopes.pop();
                header.clear();
            }
            ';' if parens <= 0 => {
                max_depth = max_depth.max(scopes.iter().sum::<usize>() + count_loops(&header));
                header.clear();
            }
            _ => header.push(c),
        }
    }
    max_depth
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// Loop nesting in Python: indentation blocks plus comprehension clauses.
fn python_loop_depth(code: &str) -> usize {
    let mut blocks: Vec<(usize, bool)> = Vec::new();
    let mut max_depth = 0;

    for line in code.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let indent = indent_width(line);
        while blocks.last().is_some_and(|(i, _)| *i >= indent) {
            blocks.pop();
        }

        let enclosing = blocks.iter().filter(|(_, is_loop)| *is_loop).count();
        let opens_loop = trimmed.starts_with("for ") || trimmed.starts_with("while ");
        let comprehensions = PY_FOR_TARGET
            .find_iter(trimmed)
            .count()
            .saturating_sub(opens_loop as usize);
        max_depth = max_depth.max(enclosing + opens_loop as usize + comprehensions);

        if trimmed.ends_with(':') {
            blocks.push((indent, opens_loop));
        }
    }
    max_depth
}

/// Index just past the brace matching the one at `open`.
fn matching_brace(code: &str, open: usize) -> usize {
    let mut depth = 0usize;
    for (offset, c) in code[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return open + offset + 1;
                }
            }
            _ => {}
        }
    }
    code.len()
}

fn calls_in(body: &str, name: &str) -> usize {
    match Regex::new(&format!(r"\b{}\s*\(", regex::escape(name))) {
        Ok(call) => call.find_iter(body).count(),
        Err(_) => 0,
    }
}

fn max_self_calls(code: &str, family: SourceFamily) -> usize {
    match family {
        SourceFamily::Python => {
            let lines: Vec<&str> = code.lines().collect();
            let mut best = 0;
            for (index, line) in lines.iter().enumerate() {
                let Some(caps) = PY_DEF.captures(line) else {
                    continue;
                };
                let def_indent = indent_width(&caps[1]);
                let body: Vec<&str> = lines[index + 1..]
                    .iter()
                    .take_while(|l| l.trim().is_empty() || indent_width(l) > def_indent)
                    .copied()
                    .collect();
                best = best.max(calls_in(&body.join("\n"), &caps[2]));
            }
            best
        }
        SourceFamily::Braces => {
            let mut best = 0;
            for caps in BRACE_FN.captures_iter(code).chain(ARROW_FN.captures_iter(code)) {
                let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                if NOT_FUNCTIONS.contains(&name.as_str()) {
                    continue;
                }
                let open = whole.end() - 1;
                let body = &code[open..matching_brace(code, open)];
                best = best.max(calls_in(body, name.as_str()));
            }
            best
        }
    }
}

fn naming_counts(code: &str, family: SourceFamily) -> (usize, usize) {
    let mut names: Vec<&str> = match family {
        SourceFamily::Python => PY_ASSIGN
            .captures_iter(code)
            .chain(PY_FOR_TARGET.captures_iter(code))
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect(),
        SourceFamily::Braces => TYPED_DECL
            .captures_iter(code)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect(),
    };
    names.sort_unstable();
    names.dedup();

    let short = names
        .iter()
        .filter(|n| n.len() == 1 && !CONVENTIONAL_SHORT.contains(n))
        .count();
    (names.len(), short)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PY_TWO_SUM: &str = r#"
import json

def two_sum(nums, target):
    # value -> index of values seen so far
    seen = {}
    for index, value in enumerate(nums):
        if value in seen:
            return [seen[value], index]
        seen[value] = index
    return []

nums = json.loads(input())
target = int(input())
print(json.dumps(two_sum(nums, target)))
"#;

    const CPP_BRUTE: &str = r#"
#include <bits/stdc++.h>
using namespace std;
int main() {
    vector<int> a; int t;
    for (int i = 0; i < (int)a.size(); i++) {
        for (int j = i + 1; j < (int)a.size(); j++) {
            if (a[i] + a[j] == t) { cout << "[" << i << "," << j << "]"; }
        }
    }
}
"#;

    #[test]
    fn test_strip_removes_comments_and_strings() {
        let stripped = strip_comments_and_strings(
            "int x = 1; // for (;;) {\n/* while */ s = \"for { }\";\n",
            SourceFamily::Braces,
        );
        assert!(stripped.has_comments);
        assert_eq!(stripped.code, "int x = 1; \n s = \"\";\n");

        let py = strip_comments_and_strings("x = '#'\n\"\"\"doc\nfor\"\"\"\n", SourceFamily::Python);
        assert_eq!(py.code, "x = ''\n\n\"\"\n");
        assert!(py.has_comments);
    }

    #[test]
    fn test_python_hash_map_solution() {
        let signals = CodeSignals::analyze(PY_TWO_SUM, "python");
        assert_eq!(signals.max_loop_depth, 1);
        assert!(signals.hash_lookup);
        assert!(signals.has_comments);
        assert_eq!(signals.self_calls, 0);
        assert_eq!(signals.estimated_time(), ComplexityClass::Linear);
        assert_eq!(signals.estimated_space(), ComplexityClass::Linear);
        assert!(signals.descriptive_naming());
    }

    #[test]
    fn test_nested_brace_loops_are_quadratic() {
        let signals = CodeSignals::analyze(CPP_BRUTE, "cpp");
        assert_eq!(signals.max_loop_depth, 2);
        assert!(!signals.has_comments);
        assert_eq!(signals.estimated_time(), ComplexityClass::Quadratic);
    }

    #[test]
    fn test_braceless_and_callback_loops() {
        assert_eq!(brace_loop_depth("for (i=0;i<n;i++) for (j=0;j<n;j++) s++;"), 2);
        assert_eq!(
            brace_loop_depth("nums.forEach((x) => { for (const y of nums) { total += x * y; } });"),
            2
        );
        assert_eq!(brace_loop_depth("if (x) { y(); } else { z(); }"), 0);
    }

    #[test]
    fn test_python_comprehension_counts_as_loop() {
        assert_eq!(python_loop_depth("grid = [[0 for c in row] for row in rows]\n"), 2);
        assert_eq!(
            python_loop_depth("while lo < hi:\n    for x in a:\n        pass\nreturn lo\n"),
            2
        );
    }

    #[test]
    fn test_double_recursion_is_exponential() {
        let js = "function fib(n) {\n  if (n < 2) return n;\n  return fib(n - 1) + fib(n - 2);\n}\nconsole.log(fib(10));\n";
        let signals = CodeSignals::analyze(js, "javascript");
        assert_eq!(signals.self_calls, 2);
        assert_eq!(signals.estimated_time(), ComplexityClass::Exponential);
        assert_eq!(signals.estimated_space(), ComplexityClass::Linear);

        let py = "def rev(xs):\n    if not xs:\n        return []\n    return rev(xs[1:]) + [xs[0]]\n\nprint(rev([1]))\n";
        let signals = CodeSignals::analyze(py, "python");
        assert_eq!(signals.self_calls, 1);
        assert!(signals.has_validation);
        assert_eq!(signals.estimated_time(), ComplexityClass::Linear);
    }

    #[test]
    fn test_sort_raises_time_to_linearithmic() {
        let signals = CodeSignals::analyze("nums.sort()\nprint(nums[0])\n", "python");
        assert_eq!(signals.max_loop_depth, 0);
        assert_eq!(signals.estimated_time(), ComplexityClass::Linearithmic);
    }

    #[test]
    fn test_cryptic_naming() {
        let signals = CodeSignals::analyze("int a = 1; int b = 2; int c = a + b; int total = c;", "cpp");
        assert_eq!(signals.declared_names, 4);
        assert_eq!(signals.short_names, 3);
        assert!(signals.cryptic_naming());
        assert!(!signals.descriptive_naming());
    }

    #[test]
    fn test_half_short_names_is_neither_cryptic_nor_descriptive() {
        let signals = CodeSignals::analyze(
            "int a = 1; int b = 2; int total = a + b; int count = total;",
            "cpp",
        );
        assert_eq!(signals.declared_names, 4);
        assert_eq!(signals.short_names, 2);
        assert!(!signals.cryptic_naming());
        assert!(!signals.descriptive_naming());
    }
}
