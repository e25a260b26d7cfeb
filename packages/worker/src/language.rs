use serde::Deserialize;
use std::collections::BTreeMap;

/// How a language is compiled and run inside a sandbox.
///
/// Commands run with the scratch directory as working directory, so the
/// argv refers to `source_file` and build artifacts by relative path.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LanguageSpec {
    /// Identifier used by problems and submissions, e.g. "python".
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    /// File name the source code is written to.
    pub source_file: String,
    /// Compile or syntax-check step. A non-zero exit is a compile error.
    #[serde(default)]
    pub compile: Option<Vec<String>>,
    pub run: Vec<String>,
    /// Apply the memory ceiling as an address-space rlimit. Runtimes that
    /// reserve large virtual ranges up front (JVM, V8) must opt out.
    #[serde(default = "default_limit_address_space")]
    pub limit_address_space: bool,
}

fn default_limit_address_space() -> bool {
    true
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

impl LanguageSpec {
    pub fn requires_compile(&self) -> bool {
        self.compile.is_some()
    }
}

/// Table of known toolchains, keyed by language id.
#[derive(Debug, Clone, Default)]
pub struct Toolchains {
    specs: BTreeMap<String, LanguageSpec>,
}

impl Toolchains {
    pub fn new(specs: impl IntoIterator<Item = LanguageSpec>) -> Self {
        Self {
            specs: specs.into_iter().map(|s| (s.id.clone(), s)).collect(),
        }
    }

    /// The languages offered by the dashboard.
    pub fn builtin() -> Self {
        Self::new([
            LanguageSpec {
                id: "javascript".into(),
                display_name: "JavaScript".into(),
                source_file: "main.js".into(),
                compile: Some(argv(&["node", "--check", "main.js"])),
                run: argv(&["node", "main.js"]),
                limit_address_space: false,
            },
            LanguageSpec {
                id: "python".into(),
                display_name: "Python".into(),
                source_file: "main.py".into(),
                compile: Some(argv(&["python3", "-m", "py_compile", "main.py"])),
                run: argv(&["python3", "main.py"]),
                limit_address_space: true,
            },
            LanguageSpec {
                id: "java".into(),
                display_name: "Java".into(),
                source_file: "Main.java".into(),
                compile: Some(argv(&["javac", "Main.java"])),
                run: argv(&["java", "-Xss64m", "Main"]),
                limit_address_space: false,
            },
            LanguageSpec {
                id: "cpp".into(),
                display_name: "C++".into(),
                source_file: "main.cpp".into(),
                compile: Some(argv(&["g++", "-O2", "-std=c++17", "-o", "main", "main.cpp"])),
                run: argv(&["./main"]),
                limit_address_space: true,
            },
            LanguageSpec {
                id: "c".into(),
                display_name: "C".into(),
                source_file: "main.c".into(),
                compile: Some(argv(&["gcc", "-O2", "-std=c11", "-o", "main", "main.c", "-lm"])),
                run: argv(&["./main"]),
                limit_address_space: true,
            },
        ])
    }

    /// Replace or add toolchains. Later entries win.
    pub fn with_overrides(mut self, overrides: impl IntoIterator<Item = LanguageSpec>) -> Self {
        for spec in overrides {
            self.specs.insert(spec.id.clone(), spec);
        }
        self
    }

    pub fn get(&self, language: &str) -> Option<&LanguageSpec> {
        self.specs.get(language)
    }

    pub fn contains(&self, language: &str) -> bool {
        self.specs.contains_key(language)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }
}
