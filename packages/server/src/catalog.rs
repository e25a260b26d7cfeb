use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, ensure};
use async_trait::async_trait;
use common::{Catalog, CatalogError, Problem};
use serde::Deserialize;

use crate::seed;

/// Catalog file layout: a list of `[[problems]]` tables.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    problems: Vec<Problem>,
}

/// Immutable, in-process problem store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    problems: BTreeMap<String, Arc<Problem>>,
}

impl InMemoryCatalog {
    pub fn new(problems: impl IntoIterator<Item = Problem>) -> anyhow::Result<Self> {
        let mut map = BTreeMap::new();
        for problem in problems {
            validate(&problem)?;
            let id = problem.id.clone();
            ensure!(
                map.insert(id.clone(), Arc::new(problem)).is_none(),
                "duplicate problem id '{id}'"
            );
        }
        Ok(Self { problems: map })
    }

    /// The built-in challenge library.
    pub fn seeded() -> Self {
        let problems = seed::problems()
            .into_iter()
            .map(|p| (p.id.clone(), Arc::new(p)))
            .collect();
        Self { problems }
    }

    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let file: CatalogFile = toml::from_str(text).context("Failed to parse catalog")?;
        Self::new(file.problems)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("Invalid catalog file {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }
}

fn validate(problem: &Problem) -> anyhow::Result<()> {
    ensure!(!problem.id.trim().is_empty(), "problem id must not be empty");
    ensure!(
        !problem.supported_languages.is_empty(),
        "problem '{}' declares no supported languages",
        problem.id
    );
    let mut seen = HashSet::new();
    for case in &problem.test_cases {
        ensure!(
            seen.insert(case.id.as_str()),
            "problem '{}' has duplicate test case id '{}'",
            problem.id,
            case.id
        );
        ensure!(
            case.weight > 0,
            "test case '{}' of problem '{}' must have a positive weight",
            case.id,
            problem.id
        );
    }
    Ok(())
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn get_problem(&self, problem_id: &str) -> Result<Arc<Problem>, CatalogError> {
        self.problems
            .get(problem_id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(problem_id.to_string()))
    }

    async fn list_problems(&self) -> Vec<Arc<Problem>> {
        self.problems.values().cloned().collect()
    }
}
