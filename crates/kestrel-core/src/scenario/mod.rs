mod loader;
mod step;

pub use loader::ScenarioLoader;
pub use step::{RoleQuery, Step};

use crate::error::ScenarioError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// A named, ordered list of verification steps
///
/// Scenarios are validated on construction and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawScenario")]
pub struct Scenario {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    steps: Vec<Step>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawScenario {
    name: String,
    description: Option<String>,
    steps: Vec<Step>,
}

impl TryFrom<RawScenario> for Scenario {
    type Error = ScenarioError;

    fn try_from(raw: RawScenario) -> Result<Self, Self::Error> {
        let scenario = Scenario::new(raw.name, raw.steps)?;
        Ok(match raw.description {
            Some(description) => scenario.with_description(description),
            None => scenario,
        })
    }
}

impl Scenario {
    /// Build a scenario, rejecting structurally invalid step lists
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Result<Self, ScenarioError> {
        let name = name.into();
        validate_name(&name)?;

        if steps.is_empty() {
            return Err(ScenarioError::NoSteps(name));
        }

        let mut navigated = false;
        for (index, step) in steps.iter().enumerate() {
            validate_fields(&name, index, step)?;

            if step.requires_page() && !navigated {
                return Err(ScenarioError::StepBeforeNavigate {
                    scenario: name,
                    index,
                    action: step.action(),
                });
            }
            if matches!(step, Step::Navigate { .. }) {
                navigated = true;
            }
        }

        Ok(Self {
            name,
            description: None,
            steps,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Screenshot paths written by this scenario, in step order
    pub fn screenshot_paths(&self) -> impl Iterator<Item = &Path> {
        self.steps.iter().filter_map(|step| match step {
            Step::Screenshot { path } => Some(path.as_path()),
            _ => None,
        })
    }
}

fn validate_name(name: &str) -> Result<(), ScenarioError> {
    if name.trim().is_empty() {
        return Err(ScenarioError::EmptyName);
    }

    let valid = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if !valid {
        return Err(ScenarioError::InvalidName(name.to_string()));
    }

    Ok(())
}

fn validate_fields(scenario: &str, index: usize, step: &Step) -> Result<(), ScenarioError> {
    let empty = |field: &'static str| ScenarioError::EmptyField {
        scenario: scenario.to_string(),
        index,
        field,
    };

    match step {
        Step::Navigate { url } if url.trim().is_empty() => Err(empty("url")),
        Step::AssertUrl { expected } if expected.trim().is_empty() => Err(empty("expected")),
        Step::AssertVisible { role, .. } if role.trim().is_empty() => Err(empty("role")),
        Step::AssertVisible { name, .. } if name.trim().is_empty() => Err(empty("name")),
        Step::Screenshot { path } if path.as_os_str().is_empty() => Err(empty("path")),
        _ => Ok(()),
    }
}

/// The scenarios of one run, checked for collisions between them
#[derive(Debug, Clone)]
pub struct ScenarioSet {
    scenarios: Vec<Scenario>,
}

impl ScenarioSet {
    /// Validate that names are unique and no two scenarios write the same
    /// screenshot once paths are resolved against `artifacts_dir`
    pub fn new(scenarios: Vec<Scenario>, artifacts_dir: &Path) -> Result<Self, ScenarioError> {
        let mut names: HashSet<&str> = HashSet::new();
        let mut artifacts: HashMap<PathBuf, &str> = HashMap::new();

        for scenario in &scenarios {
            if !names.insert(scenario.name()) {
                return Err(ScenarioError::DuplicateName(scenario.name().to_string()));
            }

            for path in scenario.screenshot_paths() {
                let resolved = crate::config::resolve_artifact(artifacts_dir, path);
                if let Some(first) = artifacts.insert(resolved.clone(), scenario.name()) {
                    return Err(ScenarioError::DuplicateArtifact {
                        path: resolved.display().to_string(),
                        first: first.to_string(),
                        second: scenario.name().to_string(),
                    });
                }
            }
        }

        Ok(Self { scenarios })
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    pub fn into_inner(self) -> Vec<Scenario> {
        self.scenarios
    }
}
