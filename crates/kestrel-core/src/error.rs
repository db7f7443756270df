use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read scenario file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML scenario: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON scenario: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid scenario: {0}")]
    Scenario(#[from] ScenarioError),

    #[error("Invalid URL '{url}': {source}")]
    Url {
        url: String,
        source: url::ParseError,
    },

    #[error("Invalid scenario pattern: {0}")]
    Pattern(String),

    #[error("{}: {source}", path.display())]
    File {
        path: PathBuf,
        source: Box<Error>,
    },
}

/// Structural problems found while building a scenario or a run plan
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScenarioError {
    #[error("scenario name must not be empty")]
    EmptyName,

    #[error("scenario name '{0}' may only contain letters, digits, '.', '_' and '-'")]
    InvalidName(String),

    #[error("scenario '{0}' has no steps")]
    NoSteps(String),

    #[error("scenario '{scenario}' step {index}: {action} before any navigate step")]
    StepBeforeNavigate {
        scenario: String,
        index: usize,
        action: &'static str,
    },

    #[error("scenario '{scenario}' step {index}: '{field}' must not be empty")]
    EmptyField {
        scenario: String,
        index: usize,
        field: &'static str,
    },

    #[error("scenario name '{0}' is used more than once")]
    DuplicateName(String),

    #[error("screenshot path '{path}' is written by both '{first}' and '{second}'")]
    DuplicateArtifact {
        path: String,
        first: String,
        second: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
