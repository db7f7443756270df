use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A single action or assertion within a scenario
///
/// Steps are executed in order and later steps observe the page state left
/// behind by earlier ones, so every assertion needs a preceding `Navigate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Load a URL, absolute or relative to the base URL
    Navigate { url: String },

    /// The current page URL must equal `expected` (resolved against the base URL)
    AssertUrl { expected: String },

    /// An element with this accessible role and name must become visible
    AssertVisible {
        role: String,
        name: String,
        /// Require the normalised accessible name to match exactly
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        exact: bool,
    },

    /// Capture the rendered page as a PNG
    Screenshot { path: PathBuf },
}

impl Step {
    /// Action tag as written in scenario files
    pub fn action(&self) -> &'static str {
        match self {
            Step::Navigate { .. } => "navigate",
            Step::AssertUrl { .. } => "assert_url",
            Step::AssertVisible { .. } => "assert_visible",
            Step::Screenshot { .. } => "screenshot",
        }
    }

    /// Whether this step only makes sense once a page has been loaded
    pub fn requires_page(&self) -> bool {
        !matches!(self, Step::Navigate { .. })
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Navigate { url } => write!(f, "navigate {}", url),
            Step::AssertUrl { expected } => write!(f, "assert_url {}", expected),
            Step::AssertVisible { role, name, exact } => {
                write!(f, "assert_visible {} \"{}\"", role, name)?;
                if *exact {
                    write!(f, " (exact)")?;
                }
                Ok(())
            }
            Step::Screenshot { path } => write!(f, "screenshot {}", path.display()),
        }
    }
}

/// Locates an element by accessible role and accessible name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleQuery {
    pub role: String,
    pub name: String,
    pub exact: bool,
}

impl RoleQuery {
    pub fn new(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            name: name.into(),
            exact: false,
        }
    }

    pub fn exact(mut self) -> Self {
        self.exact = true;
        self
    }

    /// Check a computed accessible name against this query
    ///
    /// Whitespace runs collapse to a single space on both sides. Without
    /// `exact` the match is a case-insensitive substring match. Sessions
    /// collect the names of visible elements with the role and match them
    /// here, so every session applies the same rule.
    pub fn matches_name(&self, accessible_name: &str) -> bool {
        let want = normalize_whitespace(&self.name);
        let have = normalize_whitespace(accessible_name);

        if self.exact {
            have == want
        } else {
            have.to_lowercase().contains(&want.to_lowercase())
        }
    }
}

impl fmt::Display for RoleQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "role={} name=\"{}\"", self.role, self.name)
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
