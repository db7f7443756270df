pub mod config;
pub mod error;
pub mod report;
pub mod scenario;
pub mod session;

pub use config::ExecutorConfig;
pub use error::{Error, Result, ScenarioError};
pub use report::{
    FailureKind, RunState, ScenarioReport, StepFailure, StepOutcome, StepResult, Verdict,
};
pub use scenario::{RoleQuery, Scenario, ScenarioLoader, ScenarioSet, Step};
pub use session::{BrowserSession, SessionError, SessionProvider, SessionResult};
