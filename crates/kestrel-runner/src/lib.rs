pub mod error;
pub mod executor;
pub mod guard;
pub mod reporter;

pub use error::{Error, Result};
pub use executor::{Executor, RunSummary};
pub use guard::SessionGuard;
pub use reporter::{ExitStatus, ReportFormat, Reporter};
