use kestrel_core::SessionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// No session could be acquired, so the scenario never started
    #[error("Infrastructure error in scenario '{scenario}': {source}")]
    Infrastructure {
        scenario: String,
        #[source]
        source: SessionError,
    },
}

impl Error {
    pub fn scenario(&self) -> &str {
        match self {
            Error::Infrastructure { scenario, .. } => scenario,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
