//! Headless Chrome sessions for Kestrel, driven through chromiumoxide

mod cdp_session;
mod chrome_finder;
mod error;
mod launcher;
mod profile;
mod provider;

pub use cdp_session::ChromiumSession;
pub use chrome_finder::ChromeFinder;
pub use error::{Error, Result};
pub use launcher::LaunchOptions;
pub use profile::ScratchProfile;
pub use provider::ChromiumProvider;
