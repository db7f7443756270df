use crate::Result;
use std::path::Path;
use tempfile::TempDir;

/// Throwaway Chrome user-data directory, one per session
///
/// Every scenario starts without cookies, storage or cache left behind by an
/// earlier one. The directory is removed when the profile is dropped.
pub struct ScratchProfile {
    dir: TempDir,
}

impl ScratchProfile {
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("kestrel-profile-")
            .tempdir()?;
        tracing::debug!("Created scratch profile at {}", dir.path().display());

        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
