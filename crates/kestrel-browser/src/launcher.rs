use crate::{Error, Result};
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::handler::viewport::Viewport;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_WINDOW_SIZE: (u32, u32) = (1280, 800);

/// How Chrome is started for each session
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Explicit binary; discovered when unset
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    /// Pass `--no-sandbox`, needed when running as root in containers
    pub no_sandbox: bool,
    pub window_size: (u32, u32),
    /// Upper bound for a single DevTools request
    pub request_timeout: Duration,
    pub extra_args: Vec<String>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            no_sandbox: false,
            window_size: DEFAULT_WINDOW_SIZE,
            request_timeout: Duration::from_secs(30),
            extra_args: Vec::new(),
        }
    }
}

impl LaunchOptions {
    /// Chrome command-line arguments on top of what chromiumoxide passes
    pub fn chrome_args(&self) -> Vec<String> {
        let mut args = vec![
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            "--disable-extensions".to_string(),
            "--hide-scrollbars".to_string(),
            "--mute-audio".to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// Build the chromiumoxide launch configuration for one session
    pub fn browser_config(&self, chrome: &Path, profile_dir: &Path) -> Result<BrowserConfig> {
        let (width, height) = self.window_size;
        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome)
            .user_data_dir(profile_dir)
            .window_size(width, height)
            .viewport(Viewport {
                width,
                height,
                ..Viewport::default()
            })
            .request_timeout(self.request_timeout);

        if !self.headless {
            builder = builder.with_head();
        }
        if self.no_sandbox {
            builder = builder.no_sandbox();
        }
        for arg in self.chrome_args() {
            builder = builder.arg(arg);
        }

        builder
            .build()
            .map_err(|e| Error::Browser(format!("Invalid browser configuration: {}", e)))
    }
}
