//! Test harness — browser/page lifecycle and failure diagnostics.
//!
//! Each test owns one harness: one browser, fresh pages on demand,
//! nothing shared with concurrently running tests. Authenticated pages
//! are seeded from the auth snapshot; when the snapshot file is absent
//! the harness reports `None` and the test skips with a message naming
//! the missing path.

use crate::config::HarnessConfig;
use crate::session::AuthState;
use crate::Result;
use eoka::{Browser, Page, StealthConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Write a screenshot of the page into `dir`, creating it as needed.
pub async fn save_screenshot(page: &Page, dir: &Path, filename: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let file = dir.join(filename);
    let data = page.screenshot().await?;
    std::fs::write(&file, data)?;
    warn!("screenshot saved: {}", file.display());
    Ok(file)
}

/// Owns the browser for one test.
pub struct Harness {
    config: HarnessConfig,
    browser: Browser,
}

impl Harness {
    /// Launch a browser per the config and prepare the results dir.
    pub async fn launch(config: HarnessConfig) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.results_dir)?;

        let stealth = StealthConfig {
            headless: config.browser.headless,
            viewport_width: config.browser.viewport.as_ref().map(|v| v.width).unwrap_or(1280),
            viewport_height: config.browser.viewport.as_ref().map(|v| v.height).unwrap_or(720),
            ..Default::default()
        };

        debug!("launching browser (headless: {})", config.browser.headless);
        let browser = Browser::launch_with_config(stealth).await?;
        Ok(Self { config, browser })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// A fresh blank page. Every test flow re-resolves its locators on
    /// the page it owns; pages are never reused across tests.
    pub async fn page(&self) -> Result<Page> {
        Ok(self.browser.new_page("about:blank").await?)
    }

    /// A fresh page seeded from the auth snapshot. `Ok(None)` when the
    /// snapshot file is absent — the caller should skip, not fail.
    pub async fn authenticated_page(&self) -> Result<Option<Page>> {
        let path = &self.config.auth_state_file;
        let Some(state) = AuthState::load(path)? else {
            info!("auth state not found at {}, dependent test should skip", path.display());
            return Ok(None);
        };
        if state.is_empty() {
            warn!("auth state at {} is empty", path.display());
        }
        let page = self.page().await?;
        state.apply(&page).await?;
        Ok(Some(page))
    }

    /// Write a diagnostic screenshot for a failed step. The filename
    /// carries a timestamp so reruns don't clobber earlier evidence.
    pub async fn screenshot_on_failure(&self, page: &Page, test_name: &str) -> Result<PathBuf> {
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        save_screenshot(
            page,
            &self.config.results_dir,
            &format!("{}_{}_failure.png", test_name, stamp),
        )
        .await
    }

    /// Close the browser.
    pub async fn close(self) -> Result<()> {
        self.browser.close().await?;
        Ok(())
    }
}
