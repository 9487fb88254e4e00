//! Account page object — verifying that a session is actually logged
//! in, since an expired snapshot still lands on the account URL.

use crate::config::HarnessConfig;
use crate::harness;
use crate::{Error, Result};
use eoka::Page;
use tracing::{info, warn};

/// Content markers that only show up for a logged-in session.
pub const LOGIN_INDICATORS: &[&str] = &["登出", "logout", "我的帳戶", "my account"];

pub struct MyAccountPage<'a> {
    page: &'a Page,
    config: &'a HarnessConfig,
}

impl<'a> MyAccountPage<'a> {
    /// Navigate to the account page and wrap it.
    pub async fn open(page: &'a Page, config: &'a HarnessConfig) -> Result<Self> {
        page.goto(&config.account_url()).await?;
        let _ = page.wait_for_network_idle(500, 10_000).await;
        Ok(Self { page, config })
    }

    /// Wrap a page that is already on the account page.
    pub fn attach(page: &'a Page, config: &'a HarnessConfig) -> Self {
        Self { page, config }
    }

    /// Fail unless the current URL is the account page.
    pub async fn assert_on_account_page(&self) -> Result<()> {
        let url = self.page.url().await?;
        if !url.contains("my-account") {
            return Err(Error::AssertionFailed(format!(
                "not on the account page, URL: {}",
                url
            )));
        }
        Ok(())
    }

    /// Which login markers the page content currently carries.
    pub async fn logged_in_indicators(&self) -> Result<Vec<&'static str>> {
        let content: String = self
            .page
            .evaluate("document.documentElement.outerHTML")
            .await?;
        let lower = content.to_lowercase();
        Ok(LOGIN_INDICATORS
            .iter()
            .copied()
            .filter(|marker| lower.contains(&marker.to_lowercase()))
            .collect())
    }

    /// Verify the session is logged in. On failure writes a diagnostic
    /// screenshot — the usual cause is an expired auth snapshot.
    pub async fn verify_logged_in(&self) -> Result<Vec<&'static str>> {
        self.assert_on_account_page().await?;
        let found = self.logged_in_indicators().await?;
        if found.is_empty() {
            warn!("no login markers on the account page, auth snapshot likely expired");
            harness::save_screenshot(
                self.page,
                &self.config.results_dir,
                "login_status_check_failure.png",
            )
            .await?;
            return Err(Error::VerificationInconclusive(
                "no login markers found on the account page; refresh the auth snapshot".into(),
            ));
        }
        info!("login markers found: {:?}", found);
        Ok(found)
    }
}
