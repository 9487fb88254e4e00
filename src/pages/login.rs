//! Login page object — the shop's two-phase email/password flow.
//!
//! The flow is: "use email login" → email → 確認 → "use password" →
//! password → 確認. The two 確認 buttons coexist in the DOM, so the
//! password confirmation targets the second occurrence.

use crate::config::{Credentials, HarnessConfig};
use crate::locator::{self, Locator};
use crate::{Error, Result};
use eoka::Page;
use tracing::info;

pub struct LoginPage<'a> {
    page: &'a Page,
    config: &'a HarnessConfig,
}

impl<'a> LoginPage<'a> {
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

    /// Click the "use email login" entry button.
    pub async fn start_email_login(&self) -> Result<()> {
        let chain = [
            Locator::role("button", "使用 Email 登入"),
            Locator::has_text("button", "Email"),
        ];
        let hit = locator::require(self.page, &chain, "email login button").await?;
        self.page.click(&hit.selector).await?;
        self.settle().await;
        Ok(())
    }

    /// Fill the email field.
    pub async fn enter_email(&self, email: &str) -> Result<()> {
        let chain = [
            Locator::css("input[type='email']"),
            Locator::role("textbox", "請輸入"),
        ];
        let hit = locator::require(self.page, &chain, "email input").await?;
        self.page.fill(&hit.selector, email).await?;
        Ok(())
    }

    /// Click the first 確認 button (confirms the email).
    pub async fn confirm_email(&self) -> Result<()> {
        self.click_confirm(0).await?;
        self.settle().await;
        Ok(())
    }

    /// Switch to the password variant of the flow.
    pub async fn switch_to_password(&self) -> Result<()> {
        let chain = [
            Locator::role("button", "密碼登入"),
            Locator::has_text("button", "密碼"),
        ];
        let hit = locator::require(self.page, &chain, "password login button").await?;
        self.page.click(&hit.selector).await?;
        self.settle().await;
        Ok(())
    }

    /// Fill the password field.
    pub async fn enter_password(&self, password: &str) -> Result<()> {
        let chain = [
            Locator::css("input[type='password']"),
            Locator::css("input[placeholder*='密碼'], input[placeholder*='輸入']"),
        ];
        let hit = locator::require(self.page, &chain, "password input").await?;
        self.page.fill(&hit.selector, password).await?;
        Ok(())
    }

    /// Click the second 確認 button and wait for the account page.
    pub async fn confirm_password(&self) -> Result<()> {
        self.click_confirm(1).await?;
        self.page
            .wait_for_url_contains(&self.config.account_path, 30_000)
            .await?;
        Ok(())
    }

    /// Run the whole login flow.
    pub async fn login(&self, credentials: &Credentials) -> Result<()> {
        info!("logging in as {}", credentials.email);
        self.start_email_login().await?;
        self.enter_email(&credentials.email).await?;
        self.confirm_email().await?;
        self.switch_to_password().await?;
        self.enter_password(&credentials.password).await?;
        self.confirm_password().await?;
        info!("login complete: {}", self.page.url().await?);
        Ok(())
    }

    /// Click the nth 確認 button, falling back to the last one when the
    /// DOM holds fewer occurrences than expected.
    async fn click_confirm(&self, nth: usize) -> Result<()> {
        let hits = locator::resolve_all(self.page, &Locator::has_text("button", "確認")).await?;
        let hit = hits
            .get(nth)
            .or_else(|| hits.last())
            .ok_or_else(|| Error::ElementNotFound("確認 button".into()))?;
        self.page.click(&hit.selector).await?;
        Ok(())
    }

    async fn settle(&self) {
        let _ = self.page.wait_for_network_idle(300, 3_000).await;
    }
}
