//! # dcs-e2e
//!
//! End-to-end UI tests for the DogCatStar shop, driven through a real
//! Chrome via [`eoka`]. The library is the page-object layer: resilient
//! multi-strategy locators, bounded retry with rate-limit cooldown,
//! product-customization fallbacks and multi-heuristic cart verification.
//! The actual test flows live in `tests/`; the `capture-auth` binary
//! produces the auth snapshot that lets authenticated tests skip the
//! login flow.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dcs_e2e::{Harness, HarnessConfig, pages::CartPage};
//!
//! # #[tokio::main]
//! # async fn main() -> dcs_e2e::Result<()> {
//! let harness = Harness::launch(HarnessConfig::default()).await?;
//! let page = harness.page().await?;
//!
//! let cart = CartPage::open(&page, harness.config()).await?;
//! cart.go_to_cart().await?;
//! cart.verify_empty().await?;
//!
//! harness.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod customize;
pub mod harness;
pub mod locator;
pub mod pages;
pub mod retry;
pub mod session;

pub use config::HarnessConfig;
pub use harness::Harness;
pub use locator::{Hit, Locator};
pub use retry::{with_retry, RetryPolicy};
pub use session::AuthState;

// Re-export the browser backend types callers need.
pub use eoka::{Browser, Page, StealthConfig};

/// Result type for dcs-e2e operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving the site.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    /// A required locator resolved to nothing after exhausting every
    /// candidate. The message names the target and the candidate list.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// An interaction kept failing under the retry policy.
    #[error("{label} failed after {attempts} attempts: {source}")]
    ActionExhausted {
        label: String,
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    /// The cart-state verifier could not conclude; a diagnostic
    /// screenshot has been written by the time this surfaces.
    #[error("verification inconclusive: {0}")]
    VerificationInconclusive(String),

    #[error("assertion failed: {0}")]
    AssertionFailed(String),
}
