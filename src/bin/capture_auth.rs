//! Capture an auth-session snapshot by logging in once.
//!
//! Run this before the authenticated test flows; they skip when the
//! snapshot is missing. Credentials come from the config file or the
//! DCS_EMAIL / DCS_PASSWORD environment variables.

use anyhow::{bail, Context};
use clap::Parser;
use dcs_e2e::pages::{LoginPage, MyAccountPage};
use dcs_e2e::{AuthState, Harness, HarnessConfig};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "capture-auth")]
#[command(about = "Log in to the shop and save the auth-session snapshot")]
#[command(version)]
struct Cli {
    /// Harness config file
    #[arg(long, default_value = "configs/e2e.yaml")]
    config: PathBuf,

    /// Where to write the snapshot (defaults to the config's auth_state_file)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Run with a visible browser window
    #[arg(long)]
    headed: bool,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    let mut config = if cli.config.exists() {
        HarnessConfig::load(&cli.config)
            .with_context(|| format!("loading {}", cli.config.display()))?
    } else {
        HarnessConfig::default()
    };
    if cli.headed {
        config.browser.headless = false;
    }

    let Some(credentials) = config.resolved_credentials() else {
        bail!(
            "no credentials: set credentials in {} or export {}/{}",
            cli.config.display(),
            dcs_e2e::config::EMAIL_ENV,
            dcs_e2e::config::PASSWORD_ENV
        );
    };

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| config.auth_state_file.clone());

    println!("Logging in as {}", credentials.email);
    let harness = Harness::launch(config.clone()).await?;
    let page = harness.page().await?;

    let result = async {
        let login = LoginPage::open(&page, harness.config()).await?;
        login.login(&credentials).await?;

        let account = MyAccountPage::open(&page, harness.config()).await?;
        account.verify_logged_in().await?;

        let state = AuthState::capture(&page).await?;
        state.save(&output)?;
        Ok::<_, dcs_e2e::Error>(state)
    }
    .await;

    match &result {
        Ok(state) => {
            println!("✓ Auth snapshot saved to {}", output.display());
            println!("  Cookies: {}", state.cookies.len());
            println!(
                "  localStorage entries: {}",
                state
                    .origins
                    .iter()
                    .map(|o| o.local_storage.len())
                    .sum::<usize>()
            );
        }
        Err(e) => {
            println!("✗ Failed to capture auth state");
            println!("  Error: {}", e);
            let _ = harness.screenshot_on_failure(&page, "capture_auth").await;
        }
    }

    harness.close().await?;

    if result.is_err() {
        std::process::exit(1);
    }
    Ok(())
}
