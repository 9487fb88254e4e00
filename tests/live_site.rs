//! Live flows against the production shop: login, auth status, cart
//! verification, catalog navigation and the full add-and-clear loop.
//!
//! These tests require Chrome and network access to the shop.
//! Run with: cargo test --test live_site -- --ignored
//!
//! Authenticated flows skip when the auth snapshot is missing — run
//! `capture-auth` (or the login test below with DCS_EMAIL/DCS_PASSWORD
//! exported) to produce it.

use dcs_e2e::pages::{CartPage, LoginPage, MyAccountPage};
use dcs_e2e::{AuthState, Harness, HarnessConfig};
use std::path::Path;

/// Check if Chrome is available
fn chrome_available() -> bool {
    eoka::stealth::patcher::find_chrome().is_ok()
}

fn test_config() -> HarnessConfig {
    if Path::new("configs/e2e.yaml").exists() {
        HarnessConfig::load("configs/e2e.yaml").expect("configs/e2e.yaml must parse")
    } else {
        HarnessConfig::default()
    }
}

#[tokio::test]
#[ignore = "requires Chrome and network"]
async fn login_with_email_and_password_saves_auth_state() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }
    let config = test_config();
    let Some(credentials) = config.resolved_credentials() else {
        eprintln!("no credentials configured (DCS_EMAIL/DCS_PASSWORD), skipping test");
        return;
    };

    let harness = Harness::launch(config).await.expect("Failed to launch");
    let page = harness.page().await.expect("Failed to create page");

    let result = async {
        let login = LoginPage::open(&page, harness.config()).await?;
        login.login(&credentials).await?;

        let state = AuthState::capture(&page).await?;
        state.save(&harness.config().auth_state_file)?;
        Ok::<_, dcs_e2e::Error>(())
    }
    .await;

    if result.is_err() {
        let _ = harness.screenshot_on_failure(&page, "login_flow").await;
    }
    result.expect("login flow failed");

    let snapshot = &harness.config().auth_state_file;
    assert!(snapshot.exists(), "auth snapshot was not written");
    let size = std::fs::metadata(snapshot).expect("snapshot metadata").len();
    assert!(size > 100, "auth snapshot suspiciously small: {} bytes", size);

    harness.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome and network"]
async fn saved_auth_state_reaches_account_page() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }
    let harness = Harness::launch(test_config()).await.expect("Failed to launch");
    let Some(page) = harness
        .authenticated_page()
        .await
        .expect("Failed to seed auth page")
    else {
        eprintln!(
            "auth snapshot not found at {}, skipping test",
            harness.config().auth_state_file.display()
        );
        return;
    };

    let result = async {
        let account = MyAccountPage::open(&page, harness.config()).await?;
        let markers = account.verify_logged_in().await?;
        assert!(!markers.is_empty());
        Ok::<_, dcs_e2e::Error>(())
    }
    .await;

    result.expect("auth state is stale or invalid");
    harness.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome and network"]
async fn cart_page_loads_when_authenticated() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }
    let harness = Harness::launch(test_config()).await.expect("Failed to launch");
    let Some(page) = harness
        .authenticated_page()
        .await
        .expect("Failed to seed auth page")
    else {
        eprintln!(
            "auth snapshot not found at {}, skipping test",
            harness.config().auth_state_file.display()
        );
        return;
    };

    {
        let cart = CartPage::attach(&page, harness.config());
        cart.goto_cart_page().await.expect("cart page failed to load");

        let url = page.url().await.expect("url");
        let title = page.title().await.expect("title");
        assert!(!title.is_empty(), "cart page title is empty");
        println!("cart page loaded: {} ('{}')", url, title);
    }

    harness.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome and network"]
async fn navigate_to_cat_section() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }
    let harness = Harness::launch(test_config()).await.expect("Failed to launch");
    let page = harness.page().await.expect("Failed to create page");

    {
        let cart = CartPage::attach(&page, harness.config());
        cart.goto_cat_section().await.expect("cat section failed to load");

        let url = page.url().await.expect("url");
        assert!(
            url.contains("cat") && url.contains("product"),
            "not on the cat section, URL: {}",
            url
        );

        let title = page.title().await.expect("title");
        assert!(!title.is_empty(), "page title is empty");

        let content: String = page
            .evaluate("document.documentElement.outerHTML")
            .await
            .expect("content");
        assert!(content.len() > 1000, "cat section page has no content");
    }

    harness.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome and network"]
async fn empty_cart_verifies_on_fresh_session() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }
    let harness = Harness::launch(test_config()).await.expect("Failed to launch");
    let page = harness.page().await.expect("Failed to create page");

    let result = async {
        let cart = CartPage::attach(&page, harness.config());
        cart.goto_cart_page().await?;
        cart.verify_empty().await
    }
    .await;

    if result.is_err() {
        let _ = harness.screenshot_on_failure(&page, "empty_cart_initially").await;
    }
    result.expect("fresh session cart should verify empty");

    harness.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome and network"]
async fn header_user_link_reaches_account_page() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }
    let harness = Harness::launch(test_config()).await.expect("Failed to launch");
    let page = harness.page().await.expect("Failed to create page");

    let result = async {
        let cart = CartPage::open(&page, harness.config()).await?;
        cart.go_to_cart().await?;
        cart.go_to_user().await?;
        page.wait_for_url_contains("my-account", 10_000).await?;
        Ok::<_, dcs_e2e::Error>(())
    }
    .await;

    if result.is_err() {
        let _ = harness
            .screenshot_on_failure(&page, "navigate_to_user_page")
            .await;
    }
    result.expect("header navigation to the account page failed");

    harness.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome and network"]
async fn complete_shopping_flow_keeps_session() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }
    let harness = Harness::launch(test_config()).await.expect("Failed to launch");
    let Some(page) = harness
        .authenticated_page()
        .await
        .expect("Failed to seed auth page")
    else {
        eprintln!(
            "auth snapshot not found at {}, skipping test",
            harness.config().auth_state_file.display()
        );
        return;
    };

    let result = async {
        let cart = CartPage::attach(&page, harness.config());

        // Step 1: the session must reach the account page.
        cart.goto_account_page().await?;
        let account = MyAccountPage::attach(&page, harness.config());
        account.assert_on_account_page().await?;

        // Step 2: cart page loads without dropping the session.
        cart.goto_cart_page().await?;

        // Step 3: cat section loads without dropping the session.
        cart.goto_cat_section().await?;
        let url = page.url().await?;
        if !(url.contains("cat") && url.contains("product")) {
            return Err(dcs_e2e::Error::AssertionFailed(format!(
                "not on the cat section, URL: {}",
                url
            )));
        }

        // Step 4: the listing actually rendered.
        let title = page.title().await?;
        if title.is_empty() {
            return Err(dcs_e2e::Error::AssertionFailed("page title is empty".into()));
        }
        Ok::<_, dcs_e2e::Error>(())
    }
    .await;

    if result.is_err() {
        let _ = harness
            .screenshot_on_failure(&page, "complete_shopping_flow")
            .await;
    }
    result.expect("shopping flow failed");

    harness.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome and network"]
async fn add_first_product_then_clear_cart() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }
    let harness = Harness::launch(test_config()).await.expect("Failed to launch");
    let Some(page) = harness
        .authenticated_page()
        .await
        .expect("Failed to seed auth page")
    else {
        eprintln!(
            "auth snapshot not found at {}, skipping test",
            harness.config().auth_state_file.display()
        );
        return;
    };

    let result = async {
        let cart = CartPage::attach(&page, harness.config());

        cart.goto_account_page().await?;
        let account = MyAccountPage::attach(&page, harness.config());
        account.assert_on_account_page().await?;

        cart.goto_cat_section().await?;
        let info = cart.add_first_product_to_cart().await?;
        println!("added: {} ({})", info.name, info.price);

        cart.goto_cart_page().await?;
        let present = cart.is_item_present(&info.name).await?;
        let count = cart.cart_items_count().await?;
        println!("cart check: present={}, items={}", present, count);
        if !present && count == 0 {
            return Err(dcs_e2e::Error::AssertionFailed(format!(
                "'{}' did not reach the cart",
                info.name
            )));
        }

        let removed = cart.clear_cart().await?;
        println!("cleared {} item(s)", removed);
        let remaining = cart.cart_items_count().await?;
        println!("remaining items: {}", remaining);
        Ok::<_, dcs_e2e::Error>(())
    }
    .await;

    if result.is_err() {
        let _ = harness
            .screenshot_on_failure(&page, "add_product_and_clear_cart")
            .await;
    }
    result.expect("add-and-clear flow failed");

    harness.close().await.expect("Failed to close browser");
}
