//! Cart/catalog page object — navigation, product selection,
//! add-to-cart with customization fallback, cart clearing and the
//! multi-heuristic empty-cart verifier.

use crate::config::HarnessConfig;
use crate::customize;
use crate::harness;
use crate::locator::{self, Locator};
use crate::retry::{self, with_retry};
use crate::{Error, Result};
use eoka::Page;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Empty-cart phrasing in visible text, Chinese or English.
const EMPTY_CART_PATTERN: &str = "(?i)購物車.*空|cart.*empty";

/// Known empty-cart phrases checked against raw page content.
const EMPTY_CART_PHRASES: &[&str] = &["購物車中沒有商品", "your cart is empty", "cart is empty"];

/// Dedicated empty-cart marker element.
const EMPTY_CART_MARKER: &str = "[data-testid=\"paper-cart-empty\"]";

/// Containers the verifier treats as cart items.
const CART_ITEM_CONTAINERS: &str = "[class*=\"cart-item\"], [class*=\"product-item\"]";

/// Containers counted by `cart_items_count`.
const CART_ITEM_ROWS: &str = "[class*=\"cart-item\"], tr[class*=\"item\"]";

fn empty_cart_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(EMPTY_CART_PATTERN).expect("static pattern"))
}

/// Read-only snapshot of a listed product. Re-reading may yield
/// different values if the DOM changed; nothing is cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInfo {
    pub name: String,
    pub price: String,
}

/// Verdict of the empty-cart cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CartAssessment {
    Empty(&'static str),
    HasItems(usize),
}

/// The ordered heuristic cascade, first conclusive signal wins. There
/// is no guess branch: a page that shows item containers and no empty
/// signal counts as having items, and `verify_empty` fails closed.
pub(crate) fn assess_cart(
    visible_text: &str,
    has_empty_marker: bool,
    item_count: usize,
    raw_content: &str,
) -> CartAssessment {
    if empty_cart_re().is_match(visible_text) {
        return CartAssessment::Empty("empty-cart text visible");
    }
    if has_empty_marker {
        return CartAssessment::Empty("empty-cart marker element");
    }
    if item_count == 0 {
        return CartAssessment::Empty("no cart-item containers");
    }
    let lower = raw_content.to_lowercase();
    if EMPTY_CART_PHRASES.iter().any(|p| lower.contains(&p.to_lowercase())) {
        return CartAssessment::Empty("empty phrase in raw content");
    }
    CartAssessment::HasItems(item_count)
}

pub struct CartPage<'a> {
    page: &'a Page,
    config: &'a HarnessConfig,
}

impl<'a> CartPage<'a> {
    /// Navigate to the site root and wrap the page.
    pub async fn open(page: &'a Page, config: &'a HarnessConfig) -> Result<Self> {
        let cart = Self::attach(page, config);
        cart.navigate(&config.home_url(), "open home page").await?;
        Ok(cart)
    }

    /// Wrap a page without navigating.
    pub fn attach(page: &'a Page, config: &'a HarnessConfig) -> Self {
        Self { page, config }
    }

    pub fn page(&self) -> &Page {
        self.page
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Navigate with retry and rate-limit recovery.
    async fn navigate(&self, url: &str, label: &str) -> Result<()> {
        let policy = self.config.retry_policy();
        let page = self.page;
        with_retry(&policy, label, move || async move {
            page.goto(url).await?;
            Ok(())
        })
        .await?;
        let _ = self.page.wait_for_network_idle(500, 10_000).await;
        retry::recover_if_rate_limited(self.page, &policy).await?;
        Ok(())
    }

    /// Go straight to the cart page.
    pub async fn goto_cart_page(&self) -> Result<()> {
        self.navigate(&self.config.cart_url(), "open cart page").await
    }

    /// Go straight to the account page.
    pub async fn goto_account_page(&self) -> Result<()> {
        self.navigate(&self.config.account_url(), "open account page")
            .await
    }

    /// Go straight to the cat category listing.
    pub async fn goto_cat_section(&self) -> Result<()> {
        self.navigate(&self.config.cat_category_url(), "open cat section")
            .await
    }

    /// Click the header cart link.
    pub async fn go_to_cart(&self) -> Result<()> {
        let chain = [Locator::css("a[href*='cart']"), Locator::css("[class*='cart']")];
        let hit = locator::require(self.page, &chain, "cart link").await?;
        self.page.click(&hit.selector).await?;
        self.settle().await;
        Ok(())
    }

    /// Click the header user/account link.
    pub async fn go_to_user(&self) -> Result<()> {
        let chain = [
            Locator::css("a[href*='account']"),
            Locator::css("[class*='user']"),
        ];
        let hit = locator::require(self.page, &chain, "user link").await?;
        self.page.click(&hit.selector).await?;
        self.settle().await;
        Ok(())
    }

    /// Click the 貓貓專區 entry, wherever it is this week.
    pub async fn click_cat_section(&self) -> Result<()> {
        let policy = self.config.retry_policy();
        let page = self.page;
        with_retry(&policy, "click cat section", move || async move {
            let chain = [
                Locator::role("button", "貓貓專區"),
                Locator::has_text("button", "貓貓專區"),
                Locator::has_text("button, a, [role='button']", "貓"),
            ];
            let hit = locator::require(page, &chain, "cat section button").await?;
            page.click(&hit.selector).await?;
            Ok(())
        })
        .await?;
        self.settle().await;
        Ok(())
    }

    // =========================================================================
    // Search and product selection
    // =========================================================================

    /// Open the AI search box.
    pub async fn open_ai_search(&self) -> Result<()> {
        let chain = [
            Locator::role("button", "AI搜尋"),
            Locator::has_text("button", "AI搜尋"),
        ];
        let hit = locator::require(self.page, &chain, "AI search button").await?;
        self.page.click(&hit.selector).await?;
        self.settle().await;
        Ok(())
    }

    /// Type a keyword into the AI search box.
    pub async fn search_product(&self, keyword: &str) -> Result<()> {
        let chain = [
            Locator::role("textbox", "毛孩腎病適合吃什麼？"),
            Locator::css("input[type='search']"),
        ];
        let hit = locator::require(self.page, &chain, "AI search input").await?;
        self.page.click(&hit.selector).await?;
        self.page.fill(&hit.selector, keyword).await?;
        Ok(())
    }

    /// Click the first product link on the current listing.
    pub async fn click_first_product(&self) -> Result<()> {
        let chain = [
            Locator::role("link", "product"),
            Locator::css("a[href*='/product/']"),
        ];
        let hit = locator::require(self.page, &chain, "first product link").await?;
        self.page.click(&hit.selector).await?;
        self.settle().await;
        Ok(())
    }

    /// Pick a named product variant on a product page.
    pub async fn select_variant(&self, variant: &str) -> Result<()> {
        let chain = [
            Locator::role("button", variant),
            Locator::has_text("button", variant),
        ];
        let hit = locator::require(self.page, &chain, "product variant button").await?;
        self.page.click(&hit.selector).await?;
        self.settle().await;
        Ok(())
    }

    /// Click the dedicated add-to-cart button (product pages carry a
    /// test id for it).
    pub async fn add_to_cart(&self) -> Result<()> {
        let chain = [Locator::css("[data-testid=\"button-add-to-cart\"]")];
        let hit = locator::require(self.page, &chain, "add-to-cart button").await?;
        self.page.click(&hit.selector).await?;
        self.settle().await;
        Ok(())
    }

    /// Dismiss the post-add popup if one is showing. Best-effort.
    pub async fn close_popup(&self) -> Result<bool> {
        let chain = [Locator::css("[data-testid=\"popup-close-button\"]")];
        match locator::resolve(self.page, &chain).await? {
            Some(hit) => {
                let clicked = self.page.try_click(&hit.selector).await?;
                Ok(clicked)
            }
            None => Ok(false),
        }
    }

    // =========================================================================
    // Listing-page add-to-cart flow
    // =========================================================================

    /// Name and price of the first product on the current listing.
    pub async fn first_product_info(&self) -> Result<ProductInfo> {
        let name_chain = [
            Locator::css("[class*=\"product-title\"]"),
            Locator::css("h2"),
            Locator::css("h3"),
            Locator::css("[class*=\"title\"]"),
        ];
        let name = match locator::resolve(self.page, &name_chain).await? {
            Some(hit) if !hit.text.is_empty() => hit.text,
            _ => "Unknown Product".to_string(),
        };

        let price_chain = [
            Locator::css("[class*=\"price\"]"),
            Locator::css("[class*=\"amount\"]"),
            Locator::has_text("span", "$"),
        ];
        let price = match locator::resolve(self.page, &price_chain).await? {
            Some(hit) if !hit.text.is_empty() => hit.text,
            _ => "Unknown Price".to_string(),
        };

        Ok(ProductInfo { name, price })
    }

    /// Add the first listed product to the cart, resolving whatever
    /// options UI opens. Returns the product info recorded before the
    /// click. When the listing carries no add button the info is
    /// returned untouched — some listings only link through to product
    /// pages.
    pub async fn add_first_product_to_cart(&self) -> Result<ProductInfo> {
        let info = self.first_product_info().await?;
        info!("adding to cart: {} ({})", info.name, info.price);

        let add_chain = [Locator::has_text("button", "加入購物車")];
        let Some(add_button) = locator::resolve(self.page, &add_chain).await? else {
            debug!("no add-to-cart button on this listing");
            return Ok(info);
        };

        let policy = self.config.retry_policy();
        let page = self.page;
        let add_selector = add_button.selector.as_str();
        with_retry(&policy, "add to cart", move || async move {
            page.click(add_selector).await?;
            Ok(())
        })
        .await?;
        self.settle().await;

        customize::apply_default_customization(self.page, &self.config.preferred_variant).await?;

        self.confirm_add().await;
        Ok(info)
    }

    /// Find and click whatever confirms the add: 確定加入, then 確認,
    /// then a second 加入購物車 button inside the dialog. Best-effort —
    /// products without an options dialog have nothing to confirm.
    async fn confirm_add(&self) {
        let direct = [
            Locator::has_text("button", "確定加入"),
            Locator::has_text("button", "確認"),
        ];
        let hit = match locator::resolve(self.page, &direct).await {
            Ok(Some(hit)) => Some(hit),
            Ok(None) => {
                match locator::resolve_all(self.page, &Locator::has_text("button", "加入購物車"))
                    .await
                {
                    Ok(hits) if hits.len() > 1 => hits.into_iter().nth(1),
                    _ => None,
                }
            }
            Err(e) => {
                debug!("confirm-button resolution failed: {}", e);
                None
            }
        };

        if let Some(hit) = hit {
            if let Err(e) = self.page.try_click(&hit.selector).await {
                debug!("confirm click failed: {}", e);
            }
            self.settle().await;
        } else {
            debug!("no confirm button, assuming the add completed directly");
        }
    }

    // =========================================================================
    // Cart inspection and clearing
    // =========================================================================

    /// Number of item rows in the cart.
    pub async fn cart_items_count(&self) -> Result<usize> {
        locator::count(self.page, &Locator::css(CART_ITEM_ROWS)).await
    }

    /// Whether the given product name appears anywhere on the page.
    /// Single text query, no fallback chain.
    pub async fn is_item_present(&self, name: &str) -> Result<bool> {
        let text = self.page.text().await?;
        Ok(text.contains(name))
    }

    /// Assert that the cart item heading names the given product.
    pub async fn verify_item_in_cart(&self, name: &str) -> Result<()> {
        let chain = [Locator::css("[data-testid=\"paper-card-main-normal\"] h6")];
        let hit = locator::require(self.page, &chain, "cart item heading").await?;
        if !hit.text.contains(name) {
            return Err(Error::AssertionFailed(format!(
                "cart heading '{}' does not mention '{}'",
                hit.text, name
            )));
        }
        Ok(())
    }

    /// Remove one cart item by position.
    pub async fn remove_item(&self, index: usize) -> Result<()> {
        let buttons = locator::resolve_all(
            self.page,
            &Locator::css("[data-testid=\"paper-card-main-normal\"] button"),
        )
        .await?;
        let hit = buttons.get(index).ok_or_else(|| {
            Error::ElementNotFound(format!("remove button for cart item {}", index))
        })?;
        self.page.click(&hit.selector).await?;
        self.settle().await;
        Ok(())
    }

    /// Click delete buttons until none remain. Returns how many were
    /// clicked. Bounded by the starting button count so a cart that
    /// re-renders the same button cannot loop forever.
    pub async fn clear_cart(&self) -> Result<usize> {
        let delete_chain = [
            Locator::has_text("button", "清空"),
            Locator::has_text("button", "刪除"),
            Locator::has_text("button", "remove"),
        ];

        let mut bound = 0usize;
        for candidate in &delete_chain {
            bound += locator::count(self.page, candidate).await?;
        }

        let mut removed = 0usize;
        for _ in 0..bound {
            let Some(hit) = locator::resolve(self.page, &delete_chain[1..]).await? else {
                break;
            };
            self.page.click(&hit.selector).await?;
            self.settle().await;
            removed += 1;
        }
        info!("cleared {} cart item(s)", removed);
        Ok(removed)
    }

    // =========================================================================
    // Empty-cart verification
    // =========================================================================

    async fn assess(&self) -> Result<CartAssessment> {
        let visible = self.page.text().await?;
        let marker = locator::count(self.page, &Locator::css(EMPTY_CART_MARKER)).await? > 0;
        let items = locator::count(self.page, &Locator::css(CART_ITEM_CONTAINERS)).await?;
        let raw: String = self
            .page
            .evaluate("document.documentElement.outerHTML")
            .await?;
        Ok(assess_cart(&visible, marker, items, &raw))
    }

    /// Whether the cart currently reads as empty. Idempotent on an
    /// unchanged page.
    pub async fn is_cart_empty(&self) -> Result<bool> {
        Ok(matches!(self.assess().await?, CartAssessment::Empty(_)))
    }

    /// Assert the cart is empty. Fails closed: anything short of an
    /// explicit empty signal writes a diagnostic screenshot and errors
    /// with the page metadata instead of guessing.
    pub async fn verify_empty(&self) -> Result<()> {
        match self.assess().await? {
            CartAssessment::Empty(signal) => {
                debug!("cart verified empty via: {}", signal);
                Ok(())
            }
            CartAssessment::HasItems(count) => {
                let url = self.page.url().await?;
                let title = self.page.title().await?;
                let raw: String = self
                    .page
                    .evaluate("document.documentElement.outerHTML")
                    .await?;
                warn!(
                    "cart verification failed: {} item container(s), url={}, title='{}', content={} chars",
                    count,
                    url,
                    title,
                    raw.len()
                );
                harness::save_screenshot(
                    self.page,
                    &self.config.results_dir,
                    "cart_verification_failure.png",
                )
                .await?;
                Err(Error::VerificationInconclusive(format!(
                    "cannot confirm the cart is empty: {} item container(s) on {}",
                    count, url
                )))
            }
        }
    }

    async fn settle(&self) {
        let _ = self.page.wait_for_network_idle(300, 3_000).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_empty_phrase_in_markup_is_empty() {
        let raw = "<html><body><div><p>購物車中沒有商品</p></div></body></html>";
        let verdict = assess_cart("購物車中沒有商品", false, 0, raw);
        assert!(matches!(verdict, CartAssessment::Empty(_)));
    }

    #[test]
    fn test_item_containers_mean_not_empty() {
        let raw = "<html><body><div class='cart-item'>罐頭</div></body></html>";
        let verdict = assess_cart("罐頭 $120", false, 1, raw);
        assert_eq!(verdict, CartAssessment::HasItems(1));
    }

    #[test]
    fn test_visible_text_signal_wins_first() {
        // Even with item containers present, the ordered cascade stops
        // at the earlier visible-text signal.
        let raw = "<html><body><div class='cart-item'></div></body></html>";
        let verdict = assess_cart("您的購物車是空的", false, 1, raw);
        assert_eq!(verdict, CartAssessment::Empty("empty-cart text visible"));
    }

    #[test]
    fn test_english_phrasing() {
        let verdict = assess_cart("Your cart is empty", false, 0, "<html></html>");
        assert_eq!(verdict, CartAssessment::Empty("empty-cart text visible"));
    }

    #[test]
    fn test_marker_element_signal() {
        let verdict = assess_cart("歡迎回來", true, 3, "<html>...</html>");
        assert_eq!(verdict, CartAssessment::Empty("empty-cart marker element"));
    }

    #[test]
    fn test_raw_content_phrase_beats_item_count() {
        let raw = "<html><body><div class='cart-item'>購物車中沒有商品</div></body></html>";
        let verdict = assess_cart("首頁", false, 2, raw);
        assert_eq!(verdict, CartAssessment::Empty("empty phrase in raw content"));
    }

    #[test]
    fn test_sparse_page_without_signals_is_not_guessed_empty() {
        // The old content-length guess would have classified this short
        // page as empty; the cascade now reports the items it saw.
        let raw = "<html><body><div class='product-item'></div></body></html>";
        let verdict = assess_cart("載入中", false, 1, raw);
        assert_eq!(verdict, CartAssessment::HasItems(1));
    }

    #[test]
    fn test_assessment_is_deterministic() {
        let raw = "<html><body><p>購物車中沒有商品</p></body></html>";
        let first = assess_cart("購物車中沒有商品", false, 0, raw);
        let second = assess_cart("購物車中沒有商品", false, 0, raw);
        assert_eq!(first, second);
    }
}
