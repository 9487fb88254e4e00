//! Product-customization fallback — resolving a product to a
//! purchasable state after "add to cart" opens an options UI.
//!
//! Product dialogs on the shop are wildly inconsistent: some offer a
//! named variant, some generic option buttons, some a dropdown, some
//! radio groups, some only a quantity field. The handler walks a fixed
//! priority list of steps and stops at the first one that applies.
//! A step that errors counts as not applicable; the handler itself is
//! best-effort and never propagates a step failure.

use crate::locator::{self, Locator};
use crate::Result;
use eoka::Page;
use tracing::{debug, info};

/// The fallback steps, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomizationStep {
    /// A button/span whose text contains the preferred variant name.
    PreferredOption,
    /// A generic variant/option/size button.
    VariantButton,
    /// First non-placeholder option of a `<select>`.
    DropdownSelect,
    /// First unchecked radio or checkbox.
    RadioCheckbox,
    /// Quantity input forced to "1". Terminal fallback.
    QuantityField,
}

impl CustomizationStep {
    pub const ALL: [CustomizationStep; 5] = [
        Self::PreferredOption,
        Self::VariantButton,
        Self::DropdownSelect,
        Self::RadioCheckbox,
        Self::QuantityField,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::PreferredOption => "preferred-option",
            Self::VariantButton => "variant-button",
            Self::DropdownSelect => "dropdown-select",
            Self::RadioCheckbox => "radio-checkbox",
            Self::QuantityField => "quantity-field",
        }
    }
}

/// What a single step did.
enum StepOutcome {
    Applied,
    NotApplicable,
}

/// Picks the first non-placeholder option of the first `<select>` that
/// has one and fires `change`.
const SELECT_FIRST_OPTION_JS: &str = r#"
(() => {
    for (const sel of document.querySelectorAll('select')) {
        const options = Array.from(sel.options);
        const pick = options.find((o, i) => i > 0 && !o.disabled);
        if (pick) {
            sel.value = pick.value;
            sel.dispatchEvent(new Event('change', { bubbles: true }));
            return true;
        }
    }
    return false;
})()
"#;

/// Clicks the first unchecked radio/checkbox.
const CHECK_FIRST_UNCHECKED_JS: &str = r#"
(() => {
    for (const el of document.querySelectorAll('input[type="radio"], input[type="checkbox"]')) {
        if (!el.checked) {
            el.click();
            return true;
        }
    }
    return false;
})()
"#;

/// Sets a quantity-like input to "1", firing input + change.
const SET_QUANTITY_ONE_JS: &str = r#"
(() => {
    const el = document.querySelector('input[type="number"], input[name*="quantity"], input[name*="qty"]');
    if (!el) return false;
    el.value = '1';
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('change', { bubbles: true }));
    return true;
})()
"#;

/// Apply the default customization to whatever options UI is currently
/// open. Returns the step that applied, or `None` when nothing did —
/// both are acceptable outcomes for products without options.
pub async fn apply_default_customization(
    page: &Page,
    preferred: &str,
) -> Result<Option<CustomizationStep>> {
    for step in CustomizationStep::ALL {
        let outcome = match run_step(page, step, preferred).await {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!("customization step {} errored: {}", step.name(), e);
                StepOutcome::NotApplicable
            }
        };
        if matches!(outcome, StepOutcome::Applied) {
            info!("customization applied via {}", step.name());
            settle(page).await;
            return Ok(Some(step));
        }
    }
    debug!("no customization step applied");
    Ok(None)
}

async fn run_step(page: &Page, step: CustomizationStep, preferred: &str) -> Result<StepOutcome> {
    match step {
        CustomizationStep::PreferredOption => {
            let chain = [Locator::has_text("button, span", preferred)];
            click_if_resolved(page, &chain).await
        }
        CustomizationStep::VariantButton => {
            let chain = [Locator::css(
                "button[class*=\"variant\"], button[class*=\"option\"], button[class*=\"size\"]",
            )];
            click_if_resolved(page, &chain).await
        }
        CustomizationStep::DropdownSelect => eval_step(page, SELECT_FIRST_OPTION_JS).await,
        CustomizationStep::RadioCheckbox => eval_step(page, CHECK_FIRST_UNCHECKED_JS).await,
        CustomizationStep::QuantityField => eval_step(page, SET_QUANTITY_ONE_JS).await,
    }
}

async fn click_if_resolved(page: &Page, chain: &[Locator]) -> Result<StepOutcome> {
    match locator::resolve(page, chain).await? {
        Some(hit) => {
            page.click(&hit.selector).await?;
            Ok(StepOutcome::Applied)
        }
        None => Ok(StepOutcome::NotApplicable),
    }
}

async fn eval_step(page: &Page, js: &str) -> Result<StepOutcome> {
    let applied: bool = page.evaluate(js).await?;
    Ok(if applied {
        StepOutcome::Applied
    } else {
        StepOutcome::NotApplicable
    })
}

/// Bounded settle after a step mutated the options UI.
async fn settle(page: &Page) {
    let _ = page.wait_for_network_idle(300, 2_000).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_order() {
        assert_eq!(
            CustomizationStep::ALL,
            [
                CustomizationStep::PreferredOption,
                CustomizationStep::VariantButton,
                CustomizationStep::DropdownSelect,
                CustomizationStep::RadioCheckbox,
                CustomizationStep::QuantityField,
            ]
        );
    }

    #[test]
    fn test_quantity_js_targets_numeric_inputs() {
        assert!(SET_QUANTITY_ONE_JS.contains(r#"input[type="number"]"#));
        assert!(SET_QUANTITY_ONE_JS.contains(r#"input[name*="quantity"]"#));
        assert!(SET_QUANTITY_ONE_JS.contains(r#"input[name*="qty"]"#));
    }
}
