//! Resilient element location — ordered candidate descriptors, first
//! visible match wins.
//!
//! The shop's markup carries stable test ids for only a handful of
//! elements, so most targets are described by a fallback chain: a role
//! query, then a text match, then a loose class-fragment selector. A
//! chain is evaluated strictly in order against the live DOM and the
//! first candidate with at least one visible match supplies the
//! element. Absence is not an error — optional UI (popups, banners)
//! legitimately resolves to nothing.
//!
//! Resolution is read-only: it never clicks, scrolls or waits. Each
//! call re-queries the page, so a chain is safe to reuse after
//! navigation.

use crate::{Error, Result};
use eoka::Page;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One way of finding an element.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Locator {
    /// A plain CSS selector, e.g. `a[href*='cart']`.
    Css { css: String },
    /// Elements matching `css` whose visible text contains `text`
    /// (case-insensitive). The counterpart of `button:has-text(...)`.
    HasText { css: String, text: String },
    /// Elements with the given ARIA role (explicit or implicit from the
    /// tag) whose accessible name contains `name` (case-insensitive).
    Role { role: String, name: String },
}

impl Locator {
    pub fn css(css: impl Into<String>) -> Self {
        Self::Css { css: css.into() }
    }

    pub fn has_text(css: impl Into<String>, text: impl Into<String>) -> Self {
        Self::HasText {
            css: css.into(),
            text: text.into(),
        }
    }

    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Role {
            role: role.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css { css } => write!(f, "css={}", css),
            Self::HasText { css, text } => write!(f, "{}:has-text('{}')", css, text),
            Self::Role { role, name } => write!(f, "role={}[name*='{}']", role, name),
        }
    }
}

/// A resolved element: a unique CSS path usable with `page.click` /
/// `page.fill`, plus its visible text at resolution time.
#[derive(Debug, Clone, Deserialize)]
pub struct Hit {
    pub selector: String,
    #[serde(default)]
    pub text: String,
}

/// JavaScript core shared by all resolution entry points. Takes a JSON
/// array of candidate descriptors, walks them in order and returns
/// `JSON.stringify({index, hits})` for the first candidate with at
/// least one visible match, or `null` when every candidate misses.
const RESOLVE_JS: &str = r#"
(() => {
    const cands = __DCS_CANDS__;

    const visible = (el) => {
        const rect = el.getBoundingClientRect();
        if (rect.width < 1 || rect.height < 1) return false;
        const style = getComputedStyle(el);
        return style.display !== 'none' && style.visibility !== 'hidden';
    };

    const cssPath = (el) => {
        if (el.id) return '#' + CSS.escape(el.id);
        const parts = [];
        let node = el;
        while (node && node !== document.body && parts.length < 6) {
            let s = node.tagName.toLowerCase();
            if (node.id) {
                parts.unshift('#' + CSS.escape(node.id));
                break;
            }
            const parent = node.parentElement;
            if (parent) {
                const siblings = Array.from(parent.children).filter(c => c.tagName === node.tagName);
                if (siblings.length > 1) {
                    s += ':nth-of-type(' + (siblings.indexOf(node) + 1) + ')';
                }
            }
            parts.unshift(s);
            node = parent;
        }
        return parts.join(' > ');
    };

    const implicitRole = (el) => {
        const tag = el.tagName.toLowerCase();
        if (tag === 'button') return 'button';
        if (tag === 'a' && el.hasAttribute('href')) return 'link';
        if (tag === 'select') return 'combobox';
        if (tag === 'textarea') return 'textbox';
        if (tag === 'input') {
            const type = (el.getAttribute('type') || 'text').toLowerCase();
            if (type === 'radio') return 'radio';
            if (type === 'checkbox') return 'checkbox';
            if (type === 'button' || type === 'submit') return 'button';
            return 'textbox';
        }
        return null;
    };

    const accessibleName = (el) =>
        el.getAttribute('aria-label')
            || el.getAttribute('placeholder')
            || el.getAttribute('title')
            || (el.textContent || '').trim().replace(/\s+/g, ' ');

    const matches = (cand) => {
        if (cand.kind === 'css') {
            return Array.from(document.querySelectorAll(cand.css));
        }
        if (cand.kind === 'has_text') {
            const needle = cand.text.toLowerCase();
            return Array.from(document.querySelectorAll(cand.css))
                .filter(el => (el.textContent || '').toLowerCase().includes(needle));
        }
        if (cand.kind === 'role') {
            const needle = cand.name.toLowerCase();
            return Array.from(document.querySelectorAll('*')).filter(el => {
                const role = el.getAttribute('role') || implicitRole(el);
                if (role !== cand.role) return false;
                return accessibleName(el).toLowerCase().includes(needle);
            });
        }
        return [];
    };

    for (let i = 0; i < cands.length; i++) {
        let found;
        try {
            found = matches(cands[i]).filter(visible);
        } catch (e) {
            found = [];
        }
        if (found.length > 0) {
            return JSON.stringify({
                index: i,
                hits: found.map(el => ({
                    selector: cssPath(el),
                    text: (el.textContent || '').trim().replace(/\s+/g, ' ').slice(0, 120),
                })),
            });
        }
    }
    return null;
})()
"#;

#[derive(Deserialize)]
struct Resolution {
    #[allow(dead_code)]
    index: usize,
    hits: Vec<Hit>,
}

async fn run_resolution(page: &Page, candidates: &[Locator]) -> Result<Option<Resolution>> {
    let js = RESOLVE_JS.replace(
        "__DCS_CANDS__",
        &serde_json::to_string(candidates).unwrap(),
    );
    let raw: Option<String> = page.evaluate(&js).await?;
    match raw {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// Resolve an ordered candidate list to the first visible match of the
/// first matching candidate. `Ok(None)` when every candidate misses.
pub async fn resolve(page: &Page, candidates: &[Locator]) -> Result<Option<Hit>> {
    let resolution = run_resolution(page, candidates).await?;
    Ok(resolution.and_then(|r| r.hits.into_iter().next()))
}

/// Every visible match of a single descriptor, in DOM order.
pub async fn resolve_all(page: &Page, candidate: &Locator) -> Result<Vec<Hit>> {
    let resolution = run_resolution(page, std::slice::from_ref(candidate)).await?;
    Ok(resolution.map(|r| r.hits).unwrap_or_default())
}

/// Count of visible elements matching a single descriptor.
pub async fn count(page: &Page, candidate: &Locator) -> Result<usize> {
    Ok(resolve_all(page, candidate).await?.len())
}

/// Resolve or fail with [`Error::ElementNotFound`] naming the target
/// and the exhausted candidate list.
pub async fn require(page: &Page, candidates: &[Locator], what: &str) -> Result<Hit> {
    match resolve(page, candidates).await? {
        Some(hit) => Ok(hit),
        None => {
            let tried: Vec<String> = candidates.iter().map(|c| c.to_string()).collect();
            Err(Error::ElementNotFound(format!(
                "{} (tried: {})",
                what,
                tried.join(", ")
            )))
        }
    }
}
