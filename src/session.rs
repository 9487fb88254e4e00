//! Auth-session snapshots — serialized cookies and localStorage that
//! let a fresh page start already authenticated.
//!
//! The on-disk shape is the `storage_state` JSON used by Playwright
//! (`cookies` + `origins`), so snapshots are interchangeable with tools
//! that produce that format. Cookie entries are kept opaque: only
//! `name`/`value`/`domain`/`path` are interpreted when seeding a page,
//! everything else rides along untouched.

use crate::Result;
use eoka::Page;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// A captured authentication state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthState {
    #[serde(default)]
    pub cookies: Vec<serde_json::Value>,

    #[serde(default)]
    pub origins: Vec<OriginState>,
}

/// Per-origin localStorage entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginState {
    pub origin: String,

    #[serde(rename = "localStorage", default)]
    pub local_storage: Vec<StorageItem>,
}

/// One localStorage key/value pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageItem {
    pub name: String,
    pub value: String,
}

/// Dumps the current origin's localStorage as a JSON array.
const DUMP_LOCAL_STORAGE_JS: &str = r#"
(() => {
    const items = [];
    for (let i = 0; i < localStorage.length; i++) {
        const name = localStorage.key(i);
        items.push({ name, value: localStorage.getItem(name) });
    }
    return JSON.stringify(items);
})()
"#;

impl AuthState {
    /// Load a snapshot. `Ok(None)` when the file does not exist —
    /// absence is a valid condition, dependent tests skip rather than
    /// fail.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Write the snapshot, creating parent directories as needed.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("auth state saved to {}", path.display());
        Ok(())
    }

    /// Capture cookies and the current origin's localStorage from a
    /// logged-in page.
    pub async fn capture(page: &Page) -> Result<Self> {
        let cookies = page.cookies().await?;
        let cookies = match serde_json::to_value(&cookies)? {
            serde_json::Value::Array(entries) => entries,
            other => vec![other],
        };

        let origin: String = page.evaluate("window.location.origin").await?;
        let items_json: String = page.evaluate(DUMP_LOCAL_STORAGE_JS).await?;
        let local_storage: Vec<StorageItem> = serde_json::from_str(&items_json)?;

        Ok(Self {
            cookies,
            origins: vec![OriginState {
                origin,
                local_storage,
            }],
        })
    }

    /// Seed a fresh page with this snapshot: cookies first, then each
    /// origin's localStorage (which requires navigating there).
    pub async fn apply(&self, page: &Page) -> Result<()> {
        for cookie in &self.cookies {
            let Some(name) = cookie.get("name").and_then(|v| v.as_str()) else {
                debug!("skipping cookie entry without a name");
                continue;
            };
            let Some(value) = cookie.get("value").and_then(|v| v.as_str()) else {
                debug!("skipping cookie '{}' without a value", name);
                continue;
            };
            let domain = cookie.get("domain").and_then(|v| v.as_str());
            let path = cookie.get("path").and_then(|v| v.as_str());
            page.set_cookie(name, value, domain, path).await?;
        }

        for origin in &self.origins {
            if origin.local_storage.is_empty() {
                continue;
            }
            page.goto(&origin.origin).await?;
            for item in &origin.local_storage {
                let js = format!(
                    "localStorage.setItem({}, {})",
                    serde_json::to_string(&item.name).unwrap(),
                    serde_json::to_string(&item.value).unwrap()
                );
                page.execute(&js).await?;
            }
        }

        debug!(
            "applied auth state: {} cookies, {} origins",
            self.cookies.len(),
            self.origins.len()
        );
        Ok(())
    }

    /// Whether the snapshot carries anything at all.
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.origins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_absent_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("fixtures/auth.json");
        let loaded = AuthState::load(&missing).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixtures/auth.json");

        let state = AuthState {
            cookies: vec![serde_json::json!({
                "name": "wordpress_logged_in",
                "value": "abc123",
                "domain": ".dogcatstar.com",
                "path": "/",
                "httpOnly": true,
            })],
            origins: vec![OriginState {
                origin: "https://www.dogcatstar.com".into(),
                local_storage: vec![StorageItem {
                    name: "user_id".into(),
                    value: "374296".into(),
                }],
            }],
        };
        state.save(&path).unwrap();

        let loaded = AuthState::load(&path).unwrap().unwrap();
        assert_eq!(loaded.cookies.len(), 1);
        assert_eq!(loaded.cookies[0]["name"], "wordpress_logged_in");
        assert_eq!(loaded.origins[0].origin, "https://www.dogcatstar.com");
        assert_eq!(loaded.origins[0].local_storage[0].value, "374296");
        assert!(!loaded.is_empty());
    }

    #[test]
    fn test_parses_playwright_storage_state() {
        // Full storage_state shape, extra cookie fields and all.
        let json = r#"{
            "cookies": [
                {"name": "sid", "value": "x", "domain": ".dogcatstar.com",
                 "path": "/", "expires": 1999999999, "secure": true, "sameSite": "Lax"}
            ],
            "origins": [
                {"origin": "https://www.dogcatstar.com",
                 "localStorage": [{"name": "token", "value": "t"}]}
            ]
        }"#;
        let state: AuthState = serde_json::from_str(json).unwrap();
        assert_eq!(state.cookies.len(), 1);
        assert_eq!(state.cookies[0]["sameSite"], "Lax");
        assert_eq!(state.origins[0].local_storage[0].name, "token");
    }

    #[test]
    fn test_empty_state() {
        assert!(AuthState::default().is_empty());
    }
}
