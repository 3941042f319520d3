//! Per-domain authentication cookies persisted as JSON on disk.
//!
//! One file per domain key, overwritten wholesale on every save. There is no
//! locking: two sessions saving the same key race and the last write wins.

use std::fs;
use std::path::PathBuf;

use log::{debug, info, warn};
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::browser::Page;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSite {
    fn parse_lenient(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "strict" => SameSite::Strict,
            "none" | "no_restriction" => SameSite::None,
            _ => SameSite::Lax,
        }
    }
}

impl<'de> Deserialize<'de> for SameSite {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(serde_json::Value::String(s)) => SameSite::parse_lenient(&s),
            _ => SameSite::default(),
        })
    }
}

/// A browser cookie in the flat shape the cookie files use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub same_site: SameSite,
    /// Unix seconds. Absent means a session cookie.
    #[serde(default, deserialize_with = "numeric_expiry", skip_serializing_if = "Option::is_none")]
    pub expiry: Option<i64>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
}

fn default_path() -> String {
    "/".to_string()
}

/// Non-numeric expiries are dropped instead of failing the whole record.
fn numeric_expiry<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<i64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(serde_json::Value::as_f64)
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .map(|secs| secs as i64))
}

impl CookieRecord {
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        CookieRecord {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: default_path(),
            same_site: SameSite::default(),
            expiry: None,
            secure: false,
            http_only: false,
        }
    }

    /// Form accepted by a browser without a secure context: `SameSite=None`
    /// becomes `Strict`.
    pub fn normalized(&self) -> CookieRecord {
        let mut cookie = self.clone();
        if cookie.same_site == SameSite::None {
            cookie.same_site = SameSite::Strict;
        }
        if cookie.path.is_empty() {
            cookie.path = default_path();
        }
        cookie
    }

    /// Label-boundary suffix match in either direction, ignoring a leading
    /// dot. A page without a host matches nothing.
    pub fn matches_host(&self, host: &str) -> bool {
        if host.is_empty() {
            return false;
        }
        let cookie_domain = self.domain.trim_start_matches('.');
        cookie_domain.is_empty() || is_subdomain(host, cookie_domain) || is_subdomain(cookie_domain, host)
    }
}

fn is_subdomain(name: &str, parent: &str) -> bool {
    match name.strip_suffix(parent) {
        Some("") => true,
        Some(prefix) => prefix.ends_with('.'),
        None => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplyReport {
    pub applied: usize,
    pub attempted: usize,
}

impl ApplyReport {
    pub fn restored(&self) -> bool {
        self.applied > 0
    }
}

#[derive(Debug, Clone)]
pub struct CookieStore {
    dir: PathBuf,
}

impl CookieStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CookieStore { dir: dir.into() }
    }

    pub fn path_for(&self, domain_key: &str) -> PathBuf {
        self.dir.join(format!("{}_cookies.json", domain_key.replace('.', "_")))
    }

    /// Overwrites the key's file. An empty batch leaves any existing file alone.
    pub fn save(&self, domain_key: &str, records: &[CookieRecord]) -> Result<usize> {
        if records.is_empty() {
            info!("No cookies to save for {}", domain_key);
            return Ok(0);
        }

        let normalized: Vec<CookieRecord> = records.iter().map(CookieRecord::normalized).collect();
        let json = serde_json::to_string_pretty(&normalized)?;

        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(domain_key), json)?;

        info!("Saved {} cookies for {}", normalized.len(), domain_key);
        Ok(normalized.len())
    }

    /// `Ok(None)` when nothing was ever saved for this key.
    pub fn load(&self, domain_key: &str) -> Result<Option<Vec<CookieRecord>>> {
        let path = self.path_for(domain_key);
        if !path.exists() {
            info!("No cookie file found for {}", domain_key);
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        let raw: Vec<serde_json::Value> = serde_json::from_str(&content)?;

        let mut records = Vec::with_capacity(raw.len());
        for entry in raw {
            match serde_json::from_value::<CookieRecord>(entry) {
                Ok(record) => records.push(record.normalized()),
                Err(e) => warn!("Skipping malformed cookie in {:?}: {}", path, e),
            }
        }

        debug!("Loaded {} cookies for {}", records.len(), domain_key);
        Ok(Some(records))
    }
}

/// Applies `records` to the page one at a time; a failing record is counted
/// and skipped. Records for unrelated domains are not attempted on the page
/// but still count towards `attempted`.
pub fn apply_cookies(page: &mut dyn Page, records: &[CookieRecord]) -> ApplyReport {
    let current_url = page.current_url();
    let host = Url::parse(&current_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default();

    let mut report = ApplyReport {
        applied: 0,
        attempted: records.len(),
    };

    for record in records {
        if !record.matches_host(&host) {
            debug!("Skipping cookie {} for foreign domain {}", record.name, record.domain);
            continue;
        }
        match page.add_cookie(&record.normalized()) {
            Ok(()) => report.applied += 1,
            Err(e) => warn!("Error adding cookie {}: {}", record.name, e),
        }
    }

    info!(
        "Successfully loaded {} of {} cookies for {}",
        report.applied, report.attempted, host
    );
    report
}
