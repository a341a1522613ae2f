use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED, USER_AGENT};
use serde::{Deserialize, Serialize};

const CACHE_VERSION: u32 = 1;
const CACHE_DIR: &str = "cfb_predictions";
const CACHE_FILE: &str = "http_cache.json";
const CLIENT_NAME: &str = "cfb_predictions";

static GLOBAL: Lazy<HttpCache> = Lazy::new(|| HttpCache::new(default_cache_path()));

/// Non-success status returned by the origin. Callers downcast to tell a
/// missing resource apart from a broken one.
#[derive(Debug, Clone)]
pub struct HttpStatusError {
    pub status: u16,
    pub body: String,
}

impl fmt::Display for HttpStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "http {}: {}", self.status, self.body)
    }
}

impl std::error::Error for HttpStatusError {}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct HttpCacheFile {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub body: String,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub fetched_at: i64,
}

/// Conditional-GET cache persisted as one JSON file. Only successful bodies
/// are stored; error statuses always reach the caller unchanged.
pub struct HttpCache {
    path: Option<PathBuf>,
    file: Mutex<Option<HttpCacheFile>>,
}

impl HttpCache {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            file: Mutex::new(None),
        }
    }

    pub fn global() -> &'static HttpCache {
        &GLOBAL
    }

    pub fn get(&self, url: &str) -> Option<CacheEntry> {
        let mut guard = self.file.lock().unwrap_or_else(|e| e.into_inner());
        let cache = guard.get_or_insert_with(|| load_cache_file(self.path.as_deref()));
        cache.entries.get(url).cloned()
    }

    pub fn store(&self, key: &str, entry: CacheEntry) {
        let mut guard = self.file.lock().unwrap_or_else(|e| e.into_inner());
        let cache = guard.get_or_insert_with(|| load_cache_file(self.path.as_deref()));
        cache.version = CACHE_VERSION;
        cache.entries.insert(key.to_string(), entry);
        if let Err(err) = save_cache_file(self.path.as_deref(), cache) {
            tracing::debug!(error = %err, "http cache not persisted");
        }
    }

    pub fn fetch_text(
        &self,
        client: &Client,
        url: &str,
        extra_headers: &[(&str, &str)],
    ) -> Result<String> {
        let cached_entry = self.get(url);

        let mut req = client.get(url).header(USER_AGENT, CLIENT_NAME);
        for (name, value) in extra_headers {
            req = req.header(*name, *value);
        }
        if let Some(entry) = cached_entry.as_ref() {
            if let Some(etag) = entry.etag.as_ref() {
                req = req.header(IF_NONE_MATCH, etag);
            }
            if let Some(last_modified) = entry.last_modified.as_ref() {
                req = req.header(IF_MODIFIED_SINCE, last_modified);
            }
        }

        let resp = req.send().context("request failed")?;
        let status = resp.status();
        let headers = resp.headers().clone();
        if status == StatusCode::NOT_MODIFIED {
            if let Some(entry) = cached_entry {
                tracing::debug!(url, "served from http cache");
                return Ok(entry.body);
            }
            return Err(anyhow::anyhow!("received 304 without cache body"));
        }

        let body = resp.text().context("failed reading body")?;
        if !status.is_success() {
            return Err(HttpStatusError {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let etag = headers
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let last_modified = headers
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        if etag.is_some() || last_modified.is_some() {
            self.store(
                url,
                CacheEntry {
                    body: body.clone(),
                    etag,
                    last_modified,
                    fetched_at: chrono::Utc::now().timestamp(),
                },
            );
        }
        Ok(body)
    }
}

fn load_cache_file(path: Option<&Path>) -> HttpCacheFile {
    let Some(path) = path else {
        return HttpCacheFile::default();
    };
    let Ok(raw) = fs::read_to_string(path) else {
        return HttpCacheFile::default();
    };
    let cache = serde_json::from_str::<HttpCacheFile>(&raw).unwrap_or_default();
    if cache.version != CACHE_VERSION {
        return HttpCacheFile::default();
    }
    cache
}

fn save_cache_file(path: Option<&Path>, cache: &HttpCacheFile) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let Some(dir) = path.parent() else {
        return Ok(());
    };
    fs::create_dir_all(dir).ok();
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(cache).context("serialize http cache")?;
    fs::write(&tmp, json).context("write http cache")?;
    fs::rename(&tmp, path).context("swap http cache")?;
    Ok(())
}

fn default_cache_path() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CACHE_DIR).join(CACHE_FILE));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR).join(CACHE_FILE))
}
