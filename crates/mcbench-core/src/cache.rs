//! Content-addressed response cache.
//!
//! One JSON file per request fingerprint under the run's `cache/` directory.
//! Entries are written once and never invalidated; correctness relies on the
//! fingerprint being a stable function of request content.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::CachedResponse;

#[derive(Debug)]
pub struct ResponseCache {
    root_dir: PathBuf,
}

impl ResponseCache {
    pub fn new(root_dir: impl AsRef<Path>) -> Result<Self> {
        let root_dir = root_dir.as_ref().to_path_buf();
        fs::create_dir_all(&root_dir)?;
        Ok(Self { root_dir })
    }

    fn path_for_key(&self, key: &str) -> PathBuf {
        self.root_dir.join(format!("{key}.json"))
    }

    pub fn has(&self, key: &str) -> bool {
        self.path_for_key(key).exists()
    }

    pub fn get(&self, key: &str) -> Result<Option<CachedResponse>> {
        let path = self.path_for_key(key);
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }

    pub fn set(&self, key: &str, payload: &CachedResponse) -> Result<()> {
        let path = self.path_for_key(key);
        fs::write(&path, serde_json::to_string(payload)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrips_payloads() {
        let dir = tempdir().unwrap();
        let cache = ResponseCache::new(dir.path().join("cache")).unwrap();

        assert!(!cache.has("abc"));
        assert!(cache.get("abc").unwrap().is_none());

        let payload = CachedResponse {
            text: "B".into(),
            latency_ms: 120,
            usage: Some(serde_json::json!({"total_tokens": 9})),
        };
        cache.set("abc", &payload).unwrap();

        assert!(cache.has("abc"));
        assert_eq!(cache.get("abc").unwrap(), Some(payload));
    }
}
