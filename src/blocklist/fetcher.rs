//! Downloads a source URL to `cacheDir/<id>.txt`, atomically, and reports
//! its size and a short content hash for change detection.

use std::path::{Path, PathBuf};
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::config::Source;
use crate::error::{HeimdallError, Result};

const USER_AGENT: &str = "nullroute-blocklist-fetcher/1.0";

pub struct FetchReport {
    pub path: PathBuf,
    pub size: usize,
    pub hash16: String,
}

pub struct SourceFetcher {
    client: reqwest::Client,
    cache_dir: PathBuf,
}

impl SourceFetcher {
    pub fn new(cache_dir: PathBuf, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| HeimdallError::SourceFetch {
                id: "<client>".into(),
                url: String::new(),
                reason: e.to_string(),
            })?;
        Ok(SourceFetcher { client, cache_dir })
    }

    pub async fn fetch(&self, source: &Source) -> Result<FetchReport> {
        let response = self
            .client
            .get(&source.url)
            .send()
            .await
            .map_err(|e| HeimdallError::SourceFetch {
                id: source.id.clone(),
                url: source.url.clone(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(HeimdallError::SourceFetch {
                id: source.id.clone(),
                url: source.url.clone(),
                reason: format!("HTTP status {}", response.status()),
            });
        }

        let bytes = response.bytes().await.map_err(|e| HeimdallError::SourceFetch {
            id: source.id.clone(),
            url: source.url.clone(),
            reason: e.to_string(),
        })?;
        let text = String::from_utf8_lossy(&bytes).into_owned();

        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let digest = hasher.finalize();
        let hash16 = hex::encode(digest)[..16].to_string();

        let dest = self.cache_dir.join(format!("{}.txt", source.id));
        write_atomically(&dest, text.as_bytes())
            .await
            .map_err(|e| HeimdallError::SourceFetch {
                id: source.id.clone(),
                url: source.url.clone(),
                reason: e.to_string(),
            })?;

        Ok(FetchReport {
            path: dest,
            size: text.len(),
            hash16,
        })
    }
}

async fn write_atomically(dest: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = dest.with_extension("tmp");
    tokio::fs::write(&tmp, content).await?;
    tokio::fs::rename(&tmp, dest).await?;
    Ok(())
}
