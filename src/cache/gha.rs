//! Client for the GitHub Actions cache service, restore side only

use std::path::PathBuf;

use serde::Deserialize;
use url::Url;

use crate::consts::{CACHE_API_ACCEPT, CACHE_TOKEN_ENV_VAR_NAME, CACHE_URL_ENV_VAR_NAME};
use crate::http::{Http, HttpDownload, HttpError};
use crate::utils::sha256_hex;

use super::{CacheError, CacheErrorKind, CacheStore};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEntry {
    cache_key: Option<String>,
    /// Pre-signed download URL, fetched without the service token
    archive_location: Option<Url>,
}

#[derive(Debug, Clone)]
pub struct GhaCache {
    http: Http,
    base_url: Option<String>,
    token: Option<String>,
}

impl GhaCache {
    /// Missing environment only fails once a restore is attempted, keeping
    /// the step order of a run intact on runners without a cache service.
    pub fn from_env() -> Self {
        Self {
            http: Http::new(),
            base_url: std::env::var(CACHE_URL_ENV_VAR_NAME)
                .ok()
                .filter(|v| !v.is_empty()),
            token: std::env::var(CACHE_TOKEN_ENV_VAR_NAME)
                .ok()
                .filter(|v| !v.is_empty()),
        }
    }

    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: Http::new(),
            base_url: Some(base_url.into()),
            token: Some(token.into()),
        }
    }

    fn credentials(&self) -> Result<(&str, &str), CacheError> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or(CacheErrorKind::MissingEnv(CACHE_URL_ENV_VAR_NAME))?;
        let token = self
            .token
            .as_deref()
            .ok_or(CacheErrorKind::MissingEnv(CACHE_TOKEN_ENV_VAR_NAME))?;
        Ok((base_url, token))
    }
}

impl CacheStore for GhaCache {
    fn restore(
        &self,
        paths: &[PathBuf],
        primary_key: &str,
        restore_keys: &[String],
    ) -> Result<Option<String>, CacheError> {
        let (base_url, token) = self.credentials()?;
        let Some(target) = paths.first() else {
            log::debug!("No paths to restore");
            return Ok(None);
        };

        let keys = std::iter::once(primary_key.to_string())
            .chain(restore_keys.iter().cloned())
            .collect::<Vec<_>>()
            .join(",");
        let version = cache_version(paths);

        let endpoint = format!(
            "{}/_apis/artifactcache/cache",
            base_url.trim_end_matches('/')
        );
        let mut query_url = Url::parse(&endpoint)
            .map_err(|e| CacheErrorKind::InvalidUrl(format!("{endpoint}: {e}")))?;
        query_url
            .query_pairs_mut()
            .append_pair("keys", &keys)
            .append_pair("version", &version);

        let headers = vec![
            ("Accept", CACHE_API_ACCEPT.to_string()),
            ("Authorization", format!("Bearer {token}")),
        ];

        log::debug!("Looking up a cache entry for keys [{keys}]");
        let mut response = match self.http.get(query_url.as_str(), &headers) {
            Ok(response) => response,
            // The service reports a miss as 204, some proxies as 404
            Err(e) if e.status() == Some(404) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if response.status().as_u16() == 204 {
            return Ok(None);
        }

        let entry: CacheEntry = response
            .body_mut()
            .read_json()
            .map_err(|e| CacheError::from(HttpError::from_ureq(query_url.as_str(), e)))?;

        let Some(location) = entry.archive_location else {
            return Err(CacheErrorKind::InvalidResponse(
                "cache entry has no archiveLocation".to_string(),
            )
            .into());
        };

        log::debug!("Downloading cache archive into {}", target.display());
        self.http.download_and_untar(&location, target, Vec::new())?;

        Ok(Some(
            entry.cache_key.unwrap_or_else(|| primary_key.to_string()),
        ))
    }
}

/// The service scopes entries by a fingerprint of the path list, so two
/// workflows caching different paths under the same key never collide.
fn cache_version(paths: &[PathBuf]) -> String {
    let joined = paths
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("|");
    sha256_hex(joined.as_bytes())
}
