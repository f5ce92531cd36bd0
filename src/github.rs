//! Minimal client for the GitHub releases API, just what asset resolution needs

use serde::Deserialize;
use url::Url;

use crate::consts::{
    GITHUB_API_URL, GITHUB_API_URL_ENV_VAR_NAME, GITHUB_TOKEN_ENV_VAR_NAMES, MAX_RELEASE_PAGES,
    RELEASES_PER_PAGE,
};
use crate::http::{Http, HttpError};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Asset {
    pub name: String,
    pub browser_download_url: Url,
    /// `sha256:<hex>` on recent releases, absent on older ones
    #[serde(default)]
    pub digest: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

pub trait ReleaseSource {
    fn latest_release(&self) -> Result<Release, HttpError>;
    fn list_releases(&self) -> Result<Vec<Release>, HttpError>;
}

#[derive(Debug, Clone)]
pub struct GithubReleases {
    http: Http,
    api_url: String,
    repository: String,
    token: Option<String>,
}

impl GithubReleases {
    /// Endpoint and token come from the runner environment when present.
    pub fn from_env(repository: &str) -> Self {
        let api_url = std::env::var(GITHUB_API_URL_ENV_VAR_NAME)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| GITHUB_API_URL.to_string());
        let token = GITHUB_TOKEN_ENV_VAR_NAMES
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|v| !v.is_empty());
        Self::new(repository, &api_url, token)
    }

    pub fn new(repository: &str, api_url: &str, token: Option<String>) -> Self {
        Self {
            http: Http::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            repository: repository.to_string(),
            token,
        }
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("Accept", "application/vnd.github+json".to_string()),
            ("X-GitHub-Api-Version", "2022-11-28".to_string()),
        ];
        if let Some(token) = &self.token {
            headers.push(("Authorization", format!("Bearer {token}")));
        }
        headers
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, HttpError> {
        let mut response = self.http.get(url, &self.headers())?;
        response
            .body_mut()
            .read_json()
            .map_err(|e| HttpError::from_ureq(url, e))
    }
}

impl ReleaseSource for GithubReleases {
    fn latest_release(&self) -> Result<Release, HttpError> {
        let url = format!("{}/repos/{}/releases/latest", self.api_url, self.repository);
        log::debug!("Fetching latest release from {url}");
        self.get_json(&url)
    }

    fn list_releases(&self) -> Result<Vec<Release>, HttpError> {
        let mut releases = Vec::new();
        for page in 1..=MAX_RELEASE_PAGES {
            let url = format!(
                "{}/repos/{}/releases?per_page={}&page={}",
                self.api_url, self.repository, RELEASES_PER_PAGE, page
            );
            log::debug!("Fetching releases page {page} from {url}");
            let batch: Vec<Release> = self.get_json(&url)?;
            let last_page = batch.len() < RELEASES_PER_PAGE;
            releases.extend(batch);
            if last_page {
                break;
            }
        }
        Ok(releases)
    }
}
