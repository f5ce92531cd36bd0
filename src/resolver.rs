//! Picks the release asset to install for a platform

use std::fmt;

use regex::Regex;

use crate::consts::TOOL_NAME;
use crate::github::{Asset, Release, ReleaseSource};
use crate::http::HttpError;

/// Which release of the distribution to install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseRequest {
    Latest,
    Tag(String),
}

impl From<&str> for ReleaseRequest {
    fn from(name: &str) -> Self {
        // An unset CI input arrives as an empty string
        match name {
            "" | "latest" => Self::Latest,
            tag => Self::Tag(tag.to_string()),
        }
    }
}

impl fmt::Display for ReleaseRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("latest"),
            Self::Tag(tag) => f.write_str(tag),
        }
    }
}

impl ReleaseRequest {
    /// Asset names look like `sccache-v0.8.2-x86_64-unknown-linux-musl.tar.gz`.
    /// For `Latest` any version is accepted, otherwise the tag is matched
    /// verbatim. Anchored on both ends so `.sha256` sidecar files never match.
    fn asset_pattern(&self, platform: &str) -> Regex {
        let version = match self {
            Self::Latest => "v(.*?)".to_string(),
            Self::Tag(tag) => regex::escape(tag),
        };
        let pattern = format!(
            "^{}-{}-{}\\.tar\\.gz$",
            regex::escape(TOOL_NAME),
            version,
            regex::escape(platform)
        );
        Regex::new(&pattern).expect("literal parts are escaped")
    }
}

/// Finds the single asset for `platform` in the requested release.
pub fn resolve(
    source: &impl ReleaseSource,
    request: &ReleaseRequest,
    platform: &str,
) -> Result<Asset, ResolveError> {
    let release = match request {
        ReleaseRequest::Latest => source.latest_release().map_err(|e| {
            // A repository without any release 404s here
            if e.status() == Some(404) {
                ResolveError::from(ResolveErrorKind::ReleaseNotFound {
                    tag: "latest".to_string(),
                })
            } else {
                e.into()
            }
        })?,
        ReleaseRequest::Tag(tag) => source
            .list_releases()?
            .into_iter()
            .find(|r| &r.tag_name == tag)
            .ok_or_else(|| ResolveErrorKind::ReleaseNotFound { tag: tag.clone() })?,
    };

    let pattern = request.asset_pattern(platform);
    let asset = matching_asset(&release, &pattern)?;
    log::debug!(
        "Resolved release {} to asset {}",
        release.tag_name,
        asset.name
    );
    Ok(asset)
}

fn matching_asset(release: &Release, pattern: &Regex) -> Result<Asset, ResolveError> {
    let matched: Vec<&Asset> = release
        .assets
        .iter()
        .filter(|a| pattern.is_match(&a.name))
        .collect();

    match matched.as_slice() {
        [asset] => Ok((*asset).clone()),
        [] => Err(ResolveErrorKind::AssetNotFound {
            tag: release.tag_name.clone(),
            pattern: pattern.to_string(),
        }
        .into()),
        many => Err(ResolveErrorKind::AmbiguousAsset {
            tag: release.tag_name.clone(),
            pattern: pattern.to_string(),
            names: many.iter().map(|a| a.name.clone()).collect(),
        }
        .into()),
    }
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
#[non_exhaustive]
pub struct ResolveError {
    pub source: ResolveErrorKind,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveErrorKind {
    #[error(transparent)]
    Remote(HttpError),
    #[error("No release tagged `{tag}`")]
    ReleaseNotFound { tag: String },
    #[error("No asset in release `{tag}` matches `{pattern}`")]
    AssetNotFound { tag: String, pattern: String },
    #[error("Multiple assets in release `{tag}` match `{pattern}`: {names:?}")]
    AmbiguousAsset {
        tag: String,
        pattern: String,
        names: Vec<String>,
    },
}

impl From<ResolveErrorKind> for ResolveError {
    fn from(source: ResolveErrorKind) -> Self {
        Self { source }
    }
}

impl From<HttpError> for ResolveError {
    fn from(error: HttpError) -> Self {
        Self {
            source: ResolveErrorKind::Remote(error),
        }
    }
}
