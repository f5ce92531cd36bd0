use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use flate2::read::GzDecoder;
use fs_err as fs;
use tar::Archive;
use url::Url;

use crate::consts::USER_AGENT;

// Cache archives can run to gigabytes, far past ureq's default body cap
const BODY_LIMIT: u64 = 16 * 1024 * 1024 * 1024;

pub trait HttpDownload {
    fn download<W: Write>(
        &self,
        url: &Url,
        writer: &mut W,
        headers: Vec<(&str, String)>,
    ) -> Result<u64, HttpError>;

    fn download_and_untar(
        &self,
        url: &Url,
        destination: impl AsRef<Path>,
        headers: Vec<(&str, String)>,
    ) -> Result<(), HttpError>;
}

/// All requests go through a single agent so connections get reused.
#[derive(Debug, Clone)]
pub struct Http {
    agent: ureq::Agent,
}

impl Http {
    pub fn new() -> Self {
        let config = ureq::Agent::config_builder()
            .user_agent(USER_AGENT)
            .timeout_connect(Some(Duration::from_secs(10)))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }

    pub(crate) fn get(
        &self,
        url: &str,
        headers: &[(&str, String)],
    ) -> Result<ureq::http::Response<ureq::Body>, HttpError> {
        let mut request = self.agent.get(url);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }
        request.call().map_err(|e| HttpError::from_ureq(url, e))
    }
}

impl Default for Http {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpDownload for Http {
    fn download<W: Write>(
        &self,
        url: &Url,
        writer: &mut W,
        headers: Vec<(&str, String)>,
    ) -> Result<u64, HttpError> {
        let response = self.get(url.as_str(), &headers)?;
        let mut reader = response.into_body().into_with_config().limit(BODY_LIMIT).reader();
        let written =
            io::copy(&mut reader, writer).map_err(|e| HttpError::from_io(url.as_str(), e))?;
        log::debug!("Downloaded {written} bytes from {url}");
        Ok(written)
    }

    fn download_and_untar(
        &self,
        url: &Url,
        destination: impl AsRef<Path>,
        headers: Vec<(&str, String)>,
    ) -> Result<(), HttpError> {
        let destination = destination.as_ref();
        fs::create_dir_all(destination).map_err(|e| HttpError::from_io(url.as_str(), e))?;

        let response = self.get(url.as_str(), &headers)?;
        let reader = response.into_body().into_with_config().limit(BODY_LIMIT).reader();
        let tar = GzDecoder::new(reader);
        let mut archive = Archive::new(tar);
        archive
            .unpack(destination)
            .map_err(|e| HttpError::from_io(url.as_str(), e))?;

        log::debug!("Extracted {url} into {}", destination.display());
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Request to `{url}` failed")]
#[non_exhaustive]
pub struct HttpError {
    pub url: String,
    pub source: HttpErrorKind,
}

#[derive(Debug, thiserror::Error)]
pub enum HttpErrorKind {
    #[error("Status code {0}")]
    Http(u16),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Transport(Box<ureq::Error>),
}

impl HttpError {
    pub(crate) fn from_ureq(url: &str, error: ureq::Error) -> Self {
        let source = match error {
            ureq::Error::StatusCode(code) => HttpErrorKind::Http(code),
            e => HttpErrorKind::Transport(Box::new(e)),
        };
        Self {
            url: url.to_string(),
            source,
        }
    }

    pub(crate) fn from_io(url: &str, error: io::Error) -> Self {
        Self {
            url: url.to_string(),
            source: HttpErrorKind::Io(error),
        }
    }

    /// The HTTP status, if the server got far enough to send one.
    pub fn status(&self) -> Option<u16> {
        match self.source {
            HttpErrorKind::Http(code) => Some(code),
            _ => None,
        }
    }
}
