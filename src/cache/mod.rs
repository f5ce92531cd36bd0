//! Restores the tool's cache directory from a cache service

pub mod gha;

use std::fmt;
use std::path::{Path, PathBuf};

use fs_err as fs;

pub use gha::GhaCache;

use crate::http::HttpError;

/// What the restore step concluded. A miss is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Holds the key of the entry the service matched, which can be one of
    /// the fallback keys rather than the primary one.
    Restored(String),
    NotFound,
}

impl RestoreOutcome {
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Restored(key) => Some(key),
            Self::NotFound => None,
        }
    }
}

impl fmt::Display for RestoreOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Restored(key) => write!(f, "Cache restored from {key}."),
            Self::NotFound => f.write_str("Cache not found."),
        }
    }
}

/// A service that can look up an archive by key and unpack it onto disk.
///
/// The service tries `primary_key` exactly first, then each of
/// `restore_keys` in order as prefix matches. Returns the key of whichever
/// entry matched, `None` when nothing did.
pub trait CacheStore {
    fn restore(
        &self,
        paths: &[PathBuf],
        primary_key: &str,
        restore_keys: &[String],
    ) -> Result<Option<String>, CacheError>;
}

/// Primes `dir` and restores its contents from the store. On a miss the
/// directory is left in place, empty, so the tool starts cold.
pub fn restore_dir(
    store: &impl CacheStore,
    dir: &Path,
    primary_key: &str,
    restore_keys: &[String],
) -> Result<RestoreOutcome, CacheError> {
    fs::create_dir_all(dir)?;
    cachedir::ensure_tag(dir)?;

    let restored = store.restore(&[dir.to_path_buf()], primary_key, restore_keys)?;
    Ok(match restored {
        Some(key) => RestoreOutcome::Restored(key),
        None => RestoreOutcome::NotFound,
    })
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
#[non_exhaustive]
pub struct CacheError {
    pub source: CacheErrorKind,
}

#[derive(Debug, thiserror::Error)]
pub enum CacheErrorKind {
    #[error("{0} is not set")]
    MissingEnv(&'static str),
    #[error("Invalid cache service URL: {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Http(HttpError),
    #[error("Unexpected answer from the cache service: {0}")]
    InvalidResponse(String),
}

impl From<CacheErrorKind> for CacheError {
    fn from(source: CacheErrorKind) -> Self {
        Self { source }
    }
}

impl From<std::io::Error> for CacheError {
    fn from(error: std::io::Error) -> Self {
        Self {
            source: CacheErrorKind::Io(error),
        }
    }
}

impl From<HttpError> for CacheError {
    fn from(error: HttpError) -> Self {
        Self {
            source: CacheErrorKind::Http(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpErrorKind;
    use std::sync::Mutex;

    struct MockStore {
        key: Option<String>,
        fail: bool,
        seen: Mutex<Vec<(Vec<PathBuf>, String, Vec<String>)>>,
    }

    impl MockStore {
        fn new(key: Option<&str>) -> Self {
            Self {
                key: key.map(String::from),
                fail: false,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl CacheStore for MockStore {
        fn restore(
            &self,
            paths: &[PathBuf],
            primary_key: &str,
            restore_keys: &[String],
        ) -> Result<Option<String>, CacheError> {
            self.seen.lock().unwrap().push((
                paths.to_vec(),
                primary_key.to_string(),
                restore_keys.to_vec(),
            ));
            if self.fail {
                return Err(HttpError {
                    url: "https://cache.test/".to_string(),
                    source: HttpErrorKind::Http(500),
                }
                .into());
            }
            Ok(self.key.clone())
        }
    }

    #[test]
    fn primes_the_directory_even_on_a_miss() {
        let store = MockStore::new(None);
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("sccache");

        let outcome = restore_dir(&store, &target, "build-abc", &[]).unwrap();

        assert_eq!(outcome, RestoreOutcome::NotFound);
        assert!(target.is_dir());
        assert!(target.join("CACHEDIR.TAG").is_file());
    }

    #[test]
    fn relays_the_matched_key() {
        let store = MockStore::new(Some("build-"));
        let dir = tempfile::tempdir().unwrap();

        let keys = vec!["build-".to_string(), "v1-".to_string()];
        let outcome = restore_dir(&store, dir.path(), "build-abc", &keys).unwrap();

        assert_eq!(outcome, RestoreOutcome::Restored("build-".to_string()));
        assert_eq!(outcome.key(), Some("build-"));

        let seen = store.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, vec![dir.path().to_path_buf()]);
        assert_eq!(seen[0].1, "build-abc");
        assert_eq!(seen[0].2, keys);
    }

    #[test]
    fn store_errors_propagate() {
        let mut store = MockStore::new(None);
        store.fail = true;
        let dir = tempfile::tempdir().unwrap();

        let err = restore_dir(&store, dir.path(), "build-abc", &[]).unwrap_err();
        assert!(matches!(err.source, CacheErrorKind::Http(_)));
    }

    #[test]
    fn outcome_log_lines() {
        assert_eq!(
            RestoreOutcome::Restored("build-abc".to_string()).to_string(),
            "Cache restored from build-abc."
        );
        assert_eq!(RestoreOutcome::NotFound.to_string(), "Cache not found.");
    }
}
