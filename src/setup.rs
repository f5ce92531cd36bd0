use std::path::PathBuf;

use crate::cache::{self, CacheError, CacheStore, RestoreOutcome};
use crate::cargo_config::{self, ConfigEditError};
use crate::consts::TOOL_NAME;
use crate::github::ReleaseSource;
use crate::http::HttpDownload;
use crate::install::{self, InstallError};
use crate::resolver::{self, ReleaseRequest, ResolveError};
use crate::stats::{SccacheCmd, StatsError};

#[derive(Debug, Clone)]
pub struct SetupOptions {
    pub release: ReleaseRequest,
    /// Target triple used to pick the release asset, e.g. `x86_64-unknown-linux-musl`
    pub platform: String,
    pub cache_key: String,
    /// Tried in order as prefix matches when the primary key misses
    pub restore_keys: Vec<String>,
    pub install_dir: PathBuf,
    pub cargo_home: PathBuf,
    pub cache_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupSummary {
    pub asset_name: String,
    pub bin_path: PathBuf,
    pub restore: RestoreOutcome,
}

/// Provisions sccache for the current job: installs the requested release,
/// points cargo's `rustc-wrapper` at it, restores the compilation cache and
/// zeroes the tool's statistics.
///
/// The steps run in that order and the first failure aborts the run. A cache
/// miss is not a failure.
pub fn run(
    options: &SetupOptions,
    source: &impl ReleaseSource,
    http: &impl HttpDownload,
    store: &impl CacheStore,
    command: &impl SccacheCmd,
) -> Result<SetupSummary, SetupError> {
    let asset = resolver::resolve(source, &options.release, &options.platform)?;
    log::info!("Resolved {TOOL_NAME} {} to {}", options.release, asset.name);

    let tool = install::install_asset(http, &asset, &options.install_dir)?;
    log::info!("Installed {TOOL_NAME} at {}", tool.bin_path.display());

    let config_path = cargo_config::config_file_path(&options.cargo_home);
    cargo_config::set_rustc_wrapper(&config_path, &tool.bin_path)?;
    log::info!("Set rustc-wrapper in {}", config_path.display());

    let restore = cache::restore_dir(
        store,
        &options.cache_dir,
        &options.cache_key,
        &options.restore_keys,
    )?;
    log::info!("{restore}");

    command.zero_stats(&tool.bin_path)?;
    log::debug!("Statistics reset");

    Ok(SetupSummary {
        asset_name: asset.name,
        bin_path: tool.bin_path,
        restore,
    })
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
#[non_exhaustive]
pub struct SetupError {
    pub source: SetupErrorKind,
}

#[derive(Debug, thiserror::Error)]
pub enum SetupErrorKind {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Install(#[from] InstallError),
    #[error(transparent)]
    Config(#[from] ConfigEditError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Stats(#[from] StatsError),
}

impl From<ResolveError> for SetupError {
    fn from(value: ResolveError) -> Self {
        Self {
            source: value.into(),
        }
    }
}

impl From<InstallError> for SetupError {
    fn from(value: InstallError) -> Self {
        Self {
            source: value.into(),
        }
    }
}

impl From<ConfigEditError> for SetupError {
    fn from(value: ConfigEditError) -> Self {
        Self {
            source: value.into(),
        }
    }
}

impl From<CacheError> for SetupError {
    fn from(value: CacheError) -> Self {
        Self {
            source: value.into(),
        }
    }
}

impl From<StatsError> for SetupError {
    fn from(value: StatsError) -> Self {
        Self {
            source: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheErrorKind;
    use crate::consts::BIN_FILE_NAME;
    use crate::github::{Asset, Release};
    use crate::http::{HttpError, HttpErrorKind};
    use crate::stats::StatsErrorKind;
    use std::io::Write;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use url::Url;

    const PLATFORM: &str = "x86_64-unknown-linux-musl";
    const ASSET: &str = "sccache-v0.8.2-x86_64-unknown-linux-musl.tar.gz";

    #[derive(Debug, Clone, Default)]
    struct Steps(Arc<Mutex<Vec<&'static str>>>);

    impl Steps {
        fn push(&self, step: &'static str) {
            self.0.lock().unwrap().push(step);
        }

        fn taken(&self) -> Vec<&'static str> {
            self.0.lock().unwrap().clone()
        }
    }

    struct MockSource {
        steps: Steps,
        release: Option<Release>,
    }

    impl ReleaseSource for MockSource {
        fn latest_release(&self) -> Result<Release, HttpError> {
            self.steps.push("resolve");
            self.release.clone().ok_or(HttpError {
                url: "https://api.invalid/releases/latest".to_string(),
                source: HttpErrorKind::Http(500),
            })
        }

        fn list_releases(&self) -> Result<Vec<Release>, HttpError> {
            self.latest_release().map(|release| vec![release])
        }
    }

    struct MockDownload {
        steps: Steps,
        body: Vec<u8>,
    }

    impl HttpDownload for MockDownload {
        fn download<W: Write>(
            &self,
            url: &Url,
            writer: &mut W,
            _headers: Vec<(&str, String)>,
        ) -> Result<u64, HttpError> {
            self.steps.push("download");
            writer
                .write_all(&self.body)
                .map_err(|e| HttpError::from_io(url.as_str(), e))?;
            Ok(self.body.len() as u64)
        }

        fn download_and_untar(
            &self,
            _url: &Url,
            _destination: impl AsRef<Path>,
            _headers: Vec<(&str, String)>,
        ) -> Result<(), HttpError> {
            unreachable!("archive restores go through the cache store")
        }
    }

    struct MockStore {
        steps: Steps,
        matched: Option<String>,
        fail: bool,
    }

    impl CacheStore for MockStore {
        fn restore(
            &self,
            _paths: &[PathBuf],
            _primary_key: &str,
            _restore_keys: &[String],
        ) -> Result<Option<String>, CacheError> {
            self.steps.push("restore");
            if self.fail {
                return Err(CacheErrorKind::MissingEnv("ACTIONS_CACHE_URL").into());
            }
            Ok(self.matched.clone())
        }
    }

    struct MockCommand {
        steps: Steps,
        fail: bool,
    }

    impl SccacheCmd for MockCommand {
        fn zero_stats(&self, bin: &Path) -> Result<(), StatsError> {
            self.steps.push("zero-stats");
            if self.fail {
                return Err(StatsError {
                    bin: bin.into(),
                    source: StatsErrorKind::Spawn(std::io::Error::other("boom")),
                });
            }
            Ok(())
        }
    }

    fn release() -> Release {
        Release {
            tag_name: "v0.8.2".to_string(),
            assets: vec![Asset {
                name: ASSET.to_string(),
                browser_download_url: Url::parse(&format!("https://dl.invalid/{ASSET}")).unwrap(),
                digest: None,
            }],
        }
    }

    fn tool_archive() -> Vec<u8> {
        let stem = ASSET.strip_suffix(".tar.gz").unwrap();
        let gz = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(gz);
        let mut header = tar::Header::new_gnu();
        let data = b"#!/bin/sh\nexit 0\n";
        header.set_size(data.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("{stem}/{BIN_FILE_NAME}"), &data[..])
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn options(root: &Path) -> SetupOptions {
        SetupOptions {
            release: ReleaseRequest::Latest,
            platform: PLATFORM.to_string(),
            cache_key: "build-abc".to_string(),
            restore_keys: vec!["build-".to_string()],
            install_dir: root.join("tools"),
            cargo_home: root.join("cargo"),
            cache_dir: root.join("sccache-data"),
        }
    }

    fn collaborators(
        steps: &Steps,
        matched: Option<String>,
    ) -> (MockSource, MockDownload, MockStore, MockCommand) {
        (
            MockSource {
                steps: steps.clone(),
                release: Some(release()),
            },
            MockDownload {
                steps: steps.clone(),
                body: tool_archive(),
            },
            MockStore {
                steps: steps.clone(),
                matched,
                fail: false,
            },
            MockCommand {
                steps: steps.clone(),
                fail: false,
            },
        )
    }

    #[test]
    fn runs_every_step_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path());
        let steps = Steps::default();
        let (source, http, store, command) =
            collaborators(&steps, Some("build-abc".to_string()));

        let summary = run(&options, &source, &http, &store, &command).unwrap();

        assert_eq!(steps.taken(), ["resolve", "download", "restore", "zero-stats"]);
        assert_eq!(summary.asset_name, ASSET);
        assert_eq!(summary.bin_path, options.install_dir.join(BIN_FILE_NAME));
        assert_eq!(summary.restore, RestoreOutcome::Restored("build-abc".to_string()));
        assert!(summary.bin_path.is_file());
        assert!(options.cache_dir.join("CACHEDIR.TAG").is_file());
    }

    #[test]
    fn the_wrapper_points_at_the_installed_binary() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path());
        let steps = Steps::default();
        let (source, http, store, command) = collaborators(&steps, None);

        let summary = run(&options, &source, &http, &store, &command).unwrap();

        let written =
            std::fs::read_to_string(options.cargo_home.join("config.toml")).unwrap();
        let config: toml::Value = toml::from_str(&written).unwrap();
        assert_eq!(
            config["build"]["rustc-wrapper"].as_str().unwrap(),
            summary.bin_path.to_str().unwrap()
        );
    }

    #[test]
    fn a_cache_miss_still_resets_stats() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path());
        let steps = Steps::default();
        let (source, http, store, command) = collaborators(&steps, None);

        let summary = run(&options, &source, &http, &store, &command).unwrap();

        assert_eq!(summary.restore, RestoreOutcome::NotFound);
        assert_eq!(steps.taken().last(), Some(&"zero-stats"));
    }

    #[test]
    fn a_resolution_failure_stops_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path());
        let steps = Steps::default();
        let (_, http, store, command) = collaborators(&steps, None);
        let source = MockSource {
            steps: steps.clone(),
            release: None,
        };

        let err = run(&options, &source, &http, &store, &command).unwrap_err();

        assert!(matches!(err.source, SetupErrorKind::Resolve(_)));
        assert_eq!(steps.taken(), ["resolve"]);
        assert!(!options.cargo_home.join("config.toml").exists());
    }

    #[test]
    fn a_cache_failure_aborts_before_stats() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path());
        let steps = Steps::default();
        let (source, http, _, command) = collaborators(&steps, None);
        let store = MockStore {
            steps: steps.clone(),
            matched: None,
            fail: true,
        };

        let err = run(&options, &source, &http, &store, &command).unwrap_err();

        assert!(matches!(err.source, SetupErrorKind::Cache(_)));
        assert_eq!(steps.taken(), ["resolve", "download", "restore"]);
        // The wrapper was already configured by the time the restore failed
        assert!(options.cargo_home.join("config.toml").is_file());
    }

    #[test]
    fn a_stats_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path());
        let steps = Steps::default();
        let (source, http, store, _) = collaborators(&steps, None);
        let command = MockCommand {
            steps: steps.clone(),
            fail: true,
        };

        let err = run(&options, &source, &http, &store, &command).unwrap_err();

        assert!(matches!(err.source, SetupErrorKind::Stats(_)));
        assert_eq!(steps.taken(), ["resolve", "download", "restore", "zero-stats"]);
    }
}
