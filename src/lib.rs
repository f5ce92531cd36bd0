mod cache;
mod cargo_config;
mod github;
mod http;
mod install;
mod platform;
mod resolver;
mod setup;
mod stats;
mod utils;

#[cfg(feature = "cli")]
pub mod cli;

pub mod consts;

pub use cache::{restore_dir, CacheError, CacheErrorKind, CacheStore, GhaCache, RestoreOutcome};
pub use cargo_config::{config_file_path, set_rustc_wrapper, ConfigEditError, ConfigEditErrorKind};
pub use github::{Asset, GithubReleases, Release, ReleaseSource};
pub use http::{Http, HttpDownload, HttpError, HttpErrorKind};
pub use install::{install_asset, InstallError, InstallErrorKind, InstalledTool};
pub use platform::host_platform;
pub use resolver::{resolve, ReleaseRequest, ResolveError, ResolveErrorKind};
pub use setup::{run, SetupError, SetupErrorKind, SetupOptions, SetupSummary};
pub use stats::{SccacheCmd, SccacheCommandLine, StatsError, StatsErrorKind};
