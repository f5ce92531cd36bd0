//! CLI context that turns raw inputs and runner environment into a setup run
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use etcetera::BaseStrategy;

use crate::consts::TOOL_NAME;
use crate::{
    host_platform, run, GhaCache, GithubReleases, Http, ReleaseRequest, SccacheCommandLine,
    SetupOptions, SetupSummary,
};

/// Raw inputs, straight from the command line or the `INPUT_*` variables
/// a workflow sets. Empty strings count as unset.
#[derive(Debug, Clone)]
pub struct SetupArgs {
    pub repository: String,
    pub release_name: String,
    pub arch: Option<String>,
    pub cache_key: String,
    pub restore_keys: Vec<String>,
    pub install_dir: Option<PathBuf>,
    pub cargo_home: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug)]
pub struct CliContext {
    pub options: SetupOptions,
    pub releases: GithubReleases,
    pub http: Http,
    pub store: GhaCache,
    pub command: SccacheCommandLine,
}

impl CliContext {
    pub fn new(args: SetupArgs) -> Result<Self> {
        if args.cache_key.trim().is_empty() {
            bail!("A cache key is required to restore the {TOOL_NAME} directory");
        }

        let platform = match args.arch.filter(|a| !a.is_empty()) {
            Some(arch) => arch,
            None => host_platform()
                .context("No prebuilt release matches this host, pass --arch explicitly")?
                .to_string(),
        };

        let restore_keys: Vec<String> = args
            .restore_keys
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect();

        let options = SetupOptions {
            release: ReleaseRequest::from(args.release_name.as_str()),
            platform,
            cache_key: args.cache_key,
            restore_keys,
            install_dir: args.install_dir.unwrap_or_else(default_install_dir),
            cargo_home: match args.cargo_home {
                Some(dir) => dir,
                None => default_cargo_home()?,
            },
            cache_dir: match args.cache_dir {
                Some(dir) => dir,
                None => default_cache_dir()?,
            },
        };

        Ok(Self {
            options,
            releases: GithubReleases::from_env(&args.repository),
            http: Http::new(),
            store: GhaCache::from_env(),
            command: SccacheCommandLine::default(),
        })
    }

    pub fn execute(&self) -> Result<SetupSummary> {
        let summary = run(
            &self.options,
            &self.releases,
            &self.http,
            &self.store,
            &self.command,
        )?;
        Ok(summary)
    }
}

/// The runner wipes `RUNNER_TEMP` between jobs, which suits a per-job install
fn default_install_dir() -> PathBuf {
    std::env::var_os("RUNNER_TEMP")
        .filter(|d| !d.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
        .join(TOOL_NAME)
}

fn default_cargo_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("CARGO_HOME").filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = etcetera::home_dir().context("Could not find the home directory")?;
    Ok(home.join(".cargo"))
}

/// Matches where sccache itself puts its cache when `SCCACHE_DIR` is unset
fn default_cache_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("SCCACHE_DIR").filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let dirs = etcetera::base_strategy::choose_base_strategy()
        .context("Could not find the user cache directory")?;
    Ok(dirs.cache_dir().join(TOOL_NAME))
}
