use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use setup_sccache::cli::utils::write_err;
use setup_sccache::cli::{CliContext, SetupArgs};
use setup_sccache::consts;
use std::path::PathBuf;

/// Provisions sccache for a CI job: installs a release, points cargo's
/// `rustc-wrapper` at it, restores the compilation cache and resets the stats.
#[derive(Parser)]
#[clap(version = env!("SETUP_SCCACHE_LONG_VERSION"), about)]
pub struct Cli {
    /// Primary key for the cache lookup
    #[clap(long, env = "INPUT_CACHE_KEY")]
    pub cache_key: String,

    /// Fallback key prefixes, tried in order when the primary key misses
    #[clap(long = "restore-key", env = "INPUT_RESTORE_KEYS", value_delimiter = '\n')]
    pub restore_keys: Vec<String>,

    /// Release to install, either "latest" or a tag like "v0.8.2"
    #[clap(long, env = "INPUT_RELEASE_NAME", default_value = "latest")]
    pub release_name: String,

    /// Target triple of the release asset, detected from the host when unset
    #[clap(long, env = "INPUT_ARCH")]
    pub arch: Option<String>,

    /// GitHub repository to install releases from
    #[clap(long, default_value = consts::DEFAULT_REPOSITORY)]
    pub repository: String,

    /// Where the binary gets installed [default: $RUNNER_TEMP/sccache]
    #[clap(long)]
    pub install_dir: Option<PathBuf>,

    /// Cargo home holding the config to edit [default: $CARGO_HOME or ~/.cargo]
    #[clap(long)]
    pub cargo_home: Option<PathBuf>,

    /// Directory the cache gets restored into [default: $SCCACHE_DIR or the user cache dir]
    #[clap(long)]
    pub cache_dir: Option<PathBuf>,

    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Cli {
    fn into_args(self) -> SetupArgs {
        SetupArgs {
            repository: self.repository,
            release_name: self.release_name,
            arch: self.arch,
            cache_key: self.cache_key,
            restore_keys: self.restore_keys,
            install_dir: self.install_dir,
            cargo_home: self.cargo_home,
            cache_dir: self.cache_dir,
        }
    }
}

fn try_main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .init();

    let context = CliContext::new(cli.into_args())?;
    context.execute()?;
    Ok(())
}

fn main() {
    if let Err(e) = try_main() {
        log::error!("{}", write_err(&*e));
        std::process::exit(1);
    }
}
