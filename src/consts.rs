pub const TOOL_NAME: &str = "sccache";
pub const DEFAULT_REPOSITORY: &str = "mozilla/sccache";

#[cfg(windows)]
pub const BIN_FILE_NAME: &str = "sccache.exe";
#[cfg(not(windows))]
pub const BIN_FILE_NAME: &str = "sccache";

pub(crate) const GITHUB_API_URL: &str = "https://api.github.com";
pub(crate) const GITHUB_API_URL_ENV_VAR_NAME: &str = "GITHUB_API_URL";
pub(crate) const GITHUB_TOKEN_ENV_VAR_NAMES: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];
// https://docs.github.com/en/rest/releases/releases#list-releases
pub(crate) const RELEASES_PER_PAGE: usize = 100;
pub(crate) const MAX_RELEASE_PAGES: usize = 10;

pub(crate) const CACHE_URL_ENV_VAR_NAME: &str = "ACTIONS_CACHE_URL";
pub(crate) const CACHE_TOKEN_ENV_VAR_NAME: &str = "ACTIONS_RUNTIME_TOKEN";
// The artifactcache endpoint ignores requests without this exact version
pub(crate) const CACHE_API_ACCEPT: &str = "application/json;api-version=6.0-preview.1";

pub(crate) const USER_AGENT: &str = concat!("setup-sccache/", env!("CARGO_PKG_VERSION"));
