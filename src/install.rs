//! Downloads a release asset and installs the binary at a stable path

use std::io;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use fs_err as fs;
use tar::Archive;
use walkdir::WalkDir;

use crate::consts::BIN_FILE_NAME;
use crate::github::Asset;
use crate::http::{HttpDownload, HttpError};
use crate::utils::sha256_hex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledTool {
    pub bin_path: PathBuf,
}

/// Puts the asset's binary at `<install_dir>/sccache`, replacing any previous
/// install. The stable path is what ends up in cargo's config, so reruns with
/// a different release keep the config valid.
pub fn install_asset(
    http: &impl HttpDownload,
    asset: &Asset,
    install_dir: &Path,
) -> Result<InstalledTool, InstallError> {
    fs::create_dir_all(install_dir)?;

    log::info!("Downloading {}", asset.browser_download_url);
    let mut data = Vec::new();
    http.download(&asset.browser_download_url, &mut data, Vec::new())?;

    if let Some(digest) = &asset.digest {
        verify_digest(&data, digest)?;
    }

    // Unpack into a staging dir so a failed extraction never leaves a
    // half-written tree at the stable path
    let staging = tempfile::tempdir_in(install_dir)?;
    let tar = GzDecoder::new(&data[..]);
    Archive::new(tar).unpack(staging.path())?;

    let source_bin = find_binary(staging.path(), &asset.name).ok_or_else(|| InstallError {
        source: InstallErrorKind::MissingBinary {
            archive: asset.name.clone(),
        },
    })?;

    let bin_path = install_dir.join(BIN_FILE_NAME);
    if bin_path.exists() {
        fs::remove_file(&bin_path)?;
    }
    fs::rename(&source_bin, &bin_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&bin_path, std::fs::Permissions::from_mode(0o755))?;
    }

    log::debug!("Unpacked {} into {}", asset.name, bin_path.display());
    Ok(InstalledTool { bin_path })
}

/// Release archives nest the binary under the asset stem
/// (`sccache-v0.8.2-<platform>/sccache`), but don't rely on that layout.
fn find_binary(staging: &Path, asset_name: &str) -> Option<PathBuf> {
    let stem = asset_name.strip_suffix(".tar.gz").unwrap_or(asset_name);
    let expected = staging.join(stem).join(BIN_FILE_NAME);
    if expected.is_file() {
        return Some(expected);
    }

    WalkDir::new(staging)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .find(|entry| entry.file_type().is_file() && entry.file_name() == BIN_FILE_NAME)
        .map(|entry| entry.into_path())
}

fn verify_digest(data: &[u8], digest: &str) -> Result<(), InstallError> {
    let Some(expected) = digest.strip_prefix("sha256:") else {
        log::debug!("Skipping unsupported asset digest `{digest}`");
        return Ok(());
    };

    let actual = sha256_hex(data);
    if !expected.eq_ignore_ascii_case(&actual) {
        return Err(InstallError {
            source: InstallErrorKind::DigestMismatch {
                expected: expected.to_string(),
                actual,
            },
        });
    }
    log::debug!("Asset digest verified ({actual})");
    Ok(())
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
#[non_exhaustive]
pub struct InstallError {
    pub source: InstallErrorKind,
}

#[derive(Debug, thiserror::Error)]
pub enum InstallErrorKind {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Download(HttpError),
    #[error("Archive digest is {actual}, the release listing says {expected}")]
    DigestMismatch { expected: String, actual: String },
    #[error("No tool binary inside `{archive}`")]
    MissingBinary { archive: String },
}

impl From<io::Error> for InstallError {
    fn from(error: io::Error) -> Self {
        Self {
            source: InstallErrorKind::Io(error),
        }
    }
}

impl From<HttpError> for InstallError {
    fn from(error: HttpError) -> Self {
        Self {
            source: InstallErrorKind::Download(error),
        }
    }
}
