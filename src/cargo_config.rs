//! Points cargo at the installed wrapper without touching anything else

use std::path::{Path, PathBuf};

use fs_err as fs;
use toml_edit::DocumentMut;

/// Cargo warns when both `config` and `config.toml` exist, so a pre-existing
/// legacy file keeps getting the edits.
pub fn config_file_path(cargo_home: &Path) -> PathBuf {
    let legacy = cargo_home.join("config");
    if legacy.is_file() {
        legacy
    } else {
        cargo_home.join("config.toml")
    }
}

/// Sets `build.rustc-wrapper`, creating the file if needed and leaving every
/// other setting (and its formatting) alone.
pub fn set_rustc_wrapper(config_path: &Path, wrapper: &Path) -> Result<(), ConfigEditError> {
    let content = if config_path.is_file() {
        fs::read_to_string(config_path).map_err(|e| ConfigEditError {
            path: config_path.into(),
            source: ConfigEditErrorKind::Io(e),
        })?
    } else {
        String::new()
    };

    let mut doc = content.parse::<DocumentMut>().map_err(|e| ConfigEditError {
        path: config_path.into(),
        source: ConfigEditErrorKind::Parse(e),
    })?;

    let wrapper = wrapper.to_str().ok_or_else(|| ConfigEditError {
        path: config_path.into(),
        source: ConfigEditErrorKind::NonUtf8Wrapper(wrapper.to_path_buf()),
    })?;

    // `build` is usually a regular table but `build = { ... }` is legal too
    let build = doc.entry("build").or_insert(toml_edit::table());
    let Some(table) = build.as_table_like_mut() else {
        return Err(ConfigEditError {
            path: config_path.into(),
            source: ConfigEditErrorKind::NotATable("build".to_string()),
        });
    };
    table.insert("rustc-wrapper", toml_edit::value(wrapper));

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| ConfigEditError {
            path: config_path.into(),
            source: ConfigEditErrorKind::Io(e),
        })?;
    }
    fs::write(config_path, doc.to_string()).map_err(|e| ConfigEditError {
        path: config_path.into(),
        source: ConfigEditErrorKind::Io(e),
    })?;

    log::debug!(
        "Set rustc-wrapper = {wrapper} in {}",
        config_path.display()
    );
    Ok(())
}

#[derive(Debug, thiserror::Error)]
#[error("Failed to edit cargo config at `{path}`")]
#[non_exhaustive]
pub struct ConfigEditError {
    path: Box<Path>,
    source: ConfigEditErrorKind,
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub enum ConfigEditErrorKind {
    Io(#[from] std::io::Error),
    Parse(#[from] toml_edit::TomlError),
    #[error("The `{0}` entry is not a table")]
    NotATable(String),
    #[error("Wrapper path {0} cannot be written as a TOML string")]
    NonUtf8Wrapper(PathBuf),
}
