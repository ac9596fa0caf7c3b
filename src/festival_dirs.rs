//! Application directory paths.
//!
//! Uses the [`dirs`] crate for platform-appropriate locations.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | Data (store files) | `~/Library/Application Support/festival/` | `~/.local/share/festival/` |
//! | Config | `~/Library/Application Support/festival/` | `~/.config/festival/` |
//!
//! Overrides: `FESTIVAL_DATA_DIR` replaces [`data_dir`] and
//! `FESTIVAL_CONFIG_DIR` replaces [`config_dir`].

use std::path::PathBuf;

/// Root for persisted favorites, settings and the notification ledger.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("FESTIVAL_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("festival"))
        .unwrap_or_else(|| PathBuf::from("/tmp/festival-data"))
}

/// Directory holding `config.toml`.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("FESTIVAL_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("festival"))
        .unwrap_or_else(|| PathBuf::from("/tmp/festival-config"))
}

/// Key-value store directory, `data_dir()/store/`.
#[must_use]
pub fn store_dir() -> PathBuf {
    data_dir().join("store")
}

/// `config_dir()/config.toml`.
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}
