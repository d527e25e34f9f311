// src/infra/paths.rs — Config path management
//
// DATASCRIBE_HOME overrides everything. Otherwise config lives in
// ~/.datascribe/. Nothing else is persisted.

use std::path::PathBuf;

/// Returns the DATASCRIBE_HOME override, if set.
fn datascribe_home() -> Option<PathBuf> {
    std::env::var_os("DATASCRIBE_HOME").map(PathBuf::from)
}

/// Configuration directory: $DATASCRIBE_HOME/ or ~/.datascribe/
pub fn config_dir() -> Option<PathBuf> {
    if let Some(home) = datascribe_home() {
        return Some(home);
    }
    dirs_home().map(|home| home.join(".datascribe"))
}

/// Home directory, if the platform can tell us.
pub fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

/// Config file path
pub fn config_file_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
