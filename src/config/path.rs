//! Module for searching for config files

use std::path::PathBuf;

use crate::constants::CONFIG_PREFIX;

/// Base system fallback path to use if one cannot be found with XDG
const FALLBACK_BASE_PATH: &str = "/usr/share/hori-flightstick";

/// Name of the config file in each search directory
const CONFIG_FILE: &str = "config.yaml";

/// Returns the base path for configuration data
pub fn get_base_path() -> PathBuf {
    let Ok(base_dirs) = xdg::BaseDirectories::with_prefix(CONFIG_PREFIX) else {
        log::warn!("Unable to determine config base path. Using fallback path.");
        return PathBuf::from(FALLBACK_BASE_PATH);
    };

    // Get the data directories in preference order
    let data_dirs = base_dirs.get_data_dirs();
    for dir in data_dirs {
        if dir.exists() {
            return dir;
        }
    }

    log::debug!("Config base path not found. Using fallback path.");
    PathBuf::from(FALLBACK_BASE_PATH)
}

/// Returns a list of config file paths in load order.
/// E.g. ["/etc/hori-flightstick/config.yaml", "/usr/share/hori-flightstick/config.yaml"]
pub fn get_config_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/etc").join(CONFIG_PREFIX).join(CONFIG_FILE),
        get_base_path().join(CONFIG_FILE),
        PathBuf::from("./rootfs/usr/share")
            .join(CONFIG_PREFIX)
            .join(CONFIG_FILE),
    ]
}

/// Returns the first config file that exists in the search paths
pub fn find_config() -> Option<PathBuf> {
    get_config_paths().into_iter().find(|path| {
        log::trace!("Checking {path:?} for config");
        path.is_file()
    })
}
