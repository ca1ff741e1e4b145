//! Default parameter directory per platform.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

/// `~/.zcash-params` on Linux and other Unixes,
/// `~/Library/Application Support/ZcashParams` on macOS,
/// `%APPDATA%\ZcashParams` on Windows.
pub fn default_params_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    let roaming = dirs::data_dir();
    Ok(params_dir_for(std::env::consts::OS, &home, roaming.as_deref()))
}

/// Platform rule behind [`default_params_dir`]. `data_dir` is the OS
/// per-user application data directory, when there is one.
pub fn params_dir_for(os: &str, home: &Path, data_dir: Option<&Path>) -> PathBuf {
    match os {
        "macos" => home
            .join("Library")
            .join("Application Support")
            .join("ZcashParams"),
        "windows" => data_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| home.join("AppData").join("Roaming"))
            .join("ZcashParams"),
        _ => home.join(".zcash-params"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_os_layout() {
        let home = Path::new("/home/alice");
        assert_eq!(
            params_dir_for("linux", home, None),
            PathBuf::from("/home/alice/.zcash-params")
        );
        assert_eq!(
            params_dir_for("freebsd", home, None),
            PathBuf::from("/home/alice/.zcash-params")
        );
        assert_eq!(
            params_dir_for("macos", home, None),
            home.join("Library/Application Support/ZcashParams")
        );
        assert_eq!(
            params_dir_for("windows", home, Some(Path::new("/roaming"))),
            Path::new("/roaming").join("ZcashParams")
        );
        assert_eq!(
            params_dir_for("windows", home, None),
            home.join("AppData").join("Roaming").join("ZcashParams")
        );
    }
}
