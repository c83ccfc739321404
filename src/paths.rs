//! Config path resolution for bmcbutler
//!
//! # Environment Variables
//!
//! - `BMCBUTLER_CONFIG_DIR` - Override config directory
//!
//! # Path Resolution Priority
//!
//! 1. `BMCBUTLER_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/bmcbutler` (if set)
//! 3. Default: `~/.config/bmcbutler`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "BMCBUTLER_CONFIG_DIR";

/// Name of the butler configuration file inside the config directory
pub const CONFIG_FILE: &str = "bmcbutler.toml";

/// Get the bmcbutler config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("bmcbutler");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("bmcbutler");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Default location of the butler configuration file
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE))
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Helper to run a test with temporary env var
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: no other test reads this variable
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: as above
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    #[test]
    fn test_config_dir_env_override() {
        with_env_var(ENV_CONFIG_DIR, "/custom/butler", || {
            assert_eq!(config_dir().unwrap(), PathBuf::from("/custom/butler"));
            assert_eq!(
                config_file().unwrap(),
                PathBuf::from("/custom/butler/bmcbutler.toml")
            );
        });
    }

    #[test]
    fn test_expand_with_tilde() {
        let result = expand("~/inventory.csv");
        let home = dirs::home_dir().unwrap();
        assert_eq!(result, home.join("inventory.csv"));
    }

    #[test]
    fn test_expand_absolute() {
        assert_eq!(expand("/etc/bmcbutler"), PathBuf::from("/etc/bmcbutler"));
    }
}
