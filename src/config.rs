use anyhow::{Context, Result, bail};
use butler::Credential;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::{SourceKind, TargetArgs};
use crate::paths;

// ============================================================================
// Butler Config
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ButlerConfig {
    /// Locations this butler manages
    pub locations: Vec<String>,
    /// Number of concurrent butlers
    pub butlers: usize,
    /// Assets per channel message, and ENC page size
    pub batch_size: usize,
    pub ignore_location: bool,
    pub dry_run: bool,
    /// Tried in order on every asset
    pub credentials: Vec<Credential>,
    /// Distribution endpoint for firmware updates
    pub firmware_endpoint: Option<String>,
    pub inventory: InventoryConfig,
}

impl Default for ButlerConfig {
    fn default() -> Self {
        Self {
            locations: Vec::new(),
            butlers: 5,
            batch_size: 10,
            ignore_location: false,
            dry_run: false,
            credentials: Vec::new(),
            firmware_endpoint: None,
            inventory: InventoryConfig::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    pub source: SourceKind,
    pub csv: CsvConfig,
    pub enc: EncConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CsvConfig {
    pub file: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EncConfig {
    /// ENC executable
    pub bin: String,
    /// Interface name prefixes that identify BMC NICs
    pub bmc_nic_prefix: Vec<String>,
    /// Attempts per paginated query
    pub retries: u32,
    pub retry_delay_secs: u64,
}

impl Default for EncConfig {
    fn default() -> Self {
        Self {
            bin: "enc".to_string(),
            bmc_nic_prefix: Vec::new(),
            retries: 3,
            retry_delay_secs: 10,
        }
    }
}

impl ButlerConfig {
    /// Load the config file at `path`, or the default one.
    ///
    /// An explicit path must exist; a missing default file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (paths::config_file()?, false),
        };

        if !explicit && !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply command line overrides.
    pub fn merge_args(&mut self, args: &TargetArgs) {
        if let Some(locations) = &args.locations {
            self.locations = inventory::split_list(locations);
        }
        if let Some(butlers) = args.butlers {
            self.butlers = butlers;
        }
        if let Some(source) = args.source {
            self.inventory.source = source;
        }
        self.ignore_location |= args.ignore_location;
        self.dry_run |= args.dry_run;
    }

    /// CSV inventory file, with ~ and variables expanded.
    pub fn csv_file(&self) -> Result<PathBuf> {
        match &self.inventory.csv.file {
            Some(file) => Ok(paths::expand(file)),
            None => bail!("inventory.csv.file must be set to use the csv source"),
        }
    }

    /// Check that the settings can drive a run.
    pub fn validate(&self) -> Result<()> {
        if self.butlers == 0 {
            bail!("butlers must be at least 1");
        }
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if self.credentials.is_empty() && !self.dry_run {
            log::warn!("No credentials configured, logins will fail");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ButlerConfig::parse("").unwrap();
        assert_eq!(config.butlers, 5);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.inventory.source, SourceKind::Enc);
        assert_eq!(config.inventory.enc.retries, 3);
        assert_eq!(config.inventory.enc.retry_delay_secs, 10);
    }

    #[test]
    fn test_full_config() {
        let config = ButlerConfig::parse(
            r#"
locations = ["ams1", "lhr4"]
butlers = 8
firmware_endpoint = "https://firmware.example.net"

[[credentials]]
username = "root"
password = "calvin"

[inventory]
source = "csv"

[inventory.csv]
file = "/srv/assets.csv"

[inventory.enc]
bin = "/usr/local/bin/enc"
bmc_nic_prefix = ["ipmi", "ilo"]
"#,
        )
        .unwrap();

        assert_eq!(config.locations, vec!["ams1", "lhr4"]);
        assert_eq!(config.butlers, 8);
        assert_eq!(config.credentials[0].username, "root");
        assert_eq!(config.inventory.source, SourceKind::Csv);
        assert_eq!(config.csv_file().unwrap(), PathBuf::from("/srv/assets.csv"));
        assert_eq!(config.inventory.enc.bmc_nic_prefix, vec!["ipmi", "ilo"]);
        assert_eq!(config.inventory.enc.retries, 3);
    }

    #[test]
    fn test_args_override_file() {
        let mut config = ButlerConfig::parse("locations = [\"ams1\"]\nbutlers = 8").unwrap();
        config.merge_args(&TargetArgs {
            locations: Some("lhr4, fra2".to_string()),
            butlers: Some(2),
            source: Some(SourceKind::Iplist),
            dry_run: true,
            ..Default::default()
        });

        assert_eq!(config.locations, vec!["lhr4", "fra2"]);
        assert_eq!(config.butlers, 2);
        assert_eq!(config.inventory.source, SourceKind::Iplist);
        assert!(config.dry_run);
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bmcbutler.toml");
        fs::write(&path, "butlers = 3\n").unwrap();

        let config = ButlerConfig::load(Some(&path)).unwrap();
        assert_eq!(config.butlers, 3);

        assert!(ButlerConfig::load(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_validate() {
        let config = ButlerConfig {
            butlers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(ButlerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_csv_file_required() {
        assert!(ButlerConfig::default().csv_file().is_err());
    }
}
