//! Inventory backed by an external node classifier (ENC) command.
//!
//! The ENC is a separate executable speaking a small command-line protocol:
//!
//! ```text
//! <bin> enc --serials A,B
//! <bin> enc --ips 10.0.0.1,10.0.0.2
//! <bin> inventory --server --limit 10 --offset 20 [--location ams1,fra2]
//! <bin> inventory --set-chassis-installed A,B
//! ```
//!
//! Queries answer with `{"data": {<id>: {...}}, "end_of_assets": bool}`.
//! Lookups by serial or IP are reconciled against the request so each
//! requested identifier yields exactly one asset; full scans page through the
//! inventory with a bounded retry per page.

use crate::cancel::CancelToken;
use crate::channel::AssetSender;
use crate::error::{Error, Result};
use crate::metrics::{MetricsSink, NoMetrics};
use crate::reconcile::ReconciliationSet;
use crate::retry::{self, LogCallback, RetryConfig};
use crate::source::{ChassisRegistry, InventorySource};
use crate::types::{Asset, AssetType, is_valid_address};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;

/// Top-level ENC response document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EncResponse {
    /// Attributes keyed by serial
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: BTreeMap<String, AttributesRecord>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub end_of_assets: bool,
}

/// Attributes the ENC knows about one asset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttributesRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: String,
    #[serde(default)]
    pub network_interfaces: Option<Vec<NetworkInterface>>,
    #[serde(default)]
    pub extras: Option<AttributesExtras>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkInterface {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mac_address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ip_address: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttributesExtras {
    #[serde(default, rename = "status", deserialize_with = "null_as_default")]
    pub state: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub company: String,
    /// Serials of live blades, for chassis
    #[serde(default)]
    pub live_assets: Option<Vec<String>>,
}

/// The ENC writes `null` for unknown values; read it as empty.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl AttributesExtras {
    /// Flatten into the asset's `extra` map.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut extra = BTreeMap::new();
        extra.insert("state".to_string(), self.state.to_lowercase());
        extra.insert("company".to_string(), self.company.to_lowercase());
        let live = self
            .live_assets
            .as_ref()
            .map(|serials| serials.join(",").to_lowercase())
            .unwrap_or_default();
        extra.insert("liveAssets".to_string(), live);
        extra
    }
}

/// Runs the ENC executable. Abstracted so tests can script responses.
pub trait EncRunner: Send + Sync {
    /// Run with `args`, returning stdout on success.
    fn run(&self, args: &[String]) -> Result<Vec<u8>>;

    /// Render the command line for logs and errors.
    fn describe(&self, args: &[String]) -> String;
}

/// Runs a real executable.
pub struct CommandRunner {
    bin: PathBuf,
}

impl CommandRunner {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }
}

impl EncRunner for CommandRunner {
    fn run(&self, args: &[String]) -> Result<Vec<u8>> {
        let mut cmd = Command::new(&self.bin);
        cmd.args(args);

        // Own process group, so an interrupt aimed at us does not kill the query mid-page.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let output = cmd.output().map_err(|e| Error::CommandFailed {
            command: self.describe(args),
            message: e.to_string(),
            output: String::new(),
        })?;

        if !output.status.success() {
            let mut captured = String::from_utf8_lossy(&output.stdout).trim().to_string();
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.trim().is_empty() {
                if !captured.is_empty() {
                    captured.push('\n');
                }
                captured.push_str(stderr.trim());
            }
            return Err(Error::CommandFailed {
                command: self.describe(args),
                message: output.status.to_string(),
                output: captured,
            });
        }

        Ok(output.stdout)
    }

    fn describe(&self, args: &[String]) -> String {
        format!("{} {}", self.bin.display(), args.join(" "))
    }
}

/// ENC inventory source.
pub struct EncSource {
    runner: Box<dyn EncRunner>,
    bmc_nic_prefixes: Vec<String>,
    locations: Vec<String>,
    batch_size: usize,
    retry: RetryConfig,
    metrics: Arc<dyn MetricsSink>,
}

impl EncSource {
    pub fn new(runner: Box<dyn EncRunner>) -> Self {
        Self {
            runner,
            bmc_nic_prefixes: Vec::new(),
            locations: Vec::new(),
            batch_size: 10,
            retry: RetryConfig::default(),
            metrics: Arc::new(NoMetrics),
        }
    }

    /// Interface name prefixes that identify BMC NICs. Empty accepts every NIC.
    pub fn with_nic_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.bmc_nic_prefixes = prefixes.into_iter().map(|p| p.to_lowercase()).collect();
        self
    }

    /// Locations passed to paginated queries.
    pub fn with_locations(mut self, locations: Vec<String>) -> Self {
        self.locations = locations;
        self
    }

    /// Page size for full scans and batch size for lookups.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Retry policy for paginated queries.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    fn is_bmc_nic(&self, name: &str) -> bool {
        if self.bmc_nic_prefixes.is_empty() {
            return true;
        }
        let name = name.to_lowercase();
        self.bmc_nic_prefixes.iter().any(|p| name.starts_with(p))
    }

    /// Valid addresses of the record's BMC interfaces.
    pub fn bmc_addresses(&self, record: &AttributesRecord) -> Vec<String> {
        record
            .network_interfaces
            .iter()
            .flatten()
            .filter(|nic| self.is_bmc_nic(&nic.name) && is_valid_address(&nic.ip_address))
            .map(|nic| nic.ip_address.clone())
            .collect()
    }

    fn to_asset(&self, serial: &str, record: &AttributesRecord, addresses: Vec<String>) -> Asset {
        Asset {
            ip_addresses: addresses,
            serial: serial.to_string(),
            location: record.location.clone(),
            extra: record
                .extras
                .as_ref()
                .map(AttributesExtras::to_map)
                .unwrap_or_default(),
            ..Default::default()
        }
    }

    /// Run one query and parse its response.
    fn query(&self, args: &[String], retry: &RetryConfig) -> Result<EncResponse> {
        let out = retry::with_retry(retry, Some(&LogCallback), || self.runner.run(args))?;
        serde_json::from_slice(&out).map_err(|source| Error::InvalidResponse {
            command: self.runner.describe(args),
            source,
        })
    }

    fn count_fetched(&self, n: usize) {
        self.metrics
            .incr_counter(&["inventory", "assets_fetched_enc"], n as u64);
    }

    fn count_noip(&self) {
        self.metrics.incr_counter(&["inventory", "assets_noip_enc"], 1);
    }

    /// Look up serials; one asset per distinct serial, placeholders for the rest.
    ///
    /// A failed query is fatal: the caller asked for these assets specifically.
    pub fn query_by_serial(&self, serials: &[String]) -> Result<Vec<Asset>> {
        let mut set = ReconciliationSet::new(serials.iter().cloned());
        let args = vec![
            "enc".to_string(),
            "--serials".to_string(),
            set.requested().join(","),
        ];
        let response = self.query(&args, &RetryConfig::no_retry())?;

        if response.data.is_empty() {
            log::warn!(
                "[enc] no assets returned by inventory for serial(s): {}",
                set.requested().join(",")
            );
        }

        let mut assets = Vec::with_capacity(set.requested_len());
        for (serial, record) in &response.data {
            let addresses = self.bmc_addresses(record);
            if addresses.is_empty() {
                self.count_noip();
                log::debug!("[enc] serial={serial} has no usable BMC address");
                continue;
            }
            if !set.mark_found(serial) {
                log::debug!("[enc] ignoring unrequested serial={serial}");
                continue;
            }
            assets.push(self.to_asset(serial, record, addresses));
        }

        assets.extend(set.into_missing().into_iter().map(Asset::placeholder_serial));
        self.count_fetched(assets.len());
        Ok(assets)
    }

    /// Look up addresses; one asset per distinct address.
    ///
    /// Addresses the inventory cannot attribute come back as bare assets, and a
    /// failed query degrades to bare assets for every address.
    pub fn query_by_ip(&self, ips: &[String]) -> Result<Vec<Asset>> {
        let mut set = ReconciliationSet::new(ips.iter().cloned());
        let args = vec![
            "enc".to_string(),
            "--ips".to_string(),
            set.requested().join(","),
        ];

        let response = match self.query(&args, &RetryConfig::no_retry()) {
            Ok(response) => response,
            Err(e @ Error::CommandFailed { .. }) => {
                log::warn!("[enc] inventory query failed, using bare addresses: {e}");
                EncResponse::default()
            }
            Err(e) => return Err(e),
        };

        if response.data.is_empty() {
            log::debug!(
                "[enc] no assets returned by inventory for IP(s): {}",
                set.requested().join(",")
            );
        }

        let mut assets = Vec::with_capacity(set.requested_len());
        for (serial, record) in &response.data {
            let addresses = self.bmc_addresses(record);
            if addresses.is_empty() {
                self.count_noip();
                continue;
            }

            let matched: Vec<&String> = addresses.iter().filter(|ip| set.is_pending(ip)).collect();
            if matched.is_empty() {
                log::debug!("[enc] ignoring serial={serial}, none of its addresses were requested");
                continue;
            }
            for ip in &matched {
                set.mark_found(ip);
            }
            assets.push(self.to_asset(serial, record, addresses.clone()));
        }

        assets.extend(set.into_missing().into_iter().map(Asset::with_address));
        self.count_fetched(assets.len());
        Ok(assets)
    }

    /// Fetch one page of assets of `asset_type`. Returns the page and whether it was the last.
    pub fn query_by_offset(
        &self,
        asset_type: AssetType,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Asset>, bool)> {
        let mut args = vec![
            "inventory".to_string(),
            asset_type.query_flag().to_string(),
            "--limit".to_string(),
            limit.to_string(),
            "--offset".to_string(),
            offset.to_string(),
        ];
        if !self.locations.is_empty() {
            args.push("--location".to_string());
            args.push(self.locations.join(","));
        }

        let response = self.query(&args, &self.retry)?;

        let mut assets = Vec::with_capacity(response.data.len());
        for (serial, record) in &response.data {
            let addresses = self.bmc_addresses(record);
            if addresses.is_empty() {
                self.count_noip();
                continue;
            }
            let mut asset = self.to_asset(serial, record, addresses);
            asset.asset_type = Some(asset_type);
            assets.push(asset);
        }

        self.count_fetched(assets.len());
        Ok((assets, response.end_of_assets))
    }
}

impl InventorySource for EncSource {
    fn name(&self) -> &'static str {
        "enc"
    }

    fn iter_by_serial(&self, serials: &[String], tx: &AssetSender) -> Result<()> {
        let assets = self.query_by_serial(serials)?;
        tx.send_chunked(assets, self.batch_size)?;
        Ok(())
    }

    fn iter_by_ip(&self, ips: &[String], tx: &AssetSender) -> Result<()> {
        let assets = self.query_by_ip(ips)?;
        tx.send_chunked(assets, self.batch_size)?;
        Ok(())
    }

    fn iter_all(
        &self,
        asset_types: &[AssetType],
        tx: &AssetSender,
        cancel: &CancelToken,
    ) -> Result<()> {
        let limit = self.batch_size;

        for &asset_type in asset_types {
            if cancel.is_cancelled() {
                break;
            }

            let mut offset = 0;
            loop {
                let (assets, end_of_assets) = self.query_by_offset(asset_type, offset, limit)?;
                log::debug!(
                    "[enc] retrieved {} {asset_type} assets offset={offset} limit={limit} locations={}",
                    assets.len(),
                    self.locations.join(",")
                );

                if !assets.is_empty() {
                    tx.send(assets)?;
                }
                offset += limit;

                if end_of_assets {
                    log::debug!("[enc] reached end of {asset_type} assets");
                    break;
                }
                if cancel.is_cancelled() {
                    log::debug!("[enc] interrupt received, stopping after offset={offset}");
                    return Ok(());
                }
            }
        }

        Ok(())
    }
}

impl ChassisRegistry for EncSource {
    fn set_chassis_installed(&self, serials: &[String]) -> Result<()> {
        let args = vec![
            "inventory".to_string(),
            "--set-chassis-installed".to_string(),
            serials.join(","),
        ];
        self.runner.run(&args).map(|_| ())
    }
}
