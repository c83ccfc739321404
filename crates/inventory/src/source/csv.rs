//! Inventory backed by a CSV file.
//!
//! Rows need a `bmcaddress` column; `serial`, `vendor` and `type` are
//! optional. The file is read once per retrieval and every lookup is
//! answered from that in-memory copy.

use crate::cancel::CancelToken;
use crate::channel::AssetSender;
use crate::error::{Error, Result};
use crate::reconcile::ReconciliationSet;
use crate::source::InventorySource;
use crate::types::{Asset, AssetType};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;

/// One row of the inventory file.
#[derive(Debug, Clone, Deserialize)]
struct CsvRecord {
    #[serde(default)]
    bmcaddress: String,
    #[serde(default)]
    serial: String,
    #[serde(default)]
    vendor: String,
    #[serde(default, rename = "type")]
    asset_type: String,
}

impl CsvRecord {
    fn parsed_type(&self) -> Option<AssetType> {
        if self.asset_type.is_empty() {
            return None;
        }
        match self.asset_type.parse() {
            Ok(t) => Some(t),
            Err(e) => {
                log::debug!("[csv] serial={} {e}", self.serial);
                None
            }
        }
    }

    fn to_asset(&self) -> Asset {
        Asset {
            ip_addresses: vec![self.bmcaddress.clone()],
            serial: self.serial.clone(),
            vendor: self.vendor.clone(),
            asset_type: self.parsed_type(),
            ..Default::default()
        }
    }
}

/// CSV file inventory source.
pub struct CsvSource {
    path: PathBuf,
    batch_size: usize,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>, batch_size: usize) -> Self {
        Self {
            path: path.into(),
            batch_size,
        }
    }

    /// Read every row that names a BMC address.
    fn read_records(&self) -> Result<Vec<CsvRecord>> {
        let file = File::open(&self.path).map_err(|source| Error::InventoryFile {
            path: self.path.clone(),
            source,
        })?;

        let mut reader = ::csv::ReaderBuilder::new()
            .trim(::csv::Trim::All)
            .from_reader(file);

        let mut records = Vec::new();
        for row in reader.deserialize::<CsvRecord>() {
            let record = row.map_err(|source| Error::InventoryParse {
                path: self.path.clone(),
                source,
            })?;
            if record.bmcaddress.is_empty() {
                continue;
            }
            records.push(record);
        }

        log::debug!(
            "[csv] read {} assets from {}",
            records.len(),
            self.path.display()
        );
        Ok(records)
    }
}

impl InventorySource for CsvSource {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn iter_by_serial(&self, serials: &[String], tx: &AssetSender) -> Result<()> {
        let records = self.read_records()?;

        let mut by_serial: HashMap<&str, &CsvRecord> = HashMap::new();
        for record in &records {
            by_serial.entry(record.serial.as_str()).or_insert(record);
        }

        let mut set = ReconciliationSet::new(serials.iter().cloned());
        let mut assets = Vec::with_capacity(set.requested_len());
        for serial in set.requested().to_vec() {
            log::debug!("[csv] fetching asset by serial: {serial}");
            if let Some(record) = by_serial.get(serial.as_str()) {
                set.mark_found(&serial);
                assets.push(record.to_asset());
            }
        }
        for serial in set.into_missing() {
            log::debug!("[csv] serial {serial} not in inventory");
            assets.push(Asset::placeholder_serial(serial));
        }

        tx.send_chunked(assets, self.batch_size)?;
        Ok(())
    }

    fn iter_by_ip(&self, ips: &[String], tx: &AssetSender) -> Result<()> {
        let records = self.read_records()?;
        let set = ReconciliationSet::new(ips.iter().cloned());

        let assets: Vec<Asset> = set
            .requested()
            .iter()
            .map(|ip| {
                log::debug!("[csv] looking up attributes for IP: {ip}");
                match records.iter().find(|r| &r.bmcaddress == ip) {
                    Some(record) => record.to_asset(),
                    None => Asset::with_address(ip.clone()),
                }
            })
            .collect();

        tx.send_chunked(assets, self.batch_size)?;
        Ok(())
    }

    fn iter_all(
        &self,
        asset_types: &[AssetType],
        tx: &AssetSender,
        _cancel: &CancelToken,
    ) -> Result<()> {
        let assets: Vec<Asset> = self
            .read_records()?
            .iter()
            .map(CsvRecord::to_asset)
            .filter(|a| a.asset_type.is_none_or(|t| asset_types.contains(&t)))
            .collect();

        tx.send_chunked(assets, self.batch_size)?;
        Ok(())
    }
}
