//! Inventory made of nothing but the addresses given on the command line.

use crate::cancel::CancelToken;
use crate::channel::AssetSender;
use crate::error::{Error, Result};
use crate::filter::{FilterParams, Strategy};
use crate::reconcile::ReconciliationSet;
use crate::source::InventorySource;
use crate::types::{Asset, AssetType};

/// Fixed IP list source. Each address becomes one bare asset, no lookups.
pub struct IpListSource {
    batch_size: usize,
}

impl IpListSource {
    pub fn new(batch_size: usize) -> Self {
        Self { batch_size }
    }

    fn unsupported(&self, what: &str) -> Error {
        Error::InvalidFilter {
            source_name: self.name(),
            message: format!("{what} is not supported, pass IP addresses"),
        }
    }
}

impl InventorySource for IpListSource {
    fn name(&self) -> &'static str {
        "iplist"
    }

    fn asset_retrieve(&self, filter: &FilterParams) -> Result<Strategy> {
        if filter.ips.is_empty() {
            return Err(Error::InvalidFilter {
                source_name: self.name(),
                message: "no IP addresses given".to_string(),
            });
        }
        Ok(Strategy::ByIp(filter.ips.clone()))
    }

    fn iter_by_serial(&self, _serials: &[String], _tx: &AssetSender) -> Result<()> {
        Err(self.unsupported("lookup by serial"))
    }

    fn iter_by_ip(&self, ips: &[String], tx: &AssetSender) -> Result<()> {
        let assets = ReconciliationSet::new(ips.iter().cloned())
            .into_missing()
            .into_iter()
            .map(Asset::with_address)
            .collect();
        tx.send_chunked(assets, self.batch_size)?;
        Ok(())
    }

    fn iter_all(&self, _: &[AssetType], _: &AssetSender, _: &CancelToken) -> Result<()> {
        Err(self.unsupported("a full inventory scan"))
    }
}
