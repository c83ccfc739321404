//! Core types for the asset stream.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Address reported by controllers that have no network configuration.
pub const UNSET_ADDRESS: &str = "0.0.0.0";

/// Whether an address can be used to reach a controller.
pub fn is_valid_address(address: &str) -> bool {
    let address = address.trim();
    !address.is_empty() && address != UNSET_ADDRESS
}

/// Kind of out-of-band controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    /// Baseboard management controller of a single server
    Server,
    /// Chassis management controller of a blade enclosure
    Chassis,
}

impl AssetType {
    /// Name used in logs and inventory files.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Server => "server",
            AssetType::Chassis => "chassis",
        }
    }

    /// Flag selecting this type on a paginated inventory query.
    pub fn query_flag(&self) -> &'static str {
        match self {
            AssetType::Server => "--server",
            AssetType::Chassis => "--chassis",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "server" | "servers" | "discrete" | "discretes" | "blade" => Ok(AssetType::Server),
            "chassis" => Ok(AssetType::Chassis),
            other => Err(format!("unknown asset type: {other}")),
        }
    }
}

/// What the butler should do with an asset.
///
/// Configure and execute are mutually exclusive by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Apply raw (not yet rendered) configuration
    Configure(Arc<[u8]>),
    /// Run a single named command
    Execute(String),
}

impl Action {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Configure(_) => "configure",
            Action::Execute(_) => "execute",
        }
    }
}

/// A manageable BMC or CMC endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Asset {
    /// Candidate addresses, in preference order
    pub ip_addresses: Vec<String>,
    /// Address that accepted the login; empty until a session is established
    pub ip_address: String,
    pub serial: String,
    pub vendor: String,
    pub asset_type: Option<AssetType>,
    pub hardware_type: String,
    pub location: String,
    /// Free-form attributes from the inventory source
    pub extra: BTreeMap<String, String>,
    pub action: Option<Action>,
}

impl Asset {
    /// Create an asset reachable at a single address.
    pub fn with_address(address: impl Into<String>) -> Self {
        Self {
            ip_addresses: vec![address.into()],
            ..Default::default()
        }
    }

    /// Create a placeholder for a serial the inventory knows nothing usable about.
    pub fn placeholder_serial(serial: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            ..Default::default()
        }
    }

    /// Addresses that can actually be dialled.
    pub fn usable_addresses(&self) -> Vec<String> {
        self.ip_addresses
            .iter()
            .filter(|a| is_valid_address(a))
            .cloned()
            .collect()
    }

    /// An asset is actionable only with at least one usable address.
    pub fn is_actionable(&self) -> bool {
        self.ip_addresses.iter().any(|a| is_valid_address(a))
    }

    /// Type name for logs, empty when unknown.
    pub fn type_name(&self) -> &'static str {
        self.asset_type.map(|t| t.as_str()).unwrap_or("")
    }

    /// Structured key=value context for log lines.
    pub fn context(&self) -> AssetContext<'_> {
        AssetContext(self)
    }
}

/// Renders an asset's identifying fields as `key=value` pairs.
pub struct AssetContext<'a>(&'a Asset);

impl fmt::Display for AssetContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let asset = self.0;
        write!(
            f,
            "serial={} type={} vendor={} location={}",
            asset.serial,
            asset.type_name(),
            asset.vendor,
            asset.location
        )?;
        if !asset.hardware_type.is_empty() {
            write!(f, " hardware_type={}", asset.hardware_type)?;
        }
        if asset.ip_address.is_empty() {
            write!(f, " addresses={}", asset.ip_addresses.join(","))
        } else {
            write!(f, " ip={}", asset.ip_address)
        }
    }
}

/// Group of assets delivered as one channel message.
pub type Batch = Vec<Asset>;
