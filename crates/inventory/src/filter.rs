//! Filter parameters and the iteration strategy they select.

use crate::types::AssetType;

/// Which assets the caller asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterParams {
    /// Explicit serial numbers
    pub serials: Vec<String>,
    /// Explicit BMC addresses
    pub ips: Vec<String>,
    /// Restrict a full scan to chassis
    pub chassis: bool,
    /// Restrict a full scan to servers
    pub servers: bool,
}

impl FilterParams {
    /// Asset types a full scan covers, in scan order.
    pub fn asset_types(&self) -> Vec<AssetType> {
        match (self.chassis, self.servers) {
            (true, _) => vec![AssetType::Chassis],
            (false, true) => vec![AssetType::Server],
            (false, false) => vec![AssetType::Chassis, AssetType::Server],
        }
    }

    /// Pick the iteration strategy: serials win over IPs, no list means full scan.
    pub fn strategy(&self) -> Strategy {
        if !self.serials.is_empty() {
            Strategy::BySerial(self.serials.clone())
        } else if !self.ips.is_empty() {
            Strategy::ByIp(self.ips.clone())
        } else {
            Strategy::FullScan(self.asset_types())
        }
    }
}

/// How a source walks its inventory for one retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    BySerial(Vec<String>),
    ByIp(Vec<String>),
    FullScan(Vec<AssetType>),
}

impl Strategy {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::BySerial(_) => "by-serial",
            Strategy::ByIp(_) => "by-ip",
            Strategy::FullScan(_) => "full-scan",
        }
    }
}

/// Split a comma-separated CLI list, dropping blanks.
pub fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_precedence() {
        let filter = FilterParams {
            serials: vec!["A".to_string()],
            ips: vec!["10.0.0.1".to_string()],
            ..Default::default()
        };
        assert_eq!(filter.strategy(), Strategy::BySerial(vec!["A".to_string()]));

        let filter = FilterParams {
            ips: vec!["10.0.0.1".to_string()],
            ..Default::default()
        };
        assert_eq!(filter.strategy().name(), "by-ip");

        assert_eq!(
            FilterParams::default().strategy(),
            Strategy::FullScan(vec![AssetType::Chassis, AssetType::Server])
        );
    }

    #[test]
    fn test_asset_type_filter() {
        let filter = FilterParams {
            servers: true,
            ..Default::default()
        };
        assert_eq!(filter.asset_types(), vec![AssetType::Server]);

        let filter = FilterParams {
            chassis: true,
            servers: true,
            ..Default::default()
        };
        assert_eq!(filter.asset_types(), vec![AssetType::Chassis]);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("A, B,,C "), vec!["A", "B", "C"]);
        assert!(split_list("").is_empty());
    }
}
