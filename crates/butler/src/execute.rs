//! Command executor: run one named command on one asset.

use crate::device::{Bmc, Credential, DeviceConnector, DeviceHandle, with_session};
use crate::error::{Error, Result};
use inventory::{Asset, CancelToken, MetricsSink};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

/// Commands a BMC understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BmcCommand {
    /// Reset the controller itself
    BmcReset,
    /// Power cycle the server
    PowerCycle,
    FirmwareUpdate,
    FirmwareVersion,
}

impl BmcCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            BmcCommand::BmcReset => "bmc-reset",
            BmcCommand::PowerCycle => "powercycle",
            BmcCommand::FirmwareUpdate => "firmware-update",
            BmcCommand::FirmwareVersion => "firmware-version",
        }
    }
}

impl fmt::Display for BmcCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BmcCommand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bmc-reset" => Ok(BmcCommand::BmcReset),
            "powercycle" => Ok(BmcCommand::PowerCycle),
            "firmware-update" => Ok(BmcCommand::FirmwareUpdate),
            "firmware-version" => Ok(BmcCommand::FirmwareVersion),
            other => Err(Error::UnknownCommand(other.to_string())),
        }
    }
}

/// Firmware images live under `bmc-firmware/<vendor>/<hardware type>`.
pub fn firmware_path(vendor: &str, hardware_type: &str) -> String {
    format!("bmc-firmware/{vendor}/{hardware_type}")
}

/// Executes commands against a single asset per call. Shared by every consumer.
pub struct CommandExecutor {
    connector: Arc<dyn DeviceConnector>,
    credentials: Arc<[Credential]>,
    firmware_endpoint: Option<String>,
    metrics: Arc<dyn MetricsSink>,
    cancel: CancelToken,
    dry_run: bool,
}

impl CommandExecutor {
    pub fn new(
        connector: Arc<dyn DeviceConnector>,
        credentials: Arc<[Credential]>,
        metrics: Arc<dyn MetricsSink>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            connector,
            credentials,
            firmware_endpoint: None,
            metrics,
            cancel,
            dry_run: false,
        }
    }

    /// Distribution endpoint for `firmware-update`.
    pub fn with_firmware_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.firmware_endpoint = Some(endpoint.into());
        self
    }

    /// Skip all device contact and report success.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run `command` on `asset`.
    pub fn execute(&self, command: &str, asset: &mut Asset) -> Result<()> {
        if self.dry_run {
            log::info!("dry run, command={command} skipped {}", asset.context());
            return Ok(());
        }
        let command: BmcCommand = command.parse()?;

        let start = Instant::now();
        let result = with_session(
            self.connector.as_ref(),
            &self.credentials,
            false,
            &self.cancel,
            asset,
            |handle, asset| match handle {
                DeviceHandle::Bmc(bmc) => self.execute_bmc(bmc.as_mut(), command, asset),
                DeviceHandle::Cmc(_) => {
                    // Chassis commands are not implemented; the request is only acknowledged.
                    log::info!("chassis command={command} received {}", asset.context());
                    Ok(())
                }
                DeviceHandle::Unknown(kind) => {
                    log::warn!("unknown device type={kind} {}", asset.context());
                    Err(Error::UnknownDevice(kind.clone()))
                }
            },
        );
        self.metrics.measure_since(&["butler", "execute_runtime"], start);
        result
    }

    fn execute_bmc(&self, bmc: &mut dyn Bmc, command: BmcCommand, asset: &Asset) -> Result<()> {
        let (success, output) = match command {
            BmcCommand::BmcReset => (bmc.power_cycle_bmc()?, String::new()),
            BmcCommand::PowerCycle => (bmc.power_cycle()?, String::new()),
            BmcCommand::FirmwareUpdate => {
                let endpoint = self
                    .firmware_endpoint
                    .as_deref()
                    .ok_or(Error::MissingFirmwareEndpoint)?;
                let path = firmware_path(&bmc.vendor(), &bmc.hardware_type());
                bmc.update_firmware(endpoint, &path)?
            }
            BmcCommand::FirmwareVersion => (true, bmc.check_firmware_version()?),
        };

        if !success {
            return Err(Error::CommandUnsuccessful {
                command: command.to_string(),
                output,
            });
        }
        log::debug!("command={command} executed output={output:?} {}", asset.context());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Kind, MockConnector};
    use inventory::NoMetrics;

    fn executor(connector: &Arc<MockConnector>) -> CommandExecutor {
        CommandExecutor::new(
            connector.clone(),
            Vec::<Credential>::new().into(),
            Arc::new(NoMetrics),
            CancelToken::new(),
        )
        .with_firmware_endpoint("https://firmware.example.net")
    }

    #[test]
    fn test_command_names() {
        assert_eq!("bmc-reset".parse::<BmcCommand>().unwrap(), BmcCommand::BmcReset);
        assert_eq!("powercycle".parse::<BmcCommand>().unwrap(), BmcCommand::PowerCycle);
        assert_eq!(
            BmcCommand::FirmwareVersion.to_string().parse::<BmcCommand>().unwrap(),
            BmcCommand::FirmwareVersion
        );
        assert!("reboot".parse::<BmcCommand>().is_err());
    }

    #[test]
    fn test_firmware_update_uses_vendor_scoped_path() {
        let connector = Arc::new(MockConnector::new(Kind::Bmc));
        let mut asset = Asset::with_address("10.0.0.2");
        executor(&connector).execute("firmware-update", &mut asset).unwrap();

        assert_eq!(
            connector.calls.all(),
            vec![
                "login",
                "update_firmware:https://firmware.example.net/bmc-firmware/dell/r640",
                "close"
            ]
        );
        let requests = connector.requests.lock().unwrap();
        assert_eq!(requests[0], (vec!["10.0.0.2".to_string()], false, 1));
    }

    #[test]
    fn test_unsuccessful_command_is_an_error_and_closes_session() {
        let connector = Arc::new(MockConnector::new(Kind::Bmc));
        let err = executor(&connector)
            .execute("bmc-reset", &mut Asset::with_address("10.0.0.2"))
            .unwrap_err();

        assert!(matches!(err, Error::CommandUnsuccessful { .. }));
        assert_eq!(connector.calls.count("close"), 1);
    }

    #[test]
    fn test_unknown_command_never_logs_in() {
        let connector = Arc::new(MockConnector::new(Kind::Bmc));
        let err = executor(&connector)
            .execute("reboot", &mut Asset::with_address("10.0.0.2"))
            .unwrap_err();

        assert!(matches!(err, Error::UnknownCommand(name) if name == "reboot"));
        assert_eq!(connector.logins(), 0);
    }

    #[test]
    fn test_missing_firmware_endpoint() {
        let connector = Arc::new(MockConnector::new(Kind::Bmc));
        let executor = CommandExecutor::new(
            connector.clone(),
            Vec::<Credential>::new().into(),
            Arc::new(NoMetrics),
            CancelToken::new(),
        );
        let err = executor
            .execute("firmware-update", &mut Asset::with_address("10.0.0.2"))
            .unwrap_err();
        assert!(matches!(err, Error::MissingFirmwareEndpoint));
        assert_eq!(connector.calls.count("close"), 1);
    }

    #[test]
    fn test_chassis_commands_are_acknowledged_only() {
        let connector = Arc::new(MockConnector::new(Kind::Cmc));
        executor(&connector)
            .execute("powercycle", &mut Asset::with_address("10.0.0.3"))
            .unwrap();
        assert_eq!(connector.calls.all(), vec!["login", "close"]);
    }

    #[test]
    fn test_dry_run_never_logs_in() {
        let connector = Arc::new(MockConnector::new(Kind::Bmc));
        executor(&connector)
            .with_dry_run(true)
            .execute("powercycle", &mut Asset::with_address("10.0.0.2"))
            .unwrap();
        assert_eq!(connector.logins(), 0);
    }
}
