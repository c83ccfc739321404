//! Configuration applier: render and push configuration onto one asset.

use crate::configurator::Configurator;
use crate::device::{Bmc, Cmc, Credential, Device, DeviceConnector, DeviceHandle, with_session};
use crate::error::{Error, Result};
use crate::render::ConfigRenderer;
use inventory::{Asset, AssetType, CancelToken, ChassisRegistry, MetricsSink};
use std::sync::Arc;
use std::time::Instant;

/// Applies configuration to a single asset per call. Shared by every consumer.
pub struct ConfigurationApplier {
    connector: Arc<dyn DeviceConnector>,
    renderer: Arc<dyn ConfigRenderer>,
    configurator: Arc<dyn Configurator>,
    credentials: Arc<[Credential]>,
    registry: Option<Arc<dyn ChassisRegistry>>,
    metrics: Arc<dyn MetricsSink>,
    cancel: CancelToken,
    dry_run: bool,
}

impl ConfigurationApplier {
    pub fn new(
        connector: Arc<dyn DeviceConnector>,
        renderer: Arc<dyn ConfigRenderer>,
        configurator: Arc<dyn Configurator>,
        credentials: Arc<[Credential]>,
        metrics: Arc<dyn MetricsSink>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            connector,
            renderer,
            configurator,
            credentials,
            registry: None,
            metrics,
            cancel,
            dry_run: false,
        }
    }

    /// Record chassis as installed after their setup succeeds.
    pub fn with_registry(mut self, registry: Arc<dyn ChassisRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Skip all device contact and report success.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Render `config` for `asset` and apply it.
    ///
    /// On success the asset carries the active address, vendor and hardware
    /// type reported by the device.
    pub fn apply(&self, config: &[u8], asset: &mut Asset) -> Result<()> {
        if self.dry_run {
            log::info!("dry run, configuration skipped {}", asset.context());
            return Ok(());
        }

        let start = Instant::now();
        let result = with_session(
            self.connector.as_ref(),
            &self.credentials,
            true,
            &self.cancel,
            asset,
            |handle, asset| match handle {
                DeviceHandle::Bmc(bmc) => self.configure_bmc(bmc.as_mut(), config, asset),
                DeviceHandle::Cmc(cmc) => self.configure_cmc(cmc.as_mut(), config, asset),
                DeviceHandle::Unknown(kind) => {
                    log::warn!("unknown device type={kind} {}", asset.context());
                    Err(Error::UnknownDevice(kind.clone()))
                }
            },
        );
        self.metrics
            .measure_since(&["butler", "configure_runtime"], start);
        result
    }

    fn configure_bmc(&self, bmc: &mut dyn Bmc, config: &[u8], asset: &mut Asset) -> Result<()> {
        asset.asset_type = Some(AssetType::Server);
        identify(bmc, asset);

        let rendered = self
            .renderer
            .render(config, asset)?
            .filter(|r| !r.bmc.is_empty())
            .ok_or(Error::NoRenderableConfig { device: "BMC" })?;

        self.configurator.apply_bmc(bmc, &rendered.bmc, asset)
    }

    fn configure_cmc(&self, cmc: &mut dyn Cmc, config: &[u8], asset: &mut Asset) -> Result<()> {
        asset.asset_type = Some(AssetType::Chassis);
        identify(cmc, asset);

        let rendered = self
            .renderer
            .render(config, asset)?
            .filter(|r| !r.chassis.is_empty() || r.setup_chassis.is_some())
            .ok_or(Error::NoRenderableConfig { device: "CMC" })?;

        if let Some(setup) = &rendered.setup_chassis {
            self.configurator.setup_chassis(cmc, setup, asset)?;
            self.mark_installed(asset);
        }
        self.configurator.apply_chassis(cmc, &rendered.chassis, asset)
    }

    fn mark_installed(&self, asset: &Asset) {
        let Some(registry) = &self.registry else {
            return;
        };
        if asset.serial.is_empty() {
            return;
        }
        match registry.set_chassis_installed(std::slice::from_ref(&asset.serial)) {
            Ok(()) => log::info!("chassis marked installed {}", asset.context()),
            Err(e) => log::warn!("cannot mark chassis installed {}: {e}", asset.context()),
        }
    }
}

/// Record what the device reports about itself and cross-check the serial.
///
/// A serial mismatch is legitimate after a board swap, so it is only logged.
fn identify<D: Device + ?Sized>(device: &mut D, asset: &mut Asset) {
    asset.hardware_type = device.hardware_type();
    asset.vendor = device.vendor();

    match device.serial() {
        Ok(serial) if asset.serial.is_empty() => asset.serial = serial,
        Ok(serial) if !serial.trim().eq_ignore_ascii_case(asset.serial.trim()) => {
            log::warn!(
                "device reports a different serial device_serial={serial} {}",
                asset.context()
            );
        }
        Ok(_) => {}
        Err(e) => log::warn!("cannot read device serial {}: {e}", asset.context()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configurator::SectionConfigurator;
    use crate::render::TemplateRenderer;
    use crate::testing::{Kind, MockConnector};
    use inventory::NoMetrics;
    use std::sync::Mutex;

    const CONFIG: &[u8] = br#"
[[bmc]]
name = "ntp"

[[setup_chassis]]
name = "flex_addresses"

[[chassis]]
name = "syslog"
"#;

    #[derive(Default)]
    struct RecordingRegistry(Mutex<Vec<String>>);

    impl ChassisRegistry for RecordingRegistry {
        fn set_chassis_installed(&self, serials: &[String]) -> inventory::Result<()> {
            self.0.lock().unwrap().extend_from_slice(serials);
            Ok(())
        }
    }

    fn applier(connector: &Arc<MockConnector>) -> ConfigurationApplier {
        ConfigurationApplier::new(
            connector.clone(),
            Arc::new(TemplateRenderer::new()),
            Arc::new(SectionConfigurator::new()),
            Vec::<Credential>::new().into(),
            Arc::new(NoMetrics),
            CancelToken::new(),
        )
    }

    fn asset() -> Asset {
        Asset {
            serial: "ABC".to_string(),
            ..Asset::with_address("10.0.0.1")
        }
    }

    #[test]
    fn test_dry_run_never_logs_in() {
        let connector = Arc::new(MockConnector::new(Kind::Bmc));
        let applier = applier(&connector).with_dry_run(true);

        assert!(applier.apply(CONFIG, &mut asset()).is_ok());
        assert_eq!(connector.logins(), 0);
    }

    #[test]
    fn test_bmc_configured_and_session_closed() {
        let connector = Arc::new(MockConnector::new(Kind::Bmc));
        let mut asset = asset();
        applier(&connector).apply(CONFIG, &mut asset).unwrap();

        assert_eq!(
            connector.calls.all(),
            vec!["login", "serial", "apply:ntp", "close"]
        );
        assert_eq!(asset.ip_address, "10.0.0.1");
        assert_eq!(asset.vendor, "dell");
        assert_eq!(asset.hardware_type, "r640");
        assert_eq!(asset.asset_type, Some(AssetType::Server));

        let requests = connector.requests.lock().unwrap();
        assert_eq!(requests[0], (vec!["10.0.0.1".to_string()], true, 1));
    }

    #[test]
    fn test_serial_mismatch_is_not_fatal() {
        let mut connector = MockConnector::new(Kind::Bmc);
        connector.serial = "XYZ".to_string();
        let connector = Arc::new(connector);

        let mut asset = asset();
        applier(&connector).apply(CONFIG, &mut asset).unwrap();
        assert_eq!(asset.serial, "ABC");
    }

    #[test]
    fn test_missing_bmc_config_is_an_error_and_closes_session() {
        let connector = Arc::new(MockConnector::new(Kind::Bmc));
        let err = applier(&connector)
            .apply(b"[[chassis]]\nname = \"syslog\"\n", &mut asset())
            .unwrap_err();

        assert!(matches!(err, Error::NoRenderableConfig { device: "BMC" }));
        assert_eq!(connector.calls.count("close"), 1);
    }

    #[test]
    fn test_chassis_setup_runs_before_config_and_marks_installed() {
        let connector = Arc::new(MockConnector::new(Kind::Cmc));
        let registry = Arc::new(RecordingRegistry::default());
        let applier = applier(&connector).with_registry(registry.clone());

        let mut asset = asset();
        applier.apply(CONFIG, &mut asset).unwrap();

        assert_eq!(
            connector.calls.all(),
            vec!["login", "serial", "apply:flex_addresses", "apply:syslog", "close"]
        );
        assert_eq!(*registry.0.lock().unwrap(), vec!["ABC".to_string()]);
        assert_eq!(asset.asset_type, Some(AssetType::Chassis));
    }

    #[test]
    fn test_unknown_device_is_an_error() {
        let connector = Arc::new(MockConnector::new(Kind::Unknown));
        let err = applier(&connector).apply(CONFIG, &mut asset()).unwrap_err();
        assert!(matches!(err, Error::UnknownDevice(kind) if kind == "switch"));
    }

    #[test]
    fn test_login_failure_is_an_error() {
        let connector = Arc::new(MockConnector::new(Kind::Unreachable));
        let err = applier(&connector).apply(CONFIG, &mut asset()).unwrap_err();
        assert!(matches!(err, Error::Login { .. }));
    }
}
