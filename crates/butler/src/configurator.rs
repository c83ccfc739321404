//! Vendor configurators: push rendered sections onto a device.

use crate::device::{Bmc, Cmc, Device};
use crate::error::{Error, Result};
use crate::render::ConfigSection;
use inventory::Asset;

/// Applies rendered configuration to an open device session.
pub trait Configurator: Send + Sync {
    fn apply_bmc(
        &self,
        bmc: &mut dyn Bmc,
        sections: &[ConfigSection],
        asset: &Asset,
    ) -> Result<()>;

    /// One-time chassis setup, run before the main chassis configuration.
    fn setup_chassis(
        &self,
        cmc: &mut dyn Cmc,
        sections: &[ConfigSection],
        asset: &Asset,
    ) -> Result<()>;

    fn apply_chassis(
        &self,
        cmc: &mut dyn Cmc,
        sections: &[ConfigSection],
        asset: &Asset,
    ) -> Result<()>;
}

/// Applies every section in order. A rejected section is logged and the rest
/// still run; the call fails if any section was rejected.
#[derive(Debug, Default)]
pub struct SectionConfigurator;

impl SectionConfigurator {
    pub fn new() -> Self {
        Self
    }
}

fn apply_sections<D: Device + ?Sized>(
    device: &mut D,
    stage: &str,
    sections: &[ConfigSection],
    asset: &Asset,
) -> Result<()> {
    let mut failed = 0;
    for section in sections {
        match device.apply_section(section) {
            Ok(()) => log::debug!("{stage} section={} applied {}", section.name, asset.context()),
            Err(e) => {
                failed += 1;
                log::warn!(
                    "{stage} section={} not applied {}: {e}",
                    section.name,
                    asset.context()
                );
            }
        }
    }

    if failed > 0 {
        return Err(Error::Configure {
            failed,
            total: sections.len(),
        });
    }
    log::info!("{stage} applied {} sections {}", sections.len(), asset.context());
    Ok(())
}

impl Configurator for SectionConfigurator {
    fn apply_bmc(
        &self,
        bmc: &mut dyn Bmc,
        sections: &[ConfigSection],
        asset: &Asset,
    ) -> Result<()> {
        apply_sections(bmc, "bmc", sections, asset)
    }

    fn setup_chassis(
        &self,
        cmc: &mut dyn Cmc,
        sections: &[ConfigSection],
        asset: &Asset,
    ) -> Result<()> {
        apply_sections(cmc, "chassis-setup", sections, asset)
    }

    fn apply_chassis(
        &self,
        cmc: &mut dyn Cmc,
        sections: &[ConfigSection],
        asset: &Asset,
    ) -> Result<()> {
        apply_sections(cmc, "chassis", sections, asset)
    }
}
