//! Configuration rendering.
//!
//! Raw configuration is a TOML document with three optional arrays of
//! sections, `bmc`, `setup_chassis` and `chassis`:
//!
//! ```toml
//! [[bmc]]
//! name = "ntp"
//! vendors = ["dell", "hp"]
//! settings = { server = "ntp.{{location}}.example.net" }
//! ```
//!
//! `{{serial}}`, `{{vendor}}`, `{{type}}`, `{{hardware_type}}`,
//! `{{location}}` and `{{ip_address}}` are replaced with the asset's values
//! before parsing. A section with no `vendors` applies to every vendor.

use crate::error::{Error, Result};
use inventory::Asset;
use serde::Deserialize;

/// One named unit of device configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConfigSection {
    pub name: String,
    #[serde(default)]
    pub vendors: Vec<String>,
    #[serde(default)]
    pub settings: toml::Table,
}

impl ConfigSection {
    /// Whether this section targets `vendor`.
    pub fn applies_to(&self, vendor: &str) -> bool {
        self.vendors.is_empty() || self.vendors.iter().any(|v| v.eq_ignore_ascii_case(vendor))
    }
}

/// Configuration rendered for one asset.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RenderedConfig {
    #[serde(default)]
    pub bmc: Vec<ConfigSection>,
    /// Initial chassis setup, applied before `chassis` when present
    #[serde(default)]
    pub setup_chassis: Option<Vec<ConfigSection>>,
    #[serde(default)]
    pub chassis: Vec<ConfigSection>,
}

impl RenderedConfig {
    fn retain_vendor(&mut self, vendor: &str) {
        self.bmc.retain(|s| s.applies_to(vendor));
        self.chassis.retain(|s| s.applies_to(vendor));
        if let Some(setup) = &mut self.setup_chassis {
            setup.retain(|s| s.applies_to(vendor));
            if setup.is_empty() {
                self.setup_chassis = None;
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.bmc.is_empty() && self.chassis.is_empty() && self.setup_chassis.is_none()
    }
}

/// Template-rendering collaborator.
pub trait ConfigRenderer: Send + Sync {
    /// Render `raw` for `asset`. `None` means nothing applies to this asset.
    fn render(&self, raw: &[u8], asset: &Asset) -> Result<Option<RenderedConfig>>;
}

/// Renders `{{field}}` placeholders and keeps the sections matching the
/// asset's vendor.
#[derive(Debug, Default)]
pub struct TemplateRenderer;

impl TemplateRenderer {
    pub fn new() -> Self {
        Self
    }
}

fn substitute(template: &str, asset: &Asset) -> String {
    [
        ("{{serial}}", asset.serial.as_str()),
        ("{{vendor}}", asset.vendor.as_str()),
        ("{{type}}", asset.type_name()),
        ("{{hardware_type}}", asset.hardware_type.as_str()),
        ("{{location}}", asset.location.as_str()),
        ("{{ip_address}}", asset.ip_address.as_str()),
    ]
    .iter()
    .fold(template.to_string(), |acc, (placeholder, value)| {
        acc.replace(placeholder, value)
    })
}

impl ConfigRenderer for TemplateRenderer {
    fn render(&self, raw: &[u8], asset: &Asset) -> Result<Option<RenderedConfig>> {
        let template = std::str::from_utf8(raw).map_err(|e| Error::Render(e.to_string()))?;
        let rendered = substitute(template, asset);

        let mut config: RenderedConfig =
            toml::from_str(&rendered).map_err(|e| Error::Render(e.to_string()))?;
        config.retain_vendor(&asset.vendor);

        if config.is_empty() {
            log::debug!("nothing to render {}", asset.context());
            return Ok(None);
        }
        Ok(Some(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = r#"
[[bmc]]
name = "ntp"
settings = { server = "ntp.{{location}}.example.net" }

[[bmc]]
name = "ldap"
vendors = ["HP"]
settings = { group = "{{serial}}-admins" }

[[setup_chassis]]
name = "flex_addresses"
vendors = ["dell"]

[[chassis]]
name = "syslog"
vendors = ["dell"]
"#;

    fn asset(vendor: &str) -> Asset {
        Asset {
            serial: "ABC".to_string(),
            vendor: vendor.to_string(),
            location: "ams1".to_string(),
            ..Asset::with_address("10.0.0.1")
        }
    }

    #[test]
    fn test_placeholders_are_substituted() {
        let config = TemplateRenderer::new()
            .render(TEMPLATE.as_bytes(), &asset("hp"))
            .unwrap()
            .unwrap();

        assert_eq!(config.bmc.len(), 2);
        assert_eq!(
            config.bmc[0].settings["server"].as_str(),
            Some("ntp.ams1.example.net")
        );
        assert_eq!(config.bmc[1].settings["group"].as_str(), Some("ABC-admins"));
    }

    #[test]
    fn test_sections_are_filtered_by_vendor() {
        let config = TemplateRenderer::new()
            .render(TEMPLATE.as_bytes(), &asset("dell"))
            .unwrap()
            .unwrap();

        let names: Vec<_> = config.bmc.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["ntp"]);
        assert_eq!(config.chassis.len(), 1);
        assert_eq!(config.setup_chassis.map(|s| s.len()), Some(1));

        let config = TemplateRenderer::new()
            .render(TEMPLATE.as_bytes(), &asset("hp"))
            .unwrap()
            .unwrap();
        assert!(config.chassis.is_empty());
        assert!(config.setup_chassis.is_none());
    }

    #[test]
    fn test_nothing_applicable_renders_none() {
        let raw = b"[[chassis]]\nname = \"syslog\"\nvendors = [\"dell\"]\n";
        let rendered = TemplateRenderer::new().render(raw, &asset("supermicro")).unwrap();
        assert!(rendered.is_none());
    }

    #[test]
    fn test_malformed_template_is_an_error() {
        let err = TemplateRenderer::new()
            .render(b"[[bmc]\nname = ", &asset("dell"))
            .unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }
}
