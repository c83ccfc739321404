//! Recording device doubles shared by the unit tests.

use crate::device::{Bmc, Cmc, Device, DeviceConnector, DeviceHandle, LoginRequest, Session};
use crate::error::{Error, Result};
use crate::render::ConfigSection;
use inventory::CancelToken;
use std::sync::{Arc, Mutex};

/// Ordered log of device calls.
#[derive(Debug, Clone, Default)]
pub struct Calls(Arc<Mutex<Vec<String>>>);

impl Calls {
    pub fn push(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    pub fn all(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.all().iter().filter(|c| c.as_str() == call).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Bmc,
    Cmc,
    Unknown,
    Unreachable,
}

struct MockDevice {
    calls: Calls,
    serial: String,
}

impl Device for MockDevice {
    fn hardware_type(&self) -> String {
        "r640".to_string()
    }

    fn vendor(&self) -> String {
        "dell".to_string()
    }

    fn serial(&mut self) -> Result<String> {
        self.calls.push("serial");
        Ok(self.serial.clone())
    }

    fn apply_section(&mut self, section: &ConfigSection) -> Result<()> {
        self.calls.push(format!("apply:{}", section.name));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.calls.push("close");
        Ok(())
    }
}

impl Bmc for MockDevice {
    fn power_cycle(&mut self) -> Result<bool> {
        self.calls.push("power_cycle");
        Ok(true)
    }

    fn power_cycle_bmc(&mut self) -> Result<bool> {
        self.calls.push("power_cycle_bmc");
        Ok(false)
    }

    fn update_firmware(&mut self, endpoint: &str, path: &str) -> Result<(bool, String)> {
        self.calls.push(format!("update_firmware:{endpoint}/{path}"));
        Ok((true, "staged".to_string()))
    }

    fn check_firmware_version(&mut self) -> Result<String> {
        self.calls.push("check_firmware_version");
        Ok("2.70".to_string())
    }
}

impl Cmc for MockDevice {}

/// Connector that records every login and hands out [`Kind`] devices.
pub struct MockConnector {
    pub kind: Kind,
    pub serial: String,
    pub calls: Calls,
    pub requests: Mutex<Vec<(Vec<String>, bool, u32)>>,
}

impl MockConnector {
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            serial: "ABC".to_string(),
            calls: Calls::default(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn logins(&self) -> usize {
        self.calls.count("login")
    }
}

impl DeviceConnector for MockConnector {
    fn login(&self, request: &LoginRequest<'_>, _cancel: &CancelToken) -> Result<Session> {
        self.calls.push("login");
        self.requests.lock().unwrap().push((
            request.addresses.to_vec(),
            request.check_credential,
            request.retries,
        ));

        let device = || MockDevice {
            calls: self.calls.clone(),
            serial: self.serial.clone(),
        };
        let handle = match self.kind {
            Kind::Bmc => DeviceHandle::Bmc(Box::new(device())),
            Kind::Cmc => DeviceHandle::Cmc(Box::new(device())),
            Kind::Unknown => DeviceHandle::Unknown("switch".to_string()),
            Kind::Unreachable => {
                return Err(Error::Login {
                    addresses: request.addresses.join(","),
                    message: "connection refused".to_string(),
                });
            }
        };
        Ok(Session {
            handle,
            active_address: request.addresses.first().cloned().unwrap_or_default(),
        })
    }
}
