//! Device session collaborator interfaces.
//!
//! The wire protocols (IPMI, Redfish, vendor web APIs) live behind
//! [`DeviceConnector`]. A successful login yields a [`DeviceHandle`], a closed
//! set of variants so every caller has to decide what an unrecognised device
//! means instead of falling through.

use crate::error::{Error, Result};
use crate::render::ConfigSection;
use inventory::{Asset, CancelToken};
use serde::Deserialize;
use std::fmt;

/// Login credential. Read-only for the whole run.
#[derive(Clone, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Capabilities every controller exposes.
pub trait Device: Send {
    fn hardware_type(&self) -> String;

    fn vendor(&self) -> String;

    /// Serial as reported by the controller itself.
    fn serial(&mut self) -> Result<String>;

    /// Apply one rendered configuration section.
    fn apply_section(&mut self, section: &ConfigSection) -> Result<()>;

    /// Log out and release the session.
    fn close(&mut self) -> Result<()>;
}

/// Baseboard management controller of a single server.
pub trait Bmc: Device {
    fn power_cycle(&mut self) -> Result<bool>;

    fn power_cycle_bmc(&mut self) -> Result<bool>;

    /// Returns success and any output the controller produced.
    fn update_firmware(&mut self, endpoint: &str, path: &str) -> Result<(bool, String)>;

    fn check_firmware_version(&mut self) -> Result<String>;
}

/// Chassis management controller of a blade enclosure.
pub trait Cmc: Device {}

/// Device returned by a successful login.
pub enum DeviceHandle {
    Bmc(Box<dyn Bmc>),
    Cmc(Box<dyn Cmc>),
    /// The session layer recognised neither variant; carries what it saw
    Unknown(String),
}

impl DeviceHandle {
    pub fn kind(&self) -> &str {
        match self {
            DeviceHandle::Bmc(_) => "bmc",
            DeviceHandle::Cmc(_) => "cmc",
            DeviceHandle::Unknown(kind) => kind,
        }
    }
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceHandle({})", self.kind())
    }
}

/// Parameters for one login attempt.
#[derive(Debug, Clone, Copy)]
pub struct LoginRequest<'a> {
    /// Candidate addresses, tried in order
    pub addresses: &'a [String],
    /// Credentials, tried in order on each address
    pub credentials: &'a [Credential],
    /// Verify the credential works before handing out the session
    pub check_credential: bool,
    /// Extra attempts per address
    pub retries: u32,
}

/// An authenticated session.
#[derive(Debug)]
pub struct Session {
    pub handle: DeviceHandle,
    /// Address that accepted the login
    pub active_address: String,
}

impl Session {
    /// Release the session. Unknown devices hold nothing to release.
    pub fn close(&mut self) -> Result<()> {
        match &mut self.handle {
            DeviceHandle::Bmc(bmc) => bmc.close(),
            DeviceHandle::Cmc(cmc) => cmc.close(),
            DeviceHandle::Unknown(_) => Ok(()),
        }
    }
}

/// Establishes device sessions. Must be safe to share between consumers.
pub trait DeviceConnector: Send + Sync {
    fn login(&self, request: &LoginRequest<'_>, cancel: &CancelToken) -> Result<Session>;
}

/// Log into `asset`, run `body` against the device and release the session.
///
/// The asset's active address is set before `body` runs. The session is closed
/// whatever `body` returns; a failed close is only logged.
pub(crate) fn with_session<T>(
    connector: &dyn DeviceConnector,
    credentials: &[Credential],
    check_credential: bool,
    cancel: &CancelToken,
    asset: &mut Asset,
    body: impl FnOnce(&mut DeviceHandle, &mut Asset) -> Result<T>,
) -> Result<T> {
    let addresses = asset.usable_addresses();
    let request = LoginRequest {
        addresses: &addresses,
        credentials,
        check_credential,
        retries: 1,
    };

    log::debug!("connecting {}", asset.context());
    let mut session = connector.login(&request, cancel).map_err(|e| match e {
        Error::Login { .. } => e,
        other => Error::Login {
            addresses: addresses.join(","),
            message: other.to_string(),
        },
    })?;
    asset.ip_address = session.active_address.clone();

    let result = body(&mut session.handle, asset);

    if let Err(e) = session.close() {
        log::warn!("cannot close session {}: {e}", asset.context());
    }
    result
}
