//! Session layer used by the binary.

use butler::{DeviceConnector, Error, LoginRequest, Result, Session};
use inventory::CancelToken;

/// Connector for builds without a controller protocol linked in.
///
/// Every login fails, so only dry runs complete. Protocol implementations
/// plug in through [`DeviceConnector`].
pub struct NoProtocolConnector;

impl DeviceConnector for NoProtocolConnector {
    fn login(&self, request: &LoginRequest<'_>, _cancel: &CancelToken) -> Result<Session> {
        Err(Error::Login {
            addresses: request.addresses.join(","),
            message: "no controller protocol available in this build".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_always_fails() {
        let addresses = vec!["10.0.0.1".to_string()];
        let request = LoginRequest {
            addresses: &addresses,
            credentials: &[],
            check_credential: true,
            retries: 1,
        };
        let err = NoProtocolConnector
            .login(&request, &CancelToken::new())
            .unwrap_err();
        assert!(err.to_string().contains("10.0.0.1"));
    }
}
