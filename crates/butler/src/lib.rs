//! # butler
//!
//! Applies configuration and runs commands on streams of BMC/CMC assets.
//!
//! This crate provides:
//! - Device session interfaces with a closed [`DeviceHandle`] variant
//! - A placeholder-substituting TOML [`TemplateRenderer`]
//! - [`ConfigurationApplier`] and [`CommandExecutor`], one asset per call
//! - The [`Dispatcher`] routing policy and a [`Pipeline`] of consumer threads
//!
//! The wire protocols spoken to controllers are not part of this crate; they
//! plug in through [`DeviceConnector`].
//!
//! ## Example
//!
//! ```no_run
//! use butler::{
//!     CommandExecutor, ConfigurationApplier, DispatchOptions, Dispatcher, Pipeline,
//!     SectionConfigurator, TemplateRenderer,
//! };
//! # use butler::{DeviceConnector, LoginRequest, Session};
//! use inventory::{Action, CancelToken, Counters, FilterParams, IpListSource};
//! use std::sync::Arc;
//!
//! # struct Connector;
//! # impl DeviceConnector for Connector {
//! #     fn login(&self, r: &LoginRequest<'_>, _: &CancelToken) -> butler::Result<Session> {
//! #         Err(butler::Error::UnknownDevice(String::new()))
//! #     }
//! # }
//! let cancel = CancelToken::new();
//! let metrics = Arc::new(Counters::new());
//! let connector = Arc::new(Connector);
//! let credentials: Arc<[butler::Credential]> = Vec::new().into();
//!
//! let applier = ConfigurationApplier::new(
//!     connector.clone(),
//!     Arc::new(TemplateRenderer::new()),
//!     Arc::new(SectionConfigurator::new()),
//!     credentials.clone(),
//!     metrics.clone(),
//!     cancel.clone(),
//! );
//! let executor = CommandExecutor::new(connector, credentials, metrics.clone(), cancel.clone());
//! let dispatcher = Dispatcher::new(
//!     Arc::new(applier),
//!     Arc::new(executor),
//!     DispatchOptions::default(),
//!     metrics,
//!     cancel.clone(),
//! );
//!
//! let filter = FilterParams {
//!     ips: vec!["10.0.0.1".to_string()],
//!     ..Default::default()
//! };
//! let summary = Pipeline::new(Arc::new(dispatcher), 5, cancel)
//!     .run(
//!         Arc::new(IpListSource::new(10)),
//!         &filter,
//!         Some(Action::Execute("firmware-version".to_string())),
//!     )
//!     .unwrap();
//! println!("{} failed", summary.failed);
//! ```

pub mod apply;
pub mod configurator;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod execute;
pub mod pipeline;
pub mod render;

#[cfg(test)]
mod testing;

pub use apply::ConfigurationApplier;
pub use configurator::{Configurator, SectionConfigurator};
pub use device::{
    Bmc, Cmc, Credential, Device, DeviceConnector, DeviceHandle, LoginRequest, Session,
};
pub use dispatch::{DispatchOptions, Dispatcher, Outcome};
pub use error::{Error, Result};
pub use execute::{BmcCommand, CommandExecutor, firmware_path};
pub use pipeline::{DispatchSummary, Pipeline};
pub use render::{ConfigRenderer, ConfigSection, RenderedConfig, TemplateRenderer};
