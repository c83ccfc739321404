//! Per-asset routing.

use crate::apply::ConfigurationApplier;
use crate::error::Error;
use crate::execute::CommandExecutor;
use inventory::{Action, Asset, CancelToken, MetricsSink};
use std::collections::HashSet;
use std::sync::Arc;

/// Location policy for a butler.
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    /// Locations this butler manages
    pub locations: HashSet<String>,
    /// Manage assets wherever they are
    pub ignore_location: bool,
}

impl DispatchOptions {
    fn manages(&self, location: &str) -> bool {
        location.is_empty() || self.ignore_location || self.locations.contains(location)
    }
}

/// What happened to one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Cancellation was signalled before the asset was handled
    Cancelled,
    NoAddress,
    UnmanagedLocation,
    Configured,
    Executed,
    Failed { action: &'static str, error: String },
    /// Asset carried no action
    UnknownAction,
}

/// Routes each asset to the configuration applier or the command executor.
pub struct Dispatcher {
    applier: Arc<ConfigurationApplier>,
    executor: Arc<CommandExecutor>,
    options: DispatchOptions,
    metrics: Arc<dyn MetricsSink>,
    cancel: CancelToken,
}

impl Dispatcher {
    pub fn new(
        applier: Arc<ConfigurationApplier>,
        executor: Arc<CommandExecutor>,
        options: DispatchOptions,
        metrics: Arc<dyn MetricsSink>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            applier,
            executor,
            options,
            metrics,
            cancel,
        }
    }

    /// Handle one asset. Never fails: errors are logged, counted and returned
    /// as an [`Outcome`].
    pub fn handle(&self, mut asset: Asset) -> Outcome {
        if self.cancel.is_cancelled() {
            return Outcome::Cancelled;
        }
        self.metrics.incr_counter(&["butler", "asset_recvd"], 1);

        if !asset.is_actionable() {
            log::warn!("asset has no usable address, skipped {}", asset.context());
            self.metrics.incr_counter(&["butler", "asset_recvd_noip"], 1);
            return Outcome::NoAddress;
        }

        if !self.options.manages(&asset.location) {
            log::warn!("asset location is not managed here, skipped {}", asset.context());
            self.metrics
                .incr_counter(&["butler", "asset_recvd_location_unmanaged"], 1);
            return Outcome::UnmanagedLocation;
        }

        match asset.action.take() {
            Some(Action::Configure(config)) => {
                match self.applier.apply(&config, &mut asset) {
                    Ok(()) => {
                        self.metrics.incr_counter(&["butler", "configure_success"], 1);
                        Outcome::Configured
                    }
                    Err(e) => self.failed("configure", &e, &asset),
                }
            }
            Some(Action::Execute(command)) => match self.executor.execute(&command, &mut asset) {
                Ok(()) => {
                    self.metrics.incr_counter(&["butler", "execute_success"], 1);
                    Outcome::Executed
                }
                Err(e) => self.failed("execute", &e, &asset),
            },
            None => {
                log::warn!("unknown action request on asset {}", asset.context());
                Outcome::UnknownAction
            }
        }
    }

    fn failed(&self, action: &'static str, error: &Error, asset: &Asset) -> Outcome {
        log::warn!("{action} failed {}: {error}", asset.context());
        let counter = format!("{action}_fail");
        self.metrics.incr_counter(&["butler", counter.as_str()], 1);
        Outcome::Failed {
            action,
            error: error.to_string(),
        }
    }
}
