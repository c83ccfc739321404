//! Inventory sources and the producer thread that drives them.
//!
//! A source answers three kinds of lookups. [`spawn_retrieval`] asks the
//! source which one applies to the filter, moves the channel's only sender
//! into a new thread and runs it there. When that thread returns, the sender
//! is dropped and the channel is closed, on success and on failure alike.

pub mod csv;
pub mod enc;
pub mod iplist;

pub use self::csv::CsvSource;
pub use enc::{CommandRunner, EncRunner, EncSource};
pub use iplist::IpListSource;

use crate::cancel::CancelToken;
use crate::channel::AssetSender;
use crate::error::{Error, Result};
use crate::filter::{FilterParams, Strategy};
use crate::types::AssetType;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A pluggable inventory of BMC/CMC assets.
pub trait InventorySource: Send + Sync {
    /// Name used in logs ("csv", "enc", "iplist").
    fn name(&self) -> &'static str;

    /// Choose the iteration strategy for a filter.
    fn asset_retrieve(&self, filter: &FilterParams) -> Result<Strategy> {
        Ok(filter.strategy())
    }

    /// Send one asset per requested serial.
    fn iter_by_serial(&self, serials: &[String], tx: &AssetSender) -> Result<()>;

    /// Send one asset per requested address.
    fn iter_by_ip(&self, ips: &[String], tx: &AssetSender) -> Result<()>;

    /// Send every asset of the given types, checking `cancel` between pages.
    fn iter_all(
        &self,
        asset_types: &[AssetType],
        tx: &AssetSender,
        cancel: &CancelToken,
    ) -> Result<()>;
}

/// Inventory that can record chassis state changes.
pub trait ChassisRegistry: Send + Sync {
    /// Mark chassis as installed once their initial setup has been applied.
    fn set_chassis_installed(&self, serials: &[String]) -> Result<()>;
}

/// Handle to a running producer.
pub struct Retrieval {
    strategy: Strategy,
    handle: JoinHandle<Result<()>>,
}

impl Retrieval {
    /// Strategy the producer is running.
    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Wait for the producer. Its channel is already closed when this returns.
    pub fn join(self) -> Result<()> {
        match self.handle.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Start the producer for `filter` on its own thread.
///
/// `tx` is consumed; it is closed exactly once, when the producer finishes.
pub fn spawn_retrieval(
    source: Arc<dyn InventorySource>,
    filter: &FilterParams,
    tx: AssetSender,
    cancel: CancelToken,
) -> Result<Retrieval> {
    let strategy = source.asset_retrieve(filter)?;
    log::debug!(
        "[{}] retrieving assets {}",
        source.name(),
        strategy.name()
    );

    let thread_strategy = strategy.clone();
    let handle = thread::Builder::new()
        .name(format!("inventory-{}", source.name()))
        .spawn(move || {
            let result = run_strategy(source.as_ref(), &thread_strategy, &tx, &cancel);
            tx.close();
            result
        })
        .map_err(Error::Spawn)?;

    Ok(Retrieval { strategy, handle })
}

fn run_strategy(
    source: &dyn InventorySource,
    strategy: &Strategy,
    tx: &AssetSender,
    cancel: &CancelToken,
) -> Result<()> {
    let result = match strategy {
        Strategy::BySerial(serials) => source.iter_by_serial(serials, tx),
        Strategy::ByIp(ips) => source.iter_by_ip(ips, tx),
        Strategy::FullScan(types) => source.iter_all(types, tx, cancel),
    };

    match result {
        Err(Error::Disconnected) => {
            log::warn!(
                "[{}] consumers stopped before inventory was exhausted",
                source.name()
            );
            Ok(())
        }
        other => other,
    }
}
