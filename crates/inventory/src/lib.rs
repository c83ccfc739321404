//! # inventory
//!
//! Asset inventory for fleets of out-of-band management controllers.
//!
//! This crate provides:
//! - The [`Asset`] model and the usable-address rule
//! - A bounded [`channel`] of asset batches with a single, move-only sender
//! - Inventory sources (CSV file, fixed IP list, external node classifier)
//! - Reconciliation of lookups so every requested identifier yields one asset
//! - Fixed-delay retry and a broadcast-once [`CancelToken`]
//!
//! ## Example
//!
//! ```no_run
//! use inventory::{CancelToken, CsvSource, FilterParams, channel, spawn_retrieval};
//! use std::sync::Arc;
//!
//! let (tx, rx) = channel(4);
//! let source = Arc::new(CsvSource::new("assets.csv", 10));
//! let filter = FilterParams::default();
//!
//! let producer = spawn_retrieval(source, &filter, tx, CancelToken::new()).unwrap();
//! for batch in rx.iter() {
//!     for asset in batch {
//!         println!("{}", asset.context());
//!     }
//! }
//! producer.join().unwrap();
//! ```

pub mod cancel;
pub mod channel;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod reconcile;
pub mod retry;
pub mod source;
pub mod types;

pub use cancel::CancelToken;
pub use channel::{AssetReceiver, AssetSender, channel};
pub use error::{Error, ErrorCategory, Result};
pub use filter::{FilterParams, Strategy, split_list};
pub use metrics::{Counters, MetricsSink, NoMetrics};
pub use reconcile::ReconciliationSet;
pub use retry::RetryConfig;
pub use source::{
    ChassisRegistry, CommandRunner, CsvSource, EncRunner, EncSource, InventorySource,
    IpListSource, Retrieval, spawn_retrieval,
};
pub use types::{Action, Asset, AssetType, Batch, UNSET_ADDRESS, is_valid_address};
