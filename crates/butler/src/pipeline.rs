//! Pipeline driver: one inventory producer, a pool of butlers draining it.

use crate::dispatch::{Dispatcher, Outcome};
use crate::error::{Error, Result};
use inventory::{
    Action, AssetReceiver, CancelToken, FilterParams, InventorySource, channel, spawn_retrieval,
};
use std::sync::{Arc, Mutex};

/// Outcome totals for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub configured: usize,
    pub executed: usize,
    pub failed: usize,
    /// No usable address, unmanaged location or no action
    pub skipped: usize,
    /// Dropped after cancellation
    pub cancelled: usize,
}

impl DispatchSummary {
    /// Add one outcome.
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Configured => self.configured += 1,
            Outcome::Executed => self.executed += 1,
            Outcome::Failed { .. } => self.failed += 1,
            Outcome::NoAddress | Outcome::UnmanagedLocation | Outcome::UnknownAction => {
                self.skipped += 1;
            }
            Outcome::Cancelled => self.cancelled += 1,
        }
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &DispatchSummary) {
        self.configured += other.configured;
        self.executed += other.executed;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.cancelled += other.cancelled;
    }

    /// Total number of assets received
    pub fn total(&self) -> usize {
        self.configured + self.executed + self.failed + self.skipped + self.cancelled
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Connects an inventory source to a pool of dispatchers.
pub struct Pipeline {
    dispatcher: Arc<Dispatcher>,
    butlers: usize,
    cancel: CancelToken,
}

impl Pipeline {
    pub fn new(dispatcher: Arc<Dispatcher>, butlers: usize, cancel: CancelToken) -> Self {
        Self {
            dispatcher,
            butlers: butlers.max(1),
            cancel,
        }
    }

    /// Retrieve assets matching `filter` from `source` and hand each one to a
    /// butler with `action` attached.
    ///
    /// Per-asset failures are counted in the summary. An error is returned only
    /// when the inventory itself failed.
    pub fn run(
        &self,
        source: Arc<dyn InventorySource>,
        filter: &FilterParams,
        action: Option<Action>,
    ) -> Result<DispatchSummary> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.butlers)
            .thread_name(|i| format!("butler-{i}"))
            .build()
            .map_err(|e| Error::WorkerPool(e.to_string()))?;

        let (tx, rx) = channel(self.butlers);
        let retrieval = spawn_retrieval(source, filter, tx, self.cancel.clone())?;
        log::info!(
            "spawned {} butlers strategy={}",
            self.butlers,
            retrieval.strategy().name()
        );

        let summary = Mutex::new(DispatchSummary::default());
        pool.scope(|scope| {
            for _ in 0..self.butlers {
                let rx = rx.clone();
                let action = action.clone();
                let summary = &summary;
                scope.spawn(move |_| {
                    let local = self.consume(&rx, action.as_ref());
                    match summary.lock() {
                        Ok(mut locked) => locked.merge(&local),
                        Err(poisoned) => poisoned.into_inner().merge(&local),
                    }
                });
            }
        });
        drop(rx);

        retrieval.join()?;
        let summary = match summary.into_inner() {
            Ok(summary) => summary,
            Err(poisoned) => poisoned.into_inner(),
        };
        log::info!(
            "butlers done configured={} executed={} failed={} skipped={}",
            summary.configured,
            summary.executed,
            summary.failed,
            summary.skipped
        );
        Ok(summary)
    }

    /// Drain the channel until the producer closes it. After cancellation
    /// assets are still received so the producer never blocks.
    fn consume(&self, rx: &AssetReceiver, action: Option<&Action>) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        for batch in rx.iter() {
            for mut asset in batch {
                asset.action = action.cloned();
                summary.record(&self.dispatcher.handle(asset));
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::ConfigurationApplier;
    use crate::configurator::SectionConfigurator;
    use crate::device::Credential;
    use crate::dispatch::DispatchOptions;
    use crate::execute::CommandExecutor;
    use crate::render::TemplateRenderer;
    use crate::testing::{Kind, MockConnector};
    use inventory::{Counters, CsvSource, IpListSource};

    fn pipeline(
        connector: &Arc<MockConnector>,
        metrics: &Arc<Counters>,
        butlers: usize,
    ) -> Pipeline {
        let cancel = CancelToken::new();
        let credentials: Arc<[Credential]> = Vec::new().into();
        let applier = ConfigurationApplier::new(
            connector.clone(),
            Arc::new(TemplateRenderer::new()),
            Arc::new(SectionConfigurator::new()),
            credentials.clone(),
            metrics.clone(),
            cancel.clone(),
        );
        let executor =
            CommandExecutor::new(connector.clone(), credentials, metrics.clone(), cancel.clone());
        let dispatcher = Dispatcher::new(
            Arc::new(applier),
            Arc::new(executor),
            DispatchOptions::default(),
            metrics.clone(),
            cancel.clone(),
        );
        Pipeline::new(Arc::new(dispatcher), butlers, cancel)
    }

    fn ips(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("10.0.0.{i}")).collect()
    }

    #[test]
    fn test_every_asset_is_handled_once() {
        let connector = Arc::new(MockConnector::new(Kind::Bmc));
        let metrics = Arc::new(Counters::new());
        let filter = FilterParams {
            ips: ips(25),
            ..Default::default()
        };
        let action = Action::Configure(Arc::from(&b"[[bmc]]\nname = \"ntp\"\n"[..]));

        let summary = pipeline(&connector, &metrics, 4)
            .run(Arc::new(IpListSource::new(3)), &filter, Some(action))
            .unwrap();

        assert_eq!(summary.configured, 25);
        assert_eq!(summary.total(), 25);
        assert_eq!(connector.logins(), 25);
        assert_eq!(connector.calls.count("close"), 25);
        assert_eq!(metrics.get(&["butler", "asset_recvd"]), 25);
        assert!(metrics.timings().contains_key("butler.configure_runtime"));
    }

    #[test]
    fn test_failures_do_not_stop_the_run() {
        let connector = Arc::new(MockConnector::new(Kind::Unreachable));
        let metrics = Arc::new(Counters::new());
        let mut addresses = ips(4);
        addresses.push("0.0.0.0".to_string());
        let filter = FilterParams {
            ips: addresses,
            ..Default::default()
        };

        let summary = pipeline(&connector, &metrics, 2)
            .run(
                Arc::new(IpListSource::new(2)),
                &filter,
                Some(Action::Execute("powercycle".to_string())),
            )
            .unwrap();

        assert_eq!(summary.failed, 4);
        assert_eq!(summary.skipped, 1);
        assert!(!summary.is_success());
        assert_eq!(metrics.get(&["butler", "execute_fail"]), 4);
        assert_eq!(metrics.get(&["butler", "asset_recvd_noip"]), 1);
    }

    #[test]
    fn test_unreadable_inventory_fails_the_run() {
        let connector = Arc::new(MockConnector::new(Kind::Bmc));
        let metrics = Arc::new(Counters::new());
        let filter = FilterParams {
            ips: ips(1),
            ..Default::default()
        };

        let result = pipeline(&connector, &metrics, 2).run(
            Arc::new(CsvSource::new("/nonexistent/assets.csv", 10)),
            &filter,
            Some(Action::Execute("powercycle".to_string())),
        );

        assert!(matches!(result, Err(Error::Inventory(_))));
        assert_eq!(connector.logins(), 0);
    }

    #[test]
    fn test_summary_merge() {
        let mut a = DispatchSummary::default();
        a.record(&Outcome::Configured);
        a.record(&Outcome::NoAddress);
        let mut b = DispatchSummary::default();
        b.record(&Outcome::Failed {
            action: "execute",
            error: "boom".to_string(),
        });
        b.record(&Outcome::Cancelled);

        a.merge(&b);
        assert_eq!(a.total(), 4);
        assert_eq!(a.skipped, 1);
        assert_eq!(a.cancelled, 1);
    }
}
