//! Shared plumbing for the configure and execute commands.

pub mod configure;
pub mod execute;

use anyhow::{Context as _, Result, bail};
use butler::{
    CommandExecutor, ConfigurationApplier, DispatchOptions, Dispatcher, Pipeline,
    SectionConfigurator, TemplateRenderer,
};
use inventory::{
    Action, CancelToken, ChassisRegistry, CommandRunner, Counters, CsvSource, EncSource,
    FilterParams, InventorySource, IpListSource, RetryConfig, split_list,
};
use std::sync::Arc;
use std::time::Duration;

use crate::Context;
use crate::cli::{SourceKind, TargetArgs};
use crate::config::ButlerConfig;
use crate::connector::NoProtocolConnector;
use crate::{interrupt, paths, progress, ui};

/// Translate the target flags into inventory filter parameters.
pub fn filter_params(args: &TargetArgs) -> FilterParams {
    FilterParams {
        serials: args.serials.as_deref().map(split_list).unwrap_or_default(),
        ips: args.ips.as_deref().map(split_list).unwrap_or_default(),
        chassis: args.chassis,
        servers: args.servers,
    }
}

/// Inventory source selected by the config, plus the registry to record
/// chassis setup against when the source supports it.
type SourceParts = (Arc<dyn InventorySource>, Option<Arc<dyn ChassisRegistry>>);

fn build_source(config: &ButlerConfig, metrics: &Arc<Counters>) -> Result<SourceParts> {
    match config.inventory.source {
        SourceKind::Csv => {
            let source: Arc<dyn InventorySource> =
                Arc::new(CsvSource::new(config.csv_file()?, config.batch_size));
            Ok((source, None))
        }
        SourceKind::Iplist => {
            let source: Arc<dyn InventorySource> = Arc::new(IpListSource::new(config.batch_size));
            Ok((source, None))
        }
        SourceKind::Enc => {
            let enc = &config.inventory.enc;
            let runner = CommandRunner::new(paths::expand(&enc.bin));
            let source = Arc::new(
                EncSource::new(Box::new(runner))
                    .with_nic_prefixes(enc.bmc_nic_prefix.clone())
                    .with_locations(config.locations.clone())
                    .with_batch_size(config.batch_size)
                    .with_retry(RetryConfig::new(
                        enc.retries,
                        Duration::from_secs(enc.retry_delay_secs),
                    ))
                    .with_metrics(metrics.clone()),
            );
            let registry: Arc<dyn ChassisRegistry> = source.clone();
            let source: Arc<dyn InventorySource> = source;
            Ok((source, Some(registry)))
        }
    }
}

/// Load config, wire the pipeline and run `action` on every matching asset.
pub fn run(ctx: &Context, args: &TargetArgs, action: Action) -> Result<()> {
    let mut config = ButlerConfig::load(ctx.config.as_deref())?;
    config.merge_args(args);
    config.validate()?;

    let filter = filter_params(args);
    let name = action.name();
    let metrics = Arc::new(Counters::new());
    let cancel = CancelToken::new();
    let (source, registry) = build_source(&config, &metrics)?;

    let connector = Arc::new(NoProtocolConnector);
    let credentials: Arc<[butler::Credential]> = config.credentials.clone().into();

    let mut applier = ConfigurationApplier::new(
        connector.clone(),
        Arc::new(TemplateRenderer::new()),
        Arc::new(SectionConfigurator::new()),
        credentials.clone(),
        metrics.clone(),
        cancel.clone(),
    )
    .with_dry_run(config.dry_run);
    if let Some(registry) = registry {
        applier = applier.with_registry(registry);
    }

    let mut executor = CommandExecutor::new(connector, credentials, metrics.clone(), cancel.clone())
        .with_dry_run(config.dry_run);
    if let Some(endpoint) = &config.firmware_endpoint {
        executor = executor.with_firmware_endpoint(endpoint.clone());
    }

    let options = DispatchOptions {
        locations: config.locations.iter().cloned().collect(),
        ignore_location: config.ignore_location,
    };
    let dispatcher = Dispatcher::new(
        Arc::new(applier),
        Arc::new(executor),
        options,
        metrics.clone(),
        cancel.clone(),
    );

    if config.dry_run && !ctx.quiet {
        ui::warn("Dry run - no device will be contacted");
    }
    log::info!(
        "Starting {name} source={} butlers={}",
        source.name(),
        config.butlers
    );

    interrupt::cancel_on_interrupt(cancel.clone())?;
    let pb = progress::spinner(&format!("Running {name}"), ctx.quiet);
    let result = Pipeline::new(Arc::new(dispatcher), config.butlers, cancel)
        .run(source, &filter, Some(action))
        .with_context(|| format!("{name} aborted, inventory could not be read"));
    pb.finish_and_clear();
    let summary = result?;

    if !ctx.quiet {
        ui::summary(name, &summary, config.dry_run);
        if ctx.verbose > 0 {
            ui::counters(&metrics.snapshot());
            ui::timings(&metrics.timings());
        }
    }

    if !summary.is_success() {
        bail!("{} of {} assets failed", summary.failed, summary.total());
    }
    Ok(())
}
