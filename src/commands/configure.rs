use anyhow::{Context as _, Result};
use inventory::Action;
use std::fs;
use std::sync::Arc;

use crate::Context;
use crate::cli::ConfigureArgs;

pub fn run(ctx: &Context, args: ConfigureArgs) -> Result<()> {
    let raw = fs::read(&args.config_file)
        .with_context(|| format!("Could not read {}", args.config_file.display()))?;
    log::debug!(
        "Loaded configuration template {} ({} bytes)",
        args.config_file.display(),
        raw.len()
    );
    super::run(ctx, &args.target, Action::Configure(Arc::from(raw)))
}
