use anyhow::Result;
use butler::BmcCommand;
use inventory::Action;

use crate::Context;
use crate::cli::ExecuteArgs;

pub fn run(ctx: &Context, args: ExecuteArgs) -> Result<()> {
    // Reject typos before touching the inventory.
    let command: BmcCommand = args.command.parse()?;
    super::run(ctx, &args.target, Action::Execute(command.to_string()))
}
