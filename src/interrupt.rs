//! Ctrl-C handling: the first interrupt stops the run gracefully, the second exits.

use anyhow::{Context, Result};
use inventory::CancelToken;
use std::thread;

/// Exit status after a second interrupt (128 + SIGINT)
const INTERRUPTED: i32 = 130;

/// What to do after an interrupt arrived.
#[derive(Debug, PartialEq, Eq)]
enum Response {
    /// Stop retrieving and let butlers finish what they hold
    Drain,
    /// Already draining, give up now
    Exit,
}

fn on_interrupt(cancel: &CancelToken) -> Response {
    if cancel.cancel() {
        Response::Drain
    } else {
        Response::Exit
    }
}

/// Cancel `cancel` on the first Ctrl-C.
///
/// The inventory finishes the page in flight and butlers drop whatever is
/// still queued. A second Ctrl-C exits immediately.
pub fn cancel_on_interrupt(cancel: CancelToken) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()
        .context("Could not start the interrupt listener")?;

    thread::Builder::new()
        .name("interrupt".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                loop {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        log::warn!("Cannot listen for Ctrl-C: {e}");
                        return;
                    }
                    match on_interrupt(&cancel) {
                        Response::Drain => log::warn!(
                            "Interrupt received, finishing in-flight work (Ctrl-C again to exit)"
                        ),
                        Response::Exit => std::process::exit(INTERRUPTED),
                    }
                }
            });
        })
        .context("Could not spawn the interrupt listener")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_interrupt_cancels_second_exits() {
        let cancel = CancelToken::new();
        let shared = cancel.clone();

        assert_eq!(on_interrupt(&cancel), Response::Drain);
        assert!(shared.is_cancelled());
        assert_eq!(on_interrupt(&cancel), Response::Exit);
    }

    #[test]
    fn test_listener_starts() {
        let cancel = CancelToken::new();
        cancel_on_interrupt(cancel.clone()).unwrap();
        assert!(!cancel.is_cancelled());
    }
}
