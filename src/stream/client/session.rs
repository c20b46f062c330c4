//! Terminal session side channel.
//!
//! Every connected terminal registers a session record with the server and
//! keeps it alive on a fixed interval, so the vendor can see which devices
//! are online. The channel is independent of the event stream protocol and
//! its failures are logged only; they never influence stream state.

use std::time::Duration;

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{sleep_until, Instant},
};

use crate::api::{
    self,
    types::{TerminalAction, TerminalInfo},
};

/// Background keep-alive worker, spawned once per successful connection.
#[derive(Debug)]
pub(super) struct SessionWorker {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SessionWorker {
    pub fn spawn(api: api::Client, keep_alive: Duration) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run(api, keep_alive, stop_rx));

        Self { stop_tx, handle }
    }

    /// Stop the keep-alive loop.
    ///
    /// The final unregister call finishes on its own task; nothing in the
    /// stream teardown waits on this side channel.
    pub fn stop(self) {
        let Self { stop_tx, handle } = self;

        if stop_tx.send(true).is_err() {
            log::trace!("Session worker already stopped");
            return;
        }

        tokio::spawn(async move {
            if let Err(err) = handle.await {
                log::debug!("Session worker task failed: {}", err);
            }
        });
    }
}

async fn run(api: api::Client, keep_alive: Duration, mut stop_rx: watch::Receiver<bool>) {
    log::debug!("Terminal session worker start");

    if let Err(err) = api
        .terminal_session(TerminalAction::Register, Some(TerminalInfo::current()))
        .await
    {
        log::warn!("Terminal session register failed: {}", err);
    }

    let mut keep_alive_tick = Instant::now() + keep_alive;

    loop {
        tokio::select! {
            biased;

            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }

            _ = sleep_until(keep_alive_tick) => {
                log::trace!("Send terminal session keep-alive");

                if let Err(err) = api.terminal_session(TerminalAction::Heartbeat, None).await {
                    log::warn!("Terminal session keep-alive failed: {}", err);
                }

                keep_alive_tick = Instant::now() + keep_alive;
            }
        }
    }

    if let Err(err) = api.terminal_session(TerminalAction::Disconnect, None).await {
        log::warn!("Terminal session unregister failed: {}", err);
    }

    log::debug!("Terminal session worker stop");
}
