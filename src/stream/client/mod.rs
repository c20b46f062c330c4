//! Connection manager of the licensing event stream.

mod driver;
mod recovery;
mod session;

use std::task::Poll;

use futures_util::Stream;
use snafu::prelude::*;
use tokio::sync::mpsc;

use super::event::Signal;
use crate::{
    api::{self, types::AckReport},
    config::Config,
    error,
};

/// Control commands handed to the background driver.
#[derive(Debug)]
pub(crate) enum Command {
    Connect,
    Disconnect,
}

/// Licensing event stream client.
///
/// Owns the single outbound streaming connection and drives the whole
/// connect/stream/reconnect state machine on one background task, so every
/// state transition happens on a single logical thread of control. The
/// handle is cheap to clone; all clones steer the same connection.
#[derive(Debug, Clone)]
pub struct Client {
    api: api::Client,
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl Client {
    /// Create a client and spawn its background driver.
    ///
    /// This is the only fallible call of the subsystem: the configuration is
    /// validated here, every runtime failure afterwards is retried and
    /// logged instead of being surfaced.
    pub fn new(config: Config) -> crate::Result<(Self, SignalStream)> {
        config.validate().context(error::InvalidConfig)?;

        let api = api::Client::new(&config).context(error::CreateAPIClient)?;

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = mpsc::channel(32);

        tokio::spawn(driver::run(config, api.clone(), cmd_rx, signal_tx));

        log::debug!("Create stream client success");

        Ok((Self { api, cmd_tx }, SignalStream { rx: signal_rx }))
    }

    /// Open the event stream.
    ///
    /// Reentrancy-safe: a connect request while the client is already
    /// connecting or connected is a no-op.
    pub fn connect(&self) {
        if self.cmd_tx.send(Command::Connect).is_err() {
            log::debug!("Connect requested after the driver stopped, ignore");
        }
    }

    /// Close the stream and stop the retry loop.
    ///
    /// Safe to call from any state, including while a reconnect is pending.
    /// This is the only way to reach the terminal, non-retrying state; the
    /// [`SignalStream`] ends after the final
    /// [`Disconnected`](Signal::Disconnected) signal.
    pub fn disconnect(&self) {
        if self.cmd_tx.send(Command::Disconnect).is_err() {
            log::debug!("Disconnect requested after the driver stopped, ignore");
        }
    }

    /// Report the processing outcome of one delivered event.
    ///
    /// Fire and forget: the request runs on a detached task, any failure is
    /// logged and swallowed. Acknowledgment is advisory telemetry and never
    /// a condition for local success of event processing.
    pub fn acknowledge(&self, report: AckReport) {
        let api = self.api.clone();

        tokio::spawn(async move {
            if let Err(err) = api.acknowledge(&report).await {
                log::warn!("Acknowledge event {} failed: {}", report.event_id, err);
            }
        });
    }
}

/// Stream of [`Signal`]s from one client.
///
/// Yields `None` only after [`Client::disconnect`] completed the teardown.
#[derive(Debug)]
pub struct SignalStream {
    pub(crate) rx: mpsc::Receiver<Signal>,
}

impl Stream for SignalStream {
    type Item = Signal;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
