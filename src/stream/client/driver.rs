//! The background driver task owning the connection state machine.
//!
//! One driver runs per client, for the client's whole lifetime. All state
//! transitions happen here, on one task: timers, commands from the handle
//! and stream chunks are multiplexed through `select!`, so no locking is
//! needed anywhere in the subsystem.

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use tokio::{
    sync::mpsc::{self, error::TryRecvError},
    time::{sleep_until, Instant},
};

use super::{recovery, session::SessionWorker, Command};
use crate::{
    api,
    config::Config,
    stream::{
        backoff::ReconnectPolicy,
        dedup::Deduplicator,
        event::{Signal, StreamEvent},
        frame::{Frame, FrameDecoder},
    },
};

/// Top-level connection states.
///
/// Owned exclusively by the driver; the rest of the crate only observes the
/// emitted signals. Terminal only through an explicit disconnect command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Disconnected,
}

/// What one select round of the streaming loop produced.
enum Step {
    Command(Option<Command>),
    HeartbeatTimeout,
    Sweep,
    Chunk(Option<Result<bytes::Bytes, reqwest::Error>>),
}

/// Why the streaming loop ended.
enum StreamEnd {
    Manual,
    ReceiverGone,
    Lost,
}

pub(super) async fn run(
    config: Config,
    api: api::Client,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    signal_tx: mpsc::Sender<Signal>,
) {
    log::debug!("Connection driver start");

    let next_sweep = Instant::now() + config.dedup_window;

    let mut driver = Driver {
        policy: ReconnectPolicy::new(
            config.initial_reconnect_delay,
            config.max_reconnect_delay,
            config.backoff_multiplier,
        ),
        dedup: Deduplicator::new(config.dedup_window),
        cursor: None,
        state: ConnectionState::Idle,
        next_sweep,
        config,
        api,
        cmd_rx,
        signal_tx,
    };

    driver.run().await;

    log::debug!("Connection driver stop");
}

struct Driver {
    config: Config,
    api: api::Client,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    signal_tx: mpsc::Sender<Signal>,

    state: ConnectionState,
    policy: ReconnectPolicy,

    // dedup map and cursor deliberately live across reconnects: both are
    // required for replay correctness, not per-connection bookkeeping
    dedup: Deduplicator,
    cursor: Option<DateTime<Utc>>,
    next_sweep: Instant,
}

impl Driver {
    async fn run(&mut self) {
        loop {
            let next = match self.state {
                ConnectionState::Idle => self.idle().await,
                ConnectionState::Connecting | ConnectionState::Connected => {
                    self.connect_and_stream().await
                }
                ConnectionState::Disconnected => self.backoff_and_recover().await,
            };

            match next {
                Some(state) => self.state = state,
                None => break,
            }
        }
    }

    /// Wait for the first connect command.
    async fn idle(&mut self) -> Option<ConnectionState> {
        log::debug!("Client idle, waiting for connect");

        loop {
            tokio::select! {
                biased;

                cmd = self.cmd_rx.recv() => match cmd {
                    Some(Command::Connect) => {
                        log::debug!("Connect requested");
                        return Some(ConnectionState::Connecting);
                    }
                    Some(Command::Disconnect) | None => {
                        log::debug!("Disconnect requested while idle, stop");
                        let _ = self.signal_tx.send(Signal::Disconnected).await;
                        return None;
                    }
                },

                _ = sleep_until(self.next_sweep) => {
                    self.dedup.sweep();
                    self.next_sweep = Instant::now() + self.config.dedup_window;
                }
            }
        }
    }

    /// One connection attempt and, if it succeeds, the streaming loop.
    async fn connect_and_stream(&mut self) -> Option<ConnectionState> {
        log::debug!("Connecting event stream");

        let send = self.api.event_stream_request().send();
        tokio::pin!(send);

        // the connect request itself is a suspension point; commands keep
        // being served so disconnect stays responsive mid-attempt
        let result = loop {
            tokio::select! {
                biased;

                cmd = self.cmd_rx.recv() => match cmd {
                    Some(Command::Connect) => {
                        log::trace!("Connect requested while already connecting, ignore");
                    }
                    Some(Command::Disconnect) | None => {
                        log::info!("Disconnect requested while connecting, stop");
                        let _ = self.signal_tx.send(Signal::Disconnected).await;
                        return None;
                    }
                },

                result = &mut send => break result,
            }
        };

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                log::warn!("Event stream request failed: {}", err);
                return Some(ConnectionState::Disconnected);
            }
        };

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            let reason = match response.text().await {
                Ok(body) if !body.trim().is_empty() => body,
                _ => "event stream request rejected".to_string(),
            };

            log::warn!("Event stream rejected with 401: {}", reason);

            // surfaced immediately so the caller can revalidate out-of-band,
            // the retry loop keeps running regardless
            let signal = Signal::LicenseValidationRequired {
                reason,
                status_code: status.as_u16(),
            };

            if self.signal_tx.send(signal).await.is_err() {
                log::debug!("Signal receiver dropped, stop");
                return None;
            }

            return Some(ConnectionState::Disconnected);
        }

        if status != reqwest::StatusCode::OK {
            log::warn!("Event stream rejected with status {}", status);
            return Some(ConnectionState::Disconnected);
        }

        self.state = ConnectionState::Connected;
        self.policy.reset();

        log::info!("Event stream connected");

        if self.signal_tx.send(Signal::Connected).await.is_err() {
            log::debug!("Signal receiver dropped, stop");
            return None;
        }

        let session = SessionWorker::spawn(self.api.clone(), self.config.keep_alive_interval);

        let mut body = response.bytes_stream();
        let mut decoder = FrameDecoder::default();
        let mut heartbeat_deadline = Instant::now() + self.config.heartbeat_timeout;

        let end = loop {
            let step = tokio::select! {
                biased;

                cmd = self.cmd_rx.recv() => Step::Command(cmd),
                _ = sleep_until(heartbeat_deadline) => Step::HeartbeatTimeout,
                _ = sleep_until(self.next_sweep) => Step::Sweep,
                chunk = body.next() => Step::Chunk(chunk),
            };

            match step {
                Step::Command(Some(Command::Connect)) => {
                    log::trace!("Connect requested while connected, ignore");
                }
                Step::Command(Some(Command::Disconnect)) | Step::Command(None) => {
                    log::info!("Disconnect requested, tear down stream");
                    break StreamEnd::Manual;
                }
                Step::HeartbeatTimeout => {
                    // proactively catches half-open connections the
                    // transport would never report on its own
                    log::warn!(
                        "No heartbeat within {:?}, treat connection as dead",
                        self.config.heartbeat_timeout
                    );
                    break StreamEnd::Lost;
                }
                Step::Sweep => {
                    self.dedup.sweep();
                    self.next_sweep = Instant::now() + self.config.dedup_window;
                }
                Step::Chunk(Some(Ok(chunk))) => {
                    log::trace!("Received {} bytes", chunk.len());
                    decoder.push(&chunk);

                    let mut receiver_alive = true;
                    while let Some(frame) = decoder.next_frame() {
                        if frame.is_heartbeat() {
                            log::trace!("Heartbeat received");
                            heartbeat_deadline = Instant::now() + self.config.heartbeat_timeout;
                            continue;
                        }

                        if !self.emit_frame(frame).await {
                            receiver_alive = false;
                            break;
                        }
                    }

                    if !receiver_alive {
                        log::debug!("Signal receiver dropped, stop");
                        break StreamEnd::ReceiverGone;
                    }
                }
                Step::Chunk(Some(Err(err))) => {
                    log::warn!("Event stream transport broken: {}", err);
                    break StreamEnd::Lost;
                }
                Step::Chunk(None) => {
                    log::warn!("Event stream ended by server");
                    break StreamEnd::Lost;
                }
            }
        };

        session.stop();
        drop(body);

        match end {
            StreamEnd::Manual => {
                let _ = self.signal_tx.send(Signal::Disconnected).await;
                None
            }
            StreamEnd::ReceiverGone => None,
            StreamEnd::Lost => {
                if self.signal_tx.send(Signal::Disconnected).await.is_err() {
                    log::debug!("Signal receiver dropped, stop");
                    return None;
                }

                Some(ConnectionState::Disconnected)
            }
        }
    }

    /// Wait out the backoff delay, then recover missed events and retry.
    async fn backoff_and_recover(&mut self) -> Option<ConnectionState> {
        let delay = self.policy.next_delay();

        log::info!(
            "Reconnect attempt {} scheduled in {:?}",
            self.policy.attempts(),
            delay
        );

        let retry_at = Instant::now() + delay;

        loop {
            tokio::select! {
                biased;

                cmd = self.cmd_rx.recv() => match cmd {
                    Some(Command::Connect) => {
                        log::trace!("Connect requested while reconnect pending, ignore");
                    }
                    Some(Command::Disconnect) | None => {
                        log::info!("Disconnect requested while reconnect pending, stop");
                        return None;
                    }
                },

                _ = sleep_until(self.next_sweep) => {
                    self.dedup.sweep();
                    self.next_sweep = Instant::now() + self.config.dedup_window;
                }

                _ = sleep_until(retry_at) => break,
            }
        }

        // recovery runs before the retry connects; its failure only means
        // missed events stay missing for this cycle
        if let Some(since) = self.cursor {
            log::debug!("Running gap recovery for events since {}", since);

            let outcome =
                recovery::recover(&self.api, since, &mut self.dedup, &self.signal_tx).await;

            if let Some(cursor) = outcome.cursor {
                self.cursor = Some(cursor);
            }

            if !outcome.receiver_alive {
                log::debug!("Signal receiver dropped during replay, stop");
                return None;
            }
        } else {
            log::debug!("No event cursor yet, skip gap recovery");
        }

        // disconnect may have been requested while recovery was in flight;
        // the finished replay stands, but no reconnect follows
        loop {
            match self.cmd_rx.try_recv() {
                Ok(Command::Connect) => {}
                Ok(Command::Disconnect) => {
                    log::info!("Disconnect requested during gap recovery, stop");
                    return None;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::debug!("Command channel closed, stop");
                    return None;
                }
            }
        }

        Some(ConnectionState::Connecting)
    }

    /// Build, dedup-check and emit one live event.
    ///
    /// Returns false when the signal receiver dropped.
    async fn emit_frame(&mut self, frame: Frame) -> bool {
        let event = StreamEvent::from_frame(&frame, &self.config.license_key);

        if !self.dedup.check_and_record(&event.id) {
            log::debug!("Duplicate event {} within dedup window, drop", event.id);
            return true;
        }

        self.cursor = Some(event.timestamp);

        log::trace!("Emit {} event {}", event.kind, event.id);

        self.signal_tx
            .send(Signal::Event(Box::new(event)))
            .await
            .is_ok()
    }
}
