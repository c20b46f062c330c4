//! Monitor: owns the stream client and dispatches events to subscribers.

use std::{fmt, sync::Arc};

use futures_util::StreamExt;

use crate::{
    config::Config,
    filter::Filter,
    stream::{Client, Signal, SignalStream, StreamEvent},
    subscriber::Subscriber,
    Result,
};

struct Registration {
    filter: Box<dyn Filter>,
    subscriber: Arc<dyn Subscriber>,
}

/// Owns one stream [`Client`] for the lifetime of the host application and
/// fans business events out to registered subscribers.
///
/// The monitor is an explicit, owned instance: the host creates it, holds
/// it, and tears it down through the client handle. Connection state changes
/// and license validation demands are logged here; a host that needs to
/// react to them programmatically reads the [`SignalStream`] of a raw
/// [`Client`] instead.
pub struct Monitor {
    client: Client,
    signals: SignalStream,
    subscribers: Vec<Registration>,
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("client", &self.client)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl Monitor {
    /// Create a monitor and its underlying stream client.
    pub fn new(config: Config) -> Result<Self> {
        let (client, signals) = Client::new(config)?;

        Ok(Self {
            client,
            signals,
            subscribers: Vec::new(),
        })
    }

    /// Register a subscriber for every event passing the filter.
    pub fn register<F, S>(&mut self, filter: F, subscriber: S)
    where
        F: Filter + 'static,
        S: Subscriber + 'static,
    {
        self.subscribers.push(Registration {
            filter: Box::new(filter),
            subscriber: Arc::new(subscriber),
        });
    }

    /// Handle for connection control and acknowledgments.
    ///
    /// Clone it before [`run`](Self::run) to keep a way of calling
    /// [`disconnect`](Client::disconnect) from elsewhere.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Connect and pump signals until the client is disconnected.
    pub async fn run(mut self) {
        self.client.connect();

        while let Some(signal) = self.signals.next().await {
            match signal {
                Signal::Connected => log::info!("Licensing event stream online"),
                Signal::Disconnected => log::info!("Licensing event stream offline"),
                Signal::LicenseValidationRequired {
                    reason,
                    status_code,
                } => {
                    log::warn!(
                        "License validation required (status {}): {}",
                        status_code,
                        reason
                    );
                }
                Signal::Event(event) => self.dispatch(Arc::new(*event)),
            }
        }

        log::info!("Licensing event stream closed");
    }

    /// Hand one event to every subscriber whose filter passes it, each on
    /// its own task so a slow subscriber never stalls the stream.
    fn dispatch(&self, event: Arc<StreamEvent>) {
        for registration in &self.subscribers {
            if registration.filter.filter_event(&event) {
                log::trace!(
                    "Dispatch {} event {} to {}",
                    event.kind,
                    event.id,
                    registration.subscriber.name(),
                );

                let subscriber = Arc::clone(&registration.subscriber);
                let event = Arc::clone(&event);

                tokio::spawn(subscriber.on_event(event));
            }
        }
    }
}
