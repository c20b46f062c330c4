//! Recovery of events missed while disconnected.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::{
    api,
    stream::{dedup::Deduplicator, event::Signal},
};

/// Result of one recovery pass.
pub(super) struct Outcome {
    /// timestamp of the newest replayed event, if any was accepted
    pub cursor: Option<DateTime<Utc>>,
    /// false when the signal receiver dropped mid-replay
    pub receiver_alive: bool,
}

/// Fetch and replay events that arrived at the server after `since`.
///
/// Replayed events go through the same dedup check as live ones (a missed
/// event may have already arrived live in a race) and out through the same
/// signal channel, in ascending timestamp order. One page only: a truncated
/// response is logged and accepted as-is. Failures never propagate; the
/// reconnect that follows is unconditional either way.
pub(super) async fn recover(
    api: &api::Client,
    since: DateTime<Utc>,
    dedup: &mut Deduplicator,
    signal_tx: &mpsc::Sender<Signal>,
) -> Outcome {
    let mut outcome = Outcome {
        cursor: None,
        receiver_alive: true,
    };

    let mut missed = match api.missed_events(since).await {
        Ok(missed) => missed,
        Err(err) => {
            log::warn!(
                "Missed events query failed, reconnect without recovery: {}",
                err
            );
            return outcome;
        }
    };

    if missed.has_more {
        log::warn!(
            "Missed events response truncated at {} events, anything past this page is lost for this cycle",
            missed.count
        );
    }

    // server order is not trusted
    missed.events.sort_by_key(|event| event.timestamp);

    log::debug!("Replaying {} missed events", missed.events.len());

    for event in missed.events {
        if !dedup.check_and_record(&event.id) {
            log::debug!("Missed event {} already seen live, drop", event.id);
            continue;
        }

        outcome.cursor = Some(event.timestamp);

        log::trace!("Replay {} event {}", event.kind, event.id);

        if signal_tx.send(Signal::Event(Box::new(event))).await.is_err() {
            outcome.receiver_alive = false;
            return outcome;
        }
    }

    outcome
}
