//! Till licensing API request/response types

use serde::Serialize;

use crate::stream::StreamEvent;

/// Response of the missed-events query used by gap recovery.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissedEvents {
    /// events with a timestamp after the requested cursor
    pub events: Vec<StreamEvent>,
    /// number of events in this page
    pub count: usize,
    /// true when the server truncated the result to one page
    pub has_more: bool,
}

/// Local processing outcome of one delivered event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    /// event was processed
    Success,
    /// event processing failed
    Failed,
    /// event was intentionally not processed
    Skipped,
}

/// Delivery acknowledgment reported back to the server.
///
/// Acknowledgments are advisory telemetry for the server's delivery
/// tracking; sending one never influences local processing.
#[derive(Debug, Clone)]
pub struct AckReport {
    /// id of the acknowledged event
    pub event_id: String,
    /// processing outcome
    pub status: AckStatus,
    /// failure reason, only meaningful with [`AckStatus::Failed`]
    pub error_message: Option<String>,
    /// local processing duration in milliseconds
    pub processing_time_ms: Option<u64>,
}

impl AckReport {
    /// Report successful processing.
    pub fn success(event_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            status: AckStatus::Success,
            error_message: None,
            processing_time_ms: None,
        }
    }

    /// Report failed processing with a reason.
    pub fn failed(event_id: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            status: AckStatus::Failed,
            error_message: Some(error_message.into()),
            processing_time_ms: None,
        }
    }

    /// Report an intentionally skipped event.
    pub fn skipped(event_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            status: AckStatus::Skipped,
            error_message: None,
            processing_time_ms: None,
        }
    }

    /// Attach the local processing duration.
    pub fn with_processing_time_ms(mut self, processing_time_ms: u64) -> Self {
        self.processing_time_ms = Some(processing_time_ms);
        self
    }
}

/// wire body of `POST /api/events/acknowledge`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Acknowledgment<'a> {
    pub event_id: &'a str,
    pub license_key: &'a str,
    pub machine_id_hash: &'a str,
    pub status: AckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
}

/// Action field of a terminal session call.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalAction {
    /// announce this running terminal
    Register,
    /// periodic session keep-alive
    Heartbeat,
    /// withdraw this terminal's session
    Disconnect,
}

/// Identity of one running terminal, sent with session registration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalInfo {
    /// host name of the machine running the terminal
    pub host_name: String,
    /// version of this crate
    pub app_version: String,
    /// operating system family
    pub platform: String,
}

impl TerminalInfo {
    /// Identity of the current process.
    pub fn current() -> Self {
        Self {
            host_name: std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string()),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            platform: std::env::consts::OS.to_string(),
        }
    }
}

/// wire body of `POST /api/terminal-sessions`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TerminalSession<'a> {
    pub action: TerminalAction,
    pub license_key: &'a str,
    pub machine_id_hash: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_info: Option<TerminalInfo>,
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_acknowledgment_encode() {
        let body = Acknowledgment {
            event_id: "evt-1",
            license_key: "POS-1234-ABCD",
            machine_id_hash: "hash",
            status: AckStatus::Failed,
            error_message: Some("printer offline"),
            processing_time_ms: Some(42),
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "eventId": "evt-1",
                "licenseKey": "POS-1234-ABCD",
                "machineIdHash": "hash",
                "status": "failed",
                "errorMessage": "printer offline",
                "processingTimeMs": 42,
            })
        );
    }

    #[test]
    fn test_acknowledgment_optional_fields_skipped() {
        let body = Acknowledgment {
            event_id: "evt-1",
            license_key: "POS-1234-ABCD",
            machine_id_hash: "hash",
            status: AckStatus::Success,
            error_message: None,
            processing_time_ms: None,
        };

        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("errorMessage").is_none());
        assert!(value.get("processingTimeMs").is_none());
    }

    #[test]
    fn test_terminal_session_encode() {
        let body = TerminalSession {
            action: TerminalAction::Register,
            license_key: "POS-1234-ABCD",
            machine_id_hash: "hash",
            terminal_info: Some(TerminalInfo {
                host_name: "till-01".to_string(),
                app_version: "0.1.0".to_string(),
                platform: "linux".to_string(),
            }),
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["action"], "register");
        assert_eq!(value["terminalInfo"]["hostName"], "till-01");
    }

    #[test]
    fn test_missed_events_decode() {
        let data = json!({
            "events": [{
                "id": "evt-9",
                "type": "subscription_updated",
                "timestamp": "2026-08-06T10:00:00Z",
                "licenseKey": "POS-1234-ABCD",
                "data": { "plan": "pro" },
            }],
            "count": 1,
            "hasMore": true,
        });

        let missed: MissedEvents = serde_json::from_value(data).unwrap();
        assert_eq!(missed.count, 1);
        assert!(missed.has_more);
        assert_eq!(missed.events[0].id, "evt-9");
    }
}
