use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Method, StatusCode};
use snafu::prelude::*;

use super::error::variant::*;
use super::types::*;
use super::Result;
use crate::config::Config;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Side-channel calls must not hang a teardown or a reconnect cycle.
/// The event stream request is built here too but is sent and owned by the
/// connection driver and carries no such deadline.
const SIDE_CHANNEL_TIMEOUT: Duration = Duration::from_secs(10);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Till licensing HTTP API client
#[derive(Debug, Clone)]
pub struct Client {
    client: reqwest::Client,
    base: String,
    license_key: String,
    machine_id: String,
}

impl Client {
    /// Create an api client from a validated configuration.
    pub(crate) fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .gzip(true)
            .deflate(true)
            .user_agent(APP_USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context(ClientCreateFailed)?;

        Ok(Self {
            client,
            base: config.base_url.as_str().trim_end_matches('/').to_string(),
            license_key: config.license_key.clone(),
            machine_id: config.machine_id.clone(),
        })
    }

    /// Build the long-lived event stream request.
    ///
    /// Only builds: the connection driver sends it and exclusively owns the
    /// response body for the lifetime of the connection.
    pub(crate) fn event_stream_request(&self) -> reqwest::RequestBuilder {
        let url = format!("{}/api/events/{}", self.base, self.license_key);

        self.client
            .get(url)
            .query(&[("machineId", self.machine_id.as_str())])
            .header(reqwest::header::ACCEPT, "text/event-stream")
    }

    /// Query events missed while disconnected, newer than `since`.
    pub(crate) async fn missed_events(&self, since: DateTime<Utc>) -> Result<MissedEvents> {
        let url = format!("{}/api/events/{}/missed", self.base, self.license_key);
        let since = since.to_rfc3339_opts(SecondsFormat::Millis, true);

        let resp = self
            .client
            .get(&url)
            .query(&[("since", since.as_str())])
            .timeout(SIDE_CHANNEL_TIMEOUT)
            .send()
            .await
            .with_context(|_| RequestFailed {
                method: Method::GET,
                url: &url,
            })?;

        ensure!(
            resp.status() == StatusCode::OK,
            HTTPStatusNotOK {
                method: Method::GET,
                url: &url,
                status_code: resp.status(),
            }
        );

        let body = resp.bytes().await.with_context(|_| RequestFailed {
            method: Method::GET,
            url: &url,
        })?;

        serde_json::from_slice(&body).with_context(|_| ParseBodyFailed { body })
    }

    /// Report the processing outcome of one event.
    pub(crate) async fn acknowledge(&self, report: &AckReport) -> Result<()> {
        let url = format!("{}/api/events/acknowledge", self.base);

        let body = Acknowledgment {
            event_id: &report.event_id,
            license_key: &self.license_key,
            machine_id_hash: &self.machine_id,
            status: report.status,
            error_message: report.error_message.as_deref(),
            processing_time_ms: report.processing_time_ms,
        };

        self.post(&url, &body).await
    }

    /// Register, keep alive or withdraw this terminal's session record.
    pub(crate) async fn terminal_session(
        &self,
        action: TerminalAction,
        terminal_info: Option<TerminalInfo>,
    ) -> Result<()> {
        let url = format!("{}/api/terminal-sessions", self.base);

        let body = TerminalSession {
            action,
            license_key: &self.license_key,
            machine_id_hash: &self.machine_id,
            terminal_info,
        };

        self.post(&url, &body).await
    }

    async fn post<B: serde::Serialize>(&self, url: &str, body: &B) -> Result<()> {
        let resp = self
            .client
            .post(url)
            .json(body)
            .timeout(SIDE_CHANNEL_TIMEOUT)
            .send()
            .await
            .with_context(|_| RequestFailed {
                method: Method::POST,
                url,
            })?;

        ensure!(
            resp.status() == StatusCode::OK,
            HTTPStatusNotOK {
                method: Method::POST,
                url,
                status_code: resp.status(),
            }
        );

        Ok(())
    }
}
