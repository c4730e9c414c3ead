//! Network access on worker threads.
//!
//! Every request runs on its own short-lived thread and reports back over a
//! channel; the UI thread never blocks on the network.

use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::MapError;
use crate::records::SourceKind;

/// Identity of one fetch request. `seq` increases per source, so a late
/// response for an older request can be recognised and dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchTicket {
    pub source: SourceKind,
    pub seq: u64,
}

/// Raw response body, or why there is none
#[derive(Debug)]
pub struct FetchOutcome {
    pub ticket: FetchTicket,
    pub body: Result<Vec<u8>, MapError>,
}

/// Something finished on a worker thread
#[derive(Debug)]
pub enum WorkerEvent {
    Fetched(FetchOutcome),
    /// Assistant reply, or the error text to show in its place
    Chat(Result<String, String>),
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: String,
}

/// HTTP client for the point sources and the chat endpoint
pub struct FetchClient {
    base_url: String,
    http: reqwest::blocking::Client,
    tx: Sender<WorkerEvent>,
}

impl FetchClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<(Self, Receiver<WorkerEvent>), MapError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("raya-map/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MapError::Config(format!("http client init failed: {e}")))?;
        let (tx, rx) = unbounded();
        Ok((
            Self {
                base_url: base_url.trim_end_matches('/').to_string(),
                http,
                tx,
            },
            rx,
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET the source's endpoint in the background
    pub fn spawn_fetch(&self, ticket: FetchTicket) {
        let url = format!("{}{}", self.base_url, ticket.source.endpoint());
        let http = self.http.clone();
        let tx = self.tx.clone();
        thread::spawn(move || {
            debug!(source = %ticket.source, seq = ticket.seq, %url, "fetch started");
            let body = get_bytes(&http, &url).map_err(|reason| MapError::DataFetch {
                kind: ticket.source,
                reason,
            });
            if let Err(e) = &body {
                warn!(error = %e, "fetch failed");
            }
            // Receiver gone means the app is shutting down
            let _ = tx.send(WorkerEvent::Fetched(FetchOutcome { ticket, body }));
        });
    }

    /// POST a chat message in the background
    pub fn spawn_chat(&self, message: String) {
        let url = format!("{}/api/chat", self.base_url);
        let http = self.http.clone();
        let tx = self.tx.clone();
        thread::spawn(move || {
            let reply = post_chat(&http, &url, &message);
            if let Err(e) = &reply {
                warn!(error = %e, "chat request failed");
            }
            let _ = tx.send(WorkerEvent::Chat(reply));
        });
    }
}

fn get_bytes(http: &reqwest::blocking::Client, url: &str) -> Result<Vec<u8>, String> {
    let response = http
        .get(url)
        .send()
        .map_err(|e| format!("request failed: {e}"))?;
    if !response.status().is_success() {
        return Err(format!("server returned {}", response.status()));
    }
    response
        .bytes()
        .map(|b| b.to_vec())
        .map_err(|e| format!("reading body failed: {e}"))
}

fn post_chat(http: &reqwest::blocking::Client, url: &str, message: &str) -> Result<String, String> {
    let response = http
        .post(url)
        .json(&ChatRequest { message })
        .send()
        .map_err(|e| format!("assistant unreachable: {e}"))?;
    if !response.status().is_success() {
        return Err(format!("assistant returned {}", response.status()));
    }
    response
        .json::<ChatResponse>()
        .map(|r| r.message)
        .map_err(|e| format!("invalid assistant reply: {e}"))
}
