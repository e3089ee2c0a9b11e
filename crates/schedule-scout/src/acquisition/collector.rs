//! Network candidate collector.
//!
//! Consumes the stream of responses intercepted while the page loads,
//! keeps the most recent schedule-shaped payload seen so far, and signals
//! once the first acceptable one arrives. One bad response never stops
//! collection of the next.

use crate::schedule::{RecencyKey, ScheduleDocument};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Bodies longer than this many characters are dropped undecoded.
pub const MAX_BODY_CHARS: usize = 6_000_000;

/// What kind of request produced a response, as reported by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Document,
    Xhr,
    Fetch,
    Script,
    Stylesheet,
    Image,
    Font,
    Media,
    Other,
}

/// One intercepted network response, body included.
#[derive(Debug, Clone)]
pub struct NetworkExchange {
    /// Status in the 2xx range.
    pub ok: bool,
    pub status: u16,
    pub url: String,
    /// Declared `Content-Type` (or the browser's MIME sniffing result).
    pub content_type: Option<String>,
    pub transport: TransportKind,
    pub body: String,
}

impl NetworkExchange {
    /// Whether anything about the exchange suggests a JSON payload.
    pub fn looks_like_json(&self) -> bool {
        let declared = self
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"));

        declared
            || url_path_is_json(&self.url)
            || matches!(self.transport, TransportKind::Xhr | TransportKind::Fetch)
    }
}

fn url_path_is_json(raw: &str) -> bool {
    match url::Url::parse(raw) {
        Ok(parsed) => parsed.path().to_ascii_lowercase().ends_with(".json"),
        Err(_) => {
            let path = raw.split(['?', '#']).next().unwrap_or_default();
            path.to_ascii_lowercase().ends_with(".json")
        }
    }
}

/// Outcome of observing one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    NotOk,
    NotJson,
    TooLarge,
    Undecodable,
    NotSchedule,
    /// Schedule-shaped, but not strictly more recent than the current best.
    NotNewer,
    Accepted,
}

/// A schedule-shaped payload seen on the network.
#[derive(Debug, Clone)]
pub struct CandidateObservation {
    pub document: ScheduleDocument,
    pub key: RecencyKey,
    pub observed_at: Instant,
}

#[derive(Default)]
struct CollectorState {
    best: Option<CandidateObservation>,
    observed: usize,
    accepted: usize,
}

/// Best-so-far reducer over intercepted network exchanges.
pub struct NetworkCollector {
    state: Mutex<CollectorState>,
    first: watch::Sender<Option<ScheduleDocument>>,
}

impl NetworkCollector {
    pub fn new() -> Self {
        let (first, _) = watch::channel(None);
        Self {
            state: Mutex::new(CollectorState::default()),
            first,
        }
    }

    /// Drain `exchanges` in a background task until the sender side closes.
    pub fn spawn(self: &Arc<Self>, mut exchanges: mpsc::Receiver<NetworkExchange>) -> JoinHandle<()> {
        let collector = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(exchange) = exchanges.recv().await {
                collector.observe(&exchange);
            }
            trace!("network exchange stream closed");
        })
    }

    /// Fold one exchange into the collector state.
    pub fn observe(&self, exchange: &NetworkExchange) -> Verdict {
        let verdict = self.evaluate(exchange);
        trace!(
            status = exchange.status,
            transport = ?exchange.transport,
            bytes = exchange.body.len(),
            ?verdict,
            "observed network exchange"
        );
        verdict
    }

    fn evaluate(&self, exchange: &NetworkExchange) -> Verdict {
        self.lock().observed += 1;

        if !exchange.ok {
            return Verdict::NotOk;
        }
        if !exchange.looks_like_json() {
            return Verdict::NotJson;
        }
        if exceeds_cap(&exchange.body) {
            debug!(bytes = exchange.body.len(), "skipping oversized response body");
            return Verdict::TooLarge;
        }

        let value: Value = match serde_json::from_str(&exchange.body) {
            Ok(v) => v,
            Err(_) => return Verdict::Undecodable,
        };
        let Some(document) = ScheduleDocument::from_value(value) else {
            return Verdict::NotSchedule;
        };

        self.offer(document)
    }

    /// Offer a schedule-shaped document directly.
    ///
    /// Replaces the current best only on a strictly greater recency key,
    /// so among equal stamps the first one observed stays.
    pub fn offer(&self, document: ScheduleDocument) -> Verdict {
        let key = document.recency();
        let mut state = self.lock();

        if state.best.as_ref().is_some_and(|best| key <= best.key) {
            return Verdict::NotNewer;
        }

        let is_first = state.best.is_none();
        state.best = Some(CandidateObservation {
            document: document.clone(),
            key,
            observed_at: Instant::now(),
        });
        state.accepted += 1;
        drop(state);

        debug!(
            recency = key.value(),
            unparsed_stamp = key.is_sentinel(),
            first = is_first,
            "accepted network schedule candidate"
        );

        if is_first {
            self.first.send_replace(Some(document));
        }
        Verdict::Accepted
    }

    /// Wait up to `timeout` for the first acceptable candidate.
    ///
    /// `None` means nothing arrived in time; that is an expected outcome,
    /// not an error. Collection carries on after the timeout.
    pub async fn wait_for_first(&self, timeout: Duration) -> Option<ScheduleDocument> {
        let mut rx = self.first.subscribe();
        let first = match tokio::time::timeout(timeout, rx.wait_for(Option::is_some)).await {
            Ok(Ok(first)) => first.clone(),
            _ => None,
        };
        first
    }

    /// The current best candidate, without blocking.
    pub fn best(&self) -> Option<ScheduleDocument> {
        self.lock().best.as_ref().map(|c| c.document.clone())
    }

    /// The current best candidate with its observation details.
    pub fn best_observation(&self) -> Option<CandidateObservation> {
        self.lock().best.clone()
    }

    /// `(observed, accepted)` counters, for diagnostics.
    pub fn stats(&self) -> (usize, usize) {
        let state = self.lock();
        (state.observed, state.accepted)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CollectorState> {
        // State stays consistent even if a holder panicked mid-update.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for NetworkCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn exceeds_cap(body: &str) -> bool {
    body.len() > MAX_BODY_CHARS && body.chars().count() > MAX_BODY_CHARS
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exchange(body: String) -> NetworkExchange {
        NetworkExchange {
            ok: true,
            status: 200,
            url: "https://example.org/api/schedule".into(),
            content_type: Some("application/json; charset=utf-8".into()),
            transport: TransportKind::Fetch,
            body,
        }
    }

    fn schedule(update: &str, tag: &str) -> String {
        json!({"data": {"1": {}}, "today": "1", "update": update, "tag": tag}).to_string()
    }

    #[test]
    fn test_strictly_newer_wins_and_ties_keep_first() {
        let c = NetworkCollector::new();
        assert_eq!(c.observe(&exchange(schedule("10.02.2026 09:00", "A"))), Verdict::Accepted);
        assert_eq!(c.observe(&exchange(schedule("10.02.2026 08:00", "B"))), Verdict::NotNewer);
        assert_eq!(c.observe(&exchange(schedule("10.02.2026 09:00", "C"))), Verdict::NotNewer);
        assert_eq!(c.best().unwrap().as_value()["tag"], "A");
        assert_eq!(c.stats(), (3, 1));
    }

    #[test]
    fn test_newer_candidate_replaces_best() {
        let c = NetworkCollector::new();
        c.observe(&exchange(schedule("10.02.2026 09:00", "A")));
        assert_eq!(c.observe(&exchange(schedule("10.02.2026 09:01", "B"))), Verdict::Accepted);
        assert_eq!(c.best().unwrap().as_value()["tag"], "B");
    }

    #[test]
    fn test_unparsed_stamp_still_becomes_best_but_loses_to_parsed() {
        let c = NetworkCollector::new();
        assert_eq!(c.observe(&exchange(schedule("n/a", "A"))), Verdict::Accepted);
        assert_eq!(c.observe(&exchange(schedule("oops", "B"))), Verdict::NotNewer);
        assert_eq!(c.observe(&exchange(schedule("01.01.2020 00:00", "C"))), Verdict::Accepted);
        assert_eq!(c.best().unwrap().as_value()["tag"], "C");
    }

    #[test]
    fn test_filters_non_json_evidence() {
        let c = NetworkCollector::new();
        let mut ex = exchange(schedule("10.02.2026 09:00", "A"));
        ex.content_type = Some("text/html".into());
        ex.transport = TransportKind::Document;
        assert_eq!(c.observe(&ex), Verdict::NotJson);

        ex.url = "https://example.org/static/schedule.json?v=3".into();
        assert_eq!(c.observe(&ex), Verdict::Accepted);
    }

    #[test]
    fn test_xhr_without_json_content_type_is_considered() {
        let c = NetworkCollector::new();
        let mut ex = exchange(schedule("10.02.2026 09:00", "A"));
        ex.content_type = Some("text/plain".into());
        ex.transport = TransportKind::Xhr;
        assert_eq!(c.observe(&ex), Verdict::Accepted);
    }

    #[test]
    fn test_bad_bodies_do_not_stop_collection() {
        let c = NetworkCollector::new();
        assert_eq!(c.observe(&exchange("{not json".into())), Verdict::Undecodable);
        assert_eq!(c.observe(&exchange(r#"{"data":1}"#.into())), Verdict::NotSchedule);
        let mut failed = exchange(schedule("10.02.2026 09:00", "X"));
        failed.ok = false;
        failed.status = 503;
        assert_eq!(c.observe(&failed), Verdict::NotOk);
        assert_eq!(c.observe(&exchange(schedule("10.02.2026 09:00", "A"))), Verdict::Accepted);
    }

    #[test]
    fn test_oversized_body_is_not_decoded() {
        let c = NetworkCollector::new();
        let padding = "x".repeat(MAX_BODY_CHARS);
        let body = json!({"data": {"1": {}}, "today": "1", "update": "10.02.2026 09:00", "pad": padding});
        assert_eq!(c.observe(&exchange(body.to_string())), Verdict::TooLarge);
        assert!(c.best().is_none());
    }

    #[tokio::test]
    async fn test_wait_for_first_times_out_without_candidates() {
        let c = NetworkCollector::new();
        assert!(c.wait_for_first(Duration::from_millis(20)).await.is_none());
    }

    #[tokio::test]
    async fn test_wait_for_first_returns_first_and_best_keeps_moving() {
        let c = Arc::new(NetworkCollector::new());
        let (tx, rx) = mpsc::channel(8);
        let task = c.spawn(rx);

        tx.send(exchange(schedule("10.02.2026 09:00", "A"))).await.unwrap();
        let first = c.wait_for_first(Duration::from_secs(5)).await.unwrap();
        assert_eq!(first.as_value()["tag"], "A");

        tx.send(exchange(schedule("10.02.2026 10:00", "B"))).await.unwrap();
        drop(tx);
        task.await.unwrap();

        assert_eq!(c.best().unwrap().as_value()["tag"], "B");
        // The first-candidate signal fires once and keeps its value.
        let again = c.wait_for_first(Duration::from_millis(10)).await.unwrap();
        assert_eq!(again.as_value()["tag"], "A");
    }
}
