//! Pairing of response events into complete network exchanges.
//!
//! The browser reports a response's headers and the end of its body load
//! as separate events, delivered on separate streams. Their relative order
//! is not guaranteed on our side, so either may come first.

use crate::acquisition::collector::{NetworkExchange, TransportKind};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Response metadata, known once headers have arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    pub status: u16,
    pub url: String,
    pub content_type: Option<String>,
    pub transport: TransportKind,
}

impl ResponseMeta {
    /// Whether the body is worth fetching: only bodies the collector could accept.
    pub fn needs_body(&self) -> bool {
        self.is_ok() && self.clone().into_exchange(String::new()).looks_like_json()
    }

    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn into_exchange(self, body: String) -> NetworkExchange {
        NetworkExchange {
            ok: self.is_ok(),
            status: self.status,
            url: self.url,
            content_type: self.content_type,
            transport: self.transport,
            body,
        }
    }
}

/// One response-lifecycle event for request `K`.
#[derive(Debug, Clone)]
pub enum ResponseEvent<K> {
    Received(K, ResponseMeta),
    Finished(K),
    Failed(K),
}

/// Matches `Received` with `Finished` regardless of arrival order.
#[derive(Debug)]
pub struct ResponseTracker<K> {
    pending: HashMap<K, ResponseMeta>,
    finished_early: HashSet<K>,
    failed: HashSet<K>,
}

impl<K: Hash + Eq + Clone> ResponseTracker<K> {
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
            finished_early: HashSet::new(),
            failed: HashSet::new(),
        }
    }

    /// Apply one event; returns a response whose body has finished loading.
    pub fn apply(&mut self, event: ResponseEvent<K>) -> Option<(K, ResponseMeta)> {
        match event {
            ResponseEvent::Received(id, meta) => {
                if self.failed.contains(&id) {
                    return None;
                }
                if self.finished_early.remove(&id) {
                    return Some((id, meta));
                }
                self.pending.insert(id, meta);
                None
            }
            ResponseEvent::Finished(id) => {
                if let Some(meta) = self.pending.remove(&id) {
                    return Some((id, meta));
                }
                if !self.failed.contains(&id) {
                    self.finished_early.insert(id);
                }
                None
            }
            ResponseEvent::Failed(id) => {
                self.pending.remove(&id);
                self.finished_early.remove(&id);
                self.failed.insert(id);
                None
            }
        }
    }

    /// Responses still waiting for their counterpart event.
    pub fn in_flight(&self) -> usize {
        self.pending.len() + self.finished_early.len()
    }
}

impl<K: Hash + Eq + Clone> Default for ResponseTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(status: u16, content_type: &str, transport: TransportKind) -> ResponseMeta {
        ResponseMeta {
            status,
            url: "https://example.org/api/fact".into(),
            content_type: Some(content_type.into()),
            transport,
        }
    }

    fn json_meta() -> ResponseMeta {
        meta(200, "application/json", TransportKind::Fetch)
    }

    #[test]
    fn test_received_then_finished() {
        let mut t = ResponseTracker::new();
        assert!(t.apply(ResponseEvent::Received(1, json_meta())).is_none());
        assert_eq!(t.apply(ResponseEvent::Finished(1)), Some((1, json_meta())));
        assert_eq!(t.in_flight(), 0);
    }

    #[test]
    fn test_finished_before_received_is_not_lost() {
        let mut t = ResponseTracker::new();
        assert!(t.apply(ResponseEvent::Finished(7)).is_none());
        assert_eq!(t.in_flight(), 1);
        assert_eq!(t.apply(ResponseEvent::Received(7, json_meta())), Some((7, json_meta())));
        assert_eq!(t.in_flight(), 0);
    }

    #[test]
    fn test_every_interleaving_of_many_requests_completes() {
        let mut t = ResponseTracker::new();
        let mut done = 0;
        for id in 0..1000u32 {
            let (a, b) = if id % 2 == 0 {
                (ResponseEvent::Finished(id), ResponseEvent::Received(id, json_meta()))
            } else {
                (ResponseEvent::Received(id, json_meta()), ResponseEvent::Finished(id))
            };
            done += t.apply(a).into_iter().count();
            done += t.apply(b).into_iter().count();
        }
        assert_eq!(done, 1000);
        assert_eq!(t.in_flight(), 0);
    }

    #[test]
    fn test_failed_then_finished_yields_nothing() {
        let mut t = ResponseTracker::new();
        t.apply(ResponseEvent::Received(3, json_meta()));
        assert!(t.apply(ResponseEvent::Failed(3)).is_none());
        assert!(t.apply(ResponseEvent::Finished(3)).is_none());
        assert_eq!(t.in_flight(), 0);
    }

    #[test]
    fn test_failed_before_received_yields_nothing() {
        let mut t = ResponseTracker::new();
        t.apply(ResponseEvent::Finished(4));
        t.apply(ResponseEvent::Failed(4));
        assert!(t.apply(ResponseEvent::Received(4, json_meta())).is_none());
        assert_eq!(t.in_flight(), 0);
    }

    #[test]
    fn test_non_json_response_skips_body() {
        let image = ResponseMeta {
            url: "https://example.org/logo.png".into(),
            ..meta(200, "image/png", TransportKind::Image)
        };
        assert!(!image.needs_body());
        let exchange = image.into_exchange(String::new());
        assert!(exchange.ok);
        assert!(exchange.body.is_empty());
    }

    #[test]
    fn test_non_2xx_response_skips_body_and_is_not_ok() {
        let failed = meta(503, "application/json", TransportKind::Xhr);
        assert!(!failed.needs_body());
        assert!(!failed.into_exchange(String::new()).ok);
        assert!(json_meta().needs_body());
    }
}
