//! Scripted HTTP transport for testing.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::{oneshot, Notify};

use crate::http::{HttpRequest, HttpTransport, RawResponse, TransportError};

enum Reply {
    Respond(RawResponse),
    Fail(TransportError),
    Hold(oneshot::Receiver<RawResponse>),
}

#[derive(Clone)]
enum StickyReply {
    Respond(RawResponse),
    Fail(TransportError),
}

#[derive(Default)]
struct Script {
    /// One-shot replies, consumed in insertion order.
    queued: Vec<(String, Reply)>,
    /// Replies served every time. The last one set for a fragment wins.
    sticky: Vec<(String, StickyReply)>,
    requests: Vec<HttpRequest>,
}

/// Releases a response held by [`MockTransport::hold`].
///
/// Dropping the gate without releasing fails the held request.
pub struct ResponseGate {
    sender: oneshot::Sender<RawResponse>,
}

impl ResponseGate {
    /// Deliver `response`. Does nothing if the request was already dropped.
    pub fn release(self, response: RawResponse) {
        let _ = self.sender.send(response);
    }
}

/// Mock implementation of [`HttpTransport`].
///
/// Replies are matched by URL fragment: one-shot replies first, then sticky
/// ones, the longest matching fragment winning in both. Unmatched requests get
/// an empty 404.
///
/// # Example
///
/// ```rust,ignore
/// let transport = MockTransport::new();
/// transport.respond_once("/predictiveSearch", RawResponse::new(503, ""));
/// transport.respond("/predictiveSearch", RawResponse::json(200, &body));
///
/// // ... run the pipeline ...
///
/// assert_eq!(transport.request_count("/predictiveSearch"), 2);
/// ```
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<Script>,
    request_received: Notify,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every request matching `fragment` with `response`.
    pub fn respond(&self, fragment: &str, response: RawResponse) {
        self.set_sticky(fragment, StickyReply::Respond(response));
    }

    /// Answer the next request matching `fragment` with `response`.
    pub fn respond_once(&self, fragment: &str, response: RawResponse) {
        self.script()
            .queued
            .push((fragment.to_string(), Reply::Respond(response)));
    }

    /// Fail every request matching `fragment`.
    pub fn fail(&self, fragment: &str, error: TransportError) {
        self.set_sticky(fragment, StickyReply::Fail(error));
    }

    /// Hold the next request matching `fragment` until the gate is released.
    pub fn hold(&self, fragment: &str) -> ResponseGate {
        let (sender, receiver) = oneshot::channel();
        self.script()
            .queued
            .push((fragment.to_string(), Reply::Hold(receiver)));
        ResponseGate { sender }
    }

    /// All requests received so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.script().requests.clone()
    }

    pub fn request_count(&self, fragment: &str) -> usize {
        self.script()
            .requests
            .iter()
            .filter(|r| r.url.contains(fragment))
            .count()
    }

    /// Wait until at least `count` requests have been received.
    pub async fn wait_for_requests(&self, count: usize) {
        loop {
            let notified = self.request_received.notified();
            if self.script().requests.len() >= count {
                return;
            }
            notified.await;
        }
    }

    fn set_sticky(&self, fragment: &str, reply: StickyReply) {
        let mut script = self.script();
        script.sticky.retain(|(f, _)| f != fragment);
        script.sticky.push((fragment.to_string(), reply));
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_reply(&self, request: &HttpRequest) -> Reply {
        let mut script = self.script();
        script.requests.push(request.clone());

        let queued = script
            .queued
            .iter()
            .enumerate()
            .filter(|(_, (fragment, _))| request.url.contains(fragment.as_str()))
            .max_by(|(ia, (fa, _)), (ib, (fb, _))| fa.len().cmp(&fb.len()).then(ib.cmp(ia)))
            .map(|(index, _)| index);
        if let Some(index) = queued {
            return script.queued.remove(index).1;
        }

        script
            .sticky
            .iter()
            .filter(|(fragment, _)| request.url.contains(fragment.as_str()))
            .max_by_key(|(fragment, _)| fragment.len())
            .map(|(_, reply)| match reply.clone() {
                StickyReply::Respond(response) => Reply::Respond(response),
                StickyReply::Fail(error) => Reply::Fail(error),
            })
            .unwrap_or_else(|| Reply::Respond(RawResponse::new(404, "")))
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<RawResponse, TransportError> {
        let reply = self.next_reply(request);
        self.request_received.notify_waiters();

        match reply {
            Reply::Respond(response) => Ok(response),
            Reply::Fail(error) => Err(error),
            Reply::Hold(receiver) => receiver
                .await
                .map_err(|_| TransportError::Other("held response was never released".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use uuid::Uuid;

    fn request(url: &str) -> HttpRequest {
        HttpRequest::new(Uuid::new_v4(), HttpMethod::Get, url, None)
    }

    #[tokio::test]
    async fn test_once_before_sticky_and_longest_fragment() {
        let transport = MockTransport::new();
        transport.respond("/a", RawResponse::new(200, "short"));
        transport.respond("/a/b", RawResponse::new(200, "long"));
        transport.respond_once("/a", RawResponse::new(500, ""));

        let first = transport.execute(&request("https://h/a/b")).await.unwrap();
        let second = transport.execute(&request("https://h/a/b")).await.unwrap();
        let third = transport.execute(&request("https://h/a/c")).await.unwrap();
        let unmatched = transport.execute(&request("https://h/z")).await.unwrap();

        assert_eq!(first.status, 500);
        assert_eq!(second.body, "long");
        assert_eq!(third.body, "short");
        assert_eq!(unmatched.status, 404);
        assert_eq!(transport.request_count("/a/"), 3);
    }

    #[tokio::test]
    async fn test_dropped_gate_fails_request() {
        let transport = MockTransport::new();
        let gate = transport.hold("/a");
        drop(gate);

        let result = transport.execute(&request("https://h/a")).await;
        assert!(matches!(result, Err(TransportError::Other(_))));
    }
}
