//! Shared fixtures and a scripted executor for tests.

use crate::executor::Executor;
use crate::har::{Entry, Har, Request, Response, Timings};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::Instant;

pub const FIXTURE_JSON: &str = include_str!("../fixtures/browse-github-users.har");

/// The recorded browsing session used across the test suite.
pub fn fixture() -> Har {
    let mut har = Har::from_json(FIXTURE_JSON).expect("fixture parses");
    har.name = "browse-github-users".to_string();
    har
}

/// A bare request with the given verb and URL.
pub fn request(method: &str, url: &str) -> Request {
    Request {
        method: method.to_string(),
        url: url.to_string(),
        http_version: "HTTP/1.1".to_string(),
        headers: Vec::new(),
        query_string: Vec::new(),
        cookies: Vec::new(),
        headers_size: -1,
        body_size: -1,
        post_data: None,
    }
}

/// An entry at the given recorded offset.
pub fn entry(time: f64, request: Request) -> Entry {
    Entry {
        started_date_time: String::new(),
        time,
        request,
        response: None,
        cache: serde_json::Value::Object(Default::default()),
        timings: Timings::default(),
        server_ip_address: None,
        pageref: None,
    }
}

/// A synthetic archive of GET entries at the given recorded offsets.
pub fn archive_of(times: &[f64]) -> Har {
    Har {
        name: "synthetic".to_string(),
        version: "1.2".to_string(),
        creator: Default::default(),
        pages: Vec::new(),
        entries: times
            .iter()
            .enumerate()
            .map(|(i, &time)| {
                entry(
                    time,
                    request("GET", &format!("https://example.test/entry/{}", i)),
                )
            })
            .collect(),
    }
}

/// Scripted executor: records every request it is handed, plays back canned
/// responses in order (empty responses once the script runs out), and can be
/// put into a failing mode where every invocation errors without producing a
/// response.
pub struct MockExecutor {
    requests: Mutex<Vec<Request>>,
    instants: Mutex<Vec<Instant>>,
    responses: Mutex<VecDeque<Response>>,
    observer: Mutex<Option<mpsc::UnboundedSender<Request>>>,
    fail: bool,
}

impl MockExecutor {
    pub fn new() -> Arc<Self> {
        Self::scripted(Vec::new())
    }

    pub fn scripted(responses: Vec<Response>) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            instants: Mutex::new(Vec::new()),
            responses: Mutex::new(responses.into()),
            observer: Mutex::new(None),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            instants: Mutex::new(Vec::new()),
            responses: Mutex::new(VecDeque::new()),
            observer: Mutex::new(None),
            fail: true,
        })
    }

    /// Stream of requests as they execute, for tests that need to react
    /// mid-replay (e.g. killing the runner after the first entry).
    pub fn observe(&self) -> mpsc::UnboundedReceiver<Request> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.observer.lock().unwrap() = Some(tx);
        rx
    }

    /// Every request executed so far, in execution order.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    /// When each request executed, for pacing assertions.
    pub fn instants(&self) -> Vec<Instant> {
        self.instants.lock().unwrap().clone()
    }

    fn record(&self, request: &Request) -> Result<Response> {
        self.requests.lock().unwrap().push(request.clone());
        self.instants.lock().unwrap().push(Instant::now());
        if let Some(tx) = self.observer.lock().unwrap().as_ref() {
            let _ = tx.send(request.clone());
        }
        if self.fail {
            return Err(anyhow!("scripted executor failure"));
        }
        Ok(self.responses.lock().unwrap().pop_front().unwrap_or_default())
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn get(&self, request: &Request) -> Result<Response> {
        self.record(request)
    }

    async fn post(&self, request: &Request) -> Result<Response> {
        self.record(request)
    }

    async fn put(&self, request: &Request) -> Result<Response> {
        self.record(request)
    }

    async fn delete(&self, request: &Request) -> Result<Response> {
        self.record(request)
    }

    async fn head(&self, request: &Request) -> Result<Response> {
        self.record(request)
    }

    async fn patch(&self, request: &Request) -> Result<Response> {
        self.record(request)
    }
}
