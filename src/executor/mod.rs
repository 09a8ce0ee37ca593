// Executor - the capability that actually performs HTTP requests
//
// The runner holds its executor behind this trait so tests can inject a mock
// and management code can swap implementations. One operation per verb,
// mirroring the dispatch the runner does on each entry's recorded method.

mod http;

pub use http::HttpExecutor;

use crate::har::{Request, Response};
use anyhow::Result;
use async_trait::async_trait;

/// Anything that can perform HTTP requests on behalf of a runner.
///
/// Implementations must not mutate the request they are handed. A transport
/// failure is an error only when no response object could be produced at all;
/// DNS trouble surfaced as an error is fine, but a non-2xx status is an
/// ordinary response. Replay is a test workload, and the runner records the
/// failure and moves on either way.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn get(&self, request: &Request) -> Result<Response>;
    async fn post(&self, request: &Request) -> Result<Response>;
    async fn put(&self, request: &Request) -> Result<Response>;
    async fn delete(&self, request: &Request) -> Result<Response>;
    async fn head(&self, request: &Request) -> Result<Response>;
    async fn patch(&self, request: &Request) -> Result<Response>;
}
