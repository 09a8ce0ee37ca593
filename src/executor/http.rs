// Reference executor backed by reqwest
//
// Builds a live request from the recorded model, preserving header order and
// duplicates, and maps the wire response back into the model. Response bodies
// come back decoded: reqwest's gzip support transparently decompresses
// Content-Encoding: gzip, and anything else is treated as UTF-8 text with
// replacement characters for invalid bytes.

use super::Executor;
use crate::har::{Pair, Request, Response};
use crate::logging::LogSink;
use anyhow::{Context as _, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, LOCATION};
use reqwest::Method;

pub struct HttpExecutor {
    client: reqwest::Client,
    log: LogSink,
}

impl HttpExecutor {
    pub fn new(log: LogSink) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .pool_max_idle_per_host(10)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client, log })
    }

    async fn dispatch(&self, method: Method, request: &Request) -> Result<Response> {
        self.log.line(&format!("{} {}", method, request.url));

        let mut headers = HeaderMap::new();
        for pair in &request.headers {
            // append, not insert: repeated names stay repeated on the wire
            match (
                HeaderName::from_bytes(pair.name.as_bytes()),
                HeaderValue::from_str(&pair.value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => tracing::warn!(header = %pair.name, "skipping malformed recorded header"),
            }
        }

        // If the recording didn't pin a Content-Type, pick one: the post
        // data's mime type when present, text/html as the fallback.
        if !request.has_header("Content-Type") {
            let mime = request
                .post_data
                .as_ref()
                .filter(|post| !post.mime_type.is_empty())
                .map(|post| post.mime_type.as_str())
                .unwrap_or("text/html");
            if let Ok(value) = HeaderValue::from_str(mime) {
                headers.insert(CONTENT_TYPE, value);
            }
        }

        let mut builder = self
            .client
            .request(method.clone(), request.url.as_str())
            .headers(headers);
        if method == Method::POST || method == Method::PUT || method == Method::PATCH {
            if let Some(text) = request.post_data.as_ref().and_then(|post| post.text.clone()) {
                builder = builder.body(text);
            }
        }

        let upstream = builder
            .send()
            .await
            .with_context(|| format!("{} {} produced no response", method, request.url))?;

        let response = self.into_model(upstream).await;
        self.log
            .line(&format!("{} {}", response.status, response.status_text));
        Ok(response)
    }

    /// Map a wire response into the model. Never fails: by the time we have a
    /// response object, anything else (an unreadable body, say) is recorded
    /// and the response still counts.
    async fn into_model(&self, upstream: reqwest::Response) -> Response {
        let status = upstream.status();
        let http_version = format!("{:?}", upstream.version());

        // reqwest collapses repeated header names into one entry holding
        // several values; explode them back out, one pair per occurrence, in
        // wire order.
        let headers: Vec<Pair> = upstream
            .headers()
            .iter()
            .map(|(name, value)| {
                Pair::new(name.as_str(), String::from_utf8_lossy(value.as_bytes()))
            })
            .collect();

        let redirect_url = upstream
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let bytes = match upstream.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(error = %err, "error reading http response body");
                Default::default()
            }
        };

        Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            http_version,
            headers,
            body_size: bytes.len() as i64,
            body: Some(String::from_utf8_lossy(&bytes).into_owned()),
            redirect_url,
            ..Response::default()
        }
    }
}

#[async_trait]
impl Executor for HttpExecutor {
    async fn get(&self, request: &Request) -> Result<Response> {
        self.dispatch(Method::GET, request).await
    }

    async fn post(&self, request: &Request) -> Result<Response> {
        self.dispatch(Method::POST, request).await
    }

    async fn put(&self, request: &Request) -> Result<Response> {
        self.dispatch(Method::PUT, request).await
    }

    async fn delete(&self, request: &Request) -> Result<Response> {
        self.dispatch(Method::DELETE, request).await
    }

    async fn head(&self, request: &Request) -> Result<Response> {
        self.dispatch(Method::HEAD, request).await
    }

    async fn patch(&self, request: &Request) -> Result<Response> {
        self.dispatch(Method::PATCH, request).await
    }
}
