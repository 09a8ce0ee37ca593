// HeaderToHeaderTransform - lift a value from a response header into all
// subsequent request headers
//
// Same shape as BodyToHeaderTransform but the value lives in a response
// header rather than the body: think `new-session: Session ABC123` coming
// back from a sign-in endpoint. Until a match is seen this transform only
// observes; afterwards the chain position holds a HeaderInjectionTransform.

use super::{
    compile, extract_first, HeaderInjectionTransform, RequestTransform, ResponseFn,
    ResponseTransform,
};
use crate::error::ReplayError;
use crate::har::Request;
use regex::Regex;
use std::sync::Arc;

pub struct HeaderToHeaderTransform {
    /// Response header to read the value out of. None means every response
    /// header is tried, in order, and the first match wins.
    response_key: Option<String>,
    pattern: Regex,
    request_key: String,
    before: String,
    after: String,
}

impl HeaderToHeaderTransform {
    pub fn new(
        response_key: Option<String>,
        pattern: &str,
        request_key: impl Into<String>,
        before: impl Into<String>,
        after: impl Into<String>,
    ) -> Result<Self, ReplayError> {
        Ok(Self {
            response_key: response_key.filter(|key| !key.is_empty()),
            pattern: compile(pattern)?,
            request_key: request_key.into(),
            before: before.into(),
            after: after.into(),
        })
    }
}

impl RequestTransform for HeaderToHeaderTransform {
    fn apply(self: Arc<Self>, _request: &mut Request) -> Arc<dyn ResponseTransform> {
        ResponseFn::wrap(move |response| {
            for header in &response.headers {
                if let Some(key) = &self.response_key {
                    if header.name != *key {
                        continue;
                    }
                }
                if let Some(found) = extract_first(&self.pattern, &header.value) {
                    let value = format!("{}{}{}", self.before, found, self.after);
                    let installed: Arc<dyn RequestTransform> = Arc::new(
                        HeaderInjectionTransform::new(self.request_key.clone(), value),
                    );
                    return installed;
                }
            }
            self.clone()
        })
    }
}
