// BodyToHeaderTransform - lift a value from a response body into all
// subsequent request headers
//
// The classic use is session establishment: the sign-in response carries
// `{"auth-token": "ABC123"}` somewhere in its body, and every request after
// it must send `X-Authorization: token-{ABC123}`. This transform watches
// response bodies for the pattern and, on the first match, replaces itself
// with a HeaderInjectionTransform carrying the extracted value. Until then it
// keeps waiting, request after request.

use super::{
    compile, extract_first, HeaderInjectionTransform, RequestTransform, ResponseFn,
    ResponseTransform,
};
use crate::error::ReplayError;
use crate::har::Request;
use regex::Regex;
use std::sync::Arc;

pub struct BodyToHeaderTransform {
    pattern: Regex,
    header_name: String,
    before: String,
    after: String,
}

impl BodyToHeaderTransform {
    /// `before` and `after` wrap the extracted value in the injected header:
    /// the header's value becomes `before + extracted + after`.
    pub fn new(
        pattern: &str,
        header_name: impl Into<String>,
        before: impl Into<String>,
        after: impl Into<String>,
    ) -> Result<Self, ReplayError> {
        Ok(Self {
            pattern: compile(pattern)?,
            header_name: header_name.into(),
            before: before.into(),
            after: after.into(),
        })
    }
}

impl RequestTransform for BodyToHeaderTransform {
    fn apply(self: Arc<Self>, _request: &mut Request) -> Arc<dyn ResponseTransform> {
        // The request is untouched; the work happens when the response for
        // this request comes back.
        ResponseFn::wrap(move |response| {
            let waiting: Arc<dyn RequestTransform> = self.clone();
            let Some(body) = response.body_text() else {
                return waiting;
            };
            match extract_first(&self.pattern, body) {
                Some(found) => {
                    let value = format!("{}{}{}", self.before, found, self.after);
                    let installed: Arc<dyn RequestTransform> =
                        Arc::new(HeaderInjectionTransform::new(self.header_name.clone(), value));
                    installed
                }
                // No match yet: run this same scan again on the next
                // response, until an appropriate match is found.
                None => waiting,
            }
        })
    }
}
