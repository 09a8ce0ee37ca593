// HeaderInjectionTransform - add a fixed header to every request

use super::{Passthrough, RequestTransform, ResponseTransform};
use crate::har::{Pair, Request};
use std::sync::Arc;

/// Appends one `(key, value)` header pair to every request it sees. It never
/// de-duplicates: an injection adds exactly one entry per request, on top of
/// whatever the recording already carried. Usually installed by a
/// BodyToHeader or HeaderToHeader transform once a live value is captured.
pub struct HeaderInjectionTransform {
    key: String,
    value: String,
}

impl HeaderInjectionTransform {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl RequestTransform for HeaderInjectionTransform {
    fn apply(self: Arc<Self>, request: &mut Request) -> Arc<dyn ResponseTransform> {
        request
            .headers
            .push(Pair::new(self.key.clone(), self.value.clone()));
        Passthrough::wrap(self)
    }
}
