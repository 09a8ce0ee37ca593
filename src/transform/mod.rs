// Transform chain - stateful rewrites carried across the request/response boundary
//
// A transform is a two-sided state machine. Its request side may rewrite the
// outgoing request and returns the companion that will observe the response
// produced for *that* request. The response side inspects the live response
// (never modifying it) and returns the request-side transform for the next
// entry at the same chain position.
//
// A transform either runs unchanged forever (its response side hands back the
// same instance) or replaces itself: for example, a transform that waits to
// see an auth token in a response body returns itself until the token
// appears, then returns a HeaderInjectionTransform that stamps the token onto
// every subsequent request. Self-replacement is how state crosses requests.
//
// Transforms are held as `Arc<dyn ...>`, so "returns itself" is literally the
// same allocation and the return values are total: there is no null to
// return, which is what makes the chain-rebuild invariant safe.

mod body_to_header;
mod config;
mod constant;
mod header_injection;
mod header_to_header;

pub use body_to_header::BodyToHeaderTransform;
pub use config::{build_chain, load_transforms, TransformConfig};
pub use constant::ConstantTransform;
pub use header_injection::HeaderInjectionTransform;
pub use header_to_header::HeaderToHeaderTransform;

use crate::error::ReplayError;
use crate::har::{Request, Response};
use regex::Regex;
use std::sync::Arc;

/// The request side of a transform. `apply` may mutate the request; its
/// return value observes the response to this request.
pub trait RequestTransform: Send + Sync {
    fn apply(self: Arc<Self>, request: &mut Request) -> Arc<dyn ResponseTransform>;
}

/// The response side of a transform. `observe` reads the response and returns
/// the request-side transform to use for the next entry at this position.
pub trait ResponseTransform: Send + Sync {
    fn observe(self: Arc<Self>, response: &Response) -> Arc<dyn RequestTransform>;
}

/// Wraps a RequestTransform in a ResponseTransform that ignores the response
/// and hands the wrapped transform back verbatim.
pub struct Passthrough {
    inner: Arc<dyn RequestTransform>,
}

impl Passthrough {
    pub fn wrap(inner: Arc<dyn RequestTransform>) -> Arc<dyn ResponseTransform> {
        Arc::new(Self { inner })
    }
}

impl ResponseTransform for Passthrough {
    fn observe(self: Arc<Self>, _response: &Response) -> Arc<dyn RequestTransform> {
        self.inner.clone()
    }
}

/// Wraps a closure so request-side code can emit response-scanning logic
/// inline instead of defining a dedicated type.
pub struct ResponseFn {
    scan: Box<dyn Fn(&Response) -> Arc<dyn RequestTransform> + Send + Sync>,
}

impl ResponseFn {
    pub fn wrap(
        scan: impl Fn(&Response) -> Arc<dyn RequestTransform> + Send + Sync + 'static,
    ) -> Arc<dyn ResponseTransform> {
        Arc::new(Self {
            scan: Box::new(scan),
        })
    }
}

impl ResponseTransform for ResponseFn {
    fn observe(self: Arc<Self>, response: &Response) -> Arc<dyn RequestTransform> {
        (self.scan)(response)
    }
}

/// Run the request-side chain over a request, producing the observer list for
/// the upcoming response. There are always exactly as many observers as
/// request transforms.
pub fn apply_all(
    chain: &[Arc<dyn RequestTransform>],
    request: &mut Request,
) -> Vec<Arc<dyn ResponseTransform>> {
    chain
        .iter()
        .map(|transform| transform.clone().apply(request))
        .collect()
}

/// The inverse of `apply_all`: feed the response through the observer list,
/// rebuilding the request-side chain for the next entry. The response is not
/// modified, only read.
pub fn observe_all(
    observers: &[Arc<dyn ResponseTransform>],
    response: &Response,
) -> Vec<Arc<dyn RequestTransform>> {
    observers
        .iter()
        .map(|observer| observer.clone().observe(response))
        .collect()
}

/// Compile a transform pattern, surfacing failures as configuration errors.
pub(crate) fn compile(pattern: &str) -> Result<Regex, ReplayError> {
    Regex::new(pattern).map_err(|source| ReplayError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Pull the replacement value out of the first match: capture group 1 when
/// the pattern has capture groups, the whole match otherwise. An empty
/// extraction counts as no match so waiting transforms keep waiting.
pub(crate) fn extract_first(pattern: &Regex, haystack: &str) -> Option<String> {
    let captures = pattern.captures(haystack)?;
    let found = if captures.len() > 1 {
        captures.get(1).map(|group| group.as_str()).unwrap_or("")
    } else {
        captures.get(0).map(|whole| whole.as_str()).unwrap_or("")
    };
    if found.is_empty() {
        None
    } else {
        Some(found.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[test]
    fn test_apply_produces_one_observer_per_transform() {
        let chain: Vec<Arc<dyn RequestTransform>> = vec![
            Arc::new(ConstantTransform::new("a", "b").unwrap()),
            Arc::new(HeaderInjectionTransform::new("X-One", "1")),
            Arc::new(BodyToHeaderTransform::new("t-(\\w+)", "X-Two", "", "").unwrap()),
        ];
        let mut request = testutil::request("GET", "https://example.test/");

        let observers = apply_all(&chain, &mut request);
        assert_eq!(observers.len(), chain.len());

        let next = observe_all(&observers, &Response::default());
        assert_eq!(next.len(), chain.len());
    }

    #[test]
    fn test_passthrough_returns_the_wrapped_transform_verbatim() {
        let transform: Arc<dyn RequestTransform> =
            Arc::new(HeaderInjectionTransform::new("X-A", "1"));
        let observer = Passthrough::wrap(transform.clone());

        let next = observer.observe(&Response::default());
        assert!(Arc::ptr_eq(&transform, &next));
    }

    #[test]
    fn test_extract_first_prefers_capture_group_one() {
        let pattern = compile("token-(\\w+)").unwrap();
        assert_eq!(
            extract_first(&pattern, "x token-abc y").as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn test_extract_first_uses_whole_match_without_groups() {
        let pattern = compile("token-\\w+").unwrap();
        assert_eq!(
            extract_first(&pattern, "x token-abc y").as_deref(),
            Some("token-abc")
        );
    }

    #[test]
    fn test_extract_first_treats_empty_extraction_as_no_match() {
        let pattern = compile("token-(\\w*)").unwrap();
        assert_eq!(extract_first(&pattern, "token- rest"), None);
        assert_eq!(extract_first(&pattern, "nothing here"), None);
    }
}
