// ConstantTransform - search-and-replace over the outgoing request
//
// Useful for swapping a recorded constant for a live one across the whole
// session: every UNIXTIME placeholder for the current epoch, a recorded
// account id for the staging account's, a recorded GUID for a fresh one.

use super::{compile, Passthrough, RequestTransform, ResponseTransform};
use crate::error::ReplayError;
use crate::har::Request;
use regex::Regex;
use std::sync::Arc;

/// Replaces every match of `search` throughout a request: in the URL, in
/// header names and values, in cookie names and values, and in query-string
/// names and values, in that order. Pure request-side; it never replaces
/// itself.
#[derive(Debug)]
pub struct ConstantTransform {
    search: Regex,
    replace: String,
}

impl ConstantTransform {
    /// The pattern is compiled here, once; a bad pattern is a configuration
    /// error, not a replay-time failure.
    pub fn new(search: &str, replace: impl Into<String>) -> Result<Self, ReplayError> {
        Ok(Self {
            search: compile(search)?,
            replace: replace.into(),
        })
    }

    fn substitute(&self, content: &mut String) {
        if self.search.is_match(content) {
            *content = self
                .search
                .replace_all(content, self.replace.as_str())
                .into_owned();
        }
    }
}

impl RequestTransform for ConstantTransform {
    fn apply(self: Arc<Self>, request: &mut Request) -> Arc<dyn ResponseTransform> {
        self.substitute(&mut request.url);
        for pair in &mut request.headers {
            self.substitute(&mut pair.name);
            self.substitute(&mut pair.value);
        }
        for cookie in &mut request.cookies {
            self.substitute(&mut cookie.name);
            self.substitute(&mut cookie.value);
        }
        for pair in &mut request.query_string {
            self.substitute(&mut pair.name);
            self.substitute(&mut pair.value);
        }

        // Nothing to learn from the response; reuse this same transform on
        // the next request.
        Passthrough::wrap(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::har::{Cookie, Pair, Response};
    use crate::testutil;

    fn transform(search: &str, replace: &str) -> Arc<dyn RequestTransform> {
        Arc::new(ConstantTransform::new(search, replace).unwrap())
    }

    #[test]
    fn test_replaces_in_url() {
        let constant = transform("JackDanger", "HowzitGoing");
        let mut request = testutil::request("GET", "https://github.com/JackDanger");

        constant.clone().apply(&mut request);
        assert_eq!(request.url, "https://github.com/HowzitGoing");
    }

    #[test]
    fn test_observer_yields_the_same_transform_instance() {
        let constant = transform("JackDanger", "HowzitGoing");
        let mut request = testutil::request("GET", "https://github.com/JackDanger");

        let observer = constant.clone().apply(&mut request);
        let next = observer.observe(&Response::default());
        assert!(Arc::ptr_eq(&constant, &next));
    }

    #[test]
    fn test_replaces_in_header_cookie_and_query_names_and_values() {
        let constant = transform("SECRET", "visible");
        let mut request = testutil::request("GET", "https://example.test/");
        request.headers.push(Pair::new("X-SECRET", "the SECRET"));
        request.cookies.push(Cookie {
            name: "SECRET-jar".to_string(),
            value: "SECRET".to_string(),
            expires: String::new(),
            http_only: false,
            secure: false,
        });
        request.query_string.push(Pair::new("q", "SECRET"));

        constant.apply(&mut request);

        assert_eq!(request.headers.last().unwrap().name, "X-visible");
        assert_eq!(request.headers.last().unwrap().value, "the visible");
        assert_eq!(request.cookies[0].name, "visible-jar");
        assert_eq!(request.cookies[0].value, "visible");
        assert_eq!(request.query_string[0].value, "visible");
    }

    #[test]
    fn test_search_is_a_regex_with_capture_expansion() {
        let constant = transform(r"user-(\d+)", "account-$1");
        let mut request = testutil::request("GET", "https://example.test/user-42/repos");

        constant.apply(&mut request);
        assert_eq!(request.url, "https://example.test/account-42/repos");
    }

    #[test]
    fn test_bad_pattern_is_a_config_error() {
        let err = ConstantTransform::new("(unclosed", "x").unwrap_err();
        assert!(matches!(err, ReplayError::Pattern { .. }));
    }
}
