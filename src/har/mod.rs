// HAR data model - immutable in-memory representation of one HTTP Archive
//
// This is the HAR 1.2 subset the replay engine consumes: an ordered sequence
// of entries, each carrying the recorded request, the recorded response, and
// the millisecond offset that drives pacing. Headers, query strings, and
// cookies are ordered sequences of single-item pairs, not maps: HAR permits
// duplicate keys (repeated Set-Cookie, repeated query params) and the wire
// order is significant, so the model preserves both.
//
// Parsing tolerates unknown fields; serializing back out preserves every
// field we consume so a parsed archive can round-trip.

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The .har file nests everything under a top-level "log" key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarWrapper {
    pub log: Har,
}

/// One parsed archive: the single `log` value of a .har file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Har {
    /// Internal use only, not part of the HAR file.
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub creator: Creator,
    /// Page groupings. The engine ignores them but round-trips them verbatim.
    #[serde(default)]
    pub pages: Vec<serde_json::Value>,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Creator {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// A single recorded request/response, with the offset that paces it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    #[serde(rename = "startedDateTime", default)]
    pub started_date_time: String,
    /// Milliseconds from the archive's nominal t=0 at which this request was
    /// originally sent. This is the only timing field replay consults.
    #[serde(default)]
    pub time: f64,
    pub request: Request,
    #[serde(default)]
    pub response: Option<Response>,
    #[serde(default = "empty_object")]
    pub cache: serde_json::Value,
    #[serde(default)]
    pub timings: Timings,
    #[serde(
        rename = "serverIPAddress",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub server_ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pageref: Option<String>,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Recorded phase timings. Replay ignores these (pacing uses `Entry::time`)
/// but they round-trip.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timings {
    #[serde(default)]
    pub blocked: f64,
    #[serde(default)]
    pub dns: f64,
    #[serde(default)]
    pub connect: f64,
    #[serde(default)]
    pub send: f64,
    #[serde(default)]
    pub wait: f64,
    #[serde(default)]
    pub receive: f64,
    #[serde(default)]
    pub ssl: f64,
}

/// A single recorded HTTP request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    pub url: String,
    #[serde(rename = "httpVersion", default)]
    pub http_version: String,
    #[serde(default)]
    pub headers: Vec<Pair>,
    #[serde(rename = "queryString", default)]
    pub query_string: Vec<Pair>,
    #[serde(default)]
    pub cookies: Vec<Cookie>,
    #[serde(rename = "headersSize", default = "unknown_size")]
    pub headers_size: i64,
    #[serde(rename = "bodySize", default = "unknown_size")]
    pub body_size: i64,
    #[serde(rename = "postData", default, skip_serializing_if = "Option::is_none")]
    pub post_data: Option<PostData>,
}

fn unknown_size() -> i64 {
    -1
}

/// The content type plus two views of the data submitted with a POST request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostData {
    #[serde(rename = "mimeType", default, skip_serializing_if = "String::is_empty")]
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Pair>,
}

impl Request {
    /// Case-insensitive check for the presence of a header name.
    pub fn has_header(&self, name: &str) -> bool {
        crate::util::any_pair(&self.headers, |key, _| key.eq_ignore_ascii_case(name))
    }
}

/// A single recorded (or live) HTTP response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub status: u16,
    #[serde(rename = "statusText", default)]
    pub status_text: String,
    #[serde(rename = "httpVersion", default)]
    pub http_version: String,
    #[serde(default)]
    pub headers: Vec<Pair>,
    /// Chrome produces HARs with this even though response cookies are
    /// redundant with Set-Cookie headers.
    #[serde(default)]
    pub cookies: Vec<Pair>,
    #[serde(default)]
    pub content: Content,
    /// Decoded body text. Not present in .har files on disk; the executor
    /// fills it in for live responses and fixtures may carry it directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(rename = "redirectURL", default)]
    pub redirect_url: String,
    #[serde(rename = "headersSize", default = "unknown_size")]
    pub headers_size: i64,
    #[serde(rename = "bodySize", default = "unknown_size")]
    pub body_size: i64,
    #[serde(
        rename = "_transferSize",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub transfer_size: Option<i64>,
}

impl Response {
    /// The text transforms scan: the live decoded body if the executor set
    /// one, otherwise the recorded `content.text` (present in fixtures).
    pub fn body_text(&self) -> Option<&str> {
        self.body.as_deref().or(self.content.text.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub size: i64,
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// A single key-value pair, because that's how HAR represents headers and
/// query strings: a list of single-element maps, not one unified map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pair {
    pub name: String,
    pub value: String,
}

impl Pair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A slightly more complex Pair. For transform purposes it is just a
/// name/value pair; the extra attributes round-trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    /// Expiry timestamp; an empty value is represented as JSON null.
    #[serde(default, with = "nullable_string")]
    pub expires: String,
    #[serde(rename = "httpOnly", default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
}

/// A string that is represented as `null` in JSON when empty.
mod nullable_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &str, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_empty() {
            serializer.serialize_none()
        } else {
            serializer.serialize_str(value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
    }
}

impl Har {
    /// Parse a HAR document from its JSON text.
    pub fn from_json(json: &str) -> Result<Har> {
        let wrapper: HarWrapper =
            serde_json::from_str(json).context("Failed to parse HAR document")?;
        Ok(wrapper.log)
    }

    /// Load a .har file from disk. The archive's name is taken from the file
    /// stem for display purposes.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Har> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut har = Self::from_json(&json)?;
        har.name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(har)
    }

    /// Serialize back to a HAR document (with the top-level "log" envelope).
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&HarWrapper { log: self.clone() })
            .context("Failed to serialize HAR document")
    }
}
