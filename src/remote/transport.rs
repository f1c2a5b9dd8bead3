use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::debug;

use crate::error::{AppError, ErrorKind, RemoteApiError};
use crate::remote::EnvironmentConfig;

/// Placeholder written wherever a credential would otherwise appear.
pub const REDACTED: &str = "***";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// A request header value.
///
/// `Live` only exists in memory: serializing it always yields [`REDACTED`],
/// so a plan written to disk can never carry a usable token.
#[derive(Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Redacted,
    Plain(String),
    Live(String),
}

impl HeaderValue {
    fn wire_value(&self) -> Option<&str> {
        match self {
            HeaderValue::Redacted => None,
            HeaderValue::Plain(value) | HeaderValue::Live(value) => Some(value),
        }
    }
}

impl fmt::Debug for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Redacted => f.write_str("Redacted"),
            HeaderValue::Plain(value) => f.debug_tuple("Plain").field(value).finish(),
            HeaderValue::Live(_) => f.write_str("Live(***)"),
        }
    }
}

impl Serialize for HeaderValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            HeaderValue::Plain(value) => serializer.serialize_str(value),
            HeaderValue::Redacted | HeaderValue::Live(_) => serializer.serialize_str(REDACTED),
        }
    }
}

impl<'de> Deserialize<'de> for HeaderValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        if value == REDACTED {
            Ok(HeaderValue::Redacted)
        } else {
            Ok(HeaderValue::Plain(value))
        }
    }
}

pub type Headers = BTreeMap<String, HeaderValue>;

const AUTH_HEADER_NAMES: [&str; 3] = ["xc-auth", "xc-token", "authorization"];

/// Whether `name` carries a credential, in any casing.
pub fn is_auth_header(name: &str) -> bool {
    AUTH_HEADER_NAMES
        .iter()
        .any(|auth| auth.eq_ignore_ascii_case(name))
}

/// Auth headers are written as [`REDACTED`] whatever value they hold.
fn serialize_headers<S: Serializer>(headers: &Headers, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_map(headers.iter().map(|(name, value)| {
        static REDACTED_VALUE: HeaderValue = HeaderValue::Redacted;
        let value = if is_auth_header(name) {
            &REDACTED_VALUE
        } else {
            value
        };
        (name, value)
    }))
}

/// Auth headers read from a plan never keep their value.
fn deserialize_headers<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Headers, D::Error> {
    let raw = Headers::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(name, value)| {
            if is_auth_header(&name) {
                (name, HeaderValue::Redacted)
            } else {
                (name, value)
            }
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub url: String,
    #[serde(
        default,
        serialize_with = "serialize_headers",
        deserialize_with = "deserialize_headers"
    )]
    pub headers: Headers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>, headers: Headers) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers,
            body: None,
        }
    }
}

/// Sends metadata API requests and decodes JSON responses.
///
/// Implementations must turn non-success statuses into [`RemoteApiError`].
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn send(&self, request: &ApiRequest) -> Result<Value>;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout_ms: u64) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(format!("ncsync/{}", env!("CARGO_PKG_VERSION")));
        if timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }
        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<Value> {
        debug!("{} {}", request.method.as_str(), request.url);

        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, &request.url)
            .header("content-type", "application/json");
        for (name, value) in &request.headers {
            if let Some(value) = value.wire_value() {
                builder = builder.header(name.as_str(), value);
            }
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|err| {
            AppError::new(
                ErrorKind::Connection,
                format!("Request to {} failed: {}", request.url, err),
            )
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteApiError {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                body: response.text().await.unwrap_or_default(),
            }
            .into());
        }

        let body = response.text().await.map_err(|err| {
            AppError::new(
                ErrorKind::Connection,
                format!("Failed to read response from {}: {}", request.url, err),
            )
        })?;

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .with_context(|| format!("Invalid JSON in response from {}", request.url))
    }
}

/// Live auth headers for an environment. Both header spellings are sent since
/// deployments differ in which one they honour.
pub fn auth_headers(env: &EnvironmentConfig) -> Headers {
    let token = env.api_token.trim().to_string();
    let mut headers = Headers::new();
    headers.insert("xc-auth".to_string(), HeaderValue::Live(token.clone()));
    headers.insert("xc-token".to_string(), HeaderValue::Live(token.clone()));
    if bearer_re().is_match(&token) {
        headers.insert("authorization".to_string(), HeaderValue::Live(token));
    }
    headers
}

/// Headers written into an exported plan step.
pub fn redacted_headers(env: &EnvironmentConfig) -> Headers {
    let mut headers = Headers::new();
    headers.insert(
        env.api_version.auth_header_name().to_string(),
        HeaderValue::Redacted,
    );
    headers
}

fn bearer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^bearer\s+").expect("valid regex"))
}
