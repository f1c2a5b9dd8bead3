//! NocoDB metadata API client: transport, URL handling, and schema
//! normalization.

mod endpoint;
mod env;
mod fetch;
mod transport;
mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use endpoint::{normalize_base_url, rewrite_url_to_target};
pub use env::{ApiVersion, EnvironmentConfig};
pub use fetch::{FetchOptions, ensure_supported, fetch_base_schema, list_bases};
pub use transport::{
    ApiRequest, HeaderValue, Headers, HttpMethod, HttpTransport, REDACTED, Transport,
    auth_headers, is_auth_header, redacted_headers,
};
pub use types::{BaseSchema, BaseSummary, Column, FreeForm, Table};
