//! Remote search service surface.
//!
//! This module provides:
//! - the wire data model shared by the live and offline backends
//! - the `SearchError` taxonomy surfaced to the presentation layer
//! - `censys` — the live HTTP client
//! - `sample` — the explicit offline/demo backend

pub mod censys;
pub mod sample;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::DEFAULT_QUERY;

/// Legacy placeholder some callers stored instead of a real cursor.
/// Never forwarded to the service.
pub const CURSOR_PLACEHOLDER: &str = "next";

/// Default and bounds for the page size accepted by the service.
pub const DEFAULT_PER_PAGE: u32 = 10;
pub const MIN_PER_PAGE: u32 = 1;
pub const MAX_PER_PAGE: u32 = 50;

/// API credential pair. The secret is never formatted into logs or
/// user-visible output.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub id: String,
    pub secret: String,
}

impl Credentials {
    pub fn is_configured(&self) -> bool {
        !self.id.trim().is_empty() && !self.secret.trim().is_empty()
    }
}

/// Filter controlling inclusion of non-primary hostnames sharing an IP.
/// `None` in `SearchParams` means "use the remote default" (exclude).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VirtualHosts {
    Exclude,
    Include,
    Only,
}

impl VirtualHosts {
    /// Wire value for the `virtual_hosts` query parameter.
    pub fn as_param(self) -> &'static str {
        match self {
            VirtualHosts::Exclude => "EXCLUDE",
            VirtualHosts::Include => "INCLUDE",
            VirtualHosts::Only => "ONLY",
        }
    }

    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exclude" => Some(VirtualHosts::Exclude),
            "include" => Some(VirtualHosts::Include),
            "only" => Some(VirtualHosts::Only),
            _ => None,
        }
    }
}

/// Everything that varies per search call. Owned by the presentation
/// layer; the backends are stateless and receive this on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub query: String,
    /// Opaque cursor from a previous response, forwarded verbatim.
    pub cursor: Option<String>,
    pub per_page: u32,
    pub virtual_hosts: Option<VirtualHosts>,
    pub sort: Option<String>,
    pub fields: Option<Vec<String>>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            query: DEFAULT_QUERY.to_string(),
            cursor: None,
            per_page: DEFAULT_PER_PAGE,
            virtual_hosts: None,
            sort: None,
            fields: None,
        }
    }
}

/// Pagination links embedded in a response. Cursors are opaque; the
/// client stores, forwards, or clears them, nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Links {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
}

impl Links {
    /// `next` cursor, treating an empty string the same as absent.
    pub fn next_cursor(&self) -> Option<&str> {
        non_empty(self.next.as_deref())
    }

    /// `prev` cursor, treating an empty string the same as absent.
    pub fn prev_cursor(&self) -> Option<&str> {
        non_empty(self.prev.as_deref())
    }
}

fn non_empty(link: Option<&str>) -> Option<&str> {
    link.map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport_protocol: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AutonomousSystem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asn: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bgp_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
}

/// A single indexed host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autonomous_system: Option<AutonomousSystem>,
}

impl Host {
    /// Short "80/HTTP, 22/SSH" style summary for list rendering.
    pub fn service_summary(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        for service in &self.services {
            match &service.service_name {
                Some(name) => parts.push(format!("{}/{}", service.port, name)),
                None => parts.push(service.port.to_string()),
            }
        }
        parts.join(", ")
    }
}

/// The `result` object of a successful response. Invariant:
/// `hits.len() <= per_page` as requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub query: String,
    pub total: u64,
    #[serde(default)]
    pub hits: Vec<Host>,
    #[serde(default)]
    pub links: Links,
}

/// Wire envelope around `SearchResult`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub code: u16,
    pub status: String,
    pub result: SearchResult,
}

/// Error body shape for non-2xx responses. A missing body is valid.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}

/// Everything that can go wrong with a search, classified for the
/// presentation layer. No variant is ever swallowed or silently replaced
/// with sample data.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(
        "API credentials are not configured; set HOSTSCOPE_API_ID and HOSTSCOPE_API_SECRET \
         or fill in the [api] section of the config file"
    )]
    CredentialsMissing,

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("authentication failed; check your API ID and secret")]
    AuthenticationFailed,

    #[error("these credentials do not have permission to run this search")]
    PermissionDenied,

    #[error("rate limit exceeded; try again later")]
    RateLimited,

    #[error("search service returned HTTP {status}: {detail}")]
    Remote { status: u16, detail: String },

    #[error("request could not be completed: {0}")]
    Transport(#[source] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_links_yield_no_cursors() {
        let links = Links {
            next: Some(String::new()),
            prev: Some("  ".to_string()),
        };
        assert_eq!(links.next_cursor(), None);
        assert_eq!(links.prev_cursor(), None);
    }

    #[test]
    fn present_links_pass_through_verbatim() {
        let links = Links {
            next: Some("abc".to_string()),
            prev: None,
        };
        assert_eq!(links.next_cursor(), Some("abc"));
        assert_eq!(links.prev_cursor(), None);
    }

    #[test]
    fn virtual_hosts_round_trip() {
        for (text, expected) in [
            ("exclude", VirtualHosts::Exclude),
            ("INCLUDE", VirtualHosts::Include),
            (" Only ", VirtualHosts::Only),
        ] {
            assert_eq!(VirtualHosts::from_str(text), Some(expected));
        }
        assert_eq!(VirtualHosts::from_str("both"), None);
    }

    #[test]
    fn envelope_deserializes_minimal_response() {
        let body = r#"{
            "code": 200,
            "status": "OK",
            "result": { "query": "services.port: 80", "total": 5000, "hits": [], "links": { "next": "abc" } }
        }"#;
        let envelope: ApiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.result.total, 5000);
        assert_eq!(envelope.result.links.next_cursor(), Some("abc"));
        assert_eq!(envelope.result.links.prev_cursor(), None);
    }

    #[test]
    fn host_service_summary() {
        let host = Host {
            ip: "192.0.2.1".to_string(),
            name: None,
            services: vec![
                Service {
                    port: 80,
                    service_name: Some("HTTP".to_string()),
                    transport_protocol: Some("TCP".to_string()),
                },
                Service {
                    port: 8443,
                    service_name: None,
                    transport_protocol: None,
                },
            ],
            location: None,
            autonomous_system: None,
        };
        assert_eq!(host.service_summary(), "80/HTTP, 8443");
    }
}
