//! Live search client for the hosts index.
//!
//! One authenticated HTTPS request per call; errors are classified into
//! `SearchError` and surfaced, never papered over with sample data.

use reqwest::blocking::Client;
use reqwest::StatusCode;

use crate::query;
use crate::remote::{
    ApiResponse, Credentials, ErrorBody, SearchError, SearchParams, SearchResult,
    CURSOR_PLACEHOLDER,
};

const SEARCH_PATH: &str = "/api/v2/hosts/search";
const USER_AGENT: &str = concat!("hostscope/", env!("CARGO_PKG_VERSION"));

/// Stateless client for the live search endpoint.
#[derive(Debug, Clone)]
pub struct CensysClient {
    http: Client,
    base_url: String,
    credentials: Option<Credentials>,
}

impl CensysClient {
    /// Build a client against `base_url` (scheme and host, no path).
    /// Missing credentials are accepted here; they are reported as
    /// `CredentialsMissing` on the first search attempt instead.
    pub fn new(base_url: &str, credentials: Option<Credentials>) -> Result<Self, SearchError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(SearchError::Transport)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Whether a search can be attempted at all.
    pub fn has_credentials(&self) -> bool {
        self.credentials
            .as_ref()
            .map(Credentials::is_configured)
            .unwrap_or(false)
    }

    /// Run one search. Exactly one outbound request, and none at all when
    /// credentials are missing.
    pub fn search(&self, params: &SearchParams) -> Result<SearchResult, SearchError> {
        let credentials = self
            .credentials
            .as_ref()
            .filter(|c| c.is_configured())
            .ok_or(SearchError::CredentialsMissing)?;

        let pairs = build_query_params(params);
        let url = format!("{}{}", self.base_url, SEARCH_PATH);

        let response = self
            .http
            .get(&url)
            .basic_auth(&credentials.id, Some(&credentials.secret))
            .query(&pairs)
            .send()
            .map_err(SearchError::Transport)?;

        let status = response.status();
        if status.is_success() {
            let envelope: ApiResponse = response.json().map_err(|e| SearchError::Remote {
                status: status.as_u16(),
                detail: format!("unexpected response body: {e}"),
            })?;
            Ok(envelope.result)
        } else {
            let body = response.text().unwrap_or_default();
            Err(classify_status(status, &body))
        }
    }
}

/// Build the outbound query pairs. The query is normalized here, so it
/// never leaves the client in raw form; optional parameters are omitted
/// entirely when unset (an empty string is not "unset" to the service).
fn build_query_params(params: &SearchParams) -> Vec<(&'static str, String)> {
    let mut pairs = vec![
        ("q", query::normalize(&params.query)),
        ("per_page", params.per_page.to_string()),
    ];

    if let Some(cursor) = params.cursor.as_deref() {
        if !cursor.is_empty() && cursor != CURSOR_PLACEHOLDER {
            pairs.push(("cursor", cursor.to_string()));
        }
    }
    if let Some(virtual_hosts) = params.virtual_hosts {
        pairs.push(("virtual_hosts", virtual_hosts.as_param().to_string()));
    }
    if let Some(sort) = params.sort.as_deref() {
        if !sort.is_empty() {
            pairs.push(("sort", sort.to_string()));
        }
    }
    if let Some(fields) = params.fields.as_deref() {
        if !fields.is_empty() {
            pairs.push(("fields", fields.join(",")));
        }
    }

    pairs
}

/// Map a non-success status to the matching error kind, carrying the
/// server's `{ "error": ... }` detail when one is present.
fn classify_status(status: StatusCode, body: &str) -> SearchError {
    let detail = error_detail(body);
    match status.as_u16() {
        422 => SearchError::InvalidQuery(
            detail.unwrap_or_else(|| "check your search query syntax".to_string()),
        ),
        401 => SearchError::AuthenticationFailed,
        403 => SearchError::PermissionDenied,
        429 => SearchError::RateLimited,
        code => SearchError::Remote {
            status: code,
            detail: detail.unwrap_or_else(|| "no error detail provided".to_string()),
        },
    }
}

fn error_detail(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| b.error)
        .filter(|e| !e.trim().is_empty())
}
