//! Offline/demo backend serving a bundled snapshot of example results.
//!
//! Only ever entered when the caller asks for it explicitly; a live
//! request that fails must surface its error, not fall through to this.

use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

use crate::pagination::decode_page_hint;
use crate::query;
use crate::remote::{ApiResponse, Links, SearchParams, SearchResult};

const SAMPLE_DATA: &str = include_str!("../../data/sample_hosts.json");

/// Signature tail for synthesized cursors. Nothing verifies it; it keeps
/// the token in the same `header.payload.signature` shape as live ones.
const MOCK_SIGNATURE: &str = "SampleSignature";

fn dataset() -> &'static ApiResponse {
    static DATA: OnceLock<ApiResponse> = OnceLock::new();
    DATA.get_or_init(|| {
        serde_json::from_str(SAMPLE_DATA).expect("bundled sample dataset is valid")
    })
}

/// Search the bundled dataset. Deterministic: identical (query,
/// per_page, cursor) inputs produce identical results.
pub fn search(params: &SearchParams) -> SearchResult {
    let data = &dataset().result;
    let per_page = params.per_page.max(1) as usize;

    // Cursor-derived page index, zero-based; an unreadable cursor means
    // the first page.
    let page_index = params
        .cursor
        .as_deref()
        .and_then(decode_page_hint)
        .map(|hint| hint.page.saturating_sub(1) as usize)
        .unwrap_or(0);

    let start = (page_index * per_page).min(data.hits.len());
    let end = (start + per_page).min(data.hits.len());
    let hits = data.hits[start..end].to_vec();

    let total = data.total;
    let has_prev = page_index > 0;
    let has_next = (page_index + 1) * per_page < total as usize;

    SearchResult {
        query: query::normalize(&params.query),
        total,
        hits,
        links: Links {
            next: has_next.then(|| encode_mock_cursor(page_index as u32 + 2, false)),
            prev: has_prev.then(|| encode_mock_cursor(page_index as u32, true)),
        },
    }
}

/// Synthesize a cursor targeting a one-based page, in the same shape the
/// live service uses so the page-hint decoder reads it back.
fn encode_mock_cursor(page: u32, reversed: bool) -> String {
    let header = BASE64_STANDARD.encode(r#"{"alg":"EdDSA"}"#);
    let payload = BASE64_STANDARD.encode(format!(r#"{{"page":{page},"reversed":{reversed}}}"#));
    format!("{header}.{payload}.{MOCK_SIGNATURE}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_parses_and_is_consistent() {
        let data = &dataset().result;
        assert_eq!(data.total as usize, data.hits.len());
        assert!(data.hits.len() > 10, "dataset too small to paginate");
    }

    #[test]
    fn first_page_has_next_but_no_prev() {
        let result = search(&SearchParams::default());
        assert_eq!(result.hits.len(), 10);
        assert!(result.links.next_cursor().is_some());
        assert!(result.links.prev_cursor().is_none());
    }

    #[test]
    fn hits_never_exceed_per_page() {
        for per_page in [1, 3, 10, 50] {
            let result = search(&SearchParams {
                per_page,
                ..Default::default()
            });
            assert!(result.hits.len() <= per_page as usize);
        }
    }

    #[test]
    fn cursors_walk_the_whole_dataset() {
        let mut params = SearchParams::default();
        let mut seen = Vec::new();
        loop {
            let result = search(&params);
            seen.extend(result.hits.iter().map(|h| h.ip.clone()));
            match result.links.next_cursor() {
                Some(next) => params.cursor = Some(next.to_string()),
                None => break,
            }
        }
        let expected: Vec<String> = dataset().result.hits.iter().map(|h| h.ip.clone()).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn prev_cursor_from_second_page_targets_first() {
        let first = search(&SearchParams::default());
        let second = search(&SearchParams {
            cursor: first.links.next.clone(),
            ..Default::default()
        });
        assert!(second.links.prev_cursor().is_some());
        let hint = decode_page_hint(second.links.prev_cursor().unwrap()).unwrap();
        assert_eq!(hint.page, 1);
        assert!(hint.reversed);
    }

    #[test]
    fn deterministic_for_identical_inputs() {
        let params = SearchParams {
            query: "services.service_name: HTTP".to_string(),
            per_page: 7,
            cursor: Some(encode_mock_cursor(2, false)),
            ..Default::default()
        };
        let a = serde_json::to_string(&search(&params)).unwrap();
        let b = serde_json::to_string(&search(&params)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn result_query_is_normalized() {
        let result = search(&SearchParams {
            query: "service.service_name: HTTP".to_string(),
            ..Default::default()
        });
        assert_eq!(result.query, "services.service_name: HTTP");
    }

    #[test]
    fn unreadable_cursor_serves_first_page() {
        let garbage = search(&SearchParams {
            cursor: Some("not-a-cursor".to_string()),
            ..Default::default()
        });
        let first = search(&SearchParams::default());
        assert_eq!(garbage, first);
    }

    #[test]
    fn past_the_end_yields_empty_hits() {
        let result = search(&SearchParams {
            cursor: Some(encode_mock_cursor(40, false)),
            ..Default::default()
        });
        assert!(result.hits.is_empty());
        assert!(result.links.next_cursor().is_none());
    }
}
