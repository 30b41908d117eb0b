//! Cursor-based pagination state tracking.
//!
//! The remote service hands out opaque cursor tokens in `links.next` /
//! `links.prev`; this module tracks where the user is without ever
//! constructing or mutating a cursor. Only directional intent and a local
//! page counter are kept, because the server does not guarantee stable
//! page numbering.

use base64::engine::general_purpose::{STANDARD as BASE64_STANDARD, URL_SAFE_NO_PAD as BASE64_URL_SAFE};
use base64::Engine;
use serde::Deserialize;

/// Directional intent of the last page move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Initial,
    Forward,
    Backward,
}

/// Where the user currently is in a result set.
///
/// `page_index` is a local, zero-based display counter; it is never sent
/// on the wire. The stored cursor is forwarded verbatim on the next fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NavigationState {
    pub direction: Direction,
    pub page_index: u32,
    pub cursor: Option<String>,
}

/// Page hint recovered from a cursor payload. Pages are one-based, the
/// numbering the service itself uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHint {
    pub page: u32,
    pub reversed: bool,
}

#[derive(Deserialize)]
struct CursorPayload {
    page: Option<u32>,
    #[serde(default)]
    reversed: bool,
}

/// Best-effort decode of a cursor's page hint.
///
/// Cursors are JWT-shaped (`header.payload.signature`) with a base64 JSON
/// payload, but the format is owned by the server and may change; any
/// failure here means "no hint available", never an error.
pub fn decode_page_hint(cursor: &str) -> Option<PageHint> {
    let mut parts = cursor.split('.');
    let _header = parts.next()?;
    let payload = parts.next()?;
    let bytes = BASE64_STANDARD
        .decode(payload)
        .or_else(|_| BASE64_URL_SAFE.decode(payload))
        .ok()?;
    let parsed: CursorPayload = serde_json::from_slice(&bytes).ok()?;
    parsed.page.map(|page| PageHint {
        page,
        reversed: parsed.reversed,
    })
}

fn non_empty(link: Option<&str>) -> Option<&str> {
    link.map(str::trim).filter(|s| !s.is_empty())
}

impl NavigationState {
    /// Collapse to the first page: new search submitted, or the user
    /// explicitly returned to page one.
    pub fn reset(&mut self) {
        *self = NavigationState::default();
    }

    /// Move forward using the last result's `next` link.
    ///
    /// Returns false (and changes nothing) when the link is absent or
    /// empty; running out of next links is a terminal condition for
    /// forward movement, not an error. The page counter comes from the
    /// cursor's page hint when one decodes, otherwise it is incremented
    /// by one.
    pub fn advance(&mut self, next_link: Option<&str>) -> bool {
        let Some(cursor) = non_empty(next_link) else {
            return false;
        };
        self.page_index = match decode_page_hint(cursor) {
            Some(hint) if hint.page >= 1 => hint.page - 1,
            _ => self.page_index + 1,
        };
        self.direction = Direction::Forward;
        self.cursor = Some(cursor.to_string());
        true
    }

    /// Move backward using the last result's `prev` link.
    ///
    /// A missing link means we are already on the first page, and a link
    /// whose decoded target is the first page is the first page; both
    /// collapse to `Initial` with the cursor cleared, identical to a new
    /// search. Returns true whenever a refetch is warranted, which is
    /// every time.
    pub fn retreat(&mut self, prev_link: Option<&str>) -> bool {
        let Some(cursor) = non_empty(prev_link) else {
            self.reset();
            return true;
        };
        let target = match decode_page_hint(cursor) {
            Some(hint) => hint.page.saturating_sub(1),
            None => self.page_index.saturating_sub(1),
        };
        if target == 0 {
            self.reset();
        } else {
            self.direction = Direction::Backward;
            self.page_index = target;
            self.cursor = Some(cursor.to_string());
        }
        true
    }

    /// Cursor to forward on the next request, if any.
    pub fn cursor_param(&self) -> Option<&str> {
        non_empty(self.cursor.as_deref())
    }

    /// One-based page number for display.
    pub fn page_number(&self) -> u32 {
        self.page_index + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_cursor(page: u32, reversed: bool) -> String {
        let header = BASE64_STANDARD.encode(r#"{"alg":"EdDSA"}"#);
        let payload =
            BASE64_STANDARD.encode(format!(r#"{{"page":{page},"reversed":{reversed}}}"#));
        format!("{header}.{payload}.sig")
    }

    #[test]
    fn starts_initial() {
        let nav = NavigationState::default();
        assert_eq!(nav.direction, Direction::Initial);
        assert_eq!(nav.page_index, 0);
        assert!(nav.cursor_param().is_none());
    }

    #[test]
    fn advance_with_opaque_token_increments() {
        let mut nav = NavigationState::default();
        assert!(nav.advance(Some("T1")));
        assert_eq!(nav.direction, Direction::Forward);
        assert_eq!(nav.page_index, 1);
        assert_eq!(nav.cursor_param(), Some("T1"));
    }

    #[test]
    fn advance_without_link_is_a_noop() {
        let mut nav = NavigationState::default();
        nav.advance(Some("T1"));
        let before = nav.clone();
        assert!(!nav.advance(None));
        assert!(!nav.advance(Some("")));
        assert!(!nav.advance(Some("  ")));
        assert_eq!(nav, before);
    }

    #[test]
    fn advance_prefers_decoded_page_hint() {
        let mut nav = NavigationState::default();
        assert!(nav.advance(Some(&mock_cursor(4, false))));
        assert_eq!(nav.page_index, 3);
        assert_eq!(nav.direction, Direction::Forward);
    }

    #[test]
    fn retreat_to_first_page_collapses_to_initial() {
        let mut nav = NavigationState::default();
        nav.advance(Some("T1"));
        assert!(nav.retreat(Some(&mock_cursor(1, true))));
        assert_eq!(nav, NavigationState::default());
    }

    #[test]
    fn retreat_without_link_collapses_to_initial() {
        let mut nav = NavigationState::default();
        nav.advance(Some("T1"));
        nav.advance(Some("T2"));
        assert!(nav.retreat(None));
        assert_eq!(nav, NavigationState::default());
    }

    #[test]
    fn retreat_to_middle_page_goes_backward() {
        let mut nav = NavigationState::default();
        nav.advance(Some(&mock_cursor(3, false)));
        assert!(nav.retreat(Some(&mock_cursor(2, true))));
        assert_eq!(nav.direction, Direction::Backward);
        assert_eq!(nav.page_index, 1);
        assert!(nav.cursor_param().is_some());
    }

    #[test]
    fn retreat_with_undecodable_cursor_decrements() {
        let mut nav = NavigationState::default();
        nav.advance(Some(&mock_cursor(3, false)));
        assert!(nav.retreat(Some("opaque-prev-token")));
        assert_eq!(nav.direction, Direction::Backward);
        assert_eq!(nav.page_index, 1);
        assert_eq!(nav.cursor_param(), Some("opaque-prev-token"));
    }

    #[test]
    fn retreat_never_goes_below_zero() {
        let mut nav = NavigationState::default();
        nav.advance(Some("T1"));
        // Decodes to nothing; decrement lands on the first page.
        assert!(nav.retreat(Some("opaque")));
        assert_eq!(nav, NavigationState::default());
        assert!(nav.retreat(Some("opaque")));
        assert_eq!(nav.page_index, 0);
    }

    #[test]
    fn decode_handles_garbage_gracefully() {
        assert_eq!(decode_page_hint(""), None);
        assert_eq!(decode_page_hint("T1"), None);
        assert_eq!(decode_page_hint("a.b.c"), None);
        assert_eq!(decode_page_hint("a.!!!not-base64!!!.c"), None);
        let not_json = format!("h.{}.s", BASE64_STANDARD.encode("not json"));
        assert_eq!(decode_page_hint(&not_json), None);
        let no_page = format!("h.{}.s", BASE64_STANDARD.encode(r#"{"reversed":true}"#));
        assert_eq!(decode_page_hint(&no_page), None);
    }

    #[test]
    fn decode_reads_url_safe_payloads() {
        let payload = BASE64_URL_SAFE.encode(r#"{"page":7,"reversed":false}"#);
        let cursor = format!("h.{payload}.s");
        assert_eq!(
            decode_page_hint(&cursor),
            Some(PageHint {
                page: 7,
                reversed: false
            })
        );
    }
}
