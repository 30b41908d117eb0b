use std::sync::OnceLock;

use regex::Regex;

/// Query loaded at startup before the user has typed anything.
pub const DEFAULT_QUERY: &str = "services.service_name: HTTP";

/// Example queries surfaced in the help modal, as (label, query) pairs.
pub const EXAMPLE_QUERIES: &[(&str, &str)] = &[
    ("HTTP servers", "services.service_name: HTTP"),
    ("DNS servers", "services.service_name: DNS"),
    ("SSH servers", "services.service_name: SSH"),
    ("US IP addresses", "location.country: \"United States\""),
    ("Nginx servers", "services.software.product: NGINX"),
];

/// Matches the singular `service.` field prefix at a word boundary,
/// capturing the dotted path after it. The remote schema only knows the
/// plural form.
fn singular_service_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bservice\.([A-Za-z_.]+)").expect("static regex"))
}

/// Matches `location.country:` followed by an unquoted value with internal
/// whitespace running to the end of the query. A leading quote or a
/// single-word value does not match, so quoting is applied at most once.
fn unquoted_country_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"location\.country:\s*(?P<value>[^"\s][^:"]*\s+[^:"]*?)\s*$"#)
            .expect("static regex")
    })
}

/// Repair the most common query-syntax mistakes before submission.
///
/// Pure and idempotent. Applies, in order: whitespace trim, the
/// `service.` -> `services.` field rename, and double-quoting of
/// multi-word `location.country:` values. Anything else is left for the
/// remote service to accept or reject.
pub fn normalize(query: &str) -> String {
    let trimmed = query.trim();
    let renamed = singular_service_re().replace_all(trimmed, "services.$1");
    unquoted_country_re()
        .replace(&renamed, "location.country: \"$value\"")
        .into_owned()
}
