//! Picks the language a response is rendered in, from an explicit
//! choice, the language cookie, or the `Accept-Language` header.
//!
//! ```
//! use trillium_mustache::lang::negotiate;
//! let supported = [String::from("en"), String::from("de")];
//! assert_eq!(negotiate("de-AT, en;q=0.5", &supported).as_deref(), Some("de"));
//! assert_eq!(negotiate("fr", &[]).as_deref(), Some("fr"));
//! ```

use crate::MustacheConfig;
use std::borrow::Cow;
use trillium::{Conn, KnownHeaderName};
use trillium_cookies::cookie::CookieJar;

/// An explicitly chosen language for a response, stored in conn state.
/// See [`MustacheConnExt::with_language`](crate::MustacheConnExt::with_language).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Language(pub Cow<'static, str>);

/**
Determines the language a template is rendered in.

In order of precedence:
1. a language explicitly set on the conn
2. the language cookie, when a cookie jar is present
3. the best supported entry of the `accept-language` header
4. the first supported language

Returns None when none of these apply.
*/
pub fn resolve_language(conn: &Conn, config: &MustacheConfig) -> Option<String> {
    if let Some(Language(language)) = conn.state() {
        return Some(language.to_string());
    }

    let from_cookie = conn
        .state::<CookieJar>()
        .and_then(|jar| jar.get(config.language_cookie()))
        .map(|cookie| cookie.value().trim())
        .filter(|value| !value.is_empty());

    if let Some(language) = from_cookie {
        return Some(language.to_string());
    }

    let from_header = conn
        .request_headers()
        .get_str(KnownHeaderName::AcceptLanguage)
        .and_then(|header| negotiate(header, config.languages()));

    from_header.or_else(|| config.default_language().map(String::from))
}

/// Picks the best entry of an `accept-language` header value. With an
/// empty `supported` list the highest-quality entry wins; otherwise the
/// highest-quality entry matching a supported language (exactly or by
/// primary subtag) wins, and the supported spelling is returned.
pub fn negotiate(header: &str, supported: &[String]) -> Option<String> {
    let mut ranges = parse_accept_language(header);
    ranges.sort_by(|(_, a), (_, b)| b.total_cmp(a));

    ranges
        .into_iter()
        .filter(|(_, quality)| *quality > 0.0)
        .find_map(|(range, _)| {
            if supported.is_empty() {
                return (range != "*").then(|| range.to_string());
            }

            supported
                .iter()
                .find(|language| matches_range(language, range))
                .cloned()
        })
}

fn matches_range(language: &str, range: &str) -> bool {
    let primary = |tag: &str| tag.split(['-', '_']).next().unwrap_or(tag).to_ascii_lowercase();
    range == "*"
        || language.eq_ignore_ascii_case(range)
        || primary(language) == primary(range)
}

fn parse_accept_language(header: &str) -> Vec<(&str, f32)> {
    header
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(';');
            let range = parts.next()?.trim();
            if range.is_empty() {
                return None;
            }

            let quality = parts
                .find_map(|param| param.trim().strip_prefix("q="))
                .and_then(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);

            Some((range, quality))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn languages(languages: &[&str]) -> Vec<String> {
        languages.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn header_parsing() {
        assert_eq!(
            parse_accept_language("de-AT, en;q=0.8, fr;q=0.9,,*;q=0.1"),
            vec![("de-AT", 1.0), ("en", 0.8), ("fr", 0.9), ("*", 0.1)]
        );
    }

    #[test]
    fn negotiation_without_supported_languages() {
        assert_eq!(negotiate("en;q=0.5, de", &[]), Some("de".into()));
        assert_eq!(negotiate("*", &[]), None);
        assert_eq!(negotiate("en;q=0", &[]), None);
        assert_eq!(negotiate("", &[]), None);
    }

    #[test]
    fn negotiation_with_supported_languages() {
        let supported = languages(&["en", "de"]);
        assert_eq!(negotiate("de-AT, en;q=0.5", &supported), Some("de".into()));
        assert_eq!(negotiate("fr, en;q=0.2", &supported), Some("en".into()));
        assert_eq!(negotiate("fr", &supported), None);
        assert_eq!(negotiate("fr, *;q=0.1", &supported), Some("en".into()));
    }

    #[test]
    fn ties_keep_header_order() {
        assert_eq!(negotiate("fr, de", &[]), Some("fr".into()));
        let supported = languages(&["de", "fr"]);
        assert_eq!(negotiate("fr, de", &supported), Some("fr".into()));
    }
}
