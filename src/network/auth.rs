//! Auth-challenge header parsing (spec.md §4.5.6): `WWW-Authenticate`
//! (401) and `Proxy-Authenticate` (407) header values are parsed into
//! `{scheme, realm}` entries carried on `authRequired` and on the
//! enclosing response object, for challenges that arrive outside the
//! `Fetch.authRequired` interception path (CDP already hands that one a
//! parsed `AuthChallenge`).

use crate::bidi::types::BidiAuthChallenge;

/// Parses one `WWW-Authenticate`/`Proxy-Authenticate` header value. A
/// server may offer several challenges separated by commas at the scheme
/// boundary; this keeps it simple and takes the first scheme/realm pair,
/// which is what every browser-facing client actually acts on.
pub fn parse_challenge(header_value: &str) -> Option<BidiAuthChallenge> {
    let mut parts = header_value.trim().splitn(2, char::is_whitespace);
    let scheme = parts.next()?.trim_end_matches(',').to_string();
    if scheme.is_empty() {
        return None;
    }
    let rest = parts.next().unwrap_or("");
    let realm = rest
        .split(',')
        .map(str::trim)
        .find_map(|kv| kv.strip_prefix("realm="))
        .map(|v| v.trim_matches('"').to_string())
        .unwrap_or_default();
    Some(BidiAuthChallenge { scheme, realm })
}

/// Status-code-driven detection of which header carries the challenge.
pub fn challenge_header_for_status(status: i64) -> Option<&'static str> {
    match status {
        401 => Some("WWW-Authenticate"),
        407 => Some("Proxy-Authenticate"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scheme_and_quoted_realm() {
        let challenge = parse_challenge(r#"Basic realm="restricted area""#).unwrap();
        assert_eq!(challenge.scheme, "Basic");
        assert_eq!(challenge.realm, "restricted area");
    }

    #[test]
    fn handles_scheme_with_no_realm() {
        let challenge = parse_challenge("Negotiate").unwrap();
        assert_eq!(challenge.scheme, "Negotiate");
        assert_eq!(challenge.realm, "");
    }
}
