//! URL pattern matching (spec.md §9): a subset of the W3C URL Pattern
//! draft sufficient for network intercepts — either explicit fields
//! (protocol/hostname/port/pathname/search) or a raw glob-ish string using
//! `*` as a wildcard, per CDP's own `Fetch.RequestPattern.urlPattern`
//! shape. This is deliberately not a general URLPattern implementation:
//! the spec only requires matching and round-tripping through `serialize`.

use crate::error::BidiError;

/// A parsed URL pattern, either structured or raw. Construction rejects
/// the inputs spec.md §9 calls out: forbidden unescaped characters, empty
/// protocol/hostname/port, a `file` protocol with a non-empty host, and a
/// hostname containing `:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlPattern {
    Pattern {
        protocol: Option<String>,
        hostname: Option<String>,
        port: Option<String>,
        pathname: String,
        search: String,
    },
    Raw(String),
}

const FORBIDDEN_UNESCAPED: &[char] = &['(', ')', '*', '{', '}'];

fn validate_unescaped(component: &str) -> Result<(), BidiError> {
    let mut chars = component.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            chars.next();
            continue;
        }
        if FORBIDDEN_UNESCAPED.contains(&c) {
            return Err(BidiError::invalid_argument(format!(
                "unescaped '{c}' is not allowed in a URL pattern component"
            )));
        }
    }
    Ok(())
}

impl UrlPattern {
    pub fn raw(pattern: impl Into<String>) -> Result<Self, BidiError> {
        let pattern = pattern.into();
        validate_unescaped(&pattern)?;
        Ok(UrlPattern::Raw(pattern))
    }

    /// Builds a structured pattern, applying the defaulting/validation
    /// rules spec.md §9 lists explicitly.
    pub fn structured(
        protocol: Option<String>,
        hostname: Option<String>,
        port: Option<String>,
        pathname: Option<String>,
        search: Option<String>,
    ) -> Result<Self, BidiError> {
        if let Some(p) = &protocol {
            if p.is_empty() {
                return Err(BidiError::invalid_argument("protocol must not be empty"));
            }
            validate_unescaped(p)?;
        }
        if let Some(h) = &hostname {
            if h.is_empty() {
                return Err(BidiError::invalid_argument("hostname must not be empty"));
            }
            if h.contains(':') {
                return Err(BidiError::invalid_argument(
                    "hostname must not contain ':'",
                ));
            }
            validate_unescaped(h)?;
        }
        if let Some(p) = &port {
            if p.is_empty() {
                return Err(BidiError::invalid_argument("port must not be empty"));
            }
        }
        if protocol.as_deref() == Some("file") {
            if let Some(h) = &hostname {
                if !h.is_empty() {
                    return Err(BidiError::invalid_argument(
                        "file protocol must not carry a hostname",
                    ));
                }
            }
        }

        let pathname = pathname.unwrap_or_else(|| "/".to_string());
        validate_unescaped(&pathname)?;

        let search = match search {
            Some(s) if s.starts_with('?') => s,
            Some(s) => format!("?{s}"),
            None => String::new(),
        };
        if !search.is_empty() {
            validate_unescaped(&search[1..])?;
        }

        Ok(UrlPattern::Pattern {
            protocol,
            hostname,
            port,
            pathname,
            search,
        })
    }

    /// Re-serializes a pattern to the same shape it was parsed from, so
    /// `parse(serialize(p)) == p` (spec.md §8).
    pub fn serialize(&self) -> String {
        match self {
            UrlPattern::Raw(s) => s.clone(),
            UrlPattern::Pattern {
                protocol,
                hostname,
                port,
                pathname,
                search,
            } => {
                let mut out = String::new();
                if let Some(p) = protocol {
                    out.push_str(p);
                    out.push_str("://");
                }
                if let Some(h) = hostname {
                    out.push_str(h);
                }
                if let Some(p) = port {
                    out.push(':');
                    out.push_str(p);
                }
                out.push_str(pathname);
                out.push_str(search);
                out
            }
        }
    }

    /// Glob-style match: `*` in the pattern matches any run of characters.
    /// Structured patterns are matched component-wise against a parsed
    /// `url::Url`; a component left unset matches anything.
    pub fn matches(&self, url: &str) -> bool {
        match self {
            UrlPattern::Raw(pattern) => glob_match(pattern, url),
            UrlPattern::Pattern {
                protocol,
                hostname,
                port,
                pathname,
                search,
            } => {
                let Ok(parsed) = url::Url::parse(url) else {
                    return false;
                };
                if let Some(p) = protocol {
                    if parsed.scheme() != p {
                        return false;
                    }
                }
                if let Some(h) = hostname {
                    if parsed.host_str() != Some(h.as_str()) {
                        return false;
                    }
                }
                if let Some(p) = port {
                    let port_matches = parsed
                        .port()
                        .map(|pp| pp.to_string() == *p)
                        .unwrap_or(false);
                    if !port_matches {
                        return false;
                    }
                }
                if !glob_match(pathname, parsed.path()) {
                    return false;
                }
                if !search.is_empty() {
                    let actual = if parsed.query().is_some() {
                        format!("?{}", parsed.query().unwrap())
                    } else {
                        String::new()
                    };
                    if !glob_match(search, &actual) {
                        return false;
                    }
                }
                true
            }
        }
    }
}

fn glob_match(pattern: &str, text: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    let mut parts = pattern.split('*');
    let Some(first) = parts.next() else {
        return pattern.is_empty() == text.is_empty();
    };
    if !text.starts_with(first) {
        return false;
    }
    let mut rest = &text[first.len()..];
    let mut pieces: Vec<&str> = parts.collect();
    let last = if pattern.ends_with('*') {
        None
    } else {
        pieces.pop()
    };
    for piece in pieces {
        if piece.is_empty() {
            continue;
        }
        if let Some(idx) = rest.find(piece) {
            rest = &rest[idx + piece.len()..];
        } else {
            return false;
        }
    }
    match last {
        Some(suffix) => rest.ends_with(suffix),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_wildcard_matches_prefix() {
        let pattern = UrlPattern::raw("https://example.test/*").unwrap();
        assert!(pattern.matches("https://example.test/foo/bar"));
        assert!(!pattern.matches("https://other.test/foo"));
    }

    #[test]
    fn structured_defaults_pathname_and_search() {
        let pattern = UrlPattern::structured(
            Some("https".into()),
            Some("example.test".into()),
            None,
            None,
            None,
        )
        .unwrap();
        assert!(pattern.matches("https://example.test/"));
    }

    #[test]
    fn rejects_forbidden_characters() {
        assert!(UrlPattern::raw("https://example.test/(a)").is_err());
        assert!(UrlPattern::raw("https://example.test/\\(a\\)").is_ok());
    }

    #[test]
    fn rejects_colon_in_hostname() {
        assert!(UrlPattern::structured(None, Some("a:b".into()), None, None, None).is_err());
    }

    #[test]
    fn round_trips_through_serialize() {
        let pattern = UrlPattern::raw("https://example.test/*").unwrap();
        let reparsed = UrlPattern::raw(pattern.serialize()).unwrap();
        assert_eq!(pattern, reparsed);
    }
}
