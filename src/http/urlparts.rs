//! Component-wise URLs.
//!
//! `url::Url` always carries a scheme, but a `Location` header may be
//! relative or scheme-relative. [`UrlParts`] keeps every component optional
//! so a redirect target can be completed from the previous URL piece by piece.

use crate::base::neterror::NetError;
use std::fmt;
use url::Url;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlParts {
    pub scheme: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: String,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

/// Well-known port for a scheme.
pub fn default_port(scheme: &str) -> Option<u16> {
    match scheme.to_ascii_lowercase().as_str() {
        "http" | "ws" => Some(80),
        "https" | "wss" => Some(443),
        "ftp" => Some(21),
        _ => None,
    }
}

impl UrlParts {
    /// Split `input` into components without validating or normalising them.
    pub fn parse(input: &str) -> Result<Self, NetError> {
        let mut parts = UrlParts::default();
        let mut rest = input.trim();

        if let Some((before, fragment)) = rest.split_once('#') {
            parts.fragment = Some(fragment.to_string());
            rest = before;
        }
        if let Some((before, query)) = rest.split_once('?') {
            parts.query = Some(query.to_string());
            rest = before;
        }

        if let Some(idx) = rest.find("://") {
            let scheme = &rest[..idx];
            if is_scheme(scheme) {
                parts.scheme = Some(scheme.to_ascii_lowercase());
                rest = &rest[idx + 1..];
            }
        }

        if let Some(after) = rest.strip_prefix("//") {
            let end = after.find('/').unwrap_or(after.len());
            parts.set_authority(&after[..end])?;
            rest = &after[end..];
        }

        parts.path = rest.to_string();
        Ok(parts)
    }

    fn set_authority(&mut self, authority: &str) -> Result<(), NetError> {
        let host_port = match authority.rsplit_once('@') {
            Some((userinfo, host_port)) => {
                match userinfo.split_once(':') {
                    Some((user, password)) => {
                        self.user = Some(user.to_string());
                        self.password = Some(password.to_string());
                    }
                    None => self.user = Some(userinfo.to_string()),
                }
                host_port
            }
            None => authority,
        };

        let (host, port) = if let Some(bracketed) = host_port.strip_prefix('[') {
            // IPv6 literal
            let (addr, tail) = bracketed
                .split_once(']')
                .ok_or_else(|| NetError::InvalidUrl(format!("Malformed host in {}", authority)))?;
            (format!("[{}]", addr), tail.strip_prefix(':'))
        } else {
            match host_port.rsplit_once(':') {
                Some((host, port)) => (host.to_string(), Some(port)),
                None => (host_port.to_string(), None),
            }
        };

        if !host.is_empty() {
            self.host = Some(host.to_ascii_lowercase());
        }
        if let Some(port) = port.filter(|p| !p.is_empty()) {
            self.port = Some(
                port.parse()
                    .map_err(|_| NetError::InvalidUrl(format!("Invalid port in {}", authority)))?,
            );
        }
        Ok(())
    }

    /// Explicit port, or the scheme's well-known one.
    pub fn effective_port(&self) -> Option<u16> {
        self.port
            .or_else(|| self.scheme.as_deref().and_then(default_port))
    }

    /// `host[:port]`, omitting the scheme's default port.
    pub fn authority(&self) -> String {
        let mut out = self.host.clone().unwrap_or_default();
        if let Some(port) = self.port {
            if Some(port) != self.scheme.as_deref().and_then(default_port) {
                out.push_str(&format!(":{}", port));
            }
        }
        out
    }

    /// Convert to an absolute `url::Url`.
    pub fn to_url(&self) -> Result<Url, NetError> {
        Url::parse(&self.to_string()).map_err(|e| NetError::InvalidUrl(format!("{}: {}", self, e)))
    }
}

impl From<&Url> for UrlParts {
    fn from(url: &Url) -> Self {
        UrlParts {
            scheme: Some(url.scheme().to_string()),
            user: Some(url.username().to_string()).filter(|u| !u.is_empty()),
            password: url.password().map(str::to_string),
            host: url.host_str().map(str::to_string),
            port: url.port_or_known_default(),
            path: url.path().to_string(),
            query: url.query().map(str::to_string),
            fragment: url.fragment().map(str::to_string),
        }
    }
}

impl fmt::Display for UrlParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{}:", scheme)?;
        }
        if self.host.is_some() {
            f.write_str("//")?;
            if let Some(user) = &self.user {
                f.write_str(user)?;
                if let Some(password) = &self.password {
                    write!(f, ":{}", password)?;
                }
                f.write_str("@")?;
            }
            f.write_str(&self.authority())?;
        }
        f.write_str(&self.path)?;
        if let Some(query) = &self.query {
            write!(f, "?{}", query)?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{}", fragment)?;
        }
        Ok(())
    }
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_absolute() {
        let parts = UrlParts::parse("https://user:pw@Example.com:8443/a/b?x=1#top").unwrap();
        assert_eq!(parts.scheme.as_deref(), Some("https"));
        assert_eq!(parts.user.as_deref(), Some("user"));
        assert_eq!(parts.password.as_deref(), Some("pw"));
        assert_eq!(parts.host.as_deref(), Some("example.com"));
        assert_eq!(parts.port, Some(8443));
        assert_eq!(parts.path, "/a/b");
        assert_eq!(parts.query.as_deref(), Some("x=1"));
        assert_eq!(parts.fragment.as_deref(), Some("top"));
    }

    #[test]
    fn test_parse_relative_forms() {
        let rel = UrlParts::parse("z?q=1").unwrap();
        assert_eq!(rel.scheme, None);
        assert_eq!(rel.host, None);
        assert_eq!(rel.path, "z");

        let scheme_rel = UrlParts::parse("//cdn.example.com/img.png").unwrap();
        assert_eq!(scheme_rel.scheme, None);
        assert_eq!(scheme_rel.host.as_deref(), Some("cdn.example.com"));
        assert_eq!(scheme_rel.path, "/img.png");
    }

    #[test]
    fn test_effective_port() {
        assert_eq!(UrlParts::parse("http://a.com/").unwrap().effective_port(), Some(80));
        assert_eq!(UrlParts::parse("https://a.com/").unwrap().effective_port(), Some(443));
        assert_eq!(UrlParts::parse("//a.com/").unwrap().effective_port(), None);
    }

    #[test]
    fn test_display_omits_default_port() {
        let mut parts = UrlParts::parse("http://a.com/z").unwrap();
        parts.port = Some(80);
        assert_eq!(parts.to_string(), "http://a.com/z");
        parts.port = Some(8080);
        assert_eq!(parts.to_string(), "http://a.com:8080/z");
    }

    #[test]
    fn test_ipv6_host() {
        let parts = UrlParts::parse("http://[::1]:8080/x").unwrap();
        assert_eq!(parts.host.as_deref(), Some("[::1]"));
        assert_eq!(parts.port, Some(8080));
    }

    #[test]
    fn test_invalid_port() {
        assert!(matches!(
            UrlParts::parse("http://a.com:http/"),
            Err(NetError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_from_url_round_trip() {
        let url = Url::parse("http://a.com/x/y?k=v").unwrap();
        let parts = UrlParts::from(&url);
        assert_eq!(parts.port, Some(80));
        assert_eq!(parts.to_url().unwrap(), url);
    }
}
