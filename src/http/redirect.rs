//! Redirect target resolution.
//!
//! A `Location` header may be absolute, scheme-relative (`//host/path`),
//! host-relative (`/path`) or relative to the current directory (`path`).
//! Missing scheme, host and port are taken from the previous URL; when
//! neither side has them the redirect cannot be resolved.

use crate::base::neterror::NetError;
use crate::http::multipart::{FormFields, PostBody};
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::http::urlparts::UrlParts;

pub struct RedirectResolver;

impl RedirectResolver {
    /// Resolve `location` against `previous`.
    pub fn resolve(previous: &str, location: &str) -> Result<UrlParts, NetError> {
        Self::resolve_parts(&UrlParts::parse(previous)?, location)
    }

    /// Resolve `location` against already-parsed previous URL parts.
    pub fn resolve_parts(previous: &UrlParts, location: &str) -> Result<UrlParts, NetError> {
        let mut target = UrlParts::parse(location)?;

        // A host-less target not starting at the root is relative to the
        // previous URL's directory.
        if target.host.is_none() && !target.path.starts_with('/') {
            let dir = match previous.path.rfind('/') {
                Some(idx) => &previous.path[..=idx],
                None => "",
            };
            target.path = format!("{}{}", dir, target.path);
        }

        Self::complete(previous, target)
    }

    /// Fill scheme, host and port of a structured target from `previous`.
    /// Its path is taken as-is, never as relative.
    pub fn complete(previous: &UrlParts, mut target: UrlParts) -> Result<UrlParts, NetError> {
        let own_host = target.host.is_some();

        if target.scheme.is_none() {
            target.scheme = Some(previous.scheme.clone().ok_or_else(|| missing("scheme"))?);
        }
        if target.host.is_none() {
            target.host = Some(previous.host.clone().ok_or_else(|| missing("host"))?);
        }
        // A borrowed host comes with the previous port; an own host with its
        // scheme's default.
        if target.port.is_none() && (!own_host || target.effective_port().is_none()) {
            target.port = Some(previous.effective_port().ok_or_else(|| missing("port"))?);
        }

        if !target.path.starts_with('/') {
            target.path.insert(0, '/');
        }
        Ok(target)
    }

    /// Method used after a redirect: downloads keep downloading, everything
    /// else becomes GET.
    pub fn method_after(method: Method) -> Method {
        match method {
            Method::Download => Method::Download,
            _ => Method::Get,
        }
    }

    /// Derive the request that follows `response`'s `Location` header.
    ///
    /// The new request is a clone without body or files, its URL is the
    /// resolved target, and it does not own the shared cookie file.
    pub fn follow(request: &Request, response: &Response) -> Result<Request, NetError> {
        let location = response
            .headers
            .get("Location")
            .map(|v| v.last().to_string())
            .ok_or_else(|| NetError::InvalidUrl("Missing Location header".to_string()))?;

        let target = Self::resolve_parts(&UrlParts::from(&request.url), &location)?;

        let mut next = request.clone();
        next.set_method(Self::method_after(request.method));
        next.disclaim_cookie_file();
        next.post = PostBody::default();
        next.files = FormFields::new();
        next.set_url(target.to_url()?);

        tracing::debug!(
            from = %request.url,
            to = %next.url,
            method = %next.method,
            "following redirect"
        );
        Ok(next)
    }
}

fn missing(component: &str) -> NetError {
    NetError::InvalidUrl(format!("Missing URL {}!", component))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_path() {
        let url = RedirectResolver::resolve("http://a.com/x/y", "/z").unwrap();
        assert_eq!(url.to_string(), "http://a.com/z");
    }

    #[test]
    fn test_relative_to_directory() {
        let url = RedirectResolver::resolve("http://a.com/x/y", "z").unwrap();
        assert_eq!(url.to_string(), "http://a.com/x/z");
    }

    #[test]
    fn test_relative_with_query() {
        let url = RedirectResolver::resolve("http://a.com/x/y?old=1", "z?new=2").unwrap();
        assert_eq!(url.to_string(), "http://a.com/x/z?new=2");
    }

    #[test]
    fn test_relative_from_root() {
        let url = RedirectResolver::resolve("http://a.com", "z").unwrap();
        assert_eq!(url.to_string(), "http://a.com/z");
    }

    #[test]
    fn test_scheme_relative_takes_scheme() {
        let url = RedirectResolver::resolve("https://a.com/x", "//b.com/path").unwrap();
        assert_eq!(url.to_string(), "https://b.com/path");
    }

    #[test]
    fn test_absolute_target_keeps_its_own_port() {
        let url = RedirectResolver::resolve("http://a.com:8080/x", "http://b.com/y").unwrap();
        assert_eq!(url.to_string(), "http://b.com/y");
    }

    #[test]
    fn test_port_copied_from_previous() {
        let url = RedirectResolver::resolve("http://a.com:8080/x/y", "/z").unwrap();
        assert_eq!(url.to_string(), "http://a.com:8080/z");
    }

    #[test]
    fn test_absolute_without_path() {
        let url = RedirectResolver::resolve("http://a.com/x/y", "https://b.com").unwrap();
        assert_eq!(url.to_string(), "https://b.com/");
    }

    #[test]
    fn test_missing_scheme_fails() {
        let err = RedirectResolver::resolve("/x/y", "//nohost/path").unwrap_err();
        assert!(matches!(err, NetError::InvalidUrl(msg) if msg.contains("scheme")));
    }

    #[test]
    fn test_missing_host_fails() {
        let previous = UrlParts {
            scheme: Some("http".into()),
            path: "/x/y".into(),
            ..UrlParts::default()
        };
        let err = RedirectResolver::resolve_parts(&previous, "/z").unwrap_err();
        assert!(matches!(err, NetError::InvalidUrl(msg) if msg.contains("host")));
    }

    #[test]
    fn test_missing_port_fails() {
        let previous = UrlParts::parse("gopher://a.com/x").unwrap();
        let err = RedirectResolver::resolve_parts(&previous, "/z").unwrap_err();
        assert!(matches!(err, NetError::InvalidUrl(msg) if msg.contains("port")));
    }

    #[test]
    fn test_complete_does_not_treat_path_as_relative() {
        let previous = UrlParts::parse("http://a.com/x/y").unwrap();
        let target = UrlParts {
            path: "z".into(),
            ..UrlParts::default()
        };
        let url = RedirectResolver::complete(&previous, target).unwrap();
        assert_eq!(url.to_string(), "http://a.com/z");
    }

    #[test]
    fn test_method_after() {
        assert_eq!(RedirectResolver::method_after(Method::Download), Method::Download);
        assert_eq!(RedirectResolver::method_after(Method::Post), Method::Get);
        assert_eq!(RedirectResolver::method_after(Method::Head), Method::Get);
        assert_eq!(RedirectResolver::method_after(Method::Get), Method::Get);
    }
}
