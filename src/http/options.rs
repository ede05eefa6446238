//! Transfer options.
//!
//! [`CurlOption`] enumerates the libcurl knobs a request may set, addressed by
//! their libcurl names without the `CURLOPT_` prefix (matched
//! case-insensitively). [`OptionRegistry`] validates names and stores values.

use crate::base::neterror::NetError;
use crate::http::multipart::Form;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

macro_rules! curl_options {
    ($($variant:ident => $name:literal,)+) => {
        /// A libcurl option the transport knows how to apply.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum CurlOption {
            $($variant,)+
        }

        impl CurlOption {
            /// Every supported option, in declaration order.
            pub const ALL: &'static [CurlOption] = &[$(CurlOption::$variant,)+];

            /// Canonical lower-cased name, as stored in the registry.
            pub fn name(self) -> &'static str {
                match self {
                    $(CurlOption::$variant => $name,)+
                }
            }
        }
    };
}

curl_options! {
    ReturnTransfer => "returntransfer",
    Header => "header",
    HttpHeader => "httpheader",
    Post => "post",
    PostFields => "postfields",
    HttpGet => "httpget",
    Nobody => "nobody",
    CustomRequest => "customrequest",
    Url => "url",
    Port => "port",
    Proxy => "proxy",
    ProxyPort => "proxyport",
    ProxyUserPwd => "proxyuserpwd",
    NoProxy => "noproxy",
    HttpProxyTunnel => "httpproxytunnel",
    Timeout => "timeout",
    TimeoutMs => "timeout_ms",
    ConnectTimeout => "connecttimeout",
    ConnectTimeoutMs => "connecttimeout_ms",
    LowSpeedLimit => "low_speed_limit",
    LowSpeedTime => "low_speed_time",
    FollowLocation => "followlocation",
    MaxRedirs => "maxredirs",
    AutoReferer => "autoreferer",
    UnrestrictedAuth => "unrestricted_auth",
    UserAgent => "useragent",
    Referer => "referer",
    Encoding => "encoding",
    Cookie => "cookie",
    CookieJar => "cookiejar",
    CookieFile => "cookiefile",
    CookieSession => "cookiesession",
    Interface => "interface",
    IpResolve => "ipresolve",
    SslVerifyPeer => "ssl_verifypeer",
    SslVerifyHost => "ssl_verifyhost",
    CaInfo => "cainfo",
    CaPath => "capath",
    SslCert => "sslcert",
    SslKey => "sslkey",
    UserPwd => "userpwd",
    Range => "range",
    FailOnError => "failonerror",
    Verbose => "verbose",
    FreshConnect => "fresh_connect",
    ForbidReuse => "forbid_reuse",
    DnsCacheTimeout => "dns_cache_timeout",
    TcpNoDelay => "tcp_nodelay",
}

impl CurlOption {
    /// Look an option up by name. `CURLOPT_` prefixes, case, and the
    /// camel-case spelling (`proxyUserPwd`) are all accepted.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        let lower = lower.strip_prefix("curlopt_").unwrap_or(&lower);
        CurlOption::ALL
            .iter()
            .copied()
            .find(|opt| opt.name() == lower || opt.name().replace('_', "") == lower)
    }
}

impl fmt::Display for CurlOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// libcurl `CURL_IPRESOLVE_*` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpResolve {
    Whatever = 0,
    V4 = 1,
    V6 = 2,
}

impl IpResolve {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(IpResolve::Whatever),
            1 => Some(IpResolve::V4),
            2 => Some(IpResolve::V6),
            _ => None,
        }
    }
}

/// A value stored for an option.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<String>),
    Form(Form),
}

impl OptionValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            OptionValue::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptionValue::Int(i) => Some(*i),
            OptionValue::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            OptionValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            OptionValue::List(l) => Some(l),
            _ => None,
        }
    }
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self {
        OptionValue::Bool(b)
    }
}

impl From<i64> for OptionValue {
    fn from(i: i64) -> Self {
        OptionValue::Int(i)
    }
}

impl From<i32> for OptionValue {
    fn from(i: i32) -> Self {
        OptionValue::Int(i64::from(i))
    }
}

impl From<u16> for OptionValue {
    fn from(i: u16) -> Self {
        OptionValue::Int(i64::from(i))
    }
}

impl From<u32> for OptionValue {
    fn from(i: u32) -> Self {
        OptionValue::Int(i64::from(i))
    }
}

/// Durations are stored as whole seconds, like libcurl's `TIMEOUT`.
impl From<Duration> for OptionValue {
    fn from(d: Duration) -> Self {
        OptionValue::Int(d.as_secs() as i64)
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::Text(s.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(s: String) -> Self {
        OptionValue::Text(s)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(l: Vec<String>) -> Self {
        OptionValue::List(l)
    }
}

impl From<Form> for OptionValue {
    fn from(f: Form) -> Self {
        OptionValue::Form(f)
    }
}

impl From<IpResolve> for OptionValue {
    fn from(r: IpResolve) -> Self {
        OptionValue::Int(r as i64)
    }
}

/// Validated option storage.
///
/// Keys always belong to [`CurlOption`]; setting `None` removes the entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionRegistry {
    options: BTreeMap<CurlOption, OptionValue>,
}

impl OptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `name` is a known option.
    pub fn is_option(name: &str) -> bool {
        CurlOption::from_name(name).is_some()
    }

    /// Set or remove an option by name.
    pub fn set(&mut self, name: &str, value: Option<OptionValue>) -> Result<&mut Self, NetError> {
        let option = CurlOption::from_name(name).ok_or_else(|| NetError::InvalidOption {
            name: name.to_string(),
        })?;
        Ok(self.set_option(option, value))
    }

    /// Set or remove several options. Stops at the first unknown name;
    /// options set before it stay applied.
    pub fn set_many<I, K>(&mut self, options: I) -> Result<&mut Self, NetError>
    where
        I: IntoIterator<Item = (K, Option<OptionValue>)>,
        K: AsRef<str>,
    {
        for (name, value) in options {
            self.set(name.as_ref(), value)?;
        }
        Ok(self)
    }

    /// Typed form of [`set`](Self::set); cannot fail.
    pub fn set_option(&mut self, option: CurlOption, value: Option<OptionValue>) -> &mut Self {
        match value {
            Some(value) => {
                self.options.insert(option, value);
            }
            None => {
                self.options.remove(&option);
            }
        }
        self
    }

    /// Convenience for setting a present value.
    pub fn insert(&mut self, option: CurlOption, value: impl Into<OptionValue>) -> &mut Self {
        self.set_option(option, Some(value.into()))
    }

    pub fn remove(&mut self, option: CurlOption) -> Option<OptionValue> {
        self.options.remove(&option)
    }

    /// Read one option by name.
    pub fn option(&self, name: &str) -> Result<Option<&OptionValue>, NetError> {
        let option = CurlOption::from_name(name).ok_or_else(|| NetError::InvalidOption {
            name: name.to_string(),
        })?;
        Ok(self.options.get(&option))
    }

    pub fn get_option(&self, option: CurlOption) -> Option<&OptionValue> {
        self.options.get(&option)
    }

    pub fn contains(&self, option: CurlOption) -> bool {
        self.options.contains_key(&option)
    }

    /// Snapshot of every stored option.
    pub fn get(&self) -> BTreeMap<CurlOption, OptionValue> {
        self.options.clone()
    }

    /// Layer `other` on top of `self`: entries in `other` win.
    pub fn merge(&mut self, other: &OptionRegistry) -> &mut Self {
        for (option, value) in &other.options {
            self.options.insert(*option, value.clone());
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (CurlOption, &OptionValue)> {
        self.options.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_option_round_trips() {
        for option in CurlOption::ALL {
            let mut registry = OptionRegistry::new();
            registry.set(option.name(), Some(OptionValue::Int(7))).unwrap();
            assert_eq!(registry.get().get(option), Some(&OptionValue::Int(7)));

            registry.set(option.name(), None).unwrap();
            assert!(registry.get().is_empty());
        }
    }

    #[test]
    fn test_unknown_option_rejected() {
        let mut registry = OptionRegistry::new();
        let err = registry
            .set("not-a-real-option", Some(true.into()))
            .unwrap_err();
        assert!(matches!(err, NetError::InvalidOption { name } if name == "not-a-real-option"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_name_lookup_is_case_insensitive() {
        assert_eq!(
            CurlOption::from_name("proxyUserPwd"),
            Some(CurlOption::ProxyUserPwd)
        );
        assert_eq!(
            CurlOption::from_name("CURLOPT_SSL_VERIFYPEER"),
            Some(CurlOption::SslVerifyPeer)
        );
        assert_eq!(
            CurlOption::from_name("sslVerifyPeer"),
            Some(CurlOption::SslVerifyPeer)
        );
        assert_eq!(CurlOption::from_name("ipResolve"), Some(CurlOption::IpResolve));
    }

    #[test]
    fn test_set_many_keeps_prior_entries_on_failure() {
        let mut registry = OptionRegistry::new();
        let result = registry.set_many(vec![
            ("timeout", Some(OptionValue::Int(5))),
            ("bogus", Some(OptionValue::Int(1))),
            ("verbose", Some(OptionValue::Bool(true))),
        ]);

        assert!(result.is_err());
        assert!(registry.contains(CurlOption::Timeout));
        assert!(!registry.contains(CurlOption::Verbose));
    }

    #[test]
    fn test_get_returns_copy() {
        let mut registry = OptionRegistry::new();
        registry.insert(CurlOption::UserAgent, "curlreq");
        let mut snapshot = registry.get();
        snapshot.clear();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_option_accessor() {
        let mut registry = OptionRegistry::new();
        registry.insert(CurlOption::Referer, "http://example.com/");
        assert_eq!(
            registry.option("referer").unwrap().and_then(|v| v.as_text()),
            Some("http://example.com/")
        );
        assert!(registry.option("nope").is_err());
    }

    #[test]
    fn test_merge_prefers_other() {
        let mut base = OptionRegistry::new();
        base.insert(CurlOption::Timeout, 30i64);
        base.insert(CurlOption::Verbose, false);

        let mut overlay = OptionRegistry::new();
        overlay.insert(CurlOption::Timeout, 5i64);

        base.merge(&overlay);
        assert_eq!(base.get_option(CurlOption::Timeout), Some(&OptionValue::Int(5)));
        assert_eq!(base.get_option(CurlOption::Verbose), Some(&OptionValue::Bool(false)));
    }

    #[test]
    fn test_ip_resolve_value() {
        let value: OptionValue = IpResolve::V6.into();
        assert_eq!(value.as_int().and_then(IpResolve::from_i64), Some(IpResolve::V6));
    }
}
