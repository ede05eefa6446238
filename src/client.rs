//! HTTP Client with builder pattern.
//!
//! [`Client`] is the caller-level entry point: it runs a [`Request`] through a
//! [`Transport`], turns native failures and bad statuses into errors, and
//! optionally follows redirects.
//!
//! # Example
//!
//! ```rust,ignore
//! use curlreq::client::Client;
//! use curlreq::http::request::Request;
//!
//! let client = Client::builder()
//!     .user_agent("curlreq/0.1")
//!     .follow_redirects(true)
//!     .build();
//!
//! let request = Request::new("https://example.com")?;
//! let resp = client.send_async(request).await?;
//! println!("{}", resp.status_code());
//! ```

use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use crate::engine::{CurlEngine, TransferEngine};
use crate::http::options::{OptionRegistry, OptionValue};
use crate::http::orderedheaders::HeaderTable;
use crate::http::redirect::RedirectResolver;
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::http::transaction::Transport;
use crate::http::urlparts::UrlParts;
use crate::socket::proxy::ProxySettings;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// Defaults applied to every request a [`Client`] sends.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Sent as `userAgent` unless the request sets its own.
    pub user_agent: Option<String>,
    /// Options layered under each request's own options.
    pub options: OptionRegistry,
    /// Headers layered under each request's own headers.
    pub headers: HeaderTable,
    /// Used when the request has no proxy.
    pub proxy: Option<ProxySettings>,
    pub follow_redirects: bool,
    pub max_redirects: usize,
    /// Where `DOWNLOAD` bodies are stored; the system temp dir when unset.
    pub download_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            options: OptionRegistry::new(),
            headers: HeaderTable::new(),
            proxy: None,
            follow_redirects: false,
            max_redirects: 20,
            download_dir: None,
        }
    }
}

impl ClientConfig {
    /// Defaults plus the proxy from `HTTPS_PROXY`/`HTTP_PROXY`.
    pub fn from_env() -> Self {
        Self {
            proxy: ProxySettings::from_env(),
            ..Self::default()
        }
    }
}

/// HTTP Client for sending requests.
///
/// Use [`Client::builder()`] to configure and create a client.
#[derive(Clone)]
pub struct Client {
    engine: Arc<dyn TransferEngine>,
    config: ClientConfig,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Create a new client backed by libcurl with default settings.
    pub fn new() -> Self {
        Self::with_engine(Arc::new(CurlEngine::new()))
    }

    /// Create a client on top of another transfer engine.
    pub fn with_engine(engine: Arc<dyn TransferEngine>) -> Self {
        Self {
            engine,
            config: ClientConfig::default(),
        }
    }

    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send `request` and wait for the response.
    ///
    /// A non-zero native error becomes [`NetError::FailedRequest`], a status
    /// in `300..600` [`NetError::BadStatus`]. Redirects are followed only
    /// when the config asks for it.
    pub fn send(&self, request: &Request) -> Result<Response, NetError> {
        let mut response = self.transfer(request)?;
        let mut current: Option<Request> = None;

        if self.config.follow_redirects {
            let mut hops = 0;
            while response.is_redirect() && hops < self.config.max_redirects {
                let next = RedirectResolver::follow(current.as_ref().unwrap_or(request), &response)?;
                response = self.transfer(&next)?;
                current = Some(next);
                hops += 1;
            }
        }

        let last = current.unwrap_or_else(|| request.clone());
        if !response.is_ok() {
            return Err(NetError::BadStatus {
                request: Box::new(last),
                response: Box::new(response),
            });
        }

        if last.is_method(Method::Download) {
            if let Some(body) = &response.body {
                response.file = Some(self.persist(body)?);
            }
        }
        Ok(response)
    }

    /// [`send`](Self::send) on the blocking thread pool.
    pub async fn send_async(&self, request: Request) -> Result<Response, NetError> {
        let client = self.clone();
        tokio::task::spawn_blocking(move || client.send(&request))
            .await
            .map_err(|e| NetError::TaskFailed(e.to_string()))?
    }

    fn transfer(&self, request: &Request) -> Result<Response, NetError> {
        let mut transport = Transport::from_request(self.engine.clone(), request, &self.config);
        transport.run()?;
        let response = transport
            .into_response()
            .ok_or_else(|| NetError::InvalidState("transport produced no response".to_string()))?;

        if response.error_number != 0 {
            return Err(NetError::FailedRequest {
                code: response.error_number,
                message: response.error.clone().unwrap_or_default(),
                authority: UrlParts::from(&request.url).authority(),
                info: Box::new(response.info.clone()),
                request: Box::new(request.clone()),
            });
        }
        Ok(response)
    }

    fn persist(&self, body: &[u8]) -> Result<PathBuf, NetError> {
        let dir = self
            .config
            .download_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        let mut file = tempfile::Builder::new()
            .prefix("download")
            .tempfile_in(&dir)
            .path_context(&dir)?;
        file.write_all(body).path_context(file.path())?;
        let (_, path) = file
            .keep()
            .map_err(|e| NetError::io(dir.display().to_string(), e.error))?;
        tracing::debug!(path = %path.display(), bytes = body.len(), "download stored");
        Ok(path)
    }
}

/// Builder for creating a [`Client`].
#[derive(Default)]
pub struct ClientBuilder {
    engine: Option<Arc<dyn TransferEngine>>,
    config: ClientConfig,
}

impl ClientBuilder {
    /// Start from an existing configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Use another transfer engine instead of libcurl.
    pub fn engine(mut self, engine: Arc<dyn TransferEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn user_agent(mut self, agent: &str) -> Self {
        self.config.user_agent = Some(agent.to_string());
        self
    }

    /// Set a default option by name.
    pub fn option(
        mut self,
        name: &str,
        value: impl Into<OptionValue>,
    ) -> Result<Self, NetError> {
        self.config.options.set(name, Some(value.into()))?;
        Ok(self)
    }

    /// Add a default header.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.config.headers.insert(name, value);
        self
    }

    /// Set proxy.
    pub fn proxy(mut self, proxy: ProxySettings) -> Self {
        self.config.proxy = Some(proxy);
        self
    }

    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.config.follow_redirects = follow;
        self
    }

    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config.max_redirects = max;
        self
    }

    pub fn download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.download_dir = Some(dir.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Client {
        Client {
            engine: self
                .engine
                .unwrap_or_else(|| Arc::new(CurlEngine::new())),
            config: self.config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::options::CurlOption;

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::default();
        assert!(!config.follow_redirects);
        assert_eq!(config.max_redirects, 20);
        assert!(config.proxy.is_none());
    }

    #[test]
    fn test_builder() {
        let client = Client::builder()
            .user_agent("curlreq-test")
            .header("accept", "text/plain")
            .option("connectTimeout", 3i64)
            .unwrap()
            .follow_redirects(true)
            .max_redirects(2)
            .build();

        let config = client.config();
        assert_eq!(config.user_agent.as_deref(), Some("curlreq-test"));
        assert_eq!(config.headers.as_list(), vec!["Accept: text/plain"]);
        assert!(config.options.contains(CurlOption::ConnectTimeout));
        assert!(config.follow_redirects);
        assert_eq!(config.max_redirects, 2);
    }

    #[test]
    fn test_builder_rejects_unknown_option() {
        assert!(matches!(
            Client::builder().option("bogus", true),
            Err(NetError::InvalidOption { .. })
        ));
    }
}
