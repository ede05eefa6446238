//! The declarative request.

use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use crate::client::Client;
use crate::http::multipart::{FormFields, PostBody};
use crate::http::options::{CurlOption, OptionRegistry, OptionValue};
use crate::http::orderedheaders::HeaderTable;
use crate::http::redirect::RedirectResolver;
use crate::http::response::Response;
use crate::socket::proxy::ProxySettings;
use once_cell::sync::Lazy;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::TempPath;
use url::Url;

static DEFAULT_CLIENT: Lazy<Client> = Lazy::new(Client::new);

/// Request method. `Download` is a GET whose body is kept as a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Head,
    Delete,
    Patch,
    Download,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Head => "HEAD",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Download => "DOWNLOAD",
        }
    }

    /// Methods that must not carry a body.
    pub fn forbids_body(self) -> bool {
        matches!(self, Method::Get | Method::Head)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = NetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "HEAD" => Ok(Method::Head),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            "DOWNLOAD" => Ok(Method::Download),
            other => Err(NetError::NotSupported(format!("method {}", other))),
        }
    }
}

/// The cookie-jar file a request chain shares.
///
/// Only the jar created by [`CookieJar::temporary`] owns its file and removes
/// it when dropped. Clones refer to the same path without owning it, so a
/// redirect chain deletes the file exactly once.
pub struct CookieJar {
    path: PathBuf,
    owned: Option<TempPath>,
}

impl CookieJar {
    /// Create an empty temporary cookie file owned by this jar.
    pub fn temporary() -> Result<Self, NetError> {
        let dir = std::env::temp_dir();
        let file = tempfile::Builder::new()
            .prefix("cookie")
            .tempfile_in(&dir)
            .path_context(&dir)?;
        let owned = file.into_temp_path();
        Ok(Self {
            path: owned.to_path_buf(),
            owned: Some(owned),
        })
    }

    /// Refer to an existing file without taking ownership of it.
    pub fn borrowed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            owned: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether dropping this jar removes the file.
    pub fn is_owner(&self) -> bool {
        self.owned.is_some()
    }

    /// Give up ownership; the file is left in place on drop.
    pub fn disclaim(&mut self) {
        if let Some(owned) = self.owned.take() {
            if let Err(e) = owned.keep() {
                tracing::warn!(path = %self.path.display(), error = %e.error, "failed to keep cookie jar");
                // Forget the path instead of letting the error's drop delete it.
                std::mem::forget(e.path);
            }
        }
    }
}

impl Clone for CookieJar {
    fn clone(&self) -> Self {
        CookieJar::borrowed(self.path.clone())
    }
}

impl Drop for CookieJar {
    fn drop(&mut self) {
        if let Some(owned) = self.owned.take() {
            if let Err(e) = owned.close() {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove cookie jar");
            }
        }
    }
}

impl fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieJar")
            .field("path", &self.path)
            .field("owned", &self.is_owner())
            .finish()
    }
}

/// A declarative HTTP request.
///
/// # Example
/// ```ignore
/// use curlreq::http::request::Request;
///
/// let mut request = Request::new("https://example.com/search")?;
/// request.headers.insert("Accept", "text/html");
/// let response = request.get(Some("q=rust"))?;
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderTable,
    pub options: OptionRegistry,
    pub post: PostBody,
    pub files: FormFields,
    pub proxy: Option<ProxySettings>,
    cookie_jar: CookieJar,
}

impl Request {
    /// A GET request with a fresh temporary cookie jar.
    pub fn new(url: &str) -> Result<Self, NetError> {
        let url = Url::parse(url).map_err(|e| NetError::InvalidUrl(format!("{}: {}", url, e)))?;
        Self::with_url(url)
    }

    pub fn with_url(url: Url) -> Result<Self, NetError> {
        let mut request = Self {
            url,
            method: Method::Get,
            headers: HeaderTable::new(),
            options: OptionRegistry::new(),
            post: PostBody::default(),
            files: FormFields::new(),
            proxy: None,
            cookie_jar: CookieJar::borrowed(PathBuf::new()),
        };
        request.set_cookie_jar(CookieJar::temporary()?);
        Ok(request)
    }

    pub fn is_method(&self, method: Method) -> bool {
        self.method == method
    }

    pub fn set_method(&mut self, method: Method) -> &mut Self {
        self.method = method;
        self
    }

    pub fn set_url(&mut self, url: Url) -> &mut Self {
        self.url = url;
        self
    }

    pub fn set_header(&mut self, name: &str, value: Option<&str>) -> &mut Self {
        self.headers.set_header(name, value);
        self
    }

    pub fn set_option(&mut self, name: &str, value: Option<OptionValue>) -> Result<&mut Self, NetError> {
        self.options.set(name, value)?;
        Ok(self)
    }

    pub fn set_proxy(&mut self, proxy: Option<ProxySettings>) -> &mut Self {
        self.proxy = proxy;
        self
    }

    /// Set the body and files and switch to POST.
    pub fn set_post(&mut self, post: impl Into<PostBody>, files: FormFields) -> &mut Self {
        self.post = post.into();
        self.files = files;
        self.method = Method::Post;
        self
    }

    pub fn cookie_jar(&self) -> &CookieJar {
        &self.cookie_jar
    }

    pub fn cookie_file(&self) -> &Path {
        self.cookie_jar.path()
    }

    /// Use `path` as the cookie jar. A previously owned file is removed.
    pub fn set_cookie_file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.set_cookie_jar(CookieJar::borrowed(path))
    }

    /// Replace the cookie jar. A previously owned file is removed.
    pub fn set_cookie_jar(&mut self, jar: CookieJar) -> &mut Self {
        let path = jar.path().to_string_lossy().into_owned();
        self.options.insert(CurlOption::CookieJar, path.clone());
        self.options.insert(CurlOption::CookieFile, path);
        self.cookie_jar = jar;
        self
    }

    /// Give up responsibility for removing the cookie file.
    pub fn disclaim_cookie_file(&mut self) -> &mut Self {
        self.cookie_jar.disclaim();
        self
    }

    /// Derive the request that follows `response`'s `Location` header.
    pub fn follow_redirect(&self, response: &Response) -> Result<Request, NetError> {
        RedirectResolver::follow(self, response)
    }

    /// Send with the shared default [`Client`].
    pub fn send(&self) -> Result<Response, NetError> {
        DEFAULT_CLIENT.send(self)
    }

    /// GET with `query` as the whole query string; `None` clears it.
    pub fn get(&mut self, query: Option<&str>) -> Result<Response, NetError> {
        self.method = Method::Get;
        self.post = PostBody::default();
        self.files = FormFields::new();
        self.url.set_query(query.filter(|q| !q.is_empty()));
        self.send()
    }

    pub fn post(&mut self, post: impl Into<PostBody>, files: Option<FormFields>) -> Result<Response, NetError> {
        self.method = Method::Post;
        self.post = post.into();
        self.files = files.unwrap_or_default();
        self.send()
    }

    pub fn put(&mut self, post: impl Into<PostBody>) -> Result<Response, NetError> {
        self.method = Method::Put;
        self.post = post.into();
        self.files = FormFields::new();
        self.send()
    }

    pub fn delete(&mut self) -> Result<Response, NetError> {
        self.method = Method::Delete;
        self.post = PostBody::default();
        self.files = FormFields::new();
        self.send()
    }

    pub fn patch(&mut self, post: impl Into<PostBody>) -> Result<Response, NetError> {
        self.method = Method::Patch;
        self.post = post.into();
        self.send()
    }

    /// Fetch into a file; see [`Response::file`].
    pub fn download(&mut self, post: impl Into<PostBody>) -> Result<Response, NetError> {
        self.method = Method::Download;
        self.post = post.into();
        self.send()
    }
}
