use crate::base::loadstate::LoadState;
use crate::base::neterror::{NetError, CURLE_COULDNT_RESOLVE_HOST, CURLE_COULDNT_RESOLVE_PROXY};
use crate::client::ClientConfig;
use crate::engine::{TransferEngine, TransferHandle, TransferOutcome};
use crate::http::headerparser::{HeaderBlock, HeaderParser};
use crate::http::multipart::{FormFields, MultipartBuilder, PostBody, PostPayload};
use crate::http::options::{CurlOption, IpResolve, OptionRegistry, OptionValue};
use crate::http::orderedheaders::HeaderTable;
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::socket::proxy::ProxySettings;
use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Diagnostics reported by the engine after a transfer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransferInfo {
    pub http_code: u16,
    pub effective_url: Option<String>,
    pub content_type: Option<String>,
    pub total_time: Duration,
    pub namelookup_time: Duration,
    pub connect_time: Duration,
    pub redirect_count: u32,
    pub redirect_url: Option<String>,
    pub primary_ip: Option<String>,
    pub download_size: f64,
}

/// Drives one request through a native handle.
///
/// `Idle -> Configuring -> Executing -> Finalized`. Each transport runs once;
/// a new request needs a new transport.
pub struct Transport {
    engine: Arc<dyn TransferEngine>,
    url: Url,
    method: Method,
    options: OptionRegistry,
    headers: HeaderTable,
    post: PostBody,
    files: FormFields,
    proxy: Option<ProxySettings>,
    state: LoadState,
    handle: Option<Box<dyn TransferHandle>>,
    started: Option<Instant>,
    response: Option<Response>,
}

impl Transport {
    pub fn new(engine: Arc<dyn TransferEngine>, url: Url, method: Method) -> Self {
        let mut options = OptionRegistry::new();
        options.insert(CurlOption::ReturnTransfer, true);
        Self {
            engine,
            url,
            method,
            options,
            headers: HeaderTable::new(),
            post: PostBody::default(),
            files: FormFields::new(),
            proxy: None,
            state: LoadState::Idle,
            handle: None,
            started: None,
            response: None,
        }
    }

    /// Transport for `request`, layered over the client defaults in `config`.
    pub fn from_request(
        engine: Arc<dyn TransferEngine>,
        request: &Request,
        config: &ClientConfig,
    ) -> Self {
        let mut transport = Self::new(engine, request.url.clone(), request.method);
        transport.set_options(&config.options);
        transport.set_options(&request.options);
        if let Some(agent) = &config.user_agent {
            if !transport.options.contains(CurlOption::UserAgent) {
                transport.options.insert(CurlOption::UserAgent, agent.as_str());
            }
        }
        transport.set_headers(&config.headers);
        transport.set_headers(&request.headers);
        transport.set_post(request.post.clone(), request.files.clone());
        transport.set_proxy(request.proxy.clone().or_else(|| config.proxy.clone()));
        transport
    }

    /// Get the current load state.
    pub fn get_load_state(&self) -> LoadState {
        self.state
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn options(&self) -> &OptionRegistry {
        &self.options
    }

    /// Layer `options` over the current ones.
    pub fn set_options(&mut self, options: &OptionRegistry) -> &mut Self {
        self.options.merge(options);
        self
    }

    /// Layer `headers` over the current ones.
    pub fn set_headers(&mut self, headers: &HeaderTable) -> &mut Self {
        self.headers.merge(headers);
        self
    }

    pub fn set_post(&mut self, post: PostBody, files: FormFields) -> &mut Self {
        self.post = post;
        self.files = files;
        self
    }

    pub fn set_proxy(&mut self, proxy: Option<ProxySettings>) -> &mut Self {
        self.proxy = proxy;
        self
    }

    /// Validate the request and push it into a fresh native handle.
    ///
    /// Every check runs before the handle is opened, so a rejected
    /// configuration never touches the engine.
    pub fn configure(&mut self) -> Result<(), NetError> {
        if self.state != LoadState::Idle {
            return Err(NetError::InvalidState(format!(
                "transport cannot be configured in state {:?}",
                self.state
            )));
        }
        if self.method.forbids_body() && !(self.post.is_empty() && self.files.is_empty()) {
            return Err(NetError::InvalidState(format!(
                "{} request cannot carry a body",
                self.method
            )));
        }

        let mut options = self.options.clone();
        if let Some(proxy) = &self.proxy {
            proxy.apply(&mut options);
        }

        let mut headers = self.headers.clone();
        match MultipartBuilder::build(&self.post, &self.files)? {
            PostPayload::Empty => {
                options.remove(CurlOption::Post);
                options.remove(CurlOption::PostFields);
            }
            PostPayload::Raw(body) => {
                options.insert(CurlOption::PostFields, body);
            }
            PostPayload::Fields(fields) => {
                options.insert(CurlOption::PostFields, PostPayload::urlencoded(&fields));
            }
            PostPayload::Multipart(form) => {
                headers.set_header("Content-Type", Some(form.content_type()));
                options.insert(CurlOption::PostFields, form);
            }
        }
        if !headers.is_empty() {
            options.insert(CurlOption::HttpHeader, headers.as_list());
        }

        check_interface(&mut options)?;

        let mut handle = self.engine.open(self.url.as_str())?;
        if let Err(e) = apply(handle.as_mut(), self.method, &options) {
            handle.close();
            return Err(e);
        }

        tracing::debug!(
            method = %self.method,
            url = %self.url,
            options = options.len(),
            "transport configured"
        );
        self.options = options;
        self.headers = headers;
        self.handle = Some(handle);
        self.state = LoadState::Configuring;
        Ok(())
    }

    /// Run the transfer. Does nothing unless the transport was just
    /// configured.
    pub fn execute(&mut self) -> Option<TransferOutcome> {
        if self.state != LoadState::Configuring {
            return None;
        }
        let handle = self.handle.as_mut()?;
        self.state = LoadState::Executing;
        self.started = Some(Instant::now());
        Some(handle.perform())
    }

    /// Turn `outcome` into the response and release the handle.
    ///
    /// Returns `false` for a native error or a status in `300..600`.
    pub fn finalize(&mut self, outcome: TransferOutcome) -> Result<bool, NetError> {
        if self.state != LoadState::Executing {
            return Err(NetError::InvalidState(format!(
                "transport cannot be finalized in state {:?}",
                self.state
            )));
        }
        if let Some(handle) = self.handle.take() {
            handle.close();
        }
        self.state = LoadState::Finalized;

        let request_headers = outcome
            .request_header
            .as_deref()
            .map(HeaderParser::parse_block)
            .unwrap_or_else(HeaderBlock::new);
        let response = Response {
            headers: HeaderParser::parse_final(&outcome.response_header),
            request_headers,
            body: outcome.body,
            info: outcome.info,
            error_number: outcome.error_code,
            error: outcome.error_message,
            file: None,
        };

        let elapsed = self.started.map(|s| s.elapsed()).unwrap_or_default();
        if response.error_number != 0 {
            tracing::warn!(
                url = %self.url,
                code = response.error_number,
                error = response.error.as_deref().unwrap_or(""),
                "transfer failed"
            );
        }
        tracing::debug!(
            url = %self.url,
            status = response.status_code(),
            error_code = response.error_number,
            elapsed_ms = elapsed.as_millis() as u64,
            "transfer complete"
        );

        let ok = response.is_ok();
        self.response = Some(response);
        Ok(ok)
    }

    /// Configure, execute and finalize in one go.
    pub fn run(&mut self) -> Result<bool, NetError> {
        self.configure()?;
        let outcome = self.execute().ok_or_else(|| {
            NetError::InvalidState("transport did not execute".to_string())
        })?;
        self.finalize(outcome)
    }

    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    pub fn into_response(mut self) -> Option<Response> {
        self.response.take()
    }

    /// True when the proxy or the host could not be resolved.
    pub fn is_proxy_fail(&self) -> bool {
        self.response.as_ref().map_or(false, |r| {
            r.error_number == CURLE_COULDNT_RESOLVE_PROXY
                || r.error_number == CURLE_COULDNT_RESOLVE_HOST
        })
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.close();
        }
    }
}

/// Verb flag for `method`. Applied before the options so an explicit body
/// can still turn a download into a POST.
fn method_flag(method: Method) -> (CurlOption, OptionValue) {
    match method {
        Method::Head => (CurlOption::Nobody, OptionValue::Bool(true)),
        Method::Get | Method::Download => (CurlOption::HttpGet, OptionValue::Bool(true)),
        Method::Post => (CurlOption::Post, OptionValue::Bool(true)),
        other => (CurlOption::CustomRequest, OptionValue::Text(other.as_str().to_string())),
    }
}

fn apply(
    handle: &mut dyn TransferHandle,
    method: Method,
    options: &OptionRegistry,
) -> Result<(), NetError> {
    let (flag, value) = method_flag(method);
    handle.set_option(flag, &value)?;
    for (option, value) in options.iter() {
        tracing::trace!(option = %option, "setting option");
        handle.set_option(option, value)?;
    }
    Ok(())
}

/// A literal interface address pins the address family: `ipResolve` is set
/// to match it, or must already match.
fn check_interface(options: &mut OptionRegistry) -> Result<(), NetError> {
    let addr = match options
        .get_option(CurlOption::Interface)
        .and_then(OptionValue::as_text)
        .and_then(|i| i.parse::<IpAddr>().ok())
    {
        Some(addr) => addr,
        None => return Ok(()),
    };
    let family = match addr {
        IpAddr::V4(_) => IpResolve::V4,
        IpAddr::V6(_) => IpResolve::V6,
    };

    match options.get_option(CurlOption::IpResolve) {
        None => {
            options.insert(CurlOption::IpResolve, family);
            Ok(())
        }
        Some(value) if value.as_int().and_then(IpResolve::from_i64) == Some(family) => Ok(()),
        Some(_) => Err(NetError::curl(format!(
            "Interface {} requires ipResolve {:?}",
            addr, family
        ))),
    }
}
