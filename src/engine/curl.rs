//! libcurl engine built on the `curl` crate's easy interface.

use super::{TransferEngine, TransferHandle, TransferOutcome};
use crate::base::neterror::NetError;
use crate::http::multipart::{Form, Part};
use crate::http::options::{self, CurlOption, OptionValue};
use crate::http::transaction::TransferInfo;
use bytes::Bytes;
use curl::easy::{Easy, InfoType, IpResolve, List};
use std::time::Duration;

/// Opens libcurl easy handles.
#[derive(Debug, Default, Clone, Copy)]
pub struct CurlEngine;

impl CurlEngine {
    pub fn new() -> Self {
        Self
    }
}

impl TransferEngine for CurlEngine {
    fn open(&self, url: &str) -> Result<Box<dyn TransferHandle>, NetError> {
        let mut easy = Easy::new();
        easy.url(url)?;
        // HEADER_OUT is only reported through the debug callback.
        easy.verbose(true)?;
        Ok(Box::new(CurlHandle {
            easy,
            return_transfer: false,
            include_header: false,
        }))
    }
}

struct CurlHandle {
    easy: Easy,
    return_transfer: bool,
    include_header: bool,
}

impl TransferHandle for CurlHandle {
    fn set_option(&mut self, option: CurlOption, value: &OptionValue) -> Result<(), NetError> {
        let easy = &mut self.easy;
        match option {
            CurlOption::ReturnTransfer => self.return_transfer = flag(option, value)?,
            CurlOption::Header => self.include_header = flag(option, value)?,
            CurlOption::HttpHeader => {
                let lines = value.as_list().ok_or_else(|| expected(option, "a list of header lines"))?;
                let mut list = List::new();
                for line in lines {
                    list.append(line)?;
                }
                easy.http_headers(list)?;
            }
            CurlOption::Post => easy.post(flag(option, value)?)?,
            CurlOption::PostFields => match value {
                OptionValue::Text(body) => easy.post_fields_copy(body.as_bytes())?,
                OptionValue::Form(form) => easy.httppost(curl_form(form)?)?,
                _ => return Err(expected(option, "text or a multipart form")),
            },
            CurlOption::HttpGet => easy.get(flag(option, value)?)?,
            CurlOption::Nobody => easy.nobody(flag(option, value)?)?,
            CurlOption::CustomRequest => easy.custom_request(text(option, value)?)?,
            CurlOption::Url => easy.url(text(option, value)?)?,
            CurlOption::Port => easy.port(number(option, value)?)?,
            CurlOption::Proxy => easy.proxy(text(option, value)?)?,
            CurlOption::ProxyPort => easy.proxy_port(number(option, value)?)?,
            CurlOption::ProxyUserPwd => {
                let (user, pass) = credentials(option, value)?;
                easy.proxy_username(user)?;
                easy.proxy_password(pass)?;
            }
            CurlOption::NoProxy => easy.noproxy(text(option, value)?)?,
            CurlOption::HttpProxyTunnel => easy.http_proxy_tunnel(flag(option, value)?)?,
            CurlOption::Timeout => easy.timeout(seconds(option, value)?)?,
            CurlOption::TimeoutMs => easy.timeout(millis(option, value)?)?,
            CurlOption::ConnectTimeout => easy.connect_timeout(seconds(option, value)?)?,
            CurlOption::ConnectTimeoutMs => easy.connect_timeout(millis(option, value)?)?,
            CurlOption::LowSpeedLimit => easy.low_speed_limit(number(option, value)?)?,
            CurlOption::LowSpeedTime => easy.low_speed_time(seconds(option, value)?)?,
            CurlOption::FollowLocation => easy.follow_location(flag(option, value)?)?,
            CurlOption::MaxRedirs => easy.max_redirections(number(option, value)?)?,
            CurlOption::AutoReferer => easy.autoreferer(flag(option, value)?)?,
            CurlOption::UnrestrictedAuth => easy.unrestricted_auth(flag(option, value)?)?,
            CurlOption::UserAgent => easy.useragent(text(option, value)?)?,
            CurlOption::Referer => easy.referer(text(option, value)?)?,
            CurlOption::Encoding => easy.accept_encoding(text(option, value)?)?,
            CurlOption::Cookie => easy.cookie(text(option, value)?)?,
            CurlOption::CookieJar => easy.cookie_jar(text(option, value)?)?,
            CurlOption::CookieFile => easy.cookie_file(text(option, value)?)?,
            CurlOption::CookieSession => easy.cookie_session(flag(option, value)?)?,
            CurlOption::Interface => easy.interface(text(option, value)?)?,
            CurlOption::IpResolve => {
                let family = value
                    .as_int()
                    .and_then(options::IpResolve::from_i64)
                    .ok_or_else(|| expected(option, "0, 1 or 2"))?;
                easy.ip_resolve(match family {
                    options::IpResolve::Whatever => IpResolve::Any,
                    options::IpResolve::V4 => IpResolve::V4,
                    options::IpResolve::V6 => IpResolve::V6,
                })?;
            }
            CurlOption::SslVerifyPeer => easy.ssl_verify_peer(flag(option, value)?)?,
            CurlOption::SslVerifyHost => easy.ssl_verify_host(flag(option, value)?)?,
            CurlOption::CaInfo => easy.cainfo(text(option, value)?)?,
            CurlOption::CaPath => easy.capath(text(option, value)?)?,
            CurlOption::SslCert => easy.ssl_cert(text(option, value)?)?,
            CurlOption::SslKey => easy.ssl_key(text(option, value)?)?,
            CurlOption::UserPwd => {
                let (user, pass) = credentials(option, value)?;
                easy.username(user)?;
                easy.password(pass)?;
            }
            CurlOption::Range => easy.range(text(option, value)?)?,
            CurlOption::FailOnError => easy.fail_on_error(flag(option, value)?)?,
            // Header capture needs the debug channel, so verbosity stays on
            // and the flag only affects our own trace output.
            CurlOption::Verbose => {}
            CurlOption::FreshConnect => easy.fresh_connect(flag(option, value)?)?,
            CurlOption::ForbidReuse => easy.forbid_reuse(flag(option, value)?)?,
            CurlOption::DnsCacheTimeout => easy.dns_cache_timeout(seconds(option, value)?)?,
            CurlOption::TcpNoDelay => easy.tcp_nodelay(flag(option, value)?)?,
        }
        Ok(())
    }

    fn perform(&mut self) -> TransferOutcome {
        let mut body = Vec::new();
        let mut response_header = String::new();
        let mut request_header: Option<String> = None;

        let result = run_transfer(
            &mut self.easy,
            self.return_transfer,
            &mut body,
            &mut response_header,
            &mut request_header,
        );
        if self.include_header && self.return_transfer {
            body.splice(0..0, response_header.bytes());
        }

        let info = self.info();
        match result {
            Ok(()) => TransferOutcome {
                body: Some(Bytes::from(body)),
                error_code: 0,
                error_message: None,
                info,
                request_header,
                response_header,
            },
            Err(e) => TransferOutcome {
                body: None,
                error_code: e.code() as i32,
                error_message: Some(
                    e.extra_description()
                        .unwrap_or_else(|| e.description())
                        .to_string(),
                ),
                info,
                request_header,
                response_header,
            },
        }
    }

    fn close(self: Box<Self>) {
        drop(self);
    }
}

impl CurlHandle {
    fn info(&mut self) -> TransferInfo {
        let easy = &mut self.easy;
        TransferInfo {
            http_code: easy
                .response_code()
                .ok()
                .and_then(|c| u16::try_from(c).ok())
                .unwrap_or(0),
            effective_url: easy.effective_url().ok().flatten().map(str::to_string),
            content_type: easy.content_type().ok().flatten().map(str::to_string),
            total_time: easy.total_time().unwrap_or_default(),
            namelookup_time: easy.namelookup_time().unwrap_or_default(),
            connect_time: easy.connect_time().unwrap_or_default(),
            redirect_count: easy.redirect_count().unwrap_or(0),
            redirect_url: easy.redirect_url().ok().flatten().map(str::to_string),
            primary_ip: easy.primary_ip().ok().flatten().map(str::to_string),
            download_size: easy.download_size().unwrap_or(0.0),
        }
    }
}

fn run_transfer(
    easy: &mut Easy,
    return_transfer: bool,
    body: &mut Vec<u8>,
    response_header: &mut String,
    request_header: &mut Option<String>,
) -> Result<(), curl::Error> {
    let mut transfer = easy.transfer();
    transfer.write_function(|data| {
        if return_transfer {
            body.extend_from_slice(data);
        }
        Ok(data.len())
    })?;
    transfer.header_function(|line| {
        response_header.push_str(&String::from_utf8_lossy(line));
        true
    })?;
    transfer.debug_function(|kind, data| match kind {
        InfoType::HeaderOut => request_header
            .get_or_insert_with(String::new)
            .push_str(&String::from_utf8_lossy(data)),
        InfoType::Text => {
            tracing::trace!(line = %String::from_utf8_lossy(data).trim_end(), "curl");
        }
        _ => {}
    })?;
    transfer.perform()
}

fn curl_form(form: &Form) -> Result<curl::easy::Form, NetError> {
    let mut out = curl::easy::Form::new();
    for (name, part) in form.parts() {
        let added = match part {
            Part::Text(value) => out.part(name).contents(value.as_bytes()).add(),
            Part::File {
                path,
                content_type,
                file_name,
            } => out
                .part(name)
                .file(path)
                .content_type(content_type)
                .filename(file_name)
                .add(),
        };
        added.map_err(|e| NetError::curl(format!("cannot add form part \"{}\": {}", name, e)))?;
    }
    Ok(out)
}

fn expected(option: CurlOption, what: &'static str) -> NetError {
    NetError::InvalidOptionValue {
        option: option.name(),
        expected: what,
    }
}

fn flag(option: CurlOption, value: &OptionValue) -> Result<bool, NetError> {
    value.as_bool().ok_or_else(|| expected(option, "a boolean"))
}

fn text(option: CurlOption, value: &OptionValue) -> Result<&str, NetError> {
    value.as_text().ok_or_else(|| expected(option, "text"))
}

fn number<T: TryFrom<i64>>(option: CurlOption, value: &OptionValue) -> Result<T, NetError> {
    value
        .as_int()
        .and_then(|n| T::try_from(n).ok())
        .ok_or_else(|| expected(option, "a non-negative integer in range"))
}

fn seconds(option: CurlOption, value: &OptionValue) -> Result<Duration, NetError> {
    number::<u64>(option, value).map(Duration::from_secs)
}

fn millis(option: CurlOption, value: &OptionValue) -> Result<Duration, NetError> {
    number::<u64>(option, value).map(Duration::from_millis)
}

fn credentials(option: CurlOption, value: &OptionValue) -> Result<(&str, &str), NetError> {
    let pair = text(option, value)?;
    Ok(pair.split_once(':').unwrap_or((pair, "")))
}
