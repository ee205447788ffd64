//! Per-request dispatch context.
//!
//! # Responsibilities
//! - Carry the request, captured params and resolved handler chain
//! - Drive the chain through cooperative [`Context::next`] calls
//! - Buffer the response (status, headers, body) until the chain completes
//!
//! # State Machine
//! ```text
//! Idle ──dispatch()──▶ Dispatching ──chain returns──▶ Completed
//!                        │    ▲
//!                   next()    │ element returns
//!                        ▼    │
//!                 chain[cursor] runs
//! ```
//!
//! # Design Decisions
//! - `next()` is synchronous and never yields; calling it past the end of
//!   the chain is a no-op
//! - Writes are buffered, so middleware running after `next()` can still
//!   change status and headers
//! - The deadline is advisory: handlers poll it, nothing is aborted

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::{Body, Bytes};
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::{Method, Request, Response, StatusCode, Uri};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::http::errors::ErrorPages;
use crate::http::handler::{Handler, HandlerChain};
use crate::routing::{Params, Resolved};

/// Body sent when a canonical envelope cannot be encoded.
const ENCODE_FAILURE: &str = r#"{"code":500,"msg":"json encode error","data":""}"#;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

const EXPIRED_COOKIE_ATTRS: &str = "Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT";

#[derive(Serialize)]
struct Envelope<'a, T: ?Sized> {
    code: u16,
    msg: &'a str,
    data: &'a T,
}

/// Where a context is in its dispatch lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Dispatching,
    Completed,
}

/// Request context handed to every chain element.
pub struct Context {
    request: Request<Bytes>,
    remote_addr: Option<SocketAddr>,
    params: Params,
    chain: HandlerChain,
    cursor: usize,
    state: DispatchState,
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    errors: Arc<ErrorPages>,
    request_id: Uuid,
    started: Instant,
    deadline: Option<Instant>,
}

impl Context {
    /// An idle context bound to the app's error pages.
    pub fn new(errors: Arc<ErrorPages>) -> Self {
        Self {
            request: Request::default(),
            remote_addr: None,
            params: Params::new(),
            chain: Vec::<Handler>::new().into(),
            cursor: 0,
            state: DispatchState::Idle,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            errors,
            request_id: Uuid::nil(),
            started: Instant::now(),
            deadline: None,
        }
    }

    /// Return to the idle state, dropping everything tied to the previous
    /// request. Buffers keep their allocations.
    pub fn reset(&mut self) {
        self.request = Request::default();
        self.remote_addr = None;
        self.params.clear();
        self.chain = Vec::<Handler>::new().into();
        self.cursor = 0;
        self.state = DispatchState::Idle;
        self.status = StatusCode::OK;
        self.headers.clear();
        self.body.clear();
        self.request_id = Uuid::nil();
        self.started = Instant::now();
        self.deadline = None;
    }

    /// Load a request and its resolved chain into a reset context.
    pub fn prepare(&mut self, request: Request<Bytes>, remote_addr: Option<SocketAddr>, resolved: Resolved) {
        self.reset();
        self.request = request;
        self.remote_addr = remote_addr;
        self.params.replace_with(resolved.params);
        self.chain = resolved.chain;
        self.request_id = Uuid::new_v4();
    }

    /// Run the chain from the start.
    pub fn dispatch(&mut self) {
        self.state = DispatchState::Dispatching;
        self.next();
        self.state = DispatchState::Completed;
    }

    /// Invoke the next chain element, if any.
    ///
    /// Middleware calls this to continue; code placed after the call runs
    /// once the rest of the chain has returned.
    pub fn next(&mut self) {
        if self.cursor < self.chain.len() {
            let handler = self.chain[self.cursor].clone();
            self.cursor += 1;
            handler.call(self);
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Number of chain elements invoked so far.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn chain(&self) -> &HandlerChain {
        &self.chain
    }

    // --- request ---

    pub fn request(&self) -> &Request<Bytes> {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request<Bytes> {
        &mut self.request
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    pub fn path(&self) -> &str {
        self.request.uri().path()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// A captured path parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.headers().get(name).and_then(|v| v.to_str().ok())
    }

    /// Host without the port, from the `Host` header or the request URI.
    pub fn host(&self) -> &str {
        let raw = self
            .header(header::HOST.as_str())
            .or_else(|| self.request.uri().authority().map(|a| a.as_str()))
            .unwrap_or("");
        split_host_port(raw).0
    }

    /// Port from the `Host` header, else the scheme default.
    pub fn port(&self) -> u16 {
        let explicit = self
            .header(header::HOST.as_str())
            .and_then(|h| split_host_port(h).1)
            .or_else(|| self.request.uri().port_u16());
        explicit.unwrap_or_else(|| match self.request.uri().scheme_str() {
            Some("https") => 443,
            _ => 80,
        })
    }

    /// First value of a query string parameter, percent-decoded.
    pub fn query(&self, key: &str) -> Option<String> {
        let query = self.request.uri().query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// First value of a url-encoded form field from the request body.
    /// Bodies of any other content type yield `None`.
    pub fn form(&self, key: &str) -> Option<String> {
        let is_form = self
            .header(header::CONTENT_TYPE.as_str())
            .and_then(|v| v.split(';').next())
            .is_some_and(|v| v.trim().eq_ignore_ascii_case(FORM_URLENCODED));
        if !is_form {
            return None;
        }
        url::form_urlencoded::parse(self.request.body())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// Request scheme: the URI scheme, then `X-Forwarded-Proto`, else `http`.
    pub fn scheme(&self) -> &str {
        self.request
            .uri()
            .scheme_str()
            .or_else(|| self.header("x-forwarded-proto").map(str::trim))
            .filter(|v| !v.is_empty())
            .unwrap_or("http")
    }

    /// Raw `Authorization` header.
    pub fn authorization(&self) -> Option<&str> {
        self.header(header::AUTHORIZATION.as_str())
    }

    /// Client address: first `X-Forwarded-For` hop, then `X-Real-Ip`, then
    /// the socket peer.
    pub fn client_ip(&self) -> Option<String> {
        let forwarded = self
            .header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        let real = self.header("x-real-ip").map(str::trim).filter(|v| !v.is_empty());

        forwarded
            .or(real)
            .map(str::to_string)
            .or_else(|| self.remote_addr.map(|a| a.ip().to_string()))
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.header(header::USER_AGENT.as_str())
    }

    pub fn referer(&self) -> Option<&str> {
        self.header(header::REFERER.as_str())
    }

    /// Value of a request cookie.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.request
            .headers()
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }

    pub fn body(&self) -> &Bytes {
        self.request.body()
    }

    /// Deserialize the request body as JSON.
    pub fn json_body<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(self.request.body())
    }

    // --- deadline ---

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.deadline = deadline;
    }

    /// Time left before the deadline; `None` when no deadline is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Returns true once the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    // --- response ---

    /// Set the response status. The last value set is what gets sent
    /// and logged.
    pub fn status(&mut self, code: StatusCode) {
        self.status = code;
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// Set a response header, replacing previous values. Invalid names or
    /// values are dropped with a warning.
    pub fn set_header(&mut self, name: &str, value: &str) {
        if let Some((name, value)) = self.header_pair(name, value) {
            self.headers.insert(name, value);
        }
    }

    /// Add a response header value, keeping any already set under `name`.
    pub fn append_header(&mut self, name: &str, value: &str) {
        if let Some((name, value)) = self.header_pair(name, value) {
            self.headers.append(name, value);
        }
    }

    fn header_pair(&self, name: &str, value: &str) -> Option<(HeaderName, HeaderValue)> {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => Some((name, value)),
            _ => {
                tracing::warn!(
                    request_id = %self.request_id,
                    header = %name,
                    "Dropping invalid response header"
                );
                None
            }
        }
    }

    /// Send a `Set-Cookie`. `attrs` is appended verbatim after the pair,
    /// e.g. `"Path=/; HttpOnly"`. Multiple cookies accumulate.
    pub fn set_cookie(&mut self, name: &str, value: &str, attrs: &str) {
        let mut cookie = format!("{name}={value}");
        if !attrs.is_empty() {
            cookie.push_str("; ");
            cookie.push_str(attrs);
        }
        self.append_header(header::SET_COOKIE.as_str(), &cookie);
    }

    /// Expire a cookie on `Path=/`.
    pub fn del_cookie(&mut self, name: &str) {
        self.set_cookie(name, "", EXPIRED_COOKIE_ATTRS);
    }

    pub fn response_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn response_headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn response_body(&self) -> &[u8] {
        &self.body
    }

    /// Append raw bytes to the response body.
    pub fn write(&mut self, bytes: impl AsRef<[u8]>) {
        self.body.extend_from_slice(bytes.as_ref());
    }

    pub fn text(&mut self, code: StatusCode, text: impl AsRef<[u8]>) {
        self.set_header(header::CONTENT_TYPE.as_str(), "text/plain; charset=utf-8");
        self.status(code);
        self.write(text);
    }

    pub fn html(&mut self, code: StatusCode, html: impl AsRef<[u8]>) {
        self.set_header(header::CONTENT_TYPE.as_str(), "text/html; charset=utf-8");
        self.status(code);
        self.write(html);
    }

    /// Serialize `value` as the JSON body. Serialization failures answer 500.
    pub fn json<T: Serialize + ?Sized>(&mut self, code: StatusCode, value: &T) {
        self.set_header(header::CACHE_CONTROL.as_str(), "no-store");
        self.set_header(header::CONTENT_TYPE.as_str(), "application/json; charset=utf-8");
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                self.status(code);
                self.write(bytes);
            }
            Err(e) => {
                tracing::error!(request_id = %self.request_id, error = %e, "JSON encoding failed");
                self.status(StatusCode::INTERNAL_SERVER_ERROR);
            }
        }
    }

    /// JSON envelope `{"code", "msg", "data"}` with `code` mirrored in the
    /// status line. If `data` cannot be encoded, a 500 envelope is sent instead.
    pub fn canonical_json<T: Serialize + ?Sized>(&mut self, code: StatusCode, msg: &str, data: &T) {
        self.set_header(header::CACHE_CONTROL.as_str(), "no-store");
        self.set_header(header::CONTENT_TYPE.as_str(), "application/json; charset=utf-8");

        let envelope = Envelope {
            code: code.as_u16(),
            msg,
            data,
        };
        match serde_json::to_vec(&envelope) {
            Ok(bytes) => {
                self.status(code);
                self.write(bytes);
            }
            Err(e) => {
                tracing::error!(request_id = %self.request_id, error = %e, "JSON encoding failed");
                self.status(StatusCode::INTERNAL_SERVER_ERROR);
                self.write(ENCODE_FAILURE);
            }
        }
    }

    /// Redirect to `location`. Codes outside 301..=399 are ignored.
    pub fn redirect(&mut self, code: StatusCode, location: &str) {
        if code.as_u16() > 300 && code.is_redirection() {
            self.set_header(header::LOCATION.as_str(), location);
            self.status(code);
        } else {
            tracing::debug!(request_id = %self.request_id, code = %code, "Ignoring non-redirect status");
        }
    }

    /// Discard whatever the chain has buffered so far.
    pub fn clear_response(&mut self) {
        self.status = StatusCode::OK;
        self.headers.clear();
        self.body.clear();
    }

    /// Render the registered error page for `code`.
    pub fn error(&mut self, code: StatusCode) {
        let errors = Arc::clone(&self.errors);
        errors.render(code, self);
    }

    /// Move the buffered response out, leaving the context's buffers empty.
    pub fn take_response(&mut self) -> Response<Body> {
        let mut response = Response::new(Body::from(std::mem::take(&mut self.body)));
        *response.status_mut() = self.status;
        *response.headers_mut() = std::mem::take(&mut self.headers);
        response
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("request_id", &self.request_id)
            .field("method", self.request.method())
            .field("path", &self.request.uri().path())
            .field("state", &self.state)
            .field("cursor", &self.cursor)
            .field("status", &self.status)
            .finish()
    }
}

fn split_host_port(raw: &str) -> (&str, Option<u16>) {
    match raw.rsplit_once(':') {
        Some((host, port)) => match port.parse::<u16>() {
            Ok(port) => (host, Some(port)),
            Err(_) => (raw, None),
        },
        None => (raw, None),
    }
}
