//! Request-line and header parsing on top of [`httparse`], plus body framing.
//!
//! Framing is decided here, not in the connection loop: a request either carries
//! a single well-formed `Content-Length` or no body at all. Anything else
//! (unparsable or conflicting lengths, `Transfer-Encoding`) is rejected so that
//! body bytes can never be read as the start of another request.

use std::collections::HashMap;

use bytes::Bytes;
use thiserror::Error;

use super::{Headers, Method};

/// Errors that can occur while parsing an HTTP/1.1 request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request is incomplete, more data needed")]
    Incomplete,

    #[error("HTTP parse error: {0}")]
    Parse(#[from] httparse::Error),

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid Content-Length {value:?}")]
    InvalidContentLength { value: String },

    #[error("Transfer-Encoding is not supported")]
    UnsupportedTransferEncoding,
}

/// A parsed HTTP/1.1 request.
///
/// This is the request context handed to the router and, through
/// [`Context`](crate::context::Context), to handlers. The router itself only looks
/// at [`method`](Self::method) and [`path`](Self::path).
///
/// # Examples
///
/// ```
/// use watamelo::http::request::Request;
///
/// let raw = b"GET /hello?name=world HTTP/1.1\r\nHost: localhost\r\n\r\n";
/// let (request, _offset) = Request::parse(raw).unwrap();
///
/// assert_eq!(request.method().as_str(), "GET");
/// assert_eq!(request.path(), "/hello");
/// assert_eq!(request.query_param("name"), Some("world"));
/// assert_eq!(request.headers().get("host"), Some("localhost"));
/// ```
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    params: HashMap<String, String>,
    /// HTTP minor version: 0 for HTTP/1.0, 1 for HTTP/1.1.
    version: u8,
    headers: Headers,
    content_length: Option<usize>,
    body: Bytes,
}

impl Request {
    const MAX_HEADERS: usize = 64;

    /// Parses the head of a request from `buf`.
    ///
    /// Returns the request and the offset at which its body starts. The body is
    /// filled with whatever part of the declared `Content-Length` is already in
    /// `buf`; the caller compares `offset + content_length` against what it has
    /// buffered to know whether the frame is complete.
    ///
    /// # Errors
    ///
    /// - [`RequestError::Incomplete`]: the header block is not complete yet.
    /// - [`RequestError::Parse`]: the request line or a header is malformed.
    /// - [`RequestError::MissingField`]: method, path or version is absent.
    /// - [`RequestError::InvalidContentLength`]: a `Content-Length` is not a
    ///   plain decimal number, or several of them disagree.
    /// - [`RequestError::UnsupportedTransferEncoding`]: the body is not framed by
    ///   `Content-Length`.
    pub fn parse(buf: &[u8]) -> Result<(Self, usize), RequestError> {
        let mut slots = [httparse::EMPTY_HEADER; Self::MAX_HEADERS];
        let mut head = httparse::Request::new(&mut slots);

        let offset = match head.parse(buf)? {
            httparse::Status::Complete(offset) => offset,
            httparse::Status::Partial => return Err(RequestError::Incomplete),
        };

        let method = match head.method {
            Some(token) => token.parse::<Method>().unwrap_or_else(|never| match never {}),
            None => return Err(RequestError::MissingField { field: "method" }),
        };
        let target = head.path.ok_or(RequestError::MissingField { field: "path" })?;
        let version = head
            .version
            .ok_or(RequestError::MissingField { field: "version" })?;

        let content_length = declared_length(head.headers)?;
        let headers = collect_headers(head.headers);

        let (path, query) = split_target(target);
        let params = query.as_deref().map(parse_query_string).unwrap_or_default();

        let available = buf.len() - offset;
        let body_len = content_length.map_or(0, |len| len.min(available));
        let body = Bytes::copy_from_slice(&buf[offset..offset + body_len]);

        let request = Self {
            method,
            path,
            query,
            params,
            version,
            headers,
            content_length,
            body,
        };
        Ok((request, offset))
    }

    /// Replace the body, e.g. with exactly `Content-Length` bytes.
    #[must_use]
    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request path without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// HTTP minor version number (0 = HTTP/1.0, 1 = HTTP/1.1).
    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Raw query string, without the leading `?`.
    pub fn query_string(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// HTTP/1.1 keeps the connection open unless told otherwise; HTTP/1.0 closes
    /// it unless `Connection: keep-alive` is sent.
    pub fn is_keep_alive(&self) -> bool {
        match self.headers.get("connection") {
            Some(conn) => conn.eq_ignore_ascii_case("keep-alive"),
            None => self.version == 1,
        }
    }

    /// The validated `Content-Length`, or `None` when the request has no body.
    pub fn content_length(&self) -> Option<usize> {
        self.content_length
    }
}

// Body length declared by the raw headers. Repeated `Content-Length` headers are
// accepted only when they carry the same value.
fn declared_length(raw: &[httparse::Header<'_>]) -> Result<Option<usize>, RequestError> {
    let mut declared = None;
    for header in raw {
        if header.name.eq_ignore_ascii_case("transfer-encoding") {
            return Err(RequestError::UnsupportedTransferEncoding);
        }
        if !header.name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        let len = parse_length(header.value)?;
        match declared {
            Some(previous) if previous != len => {
                return Err(RequestError::InvalidContentLength {
                    value: String::from_utf8_lossy(header.value).into_owned(),
                });
            }
            _ => declared = Some(len),
        }
    }
    Ok(declared)
}

fn parse_length(value: &[u8]) -> Result<usize, RequestError> {
    let invalid = || RequestError::InvalidContentLength {
        value: String::from_utf8_lossy(value).into_owned(),
    };
    let text = std::str::from_utf8(value).map_err(|_| invalid())?.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    text.parse().map_err(|_| invalid())
}

// Header values that are not UTF-8 are dropped.
fn collect_headers(raw: &[httparse::Header<'_>]) -> Headers {
    let mut headers = Headers::with_capacity(raw.len());
    for header in raw {
        if let Ok(value) = std::str::from_utf8(header.value) {
            headers.insert(header.name, value);
        }
    }
    headers
}

fn split_target(target: &str) -> (String, Option<String>) {
    match target.split_once('?') {
        Some((path, query)) => (path.to_owned(), Some(query.to_owned())),
        None => (target.to_owned(), None),
    }
}

// `key=value&key2=value2`, with `+` decoded as a space. No percent-decoding.
fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (key.replace('+', " "), value.replace('+', " "))
        })
        .collect()
}
