//! HTTP response head and the writer that puts it on the wire.
//!
//! [`HttpResponse`] is a plain value: status, optional reason phrase,
//! headers and body. [`ResponseWriter`] owns the outgoing stream and tracks
//! whether the head has already been written, which is what the finalizer
//! checks before attempting to send anything.

use std::future;
use std::pin::Pin;
use std::time::SystemTime;

use async_std::io::{self, Write, WriteExt};

use crate::http::headers::HttpHeaders;
use crate::http::status::{self, OK};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseHeader {
    Allow,
    Connection,
    ContentEncoding,
    ContentLanguage,
    ContentLength,
    ContentRange,
    ContentSecurityPolicy,
    ContentType,
    Date,
    Server,
    XContentTypeOptions,
}

impl ResponseHeader {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseHeader::Allow => "Allow",
            ResponseHeader::Connection => "Connection",
            ResponseHeader::ContentEncoding => "Content-Encoding",
            ResponseHeader::ContentLanguage => "Content-Language",
            ResponseHeader::ContentLength => "Content-Length",
            ResponseHeader::ContentRange => "Content-Range",
            ResponseHeader::ContentSecurityPolicy => "Content-Security-Policy",
            ResponseHeader::ContentType => "Content-Type",
            ResponseHeader::Date => "Date",
            ResponseHeader::Server => "Server",
            ResponseHeader::XContentTypeOptions => "X-Content-Type-Options",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_message: Option<String>,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new() -> Self {
        Self {
            status: OK,
            status_message: None,
            headers: HttpHeaders::new(),
            body: Vec::new(),
        }
    }

    pub fn set_header(&mut self, h: ResponseHeader, value: &str) {
        self.headers.set_raw(h.as_str(), value);
    }

    /// Serializes the status line and headers, including the blank line
    /// that terminates the head.
    pub fn build_headers(&self) -> String {
        let reason = self
            .status_message
            .as_deref()
            .or_else(|| status::reason_phrase(self.status))
            .unwrap_or("");

        // HTTP/1.1 <status> <reason>\r\n
        // <header_name>: <header_value>\r\n
        // ...
        // \r\n
        format!(
            "HTTP/1.1 {} {}\r\n{}\r\n",
            self.status,
            reason,
            self.headers.stringify(),
        )
    }
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes a single response to `W`.
///
/// The head is written at most once; after [`end`](Self::end) every further
/// write is ignored.
pub struct ResponseWriter<W> {
    stream: W,
    head: HttpResponse,
    headers_sent: bool,
    finished: bool,
}

impl<W> ResponseWriter<W>
where
    W: Write + Unpin,
{
    pub fn new(stream: W) -> Self {
        Self {
            stream,
            head: HttpResponse::new(),
            headers_sent: false,
            finished: false,
        }
    }

    pub fn status(&self) -> u16 {
        self.head.status
    }

    pub fn set_status(&mut self, status: u16) {
        self.head.status = status;
    }

    pub fn set_status_message(&mut self, message: Option<&str>) {
        self.head.status_message = message.map(str::to_string);
    }

    pub fn set_header(&mut self, name: &str, value: &str) {
        self.head.headers.set_raw(name, value);
    }

    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        self.head.headers.remove(name)
    }

    pub fn header(&self, name: &str) -> Option<&String> {
        self.head.headers.get(name)
    }

    /// Status and headers as they currently stand.
    pub fn head(&self) -> &HttpResponse {
        &self.head
    }

    pub fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Writes the status line and headers. Does nothing if they were already sent.
    pub async fn write_head(&mut self) -> io::Result<()> {
        if self.headers_sent {
            return Ok(());
        }

        if !self.head.headers.contains(ResponseHeader::Date.as_str()) {
            self.head.set_header(
                ResponseHeader::Date,
                &httpdate::fmt_http_date(SystemTime::now()),
            );
        }

        self.headers_sent = true;
        self.stream
            .write_all(self.head.build_headers().as_bytes())
            .await
    }

    /// Writes a body chunk, sending the head first if needed.
    pub async fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }
        self.write_head().await?;
        self.stream.write_all(chunk).await
    }

    /// Finishes the response, optionally with a last body chunk, then flushes
    /// and closes the stream. Calling it again is a no-op.
    pub async fn end(&mut self, body: Option<&[u8]>) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }

        match body {
            Some(body) => self.write(body).await?,
            None => self.write_head().await?,
        }

        self.finished = true;
        self.stream.flush().await?;
        future::poll_fn(|cx| Pin::new(&mut self.stream).poll_close(cx)).await
    }

    /// Sends a complete response built by a route handler.
    ///
    /// Headers already set on the writer are kept unless `response` overrides them.
    /// `Content-Length` defaults to the body length, so a HEAD response can
    /// advertise the length of a body it does not carry.
    pub async fn send(&mut self, response: HttpResponse) -> io::Result<()> {
        self.head.status = response.status;
        self.head.status_message = response.status_message;
        for (name, value) in response.headers.iter() {
            self.head.headers.set_raw(name, value);
        }
        if !response.headers.contains(ResponseHeader::ContentLength.as_str()) {
            self.head.set_header(
                ResponseHeader::ContentLength,
                &response.body.len().to_string(),
            );
        }

        self.end(Some(&response.body)).await
    }

    pub fn into_inner(self) -> W {
        self.stream
    }
}
