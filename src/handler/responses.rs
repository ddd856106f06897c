use std::fmt::Display;

use crate::config::ServerConfig;
use crate::finalizer::{HandlerError, StructuredError};
use crate::http::encode::escape_html;
use crate::http::response::{HttpResponse, ResponseHeader};
use crate::http::status;

pub fn welcome(config: &ServerConfig) -> HttpResponse {
    let mut res = HttpResponse::new();
    res.status = status::OK;
    let body = format!("<h1>Welcome to {}!</h1>", escape_html(&config.server_name))
        .as_bytes()
        .to_vec();

    res.set_header(ResponseHeader::ContentLength, &body.len().to_string());
    res.set_header(ResponseHeader::ContentType, "text/html; charset=utf-8");

    res.body = body;
    res
}

pub fn method_not_allowed(allow: &str) -> HandlerError {
    StructuredError::new("method not allowed")
        .with_status(status::METHOD_NOT_ALLOWED)
        .with_header(ResponseHeader::Allow.as_str(), allow)
        .into()
}

pub fn upload_unavailable() -> HandlerError {
    std::io::Error::other("upload storage is not configured").into()
}

/// An error carrying `code`, described by `detail`.
pub fn from_status(code: u16, detail: impl Display) -> HandlerError {
    StructuredError::new(detail.to_string())
        .with_status(code)
        .into()
}
