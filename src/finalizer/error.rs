//! Errors handed to the finalizer and how they are classified.
//!
//! Handlers report failures as a [`HandlerError`]. Its structured form carries
//! the status-like fields exactly as the failing code set them, which may be
//! missing, non-numeric or out of range; [`HandlerError::classify`] turns that
//! into a validated status and header set.

use std::fmt;

use indexmap::IndexMap;

use crate::http::status;

/// A status-like attribute as it was attached to an error.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusField {
    Number(f64),
    Text(String),
}

impl StatusField {
    /// The field as an HTTP error status, if it is an integral number in `[400, 600)`.
    fn as_error_status(&self) -> Option<u16> {
        match self {
            StatusField::Number(n) if n.fract() == 0.0 && (400.0..600.0).contains(n) => {
                Some(*n as u16)
            }
            _ => None,
        }
    }
}

impl From<u16> for StatusField {
    fn from(code: u16) -> Self {
        StatusField::Number(f64::from(code))
    }
}

/// Headers attached to an error. Only a genuine mapping is ever applied.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorHeaders {
    Map(IndexMap<String, String>),
    Invalid(String),
}

/// An error with optional status, headers and diagnostic text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredError {
    /// Checked first.
    pub status: Option<StatusField>,
    /// Checked only when `status` is not a valid error status.
    pub status_code: Option<StatusField>,
    pub headers: Option<ErrorHeaders>,
    /// Detailed trace, shown outside production.
    pub stack: Option<String>,
    pub message: Option<String>,
}

impl StructuredError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_status(self, status: u16) -> Self {
        self.with_status_field(StatusField::from(status))
    }

    pub fn with_status_code(self, status: u16) -> Self {
        self.with_status_code_field(StatusField::from(status))
    }

    /// Sets the primary status field to an arbitrary, possibly invalid, value.
    pub fn with_status_field(mut self, field: StatusField) -> Self {
        self.status = Some(field);
        self
    }

    pub fn with_status_code_field(mut self, field: StatusField) -> Self {
        self.status_code = Some(field);
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match &mut self.headers {
            Some(ErrorHeaders::Map(map)) => {
                map.insert(name.to_string(), value.to_string());
            }
            _ => {
                let mut map = IndexMap::new();
                map.insert(name.to_string(), value.to_string());
                self.headers = Some(ErrorHeaders::Map(map));
            }
        }
        self
    }

    pub fn with_headers(mut self, headers: ErrorHeaders) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

impl fmt::Display for StructuredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message.as_deref() {
            Some(message) if !message.is_empty() => write!(f, "Error: {message}"),
            _ => f.write_str("Error"),
        }
    }
}

/// Anything a request handler can fail with.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HandlerError {
    #[error("{0}")]
    Structured(StructuredError),

    /// A bare string; it is its own message.
    #[error("{0}")]
    Plain(String),

    /// A value with nothing to inspect.
    #[error("unknown error")]
    Unknown,
}

/// Status and headers derived from a [`HandlerError`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classified {
    /// `Some` only when the error carried its own valid status.
    pub status: Option<u16>,
    /// Present only together with `status`.
    pub headers: Option<IndexMap<String, String>>,
}

impl HandlerError {
    /// An error that only carries a status.
    pub fn status(code: u16) -> Self {
        HandlerError::Structured(StructuredError::default().with_status(code))
    }

    pub fn plain(message: impl Into<String>) -> Self {
        HandlerError::Plain(message.into())
    }

    /// Wraps any standard error, recording its source chain as the stack.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut stack = format!("Error: {err}");
        let mut source = err.source();
        while let Some(cause) = source {
            stack.push_str(&format!("\n    caused by: {cause}"));
            source = cause.source();
        }

        HandlerError::Structured(StructuredError::new(err.to_string()).with_stack(stack))
    }

    /// Picks the status from the error's own fields.
    ///
    /// `status` wins over `status_code` whenever it is valid, even if
    /// `status_code` is valid too. Headers are only taken alongside such a
    /// status, and only when they form a mapping.
    pub fn classify(&self) -> Classified {
        let HandlerError::Structured(err) = self else {
            return Classified::default();
        };

        let status = err
            .status
            .as_ref()
            .and_then(StatusField::as_error_status)
            .or_else(|| err.status_code.as_ref().and_then(StatusField::as_error_status));

        let Some(status) = status else {
            return Classified::default();
        };

        let headers = match &err.headers {
            Some(ErrorHeaders::Map(map)) => Some(map.clone()),
            _ => None,
        };

        Classified {
            status: Some(status),
            headers,
        }
    }

    /// The error rendered as a string, when the value supports it.
    fn string_form(&self) -> Option<String> {
        match self {
            HandlerError::Unknown => None,
            other => Some(other.to_string()),
        }
    }

    /// Body text for an error response with `status`.
    ///
    /// Outside production the stack (or the string form) is shown; otherwise,
    /// or when there is nothing to show, the status reason phrase is used.
    pub fn message(&self, status: u16, production: bool) -> String {
        let detail = if production {
            None
        } else {
            let stack = match self {
                HandlerError::Structured(err) => err.stack.clone(),
                _ => None,
            };
            stack
                .filter(|s| !s.is_empty())
                .or_else(|| self.string_form())
                .filter(|s| !s.is_empty())
        };

        detail.unwrap_or_else(|| {
            status::reason_phrase(status)
                .map(str::to_string)
                .unwrap_or_else(|| status.to_string())
        })
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(err: std::io::Error) -> Self {
        HandlerError::from_error(&err)
    }
}

impl From<StructuredError> for HandlerError {
    fn from(err: StructuredError) -> Self {
        HandlerError::Structured(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_field_wins() {
        let err: HandlerError = StructuredError::default()
            .with_status(404)
            .with_status_code(503)
            .into();
        assert_eq!(err.classify().status, Some(404));
    }

    #[test]
    fn secondary_field_used_when_primary_invalid() {
        let err: HandlerError = StructuredError::default()
            .with_status_field(StatusField::Text("404".into()))
            .with_status_code(503)
            .into();
        assert_eq!(err.classify().status, Some(503));

        let err: HandlerError = StructuredError::default()
            .with_status(200)
            .with_status_code(418)
            .into();
        assert_eq!(err.classify().status, Some(418));
    }

    #[test]
    fn out_of_range_and_fractional_values_are_ignored() {
        for value in [399.0, 600.0, 404.5, f64::NAN, -404.0] {
            let err: HandlerError = StructuredError::default()
                .with_status_field(StatusField::Number(value))
                .into();
            assert_eq!(err.classify(), Classified::default(), "value {value}");
        }
    }

    #[test]
    fn headers_follow_the_error_status() {
        let err: HandlerError = StructuredError::default()
            .with_status(429)
            .with_header("Retry-After", "60")
            .into();
        let classified = err.classify();
        assert_eq!(classified.status, Some(429));
        assert_eq!(
            classified.headers.unwrap().get("Retry-After").map(String::as_str),
            Some("60")
        );

        let err: HandlerError = StructuredError::default()
            .with_header("Retry-After", "60")
            .into();
        assert_eq!(err.classify(), Classified::default());
    }

    #[test]
    fn non_mapping_headers_are_dropped() {
        let err: HandlerError = StructuredError::default()
            .with_status(500)
            .with_headers(ErrorHeaders::Invalid("Retry-After: 60".into()))
            .into();
        assert_eq!(
            err.classify(),
            Classified {
                status: Some(500),
                headers: None
            }
        );
    }

    #[test]
    fn message_prefers_stack_outside_production() {
        let err: HandlerError = StructuredError::new("boom").with_stack("Error: boom\n    at handler").into();
        assert_eq!(err.message(500, false), "Error: boom\n    at handler");
        assert_eq!(err.message(500, true), "Internal Server Error");
    }

    #[test]
    fn message_falls_back_to_string_form() {
        let err: HandlerError = StructuredError::new("boom").into();
        assert_eq!(err.message(500, false), "Error: boom");
        assert_eq!(HandlerError::plain("oops").message(500, false), "oops");
        assert_eq!(HandlerError::plain("").message(502, false), "Bad Gateway");
    }

    #[test]
    fn unknown_errors_use_reason_phrase_or_number() {
        assert_eq!(HandlerError::Unknown.message(500, false), "Internal Server Error");
        assert_eq!(HandlerError::Unknown.message(599, false), "599");
    }

    #[test]
    fn io_errors_keep_their_chain() {
        let inner = std::io::Error::other("disk full");
        let err = HandlerError::from(inner);
        assert!(err.message(500, false).starts_with("Error: disk full"));
        assert_eq!(err.classify().status, None);
    }
}
