//! Status code helpers shared by the finalizer and the server.
//!
//! Status codes travel as plain `u16` so that any value a handler or an error
//! reports can be carried through; the reason phrase table comes from the
//! [`http`] crate.

pub const OK: u16 = 200;

pub const BAD_REQUEST: u16 = 400;
pub const NOT_FOUND: u16 = 404;
pub const METHOD_NOT_ALLOWED: u16 = 405;
pub const REQUEST_TIMEOUT: u16 = 408;
pub const LENGTH_REQUIRED: u16 = 411;
pub const PAYLOAD_TOO_LARGE: u16 = 413;
pub const URI_TOO_LONG: u16 = 414;
pub const REQUEST_HEADER_FIELDS_TOO_LARGE: u16 = 431;

pub const INTERNAL_SERVER_ERROR: u16 = 500;
pub const NOT_IMPLEMENTED: u16 = 501;
pub const HTTP_VERSION_NOT_SUPPORTED: u16 = 505;

/// Canonical reason phrase for `code`, if one is registered.
pub fn reason_phrase(code: u16) -> Option<&'static str> {
    http::StatusCode::from_u16(code)
        .ok()
        .and_then(|status| status.canonical_reason())
}

/// Client or server error range, 400 through 599.
pub fn is_error(code: u16) -> bool {
    (400..600).contains(&code)
}
