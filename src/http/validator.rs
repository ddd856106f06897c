use crate::config::ServerConfig;
use crate::http::HttpMethod;
use crate::http::HttpVersion;
use crate::http::request::HttpRequest;
use crate::http::status;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ValidatorError {
    #[error("invalid HTTP version")]
    Error,

    #[error("HTTP version not supported")]
    HttpVersionNotSupported,

    #[error("request body of {0} bytes exceeds the configured limit")]
    PayloadTooLarge(u64),

    #[error("malformed header field")]
    MalformedHeaderField,

    #[error("missing Content-Length")]
    MissingContentLength,

    #[error("request method does not allow a body")]
    BodyNotAllowed,

    #[error("request method requires a body")]
    MandatoryBody,

    #[error("transfer codings are not supported")]
    TransferEncodingNotSupported,
}

impl ValidatorError {
    pub fn into_http_status(self) -> u16 {
        match self {
            ValidatorError::Error => status::BAD_REQUEST,
            ValidatorError::HttpVersionNotSupported => status::HTTP_VERSION_NOT_SUPPORTED,
            ValidatorError::PayloadTooLarge(_) => status::PAYLOAD_TOO_LARGE,
            ValidatorError::MalformedHeaderField => status::BAD_REQUEST,
            ValidatorError::MandatoryBody => status::BAD_REQUEST,
            ValidatorError::BodyNotAllowed => status::BAD_REQUEST,
            ValidatorError::MissingContentLength => status::LENGTH_REQUIRED,
            ValidatorError::TransferEncodingNotSupported => status::NOT_IMPLEMENTED,
        }
    }
}

pub struct Validator;

impl Validator {
    fn validate_http_version(v: (u8, u8), max: HttpVersion) -> Result<(), ValidatorError> {
        match HttpVersion::from_pair(v) {
            Some(http_v) if http_v <= max => Ok(()),
            Some(_) => Err(ValidatorError::HttpVersionNotSupported),
            None => Err(ValidatorError::Error),
        }
    }

    fn validate_http_method(
        content_length: Option<u64>,
        method: &HttpMethod,
    ) -> Result<(), ValidatorError> {
        match method {
            HttpMethod::Get | HttpMethod::Head => match content_length {
                Some(n) if n > 0 => Err(ValidatorError::BodyNotAllowed),
                _ => Ok(()),
            },

            HttpMethod::Post | HttpMethod::Put => match content_length {
                None => Err(ValidatorError::MissingContentLength),
                Some(0) => Err(ValidatorError::MandatoryBody),
                Some(_) => Ok(()),
            },
            _ => Ok(()),
        }
    }

    pub fn validate_request(req: &HttpRequest, config: &ServerConfig) -> Result<(), ValidatorError> {
        Self::validate_http_version(req.http_version, config.http_version)?;

        if req.headers.contains("Transfer-Encoding") {
            return Err(ValidatorError::TransferEncodingNotSupported);
        }

        let content_length = req
            .headers
            .get("Content-Length")
            .map(|v| v.parse::<u64>())
            .transpose()
            .map_err(|_| ValidatorError::MalformedHeaderField)?;

        Self::validate_http_method(content_length, &req.method)?;

        match content_length {
            Some(n) if n > config.max_body_size => Err(ValidatorError::PayloadTooLarge(n)),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::RequestHeader;

    fn request(method: HttpMethod, content_length: Option<&str>) -> HttpRequest {
        let mut req = HttpRequest::with_target(method, "/");
        if let Some(len) = content_length {
            req.set_header(RequestHeader::ContentLength, len);
        }
        req
    }

    #[test]
    fn post_needs_a_body() {
        let config = ServerConfig::default();
        let err = Validator::validate_request(&request(HttpMethod::Post, None), &config).unwrap_err();
        assert_eq!(err.into_http_status(), status::LENGTH_REQUIRED);

        let err = Validator::validate_request(&request(HttpMethod::Post, Some("0")), &config).unwrap_err();
        assert_eq!(err, ValidatorError::MandatoryBody);
    }

    #[test]
    fn get_cannot_carry_a_body() {
        let config = ServerConfig::default();
        let err = Validator::validate_request(&request(HttpMethod::Get, Some("3")), &config).unwrap_err();
        assert_eq!(err, ValidatorError::BodyNotAllowed);
    }

    #[test]
    fn body_size_is_capped() {
        let config = ServerConfig {
            max_body_size: 10,
            ..ServerConfig::default()
        };
        let err = Validator::validate_request(&request(HttpMethod::Put, Some("11")), &config).unwrap_err();
        assert_eq!(err.into_http_status(), status::PAYLOAD_TOO_LARGE);
        assert!(Validator::validate_request(&request(HttpMethod::Put, Some("10")), &config).is_ok());
    }

    #[test]
    fn version_above_configured_maximum() {
        let config = ServerConfig {
            http_version: HttpVersion::V1_0,
            ..ServerConfig::default()
        };
        let err = Validator::validate_request(&request(HttpMethod::Get, None), &config).unwrap_err();
        assert_eq!(err, ValidatorError::HttpVersionNotSupported);
    }
}
