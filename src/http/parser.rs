//! Request head parser.
//!
//! The parser is fed one line at a time (request line, then header lines,
//! then the blank line that ends the head). It never touches the body: once
//! [`ParserOk::HeadersDone`] is returned, the remaining bytes on the
//! connection belong to the request body.

use crate::http::request::*;
use crate::http::status;
use crate::http::*;

#[derive(PartialEq, Debug)]
pub enum ParserOk {
    RequestLine,
    Header,
    HeadersDone,
}

// To keep parser logic separate from HTTP status codes,
// direct http error codes are not used here but mapped later.
#[derive(PartialEq, Debug, thiserror::Error)]
pub enum ParserError {
    #[error("malformed request head")]
    Malformed,

    #[error("unknown request method")]
    UnknownMethod,

    #[error("request target exceeds {0} bytes")]
    UriTooLong(usize),

    #[error("request headers exceed {0} bytes")]
    HeadersTooLarge(usize),

    #[error("unsupported HTTP version {0}.{1}")]
    HttpVersionNotSupported(u8, u8),
}

impl ParserError {
    pub fn into_http_status(self) -> u16 {
        match self {
            ParserError::Malformed | ParserError::UnknownMethod => status::BAD_REQUEST,
            ParserError::UriTooLong(_) => status::URI_TOO_LONG,
            ParserError::HeadersTooLarge(_) => status::REQUEST_HEADER_FIELDS_TOO_LARGE,
            ParserError::HttpVersionNotSupported(..) => status::HTTP_VERSION_NOT_SUPPORTED,
        }
    }
}

#[derive(PartialEq, PartialOrd, Debug)]
enum ParserState {
    RequestLine,
    Headers,
    Done,
}

pub struct RequestParser {
    state: ParserState,
    header_bytes: usize,
    max_path_size: usize,
    max_header_size: usize,
}

impl RequestParser {
    pub fn new(max_path_size: usize, max_header_size: usize) -> Self {
        Self {
            state: ParserState::RequestLine,
            header_bytes: 0,
            max_path_size,
            max_header_size,
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == ParserState::Done
    }

    fn parse_request_line(&mut self, line: &str, req: &mut HttpRequest) -> Result<ParserOk, ParserError> {
        // Request line: METHOD PATH HTTP/VERSION
        let parts: Vec<&str> = line.split(' ').collect();
        if parts.len() != 3 {
            return Err(ParserError::Malformed);
        }

        if parts[0].is_empty() || parts[0].len() > HTTP_METHOD_MAX_LEN {
            return Err(ParserError::Malformed);
        }

        let method = match http_method_from_str(&parts[0].to_uppercase()) {
            HttpMethod::Unknown => return Err(ParserError::UnknownMethod),
            m => m,
        };

        let path = parts[1];
        if path.is_empty() {
            return Err(ParserError::Malformed);
        }
        if path.len() > self.max_path_size {
            return Err(ParserError::UriTooLong(self.max_path_size));
        }

        let (maj, min) = parts[2]
            .strip_prefix("HTTP/")
            .and_then(|v| v.split_once('.'))
            .and_then(|(maj, min)| Some((maj.parse::<u8>().ok()?, min.parse::<u8>().ok()?)))
            .ok_or(ParserError::Malformed)?;

        if !(maj == 1 && (min == 0 || min == 1)) {
            return Err(ParserError::HttpVersionNotSupported(maj, min));
        }

        req.method = method;
        req.uri = path.to_string();
        req.http_version = (maj, min);

        self.state = ParserState::Headers;
        Ok(ParserOk::RequestLine)
    }

    fn parse_header(&mut self, line: &str, req: &mut HttpRequest) -> Result<ParserOk, ParserError> {
        if line.is_empty() {
            if !check_headers(req) {
                return Err(ParserError::Malformed);
            }
            self.state = ParserState::Done;
            return Ok(ParserOk::HeadersDone);
        }

        self.header_bytes += line.len() + 2;
        if self.header_bytes > self.max_header_size {
            return Err(ParserError::HeadersTooLarge(self.max_header_size));
        }

        let (name, value) = line.split_once(':').ok_or(ParserError::Malformed)?;
        let name = name.trim();
        let value = value.trim();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(ParserError::Malformed);
        }

        match name.to_ascii_lowercase().as_str() {
            "host" => req.set_header(RequestHeader::Host, value),
            "content-length" => {
                if value.parse::<u64>().is_err() {
                    return Err(ParserError::Malformed);
                }
                req.set_header(RequestHeader::ContentLength, value);
            }
            "content-type" => req.set_header(RequestHeader::ContentType, value),
            "transfer-encoding" => req.set_header(RequestHeader::TransferEncoding, value),
            _ => req.headers.set_raw(name, value),
        }

        Ok(ParserOk::Header)
    }

    /// Feeds one line of the head, without its trailing CRLF.
    pub fn feed_line(&mut self, line: &str, req: &mut HttpRequest) -> Result<ParserOk, ParserError> {
        match self.state {
            ParserState::RequestLine => self.parse_request_line(line, req),
            ParserState::Headers => self.parse_header(line, req),
            ParserState::Done => Ok(ParserOk::HeadersDone),
        }
    }
}

fn check_headers(req: &HttpRequest) -> bool {
    req.http_version != (1, 1) || req.headers.get("Host").is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(lines: &[&str]) -> Result<HttpRequest, ParserError> {
        let mut parser = RequestParser::new(64, 256);
        let mut req = HttpRequest::new();
        for line in lines {
            parser.feed_line(line, &mut req)?;
        }
        assert!(parser.is_done());
        Ok(req)
    }

    #[test]
    fn parses_a_complete_head() {
        let req = parse(&[
            "post /upload HTTP/1.1",
            "Host: localhost",
            "Content-Length: 12",
            "X-Trace: abc",
            "",
        ])
        .unwrap();

        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.uri, "/upload");
        assert_eq!(req.http_version, (1, 1));
        assert_eq!(req.content_length(), Some(12));
        assert_eq!(req.headers.get("x-trace").map(String::as_str), Some("abc"));
    }

    #[test]
    fn http_1_1_requires_host() {
        assert_eq!(parse(&["GET / HTTP/1.1", ""]).unwrap_err(), ParserError::Malformed);
        assert!(parse(&["GET / HTTP/1.0", ""]).is_ok());
    }

    #[test]
    fn rejects_bad_request_lines() {
        assert_eq!(parse(&["GET /"]).unwrap_err(), ParserError::Malformed);
        assert_eq!(parse(&["BREW / HTTP/1.1"]).unwrap_err(), ParserError::UnknownMethod);
        assert_eq!(
            parse(&["GET / HTTP/2.0"]).unwrap_err(),
            ParserError::HttpVersionNotSupported(2, 0)
        );

        let long = format!("GET /{} HTTP/1.1", "a".repeat(64));
        assert_eq!(parse(&[&long]).unwrap_err(), ParserError::UriTooLong(64));
    }

    #[test]
    fn rejects_oversized_headers() {
        let big = format!("X-Big: {}", "b".repeat(300));
        let err = parse(&["GET / HTTP/1.1", &big]).unwrap_err();
        assert_eq!(err.into_http_status(), status::REQUEST_HEADER_FIELDS_TOO_LARGE);
    }

    #[test]
    fn rejects_malformed_content_length() {
        let err = parse(&["POST / HTTP/1.1", "Host: x", "Content-Length: ten"]).unwrap_err();
        assert_eq!(err, ParserError::Malformed);
    }
}
