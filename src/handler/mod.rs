mod responses;
mod router;

use crate::config::ServerConfig;
use crate::finalizer::HandlerError;
use crate::http::request::HttpRequest;
use crate::http::response::HttpResponse;

pub use responses::from_status;

/// Routes `req`.
///
/// `Ok(None)` means no route matched; the caller finalizes it as not found.
pub fn handle_request(
    req: &HttpRequest,
    config: &ServerConfig,
) -> Result<Option<HttpResponse>, HandlerError> {
    router::route(req, config)
}
