use crate::config::ServerConfig;
use crate::finalizer::HandlerError;
use crate::handler::responses;
use crate::http::HttpMethod;
use crate::http::request::HttpRequest;
use crate::http::response::HttpResponse;

pub fn route(req: &HttpRequest, config: &ServerConfig) -> Result<Option<HttpResponse>, HandlerError> {
    match (&req.method, req.original_path()) {
        (HttpMethod::Get | HttpMethod::Head, Some("/")) => Ok(Some(responses::welcome(config))),
        (_, Some("/")) => Err(responses::method_not_allowed("GET, HEAD")),

        // Fails without ever reading the upload.
        (HttpMethod::Post, Some("/upload")) => Err(responses::upload_unavailable()),

        _ => Ok(None),
    }
}
