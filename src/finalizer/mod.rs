//! Terminal request handler.
//!
//! [`create_final_handler`] captures a request/response pair and returns a
//! [`FinalHandler`], a consume-once continuation. Calling
//! [`FinalHandler::finish`] without an error sends a 404 page; with an error
//! it sends an error page whose status, headers and text are derived from the
//! error. Either way the request body is drained before the response is
//! written, so a client that is still uploading does not stall the
//! connection.
//!
//! ```no_run
//! # use terminus::finalizer::{create_final_handler, FinalizerOptions};
//! # use terminus::http::request::HttpRequest;
//! # use terminus::http::response::ResponseWriter;
//! # async_std::task::block_on(async {
//! let mut req = HttpRequest::new();
//! let mut res = ResponseWriter::new(Vec::new());
//! create_final_handler(&mut req, &mut res, FinalizerOptions::default())
//!     .finish(None)
//!     .await;
//! # });
//! ```

pub mod document;
pub mod error;
pub mod events;

use std::sync::Arc;

use async_std::io::Write;
use async_std::task;
use indexmap::IndexMap;

use crate::http::HttpMethod;
use crate::http::body::{DrainProgress, RequestBody};
use crate::http::encode::encode_url;
use crate::http::headers::is_valid_header;
use crate::http::request::{HttpRequest, RequestHead};
use crate::http::response::{HttpResponse, ResponseHeader, ResponseWriter};
use crate::http::status;

pub use document::create_html_document;
pub use error::{Classified, ErrorHeaders, HandlerError, StatusField, StructuredError};
pub use events::{App, AppEvent, DispatchEvent};

/// Process environment variable holding the default environment mode.
pub const ENV_VAR: &str = "TERMINUS_ENV";

pub const DEFAULT_ENV: &str = "development";

/// Environment mode in which error details are hidden.
pub const PRODUCTION: &str = "production";

/// Called with the error, the request head and the response head once an
/// error response has been written. Runs on its own task.
///
/// The response head is a snapshot of what was sent: final status, reason
/// phrase and headers. The body is not included.
pub type OnError = Arc<dyn Fn(&HandlerError, &RequestHead, &HttpResponse) + Send + Sync>;

#[derive(Clone, Default)]
pub struct FinalizerOptions {
    /// Overrides [`ENV_VAR`].
    pub env: Option<String>,
    pub on_error: Option<OnError>,
    pub app: Option<Arc<App>>,
}

impl FinalizerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn env(mut self, env: impl Into<String>) -> Self {
        self.env = Some(env.into());
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&HandlerError, &RequestHead, &HttpResponse) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }

    pub fn app(mut self, app: Arc<App>) -> Self {
        self.app = Some(app);
        self
    }
}

impl std::fmt::Debug for FinalizerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinalizerOptions")
            .field("env", &self.env)
            .field("on_error", &self.on_error.is_some())
            .field("app", &self.app)
            .finish()
    }
}

/// Request body lifecycle before the response may be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrainState {
    Draining,
    Ready,
}

impl DrainState {
    /// Detaches `body` from any consumer if it still has data pending.
    fn start(body: &mut RequestBody) -> Self {
        if body.is_finished() {
            return DrainState::Ready;
        }

        if body.unpipe() {
            tracing::debug!("detached request body from its consumer");
        }
        DrainState::Draining
    }

    /// Discards one chunk; any end of the body, including a failed read, means ready.
    async fn advance(self, body: &mut RequestBody) -> Self {
        if self == DrainState::Ready {
            return self;
        }

        match body.drain_chunk().await {
            Ok(DrainProgress::Pending(_)) => DrainState::Draining,
            Ok(DrainProgress::Finished) => DrainState::Ready,
            Err(err) => {
                tracing::debug!(error = %err, "request body ended abnormally");
                DrainState::Ready
            }
        }
    }
}

pub struct FinalHandler<'a, W> {
    req: &'a mut HttpRequest,
    res: &'a mut ResponseWriter<W>,
    production: bool,
    on_error: Option<OnError>,
    app: Option<Arc<App>>,
}

/// Builds the terminal handler for `req`/`res`.
///
/// The environment mode is resolved here, once: `options.env`, else the
/// [`ENV_VAR`] variable, else [`DEFAULT_ENV`].
pub fn create_final_handler<'a, W>(
    req: &'a mut HttpRequest,
    res: &'a mut ResponseWriter<W>,
    options: FinalizerOptions,
) -> FinalHandler<'a, W>
where
    W: Write + Unpin,
{
    let env = options
        .env
        .filter(|env| !env.is_empty())
        .or_else(|| std::env::var(ENV_VAR).ok().filter(|env| !env.is_empty()))
        .unwrap_or_else(|| DEFAULT_ENV.to_string());

    FinalHandler {
        req,
        res,
        production: env == PRODUCTION,
        on_error: options.on_error,
        app: options.app,
    }
}

impl<W> FinalHandler<'_, W>
where
    W: Write + Unpin,
{
    pub fn is_production(&self) -> bool {
        self.production
    }

    /// Sends the final response: 404 without `error`, an error page otherwise.
    ///
    /// Never fails; I/O errors are logged.
    pub async fn finish(self, error: Option<HandlerError>) {
        let FinalHandler {
            req,
            res,
            production,
            on_error,
            app,
        } = self;

        if res.headers_sent() {
            tracing::debug!("cannot send final response after headers sent");
            if let Err(err) = res.end(None).await {
                tracing::debug!(error = %err, "failed to close response");
            }
            return;
        }

        let (status, headers, message) = match &error {
            None => {
                let path = req.original_path().unwrap_or("resource");
                let message = format!("Cannot {} {}", req.method, encode_url(path));
                (status::NOT_FOUND, None, message)
            }
            Some(err) => {
                let Classified { status, headers } = err.classify();
                let (status, headers) = match status {
                    Some(status) => (status, headers),
                    None => (response_status(res), None),
                };
                (status, headers, err.message(status, production))
            }
        };

        let url = encode_url(req.original_uri.as_deref().unwrap_or(&req.uri));
        tracing::debug!(status, method = %req.method, url = %url, "dispatching final response");

        if let (Some(_), Some(app)) = (&error, &app) {
            app.emit(
                AppEvent::ErrorDispatch,
                &DispatchEvent {
                    method: req.method.to_string(),
                    url,
                },
            );
        }

        send(req, res, status, headers, &message).await;

        if let (Some(err), Some(on_error)) = (error, on_error) {
            let head = req.head();
            let response = res.head().clone();
            task::spawn(async move { on_error(&err, &head, &response) });
        }
    }
}

/// The response's own status when it is an error status, else 500.
fn response_status<W>(res: &ResponseWriter<W>) -> u16
where
    W: Write + Unpin,
{
    let code = res.status();
    if status::is_error(code) {
        code
    } else {
        status::INTERNAL_SERVER_ERROR
    }
}

async fn send<W>(
    req: &mut HttpRequest,
    res: &mut ResponseWriter<W>,
    status: u16,
    headers: Option<IndexMap<String, String>>,
    message: &str,
) where
    W: Write + Unpin,
{
    let mut state = DrainState::start(&mut req.body);
    while state == DrainState::Draining {
        state = state.advance(&mut req.body).await;
    }

    let body = create_html_document(message);

    res.set_status(status);
    res.set_status_message(status::reason_phrase(status));

    for stale in [
        ResponseHeader::ContentEncoding,
        ResponseHeader::ContentLanguage,
        ResponseHeader::ContentRange,
    ] {
        res.remove_header(stale.as_str());
    }

    for (name, value) in headers.iter().flatten() {
        if is_valid_header(name, value) {
            res.set_header(name, value);
        } else {
            tracing::warn!(header = ?name, "skipping invalid error header");
        }
    }

    res.set_header(ResponseHeader::ContentSecurityPolicy.as_str(), "default-src 'none'");
    res.set_header(ResponseHeader::XContentTypeOptions.as_str(), "nosniff");
    res.set_header(ResponseHeader::ContentType.as_str(), "text/html; charset=utf-8");
    res.set_header(ResponseHeader::ContentLength.as_str(), &body.len().to_string());

    let result = if req.method == HttpMethod::Head {
        res.end(None).await
    } else {
        res.end(Some(body.as_bytes())).await
    };

    if let Err(err) = result {
        tracing::warn!(status, error = %err, "failed to write final response");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_std::io::Cursor;

    #[async_std::test]
    async fn drain_state_is_ready_for_finished_bodies() {
        let mut body = RequestBody::empty();
        assert_eq!(DrainState::start(&mut body), DrainState::Ready);
    }

    #[async_std::test]
    async fn drain_state_detaches_and_reaches_ready() {
        let mut body = RequestBody::from_bytes(vec![0; 20_000]);
        body.pipe(Vec::new());

        let mut state = DrainState::start(&mut body);
        assert_eq!(state, DrainState::Draining);
        assert!(!body.is_piped());

        let mut steps = 0;
        while state == DrainState::Draining {
            state = state.advance(&mut body).await;
            steps += 1;
        }
        assert_eq!(steps, 3);
        assert!(body.is_finished());
    }

    #[async_std::test]
    async fn drain_state_treats_truncated_bodies_as_finished() {
        let mut body = RequestBody::new(Cursor::new(b"short".to_vec()), 100);
        let state = DrainState::start(&mut body);
        assert_eq!(state.advance(&mut body).await, DrainState::Draining);
        assert_eq!(state.advance(&mut body).await, DrainState::Ready);
    }

    #[test]
    fn env_option_overrides_default() {
        let mut req = HttpRequest::new();
        let mut res = ResponseWriter::new(Vec::new());
        let handler = create_final_handler(&mut req, &mut res, FinalizerOptions::new().env(PRODUCTION));
        assert!(handler.is_production());
    }

    #[test]
    fn response_status_fallback() {
        let mut res = ResponseWriter::new(Vec::new());
        assert_eq!(response_status(&res), 500);
        res.set_status(503);
        assert_eq!(response_status(&res), 503);
        res.set_status(600);
        assert_eq!(response_status(&res), 500);
    }
}
