//! Core HTTP server implementation.
//!
//! This module implements the low-level HTTP server runtime: accepting TCP
//! connections, reading the request head, and handing the connection over to
//! a route or to the finalizer.
//!
//! The server is fully asynchronous and leverages the `async-std` crate
//! to provide non-blocking I/O and concurrent client handling.
//!
//! ## Request handling flow
//!
//! 1. Accept a TCP connection
//! 2. Read the request head line by line
//!    (parsed by [`RequestParser`](crate::http::parser::RequestParser))
//! 3. Attach the unread body to the request as a
//!    [`RequestBody`](crate::http::body::RequestBody)
//! 4. Validate the request
//!    (delegated to [`Validator`](crate::http::validator::Validator))
//! 5. Route it (delegated to [`handler::handle_request`](crate::handler::handle_request))
//! 6. Write the route's response, or let the
//!    [finalizer](crate::finalizer) answer with a 404 or error page
//!
//! Every connection serves a single request and is closed afterwards.

use std::net::SocketAddr;
use std::sync::Arc;

use async_std::future;
use async_std::io::{self, BufReadExt, BufReader, ReadExt};
use async_std::net::{TcpListener, TcpStream};
use async_std::task;

use crate::config::ServerConfig;
use crate::finalizer::{App, AppEvent, FinalizerOptions, HandlerError, create_final_handler};
use crate::handler;
use crate::http::HttpMethod;
use crate::http::body::RequestBody;
use crate::http::parser::*;
use crate::http::request::HttpRequest;
use crate::http::response::{ResponseHeader, ResponseWriter};
use crate::http::status;
use crate::http::validator::{Validator, ValidatorError};

/// Room for the request line beyond the target itself.
const REQUEST_LINE_SLACK: usize = 64;

pub struct Server {
    listener: TcpListener,
    config: Arc<ServerConfig>,
    app: Arc<App>,
}

/// Errors that can occur while reading and parsing an HTTP request head from the stream
/// used to interrupt the flow and return appropriate responses.
enum ReadError {
    Io(io::Error),
    ConnectionClosed,
    Parser(ParserError),
}

impl Server {
    /// Binds to the configured address and port.
    pub async fn bind(config: ServerConfig) -> io::Result<Self> {
        let listener = TcpListener::bind((config.address, config.port)).await?;

        let app = Arc::new(App::new());
        app.on(AppEvent::ErrorDispatch, |event| {
            tracing::info!(method = %event.method, url = %event.url, "error dispatched");
        });

        Ok(Self {
            listener,
            config: Arc::new(config),
            app,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Application handle notified of every dispatched error.
    pub fn app(&self) -> &Arc<App> {
        &self.app
    }

    /// Accepts connections until the listener fails, spawning a new
    /// asynchronous task for each client.
    pub async fn run(self) -> io::Result<()> {
        tracing::info!(addr = %self.local_addr()?, "listening");

        loop {
            let (stream, peer) = self.listener.accept().await?;
            tracing::debug!(%peer, "accepted connection");
            task::spawn(Self::handle_client(
                stream,
                Arc::clone(&self.config),
                Arc::clone(&self.app),
            ));
        }
    }

    /// Reads the request head, one line at a time.
    ///
    /// The body, if any, is left on `reader`.
    async fn read_head(
        reader: &mut BufReader<TcpStream>,
        config: &ServerConfig,
    ) -> Result<HttpRequest, ReadError> {
        let mut parser = RequestParser::new(config.max_path_size, config.max_header_size);
        let mut req = HttpRequest::new();
        let line_limit = config.max_header_size.max(config.max_path_size + REQUEST_LINE_SLACK);

        loop {
            let mut line = String::new();
            let n = match (&mut *reader)
                .take(line_limit as u64)
                .read_line(&mut line)
                .await
            {
                Ok(0) => return Err(ReadError::ConnectionClosed),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    return Err(ReadError::Parser(ParserError::Malformed));
                }
                Err(e) => return Err(ReadError::Io(e)),
            };

            if !line.ends_with('\n') {
                return Err(ReadError::Parser(if n >= line_limit {
                    ParserError::HeadersTooLarge(config.max_header_size)
                } else {
                    ParserError::Malformed
                }));
            }

            let line = line.trim_end_matches(['\r', '\n']);
            match parser.feed_line(line, &mut req).map_err(ReadError::Parser)? {
                ParserOk::HeadersDone => return Ok(req),
                ParserOk::RequestLine | ParserOk::Header => continue,
            }
        }
    }

    /// Handles a single client connection.
    async fn handle_client(stream: TcpStream, config: Arc<ServerConfig>, app: Arc<App>) {
        let mut reader = BufReader::with_capacity(config.buffer_size, stream.clone());
        let mut res = ResponseWriter::new(stream);
        res.set_header(ResponseHeader::Server.as_str(), &config.server_name);
        res.set_header(ResponseHeader::Connection.as_str(), "close");

        let head = future::timeout(config.read_timeout, Self::read_head(&mut reader, &config)).await;
        let (mut req, error) = match head {
            Err(_) => (
                HttpRequest::new(),
                Some(handler::from_status(
                    status::REQUEST_TIMEOUT,
                    "timed out reading request head",
                )),
            ),
            Ok(Err(ReadError::ConnectionClosed)) => return,
            Ok(Err(ReadError::Io(err))) => {
                tracing::warn!(error = %err, "I/O error while reading request");
                return;
            }
            Ok(Err(ReadError::Parser(err))) => {
                let detail = err.to_string();
                (
                    HttpRequest::new(),
                    Some(handler::from_status(err.into_http_status(), detail)),
                )
            }
            Ok(Ok(mut req)) => {
                // Oversized bodies are attached too: the rejection is only
                // written once the upload has been drained, within write_timeout.
                if let Some(length) = req.content_length() {
                    req.body = RequestBody::new(reader, length);
                }
                let error = Validator::validate_request(&req, &config).err().map(validation_error);
                (req, error)
            }
        };

        let mut options = FinalizerOptions::new().app(app).on_error(|err, head, _res| {
            tracing::error!(method = %head.method, uri = %head.uri, error = %err, "request failed");
        });
        options.env = config.env.clone();

        let respond = Self::respond(&mut req, &mut res, &config, options, error);
        if future::timeout(config.write_timeout, respond).await.is_err() {
            tracing::warn!(uri = %req.uri, "timed out writing response");
        }
    }

    async fn respond(
        req: &mut HttpRequest,
        res: &mut ResponseWriter<TcpStream>,
        config: &ServerConfig,
        options: FinalizerOptions,
        error: Option<HandlerError>,
    ) {
        let outcome = match error {
            Some(err) => Err(err),
            None => handler::handle_request(req, config),
        };

        match outcome {
            Ok(Some(mut response)) => {
                if req.method == HttpMethod::Head {
                    response.body.clear();
                }
                if let Err(err) = res.send(response).await {
                    tracing::warn!(error = %err, "failed to write response");
                }
            }
            Ok(None) => create_final_handler(req, res, options).finish(None).await,
            Err(err) => create_final_handler(req, res, options).finish(Some(err)).await,
        }
    }
}

fn validation_error(err: ValidatorError) -> HandlerError {
    let detail = err.to_string();
    handler::from_status(err.into_http_status(), detail)
}
