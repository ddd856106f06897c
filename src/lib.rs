//! terminus: a terminal request handler for an async HTTP/1.x server.
//!
//! The interesting part lives in [`finalizer`]: given a request and its
//! response writer it produces the final 404 or error page, draining any
//! unread request body first. The remaining modules provide the request and
//! response model it works on and a small server that routes every unmatched
//! or failed request through it.

pub mod config;
pub mod finalizer;
pub mod handler;
pub mod http;
pub mod net;

pub use finalizer::{
    App, AppEvent, DispatchEvent, FinalHandler, FinalizerOptions, HandlerError, StructuredError,
    create_final_handler,
};
