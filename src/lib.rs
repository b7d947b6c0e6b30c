//! # promux
//!
//! Request-latency metrics for HTTP handlers, without changing what the
//! handler's caller can see.
//!
//! ## The problem
//!
//! Counting status codes and bytes means wrapping the response writer. But a
//! writer may offer more than the mandatory contract: streaming flush, raw
//! connection takeover, bulk copies, server push. Handlers probe for those at
//! runtime and pick a faster path when they exist. A wrapper that hides a
//! capability silently slows the handler down; a wrapper that invents one
//! breaks it.
//!
//! promux wraps with *exactly* the real writer's capabilities:
//!
//! - [`Capabilities::detect`] — probe the real writer, get a 4-bit mask
//! - [`delegator::compose`] — pick one of sixteen wrapper shapes for that mask
//! - [`middleware::instrument_handler_duration`] — time the handler and record
//!   `{method, code, path}` into an [`ObservationSink`]
//!
//! Labels stay low-cardinality: methods and status codes are normalized, and
//! `path` is the matched route template (`/items/{id}`), not the literal URI.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::io;
//! use promux::{HistogramSink, Request, ResponseWriter, Router, Server};
//! use promux::middleware::instrument_handler_duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let latency = HistogramSink::default();
//!     let app = Router::new()
//!         .get("/items/{id}", instrument_handler_duration(latency.clone(), get_item))
//!         .get("/events",     instrument_handler_duration(latency, events));
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! fn get_item(w: &mut dyn ResponseWriter, req: &Request) -> io::Result<()> {
//!     let id = req.param("id").unwrap_or("unknown");
//!     w.write(format!(r#"{{"id":"{id}"}}"#).as_bytes())?;
//!     Ok(())
//! }
//!
//! fn events(w: &mut dyn ResponseWriter, _req: &Request) -> io::Result<()> {
//!     for n in 0..3 {
//!         w.write(format!("data: {n}\n\n").as_bytes())?;
//!         // Only stream when the writer really can.
//!         if let Some(f) = w.as_flusher() {
//!             f.flush()?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod capability;
mod error;
mod handler;
mod observe;
mod request;
mod router;
mod server;
mod stream;
mod writer;

pub mod delegator;
pub mod middleware;

#[cfg(test)]
mod testing;

pub use capability::Capabilities;
pub use delegator::Delegator;
pub use error::Error;
pub use handler::{Handler, IntoHandlerResult};
pub use observe::{DEFAULT_METRIC_NAME, HistogramSink, Observation, ObservationSink};
pub use request::Request;
pub use router::Router;
pub use server::Server;
pub use writer::{
    Conn, Flusher, Hijacked, Hijacker, PushOptions, Pusher, ReaderFrom, ResponseWriter,
};
