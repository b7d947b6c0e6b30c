//! Middleware layer.
//!
//! Middleware wraps a [`Handler`](crate::Handler) and returns a handler of the
//! same shape, so it composes transparently in a route registration:
//!
//! ```rust,no_run
//! # use promux::{HistogramSink, Request, ResponseWriter, Router};
//! # use promux::middleware::instrument_handler_duration;
//! # fn list_items(_: &mut dyn ResponseWriter, _: &Request) {}
//! let app = Router::new()
//!     .get("/items", instrument_handler_duration(HistogramSink::default(), list_items));
//! ```
//!
//! Built-in middleware:
//! - [`instrument_handler_duration`] — per-request latency labelled by
//!   method, status code and route template

mod duration;
mod labels;

pub use duration::{instrument_handler_duration, metrics_path};
pub use labels::{sanitize_code, sanitize_method};
