//! The response-writer contract and its optional capabilities.
//!
//! Every handler receives a `&mut dyn ResponseWriter`. The mandatory surface is
//! small: headers, status, body bytes. Anything beyond that is an *optional
//! capability* expressed as its own trait:
//!
//! | Capability | Trait | What it buys the caller |
//! |---|---|---|
//! | Streaming flush | [`Flusher`] | push buffered bytes to the client now |
//! | Hijack | [`Hijacker`] | take over the raw connection |
//! | Bulk copy | [`ReaderFrom`] | hand the writer a whole source to drain |
//! | Server push | [`Pusher`] | HTTP/2 push promise |
//!
//! # Probing
//!
//! There is no reflection to ask "does this writer also implement `Flusher`?",
//! so the question is part of the contract. Each `as_*` probe defaults to
//! `None`; a writer that really has the capability overrides the probe to
//! return itself:
//!
//! ```rust
//! use std::io;
//! use promux::{Flusher, ResponseWriter};
//! # use http::HeaderMap;
//!
//! struct Chunked { headers: HeaderMap }
//!
//! impl ResponseWriter for Chunked {
//!     fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }
//!     fn write_header(&mut self, _code: u16) {}
//!     fn write(&mut self, buf: &[u8]) -> io::Result<usize> { Ok(buf.len()) }
//!     fn as_flusher(&mut self) -> Option<&mut dyn Flusher> { Some(self) }
//! }
//!
//! impl Flusher for Chunked {
//!     fn flush(&mut self) -> io::Result<()> { Ok(()) }
//! }
//! ```
//!
//! Callers then pick the fast path only when it exists:
//!
//! ```rust,ignore
//! if let Some(f) = w.as_flusher() {
//!     f.flush()?;
//! }
//! ```

use std::io;

use bytes::Bytes;
use http::{HeaderMap, Method};

/// The mandatory contract every response writer implements.
pub trait ResponseWriter {
    /// The response header map. Changes after the status is committed are
    /// not guaranteed to reach the client.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Commits the response status.
    fn write_header(&mut self, code: u16);

    /// Writes body bytes, returning how many the writer accepted.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    fn as_flusher(&mut self) -> Option<&mut dyn Flusher> {
        None
    }

    fn as_hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        None
    }

    fn as_reader_from(&mut self) -> Option<&mut dyn ReaderFrom> {
        None
    }

    fn as_pusher(&mut self) -> Option<&mut dyn Pusher> {
        None
    }
}

/// Sends any buffered body bytes to the client immediately.
pub trait Flusher {
    fn flush(&mut self) -> io::Result<()>;
}

/// Takes the underlying connection away from the HTTP server.
///
/// After a successful hijack the server no longer touches the connection;
/// the caller owns reading, writing and closing it.
pub trait Hijacker {
    fn hijack(&mut self) -> io::Result<Hijacked>;
}

/// Drains `src` into the response body, returning the number of bytes moved.
pub trait ReaderFrom {
    fn read_from(&mut self, src: &mut dyn io::Read) -> io::Result<u64>;
}

/// Initiates an HTTP/2 server push for `target`.
pub trait Pusher {
    fn push(&mut self, target: &str, opts: &PushOptions) -> io::Result<()>;
}

/// A raw, bidirectional connection handed out by [`Hijacker::hijack`].
pub trait Conn: io::Read + io::Write + Send {}

impl<T: io::Read + io::Write + Send> Conn for T {}

/// The result of a hijack: the raw connection plus any bytes the server had
/// already read from it but not yet consumed.
pub struct Hijacked {
    pub conn: Box<dyn Conn>,
    pub buffered: Bytes,
}

/// Options for a server push. Defaults to a bodiless `GET` with no extra
/// headers.
#[derive(Clone, Debug)]
pub struct PushOptions {
    pub method: Method,
    pub headers: HeaderMap,
}

impl Default for PushOptions {
    fn default() -> Self {
        Self { method: Method::GET, headers: HeaderMap::new() }
    }
}
