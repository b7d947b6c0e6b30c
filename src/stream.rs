//! The server's response writer: a hyper response streamed from a handler
//! running on the blocking pool.
//!
//! ```text
//! handler thread                         connection task
//! ──────────────                         ───────────────
//! write_header(code) ── head (oneshot) ──→ dispatch returns http::Response
//! write / flush      ── frames (mpsc)  ──→ ChannelBody::poll_frame → hyper
//! finish / drop      ── close / abort  ──→ end of body
//! ```
//!
//! The body channel holds at most `BODY_FRAMES` frames. A handler writing
//! faster than the client reads blocks its thread until hyper catches up, so
//! a bulk [`ReaderFrom::read_from`] never pulls more of its source than that
//! into memory.
//!
//! The writer supports [`Flusher`] and [`ReaderFrom`]. It does not offer
//! hijacking or server push: hyper exposes neither to code that is still
//! producing the response, so advertising them would be a lie.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use http_body::{Body, Frame};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, warn};

use crate::writer::{Flusher, ReaderFrom, ResponseWriter};

/// Buffered body bytes are sent once they reach this size.
const FLUSH_THRESHOLD: usize = 4 * 1024;

/// Frame size for [`ReaderFrom::read_from`] transfers.
const COPY_CHUNK: usize = 16 * 1024;

/// Body frames queued ahead of the client before writes block.
const BODY_FRAMES: usize = 16;

type Chunk = io::Result<Bytes>;

/// Creates a writer plus the two ends the connection task listens on: the
/// response head, sent once the status is committed, and the body.
pub(crate) fn channel() -> (StreamingWriter, oneshot::Receiver<http::Response<()>>, ChannelBody) {
    let (head_tx, head_rx) = oneshot::channel();
    let (body_tx, body_rx) = mpsc::channel(BODY_FRAMES);
    let writer = StreamingWriter {
        headers: HeaderMap::new(),
        head_tx: Some(head_tx),
        committed: false,
        buf: BytesMut::new(),
        body_tx,
        finished: false,
    };
    (writer, head_rx, ChannelBody { rx: Some(body_rx) })
}

pub(crate) struct StreamingWriter {
    headers: HeaderMap,
    head_tx: Option<oneshot::Sender<http::Response<()>>>,
    committed: bool,
    buf: BytesMut,
    body_tx: mpsc::Sender<Chunk>,
    finished: bool,
}

fn client_gone() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "client closed the response stream")
}

impl StreamingWriter {
    fn commit_implicit(&mut self) {
        if !self.committed {
            self.write_header(200);
        }
    }

    /// Queues one frame, waiting while the channel is full.
    ///
    /// Must run off the async workers; the server calls handlers on the
    /// blocking pool.
    fn send(&self, chunk: Bytes) -> io::Result<()> {
        self.body_tx.blocking_send(Ok(chunk)).map_err(|_| client_gone())
    }

    fn send_buffered(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = self.buf.split().freeze();
        self.send(chunk)
    }

    /// Completes the response after the handler returned.
    pub(crate) fn finish(mut self) {
        self.commit_implicit();
        // The client may be gone already; nothing is left to tell.
        let _ = self.send_buffered();
        self.finished = true;
    }
}

impl ResponseWriter for StreamingWriter {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, code: u16) {
        if self.committed {
            warn!(code, "superfluous write_header call");
            return;
        }
        self.committed = true;

        let status = StatusCode::from_u16(code).unwrap_or_else(|_| {
            error!(code, "invalid status code, responding 500");
            StatusCode::INTERNAL_SERVER_ERROR
        });
        let mut head = http::Response::new(());
        *head.status_mut() = status;
        *head.headers_mut() = self.headers.clone();
        if let Some(tx) = self.head_tx.take() {
            let _ = tx.send(head);
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.commit_implicit();
        if self.body_tx.is_closed() {
            return Err(client_gone());
        }
        self.buf.extend_from_slice(buf);
        if self.buf.len() >= FLUSH_THRESHOLD {
            self.send_buffered()?;
        }
        Ok(buf.len())
    }

    fn as_flusher(&mut self) -> Option<&mut dyn Flusher> {
        Some(self)
    }

    fn as_reader_from(&mut self) -> Option<&mut dyn ReaderFrom> {
        Some(self)
    }
}

impl Flusher for StreamingWriter {
    fn flush(&mut self) -> io::Result<()> {
        self.commit_implicit();
        self.send_buffered()
    }
}

impl ReaderFrom for StreamingWriter {
    fn read_from(&mut self, src: &mut dyn io::Read) -> io::Result<u64> {
        self.commit_implicit();
        self.send_buffered()?;

        let mut total = 0u64;
        loop {
            let mut chunk = vec![0; COPY_CHUNK];
            let n = match src.read(&mut chunk) {
                Ok(0) => return Ok(total),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            chunk.truncate(n);
            self.send(Bytes::from(chunk))?;
            total += n as u64;
        }
    }
}

impl Drop for StreamingWriter {
    fn drop(&mut self) {
        // Dropped without `finish`: the handler panicked. Abort the body so
        // the client sees a broken response rather than a truncated one.
        if !self.finished {
            let abort = Err(io::Error::other("handler did not complete the response"));
            if let Err(TrySendError::Full(abort)) = self.body_tx.try_send(abort) {
                let _ = self.body_tx.blocking_send(abort);
            }
        }
    }
}

// ── Body ──────────────────────────────────────────────────────────────────────

/// Response body fed by a [`StreamingWriter`].
pub(crate) struct ChannelBody {
    rx: Option<mpsc::Receiver<Chunk>>,
}

impl ChannelBody {
    pub(crate) fn empty() -> Self {
        Self { rx: None }
    }
}

impl Body for ChannelBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, io::Error>>> {
        match self.get_mut().rx.as_mut() {
            Some(rx) => rx.poll_recv(cx).map(|next| next.map(|chunk| chunk.map(Frame::data))),
            None => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        self.rx.is_none()
    }
}
