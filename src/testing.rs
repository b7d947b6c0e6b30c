//! Test doubles shared by the unit tests.

use std::io;

use bytes::Bytes;
use http::HeaderMap;

use crate::capability::Capabilities;
use crate::writer::{Flusher, Hijacked, Hijacker, PushOptions, Pusher, ReaderFrom, ResponseWriter};

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Call {
    WriteHeader(u16),
    Write(usize),
    Flush,
    Hijack,
    ReadFrom(u64),
    Push(String),
}

/// A writer that records every call and advertises exactly the capabilities
/// in `MASK`.
pub(crate) struct MockWriter<const MASK: u8> {
    pub headers: HeaderMap,
    pub calls: Vec<Call>,
    pub body: Vec<u8>,
    /// Accept at most this many bytes per `write`.
    pub max_write: Option<usize>,
    pub fail_writes: bool,
}

impl<const MASK: u8> MockWriter<MASK> {
    pub fn new() -> Self {
        Self {
            headers: HeaderMap::new(),
            calls: Vec::new(),
            body: Vec::new(),
            max_write: None,
            fail_writes: false,
        }
    }

    fn has(cap: Capabilities) -> bool {
        Capabilities::from_bits_retain(MASK).contains(cap)
    }
}

impl<const MASK: u8> ResponseWriter for MockWriter<MASK> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, code: u16) {
        self.calls.push(Call::WriteHeader(code));
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "client went away"));
        }
        let n = self.max_write.map_or(buf.len(), |max| max.min(buf.len()));
        self.body.extend_from_slice(&buf[..n]);
        self.calls.push(Call::Write(n));
        Ok(n)
    }

    fn as_flusher(&mut self) -> Option<&mut dyn Flusher> {
        if Self::has(Capabilities::FLUSHER) { Some(self) } else { None }
    }

    fn as_hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        if Self::has(Capabilities::HIJACKER) { Some(self) } else { None }
    }

    fn as_reader_from(&mut self) -> Option<&mut dyn ReaderFrom> {
        if Self::has(Capabilities::READER_FROM) { Some(self) } else { None }
    }

    fn as_pusher(&mut self) -> Option<&mut dyn Pusher> {
        if Self::has(Capabilities::PUSHER) { Some(self) } else { None }
    }
}

impl<const MASK: u8> Flusher for MockWriter<MASK> {
    fn flush(&mut self) -> io::Result<()> {
        self.calls.push(Call::Flush);
        Ok(())
    }
}

impl<const MASK: u8> Hijacker for MockWriter<MASK> {
    fn hijack(&mut self) -> io::Result<Hijacked> {
        self.calls.push(Call::Hijack);
        Ok(Hijacked { conn: Box::new(io::Cursor::new(Vec::new())), buffered: Bytes::new() })
    }
}

impl<const MASK: u8> ReaderFrom for MockWriter<MASK> {
    fn read_from(&mut self, src: &mut dyn io::Read) -> io::Result<u64> {
        let n = io::copy(src, &mut self.body)?;
        self.calls.push(Call::ReadFrom(n));
        Ok(n)
    }
}

impl<const MASK: u8> Pusher for MockWriter<MASK> {
    fn push(&mut self, target: &str, _opts: &PushOptions) -> io::Result<()> {
        self.calls.push(Call::Push(target.to_owned()));
        Ok(())
    }
}
