//! Status/byte tracking wrappers that keep the wrapped writer's shape.
//!
//! # Why sixteen shapes
//!
//! A wrapper that always advertised all four optional capabilities would lie
//! to callers probing for them; one that advertised none would silently
//! disable the fast paths a real writer offers. So the wrapper must have
//! *exactly* the capabilities of the writer it wraps.
//!
//! With four independent capabilities there are sixteen possible shapes. Each
//! one is a monomorphization of `Shaped`, whose probes are decided by a
//! const mask at compile time. A static table maps the detected mask to the
//! constructor for that shape:
//!
//! ```text
//! Capabilities::detect(w)           ← probe the real writer once
//!        ↓ mask (0..16)
//! PICK_DELEGATOR[mask](base)        ← one table lookup, built at compile time
//!        ↓
//! Box<dyn Delegator>                ← probes answer exactly as `w` would
//! ```
//!
//! Every facet routes through [`TrackingBase`], so the status is observed
//! once and bytes are counted no matter which method the handler calls first.

use std::io;

use http::HeaderMap;

use crate::capability::Capabilities;
use crate::writer::{Flusher, Hijacked, Hijacker, PushOptions, Pusher, ReaderFrom, ResponseWriter};

/// Called with the status code the first time the header is committed.
pub type ObserveWriteHeader<'w> = Box<dyn FnMut(u16) + 'w>;

/// A response writer that also reports what passed through it.
pub trait Delegator: ResponseWriter {
    /// The first committed status code, or `0` if none was committed yet.
    fn status(&self) -> u16;

    /// Total body bytes the underlying writer accepted.
    fn written(&self) -> u64;

    /// This delegator as a plain writer, ready to hand to a handler.
    fn as_writer(&mut self) -> &mut dyn ResponseWriter;
}

// ── Tracking base ─────────────────────────────────────────────────────────────

/// The minimal wrapper: mandatory contract plus status and byte tracking.
///
/// Owned by a single request flow; never shared, so no locking.
pub struct TrackingBase<'w> {
    inner: &'w mut dyn ResponseWriter,
    status: u16,
    written: u64,
    wrote_header: bool,
    observe_write_header: Option<ObserveWriteHeader<'w>>,
}

impl<'w> TrackingBase<'w> {
    pub fn new(
        inner: &'w mut dyn ResponseWriter,
        observe_write_header: Option<ObserveWriteHeader<'w>>,
    ) -> Self {
        Self { inner, status: 0, written: 0, wrote_header: false, observe_write_header }
    }

    /// Body bytes without a committed header imply `200 OK`.
    fn commit_implicit(&mut self) {
        if !self.wrote_header {
            self.write_header(200);
        }
    }
}

impl ResponseWriter for TrackingBase<'_> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write_header(&mut self, code: u16) {
        // A second commit is a handler bug. Only the first is recorded, but
        // every call reaches the underlying writer.
        if !self.wrote_header {
            if let Some(observe) = self.observe_write_header.as_mut() {
                observe(code);
            }
            self.status = code;
            self.wrote_header = true;
        }
        self.inner.write_header(code);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.commit_implicit();
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }
}

impl Delegator for TrackingBase<'_> {
    fn status(&self) -> u16 {
        self.status
    }

    fn written(&self) -> u64 {
        self.written
    }

    fn as_writer(&mut self) -> &mut dyn ResponseWriter {
        self
    }
}

// ── Shaped wrappers ───────────────────────────────────────────────────────────

/// A tracking base that advertises the capabilities set in `MASK`.
struct Shaped<'w, const MASK: u8> {
    base: TrackingBase<'w>,
}

impl<const MASK: u8> Shaped<'_, MASK> {
    fn exposes(cap: Capabilities) -> bool {
        Capabilities::from_bits_retain(MASK).contains(cap)
    }
}

fn missing(capability: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("underlying response writer does not support {capability}"),
    )
}

impl<const MASK: u8> ResponseWriter for Shaped<'_, MASK> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.base.headers_mut()
    }

    fn write_header(&mut self, code: u16) {
        self.base.write_header(code);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.base.write(buf)
    }

    fn as_flusher(&mut self) -> Option<&mut dyn Flusher> {
        if Self::exposes(Capabilities::FLUSHER) { Some(self) } else { None }
    }

    fn as_hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        if Self::exposes(Capabilities::HIJACKER) { Some(self) } else { None }
    }

    fn as_reader_from(&mut self) -> Option<&mut dyn ReaderFrom> {
        if Self::exposes(Capabilities::READER_FROM) { Some(self) } else { None }
    }

    fn as_pusher(&mut self) -> Option<&mut dyn Pusher> {
        if Self::exposes(Capabilities::PUSHER) { Some(self) } else { None }
    }
}

impl<const MASK: u8> Delegator for Shaped<'_, MASK> {
    fn status(&self) -> u16 {
        self.base.status
    }

    fn written(&self) -> u64 {
        self.base.written
    }

    fn as_writer(&mut self) -> &mut dyn ResponseWriter {
        self
    }
}

impl<const MASK: u8> Flusher for Shaped<'_, MASK> {
    fn flush(&mut self) -> io::Result<()> {
        self.base.commit_implicit();
        self.base.inner.as_flusher().ok_or_else(|| missing("flush"))?.flush()
    }
}

impl<const MASK: u8> Hijacker for Shaped<'_, MASK> {
    fn hijack(&mut self) -> io::Result<Hijacked> {
        self.base.inner.as_hijacker().ok_or_else(|| missing("hijack"))?.hijack()
    }
}

impl<const MASK: u8> ReaderFrom for Shaped<'_, MASK> {
    fn read_from(&mut self, src: &mut dyn io::Read) -> io::Result<u64> {
        self.base.commit_implicit();
        let n = self
            .base
            .inner
            .as_reader_from()
            .ok_or_else(|| missing("read_from"))?
            .read_from(src)?;
        self.base.written += n;
        Ok(n)
    }
}

impl<const MASK: u8> Pusher for Shaped<'_, MASK> {
    fn push(&mut self, target: &str, opts: &PushOptions) -> io::Result<()> {
        self.base.inner.as_pusher().ok_or_else(|| missing("push"))?.push(target, opts)
    }
}

// ── Composition ───────────────────────────────────────────────────────────────

type Constructor = for<'w> fn(TrackingBase<'w>) -> Box<dyn Delegator + 'w>;

fn bare<'w>(base: TrackingBase<'w>) -> Box<dyn Delegator + 'w> {
    Box::new(base)
}

fn shaped<'w, const MASK: u8>(base: TrackingBase<'w>) -> Box<dyn Delegator + 'w> {
    Box::new(Shaped::<MASK> { base })
}

/// Mask → constructor. Index 0 needs no facets, so it is the base itself.
static PICK_DELEGATOR: [Constructor; 16] = [
    bare,
    shaped::<1>,
    shaped::<2>,
    shaped::<3>,
    shaped::<4>,
    shaped::<5>,
    shaped::<6>,
    shaped::<7>,
    shaped::<8>,
    shaped::<9>,
    shaped::<10>,
    shaped::<11>,
    shaped::<12>,
    shaped::<13>,
    shaped::<14>,
    shaped::<15>,
];

/// Wraps `base` in the shape that advertises exactly `caps`.
///
/// # Panics
///
/// Panics if `caps` has bits outside the four known capabilities. Masks from
/// [`Capabilities::detect`] never do.
pub fn compose<'w>(base: TrackingBase<'w>, caps: Capabilities) -> Box<dyn Delegator + 'w> {
    let construct = Capabilities::from_bits(caps.bits())
        .and_then(|known| PICK_DELEGATOR.get(usize::from(known.bits())).copied())
        .unwrap_or_else(|| panic!("invalid capability mask {caps:?}: no delegator shape"));
    construct(base)
}

/// Detects `inner`'s capabilities and wraps it in the matching delegator.
pub fn new_delegator<'w>(
    inner: &'w mut dyn ResponseWriter,
    observe_write_header: Option<ObserveWriteHeader<'w>>,
) -> Box<dyn Delegator + 'w> {
    let caps = Capabilities::detect(inner);
    compose(TrackingBase::new(inner, observe_write_header), caps)
}
