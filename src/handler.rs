//! Handler trait and type erasure.
//!
//! # Shape of a handler
//!
//! A handler writes its response through a [`ResponseWriter`] instead of
//! returning one. That keeps streaming, bulk copies and the other optional
//! writer capabilities available to the handler, and it lets middleware wrap
//! the writer without the handler noticing:
//!
//! ```text
//! fn get_item(w: &mut dyn ResponseWriter, req: &Request)   ← user writes this
//!        ↓ router.get("/items/{id}", get_item)
//! get_item.into_boxed_handler()                           ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(get_item))                           ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(w, &req)  at request time                  ← one vtable dispatch
//! ```
//!
//! Handlers are synchronous. The server runs each request's handler on the
//! blocking pool, so a handler may block on I/O the same way its writer does.

use std::io;
use std::sync::Arc;

use crate::request::Request;
use crate::writer::ResponseWriter;

// ── Internal types ────────────────────────────────────────────────────────────

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, w: &mut dyn ResponseWriter, req: &Request) -> io::Result<()>;
}

/// A heap-allocated, type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// function or closure with the signature:
///
/// ```text
/// fn name(w: &mut dyn ResponseWriter, req: &Request) -> impl IntoHandlerResult
/// ```
///
/// The trait is **sealed**: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

/// What a handler may return: nothing, or an I/O result from its writes.
///
/// An `Err` is logged by the server. The status the handler already committed
/// (if any) still stands; the server does not rewrite the response.
pub trait IntoHandlerResult {
    fn into_handler_result(self) -> io::Result<()>;
}

impl IntoHandlerResult for () {
    fn into_handler_result(self) -> io::Result<()> { Ok(()) }
}

impl IntoHandlerResult for io::Result<()> {
    fn into_handler_result(self) -> io::Result<()> { self }
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, R> private::Sealed for F
where
    F: Fn(&mut dyn ResponseWriter, &Request) -> R + Send + Sync + 'static,
    R: IntoHandlerResult,
{
}

impl<F, R> Handler for F
where
    F: Fn(&mut dyn ResponseWriter, &Request) -> R + Send + Sync + 'static,
    R: IntoHandlerResult,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Newtype wrapper that holds a concrete handler `F` and implements
/// [`ErasedHandler`], bridging the typed world to the trait-object world.
struct FnHandler<F>(F);

impl<F, R> ErasedHandler for FnHandler<F>
where
    F: Fn(&mut dyn ResponseWriter, &Request) -> R + Send + Sync,
    R: IntoHandlerResult,
{
    fn call(&self, w: &mut dyn ResponseWriter, req: &Request) -> io::Result<()> {
        (self.0)(w, req).into_handler_result()
    }
}

// ── Built-in handlers ─────────────────────────────────────────────────────────

/// The router's default fallback: `404` with a short plain-text body.
pub(crate) fn not_found(w: &mut dyn ResponseWriter, _req: &Request) -> io::Result<()> {
    w.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    w.write_header(404);
    w.write(b"404 page not found\n")?;
    Ok(())
}
