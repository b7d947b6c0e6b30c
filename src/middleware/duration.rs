//! Request-duration instrumentation.

use std::sync::Arc;
use std::time::Instant;

use tracing::trace;

use crate::delegator::new_delegator;
use crate::handler::{ErasedHandler, Handler};
use crate::middleware::labels::{sanitize_code, sanitize_method};
use crate::observe::{Observation, ObservationSink};
use crate::request::Request;
use crate::writer::ResponseWriter;

/// Wraps `next` so every call records one observation into `sink`.
///
/// The handler sees a writer with exactly the capabilities of the real one.
/// After it returns, the elapsed time is recorded with labels
/// `method`, `code` and `path` (see [`metrics_path`]). The handler's result is
/// passed through unchanged, errors included. A panicking handler is not
/// observed; the panic continues to the caller.
///
/// ```rust,no_run
/// use promux::{HistogramSink, Request, ResponseWriter, Router};
/// use promux::middleware::instrument_handler_duration;
///
/// fn get_item(w: &mut dyn ResponseWriter, _req: &Request) -> std::io::Result<()> {
///     w.write(b"{}")?;
///     Ok(())
/// }
///
/// let sink = HistogramSink::default();
/// let app = Router::new()
///     .get("/items/{id}", instrument_handler_duration(sink, get_item));
/// ```
pub fn instrument_handler_duration(sink: impl ObservationSink, next: impl Handler) -> impl Handler {
    let sink = Arc::new(sink);
    let next = next.into_boxed_handler();

    move |w: &mut dyn ResponseWriter, req: &Request| {
        let start = Instant::now();
        let mut d = new_delegator(w, None);
        let result = next.call(d.as_writer(), req);

        let observation = Observation {
            method: sanitize_method(req.method()),
            code: sanitize_code(d.status()),
            path: metrics_path(req).to_owned(),
            duration_seconds: start.elapsed().as_secs_f64(),
        };
        trace!(
            method = %observation.method,
            code = %observation.code,
            path = %observation.path,
            written = d.written(),
            seconds = observation.duration_seconds,
            "request observed"
        );
        sink.observe(&observation);
        result
    }
}

/// The `path` label for `req`: the matched route's template, or the raw
/// request URI when no route matched.
///
/// The fallback keeps unmatched requests visible, but every distinct URI then
/// gets its own series.
pub fn metrics_path(req: &Request) -> &str {
    req.route_template().unwrap_or_else(|| req.request_uri())
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::Mutex;

    use bytes::Bytes;
    use http::{HeaderMap, Method, Version};

    use super::*;
    use crate::capability::Capabilities;
    use crate::testing::MockWriter;

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<Observation>>);

    impl ObservationSink for RecordingSink {
        fn observe(&self, observation: &Observation) {
            self.0.lock().unwrap().push(observation.clone());
        }
    }

    impl RecordingSink {
        fn take(&self) -> Vec<Observation> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    fn request(method: Method, uri: &str, template: Option<&str>) -> Request {
        let uri = uri.parse().unwrap();
        Request::new(method, uri, Version::HTTP_11, HeaderMap::new(), Bytes::new())
            .with_route(template.map(Arc::from), Default::default())
    }

    fn call(handler: impl Handler, w: &mut dyn ResponseWriter, req: &Request) -> io::Result<()> {
        handler.into_boxed_handler().call(w, req)
    }

    #[test]
    fn records_route_template_status_and_method() {
        let sink = Arc::new(RecordingSink::default());
        let handler = instrument_handler_duration(
            Arc::clone(&sink),
            |w: &mut dyn ResponseWriter, _: &Request| {
                w.write_header(404);
                w.write(&[b'x'; 37]).map(drop)
            },
        );

        let mut real = MockWriter::<0>::new();
        let req = request(Method::GET, "/items/42", Some("/items/{id}"));
        call(handler, &mut real, &req).unwrap();

        let observed = sink.take();
        assert_eq!(observed.len(), 1);
        let obs = &observed[0];
        assert_eq!(obs.method, "get");
        assert_eq!(obs.code, "404");
        assert_eq!(obs.path, "/items/{id}");
        assert!(obs.duration_seconds >= 0.0);
        assert_eq!(real.body.len(), 37);
    }

    #[test]
    fn silent_handler_is_labelled_200() {
        let sink = Arc::new(RecordingSink::default());
        let handler = instrument_handler_duration(
            Arc::clone(&sink),
            |_: &mut dyn ResponseWriter, _: &Request| {},
        );

        let mut real = MockWriter::<0>::new();
        call(handler, &mut real, &request(Method::POST, "/items", Some("/items"))).unwrap();

        let observed = sink.take();
        assert_eq!(observed.len(), 1);
        assert_eq!(observed[0].code, "200");
        assert_eq!(observed[0].method, "post");
        assert!(real.calls.is_empty());
    }

    #[test]
    fn unmatched_request_falls_back_to_raw_uri() {
        let sink = Arc::new(RecordingSink::default());
        let handler = instrument_handler_duration(
            Arc::clone(&sink),
            |w: &mut dyn ResponseWriter, _: &Request| {
                w.write_header(404);
            },
        );

        let mut real = MockWriter::<0>::new();
        call(handler, &mut real, &request(Method::GET, "/nope/7?x=1", None)).unwrap();

        assert_eq!(sink.take()[0].path, "/nope/7?x=1");
    }

    #[test]
    fn repeated_commit_is_labelled_with_first_status() {
        let sink = Arc::new(RecordingSink::default());
        let handler = instrument_handler_duration(
            Arc::clone(&sink),
            |w: &mut dyn ResponseWriter, _: &Request| {
                w.write_header(201);
                w.write_header(500);
            },
        );

        let mut real = MockWriter::<0>::new();
        call(handler, &mut real, &request(Method::POST, "/items", Some("/items"))).unwrap();

        assert_eq!(sink.take()[0].code, "201");
    }

    #[test]
    fn handler_sees_real_writer_capabilities() {
        let sink = Arc::new(RecordingSink::default());
        let seen = Arc::new(Mutex::new(None));
        let seen_in_handler = Arc::clone(&seen);
        let handler = instrument_handler_duration(
            Arc::clone(&sink),
            move |w: &mut dyn ResponseWriter, _: &Request| {
                *seen_in_handler.lock().unwrap() = Some(Capabilities::detect(w));
                let mut body: &[u8] = b"streamed";
                w.as_reader_from().map(|rf| rf.read_from(&mut body)).transpose().map(drop)
            },
        );

        const STREAMING: u8 = Capabilities::FLUSHER.bits() | Capabilities::READER_FROM.bits();
        let mut real = MockWriter::<STREAMING>::new();
        call(handler, &mut real, &request(Method::GET, "/file", Some("/file"))).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            Some(Capabilities::FLUSHER | Capabilities::READER_FROM),
        );
        assert_eq!(real.body, b"streamed");
        assert_eq!(sink.take()[0].code, "200");
    }

    #[test]
    fn handler_errors_pass_through_after_observing() {
        let sink = Arc::new(RecordingSink::default());
        let handler = instrument_handler_duration(
            Arc::clone(&sink),
            |w: &mut dyn ResponseWriter, _: &Request| {
                w.write(b"partial").map(drop)
            },
        );

        let mut real = MockWriter::<0>::new();
        real.fail_writes = true;
        let err = call(handler, &mut real, &request(Method::GET, "/", Some("/"))).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(sink.take().len(), 1);
    }

    #[test]
    fn panicking_handler_is_not_observed() {
        let sink = Arc::new(RecordingSink::default());
        let handler = instrument_handler_duration(
            Arc::clone(&sink),
            |_: &mut dyn ResponseWriter, _: &Request| -> io::Result<()> {
                panic!("handler blew up")
            },
        );

        let mut real = MockWriter::<0>::new();
        let req = request(Method::GET, "/", Some("/"));
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| call(handler, &mut real, &req)));

        assert!(outcome.is_err());
        assert!(sink.take().is_empty());
    }

    #[test]
    fn custom_methods_are_lowercased() {
        let sink = Arc::new(RecordingSink::default());
        let handler = instrument_handler_duration(
            Arc::clone(&sink),
            |_: &mut dyn ResponseWriter, _: &Request| {},
        );

        let mut real = MockWriter::<0>::new();
        let method = Method::from_bytes(b"PATCH").unwrap();
        call(handler, &mut real, &request(method, "/items/1", Some("/items/{id}"))).unwrap();

        assert_eq!(sink.take()[0].method, "patch");
    }
}
