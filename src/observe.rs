//! Where finished-request observations go.
//!
//! The instrumentation produces one [`Observation`] per request and hands it
//! to an [`ObservationSink`]. Aggregation and export are the sink's business.
//! [`HistogramSink`] forwards to the [`metrics`] facade, so whichever recorder
//! the process installed (Prometheus, StatsD, …) receives it.

use std::borrow::Cow;
use std::sync::Arc;

use metrics::{describe_histogram, histogram, Unit};

/// Default name of the request-latency histogram.
pub const DEFAULT_METRIC_NAME: &str = "http_request_duration_seconds";

/// One finished request: its labels and how long the handler took.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    pub method: Cow<'static, str>,
    pub code: Cow<'static, str>,
    pub path: String,
    pub duration_seconds: f64,
}

/// Receives one observation per instrumented request.
///
/// Called concurrently from every request in flight; implementations provide
/// their own synchronization.
pub trait ObservationSink: Send + Sync + 'static {
    fn observe(&self, observation: &Observation);
}

impl<S: ObservationSink + ?Sized> ObservationSink for Arc<S> {
    fn observe(&self, observation: &Observation) {
        (**self).observe(observation);
    }
}

/// Records observations into a `metrics` histogram labelled `method`, `code`
/// and `path`.
#[derive(Clone, Debug)]
pub struct HistogramSink {
    name: &'static str,
}

impl HistogramSink {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }

    /// Registers the histogram's unit and help text with the installed
    /// recorder. Call once after installing it.
    pub fn describe(&self) {
        describe_histogram!(
            self.name,
            Unit::Seconds,
            "Time spent in the HTTP handler, by method, status code and route."
        );
    }
}

impl Default for HistogramSink {
    fn default() -> Self {
        Self::new(DEFAULT_METRIC_NAME)
    }
}

impl ObservationSink for HistogramSink {
    fn observe(&self, observation: &Observation) {
        let labels = [
            ("method", observation.method.to_string()),
            ("code", observation.code.to_string()),
            ("path", observation.path.clone()),
        ];
        histogram!(self.name, &labels).record(observation.duration_seconds);
    }
}
