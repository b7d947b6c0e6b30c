//! Minimal promux example: instrumented JSON endpoints, a streaming endpoint
//! and a Prometheus scrape endpoint.
//!
//! Run with:
//!   RUST_LOG=promux=debug,info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/items/42
//!   curl -X POST http://localhost:3000/items -d '{"name":"bolt"}'
//!   curl -N http://localhost:3000/events
//!   curl http://localhost:3000/nope
//!   curl http://localhost:3000/metrics

use std::io;
use std::thread;
use std::time::Duration;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use promux::middleware::instrument_handler_duration;
use promux::{HistogramSink, Request, ResponseWriter, Router, Server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install prometheus recorder");
    let latency = HistogramSink::default();
    latency.describe();

    let app = Router::new()
        .get("/items/{id}", instrument_handler_duration(latency.clone(), get_item))
        .post("/items", instrument_handler_duration(latency.clone(), create_item))
        .delete("/items/{id}", instrument_handler_duration(latency.clone(), delete_item))
        .get("/events", instrument_handler_duration(latency.clone(), events))
        .not_found(instrument_handler_duration(latency, not_found))
        .get("/metrics", move |w: &mut dyn ResponseWriter, _: &Request| scrape(&prometheus, w));

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

// GET /items/{id}
fn get_item(w: &mut dyn ResponseWriter, req: &Request) -> io::Result<()> {
    let id = req.param("id").unwrap_or("unknown");
    w.headers_mut().insert("content-type", "application/json".parse().unwrap());
    w.write(format!(r#"{{"id":"{id}","name":"bolt"}}"#).as_bytes())?;
    Ok(())
}

// POST /items → 201, or 400 on an empty body
fn create_item(w: &mut dyn ResponseWriter, req: &Request) -> io::Result<()> {
    if req.body().is_empty() {
        w.write_header(400);
        return Ok(());
    }
    w.headers_mut().insert("location", "/items/99".parse().unwrap());
    w.write_header(201);
    w.write(br#"{"id":"99"}"#)?;
    Ok(())
}

// DELETE /items/{id} → 204 No Content
fn delete_item(w: &mut dyn ResponseWriter, _req: &Request) {
    w.write_header(204);
}

// GET /events: server-sent events, flushed one at a time when possible
fn events(w: &mut dyn ResponseWriter, _req: &Request) -> io::Result<()> {
    w.headers_mut().insert("content-type", "text/event-stream".parse().unwrap());
    for n in 0..5 {
        w.write(format!("data: tick {n}\n\n").as_bytes())?;
        if let Some(f) = w.as_flusher() {
            f.flush()?;
        }
        thread::sleep(Duration::from_millis(200));
    }
    Ok(())
}

// Unmatched requests are still observed, labelled with their raw URI.
fn not_found(w: &mut dyn ResponseWriter, _req: &Request) -> io::Result<()> {
    w.write_header(404);
    w.write(b"no such thing\n")?;
    Ok(())
}

// GET /metrics: served uninstrumented so scrapes do not skew latency
fn scrape(prometheus: &PrometheusHandle, w: &mut dyn ResponseWriter) -> io::Result<()> {
    w.headers_mut().insert("content-type", "text/plain; version=0.0.4".parse().unwrap());
    w.write(prometheus.render().as_bytes())?;
    Ok(())
}
