use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("geoid_requests_total", "Total number of height requests").unwrap();
    pub static ref RATE_LIMITED_TOTAL: Counter =
        register_counter!("geoid_rate_limited_total", "Requests rejected by the rate limiter").unwrap();
    pub static ref UPSTREAM_FAILURES: Counter =
        register_counter!("geoid_upstream_failures_total", "Failed upstream lookups").unwrap();
    pub static ref UPSTREAM_LATENCY: Histogram = register_histogram!(
        "geoid_upstream_latency_seconds",
        "Upstream lookup latency in seconds"
    )
    .unwrap();
    pub static ref TRACKED_CLIENTS: Gauge =
        register_gauge!("geoid_tracked_clients", "Client identities held by the rate limiter").unwrap();
}
