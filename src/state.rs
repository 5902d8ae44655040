use std::net::IpAddr;
use std::sync::Arc;
use crate::geoid::GeoidClient;
use crate::rate_limit::RateLimiter;
// app's shared state

pub struct AppState {
    pub geoid: GeoidClient,
    pub rate_limiter: Arc<RateLimiter<IpAddr>>, // per client IP
}
