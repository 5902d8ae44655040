use axum::{
    Json,
    extract::{ConnectInfo, Query, State, rejection::QueryRejection},
};
use std::net::SocketAddr;
use std::sync::Arc;
use crate::error::AppError;
use crate::metrics::{RATE_LIMITED_TOTAL, REQUEST_TOTAL, TRACKED_CLIENTS};
use crate::models::{ElevationData, HeightQuery};
use crate::rate_limit::Decision;
use crate::state::AppState;

// GET /get_height?lat=..&lon=..
//
// The rate limit is checked before the query is looked at, so malformed
// requests still use up a slot.
pub async fn height_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<ElevationData>, AppError> {
    REQUEST_TOTAL.inc();

    let limiter = &state.rate_limiter;
    let decision = limiter.check(addr.ip());
    TRACKED_CLIENTS.set(limiter.tracked_clients() as f64);

    if let Decision::Rejected { limit, retry_after } = decision {
        RATE_LIMITED_TOTAL.inc();
        tracing::warn!(client = %addr.ip(), limit, "Rate limit exceeded");
        return Err(AppError::RateLimited {
            limit,
            window: limiter.window(),
            retry_after,
        });
    }

    let Query(pairs) = query.map_err(|_| AppError::InvalidCoordinates)?;
    let query = HeightQuery::from_pairs(pairs);
    let lat = parse_coordinate(query.lat.as_deref())?;
    let lon = parse_coordinate(query.lon.as_deref())?;

    let data = state.geoid.fetch(lat, lon).await?;
    tracing::debug!(lat, lon, "Elevation lookup succeeded");

    Ok(Json(data))
}

fn parse_coordinate(raw: Option<&str>) -> Result<f64, AppError> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .ok_or(AppError::InvalidCoordinates)
}
