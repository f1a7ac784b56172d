//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use searchparty_core::{
    record_sample, HeatmapAggregator, HeatmapPoint, ParticipantId, Party, PartyId, Position,
    PresenceMerger, PresenceView, SearchArea, SearchError, StoreError, Timestamp,
};

use crate::auth::Caller;
use crate::AppState;

type ApiResult<T> = Result<T, (StatusCode, String)>;

/// Map core errors onto HTTP status codes
fn api_error(err: SearchError) -> (StatusCode, String) {
    let status = match &err {
        SearchError::InvalidPosition(_)
        | SearchError::InvalidWindow(_)
        | SearchError::FutureTimestamp { .. } => StatusCode::BAD_REQUEST,
        SearchError::Store(StoreError::DuplicateSample { .. }) => StatusCode::CONFLICT,
        SearchError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        SearchError::NotAuthenticated => StatusCode::UNAUTHORIZED,
        SearchError::NotFound(_) => StatusCode::NOT_FOUND,
        SearchError::Acquire(_) | SearchError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::warn!("request failed: {}", err);
    }
    (status, err.to_string())
}

/// Look up a party the caller belongs to (as creator or participant)
async fn member_party(
    state: &AppState,
    party_id: &PartyId,
    caller: &ParticipantId,
) -> ApiResult<Party> {
    let party = state
        .directory
        .get_party(party_id)
        .await
        .map_err(|e| api_error(e.into()))?
        .ok_or_else(|| api_error(SearchError::NotFound(format!("party {}", party_id))))?;

    if !(party.is_participant(caller) || &party.creator == caller) {
        return Err((
            StatusCode::FORBIDDEN,
            format!("{} is not a participant of {}", caller, party_id),
        ));
    }
    Ok(party)
}

/// Get the caller's presence view of a party
pub async fn get_presence(
    State(state): State<Arc<AppState>>,
    Path(party_id): Path<String>,
    Caller(caller): Caller,
) -> ApiResult<Json<PresenceView>> {
    let party_id = PartyId::from(party_id);
    member_party(&state, &party_id, &caller).await?;

    let view = PresenceMerger::new(Arc::clone(&state.store))
        .merge(&party_id, &caller)
        .await
        .map_err(api_error)?;
    Ok(Json(view))
}

/// Query parameters for the heatmap endpoint
#[derive(Debug, Deserialize)]
pub struct HeatmapQuery {
    /// Decay window; the configured default when omitted
    pub window_ms: Option<i64>,
}

/// Heatmap overlay for one caller at one instant
#[derive(Debug, Serialize, Deserialize)]
pub struct HeatmapResponse {
    pub party_id: PartyId,
    pub window_ms: i64,
    pub generated_at: Timestamp,
    pub points: Vec<HeatmapPoint>,
}

/// Get the decay-weighted heatmap for a party
pub async fn get_heatmap(
    State(state): State<Arc<AppState>>,
    Path(party_id): Path<String>,
    Query(query): Query<HeatmapQuery>,
    Caller(caller): Caller,
) -> ApiResult<Json<HeatmapResponse>> {
    let window_ms = query.window_ms.unwrap_or(state.config.heatmap.window_ms);
    let window = chrono::Duration::try_milliseconds(window_ms)
        .ok_or_else(|| api_error(SearchError::InvalidWindow(window_ms)))?;
    let party_id = PartyId::from(party_id);
    member_party(&state, &party_id, &caller).await?;
    let now = state.clock.now();

    let points = HeatmapAggregator::from_config(Arc::clone(&state.store), &state.config.heatmap)
        .aggregate(&party_id, &caller, window, now)
        .await
        .map_err(api_error)?;

    Ok(Json(HeatmapResponse {
        party_id,
        window_ms,
        generated_at: now,
        points,
    }))
}

/// Position report from a participant's device
#[derive(Debug, Deserialize)]
pub struct PositionUpdate {
    pub latitude: f64,
    pub longitude: f64,
    /// Device capture time; server time when omitted
    pub timestamp: Option<i64>,
}

/// Acknowledgement of a recorded sample
#[derive(Debug, Serialize, Deserialize)]
pub struct PositionRecorded {
    pub participant: String,
    pub timestamp: Timestamp,
    /// Whether the position lies inside the party's search area
    pub in_search_area: bool,
}

/// Record a position sample for the caller
///
/// Only the caller's own records are written; the caller must be a member of
/// the party. Device capture times further ahead of server time than the
/// clock-skew tolerance are rejected.
pub async fn put_position(
    State(state): State<Arc<AppState>>,
    Path(party_id): Path<String>,
    Caller(caller): Caller,
    Json(update): Json<PositionUpdate>,
) -> ApiResult<(StatusCode, Json<PositionRecorded>)> {
    let position = Position::new(update.latitude, update.longitude).map_err(api_error)?;
    let party_id = PartyId::from(party_id);
    let party = member_party(&state, &party_id, &caller).await?;

    let now = state.clock.now();
    let timestamp = match update.timestamp {
        Some(millis) => Timestamp::from_millis(millis)
            .check_capture(now)
            .map_err(api_error)?,
        None => now,
    };

    record_sample(state.store.as_ref(), &party_id, &caller, position, timestamp)
        .await
        .map_err(|e| api_error(e.into()))?;

    let in_search_area = party.search_area().contains(&position);
    tracing::debug!(
        party = %party_id,
        participant = %caller,
        timestamp = timestamp.as_millis(),
        in_search_area,
        "position recorded"
    );

    Ok((
        StatusCode::CREATED,
        Json(PositionRecorded {
            participant: caller.to_string(),
            timestamp,
            in_search_area,
        }),
    ))
}

/// Search area as drawn on the map
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchAreaResponse {
    pub party_id: PartyId,
    pub area: SearchArea,
    pub radius_meters: f64,
}

/// Get the party's search area
pub async fn get_search_area(
    State(state): State<Arc<AppState>>,
    Path(party_id): Path<String>,
) -> ApiResult<Json<SearchAreaResponse>> {
    let party_id = PartyId::from(party_id);
    let party = state
        .directory
        .get_party(&party_id)
        .await
        .map_err(|e| api_error(e.into()))?
        .ok_or_else(|| api_error(SearchError::NotFound(format!("party {}", party_id))))?;

    let area = party.search_area();
    Ok(Json(SearchAreaResponse {
        party_id,
        radius_meters: area.radius_meters(),
        area,
    }))
}

/// Get server status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let now = state.clock.now();
    Json(serde_json::json!({
        "status": "ok",
        "version": searchparty_core::version(),
        "uptime_ms": state.started_at.age_at(now).max(0),
        "sampling_interval_ms": state.config.sampling.interval_ms,
        "heatmap_window_ms": state.config.heatmap.window_ms,
    }))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use axum::Router;
    use searchparty_core::{
        InMemoryPartyDirectory, LocationStore, ManualClock, PointCategory, SearchConfig,
        MAX_CLOCK_SKEW_MS,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::auth::PARTICIPANT_HEADER;
    use crate::create_router;

    const NOW: i64 = 1_700_000_000_000;

    fn test_state() -> Arc<AppState> {
        let directory = InMemoryPartyDirectory::new();
        directory.register(Party {
            id: PartyId::from("p1"),
            creator: ParticipantId::from("alice"),
            participants: BTreeSet::from([ParticipantId::from("alice"), ParticipantId::from("bob")]),
            start: Position::new(37.78825, -122.4324).unwrap(),
            search_radius_km: 2.0,
        });

        Arc::new(
            AppState::in_memory(SearchConfig::default(), Arc::new(directory))
                .with_clock(Arc::new(ManualClock::new(Timestamp::from_millis(NOW)))),
        )
    }

    fn get(uri: &str, who: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(PARTICIPANT_HEADER, who)
            .body(Body::empty())
            .unwrap()
    }

    fn put_json(uri: &str, who: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("PUT")
            .uri(uri)
            .header(PARTICIPANT_HEADER, who)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_status() {
        let app = create_router(test_state());
        let (status, body) = send(&app, get("/status", "alice")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_put_position_then_presence() {
        let state = test_state();
        let app = create_router(state.clone());

        let (status, body) = send(
            &app,
            put_json(
                "/parties/p1/position",
                "bob",
                serde_json::json!({ "latitude": 37.79, "longitude": -122.43 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["timestamp"], NOW);
        assert_eq!(body["in_search_area"], true);

        let (status, body) = send(&app, get("/parties/p1/presence", "alice")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["self"].is_null());
        assert_eq!(body["others"][0]["participant"], "bob");

        let history = state
            .store
            .query_history(&PartyId::from("p1"), Timestamp::from_millis(0), None)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_put_position_rejections() {
        let app = create_router(test_state());

        let (status, _) = send(
            &app,
            put_json(
                "/parties/p1/position",
                "bob",
                serde_json::json!({ "latitude": 120.0, "longitude": 0.0 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            put_json(
                "/parties/p1/position",
                "mallory",
                serde_json::json!({ "latitude": 1.0, "longitude": 1.0 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &app,
            put_json(
                "/parties/nope/position",
                "bob",
                serde_json::json!({ "latitude": 1.0, "longitude": 1.0 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_duplicate_sample_conflicts() {
        let app = create_router(test_state());
        let body = serde_json::json!({ "latitude": 1.0, "longitude": 1.0, "timestamp": NOW - 10 });

        let (status, _) = send(&app, put_json("/parties/p1/position", "bob", body.clone())).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = send(&app, put_json("/parties/p1/position", "bob", body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_missing_identity_is_unauthorized() {
        let app = create_router(test_state());
        let request = Request::builder()
            .uri("/parties/p1/presence")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_heatmap_window() {
        let app = create_router(test_state());
        for (who, age) in [("alice", 0), ("bob", 3_600_000), ("bob", 3_600_001)] {
            let (status, _) = send(
                &app,
                put_json(
                    "/parties/p1/position",
                    who,
                    serde_json::json!({ "latitude": 37.78, "longitude": -122.43, "timestamp": NOW - age }),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, body) = send(&app, get("/parties/p1/heatmap", "alice")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["window_ms"], 3_600_000);

        let points: Vec<HeatmapPoint> = serde_json::from_value(body["points"].clone()).unwrap();
        let own: Vec<_> = points.iter().filter(|p| p.category == PointCategory::Own).collect();
        let history: Vec<_> = points
            .iter()
            .filter(|p| p.category == PointCategory::History)
            .collect();
        assert_eq!(own.len(), 1);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].intensity, 0.8);
        assert_eq!(history[1].intensity, 0.1);

        let (status, _) = send(&app, get("/parties/p1/heatmap?window_ms=0", "alice")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_heatmap_window_out_of_range_is_bad_request() {
        let app = create_router(test_state());

        for window in [i64::MIN, -1] {
            let uri = format!("/parties/p1/heatmap?window_ms={}", window);
            let (status, _) = send(&app, get(&uri, "alice")).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }

        let uri = format!("/parties/p1/heatmap?window_ms={}", i64::MAX);
        let (status, _) = send(&app, get(&uri, "alice")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_future_capture_time_rejected() {
        let state = test_state();
        let app = create_router(state.clone());
        let year_ms: i64 = 365 * 24 * 3_600_000;

        let (status, _) = send(
            &app,
            put_json(
                "/parties/p1/position",
                "bob",
                serde_json::json!({ "latitude": 1.0, "longitude": 1.0, "timestamp": NOW + 1_000 * year_ms }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            put_json(
                "/parties/p1/position",
                "bob",
                serde_json::json!({ "latitude": 1.0, "longitude": 1.0, "timestamp": NOW + MAX_CLOCK_SKEW_MS }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let history = state
            .store
            .query_history(&PartyId::from("p1"), Timestamp::from_millis(0), None)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].timestamp.as_millis(), NOW + MAX_CLOCK_SKEW_MS);

        let (_, body) = send(&app, get("/parties/p1/heatmap", "alice")).await;
        let points: Vec<HeatmapPoint> = serde_json::from_value(body["points"].clone()).unwrap();
        let history: Vec<_> = points
            .iter()
            .filter(|p| p.category == PointCategory::History)
            .collect();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].intensity, 0.8);
    }

    #[tokio::test]
    async fn test_reads_require_membership() {
        let app = create_router(test_state());

        for uri in ["/parties/p1/presence", "/parties/p1/heatmap"] {
            let (status, _) = send(&app, get(uri, "mallory")).await;
            assert_eq!(status, StatusCode::FORBIDDEN);

            let (status, _) = send(&app, get(uri, "bob")).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, _) = send(&app, get("/parties/nope/presence", "alice")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_search_area() {
        let app = create_router(test_state());

        let (status, body) = send(&app, get("/parties/p1/area", "alice")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["radius_meters"], 2000.0);
        assert_eq!(body["area"]["center"]["latitude"], 37.78825);

        let (status, _) = send(&app, get("/parties/missing/area", "alice")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
