use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use super::types::{CreateMatchRequest, DlsComputeRequest, MatchSummary, ReconcileRequest};
use crate::scoring::{DlsComputation, InningsSelector, MatchState};
use crate::shared::{AppError, AppState};
use crate::sync::ReconcileReport;

/// HTTP handler for liveness checks
///
/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

/// HTTP handler for opening a new match room
///
/// POST /matches
/// Returns the initial match state; the match id defaults to a v4 UUID
#[instrument(name = "create_match", skip(state, request))]
pub async fn create_match(
    State(state): State<AppState>,
    Json(request): Json<CreateMatchRequest>,
) -> Result<(StatusCode, Json<MatchState>), AppError> {
    let summary = state.registry.open_match(request).await?;
    let room = state.registry.require(&summary.match_id).await?;
    let match_state = room.state().await.map_err(AppError::from)?;

    info!(
        match_id = %summary.match_id,
        team_a = %summary.team_a,
        team_b = %summary.team_b,
        "Match created successfully"
    );

    Ok((StatusCode::CREATED, Json(match_state)))
}

/// HTTP handler for listing all live matches
///
/// GET /matches
/// Returns the full state snapshot of every live match
#[instrument(name = "list_matches", skip(state))]
pub async fn list_matches(
    State(state): State<AppState>,
) -> Result<Json<Vec<MatchState>>, AppError> {
    let summaries = state.registry.list().await;
    let mut states = Vec::with_capacity(summaries.len());
    for summary in &summaries {
        // A room retired between list and state is simply skipped
        if let Some(room) = state.registry.get(&summary.match_id).await {
            if let Ok(match_state) = room.state().await {
                states.push(match_state);
            }
        }
    }

    info!(match_count = states.len(), "Matches listed successfully");
    Ok(Json(states))
}

/// HTTP handler for one match's full state
///
/// GET /matches/{id}/state
#[instrument(name = "match_state", skip(state))]
pub async fn match_state(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Result<Json<MatchState>, AppError> {
    let room = state.registry.require(&match_id).await?;
    let match_state = room.state().await.map_err(AppError::from)?;
    Ok(Json(match_state))
}

fn parse_selector(token: &str) -> Result<InningsSelector, AppError> {
    InningsSelector::try_from(token)
        .map_err(|t| AppError::BadRequest(format!("Unknown innings selector: {t}")))
}

/// HTTP handler for marking an innings completed
///
/// POST /matches/{id}/innings/{selector}/complete
#[instrument(name = "complete_innings", skip(state))]
pub async fn complete_innings(
    State(state): State<AppState>,
    Path((match_id, selector)): Path<(String, String)>,
) -> Result<Json<MatchState>, AppError> {
    let selector = parse_selector(&selector)?;
    let room = state.registry.require(&match_id).await?;
    let match_state = room
        .complete_innings(selector)
        .await
        .map_err(AppError::from)?;

    info!(match_id = %match_id, innings = %selector, "Innings completed");
    Ok(Json(match_state))
}

/// HTTP handler for resetting an innings
///
/// POST /matches/{id}/reset/{selector}
/// Destructive operator action; not reachable through undo
#[instrument(name = "reset_innings", skip(state))]
pub async fn reset_innings(
    State(state): State<AppState>,
    Path((match_id, selector)): Path<(String, String)>,
) -> Result<Json<MatchState>, AppError> {
    let selector = parse_selector(&selector)?;
    let room = state.registry.require(&match_id).await?;
    let match_state = room.reset_innings(selector).await.map_err(AppError::from)?;

    info!(match_id = %match_id, innings = %selector, "Innings reset");
    Ok(Json(match_state))
}

/// HTTP handler for an on-demand DLS target revision
///
/// POST /matches/{id}/dls
/// Interruptions are adjudicated by match control; this only computes
#[instrument(name = "compute_dls", skip(state, request))]
pub async fn compute_dls(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Json(request): Json<DlsComputeRequest>,
) -> Result<Json<DlsComputation>, AppError> {
    if request.overs_at_start <= 0.0 {
        return Err(AppError::BadRequest(
            "overs_at_start must be positive".to_string(),
        ));
    }
    if request.overs_remaining < 0.0 || request.overs_remaining > request.overs_at_start {
        return Err(AppError::BadRequest(
            "overs_remaining must lie between 0 and overs_at_start".to_string(),
        ));
    }
    if request.wickets_lost > 10 {
        return Err(AppError::BadRequest(
            "wickets_lost cannot exceed 10".to_string(),
        ));
    }

    let room = state.registry.require(&match_id).await?;
    let computation = room
        .compute_dls(
            request.overs_at_start,
            request.overs_remaining,
            request.wickets_lost,
        )
        .await
        .map_err(AppError::from)?;
    Ok(Json(computation))
}

/// HTTP handler for replaying an offline scorer's queue
///
/// POST /matches/{id}/reconcile
/// First-reconciled-wins: a queue that diverges from the live log is
/// stopped at the first conflicting ball and answered 409, with the
/// already-accepted prefix listed; nothing is auto-merged.
#[instrument(name = "reconcile", skip(state, request), fields(balls = request.balls.len()))]
pub async fn reconcile(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Json(request): Json<ReconcileRequest>,
) -> Result<(StatusCode, Json<ReconcileReport>), AppError> {
    let room = state.registry.require(&match_id).await?;
    let report = room
        .reconcile(request.balls)
        .await
        .map_err(AppError::from)?;

    let client_id = request.client_id.as_deref().unwrap_or("unknown");
    if report.is_clean() {
        info!(
            match_id = %match_id,
            client_id = %client_id,
            accepted = report.accepted.len(),
            "Offline queue reconciled"
        );
        Ok((StatusCode::OK, Json(report)))
    } else {
        info!(
            match_id = %match_id,
            client_id = %client_id,
            accepted = report.accepted.len(),
            "Offline queue diverged; surfacing conflict for manual adjudication"
        );
        Ok((StatusCode::CONFLICT, Json(report)))
    }
}

/// HTTP handler for retiring a finished match's room
///
/// POST /matches/{id}/retire
/// Stored balls and snapshots remain readable after the room stops
#[instrument(name = "retire_match", skip(state))]
pub async fn retire_match(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Result<Json<MatchSummary>, AppError> {
    let room = state.registry.require(&match_id).await?;
    let summary = room.summary();
    state.registry.retire(&match_id).await?;
    Ok(Json(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::AppStateBuilder;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::{get, post},
        Router,
    };
    use tower::ServiceExt; // for `oneshot`

    fn app(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/matches", post(create_match).get(list_matches))
            .route("/matches/:id/state", get(match_state))
            .route(
                "/matches/:id/innings/:selector/complete",
                post(complete_innings),
            )
            .route("/matches/:id/reset/:selector", post(reset_innings))
            .route("/matches/:id/dls", post(compute_dls))
            .route("/matches/:id/reconcile", post(reconcile))
            .route("/matches/:id/retire", post(retire_match))
            .with_state(state)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const CREATE_BODY: &str =
        r#"{"match_id": "m1", "team_a": "Kingston CC", "team_b": "Harbour XI", "total_overs": 50}"#;

    #[tokio::test]
    async fn test_create_match_returns_initial_state() {
        let app = app(AppStateBuilder::new().build());

        let response = app.oneshot(post_json("/matches", CREATE_BODY)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let state = body_json(response).await;
        assert_eq!(state["config"]["match_id"], "m1");
        assert_eq!(state["innings"][0]["status"], "not-started");
        assert_eq!(state["can_undo"], false);
    }

    #[tokio::test]
    async fn test_duplicate_match_conflicts() {
        let state = AppStateBuilder::new().build();
        let app = app(state);

        let first = app
            .clone()
            .oneshot(post_json("/matches", CREATE_BODY))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app.oneshot(post_json("/matches", CREATE_BODY)).await.unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_list_and_state_round_trip() {
        let state = AppStateBuilder::new().build();
        let app = app(state);

        app.clone()
            .oneshot(post_json("/matches", CREATE_BODY))
            .await
            .unwrap();

        let list = app.clone().oneshot(get_req("/matches")).await.unwrap();
        assert_eq!(list.status(), StatusCode::OK);
        let listed = body_json(list).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let one = app.oneshot(get_req("/matches/m1/state")).await.unwrap();
        assert_eq!(one.status(), StatusCode::OK);
        let state = body_json(one).await;
        assert_eq!(state["config"]["total_overs"], 50);
    }

    #[tokio::test]
    async fn test_unknown_match_is_404() {
        let app = app(AppStateBuilder::new().build());
        let response = app.oneshot(get_req("/matches/ghost/state")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_complete_innings_and_bad_selector() {
        let state = AppStateBuilder::new().build();
        let app = app(state);
        app.clone()
            .oneshot(post_json("/matches", CREATE_BODY))
            .await
            .unwrap();

        let done = app
            .clone()
            .oneshot(post_json("/matches/m1/innings/first/complete", "{}"))
            .await
            .unwrap();
        assert_eq!(done.status(), StatusCode::OK);
        let state = body_json(done).await;
        assert_eq!(state["innings"][0]["status"], "completed");

        let bad = app
            .oneshot(post_json("/matches/m1/innings/third/complete", "{}"))
            .await
            .unwrap();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_dls_validates_inputs() {
        let state = AppStateBuilder::new().build();
        let app = app(state);
        app.clone()
            .oneshot(post_json("/matches", CREATE_BODY))
            .await
            .unwrap();

        let ok = app
            .clone()
            .oneshot(post_json(
                "/matches/m1/dls",
                r#"{"overs_at_start": 50, "overs_remaining": 25, "wickets_lost": 3}"#,
            ))
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);
        let computation = body_json(ok).await;
        assert!(computation["revised_target"].as_u64().unwrap() >= 1);

        let bad = app
            .oneshot(post_json(
                "/matches/m1/dls",
                r#"{"overs_at_start": 50, "overs_remaining": 60, "wickets_lost": 3}"#,
            ))
            .await
            .unwrap();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_reconcile_conflict_is_409_with_report() {
        let state = AppStateBuilder::new().build();
        let app = app(state);
        app.clone()
            .oneshot(post_json("/matches", CREATE_BODY))
            .await
            .unwrap();

        // Second ball claims slot 0.3, but the live log will be at 0.2
        let body = serde_json::json!({
            "client_id": "scorer-7",
            "balls": [
                {
                    "ball_id": uuid::Uuid::new_v4(),
                    "seq": 0, "over": 0, "ball_in_over": 1,
                    "innings": "first",
                    "call": { "input": "4" },
                    "recorded_at": chrono::Utc::now()
                },
                {
                    "ball_id": uuid::Uuid::new_v4(),
                    "seq": 1, "over": 0, "ball_in_over": 3,
                    "innings": "first",
                    "call": { "input": "0" },
                    "recorded_at": chrono::Utc::now()
                }
            ]
        });

        let response = app
            .oneshot(post_json("/matches/m1/reconcile", &body.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let report = body_json(response).await;
        assert_eq!(report["accepted"].as_array().unwrap().len(), 1);
        assert!(report["conflict"].is_object());
    }

    #[tokio::test]
    async fn test_retire_then_state_is_404() {
        let state = AppStateBuilder::new().build();
        let app = app(state);
        app.clone()
            .oneshot(post_json("/matches", CREATE_BODY))
            .await
            .unwrap();

        let retired = app
            .clone()
            .oneshot(post_json("/matches/m1/retire", "{}"))
            .await
            .unwrap();
        assert_eq!(retired.status(), StatusCode::OK);

        let gone = app.oneshot(get_req("/matches/m1/state")).await.unwrap();
        assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    }
}
