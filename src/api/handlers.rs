//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use tracing::{info, warn};

use crate::state::AppState;
use super::responses::{ApiResponse, HealthResponse, StatusResponse, TimerStatus};

type ControlResult = Result<Json<ApiResponse>, (StatusCode, Json<ApiResponse>)>;

/// Handle POST /pause - Freeze the countdown
pub async fn pause_handler(State(state): State<Arc<AppState>>) -> ControlResult {
    let timer = TimerStatus::from(state.pause());

    if timer.finished {
        return Ok(Json(ApiResponse::inactive(
            "Countdown already finished".to_string(),
            timer,
        )));
    }

    info!("Pause endpoint called - {}ms left", timer.time_left_ms);
    Ok(Json(ApiResponse::paused("Countdown paused".to_string(), timer)))
}

/// Handle POST /resume - Continue the countdown from where it was paused
pub async fn resume_handler(State(state): State<Arc<AppState>>) -> ControlResult {
    let timer = TimerStatus::from(state.resume());

    if timer.cancelled {
        warn!("Resume endpoint called on a cancelled countdown");
        return Err((
            StatusCode::CONFLICT,
            Json(ApiResponse::error(
                "Countdown was cancelled and cannot be resumed".to_string(),
                timer,
            )),
        ));
    }
    if timer.finished {
        return Ok(Json(ApiResponse::inactive(
            "Countdown already finished".to_string(),
            timer,
        )));
    }

    info!("Resume endpoint called - {}ms left", timer.time_left_ms);
    Ok(Json(ApiResponse::running("Countdown resumed".to_string(), timer)))
}

/// Handle POST /cancel - Stop all further callbacks
pub async fn cancel_handler(State(state): State<Arc<AppState>>) -> ControlResult {
    let timer = TimerStatus::from(state.cancel());

    info!("Cancel endpoint called - {}ms were left", timer.time_left_ms);
    Ok(Json(ApiResponse::inactive("Countdown cancelled".to_string(), timer)))
}

/// Handle GET /status - Return current countdown status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let progress = state.get_timer_state();
    let (last_action, last_action_time) = state.get_last_action();

    Json(StatusResponse {
        timer: TimerStatus::from(state.timer.snapshot()),
        ticks: progress.ticks,
        last_tick_remaining_ms: progress.last_tick_remaining_ms,
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    })
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
