use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::admin::error::ControlError;
use crate::http::server::AppState;
use crate::http::upstream::parse_upstream;

/// Body shape of every control command, in both directions.
#[derive(Debug, Serialize, Deserialize)]
pub struct ControlValue<T> {
    pub value: T,
}

pub async fn handle_command(
    State(state): State<AppState>,
    Path(command): Path<String>,
    method: Method,
    body: Bytes,
) -> Result<Response, ControlError> {
    tracing::debug!(command = %command, method = %method, "Proxy control command");
    match command.as_str() {
        "enabled" => enabled(&state, &method, &body),
        "selenium_address" => selenium_address(&state, &method, &body),
        _ => Err(ControlError::UnknownCommand),
    }
}

fn enabled(state: &AppState, method: &Method, body: &[u8]) -> Result<Response, ControlError> {
    match *method {
        Method::GET => {
            let value = state.stability.as_ref().is_some_and(|s| s.is_enabled());
            Ok(Json(ControlValue { value }).into_response())
        }
        Method::POST => {
            let stability = state
                .stability
                .as_ref()
                .ok_or(ControlError::StabilityUnavailable)?;
            let request: ControlValue<bool> = serde_json::from_slice(body)?;
            stability.set_enabled(request.value);
            Ok(StatusCode::OK.into_response())
        }
        _ => Err(ControlError::InvalidMethod),
    }
}

fn selenium_address(
    state: &AppState,
    method: &Method,
    body: &[u8],
) -> Result<Response, ControlError> {
    match *method {
        Method::GET => {
            let value = state.upstream.get().to_string();
            Ok(Json(ControlValue { value }).into_response())
        }
        Method::POST => {
            let request: ControlValue<String> = serde_json::from_slice(body)?;
            state.upstream.set(parse_upstream(&request.value)?);
            Ok(StatusCode::OK.into_response())
        }
        _ => Err(ControlError::InvalidMethod),
    }
}
