//! Request handlers.
//!
//! Every handler tags its log lines with a fresh `request_id` and runs the
//! desk call on the blocking pool.

use crate::render;
use crate::SharedDesk;
use clientdesk_core::logging::sanitize_message;
use clientdesk_core::{AddClientRequest, DeskService, SaveRequest, ServiceError};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Instant;
use uuid::Uuid;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::Reply;

const MAX_LOGGED_ERROR_CHARS: usize = 200;

/// Envelope returned by mutating routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEnvelope {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusEnvelope {
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: "failed".to_string(),
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PasswordRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordCheck {
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthBody {
    pub status: String,
    pub backend: String,
    pub store_reachable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clients: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Runs `op` against the desk on the blocking pool.
///
/// A panic inside `op` surfaces as `Err` with the join error text.
async fn run_blocking<T, F>(desk: SharedDesk, op: F) -> Result<T, String>
where
    F: FnOnce(&DeskService) -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || op(&desk))
        .await
        .map_err(|err| err.to_string())
}

pub fn json_response<T: Serialize>(body: &T, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(body), status).into_response()
}

fn log_ok(route: &str, request_id: Uuid, started: Instant) {
    info!(
        "event=http_request module=server status=ok route={} request_id={} duration_ms={}",
        route,
        request_id,
        started.elapsed().as_millis()
    );
}

fn log_failure(route: &str, request_id: Uuid, started: Instant, err: &str) {
    error!(
        "event=http_request module=server status=error route={} request_id={} duration_ms={} error={}",
        route,
        request_id,
        started.elapsed().as_millis(),
        sanitize_message(err, MAX_LOGGED_ERROR_CHARS)
    );
}

/// Maps a mutating call's result to the status envelope.
fn envelope_for<T>(
    route: &str,
    request_id: Uuid,
    started: Instant,
    result: Result<Result<T, ServiceError>, String>,
) -> StatusEnvelope {
    match result {
        Ok(Ok(_)) => {
            log_ok(route, request_id, started);
            StatusEnvelope::success()
        }
        Ok(Err(ServiceError::Unauthorized)) => {
            warn!(
                "event=http_request module=server status=warn route={} request_id={} reason=unauthorized",
                route, request_id
            );
            StatusEnvelope::failed(ServiceError::Unauthorized.to_string())
        }
        Ok(Err(err)) => {
            let message = err.to_string();
            log_failure(route, request_id, started, &message);
            StatusEnvelope::failed(message)
        }
        Err(join_err) => {
            log_failure(route, request_id, started, &join_err);
            StatusEnvelope::failed("internal server error")
        }
    }
}

pub async fn index(desk: SharedDesk) -> Result<Response, Infallible> {
    let request_id = Uuid::new_v4();
    let started = Instant::now();
    let response = match run_blocking(desk, |desk| desk.overview()).await {
        Ok(Ok(overview)) => {
            log_ok("index", request_id, started);
            warp::reply::html(render::index_page(&overview)).into_response()
        }
        Ok(Err(err)) => {
            let message = err.to_string();
            log_failure("index", request_id, started, &message);
            warp::reply::with_status(
                warp::reply::html(render::error_page(&message)),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
            .into_response()
        }
        Err(join_err) => {
            log_failure("index", request_id, started, &join_err);
            warp::reply::with_status(
                warp::reply::html(render::error_page("internal server error")),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
            .into_response()
        }
    };
    Ok(response)
}

pub async fn save(desk: SharedDesk, request: SaveRequest) -> Result<Response, Infallible> {
    let request_id = Uuid::new_v4();
    let started = Instant::now();
    let result = run_blocking(desk, move |desk| desk.save(&request)).await;
    let envelope = envelope_for("save", request_id, started, result);
    Ok(json_response(&envelope, StatusCode::OK))
}

pub async fn add_client(
    desk: SharedDesk,
    request: AddClientRequest,
) -> Result<Response, Infallible> {
    let request_id = Uuid::new_v4();
    let started = Instant::now();
    let result = run_blocking(desk, move |desk| desk.add_client(&request)).await;
    let envelope = envelope_for("add_client", request_id, started, result);
    Ok(json_response(&envelope, StatusCode::OK))
}

pub async fn verify_password(
    desk: SharedDesk,
    request: PasswordRequest,
) -> Result<Response, Infallible> {
    let request_id = Uuid::new_v4();
    let started = Instant::now();
    let valid = match run_blocking(desk, move |desk| desk.verify_password(&request.password)).await
    {
        Ok(valid) => valid,
        Err(join_err) => {
            log_failure("verify_password", request_id, started, &join_err);
            false
        }
    };
    info!(
        "event=http_request module=server status=ok route=verify_password request_id={} valid={}",
        request_id, valid
    );
    Ok(json_response(&PasswordCheck { valid }, StatusCode::OK))
}

/// Shared shape of the JSON read routes.
async fn read_json<T, F>(route: &'static str, desk: SharedDesk, op: F) -> Result<Response, Infallible>
where
    F: FnOnce(&DeskService) -> Result<T, ServiceError> + Send + 'static,
    T: Serialize + Send + 'static,
{
    let request_id = Uuid::new_v4();
    let started = Instant::now();
    let failure = match run_blocking(desk, op).await {
        Ok(Ok(body)) => {
            log_ok(route, request_id, started);
            return Ok(json_response(&body, StatusCode::OK));
        }
        Ok(Err(err)) => err.to_string(),
        Err(join_err) => join_err,
    };
    log_failure(route, request_id, started, &failure);
    Ok(json_response(
        &ErrorBody { message: failure },
        StatusCode::INTERNAL_SERVER_ERROR,
    ))
}

pub async fn get_clients(desk: SharedDesk) -> Result<Response, Infallible> {
    read_json("get_clients", desk, |desk| desk.client_names()).await
}

pub async fn get_fees(desk: SharedDesk) -> Result<Response, Infallible> {
    read_json("get_fees", desk, |desk| desk.fee_schedule()).await
}

pub async fn get_custom_fees(desk: SharedDesk) -> Result<Response, Infallible> {
    read_json("get_custom_fees", desk, |desk| desk.custom_fees()).await
}

pub async fn health(desk: SharedDesk) -> Result<Response, Infallible> {
    let body = match run_blocking(desk, |desk| desk.health()).await {
        Ok(report) => HealthBody {
            status: (if report.store_reachable { "ok" } else { "degraded" }).to_string(),
            backend: report.backend.to_string(),
            store_reachable: report.store_reachable,
            clients: report.client_count,
            message: report.message,
        },
        Err(join_err) => HealthBody {
            status: "degraded".to_string(),
            backend: "unknown".to_string(),
            store_reachable: false,
            clients: None,
            message: Some(join_err),
        },
    };
    let status = if body.store_reachable {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    Ok(json_response(&body, status))
}
