//! Route table.

use crate::handlers::{self, json_response, PasswordRequest, StatusEnvelope};
use crate::SharedDesk;
use clientdesk_core::{AddClientRequest, SaveRequest};
use log::debug;
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

/// Upper bound for JSON request bodies.
const MAX_BODY_BYTES: u64 = 1024 * 1024;

fn with_desk(desk: SharedDesk) -> impl Filter<Extract = (SharedDesk,), Error = Infallible> + Clone {
    warp::any().map(move || desk.clone())
}

fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

/// All routes, with rejections rendered as JSON.
pub fn routes(desk: SharedDesk) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let index = warp::path::end()
        .and(warp::get())
        .and(with_desk(desk.clone()))
        .and_then(handlers::index);

    let save = warp::path!("save")
        .and(warp::post())
        .and(with_desk(desk.clone()))
        .and(json_body::<SaveRequest>())
        .and_then(handlers::save);

    let add_client = warp::path!("add_client")
        .and(warp::post())
        .and(with_desk(desk.clone()))
        .and(json_body::<AddClientRequest>())
        .and_then(handlers::add_client);

    let verify_password = warp::path!("verify_password")
        .and(warp::post())
        .and(with_desk(desk.clone()))
        .and(json_body::<PasswordRequest>())
        .and_then(handlers::verify_password);

    let get_clients = warp::path!("get_clients")
        .and(warp::get())
        .and(with_desk(desk.clone()))
        .and_then(handlers::get_clients);

    let get_fees = warp::path!("get_fees")
        .and(warp::get())
        .and(with_desk(desk.clone()))
        .and_then(handlers::get_fees);

    let get_custom_fees = warp::path!("get_custom_fees")
        .and(warp::get())
        .and(with_desk(desk.clone()))
        .and_then(handlers::get_custom_fees);

    let health = warp::path!("health")
        .and(warp::get())
        .and(with_desk(desk))
        .and_then(handlers::health);

    index
        .or(save)
        .or(add_client)
        .or(verify_password)
        .or(get_clients)
        .or(get_fees)
        .or(get_custom_fees)
        .or(health)
        .recover(handle_rejection)
        .with(warp::log("clientdesk_server::access"))
}

/// Renders a rejection as a failed status envelope.
async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_string())
    } else if let Some(body_err) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("invalid request body: {body_err}"))
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "request body too large".to_string())
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "content length required".to_string())
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "expected application/json".to_string(),
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "unhandled rejection".to_string(),
        )
    };
    debug!(
        "event=http_rejection module=server status=warn code={} message={}",
        status.as_u16(),
        message
    );
    Ok(json_response(&StatusEnvelope::failed(message), status))
}
