//! Extractors whose rejections use the API's JSON error body.
//!
//! Axum's stock `Json`/`Query`/`String` extractors answer malformed input with a
//! plain-text 400/415/422. These wrappers run the same extraction and map any
//! rejection to `400 validation_error`, keeping `413` for oversized bodies.

use axum::async_trait;
use axum::extract::rejection::{JsonRejection, QueryRejection, StringRejection};
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::{request::Parts, StatusCode};
use axum::response::Response;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::app::errors;

/// JSON request body.
pub struct ApiJson<T>(pub T);

/// Query string.
pub struct ApiQuery<T>(pub T);

/// UTF-8 text body (CSV uploads).
pub struct TextBody(pub String);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => Err(query_rejection(rejection)),
        }
    }
}

#[async_trait]
impl<S> FromRequest<S> for TextBody
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match String::from_request(req, state).await {
            Ok(body) => Ok(TextBody(body)),
            Err(rejection) => Err(text_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> Response {
    rejection_response(rejection.status(), rejection.body_text())
}

fn query_rejection(rejection: QueryRejection) -> Response {
    rejection_response(rejection.status(), rejection.body_text())
}

fn text_rejection(rejection: StringRejection) -> Response {
    rejection_response(rejection.status(), rejection.body_text())
}

fn rejection_response(status: StatusCode, message: String) -> Response {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        return errors::json_error(status, "payload_too_large", message);
    }
    tracing::debug!(status = status.as_u16(), error = %message, "rejected request input");
    errors::json_error(StatusCode::BAD_REQUEST, "validation_error", message)
}
