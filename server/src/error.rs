use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use push_engine::BoxError;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing caller identity")]
    Unauthenticated,

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("subscription not found")]
    NotFound,

    #[error(transparent)]
    Engine(#[from] push_engine::Error),

    #[error("subscription registry failed")]
    Registry(#[source] BoxError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        use push_engine::Error as E;

        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Engine(E::Forbidden) => StatusCode::FORBIDDEN,
            ApiError::Engine(E::PayloadTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Engine(E::InvalidClientKey | E::InvalidAuthSecret | E::InvalidEndpoint(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Engine(_) | ApiError::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // internal failures are logged here and never described to the client
        let message = if status.is_server_error() {
            match &self {
                ApiError::Engine(push_engine::Error::Registry(source)) | ApiError::Registry(source) => {
                    error!(error = %source, "subscription registry failed")
                }
                other => error!(error = %other, "request failed"),
            }
            "internal error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (ApiError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (ApiError::NotFound, StatusCode::NOT_FOUND),
            (push_engine::Error::Forbidden.into(), StatusCode::FORBIDDEN),
            (
                push_engine::Error::PayloadTooLarge { size: 5000, max: 3993 }.into(),
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (push_engine::Error::InvalidClientKey.into(), StatusCode::BAD_REQUEST),
            (
                push_engine::Error::Registry("disk on fire".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::Registry("disk on fire".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status(), expected, "{error:?}");
        }
    }
}
