use crate::app_error::{AuthError, ErrorCode};
use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let code = self.code();
        let status = status_for(&self);

        // Log the error before it gets converted into a status response.
        if status.is_server_error() {
            tracing::error!(error = ?self, code = code.as_str(), "Login failed");
        } else {
            tracing::info!(error = %self, code = code.as_str(), "Login denied");
        }

        match self {
            AuthError::InputParamInvalid(msg) => error_resp(status, code, Some(msg)),
            AuthError::UserCreditNotInCurrentRegion { authoritative, .. } => {
                error_resp(status, code, Some(authoritative))
            }
            _ => error_resp(status, code, None),
        }
    }
}

fn status_for(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InputParamInvalid(_) => StatusCode::BAD_REQUEST,
        AuthError::UserCenterConfNotFound(_) => StatusCode::NOT_FOUND,
        AuthError::OldToken | AuthError::AuthTokenFromUserCenterFailed => StatusCode::UNAUTHORIZED,
        AuthError::UserCreditNotInCurrentRegion { .. } => StatusCode::CONFLICT,
        AuthError::ReadRedisFailed(_)
        | AuthError::ReadDbFailed(_)
        | AuthError::RegionLookupFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::WriteDbFailed(_) | AuthError::WriteRedisFailed(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: Option<String>) -> Response {
    let body = match message {
        Some(msg) => serde_json::json!({ "code": code.as_str(), "message": msg }),
        None => serde_json::json!({ "code": code.as_str() }),
    };
    (status, Json(body)).into_response()
}
