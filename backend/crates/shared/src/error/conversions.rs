//! Error rendering - HTTP response for [`AppError`]
//!
//! Every rejection behind the gateway uses the same JSON shape:
//! `{"status": false, "message": ..., "error": KIND, "action": ...}`.

#[cfg(feature = "axum")]
use super::app_error::AppError;

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;
        use axum::http::StatusCode;

        if self.is_server_error() {
            tracing::error!(error = ?self, "Request failed with server error");
        }

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Sources stay in the log line above
        let body = serde_json::json!({
            "status": false,
            "message": self.message(),
            "error": self.kind(),
            "action": self.action(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(all(test, feature = "axum"))]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn test_rendered_status() {
        let res = AppError::bad_request("Invalid date").into_response();
        assert_eq!(res.status().as_u16(), 400);

        let res = AppError::service_unavailable("Settings unavailable").into_response();
        assert_eq!(res.status().as_u16(), 503);
    }
}
