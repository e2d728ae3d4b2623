use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Rejections produced by the gate
#[derive(Debug, thiserror::Error)]
pub enum GateRejection {
    /// Credential missing or invalid; detail stays in the logs
    #[error("Unauthorized")]
    Unauthorized,

    /// Decision does not cover the requested method and path
    #[error("Forbidden: {0} not permitted")]
    Forbidden(String),
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        match self {
            GateRejection::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()).into_response(),
            GateRejection::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_is_opaque() {
        assert_eq!(GateRejection::Unauthorized.to_string(), "Unauthorized");
        let response = GateRejection::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_forbidden_status() {
        let err = GateRejection::Forbidden("DELETE /messages/1".to_string());
        assert!(err.to_string().contains("DELETE /messages/1"));
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }
}
