// Route exports
pub mod api;

use crate::models::ErrorResponse;
use actix_web::{error, http::StatusCode, web, HttpRequest, HttpResponse};

pub use api::{AppState, ServiceInfo};

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(api::configure);
}

/// JSON extractor settings used by the service
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(handle_json_payload_error)
}

/// Error carried to the HTTP boundary as `{"detail": ...}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.detail)
    }
}

impl std::error::Error for ApiError {}

impl error::ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status).json(ErrorResponse::new(self.detail.clone()))
    }
}

/// Reject bodies that do not match the request schema before the handler runs
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);

    let status = match &err {
        error::JsonPayloadError::Overflow { .. } | error::JsonPayloadError::OverflowKnownLength { .. } => {
            StatusCode::PAYLOAD_TOO_LARGE
        }
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };

    if let Some(state) = req.app_data::<web::Data<AppState>>() {
        state
            .metrics
            .record_request(req.method().as_str(), req.path(), status.as_u16());
    }

    ApiError::new(status, format!("Invalid request body: {}", err)).into()
}
