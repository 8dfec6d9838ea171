use crate::core::ModelState;
use crate::metrics::Metrics;
use crate::models::{HealthResponse, PredictionInput, PredictionResponse, RootResponse};
use crate::routes::ApiError;
use actix_web::{web, HttpResponse};
use std::time::Instant;

pub const API_TITLE: &str = "Adult Income Prediction API";
pub const API_VERSION: &str = "1.0.0";

/// Configuration echoed by the health endpoint
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub model_name: String,
    pub model_alias: String,
    pub mlflow_uri: String,
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub model: ModelState,
    pub metrics: Metrics,
    pub info: ServiceInfo,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/", web::get().to(root))
        .route("/health", web::get().to(health))
        .route("/predict", web::post().to(predict))
        .route("/metrics", web::get().to(metrics));
}

async fn root(state: web::Data<AppState>) -> HttpResponse {
    state.metrics.record_request("GET", "/", 200);

    HttpResponse::Ok().json(RootResponse {
        message: API_TITLE.to_string(),
        version: API_VERSION.to_string(),
        status: "healthy".to_string(),
        model_loaded: state.model.is_loaded(),
    })
}

/// Reports model availability and the registry coordinates it was loaded from
async fn health(state: web::Data<AppState>) -> HttpResponse {
    let start = Instant::now();
    let loaded = state.model.is_loaded();

    let response = HealthResponse {
        status: if loaded { "healthy" } else { "unhealthy" }.to_string(),
        model_loaded: loaded,
        model_name: state.info.model_name.clone(),
        model_alias: state.info.model_alias.clone(),
        mlflow_uri: state.info.mlflow_uri.clone(),
    };

    state
        .metrics
        .observe_latency("GET", "/health", start.elapsed().as_secs_f64());
    state.metrics.record_request("GET", "/health", 200);

    HttpResponse::Ok().json(response)
}

/// Classify one record
///
/// POST /predict
///
/// Request body: the 14 census fields, e.g.
/// ```json
/// {
///   "age": 39, "workclass": "State-gov", "fnlwgt": 77516,
///   "education": "Bachelors", "education_num": 13,
///   "marital_status": "Never-married", "occupation": "Adm-clerical",
///   "relationship": "Not-in-family", "race": "White", "sex": "Male",
///   "capital_gain": 2174, "capital_loss": 0, "hours_per_week": 40,
///   "native_country": "United-States"
/// }
/// ```
async fn predict(
    state: web::Data<AppState>,
    input: web::Json<PredictionInput>,
) -> Result<HttpResponse, ApiError> {
    let start = Instant::now();

    let model = match state.model.model() {
        Some(model) => model,
        None => {
            state.metrics.record_request("POST", "/predict", 500);
            return Err(ApiError::internal("Model not loaded"));
        }
    };

    match model.predict(&input) {
        Ok((prediction, class)) => {
            state.metrics.record_prediction();

            let latency = start.elapsed().as_secs_f64();
            state.metrics.observe_latency("POST", "/predict", latency);
            state.metrics.record_request("POST", "/predict", 200);

            tracing::debug!("Predicted {} ({}) in {:.4}s", prediction, class, latency);

            Ok(HttpResponse::Ok().json(PredictionResponse {
                prediction,
                prediction_label: class.label().to_string(),
                latency_seconds: (latency * 10_000.0).round() / 10_000.0,
            }))
        }
        Err(e) => {
            tracing::error!("Prediction failed with model {} v{}: {}", model.name, model.version, e);
            state.metrics.record_request("POST", "/predict", 500);
            Err(ApiError::internal(e.to_string()))
        }
    }
}

/// Prometheus exposition; not counted in the request metrics
async fn metrics(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let body = state.metrics.gather().map_err(|e| {
        tracing::error!("Failed to encode metrics: {}", e);
        ApiError::internal(e.to_string())
    })?;

    Ok(HttpResponse::Ok()
        .content_type(state.metrics.content_type())
        .body(body))
}
