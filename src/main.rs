use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use adult_income::config::Settings;
use adult_income::core::ModelState;
use adult_income::metrics::Metrics;
use adult_income::routes::{self, AppState, ServiceInfo};
use adult_income::services::{MlflowClient, ModelLoader};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    adult_income::logging::init(&settings.logging);

    info!("Starting Adult Income prediction API...");

    let metrics = Metrics::new().map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    let client = Arc::new(
        MlflowClient::new(
            settings.mlflow.tracking_uri.clone(),
            Duration::from_secs(settings.mlflow.timeout_secs),
        )
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?,
    );

    // A failed load leaves the service up in the unavailable state
    let model = match ModelLoader::new(client)
        .load(&settings.model.name, &settings.model.alias)
        .await
    {
        Ok(model) => {
            info!(
                "Model loaded successfully from models:/{}@{} (version {}, {})",
                model.name,
                model.alias,
                model.version,
                model.flavor()
            );
            ModelState::loaded(model)
        }
        Err(e) => {
            error!("Error loading model: {}", e);
            ModelState::unavailable(e.to_string())
        }
    };

    let app_state = AppState {
        model,
        metrics,
        info: ServiceInfo {
            model_name: settings.model.name.clone(),
            model_alias: settings.model.alias.clone(),
            mlflow_uri: settings.mlflow.tracking_uri.clone(),
        },
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(routes::json_config())
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
