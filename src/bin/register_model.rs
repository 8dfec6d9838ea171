use adult_income::config::{self, RunIdResolver, Settings};
use adult_income::services::{MlflowClient, Registrar, RegistrationWait};
use std::error::Error;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let settings = Settings::load()?;
    adult_income::logging::init(&settings.logging);

    let run_id = RunIdResolver::standard(&settings.registrar.run_id_file).resolve()?;
    let model_name = config::registrar_model_name(&settings.registrar);

    let client = MlflowClient::new(
        settings.mlflow.tracking_uri.clone(),
        Duration::from_secs(settings.mlflow.timeout_secs),
    )?
    .with_registration_wait(RegistrationWait {
        timeout: Duration::from_secs(settings.registrar.await_registration_secs),
        poll_interval: Duration::from_millis(settings.registrar.poll_interval_ms),
    });

    tracing::info!("Using MLflow tracking server at {}", client.tracking_uri());

    let registrar = Registrar::new(client, &settings.registrar.stage, &settings.registrar.alias);
    let outcome = registrar.run(&run_id, &model_name).await?;

    tracing::info!(
        "Registered {} version {} ({}, alias '{}')",
        outcome.name,
        outcome.version,
        outcome.stage,
        outcome.alias
    );
    Ok(())
}
