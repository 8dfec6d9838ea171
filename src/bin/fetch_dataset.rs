use adult_income::config::Settings;
use adult_income::services::DatasetFetcher;
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let settings = Settings::load()?;
    adult_income::logging::init(&settings.logging);

    let fetcher = DatasetFetcher::adult(
        &settings.dataset.dir,
        &settings.dataset.data_url,
        &settings.dataset.test_url,
    )?;

    fetcher.fetch_all().await?;
    Ok(())
}
