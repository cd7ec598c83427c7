use anyhow::Result;
use murmur::app::App;
use murmur::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    tracing::info!("Starting murmur voice transcription daemon");

    // Load configuration
    let config = Config::load()?;
    config.validate()?;

    // Create LocalSet for !Send futures (needed for the Recorder, which
    // holds the cpal stream)
    let local = tokio::task::LocalSet::new();

    local
        .run_until(async move {
            let app = App::new(config).await?;
            app.run().await
        })
        .await
}
