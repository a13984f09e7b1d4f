use anyhow::Result;
use prload_harness::{Config, LoadRunner};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prload_harness=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "target {}, ramp {:?}, peak {} actors",
        config.base_url,
        config.ramp_duration(),
        config.peak_actors()
    );

    let runner = LoadRunner::new(config.clone());
    let results = runner.run().await?;

    results.print_summary(&config.thresholds);
    println!("JSON: {}", results.to_json(&config.thresholds));

    if !results.meets_thresholds(&config.thresholds) {
        std::process::exit(1);
    }
    Ok(())
}
