use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            "readme_meme=info,meme_job=info,meme_core=info,reddit_client=info,readme_patcher=info",
        )
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting readme-meme daily update");

    let outcome = meme_job::run_scheduled().await;
    if outcome.is_failure() {
        tracing::warn!("Run finished without updating: {:?}", outcome);
    } else {
        tracing::info!("Run finished: {:?}", outcome);
    }

    outcome.exit_code()
}
