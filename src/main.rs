use musicgen_studio_lib::{run, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("musicgen_studio=info,musicgen_studio_lib=info")),
        )
        .init();

    let config = Config::from_env()?;
    run(config).await
}
