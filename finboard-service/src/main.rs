use finboard_service::{config::Config, Application};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    service_core::observability::init_tracing(
        &format!("{},finboard_service=debug,sqlx=warn", config.log_level),
        true,
    );

    finboard_service::services::init_metrics();

    let application = Application::build(config).await?;
    application.run_until_stopped().await?;

    Ok(())
}
