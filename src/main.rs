use std::sync::Arc;

use admin_console_operator::{context_data::ContextData, controller_admin_console, operator_config::OperatorConfig};
use kube::Client;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let version: &str = env!("CARGO_PKG_VERSION");
    info!("Starting admin-console-operator {}", version);

    let config = match OperatorConfig::load() {
        Ok(config) => config,
        Err(error) => {
            error!("Could not load operator configuration: {error}");
            std::process::exit(1);
        }
    };
    info!(
        "Platform {} watching {}",
        config.platform,
        config.watch_namespace.as_deref().unwrap_or("all namespaces")
    );

    let client: Client = Client::try_default().await.expect("Failed to create kube Client");
    let context_data: Arc<ContextData> = Arc::new(ContextData::new(client.clone(), config));
    controller_admin_console::run(client, context_data).await;
    info!("Controller AdminConsole exited");
}
