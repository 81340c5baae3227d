use kube::{runtime::events::Reporter, Client};
use std::sync::Arc;
use tokio::time::Duration;

use crate::{
    admin_console_client::{AdminConsoleClient, KubeAdminConsoleClient},
    admin_console_service::AdminConsoleService,
    constants,
    controller_admin_console::Reconciler,
    operator_config::OperatorConfig,
    platform,
};

#[derive(Clone)]
pub struct ContextData {
    /// Kubernetes client to make Kubernetes API requests with. Required for K8S resource management.
    pub client: Client,

    pub config: OperatorConfig,

    pub reconciler: Reconciler,
}

impl ContextData {
    /// Wires the resource client, the platform selected by the configuration and the
    /// installation service into a reconciler.
    pub fn new(client: Client, config: OperatorConfig) -> Self {
        let resources: Arc<dyn AdminConsoleClient> =
            Arc::new(KubeAdminConsoleClient::new(client.clone(), Reporter::from(constants::OPERATOR_NAME)));
        let platform = platform::new_platform(client.clone(), resources.clone(), &config);
        let service = AdminConsoleService::new(platform, config.assets_dir.clone());
        let reconciler = Reconciler::new(resources, service, Duration::from_secs(config.requeue_delay_seconds));
        ContextData {
            client,
            config,
            reconciler,
        }
    }
}
