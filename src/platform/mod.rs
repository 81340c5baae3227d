//! Capability set the installation pipeline needs from the cluster, with one implementation
//! per cluster flavor. The flavor is chosen once at startup by [`new_platform`].

use async_trait::async_trait;
use k8s_openapi::api::core::v1::EnvVar;
use kube::Client;
use std::{collections::BTreeMap, fmt::{Display, Formatter}, sync::Arc};

#[cfg(test)]
use mockall::automock;

use crate::{
    admin_console::AdminConsole,
    admin_console_client::AdminConsoleClient,
    keycloak::{Keycloak, KeycloakClient, KeycloakRealm},
    model::Result,
    operator_config::{OperatorConfig, PlatformType},
};

pub mod environment;
pub mod kubernetes;
pub mod openshift;
pub mod workload;

pub use kubernetes::KubernetesPlatform;
pub use openshift::OpenshiftPlatform;

/// Kind of role a RoleBinding points at
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RoleKind {
    Role,
    ClusterRole,
}

impl Display for RoleKind {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            RoleKind::Role => write!(f, "Role"),
            RoleKind::ClusterRole => write!(f, "ClusterRole"),
        }
    }
}

/// Every `create_*` call is idempotent: it looks the object up by name first and only creates
/// it when missing. All created objects are owned by the AdminConsole.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Platform: Send + Sync {
    async fn create_service_account(&self, admin_console: &AdminConsole) -> Result<()>;

    /// Stores `data` in a Secret. An existing Secret keeps its values.
    async fn create_secret(&self, admin_console: &AdminConsole, name: &str, data: BTreeMap<String, String>) -> Result<()>;

    /// Pod security policy for the console service account. Only OpenShift has one.
    async fn create_security_context(&self, admin_console: &AdminConsole) -> Result<()>;

    async fn create_role(&self, admin_console: &AdminConsole) -> Result<()>;

    async fn create_role_binding(&self, admin_console: &AdminConsole, name: &str, role_ref: &str, kind: RoleKind) -> Result<()>;

    async fn create_cluster_role(&self, admin_console: &AdminConsole, name: &str) -> Result<()>;

    async fn create_cluster_role_binding(&self, admin_console: &AdminConsole, name: &str, cluster_role: &str) -> Result<()>;

    async fn create_service(&self, admin_console: &AdminConsole) -> Result<()>;

    /// Ingress on Kubernetes, Route on OpenShift
    async fn create_external_endpoint(&self, admin_console: &AdminConsole) -> Result<()>;

    /// URL of the external endpoint, or `None` while it does not exist or has no host
    async fn get_external_url(&self, namespace: &str, name: &str) -> Result<Option<String>>;

    /// Creates the console workload with the initial environment plus `env`
    async fn create_deployment(&self, admin_console: &AdminConsole, env: Vec<EnvVar>, url: &str) -> Result<()>;

    fn generate_db_settings(&self, admin_console: &AdminConsole) -> Result<Vec<EnvVar>>;

    fn generate_keycloak_settings(&self, admin_console: &AdminConsole, discovery_url: &str) -> Vec<EnvVar>;

    /// Merges `env` into the running workload. No-op when `env` is empty or the workload is missing.
    async fn patch_deployment_env(&self, admin_console: &AdminConsole, env: Vec<EnvVar>) -> Result<()>;

    async fn is_deployment_ready(&self, admin_console: &AdminConsole) -> Result<bool>;

    async fn get_sso_client(&self, name: &str, namespace: &str) -> Result<Option<KeycloakClient>>;

    /// Realm owning the client
    async fn get_sso_realm(&self, client: &KeycloakClient) -> Result<Option<KeycloakRealm>>;

    /// Keycloak instance owning the realm
    async fn get_sso_server(&self, realm: &KeycloakRealm) -> Result<Option<Keycloak>>;

    async fn create_sso_client(&self, admin_console: &AdminConsole, client: KeycloakClient) -> Result<()>;

    async fn create_component_registration(&self, admin_console: &AdminConsole, url: &str, icon: &str) -> Result<()>;

    async fn update_resource(&self, admin_console: AdminConsole) -> Result<AdminConsole>;
}

/// Builds the platform implementation selected by the operator configuration
pub fn new_platform(client: Client, resources: Arc<dyn AdminConsoleClient>, config: &OperatorConfig) -> Arc<dyn Platform> {
    let kubernetes = KubernetesPlatform::new(client, resources, config.clone());
    match config.platform {
        PlatformType::Kubernetes => Arc::new(kubernetes),
        PlatformType::Openshift => Arc::new(OpenshiftPlatform::new(kubernetes, config.deployment_type)),
    }
}
