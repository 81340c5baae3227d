use async_trait::async_trait;
use k8s_openapi::api::core::v1::EnvVar;
use kube::{
    api::{Api, Patch, PatchParams},
    ResourceExt,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::{
    admin_console::AdminConsole,
    constants,
    keycloak::{Keycloak, KeycloakClient, KeycloakRealm},
    model::{Error, Result},
    openshift_resources::{
        DeploymentConfig, DeploymentConfigSpec, DeploymentStrategy, DeploymentTriggerPolicy, Route, RoutePort, RouteSpec,
        RouteTargetReference, SecurityContextConstraints, StrategyOptions, TlsConfig,
    },
    operator_config::{DeploymentType, OperatorConfig},
    platform::{environment, kubernetes::object_meta, workload, KubernetesPlatform, Platform, RoleKind},
    resource_generics::{converge, get_or_create, set_owner},
    utils,
};

/// Platform backed by OpenShift objects. Everything OpenShift has no own kind for is
/// delegated to the Kubernetes platform.
pub struct OpenshiftPlatform {
    kubernetes: KubernetesPlatform,
    deployment_type: DeploymentType,
}

impl OpenshiftPlatform {
    pub fn new(kubernetes: KubernetesPlatform, deployment_type: DeploymentType) -> Self {
        Self { kubernetes, deployment_type }
    }

    fn uses_deployment_configs(&self) -> bool {
        self.deployment_type == DeploymentType::DeploymentConfigs
    }
}

#[async_trait]
impl Platform for OpenshiftPlatform {
    async fn create_service_account(&self, admin_console: &AdminConsole) -> Result<()> {
        self.kubernetes.create_service_account(admin_console).await
    }

    async fn create_secret(&self, admin_console: &AdminConsole, name: &str, data: BTreeMap<String, String>) -> Result<()> {
        self.kubernetes.create_secret(admin_console, name, data).await
    }

    async fn create_security_context(&self, admin_console: &AdminConsole) -> Result<()> {
        let mut scc = build_security_context_constraints(admin_console);
        set_owner(&mut scc, admin_console)?;
        let api: Api<SecurityContextConstraints> = Api::all(self.kubernetes.client.clone());
        converge(&api, scc, users_differ).await?;
        Ok(())
    }

    async fn create_role(&self, admin_console: &AdminConsole) -> Result<()> {
        self.kubernetes.create_role(admin_console).await
    }

    async fn create_role_binding(&self, admin_console: &AdminConsole, name: &str, role_ref: &str, kind: RoleKind) -> Result<()> {
        self.kubernetes.create_role_binding(admin_console, name, role_ref, kind).await
    }

    async fn create_cluster_role(&self, admin_console: &AdminConsole, name: &str) -> Result<()> {
        self.kubernetes.create_cluster_role(admin_console, name).await
    }

    async fn create_cluster_role_binding(&self, admin_console: &AdminConsole, name: &str, cluster_role: &str) -> Result<()> {
        self.kubernetes.create_cluster_role_binding(admin_console, name, cluster_role).await
    }

    async fn create_service(&self, admin_console: &AdminConsole) -> Result<()> {
        self.kubernetes.create_service(admin_console).await
    }

    async fn create_external_endpoint(&self, admin_console: &AdminConsole) -> Result<()> {
        let mut route = build_route(admin_console);
        set_owner(&mut route, admin_console)?;
        get_or_create(&self.kubernetes.api::<Route>(&admin_console.target_namespace()), &route).await?;
        Ok(())
    }

    async fn get_external_url(&self, namespace: &str, name: &str) -> Result<Option<String>> {
        let route = self.kubernetes.api::<Route>(namespace).get_opt(name).await?;
        Ok(route.as_ref().and_then(route_url))
    }

    async fn create_deployment(&self, admin_console: &AdminConsole, env: Vec<EnvVar>, url: &str) -> Result<()> {
        if !self.uses_deployment_configs() {
            return self.kubernetes.create_kubernetes_deployment(admin_console, env, url).await;
        }
        let mut deployment_config = build_deployment_config(admin_console, env, url, &self.kubernetes.config)?;
        set_owner(&mut deployment_config, admin_console)?;
        get_or_create(&self.kubernetes.api::<DeploymentConfig>(&admin_console.target_namespace()), &deployment_config).await?;
        Ok(())
    }

    fn generate_db_settings(&self, admin_console: &AdminConsole) -> Result<Vec<EnvVar>> {
        environment::generate_db_settings(admin_console)
    }

    fn generate_keycloak_settings(&self, admin_console: &AdminConsole, discovery_url: &str) -> Vec<EnvVar> {
        environment::generate_keycloak_settings(admin_console, discovery_url)
    }

    async fn patch_deployment_env(&self, admin_console: &AdminConsole, env: Vec<EnvVar>) -> Result<()> {
        if !self.uses_deployment_configs() {
            return self.kubernetes.patch_kubernetes_deployment_env(admin_console, env).await;
        }
        let name = admin_console.name_any();
        if env.is_empty() {
            debug!("No environment to patch into DeploymentConfig {name}");
            return Ok(());
        }
        let api = self.kubernetes.api::<DeploymentConfig>(&admin_console.target_namespace());
        let Some(deployment_config) = api.get_opt(&name).await? else {
            debug!("DeploymentConfig {name} does not exist yet, skipping env patch");
            return Ok(());
        };
        if let Some(patch) = workload::env_patch(&deployment_config.spec.template, &name, &env)? {
            api.patch(&name, &PatchParams::default(), &Patch::Json::<()>(patch)).await?;
            info!("DeploymentConfig {name} environment updated");
        }
        Ok(())
    }

    async fn is_deployment_ready(&self, admin_console: &AdminConsole) -> Result<bool> {
        if !self.uses_deployment_configs() {
            return self.kubernetes.is_kubernetes_deployment_ready(admin_console).await;
        }
        let api = self.kubernetes.api::<DeploymentConfig>(&admin_console.target_namespace());
        Ok(api
            .get_opt(&admin_console.name_any())
            .await?
            .map_or(false, |deployment_config| is_deployment_config_ready(&deployment_config)))
    }

    async fn get_sso_client(&self, name: &str, namespace: &str) -> Result<Option<KeycloakClient>> {
        self.kubernetes.get_sso_client(name, namespace).await
    }

    async fn get_sso_realm(&self, client: &KeycloakClient) -> Result<Option<KeycloakRealm>> {
        self.kubernetes.get_sso_realm(client).await
    }

    async fn get_sso_server(&self, realm: &KeycloakRealm) -> Result<Option<Keycloak>> {
        self.kubernetes.get_sso_server(realm).await
    }

    async fn create_sso_client(&self, admin_console: &AdminConsole, client: KeycloakClient) -> Result<()> {
        self.kubernetes.create_sso_client(admin_console, client).await
    }

    async fn create_component_registration(&self, admin_console: &AdminConsole, url: &str, icon: &str) -> Result<()> {
        self.kubernetes.create_component_registration(admin_console, url, icon).await
    }

    async fn update_resource(&self, admin_console: AdminConsole) -> Result<AdminConsole> {
        self.kubernetes.update_resource(admin_console).await
    }
}

/// SCC name, unique across namespaces
pub fn security_context_constraints_name(admin_console: &AdminConsole) -> String {
    format!("{}-{}", admin_console.name_any(), admin_console.target_namespace())
}

pub fn build_security_context_constraints(admin_console: &AdminConsole) -> SecurityContextConstraints {
    let name = security_context_constraints_name(admin_console);
    SecurityContextConstraints {
        types: Some(SecurityContextConstraints::type_meta()),
        metadata: kube::api::ObjectMeta {
            namespace: None,
            ..object_meta(admin_console, &name)
        },
        allow_host_dir_volume_plugin: false,
        allow_host_ipc: true,
        allow_host_network: false,
        allow_host_pid: false,
        allow_host_ports: false,
        allow_privileged_container: false,
        allow_privilege_escalation: false,
        read_only_root_filesystem: false,
        required_drop_capabilities: vec!["ALL".to_owned()],
        fs_group: StrategyOptions::of("RunAsAny"),
        run_as_user: StrategyOptions::of("RunAsAny"),
        se_linux_context: StrategyOptions::of("MustRunAs"),
        supplemental_groups: StrategyOptions::of("RunAsAny"),
        priority: Some(1),
        users: vec![format!(
            "system:serviceaccount:{}:{}",
            admin_console.target_namespace(),
            admin_console.name_any()
        )],
        groups: Vec::new(),
        volumes: ["secret", "downwardAPI", "emptyDir", "persistentVolumeClaim", "projected", "configMap"]
            .iter()
            .map(|volume| volume.to_string())
            .collect(),
    }
}

/// Drift check for the SCC: only the allowed users are reconciled
pub fn users_differ(observed: &SecurityContextConstraints, desired: &SecurityContextConstraints) -> bool {
    !utils::same_members(&observed.users, &desired.users)
}

pub fn build_route(admin_console: &AdminConsole) -> Route {
    let name = admin_console.name_any();
    let path = environment::base_path(admin_console);
    Route {
        metadata: object_meta(admin_console, &name),
        spec: RouteSpec {
            host: None,
            path: Some(path).filter(|path| !path.is_empty()),
            to: RouteTargetReference {
                kind: "Service".to_owned(),
                name: name.to_owned(),
                weight: Some(100),
            },
            port: Some(RoutePort {
                target_port: constants::PORT_NAME.to_owned(),
            }),
            tls: Some(TlsConfig {
                termination: "edge".to_owned(),
                insecure_edge_termination_policy: Some("Redirect".to_owned()),
            }),
            wildcard_policy: Some("None".to_owned()),
        },
    }
}

/// `{scheme}://{host}{path}`; https when the route terminates TLS
pub fn route_url(route: &Route) -> Option<String> {
    let host = route.spec.host.as_ref().filter(|host| !host.is_empty())?;
    let scheme = match &route.spec.tls {
        Some(tls) if !tls.termination.is_empty() => "https",
        _ => "http",
    };
    let path = route.spec.path.as_deref().unwrap_or_default();
    Some(format!("{}://{}{}", scheme, host, path.trim_end_matches('/')))
}

pub fn build_deployment_config(
    admin_console: &AdminConsole,
    env: Vec<EnvVar>,
    url: &str,
    config: &OperatorConfig,
) -> Result<DeploymentConfig> {
    let name = admin_console.name_any();
    if admin_console.spec.image.is_empty() || admin_console.spec.version.is_empty() {
        return Err(Error::validation(format!("AdminConsole {name} must set image and version")));
    }
    Ok(DeploymentConfig {
        metadata: object_meta(admin_console, &name),
        spec: DeploymentConfigSpec {
            replicas: 1,
            selector: utils::selector_labels(&name),
            template: workload::build_pod_template(
                admin_console,
                workload::build_env(admin_console, url, &env),
                &config.security_context,
            ),
            triggers: vec![DeploymentTriggerPolicy {
                type_: "ConfigChange".to_owned(),
            }],
            strategy: Some(DeploymentStrategy {
                type_: "Rolling".to_owned(),
            }),
        },
        status: None,
    })
}

pub fn is_deployment_config_ready(deployment_config: &DeploymentConfig) -> bool {
    deployment_config
        .status
        .as_ref()
        .map_or(false, |status| status.updated_replicas == 1 && status.available_replicas == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin_console::AdminConsoleSpec;
    use crate::openshift_resources::DeploymentConfigStatus;

    fn admin_console(base_path: &str) -> AdminConsole {
        let mut admin_console = AdminConsole::new(
            "edp-admin-console",
            AdminConsoleSpec {
                image: "epamedp/edp-admin-console".to_owned(),
                version: "2.4.0".to_owned(),
                base_path: base_path.to_owned(),
                ..AdminConsoleSpec::default()
            },
        );
        admin_console.metadata.namespace = Some("edp".to_owned());
        admin_console.metadata.uid = Some("7a1c".to_owned());
        admin_console
    }

    #[test]
    fn test_security_context_constraints() {
        let scc = build_security_context_constraints(&admin_console(""));
        assert_eq!(scc.metadata.name.as_deref(), Some("edp-admin-console-edp"));
        assert_eq!(scc.metadata.namespace, None);
        assert_eq!(scc.users, vec!["system:serviceaccount:edp:edp-admin-console".to_owned()]);
        assert!(!scc.allow_privileged_container);
        assert_eq!(scc.volumes.len(), 6);
    }

    #[test]
    fn test_users_differ_is_order_insensitive() {
        let desired = build_security_context_constraints(&admin_console(""));
        let mut observed = desired.clone();
        observed.users = vec!["system:serviceaccount:other:sa".to_owned()];
        assert!(users_differ(&observed, &desired));
        assert!(!users_differ(&desired.clone(), &desired));

        let mut reordered = desired.clone();
        reordered.users = vec!["b".to_owned(), "a".to_owned()];
        let mut expected = desired.clone();
        expected.users = vec!["a".to_owned(), "b".to_owned()];
        assert!(!users_differ(&reordered, &expected));
        // Other fields are not part of the drift check
        reordered.priority = Some(10);
        assert!(!users_differ(&reordered, &expected));
    }

    #[test]
    fn test_route_and_url() {
        let mut route = build_route(&admin_console("/console/"));
        assert_eq!(route.spec.path.as_deref(), Some("/console"));
        assert_eq!(route_url(&route), None);

        route.spec.host = Some("edp-admin-console-edp.apps.example.com".to_owned());
        assert_eq!(route_url(&route).as_deref(), Some("https://edp-admin-console-edp.apps.example.com/console"));

        route.spec.tls = None;
        route.spec.path = None;
        assert_eq!(route_url(&route).as_deref(), Some("http://edp-admin-console-edp.apps.example.com"));
    }

    #[test]
    fn test_deployment_config() {
        let deployment_config = build_deployment_config(&admin_console(""), vec![], "https://x", &OperatorConfig::default()).unwrap();
        assert_eq!(deployment_config.spec.triggers[0].type_, "ConfigChange");
        assert_eq!(deployment_config.spec.replicas, 1);
        assert!(!is_deployment_config_ready(&deployment_config));
    }

    #[test]
    fn test_deployment_config_readiness() {
        let mut deployment_config = build_deployment_config(&admin_console(""), vec![], "https://x", &OperatorConfig::default()).unwrap();
        deployment_config.status = Some(DeploymentConfigStatus {
            updated_replicas: 1,
            available_replicas: 1,
        });
        assert!(is_deployment_config_ready(&deployment_config));
        deployment_config.status = Some(DeploymentConfigStatus {
            updated_replicas: 0,
            available_replicas: 1,
        });
        assert!(!is_deployment_config_ready(&deployment_config));
    }
}
