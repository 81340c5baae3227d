use async_trait::async_trait;
use k8s_openapi::api::{
    apps::v1::{Deployment, DeploymentSpec, DeploymentStrategy},
    core::v1::{EnvVar, Secret, Service, ServiceAccount, ServicePort, ServiceSpec},
    networking::v1::{
        HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule, IngressServiceBackend, IngressSpec,
        ServiceBackendPort,
    },
    rbac::v1::{ClusterRole, ClusterRoleBinding, PolicyRule, Role, RoleBinding, RoleRef, Subject},
};
use k8s_openapi::apimachinery::pkg::{apis::meta::v1::LabelSelector, util::intstr::IntOrString};
use kube::{
    api::{Api, ObjectMeta, Patch, PatchParams},
    Client, ResourceExt,
};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, info};

use crate::{
    admin_console::AdminConsole,
    admin_console_client::AdminConsoleClient,
    constants,
    edp_component::{EDPComponent, EdpComponentSpec},
    keycloak::{self, Keycloak, KeycloakClient, KeycloakRealm},
    model::{Error, Result, ResultExt},
    operator_config::OperatorConfig,
    platform::{environment, workload, Platform, RoleKind},
    resource_generics::{get_or_create, set_owner},
    utils,
};

/// Platform backed by plain Kubernetes objects
pub struct KubernetesPlatform {
    pub(crate) client: Client,
    resources: Arc<dyn AdminConsoleClient>,
    pub(crate) config: OperatorConfig,
}

impl KubernetesPlatform {
    pub fn new(client: Client, resources: Arc<dyn AdminConsoleClient>, config: OperatorConfig) -> Self {
        Self { client, resources, config }
    }

    pub(crate) fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope, DynamicType = ()>,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    pub(crate) async fn create_kubernetes_deployment(&self, admin_console: &AdminConsole, env: Vec<EnvVar>, url: &str) -> Result<()> {
        let mut deployment = build_deployment(admin_console, env, url, &self.config)?;
        set_owner(&mut deployment, admin_console)?;
        get_or_create(&self.api::<Deployment>(&admin_console.target_namespace()), &deployment).await?;
        Ok(())
    }

    pub(crate) async fn patch_kubernetes_deployment_env(&self, admin_console: &AdminConsole, env: Vec<EnvVar>) -> Result<()> {
        let name = admin_console.name_any();
        if env.is_empty() {
            debug!("No environment to patch into Deployment {name}");
            return Ok(());
        }
        let api = self.api::<Deployment>(&admin_console.target_namespace());
        let Some(deployment) = api.get_opt(&name).await? else {
            debug!("Deployment {name} does not exist yet, skipping env patch");
            return Ok(());
        };
        let Some(template) = deployment.spec.as_ref().map(|spec| &spec.template) else {
            return Ok(());
        };
        if let Some(patch) = workload::env_patch(template, &name, &env)? {
            api.patch(&name, &PatchParams::default(), &Patch::Json::<()>(patch)).await?;
            info!("Deployment {name} environment updated");
        }
        Ok(())
    }

    pub(crate) async fn is_kubernetes_deployment_ready(&self, admin_console: &AdminConsole) -> Result<bool> {
        let api = self.api::<Deployment>(&admin_console.target_namespace());
        Ok(api
            .get_opt(&admin_console.name_any())
            .await?
            .map_or(false, |deployment| workload::is_deployment_ready(&deployment)))
    }
}

#[async_trait]
impl Platform for KubernetesPlatform {
    async fn create_service_account(&self, admin_console: &AdminConsole) -> Result<()> {
        let mut service_account = build_service_account(admin_console);
        set_owner(&mut service_account, admin_console)?;
        get_or_create(&self.api::<ServiceAccount>(&admin_console.target_namespace()), &service_account).await?;
        Ok(())
    }

    async fn create_secret(&self, admin_console: &AdminConsole, name: &str, data: BTreeMap<String, String>) -> Result<()> {
        let mut secret = build_secret(admin_console, name, data);
        set_owner(&mut secret, admin_console)?;
        get_or_create(&self.api::<Secret>(&admin_console.target_namespace()), &secret).await?;
        Ok(())
    }

    async fn create_security_context(&self, admin_console: &AdminConsole) -> Result<()> {
        debug!("Security context of {} is part of its pod template", admin_console.name_any());
        Ok(())
    }

    async fn create_role(&self, admin_console: &AdminConsole) -> Result<()> {
        let mut role = build_role(admin_console);
        set_owner(&mut role, admin_console)?;
        get_or_create(&self.api::<Role>(&admin_console.target_namespace()), &role).await?;
        Ok(())
    }

    async fn create_role_binding(&self, admin_console: &AdminConsole, name: &str, role_ref: &str, kind: RoleKind) -> Result<()> {
        let mut role_binding = build_role_binding(admin_console, name, role_ref, kind);
        set_owner(&mut role_binding, admin_console)?;
        get_or_create(&self.api::<RoleBinding>(&admin_console.target_namespace()), &role_binding).await?;
        Ok(())
    }

    async fn create_cluster_role(&self, admin_console: &AdminConsole, name: &str) -> Result<()> {
        let mut cluster_role = build_storage_class_reader(admin_console, name);
        set_owner(&mut cluster_role, admin_console)?;
        get_or_create(&Api::<ClusterRole>::all(self.client.clone()), &cluster_role).await?;
        Ok(())
    }

    async fn create_cluster_role_binding(&self, admin_console: &AdminConsole, name: &str, cluster_role: &str) -> Result<()> {
        let mut binding = build_cluster_role_binding(admin_console, name, cluster_role);
        set_owner(&mut binding, admin_console)?;
        get_or_create(&Api::<ClusterRoleBinding>::all(self.client.clone()), &binding).await?;
        Ok(())
    }

    async fn create_service(&self, admin_console: &AdminConsole) -> Result<()> {
        let mut service = build_service(admin_console);
        set_owner(&mut service, admin_console)?;
        get_or_create(&self.api::<Service>(&admin_console.target_namespace()), &service).await?;
        Ok(())
    }

    async fn create_external_endpoint(&self, admin_console: &AdminConsole) -> Result<()> {
        let mut ingress = build_ingress(admin_console, &self.config);
        set_owner(&mut ingress, admin_console)?;
        get_or_create(&self.api::<Ingress>(&admin_console.target_namespace()), &ingress).await?;
        Ok(())
    }

    async fn get_external_url(&self, namespace: &str, name: &str) -> Result<Option<String>> {
        let ingress = self.api::<Ingress>(namespace).get_opt(name).await?;
        Ok(ingress.as_ref().and_then(ingress_url))
    }

    async fn create_deployment(&self, admin_console: &AdminConsole, env: Vec<EnvVar>, url: &str) -> Result<()> {
        self.create_kubernetes_deployment(admin_console, env, url).await
    }

    fn generate_db_settings(&self, admin_console: &AdminConsole) -> Result<Vec<EnvVar>> {
        environment::generate_db_settings(admin_console)
    }

    fn generate_keycloak_settings(&self, admin_console: &AdminConsole, discovery_url: &str) -> Vec<EnvVar> {
        environment::generate_keycloak_settings(admin_console, discovery_url)
    }

    async fn patch_deployment_env(&self, admin_console: &AdminConsole, env: Vec<EnvVar>) -> Result<()> {
        self.patch_kubernetes_deployment_env(admin_console, env).await
    }

    async fn is_deployment_ready(&self, admin_console: &AdminConsole) -> Result<bool> {
        self.is_kubernetes_deployment_ready(admin_console).await
    }

    async fn get_sso_client(&self, name: &str, namespace: &str) -> Result<Option<KeycloakClient>> {
        Ok(self.api::<KeycloakClient>(namespace).get_opt(name).await?)
    }

    async fn get_sso_realm(&self, client: &KeycloakClient) -> Result<Option<KeycloakRealm>> {
        let Some(realm_name) = keycloak::owner_name(&client.metadata, "KeycloakRealm") else {
            return Ok(None);
        };
        let namespace = client.namespace().unwrap_or_default();
        Ok(self.api::<KeycloakRealm>(&namespace).get_opt(&realm_name).await?)
    }

    async fn get_sso_server(&self, realm: &KeycloakRealm) -> Result<Option<Keycloak>> {
        let Some(keycloak_name) = keycloak::owner_name(&realm.metadata, "Keycloak") else {
            return Ok(None);
        };
        let namespace = realm.namespace().unwrap_or_default();
        Ok(self.api::<Keycloak>(&namespace).get_opt(&keycloak_name).await?)
    }

    async fn create_sso_client(&self, admin_console: &AdminConsole, mut client: KeycloakClient) -> Result<()> {
        client.metadata.namespace = Some(admin_console.target_namespace());
        set_owner(&mut client, admin_console)?;
        get_or_create(&self.api::<KeycloakClient>(&admin_console.target_namespace()), &client).await?;
        Ok(())
    }

    async fn create_component_registration(&self, admin_console: &AdminConsole, url: &str, icon: &str) -> Result<()> {
        let mut component = build_component(admin_console, url, icon);
        set_owner(&mut component, admin_console)?;
        get_or_create(&self.api::<EDPComponent>(&admin_console.target_namespace()), &component).await?;
        Ok(())
    }

    async fn update_resource(&self, admin_console: AdminConsole) -> Result<AdminConsole> {
        self.resources
            .update(&admin_console)
            .await
            .with_context(|| format!("failed to update AdminConsole {}", admin_console.name_any()))
    }
}

pub(crate) fn object_meta(admin_console: &AdminConsole, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_owned()),
        namespace: Some(admin_console.target_namespace()),
        labels: Some(utils::common_lables(&admin_console.name_any())),
        ..ObjectMeta::default()
    }
}

fn cluster_object_meta(admin_console: &AdminConsole, name: &str) -> ObjectMeta {
    ObjectMeta {
        namespace: None,
        ..object_meta(admin_console, name)
    }
}

fn service_account_subject(admin_console: &AdminConsole) -> Subject {
    Subject {
        kind: "ServiceAccount".to_owned(),
        name: admin_console.name_any(),
        namespace: Some(admin_console.target_namespace()),
        ..Subject::default()
    }
}

pub fn build_service_account(admin_console: &AdminConsole) -> ServiceAccount {
    ServiceAccount {
        metadata: object_meta(admin_console, &admin_console.name_any()),
        ..ServiceAccount::default()
    }
}

pub fn build_secret(admin_console: &AdminConsole, name: &str, data: BTreeMap<String, String>) -> Secret {
    Secret {
        metadata: object_meta(admin_console, name),
        type_: Some("Opaque".to_owned()),
        string_data: Some(data),
        ..Secret::default()
    }
}

pub fn build_role(admin_console: &AdminConsole) -> Role {
    Role {
        metadata: object_meta(admin_console, constants::RESOURCES_ADMIN_ROLE),
        rules: Some(vec![PolicyRule {
            api_groups: Some(vec![constants::EDP_API_GROUP.to_owned()]),
            resources: Some(constants::EDP_RESOURCES.iter().map(|resource| resource.to_string()).collect()),
            verbs: vec!["get".to_owned(), "create".to_owned(), "update".to_owned()],
            ..PolicyRule::default()
        }]),
    }
}

pub fn build_role_binding(admin_console: &AdminConsole, name: &str, role_ref: &str, kind: RoleKind) -> RoleBinding {
    RoleBinding {
        metadata: object_meta(admin_console, name),
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_owned(),
            kind: kind.to_string(),
            name: role_ref.to_owned(),
        },
        subjects: Some(vec![service_account_subject(admin_console)]),
    }
}

pub fn build_storage_class_reader(admin_console: &AdminConsole, name: &str) -> ClusterRole {
    ClusterRole {
        metadata: cluster_object_meta(admin_console, name),
        rules: Some(vec![PolicyRule {
            api_groups: Some(vec!["storage.k8s.io".to_owned()]),
            resources: Some(vec!["storageclasses".to_owned()]),
            verbs: vec!["get".to_owned(), "list".to_owned(), "watch".to_owned()],
            ..PolicyRule::default()
        }]),
        ..ClusterRole::default()
    }
}

pub fn build_cluster_role_binding(admin_console: &AdminConsole, name: &str, cluster_role: &str) -> ClusterRoleBinding {
    ClusterRoleBinding {
        metadata: cluster_object_meta(admin_console, name),
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_owned(),
            kind: RoleKind::ClusterRole.to_string(),
            name: cluster_role.to_owned(),
        },
        subjects: Some(vec![service_account_subject(admin_console)]),
    }
}

pub fn build_service(admin_console: &AdminConsole) -> Service {
    let name = admin_console.name_any();
    Service {
        metadata: object_meta(admin_console, &name),
        spec: Some(ServiceSpec {
            selector: Some(utils::selector_labels(&name)),
            type_: Some("ClusterIP".to_owned()),
            ports: Some(vec![ServicePort {
                name: Some(constants::PORT_NAME.to_owned()),
                port: constants::CONTAINER_PORT,
                protocol: Some("TCP".to_owned()),
                target_port: Some(IntOrString::Int(constants::CONTAINER_PORT)),
                ..ServicePort::default()
            }]),
            ..ServiceSpec::default()
        }),
        ..Service::default()
    }
}

pub fn build_ingress(admin_console: &AdminConsole, config: &OperatorConfig) -> Ingress {
    let name = admin_console.name_any();
    let path = match environment::base_path(admin_console) {
        path if path.is_empty() => "/".to_owned(),
        path => path,
    };
    Ingress {
        metadata: ObjectMeta {
            annotations: config.ingress.annotations.clone(),
            ..object_meta(admin_console, &name)
        },
        spec: Some(IngressSpec {
            ingress_class_name: config.ingress.ingress_class_name.clone(),
            rules: Some(vec![IngressRule {
                host: Some(format!("{}.{}", name, admin_console.spec.edp_spec.dns_wildcard)),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: name.to_owned(),
                                port: Some(ServiceBackendPort {
                                    number: Some(constants::CONTAINER_PORT),
                                    ..ServiceBackendPort::default()
                                }),
                            }),
                            ..IngressBackend::default()
                        },
                        path: Some(path),
                        path_type: "Prefix".to_owned(),
                    }],
                }),
            }]),
            ..IngressSpec::default()
        }),
        ..Ingress::default()
    }
}

/// `https://{host}{path}` of the first rule
pub fn ingress_url(ingress: &Ingress) -> Option<String> {
    let rule = ingress.spec.as_ref()?.rules.as_ref()?.first()?;
    let host = rule.host.as_ref().filter(|host| !host.is_empty())?;
    let path = rule
        .http
        .as_ref()
        .and_then(|http| http.paths.first())
        .and_then(|path| path.path.clone())
        .unwrap_or_default();
    Some(format!("https://{}{}", host, path.trim_end_matches('/')))
}

pub fn build_deployment(admin_console: &AdminConsole, env: Vec<EnvVar>, url: &str, config: &OperatorConfig) -> Result<Deployment> {
    let name = admin_console.name_any();
    if admin_console.spec.image.is_empty() || admin_console.spec.version.is_empty() {
        return Err(Error::validation(format!("AdminConsole {name} must set image and version")));
    }
    Ok(Deployment {
        metadata: object_meta(admin_console, &name),
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(utils::selector_labels(&name)),
                ..LabelSelector::default()
            },
            strategy: Some(DeploymentStrategy {
                type_: Some("RollingUpdate".to_owned()),
                ..DeploymentStrategy::default()
            }),
            template: workload::build_pod_template(
                admin_console,
                workload::build_env(admin_console, url, &env),
                &config.security_context,
            ),
            ..DeploymentSpec::default()
        }),
        ..Deployment::default()
    })
}

pub fn build_component(admin_console: &AdminConsole, url: &str, icon: &str) -> EDPComponent {
    EDPComponent {
        metadata: object_meta(admin_console, &admin_console.name_any()),
        spec: EdpComponentSpec {
            type_: constants::COMPONENT_TYPE.to_owned(),
            url: url.to_owned(),
            icon: icon.to_owned(),
            visible: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin_console::{AdminConsoleSpec, EdpSpec};
    use crate::operator_config::IngressConfig;
    use crate::platform::environment::env_var;
    use crate::resource_generics::set_owner;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

    fn admin_console(base_path: &str) -> AdminConsole {
        let mut admin_console = AdminConsole::new(
            "edp-admin-console",
            AdminConsoleSpec {
                image: "epamedp/edp-admin-console".to_owned(),
                version: "2.4.0".to_owned(),
                base_path: base_path.to_owned(),
                edp_spec: EdpSpec {
                    name: "edp".to_owned(),
                    dns_wildcard: "example.com".to_owned(),
                    ..EdpSpec::default()
                },
                ..AdminConsoleSpec::default()
            },
        );
        admin_console.metadata.namespace = Some("edp".to_owned());
        admin_console.metadata.uid = Some("7a1c".to_owned());
        admin_console
    }

    fn owned_by_admin_console(owners: &Option<Vec<OwnerReference>>) -> bool {
        owners
            .as_ref()
            .map_or(false, |owners| owners.iter().any(|owner| owner.uid == "7a1c" && owner.name == "edp-admin-console"))
    }

    #[test]
    fn test_every_built_object_can_be_owned() {
        let console = admin_console("");
        let config = OperatorConfig::default();

        let mut service_account = build_service_account(&console);
        set_owner(&mut service_account, &console).unwrap();
        assert!(owned_by_admin_console(&service_account.metadata.owner_references));

        let mut secret = build_secret(&console, constants::DB_SECRET_NAME, BTreeMap::new());
        set_owner(&mut secret, &console).unwrap();
        assert!(owned_by_admin_console(&secret.metadata.owner_references));

        let mut cluster_role = build_storage_class_reader(&console, "edp-admin-console-edp-storageclass-reader");
        set_owner(&mut cluster_role, &console).unwrap();
        assert!(owned_by_admin_console(&cluster_role.metadata.owner_references));
        assert_eq!(cluster_role.metadata.namespace, None);

        let mut deployment = build_deployment(&console, vec![], "https://edp-admin-console.example.com", &config).unwrap();
        set_owner(&mut deployment, &console).unwrap();
        assert!(owned_by_admin_console(&deployment.metadata.owner_references));
    }

    #[test]
    fn test_role_binding() {
        let binding = build_role_binding(
            &admin_console(""),
            constants::ADMIN_BINDING,
            constants::ADMIN_CLUSTER_ROLE,
            RoleKind::ClusterRole,
        );
        assert_eq!(binding.role_ref.kind, "ClusterRole");
        assert_eq!(binding.role_ref.name, "admin");
        let subject = &binding.subjects.unwrap()[0];
        assert_eq!(subject.name, "edp-admin-console");
        assert_eq!(subject.namespace.as_deref(), Some("edp"));
    }

    #[test]
    fn test_ingress_and_url() {
        let config = OperatorConfig {
            ingress: IngressConfig {
                ingress_class_name: Some("nginx".to_owned()),
                annotations: None,
            },
            ..OperatorConfig::default()
        };
        let ingress = build_ingress(&admin_console(""), &config);
        assert_eq!(ingress.spec.as_ref().unwrap().ingress_class_name.as_deref(), Some("nginx"));
        assert_eq!(ingress_url(&ingress).as_deref(), Some("https://edp-admin-console.example.com"));

        let ingress = build_ingress(&admin_console("/console/"), &config);
        assert_eq!(ingress_url(&ingress).as_deref(), Some("https://edp-admin-console.example.com/console"));
    }

    #[test]
    fn test_ingress_without_host_has_no_url() {
        assert_eq!(ingress_url(&Ingress::default()), None);
    }

    #[test]
    fn test_deployment_env_contains_db_settings() {
        let deployment = build_deployment(
            &admin_console(""),
            vec![env_var("DB_ENABLED", "true")],
            "https://edp-admin-console.example.com",
            &OperatorConfig::default(),
        )
        .unwrap();
        let spec = deployment.spec.unwrap();
        let env = spec.template.spec.unwrap().containers[0].env.clone().unwrap();
        assert!(env.contains(&env_var("DB_ENABLED", "true")));
        assert!(env.contains(&env_var("HOST", "https://edp-admin-console.example.com")));
        assert_eq!(spec.replicas, Some(1));
    }

    #[test]
    fn test_deployment_requires_image() {
        let mut console = admin_console("");
        console.spec.image = String::new();
        assert!(build_deployment(&console, vec![], "https://x", &OperatorConfig::default()).is_err());
    }
}
