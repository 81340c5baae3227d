use base64::{engine::general_purpose, Engine as _};
use kube::ResourceExt;
use std::{collections::BTreeMap, path::PathBuf, sync::Arc};
use tracing::{debug, info};

use crate::{
    admin_console::{AdminConsole, AdminConsoleSpec, ExternalConfigurationItem},
    constants,
    keycloak::{self, KeycloakClient, KeycloakClientSpec, KeycloakServiceAccount},
    model::{Error, Result, ResultExt},
    platform::{Platform, RoleKind},
    utils,
};

/// Sequences platform calls into the installation phases. Each phase takes the resource
/// and returns it as stored after the phase.
#[derive(Clone)]
pub struct AdminConsoleService {
    platform: Arc<dyn Platform>,
    assets_dir: PathBuf,
}

impl AdminConsoleService {
    pub fn new(platform: Arc<dyn Platform>, assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            platform,
            assets_dir: assets_dir.into(),
        }
    }

    /// Creates every object the console needs, ending with its workload.
    pub async fn install(&self, admin_console: AdminConsole) -> Result<AdminConsole> {
        let name = admin_console.name_any();
        let namespace = admin_console.target_namespace();
        info!(name = %name, namespace = %namespace, "Installing AdminConsole");
        let platform = &self.platform;
        let observed = admin_console.spec.clone();

        platform
            .create_service_account(&admin_console)
            .await
            .with_context(|| format!("failed to create ServiceAccount for {namespace}/{name}"))?;
        platform
            .create_secret(&admin_console, constants::DB_SECRET_NAME, db_credentials(&admin_console))
            .await
            .with_context(|| format!("failed to create Secret {} for {namespace}/{name}", constants::DB_SECRET_NAME))?;
        platform
            .create_security_context(&admin_console)
            .await
            .with_context(|| format!("failed to create security context for {namespace}/{name}"))?;
        platform
            .create_role(&admin_console)
            .await
            .with_context(|| format!("failed to create Role {} for {namespace}/{name}", constants::RESOURCES_ADMIN_ROLE))?;
        platform
            .create_role_binding(&admin_console, constants::RESOURCES_ADMIN_BINDING, constants::RESOURCES_ADMIN_ROLE, RoleKind::Role)
            .await
            .with_context(|| format!("failed to create RoleBinding {} for {namespace}/{name}", constants::RESOURCES_ADMIN_BINDING))?;
        platform
            .create_role_binding(&admin_console, constants::ADMIN_BINDING, constants::ADMIN_CLUSTER_ROLE, RoleKind::ClusterRole)
            .await
            .with_context(|| format!("failed to create RoleBinding {} for {namespace}/{name}", constants::ADMIN_BINDING))?;

        let storage_class_reader = storage_class_reader_name(&admin_console);
        platform
            .create_cluster_role(&admin_console, &storage_class_reader)
            .await
            .with_context(|| format!("failed to create ClusterRole {storage_class_reader}"))?;
        platform
            .create_cluster_role_binding(&admin_console, &storage_class_reader, &storage_class_reader)
            .await
            .with_context(|| format!("failed to create ClusterRoleBinding {storage_class_reader}"))?;

        platform
            .create_service(&admin_console)
            .await
            .with_context(|| format!("failed to create Service for {namespace}/{name}"))?;
        platform
            .create_external_endpoint(&admin_console)
            .await
            .with_context(|| format!("failed to create external endpoint for {namespace}/{name}"))?;
        let url = self.external_url(&admin_console).await?;

        let db_settings = platform
            .generate_db_settings(&admin_console)
            .with_context(|| format!("failed to generate database settings for {namespace}/{name}"))?;
        platform
            .create_deployment(&admin_console, db_settings, &url)
            .await
            .with_context(|| format!("failed to create workload for {namespace}/{name}"))?;

        self.persist(&observed, admin_console).await
    }

    /// Generates credentials, registers the SSO client when enabled and advertises the console
    /// in the component registry.
    pub async fn expose_configuration(&self, mut admin_console: AdminConsole) -> Result<AdminConsole> {
        let name = admin_console.name_any();
        let namespace = admin_console.target_namespace();
        info!(name = %name, namespace = %namespace, "Exposing AdminConsole configuration");
        let platform = &self.platform;
        let url = self.external_url(&admin_console).await?;

        platform
            .create_secret(
                &admin_console,
                constants::READER_SECRET_NAME,
                credentials(constants::READER_USERNAME, &utils::random_password(constants::PASSWORD_LENGTH)),
            )
            .await
            .with_context(|| format!("failed to create Secret {} for {namespace}/{name}", constants::READER_SECRET_NAME))?;

        let mut external_configuration = vec![
            secret_reference(constants::DB_SECRET_NAME, "Database administrator credentials"),
            secret_reference(constants::READER_SECRET_NAME, "Read-only user credentials"),
        ];

        if admin_console.sso_enabled() {
            let password = utils::random_password(constants::PASSWORD_LENGTH);
            let mut client_credentials = credentials(constants::SSO_CLIENT_ID, &password);
            client_credentials.insert(constants::SECRET_CLIENT_SECRET_KEY.to_owned(), password);
            platform
                .create_secret(&admin_console, constants::SSO_CLIENT_SECRET_NAME, client_credentials)
                .await
                .with_context(|| format!("failed to create Secret {} for {namespace}/{name}", constants::SSO_CLIENT_SECRET_NAME))?;
            platform
                .create_sso_client(&admin_console, build_sso_client(&admin_console, &url))
                .await
                .with_context(|| format!("failed to create KeycloakClient for {namespace}/{name}"))?;
            external_configuration.push(secret_reference(constants::SSO_CLIENT_SECRET_NAME, "Keycloak client credentials"));
        }

        let observed = admin_console.spec.clone();
        admin_console.spec.external_configuration = external_configuration;
        let admin_console = self.persist(&observed, admin_console).await?;

        let icon = self.load_icon()?;
        platform
            .create_component_registration(&admin_console, &url, &icon)
            .await
            .with_context(|| format!("failed to create EDPComponent for {namespace}/{name}"))?;
        Ok(admin_console)
    }

    /// Points the running console at the SSO realm. Does nothing when SSO is disabled.
    pub async fn integrate(&self, admin_console: AdminConsole) -> Result<AdminConsole> {
        if !admin_console.sso_enabled() {
            debug!("SSO is disabled for AdminConsole {}, skipping integration", admin_console.name_any());
            return Ok(admin_console);
        }
        let name = admin_console.name_any();
        let namespace = admin_console.target_namespace();
        info!(name = %name, namespace = %namespace, "Integrating AdminConsole with SSO");
        let platform = &self.platform;
        let observed = admin_console.spec.clone();

        let client = platform
            .get_sso_client(&name, &namespace)
            .await?
            .ok_or_else(|| Error::SsoNotReady(format!("KeycloakClient {namespace}/{name}")))?;
        let realm = platform
            .get_sso_realm(&client)
            .await?
            .ok_or_else(|| Error::SsoNotReady(format!("owner KeycloakRealm of KeycloakClient {namespace}/{name}")))?;
        let server = platform
            .get_sso_server(&realm)
            .await?
            .ok_or_else(|| Error::SsoNotReady(format!("owner Keycloak of KeycloakRealm {}", realm.name_any())))?;
        let discovery_url = keycloak::discovery_url(&server, &realm);

        let mut env = platform
            .generate_db_settings(&admin_console)
            .with_context(|| format!("failed to generate database settings for {namespace}/{name}"))?;
        env.extend(platform.generate_keycloak_settings(&admin_console, &discovery_url));
        platform
            .patch_deployment_env(&admin_console, env)
            .await
            .with_context(|| format!("failed to patch environment of {namespace}/{name}"))?;

        self.persist(&observed, admin_console).await
    }

    pub async fn is_deployment_ready(&self, admin_console: &AdminConsole) -> Result<bool> {
        self.platform.is_deployment_ready(admin_console).await
    }

    /// Writes the resource back unless its spec still matches `observed`
    async fn persist(&self, observed: &AdminConsoleSpec, admin_console: AdminConsole) -> Result<AdminConsole> {
        if &admin_console.spec == observed {
            debug!("AdminConsole {} is unchanged, skipping update", admin_console.name_any());
            return Ok(admin_console);
        }
        self.platform.update_resource(admin_console).await
    }

    async fn external_url(&self, admin_console: &AdminConsole) -> Result<String> {
        let name = admin_console.name_any();
        let namespace = admin_console.target_namespace();
        self.platform
            .get_external_url(&namespace, &name)
            .await
            .with_context(|| format!("failed to read external endpoint of {namespace}/{name}"))?
            .ok_or_else(|| Error::NotReady(format!("external endpoint of {namespace}/{name} has no host yet")))
    }

    fn load_icon(&self) -> Result<String> {
        let path = self.assets_dir.join(constants::ADMIN_CONSOLE_ICON);
        let icon = std::fs::read(&path).with_context(|| format!("failed to read icon {}", path.display()))?;
        Ok(general_purpose::STANDARD.encode(icon))
    }
}

pub fn storage_class_reader_name(admin_console: &AdminConsole) -> String {
    format!("{}-{}-storageclass-reader", admin_console.name_any(), admin_console.target_namespace())
}

fn credentials(username: &str, password: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (constants::SECRET_USERNAME_KEY.to_owned(), username.to_owned()),
        (constants::SECRET_PASSWORD_KEY.to_owned(), password.to_owned()),
    ])
}

fn db_credentials(admin_console: &AdminConsole) -> BTreeMap<String, String> {
    credentials(
        &format!("admin-{}", admin_console.spec.edp_spec.name),
        &utils::random_password(constants::PASSWORD_LENGTH),
    )
}

fn secret_reference(name: &str, description: &str) -> ExternalConfigurationItem {
    ExternalConfigurationItem {
        name: name.to_owned(),
        kind: "Secret".to_owned(),
        description: description.to_owned(),
    }
}

pub fn build_sso_client(admin_console: &AdminConsole, url: &str) -> KeycloakClient {
    let mut client = KeycloakClient::new(
        &admin_console.name_any(),
        KeycloakClientSpec {
            client_id: constants::SSO_CLIENT_ID.to_owned(),
            secret: Some(constants::SSO_CLIENT_SECRET_NAME.to_owned()),
            target_realm: None,
            web_url: Some(url.to_owned()),
            direct_access: true,
            aud_required: true,
            service_account: Some(KeycloakServiceAccount {
                enabled: true,
                realm_roles: vec![constants::SSO_REALM_ROLE.to_owned()],
            }),
            default_client_scopes: vec![constants::SSO_DEFAULT_CLIENT_SCOPE.to_owned()],
        },
    );
    client.metadata.namespace = Some(admin_console.target_namespace());
    client
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin_console::{DbSpec, EdpSpec, KeycloakSpec};
    use crate::keycloak::{Keycloak, KeycloakInstanceSpec, KeycloakRealm, KeycloakRealmSpec};
    use crate::platform::{environment, MockPlatform};
    use mockall::{predicate::eq, Sequence};

    fn admin_console(sso: bool) -> AdminConsole {
        let mut admin_console = AdminConsole::new(
            "edp-admin-console",
            AdminConsoleSpec {
                image: "epamedp/edp-admin-console".to_owned(),
                version: "2.4.0".to_owned(),
                keycloak_spec: KeycloakSpec { enabled: sso },
                edp_spec: EdpSpec {
                    name: "edp".to_owned(),
                    dns_wildcard: "example.com".to_owned(),
                    ..EdpSpec::default()
                },
                db_spec: DbSpec::default(),
                ..AdminConsoleSpec::default()
            },
        );
        admin_console.metadata.namespace = Some("edp".to_owned());
        admin_console.metadata.uid = Some("7a1c".to_owned());
        admin_console
    }

    fn service(platform: MockPlatform) -> AdminConsoleService {
        AdminConsoleService::new(Arc::new(platform), env!("CARGO_MANIFEST_DIR").to_owned() + "/assets/img")
    }

    #[tokio::test]
    async fn test_integrate_is_noop_without_sso() {
        // Any call on a mock without expectations panics
        let platform = MockPlatform::new();
        let console = admin_console(false);
        let result = service(platform).integrate(console.clone()).await.unwrap();
        assert_eq!(result.spec, console.spec);
        assert_eq!(result.metadata, console.metadata);
    }

    #[tokio::test]
    async fn test_install_sequence() {
        let mut platform = MockPlatform::new();
        let mut sequence = Sequence::new();
        platform.expect_create_service_account().times(1).in_sequence(&mut sequence).returning(|_| Ok(()));
        platform
            .expect_create_secret()
            .withf(|_, name, data| {
                name == "admin-console-db" && data.get("username").map(String::as_str) == Some("admin-edp") && data["password"].len() == 16
            })
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _, _| Ok(()));
        platform.expect_create_security_context().times(1).in_sequence(&mut sequence).returning(|_| Ok(()));
        platform.expect_create_role().times(1).in_sequence(&mut sequence).returning(|_| Ok(()));
        platform
            .expect_create_role_binding()
            .withf(|_, name, role, kind| name == "edp-resources-admin" && role == "edp-resources-admin" && *kind == RoleKind::Role)
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _, _, _| Ok(()));
        platform
            .expect_create_role_binding()
            .withf(|_, name, role, kind| name == "edp-admin" && role == "admin" && *kind == RoleKind::ClusterRole)
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _, _, _| Ok(()));
        platform
            .expect_create_cluster_role()
            .withf(|_, name| name == "edp-admin-console-edp-storageclass-reader")
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _| Ok(()));
        platform.expect_create_cluster_role_binding().times(1).in_sequence(&mut sequence).returning(|_, _, _| Ok(()));
        platform.expect_create_service().times(1).in_sequence(&mut sequence).returning(|_| Ok(()));
        platform.expect_create_external_endpoint().times(1).in_sequence(&mut sequence).returning(|_| Ok(()));
        platform
            .expect_get_external_url()
            .with(eq("edp"), eq("edp-admin-console"))
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, name| Ok(Some(format!("https://{name}.example.com"))));
        platform
            .expect_generate_db_settings()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|console| environment::generate_db_settings(console));
        platform
            .expect_create_deployment()
            .withf(|_, env, url| {
                url == "https://edp-admin-console.example.com" && env == &vec![environment::env_var("DB_ENABLED", "false")]
            })
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _, _| Ok(()));
        platform.expect_update_resource().never();

        let result = service(platform).install(admin_console(false)).await.unwrap();
        assert_eq!(result.name_any(), "edp-admin-console");
    }

    #[tokio::test]
    async fn test_install_stops_at_first_failure() {
        let mut platform = MockPlatform::new();
        platform.expect_create_service_account().returning(|_| Ok(()));
        platform
            .expect_create_secret()
            .returning(|_, name, _| Err(Error::NotReady(format!("secret {name}"))));
        let error = service(platform).install(admin_console(false)).await.unwrap_err();
        assert!(error.to_string().contains("failed to create Secret admin-console-db"));
    }

    #[tokio::test]
    async fn test_install_requires_external_url() {
        let mut platform = MockPlatform::new();
        platform.expect_create_service_account().returning(|_| Ok(()));
        platform.expect_create_secret().returning(|_, _, _| Ok(()));
        platform.expect_create_security_context().returning(|_| Ok(()));
        platform.expect_create_role().returning(|_| Ok(()));
        platform.expect_create_role_binding().returning(|_, _, _, _| Ok(()));
        platform.expect_create_cluster_role().returning(|_, _| Ok(()));
        platform.expect_create_cluster_role_binding().returning(|_, _, _| Ok(()));
        platform.expect_create_service().returning(|_| Ok(()));
        platform.expect_create_external_endpoint().returning(|_| Ok(()));
        platform.expect_get_external_url().returning(|_, _| Ok(None));
        platform.expect_create_deployment().never();
        let error = service(platform).install(admin_console(false)).await.unwrap_err();
        assert!(matches!(error, Error::NotReady(_)));
    }

    #[tokio::test]
    async fn test_expose_configuration_with_sso() {
        let mut platform = MockPlatform::new();
        platform.expect_get_external_url().returning(|_, _| Ok(Some("https://edp-admin-console.example.com".to_owned())));
        platform
            .expect_create_secret()
            .withf(|_, name, data| name == "admin-console-reader" && data["username"] == "admin-console-reader")
            .times(1)
            .returning(|_, _, _| Ok(()));
        platform
            .expect_create_secret()
            .withf(|_, name, data| name == "admin-console-client" && data["password"] == data["clientSecret"])
            .times(1)
            .returning(|_, _, _| Ok(()));
        platform
            .expect_create_sso_client()
            .withf(|_, client| {
                client.spec.direct_access
                    && client.spec.aud_required
                    && client.spec.web_url.as_deref() == Some("https://edp-admin-console.example.com")
                    && client.spec.default_client_scopes == vec!["edp".to_owned()]
                    && client.spec.service_account.as_ref().map(|sa| sa.realm_roles.clone()) == Some(vec!["developer".to_owned()])
            })
            .times(1)
            .returning(|_, _| Ok(()));
        platform
            .expect_update_resource()
            .withf(|console| console.spec.external_configuration.len() == 3)
            .times(1)
            .returning(Ok);
        platform
            .expect_create_component_registration()
            .withf(|_, url, icon| url == "https://edp-admin-console.example.com" && !icon.is_empty())
            .times(1)
            .returning(|_, _, _| Ok(()));

        let result = service(platform).expose_configuration(admin_console(true)).await.unwrap();
        let names: Vec<&str> = result.spec.external_configuration.iter().map(|item| item.name.as_str()).collect();
        assert_eq!(names, vec!["admin-console-db", "admin-console-reader", "admin-console-client"]);
    }

    #[tokio::test]
    async fn test_expose_configuration_without_sso() {
        let mut platform = MockPlatform::new();
        platform.expect_get_external_url().returning(|_, _| Ok(Some("https://edp-admin-console.example.com".to_owned())));
        platform.expect_create_secret().times(1).returning(|_, _, _| Ok(()));
        platform.expect_create_sso_client().never();
        platform.expect_update_resource().times(1).returning(Ok);
        platform.expect_create_component_registration().times(1).returning(|_, _, _| Ok(()));
        let result = service(platform).expose_configuration(admin_console(false)).await.unwrap();
        assert_eq!(result.spec.external_configuration.len(), 2);
    }

    #[tokio::test]
    async fn test_expose_configuration_keeps_unchanged_resource() {
        let mut console = admin_console(false);
        console.spec.external_configuration = vec![
            secret_reference("admin-console-db", "Database administrator credentials"),
            secret_reference("admin-console-reader", "Read-only user credentials"),
        ];
        let mut platform = MockPlatform::new();
        platform.expect_get_external_url().returning(|_, _| Ok(Some("https://edp-admin-console.example.com".to_owned())));
        platform.expect_create_secret().times(1).returning(|_, _, _| Ok(()));
        platform.expect_update_resource().never();
        platform.expect_create_component_registration().times(1).returning(|_, _, _| Ok(()));
        let result = service(platform).expose_configuration(console.clone()).await.unwrap();
        assert_eq!(result.spec, console.spec);
    }

    #[tokio::test]
    async fn test_integrate_with_sso() {
        let mut platform = MockPlatform::new();
        platform.expect_get_sso_client().returning(|name, namespace| {
            let mut client = build_sso_client(&admin_console(true), "https://edp-admin-console.example.com");
            client.metadata.name = Some(name.to_owned());
            client.metadata.namespace = Some(namespace.to_owned());
            Ok(Some(client))
        });
        platform
            .expect_get_sso_realm()
            .returning(|_| Ok(Some(KeycloakRealm::new("main", KeycloakRealmSpec { realm_name: "openshift".to_owned() }))));
        platform.expect_get_sso_server().returning(|_| {
            Ok(Some(Keycloak::new(
                "main",
                KeycloakInstanceSpec {
                    url: "https://sso.example.com".to_owned(),
                    secret: None,
                },
            )))
        });
        platform.expect_generate_db_settings().returning(|console| environment::generate_db_settings(console));
        platform
            .expect_generate_keycloak_settings()
            .returning(|console, url| environment::generate_keycloak_settings(console, url));
        platform
            .expect_patch_deployment_env()
            .withf(|_, env| {
                env.contains(&environment::env_var("KEYCLOAK_URL", "https://sso.example.com/auth/realms/openshift"))
                    && env.contains(&environment::env_var("AUTH_KEYCLOAK_ENABLED", "true"))
                    && env.contains(&environment::env_var("DB_ENABLED", "false"))
            })
            .times(1)
            .returning(|_, _| Ok(()));
        platform.expect_update_resource().never();
        service(platform).integrate(admin_console(true)).await.unwrap();
    }

    #[tokio::test]
    async fn test_integrate_without_realm_owner() {
        let mut platform = MockPlatform::new();
        platform
            .expect_get_sso_client()
            .returning(|_, _| Ok(Some(build_sso_client(&admin_console(true), "https://x"))));
        platform.expect_get_sso_realm().returning(|_| Ok(None));
        platform.expect_patch_deployment_env().never();
        let error = service(platform).integrate(admin_console(true)).await.unwrap_err();
        assert!(matches!(error, Error::SsoNotReady(_)));
        assert!(error.to_string().starts_with("SSO CR not created yet"));
    }
}
