use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct KeycloakServiceAccount {
    pub enabled: bool,
    #[serde(default)]
    pub realm_roles: Vec<String>,
}

/// Client registration handled by the Keycloak operator
#[derive(CustomResource, Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[kube(group = "v1.edp.epam.com", version = "v1alpha1", kind = "KeycloakClient", namespaced, schema = "disabled")]
#[serde(rename_all = "camelCase")]
pub struct KeycloakClientSpec {
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_realm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
    #[serde(default)]
    pub direct_access: bool,
    #[serde(default)]
    pub aud_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<KeycloakServiceAccount>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_client_scopes: Vec<String>,
}

#[derive(CustomResource, Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[kube(group = "v1.edp.epam.com", version = "v1alpha1", kind = "KeycloakRealm", namespaced, schema = "disabled")]
#[serde(rename_all = "camelCase")]
pub struct KeycloakRealmSpec {
    pub realm_name: String,
}

#[derive(CustomResource, Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[kube(group = "v1.edp.epam.com", version = "v1alpha1", kind = "Keycloak", namespaced, schema = "disabled")]
#[serde(rename_all = "camelCase")]
pub struct KeycloakInstanceSpec {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

/// Name of the first owner of the given kind
pub fn owner_name(metadata: &ObjectMeta, kind: &str) -> Option<String> {
    metadata
        .owner_references
        .as_ref()?
        .iter()
        .find(|owner| owner.kind == kind)
        .map(|owner| owner.name.clone())
}

/// Discovery endpoint of a realm served by the given Keycloak instance
pub fn discovery_url(keycloak: &Keycloak, realm: &KeycloakRealm) -> String {
    format!("{}/auth/realms/{}", keycloak.spec.url.trim_end_matches('/'), realm.spec.realm_name)
}
