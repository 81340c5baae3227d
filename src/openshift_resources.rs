use k8s_openapi::{api::core::v1::PodTemplateSpec, ClusterResourceScope};
use kube::{
    core::{ObjectMeta, TypeMeta},
    CustomResource, Resource,
};
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, collections::BTreeMap};

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RouteTargetReference {
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RoutePort {
    pub target_port: String,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TlsConfig {
    pub termination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure_edge_termination_policy: Option<String>,
}

/// OpenShift router entry point
#[derive(CustomResource, Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[kube(group = "route.openshift.io", version = "v1", kind = "Route", namespaced, schema = "disabled")]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub to: RouteTargetReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<RoutePort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wildcard_policy: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentTriggerPolicy {
    #[serde(rename = "type")]
    pub type_: String,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStrategy {
    #[serde(rename = "type")]
    pub type_: String,
}

/// OpenShift workload redeployed on configuration change
#[derive(CustomResource, Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[kube(
    group = "apps.openshift.io",
    version = "v1",
    kind = "DeploymentConfig",
    namespaced,
    status = "DeploymentConfigStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfigSpec {
    pub replicas: i32,
    #[serde(default)]
    pub selector: BTreeMap<String, String>,
    pub template: PodTemplateSpec,
    #[serde(default)]
    pub triggers: Vec<DeploymentTriggerPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<DeploymentStrategy>,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfigStatus {
    #[serde(default)]
    pub updated_replicas: i32,
    #[serde(default)]
    pub available_replicas: i32,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
pub struct StrategyOptions {
    #[serde(rename = "type")]
    pub type_: String,
}

impl StrategyOptions {
    pub fn of(type_: &str) -> Self {
        Self { type_: type_.to_owned() }
    }
}

/// Cluster scoped pod security policy. Its fields live at the top level of the object,
/// so the `kube::Resource` impl is written out instead of derived.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SecurityContextConstraints {
    #[serde(flatten, default)]
    pub types: Option<TypeMeta>,
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub allow_host_dir_volume_plugin: bool,
    #[serde(default, rename = "allowHostIPC")]
    pub allow_host_ipc: bool,
    #[serde(default)]
    pub allow_host_network: bool,
    #[serde(default, rename = "allowHostPID")]
    pub allow_host_pid: bool,
    #[serde(default)]
    pub allow_host_ports: bool,
    #[serde(default)]
    pub allow_privileged_container: bool,
    #[serde(default)]
    pub allow_privilege_escalation: bool,
    #[serde(default)]
    pub read_only_root_filesystem: bool,
    #[serde(default)]
    pub required_drop_capabilities: Vec<String>,
    #[serde(default)]
    pub fs_group: StrategyOptions,
    #[serde(default)]
    pub run_as_user: StrategyOptions,
    #[serde(default, rename = "seLinuxContext")]
    pub se_linux_context: StrategyOptions,
    #[serde(default)]
    pub supplemental_groups: StrategyOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub volumes: Vec<String>,
}

impl Resource for SecurityContextConstraints {
    type DynamicType = ();
    type Scope = ClusterResourceScope;

    fn kind(_: &()) -> Cow<'_, str> {
        "SecurityContextConstraints".into()
    }

    fn group(_: &()) -> Cow<'_, str> {
        "security.openshift.io".into()
    }

    fn version(_: &()) -> Cow<'_, str> {
        "v1".into()
    }

    fn plural(_: &()) -> Cow<'_, str> {
        "securitycontextconstraints".into()
    }

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

impl SecurityContextConstraints {
    pub fn type_meta() -> TypeMeta {
        TypeMeta {
            api_version: "security.openshift.io/v1".to_owned(),
            kind: "SecurityContextConstraints".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scc_wire_format() {
        let scc = SecurityContextConstraints {
            types: Some(SecurityContextConstraints::type_meta()),
            metadata: ObjectMeta {
                name: Some("edp-admin-console-edp".to_owned()),
                ..ObjectMeta::default()
            },
            allow_host_ipc: true,
            se_linux_context: StrategyOptions::of("MustRunAs"),
            users: vec!["system:serviceaccount:edp:edp-admin-console".to_owned()],
            ..SecurityContextConstraints::default()
        };
        let value = serde_json::to_value(&scc).unwrap();
        assert_eq!(value["apiVersion"], "security.openshift.io/v1");
        assert_eq!(value["allowHostIPC"], true);
        assert_eq!(value["seLinuxContext"]["type"], "MustRunAs");
        assert_eq!(value["users"][0], "system:serviceaccount:edp:edp-admin-console");
    }

    #[test]
    fn test_deployment_config_status() {
        let json = serde_json::json!({
            "apiVersion": "apps.openshift.io/v1",
            "kind": "DeploymentConfig",
            "metadata": {"name": "edp-admin-console"},
            "spec": {"replicas": 1, "template": {}},
            "status": {"updatedReplicas": 1, "availableReplicas": 0}
        });
        let deployment_config: DeploymentConfig = serde_json::from_value(json).unwrap();
        let status = deployment_config.status.unwrap();
        assert_eq!(status.updated_replicas, 1);
        assert_eq!(status.available_replicas, 0);
    }
}
