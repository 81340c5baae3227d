use k8s_openapi::{
    api::{
        apps::v1::Deployment,
        core::v1::{
            Capabilities, Container, ContainerPort, EmptyDirVolumeSource, EnvVar, LocalObjectReference, PodSecurityContext,
            PodSpec, PodTemplateSpec, Probe, ResourceRequirements, SecurityContext, TCPSocketAction, Volume, VolumeMount,
        },
    },
    apimachinery::pkg::{api::resource::Quantity, apis::meta::v1::ObjectMeta, util::intstr::IntOrString},
};
use json_patch::{AddOperation, Patch, PatchOperation};
use kube::ResourceExt;
use std::collections::BTreeMap;

use crate::{admin_console::AdminConsole, constants, model::Result, operator_config::SecurityConfig, platform::environment, utils};

/// Pod template shared by the Deployment and the DeploymentConfig
pub fn build_pod_template(admin_console: &AdminConsole, env: Vec<EnvVar>, security: &SecurityConfig) -> PodTemplateSpec {
    let name = admin_console.name_any();
    PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(utils::common_lables(&name)),
            ..ObjectMeta::default()
        }),
        spec: Some(PodSpec {
            service_account_name: Some(name.to_owned()),
            image_pull_secrets: build_image_pull_secrets(admin_console),
            security_context: Some(PodSecurityContext {
                run_as_non_root: Some(true),
                run_as_user: Some(security.run_as_user),
                run_as_group: Some(security.run_as_group),
                fs_group: Some(security.run_as_group),
                ..PodSecurityContext::default()
            }),
            containers: vec![Container {
                name: name.to_owned(),
                image: Some(format!("{}:{}", admin_console.spec.image, admin_console.spec.version)),
                image_pull_policy: Some("Always".to_owned()),
                ports: Some(vec![ContainerPort {
                    name: Some(constants::PORT_NAME.to_owned()),
                    container_port: constants::CONTAINER_PORT,
                    protocol: Some("TCP".to_owned()),
                    ..ContainerPort::default()
                }]),
                env: Some(env),
                liveness_probe: Some(build_probe(constants::LIVENESS_INITIAL_DELAY)),
                readiness_probe: Some(build_probe(constants::READINESS_INITIAL_DELAY)),
                resources: Some(ResourceRequirements {
                    requests: Some(BTreeMap::from([("memory".to_owned(), Quantity(constants::MEMORY_REQUEST.to_owned()))])),
                    ..ResourceRequirements::default()
                }),
                security_context: Some(build_security_context(security)),
                volume_mounts: Some(vec![VolumeMount {
                    name: constants::TMP_VOLUME.to_owned(),
                    mount_path: "/tmp".to_owned(),
                    ..VolumeMount::default()
                }]),
                termination_message_path: Some("/dev/termination-log".to_owned()),
                ..Container::default()
            }],
            volumes: Some(vec![Volume {
                name: constants::TMP_VOLUME.to_owned(),
                empty_dir: Some(EmptyDirVolumeSource::default()),
                ..Volume::default()
            }]),
            ..PodSpec::default()
        }),
    }
}

/// Initial environment followed by `extra_env`
pub fn build_env(admin_console: &AdminConsole, url: &str, extra_env: &[EnvVar]) -> Vec<EnvVar> {
    environment::merge_env(&environment::initial_env(admin_console, url), extra_env)
}

fn build_image_pull_secrets(admin_console: &AdminConsole) -> Option<Vec<LocalObjectReference>> {
    admin_console.spec.image_pull_secrets.as_ref().map(|secrets| {
        secrets
            .iter()
            .map(|secret| LocalObjectReference { name: Some(secret.name.to_owned()) })
            .collect()
    })
}

fn build_security_context(security: &SecurityConfig) -> SecurityContext {
    SecurityContext {
        allow_privilege_escalation: Some(false),
        read_only_root_filesystem: Some(true),
        run_as_non_root: Some(true),
        run_as_user: Some(security.run_as_user),
        run_as_group: Some(security.run_as_group),
        capabilities: Some(Capabilities {
            drop: Some(vec!["ALL".to_owned()]),
            ..Capabilities::default()
        }),
        ..SecurityContext::default()
    }
}

fn build_probe(initial_delay_seconds: i32) -> Probe {
    Probe {
        tcp_socket: Some(TCPSocketAction {
            port: IntOrString::Int(constants::CONTAINER_PORT),
            ..TCPSocketAction::default()
        }),
        initial_delay_seconds: Some(initial_delay_seconds),
        period_seconds: Some(constants::PROBE_PERIOD),
        failure_threshold: Some(constants::PROBE_FAILURE_THRESHOLD),
        timeout_seconds: Some(constants::PROBE_TIMEOUT),
        ..Probe::default()
    }
}

/// Index of the console container: the one named after the resource, or the only one.
pub fn select_container(containers: &[Container], name: &str) -> Option<usize> {
    containers
        .iter()
        .position(|container| container.name == name)
        .or_else(|| (containers.len() == 1).then_some(0))
}

/// JSON patch replacing the console container environment in place with the merged
/// environment. `None` when the container is missing or nothing would change.
pub fn env_patch(template: &PodTemplateSpec, name: &str, new_env: &[EnvVar]) -> Result<Option<Patch>> {
    let Some(spec) = template.spec.as_ref() else {
        return Ok(None);
    };
    let Some(index) = select_container(&spec.containers, name) else {
        return Ok(None);
    };
    let existing = spec.containers[index].env.clone().unwrap_or_default();
    let merged = environment::merge_env(&existing, new_env);
    if merged == existing {
        return Ok(None);
    }
    let value = serde_json::to_value(merged)?;
    Ok(Some(Patch(vec![PatchOperation::Add(AddOperation {
        path: format!("/spec/template/spec/containers/{index}/env"),
        value,
    })])))
}

pub fn is_deployment_ready(deployment: &Deployment) -> bool {
    deployment
        .status
        .as_ref()
        .map_or(false, |status| status.updated_replicas == Some(1) && status.available_replicas == Some(1))
}
