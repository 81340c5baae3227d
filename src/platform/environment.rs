use k8s_openapi::api::core::v1::{EnvVar, EnvVarSource, ObjectFieldSelector, SecretKeySelector};
use kube::ResourceExt;

use crate::{
    admin_console::AdminConsole,
    constants,
    model::{Error, Result},
    utils,
};

pub fn env_var(name: &str, value: impl Into<String>) -> EnvVar {
    EnvVar {
        name: name.to_owned(),
        value: Some(value.into()),
        ..EnvVar::default()
    }
}

pub fn secret_env_var(name: &str, secret: &str, key: &str) -> EnvVar {
    EnvVar {
        name: name.to_owned(),
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: Some(secret.to_owned()),
                key: key.to_owned(),
                ..SecretKeySelector::default()
            }),
            ..EnvVarSource::default()
        }),
        ..EnvVar::default()
    }
}

fn field_env_var(name: &str, field_path: &str) -> EnvVar {
    EnvVar {
        name: name.to_owned(),
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                field_path: field_path.to_owned(),
                ..ObjectFieldSelector::default()
            }),
            ..EnvVarSource::default()
        }),
        ..EnvVar::default()
    }
}

/// Shared database connection settings. Enabled settings must name the host, port and database.
pub fn generate_db_settings(admin_console: &AdminConsole) -> Result<Vec<EnvVar>> {
    let db = &admin_console.spec.db_spec;
    if !db.enabled {
        return Ok(vec![env_var(constants::ENV_DB_ENABLED, "false")]);
    }
    if utils::contains_empty(&[db.name.as_str(), db.hostname.as_str(), db.port.as_str()]) {
        return Err(Error::validation(format!(
            "dbSpec of {} is enabled but name, hostname and port are not all set",
            admin_console.name_any()
        )));
    }
    Ok(vec![
        env_var(constants::ENV_PG_HOST, db.hostname.as_str()),
        env_var(constants::ENV_PG_PORT, db.port.as_str()),
        env_var(constants::ENV_PG_DATABASE, db.name.as_str()),
        env_var(constants::ENV_DB_ENABLED, "true"),
    ])
}

pub fn generate_keycloak_settings(admin_console: &AdminConsole, discovery_url: &str) -> Vec<EnvVar> {
    if !admin_console.sso_enabled() {
        return Vec::new();
    }
    vec![
        secret_env_var(constants::ENV_KEYCLOAK_CLIENT_ID, constants::SSO_CLIENT_SECRET_NAME, constants::SECRET_USERNAME_KEY),
        secret_env_var(constants::ENV_KEYCLOAK_CLIENT_SECRET, constants::SSO_CLIENT_SECRET_NAME, constants::SECRET_PASSWORD_KEY),
        env_var(constants::ENV_KEYCLOAK_URL, discovery_url),
        env_var(constants::ENV_AUTH_KEYCLOAK_ENABLED, "true"),
    ]
}

/// Environment the console workload starts with
pub fn initial_env(admin_console: &AdminConsole, url: &str) -> Vec<EnvVar> {
    let spec = &admin_console.spec;
    vec![
        field_env_var(constants::ENV_NAMESPACE, "metadata.namespace"),
        env_var(constants::ENV_HOST, url),
        env_var(constants::ENV_BASE_PATH, base_path(admin_console)),
        env_var(constants::ENV_ADMIN_CONSOLE_VERSION, spec.version.as_str()),
        env_var(constants::ENV_EDP_VERSION, spec.edp_spec.version.as_str()),
        env_var(constants::ENV_AUTH_KEYCLOAK_ENABLED, "false"),
        env_var(constants::ENV_DNS_WILDCARD, spec.edp_spec.dns_wildcard.as_str()),
        secret_env_var(constants::ENV_PG_USER, constants::DB_SECRET_NAME, constants::SECRET_USERNAME_KEY),
        secret_env_var(constants::ENV_PG_PASSWORD, constants::DB_SECRET_NAME, constants::SECRET_PASSWORD_KEY),
        env_var(
            constants::ENV_INTEGRATION_STRATEGIES,
            spec.edp_spec.integration_strategies.clone().unwrap_or_default(),
        ),
    ]
}

/// `/{basePath}` or empty
pub fn base_path(admin_console: &AdminConsole) -> String {
    match admin_console.trimmed_base_path() {
        "" => String::new(),
        path => format!("/{path}"),
    }
}

/// Union of both lists by variable name: existing order is kept, variables present in
/// `new_env` take its value and unknown ones are appended.
pub fn merge_env(existing: &[EnvVar], new_env: &[EnvVar]) -> Vec<EnvVar> {
    let mut merged: Vec<EnvVar> = existing
        .iter()
        .map(|current| new_env.iter().find(|candidate| candidate.name == current.name).unwrap_or(current).clone())
        .collect();
    for candidate in new_env {
        if !merged.iter().any(|current| current.name == candidate.name) {
            merged.push(candidate.clone());
        }
    }
    merged
}
