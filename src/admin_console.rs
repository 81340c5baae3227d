use chrono::{DateTime, Utc};
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Reference to a pull secret, passed through verbatim to the workload
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
pub struct ImagePullSecret {
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone, JsonSchema)]
pub struct KeycloakSpec {
    #[serde(default)]
    pub enabled: bool,
}

/// Platform metadata rendered into the console environment
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EdpSpec {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dns_wildcard: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_strategies: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_report_tools: Option<String>,
}

/// Shared database connection descriptor
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone, JsonSchema)]
pub struct DbSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub port: String,
    #[serde(default)]
    pub enabled: bool,
}

/// A generated object the console configuration depends on
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
pub struct ExternalConfigurationItem {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub description: String,
}

/// AdminConsole describes one EDP admin console installation.
#[derive(CustomResource, Serialize, Deserialize, Debug, Default, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "v2.edp.epam.com",
    version = "v1",
    kind = "AdminConsole",
    plural = "adminconsoles",
    shortname = "ac",
    namespaced,
    status = "AdminConsoleStatus",
    printcolumn = r#"{"name": "Status", "type": "string", "jsonPath": ".status.status"}"#,
    printcolumn = r#"{"name": "Available", "type": "boolean", "jsonPath": ".status.available"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AdminConsoleSpec {
    pub image: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_secrets: Option<Vec<ImagePullSecret>>,
    #[serde(default)]
    pub keycloak_spec: KeycloakSpec,
    #[serde(default)]
    pub edp_spec: EdpSpec,
    #[serde(default)]
    pub db_spec: DbSpec,
    #[serde(default)]
    pub base_path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_configuration: Vec<ExternalConfigurationItem>,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminConsoleStatus {
    #[serde(default)]
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_time_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: String,
}

/// Position of an AdminConsole in the installation pipeline
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AdminConsolePhase {
    Unset,
    Failed,
    Installing,
    Created,
    ExposingConfig,
    ConfigExposed,
    IntegrationStarted,
    Ready,
}

impl AdminConsolePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminConsolePhase::Unset => "",
            AdminConsolePhase::Failed => "failed",
            AdminConsolePhase::Installing => "installing",
            AdminConsolePhase::Created => "created",
            AdminConsolePhase::ExposingConfig => "exposing config",
            AdminConsolePhase::ConfigExposed => "config exposed",
            AdminConsolePhase::IntegrationStarted => "integration started",
            AdminConsolePhase::Ready => "ready",
        }
    }

    /// Unknown values restart the pipeline.
    pub fn from_status(status: &str) -> Self {
        match status {
            "failed" => AdminConsolePhase::Failed,
            "installing" => AdminConsolePhase::Installing,
            "created" => AdminConsolePhase::Created,
            "exposing config" => AdminConsolePhase::ExposingConfig,
            "config exposed" => AdminConsolePhase::ConfigExposed,
            "integration started" => AdminConsolePhase::IntegrationStarted,
            "ready" => AdminConsolePhase::Ready,
            _ => AdminConsolePhase::Unset,
        }
    }
}

impl Display for AdminConsolePhase {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl AdminConsole {
    pub fn phase(&self) -> AdminConsolePhase {
        self.status
            .as_ref()
            .map_or(AdminConsolePhase::Unset, |status| AdminConsolePhase::from_status(&status.status))
    }

    pub fn is_available(&self) -> bool {
        self.status.as_ref().map_or(false, |status| status.available)
    }

    pub fn target_namespace(&self) -> String {
        self.namespace().unwrap_or_default()
    }

    pub fn sso_enabled(&self) -> bool {
        self.spec.keycloak_spec.enabled
    }

    /// Base path without leading or trailing slashes
    pub fn trimmed_base_path(&self) -> &str {
        self.spec.base_path.trim_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHASES: [AdminConsolePhase; 8] = [
        AdminConsolePhase::Unset,
        AdminConsolePhase::Failed,
        AdminConsolePhase::Installing,
        AdminConsolePhase::Created,
        AdminConsolePhase::ExposingConfig,
        AdminConsolePhase::ConfigExposed,
        AdminConsolePhase::IntegrationStarted,
        AdminConsolePhase::Ready,
    ];

    #[test]
    fn test_phase_strings_are_stable() {
        for phase in PHASES {
            assert_eq!(AdminConsolePhase::from_status(phase.as_str()), phase);
        }
        assert_eq!(AdminConsolePhase::ExposingConfig.to_string(), "exposing config");
    }

    #[test]
    fn test_unknown_status_restarts_pipeline() {
        assert_eq!(AdminConsolePhase::from_status("deploying"), AdminConsolePhase::Unset);
    }

    #[test]
    fn test_deserialize_resource() {
        let yaml = r#"
apiVersion: v2.edp.epam.com/v1
kind: AdminConsole
metadata:
  name: edp-admin-console
  namespace: edp
spec:
  image: epamedp/edp-admin-console
  version: 2.4.0
  basePath: /console/
  imagePullSecrets:
    - name: regcred
  keycloakSpec:
    enabled: true
  edpSpec:
    version: 2.4.0
    name: edp
    dnsWildcard: example.com
  dbSpec:
    enabled: true
    name: edp-db
    hostname: edp-db
    port: "5432"
status:
  available: false
  status: created
"#;
        let admin_console: AdminConsole = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(admin_console.phase(), AdminConsolePhase::Created);
        assert!(admin_console.sso_enabled());
        assert_eq!(admin_console.trimmed_base_path(), "console");
        assert_eq!(admin_console.target_namespace(), "edp");
        assert_eq!(admin_console.spec.image_pull_secrets.unwrap()[0].name, "regcred");
    }
}
