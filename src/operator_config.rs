use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::{
    constants,
    model::{Error, Result},
};

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct OperatorConfig {
    pub platform: PlatformType,
    /// Namespace to watch. Empty means all namespaces.
    pub watch_namespace: Option<String>,
    pub requeue_delay_seconds: u64,
    pub assets_dir: String,
    pub deployment_type: DeploymentType,
    pub ingress: IngressConfig,
    pub security_context: SecurityConfig,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            platform: PlatformType::Kubernetes,
            watch_namespace: None,
            requeue_delay_seconds: constants::RECONCILE_FREQUENCY,
            assets_dir: constants::DEFAULT_ASSETS_DIR.to_owned(),
            deployment_type: DeploymentType::DeploymentConfigs,
            ingress: IngressConfig::default(),
            security_context: SecurityConfig::default(),
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct IngressConfig {
    pub ingress_class_name: Option<String>,
    pub annotations: Option<BTreeMap<String, String>>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SecurityConfig {
    pub run_as_user: i64,
    pub run_as_group: i64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self { run_as_user: 1001, run_as_group: 1001 }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PlatformType {
    Kubernetes,
    Openshift,
}

impl Display for PlatformType {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            PlatformType::Kubernetes => write!(f, "kubernetes"),
            PlatformType::Openshift => write!(f, "openshift"),
        }
    }
}

impl FromStr for PlatformType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "kubernetes" => Ok(PlatformType::Kubernetes),
            "openshift" => Ok(PlatformType::Openshift),
            other => Err(Error::ConfigError(format!("unknown platform type {other}"))),
        }
    }
}

/// Workload kind managed on OpenShift
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub enum DeploymentType {
    Deployments,
    DeploymentConfigs,
}

impl FromStr for DeploymentType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "deployments" => Ok(DeploymentType::Deployments),
            "deploymentConfigs" => Ok(DeploymentType::DeploymentConfigs),
            other => Err(Error::ConfigError(format!("unknown deployment type {other}"))),
        }
    }
}

impl OperatorConfig {
    /// Loads the configuration file named by `OPERATOR_CONFIG`, then applies environment overrides.
    pub fn load() -> Result<Self> {
        let config = match std::env::var(constants::OPERATOR_CONFIG) {
            Ok(path) if !path.is_empty() => Self::from_file(Path::new(&path))?,
            _ => Self::default(),
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let config_file = std::fs::File::open(path)
            .map_err(|error| Error::ConfigError(format!("could not open config file {}: {error}", path.display())))?;
        let config: OperatorConfig = serde_yaml::from_reader(config_file)?;
        info!("Loaded operator configuration from {}", path.display());
        Ok(config)
    }

    /// Applies overrides from a variable lookup, normally the process environment.
    pub fn with_overrides<F: Fn(&str) -> Option<String>>(mut self, lookup: F) -> Result<Self> {
        if let Some(platform) = lookup(constants::PLATFORM_TYPE) {
            self.platform = platform.parse()?;
        }
        if let Some(namespace) = lookup(constants::WATCH_NAMESPACE) {
            self.watch_namespace = Some(namespace).filter(|namespace| !namespace.is_empty());
        }
        if let Some(deployment_type) = lookup(constants::DEPLOYMENT_TYPE) {
            self.deployment_type = deployment_type.parse()?;
        }
        if let Some(assets_dir) = lookup(constants::ASSETS_DIR) {
            self.assets_dir = assets_dir;
        }
        if self.requeue_delay_seconds == 0 {
            return Err(Error::ConfigError("requeueDelaySeconds must be greater than zero".to_owned()));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: OperatorConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, OperatorConfig::default());
        assert_eq!(config.requeue_delay_seconds, 30);
        assert_eq!(config.security_context.run_as_user, 1001);
        assert_eq!(config.deployment_type, DeploymentType::DeploymentConfigs);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
platform: openshift
watchNamespace: edp
requeueDelaySeconds: 10
deploymentType: deployments
ingress:
  ingressClassName: nginx
  annotations:
    cert-manager.io/cluster-issuer: letsencrypt
"#;
        let config: OperatorConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.platform, PlatformType::Openshift);
        assert_eq!(config.watch_namespace.as_deref(), Some("edp"));
        assert_eq!(config.deployment_type, DeploymentType::Deployments);
        assert_eq!(config.ingress.ingress_class_name.as_deref(), Some("nginx"));
        assert_eq!(config.assets_dir, constants::DEFAULT_ASSETS_DIR);
    }

    #[test]
    fn test_env_overrides() {
        let config = OperatorConfig::default()
            .with_overrides(|key| match key {
                constants::PLATFORM_TYPE => Some("OpenShift".to_owned()),
                constants::WATCH_NAMESPACE => Some("".to_owned()),
                constants::ASSETS_DIR => Some("/tmp/img".to_owned()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.platform, PlatformType::Openshift);
        assert_eq!(config.watch_namespace, None);
        assert_eq!(config.assets_dir, "/tmp/img");
    }

    #[test]
    fn test_unknown_platform_is_rejected() {
        let result = OperatorConfig::default().with_overrides(|key| (key == constants::PLATFORM_TYPE).then(|| "nomad".to_owned()));
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }
}
