use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// Catalog entry advertising a platform service by URL and icon
#[derive(CustomResource, Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[kube(
    group = "v1.edp.epam.com",
    version = "v1alpha1",
    kind = "EDPComponent",
    namespaced,
    schema = "disabled"
)]
pub struct EdpComponentSpec {
    #[serde(rename = "type")]
    pub type_: String,
    pub url: String,
    /// Base64 encoded image
    pub icon: String,
    #[serde(default)]
    pub visible: bool,
}
