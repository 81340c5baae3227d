use async_trait::async_trait;
use kube::{
    api::{Api, Patch, PatchParams, PostParams},
    runtime::events::{Recorder, Reporter},
    Client, Resource, ResourceExt,
};
use serde_json::json;
use tracing::{debug, warn};

#[cfg(test)]
use mockall::automock;

use crate::{
    admin_console::AdminConsole,
    events::{AdminConsoleEventEnum, ResourceEvent},
    model::{Error, Result},
};

/// Read and write access to AdminConsole resources
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AdminConsoleClient: Send + Sync {
    /// Fetches the resource, failing with `Error::NotFound` when it does not exist
    async fn get(&self, name: &str, namespace: &str) -> Result<AdminConsole>;

    /// Full object update
    async fn update(&self, admin_console: &AdminConsole) -> Result<AdminConsole>;

    /// Writes `status` through the status subresource
    async fn update_status(&self, admin_console: &AdminConsole) -> Result<AdminConsole>;

    /// Records a Kubernetes event on the resource. Failures are only logged.
    async fn publish_event(&self, admin_console: &AdminConsole, event: AdminConsoleEventEnum, attribute: Option<String>);
}

pub struct KubeAdminConsoleClient {
    client: Client,
    reporter: Reporter,
}

impl KubeAdminConsoleClient {
    pub fn new(client: Client, reporter: Reporter) -> Self {
        Self { client, reporter }
    }

    fn api(&self, namespace: &str) -> Api<AdminConsole> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl AdminConsoleClient for KubeAdminConsoleClient {
    async fn get(&self, name: &str, namespace: &str) -> Result<AdminConsole> {
        match self.api(namespace).get(name).await {
            Ok(admin_console) => Ok(admin_console),
            Err(kube::Error::Api(response)) if response.code == 404 => {
                Err(Error::NotFound(format!("AdminConsole {namespace}/{name}")))
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn update(&self, admin_console: &AdminConsole) -> Result<AdminConsole> {
        let api = self.api(&admin_console.target_namespace());
        let updated = api.replace(&admin_console.name_any(), &PostParams::default(), admin_console).await?;
        debug!("AdminConsole {} updated", admin_console.name_any());
        Ok(updated)
    }

    async fn update_status(&self, admin_console: &AdminConsole) -> Result<AdminConsole> {
        let api = self.api(&admin_console.target_namespace());
        let patch = Patch::Merge(json!({ "status": admin_console.status }));
        let updated = api.patch_status(&admin_console.name_any(), &PatchParams::default(), &patch).await?;
        Ok(updated)
    }

    async fn publish_event(&self, admin_console: &AdminConsole, event: AdminConsoleEventEnum, attribute: Option<String>) {
        let recorder = Recorder::new(self.client.clone(), self.reporter.clone(), admin_console.object_ref(&()));
        if let Err(error) = recorder.publish(event.to_event(attribute)).await {
            warn!("Could not publish event on AdminConsole {}: {:?}", admin_console.name_any(), error);
        }
    }
}
