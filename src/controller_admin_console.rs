use chrono::Utc;
use futures::StreamExt;
use k8s_openapi::api::{
    apps::v1::Deployment,
    core::v1::{Secret, Service, ServiceAccount},
    networking::v1::Ingress,
};
use kube::{
    api::Api,
    client::Client,
    runtime::{
        controller::{Action, Controller},
        watcher::Config,
    },
    ResourceExt,
};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{error, info, warn};

use crate::{
    admin_console::{AdminConsole, AdminConsolePhase},
    admin_console_client::AdminConsoleClient,
    admin_console_service::AdminConsoleService,
    context_data::ContextData,
    events::AdminConsoleEventEnum,
    model::{Error, Result, ResultExt},
    openshift_resources::{DeploymentConfig, Route},
    operator_config::{DeploymentType, PlatformType},
};

/// Drives an AdminConsole through the installation pipeline, one step per status value:
///
/// ```text
/// "" / failed -> installing -> created -> exposing config -> config exposed
///             -> integration started -> ready
/// ```
///
/// Every pass re-reads the resource and re-runs the idempotent phases, advancing the status
/// only from the value it expects. Failures mark the resource `failed` and requeue.
#[derive(Clone)]
pub struct Reconciler {
    resources: Arc<dyn AdminConsoleClient>,
    service: AdminConsoleService,
    requeue_delay: Duration,
}

impl Reconciler {
    pub fn new(resources: Arc<dyn AdminConsoleClient>, service: AdminConsoleService, requeue_delay: Duration) -> Self {
        Self {
            resources,
            service,
            requeue_delay,
        }
    }

    pub fn requeue_delay(&self) -> Duration {
        self.requeue_delay
    }

    pub async fn reconcile(&self, name: &str, namespace: &str) -> Result<Action> {
        let mut admin_console = match self.resources.get(name, namespace).await {
            Ok(admin_console) => admin_console,
            Err(error) if error.is_not_found() => {
                info!("AdminConsole {namespace}/{name} no longer exists");
                return Ok(Action::await_change());
            }
            Err(error) => return Err(error.context(format!("failed to fetch AdminConsole {namespace}/{name}"))),
        };
        info!(name, namespace, status = %admin_console.phase(), "Reconciling AdminConsole");

        let retrying = admin_console.phase() == AdminConsolePhase::Failed;
        match admin_console.phase() {
            AdminConsolePhase::Unset => admin_console = self.set_phase(admin_console, AdminConsolePhase::Installing).await?,
            AdminConsolePhase::Failed => admin_console = self.write_phase(admin_console, AdminConsolePhase::Installing).await?,
            _ => {}
        }

        admin_console = match self.service.install(admin_console.clone()).await {
            Ok(installed) => installed,
            Err(error) => return self.fail(admin_console, error, retrying).await,
        };

        if admin_console.phase() == AdminConsolePhase::Installing {
            admin_console = self.set_phase(admin_console, AdminConsolePhase::Created).await?;
        }

        match self.service.is_deployment_ready(&admin_console).await {
            Ok(true) => {}
            Ok(false) => {
                info!("Workload of AdminConsole {namespace}/{name} is not ready yet");
                return Ok(Action::requeue(self.requeue_delay));
            }
            Err(error) => {
                warn!("Could not check workload readiness of AdminConsole {namespace}/{name}: {error}");
                return Ok(Action::requeue(self.requeue_delay));
            }
        }

        if admin_console.phase() == AdminConsolePhase::Created {
            admin_console = self.set_phase(admin_console, AdminConsolePhase::ExposingConfig).await?;
        }

        admin_console = match self.service.expose_configuration(admin_console.clone()).await {
            Ok(exposed) => exposed,
            Err(error) => return self.fail(admin_console, error, retrying).await,
        };

        if admin_console.phase() == AdminConsolePhase::ExposingConfig {
            admin_console = self.set_phase(admin_console, AdminConsolePhase::ConfigExposed).await?;
        }

        if admin_console.phase() == AdminConsolePhase::ConfigExposed {
            admin_console = self.set_phase(admin_console, AdminConsolePhase::IntegrationStarted).await?;
        }

        admin_console = match self.service.integrate(admin_console.clone()).await {
            Ok(integrated) => integrated,
            Err(error) => return self.fail(admin_console, error, retrying).await,
        };

        if admin_console.phase() == AdminConsolePhase::IntegrationStarted {
            admin_console = self.set_phase(admin_console, AdminConsolePhase::Ready).await?;
        }

        if !admin_console.is_available() {
            self.set_available(admin_console).await?;
        }

        info!("AdminConsole {namespace}/{name} reconciled");
        Ok(Action::await_change())
    }

    async fn set_phase(&self, admin_console: AdminConsole, phase: AdminConsolePhase) -> Result<AdminConsole> {
        let updated = self.write_phase(admin_console, phase).await?;
        if let Some(event) = AdminConsoleEventEnum::from_phase(phase) {
            self.resources.publish_event(&updated, event, None).await;
        }
        Ok(updated)
    }

    /// Persists the phase without announcing it
    async fn write_phase(&self, mut admin_console: AdminConsole, phase: AdminConsolePhase) -> Result<AdminConsole> {
        let status = admin_console.status.get_or_insert_with(Default::default);
        status.status = phase.as_str().to_owned();
        status.last_time_updated = Some(Utc::now());
        let updated = self.persist_status(&admin_console).await?;
        info!("AdminConsole {} moved to status '{}'", admin_console.name_any(), phase);
        Ok(updated)
    }

    async fn set_available(&self, mut admin_console: AdminConsole) -> Result<AdminConsole> {
        let status = admin_console.status.get_or_insert_with(Default::default);
        status.available = true;
        status.last_time_updated = Some(Utc::now());
        let updated = self.persist_status(&admin_console).await?;
        self.resources.publish_event(&updated, AdminConsoleEventEnum::Available, None).await;
        Ok(updated)
    }

    /// Writes the status subresource, falling back to a full update when that is rejected
    async fn persist_status(&self, admin_console: &AdminConsole) -> Result<AdminConsole> {
        match self.resources.update_status(admin_console).await {
            Ok(updated) => Ok(updated),
            Err(error) => {
                warn!(
                    "Status update of AdminConsole {} was rejected, falling back to a full update: {error}",
                    admin_console.name_any()
                );
                self.resources
                    .update(admin_console)
                    .await
                    .with_context(|| format!("failed to update status of AdminConsole {}", admin_console.name_any()))
            }
        }
    }

    /// Marks the resource failed and requeues it. A retry that fails again before leaving
    /// `installing` has already been announced and stays quiet.
    async fn fail(&self, admin_console: AdminConsole, error: Error, retrying: bool) -> Result<Action> {
        let name = admin_console.name_any();
        error!("AdminConsole {}/{name} failed: {error}", admin_console.target_namespace());
        let repeated = retrying && admin_console.phase() == AdminConsolePhase::Installing;
        let failed = self.write_phase(admin_console, AdminConsolePhase::Failed).await?;
        if !repeated {
            self.resources
                .publish_event(&failed, AdminConsoleEventEnum::Failed, Some(error.to_string()))
                .await;
        }
        Ok(Action::requeue(self.requeue_delay))
    }
}

async fn reconciler(admin_console: Arc<AdminConsole>, context: Arc<ContextData>) -> Result<Action, Error> {
    context
        .reconciler
        .reconcile(&admin_console.name_any(), &admin_console.target_namespace())
        .await
}

/// Actions to be taken when a reconciliation fails - for whatever reason.
/// Logs the error and requeues the resource after the configured delay.
///
/// # Arguments
/// - `admin_console`: The erroneous resource.
/// - `error`: A reference to the `Error` that occurred during reconciliation.
/// - `context`: Context Data "injected" automatically by kube-rs.
pub fn on_error(admin_console: Arc<AdminConsole>, error: &Error, context: Arc<ContextData>) -> Action {
    error!("[AdminConsole] Reconciliation error on {}: {:?}", admin_console.name_any(), error);
    Action::requeue(context.reconciler.requeue_delay())
}

fn api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope, DynamicType = ()>,
{
    match namespace {
        Some(namespace) => Api::namespaced(client.clone(), namespace),
        None => Api::all(client.clone()),
    }
}

/// Initialize the controller
pub async fn run(client: Client, context_data: Arc<ContextData>) {
    let namespace = context_data.config.watch_namespace.clone();
    let namespace = namespace.as_deref();
    let owned_api = api::<AdminConsole>(&client, namespace);

    let mut controller = Controller::new(owned_api, Config::default())
        .owns(api::<ServiceAccount>(&client, namespace), Config::default())
        .owns(api::<Secret>(&client, namespace), Config::default())
        .owns(api::<Service>(&client, namespace), Config::default());
    controller = match context_data.config.platform {
        PlatformType::Kubernetes => controller
            .owns(api::<Ingress>(&client, namespace), Config::default())
            .owns(api::<Deployment>(&client, namespace), Config::default()),
        PlatformType::Openshift => {
            let controller = controller.owns(api::<Route>(&client, namespace), Config::default());
            match context_data.config.deployment_type {
                DeploymentType::DeploymentConfigs => controller.owns(api::<DeploymentConfig>(&client, namespace), Config::default()),
                DeploymentType::Deployments => controller.owns(api::<Deployment>(&client, namespace), Config::default()),
            }
        }
    };

    controller
        .shutdown_on_signal()
        .run(reconciler, on_error, context_data)
        .for_each(|reconciliation_result| async move {
            match reconciliation_result {
                Ok(_admin_console) => {}
                Err(reconciliation_err) => {
                    let err_string = reconciliation_err.to_string();
                    if !err_string.contains("that was not found in local store") {
                        // https://github.com/kube-rs/kube/issues/712
                        error!("[AdminConsole] Reconciliation error: {:?}", reconciliation_err)
                    }
                }
            }
        })
        .await;
}
