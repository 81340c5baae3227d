use kube::{
    api::{Api, PostParams},
    Resource, ResourceExt,
};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use tracing::{debug, info};

use crate::{
    admin_console::AdminConsole,
    model::{Error, Result},
};

/// Marks the AdminConsole as the controlling owner of `resource`, so that deleting the
/// AdminConsole garbage collects everything created for it.
pub fn set_owner<K: Resource>(resource: &mut K, admin_console: &AdminConsole) -> Result<()> {
    let owner = admin_console
        .controller_owner_ref(&())
        .ok_or_else(|| Error::validation(format!("AdminConsole {} has no uid yet", admin_console.name_any())))?;
    let owner_references = resource.meta_mut().owner_references.get_or_insert_with(Vec::new);
    if !owner_references.iter().any(|reference| reference.uid == owner.uid) {
        owner_references.push(owner);
    }
    Ok(())
}

/// Returns the stored object with the same name, creating `resource` when it does not exist.
pub async fn get_or_create<K>(api: &Api<K>, resource: &K) -> Result<K>
where
    K: Resource<DynamicType = ()> + Clone + Debug + DeserializeOwned + Serialize,
{
    let name = resource.name_any();
    if let Some(existing) = api.get_opt(&name).await? {
        debug!("{} {name} already exists", K::kind(&()));
        return Ok(existing);
    }
    match api.create(&PostParams::default(), resource).await {
        Ok(created) => {
            info!("{} {name} created successfully", K::kind(&()));
            Ok(created)
        }
        // Created concurrently between the lookup and the create
        Err(kube::Error::Api(response)) if response.code == 409 => Ok(api.get(&name).await?),
        Err(error) => Err(error.into()),
    }
}

/// Creates `desired` when absent, replaces the stored object when `differs(observed, desired)`
/// holds, and otherwise returns the stored object untouched.
pub async fn converge<K, F>(api: &Api<K>, mut desired: K, differs: F) -> Result<K>
where
    K: Resource<DynamicType = ()> + Clone + Debug + DeserializeOwned + Serialize,
    F: Fn(&K, &K) -> bool,
{
    let name = desired.name_any();
    match api.get_opt(&name).await? {
        None => {
            let created = api.create(&PostParams::default(), &desired).await?;
            info!("{} {name} created successfully", K::kind(&()));
            Ok(created)
        }
        Some(observed) if differs(&observed, &desired) => {
            desired.meta_mut().resource_version = observed.meta().resource_version.clone();
            let updated = api.replace(&name, &PostParams::default(), &desired).await?;
            info!("{} {name} drifted from the desired state and was updated", K::kind(&()));
            Ok(updated)
        }
        Some(observed) => {
            debug!("{} {name} is up to date", K::kind(&()));
            Ok(observed)
        }
    }
}
