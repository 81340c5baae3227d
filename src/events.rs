use kube::runtime::events::{Event, EventType};

use crate::admin_console::AdminConsolePhase;

pub trait ResourceEvent {
    fn to_event(&self, attribute: Option<String>) -> Event;
}

pub enum AdminConsoleEventEnum {
    Installing,
    Created,
    ExposingConfig,
    ConfigExposed,
    IntegrationStarted,
    Ready,
    Available,
    Failed,
}

impl AdminConsoleEventEnum {
    pub fn from_phase(phase: AdminConsolePhase) -> Option<Self> {
        match phase {
            AdminConsolePhase::Unset => None,
            AdminConsolePhase::Failed => Some(AdminConsoleEventEnum::Failed),
            AdminConsolePhase::Installing => Some(AdminConsoleEventEnum::Installing),
            AdminConsolePhase::Created => Some(AdminConsoleEventEnum::Created),
            AdminConsolePhase::ExposingConfig => Some(AdminConsoleEventEnum::ExposingConfig),
            AdminConsolePhase::ConfigExposed => Some(AdminConsoleEventEnum::ConfigExposed),
            AdminConsolePhase::IntegrationStarted => Some(AdminConsoleEventEnum::IntegrationStarted),
            AdminConsolePhase::Ready => Some(AdminConsoleEventEnum::Ready),
        }
    }
}

impl ResourceEvent for AdminConsoleEventEnum {
    fn to_event(&self, attribute: Option<String>) -> Event {
        match self {
            AdminConsoleEventEnum::Installing => Event {
                type_: EventType::Normal,
                reason: "Installing".to_string(),
                note: Some("Installing the admin console".to_owned()),
                action: "Creating the admin console resources".to_string(),
                secondary: None,
            },
            AdminConsoleEventEnum::Created => Event {
                type_: EventType::Normal,
                reason: "Created".to_string(),
                note: Some("Admin console resources created".to_owned()),
                action: "Admin console resources created".to_string(),
                secondary: None,
            },
            AdminConsoleEventEnum::ExposingConfig => Event {
                type_: EventType::Normal,
                reason: "ExposingConfig".to_string(),
                note: Some("Exposing the admin console configuration".to_owned()),
                action: "Generating credentials and registrations".to_string(),
                secondary: None,
            },
            AdminConsoleEventEnum::ConfigExposed => Event {
                type_: EventType::Normal,
                reason: "ConfigExposed".to_string(),
                note: Some("Admin console configuration exposed".to_owned()),
                action: "Credentials and registrations created".to_string(),
                secondary: None,
            },
            AdminConsoleEventEnum::IntegrationStarted => Event {
                type_: EventType::Normal,
                reason: "IntegrationStarted".to_string(),
                note: Some("Integrating the admin console with SSO".to_owned()),
                action: "Patching the console environment".to_string(),
                secondary: None,
            },
            AdminConsoleEventEnum::Ready => Event {
                type_: EventType::Normal,
                reason: "Ready".to_string(),
                note: Some("Admin console is ready".to_owned()),
                action: "Admin console installation finished".to_string(),
                secondary: None,
            },
            AdminConsoleEventEnum::Available => Event {
                type_: EventType::Normal,
                reason: "Available".to_string(),
                note: Some("Admin console is available".to_owned()),
                action: "Admin console marked as available".to_string(),
                secondary: None,
            },
            AdminConsoleEventEnum::Failed => Event {
                type_: EventType::Warning,
                reason: "Failed".to_string(),
                note: Some(format!(
                    "Admin console reconciliation failed: {}",
                    attribute.as_ref().unwrap_or(&"unknown".to_string())
                )),
                action: "Admin console installation failed".to_string(),
                secondary: None,
            },
        }
    }
}
