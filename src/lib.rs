//! Kubernetes operator installing the EDP admin console.

pub mod admin_console;
pub mod admin_console_client;
pub mod admin_console_service;
pub mod constants;
pub mod context_data;
pub mod controller_admin_console;
pub mod edp_component;
pub mod events;
pub mod keycloak;
pub mod model;
pub mod openshift_resources;
pub mod operator_config;
pub mod platform;
pub mod resource_generics;
pub mod utils;
