// Operator Constants
pub const OPERATOR_NAME: &str = "admin-console-operator";
pub const RECONCILE_FREQUENCY: u64 = 30;
pub const DEFAULT_ASSETS_DIR: &str = "/usr/local/bin/templates/img";
pub const ADMIN_CONSOLE_ICON: &str = "admin-console.svg";

// Operator environment variables
pub const OPERATOR_CONFIG: &str = "OPERATOR_CONFIG";
pub const PLATFORM_TYPE: &str = "PLATFORM_TYPE";
pub const WATCH_NAMESPACE: &str = "WATCH_NAMESPACE";
pub const DEPLOYMENT_TYPE: &str = "DEPLOYMENT_TYPE";
pub const ASSETS_DIR: &str = "ASSETS_DIR";

// Labels
pub const LABEL_KUBERNETES_NAME: &str = "app.kubernetes.io/name";
pub const LABEL_KUBERNETES_INSTANCE: &str = "app.kubernetes.io/instance";
pub const LABEL_KUBERNETES_COMPONENT: &str = "app.kubernetes.io/component";
pub const LABEL_KUBERNETES_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const LABEL_APP: &str = "app";

// Generated secrets
pub const DB_SECRET_NAME: &str = "admin-console-db";
pub const READER_SECRET_NAME: &str = "admin-console-reader";
pub const READER_USERNAME: &str = "admin-console-reader";
pub const SSO_CLIENT_SECRET_NAME: &str = "admin-console-client";
pub const SSO_CLIENT_ID: &str = "admin-console-client";
pub const SECRET_USERNAME_KEY: &str = "username";
pub const SECRET_PASSWORD_KEY: &str = "password";
pub const SECRET_CLIENT_SECRET_KEY: &str = "clientSecret";
pub const PASSWORD_LENGTH: usize = 16;

// RBAC
pub const RESOURCES_ADMIN_ROLE: &str = "edp-resources-admin";
pub const RESOURCES_ADMIN_BINDING: &str = "edp-resources-admin";
pub const ADMIN_BINDING: &str = "edp-admin";
pub const ADMIN_CLUSTER_ROLE: &str = "admin";
pub const EDP_API_GROUP: &str = "*";
pub const EDP_RESOURCES: [&str; 5] = ["codebases", "applicationbranches", "codebasebranches", "cdpipelines", "stages"];

// SSO
pub const SSO_REALM_ROLE: &str = "developer";
pub const SSO_DEFAULT_CLIENT_SCOPE: &str = "edp";

// Component registry
pub const COMPONENT_TYPE: &str = "admin-console";

// Workload
pub const CONTAINER_PORT: i32 = 8080;
pub const PORT_NAME: &str = "http";
pub const MEMORY_REQUEST: &str = "500Mi";
pub const LIVENESS_INITIAL_DELAY: i32 = 180;
pub const READINESS_INITIAL_DELAY: i32 = 60;
pub const PROBE_PERIOD: i32 = 20;
pub const PROBE_FAILURE_THRESHOLD: i32 = 5;
pub const PROBE_TIMEOUT: i32 = 5;
pub const TMP_VOLUME: &str = "tmp";

// Workload environment variables
pub const ENV_NAMESPACE: &str = "NAMESPACE";
pub const ENV_HOST: &str = "HOST";
pub const ENV_BASE_PATH: &str = "BASE_PATH";
pub const ENV_ADMIN_CONSOLE_VERSION: &str = "EDP_ADMIN_CONSOLE_VERSION";
pub const ENV_EDP_VERSION: &str = "EDP_VERSION";
pub const ENV_AUTH_KEYCLOAK_ENABLED: &str = "AUTH_KEYCLOAK_ENABLED";
pub const ENV_DNS_WILDCARD: &str = "DNS_WILDCARD";
pub const ENV_PG_USER: &str = "PG_USER";
pub const ENV_PG_PASSWORD: &str = "PG_PASSWORD";
pub const ENV_PG_HOST: &str = "PG_HOST";
pub const ENV_PG_PORT: &str = "PG_PORT";
pub const ENV_PG_DATABASE: &str = "PG_DATABASE";
pub const ENV_DB_ENABLED: &str = "DB_ENABLED";
pub const ENV_INTEGRATION_STRATEGIES: &str = "INTEGRATION_STRATEGIES";
pub const ENV_KEYCLOAK_CLIENT_ID: &str = "KEYCLOAK_CLIENT_ID";
pub const ENV_KEYCLOAK_CLIENT_SECRET: &str = "KEYCLOAK_CLIENT_SECRET";
pub const ENV_KEYCLOAK_URL: &str = "KEYCLOAK_URL";
