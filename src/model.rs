/// All errors possible to occur during reconciliation
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Any error originating from the `kube-rs` crate
    #[error("Kubernetes reported error: {source}")]
    KubeError {
        #[from]
        source: kube::Error,
    },

    /// The AdminConsole or one of its dependent objects does not exist
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Error in user input or AdminConsole resource definition, typically missing fields.
    #[error("Invalid AdminConsole spec: {0}")]
    ValidationError(String),

    /// The Keycloak client, realm or server has not been created yet
    #[error("SSO CR not created yet: {0}")]
    SsoNotReady(String),

    /// A dependent object exists but cannot be used yet
    #[error("Resource not ready: {0}")]
    NotReady(String),

    /// The operator configuration is invalid
    #[error("Invalid operator configuration: {0}")]
    ConfigError(String),

    #[error("YAML Parsing error: {0}")]
    ParserError(
        #[from]
        serde_yaml::Error,
    ),

    #[error("JSON serialization error: {0}")]
    SerializationError(
        #[from]
        serde_json::Error,
    ),

    #[error("IO error: {0}")]
    IoError(
        #[from]
        std::io::Error,
    ),

    /// Wraps an error with the step and resource that produced it
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Error::ValidationError(msg.into())
    }

    /// True when the error, or the error it wraps, means the object does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) => true,
            Error::KubeError { source: kube::Error::Api(response) } => response.code == 404,
            Error::Context { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

/// Attaches a context message to the error of a fallible call.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|error| error.into().context(context))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|error| error.into().context(f()))
    }
}
