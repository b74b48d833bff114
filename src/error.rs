pub type ProvisionResult<T> = Result<T, ProvisionError>;

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("insufficient privileges: {0}")]
    Privilege(String),

    #[error("unsupported platform: expected {expected}, found {found}")]
    PlatformMismatch { expected: String, found: String },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("conflict detected: {0}")]
    ConflictDetected(String),

    #[error(
        "DNS mismatch: {hostname} resolves to [{resolved}], \
         expected one of [{expected}]"
    )]
    DnsMismatch {
        hostname: String,
        resolved: String,
        expected: String,
    },

    #[error("unable to determine address: {0}")]
    UnresolvableHost(String),

    #[error("failed to install {packages}: {diagnostic}")]
    PackageInstall {
        packages: String,
        diagnostic: String,
    },

    #[error("proxy configuration test failed: {0}")]
    ProxyConfigTest(String),

    #[error("certificate issuance failed: {0}")]
    Certificate(String),

    #[error("command failed: {command}: {diagnostic}")]
    CommandFailed { command: String, diagnostic: String },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}
