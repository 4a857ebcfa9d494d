//! Error taxonomy for vtag.

/// vtag domain errors.
#[derive(Debug, thiserror::Error)]
pub enum VtagError {
    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("manifest {path} has no package.version")]
    MissingVersion { path: String },

    #[error("invalid version {version:?}: {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("git error: {0}")]
    Git(String),

    #[error("tag {tag} already exists{}", at_target(.target))]
    TagAlreadyExists { tag: String, target: Option<String> },

    #[error("config error: {0}")]
    Config(String),

    #[error("trigger error: {0}")]
    Trigger(String),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn at_target(target: &Option<String>) -> String {
    target
        .as_deref()
        .map(|t| format!(" at {t}"))
        .unwrap_or_default()
}

/// Result type for vtag operations.
pub type Result<T> = std::result::Result<T, VtagError>;
