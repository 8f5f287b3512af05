use thiserror::Error;

#[derive(Debug, Error)]
pub enum OnvifError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Device must expose at least one media profile")]
    NoProfiles,

    #[error("Duplicate profile token: {0}")]
    DuplicateToken(String),

    #[error("Invalid device {field}: {reason}")]
    InvalidIdentity { field: &'static str, reason: String },

    #[error("Invalid profile '{token}': {reason}")]
    InvalidProfile { token: String, reason: String },
}
