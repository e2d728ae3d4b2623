//! Error types for PDP operations

/// PDP-specific error type
#[derive(Debug, thiserror::Error)]
pub enum PdpError {
    #[error("Malformed credential: {0}")]
    MalformedCredential(String),

    #[error("Credential mismatch: {0}")]
    CredentialMismatch(String),

    #[error("Invalid token signature: {0}")]
    SignatureInvalid(String),

    #[error("Token expired: {0}")]
    TokenExpired(String),

    #[error("Token claim mismatch: {0}")]
    ClaimMismatch(String),

    #[error("No verification key found for kid: {0}")]
    KeyNotFound(String),

    #[error("Key set endpoint unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Token missing scopes information within payload")]
    NoScopesPresent,

    #[error("Insufficient scope. Recognized none of: {}", .0.join(", "))]
    InsufficientScope(Vec<String>),

    #[error("Malformed method descriptor: {0}")]
    MalformedDescriptor(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The only failure that crosses the trust boundary
    #[error("Unauthorized")]
    Unauthorized,
}

pub type Result<T> = std::result::Result<T, PdpError>;

impl PdpError {
    /// Stable name of the error kind, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            PdpError::MalformedCredential(_) => "MalformedCredential",
            PdpError::CredentialMismatch(_) => "CredentialMismatch",
            PdpError::SignatureInvalid(_) => "SignatureInvalid",
            PdpError::TokenExpired(_) => "TokenExpired",
            PdpError::ClaimMismatch(_) => "ClaimMismatch",
            PdpError::KeyNotFound(_) => "KeyNotFound",
            PdpError::UpstreamUnavailable(_) => "UpstreamUnavailable",
            PdpError::NoScopesPresent => "NoScopesPresent",
            PdpError::InsufficientScope(_) => "InsufficientScope",
            PdpError::MalformedDescriptor(_) => "MalformedDescriptor",
            PdpError::Config(_) => "Config",
            PdpError::BadRequest(_) => "BadRequest",
            PdpError::NotFound(_) => "NotFound",
            PdpError::Unauthorized => "Unauthorized",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_display_is_opaque() {
        assert_eq!(PdpError::Unauthorized.to_string(), "Unauthorized");
    }

    #[test]
    fn test_insufficient_scope_lists_literals() {
        let err = PdpError::InsufficientScope(vec!["message.read".to_string(), "message.write".to_string()]);
        assert!(err.to_string().contains("message.read, message.write"));
        assert_eq!(err.kind(), "InsufficientScope");
    }
}
