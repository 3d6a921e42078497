//! Error types for signing operations

use thiserror::Error;

/// Result type alias for signing operations
pub type Result<T> = std::result::Result<T, SigningError>;

/// Signing-related errors.
///
/// Every variant here is fatal for the pass that raised it. Conditions the
/// pass survives (unsupported host, identity disabled without force-signing,
/// no identity without force-signing) are represented as skip outcomes, not
/// errors.
#[derive(Debug, Error)]
pub enum SigningError {
    /// Identity was explicitly disabled while force-signing is active
    #[error("identity is explicitly disabled but signing is forced (force_sign = true)")]
    IdentityDisabledButForced,

    /// No identity matched the certificate type (and qualifier, if any)
    #[error("cannot find a valid \"{certificate_type}\" identity{}", .qualifier.as_deref().map(|q| format!(" matching '{q}'")).unwrap_or_default())]
    IdentityNotFound {
        certificate_type: String,
        qualifier: Option<String>,
    },

    /// A qualifier matched more than one identity, or an explicit qualifier
    /// failed every resolution attempt
    #[error("signing identity qualifier '{qualifier}' is ambiguous or misconfigured: {detail}")]
    AmbiguousIdentity { qualifier: String, detail: String },

    /// The resource directory contains a permanently rejected legacy file name
    #[error("the file '{found}' is not supported anymore, rename it to '{replacement}'")]
    DeprecatedResourceName { found: String, replacement: String },

    /// No installer identity for a store pass
    #[error("cannot find a valid \"{certificate_type}\" identity to build the installer package")]
    InstallerIdentityNotFound { certificate_type: String },

    /// External tool exited unsuccessfully; `reason` is its diagnostic
    /// output, verbatim
    #[error("{tool} failed: {reason}")]
    ToolFailed { tool: String, reason: String },

    /// External tool did not finish within the configured timeout
    #[error("{tool} did not finish within {seconds}s")]
    ToolTimeout { tool: String, seconds: u64 },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_not_found_message_includes_qualifier() {
        let err = SigningError::IdentityNotFound {
            certificate_type: "Developer ID Application".to_string(),
            qualifier: Some("My Team".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("Developer ID Application"));
        assert!(msg.contains("My Team"));
    }

    #[test]
    fn test_deprecated_resource_message_names_replacement() {
        let err = SigningError::DeprecatedResourceName {
            found: "entitlements.osx.plist".to_string(),
            replacement: "entitlements.mac.plist".to_string(),
        };
        assert!(err.to_string().contains("entitlements.mac.plist"));
    }
}
