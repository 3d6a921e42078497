//! Signing identity types and certificate-type prefixes

use serde::{Deserialize, Serialize};

/// Certificate type requested during identity discovery.
///
/// Discovery matches an identity whose advertised name starts with the
/// type's prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateType {
    /// Mac App Store application certificate
    StoreApplication,
    /// Developer ID certificate for distribution outside the store
    DirectDistribution,
    /// Development certificate, unsuitable for shipping builds
    Development,
    /// Mac App Store installer-package certificate
    Installer,
}

impl CertificateType {
    /// Name prefix identities of this type carry
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::StoreApplication => "3rd Party Mac Developer Application",
            Self::DirectDistribution => "Developer ID Application",
            Self::Development => "Mac Developer",
            Self::Installer => "3rd Party Mac Developer Installer",
        }
    }
}

impl std::fmt::Display for CertificateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Issuer prefixes for which the signing tool is asked to perform a
/// gatekeeper assessment of the signed bundle
const RECOGNIZED_ISSUER_PREFIXES: &[&str] = &[
    "Developer ID Application:",
    "Developer ID Installer:",
    "3rd Party Mac Developer Application:",
    "3rd Party Mac Developer Installer:",
    "Mac Developer:",
];

/// Whether a resolved identity name warrants a gatekeeper assessment.
///
/// Pure function of the name: true iff it starts with one of the recognized
/// issuer prefixes.
pub fn gatekeeper_assess(identity_name: &str) -> bool {
    RECOGNIZED_ISSUER_PREFIXES
        .iter()
        .any(|prefix| identity_name.starts_with(prefix))
}

/// A signing identity: a named certificate/key pair usable by the signing
/// tool. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningIdentity {
    /// Certificate name as advertised by the credential store
    pub name: String,

    /// Team identifier, when the name carries one
    pub team_id: Option<String>,

    /// Certificate fingerprint (SHA-1 hex, as reported by the store)
    pub fingerprint: Option<String>,
}

impl SigningIdentity {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            team_id: None,
            fingerprint: None,
        }
    }

    /// Parse one identity line of `security find-identity -v` output.
    ///
    /// Format: `  1) FINGERPRINT "Name (TEAMID)"`
    pub(crate) fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if !line.starts_with(char::is_numeric) {
            return None;
        }

        let mut parts = line.splitn(3, ' ');
        parts.next()?; // index, e.g. "1)"
        let fingerprint = parts.next()?.to_string();
        let rest = parts.next()?;

        let name_start = rest.find('"')?;
        let name_end = rest[name_start + 1..].find('"')? + name_start + 1;
        let name = rest[name_start + 1..name_end].to_string();

        // Team id is the trailing parenthesized component of the name
        let team_id = name.rfind('(').and_then(|start| {
            let end = name.rfind(')')?;
            (end > start).then(|| name[start + 1..end].to_string())
        });

        Some(Self {
            name,
            team_id,
            fingerprint: Some(fingerprint),
        })
    }
}

impl std::fmt::Display for SigningIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        let line = r#"  1) ABC123DEF456 "3rd Party Mac Developer Application: My Company (TEAMID123)""#;
        let identity = SigningIdentity::parse_line(line).unwrap();
        assert_eq!(identity.fingerprint.as_deref(), Some("ABC123DEF456"));
        assert!(identity.name.starts_with("3rd Party Mac Developer Application:"));
        assert_eq!(identity.team_id.as_deref(), Some("TEAMID123"));
    }

    #[test]
    fn test_parse_line_ignores_noise() {
        assert!(SigningIdentity::parse_line("     2 valid identities found").is_none());
        assert!(SigningIdentity::parse_line("").is_none());
    }

    #[test]
    fn test_gatekeeper_assess_is_prefix_match() {
        assert!(gatekeeper_assess("Developer ID Application: My Company (T1)"));
        assert!(gatekeeper_assess("Mac Developer: Jane Doe (T2)"));
        assert!(!gatekeeper_assess("Self Signed Cert"));
        // Prefix, not substring
        assert!(!gatekeeper_assess("Not a Developer ID Application: X"));
    }
}
