//! Identity discovery against a credential context

use std::collections::BTreeMap;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{Result, SigningError};
use crate::identity::{CertificateType, SigningIdentity};
use crate::keychain::CredentialContext;

/// Source of signing identities.
///
/// The production implementation shells out to the `security` tool; tests
/// substitute an in-memory listing. Implementations must only return
/// identities belonging to the given credential context.
#[async_trait::async_trait]
pub trait IdentitySource: Send + Sync {
    async fn list_identities(&self, context: &CredentialContext) -> Result<Vec<SigningIdentity>>;
}

/// Lists code-signing identities via `security find-identity`
pub struct SecurityIdentitySource {
    security_path: String,
}

impl SecurityIdentitySource {
    pub fn new() -> Self {
        Self {
            security_path: "/usr/bin/security".to_string(),
        }
    }
}

impl Default for SecurityIdentitySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IdentitySource for SecurityIdentitySource {
    async fn list_identities(&self, context: &CredentialContext) -> Result<Vec<SigningIdentity>> {
        let mut args = vec!["find-identity", "-v", "-p", "codesigning"];
        if let Some(keychain) = context.keychain_name() {
            args.push(keychain);
        }

        debug!(?args, "running security");
        let output = Command::new(&self.security_path)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(SigningError::ToolFailed {
                tool: "security".to_string(),
                reason: stderr,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().filter_map(SigningIdentity::parse_line).collect())
    }
}

/// Outcome of an identity search.
///
/// Call sites must not conflate "no identity" with a search error, so the
/// three cases are explicit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(SigningIdentity),
    NotFound,
    /// More than one identity shares the winning name; picking one would be
    /// arbitrary
    Ambiguous { name: String, count: usize },
}

impl Resolution {
    pub fn found(self) -> Option<SigningIdentity> {
        match self {
            Self::Found(identity) => Some(identity),
            _ => None,
        }
    }
}

/// Searches a credential context for an identity of a certificate type.
pub struct IdentityResolver {
    source: Arc<dyn IdentitySource>,
}

impl IdentityResolver {
    pub fn new(source: Arc<dyn IdentitySource>) -> Self {
        Self { source }
    }

    /// Resolve an identity of `cert_type`, optionally restricted by a
    /// qualifier, inside `context`.
    ///
    /// A qualifier restricts candidates to exact matches on name or team id;
    /// when nothing matches exactly, name-substring matches are used. Among
    /// multiple candidates the lexicographically smallest name wins, so the
    /// choice never depends on the store's enumeration order. Duplicate
    /// certificates sharing the winning name are reported as
    /// [`Resolution::Ambiguous`].
    pub async fn resolve(
        &self,
        cert_type: CertificateType,
        qualifier: Option<&str>,
        context: &CredentialContext,
    ) -> Result<Resolution> {
        let identities = self.source.list_identities(context).await?;
        let prefix = cert_type.prefix();

        let mut candidates: Vec<&SigningIdentity> = identities
            .iter()
            .filter(|id| id.name.starts_with(prefix))
            .collect();

        if let Some(q) = qualifier {
            let exact: Vec<&SigningIdentity> = candidates
                .iter()
                .copied()
                .filter(|id| id.name == q || id.team_id.as_deref() == Some(q))
                .collect();
            candidates = if exact.is_empty() {
                candidates.into_iter().filter(|id| id.name.contains(q)).collect()
            } else {
                exact
            };
        }

        if candidates.is_empty() {
            debug!(certificate_type = prefix, ?qualifier, %context, "no identity matched");
            return Ok(Resolution::NotFound);
        }

        // Deterministic tie-break: group by name, take the smallest name.
        let mut by_name: BTreeMap<&str, Vec<&SigningIdentity>> = BTreeMap::new();
        for id in candidates {
            by_name.entry(id.name.as_str()).or_default().push(id);
        }
        let (name, group) = by_name.iter().next().expect("candidates is non-empty");

        if group.len() > 1 {
            return Ok(Resolution::Ambiguous {
                name: (*name).to_string(),
                count: group.len(),
            });
        }

        let identity = (*group[0]).clone();
        info!(identity = %identity.name, certificate_type = prefix, "resolved signing identity");
        Ok(Resolution::Found(identity))
    }
}
