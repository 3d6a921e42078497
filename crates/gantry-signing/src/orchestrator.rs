//! The per-pass signing decision state machine
//!
//! For each packaging pass the orchestrator decides whether to sign, which
//! identity and certificate type to request, builds the sign request, runs
//! the signer, and for store variants resolves an installer identity and
//! drives the flattener. Fatal conditions abort the pass; skip conditions
//! complete it with an unsigned bundle.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::warn;

use gantry_core::config::IdentityPreference;
use gantry_core::types::{Artifact, BuildVariant, SigningType};

use crate::entitlements::{self, ResourceListing};
use crate::error::{Result, SigningError};
use crate::flattener::Flattener;
use crate::identity::{gatekeeper_assess, CertificateType, SigningIdentity};
use crate::keychain::CredentialContext;
use crate::request::{Channel, SignRequest};
use crate::resolver::{IdentityResolver, Resolution};
use crate::signer::Signer;

/// Signing policy of one pass, fixed before the pass starts
#[derive(Debug, Clone)]
pub struct SigningOptions {
    pub variant: BuildVariant,
    pub identity_preference: IdentityPreference,
    /// Explicit signing type override
    pub signing_type: Option<SigningType>,
    /// Fail instead of shipping unsigned when no identity is found
    pub force_sign: bool,
    /// Explicit entitlements path, used verbatim
    pub entitlements: Option<PathBuf>,
    /// Explicit inherit-entitlements path, used verbatim
    pub entitlements_inherit: Option<PathBuf>,
}

/// Everything the orchestrator needs for one pass
#[derive(Debug, Clone)]
pub struct SignJob {
    /// Display name of the application, used in the installer file name
    pub app_name: String,
    pub version: String,
    /// The assembled `.app` bundle, signed in place
    pub app_path: PathBuf,
    /// The pass's own output directory; the installer package lands here
    pub out_dir: PathBuf,
    pub resources: ResourceListing,
    pub credentials: CredentialContext,
    pub options: SigningOptions,
}

/// Why a pass completed without signing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The host operating system cannot code-sign
    PlatformUnsupported,
    /// The identity was explicitly disabled
    IdentityDisabled,
    /// No identity could be discovered and signing is not forced
    NoIdentity,
}

/// How a pass ended
#[derive(Debug, Clone)]
pub enum Disposition {
    /// The bundle was signed; store passes also carry the installer artifact
    Signed {
        request: SignRequest,
        artifact: Option<Artifact>,
    },
    /// The pass completed with an unsigned bundle
    Skipped(SkipReason),
}

/// Recorded outcome of one pass, including the warnings it raised
#[derive(Debug, Clone)]
pub struct SigningOutcome {
    pub disposition: Disposition,
    pub warnings: Vec<String>,
}

impl SigningOutcome {
    pub fn signed_request(&self) -> Option<&SignRequest> {
        match &self.disposition {
            Disposition::Signed { request, .. } => Some(request),
            Disposition::Skipped(_) => None,
        }
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        match &self.disposition {
            Disposition::Signed { artifact, .. } => artifact.as_ref(),
            Disposition::Skipped(_) => None,
        }
    }
}

/// Drives the signing decision for packaging passes.
pub struct SigningOrchestrator {
    resolver: IdentityResolver,
    signer: Arc<dyn Signer>,
    flattener: Arc<dyn Flattener>,
    host_can_sign: bool,
}

impl SigningOrchestrator {
    pub fn new(
        resolver: IdentityResolver,
        signer: Arc<dyn Signer>,
        flattener: Arc<dyn Flattener>,
    ) -> Self {
        Self {
            resolver,
            signer,
            flattener,
            host_can_sign: cfg!(target_os = "macos"),
        }
    }

    /// Override the host capability check (used off-platform and in tests)
    pub fn with_host_capability(mut self, host_can_sign: bool) -> Self {
        self.host_can_sign = host_can_sign;
        self
    }

    /// Run the state machine for one pass.
    pub async fn run(&self, job: &SignJob) -> Result<SigningOutcome> {
        let mut warnings = Vec::new();

        // Stale project configuration is rejected before anything else,
        // independent of channel, policy, or host capability.
        entitlements::check_deprecated(&job.resources)?;

        let variant = job.options.variant;
        if !self.host_can_sign {
            return Ok(self.skip(
                SkipReason::PlatformUnsupported,
                "skipping macOS application code signing: not supported on this host platform",
                warnings,
            ));
        }

        let preference = &job.options.identity_preference;
        if !variant.is_store() && preference.is_disabled() {
            if job.options.force_sign {
                return Err(SigningError::IdentityDisabledButForced);
            }
            return Ok(self.skip(
                SkipReason::IdentityDisabled,
                "skipping macOS application code signing: identity is explicitly disabled",
                warnings,
            ));
        }

        let identity = match self.search_identity(job, &mut warnings).await? {
            Some(identity) => identity,
            None => {
                return Ok(self.skip(
                    SkipReason::NoIdentity,
                    "skipping macOS application code signing: no signing identity found",
                    warnings,
                ))
            }
        };

        let resolved = entitlements::resolve(
            variant,
            job.options.entitlements.as_deref(),
            job.options.entitlements_inherit.as_deref(),
            &job.resources,
        )?;

        let request = SignRequest {
            gatekeeper_assess: gatekeeper_assess(&identity.name),
            identity,
            signing_type: job.options.signing_type.unwrap_or(SigningType::Distribution),
            channel: if variant.is_store() {
                Channel::Store
            } else {
                Channel::Direct
            },
            version: job.version.clone(),
            app_path: job.app_path.clone(),
            keychain: job.credentials.keychain_name().map(String::from),
            entitlements: resolved.entitlements,
            entitlements_inherit: resolved.entitlements_inherit,
            skip_identity_validation: true,
        };

        self.signer.sign(&request).await?;

        let artifact = if variant.is_store() {
            Some(self.flatten(job, &request).await?)
        } else {
            None
        };

        Ok(SigningOutcome {
            disposition: Disposition::Signed { request, artifact },
            warnings,
        })
    }

    /// Identity search with the development-certificate fallback for direct
    /// passes. `Ok(None)` means no identity and the pass may ship unsigned.
    async fn search_identity(
        &self,
        job: &SignJob,
        warnings: &mut Vec<String>,
    ) -> Result<Option<SigningIdentity>> {
        let options = &job.options;
        let variant = options.variant;
        let qualifier = options.identity_preference.qualifier();

        let cert_type = if variant.is_store() {
            CertificateType::StoreApplication
        } else if options.signing_type == Some(SigningType::Development) {
            CertificateType::Development
        } else {
            CertificateType::DirectDistribution
        };

        match self.resolver.resolve(cert_type, qualifier, &job.credentials).await? {
            Resolution::Found(identity) => return Ok(Some(identity)),
            Resolution::Ambiguous { name, count } => {
                return Err(ambiguous(qualifier, &name, count));
            }
            Resolution::NotFound => {}
        }

        // Direct passes not explicitly pinned to a distribution signature
        // fall back to a development certificate.
        let may_retry = !variant.is_store()
            && options.signing_type != Some(SigningType::Distribution)
            && cert_type != CertificateType::Development;
        if may_retry {
            match self
                .resolver
                .resolve(CertificateType::Development, qualifier, &job.credentials)
                .await?
            {
                Resolution::Found(identity) => {
                    let message = format!(
                        "signing with development identity '{}'; the resulting app is not suitable for production distribution",
                        identity.name
                    );
                    warn!("{message}");
                    warnings.push(message);
                    return Ok(Some(identity));
                }
                Resolution::Ambiguous { name, count } => {
                    return Err(ambiguous(qualifier, &name, count));
                }
                Resolution::NotFound => {
                    if let Some(q) = qualifier {
                        return Err(SigningError::AmbiguousIdentity {
                            qualifier: q.to_string(),
                            detail: "no identity of any certificate type matched".to_string(),
                        });
                    }
                }
            }
        }

        if variant.is_store() || options.force_sign {
            return Err(SigningError::IdentityNotFound {
                certificate_type: cert_type.prefix().to_string(),
                qualifier: qualifier.map(String::from),
            });
        }
        Ok(None)
    }

    /// Resolve the installer identity and flatten the signed bundle into a
    /// single `.pkg` for a store pass.
    async fn flatten(&self, job: &SignJob, request: &SignRequest) -> Result<Artifact> {
        let qualifier = job.options.identity_preference.qualifier();
        let installer = match self
            .resolver
            .resolve(CertificateType::Installer, qualifier, &job.credentials)
            .await?
        {
            Resolution::Found(identity) => identity,
            Resolution::NotFound | Resolution::Ambiguous { .. } => {
                return Err(SigningError::InstallerIdentityNotFound {
                    certificate_type: CertificateType::Installer.prefix().to_string(),
                });
            }
        };

        let display_name = format!("{}-{}.pkg", job.app_name, job.version);
        let output = job.out_dir.join(&display_name);
        self.flattener
            .flatten(&request.app_path, &installer, &job.credentials, &output)
            .await?;

        Ok(Artifact::new(output, None, display_name))
    }

    fn skip(
        &self,
        reason: SkipReason,
        message: &str,
        mut warnings: Vec<String>,
    ) -> SigningOutcome {
        warn!("{message}");
        warnings.push(message.to_string());
        SigningOutcome {
            disposition: Disposition::Skipped(reason),
            warnings,
        }
    }
}

fn ambiguous(qualifier: Option<&str>, name: &str, count: usize) -> SigningError {
    SigningError::AmbiguousIdentity {
        qualifier: qualifier.unwrap_or(name).to_string(),
        detail: format!("{count} identities share the name '{name}'"),
    }
}
