//! Gantry Signing - macOS code signing orchestration
//!
//! This crate decides whether and how a bundle gets signed for a given
//! distribution channel and drives the external tools that do the work:
//! - identity discovery against an optional build keychain
//! - entitlement file resolution (with rejection of deprecated names)
//! - the per-pass signing decision state machine
//! - installer flattening for Mac App Store passes
//!
//! Bundle assembly and keychain creation are external collaborators.

pub mod entitlements;
pub mod error;
pub mod flattener;
pub mod identity;
pub mod keychain;
pub mod orchestrator;
pub mod request;
pub mod resolver;
pub mod signer;

pub use entitlements::{ResolvedEntitlements, ResourceListing};
pub use error::{Result, SigningError};
pub use flattener::{Flattener, ProductbuildFlattener};
pub use identity::{CertificateType, SigningIdentity};
pub use keychain::CredentialContext;
pub use orchestrator::{
    Disposition, SignJob, SigningOptions, SigningOrchestrator, SigningOutcome, SkipReason,
};
pub use request::{Channel, SignRequest};
pub use resolver::{IdentityResolver, IdentitySource, Resolution, SecurityIdentitySource};
pub use signer::{CodesignSigner, Signer};
