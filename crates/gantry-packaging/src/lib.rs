//! Gantry Packaging - distribution pass planning and orchestration
//!
//! Partitions the requested distribution targets into independent packaging
//! passes (one direct pass, zero or more store passes), drives bundling and
//! signing for each, and aggregates outcomes. Passes run concurrently, each
//! against its own output directory.

pub mod artifact;
pub mod bundler;
pub mod error;
pub mod flow;
pub mod pass;

pub use artifact::{ArtifactSink, CollectingSink, LoggingSink};
pub use bundler::{Bundler, PrebuiltBundler};
pub use error::{PackagingError, PassFailure, Result};
pub use flow::{PackagingFlowController, PackagingRequest};
pub use pass::{plan_passes, PackagingPass, PassPlan};
